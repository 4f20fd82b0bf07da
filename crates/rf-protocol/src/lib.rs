//! RF Packet Protocol Library
//!
//! This crate provides parsing and encoding for the RF link-layer packets
//! exchanged between emulated NFC devices:
//!
//! - **Header**: 7 bytes shared by every packet (addresses, technology,
//!   protocol, packet type)
//! - **Variants**: nine concrete packet shapes selected from the header and
//!   body, plus a generic fallback keeping the raw body
//! - **Field primitives**: little-endian scalars, bit-packed sub-byte
//!   fields, length-prefixed byte sequences
//!
//! # Architecture
//!
//! [`RfPacket`] is a closed enum with one case per variant. Decoding parses
//! the header, then tries each variant in [`dispatch::DISPATCH_ORDER`]; the
//! first one whose required header fields hold and whose body decodes wins.
//!
//! Encoding always writes the variant's required header values, regardless of
//! what the caller put in the free fields, so a packet decodes back to the
//! variant it was built as.
//!
//! # Example
//!
//! ```rust
//! use rf_protocol::{RfPacket, T4ATSelectCommand};
//!
//! let select = RfPacket::from(T4ATSelectCommand {
//!     sender: 1,
//!     receiver: 2,
//!     param: 0,
//! });
//! let bytes = select.encode();
//! assert_eq!(bytes, [0x01, 0x00, 0x02, 0x00, 0x00, 0x04, 0x03, 0x00]);
//!
//! let decoded = RfPacket::decode(&bytes).unwrap();
//! assert_eq!(decoded, select);
//! ```

pub mod dispatch;
pub mod error;
pub mod fields;
pub mod header;
pub mod packets;
pub mod types;

use std::fmt;

pub use error::CodecError;
pub use header::{Constraints, RfHeader, BROADCAST_ADDRESS, HEADER_SIZE};
pub use packets::{
    Data, DeactivateNotification, NfcAPollResponse, NfcDepSelectCommand, NfcDepSelectResponse,
    PollCommand, RawPacket, RfVariant, SelectCommand, T4ATSelectCommand, T4ATSelectResponse,
    INT_PROTOCOL_T4AT,
};
pub use types::{DeactivateReason, DeactivateType, PacketType, Protocol, Technology};

use fields::FieldWriter;

/// Any RF packet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RfPacket {
    PollCommand(PollCommand),
    NfcAPollResponse(NfcAPollResponse),
    T4ATSelectCommand(T4ATSelectCommand),
    T4ATSelectResponse(T4ATSelectResponse),
    NfcDepSelectCommand(NfcDepSelectCommand),
    NfcDepSelectResponse(NfcDepSelectResponse),
    SelectCommand(SelectCommand),
    DeactivateNotification(DeactivateNotification),
    Data(Data),
    /// Packet no concrete variant accepted
    Raw(RawPacket),
}

/// Evaluate `$body` with `$inner` bound to the variant inside `$packet`
macro_rules! with_variant {
    ($packet:expr, $inner:ident => $body:expr) => {
        match $packet {
            RfPacket::PollCommand($inner) => $body,
            RfPacket::NfcAPollResponse($inner) => $body,
            RfPacket::T4ATSelectCommand($inner) => $body,
            RfPacket::T4ATSelectResponse($inner) => $body,
            RfPacket::NfcDepSelectCommand($inner) => $body,
            RfPacket::NfcDepSelectResponse($inner) => $body,
            RfPacket::SelectCommand($inner) => $body,
            RfPacket::DeactivateNotification($inner) => $body,
            RfPacket::Data($inner) => $body,
            RfPacket::Raw($inner) => $body,
        }
    };
}

/// Name of the variant type held in `$inner`
fn variant_name<V: RfVariant>(_: &V) -> &'static str {
    V::NAME
}

impl RfPacket {
    /// Decode one complete packet
    ///
    /// Fails if the header is short or malformed, or if bytes remain after
    /// the selected variant's body.
    pub fn decode(data: &[u8]) -> Result<Self, CodecError> {
        let (packet, consumed) = Self::parse(data)?;
        if consumed < data.len() {
            return Err(CodecError::TrailingData {
                remaining: data.len() - consumed,
            });
        }
        Ok(packet)
    }

    /// Decode a packet from the start of `data`
    ///
    /// Returns the packet and the total number of bytes it consumed, header
    /// included. Unlike [`RfPacket::decode`], unconsumed bytes are not an
    /// error.
    pub fn parse(data: &[u8]) -> Result<(Self, usize), CodecError> {
        let (header, body) = RfHeader::parse(data)?;
        let (packet, consumed) = dispatch::dispatch(&header, body);
        Ok((packet, HEADER_SIZE + consumed))
    }

    /// Encode the packet to its wire format
    ///
    /// Out of range field values are masked; each one is logged as a warning.
    pub fn encode(&self) -> Vec<u8> {
        self.encode_with_diagnostics().0
    }

    /// Encode the packet and return the truncation diagnostics it produced
    pub fn encode_with_diagnostics(&self) -> (Vec<u8>, Vec<CodecError>) {
        let mut writer = FieldWriter::with_capacity(self.size());
        with_variant!(self, p => {
            p.header().write(&mut writer);
            p.write_body(&mut writer);
        });
        writer.finish()
    }

    /// Header as it goes on the wire
    pub fn header(&self) -> RfHeader {
        with_variant!(self, p => p.header())
    }

    /// Address of the sending device
    pub fn sender(&self) -> u16 {
        self.header().sender
    }

    /// Address of the receiving device
    pub fn receiver(&self) -> u16 {
        self.header().receiver
    }

    /// Encoded size in bytes, header included
    pub fn size(&self) -> usize {
        HEADER_SIZE + with_variant!(self, p => p.body_size())
    }

    /// Name of the variant
    pub fn name(&self) -> &'static str {
        with_variant!(self, p => variant_name(p))
    }
}

impl fmt::Display for RfPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = self.header();
        write!(
            f,
            "{} {:#06x} -> {:#06x} ({:?}/{:?}, {} bytes)",
            self.name(),
            header.sender,
            header.receiver,
            header.technology,
            header.protocol,
            self.size()
        )
    }
}

macro_rules! impl_from_variant {
    ($($variant:ident),+ $(,)?) => {
        $(
            impl From<$variant> for RfPacket {
                fn from(packet: $variant) -> Self {
                    RfPacket::$variant(packet)
                }
            }
        )+
    };
}

impl_from_variant!(
    PollCommand,
    NfcAPollResponse,
    T4ATSelectCommand,
    T4ATSelectResponse,
    NfcDepSelectCommand,
    NfcDepSelectResponse,
    SelectCommand,
    DeactivateNotification,
    Data,
);

impl From<RawPacket> for RfPacket {
    fn from(packet: RawPacket) -> Self {
        RfPacket::Raw(packet)
    }
}
