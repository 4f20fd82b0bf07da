//! Common RF packet header
//!
//! # Wire Format
//! ```text
//! sender:u16 | receiver:u16 | technology:u8 | protocol:u8 | packet_type:u8 | body...
//! ```
//!
//! Integers are little-endian. The body is every byte after the 7 byte
//! header; its layout depends on which packet variant the header selects.

use crate::error::CodecError;
use crate::fields::{FieldReader, FieldWriter};
use crate::types::{PacketType, Protocol, Technology};

/// Size of the common header in bytes
pub const HEADER_SIZE: usize = 7;

/// Receiver address that reaches every device on the RF scene
pub const BROADCAST_ADDRESS: u16 = 0xFFFF;

/// Header present at the start of every RF packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RfHeader {
    /// Address of the sending device
    pub sender: u16,
    /// Address of the receiving device, or [`BROADCAST_ADDRESS`]
    pub receiver: u16,
    /// RF technology
    pub technology: Technology,
    /// Protocol
    pub protocol: Protocol,
    /// Packet kind
    pub packet_type: PacketType,
}

impl RfHeader {
    /// Parse the header, returning it together with the body bytes
    ///
    /// Fewer than [`HEADER_SIZE`] bytes is an error for the whole frame.
    pub fn parse(data: &[u8]) -> Result<(Self, &[u8]), CodecError> {
        if data.len() < HEADER_SIZE {
            return Err(CodecError::InsufficientData {
                needed: HEADER_SIZE,
                available: data.len(),
            });
        }

        let mut reader = FieldReader::new(&data[..HEADER_SIZE]);
        let header = RfHeader {
            sender: reader.read_u16()?,
            receiver: reader.read_u16()?,
            technology: reader.read_enum()?,
            protocol: reader.read_enum()?,
            packet_type: reader.read_enum()?,
        };

        Ok((header, &data[HEADER_SIZE..]))
    }

    /// Write the header fields
    pub fn write(&self, writer: &mut FieldWriter) {
        writer.put_uint("RfPacket::sender", u64::from(self.sender), 2);
        writer.put_uint("RfPacket::receiver", u64::from(self.receiver), 2);
        writer.put_enum(self.technology);
        writer.put_enum(self.protocol);
        writer.put_enum(self.packet_type);
    }

    /// Returns true if the packet is addressed to `address`, directly or by
    /// broadcast
    pub fn is_addressed_to(&self, address: u16) -> bool {
        self.receiver == address || self.receiver == BROADCAST_ADDRESS
    }
}

/// Header field values a packet variant requires
///
/// A `None` field places no constraint on the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Constraints {
    /// Required technology
    pub technology: Option<Technology>,
    /// Required protocol
    pub protocol: Option<Protocol>,
    /// Required packet type
    pub packet_type: Option<PacketType>,
}

impl Constraints {
    /// No constraint at all
    pub const NONE: Constraints = Constraints {
        technology: None,
        protocol: None,
        packet_type: None,
    };

    /// Returns true if every required field holds in `header`
    pub fn matches(&self, header: &RfHeader) -> bool {
        self.technology.map_or(true, |t| t == header.technology)
            && self.protocol.map_or(true, |p| p == header.protocol)
            && self.packet_type.map_or(true, |t| t == header.packet_type)
    }

    /// Overwrite the required fields of `header` with their fixed values
    pub fn stamp(&self, mut header: RfHeader) -> RfHeader {
        if let Some(technology) = self.technology {
            header.technology = technology;
        }
        if let Some(protocol) = self.protocol {
            header.protocol = protocol;
        }
        if let Some(packet_type) = self.packet_type {
            header.packet_type = packet_type;
        }
        header
    }
}
