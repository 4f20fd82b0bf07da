//! RF packet variants
//!
//! Each variant fixes some header fields (its [`Constraints`]) and carries
//! only the header fields it leaves free plus its own body fields. Building a
//! variant from an arbitrary [`RfHeader`] stamps the required values over
//! whatever the header held, so `decode(encode(v))` selects `v`'s variant
//! again.
//!
//! # Body Layouts
//! ```text
//! PollCommand             (empty)
//! NfcAPollResponse        len:u8 nfcid1[len] | int_protocol:2 (bits 0-1) | bit_frame_sdd:u8
//! T4ATSelectCommand       param:u8
//! T4ATSelectResponse      len:u8 rats_response[len]
//! NfcDepSelectCommand     lr:2 (bits 0-1)
//! NfcDepSelectResponse    len:u8 atr_response[len]
//! SelectCommand           (empty)
//! DeactivateNotification  type:u8 reason:u8
//! Data                    data[..] (rest of the frame)
//! ```

use crate::error::CodecError;
use crate::fields::{prefixed_size, BitField, FieldReader, FieldWriter};
use crate::header::{Constraints, RfHeader};
use crate::types::{DeactivateReason, DeactivateType, PacketType, Protocol, Technology};

/// `int_protocol` field of the NFC-A poll response (SEL_RES protocol bits)
pub const INT_PROTOCOL: BitField = BitField::new(0, 2);

/// `lr` field of the NFC-DEP select command (length reduction)
pub const LR: BitField = BitField::new(0, 2);

/// `int_protocol` value announcing a Type 4A tag platform
pub const INT_PROTOCOL_T4AT: u8 = 0b01;

/// Common behaviour of the packet variants
pub trait RfVariant: Sized {
    /// Variant name used in logs
    const NAME: &'static str;

    /// Header field values required for this variant
    const CONSTRAINTS: Constraints;

    /// Decode the variant's body fields
    ///
    /// The caller has already checked `header` against
    /// [`RfVariant::CONSTRAINTS`].
    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError>;

    /// Encode the variant's body fields
    fn write_body(&self, writer: &mut FieldWriter);

    /// Header as it goes on the wire, with required fields stamped
    fn header(&self) -> RfHeader;

    /// Encoded size of the body in bytes
    fn body_size(&self) -> usize;
}

/// Build the wire header of a variant from its free fields
fn stamped<V: RfVariant>(
    sender: u16,
    receiver: u16,
    technology: Technology,
    protocol: Protocol,
) -> RfHeader {
    V::CONSTRAINTS.stamp(RfHeader {
        sender,
        receiver,
        technology,
        protocol,
        packet_type: PacketType::default(),
    })
}

/// Poll for devices of the given technology
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PollCommand {
    pub sender: u16,
    pub receiver: u16,
    pub technology: Technology,
    pub protocol: Protocol,
}

impl PollCommand {
    /// Build a poll command from a header, stamping the packet type
    pub fn from_header(header: RfHeader) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            technology: header.technology,
            protocol: header.protocol,
        }
    }
}

impl RfVariant for PollCommand {
    const NAME: &'static str = "PollCommand";
    const CONSTRAINTS: Constraints = Constraints {
        technology: None,
        protocol: None,
        packet_type: Some(PacketType::PollCommand),
    };

    fn parse_body(header: &RfHeader, _body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self::from_header(*header))
    }

    fn write_body(&self, _writer: &mut FieldWriter) {}

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, self.technology, self.protocol)
    }

    fn body_size(&self) -> usize {
        0
    }
}

/// NFC-A poll response (SENS_RES/SDD/SEL_RES summary)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NfcAPollResponse {
    pub sender: u16,
    pub receiver: u16,
    pub protocol: Protocol,
    /// Tag identifier
    pub nfcid1: Vec<u8>,
    /// SEL_RES protocol bits, two bits wide
    pub int_protocol: u8,
    pub bit_frame_sdd: u8,
}

impl NfcAPollResponse {
    /// Build a poll response from a header, stamping technology and packet type
    pub fn from_header(
        header: RfHeader,
        nfcid1: Vec<u8>,
        int_protocol: u8,
        bit_frame_sdd: u8,
    ) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            protocol: header.protocol,
            nfcid1,
            int_protocol,
            bit_frame_sdd,
        }
    }
}

impl RfVariant for NfcAPollResponse {
    const NAME: &'static str = "NfcAPollResponse";
    const CONSTRAINTS: Constraints = Constraints {
        technology: Some(Technology::NfcA),
        protocol: None,
        packet_type: Some(PacketType::PollResponse),
    };

    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let nfcid1 = body.read_prefixed_bytes()?;
        let [int_protocol] = body.read_packed([INT_PROTOCOL])?;
        let bit_frame_sdd = body.read_u8()?;
        Ok(Self::from_header(*header, nfcid1, int_protocol, bit_frame_sdd))
    }

    fn write_body(&self, writer: &mut FieldWriter) {
        writer.put_prefixed_bytes("NfcAPollResponse::nfcid1", &self.nfcid1);
        writer.put_packed(&[(
            "NfcAPollResponse::int_protocol",
            u64::from(self.int_protocol),
            INT_PROTOCOL,
        )]);
        writer.put_u8(self.bit_frame_sdd);
    }

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, Technology::NfcA, self.protocol)
    }

    fn body_size(&self) -> usize {
        prefixed_size(self.nfcid1.len()) + 2
    }
}

/// ISO-DEP select for a Type 4A tag (RATS)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct T4ATSelectCommand {
    pub sender: u16,
    pub receiver: u16,
    /// RATS parameter byte
    pub param: u8,
}

impl T4ATSelectCommand {
    /// Build a select command from a header, stamping technology, protocol
    /// and packet type
    pub fn from_header(header: RfHeader, param: u8) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            param,
        }
    }
}

impl RfVariant for T4ATSelectCommand {
    const NAME: &'static str = "T4ATSelectCommand";
    const CONSTRAINTS: Constraints = Constraints {
        technology: Some(Technology::NfcA),
        protocol: Some(Protocol::IsoDep),
        packet_type: Some(PacketType::SelectCommand),
    };

    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let param = body.read_u8()?;
        Ok(Self::from_header(*header, param))
    }

    fn write_body(&self, writer: &mut FieldWriter) {
        writer.put_u8(self.param);
    }

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, Technology::NfcA, Protocol::IsoDep)
    }

    fn body_size(&self) -> usize {
        1
    }
}

/// Answer to a Type 4A select (ATS)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct T4ATSelectResponse {
    pub sender: u16,
    pub receiver: u16,
    pub rats_response: Vec<u8>,
}

impl T4ATSelectResponse {
    /// Build a select response from a header, stamping technology, protocol
    /// and packet type
    pub fn from_header(header: RfHeader, rats_response: Vec<u8>) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            rats_response,
        }
    }
}

impl RfVariant for T4ATSelectResponse {
    const NAME: &'static str = "T4ATSelectResponse";
    const CONSTRAINTS: Constraints = Constraints {
        technology: Some(Technology::NfcA),
        protocol: Some(Protocol::IsoDep),
        packet_type: Some(PacketType::SelectResponse),
    };

    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let rats_response = body.read_prefixed_bytes()?;
        Ok(Self::from_header(*header, rats_response))
    }

    fn write_body(&self, writer: &mut FieldWriter) {
        writer.put_prefixed_bytes("T4ATSelectResponse::rats_response", &self.rats_response);
    }

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, Technology::NfcA, Protocol::IsoDep)
    }

    fn body_size(&self) -> usize {
        prefixed_size(self.rats_response.len())
    }
}

/// NFC-DEP select (ATR_REQ)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NfcDepSelectCommand {
    pub sender: u16,
    pub receiver: u16,
    pub technology: Technology,
    /// Length reduction, two bits wide
    pub lr: u8,
}

impl NfcDepSelectCommand {
    /// Build a select command from a header, stamping protocol and packet type
    pub fn from_header(header: RfHeader, lr: u8) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            technology: header.technology,
            lr,
        }
    }
}

impl RfVariant for NfcDepSelectCommand {
    const NAME: &'static str = "NfcDepSelectCommand";
    const CONSTRAINTS: Constraints = Constraints {
        technology: None,
        protocol: Some(Protocol::NfcDep),
        packet_type: Some(PacketType::SelectCommand),
    };

    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let [lr] = body.read_packed([LR])?;
        Ok(Self::from_header(*header, lr))
    }

    fn write_body(&self, writer: &mut FieldWriter) {
        writer.put_packed(&[("NfcDepSelectCommand::lr", u64::from(self.lr), LR)]);
    }

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, self.technology, Protocol::NfcDep)
    }

    fn body_size(&self) -> usize {
        1
    }
}

/// Answer to an NFC-DEP select (ATR_RES)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NfcDepSelectResponse {
    pub sender: u16,
    pub receiver: u16,
    pub technology: Technology,
    pub atr_response: Vec<u8>,
}

impl NfcDepSelectResponse {
    /// Build a select response from a header, stamping protocol and packet type
    pub fn from_header(header: RfHeader, atr_response: Vec<u8>) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            technology: header.technology,
            atr_response,
        }
    }
}

impl RfVariant for NfcDepSelectResponse {
    const NAME: &'static str = "NfcDepSelectResponse";
    const CONSTRAINTS: Constraints = Constraints {
        technology: None,
        protocol: Some(Protocol::NfcDep),
        packet_type: Some(PacketType::SelectResponse),
    };

    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let atr_response = body.read_prefixed_bytes()?;
        Ok(Self::from_header(*header, atr_response))
    }

    fn write_body(&self, writer: &mut FieldWriter) {
        writer.put_prefixed_bytes("NfcDepSelectResponse::atr_response", &self.atr_response);
    }

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, self.technology, Protocol::NfcDep)
    }

    fn body_size(&self) -> usize {
        prefixed_size(self.atr_response.len())
    }
}

/// Select command not matching a more specific shape
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectCommand {
    pub sender: u16,
    pub receiver: u16,
    pub technology: Technology,
    pub protocol: Protocol,
}

impl SelectCommand {
    /// Build a select command from a header, stamping the packet type
    pub fn from_header(header: RfHeader) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            technology: header.technology,
            protocol: header.protocol,
        }
    }
}

impl RfVariant for SelectCommand {
    const NAME: &'static str = "SelectCommand";
    const CONSTRAINTS: Constraints = Constraints {
        technology: None,
        protocol: None,
        packet_type: Some(PacketType::SelectCommand),
    };

    fn parse_body(header: &RfHeader, _body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self::from_header(*header))
    }

    fn write_body(&self, _writer: &mut FieldWriter) {}

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, self.technology, self.protocol)
    }

    fn body_size(&self) -> usize {
        0
    }
}

/// End of an active session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeactivateNotification {
    pub sender: u16,
    pub receiver: u16,
    pub technology: Technology,
    pub protocol: Protocol,
    pub type_: DeactivateType,
    pub reason: DeactivateReason,
}

impl DeactivateNotification {
    /// Build a notification from a header, stamping the packet type
    pub fn from_header(
        header: RfHeader,
        type_: DeactivateType,
        reason: DeactivateReason,
    ) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            technology: header.technology,
            protocol: header.protocol,
            type_,
            reason,
        }
    }
}

impl RfVariant for DeactivateNotification {
    const NAME: &'static str = "DeactivateNotification";
    const CONSTRAINTS: Constraints = Constraints {
        technology: None,
        protocol: None,
        packet_type: Some(PacketType::DeactivateNotification),
    };

    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        let type_ = body.read_enum()?;
        let reason = body.read_enum()?;
        Ok(Self::from_header(*header, type_, reason))
    }

    fn write_body(&self, writer: &mut FieldWriter) {
        writer.put_enum(self.type_);
        writer.put_enum(self.reason);
    }

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, self.technology, self.protocol)
    }

    fn body_size(&self) -> usize {
        2
    }
}

/// Application data exchanged during an active session
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Data {
    pub sender: u16,
    pub receiver: u16,
    pub technology: Technology,
    pub protocol: Protocol,
    pub data: Vec<u8>,
}

impl Data {
    /// Build a data packet from a header, stamping the packet type
    pub fn from_header(header: RfHeader, data: Vec<u8>) -> Self {
        Self {
            sender: header.sender,
            receiver: header.receiver,
            technology: header.technology,
            protocol: header.protocol,
            data,
        }
    }
}

impl RfVariant for Data {
    const NAME: &'static str = "Data";
    const CONSTRAINTS: Constraints = Constraints {
        technology: None,
        protocol: None,
        packet_type: Some(PacketType::Data),
    };

    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self::from_header(*header, body.read_rest()))
    }

    fn write_body(&self, writer: &mut FieldWriter) {
        writer.put_bytes(&self.data);
    }

    fn header(&self) -> RfHeader {
        stamped::<Self>(self.sender, self.receiver, self.technology, self.protocol)
    }

    fn body_size(&self) -> usize {
        self.data.len()
    }
}

/// Packet no concrete variant accepted; the body is kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawPacket {
    pub header: RfHeader,
    pub body: Vec<u8>,
}

impl RfVariant for RawPacket {
    const NAME: &'static str = "RfPacket";
    const CONSTRAINTS: Constraints = Constraints::NONE;

    fn parse_body(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            header: *header,
            body: body.read_rest(),
        })
    }

    fn write_body(&self, writer: &mut FieldWriter) {
        writer.put_bytes(&self.body);
    }

    fn header(&self) -> RfHeader {
        self.header
    }

    fn body_size(&self) -> usize {
        self.body.len()
    }
}
