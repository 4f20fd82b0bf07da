//! Variant dispatch
//!
//! Several variants accept overlapping headers (a `T4ATSelectCommand` header
//! is also a valid `SelectCommand` header), so the order in which candidates
//! are tried decides the result. [`DISPATCH_ORDER`] is that order.
//!
//! A candidate is skipped when its required header fields do not hold, or
//! when its body fails to decode. Neither is an error: the next candidate is
//! tried, and [`RawPacket`] accepts whatever is left.

use tracing::trace;

use crate::error::CodecError;
use crate::fields::FieldReader;
use crate::header::{Constraints, RfHeader};
use crate::packets::{
    Data, DeactivateNotification, NfcAPollResponse, NfcDepSelectCommand, NfcDepSelectResponse,
    PollCommand, RawPacket, RfVariant, SelectCommand, T4ATSelectCommand, T4ATSelectResponse,
};
use crate::RfPacket;

type Attempt = fn(&RfHeader, &mut FieldReader<'_>) -> Result<RfPacket, CodecError>;

/// One entry of the dispatch order
#[derive(Clone, Copy)]
pub struct Candidate {
    /// Variant name
    pub name: &'static str,
    /// Header fields the variant requires
    pub constraints: Constraints,
    attempt: Attempt,
}

impl std::fmt::Debug for Candidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Candidate")
            .field("name", &self.name)
            .field("constraints", &self.constraints)
            .finish()
    }
}

fn attempt<V>(header: &RfHeader, body: &mut FieldReader<'_>) -> Result<RfPacket, CodecError>
where
    V: RfVariant + Into<RfPacket>,
{
    V::parse_body(header, body).map(Into::into)
}

macro_rules! candidate {
    ($variant:ty) => {
        Candidate {
            name: <$variant as RfVariant>::NAME,
            constraints: <$variant as RfVariant>::CONSTRAINTS,
            attempt: attempt::<$variant>,
        }
    };
}

/// Concrete variants in decode priority order
///
/// The generic [`RawPacket`] fallback is not listed; it is used when every
/// candidate here is rejected.
pub const DISPATCH_ORDER: [Candidate; 9] = [
    candidate!(PollCommand),
    candidate!(NfcAPollResponse),
    candidate!(T4ATSelectCommand),
    candidate!(T4ATSelectResponse),
    candidate!(NfcDepSelectCommand),
    candidate!(NfcDepSelectResponse),
    candidate!(SelectCommand),
    candidate!(DeactivateNotification),
    candidate!(Data),
];

/// Select the variant for `header` and decode `body` with it
///
/// Returns the packet and the number of body bytes it consumed. Never fails:
/// the generic fallback accepts any body.
pub fn dispatch(header: &RfHeader, body: &[u8]) -> (RfPacket, usize) {
    for candidate in &DISPATCH_ORDER {
        if !candidate.constraints.matches(header) {
            continue;
        }

        let mut reader = FieldReader::new(body);
        match (candidate.attempt)(header, &mut reader) {
            Ok(packet) => return (packet, reader.position()),
            Err(e) => {
                trace!("{} rejected body: {}", candidate.name, e);
            }
        }
    }

    let mut reader = FieldReader::new(body);
    let raw = RawPacket {
        header: *header,
        body: reader.read_rest(),
    };
    (RfPacket::Raw(raw), reader.position())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PacketType, Protocol, Technology};

    fn select_header(technology: Technology, protocol: Protocol) -> RfHeader {
        RfHeader {
            sender: 1,
            receiver: 2,
            technology,
            protocol,
            packet_type: PacketType::SelectCommand,
        }
    }

    #[test]
    fn test_dispatch_order_names() {
        let names: Vec<_> = DISPATCH_ORDER.iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            [
                "PollCommand",
                "NfcAPollResponse",
                "T4ATSelectCommand",
                "T4ATSelectResponse",
                "NfcDepSelectCommand",
                "NfcDepSelectResponse",
                "SelectCommand",
                "DeactivateNotification",
                "Data",
            ]
        );
    }

    #[test]
    fn test_specific_select_wins_over_generic() {
        let header = select_header(Technology::NfcA, Protocol::IsoDep);
        let (packet, consumed) = dispatch(&header, &[0x50]);
        assert_eq!(consumed, 1);
        assert!(matches!(
            packet,
            RfPacket::T4ATSelectCommand(T4ATSelectCommand { param: 0x50, .. })
        ));
    }

    #[test]
    fn test_failed_body_falls_through_to_generic_select() {
        // ISO-DEP select header with no param byte
        let header = select_header(Technology::NfcA, Protocol::IsoDep);
        let (packet, consumed) = dispatch(&header, &[]);
        assert_eq!(consumed, 0);
        assert!(matches!(packet, RfPacket::SelectCommand(_)));
    }

    #[test]
    fn test_generic_select_leaves_body_unconsumed() {
        let header = select_header(Technology::NfcB, Protocol::T2t);
        let (packet, consumed) = dispatch(&header, &[0xAA, 0xBB]);
        assert!(matches!(packet, RfPacket::SelectCommand(_)));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn test_nfc_dep_select_on_nfc_a() {
        let header = select_header(Technology::NfcA, Protocol::NfcDep);
        let (packet, _) = dispatch(&header, &[0x03]);
        assert!(matches!(
            packet,
            RfPacket::NfcDepSelectCommand(NfcDepSelectCommand { lr: 3, .. })
        ));
    }

    #[test]
    fn test_poll_response_on_other_technology_is_raw() {
        let header = RfHeader {
            technology: Technology::NfcB,
            packet_type: PacketType::PollResponse,
            ..Default::default()
        };
        let (packet, consumed) = dispatch(&header, &[0x01, 0x02]);
        assert_eq!(consumed, 2);
        match packet {
            RfPacket::Raw(raw) => {
                assert_eq!(raw.header, header);
                assert_eq!(raw.body, vec![0x01, 0x02]);
            }
            other => panic!("expected raw packet, got {:?}", other),
        }
    }

    #[test]
    fn test_bad_deactivate_body_is_raw() {
        let header = RfHeader {
            packet_type: PacketType::DeactivateNotification,
            ..Default::default()
        };
        let (packet, _) = dispatch(&header, &[0x07, 0x00]);
        assert!(matches!(packet, RfPacket::Raw(_)));
    }
}
