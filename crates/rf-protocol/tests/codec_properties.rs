//! Integration tests for the RF packet codec
//!
//! These tests verify:
//! - Round trip of every concrete variant over its valid field ranges
//! - Dispatch priority between overlapping variants
//! - Length prefix boundaries and trailing data handling
//! - Truncation diagnostics on encode

use proptest::prelude::*;
use rf_protocol::{
    CodecError, Data, DeactivateNotification, DeactivateReason, DeactivateType,
    NfcAPollResponse, NfcDepSelectCommand, NfcDepSelectResponse, PacketType, PollCommand,
    Protocol, RawPacket, RfHeader, RfPacket, RfVariant, SelectCommand, T4ATSelectCommand,
    T4ATSelectResponse, Technology, HEADER_SIZE,
};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Encode a raw header followed by `body`
    pub fn frame(header: RfHeader, body: &[u8]) -> Vec<u8> {
        RfPacket::from(RawPacket {
            header,
            body: body.to_vec(),
        })
        .encode()
    }

    pub fn select_header(technology: Technology, protocol: Protocol) -> RfHeader {
        RfHeader {
            sender: 0x0001,
            receiver: 0x0002,
            technology,
            protocol,
            packet_type: PacketType::SelectCommand,
        }
    }
}

// ============================================================================
// Dispatch Priority
// ============================================================================

#[test]
fn t4at_select_preferred_over_generic_select() {
    let bytes = helpers::frame(
        helpers::select_header(Technology::NfcA, Protocol::IsoDep),
        &[0x00],
    );
    let packet = RfPacket::decode(&bytes).unwrap();
    assert_eq!(
        packet,
        RfPacket::T4ATSelectCommand(T4ATSelectCommand {
            sender: 1,
            receiver: 2,
            param: 0
        })
    );
}

#[test]
fn nfc_dep_select_preferred_over_generic_select() {
    let bytes = helpers::frame(
        helpers::select_header(Technology::NfcF, Protocol::NfcDep),
        &[0x02],
    );
    assert!(matches!(
        RfPacket::decode(&bytes).unwrap(),
        RfPacket::NfcDepSelectCommand(NfcDepSelectCommand {
            technology: Technology::NfcF,
            lr: 2,
            ..
        })
    ));
}

#[test]
fn generic_select_with_body_is_trailing_data() {
    // Only the generic select matches; it consumes no body bytes
    let bytes = helpers::frame(
        helpers::select_header(Technology::NfcB, Protocol::T2t),
        &[0x01],
    );
    assert_eq!(
        RfPacket::decode(&bytes),
        Err(CodecError::TrailingData { remaining: 1 })
    );
}

#[test]
fn poll_command_nine_bytes_is_trailing_data() {
    let header = RfHeader {
        packet_type: PacketType::PollCommand,
        ..Default::default()
    };
    let bytes = helpers::frame(header, &[0x00, 0x00]);
    assert_eq!(bytes.len(), 9);
    assert_eq!(
        RfPacket::decode(&bytes),
        Err(CodecError::TrailingData { remaining: 2 })
    );
}

#[test]
fn unknown_packet_type_is_fatal() {
    let bytes = [0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x06];
    assert_eq!(
        RfPacket::decode(&bytes),
        Err(CodecError::UnrecognizedEnumValue {
            field: "PacketType",
            value: 6
        })
    );
}

// ============================================================================
// Length Prefix Boundaries
// ============================================================================

#[test]
fn empty_rats_response() {
    let header = T4ATSelectResponse::default().header();
    let bytes = helpers::frame(header, &[0x00]);
    match RfPacket::decode(&bytes).unwrap() {
        RfPacket::T4ATSelectResponse(response) => assert!(response.rats_response.is_empty()),
        other => panic!("expected select response, got {:?}", other),
    }
}

#[test]
fn full_length_atr_response() {
    let header = NfcDepSelectResponse::default().header();
    let mut body = vec![0xFF];
    body.extend(std::iter::repeat(0x5A).take(255));
    let bytes = helpers::frame(header, &body);
    match RfPacket::decode(&bytes).unwrap() {
        RfPacket::NfcDepSelectResponse(response) => {
            assert_eq!(response.atr_response, vec![0x5A; 255])
        }
        other => panic!("expected NFC-DEP select response, got {:?}", other),
    }
}

#[test]
fn prefix_exceeding_body_falls_back_to_raw() {
    let header = T4ATSelectResponse::default().header();
    let bytes = helpers::frame(header, &[0x05, 0x01, 0x02]);
    match RfPacket::decode(&bytes).unwrap() {
        RfPacket::Raw(raw) => {
            assert_eq!(raw.header, header);
            assert_eq!(raw.body, vec![0x05, 0x01, 0x02]);
        }
        other => panic!("expected raw packet, got {:?}", other),
    }
}

// ============================================================================
// Truncation
// ============================================================================

#[test]
fn oversized_rats_response_is_cut_and_reported() {
    let packet = RfPacket::from(T4ATSelectResponse {
        sender: 1,
        receiver: 2,
        rats_response: vec![0x11; 300],
    });
    let (bytes, diagnostics) = packet.encode_with_diagnostics();
    assert_eq!(bytes.len(), HEADER_SIZE + 256);
    assert_eq!(bytes.len(), packet.size());
    assert_eq!(
        diagnostics,
        vec![CodecError::ValueTruncated {
            field: "T4ATSelectResponse::rats_response",
            value: 300,
            max: 255
        }]
    );
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;

    const NON_NFC_A: &[Technology] = &[Technology::NfcB, Technology::NfcF, Technology::NfcV];

    fn technology() -> impl Strategy<Value = Technology> {
        prop::sample::select(Technology::ALL)
    }

    fn protocol() -> impl Strategy<Value = Protocol> {
        prop::sample::select(Protocol::ALL)
    }

    fn bytes(max: usize) -> impl Strategy<Value = Vec<u8>> {
        prop::collection::vec(any::<u8>(), 0..=max)
    }

    fn concrete_packet() -> impl Strategy<Value = RfPacket> {
        prop_oneof![
            (any::<u16>(), any::<u16>(), technology(), protocol()).prop_map(
                |(sender, receiver, technology, protocol)| {
                    RfPacket::from(PollCommand {
                        sender,
                        receiver,
                        technology,
                        protocol,
                    })
                }
            ),
            (any::<u16>(), any::<u16>(), protocol(), bytes(255), 0u8..4, any::<u8>()).prop_map(
                |(sender, receiver, protocol, nfcid1, int_protocol, bit_frame_sdd)| {
                    RfPacket::from(NfcAPollResponse {
                        sender,
                        receiver,
                        protocol,
                        nfcid1,
                        int_protocol,
                        bit_frame_sdd,
                    })
                }
            ),
            (any::<u16>(), any::<u16>(), any::<u8>()).prop_map(|(sender, receiver, param)| {
                RfPacket::from(T4ATSelectCommand {
                    sender,
                    receiver,
                    param,
                })
            }),
            (any::<u16>(), any::<u16>(), bytes(255)).prop_map(|(sender, receiver, rats_response)| {
                RfPacket::from(T4ATSelectResponse {
                    sender,
                    receiver,
                    rats_response,
                })
            }),
            (any::<u16>(), any::<u16>(), technology(), 0u8..4).prop_map(
                |(sender, receiver, technology, lr)| {
                    RfPacket::from(NfcDepSelectCommand {
                        sender,
                        receiver,
                        technology,
                        lr,
                    })
                }
            ),
            (any::<u16>(), any::<u16>(), technology(), bytes(255)).prop_map(
                |(sender, receiver, technology, atr_response)| {
                    RfPacket::from(NfcDepSelectResponse {
                        sender,
                        receiver,
                        technology,
                        atr_response,
                    })
                }
            ),
            (any::<u16>(), any::<u16>(), technology(), protocol()).prop_map(
                |(sender, receiver, technology, protocol)| {
                    RfPacket::from(SelectCommand {
                        sender,
                        receiver,
                        technology,
                        protocol,
                    })
                }
            ),
            (
                any::<u16>(),
                any::<u16>(),
                technology(),
                protocol(),
                prop::sample::select(DeactivateType::ALL),
                prop::sample::select(DeactivateReason::ALL)
            )
                .prop_map(|(sender, receiver, technology, protocol, type_, reason)| {
                    RfPacket::from(DeactivateNotification {
                        sender,
                        receiver,
                        technology,
                        protocol,
                        type_,
                        reason,
                    })
                }),
            (any::<u16>(), any::<u16>(), technology(), protocol(), bytes(512)).prop_map(
                |(sender, receiver, technology, protocol, data)| {
                    RfPacket::from(Data {
                        sender,
                        receiver,
                        technology,
                        protocol,
                        data,
                    })
                }
            ),
        ]
    }

    proptest! {
        #[test]
        fn concrete_variants_roundtrip(packet in concrete_packet()) {
            let (bytes, diagnostics) = packet.encode_with_diagnostics();
            prop_assert!(diagnostics.is_empty());
            prop_assert_eq!(bytes.len(), packet.size());
            prop_assert_eq!(RfPacket::decode(&bytes).unwrap(), packet);
        }

        #[test]
        fn unmatched_poll_response_is_kept_raw(
            technology in prop::sample::select(NON_NFC_A),
            protocol in protocol(),
            body in bytes(64),
        ) {
            let header = RfHeader {
                sender: 9,
                receiver: 10,
                technology,
                protocol,
                packet_type: PacketType::PollResponse,
            };
            let raw = RawPacket { header, body };
            let decoded = RfPacket::decode(&RfPacket::from(raw.clone()).encode()).unwrap();
            prop_assert_eq!(decoded, RfPacket::Raw(raw));
        }

        #[test]
        fn iso_dep_select_with_param_is_t4at(param: u8, sender: u16, receiver: u16) {
            let header = RfHeader {
                sender,
                receiver,
                technology: Technology::NfcA,
                protocol: Protocol::IsoDep,
                packet_type: PacketType::SelectCommand,
            };
            let decoded = RfPacket::decode(&helpers::frame(header, &[param])).unwrap();
            prop_assert_eq!(
                decoded,
                RfPacket::T4ATSelectCommand(T4ATSelectCommand { sender, receiver, param })
            );
        }

        #[test]
        fn decode_never_panics(data in bytes(64)) {
            let _ = RfPacket::decode(&data);
        }

        #[test]
        fn int_protocol_out_of_range_is_masked(int_protocol in 4u8..=255) {
            let packet = RfPacket::from(NfcAPollResponse {
                int_protocol,
                ..Default::default()
            });
            let (bytes, diagnostics) = packet.encode_with_diagnostics();
            prop_assert_eq!(diagnostics.len(), 1);
            match RfPacket::decode(&bytes).unwrap() {
                RfPacket::NfcAPollResponse(response) => {
                    prop_assert_eq!(response.int_protocol, int_protocol & 0b11);
                }
                other => prop_assert!(false, "unexpected packet {:?}", other),
            }
        }
    }
}
