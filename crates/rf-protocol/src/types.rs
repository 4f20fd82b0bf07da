//! Wire enumerations
//!
//! Every enumeration is one byte on the wire. Values outside the defined set
//! fail to decode with [`CodecError::UnrecognizedEnumValue`].

use crate::error::CodecError;

/// Declares a one byte wire enumeration with its `TryFrom<u8>`/`Into<u8>`
/// conversions and the list of all defined values.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal,
            )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        #[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
        #[repr(u8)]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )+
        }

        impl $name {
            /// Every defined value, in wire order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];
        }

        impl TryFrom<u8> for $name {
            type Error = CodecError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $($value => Ok(Self::$variant),)+
                    _ => Err(CodecError::UnrecognizedEnumValue {
                        field: stringify!($name),
                        value,
                    }),
                }
            }
        }

        impl From<$name> for u8 {
            fn from(value: $name) -> u8 {
                value as u8
            }
        }
    };
}

wire_enum! {
    /// RF technology of the link
    pub enum Technology {
        #[default]
        NfcA = 0x00,
        NfcB = 0x01,
        NfcF = 0x02,
        NfcV = 0x03,
    }
}

wire_enum! {
    /// Protocol running over the RF technology
    pub enum Protocol {
        #[default]
        Undetermined = 0x00,
        T1t = 0x01,
        T2t = 0x02,
        T3t = 0x03,
        IsoDep = 0x04,
        NfcDep = 0x05,
        T5t = 0x06,
        Ndef = 0x07,
    }
}

wire_enum! {
    /// Kind of RF packet, the main dispatch discriminant
    pub enum PacketType {
        #[default]
        Data = 0x00,
        PollCommand = 0x01,
        PollResponse = 0x02,
        SelectCommand = 0x03,
        SelectResponse = 0x04,
        DeactivateNotification = 0x05,
    }
}

wire_enum! {
    /// State the deactivated device moves to
    pub enum DeactivateType {
        #[default]
        IdleMode = 0x00,
        SleepMode = 0x01,
        SleepAfMode = 0x02,
        Discovery = 0x03,
    }
}

wire_enum! {
    /// Why a session was deactivated
    pub enum DeactivateReason {
        #[default]
        DhRequest = 0x00,
        EndpointRequest = 0x01,
        RfLinkLoss = 0x02,
        NfcBBadAfi = 0x03,
        DhRequestFailed = 0x04,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_values() {
        assert_eq!(u8::from(Technology::NfcV), 3);
        assert_eq!(u8::from(Protocol::IsoDep), 4);
        assert_eq!(u8::from(Protocol::NfcDep), 5);
        assert_eq!(u8::from(PacketType::DeactivateNotification), 5);
        assert_eq!(u8::from(DeactivateReason::DhRequestFailed), 4);
    }

    #[test]
    fn test_try_from_roundtrip() {
        for &protocol in Protocol::ALL {
            assert_eq!(Protocol::try_from(u8::from(protocol)), Ok(protocol));
        }
        for &packet_type in PacketType::ALL {
            assert_eq!(PacketType::try_from(u8::from(packet_type)), Ok(packet_type));
        }
    }

    #[test]
    fn test_unrecognized_values() {
        assert_eq!(
            Technology::try_from(4),
            Err(CodecError::UnrecognizedEnumValue {
                field: "Technology",
                value: 4
            })
        );
        assert!(Protocol::try_from(8).is_err());
        assert!(PacketType::try_from(6).is_err());
        assert!(DeactivateType::try_from(0xFF).is_err());
        assert!(DeactivateReason::try_from(5).is_err());
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Technology::default(), Technology::NfcA);
        assert_eq!(Protocol::default(), Protocol::Undetermined);
        assert_eq!(PacketType::default(), PacketType::Data);
    }
}
