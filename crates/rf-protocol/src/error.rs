//! Error types for RF packet parsing and encoding

use thiserror::Error;

/// Errors that can occur while decoding or encoding RF packets
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer bytes available than a field or packet requires
    #[error("insufficient data: need {needed} bytes, {available} available")]
    InsufficientData { needed: usize, available: usize },

    /// A byte does not map to any enumerator of the field's type
    #[error("unrecognized value 0x{value:02X} for {field}")]
    UnrecognizedEnumValue { field: &'static str, value: u8 },

    /// Bytes remain after a complete top-level decode
    #[error("unexpected trailing data: {remaining} bytes left after decoding")]
    TrailingData { remaining: usize },

    /// A field value exceeded its wire width and was masked on encode
    ///
    /// This is a diagnostic, not a failure: encoding proceeds with the
    /// masked value.
    #[error("invalid value for {field}: {value} > {max}; the value was truncated")]
    ValueTruncated {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

impl CodecError {
    /// Returns true for diagnostics that do not abort an encode
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, CodecError::ValueTruncated { .. })
    }
}
