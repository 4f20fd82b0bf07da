//! Field encoding primitives
//!
//! Low-level readers and writers for the scalar, bit-packed and variable
//! length fields that make up RF packet bodies. Nothing in here knows about
//! packet semantics.
//!
//! # Encoding rules
//!
//! - Unsigned integers are little-endian, 1 or 2 bytes wide.
//! - Sub-byte fields share one byte and are placed with shift/mask.
//! - Variable byte sequences carry a one byte element count (0-255).
//! - A "rest" field consumes every remaining byte and must come last.
//!
//! Values that do not fit their wire width are masked on encode and
//! reported as [`CodecError::ValueTruncated`] rather than failing.

use tracing::warn;

use crate::error::CodecError;

/// Maximum element count of a length-prefixed byte sequence
pub const MAX_PREFIXED_LEN: usize = u8::MAX as usize;

/// Position and width of a sub-byte field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitField {
    /// Bit offset of the least significant bit
    pub shift: u8,
    /// Number of bits
    pub width: u8,
}

impl BitField {
    /// Create a field occupying bits `[shift, shift + width)`
    pub const fn new(shift: u8, width: u8) -> Self {
        Self { shift, width }
    }

    /// Mask of the field value before shifting
    pub const fn mask(self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    /// Largest value the field can hold
    pub const fn max(self) -> u64 {
        self.mask() as u64
    }

    /// Extract the field value from a packed byte
    pub fn extract(self, byte: u8) -> u8 {
        (byte >> self.shift) & self.mask()
    }

    /// Combine a field value into a packed byte
    pub fn insert(self, byte: u8, value: u8) -> u8 {
        byte | ((value & self.mask()) << self.shift)
    }
}

/// Bounds-checked cursor over a packet body
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    /// Create a reader positioned at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Number of bytes consumed so far
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Number of bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Returns true when every byte has been consumed
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if n > self.remaining() {
            return Err(CodecError::InsufficientData {
                needed: n,
                available: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Read a single byte
    pub fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    /// Read a little-endian `u16`
    pub fn read_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    /// Read a one byte enumeration
    pub fn read_enum<T>(&mut self) -> Result<T, CodecError>
    where
        T: TryFrom<u8, Error = CodecError>,
    {
        T::try_from(self.read_u8()?)
    }

    /// Read one byte and split it into the given sub-byte fields
    pub fn read_packed<const N: usize>(
        &mut self,
        fields: [BitField; N],
    ) -> Result<[u8; N], CodecError> {
        let byte = self.read_u8()?;
        Ok(fields.map(|field| field.extract(byte)))
    }

    /// Read a byte sequence preceded by its one byte element count
    pub fn read_prefixed_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let count = self.read_u8()? as usize;
        Ok(self.take(count)?.to_vec())
    }

    /// Consume every remaining byte
    pub fn read_rest(&mut self) -> Vec<u8> {
        let rest = self.data[self.pos..].to_vec();
        self.pos = self.data.len();
        rest
    }
}

/// Growable writer for packet bytes
///
/// Collects truncation diagnostics alongside the encoded bytes; each one is
/// also logged when it occurs.
#[derive(Debug, Default)]
pub struct FieldWriter {
    buf: Vec<u8>,
    diagnostics: Vec<CodecError>,
}

impl FieldWriter {
    /// Create an empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty writer with room for `capacity` bytes
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            diagnostics: Vec::new(),
        }
    }

    /// Truncation diagnostics reported so far
    pub fn diagnostics(&self) -> &[CodecError] {
        &self.diagnostics
    }

    /// Consume the writer, returning the bytes and the diagnostics
    pub fn finish(self) -> (Vec<u8>, Vec<CodecError>) {
        (self.buf, self.diagnostics)
    }

    fn report(&mut self, field: &'static str, value: u64, max: u64) {
        let err = CodecError::ValueTruncated { field, value, max };
        warn!("{}", err);
        self.diagnostics.push(err);
    }

    fn truncate(&mut self, field: &'static str, value: u64, max: u64) -> u64 {
        if value <= max {
            return value;
        }
        self.report(field, value, max);
        value & max
    }

    /// Write an unsigned integer `width` bytes wide (little-endian)
    ///
    /// The value is masked to the field width; an out of range value is
    /// reported as a diagnostic.
    pub fn put_uint(&mut self, field: &'static str, value: u64, width: usize) {
        let width = width.min(8);
        let max = if width == 8 {
            u64::MAX
        } else {
            (1u64 << (width * 8)) - 1
        };
        let value = self.truncate(field, value, max);
        self.buf.extend_from_slice(&value.to_le_bytes()[..width]);
    }

    /// Write a single byte
    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a one byte enumeration
    pub fn put_enum<T: Into<u8>>(&mut self, value: T) {
        self.buf.push(value.into());
    }

    /// Pack several sub-byte fields into one byte
    ///
    /// Bits not covered by any field are written as zero.
    pub fn put_packed(&mut self, fields: &[(&'static str, u64, BitField)]) {
        let mut byte = 0u8;
        for &(name, value, field) in fields {
            let value = self.truncate(name, value, field.max());
            byte = field.insert(byte, value as u8);
        }
        self.buf.push(byte);
    }

    /// Write a byte sequence preceded by its one byte element count
    ///
    /// Sequences longer than 255 elements are cut to the first 255 and
    /// reported as a diagnostic.
    pub fn put_prefixed_bytes(&mut self, field: &'static str, bytes: &[u8]) {
        let count = bytes.len().min(MAX_PREFIXED_LEN);
        if count < bytes.len() {
            self.report(field, bytes.len() as u64, MAX_PREFIXED_LEN as u64);
        }
        self.buf.push(count as u8);
        self.buf.extend_from_slice(&bytes[..count]);
    }

    /// Write raw bytes with no prefix
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Encoded size of a length-prefixed sequence of `len` elements
pub fn prefixed_size(len: usize) -> usize {
    1 + len.min(MAX_PREFIXED_LEN)
}
