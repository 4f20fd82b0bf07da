//! Length-prefixed RF frame transport
//!
//! # Wire Format
//! ```text
//! length:u16 (little-endian) | packet[length]
//! ```
//!
//! [`RfReader`] and [`RfWriter`] wrap the two halves of a stream connection.
//! Reading goes through a [`FrameDecoder`] so that a read cancelled by a
//! timeout never loses bytes already received.

use std::io;

use rf_protocol::RfPacket;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tracing::debug;

use crate::error::DeviceError;

/// Size of the frame length prefix
pub const LENGTH_PREFIX_SIZE: usize = 2;

/// Largest frame the length prefix can describe
pub const MAX_FRAME_LEN: usize = u16::MAX as usize;

const READ_CHUNK: usize = 1024;

/// Streaming frame reassembler
///
/// Accepts bytes in arbitrary chunks and yields complete frames, without
/// their length prefix, in arrival order.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes
    pub fn push_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Take the next complete frame, if one has been fully received
    pub fn next_frame(&mut self) -> Option<Vec<u8>> {
        if self.buffer.len() < LENGTH_PREFIX_SIZE {
            return None;
        }
        let len = usize::from(u16::from_le_bytes([self.buffer[0], self.buffer[1]]));
        let end = LENGTH_PREFIX_SIZE + len;
        if self.buffer.len() < end {
            return None;
        }

        let frame = self.buffer[LENGTH_PREFIX_SIZE..end].to_vec();
        self.buffer.drain(..end);
        Some(frame)
    }

    /// Number of buffered bytes not yet returned as a frame
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

/// Prefix `frame` with its length
pub fn encode_frame(frame: &[u8]) -> Result<Vec<u8>, DeviceError> {
    let len = u16::try_from(frame.len())
        .map_err(|_| DeviceError::FrameTooLarge { len: frame.len() })?;
    let mut bytes = Vec::with_capacity(LENGTH_PREFIX_SIZE + frame.len());
    bytes.extend_from_slice(&len.to_le_bytes());
    bytes.extend_from_slice(frame);
    Ok(bytes)
}

/// Reading half of an RF connection
#[derive(Debug)]
pub struct RfReader<R> {
    inner: R,
    decoder: FrameDecoder,
}

impl<R: AsyncRead + Unpin> RfReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            decoder: FrameDecoder::new(),
        }
    }

    /// Read the next frame
    ///
    /// Cancel safe: if the future is dropped before completing, no received
    /// byte is lost and the next call picks up where this one stopped.
    pub async fn read_frame(&mut self) -> Result<Vec<u8>, DeviceError> {
        let mut buf = [0u8; READ_CHUNK];
        loop {
            if let Some(frame) = self.decoder.next_frame() {
                return Ok(frame);
            }

            let n = self.inner.read(&mut buf).await?;
            if n == 0 {
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed by peer",
                )
                .into());
            }
            self.decoder.push_bytes(&buf[..n]);
        }
    }

    /// Read and decode the next packet
    ///
    /// A frame that does not decode is returned as an error; the connection
    /// should not be used after that.
    pub async fn read_packet(&mut self) -> Result<RfPacket, DeviceError> {
        let frame = self.read_frame().await?;
        let packet = RfPacket::decode(&frame)?;
        debug!("RF rx: {}", packet);
        Ok(packet)
    }
}

/// Writing half of an RF connection
#[derive(Debug)]
pub struct RfWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> RfWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Write one frame and flush it
    pub async fn write_frame(&mut self, frame: &[u8]) -> Result<(), DeviceError> {
        let bytes = encode_frame(frame)?;
        self.inner.write_all(&bytes).await?;
        self.inner.flush().await?;
        Ok(())
    }

    /// Encode and write one packet
    pub async fn write_packet(&mut self, packet: &RfPacket) -> Result<(), DeviceError> {
        debug!("RF tx: {}", packet);
        self.write_frame(&packet.encode()).await
    }
}

/// Split a bidirectional stream into an RF reader and writer
pub fn split<S>(stream: S) -> (RfReader<ReadHalf<S>>, RfWriter<WriteHalf<S>>)
where
    S: AsyncRead + AsyncWrite,
{
    let (read_half, write_half) = tokio::io::split(stream);
    (RfReader::new(read_half), RfWriter::new(write_half))
}
