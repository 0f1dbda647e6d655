// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Minimal deterministic codec helpers (length-prefixed, LE scalars).

use core::str;
use thiserror::Error;

/// Errors produced by the wire codecs.
///
/// The variants are stable and map one-to-one onto the engine's numeric
/// error codes at the boundary.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum WireError {
    /// The buffer did not start with the expected magic.
    #[error("invalid magic")]
    InvalidMagic,
    /// The format version is not the current one.
    #[error("unsupported version {0}")]
    UnsupportedVersion(u32),
    /// A read ran past the end of the buffer.
    #[error("buffer truncated")]
    BufferTruncated,
    /// A record's payload size did not match its declared length, or a
    /// variable part was malformed.
    #[error("invalid payload size")]
    InvalidPayloadSize,
    /// The op code is not part of the command set.
    #[error("unknown command op {0}")]
    UnknownCommand(u32),
}

/// Deterministic writer for little-endian scalars and length-prefixed bytes.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// Create a new writer with a pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Write raw bytes.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Write a little-endian u16.
    pub fn write_u16_le(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write a little-endian u32.
    pub fn write_u32_le(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write an f32 as its little-endian bit pattern.
    pub fn write_f32_le(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Write length-prefixed bytes (u32 LE length).
    pub fn write_len_prefixed_bytes(&mut self, bytes: &[u8]) {
        self.write_u32_le(bytes.len() as u32);
        self.write_bytes(bytes);
    }

    /// Bytes written so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Borrow the bytes written so far.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Consume the writer and return the buffer.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

/// Deterministic reader for little-endian scalars and length-prefixed bytes.
#[derive(Debug)]
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    /// Create a reader over the provided byte slice.
    #[must_use]
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes remaining to be read.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Whether the reader has consumed the whole buffer.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or(WireError::BufferTruncated)?;
        if end > self.bytes.len() {
            return Err(WireError::BufferTruncated);
        }
        let out = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        let chunk = self.take(1)?;
        Ok(chunk[0])
    }

    /// Read a little-endian u16.
    pub fn read_u16_le(&mut self) -> Result<u16, WireError> {
        let chunk = self.take(2)?;
        let raw: [u8; 2] = chunk.try_into().map_err(|_| WireError::BufferTruncated)?;
        Ok(u16::from_le_bytes(raw))
    }

    /// Read a little-endian u32.
    pub fn read_u32_le(&mut self) -> Result<u32, WireError> {
        let chunk = self.take(4)?;
        let raw: [u8; 4] = chunk.try_into().map_err(|_| WireError::BufferTruncated)?;
        Ok(u32::from_le_bytes(raw))
    }

    /// Read an f32 from its little-endian bit pattern.
    pub fn read_f32_le(&mut self) -> Result<f32, WireError> {
        let chunk = self.take(4)?;
        let raw: [u8; 4] = chunk.try_into().map_err(|_| WireError::BufferTruncated)?;
        Ok(f32::from_le_bytes(raw))
    }

    /// Read exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], WireError> {
        self.take(len)
    }

    /// Read a length-prefixed byte slice.
    pub fn read_len_prefixed_bytes(&mut self) -> Result<&'a [u8], WireError> {
        let len = self.read_u32_le()? as usize;
        self.take(len)
    }

    /// Read a length-prefixed UTF-8 string. Malformed UTF-8 is reported as
    /// a payload error, not a truncation.
    pub fn read_string(&mut self) -> Result<String, WireError> {
        let bytes = self.read_len_prefixed_bytes()?;
        str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| WireError::InvalidPayloadSize)
    }
}
