// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! TPM 2.0 marshalling/unmarshalling utilities
//!
//! All multi-byte fields are big-endian and concatenated without padding.

use thiserror::Error;

use super::constants::{TpmSt, TpmSu};
use super::rc::{ResponseCode, TpmRc};

/// Failure to decode a value from a TPM byte stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UnmarshalError {
    #[error("buffer underflow reading {needed} bytes (remaining: {remaining})")]
    Insufficient { needed: usize, remaining: usize },
    #[error("invalid structure tag: 0x{0:04x}")]
    BadTag(u16),
    #[error("invalid value")]
    Value,
}

impl From<UnmarshalError> for ResponseCode {
    fn from(err: UnmarshalError) -> Self {
        match err {
            UnmarshalError::Insufficient { .. } => TpmRc::Insufficient.into(),
            UnmarshalError::BadTag(_) => TpmRc::BadTag.into(),
            UnmarshalError::Value => TpmRc::Value.into(),
        }
    }
}

/// Failure to encode into a fixed-capacity buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("buffer overflow writing {needed} bytes (remaining: {remaining})")]
pub struct OverflowError {
    pub needed: usize,
    pub remaining: usize,
}

pub type UnmarshalResult<T> = std::result::Result<T, UnmarshalError>;

/// Growable buffer for building TPM byte streams
#[derive(Debug, Default)]
pub struct TpmWriter {
    data: Vec<u8>,
}

impl TpmWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn put_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.data.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Put a TPM2B structure (2-byte size prefix + data)
    pub fn put_tpm2b(&mut self, data: &[u8]) {
        self.put_u16(data.len() as u16);
        self.put_bytes(data);
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Update a u32 already written at `pos` (for size fields)
    pub(crate) fn update_u32(&mut self, pos: usize, v: u32) -> Result<(), OverflowError> {
        let remaining = self.data.len().saturating_sub(pos);
        let field = pos
            .checked_add(4)
            .and_then(|end| self.data.get_mut(pos..end))
            .ok_or(OverflowError {
                needed: 4,
                remaining,
            })?;
        field.copy_from_slice(&v.to_be_bytes());
        Ok(())
    }
}

/// Writer over a caller-owned, fixed-capacity region such as the response
/// arena. Writes that do not fit fail without touching the buffer.
#[derive(Debug)]
pub struct SliceWriter<'a> {
    data: &'a mut [u8],
    pos: usize,
}

impl<'a> SliceWriter<'a> {
    pub fn new(data: &'a mut [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) -> Result<(), OverflowError> {
        if bytes.len() > self.remaining() {
            return Err(OverflowError {
                needed: bytes.len(),
                remaining: self.remaining(),
            });
        }
        self.data[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    pub fn put_u8(&mut self, v: u8) -> Result<(), OverflowError> {
        self.put_bytes(&[v])
    }

    pub fn put_u16(&mut self, v: u16) -> Result<(), OverflowError> {
        self.put_bytes(&v.to_be_bytes())
    }

    pub fn put_u32(&mut self, v: u32) -> Result<(), OverflowError> {
        self.put_bytes(&v.to_be_bytes())
    }

    pub fn put_tpm2b(&mut self, data: &[u8]) -> Result<(), OverflowError> {
        self.put_u16(data.len() as u16)?;
        self.put_bytes(data)
    }
}

/// Cursor for parsing TPM byte streams
#[derive(Debug)]
pub struct TpmReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> TpmReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize) -> UnmarshalResult<&'a [u8]> {
        if len > self.remaining() {
            return Err(UnmarshalError::Insufficient {
                needed: len,
                remaining: self.remaining(),
            });
        }
        let v = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(v)
    }

    pub fn get_u8(&mut self) -> UnmarshalResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> UnmarshalResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn get_u32(&mut self) -> UnmarshalResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_bytes(&mut self, len: usize) -> UnmarshalResult<&'a [u8]> {
        self.take(len)
    }

    /// Get a TPM2B structure (2-byte size prefix + data)
    pub fn get_tpm2b(&mut self) -> UnmarshalResult<&'a [u8]> {
        let size = self.get_u16()? as usize;
        self.get_bytes(size)
    }

    /// Get remaining bytes
    pub fn get_remaining(&mut self) -> &'a [u8] {
        let v = &self.data[self.pos.min(self.data.len())..];
        self.pos = self.data.len();
        v
    }

    /// Skip bytes
    pub fn skip(&mut self, len: usize) -> UnmarshalResult<()> {
        self.take(len).map(|_| ())
    }
}

/// Trait for types that can be marshalled to TPM format
pub trait Marshal {
    fn marshal(&self, buf: &mut TpmWriter);
}

/// Trait for types that can be unmarshalled from TPM format
pub trait Unmarshal: Sized {
    fn unmarshal(buf: &mut TpmReader) -> UnmarshalResult<Self>;

    fn from_bytes(data: &[u8]) -> UnmarshalResult<Self> {
        let mut buf = TpmReader::new(data);
        Self::unmarshal(&mut buf)
    }
}

impl Marshal for u16 {
    fn marshal(&self, buf: &mut TpmWriter) {
        buf.put_u16(*self);
    }
}

impl Marshal for u32 {
    fn marshal(&self, buf: &mut TpmWriter) {
        buf.put_u32(*self);
    }
}

impl Marshal for TpmSt {
    fn marshal(&self, buf: &mut TpmWriter) {
        buf.put_u16(self.to_u16());
    }
}

impl Marshal for TpmSu {
    fn marshal(&self, buf: &mut TpmWriter) {
        buf.put_u16(*self as u16);
    }
}

impl Unmarshal for u16 {
    fn unmarshal(buf: &mut TpmReader) -> UnmarshalResult<Self> {
        buf.get_u16()
    }
}

impl Unmarshal for u32 {
    fn unmarshal(buf: &mut TpmReader) -> UnmarshalResult<Self> {
        buf.get_u32()
    }
}

/// Command tag (TPMI_ST_COMMAND_TAG): only `Sessions` and `NoSessions` are
/// accepted, anything else is a bad tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandTag(pub TpmSt);

impl Unmarshal for CommandTag {
    fn unmarshal(buf: &mut TpmReader) -> UnmarshalResult<Self> {
        let raw = buf.get_u16()?;
        match TpmSt::from_u16(raw) {
            Some(tag) if tag.is_command_tag() => Ok(Self(tag)),
            _ => Err(UnmarshalError::BadTag(raw)),
        }
    }
}
