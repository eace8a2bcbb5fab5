// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Command and response frames
//!
//! [`CommandFrame`] builds a complete command buffer the way a TPM driver
//! would send it; [`ResponseFrame`] splits a response buffer back into its
//! header fields and body.

use super::constants::*;
use super::marshal::*;
use super::rc::ResponseCode;

/// Builder for a TPM command buffer
pub struct CommandFrame {
    buf: TpmWriter,
}

impl CommandFrame {
    /// Create a new command without sessions
    pub fn new(command_code: u32) -> Self {
        Self::with_tag(TpmSt::NoSessions, command_code)
    }

    /// Create a new command with sessions
    pub fn with_sessions(command_code: u32) -> Self {
        Self::with_tag(TpmSt::Sessions, command_code)
    }

    fn with_tag(tag: TpmSt, command_code: u32) -> Self {
        let mut buf = TpmWriter::with_capacity(256);

        // Header: tag (2) + size (4) + command code (4)
        buf.put_u16(tag.to_u16());
        buf.put_u32(0); // Size placeholder
        buf.put_u32(command_code);

        Self { buf }
    }

    /// Add a handle to the command
    pub fn add_handle(&mut self, handle: u32) -> &mut Self {
        self.buf.put_u32(handle);
        self
    }

    /// Add raw bytes to the command
    pub fn add_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buf.put_bytes(data);
        self
    }

    /// Add a u16 value
    pub fn add_u16(&mut self, v: u16) -> &mut Self {
        self.buf.put_u16(v);
        self
    }

    /// Add a u32 value
    pub fn add_u32(&mut self, v: u32) -> &mut Self {
        self.buf.put_u32(v);
        self
    }

    /// Add a marshallable structure
    pub fn add<T: Marshal>(&mut self, value: &T) -> &mut Self {
        value.marshal(&mut self.buf);
        self
    }

    /// Add an authorization area holding one password session with an
    /// empty auth value
    pub fn add_null_auth_area(&mut self) -> &mut Self {
        // Session handle (4) + nonce (2) + attributes (1) + auth (2) = 9 bytes minimum
        self.buf.put_u32(MIN_AUTH_SESSION_SIZE);
        self.buf.put_u32(tpm_rh::PW);
        self.buf.put_u16(0); // Empty nonce
        self.buf.put_u8(0); // Session attributes (continue = 0)
        self.buf.put_u16(0); // Empty auth value
        self
    }

    /// Add an authorization area from raw session bytes, prefixed by the
    /// declared area size
    pub fn add_auth_area(&mut self, declared_size: u32, sessions: &[u8]) -> &mut Self {
        self.buf.put_u32(declared_size);
        self.buf.put_bytes(sessions);
        self
    }

    /// Finalize the command and return the bytes
    pub fn finalize(&mut self) -> Vec<u8> {
        let size = self.buf.len() as u32;
        self.patch_size(size);
        self.buf.as_bytes().to_vec()
    }

    /// Finalize with a size field that disagrees with the real length
    pub fn finalize_with_size(&mut self, declared: u32) -> Vec<u8> {
        self.patch_size(declared);
        self.buf.as_bytes().to_vec()
    }

    fn patch_size(&mut self, size: u32) {
        // Cannot fail: the constructors write the header
        let _ = self.buf.update_u32(2, size);
    }
}

/// Parsed TPM response
#[derive(Debug)]
pub struct ResponseFrame {
    pub tag: TpmSt,
    pub size: u32,
    pub response_code: ResponseCode,
    pub data: Vec<u8>,
}

impl ResponseFrame {
    /// Parse a TPM response
    pub fn parse(response: &[u8]) -> UnmarshalResult<Self> {
        let mut buf = TpmReader::new(response);

        let tag_raw = buf.get_u16()?;
        let tag = TpmSt::from_u16(tag_raw).ok_or(UnmarshalError::BadTag(tag_raw))?;

        let size = buf.get_u32()?;
        let response_code = ResponseCode::from_raw(buf.get_u32()?);

        let body_len = (size as usize)
            .checked_sub(TPM_HEADER_SIZE)
            .ok_or(UnmarshalError::Value)?;
        let data = buf.get_bytes(body_len)?.to_vec();

        Ok(Self {
            tag,
            size,
            response_code,
            data,
        })
    }

    /// Check if the response indicates success
    pub fn is_success(&self) -> bool {
        self.response_code.is_success()
    }

    /// Get a reader over the body
    pub fn data_buffer(&self) -> TpmReader<'_> {
        TpmReader::new(&self.data)
    }

    /// Skip the handle area and, for commands with sessions, the parameter
    /// size field
    pub fn parameters(&self, handle_count: usize) -> UnmarshalResult<TpmReader<'_>> {
        let mut buf = self.data_buffer();
        let handle_area = handle_count
            .checked_mul(TPM_HANDLE_SIZE)
            .ok_or(UnmarshalError::Value)?;
        buf.skip(handle_area)?;
        if self.tag == TpmSt::Sessions {
            let _param_size = buf.get_u32()?;
        }
        Ok(buf)
    }
}
