// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Response assembly

use tpm2_wire::{ResponseCode, TpmRc, TpmSt, TPM_HEADER_SIZE};

use crate::platform::ResponseSizes;

/// Reused response buffer.
///
/// Collaborators write the response body after the header; the header is
/// written last and everything past the response is zeroed so nothing from
/// an earlier command survives in the arena.
#[derive(Debug)]
pub struct ResponseArena {
    buf: Vec<u8>,
}

impl ResponseArena {
    pub fn new(max_response_size: usize) -> Self {
        Self {
            buf: vec![0u8; max_response_size.max(TPM_HEADER_SIZE)],
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The region after the header
    pub fn body_mut(&mut self) -> &mut [u8] {
        &mut self.buf[TPM_HEADER_SIZE..]
    }

    /// The whole arena, including the zero-filled tail
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Write the header, clear the tail and return the response.
    ///
    /// `size` must not exceed the capacity; callers check that first.
    pub fn seal(&mut self, tag: TpmSt, size: u32, rc: ResponseCode) -> &[u8] {
        let size = (size as usize).clamp(TPM_HEADER_SIZE, self.buf.len());
        self.buf[0..2].copy_from_slice(&tag.to_u16().to_be_bytes());
        self.buf[2..6].copy_from_slice(&(size as u32).to_be_bytes());
        self.buf[6..10].copy_from_slice(&rc.raw().to_be_bytes());
        self.buf[size..].fill(0);
        &self.buf[..size]
    }
}

/// Total size of a successful response
pub fn success_size(tag: TpmSt, sizes: ResponseSizes, auth_size: u32) -> u64 {
    let mut size = TPM_HEADER_SIZE as u64
        + u64::from(sizes.handles)
        + u64::from(sizes.parameters)
        + u64::from(auth_size);
    if tag == TpmSt::Sessions {
        size += 4;
    }
    size
}

/// Tag of a failed response: the TPM 1.2 tag for a bad command tag so that
/// a 1.2 driver can make sense of it, the no-sessions tag otherwise
pub fn failure_tag(rc: ResponseCode) -> TpmSt {
    if rc.is(TpmRc::BadTag) {
        TpmSt::RspCommand
    } else {
        TpmSt::NoSessions
    }
}
