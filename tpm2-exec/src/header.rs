// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Command header parsing

use tpm2_wire::{CommandTag, TpmReader, TpmSt, Unmarshal};

use crate::error::Result;
use crate::gate;

/// The fixed header at the start of every command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandHeader {
    pub tag: TpmSt,
    pub size: u32,
    pub code: u32,
}

impl CommandHeader {
    /// Parse the header of `request`, leaving `reader` at the first byte
    /// after it.
    ///
    /// The declared size is checked against the received length before the
    /// command code is read.
    pub fn parse(reader: &mut TpmReader<'_>, request_len: usize, max_command_size: u32) -> Result<Self> {
        let CommandTag(tag) = CommandTag::unmarshal(reader)?;
        let size = reader.get_u32()?;
        gate::check_command_size(size, request_len, max_command_size)?;
        let code = reader.get_u32()?;
        Ok(Self { tag, size, code })
    }
}
