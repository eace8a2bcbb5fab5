// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Global preconditions every command must meet before its handles are
//! looked at.

use tpm2_wire::{TpmCc, TpmRc};

use crate::error::Result;
use crate::platform::{CommandIndex, CommandTable, DeviceMode};

/// The declared size must be exactly what was received and within the
/// implementation limit.
pub fn check_command_size(declared: u32, received: usize, max_command_size: u32) -> Result<()> {
    if declared as usize != received || declared > max_command_size {
        return Err(TpmRc::CommandSize.into());
    }
    Ok(())
}

/// Look up the command index of `code`
pub fn resolve_command(table: &impl CommandTable, code: u32) -> Result<CommandIndex> {
    table.lookup(code).ok_or_else(|| TpmRc::CommandCode.into())
}

/// Field-upgrade and startup ordering checks.
///
/// In field-upgrade mode only `TPM2_FieldUpgradeData` is allowed. Any
/// command that gets past that must respect startup ordering: `TPM2_Startup`
/// must be the first command after reset and may not be repeated.
pub fn check_mode(device: &impl DeviceMode, code: u32, field_upgrade: bool) -> Result<()> {
    if field_upgrade && device.in_field_upgrade() && code != TpmCc::FieldUpgradeData.to_u32() {
        return Err(TpmRc::Upgrade.into());
    }

    let is_startup = code == TpmCc::Startup.to_u32();
    if device.is_started() == is_startup {
        return Err(TpmRc::Initialize.into());
    }
    Ok(())
}
