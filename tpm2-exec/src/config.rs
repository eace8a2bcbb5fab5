// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Executor configuration
//!
//! Implementation limits and the fixed identity the device reports while it
//! is in failure mode. None of this is visible on the wire beyond the limits
//! it enforces.

use std::path::Path;

use anyhow::{bail, Context, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use tpm2_wire::TPM_HEADER_SIZE;

/// Default MAX_COMMAND_SIZE / MAX_RESPONSE_SIZE
pub const DEFAULT_MAX_BUFFER_SIZE: u32 = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Largest command buffer accepted
    pub max_command_size: u32,
    /// Size of the response arena; every response is zero-filled up to it
    pub max_response_size: u32,
    /// Enforce the field-upgrade mode gate
    pub field_upgrade: bool,
    /// Properties answered by `TPM2_GetCapability` in failure mode
    pub identity: DeviceIdentity,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_command_size: DEFAULT_MAX_BUFFER_SIZE,
            max_response_size: DEFAULT_MAX_BUFFER_SIZE,
            field_upgrade: false,
            identity: DeviceIdentity::default(),
        }
    }
}

impl ExecutorConfig {
    /// Load a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse executor config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if (self.max_command_size as usize) < TPM_HEADER_SIZE {
            bail!(
                "max_command_size {} cannot hold a command header",
                self.max_command_size
            );
        }
        if (self.max_response_size as usize) < TPM_HEADER_SIZE {
            bail!(
                "max_response_size {} cannot hold a response header",
                self.max_response_size
            );
        }
        Ok(())
    }
}

/// Fixed TPM properties reported while in failure mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceIdentity {
    pub manufacturer: u32,
    pub vendor_strings: [u32; 4],
    pub vendor_tpm_type: u32,
    pub firmware_version: [u32; 2],
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            manufacturer: u32::from_be_bytes(*b"RUST"),
            vendor_strings: [
                u32::from_be_bytes(*b"xCG "),
                u32::from_be_bytes(*b"fTPM"),
                0,
                0,
            ],
            vendor_tpm_type: 1,
            firmware_version: [0x2025_0001, 0],
        }
    }
}
