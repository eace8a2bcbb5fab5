// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Error types for command execution

use std::panic::Location;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tpm2_wire::{ResponseCode, TpmRc, UnmarshalError};

/// Why the device entered failure mode (the fail code reported by
/// `TPM2_GetTestResult` while failed)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum FailureCode {
    Allocation = 1,
    DivideZero = 2,
    Internal = 3,
    /// An internal consistency check did not hold
    Parameter = 4,
    Entropy = 5,
    SelfTest = 6,
    Crypto = 7,
    NvUnrecoverable = 8,
}

impl FailureCode {
    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

/// An unrecoverable internal fault.
///
/// Raising one anywhere in the pipeline abandons the current command and
/// latches the device into failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("fatal {code:?} failure at {}:{}", .location.file(), .location.line())]
pub struct FatalError {
    pub code: FailureCode,
    pub location: &'static Location<'static>,
}

impl FatalError {
    /// Record a fault at the caller's source location
    #[track_caller]
    pub fn new(code: FailureCode) -> Self {
        Self {
            code,
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn internal() -> Self {
        Self::new(FailureCode::Internal)
    }

    /// A violated internal assertion
    #[track_caller]
    pub fn assertion() -> Self {
        Self::new(FailureCode::Parameter)
    }

    /// 32-bit identifier of the source file that raised the fault: the first
    /// four bytes of its SHA-256 digest
    pub fn function_id(&self) -> u32 {
        let digest = Sha256::digest(self.location.file().as_bytes());
        u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
    }

    pub fn line(&self) -> u32 {
        self.location.line()
    }
}

/// Result of a stage of the command pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ExecError {
    /// The command is rejected with this response code
    #[error("command rejected: {0}")]
    Rc(ResponseCode),
    /// Unrecoverable fault; the device goes to failure mode
    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl ExecError {
    /// Response code reported for this error in the current command
    pub fn response_code(&self) -> ResponseCode {
        match self {
            ExecError::Rc(rc) => *rc,
            ExecError::Fatal(_) => TpmRc::Failure.into(),
        }
    }
}

impl From<ResponseCode> for ExecError {
    fn from(rc: ResponseCode) -> Self {
        ExecError::Rc(rc)
    }
}

impl From<TpmRc> for ExecError {
    fn from(rc: TpmRc) -> Self {
        ExecError::Rc(rc.into())
    }
}

impl From<UnmarshalError> for ExecError {
    fn from(err: UnmarshalError) -> Self {
        ExecError::Rc(err.into())
    }
}

/// The durable store could not commit pending writes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("NV storage unavailable")]
    Unavailable,
    #[error("NV write failed: {0}")]
    Write(String),
}

pub type Result<T, E = ExecError> = std::result::Result<T, E>;
