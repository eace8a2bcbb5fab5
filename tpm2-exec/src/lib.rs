// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! TPM 2.0 command execution core
//!
//! Takes a marshalled TPM 2.0 command and produces the marshalled response,
//! enforcing the framing, ordering, handle, authorization and durability
//! rules every command shares. Everything command specific (the command
//! table, entity storage, sessions, the command actions themselves and NV
//! storage) is supplied by a [`Platform`] backend.
//!
//! ## Example
//!
//! ```ignore
//! use tpm2_exec::{Executor, ExecutorConfig};
//!
//! let mut tpm = Executor::new(ExecutorConfig::default(), MySimulator::new())?;
//! let response = tpm.execute(&request);
//! ```

mod auth;
mod config;
mod context;
mod error;
mod executor;
mod failure;
mod gate;
mod handles;
mod header;
mod nv;
mod platform;
mod response;

pub use config::{DeviceIdentity, ExecutorConfig, DEFAULT_MAX_BUFFER_SIZE};
pub use context::CommandContext;
pub use error::{CommitError, ExecError, FailureCode, FatalError, Result};
pub use executor::Executor;
pub use handles::{HandleSet, MAX_HANDLE_NUM};
pub use platform::{
    Authorization, CommandIndex, CommandTable, DeviceMode, Dispatcher, HandleArea, NvStore,
    Platform, PlatformHooks, ResponseSizes,
};

pub use tpm2_wire as wire;
