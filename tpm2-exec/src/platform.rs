// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Collaborator interfaces
//!
//! The executor owns the control flow of a command; everything that knows
//! about individual commands, entities, sessions or storage sits behind
//! these traits. A backend implements all of them and is then usable as a
//! [`Platform`].

use tpm2_wire::{ShutdownState, TpmReader, TpmSt};

use crate::context::CommandContext;
use crate::error::{CommitError, Result};
use crate::handles::HandleSet;

/// Key into the backend's per-command metadata, derived from a command code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandIndex(pub u16);

/// Sizes of the regions the dispatcher wrote into the response body
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResponseSizes {
    pub handles: u32,
    pub parameters: u32,
}

pub trait CommandTable {
    /// Map a command code to its index; `None` if the command is not
    /// implemented
    fn lookup(&self, command_code: u32) -> Option<CommandIndex>;
}

pub trait HandleArea {
    /// Unmarshal the handle area of `index` from `reader`
    fn parse_handles(&mut self, index: CommandIndex, reader: &mut TpmReader<'_>) -> Result<HandleSet>;

    /// Check that `handle` references an entity that is loaded (loading an
    /// evict object into a transient slot if need be). The error is reported
    /// without position information; the executor attaches it.
    fn load_status(&mut self, handle: u32, index: CommandIndex) -> Result<()>;
}

pub trait Authorization {
    /// Unmarshal the session area, check every authorization the command
    /// needs and decrypt the first parameter in place when a session asks for
    /// it.
    fn process_sessions(
        &mut self,
        ctx: &mut CommandContext,
        index: CommandIndex,
        handles: &[u32],
        sessions: &[u8],
        parameters: &mut [u8],
    ) -> Result<()>;

    /// Fail if `index` needs an authorization that cannot be given without a
    /// session
    fn check_no_session(
        &mut self,
        ctx: &mut CommandContext,
        index: CommandIndex,
        handles: &[u32],
        parameters: &[u8],
    ) -> Result<()>;

    /// Append the response authorization area after the regions described by
    /// `sizes` in `body`, encrypting the first response parameter if a
    /// session asks for it, and return its size.
    ///
    /// Only called after a successful dispatch, and must not fail there.
    fn build_response_sessions(
        &mut self,
        ctx: &mut CommandContext,
        tag: TpmSt,
        index: CommandIndex,
        sizes: ResponseSizes,
        body: &mut [u8],
    ) -> u32;
}

pub trait Dispatcher {
    /// Unmarshal the parameters, run the command and marshal its response
    /// into `body`: handle area first, then for `TpmSt::Sessions` the 4-byte
    /// parameter size, then the parameters.
    fn dispatch(
        &mut self,
        ctx: &mut CommandContext,
        tag: TpmSt,
        index: CommandIndex,
        parameters: &mut [u8],
        handles: &[u32],
        body: &mut [u8],
    ) -> Result<ResponseSizes>;
}

pub trait NvStore {
    /// Sample NV availability; it stays fixed for the rest of the command
    fn check_state(&mut self);

    fn orderly_state(&self) -> ShutdownState;

    /// Stage a new orderly-shutdown record; it becomes durable at the next
    /// commit
    fn write_orderly_state(&mut self, state: ShutdownState);

    /// Atomically commit every staged write
    fn commit(&mut self) -> std::result::Result<(), CommitError>;
}

pub trait DeviceMode {
    /// Whether `TPM2_Startup` has completed since the last reset
    fn is_started(&self) -> bool;

    /// Whether the device is between field-upgrade start and completion
    fn in_field_upgrade(&self) -> bool {
        false
    }
}

/// Fixed points in the pipeline the platform may hook; nothing they do
/// affects control flow.
pub trait PlatformHooks {
    /// Bring the TPM clock up to date with the host clock
    fn sync_clock(&mut self) {}

    /// End any `_TPM_Hash_Start` sequence in progress
    fn terminate_hash_sequence(&mut self) {}

    /// Drop evict objects loaded into transient slots for this command
    fn cleanup_evict_objects(&mut self) {}
}

/// A complete backend for the executor
pub trait Platform:
    CommandTable + HandleArea + Authorization + Dispatcher + NvStore + DeviceMode + PlatformHooks
{
}

impl<T> Platform for T where
    T: CommandTable + HandleArea + Authorization + Dispatcher + NvStore + DeviceMode + PlatformHooks
{
}
