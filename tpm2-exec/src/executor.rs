// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! The command executor
//!
//! One call to [`Executor::execute`] takes one marshalled command through
//! the whole pipeline and produces its marshalled response:
//!
//! 1. header: tag, size, command code
//! 2. mode gate: implemented, field upgrade, startup ordering
//! 3. handle area: parse, then check every handle is loaded
//! 4. authorization: session area or no-session check
//! 5. dispatch and response sessions
//! 6. cleanup, orderly clear, NV commit and response header
//!
//! Any stage can reject the command with a response code. A fatal fault
//! abandons the command, skips cleanup and NV commit, and leaves the device
//! answering in failure mode until it is restarted.

use tpm2_wire::{ResponseCode, TpmRc, TpmReader, TpmSt, TPM_HEADER_SIZE};
use tracing::{debug, error, info};

use crate::auth;
use crate::config::ExecutorConfig;
use crate::context::{CommandContext, FailureLatch};
use crate::error::{ExecError, FatalError, Result};
use crate::failure;
use crate::gate;
use crate::handles;
use crate::header::CommandHeader;
use crate::nv;
use crate::platform::Platform;
use crate::response::{self, ResponseArena};

/// A command that made it through dispatch
#[derive(Debug, Clone, Copy)]
struct Completed {
    tag: TpmSt,
    response_size: u64,
}

pub struct Executor<P> {
    config: ExecutorConfig,
    platform: P,
    latch: FailureLatch,
    /// Owned copy of the command after its handle area, decrypted in place
    command: Vec<u8>,
    arena: ResponseArena,
}

impl<P: Platform> Executor<P> {
    /// Create an executor, rejecting limits that cannot hold a TPM header
    pub fn new(config: ExecutorConfig, platform: P) -> anyhow::Result<Self> {
        config.validate()?;
        info!(
            max_command_size = config.max_command_size,
            max_response_size = config.max_response_size,
            field_upgrade = config.field_upgrade,
            "creating TPM command executor"
        );
        Ok(Self {
            command: Vec::with_capacity(config.max_command_size as usize),
            arena: ResponseArena::new(config.max_response_size as usize),
            latch: FailureLatch::default(),
            config,
            platform,
        })
    }

    /// Execute one command and return its response.
    ///
    /// The returned slice is exactly the response; the rest of the response
    /// arena is zero.
    pub fn execute(&mut self, request: &[u8]) -> &[u8] {
        let mut ctx = CommandContext::new();

        if let Some(fault) = self.latch.fault() {
            return failure::respond(fault, &self.config.identity, request, &mut self.arena);
        }

        self.platform.check_state();
        self.platform.sync_clock();
        self.platform.terminate_hash_sequence();

        let outcome = self.run(&mut ctx, request);
        self.finish(ctx, outcome)
    }

    fn run(&mut self, ctx: &mut CommandContext, request: &[u8]) -> Result<Completed> {
        let mut reader = TpmReader::new(request);
        let header = CommandHeader::parse(&mut reader, request.len(), self.config.max_command_size)?;
        debug!(
            "command 0x{:08x}, tag 0x{:04x}, {} bytes",
            header.code,
            header.tag.to_u16(),
            header.size
        );

        let index = gate::resolve_command(&self.platform, header.code)?;
        gate::check_mode(&self.platform, header.code, self.config.field_upgrade)?;

        let handles = self.platform.parse_handles(index, &mut reader)?;
        handles::check_loaded(&mut self.platform, &handles, index)?;

        self.command.clear();
        self.command.extend_from_slice(reader.get_remaining());
        let parameters = auth::authorize(
            &mut self.platform,
            ctx,
            header.tag,
            index,
            &handles,
            &mut self.command,
        )?;

        let sizes = self.platform.dispatch(
            ctx,
            header.tag,
            index,
            &mut self.command[parameters],
            &handles,
            self.arena.body_mut(),
        )?;
        let auth_size = self.platform.build_response_sessions(
            ctx,
            header.tag,
            index,
            sizes,
            self.arena.body_mut(),
        );

        Ok(Completed {
            tag: header.tag,
            response_size: response::success_size(header.tag, sizes, auth_size),
        })
    }

    fn finish(&mut self, mut ctx: CommandContext, outcome: Result<Completed>) -> &[u8] {
        let outcome = match outcome {
            Err(ExecError::Fatal(fault)) => return self.fail(fault),
            outcome => outcome,
        };

        self.platform.cleanup_evict_objects();

        let (tag, size, rc) = match outcome {
            Ok(done) => (done.tag, done.response_size, ResponseCode::SUCCESS),
            Err(err) => {
                let rc = err.response_code();
                debug!("command failed: {rc}");
                (response::failure_tag(rc), TPM_HEADER_SIZE as u64, rc)
            }
        };

        nv::apply_orderly_clear(&mut self.platform, &mut ctx, rc.is_success());
        if let Err(fault) = nv::commit_pending(&mut self.platform, &mut ctx) {
            return self.fail(fault);
        }

        if size > self.arena.capacity() as u64 {
            error!(
                "response of {size} bytes exceeds the {} byte response buffer",
                self.arena.capacity()
            );
            return self.fail(FatalError::assertion());
        }
        self.arena.seal(tag, size as u32, rc)
    }

    /// Latch `fault` and answer the current command with a bare failure
    fn fail(&mut self, fault: FatalError) -> &[u8] {
        self.latch.enter(fault);
        self.arena.seal(
            TpmSt::NoSessions,
            TPM_HEADER_SIZE as u32,
            TpmRc::Failure.into(),
        )
    }

    /// The whole response arena, zero past the last response
    pub fn response_arena(&self) -> &[u8] {
        self.arena.as_bytes()
    }

    pub fn is_failed(&self) -> bool {
        self.latch.is_failed()
    }

    /// The fault that put the device into failure mode
    pub fn failure(&self) -> Option<&FatalError> {
        self.latch.fault()
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }
}
