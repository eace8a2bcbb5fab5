// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! A scriptable in-memory backend for driving the executor in tests

#![allow(dead_code)]

use std::collections::HashMap;

use tpm2_exec::wire::{OverflowError, ShutdownState, SliceWriter, TpmCc, TpmReader, TpmRc, TpmSt};
use tpm2_exec::{
    Authorization, CommandContext, CommandIndex, CommandTable, CommitError, DeviceMode,
    Dispatcher, ExecError, Executor, ExecutorConfig, FatalError, HandleArea, HandleSet, NvStore,
    PlatformHooks, ResponseSizes, Result,
};

pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
}

/// What the mock dispatcher does when a command reaches it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Echo the parameters back as the response parameters
    Echo,
    Reject(TpmRc),
    Fatal,
    /// Report a response larger than the arena
    Oversize,
}

#[derive(Debug, Clone)]
pub struct CommandDef {
    pub code: u32,
    pub handle_count: usize,
}

#[derive(Debug)]
pub struct MockPlatform {
    pub commands: Vec<CommandDef>,
    pub started: bool,
    pub upgrading: bool,

    /// Handles that are not loaded, and the error they report
    pub unloaded: HashMap<u32, TpmRc>,
    pub fatal_handle: Option<u32>,
    pub probed: Vec<u32>,

    pub reject_sessions: Option<TpmRc>,
    pub reject_no_session: Option<TpmRc>,
    /// XOR applied to the first parameter byte by session processing
    pub decrypt_mask: u8,
    pub sessions_seen: Vec<Vec<u8>>,
    pub response_auth: Vec<u8>,

    pub action: Action,
    pub response_handles: Vec<u32>,
    pub dispatched: Vec<(u32, Vec<u8>)>,
    pub request_nv_update: bool,
    pub request_orderly_clear: bool,

    pub orderly: ShutdownState,
    pub orderly_writes: Vec<ShutdownState>,
    pub commit_error: Option<CommitError>,
    pub commits: usize,

    /// Pipeline events in call order
    pub events: Vec<&'static str>,
}

impl MockPlatform {
    pub fn new() -> Self {
        let mut platform = Self {
            commands: vec![],
            started: false,
            upgrading: false,
            unloaded: HashMap::new(),
            fatal_handle: None,
            probed: vec![],
            reject_sessions: None,
            reject_no_session: None,
            decrypt_mask: 0,
            sessions_seen: vec![],
            response_auth: vec![],
            action: Action::Echo,
            response_handles: vec![],
            dispatched: vec![],
            request_nv_update: false,
            request_orderly_clear: false,
            orderly: ShutdownState::None,
            orderly_writes: vec![],
            commit_error: None,
            commits: 0,
            events: vec![],
        };
        for (code, handle_count) in [
            (TpmCc::Startup, 0),
            (TpmCc::Shutdown, 0),
            (TpmCc::GetRandom, 0),
            (TpmCc::FieldUpgradeData, 0),
            (TpmCc::Load, 1),
            (TpmCc::NvWrite, 2),
        ] {
            platform.register(code.to_u32(), handle_count);
        }
        platform
    }

    /// A platform that has already seen `TPM2_Startup`
    pub fn started() -> Self {
        Self {
            started: true,
            ..Self::new()
        }
    }

    pub fn register(&mut self, code: u32, handle_count: usize) {
        self.commands.push(CommandDef { code, handle_count });
    }

    fn command(&self, index: CommandIndex) -> &CommandDef {
        &self.commands[index.0 as usize]
    }

    pub fn dispatched_codes(&self) -> Vec<u32> {
        self.dispatched.iter().map(|(code, _)| *code).collect()
    }
}

impl CommandTable for MockPlatform {
    fn lookup(&self, command_code: u32) -> Option<CommandIndex> {
        self.commands
            .iter()
            .position(|def| def.code == command_code)
            .map(|i| CommandIndex(i as u16))
    }
}

impl HandleArea for MockPlatform {
    fn parse_handles(&mut self, index: CommandIndex, reader: &mut TpmReader<'_>) -> Result<HandleSet> {
        let mut handles = HandleSet::new();
        for _ in 0..self.command(index).handle_count {
            let handle = reader.get_u32()?;
            handles
                .push(handle)
                .map_err(|_| ExecError::from(FatalError::internal()))?;
        }
        Ok(handles)
    }

    fn load_status(&mut self, handle: u32, _: CommandIndex) -> Result<()> {
        self.probed.push(handle);
        if self.fatal_handle == Some(handle) {
            return Err(FatalError::internal().into());
        }
        match self.unloaded.get(&handle) {
            Some(rc) => Err((*rc).into()),
            None => Ok(()),
        }
    }
}

impl Authorization for MockPlatform {
    fn process_sessions(
        &mut self,
        _: &mut CommandContext,
        _: CommandIndex,
        _: &[u32],
        sessions: &[u8],
        parameters: &mut [u8],
    ) -> Result<()> {
        self.events.push("process_sessions");
        self.sessions_seen.push(sessions.to_vec());
        if let Some(rc) = self.reject_sessions {
            return Err(rc.into());
        }
        if let Some(first) = parameters.first_mut() {
            *first ^= self.decrypt_mask;
        }
        Ok(())
    }

    fn check_no_session(
        &mut self,
        _: &mut CommandContext,
        _: CommandIndex,
        _: &[u32],
        _: &[u8],
    ) -> Result<()> {
        self.events.push("check_no_session");
        match self.reject_no_session {
            Some(rc) => Err(rc.into()),
            None => Ok(()),
        }
    }

    fn build_response_sessions(
        &mut self,
        _: &mut CommandContext,
        tag: TpmSt,
        _: CommandIndex,
        sizes: ResponseSizes,
        body: &mut [u8],
    ) -> u32 {
        self.events.push("build_response_sessions");
        if tag != TpmSt::Sessions {
            return 0;
        }
        let offset = (sizes.handles + 4 + sizes.parameters) as usize;
        let auth = &mut body[offset..offset + self.response_auth.len()];
        auth.copy_from_slice(&self.response_auth);
        self.response_auth.len() as u32
    }
}

impl Dispatcher for MockPlatform {
    fn dispatch(
        &mut self,
        ctx: &mut CommandContext,
        tag: TpmSt,
        index: CommandIndex,
        parameters: &mut [u8],
        _: &[u32],
        body: &mut [u8],
    ) -> Result<ResponseSizes> {
        self.events.push("dispatch");
        let code = self.command(index).code;
        self.dispatched.push((code, parameters.to_vec()));

        // Durable writes happen whether or not the action succeeds
        if self.request_nv_update {
            ctx.request_nv_update();
        }
        if self.request_orderly_clear {
            ctx.request_orderly_clear();
        }
        if code == TpmCc::Startup.to_u32() {
            self.started = true;
        }

        match self.action {
            Action::Echo => {}
            Action::Reject(rc) => return Err(rc.into()),
            Action::Fatal => return Err(FatalError::internal().into()),
            Action::Oversize => {
                return Ok(ResponseSizes {
                    handles: 0,
                    parameters: body.len() as u32 + 1,
                })
            }
        }

        let mut out = SliceWriter::new(body);
        let overflow = |_: OverflowError| ExecError::from(TpmRc::Size);
        for handle in &self.response_handles {
            out.put_u32(*handle).map_err(overflow)?;
        }
        if tag == TpmSt::Sessions {
            out.put_u32(parameters.len() as u32).map_err(overflow)?;
        }
        out.put_bytes(parameters).map_err(overflow)?;

        Ok(ResponseSizes {
            handles: 4 * self.response_handles.len() as u32,
            parameters: parameters.len() as u32,
        })
    }
}

impl NvStore for MockPlatform {
    fn check_state(&mut self) {
        self.events.push("check_state");
    }

    fn orderly_state(&self) -> ShutdownState {
        self.orderly
    }

    fn write_orderly_state(&mut self, state: ShutdownState) {
        self.orderly = state;
        self.orderly_writes.push(state);
    }

    fn commit(&mut self) -> std::result::Result<(), CommitError> {
        self.events.push("commit");
        self.commits += 1;
        match self.commit_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

impl DeviceMode for MockPlatform {
    fn is_started(&self) -> bool {
        self.started
    }

    fn in_field_upgrade(&self) -> bool {
        self.upgrading
    }
}

impl PlatformHooks for MockPlatform {
    fn sync_clock(&mut self) {
        self.events.push("sync_clock");
    }

    fn terminate_hash_sequence(&mut self) {
        self.events.push("terminate_hash_sequence");
    }

    fn cleanup_evict_objects(&mut self) {
        self.events.push("cleanup_evict_objects");
    }
}

pub fn executor(platform: MockPlatform) -> Executor<MockPlatform> {
    init_logging();
    Executor::new(ExecutorConfig::default(), platform).unwrap()
}
