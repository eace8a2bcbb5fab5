// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Execution state shared between the executor and its collaborators

use tracing::warn;

use crate::error::FatalError;

/// Per-command durability latches.
///
/// Created fresh for every command, so both latches start cleared even when
/// the device is in failure mode.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandContext {
    update_nv: bool,
    clear_orderly: bool,
}

impl CommandContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Something was written to durable state and must be committed at the
    /// end of this command
    pub fn request_nv_update(&mut self) {
        self.update_nv = true;
    }

    /// The orderly-shutdown record no longer describes the device and must be
    /// reset to `None` if the command succeeds
    pub fn request_orderly_clear(&mut self) {
        self.clear_orderly = true;
    }

    pub fn nv_update_pending(&self) -> bool {
        self.update_nv
    }

    pub fn orderly_clear_pending(&self) -> bool {
        self.clear_orderly
    }

    pub(crate) fn take_nv_update(&mut self) -> bool {
        std::mem::take(&mut self.update_nv)
    }
}

/// Process-wide failure latch.
///
/// Failure mode is only left by dropping the executor (a restart).
#[derive(Debug, Default)]
pub struct FailureLatch {
    fault: Option<FatalError>,
}

impl FailureLatch {
    pub fn is_failed(&self) -> bool {
        self.fault.is_some()
    }

    /// The fault that tripped the latch
    pub fn fault(&self) -> Option<&FatalError> {
        self.fault.as_ref()
    }

    /// Enter failure mode. The first fault is the one reported.
    pub fn enter(&mut self, fault: FatalError) {
        warn!("entering failure mode: {fault}");
        if self.fault.is_none() {
            self.fault = Some(fault);
        }
    }
}
