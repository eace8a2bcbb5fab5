// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! End-of-command NV commit

use tpm2_wire::ShutdownState;
use tracing::{debug, error};

use crate::context::CommandContext;
use crate::error::FatalError;
use crate::platform::NvStore;

/// Reset the orderly-shutdown record if the command asked for it.
///
/// Only a successful command clears the record; a failed one leaves it as it
/// was.
pub fn apply_orderly_clear(nv: &mut impl NvStore, ctx: &mut CommandContext, succeeded: bool) {
    if !succeeded || !ctx.orderly_clear_pending() {
        return;
    }
    if nv.orderly_state() != ShutdownState::None {
        debug!("clearing orderly shutdown state");
        nv.write_orderly_state(ShutdownState::None);
        ctx.request_nv_update();
    }
}

/// Commit staged NV writes if the command made any.
///
/// A commit that does not go through is unrecoverable.
pub fn commit_pending(nv: &mut impl NvStore, ctx: &mut CommandContext) -> Result<(), FatalError> {
    if !ctx.take_nv_update() {
        return Ok(());
    }
    nv.commit().map_err(|err| {
        error!("NV commit failed: {err}");
        FatalError::internal()
    })
}
