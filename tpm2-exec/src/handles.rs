// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Handle area resolution
//!
//! Every handle in the handle area must name a loaded entity before any
//! authorization is attempted. A failure is reported against the position of
//! the first handle that failed.

use tpm2_wire::{RcIndex, ResponseCode, TpmRc};
use tracing::debug;

use crate::error::{ExecError, Result};
use crate::platform::{CommandIndex, HandleArea};

/// Largest number of handles in the handle area of any command
pub const MAX_HANDLE_NUM: usize = 3;

/// Handles from the handle area, in command order
pub type HandleSet = heapless::Vec<u32, MAX_HANDLE_NUM>;

/// Where a failure of the handle at a given position is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HandleSlot {
    /// Format-one position number (TPM_RC_H + TPM_RC_n)
    number: RcIndex,
    /// Warning code for an unreferenced handle at this position
    reference: TpmRc,
}

const HANDLE_SLOTS: [HandleSlot; MAX_HANDLE_NUM] = [
    HandleSlot {
        number: RcIndex::One,
        reference: TpmRc::ReferenceH0,
    },
    HandleSlot {
        number: RcIndex::Two,
        reference: TpmRc::ReferenceH1,
    },
    HandleSlot {
        number: RcIndex::Three,
        reference: TpmRc::ReferenceH2,
    },
];

/// Attribute a load failure to the handle at `position` (zero based)
pub fn attribute_to_handle(rc: ResponseCode, position: usize) -> ResponseCode {
    let Some(slot) = HANDLE_SLOTS.get(position) else {
        return rc;
    };
    if rc.is(TpmRc::ReferenceH0) {
        slot.reference.into()
    } else {
        rc.with_handle(slot.number)
    }
}

/// Check every handle in order, stopping at the first that is not loaded
pub fn check_loaded(area: &mut impl HandleArea, handles: &[u32], index: CommandIndex) -> Result<()> {
    for (position, &handle) in handles.iter().enumerate() {
        match area.load_status(handle, index) {
            Ok(()) => {}
            Err(ExecError::Rc(rc)) => {
                let rc = attribute_to_handle(rc, position);
                debug!("handle 0x{handle:08x} at position {position} not loaded: {rc}");
                return Err(rc.into());
            }
            Err(fatal) => return Err(fatal),
        }
    }
    Ok(())
}
