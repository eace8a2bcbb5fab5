// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! TPM 2.0 wire vocabulary
//!
//! Constants, response codes and the big-endian codec shared by the command
//! executor and the collaborators it calls into.
//!
//! ## Example
//!
//! ```
//! use tpm2_wire::{CommandFrame, TpmCc};
//!
//! let startup = CommandFrame::new(TpmCc::Startup.to_u32())
//!     .add_u16(0) // TPM_SU_CLEAR
//!     .finalize();
//! assert_eq!(startup.len(), 12);
//! ```

mod constants;
mod frame;
mod marshal;
mod rc;

pub use constants::*;
pub use frame::{CommandFrame, ResponseFrame};
pub use marshal::{
    CommandTag, Marshal, OverflowError, SliceWriter, TpmReader, TpmWriter, Unmarshal,
    UnmarshalError, UnmarshalResult,
};
pub use rc::{RcIndex, ResponseCode, TpmRc};
