// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! TPM 2.0 response codes
//!
//! [`TpmRc`] names the base codes; [`ResponseCode`] is the raw 32-bit value
//! that goes on the wire, which for format-one codes may also carry the
//! position of the handle, session or parameter that caused the error.

use std::fmt;

const RC_VER1: u32 = 0x100;
const RC_FMT1: u32 = 0x080;
const RC_WARN: u32 = 0x900;

/// Bits of a format-one code that hold the position number and the
/// parameter/session selector.
const RC_FMT1_POSITION_MASK: u32 = 0xF40;

/// Parameter selector in a format-one code (TPM_RC_P)
const RC_P: u32 = 0x040;
/// Session selector in a format-one code (TPM_RC_S)
const RC_S: u32 = 0x800;

/// TPM 2.0 base response codes (TPM_RC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TpmRc {
    Success = 0x000,
    BadTag = 0x01E,
    // Format 0 errors
    Initialize = RC_VER1,
    Failure = RC_VER1 + 0x001,
    Sequence = RC_VER1 + 0x003,
    Disabled = RC_VER1 + 0x020,
    Exclusive = RC_VER1 + 0x021,
    AuthType = RC_VER1 + 0x024,
    AuthMissing = RC_VER1 + 0x025,
    Policy = RC_VER1 + 0x026,
    Pcr = RC_VER1 + 0x027,
    PcrChanged = RC_VER1 + 0x028,
    Upgrade = RC_VER1 + 0x02D,
    TooManyContexts = RC_VER1 + 0x02E,
    AuthUnavailable = RC_VER1 + 0x02F,
    Reboot = RC_VER1 + 0x030,
    Unbalanced = RC_VER1 + 0x031,
    CommandSize = RC_VER1 + 0x042,
    CommandCode = RC_VER1 + 0x043,
    AuthSize = RC_VER1 + 0x044,
    AuthContext = RC_VER1 + 0x045,
    NvRange = RC_VER1 + 0x046,
    NvSize = RC_VER1 + 0x047,
    NvLocked = RC_VER1 + 0x048,
    NvAuthorization = RC_VER1 + 0x049,
    NvUninitialized = RC_VER1 + 0x04A,
    NvSpace = RC_VER1 + 0x04B,
    NvDefined = RC_VER1 + 0x04C,
    BadContext = RC_VER1 + 0x050,
    CpHash = RC_VER1 + 0x051,
    Parent = RC_VER1 + 0x052,
    NeedsTest = RC_VER1 + 0x053,
    NoResult = RC_VER1 + 0x054,
    Sensitive = RC_VER1 + 0x055,
    // Format 1 errors
    Asymmetric = RC_FMT1 + 0x001,
    Attributes = RC_FMT1 + 0x002,
    Hash = RC_FMT1 + 0x003,
    Value = RC_FMT1 + 0x004,
    Hierarchy = RC_FMT1 + 0x005,
    KeySize = RC_FMT1 + 0x007,
    Mgf = RC_FMT1 + 0x008,
    Mode = RC_FMT1 + 0x009,
    Type = RC_FMT1 + 0x00A,
    Handle = RC_FMT1 + 0x00B,
    Kdf = RC_FMT1 + 0x00C,
    Range = RC_FMT1 + 0x00D,
    AuthFail = RC_FMT1 + 0x00E,
    Nonce = RC_FMT1 + 0x00F,
    Pp = RC_FMT1 + 0x010,
    Scheme = RC_FMT1 + 0x012,
    Size = RC_FMT1 + 0x015,
    Symmetric = RC_FMT1 + 0x016,
    Tag = RC_FMT1 + 0x017,
    Selector = RC_FMT1 + 0x018,
    Insufficient = RC_FMT1 + 0x01A,
    Signature = RC_FMT1 + 0x01B,
    Key = RC_FMT1 + 0x01C,
    PolicyFail = RC_FMT1 + 0x01D,
    Integrity = RC_FMT1 + 0x01F,
    Ticket = RC_FMT1 + 0x020,
    ReservedBits = RC_FMT1 + 0x021,
    BadAuth = RC_FMT1 + 0x022,
    Expired = RC_FMT1 + 0x023,
    PolicyCc = RC_FMT1 + 0x024,
    Binding = RC_FMT1 + 0x025,
    Curve = RC_FMT1 + 0x026,
    EccPoint = RC_FMT1 + 0x027,
    // Warnings
    ContextGap = RC_WARN + 0x001,
    ObjectMemory = RC_WARN + 0x002,
    SessionMemory = RC_WARN + 0x003,
    Memory = RC_WARN + 0x004,
    SessionHandles = RC_WARN + 0x005,
    ObjectHandles = RC_WARN + 0x006,
    Locality = RC_WARN + 0x007,
    Yielded = RC_WARN + 0x008,
    Canceled = RC_WARN + 0x009,
    Testing = RC_WARN + 0x00A,
    ReferenceH0 = RC_WARN + 0x010,
    ReferenceH1 = RC_WARN + 0x011,
    ReferenceH2 = RC_WARN + 0x012,
    ReferenceH3 = RC_WARN + 0x013,
    ReferenceH4 = RC_WARN + 0x014,
    ReferenceH5 = RC_WARN + 0x015,
    ReferenceH6 = RC_WARN + 0x016,
    ReferenceS0 = RC_WARN + 0x018,
    NvRate = RC_WARN + 0x020,
    Lockout = RC_WARN + 0x021,
    Retry = RC_WARN + 0x022,
    NvUnavailable = RC_WARN + 0x023,
}

impl TpmRc {
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    pub fn is_success(self) -> bool {
        matches!(self, TpmRc::Success)
    }
}

/// Position number carried by a format-one response code (TPM_RC_1 ..
/// TPM_RC_F). Combined with a handle, session or parameter selector it tells
/// the caller which element of the command was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum RcIndex {
    One = 0x100,
    Two = 0x200,
    Three = 0x300,
    Four = 0x400,
    Five = 0x500,
    Six = 0x600,
    Seven = 0x700,
    Eight = 0x800,
    Nine = 0x900,
    A = 0xA00,
    B = 0xB00,
    C = 0xC00,
    D = 0xD00,
    E = 0xE00,
    F = 0xF00,
}

impl RcIndex {
    pub fn bits(self) -> u32 {
        self as u32
    }
}

/// A raw response code as returned on the wire
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResponseCode(u32);

impl ResponseCode {
    pub const SUCCESS: ResponseCode = ResponseCode(0);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub fn is_success(self) -> bool {
        self.0 == 0
    }

    /// Format-one codes carry a position number and a selector
    pub fn is_format_one(self) -> bool {
        self.0 & RC_FMT1 != 0
    }

    /// True when this is exactly the given base code, with no position
    /// information attached.
    pub fn is(self, rc: TpmRc) -> bool {
        self.0 == rc.to_u32()
    }

    /// Attach a handle position to a format-one code.
    ///
    /// Codes that are not format one, or that already carry a position or a
    /// selector, are returned unchanged.
    pub fn with_handle(self, index: RcIndex) -> Self {
        self.attach(index.bits())
    }

    /// Attach a parameter position to a format-one code.
    pub fn with_parameter(self, index: RcIndex) -> Self {
        self.attach(RC_P | index.bits())
    }

    /// Attach a session position to a format-one code.
    pub fn with_session(self, index: RcIndex) -> Self {
        self.attach(RC_S | index.bits())
    }

    fn attach(self, position: u32) -> Self {
        if self.is_format_one() && self.0 & RC_FMT1_POSITION_MASK == 0 {
            Self(self.0 | position)
        } else {
            self
        }
    }

    /// Position number of a format-one code, if any
    pub fn position(self) -> Option<u32> {
        if !self.is_format_one() {
            return None;
        }
        match (self.0 >> 8) & 0xF {
            0 => None,
            n => Some(n & if self.0 & RC_S != 0 { 0x7 } else { 0xF }),
        }
    }
}

impl From<TpmRc> for ResponseCode {
    fn from(rc: TpmRc) -> Self {
        Self(rc.to_u32())
    }
}

impl fmt::Debug for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ResponseCode(0x{:08x})", self.0)
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TPM_RC 0x{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_values() {
        assert_eq!(TpmRc::Initialize.to_u32(), 0x100);
        assert_eq!(TpmRc::Failure.to_u32(), 0x101);
        assert_eq!(TpmRc::CommandSize.to_u32(), 0x142);
        assert_eq!(TpmRc::CommandCode.to_u32(), 0x143);
        assert_eq!(TpmRc::Upgrade.to_u32(), 0x12D);
        assert_eq!(TpmRc::Size.to_u32(), 0x095);
        assert_eq!(TpmRc::Insufficient.to_u32(), 0x09A);
        assert_eq!(TpmRc::ReferenceH0.to_u32(), 0x910);
    }

    #[test]
    fn test_handle_position() {
        let rc = ResponseCode::from(TpmRc::Handle).with_handle(RcIndex::Two);
        assert_eq!(rc.raw(), 0x28B);
        assert_eq!(rc.position(), Some(2));
    }

    #[test]
    fn test_position_not_stacked() {
        let rc = ResponseCode::from(TpmRc::Value).with_parameter(RcIndex::One);
        assert_eq!(rc.raw(), 0x1C4);
        assert_eq!(rc.with_handle(RcIndex::Three), rc);
    }

    #[test]
    fn test_non_format_one_untouched() {
        let rc = ResponseCode::from(TpmRc::NvLocked);
        assert_eq!(rc.with_handle(RcIndex::One), rc);
        assert_eq!(rc.position(), None);
        let warn = ResponseCode::from(TpmRc::NvRate);
        assert_eq!(warn.with_session(RcIndex::One), warn);
    }

    #[test]
    fn test_session_position() {
        let rc = ResponseCode::from(TpmRc::AuthFail).with_session(RcIndex::One);
        assert_eq!(rc.raw(), 0x98E);
        assert_eq!(rc.position(), Some(1));
    }
}
