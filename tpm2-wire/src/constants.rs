// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! TPM 2.0 constants: structure tags, command codes, startup types and
//! capability properties.

/// Size of the fixed command/response header: tag (2) + size (4) + code (4)
pub const TPM_HEADER_SIZE: usize = 10;

/// Size of a handle on the wire
pub const TPM_HANDLE_SIZE: usize = 4;

/// Smallest encoding of a single authorization session:
/// handle (4) + nonce size (2) + attributes (1) + hmac size (2)
pub const MIN_AUTH_SESSION_SIZE: u32 = 9;

/// TPM 2.0 Command Codes (TPM_CC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum TpmCc {
    EvictControl = 0x00000120,
    NvUndefineSpace = 0x00000122,
    NvDefineSpace = 0x0000012A,
    CreatePrimary = 0x00000131,
    NvWrite = 0x00000137,
    FieldUpgradeData = 0x00000141,
    SelfTest = 0x00000143,
    Startup = 0x00000144,
    Shutdown = 0x00000145,
    NvRead = 0x0000014E,
    Create = 0x00000153,
    Load = 0x00000157,
    Quote = 0x00000158,
    Unseal = 0x0000015E,
    FlushContext = 0x00000165,
    NvReadPublic = 0x00000169,
    ReadPublic = 0x00000173,
    StartAuthSession = 0x00000176,
    GetCapability = 0x0000017A,
    GetRandom = 0x0000017B,
    GetTestResult = 0x0000017C,
    PcrRead = 0x0000017E,
    PolicyPcr = 0x0000017F,
    PcrExtend = 0x00000182,
    PolicyGetDigest = 0x00000189,
}

impl TpmCc {
    pub fn to_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(code: u32) -> Option<Self> {
        const ALL: &[TpmCc] = &[
            TpmCc::EvictControl,
            TpmCc::NvUndefineSpace,
            TpmCc::NvDefineSpace,
            TpmCc::CreatePrimary,
            TpmCc::NvWrite,
            TpmCc::FieldUpgradeData,
            TpmCc::SelfTest,
            TpmCc::Startup,
            TpmCc::Shutdown,
            TpmCc::NvRead,
            TpmCc::Create,
            TpmCc::Load,
            TpmCc::Quote,
            TpmCc::Unseal,
            TpmCc::FlushContext,
            TpmCc::NvReadPublic,
            TpmCc::ReadPublic,
            TpmCc::StartAuthSession,
            TpmCc::GetCapability,
            TpmCc::GetRandom,
            TpmCc::GetTestResult,
            TpmCc::PcrRead,
            TpmCc::PolicyPcr,
            TpmCc::PcrExtend,
            TpmCc::PolicyGetDigest,
        ];
        ALL.iter().copied().find(|cc| cc.to_u32() == code)
    }
}

/// TPM command/response structure tag (TPM_ST)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum TpmSt {
    /// TPM 1.2 compatible response tag, used to answer a bad command tag
    RspCommand = 0x00C4,
    Null = 0x8000,
    NoSessions = 0x8001,
    Sessions = 0x8002,
}

impl TpmSt {
    pub fn to_u16(self) -> u16 {
        self as u16
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x00C4 => Some(TpmSt::RspCommand),
            0x8000 => Some(TpmSt::Null),
            0x8001 => Some(TpmSt::NoSessions),
            0x8002 => Some(TpmSt::Sessions),
            _ => None,
        }
    }

    /// Whether this tag is legal at the start of a command
    pub fn is_command_tag(self) -> bool {
        matches!(self, TpmSt::NoSessions | TpmSt::Sessions)
    }
}

/// TPM 2.0 Startup Types (TPM_SU)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum TpmSu {
    Clear = 0x0000,
    State = 0x0001,
}

/// Durable record of how the device was last shut down.
///
/// `None` means no orderly shutdown is on record; any other value claims the
/// previous `TPM2_Shutdown` left state that may be resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownState {
    Clear,
    State,
    None,
}

impl ShutdownState {
    const NONE: u16 = 0xFFFF;

    pub fn to_u16(self) -> u16 {
        match self {
            ShutdownState::Clear => TpmSu::Clear as u16,
            ShutdownState::State => TpmSu::State as u16,
            ShutdownState::None => Self::NONE,
        }
    }

    pub fn from_u16(v: u16) -> Option<Self> {
        match v {
            0x0000 => Some(ShutdownState::Clear),
            0x0001 => Some(ShutdownState::State),
            Self::NONE => Some(ShutdownState::None),
            _ => None,
        }
    }
}

impl From<TpmSu> for ShutdownState {
    fn from(su: TpmSu) -> Self {
        match su {
            TpmSu::Clear => ShutdownState::Clear,
            TpmSu::State => ShutdownState::State,
        }
    }
}

/// TPM 2.0 Capability Types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TpmCap {
    Algs = 0x00000000,
    Handles = 0x00000001,
    Commands = 0x00000002,
    PpCommands = 0x00000003,
    AuditCommands = 0x00000004,
    Pcrs = 0x00000005,
    TpmProperties = 0x00000006,
    PcrProperties = 0x00000007,
    EccCurves = 0x00000008,
    AuthPolicies = 0x00000009,
}

impl TpmCap {
    pub fn to_u32(self) -> u32 {
        self as u32
    }
}

/// Fixed TPM properties (TPM_PT, PT_FIXED group)
pub mod tpm_pt {
    pub const NONE: u32 = 0x00000000;
    pub const FIXED: u32 = 0x00000100;
    pub const FAMILY_INDICATOR: u32 = FIXED;
    pub const MANUFACTURER: u32 = FIXED + 5;
    pub const VENDOR_STRING_1: u32 = FIXED + 6;
    pub const VENDOR_STRING_2: u32 = FIXED + 7;
    pub const VENDOR_STRING_3: u32 = FIXED + 8;
    pub const VENDOR_STRING_4: u32 = FIXED + 9;
    pub const VENDOR_TPM_TYPE: u32 = FIXED + 10;
    pub const FIRMWARE_VERSION_1: u32 = FIXED + 11;
    pub const FIRMWARE_VERSION_2: u32 = FIXED + 12;
}

/// TPMI_YES_NO
pub mod tpm_yes_no {
    pub const NO: u8 = 0;
    pub const YES: u8 = 1;
}

/// TPM 2.0 Permanent Handles
pub mod tpm_rh {
    pub const OWNER: u32 = 0x40000001;
    pub const NULL: u32 = 0x40000007;
    pub const UNASSIGNED: u32 = 0x40000008;
    pub const PW: u32 = 0x40000009; // Password authorization
    pub const ENDORSEMENT: u32 = 0x4000000B;
    pub const PLATFORM: u32 = 0x4000000C;
}

/// TPM 2.0 Handle Types (most significant octet of a handle)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum TpmHt {
    Pcr = 0x00,
    NvIndex = 0x01,
    HmacSession = 0x02,
    PolicySession = 0x03,
    Permanent = 0x40,
    Transient = 0x80,
    Persistent = 0x81,
}

impl TpmHt {
    pub fn of(handle: u32) -> Option<Self> {
        match (handle >> 24) as u8 {
            0x00 => Some(TpmHt::Pcr),
            0x01 => Some(TpmHt::NvIndex),
            0x02 => Some(TpmHt::HmacSession),
            0x03 => Some(TpmHt::PolicySession),
            0x40 => Some(TpmHt::Permanent),
            0x80 => Some(TpmHt::Transient),
            0x81 => Some(TpmHt::Persistent),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_code_lookup() {
        assert_eq!(TpmCc::from_u32(0x144), Some(TpmCc::Startup));
        assert_eq!(TpmCc::from_u32(0x17C), Some(TpmCc::GetTestResult));
        assert_eq!(TpmCc::from_u32(0xDEAD), None);
    }

    #[test]
    fn test_command_tags() {
        assert!(TpmSt::Sessions.is_command_tag());
        assert!(TpmSt::NoSessions.is_command_tag());
        assert!(!TpmSt::RspCommand.is_command_tag());
        assert!(!TpmSt::Null.is_command_tag());
        assert_eq!(TpmSt::from_u16(0x1234), None);
    }

    #[test]
    fn test_shutdown_state_encoding() {
        assert_eq!(ShutdownState::None.to_u16(), 0xFFFF);
        assert_eq!(ShutdownState::from_u16(1), Some(ShutdownState::State));
        assert_eq!(ShutdownState::from(TpmSu::Clear), ShutdownState::Clear);
        assert_eq!(ShutdownState::from_u16(7), None);
    }

    #[test]
    fn test_handle_type() {
        assert_eq!(TpmHt::of(0x80000001), Some(TpmHt::Transient));
        assert_eq!(TpmHt::of(tpm_rh::OWNER), Some(TpmHt::Permanent));
        assert_eq!(TpmHt::of(0x7F000000), None);
    }
}
