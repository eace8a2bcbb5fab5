// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Failure-mode responses
//!
//! Once the device has failed, only two questions still get a real answer:
//! `TPM2_GetTestResult` (what went wrong) and `TPM2_GetCapability` for the
//! fixed identity properties (who made this device). Everything else gets a
//! bare `TPM_RC_FAILURE`. No collaborator is consulted.

use tpm2_wire::{
    tpm_pt, tpm_yes_no, OverflowError, ResponseCode, SliceWriter, TpmCap, TpmCc, TpmReader, TpmRc,
    TpmSt, TPM_HEADER_SIZE,
};
use tracing::debug;

use crate::config::DeviceIdentity;
use crate::error::{FailureCode, FatalError};
use crate::response::ResponseArena;

/// Size of a `TPM2_GetCapability` request with no sessions
const GET_CAPABILITY_SIZE: usize = TPM_HEADER_SIZE + 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Query {
    TestResult,
    Property(u32),
}

fn parse_query(request: &[u8]) -> Option<Query> {
    let mut reader = TpmReader::new(request);
    let tag = reader.get_u16().ok()?;
    let size = reader.get_u32().ok()?;
    let code = reader.get_u32().ok()?;
    if tag != TpmSt::NoSessions.to_u16() || size as usize != request.len() {
        return None;
    }

    match TpmCc::from_u32(code)? {
        TpmCc::GetTestResult if request.len() == TPM_HEADER_SIZE => Some(Query::TestResult),
        TpmCc::GetCapability if request.len() == GET_CAPABILITY_SIZE => {
            let capability = reader.get_u32().ok()?;
            let property = reader.get_u32().ok()?;
            let count = reader.get_u32().ok()?;
            (capability == TpmCap::TpmProperties.to_u32() && count > 0)
                .then_some(Query::Property(property))
        }
        _ => None,
    }
}

/// The properties a failed device still reports, in property order
fn identity_properties(identity: &DeviceIdentity) -> [(u32, u32); 8] {
    [
        (tpm_pt::MANUFACTURER, identity.manufacturer),
        (tpm_pt::VENDOR_STRING_1, identity.vendor_strings[0]),
        (tpm_pt::VENDOR_STRING_2, identity.vendor_strings[1]),
        (tpm_pt::VENDOR_STRING_3, identity.vendor_strings[2]),
        (tpm_pt::VENDOR_STRING_4, identity.vendor_strings[3]),
        (tpm_pt::VENDOR_TPM_TYPE, identity.vendor_tpm_type),
        (tpm_pt::FIRMWARE_VERSION_1, identity.firmware_version[0]),
        (tpm_pt::FIRMWARE_VERSION_2, identity.firmware_version[1]),
    ]
}

fn write_test_result(fault: &FatalError, out: &mut SliceWriter<'_>) -> Result<(), OverflowError> {
    let mut data = [0u8; 12];
    data[0..4].copy_from_slice(&fault.function_id().to_be_bytes());
    data[4..8].copy_from_slice(&fault.line().to_be_bytes());
    data[8..12].copy_from_slice(&fault.code.to_u32().to_be_bytes());
    out.put_tpm2b(&data)?;

    let test_result = if fault.code == FailureCode::NvUnrecoverable {
        TpmRc::NvUninitialized
    } else {
        TpmRc::Failure
    };
    out.put_u32(test_result.to_u32())
}

fn write_property(
    identity: &DeviceIdentity,
    property: u32,
    out: &mut SliceWriter<'_>,
) -> Result<(), OverflowError> {
    let properties = identity_properties(identity);
    let property = property.max(tpm_pt::MANUFACTURER);
    let found = properties.iter().position(|(pt, _)| *pt == property);

    let more_data = matches!(found, Some(i) if i + 1 < properties.len());
    out.put_u8(if more_data {
        tpm_yes_no::YES
    } else {
        tpm_yes_no::NO
    })?;
    out.put_u32(TpmCap::TpmProperties.to_u32())?;
    match found {
        Some(i) => {
            let (pt, value) = properties[i];
            out.put_u32(1)?;
            out.put_u32(pt)?;
            out.put_u32(value)
        }
        None => out.put_u32(0),
    }
}

/// Answer `request` while the device is failed
pub fn respond<'a>(
    fault: &FatalError,
    identity: &DeviceIdentity,
    request: &[u8],
    arena: &'a mut ResponseArena,
) -> &'a [u8] {
    let query = parse_query(request);
    debug!("failure mode request: {query:?}");
    let Some(query) = query else {
        return seal_failure(arena);
    };

    let mut out = SliceWriter::new(arena.body_mut());
    let written = match query {
        Query::TestResult => write_test_result(fault, &mut out),
        Query::Property(property) => write_property(identity, property, &mut out),
    };
    let size = TPM_HEADER_SIZE + out.position();
    match written {
        Ok(()) => arena.seal(TpmSt::NoSessions, size as u32, ResponseCode::SUCCESS),
        Err(_) => seal_failure(arena),
    }
}

fn seal_failure(arena: &mut ResponseArena) -> &[u8] {
    arena.seal(
        TpmSt::NoSessions,
        TPM_HEADER_SIZE as u32,
        TpmRc::Failure.into(),
    )
}
