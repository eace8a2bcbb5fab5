// SPDX-FileCopyrightText: © 2025 Phala Network <dstack@phala.network>
//
// SPDX-License-Identifier: Apache-2.0

//! Authorization path selection
//!
//! A `Sessions` command carries an authorization area between the handles
//! and the parameters; a `NoSessions` command goes straight to its
//! parameters and must not need any authorization a session would provide.

use std::ops::Range;

use tpm2_wire::{TpmReader, TpmRc, TpmSt, MIN_AUTH_SESSION_SIZE};

use crate::context::CommandContext;
use crate::error::Result;
use crate::platform::{Authorization, CommandIndex};

/// Authorize the command whose bytes after the handle area are `rest`.
///
/// Returns where the parameters lie within `rest`.
pub fn authorize(
    auth: &mut impl Authorization,
    ctx: &mut CommandContext,
    tag: TpmSt,
    index: CommandIndex,
    handles: &[u32],
    rest: &mut [u8],
) -> Result<Range<usize>> {
    if tag != TpmSt::Sessions {
        auth.check_no_session(ctx, index, handles, rest)?;
        return Ok(0..rest.len());
    }

    let mut reader = TpmReader::new(rest);
    let auth_size = reader.get_u32()?;
    let start = reader.position();
    let remaining = reader.remaining();

    // A plausible size can still be wrong; the session processor finds out
    // when it unmarshals the sessions.
    if auth_size < MIN_AUTH_SESSION_SIZE || auth_size as usize > remaining {
        return Err(TpmRc::Size.into());
    }

    let (sessions, parameters) = rest[start..].split_at_mut(auth_size as usize);
    auth.process_sessions(ctx, index, handles, sessions, parameters)?;
    Ok(start + auth_size as usize..rest.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::ResponseSizes;

    #[derive(Default)]
    struct Recorder {
        sessions: Option<Vec<u8>>,
        no_session_params: Option<Vec<u8>>,
        reject: bool,
    }

    impl Authorization for Recorder {
        fn process_sessions(
            &mut self,
            _: &mut CommandContext,
            _: CommandIndex,
            _: &[u32],
            sessions: &[u8],
            parameters: &mut [u8],
        ) -> Result<()> {
            self.sessions = Some(sessions.to_vec());
            // Decrypt the first parameter byte in place
            if let Some(first) = parameters.first_mut() {
                *first ^= 0xFF;
            }
            if self.reject {
                return Err(TpmRc::AuthFail.into());
            }
            Ok(())
        }

        fn check_no_session(
            &mut self,
            _: &mut CommandContext,
            _: CommandIndex,
            _: &[u32],
            parameters: &[u8],
        ) -> Result<()> {
            self.no_session_params = Some(parameters.to_vec());
            if self.reject {
                return Err(TpmRc::AuthMissing.into());
            }
            Ok(())
        }

        fn build_response_sessions(
            &mut self,
            _: &mut CommandContext,
            _: TpmSt,
            _: CommandIndex,
            _: ResponseSizes,
            _: &mut [u8],
        ) -> u32 {
            0
        }
    }

    fn run(recorder: &mut Recorder, tag: TpmSt, rest: &mut [u8]) -> Result<Range<usize>> {
        let mut ctx = CommandContext::new();
        authorize(recorder, &mut ctx, tag, CommandIndex(0), &[], rest)
    }

    #[test]
    fn test_no_sessions_takes_everything() {
        let mut recorder = Recorder::default();
        let mut rest = [1, 2, 3];
        assert_eq!(run(&mut recorder, TpmSt::NoSessions, &mut rest).unwrap(), 0..3);
        assert_eq!(recorder.no_session_params, Some(vec![1, 2, 3]));
        assert!(recorder.sessions.is_none());
    }

    #[test]
    fn test_sessions_split() {
        let mut recorder = Recorder::default();
        let mut rest = vec![0, 0, 0, 9];
        rest.extend_from_slice(&[0x11; 9]);
        rest.extend_from_slice(&[0x0F, 0x22]);
        let params = run(&mut recorder, TpmSt::Sessions, &mut rest).unwrap();
        assert_eq!(params, 13..15);
        assert_eq!(recorder.sessions, Some(vec![0x11; 9]));
        // The parameter was decrypted in the command buffer itself
        assert_eq!(&rest[params], &[0xF0, 0x22]);
    }

    #[test]
    fn test_auth_size_too_small() {
        let mut recorder = Recorder::default();
        let mut rest = vec![0, 0, 0, 3, 0, 0, 0, 0, 0, 0, 0, 0, 0];
        let err = run(&mut recorder, TpmSt::Sessions, &mut rest).unwrap_err();
        assert!(err.response_code().is(TpmRc::Size));
        assert!(recorder.sessions.is_none());
    }

    #[test]
    fn test_auth_size_past_end() {
        let mut recorder = Recorder::default();
        let mut rest = vec![0, 0, 0, 10];
        rest.extend_from_slice(&[0; 9]);
        let err = run(&mut recorder, TpmSt::Sessions, &mut rest).unwrap_err();
        assert!(err.response_code().is(TpmRc::Size));
    }

    #[test]
    fn test_missing_auth_size() {
        let mut recorder = Recorder::default();
        let mut rest = [0, 0];
        let err = run(&mut recorder, TpmSt::Sessions, &mut rest).unwrap_err();
        assert!(err.response_code().is(TpmRc::Insufficient));
    }

    #[test]
    fn test_rejections_propagate() {
        let mut recorder = Recorder {
            reject: true,
            ..Default::default()
        };
        let err = run(&mut recorder, TpmSt::NoSessions, &mut []).unwrap_err();
        assert!(err.response_code().is(TpmRc::AuthMissing));
    }
}
