// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// CSRF tokens for the browser form (double-submit: issued at session start,
// echoed in a hidden field on every state-changing POST).

use ring::rand::{SecureRandom, SystemRandom};

use crate::error::SecurityError;

/// Random bytes per token (hex-encoded to twice this length).
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh token from the system CSPRNG.
pub fn generate_token() -> Result<String, SecurityError> {
    let mut buf = [0u8; TOKEN_BYTES];
    SystemRandom::new()
        .fill(&mut buf)
        .map_err(|_| SecurityError::Random)?;
    Ok(hex::encode(buf))
}
