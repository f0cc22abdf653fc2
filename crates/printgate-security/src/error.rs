// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Errors raised by the security primitives themselves (as opposed to the
// authentication verdicts, which are `printgate_core::AuthError`).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SecurityError {
    #[error("system random number generator failed")]
    Random,

    #[error("audit database error: {0}")]
    Database(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for SecurityError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}
