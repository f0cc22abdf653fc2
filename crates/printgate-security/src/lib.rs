// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>

//! printgate-security: who may print, and a record of what was printed.
//!
//! Bearer and session authentication with constant-time comparisons, CSRF
//! tokens for the browser form, SHA-256 document fingerprints, and an
//! append-only SQLite audit trail of submissions.

pub mod audit;
pub mod auth;
pub mod csrf;
pub mod error;
pub mod integrity;

pub use audit::{AuditEntry, AuditLog, AuditRecord};
pub use auth::{AuthGate, Session};
pub use error::SecurityError;
pub use integrity::{hash_bytes, hash_file};
