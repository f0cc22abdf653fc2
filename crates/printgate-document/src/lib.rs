// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printgate Document: everything that happens to an upload between the
// transport layer and the print backend: content sniffing, policy checks,
// and spooling under a type-derived name.

pub mod sniff;
pub mod staging;
pub mod validate;

pub use sniff::{sniff_bytes, sniff_file};
pub use staging::{StagedDocument, stage};
pub use validate::{DocumentValidator, ValidatedDocument};
