// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printgate Print: queue selection, `lp` dispatch with a bounded wait, and
// the end-to-end submission pipeline used by the HTTP front-ends.

pub mod dispatch;
pub mod job_id;
pub mod selector;
pub mod service;

pub use dispatch::PrintDispatcher;
pub use job_id::extract_job_id;
pub use selector::PrinterSelector;
pub use service::PrintService;
