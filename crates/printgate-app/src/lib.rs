// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printgate: HTTP front-ends for the print pipeline.
//
// Two surfaces share one `PrintService`: a JSON API authenticated by a
// bearer token, and a browser form with cookie sessions and CSRF tokens.

pub mod data_dir;
pub mod error;
pub mod render;
pub mod routes;
pub mod session;
pub mod state;
pub mod upload;

pub use error::{ApiError, StartupError};
pub use routes::router;
pub use state::AppState;
