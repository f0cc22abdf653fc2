// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Route table.

pub mod api;
pub mod web;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

use crate::state::AppState;

/// Room for the non-file form fields and multipart framing on top of the
/// upload limit.  The file part itself is capped while streaming.
const FORM_OVERHEAD: u64 = 64 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes().saturating_add(FORM_OVERHEAD);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    Router::new()
        .route("/api/print", post(api::print).fallback(api::method_not_allowed))
        .route("/api/audit", get(api::audit))
        .route("/", get(web::index).post(web::submit))
        .route("/login", post(web::login))
        .route("/logout", post(web::logout))
        .route("/printer", post(web::choose_printer))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
