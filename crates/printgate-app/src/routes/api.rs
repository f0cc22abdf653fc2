// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// JSON API: `POST /api/print` and `GET /api/audit`.
//
// Print responses are always `{success, message, job_id}`, including for
// wrong methods.

use std::fmt::Display;
use std::sync::PoisonError;

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::header::{ALLOW, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error};

use printgate_core::{AuthContext, PrintJobResult, ValidationError};

use crate::error::ApiError;
use crate::state::AppState;
use crate::upload::UploadForm;

const AUDIT_DEFAULT_LIMIT: u32 = 50;
const AUDIT_MAX_LIMIT: u32 = 500;

pub async fn print(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PrintJobResult>, ApiError> {
    let auth = bearer(&headers);

    // The token is in the headers, so a bad one is refused before a single
    // body byte is read.
    if let Err(e) = state.service.gate().authorize(&auth) {
        return Err(state.service.refuse(&auth, e.into()).await.into());
    }

    let form = match multipart {
        Ok(multipart) => {
            UploadForm::read(
                multipart,
                &state.config.spool_dir(),
                state.config.max_upload_bytes(),
                |_| Ok(()),
            )
            .await
        }
        Err(rejection) => {
            debug!(error = %rejection, "request body is not multipart");
            UploadForm::failed(ValidationError::UploadFailed)
        }
    };

    match form.into_request(auth.clone()) {
        Ok(request) => Ok(Json(state.service.submit(request).await?)),
        Err(e) => Err(state.service.reject(&auth, e).await.into()),
    }
}

/// Query for `GET /api/audit`: newest `limit` entries, or every entry for
/// one document fingerprint.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuditQuery {
    pub limit: Option<u32>,
    pub sha256: Option<String>,
}

/// Read the audit trail.  Same bearer token as printing.
pub async fn audit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AuditQuery>,
) -> Response {
    let auth = bearer(&headers);
    if let Err(e) = state.service.gate().authorize(&auth) {
        return ApiError(e.into()).into_response();
    }
    let Some(log) = state.service.audit_log().cloned() else {
        return (
            StatusCode::NOT_FOUND,
            Json(PrintJobResult::failed("audit trail disabled")),
        )
            .into_response();
    };

    let lookup = tokio::task::spawn_blocking(move || {
        let log = log.lock().unwrap_or_else(PoisonError::into_inner);
        match query.sha256.as_deref().map(str::trim).filter(|h| !h.is_empty()) {
            Some(hash) => log.entries_for_hash(&hash.to_ascii_lowercase()),
            None => log.recent_entries(query.limit.unwrap_or(AUDIT_DEFAULT_LIMIT).clamp(1, AUDIT_MAX_LIMIT)),
        }
    })
    .await;

    match lookup {
        Ok(Ok(entries)) => Json(entries).into_response(),
        Ok(Err(e)) => audit_unavailable(&e),
        Err(e) => audit_unavailable(&e),
    }
}

/// Any method other than POST.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(ALLOW, "POST")],
        Json(PrintJobResult::failed("method not allowed")),
    )
}

fn bearer(headers: &HeaderMap) -> AuthContext {
    AuthContext::bearer_from_header(headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()))
}

fn audit_unavailable(e: &dyn Display) -> Response {
    error!(error = %e, "audit query failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(PrintJobResult::failed("audit trail unavailable")),
    )
        .into_response()
}
