// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Browser form: `GET /`, `POST /`, `POST /login`, `POST /logout`,
// `POST /printer`.
//
// Every state-changing POST carries the session's CSRF token, checked before
// anything else.  Successful form actions redirect back to `/` with 303 so a
// reload does not repeat them; failures re-render the page with a banner.
//
// Handlers never write their session snapshot back.  Login, logout and the
// printer choice change the stored session through `SessionStore::update`;
// a submission only reads it.

use axum::Form;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::http::header::{LOCATION, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;
use tracing::{debug, error};

use printgate_core::human_errors::humanize_error;
use printgate_core::{AuthError, GatewayError, ValidationError};
use printgate_security::Session;

use crate::error::status_of;
use crate::render::{Banner, PageView, page};
use crate::session::{CheckedOut, session_id, set_cookie};
use crate::state::AppState;
use crate::upload::UploadForm;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub password: String,
    pub csrf: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CsrfForm {
    pub csrf: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct PrinterForm {
    pub printer: String,
    pub csrf: Option<String>,
}

pub async fn index(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let web = match open_session(&state, &headers) {
        Ok(web) => web,
        Err(response) => return response,
    };
    render(&state, web, StatusCode::OK, None)
}

pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    let web = match open_session(&state, &headers) {
        Ok(web) => web,
        Err(response) => return response,
    };
    let gate = state.service.gate();

    // A session that has not logged in can't print, whatever the body says.
    if !gate.session_authorized(web.session.authenticated) {
        let auth = web.session.auth_context(None);
        let err = state.service.refuse(&auth, AuthError::Unauthorized.into()).await;
        return failure(&state, web, &err);
    }

    let mut form = match multipart {
        Ok(multipart) => {
            let session = &web.session;
            UploadForm::read(
                multipart,
                &state.config.spool_dir(),
                state.config.max_upload_bytes(),
                |csrf| gate.authorize(&session.auth_context(csrf)),
            )
            .await
        }
        Err(rejection) => {
            debug!(error = %rejection, "form body is not multipart");
            UploadForm::failed(ValidationError::UploadFailed)
        }
    };
    if form.printer.as_deref().is_none_or(|p| p.trim().is_empty()) {
        form.printer = web.session.printer.clone();
    }

    let auth = web.session.auth_context(form.csrf.as_deref());
    let outcome = match form.into_request(auth.clone()) {
        Ok(request) => state.service.submit(request).await,
        Err(e) => Err(state.service.reject(&auth, e).await),
    };

    match outcome {
        Ok(result) => render(
            &state,
            web,
            StatusCode::OK,
            Some(Banner::Printed {
                job_id: result.job_id,
            }),
        ),
        Err(e) => failure(&state, web, &e),
    }
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Response {
    let mut web = match open_session(&state, &headers) {
        Ok(web) => web,
        Err(response) => return response,
    };
    let gate = state.service.gate();
    let outcome = modify(&state, &mut web, |session| {
        Ok(gate.login(session, &form.password, form.csrf.as_deref())?)
    });
    match outcome {
        Ok(()) => redirect_home(&web),
        Err(e) => failure(&state, web, &e),
    }
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<CsrfForm>,
) -> Response {
    let mut web = match open_session(&state, &headers) {
        Ok(web) => web,
        Err(response) => return response,
    };
    let gate = state.service.gate();
    let outcome = modify(&state, &mut web, |session| {
        Ok(gate.logout(session, form.csrf.as_deref())?)
    });
    match outcome {
        Ok(()) => redirect_home(&web),
        Err(e) => failure(&state, web, &e),
    }
}

/// Remember the chosen printer for later submissions from this session.
pub async fn choose_printer(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<PrinterForm>,
) -> Response {
    let mut web = match open_session(&state, &headers) {
        Ok(web) => web,
        Err(response) => return response,
    };
    let gate = state.service.gate();
    let selector = state.service.selector();
    let chosen = modify(&state, &mut web, |session| {
        gate.authorize_form(session, form.csrf.as_deref())?;
        let printer = selector.select(Some(&form.printer))?;
        session.printer = Some(printer.clone());
        Ok(printer)
    });
    match chosen {
        Ok(printer) => {
            debug!(printer = %printer, "printer remembered for session");
            redirect_home(&web)
        }
        Err(e) => failure(&state, web, &e),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_session(state: &AppState, headers: &HeaderMap) -> Result<CheckedOut, Response> {
    state
        .sessions
        .check_out(session_id(headers).as_deref())
        .map_err(|e| {
            error!(error = %e, "cannot start browser session");
            (StatusCode::INTERNAL_SERVER_ERROR, "session unavailable").into_response()
        })
}

/// Run `change` against the stored session under its lock and refresh the
/// request's copy with the result, whether or not `change` succeeded.
fn modify<T>(
    state: &AppState,
    web: &mut CheckedOut,
    change: impl FnOnce(&mut Session) -> Result<T, GatewayError>,
) -> Result<T, GatewayError> {
    let updated = state.sessions.update(&web.id, |session| {
        let outcome = change(session);
        (outcome, session.clone())
    });
    match updated {
        Some((outcome, session)) => {
            web.session = session;
            outcome
        }
        None => {
            debug!("session expired during request");
            Err(AuthError::InvalidRequest.into())
        }
    }
}

/// Attach the cookie when the session is new.
fn with_cookie(web: &CheckedOut, mut response: Response) -> Response {
    if web.fresh {
        if let Ok(cookie) = HeaderValue::from_str(&set_cookie(&web.id)) {
            response.headers_mut().insert(SET_COOKIE, cookie);
        }
    }
    response
}

/// Render the page from the session as it is stored now, which may be
/// newer than the request's snapshot.
fn render(state: &AppState, web: CheckedOut, status: StatusCode, banner: Option<Banner>) -> Response {
    let gate = state.service.gate();
    let selector = state.service.selector();
    let session = state.sessions.get(&web.id).unwrap_or_else(|| web.session.clone());
    let selected = session
        .printer
        .as_deref()
        .or_else(|| selector.default_printer());
    let html = page(&PageView {
        csrf: &session.csrf_token,
        printers: selector.printers(),
        selected,
        allowed_mime_types: &state.config.allowed_mime_types,
        max_upload_mb: state.config.max_upload_mb,
        show_login: !gate.session_authorized(session.authenticated),
        show_logout: gate.sessions_enabled() && session.authenticated,
        banner,
    });
    with_cookie(&web, (status, Html(html)).into_response())
}

fn failure(state: &AppState, web: CheckedOut, err: &GatewayError) -> Response {
    let banner = Banner::Failed(humanize_error(err, state.config.max_upload_mb));
    render(state, web, status_of(err), Some(banner))
}

fn redirect_home(web: &CheckedOut) -> Response {
    let response = (StatusCode::SEE_OTHER, [(LOCATION, "/")]).into_response();
    with_cookie(web, response)
}
