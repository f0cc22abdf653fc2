// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multipart upload intake.
//
// The `file` part is streamed straight into a scope-guarded temporary file
// in the spool directory.  Everything else in the form is small text.  The
// byte count is enforced while streaming, so an oversized upload never
// lands on disk in full.
//
// The caller's admission check runs when the `file` part begins, against
// the fields seen so far.  A browser form therefore has to send `csrf`
// before `file`, and a refused upload is never written anywhere.

use std::io::Write;
use std::path::Path;

use axum::extract::Multipart;
use axum::extract::multipart::{Field, MultipartError};
use axum::http::StatusCode;
use tracing::{debug, warn};

use printgate_core::{
    AuthContext, AuthError, GatewayError, PrintJobRequest, UploadedDocument, ValidationError,
};

/// The fields a submission form may carry.
#[derive(Debug, Default)]
pub struct UploadForm {
    pub document: Option<UploadedDocument>,
    pub printer: Option<String>,
    pub csrf: Option<String>,
    /// First problem hit while reading the body.
    pub error: Option<GatewayError>,
}

impl UploadForm {
    /// A form whose body could not be read at all.
    pub fn failed(error: impl Into<GatewayError>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::default()
        }
    }

    /// Read every part of `multipart`.  Reading stops at the first error,
    /// which is kept in [`UploadForm::error`].
    ///
    /// `admit` sees the CSRF token received so far when the file part
    /// starts; refusing stops reading before any byte of the file is
    /// consumed.
    pub async fn read<F>(mut multipart: Multipart, spool_dir: &Path, max_bytes: u64, admit: F) -> Self
    where
        F: Fn(Option<&str>) -> Result<(), AuthError>,
    {
        let mut form = Self::default();
        loop {
            let mut field = match multipart.next_field().await {
                Ok(Some(field)) => field,
                Ok(None) => break,
                Err(e) => {
                    form.error = Some(multipart_error(&e).into());
                    break;
                }
            };
            let name = field.name().map(str::to_owned);
            let outcome: Result<(), GatewayError> = match name.as_deref() {
                Some("file") if form.document.is_none() => match admit(form.csrf.as_deref()) {
                    Ok(()) => receive_file(&mut field, spool_dir, max_bytes)
                        .await
                        .map(|doc| form.document = doc)
                        .map_err(GatewayError::from),
                    Err(e) => {
                        debug!(error = %e, "file part refused before reading");
                        Err(e.into())
                    }
                },
                Some("printer") => text(field)
                    .await
                    .map(|v| form.printer = Some(v))
                    .map_err(GatewayError::from),
                Some("csrf") => text(field)
                    .await
                    .map(|v| form.csrf = Some(v))
                    .map_err(GatewayError::from),
                _ => Ok(()),
            };
            if let Err(e) = outcome {
                form.error = Some(e);
                break;
            }
        }
        form
    }

    /// Turn the form into a pipeline request.  A missing file part (or an
    /// empty part with no file name, which is what browsers send when
    /// nothing was chosen) is `NoFile`.
    pub fn into_request(self, auth: AuthContext) -> Result<PrintJobRequest, GatewayError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        let document = self.document.ok_or(ValidationError::NoFile)?;
        Ok(PrintJobRequest {
            document,
            printer: self.printer.filter(|p| !p.trim().is_empty()),
            auth,
        })
    }
}

async fn receive_file(
    field: &mut Field<'_>,
    spool_dir: &Path,
    max_bytes: u64,
) -> Result<Option<UploadedDocument>, ValidationError> {
    let file_name = field.file_name().map(str::to_owned);
    let mut file = tempfile::Builder::new()
        .prefix("upload_")
        .tempfile_in(spool_dir)
        .map_err(|e| {
            warn!(dir = %spool_dir.display(), error = %e, "cannot create upload file");
            ValidationError::UploadFailed
        })?;

    let mut size: u64 = 0;
    while let Some(chunk) = field.chunk().await.map_err(|e| multipart_error(&e))? {
        size += chunk.len() as u64;
        if size > max_bytes {
            debug!(max = max_bytes, "upload exceeded limit while streaming");
            return Err(ValidationError::TooLarge);
        }
        file.write_all(&chunk).map_err(|e| {
            warn!(error = %e, "cannot write upload");
            ValidationError::UploadFailed
        })?;
    }
    file.flush().map_err(|_| ValidationError::UploadFailed)?;

    if size == 0 && file_name.as_deref().is_none_or(str::is_empty) {
        return Ok(None);
    }
    debug!(size, "upload received");
    Ok(Some(UploadedDocument::new(file.into_temp_path(), size)))
}

async fn text(field: Field<'_>) -> Result<String, ValidationError> {
    field.text().await.map_err(|e| multipart_error(&e))
}

fn multipart_error(e: &MultipartError) -> ValidationError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationError::TooLarge
    } else {
        debug!(error = %e.body_text(), "malformed multipart body");
        ValidationError::UploadFailed
    }
}
