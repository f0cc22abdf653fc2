// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Error taxonomy for the submission pipeline.
//
// Every failure is reported to the caller as a value.  `GatewayError` wraps
// the per-stage enums and carries the HTTP status mapping so the transport
// layer never has to match on individual variants.

use thiserror::Error;

/// Authentication failures.  Deliberately low-information: an absent token
/// and a wrong token both surface as `Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("unauthorized")]
    Unauthorized,

    /// Missing or mismatched CSRF token on a state-changing request.
    #[error("invalid request")]
    InvalidRequest,
}

/// Problems with the uploaded document or the requested printer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no file uploaded")]
    NoFile,

    #[error("upload error")]
    UploadFailed,

    #[error("file too large")]
    TooLarge,

    #[error("unable to detect file type")]
    UndeterminedType,

    #[error("unsupported media type")]
    UnsupportedType,

    #[error("invalid printer")]
    InvalidPrinter,
}

/// Failure to move the validated upload into the spool directory.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to store temporary file: {0}")]
    MoveFailed(#[source] std::io::Error),
}

/// Failures while handing the document to the print backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("file not found")]
    FileNotFound,

    /// Trimmed backend output, or a generic message when there was none.
    #[error("{0}")]
    BackendFailed(String),

    #[error("print backend did not answer within {0}s")]
    Timeout(u64),
}

/// Problems found while resolving the configuration at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level error for a single print submission.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl GatewayError {
    /// HTTP status code the API reports for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Auth(AuthError::Unauthorized) => 401,
            Self::Auth(AuthError::InvalidRequest) => 400,
            Self::Validation(ValidationError::TooLarge) => 413,
            Self::Validation(
                ValidationError::UndeterminedType | ValidationError::UnsupportedType,
            ) => 415,
            Self::Validation(_) => 400,
            Self::Storage(_) => 500,
            Self::Dispatch(DispatchError::Timeout(_)) => 504,
            Self::Dispatch(_) => 502,
        }
    }
}

/// Alias used throughout the pipeline.
pub type Result<T> = std::result::Result<T, GatewayError>;
