// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Plain-language messages for the browser form.
//
// The JSON API reports the terse `Display` text of each error; people using
// the web page get a sentence plus a hint about what to try next.

use crate::error::{AuthError, DispatchError, GatewayError, ValidationError};

/// A user-facing error banner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HumanError {
    /// Shown as the banner heading.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
}

impl HumanError {
    fn new(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Convert a pipeline error into a banner for the web form.
pub fn humanize_error(err: &GatewayError, max_upload_mb: u64) -> HumanError {
    match err {
        GatewayError::Auth(AuthError::Unauthorized) => HumanError::new(
            "You are not signed in.",
            "Sign in with the printer password, then try again.",
        ),
        GatewayError::Auth(AuthError::InvalidRequest) => HumanError::new(
            "This form has expired.",
            "Reload the page and submit the form again.",
        ),
        GatewayError::Validation(ValidationError::NoFile) => HumanError::new(
            "No file was received.",
            "Choose a file before pressing Print.",
        ),
        GatewayError::Validation(ValidationError::UploadFailed) => HumanError::new(
            "The upload did not finish.",
            "Check your connection and try again.",
        ),
        GatewayError::Validation(ValidationError::TooLarge) => HumanError::new(
            "This file is too large.",
            format!("Files up to {max_upload_mb} MB can be printed."),
        ),
        GatewayError::Validation(
            ValidationError::UnsupportedType | ValidationError::UndeterminedType,
        ) => HumanError::new(
            "This type of file can't be printed here.",
            "Save the document as a PDF and print the PDF instead.",
        ),
        GatewayError::Validation(ValidationError::InvalidPrinter) => HumanError::new(
            "That printer isn't available.",
            "Pick a printer from the list.",
        ),
        GatewayError::Storage(_) => HumanError::new(
            "The server could not store your file.",
            "Try again in a moment. If it keeps happening, tell whoever runs this printer.",
        ),
        GatewayError::Dispatch(DispatchError::FileNotFound) => HumanError::new(
            "Your file went missing before it could be printed.",
            "Please submit it again.",
        ),
        GatewayError::Dispatch(DispatchError::Timeout(_)) => HumanError::new(
            "The printer didn't respond in time.",
            "Check the printer is switched on, then try again.",
        ),
        GatewayError::Dispatch(DispatchError::BackendFailed(detail)) => HumanError::new(
            "The print server refused the job.",
            format!("Details: {detail}"),
        ),
    }
}
