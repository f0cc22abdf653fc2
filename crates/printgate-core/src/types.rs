// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Printgate submission pipeline.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::TempPath;

/// Extension used for any sniffed type missing from the extension table.
pub const UNKNOWN_EXTENSION: &str = ".bin";

/// Document formats recognised by content sniffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    Pdf,
    PostScript,
    Jpeg,
    Png,
    Tiff,
    Gif,
    PlainText,
    /// PWG Raster (IPP Everywhere page images).
    PwgRaster,
    /// Apple raster (AirPrint).
    Urf,
}

impl DocumentType {
    /// Canonical MIME type string.
    pub fn mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::PostScript => "application/postscript",
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Tiff => "image/tiff",
            Self::Gif => "image/gif",
            Self::PlainText => "text/plain",
            Self::PwgRaster => "image/pwg-raster",
            Self::Urf => "image/urf",
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.mime_type())
    }
}

/// Spool-file extension for a sniffed MIME type.
///
/// Only the sniffed type is ever consulted, so a client cannot pick the
/// extension by naming its upload.
pub fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "application/pdf" => ".pdf",
        "application/postscript" => ".ps",
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/tiff" => ".tiff",
        "text/plain" => ".txt",
        "image/pwg-raster" => ".pwg",
        "image/urf" => ".urf",
        _ => UNKNOWN_EXTENSION,
    }
}

/// Credentials presented with a request.  Built once per request by the
/// transport layer and never persisted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthContext {
    /// Static API token from an `Authorization: Bearer` header.  Empty when
    /// the header was absent or malformed.
    Bearer(String),
    /// Browser session.
    Session {
        authenticated: bool,
        /// Token issued at session start.
        csrf_token: String,
        /// Token echoed back by the form, if any.
        presented_csrf: Option<String>,
    },
}

impl AuthContext {
    /// Build a bearer context from a raw `Authorization` header value.
    ///
    /// The scheme is matched case-insensitively.  Anything that is not
    /// `Bearer <token>` yields an empty token, which never authorises.
    pub fn bearer_from_header(header: Option<&str>) -> Self {
        let token = header
            .map(str::trim)
            .and_then(|h| h.split_once(char::is_whitespace))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim().to_owned())
            .unwrap_or_default();
        Self::Bearer(token)
    }
}

/// An uploaded document waiting to be validated.
///
/// The pipeline owns the file for the duration of one request.  The path is
/// held by a [`TempPath`] guard, so the file is unlinked when the document
/// is dropped on any exit path.
#[derive(Debug)]
pub struct UploadedDocument {
    path: TempPath,
    declared_size: u64,
}

impl UploadedDocument {
    pub fn new(path: TempPath, declared_size: u64) -> Self {
        Self {
            path,
            declared_size,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn declared_size(&self) -> u64 {
        self.declared_size
    }

    /// Give up ownership of the path guard (used when the file is moved).
    pub fn into_temp_path(self) -> TempPath {
        self.path
    }
}

/// One submission, as handed to the pipeline.
#[derive(Debug)]
pub struct PrintJobRequest {
    pub document: UploadedDocument,
    /// Requested queue; `None` selects the default.
    pub printer: Option<String>,
    pub auth: AuthContext,
}

/// Outcome of a submission as reported to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintJobResult {
    pub success: bool,
    /// Confirmation text or backend diagnostic.
    pub message: String,
    /// Backend job number, when it could be parsed from the output.
    pub job_id: Option<String>,
}

impl PrintJobResult {
    /// A job the backend accepted.
    pub fn sent(job_id: Option<String>) -> Self {
        Self {
            success: true,
            message: "Print job sent".into(),
            job_id,
        }
    }

    /// A failed submission carrying the error text.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            job_id: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(
            AuthContext::bearer_from_header(Some("Bearer s3cret")),
            AuthContext::Bearer("s3cret".into())
        );
        assert_eq!(
            AuthContext::bearer_from_header(Some("bearer   s3cret ")),
            AuthContext::Bearer("s3cret".into())
        );
        assert_eq!(
            AuthContext::bearer_from_header(Some("Basic dXNlcjpwYXNz")),
            AuthContext::Bearer(String::new())
        );
        assert_eq!(
            AuthContext::bearer_from_header(Some("s3cret")),
            AuthContext::Bearer(String::new())
        );
        assert_eq!(
            AuthContext::bearer_from_header(None),
            AuthContext::Bearer(String::new())
        );
    }

    #[test]
    fn extension_table_falls_back_to_bin() {
        assert_eq!(extension_for_mime("application/pdf"), ".pdf");
        assert_eq!(extension_for_mime(DocumentType::Urf.mime_type()), ".urf");
        assert_eq!(extension_for_mime(DocumentType::Gif.mime_type()), UNKNOWN_EXTENSION);
        assert_eq!(extension_for_mime("application/x-msdownload"), ".bin");
    }

    #[test]
    fn result_serialises_with_job_id_key() {
        let json = serde_json::to_value(PrintJobResult::sent(Some("42".into()))).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Print job sent");
        assert_eq!(json["job_id"], "42");

        let json = serde_json::to_value(PrintJobResult::failed("File too large")).unwrap();
        assert!(json["job_id"].is_null());
    }

    #[test]
    fn dropping_document_removes_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_path_buf();
        let doc = UploadedDocument::new(file.into_temp_path(), 0);
        assert!(path.exists());
        drop(doc);
        assert!(!path.exists());
    }
}
