// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Upload policy: size limit and sniffed-type allow-list.

use std::path::Path;

use tracing::{debug, warn};

use printgate_core::types::extension_for_mime;
use printgate_core::{DocumentType, GatewayConfig, UploadedDocument, ValidationError};

use crate::sniff::sniff_file;

/// An upload that passed policy checks, tagged with its sniffed type.
#[derive(Debug)]
pub struct ValidatedDocument {
    upload: UploadedDocument,
    doc_type: DocumentType,
}

impl ValidatedDocument {
    pub fn path(&self) -> &Path {
        self.upload.path()
    }

    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }

    pub fn mime_type(&self) -> &'static str {
        self.doc_type.mime_type()
    }

    /// Spool extension derived from the sniffed type.
    pub fn extension(&self) -> &'static str {
        extension_for_mime(self.mime_type())
    }

    pub fn declared_size(&self) -> u64 {
        self.upload.declared_size()
    }

    pub fn into_upload(self) -> UploadedDocument {
        self.upload
    }
}

/// Checks an upload's size and content type against policy.
#[derive(Debug, Clone)]
pub struct DocumentValidator {
    max_bytes: u64,
    allowed_mime_types: Vec<String>,
}

impl DocumentValidator {
    pub fn new(max_bytes: u64, allowed_mime_types: Vec<String>) -> Self {
        Self {
            max_bytes,
            allowed_mime_types,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.max_upload_bytes(), config.allowed_mime_types.clone())
    }

    /// Validate `doc`, consuming it.
    ///
    /// On rejection the document is dropped here, which removes its
    /// temporary file.
    pub fn validate(&self, doc: UploadedDocument) -> Result<ValidatedDocument, ValidationError> {
        if doc.declared_size() > self.max_bytes {
            debug!(size = doc.declared_size(), max = self.max_bytes, "upload too large");
            return Err(ValidationError::TooLarge);
        }

        let doc_type = match sniff_file(doc.path()) {
            Ok(Some(doc_type)) => doc_type,
            Ok(None) => {
                debug!(path = %doc.path().display(), "content type not recognised");
                return Err(ValidationError::UndeterminedType);
            }
            Err(e) => {
                warn!(path = %doc.path().display(), error = %e, "cannot read upload for sniffing");
                return Err(ValidationError::UploadFailed);
            }
        };

        if !self.allowed_mime_types.iter().any(|m| m == doc_type.mime_type()) {
            debug!(mime = doc_type.mime_type(), "sniffed type not allowed");
            return Err(ValidationError::UnsupportedType);
        }

        debug!(mime = doc_type.mime_type(), size = doc.declared_size(), "upload validated");
        Ok(ValidatedDocument {
            upload: doc,
            doc_type,
        })
    }
}
