// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Spooling of validated uploads.
//
// The upload is moved to `<spool>/print_<random><ext>`, where the extension
// comes from the sniffed type.  The spooled file is scope-guarded exactly
// like the upload was, so dropping a `StagedDocument` removes it.

use std::path::Path;

use tempfile::TempPath;
use tracing::{debug, warn};

use printgate_core::{DocumentType, StorageError};

use crate::validate::ValidatedDocument;

/// A validated document sitting in the spool directory.
#[derive(Debug)]
pub struct StagedDocument {
    path: TempPath,
    doc_type: DocumentType,
}

impl StagedDocument {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn doc_type(&self) -> DocumentType {
        self.doc_type
    }
}

/// Move `doc` into `spool_dir`.
///
/// Falls back to copy-and-delete when a rename is impossible (e.g. the spool
/// is on another filesystem).  On any failure both files are removed.
pub fn stage(doc: ValidatedDocument, spool_dir: &Path) -> Result<StagedDocument, StorageError> {
    let doc_type = doc.doc_type();
    let target = tempfile::Builder::new()
        .prefix("print_")
        .suffix(doc.extension())
        .tempfile_in(spool_dir)
        .map_err(StorageError::MoveFailed)?
        .into_temp_path();
    let source = doc.into_upload().into_temp_path();

    match std::fs::rename(&source, &target) {
        Ok(()) => {
            // The upload path is gone; disarm its guard so nothing else
            // created at that path later gets unlinked.
            if let Err(e) = source.keep() {
                warn!(error = %e, "could not release upload guard after rename");
            }
        }
        Err(rename_err) => {
            debug!(error = %rename_err, "rename into spool failed, copying");
            std::fs::copy(&source, &target).map_err(StorageError::MoveFailed)?;
            // `source` drops here and removes the original upload.
        }
    }

    debug!(path = %target.display(), mime = doc_type.mime_type(), "upload spooled");
    Ok(StagedDocument {
        path: target,
        doc_type,
    })
}
