// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content sniffing.
//
// The document type is decided from the file's leading bytes alone.  The
// client's Content-Type header and file name are never consulted.

use std::io::Read;
use std::path::Path;

use printgate_core::DocumentType;

/// Bytes read from the head of a file for sniffing.
pub const SNIFF_LEN: usize = 1024;

/// Binary signatures, checked in order against the start of the file.
const SIGNATURES: &[(&[u8], DocumentType)] = &[
    (b"%PDF-", DocumentType::Pdf),
    (b"%!", DocumentType::PostScript),
    // DOS EPS binary header.
    (&[0xC5, 0xD0, 0xD3, 0xC6], DocumentType::PostScript),
    (&[0xFF, 0xD8, 0xFF], DocumentType::Jpeg),
    (&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A], DocumentType::Png),
    (b"II*\0", DocumentType::Tiff),
    (b"MM\0*", DocumentType::Tiff),
    (b"GIF87a", DocumentType::Gif),
    (b"GIF89a", DocumentType::Gif),
    (b"RaS2", DocumentType::PwgRaster),
    (b"UNIRAST\0", DocumentType::Urf),
];

/// Sniff the type of the file at `path`.
///
/// Returns `Ok(None)` when the content matches nothing we recognise.
pub fn sniff_file(path: &Path) -> std::io::Result<Option<DocumentType>> {
    let file = std::fs::File::open(path)?;
    let mut head = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(sniff_bytes(&head))
}

/// Sniff the type of an in-memory buffer (only the first [`SNIFF_LEN`]
/// bytes matter).
pub fn sniff_bytes(data: &[u8]) -> Option<DocumentType> {
    let head = &data[..data.len().min(SNIFF_LEN)];
    if head.is_empty() {
        return None;
    }
    SIGNATURES
        .iter()
        .find(|(magic, _)| head.starts_with(magic))
        .map(|(_, ty)| *ty)
        .or_else(|| looks_like_text(head).then_some(DocumentType::PlainText))
}

/// UTF-8 without control characters other than common whitespace, form feed
/// and escape (used by printer-ready text).
fn looks_like_text(head: &[u8]) -> bool {
    let valid = match std::str::from_utf8(head) {
        Ok(_) => true,
        // A multi-byte character cut off at the sniff boundary is fine.
        Err(e) => e.error_len().is_none() && e.valid_up_to() > 0 && head.len() == SNIFF_LEN,
    };
    valid
        && head
            .iter()
            .all(|&b| b >= 0x20 || matches!(b, b'\t' | b'\n' | b'\r' | 0x0C | 0x1B))
        && !head.contains(&0x7F)
}
