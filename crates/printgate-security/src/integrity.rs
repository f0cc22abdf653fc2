// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document fingerprints and constant-time secret comparison.

use std::io::Read;
use std::path::Path;

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::SecurityError;

/// Compute the SHA-256 hash of `data` and return it as a lowercase hex string.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// SHA-256 of a file's contents, streamed in 64 KiB blocks.
///
/// Used to fingerprint spooled documents for the audit trail without loading
/// the whole upload into memory.
pub fn hash_file(path: &Path) -> Result<String, SecurityError> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Compare two secrets without leaking where they first differ.
///
/// Both sides are digested first so the comparison always runs over 32
/// bytes, independent of either input's length.
pub fn secrets_match(presented: &str, expected: &str) -> bool {
    let a = Sha256::digest(presented.as_bytes());
    let b = Sha256::digest(expected.as_bytes());
    bool::from(a.as_slice().ct_eq(b.as_slice()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    /// SHA-256 of the empty byte slice (well-known constant).
    const EMPTY_SHA256: &str =
        "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    #[test]
    fn hash_empty_input() {
        assert_eq!(hash_bytes(b""), EMPTY_SHA256);
    }

    #[test]
    fn hash_known_value() {
        // SHA-256("hello"), verified against coreutils sha256sum.
        let expected = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";
        assert_eq!(hash_bytes(b"hello"), expected);
    }

    #[test]
    fn file_hash_matches_byte_hash() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let data = vec![0x25u8; 200_000];
        file.write_all(&data).unwrap();
        assert_eq!(hash_file(file.path()).unwrap(), hash_bytes(&data));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = hash_file(Path::new("/nonexistent/printgate-doc.pdf")).unwrap_err();
        assert!(matches!(err, SecurityError::Io(_)));
    }

    #[test]
    fn secret_comparison() {
        assert!(secrets_match("CHANGE_ME_SECRET_TOKEN", "CHANGE_ME_SECRET_TOKEN"));
        assert!(!secrets_match("CHANGE_ME_SECRET_TOKE", "CHANGE_ME_SECRET_TOKEN"));
        assert!(!secrets_match("CHANGE_ME_SECRET_TOKENX", "CHANGE_ME_SECRET_TOKEN"));
        assert!(!secrets_match("", "CHANGE_ME_SECRET_TOKEN"));
    }
}
