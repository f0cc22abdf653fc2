// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Audit trail: append-only SQLite log of every print submission.
//
// Schema:
//   submissions(
//     id            INTEGER PRIMARY KEY AUTOINCREMENT,
//     timestamp     TEXT    NOT NULL,   -- RFC 3339
//     channel       TEXT    NOT NULL,   -- "api" or "web"
//     printer       TEXT,               -- selected queue, if selection ran
//     document_hash TEXT    NOT NULL,   -- SHA-256 hex, "-" if never validated
//     success       INTEGER NOT NULL,   -- 0 = failure, 1 = success
//     job_id        TEXT,               -- parsed backend job number
//     details       TEXT                -- message returned to the client
//   )

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, Row, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::error::SecurityError;

const CREATE_TABLE_SQL: &str = "
    CREATE TABLE IF NOT EXISTS submissions (
        id            INTEGER PRIMARY KEY AUTOINCREMENT,
        timestamp     TEXT    NOT NULL,
        channel       TEXT    NOT NULL,
        printer       TEXT,
        document_hash TEXT    NOT NULL,
        success       INTEGER NOT NULL,
        job_id        TEXT,
        details       TEXT
    );";

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, channel, printer, document_hash, success, job_id, details FROM submissions";

/// One submission outcome to be appended.
#[derive(Debug, Clone, Copy)]
pub struct AuditRecord<'a> {
    pub channel: &'a str,
    pub printer: Option<&'a str>,
    pub document_hash: &'a str,
    pub success: bool,
    pub job_id: Option<&'a str>,
    pub details: &'a str,
}

/// A stored audit row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub channel: String,
    pub printer: Option<String>,
    pub document_hash: String,
    pub success: bool,
    pub job_id: Option<String>,
    pub details: Option<String>,
}

impl AuditEntry {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            timestamp: row.get(1)?,
            channel: row.get(2)?,
            printer: row.get(3)?,
            document_hash: row.get(4)?,
            success: row.get::<_, i32>(5)? != 0,
            job_id: row.get(6)?,
            details: row.get(7)?,
        })
    }
}

/// Append-only submission log.
#[derive(Debug)]
pub struct AuditLog {
    conn: Connection,
}

impl AuditLog {
    /// Open (or create) the audit database at `path`, creating parent
    /// directories as needed.  WAL mode is enabled.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SecurityError> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        debug!("audit log opened");
        Ok(Self { conn })
    }

    /// Open an in-memory audit database (useful for tests).
    pub fn open_in_memory() -> Result<Self, SecurityError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(CREATE_TABLE_SQL)?;
        debug!("in-memory audit log opened");
        Ok(Self { conn })
    }

    /// Append one submission outcome.
    #[instrument(skip(self, record), fields(channel = record.channel, success = record.success))]
    pub fn record(&self, record: &AuditRecord<'_>) -> Result<(), SecurityError> {
        self.conn.execute(
            "INSERT INTO submissions
                 (timestamp, channel, printer, document_hash, success, job_id, details)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                Utc::now().to_rfc3339(),
                record.channel,
                record.printer,
                record.document_hash,
                i32::from(record.success),
                record.job_id,
                record.details,
            ],
        )?;
        debug!("audit entry recorded");
        Ok(())
    }

    /// The most recent `limit` entries, newest first.
    pub fn recent_entries(&self, limit: u32) -> Result<Vec<AuditEntry>, SecurityError> {
        let sql = format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![limit], AuditEntry::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// All entries for one document fingerprint, oldest first.
    pub fn entries_for_hash(&self, document_hash: &str) -> Result<Vec<AuditEntry>, SecurityError> {
        let sql = format!("{SELECT_COLUMNS} WHERE document_hash = ?1 ORDER BY id ASC");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![document_hash], AuditEntry::from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    pub fn count(&self) -> Result<u64, SecurityError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM submissions", [], |row| row.get(0))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_log() -> AuditLog {
        AuditLog::open_in_memory().expect("open in-memory audit log")
    }

    fn sent<'a>(hash: &'a str, job_id: Option<&'a str>) -> AuditRecord<'a> {
        AuditRecord {
            channel: "api",
            printer: Some("Office"),
            document_hash: hash,
            success: true,
            job_id,
            details: "Print job sent",
        }
    }

    #[test]
    fn record_and_count() {
        let log = make_log();
        assert_eq!(log.count().unwrap(), 0);
        log.record(&sent("abc123", Some("42"))).unwrap();
        log.record(&sent("abc123", None)).unwrap();
        assert_eq!(log.count().unwrap(), 2);
    }

    #[test]
    fn entries_for_hash() {
        let log = make_log();
        log.record(&sent("aaa", Some("1"))).unwrap();
        log.record(&sent("bbb", Some("2"))).unwrap();
        log.record(&AuditRecord {
            channel: "web",
            printer: None,
            document_hash: "aaa",
            success: false,
            job_id: None,
            details: "Unsupported media type",
        })
        .unwrap();

        let entries = log.entries_for_hash("aaa").unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries[0].success);
        assert_eq!(entries[0].job_id.as_deref(), Some("1"));
        assert_eq!(entries[1].channel, "web");
        assert!(!entries[1].success);
        assert!(entries[1].printer.is_none());
        assert_eq!(entries[1].details.as_deref(), Some("Unsupported media type"));
    }

    #[test]
    fn recent_entries_ordering() {
        let log = make_log();
        for i in 0..5 {
            log.record(&sent(&format!("hash_{i}"), None)).unwrap();
        }
        let recent = log.recent_entries(3).unwrap();
        assert_eq!(recent.len(), 3);
        assert!(recent[0].id > recent[1].id);
        assert!(recent[1].id > recent[2].id);
        assert_eq!(recent[0].document_hash, "hash_4");
    }

    #[test]
    fn file_backed_log_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("audit.db");
        let log = AuditLog::open(&path).unwrap();
        log.record(&sent("abc", None)).unwrap();
        drop(log);

        let reopened = AuditLog::open(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 1);
    }
}
