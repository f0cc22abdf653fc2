// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Shared state handed to every axum handler.
//
// `PrintService` holds the rusqlite-backed audit log behind `Arc<Mutex<>>`,
// so the whole state is cheap to clone per request.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use printgate_core::GatewayConfig;
use printgate_print::PrintService;
use printgate_security::AuditLog;

use crate::data_dir;
use crate::session::SessionStore;

#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<GatewayConfig>,
    pub service: Arc<PrintService>,
    pub sessions: SessionStore,
}

impl AppState {
    /// State without an audit trail.
    pub fn new(config: GatewayConfig) -> Self {
        let service = PrintService::new(&config);
        Self::assemble(config, service)
    }

    /// State recording every submission in `audit`.
    pub fn with_audit(config: GatewayConfig, audit: AuditLog) -> Self {
        let service = PrintService::new(&config).with_audit(Arc::new(Mutex::new(audit)));
        Self::assemble(config, service)
    }

    /// Build state for the running server: opens the audit database named
    /// by the config (or the default under the data dir) when auditing is
    /// enabled, falling back to an in-memory log if the file can't be
    /// opened.
    pub fn from_config(config: GatewayConfig) -> Self {
        if !config.audit_enabled {
            info!("audit trail disabled");
            return Self::new(config);
        }
        let path = config
            .audit_db
            .clone()
            .unwrap_or_else(|| data_dir::data_dir().join("audit.db"));
        let audit = match AuditLog::open(&path) {
            Ok(log) => {
                match log.count() {
                    Ok(entries) => info!(path = %path.display(), entries, "audit trail opened"),
                    Err(e) => warn!(path = %path.display(), error = %e, "audit trail opened but unreadable"),
                }
                Some(log)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "audit database unavailable, using in-memory log");
                AuditLog::open_in_memory()
                    .inspect_err(|e| warn!(error = %e, "in-memory audit log failed, auditing off"))
                    .ok()
            }
        };
        match audit {
            Some(log) => Self::with_audit(config, log),
            None => Self::new(config),
        }
    }

    fn assemble(config: GatewayConfig, service: PrintService) -> Self {
        Self {
            config: Arc::new(config),
            service: Arc::new(service),
            sessions: SessionStore::new(),
        }
    }
}
