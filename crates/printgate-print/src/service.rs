// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The submission pipeline shared by both front-ends.
//
//   authorize -> validate -> select printer -> spool -> dispatch -> audit
//
// The upload is owned by the pipeline from the start, so every early return
// drops it (or its spooled copy) and the file is removed.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinError;
use tracing::{info, instrument, warn};

use printgate_core::{AuthContext, GatewayConfig, GatewayError, PrintJobRequest, PrintJobResult};
use printgate_document::{DocumentValidator, stage};
use printgate_security::{AuditLog, AuditRecord, AuthGate, SecurityError, hash_file};

use crate::dispatch::PrintDispatcher;
use crate::selector::PrinterSelector;

/// Placeholder hash for submissions that never produced a document.
const NO_DOCUMENT: &str = "-";

/// What the audit record needs to know about a submission that got far
/// enough to be worth describing.
#[derive(Debug, Default)]
struct Trace {
    printer: Option<String>,
    document_hash: Option<String>,
}

/// Orchestrates one print submission end to end.
#[derive(Debug)]
pub struct PrintService {
    gate: AuthGate,
    validator: DocumentValidator,
    selector: PrinterSelector,
    dispatcher: PrintDispatcher,
    spool_dir: PathBuf,
    audit: Option<Arc<Mutex<AuditLog>>>,
}

impl PrintService {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            gate: AuthGate::new(config),
            validator: DocumentValidator::from_config(config),
            selector: PrinterSelector::from_config(config),
            dispatcher: PrintDispatcher::from_config(config),
            spool_dir: config.spool_dir(),
            audit: None,
        }
    }

    /// Record every submission outcome in `log`.
    pub fn with_audit(mut self, log: Arc<Mutex<AuditLog>>) -> Self {
        self.audit = Some(log);
        self
    }

    pub fn gate(&self) -> &AuthGate {
        &self.gate
    }

    pub fn selector(&self) -> &PrinterSelector {
        &self.selector
    }

    pub fn audit_log(&self) -> Option<&Arc<Mutex<AuditLog>>> {
        self.audit.as_ref()
    }

    /// Run one submission.  Errors carry the stage that failed; the upload
    /// is gone from disk by the time this returns, whatever the outcome.
    #[instrument(skip_all, fields(channel = channel_of(&request.auth)))]
    pub async fn submit(&self, request: PrintJobRequest) -> Result<PrintJobResult, GatewayError> {
        let channel = channel_of(&request.auth);
        let mut trace = Trace::default();
        let outcome = self.run(request, &mut trace).await;

        match &outcome {
            Ok(result) => info!(
                printer = trace.printer.as_deref().unwrap_or("-"),
                job_id = result.job_id.as_deref().unwrap_or("-"),
                "submission complete"
            ),
            Err(e) => warn!(status = e.status_code(), error = %e, "submission failed"),
        }
        self.audit(channel, trace, outcome.as_ref()).await;
        outcome
    }

    /// Account for a request whose body never yielded a document.
    ///
    /// Credentials are still checked first, so an unauthorised caller only
    /// ever learns that it is unauthorised.
    pub async fn reject(&self, auth: &AuthContext, err: GatewayError) -> GatewayError {
        let err = match self.gate.authorize(auth) {
            Ok(()) => err,
            Err(auth_err) => auth_err.into(),
        };
        self.refuse(auth, err).await
    }

    /// Log and audit a request turned away as `err`, with no further checks.
    /// Used when the caller already knows the credentials are bad and the
    /// body should not be read at all.
    #[instrument(skip_all, fields(channel = channel_of(auth)))]
    pub async fn refuse(&self, auth: &AuthContext, err: GatewayError) -> GatewayError {
        warn!(status = err.status_code(), error = %err, "submission rejected");
        self.audit(channel_of(auth), Trace::default(), Err(&err)).await;
        err
    }

    async fn run(
        &self,
        request: PrintJobRequest,
        trace: &mut Trace,
    ) -> Result<PrintJobResult, GatewayError> {
        let PrintJobRequest {
            document,
            printer,
            auth,
        } = request;

        self.gate.authorize(&auth)?;
        let validated = self.validator.validate(document)?;
        let printer = self.selector.select(printer.as_deref())?;
        trace.printer = Some(printer.clone());

        let staged = stage(validated, &self.spool_dir)?;
        if self.audit.is_some() {
            let path = staged.path().to_path_buf();
            trace.document_hash = document_hash(tokio::task::spawn_blocking(move || hash_file(&path)).await);
        }

        let result = self.dispatcher.dispatch(staged.path(), &printer).await?;
        Ok(result)
    }

    /// Append the outcome to the audit log on the blocking pool.  Failures
    /// are logged and otherwise ignored.
    async fn audit(
        &self,
        channel: &'static str,
        trace: Trace,
        outcome: Result<&PrintJobResult, &GatewayError>,
    ) {
        let Some(log) = self.audit.clone() else {
            return;
        };
        let (success, job_id, details) = match outcome {
            Ok(result) => (true, result.job_id.clone(), result.message.clone()),
            Err(e) => (false, None, e.to_string()),
        };
        let write = tokio::task::spawn_blocking(move || {
            let log = log.lock().unwrap_or_else(PoisonError::into_inner);
            log.record(&AuditRecord {
                channel,
                printer: trace.printer.as_deref(),
                document_hash: trace.document_hash.as_deref().unwrap_or(NO_DOCUMENT),
                success,
                job_id: job_id.as_deref(),
                details: &details,
            })
        })
        .await;
        match write {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "failed to write audit entry"),
            Err(e) => warn!(error = %e, "audit task did not complete"),
        }
    }
}

/// The hash recorded for a staged document, or `None` (logged) when it could
/// not be computed.
fn document_hash(joined: Result<Result<String, SecurityError>, JoinError>) -> Option<String> {
    match joined {
        Ok(Ok(hash)) => Some(hash),
        Ok(Err(e)) => {
            warn!(error = %e, "cannot hash document for the audit trail");
            None
        }
        Err(e) => {
            warn!(error = %e, "hash task did not complete");
            None
        }
    }
}

fn channel_of(auth: &AuthContext) -> &'static str {
    match auth {
        AuthContext::Bearer(_) => "api",
        AuthContext::Session { .. } => "web",
    }
}
