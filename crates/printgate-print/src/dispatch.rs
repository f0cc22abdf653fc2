// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Submission to the print backend via `lp`.
//
// The command is always spawned from an argument vector, never through a
// shell, so queue names and paths reach `lp` verbatim.  The wait is bounded;
// on timeout the child is dropped and `kill_on_drop` terminates it.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use printgate_core::{DispatchError, GatewayConfig, PrintJobResult};

use crate::job_id::extract_job_id;

/// Message used when `lp` fails without printing anything.
pub const SILENT_FAILURE: &str = "submission failed";

/// Runs the submission command against one backend.
#[derive(Debug, Clone)]
pub struct PrintDispatcher {
    program: String,
    leading_args: Vec<String>,
    host: String,
    port: u16,
    timeout: Duration,
}

impl PrintDispatcher {
    /// `command` is the program followed by fixed leading arguments.
    pub fn new(command: &[String], host: &str, port: u16, timeout: Duration) -> Self {
        let (program, leading_args) = match command.split_first() {
            Some((program, rest)) => (program.clone(), rest.to_vec()),
            None => ("lp".to_owned(), Vec::new()),
        };
        Self {
            program,
            leading_args,
            host: host.to_owned(),
            port,
            timeout,
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            &config.backend_command,
            &config.backend_host,
            config.backend_port,
            config.submit_timeout(),
        )
    }

    /// `host:port` as passed to `lp -h`.
    pub fn server(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    fn command(&self, path: &Path, printer: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("-d")
            .arg(printer)
            .arg("-h")
            .arg(self.server())
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Submit the file at `path` to `printer`.
    ///
    /// Exit status zero is success; the job id is parsed from stdout+stderr
    /// when present.  Any other status is reported with the trimmed output.
    #[instrument(skip(self, path), fields(server = %self.server()))]
    pub async fn dispatch(&self, path: &Path, printer: &str) -> Result<PrintJobResult, DispatchError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() => {}
            _ => return Err(DispatchError::FileNotFound),
        }

        let child = self.command(path, printer).spawn().map_err(|e| {
            warn!(program = %self.program, error = %e, "cannot start print command");
            DispatchError::BackendFailed(format!("cannot run {}: {e}", self.program))
        })?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                warn!(timeout_secs = self.timeout.as_secs(), "print command timed out, killed");
                DispatchError::Timeout(self.timeout.as_secs())
            })?
            .map_err(|e| DispatchError::BackendFailed(format!("print command failed: {e}")))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim();

        if !output.status.success() {
            warn!(status = %output.status, output = combined, "print command rejected job");
            let message = if combined.is_empty() {
                SILENT_FAILURE.to_owned()
            } else {
                combined.to_owned()
            };
            return Err(DispatchError::BackendFailed(message));
        }

        let job_id = extract_job_id(combined, printer);
        if job_id.is_none() {
            debug!(output = combined, "no job id in backend output");
        }
        info!(job_id = job_id.as_deref().unwrap_or("-"), "print job accepted");
        Ok(PrintJobResult::sent(job_id))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::io::Write;
    use std::time::Instant;

    use super::*;

    /// Dispatcher whose "lp" is an inline shell script; the dispatcher's
    /// arguments arrive as `$1...`.
    fn scripted(script: &str, timeout: Duration) -> PrintDispatcher {
        let command: Vec<String> = ["sh", "-c", script, "lp"].map(String::from).to_vec();
        PrintDispatcher::new(&command, "localhost", 631, timeout)
    }

    fn document() -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"%PDF-1.4\n").unwrap();
        file
    }

    #[tokio::test]
    async fn parses_job_id_on_success() {
        let file = document();
        let dispatcher = scripted("echo 'request id is Office-42 (1 file)'", Duration::from_secs(5));
        let result = dispatcher.dispatch(file.path(), "Office").await.unwrap();
        assert!(result.success);
        assert_eq!(result.message, "Print job sent");
        assert_eq!(result.job_id.as_deref(), Some("42"));
    }

    #[tokio::test]
    async fn success_without_job_id() {
        let file = document();
        let dispatcher = scripted("echo 'request id is Office (1 file)'", Duration::from_secs(5));
        let result = dispatcher.dispatch(file.path(), "Office").await.unwrap();
        assert!(result.success);
        assert_eq!(result.job_id, None);
    }

    #[tokio::test]
    async fn arguments_are_passed_verbatim() {
        let file = document();
        // Echo each argument on its own line, then fail so the output comes back.
        let dispatcher = scripted(r#"printf '[%s]\n' "$@"; exit 3"#, Duration::from_secs(5));
        let hostile = "Office; touch /tmp/pwned $(id)";
        let err = dispatcher.dispatch(file.path(), hostile).await.unwrap_err();
        let DispatchError::BackendFailed(output) = err else {
            panic!("expected backend failure, got {err:?}");
        };
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[-d]".to_owned(),
                format!("[{hostile}]"),
                "[-h]".to_owned(),
                "[localhost:631]".to_owned(),
                format!("[{}]", file.path().display()),
            ]
        );
    }

    #[tokio::test]
    async fn nonzero_exit_reports_combined_output() {
        let file = document();
        let dispatcher = scripted(
            "echo 'partial'; echo 'lp: The printer or class does not exist.' >&2; exit 1",
            Duration::from_secs(5),
        );
        let err = dispatcher.dispatch(file.path(), "Office").await.unwrap_err();
        assert_eq!(
            err,
            DispatchError::BackendFailed(
                "partial\nlp: The printer or class does not exist.".into()
            )
        );
    }

    #[tokio::test]
    async fn silent_failure_gets_generic_message() {
        let file = document();
        let dispatcher = scripted("exit 2", Duration::from_secs(5));
        let err = dispatcher.dispatch(file.path(), "Office").await.unwrap_err();
        assert_eq!(err, DispatchError::BackendFailed(SILENT_FAILURE.into()));
    }

    #[tokio::test]
    async fn hung_backend_times_out() {
        let file = document();
        let dispatcher = scripted("sleep 30", Duration::from_millis(200));
        let started = Instant::now();
        let err = dispatcher.dispatch(file.path(), "Office").await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn missing_file_is_not_dispatched() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let script = format!("touch '{}'", marker.display());
        let dispatcher = scripted(&script, Duration::from_secs(5));
        let err = dispatcher
            .dispatch(&dir.path().join("gone.pdf"), "Office")
            .await
            .unwrap_err();
        assert_eq!(err, DispatchError::FileNotFound);
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn missing_program_is_a_backend_failure() {
        let file = document();
        let dispatcher = PrintDispatcher::new(
            &["/nonexistent/lp".to_owned()],
            "localhost",
            631,
            Duration::from_secs(5),
        );
        let err = dispatcher.dispatch(file.path(), "Office").await.unwrap_err();
        assert!(matches!(err, DispatchError::BackendFailed(_)));
    }

    #[test]
    fn server_argument() {
        let dispatcher = PrintDispatcher::from_config(&GatewayConfig {
            backend_host: "cups.internal".into(),
            backend_port: 632,
            ..Default::default()
        });
        assert_eq!(dispatcher.server(), "cups.internal:632");
    }
}
