// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Printgate: HTTP print gateway.
//
// Entry point. Initialises logging, resolves configuration, opens the audit
// trail, and serves the API and browser form until Ctrl-C.

use std::process::ExitCode;

use tracing::{error, info, warn};

use printgate_app::{AppState, StartupError, router};
use printgate_core::ConfigResolver;

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Printgate starting");

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Printgate stopped");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), StartupError> {
    let config = ConfigResolver::from_env().resolve()?;

    if config.api_token.is_empty() {
        warn!("API_TOKEN is not set, the JSON API will reject every request");
    }
    if config.password().is_none() {
        warn!("UI_PASSWORD is not set, the browser form is open to anyone who can reach it");
    }

    let spool = config.spool_dir();
    std::fs::create_dir_all(&spool).map_err(|source| StartupError::Spool {
        path: spool.display().to_string(),
        source,
    })?;

    let addr = config.listen_addr.clone();
    info!(
        printers = ?config.allowed_printers(),
        backend = %format!("{}:{}", config.backend_host, config.backend_port),
        spool = %spool.display(),
        "configuration resolved"
    );

    let app = router(AppState::from_config(config));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(StartupError::Serve)?;

    info!("Printgate shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}
