// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Resolves the requested queue against the configured allow-list.

use tracing::debug;

use printgate_core::{GatewayConfig, ValidationError};

/// Allow-list of queues plus the one used when a request names none.
#[derive(Debug, Clone)]
pub struct PrinterSelector {
    printers: Vec<String>,
    default: Option<String>,
}

impl PrinterSelector {
    pub fn from_config(config: &GatewayConfig) -> Self {
        let printers: Vec<String> = config
            .allowed_printers()
            .into_iter()
            .map(str::to_owned)
            .collect();
        // The explicit default only counts if it is itself allowed.
        let default = printers
            .iter()
            .find(|p| **p == config.default_printer)
            .or_else(|| printers.first())
            .cloned();
        Self { printers, default }
    }

    /// Queues offered to clients, in configured order.
    pub fn printers(&self) -> &[String] {
        &self.printers
    }

    pub fn default_printer(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Pick the queue for a request.
    ///
    /// An unknown name is an error, never a silent fallback to the default.
    /// A blank name counts as no name.
    pub fn select(&self, requested: Option<&str>) -> Result<String, ValidationError> {
        match requested.map(str::trim).filter(|r| !r.is_empty()) {
            Some(name) => {
                if self.printers.iter().any(|p| p == name) {
                    Ok(name.to_owned())
                } else {
                    debug!(requested = name, "printer not in allow-list");
                    Err(ValidationError::InvalidPrinter)
                }
            }
            None => self.default.clone().ok_or_else(|| {
                debug!("no printer configured");
                ValidationError::InvalidPrinter
            }),
        }
    }
}
