// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Gateway configuration.
//
// A JSON file provides the static layer; environment variables override
// individual keys.  Both layers go through the same syntax checks, but a bad
// file is a startup error while a bad override is logged and dropped.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

/// Env var naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "PRINTGATE_CONFIG";

/// Files probed, in order, when no explicit path is given.
const CONFIG_CANDIDATES: [&str; 2] = ["printgate.json", "printgate.example.json"];

/// Validated, read-only gateway settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Allow-list of queue names, in display order.
    #[serde(rename = "printers")]
    pub printer_names: Vec<String>,
    /// Queue used when the request names none.  May be empty.
    #[serde(rename = "printer_name")]
    pub default_printer: String,
    #[serde(rename = "cups_server")]
    pub backend_host: String,
    #[serde(rename = "cups_port")]
    pub backend_port: u16,
    /// Shared secret for the JSON API.  Empty disables the API.
    pub api_token: String,
    #[serde(rename = "max_file_size_mb")]
    pub max_upload_mb: u64,
    pub allowed_mime_types: Vec<String>,
    /// Enables the login form when set and non-empty.
    #[serde(rename = "ui_password")]
    pub interactive_password: Option<String>,
    /// Submission program plus any fixed leading arguments.
    #[serde(rename = "lp_command")]
    pub backend_command: Vec<String>,
    #[serde(rename = "lp_timeout_secs")]
    pub submit_timeout_secs: u64,
    pub listen_addr: String,
    /// Where validated uploads are staged.  Defaults to the system temp dir.
    pub spool_dir: Option<PathBuf>,
    pub audit_enabled: bool,
    /// Audit database path.  Defaults to `<data dir>/audit.db`.
    pub audit_db: Option<PathBuf>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            printer_names: Vec::new(),
            default_printer: String::new(),
            backend_host: "localhost".into(),
            backend_port: 631,
            api_token: String::new(),
            max_upload_mb: 20,
            allowed_mime_types: vec!["application/pdf".into()],
            interactive_password: None,
            backend_command: vec!["lp".into()],
            submit_timeout_secs: 60,
            listen_addr: "0.0.0.0:8080".into(),
            spool_dir: None,
            audit_enabled: true,
            audit_db: None,
        }
    }
}

impl GatewayConfig {
    /// Upload limit in bytes.
    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Queues a request may target.  An empty list falls back to the default
    /// printer as the sole entry.
    pub fn allowed_printers(&self) -> Vec<&str> {
        if self.printer_names.is_empty() {
            if self.default_printer.is_empty() {
                Vec::new()
            } else {
                vec![self.default_printer.as_str()]
            }
        } else {
            self.printer_names.iter().map(String::as_str).collect()
        }
    }

    pub fn is_mime_allowed(&self, mime: &str) -> bool {
        self.allowed_mime_types.iter().any(|m| m == mime)
    }

    /// The interactive password, if session auth is enabled.
    pub fn password(&self) -> Option<&str> {
        self.interactive_password
            .as_deref()
            .filter(|p| !p.is_empty())
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn spool_dir(&self) -> PathBuf {
        self.spool_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Check every field against its syntax rules.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(bad) = self.printer_names.iter().find(|p| !is_valid_printer_name(p)) {
            return Err(ConfigError::Invalid(format!("invalid printer name {bad:?}")));
        }
        if !self.default_printer.is_empty() && !is_valid_printer_name(&self.default_printer) {
            return Err(ConfigError::Invalid(format!(
                "invalid default printer {:?}",
                self.default_printer
            )));
        }
        if !is_valid_host(&self.backend_host) {
            return Err(ConfigError::Invalid(format!(
                "invalid backend host {:?}",
                self.backend_host
            )));
        }
        if self.backend_port == 0 {
            return Err(ConfigError::Invalid("backend port must be non-zero".into()));
        }
        if self.max_upload_mb == 0 {
            return Err(ConfigError::Invalid("max_file_size_mb must be positive".into()));
        }
        if self.allowed_mime_types.is_empty() {
            return Err(ConfigError::Invalid("allowed_mime_types is empty".into()));
        }
        if let Some(bad) = self.allowed_mime_types.iter().find(|m| !is_valid_mime_type(m)) {
            return Err(ConfigError::Invalid(format!("invalid MIME type {bad:?}")));
        }
        match self.backend_command.first() {
            Some(program) if !program.trim().is_empty() => {}
            _ => return Err(ConfigError::Invalid("lp_command is empty".into())),
        }
        if self.submit_timeout_secs == 0 {
            return Err(ConfigError::Invalid("lp_timeout_secs must be positive".into()));
        }
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "invalid listen address {:?}",
                self.listen_addr
            )));
        }
        Ok(())
    }
}

/// Queue names: `[A-Za-z0-9._-]+`.
pub fn is_valid_printer_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
}

/// `type/subtype` using RFC 6838 restricted-name characters.
pub fn is_valid_mime_type(mime: &str) -> bool {
    fn restricted_name(part: &str) -> bool {
        let mut chars = part.chars();
        match chars.next() {
            Some(first) if first.is_ascii_alphanumeric() => chars.all(|c| {
                c.is_ascii_alphanumeric()
                    || matches!(c, '!' | '#' | '$' | '&' | '-' | '^' | '_' | '.' | '+')
            }),
            _ => false,
        }
    }
    match mime.split_once('/') {
        Some((ty, subtype)) => restricted_name(ty) && restricted_name(subtype),
        None => false,
    }
}

/// Host names and IP literals accepted by `lp -h`.
pub fn is_valid_host(host: &str) -> bool {
    !host.is_empty()
        && !host.starts_with('-')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | ':' | '[' | ']'))
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Produces a [`GatewayConfig`] by layering environment overrides over a
/// static JSON file.
///
/// The lookup function is injectable so overrides can be exercised without
/// touching the process environment.
pub struct ConfigResolver<F> {
    lookup: F,
}

impl ConfigResolver<fn(&str) -> Option<String>> {
    /// Resolver reading the real process environment.
    pub fn from_env() -> Self {
        Self {
            lookup: env_var as fn(&str) -> Option<String>,
        }
    }
}

impl<F> ConfigResolver<F>
where
    F: Fn(&str) -> Option<String>,
{
    pub fn with_lookup(lookup: F) -> Self {
        Self { lookup }
    }

    /// Resolve from the file named by `PRINTGATE_CONFIG`, else the first
    /// candidate file present in the working directory, else defaults.
    pub fn resolve(&self) -> Result<GatewayConfig, ConfigError> {
        let explicit = self.var(CONFIG_PATH_ENV).map(PathBuf::from);
        let path = explicit.or_else(|| {
            CONFIG_CANDIDATES
                .iter()
                .map(PathBuf::from)
                .find(|p| p.is_file())
        });
        self.resolve_from(path.as_deref())
    }

    /// Resolve from an explicit file (or defaults when `None`).
    pub fn resolve_from(&self, path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
        let mut config = match path {
            Some(path) => load_file(path)?,
            None => {
                info!("no config file found, using defaults");
                GatewayConfig::default()
            }
        };
        config.validate()?;
        self.apply_overrides(&mut config);
        Ok(config)
    }

    /// Apply every well-formed environment override.  Malformed values are
    /// logged and ignored.
    pub fn apply_overrides(&self, config: &mut GatewayConfig) {
        if let Some(v) = self.var("PRINTER_NAME") {
            if is_valid_printer_name(&v) {
                config.default_printer = v;
            } else {
                dropped("PRINTER_NAME");
            }
        }
        if let Some(v) = self.var("PRINTERS") {
            let names = comma_list(&v, "PRINTERS", is_valid_printer_name);
            if names.is_empty() {
                dropped("PRINTERS");
            } else {
                config.printer_names = names;
            }
        }
        if let Some(v) = self.var("CUPS_SERVER") {
            if is_valid_host(&v) {
                config.backend_host = v;
            } else {
                dropped("CUPS_SERVER");
            }
        }
        if let Some(port) = self.digits::<u16>("CUPS_PORT") {
            config.backend_port = port;
        }
        if let Some(v) = self.var("API_TOKEN") {
            config.api_token = v;
        }
        if let Some(mb) = self.digits::<u64>("MAX_FILE_SIZE_MB") {
            config.max_upload_mb = mb;
        }
        if let Some(v) = self.var("ALLOWED_MIME_TYPES") {
            let types = comma_list(&v, "ALLOWED_MIME_TYPES", is_valid_mime_type);
            if types.is_empty() {
                dropped("ALLOWED_MIME_TYPES");
            } else {
                config.allowed_mime_types = types;
            }
        }
        if let Some(v) = self.var("UI_PASSWORD") {
            config.interactive_password = Some(v);
        }
        if let Some(v) = self.var("LISTEN_ADDR") {
            if v.parse::<SocketAddr>().is_ok() {
                config.listen_addr = v;
            } else {
                dropped("LISTEN_ADDR");
            }
        }
        if let Some(secs) = self.digits::<u64>("LP_TIMEOUT_SECS") {
            config.submit_timeout_secs = secs;
        }
    }

    /// Non-empty value of `key`.
    fn var(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.is_empty())
    }

    /// Positive all-digit value of `key`.
    fn digits<T>(&self, key: &str) -> Option<T>
    where
        T: std::str::FromStr + Default + PartialEq,
    {
        let raw = self.var(key)?;
        let parsed = raw
            .bytes()
            .all(|b| b.is_ascii_digit())
            .then(|| raw.parse::<T>().ok())
            .flatten()
            .filter(|v| *v != T::default());
        if parsed.is_none() {
            dropped(key);
        }
        parsed
    }
}

/// Read and parse a JSON config file.
pub fn load_file(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let shown = path.display().to_string();
    let data = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: shown.clone(),
        source,
    })?;
    let config = serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
        path: shown.clone(),
        source,
    })?;
    debug!(path = %shown, "config file loaded");
    Ok(config)
}

fn comma_list(raw: &str, key: &str, valid: fn(&str) -> bool) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter(|part| {
            let ok = valid(part);
            if !ok {
                warn!(key, value = %part, "ignoring malformed list entry");
            }
            ok
        })
        .map(str::to_owned)
        .collect()
}

fn dropped(key: &str) {
    warn!(key, "ignoring malformed environment override");
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn resolver(vars: &[(&str, &str)]) -> ConfigResolver<impl Fn(&str) -> Option<String>> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConfigResolver::with_lookup(move |key: &str| map.get(key).cloned())
    }

    #[test]
    fn defaults_are_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_upload_bytes(), 20 * 1024 * 1024);
        assert!(config.is_mime_allowed("application/pdf"));
        assert!(config.password().is_none());
    }

    #[test]
    fn default_printer_is_sole_entry_when_list_empty() {
        let config = GatewayConfig {
            default_printer: "DeskJet_3630".into(),
            ..Default::default()
        };
        assert_eq!(config.allowed_printers(), vec!["DeskJet_3630"]);

        let config = GatewayConfig {
            printer_names: vec!["Office".into(), "Lab".into()],
            default_printer: "DeskJet_3630".into(),
            ..Default::default()
        };
        assert_eq!(config.allowed_printers(), vec!["Office", "Lab"]);
    }

    #[test]
    fn empty_password_disables_sessions() {
        let config = GatewayConfig {
            interactive_password: Some(String::new()),
            ..Default::default()
        };
        assert!(config.password().is_none());
    }

    #[test]
    fn printer_name_charset() {
        assert!(is_valid_printer_name("DeskJet_3630"));
        assert!(is_valid_printer_name("office.floor-2"));
        assert!(!is_valid_printer_name(""));
        assert!(!is_valid_printer_name("Office Printer"));
        assert!(!is_valid_printer_name("lp;rm -rf /"));
    }

    #[test]
    fn mime_syntax() {
        assert!(is_valid_mime_type("application/pdf"));
        assert!(is_valid_mime_type("image/pwg-raster"));
        assert!(is_valid_mime_type("application/vnd.hp-pcl"));
        assert!(!is_valid_mime_type("pdf"));
        assert!(!is_valid_mime_type("application/"));
        assert!(!is_valid_mime_type("/pdf"));
        assert!(!is_valid_mime_type("text/plain; charset=utf-8"));
    }

    #[test]
    fn file_values_are_validated() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"printer_name": "DeskJet_3630", "printers": ["bad name"]}}"#
        )
        .unwrap();
        let err = resolver(&[]).resolve_from(Some(file.path())).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn file_uses_original_key_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "printer_name": "DeskJet_3630",
                "cups_server": "print.lan",
                "cups_port": 6310,
                "api_token": "CHANGE_ME_SECRET_TOKEN",
                "max_file_size_mb": 5,
                "allowed_mime_types": ["application/pdf", "image/png"]
            }}"#
        )
        .unwrap();
        let config = resolver(&[]).resolve_from(Some(file.path())).unwrap();
        assert_eq!(config.default_printer, "DeskJet_3630");
        assert_eq!(config.backend_host, "print.lan");
        assert_eq!(config.backend_port, 6310);
        assert_eq!(config.max_upload_bytes(), 5 * 1024 * 1024);
        assert!(config.is_mime_allowed("image/png"));
        assert_eq!(config.backend_command, vec!["lp".to_string()]);
    }

    #[test]
    fn unparsable_file_names_its_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        match load_file(file.path()) {
            Err(ConfigError::Parse { path, .. }) => {
                assert_eq!(path, file.path().display().to_string());
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = resolver(&[])
            .resolve_from(Some(Path::new("/nonexistent/printgate.json")))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn well_formed_overrides_win() {
        let config = resolver(&[
            ("PRINTER_NAME", "Office"),
            ("PRINTERS", "Office, Lab ,,"),
            ("CUPS_SERVER", "cups.internal"),
            ("CUPS_PORT", "632"),
            ("API_TOKEN", "t0ken"),
            ("MAX_FILE_SIZE_MB", "3"),
            ("ALLOWED_MIME_TYPES", "application/pdf,image/jpeg"),
            ("UI_PASSWORD", "hunter2"),
            ("LP_TIMEOUT_SECS", "15"),
        ])
        .resolve_from(None)
        .unwrap();
        assert_eq!(config.default_printer, "Office");
        assert_eq!(config.printer_names, vec!["Office", "Lab"]);
        assert_eq!(config.backend_host, "cups.internal");
        assert_eq!(config.backend_port, 632);
        assert_eq!(config.api_token, "t0ken");
        assert_eq!(config.max_upload_mb, 3);
        assert_eq!(config.allowed_mime_types, vec!["application/pdf", "image/jpeg"]);
        assert_eq!(config.password(), Some("hunter2"));
        assert_eq!(config.submit_timeout(), Duration::from_secs(15));
    }

    #[test]
    fn malformed_overrides_are_dropped() {
        let config = resolver(&[
            ("PRINTER_NAME", "bad name"),
            ("PRINTERS", "a b, ;"),
            ("CUPS_SERVER", "-oProxyCommand"),
            ("CUPS_PORT", "63x"),
            ("MAX_FILE_SIZE_MB", "-1"),
            ("ALLOWED_MIME_TYPES", "pdf"),
            ("LISTEN_ADDR", "not-an-addr"),
            ("LP_TIMEOUT_SECS", "0"),
        ])
        .resolve_from(None)
        .unwrap();
        assert_eq!(config, GatewayConfig::default());
    }

    #[test]
    fn partially_valid_lists_keep_good_entries() {
        let config = resolver(&[("ALLOWED_MIME_TYPES", "application/pdf, nonsense, image/png")])
            .resolve_from(None)
            .unwrap();
        assert_eq!(config.allowed_mime_types, vec!["application/pdf", "image/png"]);
    }
}
