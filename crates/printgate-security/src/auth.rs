// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Request authentication.
//
// Two paths lead to a print submission:
//   - API clients present the shared token as `Authorization: Bearer <token>`.
//   - Browsers hold a session; when an interactive password is configured the
//     session must have logged in.  Every state-changing form POST echoes the
//     session's CSRF token, checked before anything else happens.
//
// All secret comparisons go through `integrity::secrets_match`, which is
// constant-time.  Failures never say which check failed.

use printgate_core::{AuthContext, AuthError, GatewayConfig};
use tracing::{debug, info, warn};

use crate::csrf;
use crate::error::SecurityError;
use crate::integrity::secrets_match;

/// Per-browser state.  Persisted by the transport layer's session store; the
/// gate only reads and updates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub authenticated: bool,
    pub csrf_token: String,
    /// Printer chosen on the form, remembered between submissions.
    pub printer: Option<String>,
}

impl Session {
    /// A new, unauthenticated session with a fresh CSRF token.
    pub fn new() -> Result<Self, SecurityError> {
        Ok(Self {
            authenticated: false,
            csrf_token: csrf::generate_token()?,
            printer: None,
        })
    }

    /// Snapshot this session as the credentials of one request.
    pub fn auth_context(&self, presented_csrf: Option<&str>) -> AuthContext {
        AuthContext::Session {
            authenticated: self.authenticated,
            csrf_token: self.csrf_token.clone(),
            presented_csrf: presented_csrf.map(str::to_owned),
        }
    }

    fn rotate_csrf(&mut self) -> Result<(), SecurityError> {
        self.csrf_token = csrf::generate_token()?;
        Ok(())
    }
}

/// Decides whether a request may submit a job.
#[derive(Debug, Clone)]
pub struct AuthGate {
    api_token: String,
    password: Option<String>,
}

impl AuthGate {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            api_token: config.api_token.clone(),
            password: config.password().map(str::to_owned),
        }
    }

    /// Whether the browser form requires a login.
    pub fn sessions_enabled(&self) -> bool {
        self.password.is_some()
    }

    /// Authorise a submission.
    ///
    /// Session contexts are checked for CSRF first, so a forged POST is
    /// rejected with `InvalidRequest` even when the session is logged in.
    pub fn authorize(&self, context: &AuthContext) -> Result<(), AuthError> {
        match context {
            AuthContext::Bearer(token) => {
                // An unset API token disables the API entirely.
                if self.api_token.is_empty() || token.is_empty() {
                    debug!("bearer token missing or API disabled");
                    return Err(AuthError::Unauthorized);
                }
                if secrets_match(token, &self.api_token) {
                    Ok(())
                } else {
                    warn!("bearer token rejected");
                    Err(AuthError::Unauthorized)
                }
            }
            AuthContext::Session {
                authenticated,
                csrf_token,
                presented_csrf,
            } => {
                check_csrf(csrf_token, presented_csrf.as_deref())?;
                if self.session_authorized(*authenticated) {
                    Ok(())
                } else {
                    Err(AuthError::Unauthorized)
                }
            }
        }
    }

    /// Whether a session may see the print form.  Always true in open mode.
    pub fn session_authorized(&self, authenticated: bool) -> bool {
        !self.sessions_enabled() || authenticated
    }

    /// Handle a login POST.  On success the session is marked authenticated
    /// and its CSRF token rotated.
    pub fn login(
        &self,
        session: &mut Session,
        password: &str,
        presented_csrf: Option<&str>,
    ) -> Result<(), AuthError> {
        check_csrf(&session.csrf_token, presented_csrf)?;
        let Some(expected) = self.password.as_deref() else {
            // Open mode: nothing to log into.
            return Ok(());
        };
        if !secrets_match(password, expected) {
            warn!("interactive login rejected");
            return Err(AuthError::Unauthorized);
        }
        session.authenticated = true;
        rotate(session)?;
        info!("interactive session authenticated");
        Ok(())
    }

    /// Handle a logout POST.
    pub fn logout(&self, session: &mut Session, presented_csrf: Option<&str>) -> Result<(), AuthError> {
        check_csrf(&session.csrf_token, presented_csrf)?;
        session.authenticated = false;
        session.printer = None;
        rotate(session)?;
        info!("interactive session logged out");
        Ok(())
    }

    /// Gate a state-changing POST other than login/logout/submission
    /// (e.g. changing the remembered printer).
    pub fn authorize_form(&self, session: &Session, presented_csrf: Option<&str>) -> Result<(), AuthError> {
        self.authorize(&session.auth_context(presented_csrf))
    }
}

/// Compare the echoed CSRF token against the session's.
pub fn check_csrf(expected: &str, presented: Option<&str>) -> Result<(), AuthError> {
    match presented {
        Some(token) if !token.is_empty() && secrets_match(token, expected) => Ok(()),
        _ => {
            warn!("CSRF token missing or mismatched");
            Err(AuthError::InvalidRequest)
        }
    }
}

fn rotate(session: &mut Session) -> Result<(), AuthError> {
    // A session that cannot get a fresh token must not keep the old one.
    session.rotate_csrf().map_err(|e| {
        warn!(error = %e, "CSRF rotation failed");
        session.authenticated = false;
        AuthError::InvalidRequest
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOKEN: &str = "CHANGE_ME_SECRET_TOKEN";

    fn gate(password: Option<&str>) -> AuthGate {
        AuthGate::new(&GatewayConfig {
            api_token: TOKEN.into(),
            interactive_password: password.map(str::to_owned),
            ..Default::default()
        })
    }

    #[test]
    fn bearer_accepts_configured_token() {
        let ctx = AuthContext::bearer_from_header(Some("Bearer CHANGE_ME_SECRET_TOKEN"));
        assert_eq!(gate(None).authorize(&ctx), Ok(()));
    }

    #[test]
    fn bearer_rejects_every_other_token() {
        let gate = gate(None);
        for token in ["", "C", "CHANGE_ME", "CHANGE_ME_SECRET_TOKE", "CHANGE_ME_SECRET_TOKENS", "change_me_secret_token"] {
            assert_eq!(
                gate.authorize(&AuthContext::Bearer(token.into())),
                Err(AuthError::Unauthorized),
                "{token:?}"
            );
        }
    }

    #[test]
    fn malformed_header_is_unauthorized() {
        let gate = gate(None);
        for header in [None, Some("CHANGE_ME_SECRET_TOKEN"), Some("Basic CHANGE_ME_SECRET_TOKEN")] {
            let ctx = AuthContext::bearer_from_header(header);
            assert_eq!(gate.authorize(&ctx), Err(AuthError::Unauthorized));
        }
    }

    #[test]
    fn empty_configured_token_disables_api() {
        let gate = AuthGate::new(&GatewayConfig::default());
        assert_eq!(
            gate.authorize(&AuthContext::Bearer(String::new())),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn open_mode_session_only_needs_csrf() {
        let gate = gate(None);
        let session = Session::new().unwrap();
        let csrf = session.csrf_token.clone();
        assert_eq!(gate.authorize(&session.auth_context(Some(&csrf))), Ok(()));
        assert_eq!(
            gate.authorize(&session.auth_context(None)),
            Err(AuthError::InvalidRequest)
        );
    }

    #[test]
    fn csrf_is_checked_before_authentication() {
        let gate = gate(Some("hunter2"));
        let mut session = Session::new().unwrap();
        session.authenticated = true;
        assert_eq!(
            gate.authorize(&session.auth_context(Some("forged"))),
            Err(AuthError::InvalidRequest)
        );
        assert_eq!(
            gate.authorize(&session.auth_context(Some(""))),
            Err(AuthError::InvalidRequest)
        );
    }

    #[test]
    fn unauthenticated_session_is_rejected_when_password_set() {
        let gate = gate(Some("hunter2"));
        let session = Session::new().unwrap();
        let csrf = session.csrf_token.clone();
        assert_eq!(
            gate.authorize(&session.auth_context(Some(&csrf))),
            Err(AuthError::Unauthorized)
        );
    }

    #[test]
    fn login_flow_rotates_csrf() {
        let gate = gate(Some("hunter2"));
        let mut session = Session::new().unwrap();
        let before = session.csrf_token.clone();

        assert_eq!(
            gate.login(&mut session, "wrong", Some(&before)),
            Err(AuthError::Unauthorized)
        );
        assert!(!session.authenticated);

        assert_eq!(
            gate.login(&mut session, "hunter2", None),
            Err(AuthError::InvalidRequest)
        );
        assert!(!session.authenticated);

        gate.login(&mut session, "hunter2", Some(&before)).unwrap();
        assert!(session.authenticated);
        assert_ne!(session.csrf_token, before);

        let after = session.csrf_token.clone();
        assert_eq!(gate.authorize(&session.auth_context(Some(&after))), Ok(()));
        assert_eq!(
            gate.authorize(&session.auth_context(Some(&before))),
            Err(AuthError::InvalidRequest)
        );
    }

    #[test]
    fn logout_requires_csrf_and_clears_state() {
        let gate = gate(Some("hunter2"));
        let mut session = Session::new().unwrap();
        let csrf = session.csrf_token.clone();
        gate.login(&mut session, "hunter2", Some(&csrf)).unwrap();
        session.printer = Some("Office".into());

        assert_eq!(gate.logout(&mut session, None), Err(AuthError::InvalidRequest));
        assert!(session.authenticated);

        let csrf = session.csrf_token.clone();
        gate.logout(&mut session, Some(&csrf)).unwrap();
        assert!(!session.authenticated);
        assert!(session.printer.is_none());
    }
}
