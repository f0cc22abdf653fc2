// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory browser sessions keyed by an opaque UUID cookie.
//
// Ids are always minted here.  A cookie naming an unknown or malformed id
// gets a fresh session under a fresh id, never the id the client chose.
//
// Requests read a snapshot of their session.  Changes go through
// `SessionStore::update`, which applies them to the stored entry under the
// lock, so a slow request can never write stale credentials back over a
// login or logout that finished meanwhile.
//
// The store is bounded.  When it is full, the least recently seen session
// that carries no state (not logged in, no remembered printer) makes room
// first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use tracing::debug;
use uuid::Uuid;

use printgate_security::{SecurityError, Session};

pub const SESSION_COOKIE: &str = "printgate_session";

/// Sessions untouched for this long are forgotten.
const IDLE_LIMIT: Duration = Duration::from_secs(12 * 60 * 60);

/// Idle limit for sessions that never logged in or chose a printer.
const PRISTINE_IDLE_LIMIT: Duration = Duration::from_secs(60 * 60);

/// Default bound on stored sessions.
pub const MAX_SESSIONS: usize = 4096;

#[derive(Debug)]
struct Entry {
    session: Session,
    last_seen: Instant,
}

impl Entry {
    fn pristine(&self) -> bool {
        !self.session.authenticated && self.session.printer.is_none()
    }

    fn expired(&self, now: Instant) -> bool {
        let limit = if self.pristine() {
            PRISTINE_IDLE_LIMIT
        } else {
            IDLE_LIMIT
        };
        now.duration_since(self.last_seen) >= limit
    }
}

/// Shared session map.  Clones share the same storage.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Entry>>>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

/// A request's view of its session.
#[derive(Debug)]
pub struct CheckedOut {
    pub id: String,
    pub session: Session,
    /// True when the id was minted for this request and the cookie must be
    /// sent.
    pub fresh: bool,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding at most `capacity` sessions (at least one).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::default(),
            capacity: capacity.max(1),
        }
    }

    /// Fetch the session named by `id`, or start and store a new one.
    pub fn check_out(&self, id: Option<&str>) -> Result<CheckedOut, SecurityError> {
        let mut map = self.lock();
        let now = Instant::now();
        map.retain(|_, entry| !entry.expired(now));

        let known = id
            .filter(|id| Uuid::parse_str(id).is_ok())
            .and_then(|id| map.get_mut(id).map(|entry| (id, entry)));
        if let Some((id, entry)) = known {
            entry.last_seen = now;
            return Ok(CheckedOut {
                id: id.to_owned(),
                session: entry.session.clone(),
                fresh: false,
            });
        }

        let id = Uuid::new_v4().to_string();
        let session = Session::new()?;
        if map.len() >= self.capacity {
            evict_one(&mut map);
        }
        map.insert(
            id.clone(),
            Entry {
                session: session.clone(),
                last_seen: now,
            },
        );
        debug!(sessions = map.len(), "new browser session");
        Ok(CheckedOut {
            id,
            session,
            fresh: true,
        })
    }

    /// Apply `change` to the stored session `id` while holding the lock.
    /// Returns `None` when the session is gone (expired or evicted).
    pub fn update<T>(&self, id: &str, change: impl FnOnce(&mut Session) -> T) -> Option<T> {
        let mut map = self.lock();
        let entry = map.get_mut(id)?;
        entry.last_seen = Instant::now();
        Some(change(&mut entry.session))
    }

    /// Current stored state of session `id`.
    pub fn get(&self, id: &str) -> Option<Session> {
        self.lock().get(id).map(|entry| entry.session.clone())
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Drop the least recently seen pristine session, or the least recently
/// seen session of all when every one carries state.
fn evict_one(map: &mut HashMap<String, Entry>) {
    let oldest = |pristine_only: bool| {
        map.iter()
            .filter(|(_, entry)| !pristine_only || entry.pristine())
            .min_by_key(|(_, entry)| entry.last_seen)
            .map(|(id, _)| id.clone())
    };
    if let Some(id) = oldest(true).or_else(|| oldest(false)) {
        debug!("session store full, evicting least recently seen session");
        map.remove(&id);
    }
}

/// The session id from a request's `Cookie` headers, if any.
pub fn session_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim().to_owned())
}

/// `Set-Cookie` value for a newly minted session.
pub fn set_cookie(id: &str) -> String {
    format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Strict")
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn new_sessions_are_stored_under_minted_ids() {
        let store = SessionStore::new();
        let first = store.check_out(None).unwrap();
        assert!(first.fresh);
        assert_eq!(store.len(), 1);

        let again = store.check_out(Some(&first.id)).unwrap();
        assert!(!again.fresh);
        assert_eq!(again.id, first.id);
        assert_eq!(again.session.csrf_token, first.session.csrf_token);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn client_chosen_ids_are_not_adopted() {
        let store = SessionStore::new();
        let forged = Uuid::new_v4().to_string();
        let out = store.check_out(Some(&forged)).unwrap();
        assert!(out.fresh);
        assert_ne!(out.id, forged);

        let out = store.check_out(Some("not-a-uuid")).unwrap();
        assert!(out.fresh);
    }

    #[test]
    fn updates_persist_across_requests() {
        let store = SessionStore::new();
        let out = store.check_out(None).unwrap();
        store
            .update(&out.id, |session| {
                session.authenticated = true;
                session.printer = Some("Lab".into());
            })
            .unwrap();

        let back = store.check_out(Some(&out.id)).unwrap();
        assert!(back.session.authenticated);
        assert_eq!(back.session.printer.as_deref(), Some("Lab"));
    }

    #[test]
    fn stale_snapshot_does_not_overwrite_newer_state() {
        let store = SessionStore::new();
        let id = store.check_out(None).unwrap().id;
        store.update(&id, |session| session.authenticated = true).unwrap();

        // A long request holds a logged-in snapshot while logout lands.
        let slow = store.check_out(Some(&id)).unwrap();
        assert!(slow.session.authenticated);
        store.update(&id, |session| session.authenticated = false).unwrap();
        drop(slow);

        assert_eq!(store.get(&id).map(|s| s.authenticated), Some(false));
    }

    #[test]
    fn update_of_unknown_session_is_none() {
        let store = SessionStore::new();
        assert_eq!(store.update("missing", |_| ()), None);
    }

    #[test]
    fn capacity_bounds_the_store() {
        let store = SessionStore::with_capacity(8);
        for _ in 0..100 {
            store.check_out(None).unwrap();
        }
        assert_eq!(store.len(), 8);
    }

    #[test]
    fn eviction_prefers_sessions_without_state() {
        let store = SessionStore::with_capacity(3);
        let kept = store.check_out(None).unwrap().id;
        store.update(&kept, |session| session.authenticated = true).unwrap();

        for _ in 0..10 {
            store.check_out(None).unwrap();
        }
        assert_eq!(store.len(), 3);
        assert_eq!(store.get(&kept).map(|s| s.authenticated), Some(true));
    }

    #[test]
    fn parses_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; printgate_session=abc-123 ; other=1"),
        );
        assert_eq!(session_id(&headers).as_deref(), Some("abc-123"));
        assert_eq!(session_id(&HeaderMap::new()), None);
    }

    #[test]
    fn cookie_attributes() {
        let cookie = set_cookie("abc");
        assert!(cookie.starts_with("printgate_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
    }
}
