//! The process-wide session table.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use common::{Clock, SessionToken, SystemClock};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::session::Session;

struct TableState {
    sessions: HashMap<SessionToken, Session>,
    last_sweep: DateTime<Utc>,
}

/// Maps session tokens to the user they belong to.
///
/// Every operation takes the same table-wide lock, so `touch` calls for one
/// token are serialized and `last_activity` never moves backwards. Clones
/// share the same table.
#[derive(Clone)]
pub struct SessionTable {
    state: Arc<Mutex<TableState>>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl SessionTable {
    /// Creates an empty table on wall-clock time.
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates an empty table reading time from `clock`.
    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            state: Arc::new(Mutex::new(TableState {
                sessions: HashMap::new(),
                last_sweep: now,
            })),
            clock,
            config,
        }
    }

    /// Returns the idle time after which sessions expire.
    pub fn expire_after(&self) -> Duration {
        self.config.expire_after
    }

    /// Opens a session for `username` and returns its token.
    ///
    /// Fails with [`SessionError::ConcurrentLoginRejected`] if the user
    /// already holds a live session. A stale session left behind for the
    /// user is dropped instead of blocking the login.
    #[tracing::instrument(skip(self))]
    pub async fn create_session(&self, username: &str) -> Result<SessionToken> {
        let now = self.clock.now();
        let ttl = self.config.expire_after;
        let mut state = self.state.lock().await;

        let existing = state
            .sessions
            .values()
            .find(|s| s.username == username)
            .map(|s| (s.token, s.is_expired(now, ttl)));

        match existing {
            Some((_, false)) => {
                metrics::counter!("sessions_rejected_total").increment(1);
                tracing::warn!(username, "concurrent login rejected");
                return Err(SessionError::ConcurrentLoginRejected {
                    username: username.to_string(),
                });
            }
            Some((stale, true)) => {
                state.sessions.remove(&stale);
                metrics::counter!("sessions_expired_total").increment(1);
            }
            None => {}
        }

        let mut token = SessionToken::new();
        while state.sessions.contains_key(&token) {
            token = SessionToken::new();
        }
        state
            .sessions
            .insert(token, Session::new(token, username, now));

        metrics::counter!("sessions_created_total").increment(1);
        metrics::gauge!("sessions_active").set(state.sessions.len() as f64);
        tracing::info!(username, "session created");

        Ok(token)
    }

    /// Checks that a session is live and slides its expiry window forward.
    ///
    /// An expired session is removed as a side effect and reported as
    /// [`SessionError::Expired`]. On success the refreshed session is
    /// returned; callers extend the transport credential to
    /// [`expire_after`](Self::expire_after) from now.
    pub async fn touch(&self, token: SessionToken) -> Result<Session> {
        let now = self.clock.now();
        let ttl = self.config.expire_after;
        let mut state = self.state.lock().await;

        let session = state
            .sessions
            .get_mut(&token)
            .ok_or(SessionError::NotFound)?;

        if session.is_expired(now, ttl) {
            let username = session.username.clone();
            state.sessions.remove(&token);
            metrics::counter!("sessions_expired_total").increment(1);
            tracing::info!(%username, "session expired");
            return Err(SessionError::Expired);
        }

        if now > session.last_activity {
            session.last_activity = now;
        }
        Ok(session.clone())
    }

    /// Returns the user owning `token` without extending the session.
    pub async fn lookup(&self, token: SessionToken) -> Option<String> {
        self.state
            .lock()
            .await
            .sessions
            .get(&token)
            .map(|s| s.username.clone())
    }

    /// Removes a session. Returns true if it existed.
    pub async fn destroy(&self, token: SessionToken) -> bool {
        let mut state = self.state.lock().await;
        let removed = state.sessions.remove(&token);
        if let Some(session) = &removed {
            metrics::gauge!("sessions_active").set(state.sessions.len() as f64);
            tracing::info!(username = %session.username, "session destroyed");
        }
        removed.is_some()
    }

    /// Removes every session that is expired as of `now`.
    ///
    /// Returns how many sessions were dropped.
    #[tracing::instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> usize {
        let ttl = self.config.expire_after;
        let mut state = self.state.lock().await;

        let before = state.sessions.len();
        state.sessions.retain(|_, s| !s.is_expired(now, ttl));
        let removed = before - state.sessions.len();

        metrics::counter!("sessions_swept_total").increment(removed as u64);
        metrics::gauge!("sessions_active").set(state.sessions.len() as f64);
        if removed > 0 {
            tracing::info!(removed, "swept expired sessions");
        }
        removed
    }

    /// Launches a background sweep if none ran within the clean interval.
    ///
    /// The sweep time is recorded before the sweep runs, so concurrent
    /// logins arriving while it is in flight do not launch another one.
    pub async fn maybe_sweep(&self) -> Option<JoinHandle<usize>> {
        let now = self.clock.now();
        {
            let mut state = self.state.lock().await;
            if now - state.last_sweep <= self.config.clean_interval {
                return None;
            }
            state.last_sweep = now;
        }

        tracing::debug!("launching session sweep");
        let table = self.clone();
        Some(tokio::spawn(async move { table.sweep(now).await }))
    }

    /// Sweeps using the table's own clock.
    pub async fn sweep_now(&self) -> usize {
        self.sweep(self.clock.now()).await
    }

    /// Returns the number of sessions currently held.
    pub async fn len(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Returns true if no sessions are held.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.sessions.is_empty()
    }
}
