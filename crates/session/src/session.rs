//! Session record.

use chrono::{DateTime, Duration, Utc};
use common::SessionToken;
use serde::{Deserialize, Serialize};

/// A logged-in user's session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: SessionToken,
    pub username: String,
    pub last_activity: DateTime<Utc>,
}

impl Session {
    /// Creates a session that was last active at `now`.
    pub fn new(token: SessionToken, username: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            token,
            username: username.into(),
            last_activity: now,
        }
    }

    /// Returns true once `now` is at least `ttl` past the last activity.
    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.last_activity >= ttl
    }

    /// Returns the instant at which the session expires if left idle.
    pub fn expires_at(&self, ttl: Duration) -> DateTime<Utc> {
        self.last_activity + ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_expired_within_window() {
        let now = Utc::now();
        let session = Session::new(SessionToken::new(), "alice", now);
        let ttl = Duration::seconds(300);

        assert!(!session.is_expired(now, ttl));
        assert!(!session.is_expired(now + Duration::seconds(299), ttl));
    }

    #[test]
    fn test_expired_at_boundary() {
        let now = Utc::now();
        let session = Session::new(SessionToken::new(), "alice", now);
        let ttl = Duration::seconds(300);

        assert!(session.is_expired(now + ttl, ttl));
        assert!(session.is_expired(now + Duration::hours(1), ttl));
    }

    #[test]
    fn test_expires_at() {
        let now = Utc::now();
        let session = Session::new(SessionToken::new(), "bob", now);
        assert_eq!(
            session.expires_at(Duration::seconds(60)),
            now + Duration::seconds(60)
        );
    }
}
