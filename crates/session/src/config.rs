//! Session timing configuration.

use chrono::Duration;

/// Default idle time after which a session expires (5 minutes).
pub const DEFAULT_EXPIRE_SECS: i64 = 300;

/// Default minimum gap between two sweeps (2 minutes).
pub const DEFAULT_CLEAN_SECS: i64 = 120;

/// Timing knobs for the session table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Idle time after which a session is considered expired.
    pub expire_after: Duration,
    /// Minimum time between two sweeps of the table.
    pub clean_interval: Duration,
}

impl SessionConfig {
    /// Builds a config from second counts.
    pub fn from_secs(expire_secs: i64, clean_secs: i64) -> Self {
        Self {
            expire_after: Duration::seconds(expire_secs),
            clean_interval: Duration::seconds(clean_secs),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::from_secs(DEFAULT_EXPIRE_SECS, DEFAULT_CLEAN_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SessionConfig::default();
        assert_eq!(config.expire_after, Duration::seconds(300));
        assert_eq!(config.clean_interval, Duration::seconds(120));
    }

    #[test]
    fn test_from_secs() {
        let config = SessionConfig::from_secs(60, 10);
        assert_eq!(config.expire_after.num_seconds(), 60);
        assert_eq!(config.clean_interval.num_seconds(), 10);
    }
}
