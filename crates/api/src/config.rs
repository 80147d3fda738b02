//! Application configuration loaded from environment variables.

use std::path::PathBuf;

use session::SessionConfig;
use session::config::{DEFAULT_CLEAN_SECS, DEFAULT_EXPIRE_SECS};

const DEFAULT_PORT: u16 = 5221;
const DEFAULT_COOKIE_NAME: &str = "PeelRescue";

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `5221`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `json` for one JSON object per event (default: plain text)
/// - `SESSION_EXPIRE_SECS`: idle time before a session expires (default: `300`)
/// - `CLEAN_SESSION_SECS`: minimum gap between session sweeps (default: `120`)
/// - `COOKIE_NAME`: session cookie name (default: `"PeelRescue"`)
/// - `COOKIE_SECURE`: set the `Secure` cookie attribute (default: `true`)
/// - `INVENTORY_URL`: item store root; unset means an in-memory store
/// - `INVENTORY_ACCEPT_INVALID_CERTS`: trust self-signed certificates (default: `false`)
/// - `BUYER_API_KEY` / `SELLER_API_KEY`: item store keys
/// - `ADMIN_NAME` / `ADMIN_PASSWORD`: built-in admin account
/// - `USERS_FILE`: JSON file of users to load at startup
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_json: bool,
    pub session_expire_secs: i64,
    pub clean_session_secs: i64,
    pub cookie_name: String,
    pub cookie_secure: bool,
    pub inventory_url: Option<String>,
    pub inventory_accept_invalid_certs: bool,
    pub buyer_api_key: String,
    pub seller_api_key: String,
    pub admin_name: Option<String>,
    pub admin_password: Option<String>,
    pub users_file: Option<PathBuf>,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_parse("PORT").unwrap_or(defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_json: env_non_empty("LOG_FORMAT")
                .map(|f| f.eq_ignore_ascii_case("json"))
                .unwrap_or(defaults.log_json),
            session_expire_secs: env_parse("SESSION_EXPIRE_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(defaults.session_expire_secs),
            clean_session_secs: env_parse("CLEAN_SESSION_SECS")
                .filter(|s| *s > 0)
                .unwrap_or(defaults.clean_session_secs),
            cookie_name: env_non_empty("COOKIE_NAME").unwrap_or(defaults.cookie_name),
            cookie_secure: env_parse("COOKIE_SECURE").unwrap_or(defaults.cookie_secure),
            inventory_url: env_non_empty("INVENTORY_URL"),
            inventory_accept_invalid_certs: env_parse("INVENTORY_ACCEPT_INVALID_CERTS")
                .unwrap_or(defaults.inventory_accept_invalid_certs),
            buyer_api_key: std::env::var("BUYER_API_KEY").unwrap_or_default(),
            seller_api_key: std::env::var("SELLER_API_KEY").unwrap_or_default(),
            admin_name: env_non_empty("ADMIN_NAME"),
            admin_password: env_non_empty("ADMIN_PASSWORD"),
            users_file: env_non_empty("USERS_FILE").map(PathBuf::from),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the session table timing.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::from_secs(self.session_expire_secs, self.clean_session_secs)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            log_json: false,
            session_expire_secs: DEFAULT_EXPIRE_SECS,
            clean_session_secs: DEFAULT_CLEAN_SECS,
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            cookie_secure: true,
            inventory_url: None,
            inventory_accept_invalid_certs: false,
            buyer_api_key: String::new(),
            seller_api_key: String::new(),
            admin_name: None,
            admin_password: None,
            users_file: None,
        }
    }
}
