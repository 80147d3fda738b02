//! Registered users and credential checks.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use common::Role;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 64;

/// Errors from the user directory.
#[derive(Debug, Error)]
pub enum UserError {
    /// Unknown user, wrong password or malformed input. Deliberately vague.
    #[error("Username and/or password do not match")]
    InvalidCredentials,

    #[error("Username '{0}' is already taken")]
    AlreadyExists(String),

    #[error("Invalid signup: {0}")]
    Invalid(String),

    #[error("Password hashing failed: {0}")]
    Hash(String),

    #[error("Failed to load users: {0}")]
    Load(String),
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    /// PHC-format argon2 hash.
    pub password_hash: String,
    pub role: Role,
    #[serde(default)]
    pub full_name: String,
}

/// In-memory account store.
///
/// Hashing and verification run on the blocking pool.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
    hasher: Argon2<'static>,
}

impl Default for UserDirectory {
    fn default() -> Self {
        Self::with_hasher(Argon2::default())
    }
}

impl UserDirectory {
    /// Creates an empty directory using default argon2 parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty directory hashing new passwords with `params`.
    pub fn with_params(params: Params) -> Self {
        Self::with_hasher(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    fn with_hasher(hasher: Argon2<'static>) -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            hasher,
        }
    }

    /// Registers a buyer or seller.
    #[tracing::instrument(skip(self, password, full_name))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
        role: Role,
        full_name: &str,
    ) -> Result<(), UserError> {
        if role == Role::Admin {
            return Err(UserError::Invalid("admin accounts cannot sign up".to_string()));
        }
        if !is_valid_username(username) {
            return Err(UserError::Invalid(
                "username must be non-empty and alphanumeric".to_string(),
            ));
        }
        if !is_valid_password(password) {
            return Err(UserError::Invalid(format!(
                "password must be {MIN_PASSWORD_LEN} to {MAX_PASSWORD_LEN} characters"
            )));
        }
        if self.users.read().await.contains_key(username) {
            return Err(UserError::AlreadyExists(username.to_string()));
        }

        let password_hash = self.hash(password).await?;
        let mut users = self.users.write().await;
        if users.contains_key(username) {
            return Err(UserError::AlreadyExists(username.to_string()));
        }
        users.insert(
            username.to_string(),
            UserRecord {
                username: username.to_string(),
                password_hash,
                role,
                full_name: full_name.trim().to_string(),
            },
        );

        tracing::info!(%role, "user registered");
        Ok(())
    }

    /// Installs the admin account, replacing any previous one by that name.
    pub async fn set_admin(&self, username: &str, password: &str) -> Result<(), UserError> {
        let password_hash = self.hash(password).await?;
        self.users.write().await.insert(
            username.to_string(),
            UserRecord {
                username: username.to_string(),
                password_hash,
                role: Role::Admin,
                full_name: String::new(),
            },
        );
        Ok(())
    }

    /// Checks a username/password pair, returning the user's role.
    pub async fn verify(&self, username: &str, password: &str) -> Result<Role, UserError> {
        if username.is_empty() || !is_valid_password(password) {
            return Err(UserError::InvalidCredentials);
        }
        let record = self
            .users
            .read()
            .await
            .get(username)
            .cloned()
            .ok_or(UserError::InvalidCredentials)?;

        let hasher = self.hasher.clone();
        let password = password.to_string();
        let hash = record.password_hash;
        let matches = tokio::task::spawn_blocking(move || {
            PasswordHash::new(&hash)
                .map(|parsed| hasher.verify_password(password.as_bytes(), &parsed).is_ok())
                .unwrap_or(false)
        })
        .await
        .unwrap_or(false);

        if matches {
            Ok(record.role)
        } else {
            Err(UserError::InvalidCredentials)
        }
    }

    /// Returns the role of a registered user.
    pub async fn role_of(&self, username: &str) -> Option<Role> {
        self.users.read().await.get(username).map(|u| u.role)
    }

    /// Adds pre-hashed records, skipping usernames already present.
    pub async fn load(&self, records: Vec<UserRecord>) -> usize {
        let mut users = self.users.write().await;
        let mut loaded = 0;
        for record in records {
            if !users.contains_key(&record.username) {
                users.insert(record.username.clone(), record);
                loaded += 1;
            }
        }
        loaded
    }

    /// Returns the number of accounts.
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    async fn hash(&self, password: &str) -> Result<String, UserError> {
        let hasher = self.hasher.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut rand::thread_rng());
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| UserError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| UserError::Hash(e.to_string()))?
    }
}

/// Reads a JSON array of [`UserRecord`]s.
pub fn read_users_file(path: &Path) -> Result<Vec<UserRecord>, UserError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| UserError::Load(format!("{}: {e}", path.display())))?;
    serde_json::from_str(&raw).map_err(|e| UserError::Load(format!("{}: {e}", path.display())))
}

fn is_valid_username(username: &str) -> bool {
    !username.is_empty() && username.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_valid_password(password: &str) -> bool {
    (MIN_PASSWORD_LEN..=MAX_PASSWORD_LEN).contains(&password.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        UserDirectory::with_params(Params::new(1024, 1, 1, None).unwrap())
    }

    #[tokio::test]
    async fn test_register_and_verify() {
        let users = directory();
        users
            .register("buyer1", "password1", Role::Buyer, "Bea Buyer")
            .await
            .unwrap();

        assert_eq!(users.verify("buyer1", "password1").await.unwrap(), Role::Buyer);
        assert_eq!(users.role_of("buyer1").await, Some(Role::Buyer));
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_user_look_the_same() {
        let users = directory();
        users
            .register("seller1", "password1", Role::Seller, "")
            .await
            .unwrap();

        let wrong = users.verify("seller1", "password2").await.unwrap_err();
        let unknown = users.verify("nobody", "password1").await.unwrap_err();
        let short = users.verify("seller1", "short").await.unwrap_err();

        assert_eq!(wrong.to_string(), unknown.to_string());
        assert_eq!(wrong.to_string(), short.to_string());
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let users = directory();
        users
            .register("buyer1", "password1", Role::Buyer, "")
            .await
            .unwrap();

        let result = users.register("buyer1", "password9", Role::Seller, "").await;
        assert!(matches!(result, Err(UserError::AlreadyExists(_))));
        assert_eq!(users.role_of("buyer1").await, Some(Role::Buyer));
    }

    #[tokio::test]
    async fn test_signup_validation() {
        let users = directory();
        for (name, password, role) in [
            ("", "password1", Role::Buyer),
            ("bad name", "password1", Role::Buyer),
            ("buyer1", "short", Role::Buyer),
            ("root", "password1", Role::Admin),
        ] {
            let result = users.register(name, password, role, "").await;
            assert!(matches!(result, Err(UserError::Invalid(_))), "{name}");
        }
        assert_eq!(users.len().await, 0);
    }

    #[tokio::test]
    async fn test_admin_account() {
        let users = directory();
        users.set_admin("admin", "adminpass").await.unwrap();
        assert_eq!(users.verify("admin", "adminpass").await.unwrap(), Role::Admin);
    }

    #[tokio::test]
    async fn test_load_skips_existing() {
        let users = directory();
        users
            .register("buyer1", "password1", Role::Buyer, "")
            .await
            .unwrap();

        let loaded = users
            .load(vec![
                UserRecord {
                    username: "buyer1".to_string(),
                    password_hash: "x".to_string(),
                    role: Role::Seller,
                    full_name: String::new(),
                },
                UserRecord {
                    username: "seller2".to_string(),
                    password_hash: "x".to_string(),
                    role: Role::Seller,
                    full_name: String::new(),
                },
            ])
            .await;

        assert_eq!(loaded, 1);
        assert_eq!(users.role_of("buyer1").await, Some(Role::Buyer));
        assert!(users.verify("seller2", "password1").await.is_err());
    }

    #[test]
    fn test_read_users_file_missing() {
        let result = read_users_file(Path::new("/nonexistent/users.json"));
        assert!(matches!(result, Err(UserError::Load(_))));
    }
}
