//! Identity and session management.
//!
//! Holds at most one authenticated user for the lifetime of the process.
//! The session is persisted next to the record store and restored exactly
//! once at startup by [`SessionManager::init`], so a remembered login
//! survives a daemon restart.
//!
//! Emails are the identity key and are always normalized (trimmed,
//! lowercased) before comparison or storage. Passwords are stored as
//! `salt$hex(sha256(salt || password))` and never compared in plaintext.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::store::{self, Record, RecordStore, StoreError};

/// Authentication and profile errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Email already registered")]
    AlreadyRegistered,

    #[error("No active session")]
    NoSession,

    #[error("{0}")]
    Validation(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Normalize an email for use as an identity key: trim, then lowercase.
/// Idempotent: normalizing twice equals normalizing once.
pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// A registered identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Store-assigned unique id.
    pub id: String,

    pub name: String,

    /// Normalized email; case-insensitive unique key.
    pub email: String,

    /// `salt$digest` — opaque outside this module.
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
}

impl Record for User {
    const KIND: &'static str = "users";

    fn record_id(&self) -> &str {
        &self.id
    }
}

/// Persisted session slot, read once at startup.
#[derive(Debug, Serialize, Deserialize)]
struct SessionFile {
    email: String,
}

/// Profile changes applied by [`SessionManager::update_profile`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,

    pub email: String,

    /// Blank or absent keeps the current password.
    pub password: Option<String>,

    /// Must match `password` when one is supplied.
    pub confirm_password: Option<String>,
}

/// Process-wide session state over the user record store.
#[derive(Debug)]
pub struct SessionManager {
    store: RecordStore,
    session_path: PathBuf,
    current: Option<User>,
}

impl SessionManager {
    /// Create a manager over an open record store. Call [`init`] before use
    /// to restore any persisted session.
    ///
    /// [`init`]: SessionManager::init
    pub fn new(store: RecordStore) -> Self {
        let session_path = store.data_dir().join("session.json");
        Self {
            store,
            session_path,
            current: None,
        }
    }

    /// Restore the persisted session, if any. Called exactly once at
    /// startup; a session file naming an unknown user is discarded.
    pub async fn init(&mut self) -> Result<()> {
        let bytes = match fs::read(&self.session_path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };

        let session: SessionFile = match serde_json::from_slice(&bytes) {
            Ok(session) => session,
            Err(_) => {
                // Unreadable session file; treat as logged out.
                fs::remove_file(&self.session_path).await.ok();
                return Ok(());
            }
        };

        match self.find_by_email(&session.email).await? {
            Some(user) => {
                info!(email = %user.email, "Restored session");
                self.current = Some(user);
            }
            None => {
                fs::remove_file(&self.session_path).await.ok();
            }
        }

        Ok(())
    }

    /// Drop the in-memory session without touching the persisted slot.
    pub fn teardown(&mut self) {
        self.current = None;
    }

    /// The authenticated user, if a session is live.
    pub fn current_user(&self) -> Option<&User> {
        self.current.as_ref()
    }

    /// Register a new identity and establish the session.
    ///
    /// An empty name defaults to the email's local part.
    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);

        if !email.contains('@') {
            return Err(AuthError::Validation(
                "Please enter a valid email.".to_string(),
            ));
        }
        if password.is_empty() {
            return Err(AuthError::Validation(
                "Password cannot be empty.".to_string(),
            ));
        }
        if self.find_by_email(&email).await?.is_some() {
            return Err(AuthError::AlreadyRegistered);
        }

        let name = if name.trim().is_empty() {
            email.split('@').next().unwrap_or(&email).to_string()
        } else {
            name.trim().to_string()
        };

        let user = User {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email,
            password_hash: hash_password(password),
            created_at: Utc::now(),
        };

        self.store.put(&user).await?;
        self.establish(user.clone()).await?;

        info!(email = %user.email, "Registered new user");

        Ok(user)
    }

    /// Authenticate and establish the session.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);

        let user = self
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !verify_password(&user.password_hash, password) {
            return Err(AuthError::InvalidCredentials);
        }

        self.establish(user.clone()).await?;

        info!(email = %user.email, "Login successful");

        Ok(user)
    }

    /// Clear the session unconditionally, memory and disk.
    pub async fn logout(&mut self) -> Result<()> {
        self.current = None;
        match fs::remove_file(&self.session_path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Update the authenticated user's profile.
    pub async fn update_profile(&mut self, update: ProfileUpdate) -> Result<User> {
        let mut user = self.current.clone().ok_or(AuthError::NoSession)?;

        if update.name.trim().is_empty() {
            return Err(AuthError::Validation("Name cannot be empty.".to_string()));
        }

        let email = normalize_email(&update.email);
        if !email.contains('@') {
            return Err(AuthError::Validation(
                "Please enter a valid email.".to_string(),
            ));
        }

        if let Some(password) = &update.password {
            if !password.is_empty() && update.confirm_password.as_deref() != Some(password) {
                return Err(AuthError::Validation(
                    "Passwords do not match.".to_string(),
                ));
            }
        }

        // Email stays the unique key even across profile edits.
        if email != user.email {
            if let Some(other) = self.find_by_email(&email).await? {
                if other.id != user.id {
                    return Err(AuthError::AlreadyRegistered);
                }
            }
        }

        user.name = update.name.trim().to_string();
        user.email = email;
        if let Some(password) = update.password.as_deref() {
            if !password.is_empty() {
                user.password_hash = hash_password(password);
            }
        }

        self.store.put(&user).await?;
        self.establish(user.clone()).await?;

        debug!(email = %user.email, "Profile updated");

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let email = normalize_email(email);
        let users = self.store.list::<User>().await?;
        Ok(users.into_iter().find(|u| u.email == email))
    }

    async fn establish(&mut self, user: User) -> Result<()> {
        let session = SessionFile {
            email: user.email.clone(),
        };
        store::write_json_atomic(&self.session_path, &session).await?;
        self.current = Some(user);
        Ok(())
    }
}

/// Hash a password with a fresh random salt.
fn hash_password(password: &str) -> String {
    let mut salt = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);
    format!("{salt}${}", digest(&salt, password))
}

/// Constant-shape comparison against a stored `salt$digest` value.
fn verify_password(stored: &str, password: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    digest(salt, password) == expected
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn manager(dir: &std::path::Path) -> SessionManager {
        SessionManager::new(RecordStore::open(dir).unwrap())
    }

    #[test]
    fn email_normalization_is_idempotent() {
        let once = normalize_email("  Alice@Example.COM ");
        let twice = normalize_email(&once);

        assert_eq!(once, "alice@example.com");
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn register_then_login_with_normalized_email() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        let registered = sessions
            .register("Alice", "Alice@Example.com ", "secret1")
            .await
            .unwrap();
        assert_eq!(registered.email, "alice@example.com");

        let logged_in = sessions
            .login("alice@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(logged_in.id, registered.id);
        assert_eq!(sessions.current_user().unwrap().email, "alice@example.com");
    }

    #[tokio::test]
    async fn empty_name_defaults_to_email_local_part() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        let user = sessions
            .register("", "bob@example.com", "secret1")
            .await
            .unwrap();

        assert_eq!(user.name, "bob");
    }

    #[tokio::test]
    async fn login_with_unregistered_email_fails_without_session() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        let err = sessions
            .login("ghost@example.com", "secret1")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(sessions.current_user().is_none());
    }

    #[tokio::test]
    async fn login_with_wrong_password_fails() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        sessions
            .register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();
        sessions.logout().await.unwrap();

        let err = sessions
            .login("alice@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(sessions.current_user().is_none());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        sessions
            .register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        let err = sessions
            .register("Alice Again", " ALICE@example.com", "other")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyRegistered));
    }

    #[tokio::test]
    async fn password_is_stored_hashed() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        let user = sessions
            .register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        assert!(!user.password_hash.contains("secret1"));
        assert!(verify_password(&user.password_hash, "secret1"));
        assert!(!verify_password(&user.password_hash, "secret2"));
    }

    #[tokio::test]
    async fn session_survives_restart_via_init() {
        let dir = tempdir().unwrap();

        {
            let mut sessions = manager(dir.path());
            sessions
                .register("Alice", "alice@example.com", "secret1")
                .await
                .unwrap();
        }

        let mut restored = manager(dir.path());
        assert!(restored.current_user().is_none());

        restored.init().await.unwrap();
        assert_eq!(restored.current_user().unwrap().email, "alice@example.com");
    }

    #[tokio::test]
    async fn logout_clears_session_and_persisted_slot() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        sessions
            .register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();
        sessions.logout().await.unwrap();
        assert!(sessions.current_user().is_none());

        let mut restored = manager(dir.path());
        restored.init().await.unwrap();
        assert!(restored.current_user().is_none());
    }

    #[tokio::test]
    async fn profile_update_validates_inputs() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        sessions
            .register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        let err = sessions
            .update_profile(ProfileUpdate {
                name: "  ".to_string(),
                email: "alice@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let err = sessions
            .update_profile(ProfileUpdate {
                name: "Alice".to_string(),
                email: "not-an-email".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));

        let err = sessions
            .update_profile(ProfileUpdate {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                password: Some("newpass".to_string()),
                confirm_password: Some("different".to_string()),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Validation(_)));
    }

    #[tokio::test]
    async fn profile_update_changes_password_when_confirmed() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        sessions
            .register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        sessions
            .update_profile(ProfileUpdate {
                name: "Alice B".to_string(),
                email: "alice@example.com".to_string(),
                password: Some("newpass".to_string()),
                confirm_password: Some("newpass".to_string()),
            })
            .await
            .unwrap();

        sessions.logout().await.unwrap();
        let err = sessions.login("alice@example.com", "secret1").await;
        assert!(err.is_err());

        let user = sessions.login("alice@example.com", "newpass").await.unwrap();
        assert_eq!(user.name, "Alice B");
    }

    #[tokio::test]
    async fn teardown_drops_memory_but_keeps_persisted_slot() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        sessions
            .register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();
        sessions.teardown();
        assert!(sessions.current_user().is_none());

        // Unlike logout, the on-disk session survives a restart.
        let mut restored = manager(dir.path());
        restored.init().await.unwrap();
        assert_eq!(restored.current_user().unwrap().email, "alice@example.com");
    }

    #[tokio::test]
    async fn establish_leaves_only_the_session_file_behind() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        sessions
            .register("Alice", "alice@example.com", "secret1")
            .await
            .unwrap();

        // The slot is written atomically: the final file exists and no
        // temp file from the write survives.
        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"session.json".to_string()));
        assert!(!names.iter().any(|n| n.contains("tmp")));
    }

    #[tokio::test]
    async fn profile_update_without_session_errors() {
        let dir = tempdir().unwrap();
        let mut sessions = manager(dir.path());

        let err = sessions
            .update_profile(ProfileUpdate {
                name: "Alice".to_string(),
                email: "alice@example.com".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::NoSession));
    }
}
