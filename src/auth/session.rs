//! Session ownership: the single source of truth for "who is logged in".
//!
//! `SessionStore` pairs the in-memory session with a persisted mirror on
//! disk (two entries, written and cleared together) and mediates every
//! auth-affecting API call. It also holds the receiver half of the API
//! client's unauthorized channel: whenever any request anywhere got a 401,
//! the store notices at its next entry point and forces a logout.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, AuthPayload};
use crate::models::{RegisterRequest, User, UserUpdate};
use crate::validate;

/// Token entry in the session mirror (opaque string, no framing).
const TOKEN_FILE: &str = "token";

/// Identity entry in the session mirror (serialized `User`).
const USER_FILE: &str = "user.json";

/// An authenticated session: identity plus its bearer token. Either both
/// exist or neither does; there is no half-session.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user: User,
    pub token: String,
}

pub struct SessionStore {
    data_dir: PathBuf,
    client: ApiClient,
    session: Option<Session>,
    unauthorized_rx: mpsc::UnboundedReceiver<()>,
}

impl SessionStore {
    /// Create a store for the given backend and mirror directory. The
    /// store starts unauthenticated; call `restore` to pick up a persisted
    /// session from a previous run.
    pub fn new(base_url: impl Into<String>, data_dir: impl Into<PathBuf>) -> Result<Self> {
        let (client, unauthorized_rx) = ApiClient::new(base_url)?;
        Ok(Self {
            data_dir: data_dir.into(),
            client,
            session: None,
            unauthorized_rx,
        })
    }

    /// The API client carrying the current token. Content calls (posts,
    /// comments, uploads) go through this; a 401 on any of them feeds back
    /// into the store via the unauthorized channel.
    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    pub fn user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    /// True iff identity and token are both set. Processes any pending
    /// unauthorized signal first, so a 401 anywhere makes this false.
    pub fn is_authenticated(&mut self) -> bool {
        self.drain_unauthorized();
        self.session.is_some()
    }

    /// Restore a persisted session from disk. Optimistic: a well-formed
    /// token + identity pair is trusted without revalidating against the
    /// API. Anything less (missing entry, unreadable file, parse failure)
    /// leaves the store unauthenticated, sweeps the leftovers, and is not
    /// an error.
    pub fn restore(&mut self) -> bool {
        let token = match std::fs::read_to_string(self.token_path()) {
            Ok(token) if !token.trim().is_empty() => token.trim().to_string(),
            Ok(_) => {
                warn!("Persisted token is empty, discarding session");
                self.remove_mirror();
                return false;
            }
            Err(_) => {
                // Also sweep an orphaned identity entry, if any.
                self.remove_mirror();
                return false;
            }
        };

        let user = match std::fs::read_to_string(self.user_path())
            .ok()
            .and_then(|contents| serde_json::from_str::<User>(&contents).ok())
        {
            Some(user) => user,
            None => {
                warn!("Persisted identity missing or malformed, discarding session");
                self.remove_mirror();
                return false;
            }
        };

        debug!(user = %user.name, "Restored session from disk");
        self.client.set_token(token.clone());
        self.session = Some(Session { user, token });
        true
    }

    /// Log in with credentials. Validation failures never reach the
    /// network; API failures leave both memory and mirror untouched.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<User> {
        self.drain_unauthorized();
        validate::validate_login(email, password)?;

        let payload = self.client.login(email, password).await?;
        info!(email, "Login succeeded");
        self.install(payload)
    }

    /// Register a new account; success yields a live session for it.
    pub async fn register(&mut self, request: &RegisterRequest) -> Result<User> {
        self.drain_unauthorized();
        validate::validate_registration(request)?;

        let payload = self.client.register(request).await?;
        info!(email = %request.email, "Registration succeeded");
        self.install(payload)
    }

    /// Clear the session, in memory and on disk. Never fails from the
    /// caller's perspective and never touches the network.
    pub fn logout(&mut self) {
        if self.session.take().is_some() {
            info!("Logged out");
        }
        self.client.clear_token();
        self.remove_mirror();
    }

    /// Send a partial identity update. On success the in-memory identity
    /// is replaced wholesale with what the API returned (never merged) and
    /// the mirror is rewritten; on failure nothing changes.
    pub async fn update_identity(&mut self, update: &UserUpdate) -> Result<User> {
        self.drain_unauthorized();
        let token = match self.session.as_ref() {
            Some(session) => session.token.clone(),
            None => anyhow::bail!("Not logged in"),
        };

        let user = self.client.update_profile(update).await?;
        debug!(user = %user.name, "Identity updated");

        self.persist(&user, &token)
            .context("Failed to persist updated identity")?;
        self.session = Some(Session {
            user: user.clone(),
            token,
        });
        Ok(user)
    }

    /// Change the account password. Session state is unaffected.
    pub async fn change_password(&mut self, current: &str, new: &str) -> Result<String> {
        self.drain_unauthorized();
        if self.session.is_none() {
            anyhow::bail!("Not logged in");
        }
        self.client.change_password(current, new).await
    }

    /// Adopt a fresh auth payload: write the mirror, then swap memory.
    fn install(&mut self, payload: AuthPayload) -> Result<User> {
        self.persist(&payload.user, &payload.token)
            .context("Failed to persist session")?;

        self.client.set_token(payload.token.clone());
        self.session = Some(Session {
            user: payload.user.clone(),
            token: payload.token,
        });
        Ok(payload.user)
    }

    /// Handle any pending unauthorized signals from the API client. A 401
    /// observed by any request forces a full logout; when it raced an
    /// in-flight operation, last write wins.
    fn drain_unauthorized(&mut self) {
        let mut signalled = false;
        while self.unauthorized_rx.try_recv().is_ok() {
            signalled = true;
        }
        if signalled && self.session.is_some() {
            warn!("API rejected the token, forcing logout");
            self.logout();
        } else if signalled {
            // No live session to tear down, but sweep any mirror remnants.
            self.client.clear_token();
            self.remove_mirror();
        }
    }

    fn persist(&self, user: &User, token: &str) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir).with_context(|| {
            format!(
                "Failed to create session directory {}",
                self.data_dir.display()
            )
        })?;
        std::fs::write(self.token_path(), token).context("Failed to write token")?;
        let contents = serde_json::to_string_pretty(user)?;
        std::fs::write(self.user_path(), contents).context("Failed to write identity")?;
        Ok(())
    }

    /// Best-effort removal of both mirror entries together.
    fn remove_mirror(&self) {
        for path in [self.token_path(), self.user_path()] {
            if let Err(e) = std::fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %e, "Failed to remove session entry");
                }
            }
        }
    }

    fn token_path(&self) -> PathBuf {
        self.data_dir.join(TOKEN_FILE)
    }

    fn user_path(&self) -> PathBuf {
        self.data_dir.join(USER_FILE)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("data_dir", &self.data_dir)
            .field("authenticated", &self.session.is_some())
            .finish()
    }
}

/// Write a user/token pair into a mirror directory without going through
/// a store. Exists for tests that need to seed or inspect the mirror.
#[doc(hidden)]
pub fn write_mirror(dir: &Path, user_json: &str, token: &str) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    std::fs::write(dir.join(TOKEN_FILE), token)?;
    std::fs::write(dir.join(USER_FILE), user_json)?;
    Ok(())
}

/// Paths of the two mirror entries under a directory, token first.
#[doc(hidden)]
pub fn mirror_paths(dir: &Path) -> (PathBuf, PathBuf) {
    (dir.join(TOKEN_FILE), dir.join(USER_FILE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DEFAULT_BASE_URL;
    use tempfile::TempDir;

    const USER_JSON: &str = r#"{
        "_id": "u1",
        "name": "Maria",
        "email": "maria@escola.edu",
        "school": "Central",
        "age": 41,
        "userType": "professor",
        "subjects": ["Math"]
    }"#;

    fn store(dir: &TempDir) -> SessionStore {
        SessionStore::new(DEFAULT_BASE_URL, dir.path()).expect("store")
    }

    #[test]
    fn restore_with_both_entries_authenticates() {
        let dir = TempDir::new().expect("tempdir");
        write_mirror(dir.path(), USER_JSON, "T123").expect("mirror");

        let mut store = store(&dir);
        assert!(store.restore());
        assert!(store.is_authenticated());
        assert_eq!(store.token(), Some("T123"));
        assert_eq!(store.user().map(|u| u.name.as_str()), Some("Maria"));
    }

    #[test]
    fn restore_with_only_token_stays_unauthenticated() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::write(dir.path().join(TOKEN_FILE), "T123").expect("write");

        let mut store = store(&dir);
        assert!(!store.restore());
        assert!(!store.is_authenticated());
        // The orphaned entry is swept.
        assert!(!dir.path().join(TOKEN_FILE).exists());
    }

    #[test]
    fn restore_with_only_identity_stays_unauthenticated() {
        let dir = TempDir::new().expect("tempdir");
        std::fs::create_dir_all(dir.path()).expect("dir");
        std::fs::write(dir.path().join(USER_FILE), USER_JSON).expect("write");

        let mut store = store(&dir);
        assert!(!store.restore());
        assert!(!store.is_authenticated());
        assert!(!dir.path().join(USER_FILE).exists());
    }

    #[test]
    fn restore_with_malformed_identity_stays_unauthenticated() {
        let dir = TempDir::new().expect("tempdir");
        write_mirror(dir.path(), "{ not json", "T123").expect("mirror");

        let mut store = store(&dir);
        assert!(!store.restore());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn restore_with_empty_token_stays_unauthenticated() {
        let dir = TempDir::new().expect("tempdir");
        write_mirror(dir.path(), USER_JSON, "   ").expect("mirror");

        let mut store = store(&dir);
        assert!(!store.restore());
        assert!(!store.is_authenticated());
    }

    #[test]
    fn logout_then_restore_is_unauthenticated() {
        let dir = TempDir::new().expect("tempdir");
        write_mirror(dir.path(), USER_JSON, "T123").expect("mirror");

        let mut store = store(&dir);
        assert!(store.restore());
        store.logout();
        assert!(!store.is_authenticated());

        // A second store over the same directory sees nothing.
        let mut fresh = SessionStore::new(DEFAULT_BASE_URL, dir.path()).expect("store");
        assert!(!fresh.restore());
        assert!(!fresh.is_authenticated());
    }

    #[test]
    fn logout_without_session_is_harmless() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store(&dir);
        store.logout();
        store.logout();
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn login_with_invalid_fields_skips_network() {
        let dir = TempDir::new().expect("tempdir");
        // Unroutable base URL: if validation let anything through, the
        // failure would be a network error, not a validation one.
        let mut store = SessionStore::new("http://127.0.0.1:1/api", dir.path()).expect("store");

        let err = store.login("", "secret").await.unwrap_err();
        assert!(err.is::<validate::ValidationError>());
        assert!(!store.is_authenticated());
        let (token_path, user_path) = mirror_paths(dir.path());
        assert!(!token_path.exists());
        assert!(!user_path.exists());
    }

    #[tokio::test]
    async fn register_with_missing_email_skips_network() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = SessionStore::new("http://127.0.0.1:1/api", dir.path()).expect("store");

        let request = RegisterRequest {
            name: "Joao".to_string(),
            email: String::new(),
            password: "secret1".to_string(),
            school: "Central".to_string(),
            age: 12,
            role: crate::models::Role::Student,
            guardian: None,
            class: None,
            subjects: None,
        };
        let err = store.register(&request).await.unwrap_err();
        assert!(err.is::<validate::ValidationError>());
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn update_identity_requires_session() {
        let dir = TempDir::new().expect("tempdir");
        let mut store = store(&dir);
        let err = store
            .update_identity(&UserUpdate::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Not logged in"));
    }
}
