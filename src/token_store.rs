//! Thread-safe session token storage
//!
//! The access token lives only in memory. The refresh token is cached in memory and
//! written through to a [`RefreshTokenPersistence`] backend so a session can be
//! recovered after a restart.

use std::sync::{Arc, PoisonError, RwLock};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::persistence::{MemoryPersistence, RefreshTokenPersistence};
use crate::types::{AuthTokens, SessionStatus};

#[derive(Debug, Default, Clone)]
struct SessionTokens {
    access_token: Option<String>,
    refresh_token: Option<String>,
}

struct Inner {
    tokens: RwLock<SessionTokens>,
    persistence: Box<dyn RefreshTokenPersistence>,
    status: watch::Sender<SessionStatus>,
}

/// Shared owner of the session's access and refresh tokens
///
/// Cloning is cheap; all clones observe the same session.
#[derive(Clone)]
pub struct TokenStore {
    inner: Arc<Inner>,
}

impl TokenStore {
    /// Create a store backed by `persistence`, loading any saved refresh token
    pub fn new(persistence: impl RefreshTokenPersistence) -> Self {
        let refresh_token = match persistence.load() {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "Failed to load persisted refresh token, starting anonymous");
                None
            }
        };

        let (status, _) = watch::channel(SessionStatus::Loading);

        Self {
            inner: Arc::new(Inner {
                tokens: RwLock::new(SessionTokens {
                    access_token: None,
                    refresh_token,
                }),
                persistence: Box::new(persistence),
                status,
            }),
        }
    }

    /// Create a store whose refresh token does not outlive the process
    pub fn in_memory() -> Self {
        Self::new(MemoryPersistence::new())
    }

    pub fn access_token(&self) -> Option<String> {
        self.read().access_token.clone()
    }

    pub fn set_access_token(&self, token: impl Into<String>) {
        self.write(|tokens| tokens.access_token = Some(token.into()));
        self.publish_derived();
    }

    pub fn clear_access_token(&self) {
        self.write(|tokens| tokens.access_token = None);
        self.publish_derived();
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.read().refresh_token.clone()
    }

    pub fn set_refresh_token(&self, token: impl Into<String>) {
        let token = token.into();
        self.write(|tokens| tokens.refresh_token = Some(token.clone()));
        self.persist(Some(&token));
        self.publish_derived();
    }

    pub fn clear_refresh_token(&self) {
        self.write(|tokens| tokens.refresh_token = None);
        self.persist(None);
        self.publish_derived();
    }

    /// Replace both tokens in a single write
    pub fn set_tokens(&self, tokens: &AuthTokens) {
        self.write(|session| {
            session.access_token = Some(tokens.access_token.clone());
            session.refresh_token = Some(tokens.refresh_token.clone());
        });
        self.persist(Some(&tokens.refresh_token));
        self.publish_derived();
        debug!(expires_in_secs = tokens.expires_in_seconds, "Stored new token pair");
    }

    /// Drop both tokens. Safe to call repeatedly.
    pub fn clear_all(&self) {
        self.write(|session| *session = SessionTokens::default());
        self.persist(None);
        self.publish_derived();
    }

    /// True when either token is present
    pub fn has_active_session(&self) -> bool {
        let tokens = self.read();
        tokens.access_token.is_some() || tokens.refresh_token.is_some()
    }

    pub fn status(&self) -> SessionStatus {
        *self.inner.status.borrow()
    }

    /// Receive every session status transition
    pub fn subscribe(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    pub(crate) fn publish_status(&self, status: SessionStatus) {
        self.inner.status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            debug!(from = ?*current, to = ?status, "Session status changed");
            *current = status;
            true
        });
    }

    fn publish_derived(&self) {
        let status = if self.has_active_session() {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        };
        self.publish_status(status);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, SessionTokens> {
        self.inner.tokens.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self, update: impl FnOnce(&mut SessionTokens)) {
        let mut tokens = self.inner.tokens.write().unwrap_or_else(PoisonError::into_inner);
        update(&mut tokens);
    }

    fn persist(&self, refresh_token: Option<&str>) {
        let result = match refresh_token {
            Some(token) => self.inner.persistence.save(token),
            None => self.inner.persistence.clear(),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist refresh token");
        }
    }
}

impl Default for TokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tokens = self.read();
        f.debug_struct("TokenStore")
            .field("has_access_token", &tokens.access_token.is_some())
            .field("has_refresh_token", &tokens.refresh_token.is_some())
            .field("status", &self.status())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(access: &str, refresh: &str) -> AuthTokens {
        AuthTokens {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
            expires_in_seconds: 1800,
        }
    }

    #[test]
    fn test_token_store() {
        let store = TokenStore::in_memory();
        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);

        store.set_tokens(&pair("access-1", "refresh-1"));
        assert_eq!(store.access_token().as_deref(), Some("access-1"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));

        store.set_access_token("access-2");
        assert_eq!(store.access_token().as_deref(), Some("access-2"));
        assert_eq!(store.refresh_token().as_deref(), Some("refresh-1"));

        store.clear_access_token();
        assert_eq!(store.access_token(), None);
        assert!(store.has_active_session());
    }

    #[test]
    fn test_clear_all_is_idempotent() {
        let store = TokenStore::in_memory();
        store.set_tokens(&pair("access-1", "refresh-1"));

        store.clear_all();
        store.clear_all();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert!(!store.has_active_session());
        assert_eq!(store.status(), SessionStatus::Anonymous);
    }

    #[test]
    fn test_refresh_token_is_loaded_and_written_through() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("refresh_token.json");

        let store = TokenStore::new(crate::persistence::FilePersistence::new(&path));
        store.set_tokens(&pair("access-1", "refresh-1"));
        drop(store);

        let reloaded = TokenStore::new(crate::persistence::FilePersistence::new(&path));
        assert_eq!(reloaded.access_token(), None);
        assert_eq!(reloaded.refresh_token().as_deref(), Some("refresh-1"));

        reloaded.clear_all();
        let cleared = TokenStore::new(crate::persistence::FilePersistence::new(&path));
        assert_eq!(cleared.refresh_token(), None);
    }

    #[test]
    fn test_clones_share_state() {
        let store = TokenStore::in_memory();
        let clone = store.clone();

        clone.set_tokens(&pair("access-1", "refresh-1"));
        assert_eq!(store.access_token().as_deref(), Some("access-1"));
    }

    #[tokio::test]
    async fn test_status_transitions_are_published() {
        let store = TokenStore::in_memory();
        let mut rx = store.subscribe();
        assert_eq!(*rx.borrow(), SessionStatus::Loading);

        store.set_tokens(&pair("access-1", "refresh-1"));
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionStatus::Authenticated);

        store.clear_all();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), SessionStatus::Anonymous);
    }
}
