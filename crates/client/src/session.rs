//! Session context.
//!
//! [`Session`] is the process-wide view of "who is logged in". It owns the
//! token store and a watch channel so any part of the application can read
//! the current token or react to login and logout. Every write goes to the
//! store first and is then broadcast, so the two never disagree.

use std::sync::Arc;

use stns_core::SessionState;
use tokio::sync::watch;

use crate::store::TokenStore;
use crate::token::{AccessToken, RefreshToken, StoredTokens};

/// Shared handle to the session. Cheap to clone.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    store: Arc<dyn TokenStore>,
    token: watch::Sender<Option<AccessToken>>,
}

impl Session {
    /// Create the session, reading the store once to resume a previous login.
    pub fn new(store: Arc<dyn TokenStore>) -> Self {
        let initial = store.get().map(|tokens| tokens.access_token);
        if initial.is_some() {
            tracing::debug!("Resuming stored session");
        }
        let (token, _) = watch::channel(initial);
        Self {
            inner: Arc::new(SessionInner { store, token }),
        }
    }

    /// The current access token.
    #[must_use]
    pub fn token(&self) -> Option<AccessToken> {
        self.inner.store.get().map(|tokens| tokens.access_token)
    }

    /// The current refresh token.
    #[must_use]
    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.inner.store.get().and_then(|tokens| tokens.refresh_token)
    }

    /// Everything the store holds.
    #[must_use]
    pub fn tokens(&self) -> Option<StoredTokens> {
        self.inner.store.get()
    }

    /// Authenticated iff a token is present.
    #[must_use]
    pub fn state(&self) -> SessionState {
        SessionState::from_token_present(self.inner.store.get().is_some())
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated()
    }

    /// Subscribe to token changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Option<AccessToken>> {
        self.inner.token.subscribe()
    }

    /// Start a session with freshly issued credentials.
    pub fn login(&self, tokens: StoredTokens) {
        self.write(tokens);
        tracing::info!("Logged in");
    }

    /// End the session.
    pub fn logout(&self) {
        self.clear();
        tracing::info!("Logged out");
    }

    /// Store credentials minted by a token refresh.
    pub(crate) fn rotate(&self, tokens: StoredTokens) {
        self.write(tokens);
        tracing::debug!("Access token refreshed");
    }

    /// End the session because it can no longer be renewed.
    pub(crate) fn expire(&self) {
        self.clear();
        tracing::warn!("Session expired");
    }

    fn write(&self, tokens: StoredTokens) {
        let access = tokens.access_token.clone();
        self.inner.store.set(tokens);
        self.inner.token.send_replace(Some(access));
    }

    fn clear(&self) {
        self.inner.store.clear();
        self.inner.token.send_replace(None);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;

    fn tokens(access: &str) -> StoredTokens {
        StoredTokens::new(AccessToken::new(access), None)
    }

    #[test]
    fn test_initial_state_comes_from_store() {
        let store = Arc::new(MemoryTokenStore::with_tokens(tokens("resumed")));
        let session = Session::new(store);

        assert!(session.is_authenticated());
        assert_eq!(session.token(), Some(AccessToken::new("resumed")));
        assert_eq!(*session.subscribe().borrow(), Some(AccessToken::new("resumed")));
    }

    #[test]
    fn test_login_and_logout_write_through_to_store() {
        let store = Arc::new(MemoryTokenStore::new());
        let session = Session::new(store.clone());
        assert_eq!(session.state(), SessionState::Anonymous);

        session.login(tokens("abc"));
        assert_eq!(store.get().unwrap().access_token, AccessToken::new("abc"));
        assert_eq!(session.state(), SessionState::Authenticated);

        session.logout();
        assert!(store.get().is_none());
        assert_eq!(session.state(), SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_subscribers_see_transitions() {
        let session = Session::new(Arc::new(MemoryTokenStore::new()));
        let mut rx = session.subscribe();

        session.login(tokens("abc"));
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_some());

        session.logout();
        rx.changed().await.unwrap();
        assert!(rx.borrow_and_update().is_none());
    }

    #[test]
    fn test_clones_share_state() {
        let session = Session::new(Arc::new(MemoryTokenStore::new()));
        let other = session.clone();

        session.login(tokens("shared"));
        assert!(other.is_authenticated());
    }
}
