//! Single-flight token refresh.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::oneshot;
use tracing::instrument;

use crate::auth;
use crate::config::ClientConfig;
use crate::error::RefreshError;
use crate::session::Session;
use crate::token::{AccessToken, StoredTokens};

/// A refresh running in its own task. Resolves to the new access token, or
/// `None` if the refresh failed.
type InFlight = Shared<BoxFuture<'static, Option<AccessToken>>>;

/// Renews the access token when the backend rejects it.
///
/// At most one refresh runs at a time. It runs in a spawned task, so a caller
/// that is cancelled while waiting does not abort it, and every caller that
/// arrives meanwhile waits for the same outcome instead of refreshing again.
#[derive(Clone)]
pub struct TokenRefresher {
    inner: Arc<RefresherInner>,
}

struct RefresherInner {
    http: reqwest::Client,
    config: ClientConfig,
    session: Session,
    state: Mutex<RefreshState>,
}

#[derive(Default)]
struct RefreshState {
    /// Number of refreshes that have finished, successfully or not.
    generation: u64,
    in_flight: Option<InFlight>,
}

impl TokenRefresher {
    #[must_use]
    pub fn new(http: reqwest::Client, config: ClientConfig, session: Session) -> Self {
        Self {
            inner: Arc::new(RefresherInner {
                http,
                config,
                session,
                state: Mutex::new(RefreshState::default()),
            }),
        }
    }

    /// Number of refreshes finished so far. Read it before sending a
    /// request and pass it to [`Self::refresh_after`] if the request is
    /// rejected.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state().generation
    }

    /// Refresh the current access token.
    ///
    /// # Errors
    ///
    /// See [`Self::refresh_after`].
    pub async fn refresh(&self) -> Result<AccessToken, RefreshError> {
        let generation = self.generation();
        let current = self.inner.session.token();
        self.refresh_after(current.as_ref(), generation).await
    }

    /// Obtain a token to replace `rejected`, the token a request was sent
    /// with (`None` if it was sent without one). `generation` is the value
    /// of [`Self::generation`] from before the request was sent.
    ///
    /// On failure the session is cleared, forcing a new login.
    ///
    /// # Errors
    ///
    /// Returns `RefreshError::SessionEnded` if a concurrent refresh failed,
    /// or the error of the refresh call itself.
    #[instrument(skip_all)]
    pub async fn refresh_after(
        &self,
        rejected: Option<&AccessToken>,
        generation: u64,
    ) -> Result<AccessToken, RefreshError> {
        let (flight, started) = {
            let mut state = self.state();
            if let Some(flight) = &state.in_flight {
                tracing::debug!("Waiting for the refresh already in progress");
                (flight.clone(), None)
            } else {
                let refreshed_since = state.generation != generation;
                match (self.inner.session.tokens(), rejected) {
                    (Some(tokens), _) if refreshed_since => {
                        tracing::debug!("Token already refreshed by a concurrent request");
                        return Ok(tokens.access_token);
                    }
                    (Some(tokens), Some(rejected)) if tokens.access_token != *rejected => {
                        tracing::debug!("Token replaced since the request was sent");
                        return Ok(tokens.access_token);
                    }
                    (Some(tokens), None) => {
                        tracing::debug!("Token stored since the request was sent");
                        return Ok(tokens.access_token);
                    }
                    (None, Some(_)) => return Err(RefreshError::SessionEnded),
                    (None, None) => {
                        drop(state);
                        tracing::warn!("Token refresh failed: no credentials stored");
                        self.inner.session.expire();
                        return Err(RefreshError::MissingRefreshToken);
                    }
                    (Some(tokens), Some(_)) => {
                        let (tx, rx) = oneshot::channel();
                        let flight = self.spawn_refresh(tokens, tx);
                        state.in_flight = Some(flight.clone());
                        (flight, Some(rx))
                    }
                }
            }
        };

        if let Some(rx) = started {
            if let Ok(result) = rx.await {
                return result;
            }
        }
        flight.await.ok_or(RefreshError::SessionEnded)
    }

    fn spawn_refresh(
        &self,
        tokens: StoredTokens,
        tx: oneshot::Sender<Result<AccessToken, RefreshError>>,
    ) -> InFlight {
        let this = self.clone();
        let task = tokio::spawn(async move {
            let inner = &this.inner;
            let result = auth::refresh_tokens(&inner.http, &inner.config, &tokens)
                .await
                .map(|refreshed| {
                    let access = refreshed.access_token.clone();
                    inner.session.rotate(refreshed);
                    access
                });
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Token refresh failed");
                inner.session.expire();
            }

            {
                let mut state = this.state();
                state.generation += 1;
                state.in_flight = None;
            }

            let outcome = result.as_ref().ok().cloned();
            if tx.send(result).is_err() {
                tracing::debug!("Refresh finished after its requester went away");
            }
            outcome
        });
        async move { task.await.ok().flatten() }.boxed().shared()
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher")
            .field("session", &self.inner.session)
            .field("generation", &self.generation())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;

    // Nothing listens on the discard port, so any network call fails fast.
    fn refresher(tokens: Option<StoredTokens>) -> (TokenRefresher, Session) {
        let store = tokens.map_or_else(MemoryTokenStore::new, MemoryTokenStore::with_tokens);
        let session = Session::new(Arc::new(store));
        let config = ClientConfig::new("http://127.0.0.1:9", "/tmp/stns").unwrap();
        (
            TokenRefresher::new(reqwest::Client::new(), config, session.clone()),
            session,
        )
    }

    #[tokio::test]
    async fn test_reuses_token_replaced_by_concurrent_refresh() {
        let (refresher, _) = refresher(Some(StoredTokens::new(AccessToken::new("new"), None)));

        let token = refresher
            .refresh_after(Some(&AccessToken::new("old")), 0)
            .await
            .unwrap();
        assert_eq!(token, AccessToken::new("new"));
    }

    #[tokio::test]
    async fn test_fails_when_session_already_ended() {
        let (refresher, _) = refresher(None);

        let err = refresher
            .refresh_after(Some(&AccessToken::new("old")), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::SessionEnded));
    }

    #[tokio::test]
    async fn test_missing_refresh_token_clears_session() {
        let (refresher, session) =
            refresher(Some(StoredTokens::new(AccessToken::new("abc"), None)));

        let err = refresher.refresh().await.unwrap_err();
        assert!(matches!(err, RefreshError::MissingRefreshToken));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_anonymous_request_without_credentials_fails() {
        let (refresher, session) = refresher(None);

        let err = refresher.refresh_after(None, 0).await.unwrap_err();
        assert!(matches!(err, RefreshError::MissingRefreshToken));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_completed_refresh_is_reused_even_if_token_unchanged() {
        let (refresher, _) = refresher(Some(StoredTokens::new(AccessToken::new("same"), None)));
        refresher.state().generation = 1;

        let token = refresher
            .refresh_after(Some(&AccessToken::new("same")), 0)
            .await
            .unwrap();
        assert_eq!(token, AccessToken::new("same"));
        assert_eq!(refresher.generation(), 1);
    }

    #[tokio::test]
    async fn test_failed_refresh_advances_generation() {
        let (refresher, session) =
            refresher(Some(StoredTokens::new(AccessToken::new("abc"), None)));

        refresher.refresh().await.unwrap_err();
        assert_eq!(refresher.generation(), 1);
        assert!(refresher.state().in_flight.is_none());
        assert!(!session.is_authenticated());
    }
}
