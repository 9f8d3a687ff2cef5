//! Current view and guarded navigation.

use std::sync::Arc;

use stns_core::{Navigation, Route, guard};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::client::LoginRedirect;
use crate::session::Session;

/// Tracks which view is showing. Cheap to clone.
///
/// Every move goes through the route guard against the live session, so a
/// protected view is never current while the session is anonymous.
#[derive(Clone)]
pub struct Navigator {
    inner: Arc<NavigatorInner>,
}

struct NavigatorInner {
    session: Session,
    route: watch::Sender<Route>,
}

impl Navigator {
    /// Start on the login view.
    #[must_use]
    pub fn new(session: Session) -> Self {
        let (route, _) = watch::channel(Route::Login);
        Self {
            inner: Arc::new(NavigatorInner { session, route }),
        }
    }

    /// Move to `route`, or to the login view if the guard refuses it.
    pub fn navigate(&self, route: Route) -> Navigation {
        let decision = guard(self.inner.session.state(), route);
        if let Navigation::Redirect(target) = decision {
            tracing::info!(requested = %route, redirect = %target, "Login required");
        }
        self.inner.route.send_replace(decision.target());
        decision
    }

    /// The view currently showing.
    #[must_use]
    pub fn current(&self) -> Route {
        *self.inner.route.borrow()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<Route> {
        self.inner.route.subscribe()
    }

    /// Watch the session and leave protected views as soon as it ends.
    ///
    /// Abort the returned handle to stop following.
    #[must_use]
    pub fn follow_session(&self) -> JoinHandle<()> {
        let navigator = self.clone();
        let mut tokens = self.inner.session.subscribe();
        tokio::spawn(async move {
            while tokens.changed().await.is_ok() {
                let signed_out = tokens.borrow_and_update().is_none();
                if signed_out && navigator.current().is_protected() {
                    navigator.redirect_to_login();
                }
            }
        })
    }
}

impl LoginRedirect for Navigator {
    fn redirect_to_login(&self) {
        let previous = self.inner.route.send_replace(Route::Login);
        if previous != Route::Login {
            tracing::info!(from = %previous, "Redirecting to login");
        }
    }
}

impl std::fmt::Debug for Navigator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Navigator")
            .field("current", &self.current())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::store::MemoryTokenStore;
    use crate::token::{AccessToken, StoredTokens};

    fn navigator() -> (Navigator, Session) {
        let session = Session::new(Arc::new(MemoryTokenStore::new()));
        (Navigator::new(session.clone()), session)
    }

    #[test]
    fn test_anonymous_is_redirected_from_protected_views() {
        let (navigator, _) = navigator();

        assert_eq!(
            navigator.navigate(Route::Products),
            Navigation::Redirect(Route::Login)
        );
        assert_eq!(navigator.current(), Route::Login);
    }

    #[test]
    fn test_authenticated_reaches_protected_views() {
        let (navigator, session) = navigator();
        session.login(StoredTokens::new(AccessToken::new("abc"), None));

        assert_eq!(
            navigator.navigate(Route::Products),
            Navigation::Render(Route::Products)
        );
        assert_eq!(navigator.current(), Route::Products);
    }

    #[test]
    fn test_public_views_render_for_anyone() {
        let (navigator, _) = navigator();
        assert_eq!(navigator.navigate(Route::Cart), Navigation::Render(Route::Cart));
    }

    #[tokio::test]
    async fn test_logout_leaves_protected_view() {
        let (navigator, session) = navigator();
        session.login(StoredTokens::new(AccessToken::new("abc"), None));
        navigator.navigate(Route::Categories);

        let task = navigator.follow_session();
        let mut routes = navigator.subscribe();

        session.logout();
        routes.changed().await.unwrap();
        assert_eq!(*routes.borrow(), Route::Login);
        task.abort();
    }

    #[tokio::test]
    async fn test_logout_keeps_public_view() {
        let (navigator, session) = navigator();
        session.login(StoredTokens::new(AccessToken::new("abc"), None));
        navigator.navigate(Route::Cart);

        let task = navigator.follow_session();
        session.logout();
        tokio::task::yield_now().await;
        assert_eq!(navigator.current(), Route::Cart);
        task.abort();
    }
}
