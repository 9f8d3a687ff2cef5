//! Views and the route guard.
//!
//! The guard is a pure function of the session state: it owns no state and
//! performs no navigation itself. The client's navigator applies it.

use std::fmt;
use std::str::FromStr;

/// Whether the user is logged in.
///
/// Always derived from the presence of an access token; never stored on its
/// own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

impl SessionState {
    /// Derive the state from whether a token is present.
    #[must_use]
    pub const fn from_token_present(present: bool) -> Self {
        if present {
            Self::Authenticated
        } else {
            Self::Anonymous
        }
    }

    #[must_use]
    pub const fn is_authenticated(self) -> bool {
        matches!(self, Self::Authenticated)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("anonymous"),
            Self::Authenticated => f.write_str("authenticated"),
        }
    }
}

/// The views of the admin front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Register,
    NewCategory,
    Categories,
    Products,
    NewProduct,
    Cart,
    Checkout,
    Confirmation,
}

impl Route {
    /// Where a successful login lands.
    pub const LANDING: Self = Self::NewCategory;

    /// Views that require an authenticated session.
    #[must_use]
    pub const fn is_protected(self) -> bool {
        matches!(
            self,
            Self::NewCategory | Self::Categories | Self::Products | Self::NewProduct
        )
    }

    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/login",
            Self::Register => "/register",
            Self::NewCategory => "/new-category",
            Self::Categories => "/all-categories",
            Self::Products => "/all-products",
            Self::NewProduct => "/new-product",
            Self::Cart => "/cart",
            Self::Checkout => "/checkout",
            Self::Confirmation => "/confirmation",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Error returned when a path names no known view.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown route: {0}")]
pub struct UnknownRoute(pub String);

impl FromStr for Route {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let route = match s {
            "/login" => Self::Login,
            "/register" => Self::Register,
            "/new-category" => Self::NewCategory,
            "/all-categories" => Self::Categories,
            "/all-products" => Self::Products,
            "/new-product" => Self::NewProduct,
            "/cart" => Self::Cart,
            "/checkout" => Self::Checkout,
            "/confirmation" => Self::Confirmation,
            other => return Err(UnknownRoute(other.to_string())),
        };
        Ok(route)
    }
}

/// Outcome of guarding a navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    /// Show the requested view.
    Render(Route),
    /// Show this view instead.
    Redirect(Route),
}

impl Navigation {
    /// The view that ends up on screen.
    #[must_use]
    pub const fn target(self) -> Route {
        match self {
            Self::Render(route) | Self::Redirect(route) => route,
        }
    }
}

/// Decide whether `route` is reachable in the given session state.
#[must_use]
pub const fn guard(state: SessionState, route: Route) -> Navigation {
    if route.is_protected() && !state.is_authenticated() {
        Navigation::Redirect(Route::Login)
    } else {
        Navigation::Render(route)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Route; 9] = [
        Route::Login,
        Route::Register,
        Route::NewCategory,
        Route::Categories,
        Route::Products,
        Route::NewProduct,
        Route::Cart,
        Route::Checkout,
        Route::Confirmation,
    ];

    #[test]
    fn test_anonymous_is_redirected_from_protected_routes() {
        for route in ALL.into_iter().filter(|r| r.is_protected()) {
            assert_eq!(
                guard(SessionState::Anonymous, route),
                Navigation::Redirect(Route::Login)
            );
        }
    }

    #[test]
    fn test_authenticated_renders_protected_routes() {
        let state = SessionState::from_token_present(Some("abc").is_some());
        assert_eq!(
            guard(state, Route::Products),
            Navigation::Render(Route::Products)
        );
    }

    #[test]
    fn test_public_routes_always_render() {
        for route in ALL.into_iter().filter(|r| !r.is_protected()) {
            assert_eq!(guard(SessionState::Anonymous, route), Navigation::Render(route));
            assert_eq!(
                guard(SessionState::Authenticated, route),
                Navigation::Render(route)
            );
        }
    }

    #[test]
    fn test_paths_round_trip() {
        for route in ALL {
            assert_eq!(route.path().parse::<Route>(), Ok(route));
        }
        assert!("/admin".parse::<Route>().is_err());
    }
}
