//! Bearer credentials.
//!
//! The backend issues an access token on login and, optionally, a refresh
//! token that can mint a new access token without re-entering the password.
//! Both are wrapped in [`SecretString`] so they never reach logs.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};

macro_rules! secret_token {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name(SecretString);

        impl $name {
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(SecretString::from(value.into()))
            }
        }

        impl ExposeSecret<str> for $name {
            fn expose_secret(&self) -> &str {
                self.0.expose_secret()
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.0.expose_secret() == other.0.expose_secret()
            }
        }

        impl Eq for $name {}

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(concat!(stringify!($name), "([REDACTED])"))
            }
        }
    };
}

secret_token!(
    /// Short-lived bearer credential attached to API calls.
    AccessToken
);

secret_token!(
    /// Longer-lived credential exchanged for a new [`AccessToken`].
    RefreshToken
);

/// The credentials held by a token store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTokens {
    pub access_token: AccessToken,
    pub refresh_token: Option<RefreshToken>,
    /// When the access token was obtained.
    pub issued_at: DateTime<Utc>,
}

impl StoredTokens {
    /// Credentials obtained just now.
    #[must_use]
    pub fn new(access_token: AccessToken, refresh_token: Option<RefreshToken>) -> Self {
        Self {
            access_token,
            refresh_token,
            issued_at: Utc::now(),
        }
    }

    /// Replace the access token after a refresh.
    ///
    /// The refresh token is only replaced when the server rotated it.
    #[must_use]
    pub fn rotated(&self, access_token: AccessToken, refresh_token: Option<RefreshToken>) -> Self {
        Self::new(
            access_token,
            refresh_token.or_else(|| self.refresh_token.clone()),
        )
    }

    /// Value of the `Authorization` header for these credentials.
    #[must_use]
    pub fn bearer(&self) -> String {
        bearer(&self.access_token)
    }
}

/// `Bearer <token>` header value.
#[must_use]
pub fn bearer(token: &AccessToken) -> String {
    format!("Bearer {}", token.expose_secret())
}
