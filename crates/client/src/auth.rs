//! Authentication endpoints.
//!
//! Login and registration are unauthenticated calls; refresh exchanges the
//! stored refresh token for a new access token. None of these go through
//! [`crate::ApiClient`], so a rejected login never triggers a refresh.

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use stns_core::{Email, UserId};
use tracing::instrument;

use crate::config::ClientConfig;
use crate::error::{AuthError, LOGIN_FAILED_MESSAGE, RefreshError, server_message};
use crate::token::{AccessToken, RefreshToken, StoredTokens};

const AUTHENTICATE_PATH: &str = "/users/authenticate";
const SIGN_UP_PATH: &str = "/users/sign-up";
const REFRESH_PATH: &str = "/refresh-token";

/// Request body for login.
#[derive(Serialize)]
struct AuthRequest<'a> {
    username: &'a str,
    password: &'a str,
}

/// Response from the login endpoint.
///
/// Older backends answer with `token`; newer ones use `access_token`.
#[derive(Deserialize)]
struct AuthResponse {
    #[serde(alias = "token", alias = "accessToken")]
    access_token: String,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}

/// Request body for the token refresh endpoint.
#[derive(Serialize)]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// Response from the token refresh endpoint.
#[derive(Deserialize)]
struct RefreshResponse {
    #[serde(alias = "token", alias = "accessToken")]
    access_token: String,
    #[serde(default, alias = "refreshToken")]
    refresh_token: Option<String>,
}

/// Request body for registration.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignUpRequest<'a> {
    name: &'a str,
    email: &'a str,
    password: &'a str,
    confirm_password: &'a str,
    roles: &'a str,
}

/// New account details for registration.
#[derive(Debug)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a Email,
    pub password: &'a SecretString,
    pub confirm_password: &'a SecretString,
    pub roles: &'a str,
}

/// Account returned by the backend after registration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserAccount {
    #[serde(default)]
    pub id: Option<UserId>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

/// Log in with a username and password.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` with the server's message, or the
/// standard fallback text when the server gave none.
#[instrument(skip(client, config, password), fields(username = %username))]
pub async fn authenticate(
    client: &reqwest::Client,
    config: &ClientConfig,
    username: &str,
    password: &SecretString,
) -> Result<StoredTokens, AuthError> {
    let response = client
        .post(config.endpoint(AUTHENTICATE_PATH)?)
        .json(&AuthRequest {
            username,
            password: password.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        let auth: AuthResponse = serde_json::from_slice(&body)?;
        Ok(StoredTokens::new(
            AccessToken::new(auth.access_token),
            auth.refresh_token.map(RefreshToken::new),
        ))
    } else {
        tracing::debug!(status = status.as_u16(), "Login rejected");
        let message = server_message(&body).unwrap_or_else(|| LOGIN_FAILED_MESSAGE.to_string());
        Err(AuthError::InvalidCredentials(message))
    }
}

/// Create a new account.
///
/// # Errors
///
/// Returns `AuthError::RegistrationRejected` with the server's message when
/// the backend refuses the account.
#[instrument(skip(client, config, registration), fields(email = %registration.email))]
pub async fn register(
    client: &reqwest::Client,
    config: &ClientConfig,
    registration: &Registration<'_>,
) -> Result<UserAccount, AuthError> {
    let response = client
        .post(config.endpoint(SIGN_UP_PATH)?)
        .json(&SignUpRequest {
            name: registration.name,
            email: registration.email.as_str(),
            password: registration.password.expose_secret(),
            confirm_password: registration.confirm_password.expose_secret(),
            roles: registration.roles,
        })
        .send()
        .await?;

    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(UserAccount::default());
        }
        Ok(serde_json::from_slice(&body)?)
    } else {
        let message = server_message(&body).unwrap_or_else(|| format!("HTTP {status}"));
        Err(AuthError::RegistrationRejected(message))
    }
}

/// Exchange a refresh token for new credentials.
///
/// The returned tokens keep `current`'s refresh token unless the server
/// rotated it.
///
/// # Errors
///
/// Returns `RefreshError::Rejected` if the server refuses the refresh token.
#[instrument(skip_all)]
pub async fn refresh_tokens(
    client: &reqwest::Client,
    config: &ClientConfig,
    current: &StoredTokens,
) -> Result<StoredTokens, RefreshError> {
    let refresh_token = current
        .refresh_token
        .as_ref()
        .ok_or(RefreshError::MissingRefreshToken)?;

    let response = client
        .post(config.endpoint(REFRESH_PATH)?)
        .json(&RefreshRequest {
            refresh_token: refresh_token.expose_secret(),
        })
        .send()
        .await?;

    let status = response.status();
    let body = response.bytes().await?;

    if status.is_success() {
        let refreshed: RefreshResponse = serde_json::from_slice(&body)?;
        Ok(current.rotated(
            AccessToken::new(refreshed.access_token),
            refreshed.refresh_token.map(RefreshToken::new),
        ))
    } else {
        Err(RefreshError::Rejected {
            status: status.as_u16(),
            message: server_message(&body).unwrap_or_else(|| status.to_string()),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_response_accepts_legacy_token_field() {
        let auth: AuthResponse = serde_json::from_str(r#"{"token":"abc"}"#).unwrap();
        assert_eq!(auth.access_token, "abc");
        assert!(auth.refresh_token.is_none());
    }

    #[test]
    fn test_auth_response_accepts_camel_case() {
        let auth: AuthResponse =
            serde_json::from_str(r#"{"accessToken":"abc","refreshToken":"r"}"#).unwrap();
        assert_eq!(auth.access_token, "abc");
        assert_eq!(auth.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn test_sign_up_request_uses_camel_case() {
        let body = serde_json::to_value(SignUpRequest {
            name: "Ada",
            email: "ada@example.com",
            password: "pw",
            confirm_password: "pw",
            roles: "ADMIN",
        })
        .unwrap();
        assert_eq!(body["confirmPassword"], "pw");
        assert!(body.get("confirm_password").is_none());
    }

    #[test]
    fn test_user_account_tolerates_missing_fields() {
        let account: UserAccount = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        assert_eq!(account.name, "Ada");
        assert!(account.id.is_none());
    }

    #[tokio::test]
    async fn test_refresh_without_refresh_token_fails_before_any_request() {
        let config = ClientConfig::new("http://127.0.0.1:9", "/tmp/stns").unwrap();
        let current = StoredTokens::new(AccessToken::new("a"), None);

        let err = refresh_tokens(&reqwest::Client::new(), &config, &current)
            .await
            .unwrap_err();
        assert!(matches!(err, RefreshError::MissingRefreshToken));
    }
}
