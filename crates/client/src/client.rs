//! Authenticated REST client.
//!
//! Every catalog call goes through [`ApiClient::send`], which attaches the
//! current bearer token and recovers from one expired-token rejection per
//! call by refreshing and retrying.

use std::sync::Arc;

use reqwest::header::{ACCEPT, AUTHORIZATION};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::instrument;
use url::Url;

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::refresh::TokenRefresher;
use crate::session::Session;
use crate::token::{AccessToken, bearer};

/// Header carrying the per-attempt correlation id.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Where to go when the session can no longer be renewed.
pub trait LoginRedirect: Send + Sync {
    fn redirect_to_login(&self);
}

impl<F> LoginRedirect for F
where
    F: Fn() + Send + Sync,
{
    fn redirect_to_login(&self) {
        self();
    }
}

/// One API call: method, path, optional JSON body and query parameters.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    body: Option<serde_json::Value>,
    query: Vec<(String, String)>,
}

impl ApiRequest {
    #[must_use]
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            query: Vec::new(),
        }
    }

    #[must_use]
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    #[must_use]
    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    #[must_use]
    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    #[must_use]
    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Attach a JSON body.
    ///
    /// # Errors
    ///
    /// Returns an error if `body` cannot be represented as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, serde_json::Error> {
        self.body = Some(serde_json::to_value(body)?);
        Ok(self)
    }

    /// Append a query parameter.
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    #[must_use]
    pub const fn method(&self) -> &Method {
        &self.method
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Resolve the full URL against the configured base URL.
    fn url(&self, config: &ClientConfig) -> Result<Url, url::ParseError> {
        let mut url = config.endpoint(&self.path)?;
        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }
        Ok(url)
    }
}

/// Authenticated client for the catalog backend. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    http: reqwest::Client,
    config: ClientConfig,
    session: Session,
    refresher: TokenRefresher,
    redirect: Arc<dyn LoginRedirect>,
}

impl ApiClient {
    /// Create a client for `config`, reading tokens from `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(
        config: ClientConfig,
        session: Session,
        redirect: Arc<dyn LoginRedirect>,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        let refresher = TokenRefresher::new(http.clone(), config.clone(), session.clone());

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                http,
                config,
                session,
                refresher,
                redirect,
            }),
        })
    }

    /// The underlying HTTP client, for unauthenticated calls.
    #[must_use]
    pub fn http(&self) -> &reqwest::Client {
        &self.inner.http
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    #[must_use]
    pub fn refresher(&self) -> &TokenRefresher {
        &self.inner.refresher
    }

    /// Send `request` and decode the response body as `T`.
    ///
    /// A 401 is answered by refreshing the token and retrying once. If the
    /// refresh fails the session is cleared, the login redirect fires and
    /// `ApiError::SessionExpired` is returned.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` for network failures, non-2xx responses and bodies
    /// that do not decode as `T`.
    #[instrument(skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn send<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T, ApiError> {
        let url = request.url(&self.inner.config)?;
        let generation = self.inner.refresher.generation();
        let token = self.inner.session.token();

        let mut response = self.dispatch(request, &url, token.as_ref()).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            tracing::debug!("Access token rejected, refreshing");
            let refreshed = self
                .inner
                .refresher
                .refresh_after(token.as_ref(), generation)
                .await;
            match refreshed {
                Ok(fresh) => {
                    response = self.dispatch(request, &url, Some(&fresh)).await?;
                }
                Err(e) => {
                    self.inner.redirect.redirect_to_login();
                    return Err(ApiError::SessionExpired(e));
                }
            }
        }

        let status = response.status();
        let body = response.bytes().await.map_err(ApiError::Network)?;
        decode_body(status, &body)
    }

    /// Issue one attempt of `request`.
    async fn dispatch(
        &self,
        request: &ApiRequest,
        url: &Url,
        token: Option<&AccessToken>,
    ) -> Result<reqwest::Response, ApiError> {
        let request_id = uuid::Uuid::new_v4();

        let mut builder = self
            .inner
            .http
            .request(request.method.clone(), url.clone())
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, bearer(token));
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::warn!(%request_id, error = %e, "Request failed");
            ApiError::Network(e)
        })?;

        tracing::debug!(
            %request_id,
            status = response.status().as_u16(),
            authenticated = token.is_some(),
            "Response received"
        );
        Ok(response)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.config.base_url.as_str())
            .field("session", &self.inner.session)
            .finish_non_exhaustive()
    }
}

/// Turn a final response into a payload or a typed failure.
///
/// An empty 2xx body decodes as JSON `null`.
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, ApiError> {
    if !status.is_success() {
        return Err(ApiError::from_status(status, body));
    }
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(serde_json::from_slice(b"null")?);
    }
    Ok(serde_json::from_slice(body)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::FailureKind;

    fn config() -> ClientConfig {
        ClientConfig::new("http://localhost:9191/api", "/tmp/stns").unwrap()
    }

    #[test]
    fn test_url_without_query_has_no_question_mark() {
        let url = ApiRequest::get("/category/all").url(&config()).unwrap();
        assert_eq!(url.as_str(), "http://localhost:9191/api/category/all");
    }

    #[test]
    fn test_query_is_encoded() {
        let url = ApiRequest::get("/product/search")
            .query("name", "big & small")
            .url(&config())
            .unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:9191/api/product/search?name=big+%26+small"
        );
    }

    #[test]
    fn test_paging_query() {
        let url = ApiRequest::get("/product/all")
            .query("page", 0)
            .query("size", 12)
            .url(&config())
            .unwrap();
        assert_eq!(url.query(), Some("page=0&size=12"));
    }

    #[test]
    fn test_json_body_is_kept() {
        let request = ApiRequest::post("/category")
            .json(&serde_json::json!({"category": {"name": "Tools"}}))
            .unwrap();
        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.body.unwrap()["category"]["name"], "Tools");
    }

    #[test]
    fn test_empty_body_decodes_as_null() {
        decode_body::<()>(StatusCode::OK, b"").unwrap();
        let nothing: Option<u32> = decode_body(StatusCode::NO_CONTENT, b"  ").unwrap();
        assert!(nothing.is_none());
    }

    #[test]
    fn test_malformed_success_body_is_server_failure() {
        let err = decode_body::<Vec<u32>>(StatusCode::OK, b"{oops").unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
        assert_eq!(err.kind(), FailureKind::Server);
    }

    #[test]
    fn test_error_status_carries_server_message() {
        let err = decode_body::<()>(StatusCode::CONFLICT, br#"{"message":"Duplicate name"}"#)
            .unwrap_err();
        assert!(matches!(
            err,
            ApiError::Validation { status: 409, ref message } if message == "Duplicate name"
        ));
    }

    #[test]
    fn test_closures_are_redirects() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let redirect: Arc<dyn LoginRedirect> = Arc::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        redirect.redirect_to_login();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
