//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `STNS_API_BASE_URL` - Backend base URL (default: `http://localhost:9191`)
//! - `STNS_DATA_DIR` - Where credentials and the cart are kept
//!   (default: `$HOME/.stns`, or `./.stns` when `HOME` is unset)
//! - `STNS_HTTP_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `STNS_PAGE_SIZE` - Default product page size (default: 12)

use std::path::{Path, PathBuf};
use std::time::Duration;

use stns_core::pagination::DEFAULT_PRODUCT_PAGE_SIZE;
use thiserror::Error;
use url::Url;

const DEFAULT_BASE_URL: &str = "http://localhost:9191";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DATA_DIR_NAME: &str = ".stns";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL. Always ends with a `/` so paths join under it.
    pub base_url: Url,
    /// Directory holding `credentials.json` and `cart.json`
    pub data_dir: PathBuf,
    /// Timeout applied to every HTTP request
    pub timeout: Duration,
    /// Default page size for product listings
    pub page_size: u32,
}

impl ClientConfig {
    /// Build a configuration for `base_url` with defaults for everything else.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `base_url` is not a valid URL.
    pub fn new(base_url: &str, data_dir: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("STNS_API_BASE_URL", base_url)?,
            data_dir: data_dir.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            page_size: DEFAULT_PRODUCT_PAGE_SIZE,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let base_url = parse_base_url(
            "STNS_API_BASE_URL",
            &get_env_or_default("STNS_API_BASE_URL", DEFAULT_BASE_URL),
        )?;
        let data_dir = get_optional_env("STNS_DATA_DIR")
            .map_or_else(default_data_dir, PathBuf::from);
        let timeout_secs = get_env_or_default("STNS_HTTP_TIMEOUT_SECS", "30")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STNS_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        let page_size = get_optional_env("STNS_PAGE_SIZE")
            .map(|s| {
                s.parse::<u32>().map_err(|e| {
                    ConfigError::InvalidEnvVar("STNS_PAGE_SIZE".to_string(), e.to_string())
                })
            })
            .transpose()?
            .unwrap_or(DEFAULT_PRODUCT_PAGE_SIZE);

        Ok(Self {
            base_url,
            data_dir,
            timeout: Duration::from_secs(timeout_secs),
            page_size,
        })
    }

    /// Path of the durable token slot.
    #[must_use]
    pub fn credentials_path(&self) -> PathBuf {
        self.data_dir.join("credentials.json")
    }

    /// Path of the persisted cart.
    #[must_use]
    pub fn cart_path(&self) -> PathBuf {
        self.data_dir.join("cart.json")
    }

    /// The data directory.
    #[must_use]
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Resolve an API path such as `/product/all` against the base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the joined URL is invalid.
    pub fn endpoint(&self, path: &str) -> Result<Url, url::ParseError> {
        self.base_url.join(path.trim_start_matches('/'))
    }

    /// Origin the credentials are bound to (scheme, host and port).
    #[must_use]
    pub fn origin(&self) -> String {
        self.base_url.origin().ascii_serialization()
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Parse a base URL, making sure it ends with `/` so relative joins keep any
/// path prefix (e.g., `https://host/api/`).
fn parse_base_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url =
        Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be an http(s) URL".to_string(),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn default_data_dir() -> PathBuf {
    get_optional_env("HOME").map_or_else(
        || PathBuf::from(DATA_DIR_NAME),
        |home| PathBuf::from(home).join(DATA_DIR_NAME),
    )
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let config = ClientConfig::new("http://localhost:9191/api", "/tmp/stns").unwrap();
        assert_eq!(config.base_url.as_str(), "http://localhost:9191/api/");
    }

    #[test]
    fn test_endpoint_keeps_prefix() {
        let config = ClientConfig::new("https://shop.example/api/", "/tmp/stns").unwrap();
        assert_eq!(
            config.endpoint("/product/all").unwrap().as_str(),
            "https://shop.example/api/product/all"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let err = ClientConfig::new("not a url", "/tmp/stns").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(key, _) if key == "STNS_API_BASE_URL"));
    }

    #[test]
    fn test_origin_ignores_path() {
        let config = ClientConfig::new("http://localhost:9191/api", "/tmp/stns").unwrap();
        assert_eq!(config.origin(), "http://localhost:9191");
    }

    #[test]
    fn test_data_files_live_in_data_dir() {
        let config = ClientConfig::new(DEFAULT_BASE_URL, "/tmp/stns").unwrap();
        assert_eq!(config.credentials_path(), PathBuf::from("/tmp/stns/credentials.json"));
        assert_eq!(config.cart_path(), PathBuf::from("/tmp/stns/cart.json"));
    }
}
