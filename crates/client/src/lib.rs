//! STNS Client - Session lifecycle and authenticated REST client.
//!
//! This crate talks to the STNS catalog backend on behalf of a front end:
//!
//! - [`store`] - Durable slot for the access and refresh tokens
//! - [`session`] - Who is logged in, with change notifications
//! - [`client`] - Bearer-authenticated requests with refresh-and-retry
//! - [`refresh`] - Single-flight token refresh
//! - [`navigation`] - Current view, gated by the route guard
//! - [`catalog`] - Category and product endpoints
//! - [`app`] - Wires everything together
//!
//! # Example
//!
//! ```rust,no_run
//! use stns_client::{App, ClientConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let app = App::from_config(ClientConfig::from_env()?)?;
//! let page = app.categories().list(1, 3).await?;
//! println!("{} pages of categories", page.total_pages);
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod navigation;
mod persist;
pub mod refresh;
pub mod scope;
pub mod session;
pub mod store;
pub mod token;

pub use app::App;
pub use auth::{Registration, UserAccount};
pub use cart::CartStore;
pub use catalog::{CategoryService, ProductService};
pub use client::{ApiClient, ApiRequest, LoginRedirect};
pub use config::{ClientConfig, ConfigError};
pub use error::{ApiError, AuthError, FailureKind, RefreshError};
pub use navigation::Navigator;
pub use refresh::TokenRefresher;
pub use scope::{Cancelled, ScopeHandle, ViewScope};
pub use session::Session;
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use token::{AccessToken, RefreshToken, StoredTokens};
