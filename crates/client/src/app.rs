//! Composition root.
//!
//! [`App`] builds the token store, session, navigator, API client and
//! services once and hands out references. Nothing in the crate keeps
//! global state.

use std::io;
use std::sync::Arc;

use secrecy::SecretString;
use stns_core::{Cart, Navigation, Route};

use crate::auth::{self, Registration, UserAccount};
use crate::cart::CartStore;
use crate::catalog::{CategoryService, ProductService};
use crate::client::ApiClient;
use crate::config::ClientConfig;
use crate::error::AuthError;
use crate::navigation::Navigator;
use crate::session::Session;
use crate::store::{FileTokenStore, TokenStore};

/// Everything a front end needs, wired together.
#[derive(Debug, Clone)]
pub struct App {
    session: Session,
    navigator: Navigator,
    client: ApiClient,
    categories: CategoryService,
    products: ProductService,
    cart: CartStore,
}

impl App {
    /// Wire the application with the durable token store from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: ClientConfig) -> Result<Self, reqwest::Error> {
        let store = FileTokenStore::open(config.credentials_path(), config.origin());
        Self::with_store(config, Arc::new(store))
    }

    /// Wire the application around an existing token store.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_store(
        config: ClientConfig,
        store: Arc<dyn TokenStore>,
    ) -> Result<Self, reqwest::Error> {
        let session = Session::new(store);
        let navigator = Navigator::new(session.clone());
        let cart = CartStore::new(config.cart_path());
        let client = ApiClient::new(config, session.clone(), Arc::new(navigator.clone()))?;

        Ok(Self {
            categories: CategoryService::new(client.clone()),
            products: ProductService::new(client.clone()),
            session,
            navigator,
            client,
            cart,
        })
    }

    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    #[must_use]
    pub const fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    #[must_use]
    pub const fn client(&self) -> &ApiClient {
        &self.client
    }

    #[must_use]
    pub const fn categories(&self) -> &CategoryService {
        &self.categories
    }

    #[must_use]
    pub const fn products(&self) -> &ProductService {
        &self.products
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Open a view through the route guard.
    pub fn open(&self, route: Route) -> Navigation {
        self.navigator.navigate(route)
    }

    /// Log in and land on the first admin view.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` with the message to show on
    /// the login form.
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<Navigation, AuthError> {
        let tokens =
            auth::authenticate(self.client.http(), self.client.config(), username, password).await?;
        self.session.login(tokens);
        Ok(self.navigator.navigate(Route::LANDING))
    }

    /// Create an account. Does not log in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::RegistrationRejected` if the backend refuses it.
    pub async fn register(
        &self,
        registration: &Registration<'_>,
    ) -> Result<UserAccount, AuthError> {
        let account = auth::register(self.client.http(), self.client.config(), registration).await?;
        tracing::info!("Account registered");
        Ok(account)
    }

    /// End the session and discard the cart built in it.
    pub fn logout(&self) {
        self.session.logout();
        if let Err(e) = self.cart.clear() {
            tracing::warn!(error = %e, "Failed to discard cart");
        }
        self.navigator.navigate(Route::Login);
    }

    /// Place the order: empty the cart and show the confirmation.
    ///
    /// Returns the cart as it was checked out.
    ///
    /// # Errors
    ///
    /// Returns an error if the saved cart cannot be removed.
    pub fn checkout(&self) -> io::Result<Cart> {
        self.navigator.navigate(Route::Checkout);
        let cart = self.cart.load();
        self.cart.clear()?;
        tracing::info!(items = cart.item_count(), total = %cart.total_display(), "Checked out");
        self.navigator.navigate(Route::Confirmation);
        Ok(cart)
    }
}
