//! Cart persistence.
//!
//! Each CLI invocation is a new process, so the cart lives in `cart.json`
//! between commands. It is deleted on checkout and on logout.

use std::io;
use std::path::PathBuf;

use stns_core::Cart;

use crate::persist;

/// The cart file in the data directory.
#[derive(Debug, Clone)]
pub struct CartStore {
    path: PathBuf,
}

impl CartStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the saved cart. A missing or unreadable file is an empty cart.
    #[must_use]
    pub fn load(&self) -> Cart {
        match persist::read_json(&self.path) {
            Ok(cart) => cart.unwrap_or_default(),
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Discarding unreadable cart"
                );
                Cart::new()
            }
        }
    }

    /// Save `cart`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, cart: &Cart) -> io::Result<()> {
        if cart.is_empty() {
            return self.clear();
        }
        persist::write_json(&self.path, cart)
    }

    /// Forget the saved cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub fn clear(&self) -> io::Result<()> {
        persist::remove(&self.path)
    }
}
