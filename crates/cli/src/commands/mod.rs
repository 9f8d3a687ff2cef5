//! Subcommand implementations.
//!
//! Each subcommand is one view: it opens its route through the guard, runs
//! its requests inside the view scope and writes results to stdout.

use std::io::{self, Write};

use stns_client::{App, ScopeHandle};
use stns_core::{Navigation, ProductId, Route};
use thiserror::Error;

pub mod auth;
pub mod cart;
pub mod categories;
pub mod products;

/// Errors raised by the CLI itself rather than the client.
#[derive(Debug, Error)]
pub enum CliError {
    /// A protected view was opened without a session.
    #[error("Login required to open {0}. Run `stns login` first.")]
    LoginRequired(Route),

    /// A destructive command was run without `--yes`.
    #[error("Refusing to {0} without --yes")]
    NotConfirmed(&'static str),

    /// No product with this id exists.
    #[error("Product {0} not found")]
    UnknownProduct(ProductId),

    /// A form submission failed for reasons the user cannot fix.
    #[error("{0}")]
    Submit(&'static str),

    /// The password could not be read from stdin.
    #[error("Failed to read password: {0}")]
    Password(#[source] io::Error),
}

/// What every command gets to work with.
pub struct Context {
    pub app: App,
    pub scope: ScopeHandle,
}

impl Context {
    pub const fn new(app: App, scope: ScopeHandle) -> Self {
        Self { app, scope }
    }

    /// Open `route`, failing if the guard redirects to the login view.
    pub fn open(&self, route: Route) -> Result<(), CliError> {
        match self.app.open(route) {
            Navigation::Render(_) => Ok(()),
            Navigation::Redirect(_) => Err(CliError::LoginRequired(route)),
        }
    }
}

/// Locked stdout for command output.
pub fn out() -> io::StdoutLock<'static> {
    io::stdout().lock()
}

/// Write a "nothing here" line when `empty`, returning whether it did.
pub fn write_empty(out: &mut impl Write, empty: bool, what: &str) -> io::Result<bool> {
    if empty {
        writeln!(out, "No {what} found.")?;
    }
    Ok(empty)
}
