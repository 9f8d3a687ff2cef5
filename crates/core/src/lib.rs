//! STNS Core - Domain types for the catalog admin client.
//!
//! This crate provides the types shared by the client library and the CLI:
//! - `stns-client` - Session lifecycle and the authenticated REST client
//! - `stns-cli` - The `stns` command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no async runtime. Everything here can be tested without a backend.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices and emails
//! - [`catalog`] - Category and product records as the backend sends them
//! - [`cart`] - Shopping cart bookkeeping
//! - [`forms`] - Field-level validation for the admin forms
//! - [`pagination`] - Page cursor for paginated list views
//! - [`routing`] - Views and the route guard

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod forms;
pub mod pagination;
pub mod routing;
pub mod types;

pub use cart::{Cart, CartItem};
pub use catalog::{Category, Page, Product};
pub use routing::{Navigation, Route, SessionState, guard};
pub use types::*;
