//! Catalog services.
//!
//! Thin typed wrappers over [`ApiClient`](crate::ApiClient) for the category
//! and product endpoints. They add no retry or caching of their own.

mod categories;
mod products;

pub use categories::CategoryService;
pub use products::ProductService;
