use stns_core::catalog::{Listing, NewProduct, ProductUpdate};
use stns_core::{Page, Product, ProductId};
use tracing::instrument;

use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiError;

const BASE_PATH: &str = "/product";
const ALL_PATH: &str = "/product/all";
const SEARCH_PATH: &str = "/product/search";

/// Product endpoints.
#[derive(Debug, Clone)]
pub struct ProductService {
    client: ApiClient,
}

impl ProductService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// One page of products. `page` is 1-based.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32, size: u32) -> Result<Page<Product>, ApiError> {
        let request = ApiRequest::get(ALL_PATH)
            .query("page", page)
            .query("size", size);
        self.client.send(&request).await
    }

    /// Every product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<Product>, ApiError> {
        let listing: Listing<Product> = self.client.send(&ApiRequest::get(ALL_PATH)).await?;
        Ok(listing.into_items())
    }

    /// Products whose name matches `name`, as decided by the backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn search(&self, name: &str) -> Result<Vec<Product>, ApiError> {
        let request = ApiRequest::get(SEARCH_PATH).query("name", name);
        let listing: Listing<Product> = self.client.send(&request).await?;
        Ok(listing.into_items())
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the product.
    #[instrument(
        skip(self, product),
        fields(name = %product.name, category = %product.category.id)
    )]
    pub async fn create(&self, product: &NewProduct) -> Result<Product, ApiError> {
        let request = ApiRequest::post(BASE_PATH).json(product)?;
        let created = self.client.send(&request).await?;
        tracing::info!("Product created");
        Ok(created)
    }

    /// Replace a product's name, quantity and price.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the update.
    #[instrument(skip(self, update), fields(id = %update.id))]
    pub async fn update(&self, update: &ProductUpdate) -> Result<Product, ApiError> {
        let request = ApiRequest::put(BASE_PATH).json(update)?;
        let updated = self.client.send(&request).await?;
        tracing::info!("Product updated");
        Ok(updated)
    }

    /// Delete a product. Returns the deleted record when the backend echoes
    /// it; any other body, including an empty one, yields `None`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend refuses the deletion.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: ProductId) -> Result<Option<Product>, ApiError> {
        let request = ApiRequest::delete(format!("{BASE_PATH}/{id}"));
        let body: serde_json::Value = self.client.send(&request).await?;
        tracing::info!("Product deleted");
        Ok(serde_json::from_value(body).ok())
    }
}
