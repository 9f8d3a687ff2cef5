use stns_core::catalog::{Listing, NewCategoryRequest};
use stns_core::{Category, Page};
use tracing::instrument;

use crate::client::{ApiClient, ApiRequest};
use crate::error::ApiError;

const ALL_PATH: &str = "/category/all";
const CREATE_PATH: &str = "/category";

/// Category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryService {
    client: ApiClient,
}

impl CategoryService {
    #[must_use]
    pub const fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// One page of categories. `page` is 1-based.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn list(&self, page: u32, size: u32) -> Result<Page<Category>, ApiError> {
        let request = ApiRequest::get(ALL_PATH)
            .query("page", page)
            .query("size", size);
        self.client.send(&request).await
    }

    /// Every category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn all(&self) -> Result<Vec<Category>, ApiError> {
        let listing: Listing<Category> = self.client.send(&ApiRequest::get(ALL_PATH)).await?;
        Ok(listing.into_items())
    }

    /// Create a category.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if the backend rejects the category.
    #[instrument(skip(self, request), fields(name = %request.category.name))]
    pub async fn create(&self, request: &NewCategoryRequest) -> Result<Category, ApiError> {
        let request = ApiRequest::post(CREATE_PATH).json(request)?;
        let category = self.client.send(&request).await?;
        tracing::info!("Category created");
        Ok(category)
    }
}
