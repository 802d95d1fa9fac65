//! Product endpoints.

use emporium_core::ProductId;
use tracing::instrument;

use super::{ApiClient, ApiError};
use crate::cart::ProductCatalog;
use crate::config::ApiSettings;
use crate::models::Product;

/// Client for `GET /products/{id}`.
///
/// Not cached: callers use it precisely to get current stock.
#[derive(Debug, Clone)]
pub struct CatalogClient {
    api: ApiClient,
}

impl CatalogClient {
    /// Create a catalog client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotConfigured` if no base URL is configured.
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        Ok(Self::with_client(ApiClient::new(settings)?))
    }

    /// Create a catalog client sharing an existing [`ApiClient`].
    #[must_use]
    pub const fn with_client(api: ApiClient) -> Self {
        Self { api }
    }
}

impl ProductCatalog for CatalogClient {
    #[instrument(skip(self), fields(product_id = %id))]
    async fn fetch_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.api.get_json(&["products", id.as_str()]).await
    }
}
