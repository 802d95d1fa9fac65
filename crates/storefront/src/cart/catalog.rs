//! Product lookup collaborator.

use std::future::Future;

use emporium_core::ProductId;

use crate::api::ApiError;
use crate::models::Product;

/// Source of authoritative product records.
///
/// Implemented by [`CatalogClient`](crate::api::CatalogClient); tests use
/// in-memory fakes.
pub trait ProductCatalog: Send + Sync {
    /// `GET /products/{id}`
    fn fetch_product(
        &self,
        id: &ProductId,
    ) -> impl Future<Output = Result<Product, ApiError>> + Send;
}
