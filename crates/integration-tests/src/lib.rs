//! Shared fixtures for the storefront integration tests.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p emporium-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart_identity` - Identity switching and guest-to-user migration
//! - `checkout_flow` - Stock re-validation and order totals
//! - `delivery_fallback` - Remote pricing failures and stale responses

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use emporium_core::{Money, ProductId, ZoneId};
use emporium_storefront::api::ApiError;
use emporium_storefront::cart::ProductCatalog;
use emporium_storefront::delivery::{DeliveryProgress, FeeQuote, FeeRequest, PricingSource};
use emporium_storefront::models::Product;
use emporium_storefront::pricing::{DeliveryOptions, DeliveryZone};
use emporium_storefront::telemetry::{self, LogFormat};

/// Install a test subscriber once; later calls are no-ops.
pub fn init_tracing() {
    telemetry::init("emporium_storefront=debug", LogFormat::Pretty);
}

/// An active product with the given stock and price.
#[must_use]
pub fn product(id: &str, stock: i64, price: i64) -> Product {
    Product {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        image: None,
        is_active: true,
        stock_quantity: stock,
        low_stock_threshold: 5,
        price: Money::from_major(price),
        discount_price: None,
        sizes: Vec::new(),
    }
}

/// The Colombo zone used across the scenarios.
#[must_use]
pub fn colombo() -> DeliveryZone {
    DeliveryZone {
        id: ZoneId::new("colombo"),
        name: "Colombo".to_owned(),
        base_fee: Money::from_major(500),
        free_threshold: Money::from_major(8_000),
        covered_cities: vec!["Colombo".to_owned(), "Dehiwala".to_owned()],
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Mutable in-memory product catalog.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: Mutex<HashMap<ProductId, Product>>,
}

impl MemoryCatalog {
    #[must_use]
    pub fn with(products: impl IntoIterator<Item = Product>) -> Self {
        Self {
            products: Mutex::new(products.into_iter().map(|p| (p.id.clone(), p)).collect()),
        }
    }

    /// Insert or replace a product.
    pub fn put(&self, product: Product) {
        self.products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.id.clone(), product);
    }
}

impl ProductCatalog for MemoryCatalog {
    async fn fetch_product(&self, id: &ProductId) -> Result<Product, ApiError> {
        self.products
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("/products/{id}")))
    }
}

// =============================================================================
// Pricing sources
// =============================================================================

/// A pricing source whose every call fails like an unreachable server.
#[derive(Debug, Clone, Copy, Default)]
pub struct DownPricing;

impl PricingSource for DownPricing {
    async fn fetch_options(&self) -> Result<DeliveryOptions, ApiError> {
        Err(unavailable())
    }

    async fn lookup_zone(&self, _city: &str) -> Result<DeliveryZone, ApiError> {
        Err(unavailable())
    }

    async fn quote_fee(&self, _request: &FeeRequest) -> Result<FeeQuote, ApiError> {
        Err(unavailable())
    }

    async fn quote_progress(
        &self,
        _subtotal: Money,
        _city: &str,
    ) -> Result<DeliveryProgress, ApiError> {
        Err(unavailable())
    }
}

fn unavailable() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "service unavailable".to_owned(),
    }
}

/// Serves queued options responses, each after its own delay, so tests can
/// make an older request finish after a newer one.
#[derive(Debug, Default)]
pub struct DelayedOptions {
    /// Served in call order: (delay, options).
    responses: Mutex<Vec<(Duration, DeliveryOptions)>>,
}

impl DelayedOptions {
    #[must_use]
    pub fn new(responses: Vec<(Duration, DeliveryOptions)>) -> Self {
        Self {
            responses: Mutex::new(responses),
        }
    }

    fn next(&self) -> Option<(Duration, DeliveryOptions)> {
        let mut responses = self.responses.lock().unwrap_or_else(PoisonError::into_inner);
        (!responses.is_empty()).then(|| responses.remove(0))
    }
}

impl PricingSource for DelayedOptions {
    async fn fetch_options(&self) -> Result<DeliveryOptions, ApiError> {
        let (delay, options) = self.next().ok_or(ApiError::NotConfigured)?;
        tokio::time::sleep(delay).await;
        Ok(options)
    }

    async fn lookup_zone(&self, _city: &str) -> Result<DeliveryZone, ApiError> {
        Err(ApiError::NotConfigured)
    }

    async fn quote_fee(&self, _request: &FeeRequest) -> Result<FeeQuote, ApiError> {
        Err(ApiError::NotConfigured)
    }

    async fn quote_progress(
        &self,
        _subtotal: Money,
        _city: &str,
    ) -> Result<DeliveryProgress, ApiError> {
        Err(ApiError::NotConfigured)
    }
}

/// Options containing a single zone.
#[must_use]
pub fn options_with(zone: DeliveryZone) -> DeliveryOptions {
    DeliveryOptions {
        zones: vec![zone],
        time_slots: Vec::new(),
        express: emporium_storefront::pricing::ExpressPolicy::default(),
        tier_discounts: emporium_storefront::pricing::TierDiscounts::default(),
    }
}
