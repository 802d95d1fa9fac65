//! Remote pricing collaborator.

use std::future::Future;

use emporium_core::Money;

use super::calculator::{DeliveryProgress, FeeQuote, FeeRequest};
use crate::api::ApiError;
use crate::pricing::{DeliveryOptions, DeliveryZone};

/// Server side of delivery pricing.
///
/// Implemented by [`DeliveryClient`](crate::api::DeliveryClient). Every
/// method may fail; [`DeliveryService`](super::DeliveryService) absorbs the
/// failures and falls back to local rules.
pub trait PricingSource: Send + Sync {
    /// `GET /delivery/options`
    fn fetch_options(&self) -> impl Future<Output = Result<DeliveryOptions, ApiError>> + Send;

    /// `GET /delivery/zone/{city}`
    fn lookup_zone(
        &self,
        city: &str,
    ) -> impl Future<Output = Result<DeliveryZone, ApiError>> + Send;

    /// `POST /delivery/calculate-fee`
    fn quote_fee(
        &self,
        request: &FeeRequest,
    ) -> impl Future<Output = Result<FeeQuote, ApiError>> + Send;

    /// `POST /delivery/free-delivery-progress`
    fn quote_progress(
        &self,
        subtotal: Money,
        city: &str,
    ) -> impl Future<Output = Result<DeliveryProgress, ApiError>> + Send;

    /// Forget cached options and zones so the next call reaches the server.
    fn invalidate(&self) {}
}

/// A pricing source for when no API is configured. Every call fails with
/// [`ApiError::NotConfigured`], so pricing always runs on local rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflinePricing;

impl PricingSource for OfflinePricing {
    async fn fetch_options(&self) -> Result<DeliveryOptions, ApiError> {
        Err(ApiError::NotConfigured)
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
