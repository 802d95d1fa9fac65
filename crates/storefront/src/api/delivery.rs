//! Delivery endpoints.

use emporium_core::Money;
use moka::future::Cache;
use serde::Serialize;
use tracing::{debug, instrument};

use super::cache::{CacheKey, CacheValue};
use super::{ApiClient, ApiError};
use crate::config::ApiSettings;
use crate::delivery::{DeliveryProgress, FeeQuote, FeeRequest, PricingSource};
use crate::pricing::{DeliveryOptions, DeliveryZone, normalize_city};

/// Client for the `/delivery` endpoints.
///
/// Options and zone lookups are cached for the configured TTL. Fee and
/// progress calculations depend on the subtotal and are never cached.
#[derive(Clone)]
pub struct DeliveryClient {
    api: ApiClient,
    cache: Cache<CacheKey, CacheValue>,
}

#[derive(Serialize)]
struct ProgressBody<'a> {
    subtotal: Money,
    city: &'a str,
}

impl DeliveryClient {
    /// Create a delivery client.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotConfigured` if no base URL is configured.
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        Ok(Self::with_client(ApiClient::new(settings)?, settings))
    }

    /// Create a delivery client sharing an existing [`ApiClient`].
    #[must_use]
    pub fn with_client(api: ApiClient, settings: &ApiSettings) -> Self {
        let cache = Cache::builder()
            .max_capacity(500)
            .time_to_live(settings.cache_ttl)
            .build();
        Self { api, cache }
    }
}

impl std::fmt::Debug for DeliveryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryClient")
            .field("api", &self.api)
            .field("cached_entries", &self.cache.entry_count())
            .finish()
    }
}

impl PricingSource for DeliveryClient {
    #[instrument(skip(self))]
    async fn fetch_options(&self) -> Result<DeliveryOptions, ApiError> {
        if let Some(CacheValue::Options(options)) = self.cache.get(&CacheKey::Options).await {
            debug!("Cache hit for delivery options");
            return Ok(*options);
        }

        let options: DeliveryOptions = self.api.get_json(&["delivery", "options"]).await?;

        self.cache
            .insert(CacheKey::Options, CacheValue::Options(Box::new(options.clone())))
            .await;

        Ok(options)
    }

    #[instrument(skip(self))]
    async fn lookup_zone(&self, city: &str) -> Result<DeliveryZone, ApiError> {
        let cache_key = CacheKey::Zone(normalize_city(city));

        if let Some(CacheValue::Zone(zone)) = self.cache.get(&cache_key).await {
            debug!("Cache hit for zone");
            return Ok(*zone);
        }

        let zone: DeliveryZone = self.api.get_json(&["delivery", "zone", city.trim()]).await?;

        self.cache
            .insert(cache_key, CacheValue::Zone(Box::new(zone.clone())))
            .await;

        Ok(zone)
    }

    #[instrument(skip(self, request), fields(city = %request.city))]
    async fn quote_fee(&self, request: &FeeRequest) -> Result<FeeQuote, ApiError> {
        self.api
            .post_json(&["delivery", "calculate-fee"], request)
            .await
    }

    #[instrument(skip(self))]
    async fn quote_progress(
        &self,
        subtotal: Money,
        city: &str,
    ) -> Result<DeliveryProgress, ApiError> {
        self.api
            .post_json(
                &["delivery", "free-delivery-progress"],
                &ProgressBody { subtotal, city },
            )
            .await
    }

    fn invalidate(&self) {
        self.cache.invalidate_all();
    }
}
