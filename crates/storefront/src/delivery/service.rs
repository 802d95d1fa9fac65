//! Delivery pricing with remote-first, local-fallback semantics.

use std::sync::Arc;

use emporium_core::{CurrencyCode, Money};
use tracing::{debug, instrument, warn};

use super::calculator::{DeliveryCalculator, DeliveryProgress, FeeQuote, FeeRequest, QuoteSource};
use super::sequence::LatestWins;
use super::source::PricingSource;
use crate::pricing::{DeliveryOptions, DeliveryZone, PricingRules};

/// Prices delivery for the storefront.
///
/// Every operation first asks the [`PricingSource`]; when that fails the
/// same computation runs locally against the current [`PricingRules`].
/// Callers therefore never see an error, only a [`QuoteSource`] telling
/// them which side produced the answer.
///
/// Rule refreshes and fee quotes are sequenced latest-wins, so a slow
/// response that completes after a newer one is discarded.
pub struct DeliveryService<S> {
    source: S,
    rules: LatestWins<Arc<PricingRules>>,
    quotes: LatestWins<FeeQuote>,
    currency: CurrencyCode,
}

impl<S: PricingSource> DeliveryService<S> {
    /// A service starting from the built-in fallback rules.
    #[must_use]
    pub fn new(source: S, currency: CurrencyCode) -> Self {
        Self::with_rules(source, PricingRules::fallback(), currency)
    }

    /// A service starting from the given rules.
    #[must_use]
    pub fn with_rules(source: S, rules: PricingRules, currency: CurrencyCode) -> Self {
        Self {
            source,
            rules: LatestWins::with_value(Arc::new(rules)),
            quotes: LatestWins::new(),
            currency,
        }
    }

    /// The underlying pricing source.
    pub const fn source(&self) -> &S {
        &self.source
    }

    /// The rules currently used for local computation.
    pub fn rules(&self) -> Arc<PricingRules> {
        self.rules
            .current()
            .unwrap_or_else(|| Arc::new(PricingRules::fallback()))
    }

    /// Zones, time slots and policies available for selection.
    pub fn options(&self) -> DeliveryOptions {
        self.rules().to_options()
    }

    /// Fetch fresh remote options, bypassing any cache in the source, and
    /// install them as the current rules.
    ///
    /// Returns `true` if the remote rules were installed. Fetch failures,
    /// invalid rules, and responses overtaken by a newer refresh leave the
    /// current rules in place.
    #[instrument(skip(self))]
    pub async fn refresh_rules(&self) -> bool {
        let ticket = self.rules.issue();
        self.source.invalidate();

        let options = match self.source.fetch_options().await {
            Ok(options) => options,
            Err(e) => {
                warn!(error = %e, "Failed to fetch delivery options, keeping current rules");
                return false;
            }
        };

        let rules = match PricingRules::from_options(options) {
            Ok(rules) => rules,
            Err(e) => {
                warn!(error = %e, "Remote delivery options are invalid, keeping current rules");
                return false;
            }
        };

        let installed = self.rules.offer(ticket, Arc::new(rules));
        if !installed {
            debug!("Discarded delivery options overtaken by a newer refresh");
        }
        installed
    }

    /// Calculate the delivery fee for a request.
    #[instrument(skip(self, request), fields(city = %request.city, express = request.is_express))]
    pub async fn calculate_fee(&self, request: &FeeRequest) -> FeeQuote {
        let ticket = self.quotes.issue();

        let quote = match self.source.quote_fee(request).await {
            Ok(mut quote) => {
                quote.source = QuoteSource::Remote;
                quote
            }
            Err(e) => {
                warn!(error = %e, "Remote fee calculation failed, using local rules");
                let rules = self.rules();
                let calculator = DeliveryCalculator::new(&rules, self.currency);
                match self.remote_zone(&request.city).await {
                    Some(zone) => calculator.calculate_fee_in_zone(&zone, request),
                    None => calculator.calculate_fee(request),
                }
            }
        };

        if !self.quotes.offer(ticket, quote.clone()) {
            debug!("Fee quote overtaken by a newer request");
        }
        quote
    }

    /// Progress toward free delivery for a subtotal and city.
    #[instrument(skip(self))]
    pub async fn free_delivery_progress(&self, subtotal: Money, city: &str) -> DeliveryProgress {
        match self.source.quote_progress(subtotal, city).await {
            Ok(mut progress) => {
                progress.source = QuoteSource::Remote;
                progress
            }
            Err(e) => {
                warn!(error = %e, "Remote progress calculation failed, using local rules");
                let rules = self.rules();
                let calculator = DeliveryCalculator::new(&rules, self.currency);
                match self.remote_zone(city).await {
                    Some(zone) => calculator.progress_in_zone(&zone, subtotal),
                    None => calculator.free_delivery_progress(subtotal, city),
                }
            }
        }
    }

    /// The zone serving a city: remote lookup, then local resolution.
    pub async fn resolve_zone(&self, city: &str) -> DeliveryZone {
        match self.remote_zone(city).await {
            Some(zone) => zone,
            None => self.rules().resolve_zone(city).clone(),
        }
    }

    /// The most recent accepted fee quote.
    pub fn latest_quote(&self) -> Option<FeeQuote> {
        self.quotes.current()
    }

    async fn remote_zone(&self, city: &str) -> Option<DeliveryZone> {
        match self.source.lookup_zone(city).await {
            Ok(zone) => Some(zone),
            Err(e) => {
                debug!(error = %e, "Remote zone lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::delivery::OfflinePricing;
    use emporium_core::{CustomerTier, ZoneId};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Serves a fixed options payload and zone, but fails fee calculations.
    struct ZoneOnly {
        options: DeliveryOptions,
        invalidations: AtomicUsize,
    }

    impl PricingSource for ZoneOnly {
        async fn fetch_options(&self) -> Result<DeliveryOptions, ApiError> {
            Ok(self.options.clone())
        }

        async fn lookup_zone(&self, _city: &str) -> Result<DeliveryZone, ApiError> {
            Ok(self.options.zones[0].clone())
        }

        async fn quote_fee(&self, _request: &FeeRequest) -> Result<FeeQuote, ApiError> {
            Err(ApiError::Api {
                status: 503,
                message: "unavailable".to_owned(),
            })
        }

        async fn quote_progress(
            &self,
            _subtotal: Money,
            _city: &str,
        ) -> Result<DeliveryProgress, ApiError> {
            Err(ApiError::NotConfigured)
        }

        fn invalidate(&self) {
            self.invalidations.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn kandy() -> DeliveryZone {
        DeliveryZone {
            id: ZoneId::new("kandy"),
            name: "Kandy".to_owned(),
            base_fee: Money::from_major(600),
            free_threshold: Money::from_major(12_000),
            covered_cities: vec!["Kandy".to_owned()],
        }
    }

    fn zone_only() -> ZoneOnly {
        ZoneOnly {
            options: DeliveryOptions {
                zones: vec![kandy()],
                time_slots: vec![],
                express: crate::pricing::ExpressPolicy::default(),
                tier_discounts: crate::pricing::TierDiscounts::default(),
            },
            invalidations: AtomicUsize::new(0),
        }
    }

    #[tokio::test]
    async fn test_offline_uses_fallback_rules() {
        let service = DeliveryService::new(OfflinePricing, CurrencyCode::LKR);
        let quote = service
            .calculate_fee(&FeeRequest::standard(Money::from_major(1_000), "Jaffna"))
            .await;

        assert_eq!(quote.fee, Money::from_major(750));
        assert_eq!(quote.zone_name, "Other Areas");
        assert_eq!(quote.source, QuoteSource::Local);
        assert_eq!(service.latest_quote(), Some(quote));
    }

    #[tokio::test]
    async fn test_offline_refresh_keeps_fallback() {
        let service = DeliveryService::new(OfflinePricing, CurrencyCode::LKR);
        assert!(!service.refresh_rules().await);
        assert_eq!(*service.rules(), PricingRules::fallback());
    }

    #[tokio::test]
    async fn test_refresh_installs_remote_rules() {
        let service = DeliveryService::new(zone_only(), CurrencyCode::LKR);
        assert!(service.refresh_rules().await);
        assert_eq!(service.source().invalidations.load(Ordering::Relaxed), 1);

        let options = service.options();
        let names: Vec<_> = options.zones.iter().map(|z| z.name.as_str()).collect();
        assert_eq!(names, ["Kandy", "Other Areas"]);
        assert_eq!(options.time_slots.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_remote_rules_are_discarded() {
        let mut source = zone_only();
        source.options.tier_discounts.gold = Decimal::new(15, 1);
        let service = DeliveryService::new(source, CurrencyCode::LKR);

        assert!(!service.refresh_rules().await);
        assert_eq!(*service.rules(), PricingRules::fallback());
    }

    #[tokio::test]
    async fn test_local_fee_uses_remote_zone_when_available() {
        let service = DeliveryService::new(zone_only(), CurrencyCode::LKR);
        let quote = service
            .calculate_fee(
                &FeeRequest::standard(Money::from_major(2_000), "Kandy")
                    .tier(CustomerTier::Premium),
            )
            .await;

        // 600 * 0.5
        assert_eq!(quote.fee, Money::from_major(300));
        assert_eq!(quote.zone_id, Some(ZoneId::new("kandy")));
        assert_eq!(quote.source, QuoteSource::Local);
    }

    #[tokio::test]
    async fn test_progress_falls_back_locally() {
        let service = DeliveryService::new(zone_only(), CurrencyCode::LKR);
        let progress = service
            .free_delivery_progress(Money::from_major(3_000), "Kandy")
            .await;

        assert_eq!(progress.remaining, Money::from_major(9_000));
        assert_eq!(progress.progress, 25);
        assert_eq!(progress.zone_name.as_deref(), Some("Kandy"));
    }
}
