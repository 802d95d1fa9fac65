//! Delivery fee and free-delivery progress computation.
//!
//! Pure functions of their inputs plus [`PricingRules`]. The order of
//! adjustments is fixed: free-threshold check, express, time slot, tier,
//! then rounding. Express is never free; tier discounts apply last.

use emporium_core::{CurrencyCode, CustomerTier, Money, TimeSlotId, ZoneId};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::pricing::{DeliveryZone, PricingRules};

/// Inputs to a fee calculation. Also the body of `POST /delivery/calculate-fee`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeRequest {
    pub subtotal: Money,
    pub city: String,
    pub is_express: bool,
    pub time_slot: Option<TimeSlotId>,
    #[serde(rename = "customerTier")]
    pub tier: CustomerTier,
}

impl FeeRequest {
    /// A standard, non-express request for a regular customer.
    #[must_use]
    pub fn standard(subtotal: Money, city: impl Into<String>) -> Self {
        Self {
            subtotal,
            city: city.into(),
            is_express: false,
            time_slot: None,
            tier: CustomerTier::Regular,
        }
    }

    #[must_use]
    pub const fn express(mut self, is_express: bool) -> Self {
        self.is_express = is_express;
        self
    }

    #[must_use]
    pub fn time_slot(mut self, slot: TimeSlotId) -> Self {
        self.time_slot = Some(slot);
        self
    }

    #[must_use]
    pub const fn tier(mut self, tier: CustomerTier) -> Self {
        self.tier = tier;
        self
    }
}

/// Per-step fee adjustments. Each field is the change introduced by that step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Fee after the free-threshold check.
    pub base: Money,
    #[serde(rename = "expressAdj")]
    pub express_adjustment: Money,
    #[serde(rename = "slotAdj")]
    pub slot_adjustment: Money,
    /// Zero or negative.
    #[serde(rename = "tierAdj")]
    pub tier_adjustment: Money,
}

/// Where a quote was computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteSource {
    /// Server-authoritative result.
    Remote,
    /// Computed locally from cached or fallback rules.
    #[default]
    Local,
}

/// Result of a fee calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeQuote {
    /// Final fee, rounded to whole currency units.
    pub fee: Money,
    #[serde(default)]
    pub zone_id: Option<ZoneId>,
    #[serde(default)]
    pub zone_name: String,
    /// Fee was waived by the zone threshold and express was not chosen.
    pub is_free: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub breakdown: FeeBreakdown,
    #[serde(default)]
    pub savings: Money,
    #[serde(skip)]
    pub source: QuoteSource,
}

/// Progress toward the zone's free-delivery threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryProgress {
    pub threshold: Money,
    pub remaining: Money,
    /// Percentage, 0 to 100.
    pub progress: u8,
    pub is_eligible: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub zone_name: Option<String>,
    #[serde(skip)]
    pub source: QuoteSource,
}

/// Computes fees and progress from a rule set.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryCalculator<'a> {
    rules: &'a PricingRules,
    currency: CurrencyCode,
}

impl<'a> DeliveryCalculator<'a> {
    #[must_use]
    pub const fn new(rules: &'a PricingRules, currency: CurrencyCode) -> Self {
        Self { rules, currency }
    }

    /// Calculate the delivery fee, resolving the zone from the request city.
    #[must_use]
    pub fn calculate_fee(&self, request: &FeeRequest) -> FeeQuote {
        let zone = self.rules.resolve_zone(&request.city);
        self.calculate_fee_in_zone(zone, request)
    }

    /// Calculate the delivery fee for an already-resolved zone.
    #[must_use]
    pub fn calculate_fee_in_zone(&self, zone: &DeliveryZone, request: &FeeRequest) -> FeeQuote {
        let qualifies_free = request.subtotal >= zone.free_threshold;
        let base = if qualifies_free {
            Money::ZERO
        } else {
            zone.base_fee
        };

        let slot = request
            .time_slot
            .as_ref()
            .and_then(|id| self.rules.time_slot(id));
        // An express slot is an express delivery whatever the flag says
        let is_express = request.is_express || slot.is_some_and(|slot| slot.is_express_slot);

        let after_express = if is_express {
            self.rules.express().apply(base)
        } else {
            base
        };
        let is_free = qualifies_free && !is_express;

        let slot_multiplier = slot.map_or(Decimal::ONE, |slot| slot.multiplier);
        let after_slot = after_express.scale(slot_multiplier);

        let tier_factor = self.rules.tier_factor(request.tier);
        let after_tier = after_slot.scale(tier_factor);

        let fee = after_tier.round_whole();

        let savings = if is_free || tier_factor < Decimal::ONE {
            zone.base_fee.saturating_sub(fee)
        } else {
            Money::ZERO
        };

        FeeQuote {
            fee,
            zone_id: Some(zone.id.clone()),
            zone_name: zone.name.clone(),
            is_free,
            reason: self.reason(zone, is_express, is_free),
            breakdown: FeeBreakdown {
                base,
                express_adjustment: after_express - base,
                slot_adjustment: after_slot - after_express,
                tier_adjustment: after_tier - after_slot,
            },
            savings,
            source: QuoteSource::Local,
        }
    }

    /// Progress toward free delivery, resolving the zone from the city.
    #[must_use]
    pub fn free_delivery_progress(&self, subtotal: Money, city: &str) -> DeliveryProgress {
        let zone = self.rules.resolve_zone(city);
        self.progress_in_zone(zone, subtotal)
    }

    /// Progress toward free delivery for an already-resolved zone.
    #[must_use]
    pub fn progress_in_zone(&self, zone: &DeliveryZone, subtotal: Money) -> DeliveryProgress {
        let threshold = zone.free_threshold;
        let remaining = threshold.saturating_sub(subtotal);
        let is_eligible = remaining.is_zero();

        // Overflow only happens far past the threshold
        let progress = subtotal
            .amount()
            .checked_div(threshold.amount())
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .filter(|_| threshold.is_positive())
            .map_or(100, |percent| {
                percent
                    .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
                    .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
                    .to_u8()
                    .unwrap_or(100)
            });

        let message = if is_eligible {
            format!("You've unlocked free delivery to {}!", zone.name)
        } else {
            format!(
                "Add {} more to get free delivery to {}",
                remaining.display(self.currency),
                zone.name
            )
        };

        DeliveryProgress {
            threshold,
            remaining,
            progress,
            is_eligible,
            message,
            zone_name: Some(zone.name.clone()),
            source: QuoteSource::Local,
        }
    }

    fn reason(&self, zone: &DeliveryZone, is_express: bool, is_free: bool) -> String {
        if is_express {
            format!("Express delivery to {}", zone.name)
        } else if is_free {
            format!(
                "Free delivery on orders over {}",
                zone.free_threshold.display(self.currency)
            )
        } else {
            format!("Standard delivery to {}", zone.name)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::pricing::{ExpressPolicy, TierDiscounts, TimeSlot};

    fn rules() -> PricingRules {
        let colombo = DeliveryZone {
            id: ZoneId::new("colombo"),
            name: "Colombo".to_owned(),
            base_fee: Money::from_major(500),
            free_threshold: Money::from_major(8_000),
            covered_cities: vec!["Colombo".to_owned()],
        };
        let slots = vec![
            TimeSlot::standard(),
            TimeSlot {
                id: TimeSlotId::new("evening"),
                name: "Evening".to_owned(),
                multiplier: Decimal::new(12, 1),
                is_express_slot: false,
            },
        ];
        PricingRules::new(
            vec![colombo],
            slots,
            ExpressPolicy::default(),
            TierDiscounts::default(),
        )
        .unwrap()
    }

    fn quote(request: &FeeRequest) -> FeeQuote {
        let rules = rules();
        DeliveryCalculator::new(&rules, CurrencyCode::LKR).calculate_fee(request)
    }

    #[test]
    fn test_free_at_threshold() {
        let q = quote(&FeeRequest::standard(Money::from_major(8_000), "Colombo"));
        assert_eq!(q.fee, Money::ZERO);
        assert!(q.is_free);
        assert_eq!(q.zone_id, Some(ZoneId::new("colombo")));
        assert_eq!(q.savings, Money::from_major(500));
        assert_eq!(q.reason, "Free delivery on orders over Rs. 8,000");
    }

    #[test]
    fn test_express_uses_minimum_fee() {
        let q = quote(&FeeRequest::standard(Money::from_major(5_000), "Colombo").express(true));
        assert_eq!(q.fee, Money::from_major(800));
        assert!(!q.is_free);
        assert_eq!(q.breakdown.base, Money::from_major(500));
        assert_eq!(q.breakdown.express_adjustment, Money::from_major(300));
    }

    #[test]
    fn test_express_is_never_free() {
        let q = quote(&FeeRequest::standard(Money::from_major(20_000), "Colombo").express(true));
        assert_eq!(q.fee, Money::from_major(800));
        assert!(!q.is_free);
        assert_eq!(q.breakdown.base, Money::ZERO);
    }

    #[test]
    fn test_below_threshold_pays_base_fee() {
        let q = quote(&FeeRequest::standard(Money::from_major(7_999), "Colombo"));
        assert_eq!(q.fee, Money::from_major(500));
        assert!(!q.is_free);
        assert_eq!(q.savings, Money::ZERO);
        assert_eq!(q.reason, "Standard delivery to Colombo");
    }

    #[test]
    fn test_slot_multiplier_applies_after_express() {
        // max(500 * 1.5, 800) = 800, then * 1.2 = 960
        let q = quote(
            &FeeRequest::standard(Money::from_major(1_000), "Colombo")
                .express(true)
                .time_slot(TimeSlotId::new("evening")),
        );
        assert_eq!(q.fee, Money::from_major(960));
        assert_eq!(q.breakdown.slot_adjustment, Money::from_major(160));
    }

    #[test]
    fn test_tier_discount_applies_last() {
        // 500 * 1.2 = 600, premium * 0.5 = 300
        let q = quote(
            &FeeRequest::standard(Money::from_major(1_000), "Colombo")
                .time_slot(TimeSlotId::new("evening"))
                .tier(CustomerTier::Premium),
        );
        assert_eq!(q.fee, Money::from_major(300));
        assert_eq!(q.breakdown.tier_adjustment, Money::from_major(-300));
        assert_eq!(q.savings, Money::from_major(200));
    }

    #[test]
    fn test_fee_is_rounded_to_whole_units() {
        // Other Areas: max(750 * 1.5, 800) = 1125, gold * 0.8 = 900
        let q = quote(
            &FeeRequest::standard(Money::from_major(100), "Galle")
                .express(true)
                .tier(CustomerTier::Gold),
        );
        assert_eq!(q.zone_name, "Other Areas");
        assert_eq!(q.fee, Money::from_major(900));

        let rules = PricingRules::new(
            vec![DeliveryZone {
                id: ZoneId::new("odd"),
                name: "Odd".to_owned(),
                base_fee: Money::from_major(333),
                free_threshold: Money::from_major(5_000),
                covered_cities: vec!["Odd".to_owned()],
            }],
            vec![],
            ExpressPolicy::default(),
            TierDiscounts::default(),
        )
        .unwrap();
        let q = DeliveryCalculator::new(&rules, CurrencyCode::LKR).calculate_fee(
            &FeeRequest::standard(Money::from_major(10), "Odd").tier(CustomerTier::Gold),
        );
        // 333 * 0.8 = 266.4
        assert_eq!(q.fee, Money::from_major(266));
    }

    #[test]
    fn test_express_floor_respects_tier() {
        for tier in CustomerTier::ALL {
            for subtotal in [0, 500, 8_000, 50_000] {
                let q = quote(
                    &FeeRequest::standard(Money::from_major(subtotal), "Colombo")
                        .express(true)
                        .tier(tier),
                );
                let floor = Money::from_major(800)
                    .scale(tier.default_discount_factor())
                    .round_whole();
                assert!(q.fee >= floor, "{tier} at {subtotal}: {:?}", q.fee);
                assert!(!q.is_free);
            }
        }
    }

    #[test]
    fn test_fee_non_increasing_across_threshold() {
        for tier in CustomerTier::ALL {
            for express in [false, true] {
                let below = quote(
                    &FeeRequest::standard(Money::from_major(7_999), "Colombo")
                        .express(express)
                        .tier(tier),
                );
                let at = quote(
                    &FeeRequest::standard(Money::from_major(8_000), "Colombo")
                        .express(express)
                        .tier(tier),
                );
                assert!(at.fee <= below.fee);
                if !express {
                    assert_eq!(at.fee, Money::ZERO);
                }
            }
        }
    }

    #[test]
    fn test_unknown_time_slot_uses_neutral_multiplier() {
        let q = quote(
            &FeeRequest::standard(Money::from_major(100), "Colombo")
                .time_slot(TimeSlotId::new("midnight")),
        );
        assert_eq!(q.fee, Money::from_major(500));
    }

    #[test]
    fn test_progress_below_threshold() {
        let rules = rules();
        let calc = DeliveryCalculator::new(&rules, CurrencyCode::LKR);
        let p = calc.free_delivery_progress(Money::from_major(5_000), "Colombo");
        assert_eq!(p.threshold, Money::from_major(8_000));
        assert_eq!(p.remaining, Money::from_major(3_000));
        // 62.5 rounds half away from zero
        assert_eq!(p.progress, 63);
        assert!(!p.is_eligible);
        assert_eq!(p.message, "Add Rs. 3,000 more to get free delivery to Colombo");
    }

    #[test]
    fn test_progress_caps_at_hundred() {
        let rules = rules();
        let calc = DeliveryCalculator::new(&rules, CurrencyCode::LKR);
        let p = calc.free_delivery_progress(Money::from_major(12_000), "Colombo");
        assert_eq!(p.progress, 100);
        assert_eq!(p.remaining, Money::ZERO);
        assert!(p.is_eligible);
    }

    #[test]
    fn test_progress_zero_threshold_is_complete() {
        let rules = rules();
        let calc = DeliveryCalculator::new(&rules, CurrencyCode::LKR);
        let zone = DeliveryZone {
            free_threshold: Money::ZERO,
            ..DeliveryZone::other_areas()
        };
        let p = calc.progress_in_zone(&zone, Money::ZERO);
        assert_eq!(p.progress, 100);
        assert!(p.is_eligible);
    }

    #[test]
    fn test_progress_survives_extreme_ratio() {
        let rules = rules();
        let calc = DeliveryCalculator::new(&rules, CurrencyCode::LKR);
        let zone = DeliveryZone {
            free_threshold: Money::new(Decimal::new(1, 7)),
            ..DeliveryZone::other_areas()
        };
        let p = calc.progress_in_zone(&zone, Money::new(Decimal::MAX));
        assert_eq!(p.progress, 100);
        assert!(p.is_eligible);
    }

    #[test]
    fn test_express_slot_prices_as_express() {
        let express_slot = TimeSlot {
            id: TimeSlotId::new("two-hour"),
            name: "Within 2 hours".to_owned(),
            multiplier: Decimal::ONE,
            is_express_slot: true,
        };
        let rules = PricingRules::new(
            vec![DeliveryZone::other_areas()],
            vec![TimeSlot::standard(), express_slot],
            ExpressPolicy::default(),
            TierDiscounts::default(),
        )
        .unwrap();
        let calc = DeliveryCalculator::new(&rules, CurrencyCode::LKR);

        let q = calc.calculate_fee(
            &FeeRequest::standard(Money::from_major(20_000), "Anywhere")
                .time_slot(TimeSlotId::new("two-hour")),
        );

        assert_eq!(q.fee, Money::from_major(800));
        assert!(!q.is_free);
        assert_eq!(q.reason, "Express delivery to Other Areas");
    }

    #[test]
    fn test_fee_request_wire_format() {
        let request = FeeRequest::standard(Money::from_major(5_000), "Colombo")
            .express(true)
            .tier(CustomerTier::Gold);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["isExpress"], true);
        assert_eq!(json["customerTier"], "gold");
        assert_eq!(json["city"], "Colombo");
        assert!(json["timeSlot"].is_null());
    }

    #[test]
    fn test_fee_quote_parses_remote_payload() {
        let json = r#"{
            "fee": 800, "zoneId": "colombo", "zoneName": "Colombo", "isFree": false,
            "reason": "Express delivery",
            "breakdown": {"base": 500, "expressAdj": 300, "slotAdj": 0, "tierAdj": 0},
            "savings": 0
        }"#;
        let quote: FeeQuote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.fee, Money::from_major(800));
        assert_eq!(quote.breakdown.express_adjustment, Money::from_major(300));
        assert_eq!(quote.source, QuoteSource::Local);
    }
}
