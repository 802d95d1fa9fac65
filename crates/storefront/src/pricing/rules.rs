//! Delivery pricing configuration.
//!
//! Rules arrive from `GET /delivery/options` or, when that is unavailable,
//! from [`PricingRules::fallback`]. Either way they pass through
//! [`PricingRules::new`], which rejects configurations the calculator cannot
//! price and guarantees a default "Other Areas" zone exists.

use emporium_core::{CustomerTier, Money, TimeSlotId, ZoneId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::city::{CityMatch, match_city, normalize_city};

/// Name of the zone that catches every unmatched city.
pub const DEFAULT_ZONE_NAME: &str = "Other Areas";
/// ID of the built-in default zone.
pub const DEFAULT_ZONE_ID: &str = "other";

const FALLBACK_BASE_FEE: i64 = 750;
const FALLBACK_FREE_THRESHOLD: i64 = 15_000;
const FALLBACK_SLOT_ID: &str = "standard";
const FALLBACK_EXPRESS_MINIMUM_FEE: i64 = 800;

/// Errors for pricing configurations the calculator cannot use.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RulesError {
    #[error("zone {zone}: {reason}")]
    InvalidZone { zone: ZoneId, reason: String },

    #[error("duplicate zone id: {0}")]
    DuplicateZone(ZoneId),

    #[error("time slot {slot}: {reason}")]
    InvalidTimeSlot { slot: TimeSlotId, reason: String },

    #[error("express policy: {0}")]
    InvalidExpressPolicy(String),

    #[error("tier {tier} discount factor {factor} must be in (0, 1]")]
    InvalidTierFactor { tier: CustomerTier, factor: Decimal },
}

/// A geographic grouping with its own delivery fee and free-delivery threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryZone {
    pub id: ZoneId,
    pub name: String,
    pub base_fee: Money,
    /// Subtotal at or above which the base fee is waived.
    pub free_threshold: Money,
    #[serde(default, alias = "cities")]
    pub covered_cities: Vec<String>,
}

impl DeliveryZone {
    /// The built-in catch-all zone.
    #[must_use]
    pub fn other_areas() -> Self {
        Self {
            id: ZoneId::new(DEFAULT_ZONE_ID),
            name: DEFAULT_ZONE_NAME.to_owned(),
            base_fee: Money::from_major(FALLBACK_BASE_FEE),
            free_threshold: Money::from_major(FALLBACK_FREE_THRESHOLD),
            covered_cities: Vec::new(),
        }
    }

    fn is_default_zone(&self) -> bool {
        self.id.as_str() == DEFAULT_ZONE_ID
            || normalize_city(&self.name) == normalize_city(DEFAULT_ZONE_NAME)
    }
}

/// A delivery window with a fee multiplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    pub id: TimeSlotId,
    pub name: String,
    /// Always `>= 1`.
    pub multiplier: Decimal,
    #[serde(default)]
    pub is_express_slot: bool,
}

impl TimeSlot {
    /// The built-in standard slot.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            id: TimeSlotId::new(FALLBACK_SLOT_ID),
            name: "Standard Delivery".to_owned(),
            multiplier: Decimal::ONE,
            is_express_slot: false,
        }
    }
}

/// Express delivery pricing: `max(fee * multiplier, minimum_fee)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpressPolicy {
    pub multiplier: Decimal,
    pub minimum_fee: Money,
}

impl Default for ExpressPolicy {
    fn default() -> Self {
        Self {
            multiplier: Decimal::new(15, 1),
            minimum_fee: Money::from_major(FALLBACK_EXPRESS_MINIMUM_FEE),
        }
    }
}

impl ExpressPolicy {
    /// Apply the express step to a fee.
    #[must_use]
    pub fn apply(&self, fee: Money) -> Money {
        fee.scale(self.multiplier).max(self.minimum_fee)
    }
}

/// Multiplicative delivery discount per customer tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierDiscounts {
    pub regular: Decimal,
    pub gold: Decimal,
    pub premium: Decimal,
}

impl Default for TierDiscounts {
    fn default() -> Self {
        Self {
            regular: CustomerTier::Regular.default_discount_factor(),
            gold: CustomerTier::Gold.default_discount_factor(),
            premium: CustomerTier::Premium.default_discount_factor(),
        }
    }
}

impl TierDiscounts {
    /// Discount factor for a tier.
    #[must_use]
    pub const fn factor(&self, tier: CustomerTier) -> Decimal {
        match tier {
            CustomerTier::Regular => self.regular,
            CustomerTier::Gold => self.gold,
            CustomerTier::Premium => self.premium,
        }
    }
}

/// Payload of `GET /delivery/options`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryOptions {
    #[serde(default)]
    pub zones: Vec<DeliveryZone>,
    #[serde(default)]
    pub time_slots: Vec<TimeSlot>,
    #[serde(default, alias = "expressDelivery")]
    pub express: ExpressPolicy,
    #[serde(default)]
    pub tier_discounts: TierDiscounts,
}

/// Validated delivery pricing rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingRules {
    /// Zones matched by city; the default zone is held separately.
    zones: Vec<DeliveryZone>,
    default_zone: DeliveryZone,
    time_slots: Vec<TimeSlot>,
    express: ExpressPolicy,
    tiers: TierDiscounts,
}

impl PricingRules {
    /// Validate and assemble a rule set.
    ///
    /// An "Other Areas" zone is appended when none is configured, and a
    /// standard 1.0 slot when no slots are configured.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` for negative fees, slot or express multipliers
    /// below 1, tier factors outside (0, 1], or duplicate zone ids.
    pub fn new(
        mut zones: Vec<DeliveryZone>,
        mut time_slots: Vec<TimeSlot>,
        express: ExpressPolicy,
        tiers: TierDiscounts,
    ) -> Result<Self, RulesError> {
        for (i, zone) in zones.iter().enumerate() {
            validate_zone(zone)?;
            if zones.iter().skip(i + 1).any(|other| other.id == zone.id) {
                return Err(RulesError::DuplicateZone(zone.id.clone()));
            }
        }
        for slot in &time_slots {
            if slot.multiplier < Decimal::ONE {
                return Err(RulesError::InvalidTimeSlot {
                    slot: slot.id.clone(),
                    reason: format!("multiplier {} is below 1", slot.multiplier),
                });
            }
        }
        if express.multiplier < Decimal::ONE {
            return Err(RulesError::InvalidExpressPolicy(format!(
                "multiplier {} is below 1",
                express.multiplier
            )));
        }
        if express.minimum_fee < Money::ZERO {
            return Err(RulesError::InvalidExpressPolicy(
                "minimum fee is negative".to_owned(),
            ));
        }
        for tier in CustomerTier::ALL {
            let factor = tiers.factor(tier);
            if factor <= Decimal::ZERO || factor > Decimal::ONE {
                return Err(RulesError::InvalidTierFactor { tier, factor });
            }
        }

        let default_zone = zones
            .iter()
            .position(DeliveryZone::is_default_zone)
            .map_or_else(DeliveryZone::other_areas, |i| zones.remove(i));
        if time_slots.is_empty() {
            time_slots.push(TimeSlot::standard());
        }

        Ok(Self {
            zones,
            default_zone,
            time_slots,
            express,
            tiers,
        })
    }

    /// Build rules from a remote options payload.
    ///
    /// # Errors
    ///
    /// Returns `RulesError` if the payload fails validation.
    pub fn from_options(options: DeliveryOptions) -> Result<Self, RulesError> {
        Self::new(
            options.zones,
            options.time_slots,
            options.express,
            options.tier_discounts,
        )
    }

    /// Minimal rule set used when the remote source is unavailable:
    /// one "Other Areas" zone, one 1.0 slot, express 1.5 with an 800 floor.
    #[must_use]
    pub fn fallback() -> Self {
        Self {
            zones: Vec::new(),
            default_zone: DeliveryZone::other_areas(),
            time_slots: vec![TimeSlot::standard()],
            express: ExpressPolicy::default(),
            tiers: TierDiscounts::default(),
        }
    }

    /// All zones, default zone last.
    pub fn zones(&self) -> impl Iterator<Item = &DeliveryZone> {
        self.zones.iter().chain(std::iter::once(&self.default_zone))
    }

    /// All selectable time slots.
    #[must_use]
    pub fn time_slots(&self) -> &[TimeSlot] {
        &self.time_slots
    }

    /// The express policy.
    #[must_use]
    pub const fn express(&self) -> &ExpressPolicy {
        &self.express
    }

    /// The tier discount table.
    #[must_use]
    pub const fn tiers(&self) -> &TierDiscounts {
        &self.tiers
    }

    /// The catch-all zone for unmatched cities.
    #[must_use]
    pub const fn default_zone(&self) -> &DeliveryZone {
        &self.default_zone
    }

    /// Resolve the zone serving a city.
    ///
    /// Exact matches beat whole-word containment; among containment matches
    /// the longest covered name wins. Unmatched cities get the default zone.
    #[must_use]
    pub fn resolve_zone(&self, city: &str) -> &DeliveryZone {
        let input = normalize_city(city);

        let mut best: Option<(CityMatch, usize, &DeliveryZone)> = None;
        for zone in self.zones() {
            for covered in &zone.covered_cities {
                let covered = normalize_city(covered);
                let Some(quality) = match_city(&input, &covered) else {
                    continue;
                };
                let candidate = (quality, covered.len(), zone);
                let better = best.is_none_or(|(q, len, _)| (quality, covered.len()) > (q, len));
                if better {
                    best = Some(candidate);
                }
            }
        }

        best.map_or_else(|| self.default_zone(), |(_, _, zone)| zone)
    }

    /// Look up a time slot by id.
    #[must_use]
    pub fn time_slot(&self, id: &TimeSlotId) -> Option<&TimeSlot> {
        self.time_slots.iter().find(|slot| &slot.id == id)
    }

    /// Discount factor for a tier.
    #[must_use]
    pub const fn tier_factor(&self, tier: CustomerTier) -> Decimal {
        self.tiers.factor(tier)
    }

    /// The rule set as an options listing, default zone last.
    #[must_use]
    pub fn to_options(&self) -> DeliveryOptions {
        DeliveryOptions {
            zones: self.zones().cloned().collect(),
            time_slots: self.time_slots.clone(),
            express: self.express,
            tier_discounts: self.tiers,
        }
    }
}

impl Default for PricingRules {
    fn default() -> Self {
        Self::fallback()
    }
}

fn validate_zone(zone: &DeliveryZone) -> Result<(), RulesError> {
    let invalid = |reason: &str| RulesError::InvalidZone {
        zone: zone.id.clone(),
        reason: reason.to_owned(),
    };

    if zone.id.as_str().trim().is_empty() {
        return Err(invalid("id is empty"));
    }
    if zone.base_fee < Money::ZERO {
        return Err(invalid("base fee is negative"));
    }
    if zone.free_threshold < Money::ZERO {
        return Err(invalid("free threshold is negative"));
    }
    Ok(())
}
