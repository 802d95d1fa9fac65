//! Delivery pricing rules.
//!
//! A leaf module: zones, time slots, the express policy and the tier
//! discount table, plus the city-to-zone matching policy.

pub mod city;
mod rules;

pub use city::normalize_city;
pub use rules::{
    DEFAULT_ZONE_ID, DEFAULT_ZONE_NAME, DeliveryOptions, DeliveryZone, ExpressPolicy,
    PricingRules, RulesError, TierDiscounts, TimeSlot,
};
