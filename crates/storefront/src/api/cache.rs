//! Cache types for delivery API responses.

use crate::pricing::{DeliveryOptions, DeliveryZone};

/// Cache key for delivery lookups.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Options,
    /// Normalized city name.
    Zone(String),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Options(Box<DeliveryOptions>),
    Zone(Box<DeliveryZone>),
}
