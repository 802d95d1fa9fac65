//! Delivery fee calculation and the service that serves it.
//!
//! [`DeliveryCalculator`] is the pure pricing core. [`DeliveryService`]
//! wraps it with a remote [`PricingSource`], falling back to local rules
//! whenever the source is unreachable.

mod calculator;
mod sequence;
mod service;
mod source;

pub use calculator::{
    DeliveryCalculator, DeliveryProgress, FeeBreakdown, FeeQuote, FeeRequest, QuoteSource,
};
pub use sequence::{LatestWins, Ticket};
pub use service::DeliveryService;
pub use source::{OfflinePricing, PricingSource};
