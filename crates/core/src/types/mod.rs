//! Core types for Emporium.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod identity;
pub mod money;
pub mod tier;

pub use id::*;
pub use identity::{GUEST_CART_KEY, Identity};
pub use money::{CurrencyCode, Money};
pub use tier::{CustomerTier, TierParseError};
