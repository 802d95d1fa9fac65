//! Unified error type for callers that drive several components.
//!
//! Each component returns its own error enum; [`Error`] wraps them so an
//! embedding application can use one `Result` type with `?` throughout.

use thiserror::Error;

use crate::api::ApiError;
use crate::cart::{AddProductError, CartError, PersistenceError};
use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::pricing::RulesError;

/// Application-level error type for the storefront engine.
#[derive(Debug, Error)]
pub enum Error {
    /// A cart mutation was rejected.
    #[error("Cart error: {0}")]
    Cart(#[from] CartError),

    /// Order preparation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Backend API call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Cart snapshot storage failed.
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    /// Pricing configuration was rejected.
    #[error("Pricing rules error: {0}")]
    Rules(#[from] RulesError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl From<AddProductError> for Error {
    fn from(err: AddProductError) -> Self {
        match err {
            AddProductError::Cart(e) => Self::Cart(e),
            AddProductError::Catalog(e) => Self::Api(e),
        }
    }
}

impl Error {
    /// Whether the customer can fix this by changing the cart.
    ///
    /// Stock and availability problems are; infrastructure failures are not.
    #[must_use]
    pub const fn is_customer_actionable(&self) -> bool {
        matches!(
            self,
            Self::Cart(_)
                | Self::Checkout(CheckoutError::EmptyCart | CheckoutError::StaleStock { .. })
        )
    }
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
