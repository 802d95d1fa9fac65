//! Catalog product records.
//!
//! A [`Product`] is what `GET /products/{id}` returns: the authoritative
//! stock and active status. The cart never holds one; it copies the fields
//! it needs into a [`ProductSnapshot`](crate::cart::ProductSnapshot).

use emporium_core::{Money, ProductId};
use serde::{Deserialize, Serialize};

const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;

/// A product as served by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// May be zero or negative when oversold.
    #[serde(alias = "stock")]
    pub stock_quantity: i64,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: u32,
    pub price: Money,
    #[serde(default)]
    pub discount_price: Option<Money>,
    #[serde(default)]
    pub sizes: Vec<SizeOption>,
}

/// A selectable size, optionally with its own price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeOption {
    pub name: String,
    #[serde(default)]
    pub price: Option<Money>,
}

const fn default_active() -> bool {
    true
}

const fn default_low_stock_threshold() -> u32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

impl Product {
    /// Look up a size option by name.
    #[must_use]
    pub fn size(&self, name: &str) -> Option<&SizeOption> {
        self.sizes.iter().find(|s| s.name == name)
    }

    /// Whether the product can be added to a cart at all.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.is_active && self.stock_quantity > 0
    }

    /// Unit price for a purchase: the size's own price when it has one,
    /// otherwise a positive discount price, otherwise the base price.
    ///
    /// Returns `None` if `size` names a size the product does not offer.
    #[must_use]
    pub fn unit_price(&self, size: Option<&str>) -> Option<Money> {
        let size_price = match size {
            Some(name) => self.size(name)?.price,
            None => None,
        };

        Some(
            size_price
                .or_else(|| self.discount_price.filter(|p| p.is_positive()))
                .unwrap_or(self.price),
        )
    }
}
