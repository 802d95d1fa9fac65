//! Cart lines and the product data they carry.

use std::fmt;

use emporium_core::{Money, ProductId};
use serde::{Deserialize, Serialize};

use crate::models::Product;

/// Identity of a cart line: `{product_id}` or `{product_id}_{size}`.
///
/// The same product in two sizes is two lines.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CartKey(String);

impl CartKey {
    #[must_use]
    pub fn new(product_id: &ProductId, size: Option<&str>) -> Self {
        match size {
            Some(size) => Self(format!("{product_id}_{size}")),
            None => Self(product_id.as_str().to_owned()),
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CartKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Product fields copied into a cart line at add time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub is_active: bool,
    pub stock_quantity: i64,
    pub low_stock_threshold: u32,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            image: product.image.clone(),
            is_active: product.is_active,
            stock_quantity: product.stock_quantity,
            low_stock_threshold: product.low_stock_threshold,
        }
    }
}

/// One line in a cart.
///
/// `unit_price` is fixed when the line is created. The subtotal is always
/// derived from it and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub key: CartKey,
    #[serde(rename = "productSnapshot")]
    pub product: ProductSnapshot,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    /// `quantity * unit_price`.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.unit_price * self.quantity
    }

    /// Whether the snapshot stock is at or below the product's low-stock
    /// threshold.
    #[must_use]
    pub fn is_low_stock(&self) -> bool {
        self.product.stock_quantity <= i64::from(self.product.low_stock_threshold)
    }

    /// How many more units the snapshot stock allows.
    #[must_use]
    pub fn available_to_add(&self) -> u32 {
        let remaining = self.product.stock_quantity - i64::from(self.quantity);
        u32::try_from(remaining.max(0)).unwrap_or(u32::MAX)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::models::fixtures::product;

    fn line(stock: i64, quantity: u32) -> CartItem {
        let p = product("p1", stock, 250);
        CartItem {
            key: CartKey::new(&p.id, None),
            product: ProductSnapshot::from(&p),
            size: None,
            quantity,
            unit_price: p.price,
        }
    }

    #[test]
    fn test_key_composition() {
        let id = ProductId::new("p1");
        assert_eq!(CartKey::new(&id, None).as_str(), "p1");
        assert_eq!(CartKey::new(&id, Some("XL")).as_str(), "p1_XL");
    }

    #[test]
    fn test_subtotal_is_derived() {
        let mut item = line(10, 3);
        assert_eq!(item.subtotal(), Money::from_major(750));
        item.quantity = 4;
        assert_eq!(item.subtotal(), Money::from_major(1_000));
    }

    #[test]
    fn test_low_stock_and_available() {
        let item = line(5, 2);
        assert!(item.is_low_stock());
        assert_eq!(item.available_to_add(), 3);

        let item = line(20, 2);
        assert!(!item.is_low_stock());
        assert_eq!(item.available_to_add(), 18);
    }

    #[test]
    fn test_wire_format_has_no_subtotal() {
        let json = serde_json::to_value(line(10, 1)).unwrap();
        assert!(json.get("subtotal").is_none());
        assert_eq!(json["productSnapshot"]["stockQuantity"], 10);
        assert_eq!(json["unitPrice"], "250");
    }
}
