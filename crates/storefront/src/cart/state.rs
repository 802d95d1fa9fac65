//! In-memory cart state and its stock-checked mutations.
//!
//! Every mutation is synchronous and all-or-nothing: a rejected call leaves
//! the cart exactly as it was.

use emporium_core::{Money, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::item::{CartItem, CartKey, ProductSnapshot};
use crate::models::Product;

/// Reasons a cart mutation is rejected.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("{name} is no longer available")]
    ProductUnavailable { product_id: ProductId, name: String },

    #[error("{name} is out of stock")]
    OutOfStock { product_id: ProductId, name: String },

    #[error("only {available_to_add} more of {name} can be added")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        available_to_add: u32,
    },

    #[error("{name} has no size {size}")]
    UnknownSize {
        product_id: ProductId,
        name: String,
        size: String,
    },

    #[error("quantity must be at least 1")]
    InvalidQuantity,
}

/// Result of [`Cart::update_quantity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityUpdate {
    /// The line now has `quantity`; `clamped` if the request exceeded stock.
    Updated { quantity: u32, clamped: bool },
    /// The requested quantity was zero or negative and the line was removed.
    Removed,
    /// No line has the key.
    Missing,
}

/// Ordered cart lines for one identity. Insertion order is display order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, key: &CartKey) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.key == key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.items.len()
    }

    /// Sum of line subtotals.
    #[must_use]
    pub fn total(&self) -> Money {
        self.items.iter().map(CartItem::subtotal).sum()
    }

    /// Sum of line quantities.
    #[must_use]
    pub fn items_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Units of `product_id` across every line, optionally leaving one out.
    fn product_quantity(&self, product_id: &ProductId, except: Option<&CartKey>) -> u64 {
        self.items
            .iter()
            .filter(|item| &item.product.id == product_id && Some(&item.key) != except)
            .map(|item| u64::from(item.quantity))
            .sum()
    }

    /// Add `quantity` units of a product, merging into an existing line with
    /// the same key.
    ///
    /// Sizes of one product share its stock: the ceiling covers every line
    /// of the product, not just the one being added to. A merged line keeps
    /// its original unit price; its snapshot is refreshed from `product`.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the product is inactive, out of stock, lacks
    /// the requested size, or cannot cover the combined quantity.
    pub fn add(
        &mut self,
        product: &Product,
        quantity: u32,
        size: Option<&str>,
    ) -> Result<CartItem, CartError> {
        if quantity == 0 {
            return Err(CartError::InvalidQuantity);
        }
        if !product.is_purchasable() {
            return Err(if product.is_active {
                CartError::OutOfStock {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                }
            } else {
                CartError::ProductUnavailable {
                    product_id: product.id.clone(),
                    name: product.name.clone(),
                }
            });
        }
        let unit_price = product
            .unit_price(size)
            .ok_or_else(|| CartError::UnknownSize {
                product_id: product.id.clone(),
                name: product.name.clone(),
                size: size.unwrap_or_default().to_owned(),
            })?;

        let key = CartKey::new(&product.id, size);
        let in_cart = i128::from(self.product_quantity(&product.id, None));
        let line_quantity = self.get(&key).map_or(0, |item| item.quantity);
        let insufficient = |available: i128| CartError::InsufficientStock {
            product_id: product.id.clone(),
            name: product.name.clone(),
            available_to_add: u32::try_from(available.max(0)).unwrap_or(u32::MAX),
        };

        let stock = i128::from(product.stock_quantity);
        if in_cart + i128::from(quantity) > stock {
            return Err(insufficient(stock - in_cart));
        }
        let Some(merged) = line_quantity.checked_add(quantity) else {
            return Err(insufficient(i128::from(u32::MAX - line_quantity)));
        };

        match self.items.iter_mut().find(|item| item.key == key) {
            Some(item) => {
                item.quantity = merged;
                item.product = ProductSnapshot::from(product);
                Ok(item.clone())
            }
            None => {
                let item = CartItem {
                    key,
                    product: ProductSnapshot::from(product),
                    size: size.map(str::to_owned),
                    quantity,
                    unit_price,
                };
                self.items.push(item.clone());
                Ok(item)
            }
        }
    }

    /// Set a line's quantity. Zero or less removes the line; anything above
    /// the snapshot stock left over by the product's other lines is clamped
    /// to it. A missing key is a no-op.
    pub fn update_quantity(&mut self, key: &CartKey, quantity: i64) -> QuantityUpdate {
        let Some(position) = self.items.iter().position(|item| &item.key == key) else {
            return QuantityUpdate::Missing;
        };
        let ceiling = self.items.get(position).map_or(0, |item| {
            let others = i128::from(self.product_quantity(&item.product.id, Some(key)));
            i128::from(item.product.stock_quantity) - others
        });
        if quantity <= 0 || ceiling <= 0 {
            self.items.remove(position);
            return QuantityUpdate::Removed;
        }

        let clamped = i128::from(quantity) > ceiling;
        let quantity = u32::try_from(i128::from(quantity).min(ceiling)).unwrap_or(u32::MAX);
        if let Some(item) = self.items.get_mut(position) {
            item.quantity = quantity;
        }
        QuantityUpdate::Updated { quantity, clamped }
    }

    /// Remove a line. Removing a missing key returns `None` and changes nothing.
    pub fn remove(&mut self, key: &CartKey) -> Option<CartItem> {
        let position = self.items.iter().position(|item| &item.key == key)?;
        Some(self.items.remove(position))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Replace every line, returning the previous ones.
    pub fn replace(&mut self, items: Vec<CartItem>) -> Vec<CartItem> {
        std::mem::replace(&mut self.items, items)
    }
}
