//! Checkout input and the order payload it produces.

use chrono::{DateTime, Utc};
use emporium_core::{CustomerTier, Identity, Money, ProductId, TimeSlotId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::{CartItem, CartKey};
use crate::delivery::{FeeQuote, FeeRequest};

/// Where the order is delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub recipient: String,
    pub phone: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    /// Used to resolve the delivery zone.
    pub city: String,
    #[serde(default)]
    pub postal_code: Option<String>,
}

/// Choices submitted with the checkout form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    pub address: ShippingAddress,
    #[serde(default)]
    pub time_slot: Option<TimeSlotId>,
    #[serde(default)]
    pub is_express: bool,
    #[serde(default)]
    pub tier: CustomerTier,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CheckoutRequest {
    /// A standard delivery to `address` for a regular customer.
    #[must_use]
    pub const fn new(address: ShippingAddress) -> Self {
        Self {
            address,
            time_slot: None,
            is_express: false,
            tier: CustomerTier::Regular,
            notes: None,
        }
    }

    /// The delivery fee request for a cart subtotal.
    #[must_use]
    pub fn fee_request(&self, subtotal: Money) -> FeeRequest {
        FeeRequest {
            subtotal,
            city: self.address.city.clone(),
            is_express: self.is_express,
            time_slot: self.time_slot.clone(),
            tier: self.tier,
        }
    }
}

/// One priced line of an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub key: CartKey,
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub size: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub subtotal: Money,
}

impl From<&CartItem> for OrderLine {
    fn from(item: &CartItem) -> Self {
        Self {
            key: item.key.clone(),
            product_id: item.product.id.clone(),
            name: item.product.name.clone(),
            size: item.size.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal(),
        }
    }
}

/// A validated order ready for submission to payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub id: Uuid,
    pub identity: Identity,
    pub lines: Vec<OrderLine>,
    pub subtotal: Money,
    pub delivery: FeeQuote,
    /// `subtotal + delivery.fee`
    pub total: Money,
    pub address: ShippingAddress,
    pub time_slot: Option<TimeSlotId>,
    pub is_express: bool,
    pub tier: CustomerTier,
    pub notes: Option<String>,
    pub prepared_at: DateTime<Utc>,
}
