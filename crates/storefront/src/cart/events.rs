//! Cart change notifications.

use emporium_core::Identity;

use super::incentive::PromptTrigger;
use super::item::{CartItem, CartKey};

/// Published by [`CartStore`](super::CartStore) after each state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    ItemAdded(CartItem),
    QuantityChanged { key: CartKey, quantity: u32 },
    ItemRemoved(CartKey),
    /// All lines dropped, either by `clear_cart` or as the first half of an
    /// identity switch.
    Cleared,
    IdentityChanged { from: Identity, to: Identity },
    /// Lines loaded from persistence for the active identity.
    Restored { count: usize },
    RegistrationPrompt(PromptTrigger),
}
