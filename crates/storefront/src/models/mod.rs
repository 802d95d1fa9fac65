//! Domain models shared by the cart, catalog and checkout.

mod order;
mod product;

pub use order::{CheckoutRequest, OrderDraft, OrderLine, ShippingAddress};
pub use product::{Product, SizeOption};

#[cfg(test)]
pub(crate) use product::fixtures;
