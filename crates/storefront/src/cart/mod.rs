//! Identity-scoped shopping cart.
//!
//! # Architecture
//!
//! - [`Cart`] holds the lines and enforces the stock rules synchronously
//! - [`CartStore`] owns the cart of the active [`Identity`](emporium_core::Identity),
//!   persists it after every mutation and handles identity switches and
//!   guest-to-user migration
//! - [`CartPersistence`] abstracts the key-value store snapshots live in
//! - [`ProductCatalog`] supplies authoritative product records
//!
//! # Example
//!
//! ```rust,ignore
//! use emporium_core::Identity;
//! use emporium_storefront::cart::{CartStore, MemoryPersistence};
//!
//! let mut store = CartStore::open(MemoryPersistence::new(), Identity::Guest, settings).await;
//! store.add_to_cart(&product, 2, Some("XL")).await?;
//! assert_eq!(store.cart_items_count(), 2);
//! ```

mod catalog;
mod events;
mod incentive;
mod item;
mod persistence;
mod state;
mod store;

pub use catalog::ProductCatalog;
pub use events::CartEvent;
pub use incentive::{CartMilestone, PromptTrigger, RegistrationPrompt};
pub use item::{CartItem, CartKey, ProductSnapshot};
pub use persistence::{CartPersistence, FilePersistence, MemoryPersistence, PersistenceError};
pub use state::{Cart, CartError, QuantityUpdate};
pub use store::{
    AddOutcome, AddProductError, CartStore, MigrationOutcome, RemovalReason, StockAdjustment,
};
