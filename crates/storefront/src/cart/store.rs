//! The active cart, scoped to one identity and kept in sync with storage.

use std::collections::HashMap;

use emporium_core::{GUEST_CART_KEY, Identity, Money, ProductId, UserId};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, instrument, warn};

use super::catalog::ProductCatalog;
use super::events::CartEvent;
use super::incentive::{CartMilestone, PromptTrigger, RegistrationPrompt};
use super::item::{CartItem, CartKey, ProductSnapshot};
use super::persistence::{CartPersistence, PersistenceError};
use super::state::{Cart, CartError, QuantityUpdate};
use crate::api::ApiError;
use crate::config::CartSettings;
use crate::models::Product;

const EVENT_CAPACITY: usize = 64;

/// Errors from [`CartStore::add_product`].
#[derive(Debug, Error)]
pub enum AddProductError {
    #[error(transparent)]
    Cart(#[from] CartError),

    #[error("product lookup failed: {0}")]
    Catalog(#[from] ApiError),
}

/// Result of a successful add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddOutcome {
    /// The line after the add.
    pub item: CartItem,
    /// Set when this add made the registration prompt appear.
    pub prompt: Option<PromptTrigger>,
}

/// Result of [`CartStore::migrate_guest_cart`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// The guest lines now belong to the user.
    Migrated { items: usize },
    /// The user already had a cart; the guest cart was left alone.
    UserCartKept,
    /// The guest cart was empty.
    NothingToMigrate,
}

/// Why a line was dropped during a stock refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemovalReason {
    Inactive,
    OutOfStock,
    /// The catalog no longer knows the product.
    Missing,
}

/// A change made by [`CartStore::refresh_stock`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockAdjustment {
    Removed {
        key: CartKey,
        name: String,
        reason: RemovalReason,
    },
    Clamped {
        key: CartKey,
        name: String,
        from: u32,
        to: u32,
    },
}

/// Owns the cart of the active identity.
///
/// Mutations take `&mut self`, so no two can interleave and an identity
/// switch runs to completion before the next mutation starts. After each
/// mutation the cart is written to storage; a failed write is logged and
/// does not undo the mutation.
#[derive(Debug)]
pub struct CartStore<P> {
    identity: Identity,
    cart: Cart,
    persistence: P,
    prompt: RegistrationPrompt,
    settings: CartSettings,
    events: broadcast::Sender<CartEvent>,
}

impl<P: CartPersistence> CartStore<P> {
    /// Open the cart for `identity`, loading its persisted snapshot.
    ///
    /// An unreadable or corrupt snapshot is logged and the cart starts empty.
    pub async fn open(persistence: P, identity: Identity, settings: CartSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let mut store = Self {
            identity,
            cart: Cart::new(),
            persistence,
            prompt: RegistrationPrompt::new(settings.high_value_threshold),
            settings,
            events,
        };
        let items = store.load(&store.identity.storage_key()).await;
        store.cart.replace(items);
        store
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub const fn identity(&self) -> &Identity {
        &self.identity
    }

    pub const fn settings(&self) -> &CartSettings {
        &self.settings
    }

    pub const fn persistence(&self) -> &P {
        &self.persistence
    }

    pub fn items(&self) -> &[CartItem] {
        self.cart.items()
    }

    pub fn get(&self, key: &CartKey) -> Option<&CartItem> {
        self.cart.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.cart.is_empty()
    }

    /// Sum of line subtotals.
    pub fn cart_total(&self) -> Money {
        self.cart.total()
    }

    /// Sum of line quantities.
    pub fn cart_items_count(&self) -> u64 {
        self.cart.items_count()
    }

    /// A copy of the current lines.
    pub fn snapshot(&self) -> Vec<CartItem> {
        self.cart.items().to_vec()
    }

    /// The registration prompt currently showing, if any.
    pub const fn registration_prompt(&self) -> Option<PromptTrigger> {
        self.prompt.showing()
    }

    /// Receive every [`CartEvent`] published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<CartEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Add `quantity` units of `product`.
    ///
    /// # Errors
    ///
    /// Returns `CartError` if the product is inactive, out of stock, or
    /// cannot cover the combined quantity. The cart is unchanged on error.
    #[instrument(skip(self, product), fields(identity = %self.identity, product_id = %product.id))]
    pub async fn add_to_cart(
        &mut self,
        product: &Product,
        quantity: u32,
        size: Option<&str>,
    ) -> Result<AddOutcome, CartError> {
        let lines_before = self.cart.line_count();
        let item = self.cart.add(product, quantity, size)?;

        let milestone = CartMilestone {
            lines_before,
            lines_after: self.cart.line_count(),
            total: self.cart.total(),
        };
        let prompt = self.prompt.observe(&self.identity, milestone);

        self.emit(CartEvent::ItemAdded(item.clone()));
        if let Some(trigger) = prompt {
            self.emit(CartEvent::RegistrationPrompt(trigger));
        }
        self.persist().await;

        Ok(AddOutcome { item, prompt })
    }

    /// Fetch the current product record and add it.
    ///
    /// # Errors
    ///
    /// Returns `AddProductError::Catalog` if the product cannot be fetched,
    /// or `AddProductError::Cart` if the add is rejected.
    pub async fn add_product<C: ProductCatalog>(
        &mut self,
        catalog: &C,
        id: &ProductId,
        quantity: u32,
        size: Option<&str>,
    ) -> Result<AddOutcome, AddProductError> {
        let product = catalog.fetch_product(id).await?;
        Ok(self.add_to_cart(&product, quantity, size).await?)
    }

    /// Set a line's quantity. Zero or less removes it; values above the
    /// snapshot stock are clamped. A missing key changes nothing.
    #[instrument(skip(self), fields(identity = %self.identity))]
    pub async fn update_quantity(&mut self, key: &CartKey, quantity: i64) -> QuantityUpdate {
        let update = self.cart.update_quantity(key, quantity);
        match update {
            QuantityUpdate::Missing => {
                debug!("Quantity update for missing line ignored");
                return update;
            }
            QuantityUpdate::Removed => self.emit(CartEvent::ItemRemoved(key.clone())),
            QuantityUpdate::Updated { quantity, clamped } => {
                if clamped {
                    debug!(quantity, "Quantity clamped to stock");
                }
                self.emit(CartEvent::QuantityChanged {
                    key: key.clone(),
                    quantity,
                });
            }
        }
        self.persist().await;
        update
    }

    /// Remove a line. Removing a missing key changes nothing.
    pub async fn remove_from_cart(&mut self, key: &CartKey) -> Option<CartItem> {
        let removed = self.cart.remove(key)?;
        self.emit(CartEvent::ItemRemoved(key.clone()));
        self.persist().await;
        Some(removed)
    }

    /// Remove every line for the active identity.
    pub async fn clear_cart(&mut self) {
        self.cart.clear();
        self.emit(CartEvent::Cleared);
        self.persist().await;
    }

    /// Hide the registration prompt currently showing.
    pub fn dismiss_registration_prompt(&mut self) {
        self.prompt.dismiss();
    }

    // =========================================================================
    // Identity
    // =========================================================================

    /// Make `next` the active identity.
    ///
    /// Saves the current cart under the old identity, empties the cart
    /// (published as [`CartEvent::Cleared`]), then loads the new identity's
    /// snapshot (published as [`CartEvent::Restored`]). Lines never carry
    /// over between identities. Switching to the current identity is a no-op.
    #[instrument(skip(self), fields(from = %self.identity, to = %next))]
    pub async fn switch_identity(&mut self, next: Identity) {
        if next == self.identity {
            return;
        }

        if !self.cart.is_empty() {
            self.persist().await;
        }

        let previous = std::mem::replace(&mut self.identity, next.clone());
        self.cart.clear();
        self.emit(CartEvent::IdentityChanged {
            from: previous,
            to: next.clone(),
        });
        self.emit(CartEvent::Cleared);

        let items = self.load(&next.storage_key()).await;
        let count = items.len();
        self.cart.replace(items);
        self.emit(CartEvent::Restored { count });

        info!(items = count, "Identity switched");
    }

    /// Move the persisted guest cart to `user`, unless the user already has
    /// a non-empty persisted cart.
    ///
    /// On success the guest snapshot is deleted. If `user` is active its
    /// cart is reloaded; if the guest is active its cart is emptied.
    ///
    /// # Errors
    ///
    /// Returns `PersistenceError` if a snapshot cannot be read, parsed, or
    /// written.
    #[instrument(skip(self), fields(user_id = %user))]
    pub async fn migrate_guest_cart(
        &mut self,
        user: &UserId,
    ) -> Result<MigrationOutcome, PersistenceError> {
        if self.identity.is_guest() && !self.cart.is_empty() {
            self.persist().await;
        }

        let guest_items = self.read_snapshot(GUEST_CART_KEY).await?;
        if guest_items.is_empty() {
            return Ok(MigrationOutcome::NothingToMigrate);
        }

        let user_identity = Identity::User(user.clone());
        let user_key = user_identity.storage_key();
        if !self.read_snapshot(&user_key).await?.is_empty() {
            info!("User already has a cart, guest cart not migrated");
            return Ok(MigrationOutcome::UserCartKept);
        }

        self.persistence
            .set(&user_key, serde_json::to_string(&guest_items)?)
            .await?;
        self.persistence.remove(GUEST_CART_KEY).await?;

        let count = guest_items.len();
        if self.identity == user_identity {
            self.cart.replace(guest_items);
            self.emit(CartEvent::Restored { count });
        } else if self.identity.is_guest() {
            self.cart.clear();
            self.emit(CartEvent::Cleared);
        }

        info!(items = count, "Guest cart migrated");
        Ok(MigrationOutcome::Migrated { items: count })
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Re-fetch every product in the cart and reconcile the lines.
    ///
    /// Snapshots are refreshed; lines whose product is inactive, out of
    /// stock, or gone are removed; quantities above the new stock are
    /// clamped. Lines whose product could not be fetched are left alone.
    #[instrument(skip(self, catalog), fields(identity = %self.identity))]
    pub async fn refresh_stock<C: ProductCatalog>(&mut self, catalog: &C) -> Vec<StockAdjustment> {
        let mut fetched: HashMap<ProductId, Option<Product>> = HashMap::new();
        for item in self.cart.items() {
            if fetched.contains_key(&item.product.id) {
                continue;
            }
            match catalog.fetch_product(&item.product.id).await {
                Ok(product) => {
                    fetched.insert(item.product.id.clone(), Some(product));
                }
                Err(ApiError::NotFound(_)) => {
                    fetched.insert(item.product.id.clone(), None);
                }
                Err(e) => {
                    warn!(
                        product_id = %item.product.id,
                        error = %e,
                        "Stock refresh failed for product"
                    );
                }
            }
        }
        if fetched.is_empty() {
            return Vec::new();
        }

        let mut adjustments = Vec::new();
        let mut kept = Vec::with_capacity(self.cart.line_count());
        // Stock not yet claimed by earlier lines of the same product
        let mut unclaimed: HashMap<ProductId, i64> = HashMap::new();
        for mut item in self.cart.replace(Vec::new()) {
            let Some(latest) = fetched.get(&item.product.id) else {
                kept.push(item);
                continue;
            };
            let removal = match latest {
                None => Some(RemovalReason::Missing),
                Some(product) if !product.is_active => Some(RemovalReason::Inactive),
                Some(product) => {
                    let left = unclaimed
                        .entry(product.id.clone())
                        .or_insert(product.stock_quantity);
                    if *left <= 0 {
                        Some(RemovalReason::OutOfStock)
                    } else {
                        item.product = ProductSnapshot::from(product);
                        if i64::from(item.quantity) > *left {
                            let to = u32::try_from(*left).unwrap_or(u32::MAX);
                            adjustments.push(StockAdjustment::Clamped {
                                key: item.key.clone(),
                                name: item.product.name.clone(),
                                from: item.quantity,
                                to,
                            });
                            item.quantity = to;
                        }
                        *left -= i64::from(item.quantity);
                        None
                    }
                }
            };

            match removal {
                Some(reason) => adjustments.push(StockAdjustment::Removed {
                    key: item.key,
                    name: item.product.name,
                    reason,
                }),
                None => kept.push(item),
            }
        }
        self.cart.replace(kept);

        for adjustment in &adjustments {
            match adjustment {
                StockAdjustment::Removed { key, .. } => {
                    self.emit(CartEvent::ItemRemoved(key.clone()));
                }
                StockAdjustment::Clamped { key, to, .. } => self.emit(CartEvent::QuantityChanged {
                    key: key.clone(),
                    quantity: *to,
                }),
            }
        }
        self.persist().await;

        if !adjustments.is_empty() {
            info!(changes = adjustments.len(), "Cart adjusted to current stock");
        }
        adjustments
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn emit(&self, event: CartEvent) {
        // No subscribers is not an error
        let _ = self.events.send(event);
    }

    /// Write the active cart. An empty cart deletes the snapshot.
    async fn persist(&self) {
        let key = self.identity.storage_key();
        let result = if self.cart.is_empty() {
            self.persistence.remove(&key).await
        } else {
            match serde_json::to_string(self.cart.items()) {
                Ok(json) => self.persistence.set(&key, json).await,
                Err(e) => Err(e.into()),
            }
        };

        if let Err(e) = result {
            warn!(key = %key, error = %e, "Failed to persist cart");
        }
    }

    /// Load a snapshot for the active cart, treating any failure as empty.
    async fn load(&self, key: &str) -> Vec<CartItem> {
        match self.read_snapshot(key).await {
            Ok(items) => items,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to load cart snapshot, starting empty");
                Vec::new()
            }
        }
    }

    async fn read_snapshot(&self, key: &str) -> Result<Vec<CartItem>, PersistenceError> {
        match self.persistence.get(key).await? {
            Some(json) if !json.trim().is_empty() => Ok(serde_json::from_str(&json)?),
            _ => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::MemoryPersistence;
    use crate::models::fixtures::product;

    /// Catalog backed by a fixed product list.
    struct FixedCatalog(Vec<Product>);

    impl ProductCatalog for FixedCatalog {
        async fn fetch_product(&self, id: &ProductId) -> Result<Product, ApiError> {
            self.0
                .iter()
                .find(|p| &p.id == id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(id.to_string()))
        }
    }

    async fn guest_store() -> CartStore<MemoryPersistence> {
        CartStore::open(
            MemoryPersistence::new(),
            Identity::Guest,
            CartSettings::default(),
        )
        .await
    }

    fn drain(rx: &mut broadcast::Receiver<CartEvent>) -> Vec<CartEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_add_persists_under_identity_key() {
        let mut store = guest_store().await;
        store.add_to_cart(&product("A", 5, 100), 2, None).await.unwrap();

        let json = store.persistence().get("cart_guest").await.unwrap().unwrap();
        let items: Vec<CartItem> = serde_json::from_str(&json).unwrap();
        assert_eq!(items, store.snapshot());
    }

    #[tokio::test]
    async fn test_first_add_prompts_guest_once() {
        let mut store = guest_store().await;
        let mut rx = store.subscribe();

        let first = store.add_to_cart(&product("A", 5, 100), 1, None).await.unwrap();
        let second = store.add_to_cart(&product("B", 5, 100), 1, None).await.unwrap();

        assert_eq!(first.prompt, Some(PromptTrigger::FirstItem));
        assert_eq!(second.prompt, None);
        let events = drain(&mut rx);
        assert!(events.contains(&CartEvent::RegistrationPrompt(PromptTrigger::FirstItem)));

        store.dismiss_registration_prompt();
        assert_eq!(store.registration_prompt(), None);
    }

    #[tokio::test]
    async fn test_guest_session_reaches_every_trigger() {
        let mut store = guest_store().await;

        let a = store.add_to_cart(&product("A", 5, 6_000), 1, None).await.unwrap();
        store.dismiss_registration_prompt();
        let b = store.add_to_cart(&product("B", 5, 6_000), 1, None).await.unwrap();
        store.dismiss_registration_prompt();
        let c = store.add_to_cart(&product("C", 5, 100), 1, None).await.unwrap();

        assert_eq!(a.prompt, Some(PromptTrigger::FirstItem));
        assert_eq!(b.prompt, Some(PromptTrigger::HighValueCart));
        assert_eq!(c.prompt, Some(PromptTrigger::ThirdItem));
        assert_eq!(store.registration_prompt(), Some(PromptTrigger::ThirdItem));
    }

    #[tokio::test]
    async fn test_switch_publishes_cleared_then_restored() {
        let mut store = guest_store().await;
        store.add_to_cart(&product("A", 5, 100), 1, None).await.unwrap();
        let mut rx = store.subscribe();

        let user = Identity::User(UserId::new("u1"));
        store.switch_identity(user.clone()).await;

        assert!(store.is_empty());
        assert_eq!(
            drain(&mut rx),
            vec![
                CartEvent::IdentityChanged {
                    from: Identity::Guest,
                    to: user,
                },
                CartEvent::Cleared,
                CartEvent::Restored { count: 0 },
            ]
        );
    }

    #[tokio::test]
    async fn test_switch_to_same_identity_is_noop() {
        let mut store = guest_store().await;
        store.add_to_cart(&product("A", 5, 100), 1, None).await.unwrap();
        let mut rx = store.subscribe();

        store.switch_identity(Identity::Guest).await;

        assert_eq!(store.cart_items_count(), 1);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_starts_empty() {
        let persistence = MemoryPersistence::new();
        persistence
            .set("cart_guest", "{not json".to_owned())
            .await
            .unwrap();

        let store = CartStore::open(persistence, Identity::Guest, CartSettings::default()).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_update_and_remove_persist() {
        let mut store = guest_store().await;
        let a = product("A", 5, 100);
        store.add_to_cart(&a, 1, None).await.unwrap();
        let key = CartKey::new(&a.id, None);

        assert_eq!(
            store.update_quantity(&key, 9).await,
            QuantityUpdate::Updated {
                quantity: 5,
                clamped: true
            }
        );
        assert_eq!(store.cart_total(), Money::from_major(500));

        assert!(store.remove_from_cart(&key).await.is_some());
        assert!(store.remove_from_cart(&key).await.is_none());
        assert!(store.persistence().get("cart_guest").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_product_uses_catalog_stock() {
        let mut store = guest_store().await;
        let catalog = FixedCatalog(vec![product("A", 2, 100)]);

        let err = store
            .add_product(&catalog, &ProductId::new("A"), 3, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AddProductError::Cart(CartError::InsufficientStock { .. })
        ));

        let err = store
            .add_product(&catalog, &ProductId::new("Z"), 1, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AddProductError::Catalog(ApiError::NotFound(_))));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_refresh_stock_reconciles_lines() {
        let mut store = guest_store().await;
        store.add_to_cart(&product("A", 10, 100), 4, None).await.unwrap();
        store.add_to_cart(&product("B", 10, 100), 1, None).await.unwrap();
        store.add_to_cart(&product("C", 10, 100), 1, None).await.unwrap();
        store.add_to_cart(&product("D", 10, 100), 1, None).await.unwrap();

        let mut inactive = product("B", 10, 100);
        inactive.is_active = false;
        let catalog = FixedCatalog(vec![
            product("A", 2, 100),
            inactive,
            product("C", 0, 100),
        ]);

        let adjustments = store.refresh_stock(&catalog).await;

        assert_eq!(adjustments.len(), 4);
        assert!(adjustments.contains(&StockAdjustment::Clamped {
            key: CartKey::new(&ProductId::new("A"), None),
            name: "Product A".to_owned(),
            from: 4,
            to: 2,
        }));
        assert!(adjustments.contains(&StockAdjustment::Removed {
            key: CartKey::new(&ProductId::new("D"), None),
            name: "Product D".to_owned(),
            reason: RemovalReason::Missing,
        }));
        assert_eq!(store.items().len(), 1);
        assert_eq!(store.items()[0].product.stock_quantity, 2);
        assert_eq!(store.cart_items_count(), 2);
    }

    #[tokio::test]
    async fn test_refresh_stock_clamps_sizes_against_shared_stock() {
        let mut p = product("A", 6, 100);
        p.sizes = ["S", "M", "L"]
            .into_iter()
            .map(|name| crate::models::SizeOption {
                name: name.to_owned(),
                price: None,
            })
            .collect();
        let mut store = guest_store().await;
        for size in ["S", "M", "L"] {
            store.add_to_cart(&p, 2, Some(size)).await.unwrap();
        }

        let mut now = p.clone();
        now.stock_quantity = 3;
        let adjustments = store.refresh_stock(&FixedCatalog(vec![now])).await;

        assert_eq!(
            adjustments,
            vec![
                StockAdjustment::Clamped {
                    key: CartKey::new(&p.id, Some("M")),
                    name: "Product A".to_owned(),
                    from: 2,
                    to: 1,
                },
                StockAdjustment::Removed {
                    key: CartKey::new(&p.id, Some("L")),
                    name: "Product A".to_owned(),
                    reason: RemovalReason::OutOfStock,
                },
            ]
        );
        assert_eq!(store.cart_items_count(), 3);
    }
}
