//! Order preparation: stock re-validation and the payable total.

use chrono::Utc;
use emporium_core::{Money, ProductId};
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::api::ApiError;
use crate::cart::{CartPersistence, CartStore, ProductCatalog};
use crate::delivery::{DeliveryService, PricingSource};
use crate::models::{CheckoutRequest, OrderDraft, OrderLine};

/// What changed about a product since it was added to the cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// The product was deactivated.
    Inactive,
    /// Current stock no longer covers the cart quantity.
    Insufficient { requested: u64, available: i64 },
    /// The catalog no longer has the product.
    Missing,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inactive => f.write_str("is no longer available"),
            Self::Insufficient {
                requested,
                available,
            } => write!(f, "has {available} in stock, {requested} requested"),
            Self::Missing => f.write_str("no longer exists"),
        }
    }
}

/// Reasons an order cannot be prepared.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("{name} {reason}")]
    StaleStock {
        product_id: ProductId,
        name: String,
        reason: StaleReason,
    },

    #[error("product lookup failed: {0}")]
    Catalog(#[source] ApiError),
}

/// Turns the active cart into an [`OrderDraft`].
///
/// Borrows its collaborators: the orchestrator holds no state of its own.
pub struct CheckoutOrchestrator<'a, P, C, S> {
    cart: &'a CartStore<P>,
    catalog: &'a C,
    delivery: &'a DeliveryService<S>,
}

impl<'a, P, C, S> CheckoutOrchestrator<'a, P, C, S>
where
    P: CartPersistence,
    C: ProductCatalog,
    S: PricingSource,
{
    #[must_use]
    pub const fn new(
        cart: &'a CartStore<P>,
        catalog: &'a C,
        delivery: &'a DeliveryService<S>,
    ) -> Self {
        Self {
            cart,
            catalog,
            delivery,
        }
    }

    /// Re-validate every line against the catalog and price the order.
    ///
    /// Each product is fetched once, however many lines (sizes) it has, and
    /// checked against the combined quantity. Delivery pricing never fails:
    /// an unreachable pricing service yields a locally computed fee.
    ///
    /// # Errors
    ///
    /// - `CheckoutError::EmptyCart` if there is nothing to order
    /// - `CheckoutError::StaleStock` for the first product that is inactive,
    ///   gone, or short of stock
    /// - `CheckoutError::Catalog` if a product cannot be fetched
    #[instrument(
        skip(self, request),
        fields(identity = %self.cart.identity(), city = %request.address.city)
    )]
    pub async fn prepare_order(
        &self,
        request: CheckoutRequest,
    ) -> Result<OrderDraft, CheckoutError> {
        let items = self.cart.snapshot();
        if items.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        // Combined quantity per product, in first-seen order
        let mut requested: Vec<(ProductId, String, u64)> = Vec::new();
        for item in &items {
            match requested.iter_mut().find(|(id, _, _)| id == &item.product.id) {
                Some((_, _, quantity)) => *quantity += u64::from(item.quantity),
                None => requested.push((
                    item.product.id.clone(),
                    item.product.name.clone(),
                    u64::from(item.quantity),
                )),
            }
        }

        let checked = requested.len();
        for (id, name, quantity) in requested {
            let product = match self.catalog.fetch_product(&id).await {
                Ok(product) => product,
                Err(ApiError::NotFound(_)) => {
                    return Err(stale(id, name, StaleReason::Missing));
                }
                Err(e) => {
                    warn!(product_id = %id, error = %e, "Product lookup failed during checkout");
                    return Err(CheckoutError::Catalog(e));
                }
            };

            if !product.is_active {
                return Err(stale(id, product.name, StaleReason::Inactive));
            }
            if i128::from(product.stock_quantity) < i128::from(quantity) {
                return Err(stale(
                    id,
                    product.name,
                    StaleReason::Insufficient {
                        requested: quantity,
                        available: product.stock_quantity,
                    },
                ));
            }
        }

        let lines: Vec<OrderLine> = items.iter().map(OrderLine::from).collect();
        let subtotal: Money = lines.iter().map(|line| line.subtotal).sum();
        let delivery = self
            .delivery
            .calculate_fee(&request.fee_request(subtotal))
            .await;
        let total = subtotal + delivery.fee;

        let draft = OrderDraft {
            id: Uuid::new_v4(),
            identity: self.cart.identity().clone(),
            lines,
            subtotal,
            delivery,
            total,
            address: request.address,
            time_slot: request.time_slot,
            is_express: request.is_express,
            tier: request.tier,
            notes: request.notes,
            prepared_at: Utc::now(),
        };

        info!(
            order_id = %draft.id,
            products = checked,
            subtotal = %draft.subtotal,
            total = %draft.total,
            "Order prepared"
        );
        Ok(draft)
    }
}

const fn stale(product_id: ProductId, name: String, reason: StaleReason) -> CheckoutError {
    CheckoutError::StaleStock {
        product_id,
        name,
        reason,
    }
}
