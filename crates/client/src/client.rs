use std::sync::Arc;

use rust_decimal::Decimal;
use thiserror::Error;

use vendora_cart::{Cart, CartCommand, CartError, CartEvent, LineItem};
use vendora_catalog::{AvailabilityRecord, CatalogClient, CatalogError, CatalogProduct};
use vendora_core::{Aggregate, AggregateRoot, CartId, ExpectedVersion, ProductId};
use vendora_events::{Envelope, Event, EventBus, InMemoryEventBus, Subscription};
use vendora_storage::SnapshotStore;
use vendora_wishlist::{Wishlist, WishlistCommand, WishlistEvent, WishlistItem};

const CART_KEY: &str = "cart";
const WISHLIST_KEY: &str = "wishlist";
const PENDING_CART_KEY: &str = "pending_cart";

/// Union of the engines' events, as published on the session bus.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Cart(CartEvent),
    Wishlist(WishlistEvent),
}

impl Event for StoreEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StoreEvent::Cart(event) => event.event_type(),
            StoreEvent::Wishlist(event) => event.event_type(),
        }
    }

    fn version(&self) -> u32 {
        match self {
            StoreEvent::Cart(event) => event.version(),
            StoreEvent::Wishlist(event) => event.version(),
        }
    }
}

/// Failure modes of a reconciliation attempt.
///
/// `Transport` means the availability check never produced a verdict: the
/// cart is left untouched and no item is flagged. `Superseded` means the cart
/// changed while the check was in flight and the stale verdicts were
/// discarded.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("availability check failed: {0}")]
    Transport(#[from] CatalogError),
    #[error("cart changed while the availability check was in flight")]
    Superseded,
}

/// Snapshot of cart identity taken before an availability round trip.
///
/// `apply_reconciliation` only accepts results whose ticket still matches the
/// live cart, so verdicts computed against a cart the user has since edited
/// are dropped instead of clobbering the newer state.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationTicket {
    cart_id: CartId,
    version: u64,
    ids: Vec<ProductId>,
}

impl ReconciliationTicket {
    pub fn ids(&self) -> &[ProductId] {
        &self.ids
    }
}

/// Outcome of a completed reconciliation: the per-item verdicts and whether
/// checkout may proceed.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationReport {
    pub pass: bool,
    pub items: Vec<LineItem>,
}

/// Read model of the cart for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct CartView {
    pub items: Vec<LineItem>,
    pub item_count: u64,
    pub subtotal: Decimal,
    pub all_valid: bool,
    pub last_error: Option<CartError>,
}

/// Read model of the wishlist for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct WishlistView {
    pub items: Vec<WishlistItem>,
}

/// One shopper session: cart + wishlist, persisted after every change and
/// broadcast on an in-process bus.
///
/// State is snapshotted to the store before events are published, so a lost
/// notification never means lost state.
pub struct StorefrontClient {
    cart: Cart,
    wishlist: Wishlist,
    store: Arc<dyn SnapshotStore>,
    bus: InMemoryEventBus<Envelope<StoreEvent>>,
    sequence: u64,
    last_error: Option<CartError>,
}

impl StorefrontClient {
    /// Open a session against `store`, rehydrating any persisted cart and
    /// wishlist. Corrupt snapshots are discarded in favour of empty defaults;
    /// a bad disk must not brick the storefront.
    pub fn new(store: Arc<dyn SnapshotStore>) -> Self {
        let cart = Cart::from_items(load_snapshot(store.as_ref(), CART_KEY));
        let wishlist = Wishlist::from_items(load_snapshot(store.as_ref(), WISHLIST_KEY));

        Self {
            cart,
            wishlist,
            store,
            bus: InMemoryEventBus::new(),
            sequence: 0,
            last_error: None,
        }
    }

    /// Subscribe to every state change this session applies.
    pub fn subscribe(&self) -> Subscription<Envelope<StoreEvent>> {
        self.bus.subscribe()
    }

    pub fn cart_view(&self) -> CartView {
        CartView {
            items: self.cart.items().to_vec(),
            item_count: self.cart.item_count(),
            subtotal: self.cart.subtotal(),
            all_valid: self.cart.all_valid(),
            last_error: self.last_error.clone(),
        }
    }

    pub fn wishlist_view(&self) -> WishlistView {
        WishlistView {
            items: self.wishlist.items().to_vec(),
        }
    }

    pub fn last_error(&self) -> Option<&CartError> {
        self.last_error.as_ref()
    }

    // ---- cart operations -------------------------------------------------

    /// Add `quantity` units of `product`; merges into an existing line item.
    pub fn add_to_cart(
        &mut self,
        product: &CatalogProduct,
        quantity: u32,
    ) -> Result<(), CartError> {
        self.dispatch_cart(CartCommand::AddItem {
            product: product.clone(),
            quantity,
        })
    }

    /// Set the quantity of an existing line item. Unknown ids and quantities
    /// below 1 are ignored.
    pub fn update_quantity(&mut self, id: ProductId, quantity: u32) -> Result<(), CartError> {
        self.dispatch_cart(CartCommand::UpdateQuantity { id, quantity })
    }

    /// Remove a line item. Idempotent.
    pub fn remove_from_cart(&mut self, id: ProductId) {
        // Removal has no capacity check to fail.
        let _ = self.dispatch_cart(CartCommand::RemoveItem { id });
    }

    /// Empty the cart, e.g. after successful order placement.
    pub fn clear_cart(&mut self) {
        let _ = self.dispatch_cart(CartCommand::Clear);
    }

    // ---- wishlist operations ---------------------------------------------

    pub fn save_to_wishlist(&mut self, product: &CatalogProduct) {
        self.dispatch_wishlist(WishlistCommand::Add {
            item: WishlistItem::from_product(product),
        });
    }

    pub fn remove_from_wishlist(&mut self, id: ProductId) {
        self.dispatch_wishlist(WishlistCommand::Remove { id });
    }

    pub fn toggle_wishlist(&mut self, product: &CatalogProduct) {
        self.dispatch_wishlist(WishlistCommand::Toggle {
            item: WishlistItem::from_product(product),
        });
    }

    pub fn wishlist_contains(&self, id: ProductId) -> bool {
        self.wishlist.contains(id)
    }

    // ---- session transitions ---------------------------------------------

    /// Stash the current cart before redirecting a guest to sign-in.
    ///
    /// Calling this again overwrites the previous stash: last writer wins.
    pub fn begin_guest_checkout(&self) {
        match serde_json::to_value(self.cart.items()) {
            Ok(value) => self.store.save(PENDING_CART_KEY, &value),
            Err(err) => tracing::error!("failed to serialize pending cart: {err}"),
        }
    }

    /// Adopt the stashed guest cart after sign-in, replacing the current cart
    /// wholesale. The stash is consumed: a second call is a no-op.
    pub fn complete_sign_in(&mut self) {
        let Some(value) = self.store.load(PENDING_CART_KEY) else {
            return;
        };
        self.store.delete(PENDING_CART_KEY);

        let items: Vec<LineItem> = match serde_json::from_value(value) {
            Ok(items) => items,
            Err(err) => {
                tracing::warn!("discarding corrupt pending cart: {err}");
                return;
            }
        };

        // Replace has no capacity check to fail.
        let _ = self.dispatch_cart(CartCommand::Replace { items });
    }

    // ---- reconciliation --------------------------------------------------

    /// Capture the cart's identity before an availability round trip.
    pub fn reconciliation_ticket(&self) -> ReconciliationTicket {
        ReconciliationTicket {
            cart_id: self.cart.id_typed(),
            version: self.cart.version(),
            ids: self.cart.product_ids(),
        }
    }

    /// Fold availability verdicts into the cart, provided it has not changed
    /// since `ticket` was taken.
    pub fn apply_reconciliation(
        &mut self,
        ticket: &ReconciliationTicket,
        availability: Vec<AvailabilityRecord>,
    ) -> Result<ReconciliationReport, ReconcileError> {
        if ticket.cart_id != self.cart.id_typed()
            || !ExpectedVersion::Exact(ticket.version).matches(self.cart.version())
        {
            return Err(ReconcileError::Superseded);
        }

        // Reconcile has no capacity check to fail.
        let _ = self.dispatch_cart(CartCommand::Reconcile { availability });
        Ok(ReconciliationReport {
            pass: self.cart.all_valid(),
            items: self.cart.items().to_vec(),
        })
    }

    /// Check every line item against live availability in one batched call.
    ///
    /// An empty cart passes without a round trip. On transport failure the
    /// cart is left untouched and no item is flagged.
    pub async fn reconcile<C: CatalogClient>(
        &mut self,
        catalog: &C,
    ) -> Result<ReconciliationReport, ReconcileError> {
        if self.cart.is_empty() {
            return Ok(ReconciliationReport {
                pass: true,
                items: Vec::new(),
            });
        }

        let ticket = self.reconciliation_ticket();
        let availability = catalog.check_availability(&ticket.ids).await?;
        self.apply_reconciliation(&ticket, availability)
    }

    // ---- internals -------------------------------------------------------

    fn dispatch_cart(&mut self, command: CartCommand) -> Result<(), CartError> {
        let events = match self.cart.handle(&command) {
            Ok(events) => events,
            Err(err) => {
                self.last_error = Some(err.clone());
                return Err(err);
            }
        };
        self.last_error = None;

        if events.is_empty() {
            return Ok(());
        }

        for event in &events {
            self.cart.apply(event);
        }
        self.persist_cart();
        for event in events {
            self.publish(StoreEvent::Cart(event));
        }
        Ok(())
    }

    fn dispatch_wishlist(&mut self, command: WishlistCommand) {
        let events = match self.wishlist.handle(&command) {
            Ok(events) => events,
            Err(err) => {
                tracing::error!("wishlist command rejected: {err}");
                return;
            }
        };

        if events.is_empty() {
            return;
        }

        for event in &events {
            self.wishlist.apply(event);
        }
        self.persist_wishlist();
        for event in events {
            self.publish(StoreEvent::Wishlist(event));
        }
    }

    fn persist_cart(&self) {
        match serde_json::to_value(self.cart.items()) {
            Ok(value) => self.store.save(CART_KEY, &value),
            Err(err) => tracing::error!("failed to serialize cart snapshot: {err}"),
        }
    }

    fn persist_wishlist(&self) {
        match serde_json::to_value(self.wishlist.items()) {
            Ok(value) => self.store.save(WISHLIST_KEY, &value),
            Err(err) => tracing::error!("failed to serialize wishlist snapshot: {err}"),
        }
    }

    fn publish(&mut self, event: StoreEvent) {
        self.sequence += 1;
        if let Err(err) = self.bus.publish(Envelope::new(self.sequence, event)) {
            tracing::warn!("failed to publish event: {err:?}");
        }
    }
}

/// Load and decode a snapshot, falling back to empty on anything suspect.
fn load_snapshot<T: serde::de::DeserializeOwned>(store: &dyn SnapshotStore, key: &str) -> Vec<T> {
    let Some(value) = store.load(key) else {
        return Vec::new();
    };
    match serde_json::from_value(value) {
        Ok(items) => items,
        Err(err) => {
            tracing::warn!(key, "discarding corrupt snapshot: {err}");
            Vec::new()
        }
    }
}
