use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use vendora_catalog::{AvailabilityRecord, CatalogProduct};
use vendora_core::{Aggregate, AggregateRoot, CartId, ProductId};
use vendora_events::Event;

/// Why a line item failed reconciliation.
///
/// Only the reconciliation protocol sets this; ordinary mutation clears it by
/// replacing the item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvalidReason {
    NoLongerAvailable,
    InsufficientStock,
    OutOfStock,
}

/// One cart entry.
///
/// `stock` is the last-known availability and may go stale between
/// reconciliations; every mutation path checks against it optimistically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub description: Option<String>,
    pub quantity: u32,
    pub stock: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<InvalidReason>,
}

impl LineItem {
    /// Build a fresh entry from a catalog product, taking name/price/stock
    /// from what the user is currently looking at.
    pub fn from_product(product: &CatalogProduct, quantity: u32) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            description: product.description.clone(),
            quantity,
            stock: product.stock,
            invalid_reason: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.invalid_reason.is_none()
    }
}

/// Aggregate root: Cart.
///
/// Ordered collection of line items keyed by product id (no duplicates;
/// re-adding merges quantity). Derived totals are recomputed on every access,
/// never cached.
#[derive(Debug, Clone, PartialEq)]
pub struct Cart {
    id: CartId,
    items: Vec<LineItem>,
    version: u64,
}

impl Cart {
    /// Create an empty cart with a fresh session-local identity.
    pub fn new() -> Self {
        Self {
            id: CartId::new(),
            items: Vec::new(),
            version: 0,
        }
    }

    /// Rehydrate from a persisted item list.
    ///
    /// Snapshots come from local storage and are not trusted: duplicate ids
    /// collapse to the first occurrence and zero-quantity entries are
    /// dropped. Items carrying a reconciliation verdict keep their quantity
    /// as-is (the verdict is what explains the overage to the user).
    pub fn from_items(items: Vec<LineItem>) -> Self {
        Self {
            id: CartId::new(),
            items: Self::sanitize(items),
            version: 0,
        }
    }

    pub fn id_typed(&self) -> CartId {
        self.id
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn get(&self, id: ProductId) -> Option<&LineItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn product_ids(&self) -> Vec<ProductId> {
        self.items.iter().map(|item| item.id).collect()
    }

    /// Total number of units across all line items.
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Sum of `price * quantity` across all line items.
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .map(|item| item.price * Decimal::from(item.quantity))
            .sum()
    }

    /// True when no item carries a reconciliation verdict.
    pub fn all_valid(&self) -> bool {
        self.items.iter().all(LineItem::is_valid)
    }

    /// Compute the post-reconciliation item list from availability records.
    ///
    /// Records are indexed by id; response order is irrelevant. Quantity is
    /// deliberately not auto-clamped on `insufficient_stock` so the UI can
    /// show the user what to reduce.
    pub fn reconciled_items(&self, availability: &[AvailabilityRecord]) -> Vec<LineItem> {
        let by_id: HashMap<ProductId, &AvailabilityRecord> =
            availability.iter().map(|r| (r.id, r)).collect();

        self.items
            .iter()
            .map(|item| {
                let mut item = item.clone();
                match by_id.get(&item.id) {
                    // Unknown or deactivated: nothing authoritative to take
                    // the stock from, so it stays untouched.
                    None => item.invalid_reason = Some(InvalidReason::NoLongerAvailable),
                    Some(record) if !record.active => {
                        item.invalid_reason = Some(InvalidReason::NoLongerAvailable);
                    }
                    Some(record) if record.stock < item.quantity => {
                        item.stock = record.stock;
                        item.invalid_reason = Some(if record.stock > 0 {
                            InvalidReason::InsufficientStock
                        } else {
                            InvalidReason::OutOfStock
                        });
                    }
                    Some(record) => {
                        item.stock = record.stock;
                        item.invalid_reason = None;
                    }
                }
                item
            })
            .collect()
    }

    fn sanitize(items: Vec<LineItem>) -> Vec<LineItem> {
        let mut seen: Vec<ProductId> = Vec::new();
        items
            .into_iter()
            .filter(|item| {
                if item.quantity == 0 || seen.contains(&item.id) {
                    return false;
                }
                // An unflagged item with no stock cannot satisfy
                // `1 <= quantity <= stock`; only a reconciliation verdict
                // justifies keeping one around.
                if item.is_valid() && item.stock == 0 {
                    return false;
                }
                seen.push(item.id);
                true
            })
            .map(|mut item| {
                if item.is_valid() && item.quantity > item.stock {
                    item.quantity = item.stock;
                }
                item
            })
            .collect()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateRoot for Cart {
    type Id = CartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartCommand {
    /// Add `quantity` units of `product`, merging into an existing entry.
    AddItem {
        product: CatalogProduct,
        quantity: u32,
    },
    /// Set the quantity of an existing entry.
    UpdateQuantity { id: ProductId, quantity: u32 },
    /// Remove an entry; idempotent when absent.
    RemoveItem { id: ProductId },
    /// Empty the cart (after successful order placement).
    Clear,
    /// Adopt a whole snapshot (pending-cart merge after sign-in).
    Replace { items: Vec<LineItem> },
    /// Fold authoritative availability into every line item.
    Reconcile {
        availability: Vec<AvailabilityRecord>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    ItemAdded { item: LineItem },
    ItemMerged { item: LineItem },
    QuantityChanged { id: ProductId, quantity: u32 },
    ItemRemoved { id: ProductId },
    Cleared,
    Replaced { items: Vec<LineItem> },
    Reconciled { items: Vec<LineItem> },
}

impl Event for CartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CartEvent::ItemAdded { .. } => "cart.item_added",
            CartEvent::ItemMerged { .. } => "cart.item_merged",
            CartEvent::QuantityChanged { .. } => "cart.quantity_changed",
            CartEvent::ItemRemoved { .. } => "cart.item_removed",
            CartEvent::Cleared => "cart.cleared",
            CartEvent::Replaced { .. } => "cart.replaced",
            CartEvent::Reconciled { .. } => "cart.reconciled",
        }
    }

    fn version(&self) -> u32 {
        1
    }
}

/// Capacity failure: expected, user-facing, non-fatal.
///
/// Surfaced as the normal return value of add/update; callers branch on it
/// rather than catching anything.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("insufficient stock for product {id}: {available} available")]
    InsufficientStock { id: ProductId, available: u32 },
}

impl Aggregate for Cart {
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = CartError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            CartEvent::ItemAdded { item } => {
                self.items.push(item.clone());
            }
            CartEvent::ItemMerged { item } => {
                if let Some(slot) = self.items.iter_mut().find(|i| i.id == item.id) {
                    *slot = item.clone();
                }
            }
            CartEvent::QuantityChanged { id, quantity } => {
                if let Some(item) = self.items.iter_mut().find(|i| i.id == *id) {
                    item.quantity = *quantity;
                    item.invalid_reason = None;
                }
            }
            CartEvent::ItemRemoved { id } => {
                self.items.retain(|item| item.id != *id);
            }
            CartEvent::Cleared => {
                self.items.clear();
            }
            CartEvent::Replaced { items } => {
                self.items = Self::sanitize(items.clone());
            }
            CartEvent::Reconciled { items } => {
                self.items = items.clone();
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddItem { product, quantity } => self.handle_add(product, *quantity),
            CartCommand::UpdateQuantity { id, quantity } => self.handle_update(*id, *quantity),
            CartCommand::RemoveItem { id } => {
                if self.get(*id).is_some() {
                    Ok(vec![CartEvent::ItemRemoved { id: *id }])
                } else {
                    Ok(vec![])
                }
            }
            CartCommand::Clear => {
                if self.items.is_empty() {
                    Ok(vec![])
                } else {
                    Ok(vec![CartEvent::Cleared])
                }
            }
            CartCommand::Replace { items } => Ok(vec![CartEvent::Replaced {
                items: items.clone(),
            }]),
            CartCommand::Reconcile { availability } => {
                if self.items.is_empty() {
                    Ok(vec![])
                } else {
                    Ok(vec![CartEvent::Reconciled {
                        items: self.reconciled_items(availability),
                    }])
                }
            }
        }
    }
}

impl Cart {
    fn handle_add(
        &self,
        product: &CatalogProduct,
        quantity: u32,
    ) -> Result<Vec<CartEvent>, CartError> {
        if quantity == 0 {
            return Ok(vec![]);
        }

        match self.get(product.id) {
            Some(existing) => {
                let combined = existing.quantity.saturating_add(quantity);
                if combined > product.stock {
                    return Err(CartError::InsufficientStock {
                        id: product.id,
                        available: product.stock,
                    });
                }
                Ok(vec![CartEvent::ItemMerged {
                    item: LineItem::from_product(product, combined),
                }])
            }
            None => {
                // A first add never partially fills; the whole requested
                // quantity must fit.
                if product.stock < quantity {
                    return Err(CartError::InsufficientStock {
                        id: product.id,
                        available: product.stock,
                    });
                }
                Ok(vec![CartEvent::ItemAdded {
                    item: LineItem::from_product(product, quantity),
                }])
            }
        }
    }

    fn handle_update(&self, id: ProductId, quantity: u32) -> Result<Vec<CartEvent>, CartError> {
        if quantity < 1 {
            return Ok(vec![]);
        }

        let Some(item) = self.get(id) else {
            return Ok(vec![]);
        };

        if quantity > item.stock {
            return Err(CartError::InsufficientStock {
                id,
                available: item.stock,
            });
        }

        Ok(vec![CartEvent::QuantityChanged { id, quantity }])
    }
}
