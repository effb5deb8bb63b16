use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use vendora_catalog::CatalogProduct;
use vendora_core::{Aggregate, AggregateRoot, DomainError, ProductId, WishlistId};
use vendora_events::Event;

/// One saved item.
///
/// `stock` is informational only; wishlist membership is independent of
/// purchasability and no invariant ties quantity to stock (there is no
/// quantity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub image: Option<String>,
    pub description: Option<String>,
    pub stock: u32,
}

impl WishlistItem {
    pub fn from_product(product: &CatalogProduct) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            description: product.description.clone(),
            stock: product.stock,
        }
    }
}

/// Aggregate root: Wishlist.
///
/// Insertion-ordered set keyed by product id.
#[derive(Debug, Clone, PartialEq)]
pub struct Wishlist {
    id: WishlistId,
    items: Vec<WishlistItem>,
    version: u64,
}

impl Wishlist {
    pub fn new() -> Self {
        Self {
            id: WishlistId::new(),
            items: Vec::new(),
            version: 0,
        }
    }

    /// Rehydrate from a persisted item list, collapsing duplicate ids to the
    /// first occurrence.
    pub fn from_items(items: Vec<WishlistItem>) -> Self {
        let mut seen: Vec<ProductId> = Vec::new();
        let items = items
            .into_iter()
            .filter(|item| {
                if seen.contains(&item.id) {
                    return false;
                }
                seen.push(item.id);
                true
            })
            .collect();

        Self {
            id: WishlistId::new(),
            items,
            version: 0,
        }
    }

    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Default for Wishlist {
    fn default() -> Self {
        Self::new()
    }
}

impl AggregateRoot for Wishlist {
    type Id = WishlistId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WishlistCommand {
    /// Save an item; no-op when already present.
    Add { item: WishlistItem },
    /// Discard an item; idempotent when absent.
    Remove { id: ProductId },
    /// Save when absent, discard when present.
    ///
    /// Membership is computed from current state at handle time so a rapid
    /// double-toggle lands back where it started.
    Toggle { item: WishlistItem },
}

#[derive(Debug, Clone, PartialEq)]
pub enum WishlistEvent {
    ItemSaved { item: WishlistItem },
    ItemDiscarded { id: ProductId },
}

impl Event for WishlistEvent {
    fn event_type(&self) -> &'static str {
        match self {
            WishlistEvent::ItemSaved { .. } => "wishlist.item_saved",
            WishlistEvent::ItemDiscarded { .. } => "wishlist.item_discarded",
        }
    }

    fn version(&self) -> u32 {
        1
    }
}

impl Aggregate for Wishlist {
    type Command = WishlistCommand;
    type Event = WishlistEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            WishlistEvent::ItemSaved { item } => {
                self.items.push(item.clone());
            }
            WishlistEvent::ItemDiscarded { id } => {
                self.items.retain(|item| item.id != *id);
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            WishlistCommand::Add { item } => {
                if self.contains(item.id) {
                    Ok(vec![])
                } else {
                    Ok(vec![WishlistEvent::ItemSaved { item: item.clone() }])
                }
            }
            WishlistCommand::Remove { id } => {
                if self.contains(*id) {
                    Ok(vec![WishlistEvent::ItemDiscarded { id: *id }])
                } else {
                    Ok(vec![])
                }
            }
            WishlistCommand::Toggle { item } => {
                if self.contains(item.id) {
                    Ok(vec![WishlistEvent::ItemDiscarded { id: item.id }])
                } else {
                    Ok(vec![WishlistEvent::ItemSaved { item: item.clone() }])
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_item(id: u64) -> WishlistItem {
        WishlistItem {
            id: ProductId::new(id),
            name: format!("Product {id}"),
            price: Decimal::new(750, 2),
            image: None,
            description: None,
            stock: 3,
        }
    }

    fn dispatch(wishlist: &mut Wishlist, command: WishlistCommand) {
        let events = wishlist.handle(&command).unwrap();
        for event in &events {
            wishlist.apply(event);
        }
    }

    #[test]
    fn add_saves_item_once() {
        let mut wishlist = Wishlist::new();
        dispatch(&mut wishlist, WishlistCommand::Add { item: test_item(1) });
        dispatch(&mut wishlist, WishlistCommand::Add { item: test_item(1) });

        assert_eq!(wishlist.items().len(), 1);
    }

    #[test]
    fn remove_is_idempotent() {
        let mut wishlist = Wishlist::new();
        dispatch(&mut wishlist, WishlistCommand::Add { item: test_item(1) });
        let before = wishlist.clone();

        dispatch(
            &mut wishlist,
            WishlistCommand::Remove {
                id: ProductId::new(9),
            },
        );
        assert_eq!(wishlist, before);

        dispatch(
            &mut wishlist,
            WishlistCommand::Remove {
                id: ProductId::new(1),
            },
        );
        assert!(wishlist.is_empty());
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut wishlist = Wishlist::new();

        dispatch(&mut wishlist, WishlistCommand::Toggle { item: test_item(1) });
        assert!(wishlist.contains(ProductId::new(1)));

        dispatch(&mut wishlist, WishlistCommand::Toggle { item: test_item(1) });
        assert!(!wishlist.contains(ProductId::new(1)));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let mut wishlist = Wishlist::new();
        for id in [3u64, 1, 2] {
            dispatch(&mut wishlist, WishlistCommand::Add { item: test_item(id) });
        }

        let ids: Vec<u64> = wishlist.items().iter().map(|i| i.id.as_u64()).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[test]
    fn rehydration_collapses_duplicates() {
        let wishlist = Wishlist::from_items(vec![test_item(1), test_item(2), test_item(1)]);
        assert_eq!(wishlist.items().len(), 2);
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let mut wishlist = Wishlist::new();
        dispatch(&mut wishlist, WishlistCommand::Add { item: test_item(1) });
        let before = wishlist.clone();

        let _ = wishlist
            .handle(&WishlistCommand::Toggle { item: test_item(1) })
            .unwrap();
        assert_eq!(wishlist, before);
    }

    #[cfg(test)]
    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: toggling twice restores the prior membership state,
            /// from any starting contents.
            #[test]
            fn toggle_is_its_own_inverse(
                seed_ids in proptest::collection::vec(1u64..8, 0..8),
                toggled in 1u64..8
            ) {
                let mut wishlist = Wishlist::new();
                for id in seed_ids {
                    dispatch(&mut wishlist, WishlistCommand::Add { item: test_item(id) });
                }
                let before: Vec<ProductId> =
                    wishlist.items().iter().map(|i| i.id).collect();

                dispatch(&mut wishlist, WishlistCommand::Toggle { item: test_item(toggled) });
                dispatch(&mut wishlist, WishlistCommand::Toggle { item: test_item(toggled) });

                let after: Vec<ProductId> =
                    wishlist.items().iter().map(|i| i.id).collect();
                prop_assert_eq!(before, after);
            }

            /// Property: no operation sequence produces duplicate ids.
            #[test]
            fn membership_is_a_set(ids in proptest::collection::vec(1u64..6, 0..30)) {
                let mut wishlist = Wishlist::new();
                for id in ids {
                    dispatch(&mut wishlist, WishlistCommand::Toggle { item: test_item(id) });
                }

                let mut seen: Vec<ProductId> =
                    wishlist.items().iter().map(|i| i.id).collect();
                let len = seen.len();
                seen.sort();
                seen.dedup();
                prop_assert_eq!(seen.len(), len);
            }
        }
    }
}
