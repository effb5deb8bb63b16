//! End-to-end session flows: cart mutations, persistence, sign-in merge and
//! availability reconciliation against a scriptable catalog.

use std::sync::Arc;

use rust_decimal::Decimal;

use vendora_cart::{CartError, InvalidReason};
use vendora_catalog::{CatalogProduct, InMemoryCatalog};
use vendora_client::{ReconcileError, StorefrontClient};
use vendora_core::ProductId;
use vendora_storage::{MemoryStore, SnapshotStore};

fn product(id: u64, stock: u32, price_cents: i64) -> CatalogProduct {
    CatalogProduct {
        id: ProductId::new(id),
        name: format!("Product {id}"),
        price: Decimal::new(price_cents, 2),
        image: None,
        description: None,
        stock,
        active: true,
    }
}

fn client() -> StorefrontClient {
    StorefrontClient::new(Arc::new(MemoryStore::new()))
}

#[test]
fn add_within_stock_updates_totals() {
    let mut client = client();
    client.add_to_cart(&product(1, 10, 1999), 2).unwrap();
    client.add_to_cart(&product(2, 5, 500), 1).unwrap();

    let view = client.cart_view();
    assert_eq!(view.items.len(), 2);
    assert_eq!(view.item_count, 3);
    assert_eq!(view.subtotal, Decimal::new(4498, 2));
    assert!(view.all_valid);
}

#[test]
fn re_add_merges_and_rejects_overflow() {
    let mut client = client();
    let shirt = product(1, 5, 1999);

    client.add_to_cart(&shirt, 3).unwrap();
    client.add_to_cart(&shirt, 2).unwrap();

    let view = client.cart_view();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].quantity, 5);

    // 5 + 1 exceeds stock: rejected, quantity unchanged.
    let err = client.add_to_cart(&shirt, 1).unwrap_err();
    assert_eq!(
        err,
        CartError::InsufficientStock {
            id: ProductId::new(1),
            available: 5
        }
    );
    assert_eq!(client.cart_view().items[0].quantity, 5);
}

#[tokio::test]
async fn reconciliation_flags_removed_reduced_and_depleted_items() {
    let catalog = InMemoryCatalog::new();
    catalog.insert(product(1, 10, 1000));
    catalog.insert(product(2, 10, 1000));
    catalog.insert(product(3, 10, 1000));
    catalog.insert(product(4, 10, 1000));

    let mut client = client();
    client.add_to_cart(&product(1, 10, 1000), 4).unwrap();
    client.add_to_cart(&product(2, 10, 1000), 4).unwrap();
    client.add_to_cart(&product(3, 10, 1000), 4).unwrap();
    client.add_to_cart(&product(4, 10, 1000), 4).unwrap();

    // Catalog drifts while the user browses.
    catalog.remove(ProductId::new(1));
    catalog.set_stock(ProductId::new(2), 2);
    catalog.set_stock(ProductId::new(3), 0);

    let report = client.reconcile(&catalog).await.unwrap();
    assert!(!report.pass);

    let view = client.cart_view();
    assert_eq!(report.items, view.items);
    let by_id = |id: u64| {
        view.items
            .iter()
            .find(|item| item.id == ProductId::new(id))
            .unwrap()
    };

    assert_eq!(by_id(1).invalid_reason, Some(InvalidReason::NoLongerAvailable));
    // Removed item keeps its last-known stock; there is nothing authoritative
    // to replace it with.
    assert_eq!(by_id(1).stock, 10);

    assert_eq!(by_id(2).invalid_reason, Some(InvalidReason::InsufficientStock));
    assert_eq!(by_id(2).stock, 2);
    // Quantity is not clamped; the verdict tells the user what to reduce.
    assert_eq!(by_id(2).quantity, 4);

    assert_eq!(by_id(3).invalid_reason, Some(InvalidReason::OutOfStock));
    assert_eq!(by_id(3).stock, 0);

    assert_eq!(by_id(4).invalid_reason, None);
}

#[tokio::test]
async fn lowering_quantity_after_a_verdict_clears_it() {
    let catalog = InMemoryCatalog::new();
    catalog.insert(product(1, 2, 1000));

    let mut client = client();
    client.add_to_cart(&product(1, 10, 1000), 4).unwrap();

    assert!(!client.reconcile(&catalog).await.unwrap().pass);

    client.update_quantity(ProductId::new(1), 2).unwrap();
    let view = client.cart_view();
    assert_eq!(view.items[0].invalid_reason, None);
    assert!(view.all_valid);

    assert!(client.reconcile(&catalog).await.unwrap().pass);
}

#[tokio::test]
async fn transport_failure_leaves_cart_untouched() {
    let catalog = InMemoryCatalog::new();
    catalog.insert(product(1, 10, 1000));

    let mut client = client();
    client.add_to_cart(&product(1, 10, 1000), 2).unwrap();
    let before = client.cart_view();

    catalog.fail_next_request();
    let err = client.reconcile(&catalog).await.unwrap_err();
    assert!(matches!(err, ReconcileError::Transport(_)));

    // No verdicts were assigned; the failure is an integration problem, not
    // an availability answer.
    assert_eq!(client.cart_view(), before);
}

#[tokio::test]
async fn empty_cart_passes_without_a_round_trip() {
    let catalog = InMemoryCatalog::new();
    catalog.fail_next_request();

    let mut client = client();
    // Would fail if it hit the catalog at all.
    let report = client.reconcile(&catalog).await.unwrap();
    assert!(report.pass);
    assert!(report.items.is_empty());
}

#[test]
fn stale_reconciliation_results_are_discarded() {
    let mut client = client();
    client.add_to_cart(&product(1, 10, 1000), 2).unwrap();

    let ticket = client.reconciliation_ticket();

    // The user edits the cart while the availability check is in flight.
    client.update_quantity(ProductId::new(1), 3).unwrap();
    let before = client.cart_view();

    let err = client.apply_reconciliation(&ticket, vec![]).unwrap_err();
    assert!(matches!(err, ReconcileError::Superseded));
    assert_eq!(client.cart_view(), before);

    // A fresh ticket against the current cart applies normally.
    let ticket = client.reconciliation_ticket();
    assert!(!client.apply_reconciliation(&ticket, vec![]).unwrap().pass);
}

#[test]
fn cart_and_wishlist_survive_session_restart() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

    {
        let mut client = StorefrontClient::new(store.clone());
        client.add_to_cart(&product(1, 10, 1999), 2).unwrap();
        client.save_to_wishlist(&product(2, 5, 500));
    }

    let reopened = StorefrontClient::new(store);
    let cart = reopened.cart_view();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
    assert!(reopened.wishlist_contains(ProductId::new(2)));
}

#[test]
fn guest_cart_is_adopted_once_after_sign_in() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

    // Guest fills a cart and heads to sign-in.
    let mut guest = StorefrontClient::new(store.clone());
    guest.add_to_cart(&product(1, 10, 1000), 2).unwrap();
    guest.begin_guest_checkout();

    // The signed-in session had its own cart; the guest cart wins wholesale.
    let mut signed_in = StorefrontClient::new(store.clone());
    signed_in.add_to_cart(&product(9, 10, 1000), 1).unwrap();
    signed_in.complete_sign_in();

    let view = signed_in.cart_view();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].id, ProductId::new(1));

    // The stash was consumed: a repeated sign-in changes nothing.
    signed_in.add_to_cart(&product(9, 10, 1000), 1).unwrap();
    signed_in.complete_sign_in();
    assert_eq!(signed_in.cart_view().items.len(), 2);
    assert!(store.load("pending_cart").is_none());
}

#[test]
fn clearing_the_cart_persists_the_empty_state() {
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());

    let mut client = StorefrontClient::new(store.clone());
    client.add_to_cart(&product(1, 10, 1000), 2).unwrap();
    client.clear_cart();

    let reopened = StorefrontClient::new(store);
    assert!(reopened.cart_view().items.is_empty());
}
