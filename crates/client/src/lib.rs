//! `vendora-client` — session facade over the cart and wishlist engines.
//!
//! Wires the aggregates to persistence, event distribution and the catalog
//! collaborator, and owns the session-transition flows (guest checkout,
//! sign-in merge, availability reconciliation).

pub mod client;

pub use client::{
    CartView, ReconcileError, ReconciliationReport, ReconciliationTicket, StoreEvent,
    StorefrontClient, WishlistView,
};
