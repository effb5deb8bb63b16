//! `vendora-cart` — the stock-aware cart aggregate.

pub mod cart;

pub use cart::{Cart, CartCommand, CartError, CartEvent, InvalidReason, LineItem};
