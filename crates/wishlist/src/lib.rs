//! `vendora-wishlist` — saved-items aggregate.

pub mod wishlist;

pub use wishlist::{Wishlist, WishlistCommand, WishlistEvent, WishlistItem};
