//! `vendora-storage` — snapshot persistence for session state.
//!
//! Stores are deliberately fire-and-forget: persistence failures are logged
//! and never surfaced to callers, so a broken disk cannot block the cart.

pub mod memory;
pub mod sqlite;
pub mod store;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use store::SnapshotStore;
