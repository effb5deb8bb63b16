//! `vendora-catalog` — the catalog collaborator boundary.
//!
//! Everything the engines know about products enters through this crate, and
//! numeric normalization (stock/price arriving as numbers or strings) happens
//! here exactly once. Downstream code can assume well-typed values.

pub mod client;
pub mod memory;
pub mod types;

pub use client::{CatalogClient, CatalogError, HttpCatalogClient};
pub use memory::InMemoryCatalog;
pub use types::{AvailabilityRecord, CatalogProduct};
