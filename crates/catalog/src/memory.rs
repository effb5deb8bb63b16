//! In-memory catalog for tests/dev.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use vendora_core::ProductId;

use crate::client::{CatalogClient, CatalogError};
use crate::types::{AvailabilityRecord, CatalogProduct};

/// In-memory catalog with scriptable stock, activity and failures.
///
/// Mirrors the semantics callers see from the HTTP client: unknown ids are
/// simply absent from availability responses, and a forced failure surfaces
/// as a network error.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: Mutex<HashMap<ProductId, CatalogProduct>>,
    fail_next: AtomicBool,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, product: CatalogProduct) {
        self.lock().insert(product.id, product);
    }

    pub fn set_stock(&self, id: ProductId, stock: u32) {
        if let Some(product) = self.lock().get_mut(&id) {
            product.stock = stock;
        }
    }

    pub fn set_active(&self, id: ProductId, active: bool) {
        if let Some(product) = self.lock().get_mut(&id) {
            product.active = active;
        }
    }

    pub fn remove(&self, id: ProductId) {
        self.lock().remove(&id);
    }

    /// Make the next catalog call fail with a network error.
    pub fn fail_next_request(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<ProductId, CatalogProduct>> {
        self.products.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn take_failure(&self) -> Result<(), CatalogError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            Err(CatalogError::Network("simulated outage".to_string()))
        } else {
            Ok(())
        }
    }
}

impl CatalogClient for InMemoryCatalog {
    async fn fetch_product(&self, id: ProductId) -> Result<Option<CatalogProduct>, CatalogError> {
        self.take_failure()?;
        Ok(self.lock().get(&id).cloned())
    }

    async fn check_availability(
        &self,
        ids: &[ProductId],
    ) -> Result<Vec<AvailabilityRecord>, CatalogError> {
        self.take_failure()?;
        let products = self.lock();

        // Deliberately not in request order; callers must index by id.
        let mut records: Vec<AvailabilityRecord> = ids
            .iter()
            .filter_map(|id| products.get(id))
            .map(|p| AvailabilityRecord {
                id: p.id,
                stock: p.stock,
                active: p.active,
            })
            .collect();
        records.reverse();

        Ok(records)
    }
}
