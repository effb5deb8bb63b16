use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;

use crate::store::SnapshotStore;

/// In-process snapshot store for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SnapshotStore for MemoryStore {
    fn save(&self, key: &str, value: &Value) {
        self.entries().insert(key.to_string(), value.clone());
    }

    fn load(&self, key: &str) -> Option<Value> {
        self.entries().get(key).cloned()
    }

    fn delete(&self, key: &str) {
        self.entries().remove(key);
    }
}
