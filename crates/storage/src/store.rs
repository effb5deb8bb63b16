use serde_json::Value;

/// Keyed JSON snapshot storage.
///
/// Implementations must swallow their own failures: `save` and `delete` log
/// and return, `load` logs and returns `None`. Callers treat a `None` load the
/// same as an absent key and fall back to empty defaults.
pub trait SnapshotStore: Send + Sync {
    /// Persist `value` under `key`, replacing any previous snapshot.
    fn save(&self, key: &str, value: &Value);

    /// Fetch the snapshot stored under `key`, if any.
    fn load(&self, key: &str) -> Option<Value>;

    /// Drop the snapshot stored under `key`. Idempotent.
    fn delete(&self, key: &str);
}
