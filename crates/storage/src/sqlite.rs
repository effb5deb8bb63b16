use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use serde_json::Value;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use tokio::runtime::Runtime;
use tokio::sync::Mutex;

use crate::store::SnapshotStore;

/// SQLite-backed snapshot store.
///
/// The pool is created lazily on first use so constructing a store never
/// touches the filesystem. Wrapped in `Arc<Mutex<_>>` so handles clone
/// cheaply across threads.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: Arc<Mutex<Option<SqlitePool>>>,
    db_path: Option<PathBuf>,
}

impl SqliteStore {
    /// Store backed by the platform data directory
    /// (`{app_data_dir}/vendora/store.db`).
    pub fn new() -> Self {
        Self {
            pool: Arc::new(Mutex::new(None)),
            db_path: None,
        }
    }

    /// Store backed by an explicit database file.
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            pool: Arc::new(Mutex::new(None)),
            db_path: Some(path.into()),
        }
    }

    async fn ensure_initialized(&self) -> anyhow::Result<()> {
        let mut pool_guard = self.pool.lock().await;
        if pool_guard.is_some() {
            return Ok(());
        }

        let db_path = match &self.db_path {
            Some(path) => path.clone(),
            None => default_db_path()
                .context("failed to determine snapshot DB path - ensure app data directory is accessible")?,
        };

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create snapshot directory at {parent:?}"))?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.to_string_lossy()))
            .with_context(|| format!("invalid SQLite path {db_path:?}"))?
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("failed to create SQLite pool at {db_path:?}"))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                key      TEXT NOT NULL PRIMARY KEY,
                data     TEXT NOT NULL,
                saved_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create snapshots table")?;

        *pool_guard = Some(pool);
        Ok(())
    }

    async fn get_pool(&self) -> anyhow::Result<SqlitePool> {
        self.ensure_initialized().await?;
        let pool_guard = self.pool.lock().await;
        pool_guard
            .as_ref()
            .cloned()
            .context("snapshot pool missing after initialization")
    }

    async fn save_inner(&self, key: &str, value: &Value) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;
        let payload = serde_json::to_string(value).context("failed to serialize snapshot")?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO snapshots (key, data, saved_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key)
            DO UPDATE SET
                data = excluded.data,
                saved_at = excluded.saved_at
            "#,
        )
        .bind(key)
        .bind(&payload)
        .bind(&now)
        .execute(&pool)
        .await
        .context("failed to upsert snapshot")?;

        Ok(())
    }

    async fn load_inner(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let pool = self.get_pool().await?;

        let row = sqlx::query(
            r#"
            SELECT data
            FROM snapshots
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&pool)
        .await
        .context("failed to fetch snapshot")?;

        let row = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let data: String = row.try_get("data")?;
        let value = serde_json::from_str(&data).context("failed to deserialize snapshot")?;

        Ok(Some(value))
    }

    async fn delete_inner(&self, key: &str) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;

        sqlx::query(
            r#"
            DELETE FROM snapshots
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .execute(&pool)
        .await
        .context("failed to delete snapshot")?;

        Ok(())
    }
}

impl Default for SqliteStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotStore for SqliteStore {
    fn save(&self, key: &str, value: &Value) {
        if let Err(err) = run_blocking(self.save_inner(key, value)) {
            tracing::error!(key, "failed to save snapshot: {err:?}");
        }
    }

    fn load(&self, key: &str) -> Option<Value> {
        match run_blocking(self.load_inner(key)) {
            Ok(value) => value,
            Err(err) => {
                tracing::error!(key, "failed to load snapshot: {err:?}");
                None
            }
        }
    }

    fn delete(&self, key: &str) {
        if let Err(err) = run_blocking(self.delete_inner(key)) {
            tracing::error!(key, "failed to delete snapshot: {err:?}");
        }
    }
}

/// Drive a snapshot future to completion from any calling context.
///
/// The one-off runtime lives on a scoped thread: `block_on` directly on the
/// caller's thread would panic when that thread is already driving a tokio
/// runtime (the engine's reconciliation path is async and persists from
/// inside it).
fn run_blocking<T, F>(future: F) -> anyhow::Result<T>
where
    F: Future<Output = anyhow::Result<T>> + Send,
    T: Send,
{
    std::thread::scope(|scope| {
        scope
            .spawn(|| {
                let rt = Runtime::new().context("failed to create runtime for snapshot IO")?;
                rt.block_on(future)
            })
            .join()
            .unwrap_or_else(|_| Err(anyhow::anyhow!("snapshot IO thread panicked")))
    })
}

/// Resolve the default database path: `{app_data_dir}/vendora/store.db`.
fn default_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut dir = base;
    dir.push("vendora");

    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create snapshot directory at {dir:?}"))?;

    dir.push("store.db");

    Ok(dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn save_load_delete_against_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::at_path(dir.path().join("store.db"));

        assert_eq!(store.load("cart"), None);

        store.save("cart", &json!({"items": [{"id": 1, "quantity": 2}]}));
        assert_eq!(
            store.load("cart"),
            Some(json!({"items": [{"id": 1, "quantity": 2}]}))
        );

        store.save("cart", &json!({"items": []}));
        assert_eq!(store.load("cart"), Some(json!({"items": []})));

        store.delete("cart");
        store.delete("cart");
        assert_eq!(store.load("cart"), None);
    }

    #[tokio::test]
    async fn snapshot_io_works_inside_an_async_context() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::at_path(dir.path().join("store.db"));

        // The engine persists from inside its async reconciliation path;
        // these calls must not panic under a live runtime.
        store.save("cart", &json!([{"id": 1, "quantity": 2}]));
        assert_eq!(store.load("cart"), Some(json!([{"id": 1, "quantity": 2}])));

        store.delete("cart");
        assert_eq!(store.load("cart"), None);
    }

    #[test]
    fn snapshots_survive_reopening_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.db");

        {
            let store = SqliteStore::at_path(&path);
            store.save("wishlist", &json!([{"id": 7}]));
        }

        let reopened = SqliteStore::at_path(&path);
        assert_eq!(reopened.load("wishlist"), Some(json!([{"id": 7}])));
    }
}
