mod models;
pub use models::*;

use crate::error::GvlError;
use futures::TryFutureExt;
use libsql::{Connection, Value};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError};

/// Local key-value persistence used by the cache manager.
///
/// `put_all` and `remove_all` must be atomic: either every key is affected
/// or none is. Removing a key that does not exist is not an error.
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str)
    -> impl Future<Output = Result<Option<StoredValue>, GvlError>> + Send;

    fn put_all(
        &self,
        entries: Vec<(&'static str, StoredValue)>,
    ) -> impl Future<Output = Result<(), GvlError>> + Send;

    fn remove_all(&self, keys: &[&str]) -> impl Future<Output = Result<(), GvlError>> + Send;
}

impl<S: KeyValueStore> KeyValueStore for Arc<S> {
    fn get(
        &self,
        key: &str,
    ) -> impl Future<Output = Result<Option<StoredValue>, GvlError>> + Send {
        (**self).get(key)
    }

    fn put_all(
        &self,
        entries: Vec<(&'static str, StoredValue)>,
    ) -> impl Future<Output = Result<(), GvlError>> + Send {
        (**self).put_all(entries)
    }

    fn remove_all(&self, keys: &[&str]) -> impl Future<Output = Result<(), GvlError>> + Send {
        (**self).remove_all(keys)
    }
}

/// Store backed by a local libsql database file.
#[derive(Clone)]
pub struct Database {
    connection: Connection,
}

impl Database {
    /// Open (or create) the database at `path`.
    pub async fn setup(path: &Path) -> Result<Self, GvlError> {
        tracing::debug!("Setting up database at {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                tracing::error!("Failed to create database directory: {}", e);
                e
            })?;
        }

        let db = libsql::Builder::new_local(path).build().await?;
        let connection = db.connect()?;

        connection.query("PRAGMA journal_mode = WAL", ()).await?;
        connection.query("PRAGMA synchronous = NORMAL", ()).await?;

        tracing::debug!("Connected to database");
        Self::ensure_db_structure(&connection).await?;

        Ok(Self { connection })
    }

    async fn ensure_db_structure(connection: &Connection) -> Result<(), GvlError> {
        tracing::trace!("Setting up database structure...");

        // The value column is left untyped on purpose: the document and the
        // version are stored as text while the timestamp is an integer.
        connection
            .execute(
                r#"
                CREATE TABLE IF NOT EXISTS gvl_store (
                    key TEXT PRIMARY KEY NOT NULL,
                    value
                )
            "#,
                (),
            )
            .await?;

        tracing::trace!("Database structure created.");

        Ok(())
    }
}

impl KeyValueStore for Database {
    #[tracing::instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, GvlError> {
        let row = self
            .connection
            .query("SELECT value FROM gvl_store WHERE key = ?1", [key])
            .await?
            .next()
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        match row.get_value(0)? {
            Value::Null => Ok(None),
            Value::Text(v) => Ok(Some(StoredValue::Text(v))),
            Value::Integer(v) => Ok(Some(StoredValue::Integer(v))),
            other => {
                tracing::warn!("Unexpected value type stored under {}: {:?}", key, other);
                Err(GvlError::CorruptValue {
                    key: key.to_owned(),
                })
            }
        }
    }

    #[tracing::instrument(skip_all, fields(count = entries.len()))]
    async fn put_all(&self, entries: Vec<(&'static str, StoredValue)>) -> Result<(), GvlError> {
        let tx = self.connection.transaction().await?;

        for (key, value) in entries {
            let value = match value {
                StoredValue::Text(v) => Value::Text(v),
                StoredValue::Integer(v) => Value::Integer(v),
            };

            tx.execute(
                "INSERT INTO gvl_store (key, value) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET value = ?2",
                libsql::params![key, value],
            )
            .map_err(GvlError::from)
            .await?;
        }

        tx.commit().await?;

        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn remove_all(&self, keys: &[&str]) -> Result<(), GvlError> {
        let tx = self.connection.transaction().await?;

        for key in keys {
            tx.execute("DELETE FROM gvl_store WHERE key = ?1", [*key])
                .map_err(GvlError::from)
                .await?;
        }

        tx.commit().await?;

        Ok(())
    }
}

/// Store that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, StoredValue>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, StoredValue>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<StoredValue>, GvlError> {
        Ok(self.entries().get(key).cloned())
    }

    async fn put_all(&self, entries: Vec<(&'static str, StoredValue)>) -> Result<(), GvlError> {
        let mut stored = self.entries();
        for (key, value) in entries {
            stored.insert(key.to_owned(), value);
        }

        Ok(())
    }

    async fn remove_all(&self, keys: &[&str]) -> Result<(), GvlError> {
        let mut stored = self.entries();
        for key in keys {
            stored.remove(*key);
        }

        Ok(())
    }
}
