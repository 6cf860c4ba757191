//! The SQLite file behind every named store.

use std::path::Path;

use tokio_rusqlite::Connection;

use super::migrations;
use crate::Error;

/// WAL keeps readers (route lookups) off the writer's lock; foreign keys make
/// deleting a store cascade to its entries.
const PRAGMAS: &[(&str, &str)] = &[
    ("journal_mode", "WAL"),
    ("synchronous", "NORMAL"),
    ("temp_store", "MEMORY"),
    ("foreign_keys", "ON"),
];

/// Handle to the store database. Clones share one background connection.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
}

impl CacheDb {
    /// Open (or create) the database file, creating its directory if needed.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)
                .map_err(|e| Error::InvalidInput(format!("cannot create {}: {e}", dir.display())))?;
        }

        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        let (db, applied) = Self::prepare(conn).await?;
        tracing::info!(path = %path.display(), migrations_applied = applied.len(), "opened cache database");
        Ok(db)
    }

    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        let (db, _) = Self::prepare(conn).await?;
        Ok(db)
    }

    async fn prepare(conn: Connection) -> Result<(Self, Vec<i64>), Error> {
        let pragmas: String = PRAGMAS
            .iter()
            .map(|(name, value)| format!("PRAGMA {name}={value};"))
            .collect();
        conn.call(move |conn| conn.execute_batch(&pragmas))
        .await
        .map_err(Error::Database)?;

        let applied = migrations::run(&conn).await?;
        Ok((Self { conn }, applied))
    }
}
