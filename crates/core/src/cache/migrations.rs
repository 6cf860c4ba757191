//! Schema migrations for the store database.
//!
//! Applied versions are recorded in `_migrations`. Each pending migration runs
//! in its own transaction together with its bookkeeping row, so a failed batch
//! leaves the schema at the previous version.

use chrono::{SecondsFormat, Utc};
use tokio_rusqlite::{Connection, params, rusqlite};

use super::Error;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration { version: 1, name: "cache_stores", sql: include_str!("../../migrations/001_cache_stores.sql") },
    Migration { version: 2, name: "cache_entries", sql: include_str!("../../migrations/002_cache_entries.sql") },
];

fn latest() -> i64 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

fn apply_pending(conn: &mut rusqlite::Connection) -> Result<Vec<i64>, Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL
        )",
    )?;

    let current: i64 = conn.query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))?;
    if current > latest() {
        return Err(Error::MigrationFailed(format!(
            "database is at schema v{current}, this build knows up to v{}",
            latest()
        )));
    }

    let mut applied = Vec::new();
    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        let tx = conn.transaction()?;
        tx.execute_batch(migration.sql)
            .map_err(|e| Error::MigrationFailed(format!("v{} {}: {e}", migration.version, migration.name)))?;
        tx.execute(
            "INSERT INTO _migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)],
        )?;
        tx.commit()?;
        tracing::debug!(version = migration.version, name = migration.name, "applied cache migration");
        applied.push(migration.version);
    }

    Ok(applied)
}

/// Bring the schema up to date. Returns the versions applied by this call.
pub async fn run(conn: &Connection) -> Result<Vec<i64>, Error> {
    conn.call(apply_pending).await.map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_run_applies_nothing() {
        let conn = Connection::open_in_memory().await.unwrap();
        assert_eq!(run(&conn).await.unwrap(), vec![1, 2]);
        assert!(run(&conn).await.unwrap().is_empty());

        let tables: i64 = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master
                     WHERE type='table' AND name IN ('cache_stores', 'cache_entries')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[tokio::test]
    async fn test_newer_schema_is_refused() {
        let conn = Connection::open_in_memory().await.unwrap();
        run(&conn).await.unwrap();
        conn.call(|conn| {
            conn.execute("INSERT INTO _migrations (version, name, applied_at) VALUES (99, 'future', 'now')", [])
        })
        .await
        .unwrap();

        assert!(matches!(run(&conn).await, Err(Error::MigrationFailed(_))));
    }
}
