//! Named request/response stores.
//!
//! Every store lives in the same SQLite file; a store is a row in
//! `cache_stores` and its entries are rows in `cache_entries` keyed by
//! `(store_name, cache_key)`. Writes are last-write-wins upserts and no
//! eviction happens below whole-store deletion.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

use super::connection::CacheDb;
use super::hash::request_key;
use crate::Error;
use crate::http::{Request, Response, ResponseType};

const ENTRY_COLUMNS: &str = "e.store_name, e.method, e.url, e.status, e.status_text, e.response_type,
     e.response_url, e.headers_json, e.body, e.stored_at";

/// Handle to one named store.
#[derive(Clone, Debug)]
pub struct Store {
    name: String,
    db: CacheDb,
}

/// Metadata about a stored entry, without the body.
#[derive(Debug, Clone, Serialize, Deserialize, schemars::JsonSchema)]
pub struct EntryInfo {
    pub store: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub response_type: String,
    pub content_type: Option<String>,
    pub body_len: usize,
    pub stored_at: String,
}

/// Row as read from SQLite, decoded into a [`Response`] outside the
/// connection thread.
struct RawEntry {
    store_name: String,
    method: String,
    url: String,
    status: u16,
    status_text: String,
    response_type: String,
    response_url: String,
    headers_json: String,
    body: Vec<u8>,
    stored_at: String,
}

impl RawEntry {
    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            store_name: row.get(0)?,
            method: row.get(1)?,
            url: row.get(2)?,
            status: row.get(3)?,
            status_text: row.get(4)?,
            response_type: row.get(5)?,
            response_url: row.get(6)?,
            headers_json: row.get(7)?,
            body: row.get(8)?,
            stored_at: row.get(9)?,
        })
    }

    fn headers(&self) -> Result<Vec<(String, String)>, Error> {
        serde_json::from_str(&self.headers_json).map_err(|e| Error::CorruptEntry(format!("{}: {e}", self.url)))
    }

    fn into_response(self) -> Result<Response, Error> {
        let headers = self.headers()?;
        let response_type: ResponseType = self.response_type.parse()?;
        Ok(Response {
            status: self.status,
            status_text: self.status_text,
            response_type,
            url: self.response_url,
            headers,
            body: self.body.into(),
        })
    }

    fn into_info(self) -> Result<EntryInfo, Error> {
        let content_type = self
            .headers()?
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("content-type"))
            .map(|(_, v)| v);
        Ok(EntryInfo {
            store: self.store_name,
            method: self.method,
            url: self.url,
            status: self.status,
            response_type: self.response_type,
            content_type,
            body_len: self.body.len(),
            stored_at: self.stored_at,
        })
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ensure_store(conn: &rusqlite::Connection, name: &str) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO cache_stores (name, created_at) VALUES (?1, ?2)",
        params![name, now()],
    )?;
    Ok(())
}

impl CacheDb {
    /// Open a named store, creating it if needed.
    pub async fn open_store(&self, name: &str) -> Result<Store, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidInput("store name cannot be empty".into()));
        }
        let owned = name.to_string();
        self.conn
            .call(move |conn| ensure_store(conn, &owned))
            .await
            .map_err(Error::from)?;
        Ok(Store { name: name.to_string(), db: self.clone() })
    }

    /// Whether a store with this name exists.
    pub async fn has_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<_> {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM cache_stores WHERE name = ?1)",
                    params![name],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(Error::from)
    }

    /// All store names, in creation order.
    pub async fn store_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> rusqlite::Result<_> {
                let mut stmt = conn.prepare("SELECT name FROM cache_stores ORDER BY seq ASC")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Remove a store and every entry in it.
    ///
    /// Returns false if no such store existed.
    pub async fn delete_store(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> rusqlite::Result<_> {
                let tx = conn.transaction()?;
                tx.execute("DELETE FROM cache_entries WHERE store_name = ?1", params![name])?;
                let removed = tx.execute("DELETE FROM cache_stores WHERE name = ?1", params![name])?;
                tx.commit()?;
                Ok(removed > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up in every store.
    ///
    /// When several stores hold the key, the most recently written entry
    /// wins, so a refreshed dynamic copy supersedes the install-time one.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let key = request_key(request);
        let raw = self
            .conn
            .call(move |conn| -> rusqlite::Result<_> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS}
                     FROM cache_entries e JOIN cache_stores s ON s.name = e.store_name
                     WHERE e.cache_key = ?1
                     ORDER BY e.stored_at DESC, s.seq DESC
                     LIMIT 1"
                );
                let result = conn.query_row(&sql, params![key], RawEntry::from_row);
                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::into_response).transpose()
    }

    /// Entry metadata for a request, optionally restricted to one store.
    pub async fn entry_info(&self, store: Option<&str>, request: &Request) -> Result<Option<EntryInfo>, Error> {
        let key = request_key(request);
        let store = store.map(str::to_string);
        let raw = self
            .conn
            .call(move |conn| -> rusqlite::Result<_> {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS}
                     FROM cache_entries e JOIN cache_stores s ON s.name = e.store_name
                     WHERE e.cache_key = ?1 AND (?2 IS NULL OR e.store_name = ?2)
                     ORDER BY e.stored_at DESC, s.seq DESC
                     LIMIT 1"
                );
                let result = conn.query_row(&sql, params![key, store], RawEntry::from_row);
                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::into_info).transpose()
    }

    /// Delete entries whose URL contains `pattern`, in one store or across all.
    ///
    /// The match is a plain, case-sensitive substring test.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_entries_by_url(&self, store: Option<&str>, pattern: &str) -> Result<u64, Error> {
        let pattern = pattern.to_string();
        let store = store.map(str::to_string);
        self.conn
            .call(move |conn| -> rusqlite::Result<_> {
                let count = match store {
                    Some(name) => conn.execute(
                        "DELETE FROM cache_entries WHERE store_name = ?1 AND instr(url, ?2) > 0",
                        params![name, pattern],
                    )?,
                    None => conn.execute("DELETE FROM cache_entries WHERE instr(url, ?1) > 0", params![pattern])?,
                };
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}

impl Store {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store a response under the request's key, replacing any prior entry.
    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        let headers_json = serde_json::to_string(&response.headers)
            .map_err(|e| Error::InvalidInput(format!("unserializable headers: {e}")))?;
        let name = self.name.clone();
        let key = request_key(request);
        let method = request.method.clone();
        let url = request.url.to_string();
        let status = response.status;
        let status_text = response.status_text.clone();
        let response_type = response.response_type.as_str();
        let response_url = response.url.clone();
        let body = response.body.to_vec();

        self.db
            .conn
            .call(move |conn| -> rusqlite::Result<_> {
                ensure_store(conn, &name)?;
                conn.execute(
                    "INSERT INTO cache_entries (
                        store_name, cache_key, method, url, status, status_text,
                        response_type, response_url, headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                    ON CONFLICT(store_name, cache_key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        status_text = excluded.status_text,
                        response_type = excluded.response_type,
                        response_url = excluded.response_url,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        name,
                        key,
                        method,
                        url,
                        status,
                        status_text,
                        response_type,
                        response_url,
                        headers_json,
                        body,
                        now()
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look a request up in this store only.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        let name = self.name.clone();
        let key = request_key(request);
        let raw = self
            .db
            .conn
            .call(move |conn| -> rusqlite::Result<_> {
                let sql = format!("SELECT {ENTRY_COLUMNS} FROM cache_entries e WHERE e.store_name = ?1 AND e.cache_key = ?2");
                let result = conn.query_row(&sql, params![name, key], RawEntry::from_row);
                match result {
                    Ok(raw) => Ok(Some(raw)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(Error::from)?;

        raw.map(RawEntry::into_response).transpose()
    }

    pub async fn len(&self) -> Result<u64, Error> {
        let name = self.name.clone();
        self.db
            .conn
            .call(move |conn| -> rusqlite::Result<_> {
                conn.query_row(
                    "SELECT COUNT(*) FROM cache_entries WHERE store_name = ?1",
                    params![name],
                    |row| row.get::<_, i64>(0),
                )
            })
            .await
            .map(|n| n as u64)
            .map_err(Error::from)
    }

    pub async fn is_empty(&self) -> Result<bool, Error> {
        Ok(self.len().await? == 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn get(url: &str) -> Request {
        Request::get(Url::parse(url).unwrap())
    }

    fn ok(url: &str, body: &'static str) -> Response {
        Response::new(200, ResponseType::Basic, url, body).with_header("Content-Type", "text/html")
    }

    #[tokio::test]
    async fn test_open_store_idempotent() {
        let db = CacheDb::open_in_memory().await.unwrap();
        db.open_store("budgetwise-static-v1").await.unwrap();
        db.open_store("budgetwise-static-v1").await.unwrap();
        assert_eq!(db.store_names().await.unwrap(), vec!["budgetwise-static-v1"]);
    }

    #[tokio::test]
    async fn test_open_store_rejects_empty_name() {
        let db = CacheDb::open_in_memory().await.unwrap();
        assert!(matches!(db.open_store("  ").await, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("budgetwise-dynamic-v1").await.unwrap();
        let req = get("https://app.test/index.html");

        store.put(&req, &ok("https://app.test/index.html", "<html>v1</html>")).await.unwrap();

        let hit = store.match_request(&req).await.unwrap().unwrap();
        assert_eq!(hit.status, 200);
        assert_eq!(hit.response_type, ResponseType::Basic);
        assert_eq!(&hit.body[..], b"<html>v1</html>");
        assert_eq!(hit.content_type(), Some("text/html"));
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("budgetwise-dynamic-v1").await.unwrap();
        let req = get("https://app.test/app.js");

        store.put(&req, &ok("https://app.test/app.js", "one")).await.unwrap();
        store.put(&req, &ok("https://app.test/app.js", "two")).await.unwrap();

        assert_eq!(store.len().await.unwrap(), 1);
        let hit = store.match_request(&req).await.unwrap().unwrap();
        assert_eq!(&hit.body[..], b"two");
    }

    #[tokio::test]
    async fn test_match_missing_is_none() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("budgetwise-dynamic-v1").await.unwrap();
        assert!(store.match_request(&get("https://app.test/nope")).await.unwrap().is_none());
        assert!(db.match_request(&get("https://app.test/nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_match_across_stores_prefers_latest_write() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let statics = db.open_store("budgetwise-static-v1").await.unwrap();
        let dynamic = db.open_store("budgetwise-dynamic-v1").await.unwrap();
        let req = get("https://app.test/index.html");

        statics.put(&req, &ok("https://app.test/index.html", "precached")).await.unwrap();
        dynamic.put(&req, &ok("https://app.test/index.html", "refreshed")).await.unwrap();

        let hit = db.match_request(&req).await.unwrap().unwrap();
        assert_eq!(&hit.body[..], b"refreshed");
    }

    #[tokio::test]
    async fn test_delete_store_removes_entries() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("budgetwise-static-v0").await.unwrap();
        let req = get("https://app.test/");
        store.put(&req, &ok("https://app.test/", "old")).await.unwrap();

        assert!(db.delete_store("budgetwise-static-v0").await.unwrap());
        assert!(!db.delete_store("budgetwise-static-v0").await.unwrap());
        assert!(!db.has_store("budgetwise-static-v0").await.unwrap());
        assert!(db.match_request(&req).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_recreates_deleted_store() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("budgetwise-dynamic-v1").await.unwrap();
        db.delete_store("budgetwise-dynamic-v1").await.unwrap();

        store.put(&get("https://app.test/a.css"), &ok("https://app.test/a.css", "a{}")).await.unwrap();
        assert!(db.has_store("budgetwise-dynamic-v1").await.unwrap());
    }

    #[tokio::test]
    async fn test_store_names_creation_order() {
        let db = CacheDb::open_in_memory().await.unwrap();
        for name in ["budgetwise-v1", "budgetwise-static-v1", "other-app"] {
            db.open_store(name).await.unwrap();
        }
        assert_eq!(db.store_names().await.unwrap(), vec!["budgetwise-v1", "budgetwise-static-v1", "other-app"]);
    }

    #[tokio::test]
    async fn test_entry_info_and_purge() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("budgetwise-dynamic-v1").await.unwrap();
        let req = get("https://app.test/api/budgets");
        store.put(&req, &ok("https://app.test/api/budgets", "[]")).await.unwrap();

        let info = db.entry_info(None, &req).await.unwrap().unwrap();
        assert_eq!(info.store, "budgetwise-dynamic-v1");
        assert_eq!(info.body_len, 2);
        assert_eq!(info.content_type.as_deref(), Some("text/html"));
        assert!(db.entry_info(Some("budgetwise-static-v1"), &req).await.unwrap().is_none());

        let other = db.open_store("budgetwise-static-v1").await.unwrap();
        other.put(&req, &ok("https://app.test/api/budgets", "[]")).await.unwrap();

        assert_eq!(db.purge_entries_by_url(Some("budgetwise-static-v1"), "/api/").await.unwrap(), 1);
        assert!(other.is_empty().await.unwrap());
        assert!(!store.is_empty().await.unwrap());

        assert_eq!(db.purge_entries_by_url(None, "/api/").await.unwrap(), 1);
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn test_purge_pattern_is_literal_substring() {
        let db = CacheDb::open_in_memory().await.unwrap();
        let store = db.open_store("budgetwise-dynamic-v1").await.unwrap();
        for url in ["https://app.test/API_x", "https://app.test/api/x", "https://app.test/apix"] {
            store.put(&get(url), &ok(url, "x")).await.unwrap();
        }

        assert_eq!(db.purge_entries_by_url(None, "_").await.unwrap(), 1);
        assert_eq!(db.purge_entries_by_url(None, "%").await.unwrap(), 0);
        assert_eq!(db.purge_entries_by_url(None, "/API").await.unwrap(), 0);
        assert_eq!(store.len().await.unwrap(), 2);
        assert!(db.match_request(&get("https://app.test/API_x")).await.unwrap().is_none());
    }
}
