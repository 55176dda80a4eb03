//! Cache entry CRUD operations.
//!
//! An entry is a stored response keyed by (namespace, request identity).
//! Writes are single-statement UPSERTs, so concurrent readers observe
//! either the old or the new entry, never a partial one; last write wins.

use super::connection::CacheDb;
use super::namespace::CacheNamespace;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response.
///
/// Only successful (2xx) GET responses are ever persisted; that rule is
/// enforced by the strategy executors, not by the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub namespace: String,
    pub identity: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

/// Introspection result for one namespace, as reported over the
/// control channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceStats {
    pub namespace: String,
    pub count: u64,
    pub keys: Vec<String>,
}

impl CacheDb {
    /// Insert or overwrite an entry.
    ///
    /// Uses UPSERT semantics: inserts if the identity doesn't exist within
    /// the namespace, replaces all fields if it does.
    pub async fn put_entry(&self, entry: &CacheEntry) -> Result<(), Error> {
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO cache_entries (
                        namespace, identity, url, status, content_type,
                        headers_json, body, stored_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                    ON CONFLICT(namespace, identity) DO UPDATE SET
                        url = excluded.url,
                        status = excluded.status,
                        content_type = excluded.content_type,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        &entry.namespace,
                        &entry.identity,
                        &entry.url,
                        entry.status as i64,
                        &entry.content_type,
                        &entry.headers_json,
                        &entry.body,
                        &entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry within one namespace.
    ///
    /// Returns None on a miss. Other namespaces are never consulted.
    pub async fn match_entry(&self, namespace: &CacheNamespace, identity: &str) -> Result<Option<CacheEntry>, Error> {
        let namespace = namespace.as_str().to_string();
        let identity = identity.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT namespace, identity, url, status, content_type,
                            headers_json, body, stored_at
                    FROM cache_entries WHERE namespace = ?1 AND identity = ?2",
                )?;

                let result = stmt.query_row(params![namespace, identity], |row| {
                    Ok(CacheEntry {
                        namespace: row.get(0)?,
                        identity: row.get(1)?,
                        url: row.get(2)?,
                        status: row.get::<_, i64>(3)? as u16,
                        content_type: row.get(4)?,
                        headers_json: row.get(5)?,
                        body: row.get(6)?,
                        stored_at: row.get(7)?,
                    })
                });

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Delete one entry (explicit invalidation via the control channel).
    ///
    /// Returns true if an entry was removed.
    pub async fn delete_entry(&self, namespace: &CacheNamespace, identity: &str) -> Result<bool, Error> {
        let namespace = namespace.as_str().to_string();
        let identity = identity.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(
                    "DELETE FROM cache_entries WHERE namespace = ?1 AND identity = ?2",
                    params![namespace, identity],
                )?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete all entries of a namespace.
    ///
    /// A single statement, so the deletion is atomic from the caller's
    /// perspective. Returns the number of deleted entries.
    pub async fn delete_namespace(&self, namespace: &CacheNamespace) -> Result<u64, Error> {
        let namespace = namespace.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM cache_entries WHERE namespace = ?1", params![namespace])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Enumerate all namespaces that currently hold entries.
    ///
    /// Used by activation-time garbage collection.
    pub async fn list_namespaces(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT DISTINCT namespace FROM cache_entries ORDER BY namespace")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Count and key list for one namespace.
    pub async fn namespace_stats(&self, namespace: &CacheNamespace) -> Result<NamespaceStats, Error> {
        let namespace = namespace.as_str().to_string();
        self.conn
            .call(move |conn| -> Result<NamespaceStats, Error> {
                let mut stmt =
                    conn.prepare("SELECT url FROM cache_entries WHERE namespace = ?1 ORDER BY stored_at, url")?;
                let keys = stmt
                    .query_map(params![namespace], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(NamespaceStats { namespace, count: keys.len() as u64, keys })
            })
            .await
            .map_err(Error::from)
    }
}
