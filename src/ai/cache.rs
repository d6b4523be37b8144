//! Response cache with per-entry expiry.
//!
//! One `ai_cache` row per fingerprint. Expired rows are ignored on read and
//! left in place; they are only removed by [`ResponseCache::clear`],
//! [`ResponseCache::purge_expired`] or by being overwritten.

use std::time::Duration;

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::db::SharedDb;

/// Fingerprint prefixes for the three operations.
pub mod prefix {
    pub const TAGS: &str = "tags";
    pub const SUMMARY: &str = "summary";
    pub const SIMILAR: &str = "similar";
}

/// Default entry lifetime.
pub const DEFAULT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Number of leading characters of the content that go into a fingerprint.
const KEY_CONTENT_CHARS: usize = 100;

/// A stored entry. Times are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    pub data: T,
    pub timestamp: i64,
    pub expires_at: i64,
}

impl<T> CacheEntry<T> {
    pub fn is_valid_at(&self, now_ms: i64) -> bool {
        now_ms <= self.expires_at
    }
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub expired_entries: usize,
    pub active_entries: usize,
}

/// Cache of AI responses backed by the shared database.
#[derive(Clone)]
pub struct ResponseCache {
    db: SharedDb,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(db: SharedDb) -> Self {
        Self::with_ttl(db, DEFAULT_TTL)
    }

    pub fn with_ttl(db: SharedDb, default_ttl: Duration) -> Self {
        Self { db, default_ttl }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Build a fingerprint from an operation prefix and the input content:
    /// the first 100 characters, whitespace removed, lower-cased.
    ///
    /// Not a cryptographic hash; inputs sharing a normalized prefix collide.
    pub fn create_key(prefix: &str, content: &str) -> String {
        let hash: String = content
            .chars()
            .take(KEY_CONTENT_CHARS)
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        format!("{prefix}_{hash}")
    }

    /// Fingerprint for an operation over `content` and a candidate list.
    ///
    /// The content part is [`create_key`](Self::create_key); every item is
    /// then appended in full, length-prefixed, so lists that differ in any
    /// item, order or split never share a key.
    pub fn create_list_key(prefix: &str, content: &str, items: &[String]) -> String {
        let mut key = Self::create_key(prefix, content);
        key.push_str(&format!("#{}", items.len()));
        for item in items {
            key.push_str(&format!("|{}:{item}", item.chars().count()));
        }
        key
    }

    /// Cached value for `key`, if present and unexpired.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_at(key, now_ms())
    }

    /// [`get`](Self::get) against an explicit clock. Storage and decoding
    /// problems are logged and reported as a miss.
    pub fn get_at<T: DeserializeOwned>(&self, key: &str, now_ms: i64) -> Option<T> {
        let entry = match self.load_entry::<T>(key) {
            Ok(entry) => entry?,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        if entry.is_valid_at(now_ms) {
            tracing::debug!(key, "cache hit");
            Some(entry.data)
        } else {
            tracing::debug!(key, expires_at = entry.expires_at, "cache entry expired");
            None
        }
    }

    /// Store `value` under `key` with the default TTL.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> Result<()> {
        self.set_at(key, value, ttl, now_ms())
    }

    /// [`set_with_ttl`](Self::set_with_ttl) against an explicit clock.
    /// Overwrites any previous entry for `key`.
    pub fn set_at<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
        now_ms: i64,
    ) -> Result<()> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let data = serde_json::to_string(value)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO ai_cache (key, data, timestamp, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![key, data, now_ms, now_ms.saturating_add(ttl_ms)],
        )?;
        Ok(())
    }

    /// Remove every entry.
    pub fn clear(&self) -> Result<()> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM ai_cache", [])?;
        tracing::info!(removed, "AI cache cleared");
        Ok(())
    }

    /// Remove expired entries. Returns how many were deleted.
    pub fn purge_expired(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM ai_cache WHERE expires_at < ?1", [now_ms()])?;
        tracing::info!(removed, "expired AI cache entries purged");
        Ok(removed)
    }

    pub fn stats(&self) -> Result<CacheStats> {
        let conn = self.lock()?;
        let (total, expired): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(expires_at < ?1), 0) FROM ai_cache",
            [now_ms()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let total = usize::try_from(total).unwrap_or(0);
        let expired = usize::try_from(expired).unwrap_or(0);
        Ok(CacheStats {
            total_entries: total,
            expired_entries: expired,
            active_entries: total.saturating_sub(expired),
        })
    }

    fn load_entry<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT data, timestamp, expires_at FROM ai_cache WHERE key = ?1",
                [key],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            )
            .optional()?;
        drop(conn);

        let Some((data, timestamp, expires_at)) = row else {
            return Ok(None);
        };
        Ok(Some(CacheEntry {
            data: serde_json::from_str(&data)?,
            timestamp,
            expires_at,
        }))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|e| anyhow!("database lock poisoned: {e}"))
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
