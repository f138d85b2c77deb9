use std::time::Duration;

use anyhow::Result;
use rusqlite::{params, Connection};

use crate::cache::{CacheEntry, StaleCache};

/// SQLite snapshot of the stale cache. Losing the file only costs a cold start.
pub struct CacheStore {
    conn: Connection,
}

impl CacheStore {
    pub fn new(path: &str) -> Result<Self> {
        Ok(Self { conn: Connection::open(path)? })
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self { conn: Connection::open_in_memory()? })
    }

    pub fn init(&mut self) -> Result<()> {
        self.conn.execute_batch(
            "BEGIN;
            CREATE TABLE IF NOT EXISTS cache_entries (
                key TEXT PRIMARY KEY,
                written_at_ms INTEGER NOT NULL,
                ttl_secs INTEGER NOT NULL,
                payload TEXT NOT NULL
            );
            COMMIT;",
        )?;
        Ok(())
    }

    pub fn save(&mut self, cache: &StaleCache) -> Result<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;
        for entry in cache.entries() {
            tx.execute(
                "INSERT OR REPLACE INTO cache_entries (key, written_at_ms, ttl_secs, payload)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    entry.key,
                    entry.written_at_ms,
                    entry.ttl_secs as i64,
                    entry.payload.to_string()
                ],
            )?;
            written += 1;
        }
        tx.commit()?;
        Ok(written)
    }

    /// Rebuild a cache from the snapshot. Rows whose payload no longer
    /// parses are skipped rather than failing the whole load.
    pub fn load(&self, live_ttl: Duration, history_ttl: Duration) -> Result<StaleCache> {
        let mut cache = StaleCache::new(live_ttl, history_ttl);
        let mut stmt = self
            .conn
            .prepare("SELECT key, written_at_ms, ttl_secs, payload FROM cache_entries")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, i64>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        for row in rows {
            let (key, written_at_ms, ttl_secs, payload) = row?;
            if let Ok(payload) = serde_json::from_str(&payload) {
                cache.restore(CacheEntry {
                    key,
                    payload,
                    written_at_ms,
                    ttl_secs: ttl_secs.max(0) as u64,
                });
            }
        }
        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::TtlClass;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_snapshot_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache.sqlite");
        let path = path.to_str().unwrap();

        let mut cache = StaleCache::new(Duration::from_secs(600), Duration::from_secs(300));
        cache.put_at("markets", json!([{"id": "kaspa"}]), TtlClass::Live, 1_000);
        cache.put_at("hashrate_max", json!({"hashrate": 3.0}), TtlClass::History, 2_000);

        let mut store = CacheStore::new(path).unwrap();
        store.init().unwrap();
        assert_eq!(store.save(&cache).unwrap(), 2);
        drop(store);

        let store = CacheStore::new(path).unwrap();
        let loaded = store.load(Duration::from_secs(600), Duration::from_secs(300)).unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get_at("markets", 1_500), Some(&json!([{"id": "kaspa"}])));
        // Expiry is measured from the original write, not the load.
        assert!(loaded.get_at("hashrate_max", 2_000 + 300_001).is_none());
    }

    #[test]
    fn test_save_replaces_rows() {
        let mut store = CacheStore::in_memory().unwrap();
        store.init().unwrap();
        let mut cache = StaleCache::new(Duration::from_secs(600), Duration::from_secs(300));
        cache.put_at("supply", json!(1), TtlClass::Live, 0);
        store.save(&cache).unwrap();
        cache.put_at("supply", json!(2), TtlClass::Live, 5);
        store.save(&cache).unwrap();
        let loaded = store.load(Duration::from_secs(600), Duration::from_secs(300)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.get_at("supply", 10), Some(&json!(2)));
    }
}
