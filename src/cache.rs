//! Last-resort store for upstream payloads.
//!
//! Entries expire hard: once `now - written_at > ttl` a read returns
//! `None`, never the old payload.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub payload: Value,
    pub written_at_ms: i64,
    pub ttl_secs: u64,
}

impl CacheEntry {
    pub fn is_expired(&self, now_ms: i64) -> bool {
        now_ms - self.written_at_ms > (self.ttl_secs as i64).saturating_mul(1000)
    }
}

/// TTL family of a key. Live metrics keep longer than historical series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TtlClass {
    Live,
    History,
}

#[derive(Debug, Clone)]
pub struct StaleCache {
    entries: HashMap<String, CacheEntry>,
    overrides: HashMap<String, Duration>,
    live_ttl: Duration,
    history_ttl: Duration,
}

/// The cache is written from fetch tasks and read by the terminal.
pub type SharedCache = Arc<Mutex<StaleCache>>;

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

impl StaleCache {
    pub fn new(live_ttl: Duration, history_ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            overrides: HashMap::new(),
            live_ttl,
            history_ttl,
        }
    }

    pub fn shared(self) -> SharedCache {
        Arc::new(Mutex::new(self))
    }

    /// Pin a TTL for one key, taking precedence over its class default.
    pub fn set_ttl(&mut self, key: &str, ttl: Duration) {
        self.overrides.insert(key.to_string(), ttl);
    }

    pub fn ttl_for(&self, key: &str, class: TtlClass) -> Duration {
        if let Some(ttl) = self.overrides.get(key) {
            return *ttl;
        }
        match class {
            TtlClass::Live => self.live_ttl,
            TtlClass::History => self.history_ttl,
        }
    }

    pub fn put(&mut self, key: &str, payload: Value, class: TtlClass) {
        self.put_at(key, payload, class, now_ms());
    }

    /// Last write wins; nothing is merged.
    pub fn put_at(&mut self, key: &str, payload: Value, class: TtlClass, now_ms: i64) {
        let ttl_secs = self.ttl_for(key, class).as_secs();
        self.entries.insert(
            key.to_string(),
            CacheEntry {
                key: key.to_string(),
                payload,
                written_at_ms: now_ms,
                ttl_secs,
            },
        );
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.get_at(key, now_ms())
    }

    pub fn get_at(&self, key: &str, now_ms: i64) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired(now_ms))
            .map(|entry| &entry.payload)
    }

    /// Restore an entry as it was written, keeping its original timestamp.
    pub fn restore(&mut self, entry: CacheEntry) {
        self.entries.insert(entry.key.clone(), entry);
    }

    pub fn entries(&self) -> impl Iterator<Item = &CacheEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> StaleCache {
        StaleCache::new(Duration::from_secs(600), Duration::from_secs(300))
    }

    #[test]
    fn test_read_within_ttl() {
        let mut c = cache();
        c.put_at("hashrate", json!({"hashrate": 1.0}), TtlClass::Live, 1_000);
        assert_eq!(c.get_at("hashrate", 1_000 + 600_000), Some(&json!({"hashrate": 1.0})));
    }

    #[test]
    fn test_expired_reads_absent() {
        let mut c = cache();
        c.put_at("hashrate", json!(1), TtlClass::Live, 1_000);
        c.put_at("hashrate_max", json!(2), TtlClass::History, 1_000);
        assert_eq!(c.get_at("hashrate", 1_000 + 600_001), None);
        assert_eq!(c.get_at("hashrate_max", 1_000 + 300_001), None);
        assert!(c.get_at("hashrate_max", 1_000 + 299_999).is_some());
    }

    #[test]
    fn test_expiry_for_many_ttls() {
        for ttl in [0u64, 1, 5, 60, 300, 600, 86_400] {
            let mut c = cache();
            c.set_ttl("k", Duration::from_secs(ttl));
            let written = 50_000;
            c.put_at("k", json!(ttl), TtlClass::Live, written);
            let edge = written + ttl as i64 * 1000;
            assert!(c.get_at("k", edge).is_some(), "ttl {}", ttl);
            assert!(c.get_at("k", edge + 1).is_none(), "ttl {}", ttl);
        }
    }

    #[test]
    fn test_last_write_wins() {
        let mut c = cache();
        c.put_at("markets", json!({"a": 1}), TtlClass::Live, 0);
        c.put_at("markets", json!({"b": 2}), TtlClass::Live, 10);
        assert_eq!(c.get_at("markets", 20), Some(&json!({"b": 2})));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn test_override_beats_class() {
        let mut c = cache();
        c.set_ttl("news", Duration::from_secs(30));
        assert_eq!(c.ttl_for("news", TtlClass::Live), Duration::from_secs(30));
        assert_eq!(c.ttl_for("other", TtlClass::History), Duration::from_secs(300));
    }

    #[test]
    fn test_restored_entry_keeps_timestamp() {
        let mut c = cache();
        c.restore(CacheEntry {
            key: "supply".into(),
            payload: json!(1),
            written_at_ms: 0,
            ttl_secs: 10,
        });
        assert!(c.get_at("supply", 10_000).is_some());
        assert!(c.get_at("supply", 10_001).is_none());
    }
}
