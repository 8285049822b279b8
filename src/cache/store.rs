//! File-backed TTL cache store.
//!
//! Each entry is two files named by the hashed key: `<hash>.meta.json`
//! holding inspection metadata (service, endpoint, url, timestamps) and
//! `<hash>.json` holding the payload, so listings never deserialize
//! potentially large payloads. Expiry is lazy on read plus a periodic
//! sweep; when total size exceeds the configured ceiling the
//! oldest-inserted entries are evicted first.
//!
//! Every storage I/O error is swallowed and treated as a miss/no-op:
//! caching must never fail an otherwise-successful call.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::debug;

use super::key::CacheKey;
use crate::Result;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Size ceiling for the whole cache directory (payload + metadata).
    pub max_total_bytes: u64,
    /// Minimum interval between opportunistic sweeps triggered by `set`.
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_total_bytes: 50 * 1024 * 1024,
            sweep_interval: Duration::from_secs(300),
        }
    }
}

/// Inspection metadata persisted next to each payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryMetadata {
    pub key: String,
    pub service: String,
    pub endpoint: String,
    pub url: String,
    pub timestamp_ms: u64,
    pub ttl_seconds: i64,
}

impl EntryMetadata {
    pub fn is_expired_at(&self, now_ms: u64) -> bool {
        now_ms >= self.timestamp_ms + self.ttl_seconds.max(0) as u64 * 1000
    }

    /// `service.endpoint` name used for pattern clearing.
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.service, self.endpoint)
    }
}

/// One listed entry with its computed state.
#[derive(Debug, Clone)]
pub struct CacheEntryInfo {
    pub metadata: EntryMetadata,
    pub size_bytes: u64,
    pub expired: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub total_entries: usize,
    pub total_size_bytes: u64,
    pub oldest_ms: Option<u64>,
    pub newest_ms: Option<u64>,
}

/// TTL-bounded, size-bounded key/value store rooted at an explicitly
/// configured directory.
pub struct FileCacheStore {
    root: PathBuf,
    config: CacheConfig,
    last_sweep_ms: AtomicU64,
}

impl FileCacheStore {
    pub fn new(root: impl Into<PathBuf>, config: CacheConfig) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            config,
            last_sweep_ms: AtomicU64::new(0),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn data_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{hash}.json"))
    }

    fn meta_path(&self, hash: &str) -> PathBuf {
        self.root.join(format!("{hash}.meta.json"))
    }

    /// Read an entry, lazily deleting it when expired.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.get_at(key, now_ms())
    }

    pub(crate) fn get_at(&self, key: &CacheKey, now_ms: u64) -> Option<Value> {
        let meta = self.read_meta(&self.meta_path(&key.hash))?;
        if meta.is_expired_at(now_ms) {
            debug!(key = %key, "cache entry expired, deleting");
            self.remove_entry(&key.hash);
            return None;
        }
        let bytes = match fs::read(self.data_path(&key.hash)) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(key = %key, error = %e, "cache data read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_slice(&bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(key = %key, error = %e, "cache data corrupt, deleting");
                self.remove_entry(&key.hash);
                None
            }
        }
    }

    /// Store a payload. A non-positive TTL makes this a no-op. Write
    /// failures are logged and ignored; same-key writes are idempotent
    /// for identical inputs, so external interleaving needs no locking.
    pub fn set(&self, key: &CacheKey, data: &Value, ttl_seconds: i64, url: &str) {
        self.set_at(key, data, ttl_seconds, url, now_ms());
        self.maybe_sweep();
    }

    pub(crate) fn set_at(&self, key: &CacheKey, data: &Value, ttl_seconds: i64, url: &str, now_ms: u64) {
        if ttl_seconds <= 0 {
            return;
        }
        let meta = EntryMetadata {
            key: key.hash.clone(),
            service: key.service.clone(),
            endpoint: key.endpoint.clone(),
            url: url.to_string(),
            timestamp_ms: now_ms,
            ttl_seconds,
        };
        // Data first, metadata last: an entry without metadata is
        // invisible to readers and listings.
        let write = fs::write(self.data_path(&key.hash), data.to_string()).and_then(|_| {
            fs::write(
                self.meta_path(&key.hash),
                serde_json::to_string(&meta).unwrap_or_default(),
            )
        });
        if let Err(e) = write {
            debug!(key = %key, error = %e, "cache write failed, skipping");
            self.remove_entry(&key.hash);
        }
    }

    /// Delete every entry, returning how many were removed.
    pub fn clear_all(&self) -> usize {
        let mut count = 0;
        for (meta, _) in self.read_entries() {
            self.remove_entry(&meta.key);
            count += 1;
        }
        count
    }

    /// Delete entries whose `service.endpoint` name matches the
    /// pattern. `service.*` matches every endpoint of a service.
    pub fn clear_by_pattern(&self, pattern: &str) -> usize {
        let mut count = 0;
        for (meta, _) in self.read_entries() {
            let matches = match pattern.strip_suffix(".*") {
                Some(service) => meta.service == service,
                None => meta.qualified_name() == pattern,
            };
            if matches {
                self.remove_entry(&meta.key);
                count += 1;
            }
        }
        count
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for (meta, size) in self.read_entries() {
            stats.total_entries += 1;
            stats.total_size_bytes += size;
            stats.oldest_ms = Some(match stats.oldest_ms {
                Some(oldest) => oldest.min(meta.timestamp_ms),
                None => meta.timestamp_ms,
            });
            stats.newest_ms = Some(match stats.newest_ms {
                Some(newest) => newest.max(meta.timestamp_ms),
                None => meta.timestamp_ms,
            });
        }
        stats
    }

    /// List every entry with its computed size and expiry state, without
    /// touching payload files beyond their length.
    pub fn list_all(&self) -> Vec<CacheEntryInfo> {
        self.list_all_at(now_ms())
    }

    pub(crate) fn list_all_at(&self, now_ms: u64) -> Vec<CacheEntryInfo> {
        let mut entries: Vec<CacheEntryInfo> = self
            .read_entries()
            .into_iter()
            .map(|(metadata, size_bytes)| CacheEntryInfo {
                expired: metadata.is_expired_at(now_ms),
                metadata,
                size_bytes,
            })
            .collect();
        entries.sort_by_key(|e| e.metadata.timestamp_ms);
        entries
    }

    /// Purge expired entries, then evict oldest-inserted entries until
    /// total size is under the configured ceiling. Insertion order, not
    /// access order.
    pub fn sweep(&self) {
        self.sweep_at(now_ms());
    }

    pub(crate) fn sweep_at(&self, now_ms: u64) {
        let mut live: Vec<(EntryMetadata, u64)> = Vec::new();
        let mut total: u64 = 0;
        for (meta, size) in self.read_entries() {
            if meta.is_expired_at(now_ms) {
                self.remove_entry(&meta.key);
            } else {
                total += size;
                live.push((meta, size));
            }
        }

        live.sort_by_key(|(meta, _)| meta.timestamp_ms);
        let mut oldest_first = live.into_iter();
        while total > self.config.max_total_bytes {
            let Some((meta, size)) = oldest_first.next() else {
                break;
            };
            debug!(key = %meta.key, "evicting cache entry for size pressure");
            self.remove_entry(&meta.key);
            total = total.saturating_sub(size);
        }
    }

    fn maybe_sweep(&self) {
        let now = now_ms();
        let last = self.last_sweep_ms.load(Ordering::Relaxed);
        if now.saturating_sub(last) < self.config.sweep_interval.as_millis() as u64 {
            return;
        }
        if self
            .last_sweep_ms
            .compare_exchange(last, now, Ordering::Relaxed, Ordering::Relaxed)
            .is_ok()
        {
            self.sweep_at(now);
        }
    }

    fn remove_entry(&self, hash: &str) {
        for path in [self.data_path(hash), self.meta_path(hash)] {
            if let Err(e) = fs::remove_file(&path) {
                if e.kind() != std::io::ErrorKind::NotFound {
                    debug!(path = %path.display(), error = %e, "cache delete failed");
                }
            }
        }
    }

    fn read_meta(&self, path: &Path) -> Option<EntryMetadata> {
        let bytes = fs::read(path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(meta) => Some(meta),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "cache metadata corrupt, ignoring");
                None
            }
        }
    }

    /// Enumerate `(metadata, entry size)` for every entry on disk.
    /// Entry size counts both the payload and the metadata file.
    fn read_entries(&self) -> Vec<(EntryMetadata, u64)> {
        let Ok(dir) = fs::read_dir(&self.root) else {
            return Vec::new();
        };
        let mut entries = Vec::new();
        for entry in dir.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(".meta.json") {
                continue;
            }
            let Some(meta) = self.read_meta(&path) else {
                continue;
            };
            let meta_size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            let data_size = fs::metadata(self.data_path(&meta.key))
                .map(|m| m.len())
                .unwrap_or(0);
            entries.push((meta, meta_size + data_size));
        }
        entries
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn key(hash: &str, service: &str, endpoint: &str) -> CacheKey {
        CacheKey {
            hash: hash.to_string(),
            service: service.to_string(),
            endpoint: endpoint.to_string(),
        }
    }

    fn store(dir: &Path) -> FileCacheStore {
        FileCacheStore::new(dir, CacheConfig::default()).unwrap()
    }

    #[test]
    fn round_trip_before_ttl() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let k = key("abc", "gh", "repos");
        let payload = json!({ "items": [1, 2, 3] });

        store.set_at(&k, &payload, 60, "https://x/y", 1_000);
        assert_eq!(store.get_at(&k, 1_000 + 59_999).unwrap(), payload);
    }

    #[test]
    fn expired_entry_is_deleted_on_read() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let k = key("abc", "gh", "repos");

        store.set_at(&k, &json!({ "v": 1 }), 60, "https://x/y", 1_000);
        assert!(store.get_at(&k, 1_000 + 60_000).is_none());
        // Files are gone, not just skipped.
        assert!(store.list_all().is_empty());
        assert_eq!(store.stats(), CacheStats::default());
    }

    #[test]
    fn non_positive_ttl_is_a_noop() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let k = key("abc", "gh", "repos");

        store.set_at(&k, &json!(1), 0, "https://x/y", 1_000);
        store.set_at(&k, &json!(1), -5, "https://x/y", 1_000);
        assert!(store.get_at(&k, 1_001).is_none());
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn clear_all_counts_entries() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.set_at(&key("a", "gh", "repos"), &json!(1), 60, "u", 1_000);
        store.set_at(&key("b", "gh", "issues"), &json!(2), 60, "u", 1_000);

        assert_eq!(store.clear_all(), 2);
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn clear_by_pattern_matches_qualified_name() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.set_at(&key("a", "gh", "repos"), &json!(1), 60, "u", 1_000);
        store.set_at(&key("b", "gh", "issues"), &json!(2), 60, "u", 1_000);
        store.set_at(&key("c", "gitlab", "repos"), &json!(3), 60, "u", 1_000);

        assert_eq!(store.clear_by_pattern("gh.repos"), 1);
        assert_eq!(store.clear_by_pattern("gh.*"), 1);
        assert_eq!(store.list_all().len(), 1);
        assert_eq!(store.list_all()[0].metadata.service, "gitlab");
    }

    #[test]
    fn stats_track_totals_and_age_bounds() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.set_at(&key("a", "gh", "repos"), &json!({ "n": 1 }), 60, "u", 1_000);
        store.set_at(&key("b", "gh", "repos"), &json!({ "n": 2 }), 60, "u", 5_000);

        let stats = store.stats();
        assert_eq!(stats.total_entries, 2);
        assert!(stats.total_size_bytes > 0);
        assert_eq!(stats.oldest_ms, Some(1_000));
        assert_eq!(stats.newest_ms, Some(5_000));
    }

    #[test]
    fn list_all_flags_expired_and_sorts_by_insertion() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.set_at(&key("b", "gh", "repos"), &json!(2), 60, "u", 5_000);
        store.set_at(&key("a", "gh", "repos"), &json!(1), 1, "u", 1_000);

        let listed = store.list_all_at(3_000);
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].metadata.key, "a");
        assert!(listed[0].expired);
        assert!(!listed[1].expired);
        assert!(listed[0].size_bytes > 0);
    }

    #[test]
    fn sweep_purges_expired_then_evicts_oldest_first() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.set_at(&key("old", "gh", "repos"), &json!([1, 2, 3]), 600, "u", 1_000);
        store.set_at(&key("new", "gh", "repos"), &json!([4, 5, 6]), 600, "u", 2_000);
        store.set_at(&key("exp", "gh", "repos"), &json!([7]), 1, "u", 1_000);

        let size_of_new = store
            .list_all_at(500)
            .into_iter()
            .find(|e| e.metadata.key == "new")
            .unwrap()
            .size_bytes;

        // Budget fits exactly the newest entry: "exp" goes because it is
        // expired, "old" goes because it was inserted first.
        let tight = FileCacheStore::new(
            dir.path(),
            CacheConfig {
                max_total_bytes: size_of_new,
                sweep_interval: Duration::from_secs(300),
            },
        )
        .unwrap();
        tight.sweep_at(3_000);
        let listed = tight.list_all_at(3_000);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata.key, "new");

        // With a generous budget a sweep keeps unexpired entries.
        tight.set_at(&key("keep", "gh", "repos"), &json!(1), 600, "u", 4_000);
        store.sweep_at(4_500);
        assert_eq!(store.list_all_at(4_500).len(), 2);
    }

    #[test]
    fn corrupt_metadata_is_treated_as_miss() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        let k = key("abc", "gh", "repos");
        fs::write(store.meta_path("abc"), b"{not json").unwrap();
        fs::write(store.data_path("abc"), b"{}").unwrap();

        assert!(store.get_at(&k, 1_000).is_none());
        assert!(store.list_all().is_empty());
    }

    #[test]
    fn metadata_is_inspectable_without_payload() {
        let dir = tempdir().unwrap();
        let store = store(dir.path());
        store.set_at(
            &key("abc", "gh", "repos"),
            &json!({ "big": "payload" }),
            60,
            "https://api.github.com/users/octocat/repos",
            1_000,
        );

        // Metadata file stands alone: delete the payload, listing still works.
        fs::remove_file(store.data_path("abc")).unwrap();
        let listed = store.list_all_at(1_500);
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].metadata.url, "https://api.github.com/users/octocat/repos");
    }
}
