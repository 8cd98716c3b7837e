use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;
use rocksdb::{IteratorMode, DB};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crawler_core::{CrawlError, DiscoveryRecord, UrlHash};

/// Dirty writes accumulated before a forced flush.
const SYNC_EVERY: u64 = 200;
/// Wall time since the last flush before a forced flush.
const SYNC_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    url: String,
    completed: bool,
}

/// Durable map from URL hash to `(canonical url, completed)`, backed by an
/// embedded key-value engine. Writes are buffered and flushed either every
/// [`SYNC_EVERY`] dirty writes or every [`SYNC_INTERVAL`], whichever comes
/// first; the rest of the system treats the on-disk layout as opaque.
pub struct DiscoveryStore {
    db: DB,
    dirty_writes: u64,
    last_flush: Instant,
}

impl DiscoveryStore {
    /// Opens (creating if necessary) the store at `path`.
    pub fn open(path: &Path) -> Result<Self> {
        let db = DB::open_default(path).map_err(|e| {
            CrawlError::Storage(format!("opening discovery store at {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "opened discovery store");
        Ok(Self {
            db,
            dirty_writes: 0,
            last_flush: Instant::now(),
        })
    }

    /// Deletes any existing store at `path` and opens a fresh one.
    pub fn fresh(path: &Path) -> Result<Self> {
        if path.exists() {
            let _ = DB::destroy(&rocksdb::Options::default(), path);
        }
        Self::open(path)
    }

    pub fn has(&self, hash: UrlHash) -> bool {
        matches!(self.db.get(hash.to_be_bytes()), Ok(Some(_)))
    }

    pub fn put(&mut self, hash: UrlHash, record: &DiscoveryRecord) -> Result<()> {
        let stored = StoredRecord {
            url: record.url.clone(),
            completed: record.completed,
        };
        let bytes = bincode::serialize(&stored).map_err(|e| CrawlError::Storage(e.to_string()))?;
        self.db
            .put(hash.to_be_bytes(), bytes)
            .map_err(|e| CrawlError::Storage(e.to_string()))?;
        self.dirty_writes += 1;
        self.maybe_flush()?;
        Ok(())
    }

    fn maybe_flush(&mut self) -> Result<()> {
        if self.dirty_writes >= SYNC_EVERY || self.last_flush.elapsed() >= SYNC_INTERVAL {
            self.flush()?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<()> {
        if self.dirty_writes == 0 {
            self.last_flush = Instant::now();
            return Ok(());
        }
        self.db
            .flush()
            .map_err(|e| CrawlError::Storage(format!("flushing discovery store: {e}")))?;
        debug!(writes = self.dirty_writes, "flushed discovery store");
        self.dirty_writes = 0;
        self.last_flush = Instant::now();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.db.iterator(IteratorMode::Start).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replays every persisted record for startup recovery.
    pub fn iter(&self) -> impl Iterator<Item = (UrlHash, DiscoveryRecord)> + '_ {
        self.db.iterator(IteratorMode::Start).filter_map(|item| {
            let (key, value) = match item {
                Ok(kv) => kv,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable discovery store entry");
                    return None;
                }
            };
            if key.len() != 8 {
                return None;
            }
            let hash = UrlHash::from_be_bytes(key.as_ref().try_into().ok()?);
            let stored: StoredRecord = bincode::deserialize(&value).ok()?;
            Some((
                hash,
                DiscoveryRecord {
                    url: stored.url,
                    completed: stored.completed,
                },
            ))
        })
    }
}

/// Deterministic, internal hash used as the store's primary key. Collision
/// resistance at 64 bits is ample; this is never exposed outside the process.
pub fn hash_url(canonical_url: &str) -> UrlHash {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    canonical_url.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_has_roundtrips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DiscoveryStore::fresh(dir.path()).unwrap();
        let hash = hash_url("http://a.ics.uci.edu/");
        assert!(!store.has(hash));
        store
            .put(
                hash,
                &DiscoveryRecord {
                    url: "http://a.ics.uci.edu/".to_string(),
                    completed: false,
                },
            )
            .unwrap();
        assert!(store.has(hash));
    }

    #[test]
    fn flush_resets_dirty_counter() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DiscoveryStore::fresh(dir.path()).unwrap();
        for i in 0..5 {
            store
                .put(
                    i,
                    &DiscoveryRecord {
                        url: format!("http://a.ics.uci.edu/{i}"),
                        completed: false,
                    },
                )
                .unwrap();
        }
        store.flush().unwrap();
        assert_eq!(store.dirty_writes, 0);
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let hash = hash_url("http://a.ics.uci.edu/p");
        {
            let mut store = DiscoveryStore::fresh(dir.path()).unwrap();
            store
                .put(
                    hash,
                    &DiscoveryRecord {
                        url: "http://a.ics.uci.edu/p".to_string(),
                        completed: true,
                    },
                )
                .unwrap();
            store.flush().unwrap();
        }
        let store = DiscoveryStore::open(dir.path()).unwrap();
        let records: Vec<_> = store.iter().collect();
        assert_eq!(records.len(), 1);
        assert!(records[0].1.completed);
    }
}
