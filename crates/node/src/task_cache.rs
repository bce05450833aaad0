// Path: crates/node/src/task_cache.rs
//! TTL-indexed cache of admitted proof hashes, persisted to disk.
//!
//! An entry exists iff the hub admitted the proof hash and its TTL has not
//! passed. Expired entries are deleted at the next access or the next
//! flush, whichever comes first. A background flusher wakes every five
//! seconds and serializes the map when dirty; the file format is bincode
//! and private to the node.

use parking_lot::Mutex;
use provenet_types::error::TaskError;
use provenet_types::TaskState;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// TTL applied when none is given.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);
/// How often the background flusher wakes.
const FLUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    state: TaskState,
    /// Epoch seconds; `None` never expires.
    expires_at: Option<u64>,
}

struct CacheInner {
    map: HashMap<String, Entry>,
    dirty: bool,
}

/// The node's task cache. Cheap map operations run under one coarse mutex;
/// file writes happen outside it on a serialized snapshot.
pub struct TaskCache {
    inner: Mutex<CacheInner>,
    path: PathBuf,
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl TaskCache {
    /// Load the cache from `path` (an absent or unreadable file starts
    /// empty) and immediately sweep entries that expired while the node
    /// was down.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map: HashMap<String, Entry> = match std::fs::read(&path) {
            Ok(raw) => match bincode::deserialize(&raw) {
                Ok(map) => map,
                Err(e) => {
                    tracing::error!(target: "task_cache", path = %path.display(), error = %e, "cache file unreadable, starting empty");
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(target: "task_cache", path = %path.display(), "no cache file, starting empty");
                HashMap::new()
            }
            Err(e) => {
                tracing::error!(target: "task_cache", path = %path.display(), error = %e, "cache load failed, starting empty");
                HashMap::new()
            }
        };
        let cache = Self {
            inner: Mutex::new(CacheInner { map, dirty: false }),
            path,
        };
        let swept = cache.sweep();
        if swept > 0 {
            tracing::info!(target: "task_cache", swept, "expired entries dropped at load");
        }
        cache
    }

    /// Look a proof hash up, deleting it if its TTL has passed.
    pub fn get(&self, key: &str) -> Option<TaskState> {
        let now = now_secs();
        let mut inner = self.inner.lock();
        match inner.map.get(key) {
            Some(entry) if entry.expires_at.map_or(true, |at| at > now) => Some(entry.state),
            Some(_) => {
                inner.map.remove(key);
                inner.dirty = true;
                None
            }
            None => None,
        }
    }

    /// Store a state under a TTL (`None` never expires) and mark dirty.
    pub fn set(&self, key: &str, state: TaskState, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| now_secs() + ttl.as_secs());
        let mut inner = self.inner.lock();
        inner.map.insert(
            key.to_string(),
            Entry { state, expires_at },
        );
        inner.dirty = true;
    }

    /// Claim a pending task: `PENDING → RUNNING`, resetting its TTL.
    /// The transition is strict — a running hash cannot be re-claimed.
    pub fn claim(&self, proof_hash: &str) -> Result<(), TaskError> {
        match self.get(proof_hash) {
            None => Err(TaskError::NotFound),
            Some(TaskState::Running) => Err(TaskError::Invalid),
            Some(TaskState::Pending) => {
                self.set(proof_hash, TaskState::Running, Some(DEFAULT_TTL));
                Ok(())
            }
        }
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = now_secs();
        let mut inner = self.inner.lock();
        let before = inner.map.len();
        inner
            .map
            .retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));
        let removed = before - inner.map.len();
        if removed > 0 {
            inner.dirty = true;
        }
        removed
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sweep and persist the map if dirty. The snapshot is taken under the
    /// lock; the file write happens outside it. A failed write re-marks the
    /// cache dirty so the next tick retries.
    pub async fn flush(&self) {
        let snapshot = {
            let mut inner = self.inner.lock();
            let now = now_secs();
            let before = inner.map.len();
            inner
                .map
                .retain(|_, entry| entry.expires_at.map_or(true, |at| at > now));
            if inner.map.len() != before {
                inner.dirty = true;
            }
            if !inner.dirty {
                return;
            }
            let snapshot = match bincode::serialize(&inner.map) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!(target: "task_cache", error = %e, "cache serialization failed");
                    return;
                }
            };
            inner.dirty = false;
            snapshot
        };
        if let Err(e) = tokio::fs::write(&self.path, snapshot).await {
            tracing::error!(target: "task_cache", path = %self.path.display(), error = %e, "cache flush failed");
            self.inner.lock().dirty = true;
        }
    }

    /// Run the background flusher until the shutdown flag flips. A final
    /// flush runs on the way out so a clean shutdown loses nothing.
    pub fn spawn_flusher(
        self: &Arc<Self>,
        mut shutdown: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = tokio::time::sleep(FLUSH_INTERVAL) => cache.flush().await,
                }
            }
            cache.flush().await;
            tracing::info!(target: "task_cache", "flusher stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_in(dir: &tempfile::TempDir) -> TaskCache {
        TaskCache::load(dir.path().join("cache.bin"))
    }

    #[test]
    fn claim_succeeds_once_then_reports_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.set("0xabc", TaskState::Pending, Some(DEFAULT_TTL));

        assert!(cache.claim("0xabc").is_ok());
        assert_eq!(cache.get("0xabc"), Some(TaskState::Running));
        assert_eq!(cache.claim("0xabc"), Err(TaskError::Invalid));
        assert_eq!(cache.claim("0xabc"), Err(TaskError::Invalid));
    }

    #[test]
    fn claim_of_unknown_hash_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        assert_eq!(cache.claim("0xmissing"), Err(TaskError::NotFound));
    }

    #[test]
    fn expired_entries_miss_on_read() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.set("0xshort", TaskState::Pending, Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(cache.get("0xshort"), None);
        assert_eq!(cache.claim("0xshort"), Err(TaskError::NotFound));
    }

    #[test]
    fn sweep_drops_only_expired_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache_in(&dir);
        cache.set("0xlong", TaskState::Pending, Some(Duration::from_secs(3600)));
        cache.set("0xnever", TaskState::Pending, None);
        cache.set("0xgone", TaskState::Pending, Some(Duration::ZERO));
        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn short_ttls_do_not_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        {
            let cache = TaskCache::load(&path);
            for i in 0..10 {
                cache.set(
                    &format!("0x{i}"),
                    TaskState::Pending,
                    Some(Duration::from_secs(1)),
                );
            }
            cache.flush().await;
            assert_eq!(cache.len(), 10);
        }
        // Let every TTL lapse while "restarted"; the load-time sweep must
        // drop them all.
        std::thread::sleep(Duration::from_millis(2100));
        let reloaded = TaskCache::load(&path);
        assert_eq!(reloaded.len(), 0);
    }

    #[tokio::test]
    async fn long_ttls_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        {
            let cache = TaskCache::load(&path);
            for i in 0..10 {
                cache.set(
                    &format!("0x{i}"),
                    TaskState::Pending,
                    Some(Duration::from_secs(3600)),
                );
            }
            cache.flush().await;
        }
        let reloaded = TaskCache::load(&path);
        assert_eq!(reloaded.len(), 10);
        assert_eq!(reloaded.get("0x3"), Some(TaskState::Pending));
    }

    #[tokio::test]
    async fn flush_is_a_noop_when_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.bin");
        let cache = TaskCache::load(&path);
        cache.flush().await;
        assert!(!path.exists());

        cache.set("0xabc", TaskState::Pending, None);
        cache.flush().await;
        assert!(path.exists());
        let mtime = std::fs::metadata(&path).unwrap().modified().unwrap();
        cache.flush().await;
        assert_eq!(std::fs::metadata(&path).unwrap().modified().unwrap(), mtime);
    }
}
