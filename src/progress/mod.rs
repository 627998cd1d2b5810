//! Durable scan-progress persistence.
//!
//! Best-effort key-value storage for the scan cursor, accumulated results,
//! and the last-completion timestamp. `load` never fails: any storage
//! problem degrades to zero-valued progress (start fresh) with a warning,
//! so a flaky store can cost a pass but never abort one.
//!
//! Backends: Redis (shared across short-lived instances), a local JSON
//! file, and an in-memory store for tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

use crate::types::{ScanProgress, ScanResult};

/// Persisted key layout (shared with external tooling, do not rename).
const KEY_OFFSET: &str = "scan_offset";
const KEY_RESULTS: &str = "scan_results";
const KEY_LAST_COMPLETE: &str = "last_scan_complete";

/// Best-effort progress storage.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    /// Load progress; zero-valued when storage is unavailable or empty.
    async fn load(&self) -> ScanProgress;

    /// Persist progress. Returns false (and logs) on failure.
    async fn save(&self, progress: &ScanProgress) -> bool;
}

// ---------------------------------------------------------------------------
// Redis
// ---------------------------------------------------------------------------

/// Redis-backed store using the flat key layout above.
pub struct RedisStore {
    client: redis::Client,
}

impl RedisStore {
    pub fn new(url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(url)?;
        Ok(RedisStore { client })
    }

    async fn try_load(&self) -> redis::RedisResult<ScanProgress> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        let offset: Option<String> = conn.get(KEY_OFFSET).await?;
        let results: Option<String> = conn.get(KEY_RESULTS).await?;
        let last_complete: Option<String> = conn.get(KEY_LAST_COMPLETE).await?;

        Ok(ScanProgress {
            offset: offset.and_then(|s| s.parse().ok()).unwrap_or(0),
            results: results
                .and_then(|s| serde_json::from_str::<Vec<ScanResult>>(&s).ok())
                .unwrap_or_default(),
            last_complete: last_complete
                .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
                .map(|dt| dt.with_timezone(&Utc)),
        })
    }

    async fn try_save(&self, progress: &ScanProgress) -> anyhow::Result<()> {
        let results_json = serde_json::to_string(&progress.results)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        conn.set::<_, _, ()>(KEY_OFFSET, progress.offset.to_string())
            .await?;
        conn.set::<_, _, ()>(KEY_RESULTS, results_json).await?;
        if let Some(ts) = progress.last_complete {
            conn.set::<_, _, ()>(KEY_LAST_COMPLETE, ts.to_rfc3339())
                .await?;
        }
        Ok(())
    }
}

#[async_trait]
impl ProgressStore for RedisStore {
    async fn load(&self) -> ScanProgress {
        match self.try_load().await {
            Ok(progress) => {
                debug!(
                    offset = progress.offset,
                    results = progress.results.len(),
                    "Progress loaded from redis"
                );
                progress
            }
            Err(e) => {
                warn!(error = %e, "Redis unavailable, starting with fresh progress");
                ScanProgress::default()
            }
        }
    }

    async fn save(&self, progress: &ScanProgress) -> bool {
        match self.try_save(progress).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save progress to redis");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// JSON file
// ---------------------------------------------------------------------------

/// Single-file JSON store, for deployments without Redis.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }
}

#[async_trait]
impl ProgressStore for FileStore {
    async fn load(&self) -> ScanProgress {
        if !Path::new(&self.path).exists() {
            info!(path = %self.path.display(), "No saved progress, starting fresh");
            return ScanProgress::default();
        }
        match std::fs::read_to_string(&self.path)
            .map_err(anyhow::Error::from)
            .and_then(|s| serde_json::from_str(&s).map_err(Into::into))
        {
            Ok(progress) => progress,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Unreadable progress file, starting fresh");
                ScanProgress::default()
            }
        }
    }

    async fn save(&self, progress: &ScanProgress) -> bool {
        let json = match serde_json::to_string_pretty(progress) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize progress");
                return false;
            }
        };
        match std::fs::write(&self.path, json) {
            Ok(()) => {
                debug!(path = %self.path.display(), offset = progress.offset, "Progress saved");
                true
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to write progress file");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// In-memory store for tests and ephemeral runs.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<ScanProgress>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing progress.
    pub fn with_progress(progress: ScanProgress) -> Self {
        MemoryStore {
            state: Mutex::new(progress),
        }
    }
}

#[async_trait]
impl ProgressStore for MemoryStore {
    async fn load(&self) -> ScanProgress {
        self.state.lock().expect("progress lock poisoned").clone()
    }

    async fn save(&self, progress: &ScanProgress) -> bool {
        *self.state.lock().expect("progress lock poisoned") = progress.clone();
        true
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir().join(format!("trendscan_progress_{}.json", uuid::Uuid::new_v4()))
    }

    fn sample_progress() -> ScanProgress {
        ScanProgress {
            offset: 120,
            results: vec![ScanResult::sample("RELIANCE", 2843.46)],
            last_complete: Some(Utc::now()),
        }
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let path = temp_path();
        let store = FileStore::new(&path);

        assert!(store.save(&sample_progress()).await);
        let loaded = store.load().await;
        assert_eq!(loaded.offset, 120);
        assert_eq!(loaded.results.len(), 1);
        assert_eq!(loaded.results[0].symbol, "RELIANCE");
        assert!(loaded.last_complete.is_some());

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_file_store_missing_file_is_fresh() {
        let store = FileStore::new("/tmp/trendscan_nonexistent_progress.json");
        let loaded = store.load().await;
        assert_eq!(loaded.offset, 0);
        assert!(loaded.results.is_empty());
        assert!(loaded.last_complete.is_none());
    }

    #[tokio::test]
    async fn test_file_store_corrupt_file_is_fresh() {
        let path = temp_path();
        std::fs::write(&path, "{ not json").unwrap();

        let loaded = FileStore::new(&path).load().await;
        assert_eq!(loaded.offset, 0);

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.load().await.offset, 0);

        assert!(store.save(&sample_progress()).await);
        assert_eq!(store.load().await.offset, 120);
    }

    #[tokio::test]
    async fn test_redis_store_unreachable_is_fresh() {
        // Nothing listens on this port; load must degrade, save must fail.
        let store = RedisStore::new("redis://127.0.0.1:1/").unwrap();
        let loaded = store.load().await;
        assert_eq!(loaded.offset, 0);
        assert!(!store.save(&sample_progress()).await);
    }
}
