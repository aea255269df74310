//! Optional cache of parsed knowledge-base files.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;

/// Cache key: absolute file path plus its modification time.
///
/// A changed mtime is a different key, so edits invalidate naturally.
/// Hits are trusted without re-reading the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub path: PathBuf,
    pub modified: Option<SystemTime>,
}

impl CacheKey {
    /// Build the key for a file from its metadata.
    ///
    /// Returns `None` when the file cannot be stat'ed.
    pub fn for_file(path: &Path) -> Option<Self> {
        let resolved = path.canonicalize().ok()?;
        let modified = std::fs::metadata(&resolved).ok()?.modified().ok();
        Some(Self {
            path: resolved,
            modified,
        })
    }
}

/// Capability interface for caching parsed files.
///
/// Absent cache means every load reads from disk.
pub trait SnapshotCache: Send + Sync {
    /// Look up a parsed document.
    fn get(&self, key: &CacheKey) -> Option<Arc<Value>>;

    /// Store a parsed document.
    fn put(&self, key: CacheKey, value: Arc<Value>);

    /// Drop every entry.
    fn clear(&self);
}

/// Process-local cache backed by a mutex-guarded map.
///
/// Storing a new mtime for a path evicts the entries for older mtimes of
/// the same path.
#[derive(Debug, Default)]
pub struct MemorySnapshotCache {
    entries: Mutex<HashMap<CacheKey, Arc<Value>>>,
}

impl MemorySnapshotCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of cached documents.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SnapshotCache for MemorySnapshotCache {
    fn get(&self, key: &CacheKey) -> Option<Arc<Value>> {
        let entries = self.entries.lock().ok()?;
        entries.get(key).cloned()
    }

    fn put(&self, key: CacheKey, value: Arc<Value>) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|existing, _| existing.path != key.path);
            entries.insert(key, value);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}
