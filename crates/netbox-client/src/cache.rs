//! Per-class disk cache (spec §4.3, §6).
//!
//! One JSON file per class under the configured cache directory, plus a
//! `cached_version` side file holding the NetBox API version the snapshot
//! was built against. The original tool used Python's `pickle`; this engine
//! uses `serde_json` instead, a deliberate deviation (see DESIGN.md) since
//! pickle has no faithful Rust analogue and JSON keeps the cache
//! inspectable and stable across toolchain versions.

use crate::error::NetBoxError;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// A disk-backed cache rooted at one directory, shared by every class.
#[derive(Debug, Clone)]
pub struct DiskCache {
    dir: PathBuf,
}

impl DiskCache {
    /// Open (without creating) a cache rooted at `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn class_file(&self, api_path: &str) -> PathBuf {
        self.dir.join(format!("{}.json", api_path.replace('/', "_")))
    }

    fn version_file(&self) -> PathBuf {
        self.dir.join("cached_version")
    }

    /// Read the API version the on-disk snapshots were built against, if any.
    pub fn cached_version(&self) -> Result<Option<String>, NetBoxError> {
        let path = self.version_file();
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(std::fs::read_to_string(path)?.trim().to_string()))
    }

    /// Stamp the cache directory with the API version of this run. A
    /// version mismatch invalidates every class cache (checked by the
    /// caller before any [`Self::load_snapshot`] call).
    pub fn write_version(&self, version: &str) -> Result<(), NetBoxError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.version_file(), version)?;
        Ok(())
    }

    /// Load the last-known snapshot for a class, if a cache file exists.
    pub fn load_snapshot(&self, api_path: &str) -> Result<Option<Vec<Value>>, NetBoxError> {
        let path = self.class_file(api_path);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Rewrite the on-disk snapshot for a class. Callers must do this only
    /// after a class load fully succeeds, so a failed run never corrupts
    /// the cache (spec §7 propagation policy).
    pub fn save_snapshot(&self, api_path: &str, data: &[Value]) -> Result<(), NetBoxError> {
        std::fs::create_dir_all(&self.dir)?;
        let text = serde_json::to_string(data)?;
        std::fs::write(self.class_file(api_path), text)?;
        Ok(())
    }

    /// Remove every on-disk file, used when the API version has changed and
    /// every class cache must be invalidated together.
    pub fn invalidate_all(&self) -> Result<(), NetBoxError> {
        if self.dir.exists() {
            for entry in std::fs::read_dir(&self.dir)? {
                let entry = entry?;
                if entry.path().extension().is_some_and(|e| e == "json") {
                    std::fs::remove_file(entry.path())?;
                }
            }
        }
        Ok(())
    }
}

/// Find the maximum `last_updated` value across a snapshot, used to build
/// the `last_updated__gte` delta filter. Lexical comparison is safe because
/// NetBox emits RFC 3339 timestamps, which sort lexically in time order.
pub fn max_last_updated(snapshot: &[Value]) -> Option<String> {
    snapshot
        .iter()
        .filter_map(|v| v.get("last_updated").and_then(Value::as_str))
        .max()
        .map(str::to_owned)
}

/// Reconstruct the current set of objects for a class from:
/// - `cached`: the last-known snapshot,
/// - `current_ids`: a brief id-only GET of everything that exists *now*,
/// - `delta`: a full GET of everything with `last_updated >= max(cached)`.
///
/// Result = {cached entries whose id is still present and absent from
/// delta} ∪ {delta entries}. This drops server-side deletions (ids no
/// longer in `current_ids`) and supersedes any cached entry a delta entry
/// also covers.
pub fn reconstruct(cached: Vec<Value>, current_ids: &[u64], delta: Vec<Value>) -> Vec<Value> {
    let current: HashSet<u64> = current_ids.iter().copied().collect();
    let delta_ids: HashSet<u64> = delta
        .iter()
        .filter_map(|v| v.get("id").and_then(Value::as_u64))
        .collect();

    let mut result: Vec<Value> = cached
        .into_iter()
        .filter(|v| {
            let id = v.get("id").and_then(Value::as_u64);
            matches!(id, Some(id) if current.contains(&id) && !delta_ids.contains(&id))
        })
        .collect();
    result.extend(delta);
    result
}

/// Quick existence check used by callers deciding whether `cache_directory`
/// needs to be created up front.
pub fn ensure_dir(dir: &Path) -> Result<(), NetBoxError> {
    std::fs::create_dir_all(dir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reconstruct_drops_deleted_and_prefers_delta() {
        let cached = vec![
            json!({"id": 1, "last_updated": "2026-01-01T00:00:00Z", "name": "a"}),
            json!({"id": 2, "last_updated": "2026-01-01T00:00:00Z", "name": "b"}),
            json!({"id": 3, "last_updated": "2026-01-01T00:00:00Z", "name": "c"}),
        ];
        // id 2 was deleted server-side (absent from brief ids), id 3 changed.
        let current_ids = [1u64, 3];
        let delta = vec![json!({"id": 3, "last_updated": "2026-02-01T00:00:00Z", "name": "c2"})];

        let result = reconstruct(cached, &current_ids, delta);
        let ids: HashSet<u64> = result
            .iter()
            .filter_map(|v| v.get("id").and_then(Value::as_u64))
            .collect();
        assert_eq!(ids, HashSet::from([1, 3]));
        match result.iter().find(|v| v["id"] == 3) {
            Some(c3) => assert_eq!(c3["name"], "c2"),
            None => panic!("expected id 3 to survive reconstruction"),
        }
    }

    #[test]
    fn max_last_updated_picks_lexical_max() {
        let snapshot = vec![
            json!({"last_updated": "2026-01-01T00:00:00Z"}),
            json!({"last_updated": "2026-06-15T12:00:00Z"}),
        ];
        assert_eq!(max_last_updated(&snapshot).as_deref(), Some("2026-06-15T12:00:00Z"));
    }
}
