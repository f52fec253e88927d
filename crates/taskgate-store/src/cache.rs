// crates/taskgate-store/src/cache.rs
// ============================================================================
// Module: Artifact Registry TTL Cache
// Description: Short-lived in-process cache of artifact registries keyed by
//              run_id (spec §4.1 "Caching").
// Purpose: Let repeated reads (e.g. `monitor --watch` polling, the Context
//          Builder) avoid re-reading and re-parsing `artifact-registry.json`
//          on every call, while never handing out a reference a caller could
//          mutate out from under the store.
// Dependencies: std, taskgate-store::registry
// ============================================================================

//! ## Overview
//! Entries expire after a fixed TTL (default 5s, spec §4.1). `get` always
//! returns an owned deep copy; `invalidate` is called before a write begins
//! and `put` repopulates after it completes, so a reader never observes a
//! registry mid-mutation through the cache.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use crate::registry::IndexedRegistry;

/// Default cache entry lifetime (spec §4.1).
pub const DEFAULT_TTL: Duration = Duration::from_secs(5);

/// One cached registry plus the instant it was inserted.
struct Entry {
    /// The cached indexed registry.
    registry: IndexedRegistry,
    /// When this entry was inserted or last refreshed.
    inserted_at: Instant,
}

/// A thread-safe, TTL-bounded cache of indexed artifact registries.
///
/// # Invariants
/// - `get` never returns an entry older than `ttl`.
/// - Every value handed to a caller is an independent clone; mutating it
///   never affects the cached copy or other callers.
pub struct RegistryCache {
    /// Entry lifetime before a `get` treats it as a miss.
    ttl: Duration,
    /// Cached entries, keyed by run id.
    entries: Mutex<HashMap<String, Entry>>,
}

impl RegistryCache {
    /// Builds a cache with the given TTL.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Mutex::new(HashMap::new()) }
    }

    /// Returns a deep copy of the cached registry for `run_id`, if present
    /// and not yet expired.
    #[must_use]
    pub fn get(&self, run_id: &str) -> Option<IndexedRegistry> {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match entries.get(run_id) {
            Some(entry) if entry.inserted_at.elapsed() < self.ttl => Some(entry.registry.clone()),
            Some(_) => {
                entries.remove(run_id);
                None
            }
            None => None,
        }
    }

    /// Populates (or refreshes) the cached entry for `run_id`.
    pub fn put(&self, run_id: &str, registry: IndexedRegistry) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.insert(run_id.to_string(), Entry { registry, inserted_at: Instant::now() });
    }

    /// Removes any cached entry for `run_id`, forcing the next `get` to miss.
    pub fn invalidate(&self, run_id: &str) {
        let mut entries = self.entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        entries.remove(run_id);
    }
}

impl Default for RegistryCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::Duration;

    use taskgate_core::AgentId;
    use taskgate_core::ArtifactRecord;
    use taskgate_core::StepIndex;

    use super::RegistryCache;
    use crate::registry::IndexedRegistry;

    fn sample_registry() -> IndexedRegistry {
        let mut registry = IndexedRegistry::default();
        registry.set(ArtifactRecord::new("design".to_string(), StepIndex::ZERO, AgentId::new("architect"), "artifacts/design".to_string()));
        registry
    }

    #[test]
    fn get_returns_a_deep_copy_not_a_shared_reference() {
        let cache = RegistryCache::new(Duration::from_secs(5));
        cache.put("run-1", sample_registry());

        let mut copy = cache.get("run-1").expect("present");
        copy.delete("design");
        assert_eq!(copy.len(), 0);

        let still_cached = cache.get("run-1").expect("still present");
        assert_eq!(still_cached.len(), 1);
    }

    #[test]
    fn entries_expire_after_ttl() {
        let cache = RegistryCache::new(Duration::from_millis(20));
        cache.put("run-1", sample_registry());
        thread::sleep(Duration::from_millis(40));
        assert!(cache.get("run-1").is_none());
    }

    #[test]
    fn invalidate_forces_a_miss() {
        let cache = RegistryCache::new(Duration::from_secs(5));
        cache.put("run-1", sample_registry());
        cache.invalidate("run-1");
        assert!(cache.get("run-1").is_none());
    }
}
