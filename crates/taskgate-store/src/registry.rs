// crates/taskgate-store/src/registry.rs
// ============================================================================
// Module: Indexed Artifact Registry
// Description: In-memory, O(1)-lookup view over one run's artifact registry
//              document (spec §4.2).
// Purpose: Keep four secondary indexes (by id, by type, by step) mutually
//          consistent with the primary `byName` map under every mutation,
//          while guaranteeing the document round-trips through JSON exactly.
// Dependencies: serde, serde_json, taskgate-core
// ============================================================================

//! ## Overview
//! [`IndexedRegistry`] wraps a plain `BTreeMap<String, ArtifactRecord>` (the
//! on-disk shape) and rebuilds its secondary indexes from it. Nothing about
//! the indexes is persisted — `to_document` emits exactly the primary map,
//! so `IndexedRegistry::from_document(doc).to_document() == doc` always
//! holds (spec §8, round-trip law).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use taskgate_core::ArtifactId;
use taskgate_core::ArtifactRecord;
use taskgate_core::StepIndex;

/// The on-disk shape of `artifact-registry.json`: artifact name to record.
pub type RegistryDocument = BTreeMap<String, ArtifactRecord>;

/// An in-memory, index-backed view over one run's artifact registry.
///
/// # Invariants
/// - `by_id`, `by_type`, and `by_step` are rebuilt from `by_name` on every
///   mutating call; they never drift from it.
/// - `to_document` never loses information present in the original document:
///   `from_document(doc).to_document()` is bytewise-equal after re-encoding.
#[derive(Debug, Clone, Default)]
pub struct IndexedRegistry {
    /// The primary map: artifact name to record.
    by_name: RegistryDocument,
    /// Artifact id to artifact name, for records that set `id`.
    by_id: BTreeMap<String, String>,
    /// `metadata.type` value to the set of artifact names carrying it.
    by_type: BTreeMap<String, BTreeSet<String>>,
    /// Step index to the set of artifact names produced at that step.
    by_step: BTreeMap<u32, BTreeSet<String>>,
}

impl IndexedRegistry {
    /// Builds an indexed view from a loaded document.
    #[must_use]
    pub fn from_document(document: RegistryDocument) -> Self {
        let mut registry = Self { by_name: document, ..Self::default() };
        registry.rebuild_indexes();
        registry
    }

    /// Emits the primary map, exactly as it would be persisted.
    #[must_use]
    pub fn to_document(&self) -> RegistryDocument {
        self.by_name.clone()
    }

    /// Rebuilds every secondary index from `by_name` from scratch.
    fn rebuild_indexes(&mut self) {
        self.by_id.clear();
        self.by_type.clear();
        self.by_step.clear();
        for (name, record) in &self.by_name {
            Self::index_one(&mut self.by_id, &mut self.by_type, &mut self.by_step, name, record);
        }
    }

    /// Adds `record`'s entries to the three secondary index maps.
    fn index_one(by_id: &mut BTreeMap<String, String>, by_type: &mut BTreeMap<String, BTreeSet<String>>, by_step: &mut BTreeMap<u32, BTreeSet<String>>, name: &str, record: &ArtifactRecord) {
        if let Some(id) = &record.id {
            by_id.insert(id.as_str().to_string(), name.to_string());
        }
        if let Some(kind) = record.metadata.get("type").and_then(|value| value.as_str()) {
            by_type.entry(kind.to_string()).or_default().insert(name.to_string());
        }
        by_step.entry(record.step.get()).or_default().insert(name.to_string());
    }

    /// Removes `record`'s entries from the three secondary index maps.
    fn deindex(&mut self, name: &str, record: &ArtifactRecord) {
        if let Some(id) = &record.id {
            self.by_id.remove(id.as_str());
        }
        if let Some(kind) = record.metadata.get("type").and_then(|value| value.as_str()) {
            if let Some(names) = self.by_type.get_mut(kind) {
                names.remove(name);
            }
        }
        if let Some(names) = self.by_step.get_mut(&record.step.get()) {
            names.remove(name);
        }
    }

    /// Looks up an artifact by its unique name. O(1).
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&ArtifactRecord> {
        self.by_name.get(name)
    }

    /// Looks up an artifact by its optional id. O(1).
    #[must_use]
    pub fn get_by_id(&self, id: &ArtifactId) -> Option<&ArtifactRecord> {
        self.by_id.get(id.as_str()).and_then(|name| self.by_name.get(name))
    }

    /// Returns every artifact tagged with `metadata.type == kind`. O(1) to
    /// locate the bucket; O(k) to materialise it.
    #[must_use]
    pub fn get_by_type(&self, kind: &str) -> Vec<&ArtifactRecord> {
        self.by_type.get(kind).into_iter().flatten().filter_map(|name| self.by_name.get(name)).collect()
    }

    /// Returns every artifact produced at `step`. O(1) to locate the bucket;
    /// O(k) to materialise it.
    #[must_use]
    pub fn get_by_step(&self, step: StepIndex) -> Vec<&ArtifactRecord> {
        self.by_step.get(&step.get()).into_iter().flatten().filter_map(|name| self.by_name.get(name)).collect()
    }

    /// Inserts or replaces the record under `record.name`, removing any
    /// stale index entries for the previous record first.
    pub fn set(&mut self, record: ArtifactRecord) {
        let name = record.name.clone();
        if let Some(previous) = self.by_name.get(&name).cloned() {
            self.deindex(&name, &previous);
        }
        Self::index_one(&mut self.by_id, &mut self.by_type, &mut self.by_step, &name, &record);
        self.by_name.insert(name, record);
    }

    /// Removes the artifact named `name`, reporting whether one existed.
    pub fn delete(&mut self, name: &str) -> bool {
        let Some(record) = self.by_name.remove(name) else {
            return false;
        };
        self.deindex(name, &record);
        true
    }

    /// Returns the number of artifacts currently tracked.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Reports whether the registry holds no artifacts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Iterates every artifact record in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ArtifactRecord)> {
        self.by_name.iter()
    }
}

/// Serialization helper mirroring the persisted shape exactly (no index
/// fields leak into the wire format).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RegistryWireFormat(pub RegistryDocument);

#[cfg(test)]
mod tests {
    use taskgate_core::AgentId;
    use taskgate_core::ArtifactId;
    use taskgate_core::ArtifactRecord;
    use taskgate_core::StepIndex;

    use super::IndexedRegistry;

    fn sample(name: &str, step: u32) -> ArtifactRecord {
        let mut record = ArtifactRecord::new(name.to_string(), StepIndex::new(step), AgentId::new("developer"), format!("artifacts/{name}"));
        record.id = Some(ArtifactId::new(format!("id-{name}")));
        record.metadata.insert("type".to_string(), serde_json::json!("design-doc"));
        record
    }

    #[test]
    fn set_and_lookup_by_every_index() {
        let mut registry = IndexedRegistry::default();
        registry.set(sample("design", 0));

        assert!(registry.get_by_name("design").is_some());
        assert!(registry.get_by_id(&ArtifactId::new("id-design")).is_some());
        assert_eq!(registry.get_by_type("design-doc").len(), 1);
        assert_eq!(registry.get_by_step(StepIndex::new(0)).len(), 1);
    }

    #[test]
    fn re_setting_under_same_name_drops_stale_index_entries() {
        let mut registry = IndexedRegistry::default();
        registry.set(sample("design", 0));

        let mut moved = sample("design", 1);
        moved.id = Some(ArtifactId::new("id-design-v2"));
        registry.set(moved);

        assert_eq!(registry.get_by_step(StepIndex::new(0)).len(), 0);
        assert_eq!(registry.get_by_step(StepIndex::new(1)).len(), 1);
        assert!(registry.get_by_id(&ArtifactId::new("id-design")).is_none());
        assert!(registry.get_by_id(&ArtifactId::new("id-design-v2")).is_some());
    }

    #[test]
    fn delete_removes_from_every_index() {
        let mut registry = IndexedRegistry::default();
        registry.set(sample("design", 0));
        assert!(registry.delete("design"));
        assert!(!registry.delete("design"));
        assert!(registry.get_by_name("design").is_none());
        assert_eq!(registry.get_by_type("design-doc").len(), 0);
        assert_eq!(registry.get_by_step(StepIndex::new(0)).len(), 0);
    }

    #[test]
    fn round_trips_through_document_exactly() {
        let mut registry = IndexedRegistry::default();
        registry.set(sample("design", 0));
        registry.set(sample("plan", 1));

        let document = registry.to_document();
        let reloaded = IndexedRegistry::from_document(document.clone());
        assert_eq!(reloaded.to_document(), document);
    }
}
