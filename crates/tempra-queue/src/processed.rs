//! Bounded set of applied entry ids
//!
//! Guards against re-applying an entry whose ack was lost. Capacity is fixed;
//! the oldest id is evicted first.

use std::collections::{HashSet, VecDeque};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tempra_core::{EntryId, TempraError, TempraResult};
use tracing::debug;

/// Default number of remembered ids
pub const DEFAULT_PROCESSED_CAPACITY: usize = 200;

/// Processed-id set with oldest-first eviction
#[derive(Clone, Debug)]
pub struct ProcessedSet {
    capacity: usize,
    order: VecDeque<EntryId>,
    members: HashSet<EntryId>,
}

impl ProcessedSet {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        ProcessedSet {
            capacity,
            order: VecDeque::with_capacity(capacity),
            members: HashSet::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &EntryId) -> bool {
        self.members.contains(id)
    }

    /// Record an id; `false` if it was already present
    pub fn insert(&mut self, id: EntryId) -> bool {
        if self.members.contains(&id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.members.remove(&evicted);
            }
        }
        self.members.insert(id.clone());
        self.order.push_back(id);
        true
    }

    /// Ids oldest first
    pub fn iter(&self) -> impl Iterator<Item = &EntryId> {
        self.order.iter()
    }

    /// Load from a JSON array of ids; a missing file yields an empty set
    pub fn load(path: &Path, capacity: usize) -> TempraResult<Self> {
        let mut set = ProcessedSet::new(capacity);
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(set),
            Err(e) => return Err(TempraError::Persistence(format!("{}: {}", path.display(), e))),
        };
        let ids: Vec<EntryId> = serde_json::from_str(&raw)
            .map_err(|e| TempraError::Persistence(format!("{}: {}", path.display(), e)))?;
        for id in ids {
            set.insert(id);
        }
        debug!(path = %path.display(), loaded = set.len(), "processed ids restored");
        Ok(set)
    }

    /// Write as a JSON array of ids, oldest first
    pub fn save(&self, path: &Path) -> TempraResult<()> {
        let ids: Vec<&EntryId> = self.order.iter().collect();
        let raw = serde_json::to_string(&ids)
            .map_err(|e| TempraError::Persistence(e.to_string()))?;
        fs::write(path, raw)
            .map_err(|e| TempraError::Persistence(format!("{}: {}", path.display(), e)))
    }
}

impl Default for ProcessedSet {
    fn default() -> Self {
        Self::new(DEFAULT_PROCESSED_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest_first() {
        let mut set = ProcessedSet::new(3);
        for id in ["a", "b", "c", "d"] {
            assert!(set.insert(EntryId::new(id)));
        }
        assert_eq!(set.len(), 3);
        assert!(!set.contains(&EntryId::new("a")));
        assert!(set.contains(&EntryId::new("d")));
        assert!(!set.insert(EntryId::new("d")));
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut set = ProcessedSet::default();
        for i in 0..1_000 {
            set.insert(EntryId::new(format!("id-{}", i)));
            assert!(set.len() <= DEFAULT_PROCESSED_CAPACITY);
        }
        assert!(set.contains(&EntryId::new("id-999")));
        assert!(!set.contains(&EntryId::new("id-799")));
        assert!(set.contains(&EntryId::new("id-800")));
    }

    #[test]
    fn test_persistence_round_trip_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed.json");

        let mut set = ProcessedSet::new(5);
        for id in ["x", "y", "z"] {
            set.insert(EntryId::new(id));
        }
        set.save(&path).unwrap();

        let restored = ProcessedSet::load(&path, 5).unwrap();
        let ids: Vec<_> = restored.iter().map(|id| id.as_str().to_string()).collect();
        assert_eq!(ids, vec!["x", "y", "z"]);
    }

    #[test]
    fn test_load_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ProcessedSet::load(&dir.path().join("absent.json"), 5).unwrap();
        assert!(missing.is_empty());

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "not json").unwrap();
        assert!(matches!(
            ProcessedSet::load(&corrupt, 5),
            Err(TempraError::Persistence(_))
        ));
    }
}
