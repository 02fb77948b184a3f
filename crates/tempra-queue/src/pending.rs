//! Spectator-side mirror of the token queue

use std::collections::HashMap;

use tempra_core::{EntryId, QueueEntry};

use crate::ProcessedSet;

/// Result of merging one fetch into the mirror
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Entries seen for the first time, in queue order
    pub arrivals: Vec<EntryId>,
    /// Already-applied entries the server still holds; their ack was lost
    pub replayed: Vec<EntryId>,
    /// Local entries absent from the fetch
    pub vanished: usize,
}

/// Local copy of the unapplied queue
///
/// The server never learns about partial `list` progress, so the local copy
/// of an entry is kept in preference to a re-fetched one.
#[derive(Clone, Debug, Default)]
pub struct PendingQueue {
    entries: Vec<QueueEntry>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconcile with a fresh fetch
    ///
    /// Queue order follows the fetch. Processed ids never re-enter the
    /// mirror, and entries the server dropped disappear from it.
    pub fn merge(&mut self, fetched: Vec<QueueEntry>, processed: &ProcessedSet) -> MergeReport {
        let mut report = MergeReport::default();
        let mut local: HashMap<EntryId, QueueEntry> = self
            .entries
            .drain(..)
            .map(|e| (e.id.clone(), e))
            .collect();

        for entry in fetched {
            if processed.contains(&entry.id) {
                local.remove(&entry.id);
                report.replayed.push(entry.id);
                continue;
            }
            match local.remove(&entry.id) {
                Some(kept) => self.entries.push(kept),
                None => {
                    report.arrivals.push(entry.id.clone());
                    self.entries.push(entry);
                }
            }
        }

        report.vanished = local.len();
        report
    }

    /// Earliest entry that forces time (`ms`, `ft`, `s`, `list`)
    pub fn head_time_entry_mut(&mut self) -> Option<&mut QueueEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.directive.mode.is_time_force())
    }

    /// Ids of `control`/`preset` entries, in queue order
    pub fn out_of_band(&self) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|e| !e.directive.mode.is_time_force())
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn get(&self, id: &EntryId) -> Option<&QueueEntry> {
        self.entries.iter().find(|e| &e.id == id)
    }

    pub fn remove(&mut self, id: &EntryId) -> Option<QueueEntry> {
        let index = self.entries.iter().position(|e| &e.id == id)?;
        Some(self.entries.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
