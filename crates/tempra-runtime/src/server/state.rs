//! Shared handler state

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tempra_core::{EntryId, ForceDirective, TempraResult, Token};
use tempra_queue::{DirectiveStore, PresetBook};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DirectiveStore>,
    pub presets: Arc<PresetBook>,
    pub version: String,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(store: Arc<dyn DirectiveStore>, presets: PresetBook) -> Self {
        Self {
            store,
            presets: Arc::new(presets),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Utc::now(),
        }
    }

    /// Expand presets, then enqueue; returns the id and the new queue depth
    pub fn push(&self, token: &Token, directive: ForceDirective) -> TempraResult<(EntryId, usize)> {
        let directive = self.presets.expand(directive)?;
        let id = self.store.enqueue(token, directive)?;
        let queued = self.store.queued_len(token)?;
        Ok((id, queued))
    }

    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
