//! In-memory directive store

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use tempra_core::{EntryId, ForceDirective, QueueEntry, TempraError, TempraResult, Token};
use tracing::{debug, info};

use crate::{DirectiveStore, StoreStats};

/// Directive store held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    queues: RwLock<HashMap<Token, Vec<QueueEntry>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirectiveStore for MemoryStore {
    fn create_token(&self) -> Token {
        let mut queues = self.queues.write();
        loop {
            let token = Token::generate();
            if !queues.contains_key(&token) {
                queues.insert(token.clone(), Vec::new());
                info!(%token, "token created");
                return token;
            }
        }
    }

    fn register(&self, token: Token) -> bool {
        let mut queues = self.queues.write();
        if queues.contains_key(&token) {
            return false;
        }
        queues.insert(token, Vec::new());
        true
    }

    fn delete_token(&self, token: &Token) -> bool {
        let removed = self.queues.write().remove(token);
        if let Some(entries) = &removed {
            info!(%token, dropped = entries.len(), "token deleted");
        }
        removed.is_some()
    }

    fn contains(&self, token: &Token) -> bool {
        self.queues.read().contains_key(token)
    }

    fn enqueue(&self, token: &Token, directive: ForceDirective) -> TempraResult<EntryId> {
        directive.validate()?;

        let mut queues = self.queues.write();
        let queue = queues
            .get_mut(token)
            .ok_or_else(|| TempraError::TokenNotFound(token.clone()))?;

        let id = EntryId::generate();
        debug!(%token, %id, mode = %directive.mode, "directive queued");
        queue.push(QueueEntry::new(id.clone(), directive, Utc::now()));
        Ok(id)
    }

    fn fetch(&self, token: &Token) -> TempraResult<Vec<QueueEntry>> {
        let queues = self.queues.read();
        let queue = queues
            .get(token)
            .ok_or_else(|| TempraError::TokenNotFound(token.clone()))?;
        Ok(queue.iter().filter(|e| !e.processed).cloned().collect())
    }

    fn ack(&self, token: &Token, id: &EntryId) -> bool {
        let mut queues = self.queues.write();
        let Some(queue) = queues.get_mut(token) else {
            return false;
        };
        let before = queue.len();
        queue.retain(|e| &e.id != id);
        let removed = queue.len() != before;
        if removed {
            debug!(%token, %id, "directive acknowledged");
        }
        removed
    }

    fn queued_len(&self, token: &Token) -> TempraResult<usize> {
        let queues = self.queues.read();
        queues
            .get(token)
            .map(|q| q.iter().filter(|e| !e.processed).count())
            .ok_or_else(|| TempraError::TokenNotFound(token.clone()))
    }

    fn stats(&self) -> StoreStats {
        let queues = self.queues.read();
        StoreStats {
            tokens: queues.len(),
            queued: queues.values().map(Vec::len).sum(),
        }
    }
}
