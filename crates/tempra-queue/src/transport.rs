//! Spectator-side transport to the directive store

use std::sync::Arc;

use async_trait::async_trait;
use tempra_core::{EntryId, QueueEntry, TempraResult, Token};

use crate::DirectiveStore;

/// Fetch/ack channel used by the spectator loop
///
/// Failures are reported as `TransportError` (or `TokenNotFound` from fetch)
/// and are retried by the caller on its next poll.
#[async_trait]
pub trait DirectiveTransport: Send + Sync {
    async fn fetch(&self, token: &Token) -> TempraResult<Vec<QueueEntry>>;

    async fn ack(&self, token: &Token, id: &EntryId) -> TempraResult<()>;
}

/// Transport that talks to a store in the same process
#[derive(Clone)]
pub struct LocalTransport {
    store: Arc<dyn DirectiveStore>,
}

impl LocalTransport {
    pub fn new(store: Arc<dyn DirectiveStore>) -> Self {
        LocalTransport { store }
    }
}

#[async_trait]
impl DirectiveTransport for LocalTransport {
    async fn fetch(&self, token: &Token) -> TempraResult<Vec<QueueEntry>> {
        self.store.fetch(token)
    }

    async fn ack(&self, token: &Token, id: &EntryId) -> TempraResult<()> {
        self.store.ack(token, id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryStore;
    use tempra_core::ForceDirective;

    #[tokio::test]
    async fn test_local_transport_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let token = store.create_token();
        let id = store.enqueue(&token, ForceDirective::ms(15)).unwrap();

        let transport = LocalTransport::new(store.clone());
        let entries = transport.fetch(&token).await.unwrap();
        assert_eq!(entries.len(), 1);

        transport.ack(&token, &id).await.unwrap();
        transport.ack(&token, &id).await.unwrap();
        assert!(transport.fetch(&token).await.unwrap().is_empty());
    }
}
