//! Chaos transport
//!
//! Wraps a real transport and loses requests:
//! - fetches that never return
//! - acks that never reach the store
//! - acks that reach the store but whose reply is lost

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempra_core::{EntryId, QueueEntry, TempraError, TempraResult, Token};
use tempra_queue::DirectiveTransport;

/// Loss rates (0.0 - 1.0)
#[derive(Clone, Debug)]
pub struct ChaosConfig {
    pub fetch_loss_rate: f64,
    /// Ack dropped before the store sees it
    pub ack_loss_rate: f64,
    /// Ack applied by the store, reply lost
    pub ack_reply_loss_rate: f64,
}

impl Default for ChaosConfig {
    fn default() -> Self {
        ChaosConfig {
            fetch_loss_rate: 0.05,
            ack_loss_rate: 0.05,
            ack_reply_loss_rate: 0.05,
        }
    }
}

impl ChaosConfig {
    pub fn none() -> Self {
        ChaosConfig {
            fetch_loss_rate: 0.0,
            ack_loss_rate: 0.0,
            ack_reply_loss_rate: 0.0,
        }
    }

    pub fn poor() -> Self {
        ChaosConfig {
            fetch_loss_rate: 0.2,
            ack_loss_rate: 0.2,
            ack_reply_loss_rate: 0.1,
        }
    }

    /// Most requests fail
    pub fn hostile() -> Self {
        ChaosConfig {
            fetch_loss_rate: 0.6,
            ack_loss_rate: 0.5,
            ack_reply_loss_rate: 0.3,
        }
    }
}

/// Loss counters
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChaosStats {
    pub fetches: u64,
    pub fetches_lost: u64,
    pub acks: u64,
    pub acks_lost: u64,
    pub ack_replies_lost: u64,
}

/// Lossy transport with a seeded RNG
pub struct ChaosTransport {
    inner: Arc<dyn DirectiveTransport>,
    config: ChaosConfig,
    rng: Mutex<StdRng>,
    stats: Mutex<ChaosStats>,
}

impl ChaosTransport {
    pub fn new(inner: Arc<dyn DirectiveTransport>, config: ChaosConfig, seed: u64) -> Self {
        ChaosTransport {
            inner,
            config,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            stats: Mutex::new(ChaosStats::default()),
        }
    }

    pub fn stats(&self) -> ChaosStats {
        self.stats.lock().clone()
    }

    fn roll(&self, rate: f64) -> bool {
        rate > 0.0 && self.rng.lock().gen_bool(rate.min(1.0))
    }
}

#[async_trait]
impl DirectiveTransport for ChaosTransport {
    async fn fetch(&self, token: &Token) -> TempraResult<Vec<QueueEntry>> {
        self.stats.lock().fetches += 1;
        if self.roll(self.config.fetch_loss_rate) {
            self.stats.lock().fetches_lost += 1;
            return Err(TempraError::TransportError("fetch lost".to_string()));
        }
        self.inner.fetch(token).await
    }

    async fn ack(&self, token: &Token, id: &EntryId) -> TempraResult<()> {
        self.stats.lock().acks += 1;
        if self.roll(self.config.ack_loss_rate) {
            self.stats.lock().acks_lost += 1;
            return Err(TempraError::TransportError("ack lost".to_string()));
        }
        self.inner.ack(token, id).await?;
        if self.roll(self.config.ack_reply_loss_rate) {
            self.stats.lock().ack_replies_lost += 1;
            return Err(TempraError::TransportError("ack reply lost".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempra_core::ForceDirective;
    use tempra_queue::{DirectiveStore, LocalTransport, MemoryStore};

    #[tokio::test]
    async fn test_no_chaos_is_transparent() {
        let store = Arc::new(MemoryStore::new());
        let token = store.create_token();
        let id = store.enqueue(&token, ForceDirective::ms(1)).unwrap();
        let chaos = ChaosTransport::new(
            Arc::new(LocalTransport::new(store.clone())),
            ChaosConfig::none(),
            7,
        );

        assert_eq!(chaos.fetch(&token).await.unwrap().len(), 1);
        chaos.ack(&token, &id).await.unwrap();
        assert!(store.fetch(&token).unwrap().is_empty());
        assert_eq!(chaos.stats().fetches_lost, 0);
    }

    #[tokio::test]
    async fn test_reply_loss_still_reaches_store() {
        let store = Arc::new(MemoryStore::new());
        let token = store.create_token();
        let id = store.enqueue(&token, ForceDirective::ms(1)).unwrap();
        let config = ChaosConfig {
            fetch_loss_rate: 0.0,
            ack_loss_rate: 0.0,
            ack_reply_loss_rate: 1.0,
        };
        let chaos = ChaosTransport::new(Arc::new(LocalTransport::new(store.clone())), config, 7);

        assert!(chaos.ack(&token, &id).await.is_err());
        assert!(store.fetch(&token).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_seed_same_losses() {
        let store = Arc::new(MemoryStore::new());
        let token = store.create_token();
        let run = |seed| {
            let chaos = ChaosTransport::new(
                Arc::new(LocalTransport::new(store.clone())),
                ChaosConfig::hostile(),
                seed,
            );
            let token = token.clone();
            async move {
                let mut outcomes = Vec::new();
                for _ in 0..32 {
                    outcomes.push(chaos.fetch(&token).await.is_ok());
                }
                outcomes
            }
        };
        assert_eq!(run(42).await, run(42).await);
    }
}
