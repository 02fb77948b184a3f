//! Spectator loop
//!
//! One task owns the [`Spectator`]: a fixed-interval poll and user actions
//! are interleaved with `select!`, so resolution is never concurrent with
//! itself. Poll and ack failures are logged and retried on the next tick.

use std::sync::Arc;
use std::time::Duration;

use tempra_core::TempraError;
use tempra_queue::DirectiveTransport;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, warn};

use crate::{Snapshot, Spectator, UserAction};

/// Handle for the rendering adapter
#[derive(Clone)]
pub struct SpectatorHandle {
    actions: mpsc::Sender<UserAction>,
    snapshots: watch::Receiver<Snapshot>,
}

impl SpectatorHandle {
    /// Queue a user action; `false` once the loop has exited
    pub async fn send(&self, action: UserAction) -> bool {
        self.actions.send(action).await.is_ok()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    /// Watch snapshot updates
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }
}

/// Async driver around a [`Spectator`]
pub struct SpectatorLoop {
    spectator: Spectator,
    transport: Arc<dyn DirectiveTransport>,
    poll_interval: Duration,
    actions: mpsc::Receiver<UserAction>,
    snapshots: watch::Sender<Snapshot>,
}

impl SpectatorLoop {
    pub fn new(
        spectator: Spectator,
        transport: Arc<dyn DirectiveTransport>,
        poll_interval: Duration,
    ) -> (Self, SpectatorHandle) {
        let (action_tx, action_rx) = mpsc::channel(64);
        let (snapshot_tx, snapshot_rx) = watch::channel(spectator.snapshot());
        let driver = SpectatorLoop {
            spectator,
            transport,
            poll_interval,
            actions: action_rx,
            snapshots: snapshot_tx,
        };
        let handle = SpectatorHandle {
            actions: action_tx,
            snapshots: snapshot_rx,
        };
        (driver, handle)
    }

    pub fn spectator(&self) -> &Spectator {
        &self.spectator
    }

    pub fn into_spectator(self) -> Spectator {
        self.spectator
    }

    /// Run until every handle is dropped; returns the final state
    pub async fn run(mut self) -> Spectator {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.poll_once().await,
                action = self.actions.recv() => match action {
                    Some(action) => self.act(action).await,
                    None => break,
                },
            }
            self.publish();
        }

        debug!(token = %self.spectator.token(), "spectator loop finished");
        self.spectator
    }

    /// One fetch, merge and ack cycle
    pub async fn poll_once(&mut self) {
        let token = self.spectator.token().clone();
        match self.transport.fetch(&token).await {
            Ok(entries) => self.spectator.ingest(entries),
            Err(TempraError::TokenNotFound(_)) => {
                self.spectator.poll_failed();
                self.spectator.token_lost();
            }
            Err(e) => {
                self.spectator.poll_failed();
                warn!(%token, error = %e, "poll failed, retrying next tick");
            }
        }
        self.flush_acks().await;
    }

    /// Apply a user action and ack whatever it consumed
    pub async fn act(&mut self, action: UserAction) {
        if let Err(e) = self.spectator.handle(action) {
            debug!(?action, error = %e, "action ignored");
        }
        self.flush_acks().await;
    }

    async fn flush_acks(&mut self) {
        let token = self.spectator.token().clone();
        for id in self.spectator.take_acks() {
            let ok = match self.transport.ack(&token, &id).await {
                Ok(()) => true,
                Err(e) => {
                    warn!(%token, %id, error = %e, "ack failed, retrying next tick");
                    false
                }
            };
            self.spectator.ack_result(id, ok);
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.spectator.snapshot());
    }
}
