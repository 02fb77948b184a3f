//! Scripted spectator scenarios
//!
//! A [`Scenario`] wires an in-memory queue, a token, a [`ManualClock`] and a
//! spectator loop together so tests can push, poll and press buttons one step
//! at a time, without timers.

use std::path::PathBuf;
use std::sync::Arc;

use tempra_core::{EntryId, ForceDirective, TempraResult, Token};
use tempra_force::Gate;
use tempra_queue::{
    DirectiveStore, DirectiveTransport, LocalTransport, MemoryStore, ProcessedSet,
    DEFAULT_PROCESSED_CAPACITY,
};
use tempra_runtime::{Spectator, SpectatorLoop, UserAction};
use tempra_timer::ManualClock;

use crate::{ChaosConfig, ChaosTransport};

/// Poll interval handed to the loop; scenarios never run its ticker
const SCENARIO_POLL_MS: u64 = 400;

/// One performer, one spectator, one queue
pub struct Scenario {
    store: Arc<MemoryStore>,
    token: Token,
    clock: ManualClock,
    transport: Arc<dyn DirectiveTransport>,
    chaos: Option<Arc<ChaosTransport>>,
    gate: Gate,
    processed_path: Option<PathBuf>,
    driver: SpectatorLoop,
}

/// Builder for a [`Scenario`]
#[derive(Default)]
pub struct ScenarioBuilder {
    chaos: Option<(ChaosConfig, u64)>,
    processed_path: Option<PathBuf>,
    gate: Gate,
}

impl ScenarioBuilder {
    /// Deliver through a [`ChaosTransport`]
    pub fn chaos(mut self, config: ChaosConfig, seed: u64) -> Self {
        self.chaos = Some((config, seed));
        self
    }

    /// Save processed ids to `path`; [`Scenario::restart`] reloads them
    pub fn persist(mut self, path: PathBuf) -> Self {
        self.processed_path = Some(path);
        self
    }

    pub fn gate(mut self, gate: Gate) -> Self {
        self.gate = gate;
        self
    }

    pub fn build(self) -> Scenario {
        let store = Arc::new(MemoryStore::new());
        let token = store.create_token();
        let local: Arc<dyn DirectiveTransport> = Arc::new(LocalTransport::new(store.clone()));

        let (transport, chaos) = match self.chaos {
            Some((config, seed)) => {
                let chaos = Arc::new(ChaosTransport::new(local, config, seed));
                (chaos.clone() as Arc<dyn DirectiveTransport>, Some(chaos))
            }
            None => (local, None),
        };

        let clock = ManualClock::new();
        let processed = ProcessedSet::new(DEFAULT_PROCESSED_CAPACITY);
        let driver = Scenario::spawn_driver(
            &token,
            &clock,
            &transport,
            self.gate,
            processed,
            self.processed_path.clone(),
        );

        Scenario {
            store,
            token,
            clock,
            transport,
            chaos,
            gate: self.gate,
            processed_path: self.processed_path,
            driver,
        }
    }
}

impl Scenario {
    /// Lossless delivery, no persistence
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> ScenarioBuilder {
        ScenarioBuilder::default()
    }

    pub fn with_gate(gate: Gate) -> Self {
        Self::builder().gate(gate).build()
    }

    fn spawn_driver(
        token: &Token,
        clock: &ManualClock,
        transport: &Arc<dyn DirectiveTransport>,
        gate: Gate,
        processed: ProcessedSet,
        processed_path: Option<PathBuf>,
    ) -> SpectatorLoop {
        let mut spectator = Spectator::new(token.clone(), Arc::new(clock.clone()), gate, processed);
        if let Some(path) = processed_path {
            spectator = spectator.with_persistence(path);
        }
        let (driver, _handle) = SpectatorLoop::new(
            spectator,
            transport.clone(),
            std::time::Duration::from_millis(SCENARIO_POLL_MS),
        );
        driver
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn store(&self) -> &Arc<MemoryStore> {
        &self.store
    }

    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    pub fn spectator(&self) -> &Spectator {
        self.driver.spectator()
    }

    pub fn chaos(&self) -> Option<&ChaosTransport> {
        self.chaos.as_deref()
    }

    /// Performer push
    pub fn push(&self, directive: ForceDirective) -> TempraResult<EntryId> {
        self.store.enqueue(&self.token, directive)
    }

    /// One poll cycle (fetch, merge, ack)
    pub async fn poll(&mut self) {
        self.driver.poll_once().await;
    }

    /// One button press, with its acks
    pub async fn press(&mut self, action: UserAction) {
        self.driver.act(action).await;
    }

    pub fn advance(&self, millis: u64) {
        self.clock.advance_ms(millis);
    }

    /// Start, wait `millis`, stop
    pub async fn run_for(&mut self, millis: u64) {
        self.press(UserAction::Start).await;
        self.advance(millis);
        self.press(UserAction::Stop).await;
    }

    /// What the spectator reads off the display
    pub fn display(&self) -> String {
        self.spectator().snapshot().display()
    }

    /// Entries still on the server
    pub fn queued(&self) -> usize {
        self.store.queued_len(&self.token).unwrap_or(0)
    }

    /// Crash and relaunch the spectator
    ///
    /// Local queue, unsent acks and the stopwatch are lost; the processed set
    /// is reloaded from disk when the scenario is persistent.
    pub fn restart(&mut self) -> TempraResult<()> {
        let processed = match &self.processed_path {
            Some(path) => ProcessedSet::load(path, DEFAULT_PROCESSED_CAPACITY)?,
            None => ProcessedSet::new(DEFAULT_PROCESSED_CAPACITY),
        };
        self.driver = Self::spawn_driver(
            &self.token,
            &self.clock,
            &self.transport,
            self.gate,
            processed,
            self.processed_path.clone(),
        );
        Ok(())
    }

    pub fn into_spectator(self) -> Spectator {
        self.driver.into_spectator()
    }
}

impl Default for Scenario {
    fn default() -> Self {
        Self::new()
    }
}
