//! Spectator node
//!
//! Everything the spectator device does, without I/O:
//!
//! 1. user action completes on the stopwatch (stop, lap...)
//! 2. the gate looks at the head time directive for that event
//! 3. a fired directive is adopted, recorded as processed and queued for ack
//!
//! `control` and `preset` entries bypass the gate and are applied as soon as
//! they arrive. The async loop around this type lives in [`crate::driver`].

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::Arc;

use tempra_core::{
    ControlAction, ElapsedMs, EntryId, Mode, QueueEntry, TempraError, TempraResult, TimerEvent,
    Token,
};
use tempra_force::{Gate, GateOutcome, Resolver};
use tempra_queue::{PendingQueue, ProcessedSet};
use tempra_timer::{Clock, Lap, PressCounters, Stopwatch, TimerPhase};
use tracing::{debug, info, warn};

use crate::config::SpectatorConfig;

/// User-visible button press
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UserAction {
    Start,
    Stop,
    /// Single start/stop button
    StartStop,
    Lap,
    Reset,
    ClearCounters,
}

/// Spectator statistics
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SpectatorStats {
    pub polls: u64,
    pub poll_failures: u64,
    pub arrivals: u64,
    pub forces_applied: u64,
    pub forces_held: u64,
    pub controls_applied: u64,
    pub controls_ignored: u64,
    pub replays_suppressed: u64,
    pub acks_sent: u64,
    pub ack_failures: u64,
}

/// What the rendering adapter shows
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub phase: TimerPhase,
    pub elapsed: ElapsedMs,
    pub laps: Vec<Lap>,
    pub status: String,
    pub counters: PressCounters,
    pub pending: usize,
}

impl Snapshot {
    pub fn display(&self) -> String {
        self.elapsed.to_string()
    }
}

/// The spectator display's state and decision logic
pub struct Spectator {
    token: Token,
    stopwatch: Stopwatch,
    gate: Gate,
    pending: PendingQueue,
    processed: ProcessedSet,
    processed_path: Option<PathBuf>,
    /// Ids applied but not yet acknowledged
    outbox: VecDeque<EntryId>,
    status: String,
    stats: SpectatorStats,
}

impl Spectator {
    pub fn new(token: Token, clock: Arc<dyn Clock>, gate: Gate, processed: ProcessedSet) -> Self {
        Spectator {
            token,
            stopwatch: Stopwatch::new(clock),
            gate,
            pending: PendingQueue::new(),
            processed,
            processed_path: None,
            outbox: VecDeque::new(),
            status: "Ready".to_string(),
            stats: SpectatorStats::default(),
        }
    }

    /// Spectator for `token` as configured, with its processed set reloaded
    /// from [`SpectatorConfig::processed_file`]
    pub fn from_config(
        token: Token,
        clock: Arc<dyn Clock>,
        config: &SpectatorConfig,
    ) -> TempraResult<Self> {
        let path = config.processed_file(&token);
        let processed = ProcessedSet::load(&path, config.processed_capacity)?;
        let gate = Gate::new(Resolver::new(config.digit_sum_search));
        Ok(Spectator::new(token, clock, gate, processed).with_persistence(path))
    }

    /// Persist the processed set to `path` after every application
    pub fn with_persistence(mut self, path: PathBuf) -> Self {
        self.processed_path = Some(path);
        self
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn stopwatch(&self) -> &Stopwatch {
        &self.stopwatch
    }

    pub fn pending(&self) -> &PendingQueue {
        &self.pending
    }

    pub fn processed(&self) -> &ProcessedSet {
        &self.processed
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn stats(&self) -> &SpectatorStats {
        &self.stats
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.stopwatch.phase(),
            elapsed: self.stopwatch.elapsed(),
            laps: self.stopwatch.laps().to_vec(),
            status: self.status.clone(),
            counters: self.stopwatch.counters(),
            pending: self.pending.len(),
        }
    }

    /// Apply a user action; returns the forced time if a directive fired
    pub fn handle(&mut self, action: UserAction) -> TempraResult<Option<ElapsedMs>> {
        match action {
            UserAction::Start => {
                self.stopwatch.start()?;
                self.status = "Running".to_string();
                Ok(None)
            }
            UserAction::Stop => {
                let elapsed = self.stopwatch.stop()?;
                self.status = "Stopped".to_string();
                Ok(self.on_event(TimerEvent::Stop, elapsed))
            }
            UserAction::StartStop => {
                if self.stopwatch.is_running() {
                    self.handle(UserAction::Stop)
                } else {
                    self.handle(UserAction::Start)
                }
            }
            UserAction::Lap => {
                let lap = self.stopwatch.lap()?;
                self.status = format!("Lap {}", lap.number);
                let at = self.stopwatch.lap_mark();
                Ok(self.on_event(TimerEvent::Lap, at))
            }
            UserAction::Reset => {
                self.stopwatch.reset()?;
                self.status = "Ready".to_string();
                Ok(None)
            }
            UserAction::ClearCounters => {
                self.stopwatch.clear_counters();
                Ok(None)
            }
        }
    }

    /// Offer the head time directive to the gate
    fn on_event(&mut self, event: TimerEvent, elapsed: ElapsedMs) -> Option<ElapsedMs> {
        let counters = self.stopwatch.counters();
        let entry = self.pending.head_time_entry_mut()?;
        let id = entry.id.clone();

        match self.gate.evaluate(event, elapsed, &counters, &mut entry.directive) {
            GateOutcome::Fired { elapsed: forced, consumed } => {
                self.stopwatch.adopt(forced, event);
                self.stats.forces_applied += 1;
                if consumed {
                    self.pending.remove(&id);
                    self.mark_applied(id);
                }
                Some(forced)
            }
            GateOutcome::Held(_) => {
                self.stats.forces_held += 1;
                None
            }
        }
    }

    /// Merge a successful fetch and apply out-of-band directives
    pub fn ingest(&mut self, fetched: Vec<QueueEntry>) {
        self.stats.polls += 1;
        let report = self.pending.merge(fetched, &self.processed);

        if !report.arrivals.is_empty() {
            debug!(token = %self.token, arrivals = report.arrivals.len(), "directives arrived");
            self.stats.arrivals += report.arrivals.len() as u64;
        }
        for id in report.replayed {
            // applied earlier but the server still has it: the ack was lost
            self.stats.replays_suppressed += 1;
            if !self.outbox.contains(&id) {
                self.outbox.push_back(id);
            }
        }
        if report.vanished > 0 {
            debug!(token = %self.token, vanished = report.vanished, "directives withdrawn");
        }

        self.apply_out_of_band();
    }

    /// The token no longer exists; everything pending is gone
    pub fn token_lost(&mut self) {
        if !self.pending.is_empty() {
            info!(
                token = %self.token,
                dropped = self.pending.len(),
                "token removed, clearing pending directives"
            );
        }
        self.pending.clear();
    }

    /// Count a failed poll
    pub fn poll_failed(&mut self) {
        self.stats.poll_failures += 1;
    }

    fn apply_out_of_band(&mut self) {
        for id in self.pending.out_of_band() {
            let Some(entry) = self.pending.get(&id) else {
                continue;
            };
            let directive = entry.directive.clone();

            let applied = match directive.mode {
                Mode::Control => match directive.control_action() {
                    Some(action) => self.apply_control(action),
                    None => {
                        warn!(%id, target = ?directive.target, "unknown control action");
                        true
                    }
                },
                Mode::Preset => {
                    self.status = format!("Preset: {}", directive.name.as_deref().unwrap_or("?"));
                    true
                }
                _ => false,
            };

            if applied {
                self.pending.remove(&id);
                self.mark_applied(id);
            }
        }
    }

    /// Remote start/stop/lap/reset; `false` keeps the entry for a later poll
    ///
    /// A control that the current phase refuses is spent: it is acked and
    /// never fires later.
    fn apply_control(&mut self, action: ControlAction) -> bool {
        let result = match action {
            ControlAction::Start | ControlAction::Resume => self.handle(UserAction::Start),
            ControlAction::Stop => self.handle(UserAction::Stop),
            ControlAction::Lap => self.handle(UserAction::Lap),
            ControlAction::Reset => self.handle(UserAction::Reset),
            ControlAction::ClearCounters => self.handle(UserAction::ClearCounters),
        };

        match result {
            Ok(_) => {
                self.stats.controls_applied += 1;
                true
            }
            Err(TempraError::InvalidTransition { phase, action }) => {
                debug!(phase, action, "control does not apply, dropping it");
                self.stats.controls_ignored += 1;
                true
            }
            Err(e) => {
                warn!(error = %e, "control failed");
                false
            }
        }
    }

    fn mark_applied(&mut self, id: EntryId) {
        self.processed.insert(id.clone());
        if let Some(path) = &self.processed_path {
            if let Err(e) = self.processed.save(path) {
                warn!(error = %e, "could not persist processed ids");
            }
        }
        self.outbox.push_back(id);
    }

    /// Take every ack waiting to be sent
    pub fn take_acks(&mut self) -> Vec<EntryId> {
        self.outbox.drain(..).collect()
    }

    /// Record the outcome of one ack
    pub fn ack_result(&mut self, id: EntryId, ok: bool) {
        if ok {
            self.stats.acks_sent += 1;
        } else {
            self.stats.ack_failures += 1;
            self.outbox.push_back(id);
        }
    }
}
