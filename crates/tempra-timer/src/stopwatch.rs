//! Stopwatch state machine
//!
//! `Idle -> Running -> Stopped -> Running ... -> Idle (reset)`
//!
//! The stopwatch never consults the directive queue itself. Callers perform
//! the user-visible transition first and then decide, outside this type,
//! whether to [`Stopwatch::adopt`] a forced time.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tempra_core::{ConditionKind, ElapsedMs, TempraError, TempraResult, TimerEvent};
use tracing::trace;

use crate::Clock;

/// Stopwatch phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimerPhase {
    /// Initial state, elapsed is zero and lap is disabled
    Idle,
    Running,
    Stopped,
}

impl TimerPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::Stopped => "stopped",
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed lap
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Lap {
    /// 1-based lap number
    pub number: u32,
    pub duration: Duration,
}

/// User press counts, consulted only by directive conditions
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PressCounters {
    pub stops: u64,
    pub laps: u64,
    pub resets: u64,
}

impl PressCounters {
    /// Count for a press-based condition; `None` for `seconds`
    pub fn count(&self, kind: ConditionKind) -> Option<u64> {
        match kind {
            ConditionKind::Stops => Some(self.stops),
            ConditionKind::Laps => Some(self.laps),
            ConditionKind::Resets => Some(self.resets),
            ConditionKind::Seconds => None,
        }
    }

    pub fn clear(&mut self) {
        *self = PressCounters::default();
    }
}

/// The stopwatch
pub struct Stopwatch {
    clock: Arc<dyn Clock>,
    phase: TimerPhase,
    /// Clock reading when the current run began
    started_at: Option<u64>,
    /// Elapsed accumulated before the current run
    base: ElapsedMs,
    /// Elapsed at the previous lap (or zero)
    lap_mark: ElapsedMs,
    laps: Vec<Lap>,
    counters: PressCounters,
}

impl Stopwatch {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Stopwatch {
            clock,
            phase: TimerPhase::Idle,
            started_at: None,
            base: ElapsedMs::ZERO,
            lap_mark: ElapsedMs::ZERO,
            laps: Vec::new(),
            counters: PressCounters::default(),
        }
    }

    #[inline]
    pub fn phase(&self) -> TimerPhase {
        self.phase
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        self.phase == TimerPhase::Running
    }

    /// Current elapsed time
    pub fn elapsed(&self) -> ElapsedMs {
        match self.started_at {
            Some(start) if self.is_running() => {
                let run = self.clock.now_ms().saturating_sub(start);
                self.base + Duration::from_millis(run)
            }
            _ => self.base,
        }
    }

    /// Elapsed time at the most recent lap (zero before the first)
    #[inline]
    pub fn lap_mark(&self) -> ElapsedMs {
        self.lap_mark
    }

    pub fn laps(&self) -> &[Lap] {
        &self.laps
    }

    pub fn counters(&self) -> PressCounters {
        self.counters
    }

    /// Operator-visible counter reset
    pub fn clear_counters(&mut self) {
        self.counters.clear();
    }

    /// Start from idle, or resume from stopped
    pub fn start(&mut self) -> TempraResult<()> {
        match self.phase {
            TimerPhase::Idle | TimerPhase::Stopped => {
                self.started_at = Some(self.clock.now_ms());
                self.phase = TimerPhase::Running;
                trace!(base = %self.base, "stopwatch running");
                Ok(())
            }
            TimerPhase::Running => Err(self.refuse("start")),
        }
    }

    /// Stop the clock and return the frozen elapsed time
    pub fn stop(&mut self) -> TempraResult<ElapsedMs> {
        if !self.is_running() {
            return Err(self.refuse("stop"));
        }
        self.base = self.elapsed();
        self.started_at = None;
        self.phase = TimerPhase::Stopped;
        self.counters.stops += 1;
        Ok(self.base)
    }

    /// Record a lap without stopping the clock
    pub fn lap(&mut self) -> TempraResult<Lap> {
        if !self.is_running() {
            return Err(self.refuse("lap"));
        }
        let now = self.elapsed();
        let lap = Lap {
            number: self.laps.len() as u32 + 1,
            duration: now - self.lap_mark,
        };
        self.lap_mark = now;
        self.laps.push(lap);
        self.counters.laps += 1;
        Ok(lap)
    }

    /// Return to idle; only legal while stopped
    pub fn reset(&mut self) -> TempraResult<()> {
        if self.phase != TimerPhase::Stopped {
            return Err(self.refuse("reset"));
        }
        self.base = ElapsedMs::ZERO;
        self.lap_mark = ElapsedMs::ZERO;
        self.laps.clear();
        self.phase = TimerPhase::Idle;
        self.counters.resets += 1;
        Ok(())
    }

    /// Jump to a forced elapsed time right after `event`
    ///
    /// This is the only way elapsed time moves other than the clock running.
    /// A running stopwatch keeps counting from the new value. After a lap the
    /// next lap is measured from the new value; the completed lap keeps its
    /// measured duration.
    pub fn adopt(&mut self, forced: ElapsedMs, event: TimerEvent) {
        self.base = forced;
        if self.is_running() {
            self.started_at = Some(self.clock.now_ms());
        }
        match event {
            TimerEvent::Lap => self.lap_mark = forced,
            TimerEvent::Stop => self.lap_mark = self.lap_mark.min(forced),
        }
        trace!(%forced, event = event.as_str(), "stopwatch adopted forced time");
    }

    fn refuse(&self, action: &'static str) -> TempraError {
        TempraError::InvalidTransition {
            phase: self.phase.as_str(),
            action,
        }
    }
}

impl fmt::Debug for Stopwatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stopwatch")
            .field("phase", &self.phase)
            .field("elapsed", &self.elapsed())
            .field("laps", &self.laps.len())
            .field("counters", &self.counters)
            .finish()
    }
}
