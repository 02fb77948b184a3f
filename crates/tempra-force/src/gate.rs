//! Trigger/Condition Gate
//!
//! Decides, for one timer event, whether the head directive fires. The gate
//! only ever sees the head; callers keep strict FIFO order.

use tempra_core::{ConditionKind, ElapsedMs, ForceDirective, Mode, TimerEvent};
use tempra_timer::PressCounters;
use tracing::debug;

use crate::Resolver;

/// Why the head directive did not fire
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HoldReason {
    /// Trigger names the other event
    TriggerMismatch,
    /// Condition not yet met
    ConditionUnmet,
    /// Engine found no matching time
    Unresolvable,
    /// `control`/`preset` are never fired by the gate
    NotTimeForce,
}

/// Gate decision for one event
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Adopt `elapsed`; remove the queue entry when `consumed`
    Fired { elapsed: ElapsedMs, consumed: bool },
    /// Leave the entry in place, no change to the display
    Held(HoldReason),
}

impl GateOutcome {
    pub fn forced(&self) -> Option<ElapsedMs> {
        match self {
            GateOutcome::Fired { elapsed, .. } => Some(*elapsed),
            GateOutcome::Held(_) => None,
        }
    }
}

/// Trigger/condition gate in front of the resolver
#[derive(Clone, Copy, Debug, Default)]
pub struct Gate {
    resolver: Resolver,
}

impl Gate {
    pub fn new(resolver: Resolver) -> Self {
        Gate { resolver }
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    /// Check trigger and condition without resolving
    ///
    /// Only the directive's own trigger and condition count; inside a `list`
    /// the parent's apply to every sub-directive.
    pub fn check(
        &self,
        event: TimerEvent,
        elapsed: ElapsedMs,
        counters: &PressCounters,
        directive: &ForceDirective,
    ) -> Result<(), HoldReason> {
        if !directive.mode.is_time_force() {
            return Err(HoldReason::NotTimeForce);
        }
        if !directive.trigger.accepts(event) {
            return Err(HoldReason::TriggerMismatch);
        }
        if let Some(condition) = directive.condition {
            let observed = match condition.kind {
                ConditionKind::Seconds => elapsed.whole_seconds(),
                kind => counters.count(kind).unwrap_or(0),
            };
            if observed < condition.value {
                return Err(HoldReason::ConditionUnmet);
            }
        }
        Ok(())
    }

    /// Evaluate the head directive for `event` at `elapsed`
    ///
    /// On success a `list` loses its first sub-directive and is consumed once
    /// empty. On any hold the directive is left untouched.
    pub fn evaluate(
        &self,
        event: TimerEvent,
        elapsed: ElapsedMs,
        counters: &PressCounters,
        directive: &mut ForceDirective,
    ) -> GateOutcome {
        if let Err(reason) = self.check(event, elapsed, counters, directive) {
            debug!(mode = %directive.mode, event = event.as_str(), ?reason, "directive held");
            return GateOutcome::Held(reason);
        }

        let Some(forced) = self.resolver.resolve(elapsed, directive) else {
            debug!(mode = %directive.mode, %elapsed, "directive unresolvable, stays queued");
            return GateOutcome::Held(HoldReason::Unresolvable);
        };

        let consumed = if directive.mode == Mode::List {
            directive.list.remove(0);
            directive.list.is_empty()
        } else {
            true
        };

        debug!(
            mode = %directive.mode,
            event = event.as_str(),
            from = %elapsed,
            to = %forced,
            consumed,
            "directive fired"
        );
        GateOutcome::Fired {
            elapsed: forced,
            consumed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempra_core::{Condition, ControlAction, Trigger};

    fn at(ss: u64, cs: u64) -> ElapsedMs {
        ElapsedMs::from_parts(0, ss, cs)
    }

    #[test]
    fn test_trigger_matching() {
        let gate = Gate::default();
        let counters = PressCounters::default();

        let mut on_stop = ForceDirective::ms(15).with_trigger(Trigger::Stop);
        assert_eq!(
            gate.evaluate(TimerEvent::Lap, at(3, 50), &counters, &mut on_stop),
            GateOutcome::Held(HoldReason::TriggerMismatch)
        );
        assert_eq!(
            gate.evaluate(TimerEvent::Stop, at(3, 50), &counters, &mut on_stop),
            GateOutcome::Fired { elapsed: at(3, 15), consumed: true }
        );

        let mut on_lap = ForceDirective::ms(15).with_trigger(Trigger::Lap);
        assert!(gate.check(TimerEvent::Stop, at(3, 50), &counters, &on_lap).is_err());
        assert!(gate
            .evaluate(TimerEvent::Lap, at(3, 50), &counters, &mut on_lap)
            .forced()
            .is_some());

        let either = ForceDirective::ms(15);
        assert!(gate.check(TimerEvent::Stop, at(1, 0), &counters, &either).is_ok());
        assert!(gate.check(TimerEvent::Lap, at(1, 0), &counters, &either).is_ok());
    }

    #[test]
    fn test_conditions() {
        let gate = Gate::default();
        let d = ForceDirective::ms(1).with_condition(Condition::new(ConditionKind::Seconds, 10));
        let counters = PressCounters::default();
        assert_eq!(
            gate.check(TimerEvent::Stop, at(9, 99), &counters, &d),
            Err(HoldReason::ConditionUnmet)
        );
        assert!(gate.check(TimerEvent::Stop, at(10, 0), &counters, &d).is_ok());

        let d = ForceDirective::ms(1).with_condition(Condition::new(ConditionKind::Stops, 2));
        let one = PressCounters { stops: 1, ..Default::default() };
        let two = PressCounters { stops: 2, ..Default::default() };
        assert!(gate.check(TimerEvent::Stop, at(1, 0), &one, &d).is_err());
        assert!(gate.check(TimerEvent::Stop, at(1, 0), &two, &d).is_ok());
    }

    #[test]
    fn test_unresolvable_leaves_directive() {
        let gate = Gate::default();
        let mut d = ForceDirective::digit_sum(50);
        let before = d.clone();
        assert_eq!(
            gate.evaluate(TimerEvent::Stop, at(12, 0), &PressCounters::default(), &mut d),
            GateOutcome::Held(HoldReason::Unresolvable)
        );
        assert_eq!(d, before);
    }

    #[test]
    fn test_list_pops_one_per_event() {
        let gate = Gate::default();
        let counters = PressCounters::default();
        let mut list = ForceDirective::list(vec![ForceDirective::ms(1), ForceDirective::ms(2)])
            .with_trigger(Trigger::Lap);

        assert_eq!(
            gate.evaluate(TimerEvent::Lap, at(4, 50), &counters, &mut list),
            GateOutcome::Fired { elapsed: at(4, 1), consumed: false }
        );
        assert_eq!(list.list.len(), 1);
        assert_eq!(
            gate.evaluate(TimerEvent::Lap, at(6, 50), &counters, &mut list),
            GateOutcome::Fired { elapsed: at(6, 2), consumed: true }
        );
    }

    #[test]
    fn test_list_failure_does_not_pop() {
        let gate = Gate::default();
        let mut list =
            ForceDirective::list(vec![ForceDirective::digit_sum(50), ForceDirective::ms(2)]);
        let outcome =
            gate.evaluate(TimerEvent::Stop, at(1, 0), &PressCounters::default(), &mut list);
        assert_eq!(outcome, GateOutcome::Held(HoldReason::Unresolvable));
        assert_eq!(list.list.len(), 2);
    }

    #[test]
    fn test_list_ignores_sub_triggers() {
        let gate = Gate::default();
        let mut list = ForceDirective::list(vec![ForceDirective::ms(7).with_trigger(Trigger::Stop)])
            .with_trigger(Trigger::Lap);
        assert!(gate
            .evaluate(TimerEvent::Lap, at(2, 0), &PressCounters::default(), &mut list)
            .forced()
            .is_some());
    }

    #[test]
    fn test_control_is_not_gated() {
        let gate = Gate::default();
        let mut d = ForceDirective::control(ControlAction::Stop);
        assert_eq!(
            gate.evaluate(TimerEvent::Stop, at(1, 0), &PressCounters::default(), &mut d),
            GateOutcome::Held(HoldReason::NotTimeForce)
        );
    }
}
