use roadways_game::{ActionOutcome, Command, PendingTrigger, TripMachine, TripPhase, TripState};

use crate::logic::policy::{PlayerPolicy, PolicyDecision};

/// Hard stop for sessions whose policy never ends the trip.
pub const DEFAULT_MAX_STEPS: u32 = 2_000;

/// Snapshot of a resolved narrative event.
#[derive(Debug, Clone)]
pub struct DecisionRecord {
    pub minute: u32,
    pub event_id: String,
    pub choice_index: usize,
    pub choice_label: String,
    pub policy_name: String,
    pub rationale: Option<String>,
}

/// Result of advancing the simulation by one clock step.
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub clock_ms: u64,
    pub minute: u32,
    pub action: Option<(Command, ActionOutcome)>,
    pub decision: Option<DecisionRecord>,
    pub triggers_fired: u32,
    pub game_ended: bool,
}

#[derive(Debug, Clone, Copy)]
struct ScheduledTrigger {
    due_ms: u64,
    epoch: u64,
}

/// Deterministic host for a [`TripMachine`] on a virtual clock.
///
/// Each step advances the clock by one tick interval, delivers every delayed
/// trigger that has come due, then either resolves the active event or lets
/// the policy drive after the clock tick.
pub struct SimulationSession {
    machine: TripMachine,
    clock_ms: u64,
    tick_ms: u64,
    scheduled: Vec<ScheduledTrigger>,
    steps: u32,
    max_steps: u32,
    violations: Vec<String>,
}

impl SimulationSession {
    pub fn new(mut machine: TripMachine, max_steps: u32) -> Self {
        let tick_ms = machine.config().tick_interval_ms.max(1);
        let mut scheduled = Vec::new();
        if let Some(PendingTrigger { epoch, delay }) = machine.take_pending_trigger() {
            scheduled.push(ScheduledTrigger {
                due_ms: duration_ms(delay),
                epoch,
            });
        }
        Self {
            machine,
            clock_ms: 0,
            tick_ms,
            scheduled,
            steps: 0,
            max_steps,
            violations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn machine(&self) -> &TripMachine {
        &self.machine
    }

    #[must_use]
    pub const fn state(&self) -> &TripState {
        self.machine.state()
    }

    #[must_use]
    pub const fn steps(&self) -> u32 {
        self.steps
    }

    #[must_use]
    pub const fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    #[must_use]
    pub fn violations(&self) -> &[String] {
        &self.violations
    }

    #[must_use]
    pub fn into_machine(self) -> TripMachine {
        self.machine
    }

    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.machine.phase().is_terminal() || self.steps >= self.max_steps
    }

    pub fn advance(&mut self, policy: &mut dyn PlayerPolicy) -> TurnOutcome {
        self.steps = self.steps.saturating_add(1);
        self.clock_ms = self.clock_ms.saturating_add(self.tick_ms);
        let triggers_fired = self.fire_due_triggers();

        let mut action = None;
        let mut decision = None;
        match self.machine.phase() {
            TripPhase::EventPending => {
                decision = self.resolve_event(policy);
            }
            TripPhase::Driving => {
                self.apply_checked(Command::Tick);
                if self.machine.phase() == TripPhase::Driving
                    && let Some(command) = policy.driving_action(self.machine.state())
                {
                    let outcome = self.apply_checked(command);
                    action = Some((command, outcome));
                }
            }
            TripPhase::Won | TripPhase::Lost => {}
        }

        TurnOutcome {
            clock_ms: self.clock_ms,
            minute: self.machine.state().elapsed_minutes,
            action,
            decision,
            triggers_fired,
            game_ended: self.is_finished(),
        }
    }

    /// Apply a command outside the policy loop, with the same checks.
    pub fn apply(&mut self, command: Command) -> ActionOutcome {
        self.apply_checked(command)
    }

    fn resolve_event(&mut self, policy: &mut dyn PlayerPolicy) -> Option<DecisionRecord> {
        let event = self.machine.state().active_event.clone()?;
        let PolicyDecision {
            choice_index,
            rationale,
        } = policy.pick_choice(self.machine.state(), &event);
        let safe_index = if choice_index < event.options.len() {
            choice_index
        } else {
            0
        };
        let choice_label = event.option(safe_index).map_or_else(
            || "No available option".to_string(),
            |choice| choice.text.clone(),
        );
        let minute = self.machine.state().elapsed_minutes;
        self.apply_checked(Command::Choose { index: safe_index });
        Some(DecisionRecord {
            minute,
            event_id: event.id,
            choice_index: safe_index,
            choice_label,
            policy_name: policy.name().to_string(),
            rationale,
        })
    }

    fn fire_due_triggers(&mut self) -> u32 {
        let clock = self.clock_ms;
        let (due, waiting): (Vec<_>, Vec<_>) = self
            .scheduled
            .drain(..)
            .partition(|trigger| trigger.due_ms <= clock);
        self.scheduled = waiting;
        let mut due = due;
        due.sort_by_key(|trigger| trigger.due_ms);
        let mut fired = 0;
        for trigger in due {
            if self
                .apply_checked(Command::TriggerEvent {
                    epoch: trigger.epoch,
                })
                .is_applied()
            {
                fired += 1;
            }
        }
        fired
    }

    fn apply_checked(&mut self, command: Command) -> ActionOutcome {
        let before = self.machine.state().clone();
        let terminal_before = self.machine.phase().is_terminal();
        let outcome = self.machine.apply(command);
        self.check_invariants(command, &before, terminal_before, outcome);
        if let Some(PendingTrigger { epoch, delay }) = self.machine.take_pending_trigger() {
            self.scheduled.push(ScheduledTrigger {
                due_ms: self.clock_ms.saturating_add(duration_ms(delay)),
                epoch,
            });
        }
        outcome
    }

    fn check_invariants(
        &mut self,
        command: Command,
        before: &TripState,
        terminal_before: bool,
        outcome: ActionOutcome,
    ) {
        let after = self.machine.state();
        let mut problems = Vec::new();
        for (label, value) in [
            ("satisfaction", after.satisfaction),
            ("bus_condition", after.bus_condition),
            ("fuel", after.fuel),
            ("speed", after.speed),
        ] {
            if !(0.0..=100.0).contains(&value) {
                problems.push(format!("{label} out of range ({value})"));
            }
        }
        if after.game_over && after.game_won {
            problems.push("won and lost at once".to_string());
        }
        if command != Command::Restart && after.route_progress < before.route_progress {
            problems.push(format!(
                "progress fell from {:.2} to {:.2}",
                before.route_progress, after.route_progress
            ));
        }
        if terminal_before && command != Command::Restart && outcome.is_applied() {
            problems.push("finished trip accepted an action".to_string());
        }
        if matches!(outcome, ActionOutcome::Ignored(_)) && after != before {
            problems.push("ignored action changed state".to_string());
        }
        for problem in problems {
            self.violations
                .push(format!("step {} {command:?}: {problem}", self.steps));
        }
    }
}

fn duration_ms(delay: std::time::Duration) -> u64 {
    u64::try_from(delay.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::policy::DrivingStrategy;

    #[test]
    fn first_event_arrives_on_the_second_step() {
        let mut session = SimulationSession::new(TripMachine::with_seed(5), DEFAULT_MAX_STEPS);
        let mut policy = DrivingStrategy::Cautious.create_policy(5);
        let first = session.advance(policy.as_mut());
        assert_eq!(first.triggers_fired, 0);
        assert_eq!(first.minute, 1);
        let second = session.advance(policy.as_mut());
        assert_eq!(second.clock_ms, 20_000);
        assert_eq!(second.triggers_fired, 1);
        assert!(second.decision.is_some());
    }

    #[test]
    fn sessions_always_finish() {
        for strategy in DrivingStrategy::ALL {
            let mut session =
                SimulationSession::new(TripMachine::with_seed(21), DEFAULT_MAX_STEPS);
            let mut policy = strategy.create_policy(21);
            while !session.is_finished() {
                session.advance(policy.as_mut());
            }
            assert!(session.machine().phase().is_terminal(), "{strategy} stalled");
            assert!(session.violations().is_empty(), "{:?}", session.violations());
        }
    }

    #[test]
    fn stale_triggers_do_not_fire_after_restart() {
        let mut session = SimulationSession::new(TripMachine::with_seed(3), DEFAULT_MAX_STEPS);
        assert!(session.apply(Command::Restart).is_applied());
        let mut policy = DrivingStrategy::Cautious.create_policy(3);
        let turn = session.advance(policy.as_mut());
        assert_eq!(turn.triggers_fired, 0);
        let turn = session.advance(policy.as_mut());
        assert_eq!(turn.triggers_fired, 1);
        assert_eq!(session.machine().epoch(), 1);
    }
}
