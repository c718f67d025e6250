//! Trip state machine.
//!
//! [`TripMachine`] owns one [`TripState`] and is the only thing that mutates
//! it. Every transition is a method returning an [`ActionOutcome`]; actions
//! that are invalid for the current phase are ignored without touching state.
//!
//! The machine never sleeps or reads a clock. Transitions that should lead to
//! a narrative event later record a [`PendingTrigger`]; the host drains it with
//! [`TripMachine::take_pending_trigger`] and delivers it back through
//! [`TripMachine::deliver_trigger`] once the delay has elapsed. Triggers carry
//! the session epoch so a trigger scheduled before a restart cannot fire into
//! the new session.
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::TripConfig;
use crate::constants::{
    ACCELERATE_FUEL_COST, ACCELERATE_SPEED_STEP, BRAKE_SPEED_STEP, CRAWL_SATISFACTION_PENALTY,
    CRAWL_SPEED_THRESHOLD, CRUISE_PROGRESS_STEP, CRUISE_SPEED_THRESHOLD, MINUTES_PER_WAYPOINT,
    MSG_COLLISION, MSG_GAME_OVER, MSG_GAME_WON, TICK_FUEL_DRAIN, TICK_MINUTES,
};
use crate::events::EventCatalog;
use crate::numbers::{clamp_percent, format_percent, index_to_f32};
use crate::outcome::{self, Ending, TripSummary};
use crate::rng::RngStreams;
use crate::route;
use crate::state::{TripPhase, TripState};
use crate::steer::{self, SteerDirection, SteerMode, SteerResult};

/// Queueable form of every operation the machine accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "command")]
pub enum Command {
    Accelerate,
    Brake,
    Steer { direction: SteerDirection },
    Tick,
    TriggerEvent { epoch: u64 },
    Choose { index: usize },
    Restart,
}

impl Command {
    #[must_use]
    pub const fn steer_left() -> Self {
        Self::Steer {
            direction: SteerDirection::Left,
        }
    }

    #[must_use]
    pub const fn steer_right() -> Self {
        Self::Steer {
            direction: SteerDirection::Right,
        }
    }
}

/// Why an operation left the state untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// Trip already won or lost.
    Terminal,
    /// A narrative event is waiting for a choice.
    EventPending,
    /// No narrative event is waiting for a choice.
    NoActiveEvent,
    /// Choice index outside the active event's options.
    InvalidChoice,
    /// Bus already at the final waypoint.
    RouteComplete,
    /// Driving is switched off with no event or ending to explain it.
    DrivingDisabled,
    /// Trigger scheduled by an earlier session.
    StaleTrigger,
    /// Catalog has nothing to offer.
    EmptyCatalog,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionOutcome {
    Applied,
    Ignored(IgnoreReason),
}

impl ActionOutcome {
    #[must_use]
    pub const fn is_applied(self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Request for a future `trigger_random_event`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTrigger {
    pub epoch: u64,
    pub delay: Duration,
}

/// Single-writer controller for one trip session.
#[derive(Debug, Clone)]
pub struct TripMachine {
    cfg: TripConfig,
    catalog: EventCatalog,
    rng: RngStreams,
    state: TripState,
    epoch: u64,
    pending_trigger: Option<PendingTrigger>,
}

impl TripMachine {
    /// Start a fresh session; the first event trigger is scheduled immediately.
    #[must_use]
    pub fn new(cfg: TripConfig, catalog: EventCatalog, seed: u64) -> Self {
        let cfg = cfg.sanitized();
        let state = TripState::new(cfg.lane_width);
        let mut machine = Self {
            rng: RngStreams::from_user_seed(seed),
            cfg,
            catalog,
            state,
            epoch: 0,
            pending_trigger: None,
        };
        machine.schedule_trigger(machine.cfg.first_event_delay());
        machine
    }

    /// Default configuration with the built-in catalog.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self::new(TripConfig::default(), EventCatalog::load_from_static(), seed)
    }

    /// Resume from an existing state (e.g. a snapshot or a test fixture).
    ///
    /// Resources are clamped, contradictory flags repaired and terminal rules
    /// re-checked on the way in. A resumed trip that is still driving gets
    /// its first event trigger scheduled like a fresh one.
    #[must_use]
    pub fn from_state(cfg: TripConfig, catalog: EventCatalog, seed: u64, state: TripState) -> Self {
        let mut machine = Self {
            rng: RngStreams::from_user_seed(seed),
            cfg: cfg.sanitized(),
            catalog,
            state,
            epoch: 0,
            pending_trigger: None,
        };
        machine.normalize();
        if machine.phase() == TripPhase::Driving {
            machine.schedule_trigger(machine.cfg.first_event_delay());
        }
        machine
    }

    #[must_use]
    pub const fn state(&self) -> &TripState {
        &self.state
    }

    /// Edit the trip state in place, then re-establish the rules every
    /// transition keeps: progress never falls, a finished trip stays finished,
    /// and terminal rules are re-checked. Resolving an event this way queues
    /// the next trigger.
    pub fn with_state_mut<R>(&mut self, f: impl FnOnce(&mut TripState) -> R) -> R {
        let before_phase = self.phase();
        let before_progress = self.state.route_progress;
        let (game_over, game_won) = (self.state.game_over, self.state.game_won);

        let result = f(&mut self.state);

        let target = self.state.route_progress;
        self.state.route_progress = before_progress;
        self.state.advance_progress_to(target);
        if before_phase.is_terminal() {
            self.state.game_over = game_over;
            self.state.game_won = game_won;
        }
        self.normalize();
        if before_phase == TripPhase::EventPending && self.phase() == TripPhase::Driving {
            self.schedule_trigger(self.cfg.event_cooldown());
        }
        result
    }

    #[must_use]
    pub const fn config(&self) -> &TripConfig {
        &self.cfg
    }

    #[must_use]
    pub const fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn phase(&self) -> TripPhase {
        self.state.phase()
    }

    #[must_use]
    pub const fn epoch(&self) -> u64 {
        self.epoch
    }

    #[must_use]
    pub const fn seed(&self) -> u64 {
        self.rng.seed()
    }

    #[must_use]
    pub const fn rng(&self) -> &RngStreams {
        &self.rng
    }

    /// Most recent log lines, sized by the configured display window.
    #[must_use]
    pub fn recent_messages(&self) -> &[String] {
        self.state.recent_messages(self.cfg.recent_messages)
    }

    #[must_use]
    pub fn summary(&self) -> TripSummary {
        outcome::trip_summary(&self.state)
    }

    #[must_use]
    pub const fn pending_trigger(&self) -> Option<&PendingTrigger> {
        self.pending_trigger.as_ref()
    }

    /// Hand the pending trigger request to the host.
    pub const fn take_pending_trigger(&mut self) -> Option<PendingTrigger> {
        self.pending_trigger.take()
    }

    /// Dispatch a queued command.
    pub fn apply(&mut self, command: Command) -> ActionOutcome {
        match command {
            Command::Accelerate => self.accelerate(),
            Command::Brake => self.brake(),
            Command::Steer { direction } => self.steer(direction),
            Command::Tick => self.tick(),
            Command::TriggerEvent { epoch } => self.deliver_trigger(epoch),
            Command::Choose { index } => self.choose_option(index),
            Command::Restart => self.restart(),
        }
    }

    pub fn accelerate(&mut self) -> ActionOutcome {
        if let Some(reason) = self.driving_block() {
            return ActionOutcome::Ignored(reason);
        }
        let state = &mut self.state;
        state.speed = clamp_percent(state.speed + ACCELERATE_SPEED_STEP);
        state.fuel = clamp_percent(state.fuel - ACCELERATE_FUEL_COST);
        if state.speed > CRUISE_SPEED_THRESHOLD {
            state.advance_progress_to(state.route_progress + CRUISE_PROGRESS_STEP);
        }
        let line = format!(
            "Accelerated - Progress to {}, Fuel: {}%",
            state.location,
            format_percent(state.fuel)
        );
        log::debug!(
            "accelerate | speed {:.1} fuel {:.1} progress {:.2}",
            state.speed,
            state.fuel,
            state.route_progress
        );
        state.messages.push(line);
        self.schedule_trigger(self.cfg.event_cooldown());
        self.evaluate_outcome();
        ActionOutcome::Applied
    }

    pub fn brake(&mut self) -> ActionOutcome {
        if let Some(reason) = self.driving_block() {
            return ActionOutcome::Ignored(reason);
        }
        let state = &mut self.state;
        state.speed = clamp_percent(state.speed - BRAKE_SPEED_STEP);
        if state.speed < CRAWL_SPEED_THRESHOLD {
            state.satisfaction = clamp_percent(state.satisfaction - CRAWL_SATISFACTION_PENALTY);
        }
        log::debug!(
            "brake | speed {:.1} satisfaction {:.1}",
            state.speed,
            state.satisfaction
        );
        state
            .messages
            .push(format!("Braked - Speed: {} km/h", format_percent(state.speed)));
        self.evaluate_outcome();
        ActionOutcome::Applied
    }

    pub fn steer_left(&mut self) -> ActionOutcome {
        self.steer(SteerDirection::Left)
    }

    pub fn steer_right(&mut self) -> ActionOutcome {
        self.steer(SteerDirection::Right)
    }

    pub fn steer(&mut self, direction: SteerDirection) -> ActionOutcome {
        if let Some(reason) = self.driving_block() {
            return ActionOutcome::Ignored(reason);
        }
        let result = match self.cfg.steer_mode {
            SteerMode::Collision => steer::collision_check(
                self.state.obstacle_position,
                direction,
                self.cfg.lane_width,
            ),
            SteerMode::Dodge => steer::dodge_roll(self.rng.steer()),
        };
        log::debug!("steer {direction} | {result:?}");
        let state = &mut self.state;
        match result {
            SteerResult::Clear { obstacle_position } => {
                state.obstacle_position = obstacle_position;
                state
                    .messages
                    .push(format!("Steered {direction} - Safe drive!"));
            }
            SteerResult::Collision {
                obstacle_position,
                damage,
            } => {
                state.obstacle_position = obstacle_position;
                state.bus_condition = clamp_percent(state.bus_condition - damage);
                state.collisions = state.collisions.saturating_add(1);
                state.messages.push(MSG_COLLISION);
            }
            SteerResult::Dodged { progress_gain } => {
                state.advance_progress_to(state.route_progress + progress_gain);
                state.messages.push(format!(
                    "Steered {direction} - Dodged traffic, now near {}",
                    state.location
                ));
            }
            SteerResult::Scraped { damage } => {
                state.bus_condition = clamp_percent(state.bus_condition - damage);
                state.collisions = state.collisions.saturating_add(1);
                state.messages.push(format!(
                    "Steered {direction} - Scraped the divider! Bus damage -{}%",
                    format_percent(damage)
                ));
            }
        }
        self.schedule_trigger(self.cfg.event_cooldown());
        self.evaluate_outcome();
        ActionOutcome::Applied
    }

    /// Passive clock step: one in-game minute, fuel drain, speed drift.
    pub fn tick(&mut self) -> ActionOutcome {
        if let Some(reason) = self.driving_block() {
            return ActionOutcome::Ignored(reason);
        }
        let jitter = self.cfg.speed_jitter;
        let drift = if jitter > 0.0 {
            self.rng.tick().gen_range(-jitter..=jitter)
        } else {
            0.0
        };
        let state = &mut self.state;
        state.elapsed_minutes = state.elapsed_minutes.saturating_add(TICK_MINUTES);
        state.fuel = clamp_percent(state.fuel - TICK_FUEL_DRAIN);
        state.speed = clamp_percent(state.speed + drift);
        log::trace!(
            "tick | minute {} fuel {:.1} speed {:.1}",
            state.elapsed_minutes,
            state.fuel,
            state.speed
        );
        self.evaluate_outcome();
        ActionOutcome::Applied
    }

    /// Deliver a previously scheduled trigger. Triggers from an older epoch are dropped.
    pub fn deliver_trigger(&mut self, epoch: u64) -> ActionOutcome {
        if epoch != self.epoch {
            log::debug!("trigger | stale epoch {epoch} (current {})", self.epoch);
            return ActionOutcome::Ignored(IgnoreReason::StaleTrigger);
        }
        self.trigger_random_event()
    }

    /// Interrupt driving with a uniformly chosen narrative event.
    pub fn trigger_random_event(&mut self) -> ActionOutcome {
        if self.state.is_terminal() {
            return ActionOutcome::Ignored(IgnoreReason::Terminal);
        }
        if self.state.active_event.is_some() {
            return ActionOutcome::Ignored(IgnoreReason::EventPending);
        }
        if route::at_destination(self.state.route_progress) {
            return ActionOutcome::Ignored(IgnoreReason::RouteComplete);
        }
        let Some(event) = self.catalog.pick(self.rng.events()).cloned() else {
            return ActionOutcome::Ignored(IgnoreReason::EmptyCatalog);
        };
        log::debug!("event | {} at {}", event.id, self.state.location);
        let state = &mut self.state;
        state
            .messages
            .push(format!("Event at {}: {}", state.location, event.description));
        state.events_seen = state.events_seen.saturating_add(1);
        state.active_event = Some(event);
        state.driving_enabled = false;
        ActionOutcome::Applied
    }

    /// Resolve the active event with the option at `index`.
    pub fn choose_option(&mut self, index: usize) -> ActionOutcome {
        if self.state.is_terminal() {
            return ActionOutcome::Ignored(IgnoreReason::Terminal);
        }
        let Some(event) = self.state.active_event.as_ref() else {
            return ActionOutcome::Ignored(IgnoreReason::NoActiveEvent);
        };
        let Some(choice) = event.option(index).cloned() else {
            return ActionOutcome::Ignored(IgnoreReason::InvalidChoice);
        };
        let event_id = event.id.clone();

        let state = &mut self.state;
        state.elapsed_minutes = state.elapsed_minutes.saturating_add(choice.time_cost);
        state.satisfaction = clamp_percent(state.satisfaction + choice.satisfaction_delta);
        state.bus_condition = clamp_percent(state.bus_condition + choice.bus_condition_delta);
        state.fuel = clamp_percent(state.fuel + choice.fuel_delta);
        let time_progress = time_driven_progress(state.elapsed_minutes);
        state.advance_progress_to(time_progress);
        state.active_event = None;
        state.driving_enabled = true;
        log::debug!(
            "choose | {event_id}[{index}] minute {} progress {:.2}",
            state.elapsed_minutes,
            state.route_progress
        );
        state.messages.push(format!(
            "Decision: {} (+{} min) - now near {}",
            choice.text, choice.time_cost, state.location
        ));
        self.schedule_trigger(self.cfg.event_cooldown());
        self.evaluate_outcome();
        ActionOutcome::Applied
    }

    /// Apply terminal rules. Returns the ending set by this call, if any.
    pub fn evaluate_outcome(&mut self) -> Option<Ending> {
        if self.state.is_terminal() {
            return None;
        }
        let ending = outcome::check(&self.state)?;
        let state = &mut self.state;
        match ending {
            Ending::Lost(cause) => {
                state.game_over = true;
                state.messages.push(MSG_GAME_OVER);
                log::info!(
                    "trip lost ({cause}) at {} after {} min",
                    state.location,
                    state.elapsed_minutes
                );
            }
            Ending::Won => {
                state.game_won = true;
                state.messages.push(MSG_GAME_WON);
                log::info!("trip won after {} min", state.elapsed_minutes);
            }
        }
        state.driving_enabled = false;
        state.active_event = None;
        self.pending_trigger = None;
        Some(ending)
    }

    /// Throw the session away and start over at the depot.
    pub fn restart(&mut self) -> ActionOutcome {
        self.epoch = self.epoch.wrapping_add(1);
        self.state = TripState::new(self.cfg.lane_width);
        log::debug!("restart | epoch {}", self.epoch);
        self.schedule_trigger(self.cfg.first_event_delay());
        ActionOutcome::Applied
    }

    fn driving_block(&self) -> Option<IgnoreReason> {
        if self.state.is_terminal() {
            Some(IgnoreReason::Terminal)
        } else if self.state.active_event.is_some() {
            Some(IgnoreReason::EventPending)
        } else if !self.state.driving_enabled {
            Some(IgnoreReason::DrivingDisabled)
        } else {
            None
        }
    }

    /// Repair a state that did not come from a transition.
    fn normalize(&mut self) {
        let state = &mut self.state;
        state.clamp();
        state.refresh_location();
        if state.game_over && state.game_won {
            log::warn!("state | both terminal flags set, keeping the loss");
            state.game_won = false;
        }
        if state.is_terminal() {
            state.active_event = None;
            state.driving_enabled = false;
            self.pending_trigger = None;
        } else {
            state.driving_enabled = state.active_event.is_none();
        }
        self.evaluate_outcome();
    }

    fn schedule_trigger(&mut self, delay: Duration) {
        self.pending_trigger = Some(PendingTrigger {
            epoch: self.epoch,
            delay,
        });
    }
}

/// Progress implied by elapsed time alone: one waypoint per half hour.
#[must_use]
pub fn time_driven_progress(elapsed_minutes: u32) -> f32 {
    let waypoints = elapsed_minutes / MINUTES_PER_WAYPOINT;
    let capped = usize::try_from(waypoints)
        .unwrap_or(usize::MAX)
        .min(route::last_index());
    index_to_f32(capped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Choice, NarrativeEvent};

    fn machine() -> TripMachine {
        TripMachine::with_seed(1337)
    }

    fn single_event_catalog(choice: Choice) -> EventCatalog {
        EventCatalog::from_events(vec![NarrativeEvent {
            id: "fixture".to_string(),
            description: "Fixture event".to_string(),
            options: vec![choice],
        }])
    }

    #[test]
    fn new_session_schedules_first_trigger() {
        let mut machine = machine();
        let pending = machine.take_pending_trigger().expect("first trigger");
        assert_eq!(pending.epoch, 0);
        assert_eq!(pending.delay, Duration::from_secs(15));
        assert!(machine.take_pending_trigger().is_none());
    }

    #[test]
    fn accelerate_advances_only_above_cruise_threshold() {
        let mut machine = machine();
        assert!(machine.accelerate().is_applied());
        assert!((machine.state().speed - 70.0).abs() < f32::EPSILON);
        assert!(machine.state().route_progress.abs() < f32::EPSILON);
        machine.accelerate();
        assert!((machine.state().route_progress - 0.2).abs() < 1e-5);
        assert!((machine.state().fuel - 94.0).abs() < f32::EPSILON);
        assert_eq!(
            machine.state().messages.last(),
            Some("Accelerated - Progress to Chandigarh, Fuel: 94%")
        );
    }

    #[test]
    fn brake_below_crawl_threshold_costs_satisfaction() {
        let mut machine = machine();
        machine.brake();
        assert!((machine.state().satisfaction - 100.0).abs() < f32::EPSILON);
        machine.brake();
        machine.brake();
        assert!((machine.state().speed - 30.0).abs() < f32::EPSILON);
        assert!((machine.state().satisfaction - 95.0).abs() < f32::EPSILON);
        assert_eq!(machine.state().messages.last(), Some("Braked - Speed: 30 km/h"));
    }

    #[test]
    fn collision_steering_damages_on_return_to_centre() {
        let mut machine = machine();
        machine.steer_left();
        assert!((machine.state().bus_condition - 100.0).abs() < f32::EPSILON);
        assert_eq!(machine.state().messages.last(), Some("Steered left - Safe drive!"));
        machine.steer_right();
        assert!((machine.state().bus_condition - 80.0).abs() < f32::EPSILON);
        assert_eq!(machine.state().collisions, 1);
        assert_eq!(machine.state().messages.last(), Some(MSG_COLLISION));
    }

    #[test]
    fn dodge_mode_never_touches_obstacle_marker() {
        let cfg = TripConfig::default().with_steer_mode(SteerMode::Dodge);
        let mut machine = TripMachine::new(cfg, EventCatalog::load_from_static(), 5);
        let before = machine.state().obstacle_position;
        for _ in 0..4 {
            machine.steer_left();
        }
        assert!((machine.state().obstacle_position - before).abs() < f32::EPSILON);
        let damaged = machine.state().bus_condition < 100.0;
        let advanced = machine.state().route_progress > 0.0;
        assert!(damaged || advanced);
        assert_eq!(machine.rng().steer_draws(), 4);
    }

    #[test]
    fn tick_advances_clock_and_drains_fuel() {
        let mut machine = machine();
        machine.tick();
        assert_eq!(machine.state().elapsed_minutes, 1);
        assert!((machine.state().fuel - 99.5).abs() < f32::EPSILON);
        let speed = machine.state().speed;
        assert!((58.0..=62.0).contains(&speed));
    }

    #[test]
    fn event_blocks_driving_until_choice() {
        let mut machine = machine();
        assert!(machine.trigger_random_event().is_applied());
        assert_eq!(machine.phase(), TripPhase::EventPending);
        assert!(!machine.state().driving_enabled);
        assert_eq!(
            machine.accelerate(),
            ActionOutcome::Ignored(IgnoreReason::EventPending)
        );
        assert_eq!(
            machine.tick(),
            ActionOutcome::Ignored(IgnoreReason::EventPending)
        );
        assert_eq!(
            machine.trigger_random_event(),
            ActionOutcome::Ignored(IgnoreReason::EventPending)
        );
        assert_eq!(
            machine.choose_option(99),
            ActionOutcome::Ignored(IgnoreReason::InvalidChoice)
        );
        machine.take_pending_trigger();
        assert!(machine.choose_option(0).is_applied());
        assert_eq!(machine.phase(), TripPhase::Driving);
        assert!(machine.state().driving_enabled);
        assert_eq!(
            machine.take_pending_trigger().map(|p| p.delay),
            Some(Duration::from_secs(20))
        );
    }

    #[test]
    fn choice_applies_deltas_and_time_progress() {
        let catalog = single_event_catalog(Choice {
            text: "Long detour".to_string(),
            time_cost: 95,
            satisfaction_delta: -30.0,
            bus_condition_delta: 15.0,
            fuel_delta: -10.0,
        });
        let mut machine = TripMachine::new(TripConfig::default(), catalog, 1);
        machine.trigger_random_event();
        machine.choose_option(0);
        let state = machine.state();
        assert_eq!(state.elapsed_minutes, 95);
        assert!((state.satisfaction - 70.0).abs() < f32::EPSILON);
        assert!((state.bus_condition - 100.0).abs() < f32::EPSILON);
        assert!((state.fuel - 90.0).abs() < f32::EPSILON);
        assert!((state.route_progress - 3.0).abs() < f32::EPSILON);
        assert_eq!(state.location, "Yamunanagar");
    }

    #[test]
    fn choose_without_event_is_ignored() {
        let mut machine = machine();
        let before = machine.state().clone();
        assert_eq!(
            machine.choose_option(0),
            ActionOutcome::Ignored(IgnoreReason::NoActiveEvent)
        );
        assert_eq!(machine.state(), &before);
    }

    #[test]
    fn stale_trigger_is_dropped_after_restart() {
        let mut machine = machine();
        let old = machine.take_pending_trigger().expect("scheduled");
        machine.restart();
        assert_eq!(machine.epoch(), 1);
        assert_eq!(
            machine.deliver_trigger(old.epoch),
            ActionOutcome::Ignored(IgnoreReason::StaleTrigger)
        );
        assert_eq!(machine.phase(), TripPhase::Driving);
        let fresh = machine.take_pending_trigger().expect("restart schedules");
        assert!(machine.deliver_trigger(fresh.epoch).is_applied());
    }

    #[test]
    fn terminal_outcome_clears_pending_trigger() {
        let mut machine = machine();
        machine.with_state_mut(|state| state.fuel = 2.0);
        machine.take_pending_trigger();
        machine.accelerate();
        assert!(machine.state().game_over);
        assert!(machine.pending_trigger().is_none());
        assert_eq!(
            machine.trigger_random_event(),
            ActionOutcome::Ignored(IgnoreReason::Terminal)
        );
        assert_eq!(machine.state().messages.last(), Some(MSG_GAME_OVER));
    }

    #[test]
    fn empty_catalog_never_interrupts() {
        let mut machine = TripMachine::new(TripConfig::default(), EventCatalog::empty(), 3);
        assert_eq!(
            machine.trigger_random_event(),
            ActionOutcome::Ignored(IgnoreReason::EmptyCatalog)
        );
        assert_eq!(machine.phase(), TripPhase::Driving);
    }

    #[test]
    fn apply_dispatches_commands() {
        let mut machine = machine();
        assert!(machine.apply(Command::Accelerate).is_applied());
        assert!(machine.apply(Command::steer_left()).is_applied());
        assert!(machine.apply(Command::Tick).is_applied());
        assert!(machine.apply(Command::TriggerEvent { epoch: 0 }).is_applied());
        assert!(machine.apply(Command::Choose { index: 0 }).is_applied());
        assert!(machine.apply(Command::Restart).is_applied());
        assert_eq!(machine.state().elapsed_minutes, 0);
    }

    #[test]
    fn time_driven_progress_caps_at_route_end() {
        assert!(time_driven_progress(29).abs() < f32::EPSILON);
        assert!((time_driven_progress(61) - 2.0).abs() < f32::EPSILON);
        assert!((time_driven_progress(10_000) - 16.0).abs() < f32::EPSILON);
    }

    #[test]
    fn edited_state_keeps_progress_and_checks_endings() {
        let mut machine = machine();
        machine.with_state_mut(|state| state.route_progress = 5.0);
        machine.with_state_mut(|state| state.route_progress = 1.0);
        assert!((machine.state().route_progress - 5.0).abs() < f32::EPSILON);
        assert_eq!(machine.state().location, "Karnal");

        machine.with_state_mut(|state| state.fuel = 0.0);
        assert_eq!(machine.phase(), TripPhase::Lost);
        assert!(!machine.state().driving_enabled);
        assert!(machine.pending_trigger().is_none());

        machine.with_state_mut(|state| {
            state.game_over = false;
            state.fuel = 50.0;
        });
        assert_eq!(machine.phase(), TripPhase::Lost);
    }

    #[test]
    fn edited_state_never_both_won_and_lost() {
        let mut machine = machine();
        machine.with_state_mut(|state| {
            state.game_over = true;
            state.game_won = true;
        });
        assert!(machine.state().game_over);
        assert!(!machine.state().game_won);
    }

    #[test]
    fn clearing_an_event_by_edit_queues_the_next_trigger() {
        let mut machine = machine();
        machine.trigger_random_event();
        machine.take_pending_trigger();
        machine.with_state_mut(|state| state.active_event = None);
        assert_eq!(machine.phase(), TripPhase::Driving);
        assert!(machine.state().driving_enabled);
        assert_eq!(
            machine.take_pending_trigger().map(|p| p.delay),
            Some(Duration::from_secs(20))
        );
    }

    #[test]
    fn resumed_state_repairs_flags_and_schedules_trigger() {
        let stuck = TripState {
            driving_enabled: false,
            route_progress: 4.0,
            ..TripState::default()
        };
        let mut machine =
            TripMachine::from_state(TripConfig::default(), EventCatalog::load_from_static(), 2, stuck);
        assert_eq!(machine.phase(), TripPhase::Driving);
        assert!(machine.state().driving_enabled);
        let pending = machine.take_pending_trigger().expect("resume schedules");
        assert_eq!(pending.delay, Duration::from_secs(15));
        assert!(machine.accelerate().is_applied());
        assert!(machine.tick().is_applied());
        assert!(machine.steer_left().is_applied());

        let both = TripState {
            game_over: true,
            game_won: true,
            ..TripState::default()
        };
        let machine =
            TripMachine::from_state(TripConfig::default(), EventCatalog::empty(), 2, both);
        assert_eq!(machine.phase(), TripPhase::Lost);
        assert!(!machine.state().game_won);
        assert!(!machine.state().driving_enabled);
        assert!(machine.pending_trigger().is_none());
    }

    #[test]
    fn resumed_event_waits_for_a_choice() {
        let mut live = machine();
        live.trigger_random_event();
        let saved = TripState {
            driving_enabled: true,
            ..live.state().clone()
        };
        let mut machine =
            TripMachine::from_state(TripConfig::default(), EventCatalog::load_from_static(), 2, saved);
        assert_eq!(machine.phase(), TripPhase::EventPending);
        assert!(!machine.state().driving_enabled);
        assert!(machine.pending_trigger().is_none());
        assert!(machine.choose_option(0).is_applied());
        assert!(machine.pending_trigger().is_some());
    }

    #[test]
    fn disabled_driving_without_event_has_its_own_reason() {
        let mut machine = machine();
        machine.state.driving_enabled = false;
        assert_eq!(
            machine.accelerate(),
            ActionOutcome::Ignored(IgnoreReason::DrivingDisabled)
        );
        assert_eq!(
            machine.tick(),
            ActionOutcome::Ignored(IgnoreReason::DrivingDisabled)
        );
    }

    #[test]
    fn non_finite_jitter_is_reset_before_ticking() {
        let cfg = TripConfig {
            speed_jitter: f32::INFINITY,
            ..TripConfig::default()
        };
        let mut machine = TripMachine::new(cfg, EventCatalog::empty(), 8);
        assert!(machine.config().speed_jitter.is_finite());
        assert!(machine.tick().is_applied());
        assert!((0.0..=100.0).contains(&machine.state().speed));

        let nan = TripConfig {
            speed_jitter: f32::NAN,
            ..TripConfig::default()
        };
        let mut resumed =
            TripMachine::from_state(nan, EventCatalog::empty(), 8, TripState::default());
        assert!(resumed.tick().is_applied());
    }

    #[test]
    fn eighty_accelerations_reach_the_last_waypoint() {
        let mut machine = TripMachine::new(TripConfig::default(), EventCatalog::empty(), 1);
        machine.with_state_mut(|state| state.speed = 80.0);
        let mut presses = 0;
        while !route::at_destination(machine.state().route_progress) {
            machine.with_state_mut(|state| state.fuel = 100.0);
            assert!(machine.accelerate().is_applied());
            presses += 1;
        }
        assert_eq!(presses, 80);
        assert_eq!(machine.state().location, "Faridabad");
    }

    #[test]
    fn commands_serialize_with_tag() {
        let json = serde_json::to_string(&Command::Choose { index: 2 }).unwrap();
        assert_eq!(json, r#"{"command":"choose","index":2}"#);
    }
}
