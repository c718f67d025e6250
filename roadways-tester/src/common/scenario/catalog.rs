//! Scripted rule checks. Each plan skips the policy loop and drives a fresh
//! machine by hand from the iteration seed.
use anyhow::{Result, ensure};
use roadways_game::{
    ActionOutcome, Choice, Ending, EventCatalog, IgnoreReason, LossCause, NarrativeEvent, TripConfig,
    TripMachine, TripPhase, TripState,
};

use crate::logic::game_tester::SimulationSummary;
use crate::logic::{DrivingStrategy, SimulationPlan};

fn scripted(check: fn(&SimulationSummary) -> Result<()>) -> SimulationPlan {
    SimulationPlan::new(DrivingStrategy::Cautious)
        .with_max_steps(0)
        .with_expectation(check)
}

fn still_config() -> TripConfig {
    TripConfig {
        speed_jitter: 0.0,
        ..TripConfig::default()
    }
}

fn close(actual: f32, expected: f32) -> bool {
    (actual - expected).abs() < 1e-3
}

pub fn accelerate_threshold_plan() -> SimulationPlan {
    scripted(accelerate_threshold_expectation)
}

pub fn brake_crawl_plan() -> SimulationPlan {
    scripted(brake_crawl_expectation)
}

pub fn steer_collision_plan() -> SimulationPlan {
    scripted(steer_collision_expectation)
}

pub fn time_limit_plan() -> SimulationPlan {
    scripted(time_limit_expectation)
}

pub fn fuel_exhaustion_plan() -> SimulationPlan {
    scripted(fuel_exhaustion_expectation)
}

pub fn win_threshold_plan() -> SimulationPlan {
    scripted(win_threshold_expectation)
}

pub fn route_end_trigger_plan() -> SimulationPlan {
    scripted(route_end_trigger_expectation)
}

pub fn progress_reconciliation_plan() -> SimulationPlan {
    scripted(progress_reconciliation_expectation)
}

pub fn terminal_sticky_plan() -> SimulationPlan {
    scripted(terminal_sticky_expectation)
}

pub fn restart_stale_trigger_plan() -> SimulationPlan {
    scripted(restart_stale_trigger_expectation)
}

fn accelerate_threshold_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut machine = TripMachine::with_seed(summary.seed);
    let expected = [(70.0, 0.0, 97.0), (80.0, 0.2, 94.0), (90.0, 0.4, 91.0)];
    for (press, (speed, progress, fuel)) in expected.into_iter().enumerate() {
        ensure!(machine.accelerate().is_applied(), "press {press} was ignored");
        let state = machine.state();
        ensure!(
            close(state.speed, speed),
            "press {press}: speed {} != {speed}",
            state.speed
        );
        ensure!(
            close(state.route_progress, progress),
            "press {press}: progress {} != {progress}",
            state.route_progress
        );
        ensure!(
            close(state.fuel, fuel),
            "press {press}: fuel {} != {fuel}",
            state.fuel
        );
    }
    Ok(())
}

fn brake_crawl_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut machine = TripMachine::with_seed(summary.seed);
    machine.brake();
    machine.brake();
    ensure!(
        close(machine.state().satisfaction, 100.0),
        "braking to 40 km/h should be free"
    );
    machine.brake();
    ensure!(close(machine.state().speed, 30.0), "speed should be 30");
    ensure!(
        close(machine.state().satisfaction, 95.0),
        "crawling should cost 5 satisfaction, got {}",
        machine.state().satisfaction
    );
    for _ in 0..5 {
        machine.brake();
    }
    ensure!(close(machine.state().speed, 0.0), "speed floors at zero");
    Ok(())
}

fn steer_collision_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut machine = TripMachine::with_seed(summary.seed);
    machine.steer_left();
    ensure!(
        close(machine.state().bus_condition, 100.0),
        "leaving centre should be safe"
    );
    machine.steer_right();
    ensure!(
        close(machine.state().bus_condition, 80.0),
        "returning to centre should cost 20, got {}",
        machine.state().bus_condition
    );
    ensure!(machine.state().collisions == 1, "collision not counted");
    Ok(())
}

fn time_limit_expectation(summary: &SimulationSummary) -> Result<()> {
    let state = TripState {
        elapsed_minutes: 479,
        ..TripState::default()
    };
    let mut machine =
        TripMachine::from_state(still_config(), EventCatalog::empty(), summary.seed, state);
    machine.tick();
    ensure!(
        machine.phase() == TripPhase::Driving,
        "minute 480 is still in time"
    );
    machine.tick();
    ensure!(machine.state().game_over, "minute 481 should be overtime");
    ensure!(!machine.state().driving_enabled, "driving should be disabled");
    ensure!(
        machine.summary().ending == Some(Ending::Lost(LossCause::Overtime)),
        "expected an overtime loss, got {:?}",
        machine.summary().ending
    );
    Ok(())
}

fn fuel_exhaustion_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut machine = TripMachine::with_seed(summary.seed);
    machine.with_state_mut(|state| state.fuel = 5.0);
    machine.accelerate();
    ensure!(close(machine.state().fuel, 2.0), "first press leaves 2%");
    ensure!(!machine.state().game_over, "2% fuel is still running");
    machine.accelerate();
    ensure!(close(machine.state().fuel, 0.0), "second press empties the tank");
    ensure!(machine.state().game_over, "empty tank should end the trip");
    Ok(())
}

fn win_threshold_expectation(summary: &SimulationSummary) -> Result<()> {
    let arrival = TripState {
        route_progress: 16.0,
        satisfaction: 80.0,
        bus_condition: 50.0,
        fuel: 30.0,
        elapsed_minutes: 400,
        ..TripState::default()
    };
    let won = TripMachine::from_state(TripConfig::default(), EventCatalog::empty(), summary.seed, arrival.clone());
    ensure!(won.state().game_won, "arrival in good shape should win");
    ensure!(!won.state().game_over, "a won trip is not lost");

    let tired = TripState {
        satisfaction: 60.0,
        ..arrival
    };
    let pending = TripMachine::from_state(TripConfig::default(), EventCatalog::empty(), summary.seed, tired);
    ensure!(
        pending.phase() == TripPhase::Driving,
        "satisfaction must be strictly above 60"
    );
    Ok(())
}

fn route_end_trigger_expectation(summary: &SimulationSummary) -> Result<()> {
    let state = TripState {
        route_progress: 16.0,
        satisfaction: 50.0,
        ..TripState::default()
    };
    let mut machine =
        TripMachine::from_state(TripConfig::default(), EventCatalog::load_from_static(), summary.seed, state);
    let before = machine.state().clone();
    let outcome = machine.trigger_random_event();
    ensure!(
        outcome == ActionOutcome::Ignored(IgnoreReason::RouteComplete),
        "trigger at route end returned {outcome:?}"
    );
    ensure!(machine.state() == &before, "trigger at route end changed state");
    Ok(())
}

fn progress_reconciliation_expectation(summary: &SimulationSummary) -> Result<()> {
    let catalog = EventCatalog::from_events(vec![NarrativeEvent {
        id: "tea_break".to_string(),
        description: "Conductor insists on chai".to_string(),
        options: vec![Choice {
            text: "Five minutes".to_string(),
            time_cost: 5,
            satisfaction_delta: 0.0,
            bus_condition_delta: 0.0,
            fuel_delta: 0.0,
        }],
    }]);
    let mut machine = TripMachine::new(still_config(), catalog, summary.seed);
    machine.with_state_mut(|state| state.route_progress = 6.5);
    machine.trigger_random_event();
    machine.choose_option(0);
    ensure!(
        close(machine.state().route_progress, 6.5),
        "short decision pulled progress back to {}",
        machine.state().route_progress
    );
    ensure!(machine.state().location == "Panipat", "location should stay at Panipat");
    Ok(())
}

fn terminal_sticky_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut machine = TripMachine::with_seed(summary.seed);
    machine.with_state_mut(|state| state.bus_condition = 10.0);
    machine.steer_left();
    machine.steer_right();
    ensure!(machine.state().game_over, "wrecked bus should end the trip");
    let frozen = machine.state().clone();
    let outcomes = [
        machine.accelerate(),
        machine.brake(),
        machine.steer_left(),
        machine.steer_right(),
        machine.choose_option(0),
        machine.tick(),
        machine.trigger_random_event(),
    ];
    ensure!(
        outcomes
            .iter()
            .all(|outcome| *outcome == ActionOutcome::Ignored(IgnoreReason::Terminal)),
        "terminal trip accepted input: {outcomes:?}"
    );
    ensure!(machine.state() == &frozen, "terminal state changed");
    Ok(())
}

fn restart_stale_trigger_expectation(summary: &SimulationSummary) -> Result<()> {
    let mut machine = TripMachine::with_seed(summary.seed);
    let stale = machine
        .take_pending_trigger()
        .ok_or_else(|| anyhow::anyhow!("fresh trip should schedule an event"))?;
    machine.restart();
    ensure!(
        machine.deliver_trigger(stale.epoch) == ActionOutcome::Ignored(IgnoreReason::StaleTrigger),
        "stale trigger fired into the new trip"
    );
    ensure!(machine.phase() == TripPhase::Driving, "stale trigger opened an event");
    let fresh = machine
        .take_pending_trigger()
        .ok_or_else(|| anyhow::anyhow!("restart should schedule an event"))?;
    ensure!(
        machine.deliver_trigger(fresh.epoch).is_applied(),
        "current trigger should fire"
    );
    Ok(())
}
