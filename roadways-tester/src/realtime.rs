//! Wall-clock runs against the tokio driver.
//!
//! Timers are compressed so a full eight-hour shift plays out in seconds. A
//! policy watches published snapshots, answers events as they appear and
//! drives once per clock minute. Every observed transition is checked.
use std::time::{Duration, Instant};

use colored::Colorize;
use roadways_game::{
    DriverError, DriverHandle, SteerMode, TripDriver, TripMachine, TripPhase, TripState,
};
use tokio::time::timeout;

use crate::logic::policy::PlayerPolicy;
use crate::logic::{DrivingStrategy, GameTester, ScenarioResult};

/// Default divisor applied to every trip timer.
pub const DEFAULT_COMPRESSION: u64 = 1_000;

#[derive(Debug, Clone)]
pub struct RealtimeOptions {
    pub compression: u64,
    pub deadline: Duration,
    pub steer_mode: Option<SteerMode>,
}

impl Default for RealtimeOptions {
    fn default() -> Self {
        Self {
            compression: DEFAULT_COMPRESSION,
            deadline: Duration::from_secs(60),
            steer_mode: None,
        }
    }
}

/// What one driver session looked like from the outside.
#[derive(Debug, Clone, Default)]
pub struct RealtimeRun {
    pub seed: u64,
    pub updates: u32,
    pub decisions: u32,
    pub actions: u32,
    pub timed_out: bool,
    pub violations: Vec<String>,
    pub final_state: TripState,
}

impl RealtimeRun {
    #[must_use]
    pub fn failure(&self) -> Option<String> {
        if self.timed_out {
            return Some(format!(
                "seed {}: trip still running at minute {} when the deadline hit",
                self.seed, self.final_state.elapsed_minutes
            ));
        }
        self.violations
            .first()
            .map(|violation| format!("seed {}: {violation}", self.seed))
    }
}

/// Run every strategy against every seed on the live driver.
pub async fn run_realtime(
    tester: &GameTester,
    strategies: &[DrivingStrategy],
    seeds: &[u64],
    options: &RealtimeOptions,
) -> Vec<ScenarioResult> {
    let mut results = Vec::with_capacity(strategies.len());
    for &strategy in strategies {
        let mut failures = Vec::new();
        let mut timings = Vec::new();
        let mut successes = 0;
        for &seed in seeds {
            let started = Instant::now();
            let run = match run_session(tester, strategy, seed, options).await {
                Ok(run) => run,
                Err(err) => {
                    failures.push(format!("seed {seed}: {err}"));
                    continue;
                }
            };
            if let Some(failure) = run.failure() {
                if tester.verbose() {
                    println!("  ❌ {} {}", strategy, failure.clone().red());
                }
                failures.push(failure);
            } else {
                successes += 1;
                let elapsed = started.elapsed();
                timings.push(elapsed);
                if tester.verbose() {
                    println!(
                        "  ✅ {strategy} seed {seed} ({elapsed:?}) updates:{} decisions:{} ended at {}",
                        run.updates, run.decisions, run.final_state.location
                    );
                }
            }
        }
        results.push(ScenarioResult::from_iterations(
            format!("Realtime - {strategy}"),
            seeds.len(),
            successes,
            failures,
            timings,
        ));
    }
    results
}

/// Spawn a driver for one seed and play it to the end or the deadline.
///
/// # Errors
///
/// Returns an error if the driver task stops unexpectedly.
pub async fn run_session(
    tester: &GameTester,
    strategy: DrivingStrategy,
    seed: u64,
    options: &RealtimeOptions,
) -> Result<RealtimeRun, DriverError> {
    let assets = tester.assets();
    let cfg = assets
        .config()
        .compressed(options.compression)
        .with_steer_mode(options.steer_mode.unwrap_or_default());
    let machine = TripMachine::new(cfg, assets.catalog().clone(), seed);
    let driver = TripDriver::spawn(machine);
    let mut policy = strategy.create_policy(seed);

    let mut run = RealtimeRun {
        seed,
        ..RealtimeRun::default()
    };
    let played = timeout(
        options.deadline,
        play(driver.handle(), policy.as_mut(), &mut run),
    )
    .await;
    match played {
        Ok(result) => result?,
        Err(_) => run.timed_out = true,
    }

    let machine = driver.shutdown().await?;
    run.final_state = machine.state().clone();
    if !run.timed_out && !machine.phase().is_terminal() {
        run.violations
            .push("driver stopped publishing before the trip ended".to_string());
    }
    log::debug!(
        "realtime | {strategy} seed {seed} phase {:?} after {} updates",
        machine.phase(),
        run.updates
    );
    Ok(run)
}

async fn play(
    handle: DriverHandle,
    policy: &mut (dyn PlayerPolicy + Send),
    run: &mut RealtimeRun,
) -> Result<(), DriverError> {
    let mut updates = handle.subscribe();
    let mut current = updates.borrow_and_update().clone();
    let mut last_minute = current.state.elapsed_minutes;

    loop {
        match current.phase {
            TripPhase::Won | TripPhase::Lost => break,
            TripPhase::EventPending => {
                if let Some(event) = current.state.active_event.as_ref() {
                    let decision = policy.pick_choice(&current.state, event);
                    let index = if decision.choice_index < event.options.len() {
                        decision.choice_index
                    } else {
                        0
                    };
                    handle.choose(index).await?;
                    run.decisions += 1;
                }
            }
            TripPhase::Driving => {
                if current.state.elapsed_minutes != last_minute {
                    last_minute = current.state.elapsed_minutes;
                    if let Some(command) = policy.driving_action(&current.state) {
                        handle.send(command).await?;
                        run.actions += 1;
                    }
                }
            }
        }

        if updates.changed().await.is_err() {
            break;
        }
        let next = updates.borrow_and_update().clone();
        run.updates += 1;
        check_transition(&current, &next, &mut run.violations);
        current = next;
    }
    Ok(())
}

fn check_transition(
    before: &roadways_game::Snapshot,
    after: &roadways_game::Snapshot,
    violations: &mut Vec<String>,
) {
    let state = &after.state;
    for (label, value) in [
        ("satisfaction", state.satisfaction),
        ("bus_condition", state.bus_condition),
        ("fuel", state.fuel),
        ("speed", state.speed),
    ] {
        if !(0.0..=100.0).contains(&value) {
            violations.push(format!("{label} out of range ({value})"));
        }
    }
    if state.game_over && state.game_won {
        violations.push("won and lost at once".to_string());
    }
    if before.epoch == after.epoch {
        if state.route_progress < before.state.route_progress {
            violations.push(format!(
                "progress fell from {:.2} to {:.2}",
                before.state.route_progress, state.route_progress
            ));
        }
        if before.phase.is_terminal() && after.phase != before.phase {
            violations.push(format!(
                "finished trip moved from {:?} to {:?}",
                before.phase, after.phase
            ));
        }
    }
    if after.phase == TripPhase::EventPending && state.driving_enabled {
        violations.push("driving enabled while an event is pending".to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::TesterAssets;
    use std::sync::Arc;

    fn tester() -> GameTester {
        GameTester::new(Arc::new(TesterAssets::load_default()), false)
    }

    #[tokio::test(start_paused = true)]
    async fn session_runs_to_an_ending() {
        let run = run_session(
            &tester(),
            DrivingStrategy::Balanced,
            1337,
            &RealtimeOptions::default(),
        )
        .await
        .unwrap();
        assert!(!run.timed_out);
        assert!(run.violations.is_empty(), "{:?}", run.violations);
        assert!(run.final_state.game_over || run.final_state.game_won);
        assert!(run.decisions > 0);
    }

    #[tokio::test(start_paused = true)]
    async fn results_cover_each_strategy() {
        let results = run_realtime(
            &tester(),
            &[DrivingStrategy::Cautious, DrivingStrategy::Speedy],
            &[3],
            &RealtimeOptions::default(),
        )
        .await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].scenario_name, "Realtime - Cautious");
        assert!(results.iter().all(|r| r.passed), "{results:?}");
    }

    #[test]
    fn timed_out_runs_fail() {
        let run = RealtimeRun {
            seed: 4,
            timed_out: true,
            ..RealtimeRun::default()
        };
        assert!(run.failure().unwrap().contains("deadline"));
        assert!(RealtimeRun::default().failure().is_none());
    }

    #[test]
    fn progress_regressions_are_flagged() {
        let machine = TripMachine::with_seed(1);
        let before = roadways_game::Snapshot {
            epoch: 0,
            phase: TripPhase::Driving,
            state: TripState {
                route_progress: 3.0,
                ..machine.state().clone()
            },
        };
        let after = roadways_game::Snapshot {
            epoch: 0,
            phase: TripPhase::Driving,
            state: machine.state().clone(),
        };
        let mut violations = Vec::new();
        check_transition(&before, &after, &mut violations);
        assert_eq!(violations.len(), 1);
        check_transition(
            &before,
            &roadways_game::Snapshot { epoch: 1, ..after },
            &mut violations,
        );
        assert_eq!(violations.len(), 1);
    }
}
