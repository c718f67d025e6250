use std::sync::Arc;

use anyhow::{Result, ensure};
use roadways_game::SteerMode;

use crate::logic::game_tester::SimulationSummary;
use crate::logic::{DrivingStrategy, GameTester, SimulationPlan, TesterAssets};

/// Shared end-of-trip checks for every policy-driven plan.
fn trip_finished(summary: &SimulationSummary) -> Result<()> {
    ensure!(
        summary.game_ended,
        "trip still running after {} steps",
        summary.turns.len()
    );
    ensure!(summary.ending.is_some(), "finished trip has no ending");
    ensure!(
        summary.final_state.game_won != summary.final_state.game_over,
        "exactly one terminal flag must be set"
    );
    ensure!(
        !summary.final_state.driving_enabled,
        "driving still enabled after the ending"
    );
    Ok(())
}

pub fn smoke_plan() -> SimulationPlan {
    SimulationPlan::new(DrivingStrategy::Balanced).with_expectation(trip_finished)
}

pub fn strategy_plan(strategy: DrivingStrategy) -> SimulationPlan {
    SimulationPlan::new(strategy).with_expectation(trip_finished)
}

pub fn event_cycle_plan() -> SimulationPlan {
    SimulationPlan::new(DrivingStrategy::Cautious)
        .with_expectation(trip_finished)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(
                summary.metrics.events_seen > 0,
                "no narrative event fired during the trip"
            );
            let decisions = &summary.metrics.decision_log;
            ensure!(
                decisions.len() as u32 <= summary.metrics.events_seen,
                "{} decisions for {} events",
                decisions.len(),
                summary.metrics.events_seen
            );
            for turn in &summary.turns {
                if let Some(decision) = &turn.decision {
                    ensure!(
                        turn.action.is_none(),
                        "minute {}: drove while {} was pending",
                        decision.minute,
                        decision.event_id
                    );
                }
            }
            Ok(())
        })
}

pub fn dodge_mode_plan() -> SimulationPlan {
    SimulationPlan::new(DrivingStrategy::Balanced)
        .with_steer_mode(SteerMode::Dodge)
        .with_expectation(trip_finished)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            ensure!(
                summary.steer_mode == SteerMode::Dodge,
                "plan ran with {:?} steering",
                summary.steer_mode
            );
            let centre = TesterAssets::load_default().config().lane_width / 2.0;
            ensure!(
                (summary.final_state.obstacle_position - centre).abs() < f32::EPSILON,
                "dodge steering moved the obstacle marker to {}",
                summary.final_state.obstacle_position
            );
            Ok(())
        })
}

pub fn deterministic_plan() -> SimulationPlan {
    SimulationPlan::new(DrivingStrategy::MonteCarlo)
        .with_expectation(trip_finished)
        .with_expectation(|summary: &SimulationSummary| -> Result<()> {
            let tester = GameTester::new(Arc::new(TesterAssets::load_default()), false)
                .with_steer_mode(Some(summary.steer_mode));
            let replay = tester.run_plan(
                &SimulationPlan::new(summary.strategy).with_steer_mode(summary.steer_mode),
                summary.seed,
            );
            ensure!(
                replay.final_state == summary.final_state,
                "seed {} replayed to a different final state",
                summary.seed
            );
            ensure!(
                replay.turns.len() == summary.turns.len(),
                "replay took {} steps, first run {}",
                replay.turns.len(),
                summary.turns.len()
            );
            Ok(())
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> GameTester {
        GameTester::new(Arc::new(TesterAssets::load_default()), false)
    }

    #[test]
    fn strategy_plans_end_every_trip() {
        for strategy in DrivingStrategy::ALL {
            let plan = strategy_plan(strategy);
            for seed in [11_u64, 12, 13] {
                let summary = tester().run_plan(&plan, seed);
                for expectation in &plan.expectations {
                    expectation
                        .evaluate(&summary)
                        .unwrap_or_else(|err| panic!("{strategy} seed {seed}: {err:#}"));
                }
            }
        }
    }

    #[test]
    fn dodge_plan_overrides_tester_default() {
        let summary = tester()
            .with_steer_mode(Some(SteerMode::Collision))
            .run_plan(&dodge_mode_plan(), 5);
        assert_eq!(summary.steer_mode, SteerMode::Dodge);
    }
}
