pub mod catalog;
pub mod full_trip;

use crate::logic::{DrivingStrategy, SimulationPlan};

// Logic test scenario
#[derive(Debug, Clone)]
pub struct TestScenario {
    pub name: String,
    pub plan: SimulationPlan,
}

impl TestScenario {
    #[must_use]
    pub fn simulation(name: impl Into<String>, plan: SimulationPlan) -> Self {
        Self {
            name: name.into(),
            plan,
        }
    }
}

/// Registry entry: CLI key, display name, one-line description, plan builder.
struct ScenarioEntry {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    build: fn() -> SimulationPlan,
}

const REGISTRY: &[ScenarioEntry] = &[
    ScenarioEntry {
        key: "smoke",
        name: "Smoke",
        description: "Balanced driver finishes a trip without breaking invariants",
        build: full_trip::smoke_plan,
    },
    ScenarioEntry {
        key: "accelerate-threshold",
        name: "Accelerate Threshold",
        description: "Speed steps of 10, progress only above 70 km/h, 3% fuel per press",
        build: catalog::accelerate_threshold_plan,
    },
    ScenarioEntry {
        key: "brake-crawl",
        name: "Brake Crawl",
        description: "Braking below 40 km/h costs passenger satisfaction",
        build: catalog::brake_crawl_plan,
    },
    ScenarioEntry {
        key: "steer-collision",
        name: "Steer Collision",
        description: "Returning the obstacle marker to lane centre damages the bus",
        build: catalog::steer_collision_plan,
    },
    ScenarioEntry {
        key: "time-limit",
        name: "Time Limit",
        description: "Minute 481 ends the trip and disables driving",
        build: catalog::time_limit_plan,
    },
    ScenarioEntry {
        key: "fuel-exhaustion",
        name: "Fuel Exhaustion",
        description: "Accelerating from 5% fuel empties the tank and ends the trip",
        build: catalog::fuel_exhaustion_plan,
    },
    ScenarioEntry {
        key: "win-threshold",
        name: "Win Threshold",
        description: "Arriving with every resource above its floor wins",
        build: catalog::win_threshold_plan,
    },
    ScenarioEntry {
        key: "route-end-trigger",
        name: "Route End Trigger",
        description: "No narrative event fires once the bus is at the last stop",
        build: catalog::route_end_trigger_plan,
    },
    ScenarioEntry {
        key: "progress-reconciliation",
        name: "Progress Reconciliation",
        description: "Time-driven and action-driven progress reconcile to the higher value",
        build: catalog::progress_reconciliation_plan,
    },
    ScenarioEntry {
        key: "terminal-sticky",
        name: "Terminal Sticky",
        description: "A finished trip ignores every input until restart",
        build: catalog::terminal_sticky_plan,
    },
    ScenarioEntry {
        key: "restart-stale-trigger",
        name: "Restart Stale Trigger",
        description: "Triggers scheduled before a restart never fire into the new trip",
        build: catalog::restart_stale_trigger_plan,
    },
    ScenarioEntry {
        key: "event-cycle",
        name: "Event Cycle",
        description: "Events block driving until a choice and resolve with valid options",
        build: full_trip::event_cycle_plan,
    },
    ScenarioEntry {
        key: "dodge-mode",
        name: "Dodge Mode",
        description: "Probabilistic dodge steering leaves the obstacle marker alone",
        build: full_trip::dodge_mode_plan,
    },
    ScenarioEntry {
        key: "deterministic",
        name: "Deterministic Replay",
        description: "The same seed and strategy replay to the same final state",
        build: full_trip::deterministic_plan,
    },
    ScenarioEntry {
        key: "cautious",
        name: "Cautious Strategy",
        description: "Full trip with the cautious driver",
        build: || full_trip::strategy_plan(DrivingStrategy::Cautious),
    },
    ScenarioEntry {
        key: "speedy",
        name: "Speedy Strategy",
        description: "Full trip with the speedy driver",
        build: || full_trip::strategy_plan(DrivingStrategy::Speedy),
    },
    ScenarioEntry {
        key: "balanced",
        name: "Balanced Strategy",
        description: "Full trip with the balanced driver",
        build: || full_trip::strategy_plan(DrivingStrategy::Balanced),
    },
    ScenarioEntry {
        key: "monte-carlo",
        name: "Monte Carlo Strategy",
        description: "Full trip with the seeded Monte Carlo driver",
        build: || full_trip::strategy_plan(DrivingStrategy::MonteCarlo),
    },
];

#[must_use]
pub fn get_scenario(key: &str) -> Option<TestScenario> {
    let key = key.to_lowercase();
    REGISTRY
        .iter()
        .find(|entry| entry.key == key)
        .map(|entry| TestScenario::simulation(entry.name, (entry.build)()))
}

#[must_use]
pub fn list_scenarios() -> Vec<(&'static str, &'static str)> {
    REGISTRY
        .iter()
        .map(|entry| (entry.key, entry.description))
        .collect()
}

#[must_use]
pub fn all_scenario_keys() -> Vec<String> {
    REGISTRY.iter().map(|entry| entry.key.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::{GameTester, LogicTester, TesterAssets};
    use std::sync::Arc;

    #[test]
    fn registry_keys_are_unique_and_resolvable() {
        let keys = all_scenario_keys();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(sorted.len(), keys.len());
        for key in &keys {
            assert!(get_scenario(key).is_some(), "{key} missing");
        }
        assert!(get_scenario("SMOKE").is_some());
        assert!(get_scenario("unknown").is_none());
    }

    #[test]
    fn every_registered_scenario_passes_on_default_seed() {
        let tester = LogicTester::new(GameTester::new(Arc::new(TesterAssets::load_default()), false));
        for key in all_scenario_keys() {
            let scenario = get_scenario(&key).expect("registered");
            let results = tester.run_scenario(&scenario, &[1337], 1);
            assert!(results[0].passed, "{key}: {:?}", results[0].failures);
        }
    }
}
