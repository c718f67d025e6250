use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use roadways_game::{
    Choice, Ending, EventCatalog, NarrativeEvent, SteerMode, TripConfig, TripMachine, TripState,
    TripSummary,
};

use crate::logic::policy::DrivingStrategy;
use crate::logic::simulation::{DEFAULT_MAX_STEPS, DecisionRecord, SimulationSession, TurnOutcome};

/// Immutable data shared by every simulation.
#[derive(Debug, Clone)]
pub struct TesterAssets {
    catalog: EventCatalog,
    config: TripConfig,
}

impl TesterAssets {
    pub fn load_default() -> Self {
        let catalog = Self::load_catalog_from_assets().unwrap_or_else(Self::fallback_catalog);
        Self {
            catalog,
            config: TripConfig::default(),
        }
    }

    #[must_use]
    pub const fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    #[must_use]
    pub const fn config(&self) -> &TripConfig {
        &self.config
    }

    fn assets_data_root() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("roadways-game")
            .join("assets")
    }

    fn load_catalog_from_assets() -> Option<EventCatalog> {
        let json = fs::read_to_string(Self::assets_data_root().join("events.json")).ok()?;
        match EventCatalog::from_json(&json) {
            Ok(catalog) => Some(catalog),
            Err(err) => {
                eprintln!("⚠️ Failed to parse events.json: {err}");
                None
            }
        }
    }

    fn fallback_catalog() -> EventCatalog {
        let builtin = EventCatalog::load_from_static();
        if !builtin.is_empty() {
            return builtin;
        }
        EventCatalog::from_events(vec![NarrativeEvent {
            id: "depot_delay".to_string(),
            description: "The depot manager wants a word before you leave.".to_string(),
            options: vec![
                Choice {
                    text: "Listen patiently".to_string(),
                    time_cost: 15,
                    satisfaction_delta: -2.0,
                    bus_condition_delta: 0.0,
                    fuel_delta: 0.0,
                },
                Choice {
                    text: "Drive off".to_string(),
                    time_cost: 0,
                    satisfaction_delta: 0.0,
                    bus_condition_delta: 0.0,
                    fuel_delta: 0.0,
                },
            ],
        }])
    }
}

/// Declarative plan for running a simulation session.
#[derive(Debug, Clone)]
pub struct SimulationPlan {
    pub strategy: DrivingStrategy,
    pub steer_mode: Option<SteerMode>,
    pub max_steps: Option<u32>,
    pub setup: Option<fn(&mut TripState)>,
    pub expectations: Vec<SimulationExpectation>,
}

impl SimulationPlan {
    #[must_use]
    pub const fn new(strategy: DrivingStrategy) -> Self {
        Self {
            strategy,
            steer_mode: None,
            max_steps: None,
            setup: None,
            expectations: Vec::new(),
        }
    }

    #[must_use]
    pub const fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    #[must_use]
    pub const fn with_steer_mode(mut self, mode: SteerMode) -> Self {
        self.steer_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn with_setup(mut self, setup: fn(&mut TripState)) -> Self {
        self.setup = Some(setup);
        self
    }

    #[must_use]
    pub fn with_expectation(mut self, expectation: impl Into<SimulationExpectation>) -> Self {
        self.expectations.push(expectation.into());
        self
    }
}

/// Assertion hook run after a simulation completes.
type SimulationExpectationFn =
    Arc<dyn Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static>;

#[derive(Clone)]
pub struct SimulationExpectation(SimulationExpectationFn);

impl std::fmt::Debug for SimulationExpectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationExpectation").finish()
    }
}

impl SimulationExpectation {
    pub fn evaluate(&self, summary: &SimulationSummary) -> Result<()> {
        (self.0)(summary)
    }
}

impl<F> From<F> for SimulationExpectation
where
    F: Fn(&SimulationSummary) -> Result<()> + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

/// Per-run numbers fed into playability aggregates.
#[derive(Debug, Clone, Default)]
pub struct PlayabilityMetrics {
    pub ending_type: String,
    pub ending_cause: String,
    pub won: bool,
    pub minutes_elapsed: u32,
    pub distance_km: i32,
    pub final_location: String,
    pub satisfaction: i32,
    pub bus_condition: i32,
    pub fuel: i32,
    pub events_seen: u32,
    pub collisions: u32,
    pub steps: u32,
    pub decision_log: Vec<DecisionRecord>,
}

impl PlayabilityMetrics {
    fn from_summary(trip: &TripSummary, steps: u32, decisions: Vec<DecisionRecord>) -> Self {
        let (ending_type, ending_cause) = match trip.ending {
            Some(Ending::Won) => ("Victory".to_string(), "None".to_string()),
            Some(Ending::Lost(cause)) => ("Game Over".to_string(), cause.label().to_string()),
            None => ("Unfinished".to_string(), "None".to_string()),
        };
        Self {
            won: matches!(trip.ending, Some(Ending::Won)),
            ending_type,
            ending_cause,
            minutes_elapsed: trip.elapsed_minutes,
            distance_km: trip.distance_km,
            final_location: trip.location.clone(),
            satisfaction: trip.satisfaction,
            bus_condition: trip.bus_condition,
            fuel: trip.fuel,
            events_seen: trip.events_seen,
            collisions: trip.collisions,
            steps,
            decision_log: decisions,
        }
    }
}

/// Complete record of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulationSummary {
    pub seed: u64,
    pub strategy: DrivingStrategy,
    pub steer_mode: SteerMode,
    pub turns: Vec<TurnOutcome>,
    pub metrics: PlayabilityMetrics,
    pub final_state: TripState,
    pub ending: Option<Ending>,
    pub ending_message: String,
    pub game_ended: bool,
    pub violations: Vec<String>,
}

/// Headless deterministic runner for the trip logic.
#[derive(Clone)]
pub struct GameTester {
    verbose: bool,
    steer_mode: Option<SteerMode>,
    assets: Arc<TesterAssets>,
}

impl GameTester {
    pub const fn new(assets: Arc<TesterAssets>, verbose: bool) -> Self {
        Self {
            verbose,
            steer_mode: None,
            assets,
        }
    }

    /// Steering model used by plans that do not pin one.
    #[must_use]
    pub const fn with_steer_mode(mut self, mode: Option<SteerMode>) -> Self {
        self.steer_mode = mode;
        self
    }

    pub const fn verbose(&self) -> bool {
        self.verbose
    }

    #[must_use]
    pub fn assets(&self) -> &TesterAssets {
        &self.assets
    }

    fn effective_steer_mode(&self, plan: &SimulationPlan) -> SteerMode {
        plan.steer_mode.or(self.steer_mode).unwrap_or_default()
    }

    /// Build the machine a plan starts from.
    #[must_use]
    pub fn build_machine(&self, plan: &SimulationPlan, seed: u64) -> TripMachine {
        let cfg = self
            .assets
            .config()
            .clone()
            .with_steer_mode(self.effective_steer_mode(plan));
        let mut machine = TripMachine::new(cfg, self.assets.catalog().clone(), seed);
        if let Some(setup) = plan.setup {
            machine.with_state_mut(setup);
        }
        machine
    }

    pub fn run_plan(&self, plan: &SimulationPlan, seed: u64) -> SimulationSummary {
        let machine = self.build_machine(plan, seed);
        let steer_mode = machine.config().steer_mode;
        let max_steps = plan.max_steps.unwrap_or(DEFAULT_MAX_STEPS);
        let mut session = SimulationSession::new(machine, max_steps);
        let mut policy = plan.strategy.create_policy(seed);
        let mut turns = Vec::new();
        let mut decisions = Vec::new();

        while !session.is_finished() {
            let turn = session.advance(policy.as_mut());
            if let Some(decision) = turn.decision.clone() {
                if self.verbose {
                    println!(
                        "  🚌 minute {} {} -> [{}] {}",
                        decision.minute,
                        decision.event_id,
                        decision.choice_index,
                        decision.choice_label
                    );
                }
                decisions.push(decision);
            }
            turns.push(turn);
        }

        let steps = session.steps();
        let violations = session.violations().to_vec();
        let machine = session.into_machine();
        let trip = machine.summary();
        let ending = trip.ending;
        log::debug!(
            "simulation | seed {seed} strategy {} ended {:?} after {steps} steps",
            plan.strategy,
            ending
        );

        SimulationSummary {
            seed,
            strategy: plan.strategy,
            steer_mode,
            turns,
            metrics: PlayabilityMetrics::from_summary(&trip, steps, decisions),
            final_state: machine.state().clone(),
            ending,
            ending_message: trip.headline,
            game_ended: machine.phase().is_terminal(),
            violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tester() -> GameTester {
        GameTester::new(Arc::new(TesterAssets::load_default()), false)
    }

    #[test]
    fn assets_load_the_event_catalog() {
        let assets = TesterAssets::load_default();
        assert!(assets.catalog().len() >= 2);
    }

    #[test]
    fn run_plan_ends_the_trip() {
        let plan = SimulationPlan::new(DrivingStrategy::Balanced);
        let summary = tester().run_plan(&plan, 1337);
        assert!(summary.game_ended);
        assert!(summary.ending.is_some());
        assert!(summary.violations.is_empty(), "{:?}", summary.violations);
        assert_eq!(summary.metrics.steps as usize, summary.turns.len());
    }

    #[test]
    fn zero_step_plan_returns_fresh_state() {
        let plan = SimulationPlan::new(DrivingStrategy::Cautious).with_max_steps(0);
        let summary = tester().run_plan(&plan, 4);
        assert!(summary.turns.is_empty());
        assert!(!summary.game_ended);
        assert_eq!(summary.metrics.ending_type, "Unfinished");
        assert_eq!(summary.final_state.elapsed_minutes, 0);
    }

    #[test]
    fn tester_steer_mode_applies_unless_plan_pins_one() {
        let tester = tester().with_steer_mode(Some(SteerMode::Dodge));
        let open = SimulationPlan::new(DrivingStrategy::Cautious).with_max_steps(0);
        assert_eq!(tester.run_plan(&open, 1).steer_mode, SteerMode::Dodge);
        let pinned = open.with_steer_mode(SteerMode::Collision);
        assert_eq!(tester.run_plan(&pinned, 1).steer_mode, SteerMode::Collision);
    }

    #[test]
    fn setup_hook_reshapes_the_start() {
        let plan = SimulationPlan::new(DrivingStrategy::Speedy)
            .with_max_steps(0)
            .with_setup(|state| state.fuel = 12.0);
        let summary = tester().run_plan(&plan, 2);
        assert!((summary.final_state.fuel - 12.0).abs() < f32::EPSILON);
    }
}
