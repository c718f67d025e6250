use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use roadways_game::{Choice, Command, NarrativeEvent, TripState};

/// Decision returned by a [`PlayerPolicy`]
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub choice_index: usize,
    pub rationale: Option<String>,
}

impl PolicyDecision {
    #[must_use]
    pub const fn new(choice_index: usize, rationale: Option<String>) -> Self {
        Self {
            choice_index,
            rationale,
        }
    }
}

/// Policy interface for automated drivers.
pub trait PlayerPolicy {
    /// Name used for logging/debug output.
    fn name(&self) -> &'static str;

    /// Driving input for this step, if any.
    fn driving_action(&mut self, state: &TripState) -> Option<Command>;

    /// Select an option for the active narrative event.
    fn pick_choice(&mut self, state: &TripState, event: &NarrativeEvent) -> PolicyDecision;
}

/// Built-in driving strategies for automated runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrivingStrategy {
    Cautious,
    Speedy,
    Balanced,
    MonteCarlo,
}

impl DrivingStrategy {
    pub const ALL: [Self; 4] = [Self::Cautious, Self::Speedy, Self::Balanced, Self::MonteCarlo];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Cautious => "Cautious",
            Self::Speedy => "Speedy",
            Self::Balanced => "Balanced",
            Self::MonteCarlo => "Monte Carlo",
        }
    }

    #[must_use]
    pub fn create_policy(self, seed: u64) -> Box<dyn PlayerPolicy + Send> {
        match self {
            Self::Cautious => Box::new(CautiousPolicy),
            Self::Speedy => Box::new(SpeedyPolicy),
            Self::Balanced => Box::new(BalancedPolicy::default()),
            Self::MonteCarlo => Box::new(MonteCarloPolicy::new(seed)),
        }
    }
}

impl fmt::Display for DrivingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

struct CautiousPolicy;
struct SpeedyPolicy;

#[derive(Default)]
struct BalancedPolicy {
    steps: u32,
}

struct MonteCarloPolicy {
    rng: ChaCha20Rng,
    simulations: u32,
}

impl MonteCarloPolicy {
    fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha20Rng::seed_from_u64(seed),
            simulations: 12,
        }
    }
}

impl PlayerPolicy for CautiousPolicy {
    fn name(&self) -> &'static str {
        "Cautious"
    }

    fn driving_action(&mut self, state: &TripState) -> Option<Command> {
        if state.speed > 80.0 {
            Some(Command::Brake)
        } else if state.speed <= 70.0 && state.fuel > 40.0 {
            Some(Command::Accelerate)
        } else {
            None
        }
    }

    fn pick_choice(&mut self, _state: &TripState, event: &NarrativeEvent) -> PolicyDecision {
        let (idx, risk) = best_by(event, cautious_risk, false);
        PolicyDecision::new(idx, Some(format!("risk {risk:.1}")))
    }
}

impl PlayerPolicy for SpeedyPolicy {
    fn name(&self) -> &'static str {
        "Speedy"
    }

    fn driving_action(&mut self, state: &TripState) -> Option<Command> {
        (state.fuel > 10.0).then_some(Command::Accelerate)
    }

    fn pick_choice(&mut self, _state: &TripState, event: &NarrativeEvent) -> PolicyDecision {
        let (idx, cost) = best_by(event, minutes, false);
        PolicyDecision::new(idx, Some(format!("time {cost:.0}")))
    }
}

impl PlayerPolicy for BalancedPolicy {
    fn name(&self) -> &'static str {
        "Balanced"
    }

    fn driving_action(&mut self, state: &TripState) -> Option<Command> {
        self.steps = self.steps.wrapping_add(1);
        if state.speed >= 95.0 {
            return Some(Command::Brake);
        }
        if self.steps % 7 == 0 {
            return Some(Command::steer_left());
        }
        (state.speed < 90.0 && state.fuel > 30.0).then_some(Command::Accelerate)
    }

    fn pick_choice(&mut self, _state: &TripState, event: &NarrativeEvent) -> PolicyDecision {
        let (idx, score) = best_by(event, balanced_score, true);
        PolicyDecision::new(idx, Some(format!("score {score:.1}")))
    }
}

impl PlayerPolicy for MonteCarloPolicy {
    fn name(&self) -> &'static str {
        "Monte Carlo"
    }

    fn driving_action(&mut self, state: &TripState) -> Option<Command> {
        let roll: f32 = self.rng.r#gen();
        if state.fuel <= 15.0 {
            return None;
        }
        if roll < 0.55 {
            Some(Command::Accelerate)
        } else if roll < 0.65 {
            Some(Command::Brake)
        } else if roll < 0.75 {
            Some(Command::steer_right())
        } else {
            None
        }
    }

    fn pick_choice(&mut self, state: &TripState, event: &NarrativeEvent) -> PolicyDecision {
        if event.options.is_empty() {
            return PolicyDecision::new(0, Some("no options".to_string()));
        }

        let mut best_score = f64::NEG_INFINITY;
        let mut best_idx = 0;

        for (idx, choice) in event.options.iter().enumerate() {
            let score = simulate_choice_outcome(state, choice, &mut self.rng, self.simulations);
            if score > best_score {
                best_score = score;
                best_idx = idx;
            }
        }

        PolicyDecision::new(best_idx, Some(format!("score {best_score:.2}")))
    }
}

fn best_by(event: &NarrativeEvent, score: impl Fn(&Choice) -> f32, maximize: bool) -> (usize, f32) {
    let mut best: Option<(usize, f32)> = None;
    for (idx, choice) in event.options.iter().enumerate() {
        let value = score(choice);
        let better = match best {
            None => true,
            Some((_, current)) if maximize => value > current,
            Some((_, current)) => value < current,
        };
        if better {
            best = Some((idx, value));
        }
    }
    best.unwrap_or((0, 0.0))
}

fn minutes(choice: &Choice) -> f32 {
    f32::from(u16::try_from(choice.time_cost).unwrap_or(u16::MAX))
}

fn cautious_risk(choice: &Choice) -> f32 {
    let mut risk = 0.0;
    risk += (-choice.bus_condition_delta).max(0.0) * 4.0;
    risk += (-choice.fuel_delta).max(0.0) * 3.0;
    risk += (-choice.satisfaction_delta).max(0.0) * 2.0;
    risk += minutes(choice) * 0.5;
    risk
}

fn reward(choice: &Choice) -> f32 {
    choice.satisfaction_delta.max(0.0) * 2.0
        + choice.bus_condition_delta.max(0.0) * 2.0
        + choice.fuel_delta.max(0.0) * 3.0
}

fn balanced_score(choice: &Choice) -> f32 {
    reward(choice) - cautious_risk(choice)
}

fn simulate_choice_outcome(
    state: &TripState,
    choice: &Choice,
    rng: &mut ChaCha20Rng,
    simulations: u32,
) -> f64 {
    let iterations = simulations.max(1);
    let mut total = 0.0_f64;
    for _ in 0..iterations {
        let mut score = f64::from(balanced_score(choice));
        let projected_bus = state.bus_condition + choice.bus_condition_delta;
        let projected_fuel = state.fuel + choice.fuel_delta;
        let projected_satisfaction = state.satisfaction + choice.satisfaction_delta;

        score -= deficiency_penalty(projected_bus, 45.0) * 4.0;
        score -= deficiency_penalty(projected_fuel, 25.0) * 5.0;
        score -= deficiency_penalty(projected_satisfaction, 65.0) * 3.0;

        score += rng.r#gen::<f64>();
        total += score;
    }
    total / f64::from(iterations)
}

fn deficiency_penalty(value: f32, floor: f32) -> f64 {
    if value >= floor {
        0.0
    } else {
        f64::from(floor - value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event() -> NarrativeEvent {
        NarrativeEvent {
            id: "fork".to_string(),
            description: "Road splits".to_string(),
            options: vec![
                Choice {
                    text: "Long safe road".to_string(),
                    time_cost: 40,
                    satisfaction_delta: 0.0,
                    bus_condition_delta: 0.0,
                    fuel_delta: -2.0,
                },
                Choice {
                    text: "Rough shortcut".to_string(),
                    time_cost: 5,
                    satisfaction_delta: -5.0,
                    bus_condition_delta: -15.0,
                    fuel_delta: 0.0,
                },
            ],
        }
    }

    #[test]
    fn strategies_differ_on_the_same_event() {
        let state = TripState::default();
        let cautious = DrivingStrategy::Cautious
            .create_policy(1)
            .pick_choice(&state, &event());
        let speedy = DrivingStrategy::Speedy
            .create_policy(1)
            .pick_choice(&state, &event());
        assert_eq!(cautious.choice_index, 0);
        assert_eq!(speedy.choice_index, 1);
    }

    #[test]
    fn speedy_stops_accelerating_on_low_fuel() {
        let mut policy = DrivingStrategy::Speedy.create_policy(1);
        let mut state = TripState::default();
        assert_eq!(policy.driving_action(&state), Some(Command::Accelerate));
        state.fuel = 8.0;
        assert_eq!(policy.driving_action(&state), None);
    }

    #[test]
    fn monte_carlo_is_seeded() {
        let state = TripState::default();
        let mut a = DrivingStrategy::MonteCarlo.create_policy(9);
        let mut b = DrivingStrategy::MonteCarlo.create_policy(9);
        for _ in 0..10 {
            assert_eq!(a.driving_action(&state), b.driving_action(&state));
        }
        assert_eq!(
            a.pick_choice(&state, &event()).choice_index,
            b.pick_choice(&state, &event()).choice_index
        );
    }

    #[test]
    fn empty_event_defaults_to_first_index() {
        let empty = NarrativeEvent {
            id: "none".to_string(),
            description: String::new(),
            options: Vec::new(),
        };
        let decision = DrivingStrategy::Balanced
            .create_policy(0)
            .pick_choice(&TripState::default(), &empty);
        assert_eq!(decision.choice_index, 0);
    }
}
