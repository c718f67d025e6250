//! Terminal conditions and end-of-trip summary.
use serde::{Deserialize, Serialize};

use crate::constants::{TIME_LIMIT_MINUTES, WIN_MIN_BUS_CONDITION, WIN_MIN_FUEL, WIN_MIN_SATISFACTION};
use crate::numbers::round_f32_to_i32;
use crate::route;
use crate::state::{TripState, format_elapsed};

/// Why a trip was lost. Checked in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossCause {
    /// Clock ran past the time limit.
    Overtime,
    /// Passengers gave up on the service.
    Satisfaction,
    /// Bus broke down.
    BusCondition,
    /// Tank ran dry.
    Fuel,
}

impl LossCause {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Overtime => "overtime",
            Self::Satisfaction => "satisfaction",
            Self::BusCondition => "bus_condition",
            Self::Fuel => "fuel",
        }
    }

    #[must_use]
    pub const fn headline(self) -> &'static str {
        match self {
            Self::Overtime => "The shift ran out before the bus reached Faridabad.",
            Self::Satisfaction => "Passengers walked off and complained to the depot.",
            Self::BusCondition => "The bus broke down on the highway.",
            Self::Fuel => "The tank ran dry short of the next pump.",
        }
    }
}

impl std::fmt::Display for LossCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Possible trip endings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "cause")]
pub enum Ending {
    Won,
    Lost(LossCause),
}

impl std::fmt::Display for Ending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Won => write!(f, "won"),
            Self::Lost(cause) => write!(f, "lost:{cause}"),
        }
    }
}

/// First loss condition the state satisfies, if any.
#[must_use]
pub fn loss_cause(state: &TripState) -> Option<LossCause> {
    if state.elapsed_minutes > TIME_LIMIT_MINUTES {
        Some(LossCause::Overtime)
    } else if state.satisfaction <= 0.0 {
        Some(LossCause::Satisfaction)
    } else if state.bus_condition <= 0.0 {
        Some(LossCause::BusCondition)
    } else if state.fuel <= 0.0 {
        Some(LossCause::Fuel)
    } else {
        None
    }
}

/// Whether the state meets every win requirement.
#[must_use]
pub fn meets_win(state: &TripState) -> bool {
    route::at_destination(state.route_progress)
        && state.elapsed_minutes <= TIME_LIMIT_MINUTES
        && state.satisfaction > WIN_MIN_SATISFACTION
        && state.bus_condition > WIN_MIN_BUS_CONDITION
        && state.fuel > WIN_MIN_FUEL
}

/// Pure check; loss takes precedence over win.
#[must_use]
pub fn check(state: &TripState) -> Option<Ending> {
    if let Some(cause) = loss_cause(state) {
        return Some(Ending::Lost(cause));
    }
    meets_win(state).then_some(Ending::Won)
}

/// Complete summary of a trip for display on the end screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripSummary {
    pub ending: Option<Ending>,
    pub headline: String,
    pub location: String,
    pub elapsed: String,
    pub elapsed_minutes: u32,
    pub distance_km: i32,
    pub satisfaction: i32,
    pub bus_condition: i32,
    pub fuel: i32,
    pub events_seen: u32,
    pub collisions: u32,
}

/// Build the summary. `ending` is `None` for a trip still in progress.
#[must_use]
pub fn trip_summary(state: &TripState) -> TripSummary {
    let ending = if state.game_won {
        Some(Ending::Won)
    } else if state.game_over {
        Some(Ending::Lost(loss_cause(state).unwrap_or(LossCause::Overtime)))
    } else {
        None
    };
    let headline = match ending {
        Some(Ending::Won) => "You Won! The bus pulled into Faridabad on time.".to_string(),
        Some(Ending::Lost(cause)) => format!("Game Over. {}", cause.headline()),
        None => format!("En route near {}", state.location),
    };
    TripSummary {
        ending,
        headline,
        location: state.location.clone(),
        elapsed: format_elapsed(state.elapsed_minutes),
        elapsed_minutes: state.elapsed_minutes,
        distance_km: round_f32_to_i32(state.distance_km()),
        satisfaction: round_f32_to_i32(state.satisfaction),
        bus_condition: round_f32_to_i32(state.bus_condition),
        fuel: round_f32_to_i32(state.fuel),
        events_seen: state.events_seen,
        collisions: state.collisions,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finishing_state() -> TripState {
        TripState {
            route_progress: 16.0,
            satisfaction: 80.0,
            bus_condition: 50.0,
            fuel: 30.0,
            elapsed_minutes: 400,
            ..TripState::default()
        }
    }

    #[test]
    fn win_requires_every_threshold() {
        assert_eq!(check(&finishing_state()), Some(Ending::Won));
        let tired = TripState {
            satisfaction: 60.0,
            ..finishing_state()
        };
        assert_eq!(check(&tired), None);
        let short = TripState {
            route_progress: 15.8,
            ..finishing_state()
        };
        assert_eq!(check(&short), None);
    }

    #[test]
    fn loss_takes_precedence_over_win() {
        let late = TripState {
            elapsed_minutes: 481,
            ..finishing_state()
        };
        assert_eq!(check(&late), Some(Ending::Lost(LossCause::Overtime)));
        let dry = TripState {
            fuel: 0.0,
            ..finishing_state()
        };
        assert_eq!(check(&dry), Some(Ending::Lost(LossCause::Fuel)));
    }

    #[test]
    fn loss_causes_follow_priority() {
        let state = TripState {
            satisfaction: 0.0,
            bus_condition: 0.0,
            ..TripState::default()
        };
        assert_eq!(loss_cause(&state), Some(LossCause::Satisfaction));
        assert_eq!(loss_cause(&TripState::default()), None);
    }

    #[test]
    fn summary_reports_ending_and_display_values() {
        let mut state = finishing_state();
        state.game_won = true;
        state.location = "Faridabad".to_string();
        let summary = trip_summary(&state);
        assert_eq!(summary.ending, Some(Ending::Won));
        assert_eq!(summary.elapsed, "6h 40m");
        assert_eq!(summary.distance_km, 530);
        assert!(summary.headline.starts_with("You Won!"));

        let mut broken = TripState::default();
        broken.bus_condition = 0.0;
        broken.game_over = true;
        let summary = trip_summary(&broken);
        assert_eq!(summary.ending, Some(Ending::Lost(LossCause::BusCondition)));
        assert!(summary.headline.contains("broke down"));

        let running = trip_summary(&TripState::default());
        assert_eq!(running.ending, None);
        assert_eq!(running.headline, "En route near Chandigarh");
    }

    #[test]
    fn ending_serializes_with_cause() {
        let json = serde_json::to_string(&Ending::Lost(LossCause::Fuel)).unwrap();
        assert_eq!(json, r#"{"kind":"lost","cause":"fuel"}"#);
        assert_eq!(Ending::Lost(LossCause::Fuel).to_string(), "lost:fuel");
    }
}
