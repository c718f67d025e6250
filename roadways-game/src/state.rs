//! Trip state record and its derived phase.
use serde::{Deserialize, Serialize};

use crate::constants::{
    MSG_WELCOME, START_BUS_CONDITION, START_FUEL, START_SATISFACTION, START_SPEED,
};
use crate::events::NarrativeEvent;
use crate::messages::MessageLog;
use crate::numbers::clamp_percent;
use crate::route::{self, clamp_progress};

/// Coarse phase derived from the state flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TripPhase {
    Driving,
    EventPending,
    Won,
    Lost,
}

impl TripPhase {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Won | Self::Lost)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Driving => "driving",
            Self::EventPending => "event_pending",
            Self::Won => "won",
            Self::Lost => "lost",
        }
    }
}

/// Everything the player can see about the current trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripState {
    pub location: String,
    pub elapsed_minutes: u32,
    pub satisfaction: f32,
    pub bus_condition: f32,
    pub fuel: f32,
    pub speed: f32,
    pub route_progress: f32,
    pub game_over: bool,
    pub game_won: bool,
    #[serde(default)]
    pub active_event: Option<NarrativeEvent>,
    pub driving_enabled: bool,
    #[serde(default)]
    pub messages: MessageLog,
    /// Lane coordinate of the obstacle marker used by collision steering.
    pub obstacle_position: f32,
    #[serde(default)]
    pub events_seen: u32,
    #[serde(default)]
    pub collisions: u32,
}

impl TripState {
    /// Fresh session at the Chandigarh depot with the obstacle marker centred.
    #[must_use]
    pub fn new(lane_width: f32) -> Self {
        Self {
            location: route::location_for(0.0).to_string(),
            elapsed_minutes: 0,
            satisfaction: START_SATISFACTION,
            bus_condition: START_BUS_CONDITION,
            fuel: START_FUEL,
            speed: START_SPEED,
            route_progress: 0.0,
            game_over: false,
            game_won: false,
            active_event: None,
            driving_enabled: true,
            messages: MessageLog::with_message(MSG_WELCOME),
            obstacle_position: lane_width / 2.0,
            events_seen: 0,
            collisions: 0,
        }
    }

    #[must_use]
    pub const fn phase(&self) -> TripPhase {
        if self.game_won {
            TripPhase::Won
        } else if self.game_over {
            TripPhase::Lost
        } else if self.active_event.is_some() {
            TripPhase::EventPending
        } else {
            TripPhase::Driving
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        self.game_over || self.game_won
    }

    /// Whether driving actions are accepted right now.
    #[must_use]
    pub const fn can_drive(&self) -> bool {
        self.driving_enabled && self.active_event.is_none() && !self.is_terminal()
    }

    /// Re-apply every range clamp.
    pub fn clamp(&mut self) {
        self.satisfaction = clamp_percent(self.satisfaction);
        self.bus_condition = clamp_percent(self.bus_condition);
        self.fuel = clamp_percent(self.fuel);
        self.speed = clamp_percent(self.speed);
        self.route_progress = clamp_progress(self.route_progress);
    }

    /// Raise progress to `candidate` if higher, refreshing the location.
    pub fn advance_progress_to(&mut self, candidate: f32) {
        let candidate = clamp_progress(candidate);
        if candidate > self.route_progress {
            self.route_progress = candidate;
        }
        self.refresh_location();
    }

    pub fn refresh_location(&mut self) {
        self.location = route::location_for(self.route_progress).to_string();
    }

    /// Kilometres covered along the route.
    #[must_use]
    pub fn distance_km(&self) -> f32 {
        route::distance_covered_km(self.route_progress)
    }

    /// Elapsed time formatted for display, e.g. `2h 5m`.
    #[must_use]
    pub fn elapsed_display(&self) -> String {
        format_elapsed(self.elapsed_minutes)
    }

    /// The most recent `count` log lines.
    #[must_use]
    pub fn recent_messages(&self, count: usize) -> &[String] {
        self.messages.recent(count)
    }
}

impl Default for TripState {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_LANE_WIDTH)
    }
}

/// Render minutes as `{h}h {m}m`.
#[must_use]
pub fn format_elapsed(minutes: u32) -> String {
    format!("{}h {}m", minutes / 60, minutes % 60)
}
