//! Steering models.
//!
//! `Collision` moves an obstacle lane marker and damages the bus when the
//! marker ends up too close to the lane centre. `Dodge` is a dice roll that
//! either gains ground or scrapes the bus. A session uses exactly one model.
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::constants::{
    COLLISION_DAMAGE, COLLISION_RADIUS, DODGE_FAIL_DAMAGE, DODGE_PROGRESS_STEP,
    DODGE_SUCCESS_FLOOR, STEER_LEFT_FLOOR, STEER_RIGHT_MARGIN, STEER_SHIFT,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SteerDirection {
    Left,
    Right,
}

impl SteerDirection {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl std::fmt::Display for SteerDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which steering rules a session plays with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SteerMode {
    /// Deterministic lane-position check.
    #[default]
    Collision,
    /// Probabilistic dodge; harder difficulty.
    Dodge,
}

/// Result of one steering manoeuvre, before it is applied to the trip.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SteerResult {
    /// Lane marker moved clear of the bus.
    Clear { obstacle_position: f32 },
    /// Lane marker ended within the collision radius.
    Collision {
        obstacle_position: f32,
        damage: f32,
    },
    /// Dodge succeeded and the bus gained ground.
    Dodged { progress_gain: f32 },
    /// Dodge failed.
    Scraped { damage: f32 },
}

impl SteerResult {
    /// Bus condition lost by this manoeuvre.
    #[must_use]
    pub const fn damage(&self) -> f32 {
        match self {
            Self::Collision { damage, .. } | Self::Scraped { damage } => *damage,
            Self::Clear { .. } | Self::Dodged { .. } => 0.0,
        }
    }
}

/// Move the obstacle marker and check it against the lane centre.
#[must_use]
pub fn collision_check(position: f32, direction: SteerDirection, lane_width: f32) -> SteerResult {
    let moved = match direction {
        SteerDirection::Left => (position - STEER_SHIFT).max(STEER_LEFT_FLOOR),
        SteerDirection::Right => (position + STEER_SHIFT).min(lane_width - STEER_RIGHT_MARGIN),
    };
    let centre = lane_width / 2.0;
    if (moved - centre).abs() < COLLISION_RADIUS {
        SteerResult::Collision {
            obstacle_position: moved,
            damage: COLLISION_DAMAGE,
        }
    } else {
        SteerResult::Clear {
            obstacle_position: moved,
        }
    }
}

/// Roll a dodge; rolls at or above the success floor gain ground.
pub fn dodge_roll<R: Rng + ?Sized>(rng: &mut R) -> SteerResult {
    let roll: f32 = rng.r#gen();
    if roll >= DODGE_SUCCESS_FLOOR {
        SteerResult::Dodged {
            progress_gain: DODGE_PROGRESS_STEP,
        }
    } else {
        SteerResult::Scraped {
            damage: DODGE_FAIL_DAMAGE,
        }
    }
}
