//! Tunable trip configuration.
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::constants::{
    DEFAULT_EVENT_COOLDOWN_MS, DEFAULT_FIRST_EVENT_DELAY_MS, DEFAULT_LANE_WIDTH,
    DEFAULT_TICK_INTERVAL_MS, RECENT_MESSAGE_COUNT, STEER_LEFT_FLOOR, STEER_RIGHT_MARGIN,
    TICK_SPEED_JITTER,
};
use crate::steer::SteerMode;

const MAX_SPEED_JITTER: f32 = 50.0;

/// Errors raised when trip configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum TripConfigError {
    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },
    #[error("lane width {width:.1} leaves no room to steer (minimum {min:.1})")]
    LaneTooNarrow { width: f32, min: f32 },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f32,
        max: f32,
        value: f32,
    },
    #[error("recent message count must be at least 1")]
    EmptyMessageView,
    #[error("trip configuration is not valid JSON: {0}")]
    Parse(String),
}

/// Host-facing knobs: steering model, lane geometry, and timer cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripConfig {
    #[serde(default)]
    pub steer_mode: SteerMode,
    #[serde(default = "TripConfig::default_lane_width")]
    pub lane_width: f32,
    #[serde(default = "TripConfig::default_speed_jitter")]
    pub speed_jitter: f32,
    #[serde(default = "TripConfig::default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "TripConfig::default_first_event_delay_ms")]
    pub first_event_delay_ms: u64,
    #[serde(default = "TripConfig::default_event_cooldown_ms")]
    pub event_cooldown_ms: u64,
    #[serde(default = "TripConfig::default_recent_messages")]
    pub recent_messages: usize,
}

impl TripConfig {
    const fn default_lane_width() -> f32 {
        DEFAULT_LANE_WIDTH
    }

    const fn default_speed_jitter() -> f32 {
        TICK_SPEED_JITTER
    }

    const fn default_tick_interval_ms() -> u64 {
        DEFAULT_TICK_INTERVAL_MS
    }

    const fn default_first_event_delay_ms() -> u64 {
        DEFAULT_FIRST_EVENT_DELAY_MS
    }

    const fn default_event_cooldown_ms() -> u64 {
        DEFAULT_EVENT_COOLDOWN_MS
    }

    const fn default_recent_messages() -> usize {
        RECENT_MESSAGE_COUNT
    }

    /// Parse and validate a configuration from JSON; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, TripConfigError> {
        let cfg: Self =
            serde_json::from_str(json).map_err(|err| TripConfigError::Parse(err.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check the configuration is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns the first violated invariant.
    pub fn validate(&self) -> Result<(), TripConfigError> {
        let min_width = STEER_LEFT_FLOOR + STEER_RIGHT_MARGIN;
        if !self.lane_width.is_finite() || self.lane_width <= min_width {
            return Err(TripConfigError::LaneTooNarrow {
                width: self.lane_width,
                min: min_width,
            });
        }
        if !(0.0..=MAX_SPEED_JITTER).contains(&self.speed_jitter) {
            return Err(TripConfigError::RangeViolation {
                field: "speed_jitter",
                min: 0.0,
                max: MAX_SPEED_JITTER,
                value: self.speed_jitter,
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(TripConfigError::ZeroDuration {
                field: "tick_interval_ms",
            });
        }
        if self.event_cooldown_ms == 0 {
            return Err(TripConfigError::ZeroDuration {
                field: "event_cooldown_ms",
            });
        }
        if self.recent_messages == 0 {
            return Err(TripConfigError::EmptyMessageView);
        }
        Ok(())
    }

    /// Replace every value [`Self::validate`] would reject with its default.
    /// Machines built from hand-assembled configs go through this.
    #[must_use]
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        let min_width = STEER_LEFT_FLOOR + STEER_RIGHT_MARGIN;
        if !self.lane_width.is_finite() || self.lane_width <= min_width {
            log::warn!("config | lane_width {} reset to default", self.lane_width);
            self.lane_width = defaults.lane_width;
        }
        if !(0.0..=MAX_SPEED_JITTER).contains(&self.speed_jitter) {
            log::warn!("config | speed_jitter {} reset to default", self.speed_jitter);
            self.speed_jitter = defaults.speed_jitter;
        }
        if self.tick_interval_ms == 0 {
            log::warn!("config | tick_interval_ms 0 reset to default");
            self.tick_interval_ms = defaults.tick_interval_ms;
        }
        if self.event_cooldown_ms == 0 {
            log::warn!("config | event_cooldown_ms 0 reset to default");
            self.event_cooldown_ms = defaults.event_cooldown_ms;
        }
        if self.recent_messages == 0 {
            self.recent_messages = defaults.recent_messages;
        }
        self
    }

    #[must_use]
    pub const fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    #[must_use]
    pub const fn first_event_delay(&self) -> Duration {
        Duration::from_millis(self.first_event_delay_ms)
    }

    #[must_use]
    pub const fn event_cooldown(&self) -> Duration {
        Duration::from_millis(self.event_cooldown_ms)
    }

    /// Same configuration with every timer divided by `factor` (floored at 1ms).
    #[must_use]
    pub fn compressed(&self, factor: u64) -> Self {
        let factor = factor.max(1);
        Self {
            tick_interval_ms: (self.tick_interval_ms / factor).max(1),
            first_event_delay_ms: (self.first_event_delay_ms / factor).max(1),
            event_cooldown_ms: (self.event_cooldown_ms / factor).max(1),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_steer_mode(mut self, mode: SteerMode) -> Self {
        self.steer_mode = mode;
        self
    }
}

impl Default for TripConfig {
    fn default() -> Self {
        Self {
            steer_mode: SteerMode::default(),
            lane_width: Self::default_lane_width(),
            speed_jitter: Self::default_speed_jitter(),
            tick_interval_ms: Self::default_tick_interval_ms(),
            first_event_delay_ms: Self::default_first_event_delay_ms(),
            event_cooldown_ms: Self::default_event_cooldown_ms(),
            recent_messages: Self::default_recent_messages(),
        }
    }
}
