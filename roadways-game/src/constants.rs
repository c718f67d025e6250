//! Centralized balance and tuning constants for Roadways trip logic.
//!
//! These values define the deterministic math for the trip simulation. The
//! tunable subset is mirrored by `TripConfig` defaults; the rest is fixed.

// Resource bounds -----------------------------------------------------------
pub(crate) const RESOURCE_MIN: f32 = 0.0;
pub(crate) const RESOURCE_MAX: f32 = 100.0;

// Session start -------------------------------------------------------------
pub(crate) const START_SATISFACTION: f32 = 100.0;
pub(crate) const START_BUS_CONDITION: f32 = 100.0;
pub(crate) const START_FUEL: f32 = 100.0;
pub(crate) const START_SPEED: f32 = 60.0;

// Driving actions -----------------------------------------------------------
pub(crate) const ACCELERATE_SPEED_STEP: f32 = 10.0;
pub(crate) const ACCELERATE_FUEL_COST: f32 = 3.0;
pub(crate) const CRUISE_SPEED_THRESHOLD: f32 = 70.0;
pub(crate) const CRUISE_PROGRESS_STEP: f32 = 0.2;
pub(crate) const BRAKE_SPEED_STEP: f32 = 10.0;
pub(crate) const CRAWL_SPEED_THRESHOLD: f32 = 40.0;
pub(crate) const CRAWL_SATISFACTION_PENALTY: f32 = 5.0;

// Steering ------------------------------------------------------------------
pub(crate) const DEFAULT_LANE_WIDTH: f32 = 400.0;
pub(crate) const STEER_SHIFT: f32 = 50.0;
pub(crate) const STEER_LEFT_FLOOR: f32 = 20.0;
pub(crate) const STEER_RIGHT_MARGIN: f32 = 50.0;
pub(crate) const COLLISION_RADIUS: f32 = 30.0;
pub(crate) const COLLISION_DAMAGE: f32 = 20.0;
pub(crate) const DODGE_SUCCESS_FLOOR: f32 = 0.3;
pub(crate) const DODGE_PROGRESS_STEP: f32 = 0.5;
pub(crate) const DODGE_FAIL_DAMAGE: f32 = 8.0;

// Clock ---------------------------------------------------------------------
pub(crate) const TICK_MINUTES: u32 = 1;
pub(crate) const TICK_FUEL_DRAIN: f32 = 0.5;
pub(crate) const TICK_SPEED_JITTER: f32 = 2.0;
pub(crate) const MINUTES_PER_WAYPOINT: u32 = 30;
pub(crate) const DEFAULT_TICK_INTERVAL_MS: u64 = 10_000;
pub(crate) const DEFAULT_FIRST_EVENT_DELAY_MS: u64 = 15_000;
pub(crate) const DEFAULT_EVENT_COOLDOWN_MS: u64 = 20_000;

// Terminal conditions -------------------------------------------------------
pub(crate) const TIME_LIMIT_MINUTES: u32 = 480;
pub(crate) const WIN_MIN_SATISFACTION: f32 = 60.0;
pub(crate) const WIN_MIN_BUS_CONDITION: f32 = 40.0;
pub(crate) const WIN_MIN_FUEL: f32 = 20.0;

// Presentation --------------------------------------------------------------
pub(crate) const RECENT_MESSAGE_COUNT: usize = 5;

// Log lines -----------------------------------------------------------------
pub(crate) const MSG_WELCOME: &str =
    "Welcome to Original HRTC Bus Simulator! Start driving from Chandigarh depot...";
pub(crate) const MSG_GAME_OVER: &str = "Game Over!";
pub(crate) const MSG_GAME_WON: &str = "You Won! Congratulations!";
pub(crate) const MSG_COLLISION: &str = "Collision! Bus damage -20%";
