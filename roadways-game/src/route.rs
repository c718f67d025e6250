//! Fixed Chandigarh to Faridabad waypoint table.
use serde::Serialize;

use crate::numbers::{floor_to_index, index_to_f32};

/// Named stop on the route with its distance from the depot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub name: &'static str,
    pub distance_km: f32,
}

const fn waypoint(name: &'static str, distance_km: f32) -> Waypoint {
    Waypoint { name, distance_km }
}

/// Waypoints in travel order; distances strictly increase.
pub const ROUTE: [Waypoint; 17] = [
    waypoint("Chandigarh", 0.0),
    waypoint("Panchkula", 20.0),
    waypoint("Ambala", 50.0),
    waypoint("Yamunanagar", 80.0),
    waypoint("Kurukshetra", 110.0),
    waypoint("Karnal", 150.0),
    waypoint("Panipat", 190.0),
    waypoint("Sonipat", 230.0),
    waypoint("Rohtak", 270.0),
    waypoint("Jhajjar", 300.0),
    waypoint("Bahadurgarh", 320.0),
    waypoint("Hisar", 370.0),
    waypoint("Sirsa", 420.0),
    waypoint("Bhiwani", 450.0),
    waypoint("Rewari", 480.0),
    waypoint("Gurugram", 500.0),
    waypoint("Faridabad", 530.0),
];

/// Number of waypoints on the route.
#[must_use]
pub const fn route_len() -> usize {
    ROUTE.len()
}

/// Index of the terminal waypoint.
#[must_use]
pub const fn last_index() -> usize {
    ROUTE.len() - 1
}

/// Maximum value `route_progress` may take.
#[must_use]
pub fn max_progress() -> f32 {
    index_to_f32(last_index())
}

/// Accumulated f32 steps within this distance of a waypoint land on it.
const WAYPOINT_SNAP: f32 = 1e-3;

/// Clamp a progress value into `[0, route_len - 1]`, snapping near-misses
/// onto the closest waypoint.
#[must_use]
pub fn clamp_progress(progress: f32) -> f32 {
    if !progress.is_finite() {
        return 0.0;
    }
    let nearest = progress.round();
    let progress = if (progress - nearest).abs() < WAYPOINT_SNAP {
        nearest
    } else {
        progress
    };
    progress.clamp(0.0, max_progress())
}

/// Waypoint at the floor of the given progress.
#[must_use]
pub fn waypoint_at(progress: f32) -> &'static Waypoint {
    let index = floor_to_index(clamp_progress(progress)).min(last_index());
    &ROUTE[index]
}

/// Name of the nearest passed waypoint for display.
#[must_use]
pub fn location_for(progress: f32) -> &'static str {
    waypoint_at(progress).name
}

/// Kilometres covered, interpolated between the surrounding waypoints.
#[must_use]
pub fn distance_covered_km(progress: f32) -> f32 {
    let progress = clamp_progress(progress);
    let index = floor_to_index(progress).min(last_index());
    let here = ROUTE[index];
    let Some(next) = ROUTE.get(index + 1) else {
        return here.distance_km;
    };
    let fraction = progress - index_to_f32(index);
    here.distance_km + (next.distance_km - here.distance_km) * fraction
}

/// Whether the progress value sits on the final waypoint.
#[must_use]
pub fn at_destination(progress: f32) -> bool {
    progress >= max_progress()
}
