//! Numeric helpers centralizing resource clamping and safe casts.

use num_traits::cast::cast;

use crate::constants::{RESOURCE_MAX, RESOURCE_MIN};

/// Clamp a resource value into `[0, 100]`, mapping non-finite input to the floor.
#[must_use]
pub fn clamp_percent(value: f32) -> f32 {
    if !value.is_finite() {
        return RESOURCE_MIN;
    }
    value.clamp(RESOURCE_MIN, RESOURCE_MAX)
}

/// Floor a non-negative progress value into a waypoint index.
#[must_use]
pub fn floor_to_index(value: f32) -> usize {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f32, usize>(value.floor()).unwrap_or(0)
}

/// Convert a waypoint index into a progress value.
#[must_use]
pub fn index_to_f32(index: usize) -> f32 {
    cast::<usize, f32>(index).unwrap_or(0.0)
}

/// Round an `f32` display value to the nearest `i32`, returning 0 for NaN.
#[must_use]
pub fn round_f32_to_i32(value: f32) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f32>(i32::MIN).unwrap_or(f32::MIN);
    let max = cast::<i32, f32>(i32::MAX).unwrap_or(f32::MAX);
    cast::<f32, i32>(value.clamp(min, max).round()).unwrap_or(0)
}

/// Format a resource for log lines: whole numbers without decimals, otherwise one place.
#[must_use]
pub fn format_percent(value: f32) -> String {
    if value.fract().abs() < f32::EPSILON {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_percent_handles_bounds_and_nan() {
        assert!((clamp_percent(-4.0) - 0.0).abs() < f32::EPSILON);
        assert!((clamp_percent(140.0) - 100.0).abs() < f32::EPSILON);
        assert!((clamp_percent(f32::NAN) - 0.0).abs() < f32::EPSILON);
        assert!((clamp_percent(42.5) - 42.5).abs() < f32::EPSILON);
    }

    #[test]
    fn floor_to_index_truncates_fractions() {
        assert_eq!(floor_to_index(0.0), 0);
        assert_eq!(floor_to_index(2.8), 2);
        assert_eq!(floor_to_index(-1.0), 0);
        assert_eq!(floor_to_index(f32::INFINITY), 0);
    }

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f32_to_i32(1.6), 2);
        assert_eq!(round_f32_to_i32(f32::NAN), 0);
        assert_eq!(index_to_f32(16), 16.0);
    }

    #[test]
    fn format_percent_drops_trailing_zero() {
        assert_eq!(format_percent(97.0), "97");
        assert_eq!(format_percent(96.5), "96.5");
    }
}
