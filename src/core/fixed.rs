//! Q16.16 Fixed-Point Arithmetic
//!
//! Deterministic fixed-point math for the lane simulation.
//! All gameplay arithmetic uses integers only - floats appear solely when
//! values leave the core for rendering.
//!
//! ## Units
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  World unit: 1 tile (40 source pixels)                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  travel axis (x)  grass lane = 1 tile, road/rail/river = 2  │
//! │  free axis   (y)  viewport span = 15 tiles                  │
//! │  time             seconds, converted from integer ms        │
//! │                                                             │
//! │  Range: ±32768 tiles, precision 1/65536 tile                │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

/// Q16.16 fixed-point number stored as i32.
pub type Fixed = i32;

/// Number of fractional bits (16)
pub const FIXED_SCALE: i32 = 16;

/// 1.0 in fixed-point (65536)
pub const FIXED_ONE: Fixed = 1 << FIXED_SCALE;

/// 0.5 in fixed-point (32768)
pub const FIXED_HALF: Fixed = FIXED_ONE >> 1;

// =============================================================================
// WORLD CONSTANTS (tile units, integer literals)
// =============================================================================

/// Grass lane width: 1 tile
pub const GRASS_LANE_WIDTH: Fixed = FIXED_ONE;

/// Road, rail and river lane width: 2 tiles
pub const WIDE_LANE_WIDTH: Fixed = 2 * FIXED_ONE;

/// Free-axis span of the play field: 15 tiles (600 px)
pub const VIEWPORT_SPAN: Fixed = 15 * FIXED_ONE;

/// Player box edge: 0.75 tiles (30 px)
pub const PLAYER_SIZE: Fixed = 49152;

/// Milliseconds in one second
pub const MILLIS_PER_SECOND: i64 = 1000;

// =============================================================================
// CORE OPERATIONS
// =============================================================================

/// Convert a compile-time float to fixed-point.
///
/// Only use for constants and configuration defaults, never inside a tick.
///
/// ```
/// use lane_runner::core::fixed::{to_fixed, FIXED_ONE};
/// const TWO_AND_HALF: i32 = to_fixed(2.5);
/// assert_eq!(TWO_AND_HALF, FIXED_ONE * 2 + FIXED_ONE / 2);
/// ```
#[inline]
pub const fn to_fixed(f: f64) -> Fixed {
    (f * (FIXED_ONE as f64)) as Fixed
}

/// Convert fixed-point to float for display/rendering.
#[inline]
pub fn to_float(f: Fixed) -> f32 {
    f as f32 / FIXED_ONE as f32
}

/// Convert a whole number of tiles to fixed-point.
#[inline]
pub const fn from_int(i: i32) -> Fixed {
    i << FIXED_SCALE
}

/// Multiply two fixed-point numbers through an i64 intermediate.
#[inline]
pub fn fixed_mul(a: Fixed, b: Fixed) -> Fixed {
    let wide = (a as i64) * (b as i64);
    (wide >> FIXED_SCALE) as Fixed
}

/// Absolute value of a fixed-point number.
#[inline]
pub fn fixed_abs(x: Fixed) -> Fixed {
    if x < 0 { x.wrapping_neg() } else { x }
}

/// Clamp a fixed-point number to `[min, max]`.
///
/// If the range is inverted the midpoint is returned, so a box wider than
/// its container stays centered instead of jittering between the edges.
#[inline]
pub fn fixed_clamp(value: Fixed, min: Fixed, max: Fixed) -> Fixed {
    if min > max {
        return min + ((max - min) >> 1);
    }
    value.max(min).min(max)
}

/// Linear interpolation: a + (b - a) * t, with t in [0, FIXED_ONE].
#[inline]
pub fn fixed_lerp(a: Fixed, b: Fixed, t: Fixed) -> Fixed {
    let diff = b.wrapping_sub(a);
    a.wrapping_add(fixed_mul(diff, t))
}

/// Convert an integer frame delta in milliseconds to fixed-point seconds.
#[inline]
pub fn millis_to_fixed(millis: u32) -> Fixed {
    (((millis as i64) << FIXED_SCALE) / MILLIS_PER_SECOND) as Fixed
}

/// Display adapter that prints a fixed-point value as a decimal.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tiles(pub Fixed);

impl fmt::Debug for Tiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}t", to_float(self.0))
    }
}

impl fmt::Display for Tiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", to_float(self.0))
    }
}

// =============================================================================
// TESTS
// =============================================================================
