//! Car - individual car state and per-race attributes
//!
//! Each car has a horizontal offset, a display color, and a speed
//! drawn once when the race starts. Motion from tick to tick is linear
//! at that speed.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

/// Car rectangle width on the drawing surface.
pub const CAR_WIDTH: f64 = 40.0;

/// Car rectangle height on the drawing surface.
pub const CAR_HEIGHT: f64 = 20.0;

/// Number of cars in every race.
pub const CAR_COUNT: usize = 4;

/// Speed controls for one car: the base value the host slider edits
/// plus the envelope the per-race random draw comes from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarParams {
    pub base_speed: f64,
    pub speed_min: f64,
    pub speed_max: f64,
}

impl CarParams {
    /// Stock control settings for the four cars. The envelopes get
    /// wider toward the outside lanes.
    pub fn defaults() -> [CarParams; CAR_COUNT] {
        [
            CarParams { base_speed: 5.0, speed_min: 2.0, speed_max: 8.0 },
            CarParams { base_speed: 5.0, speed_min: 3.0, speed_max: 7.0 },
            CarParams { base_speed: 5.0, speed_min: 4.0, speed_max: 6.0 },
            CarParams { base_speed: 5.0, speed_min: 1.0, speed_max: 9.0 },
        ]
    }
}

/// Complete state for a single car during one race.
///
/// The lane vertical offset is not stored here; it is derived from the
/// index and the current surface height at draw time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    /// Positional index (0..3), stable for the lifetime of one race.
    pub index: usize,
    /// Horizontal offset along the surface.
    pub x: f64,
    /// Display color, "#RRGGBB". Irrelevant to the outcome.
    pub color: String,
    /// Speed for this race, drawn once at race start.
    pub speed: f64,
}

impl CarState {
    /// Create a car at the starting line with a fresh random color and
    /// a speed of `uniform(min..max) + base`.
    pub fn new(index: usize, params: &CarParams, rng: &mut dyn RngCore) -> Self {
        Self {
            index,
            x: 0.0,
            color: random_color(rng),
            speed: random_speed(params, rng),
        }
    }
}

fn random_speed(params: &CarParams, rng: &mut dyn RngCore) -> f64 {
    rng.gen_range(params.speed_min..params.speed_max) + params.base_speed
}

fn random_color(rng: &mut dyn RngCore) -> String {
    const HEX: &[u8] = b"0123456789ABCDEF";
    let mut color = String::with_capacity(7);
    color.push('#');
    for _ in 0..6 {
        color.push(HEX[rng.gen_range(0..HEX.len())] as char);
    }
    color
}

/// Compact car state for host transfer, with the lane already derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarSnapshot {
    pub index: usize,
    pub x: f64,
    pub y: f64,
    pub color: String,
    pub speed: f64,
}
