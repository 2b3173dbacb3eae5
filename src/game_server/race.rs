//! Race - car setup, motion, and finish detection
//!
//! Owns the four cars for one race and the surface geometry they run
//! across. Advancing the race moves every car and reports which cars
//! crossed the right edge this tick.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::game_server::car::{CarParams, CarSnapshot, CarState, CAR_COUNT, CAR_WIDTH};

/// Vertical margin above the first lane.
const LANE_MARGIN: f64 = 100.0;

/// Drawing surface geometry, owned by the host and read at session
/// start and on resize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceSize {
    pub width: f64,
    pub height: f64,
}

/// One race: four cars and the surface they run across.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Race {
    pub cars: Vec<CarState>,
    pub surface: SurfaceSize,
}

impl Race {
    /// Create a race with four cars at the starting line, each with a
    /// fresh speed and color draw.
    pub fn new(
        surface: SurfaceSize,
        params: &[CarParams; CAR_COUNT],
        rng: &mut dyn RngCore,
    ) -> Self {
        let cars = params
            .iter()
            .enumerate()
            .map(|(i, p)| CarState::new(i, p, rng))
            .collect();
        Self { cars, surface }
    }

    /// Advance every car by `speed * dt` and collect finish events.
    ///
    /// A finishing car wraps to one car-width off the left edge so the
    /// next frame re-enters from the left; each crossing fires exactly
    /// once. Finishers are reported in index order.
    pub fn advance(&mut self, dt: f64) -> Vec<usize> {
        let mut finishers = Vec::new();
        for car in &mut self.cars {
            car.x += car.speed * dt;
            if car.x > self.surface.width {
                car.x = -CAR_WIDTH;
                finishers.push(car.index);
            }
        }
        finishers
    }

    /// Lane vertical offset for a car index, derived from the current
    /// surface height so a resize takes effect on the next draw.
    pub fn lane_y(&self, index: usize) -> f64 {
        index as f64 * (self.surface.height / CAR_COUNT as f64) + LANE_MARGIN
    }

    /// Compact per-car view for host transfer.
    pub fn snapshot(&self) -> Vec<CarSnapshot> {
        self.cars
            .iter()
            .map(|car| CarSnapshot {
                index: car.index,
                x: car.x,
                y: self.lane_y(car.index),
                color: car.color.clone(),
                speed: car.speed,
            })
            .collect()
    }
}
