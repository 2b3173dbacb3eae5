//! Render - draw commands for the host surface
//!
//! The core never touches a canvas itself; it hands the host an
//! ordered command list to execute. Rendering is a pure function of
//! the current car positions.

use serde::{Deserialize, Serialize};

use crate::game_server::car::{CAR_HEIGHT, CAR_WIDTH};
use crate::game_server::race::Race;

/// One drawing instruction for the host surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    /// Clear the whole surface.
    Clear { width: f64, height: f64 },
    /// Fill a rectangle in the given color.
    FillRect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: String,
    },
}

/// Produce the frame for the current race state: clear, then one
/// 40x20 rectangle per car in index order.
pub fn render_frame(race: &Race) -> Vec<DrawCommand> {
    let mut commands = Vec::with_capacity(race.cars.len() + 1);
    commands.push(DrawCommand::Clear {
        width: race.surface.width,
        height: race.surface.height,
    });
    for car in &race.cars {
        commands.push(DrawCommand::FillRect {
            x: car.x,
            y: race.lane_y(car.index),
            width: CAR_WIDTH,
            height: CAR_HEIGHT,
            color: car.color.clone(),
        });
    }
    commands
}
