//! Game Server Module
//!
//! Runs the four-car betting race and hands the host frontend frames,
//! snapshots, and settlement results.

pub mod car;
pub mod payout;
pub mod race;
pub mod render;
pub mod simulation;

pub use car::{CarParams, CarSnapshot, CarState};
pub use payout::Verdict;
pub use race::{Race, SurfaceSize};
pub use render::DrawCommand;
pub use simulation::{GameServer, Phase};
