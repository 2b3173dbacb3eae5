//! Car Derby - betting race core
//!
//! Four cars race across a host-owned drawing surface at speeds drawn
//! once per race; the player bets on each car through host-owned
//! sliders, and every finish settles against the live bet values. The
//! host supplies control values and executes the returned draw
//! commands; everything else happens here.

pub mod game_server;

pub use game_server::car::{CarParams, CarSnapshot, CarState, CAR_COUNT, CAR_HEIGHT, CAR_WIDTH};
pub use game_server::payout::{Verdict, LOWEST_BET_PENALTY};
pub use game_server::race::{Race, SurfaceSize};
pub use game_server::render::DrawCommand;
pub use game_server::simulation::{
    Controls, FrameOutput, GameServer, Phase, SessionError, SessionSnapshot, STARTING_BALANCE,
};
