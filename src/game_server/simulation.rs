//! Simulation - the game server owning session state and the tick loop
//!
//! Holds the balance, the session phase, the live control values, and
//! the active race, and provides the interface the host frame loop
//! drives: start a session, tick it once per animation frame, and halt
//! or reset it.

use std::fmt;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::game_server::car::{CarParams, CarSnapshot, CAR_COUNT};
use crate::game_server::payout::{self, Verdict};
use crate::game_server::race::{Race, SurfaceSize};
use crate::game_server::render::{render_frame, DrawCommand};

/// Balance every session starts from.
pub const STARTING_BALANCE: f64 = 1000.0;

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Idle,
    Running,
    Ended,
}

/// API misuse at the session boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    /// The previous session ended; the host must reset before starting
    /// another one.
    Ended,
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Ended => write!(f, "session has ended; reset before starting again"),
        }
    }
}

impl std::error::Error for SessionError {}

/// Live control values owned by the host widgets.
///
/// Speed controls are applied at the next session start; bets are read
/// at settlement time, so they always reflect the latest edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Controls {
    pub speed: [CarParams; CAR_COUNT],
    pub bets: [f64; CAR_COUNT],
}

impl Default for Controls {
    fn default() -> Self {
        Self {
            speed: CarParams::defaults(),
            bets: [0.0; CAR_COUNT],
        }
    }
}

/// Everything the host needs to present one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameOutput {
    /// Ordered drawing instructions for the surface.
    pub commands: Vec<DrawCommand>,
    /// Current balance readout.
    pub balance: f64,
    pub phase: Phase,
    /// Terminal message, present once the session has ended.
    pub message: Option<String>,
}

impl FrameOutput {
    /// JSON transfer form for hosts across an IPC boundary.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Full session view for hosts that draw themselves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub phase: Phase,
    pub balance: f64,
    pub max_balance: f64,
    pub cars: Vec<CarSnapshot>,
}

/// Main game server.
pub struct GameServer {
    phase: Phase,
    race: Option<Race>,
    controls: Controls,
    surface: SurfaceSize,
    balance: f64,
    max_balance: f64,
    verdict: Option<Verdict>,
    rng: Box<dyn RngCore>,
}

impl GameServer {
    /// Create a server for a surface of the given geometry.
    pub fn new(surface: SurfaceSize) -> Self {
        Self::with_rng(surface, Box::new(StdRng::from_entropy()))
    }

    /// Create a server with an explicit random source, so speed and
    /// color draws can be seeded.
    pub fn with_rng(surface: SurfaceSize, rng: Box<dyn RngCore>) -> Self {
        Self {
            phase: Phase::Idle,
            race: None,
            controls: Controls::default(),
            surface,
            balance: STARTING_BALANCE,
            max_balance: STARTING_BALANCE,
            verdict: None,
            rng,
        }
    }

    /// Start a new session: reset balance and peak, rebuild the four
    /// cars with fresh speed and color draws, clear any terminal
    /// message, and return the initial frame.
    ///
    /// Once a session has ended, further starts are refused until the
    /// host calls [`reset`](Self::reset).
    pub fn start_session(&mut self) -> Result<FrameOutput, SessionError> {
        if self.phase == Phase::Ended {
            return Err(SessionError::Ended);
        }
        self.balance = STARTING_BALANCE;
        self.max_balance = STARTING_BALANCE;
        self.verdict = None;
        self.race = Some(Race::new(self.surface, &self.controls.speed, self.rng.as_mut()));
        self.phase = Phase::Running;
        log::info!("session started with {} cars", CAR_COUNT);
        Ok(self.frame())
    }

    /// Advance the simulation by one host frame.
    pub fn tick(&mut self) -> Option<FrameOutput> {
        self.advance(1.0)
    }

    /// Explicit stepping form of the frame loop; `dt` is measured in
    /// host frames (1.0 per animation callback).
    ///
    /// Every car moves by `speed * dt`; finishers are settled
    /// independently in index order, each against the bets as they
    /// stand at that moment. A frame with no finisher leaves the
    /// balance untouched. Once the balance is drained the session ends
    /// with [`Verdict::GameOver`].
    pub fn advance(&mut self, dt: f64) -> Option<FrameOutput> {
        if self.phase != Phase::Running {
            return None;
        }
        let finishers = self.race.as_mut()?.advance(dt);
        for index in finishers {
            self.settle(index);
        }
        if self.balance <= 0.0 {
            self.end_session(Verdict::GameOver);
        }
        Some(self.frame())
    }

    /// Halt a running session. The verdict reflects the balance at the
    /// moment of the halt: still solvent counts as a win.
    pub fn stop_session(&mut self) -> Option<FrameOutput> {
        if self.phase != Phase::Running {
            return None;
        }
        self.end_session(Verdict::for_balance(self.balance));
        Some(self.frame())
    }

    /// External reset back to idle, re-enabling session starts.
    pub fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.race = None;
        self.balance = STARTING_BALANCE;
        self.max_balance = STARTING_BALANCE;
        self.verdict = None;
        log::info!("server reset");
    }

    /// Update surface geometry. Rendering only: speeds, offsets, and
    /// balance are untouched, and lanes re-derive on the next draw.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.surface = SurfaceSize { width, height };
        if let Some(race) = &mut self.race {
            race.surface = self.surface;
        }
    }

    /// Record a bet control edit. The value is clamped to the current
    /// balance at edit time only; a later, lower balance does not
    /// revisit values already stored.
    pub fn set_bet(&mut self, index: usize, value: f64) {
        self.controls.bets[index] = if value > self.balance {
            self.balance
        } else {
            value
        };
    }

    /// Record a speed control edit; takes effect at the next session
    /// start.
    pub fn set_speed_control(&mut self, index: usize, base_speed: f64) {
        self.controls.speed[index].base_speed = base_speed;
    }

    /// Render the current frame without advancing the simulation.
    pub fn current_frame(&self) -> FrameOutput {
        self.frame()
    }

    /// Full session view for hosts that draw themselves.
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            phase: self.phase,
            balance: self.balance,
            max_balance: self.max_balance,
            cars: self.race.as_ref().map(Race::snapshot).unwrap_or_default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn max_balance(&self) -> f64 {
        self.max_balance
    }

    pub fn verdict(&self) -> Option<Verdict> {
        self.verdict
    }

    pub fn bets(&self) -> &[f64; CAR_COUNT] {
        &self.controls.bets
    }

    /// Settle one finish event against the live bets.
    fn settle(&mut self, finisher: usize) {
        let delta = payout::compute_delta(finisher, &self.controls.bets);
        self.balance += delta;
        if self.balance > self.max_balance {
            self.max_balance = self.balance;
        }
        log::debug!(
            "car {} finished: delta {}, balance {}",
            finisher,
            delta,
            self.balance
        );
    }

    fn end_session(&mut self, verdict: Verdict) {
        self.phase = Phase::Ended;
        self.verdict = Some(verdict);
        log::info!("session ended: {}", verdict.message(self.max_balance));
    }

    fn frame(&self) -> FrameOutput {
        FrameOutput {
            commands: self.race.as_ref().map(render_frame).unwrap_or_default(),
            balance: self.balance,
            phase: self.phase,
            message: self.verdict.map(|v| v.message(self.max_balance)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::car::CAR_WIDTH;
    use crate::game_server::payout::LOWEST_BET_PENALTY;

    fn server(width: f64, height: f64) -> GameServer {
        GameServer::with_rng(
            SurfaceSize { width, height },
            Box::new(StdRng::seed_from_u64(7)),
        )
    }

    fn set_bets(server: &mut GameServer, bets: [f64; CAR_COUNT]) {
        for (i, bet) in bets.into_iter().enumerate() {
            server.set_bet(i, bet);
        }
    }

    /// Pin one car to finish on the next tick and park the rest.
    fn rig_finisher(server: &mut GameServer, index: usize) {
        let race = server.race.as_mut().unwrap();
        for car in &mut race.cars {
            car.x = 0.0;
            car.speed = if car.index == index { race.surface.width + 1.0 } else { 0.0 };
        }
    }

    #[test]
    fn fresh_session_has_the_starting_invariants() {
        let mut server = server(800.0, 600.0);
        server.start_session().unwrap();
        assert_eq!(server.phase(), Phase::Running);
        assert_eq!(server.balance(), STARTING_BALANCE);
        assert_eq!(server.max_balance(), STARTING_BALANCE);
        for car in &server.snapshot().cars {
            assert_eq!(car.x, 0.0);
        }
    }

    #[test]
    fn initial_frame_draws_every_car_at_the_line() {
        let mut server = server(800.0, 600.0);
        let frame = server.start_session().unwrap();
        assert_eq!(frame.commands.len(), CAR_COUNT + 1);
        assert_eq!(frame.balance, STARTING_BALANCE);
        assert!(frame.message.is_none());
        for command in &frame.commands[1..] {
            match command {
                DrawCommand::FillRect { x, .. } => assert_eq!(*x, 0.0),
                other => panic!("expected FillRect, got {other:?}"),
            }
        }
    }

    #[test]
    fn quiet_ticks_leave_the_balance_alone() {
        // Surface far wider than any speed reaches in a few frames.
        let mut server = server(1e9, 600.0);
        server.start_session().unwrap();
        set_bets(&mut server, [10.0, 50.0, 30.0, 80.0]);
        for _ in 0..10 {
            let frame = server.tick().unwrap();
            assert_eq!(frame.balance, STARTING_BALANCE);
        }
        assert_eq!(server.max_balance(), STARTING_BALANCE);
    }

    #[test]
    fn tick_outside_a_running_session_is_a_no_op() {
        let mut server = server(800.0, 600.0);
        assert!(server.tick().is_none());
        assert!(server.stop_session().is_none());
    }

    #[test]
    fn highest_bet_winner_raises_the_balance_and_the_peak() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        set_bets(&mut server, [10.0, 50.0, 30.0, 80.0]);
        rig_finisher(&mut server, 3);
        let frame = server.tick().unwrap();
        assert_eq!(frame.balance, 1080.0);
        assert_eq!(server.max_balance(), 1080.0);
        assert_eq!(server.phase(), Phase::Running);
    }

    #[test]
    fn middle_bet_winner_costs_its_bet() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        set_bets(&mut server, [10.0, 50.0, 30.0, 80.0]);
        rig_finisher(&mut server, 1);
        let frame = server.tick().unwrap();
        assert_eq!(frame.balance, 950.0);
        // A losing settlement never drags the peak down.
        assert_eq!(server.max_balance(), STARTING_BALANCE);
    }

    #[test]
    fn draining_the_balance_exactly_ends_with_game_over() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        // Equal bets put car 0 on the penalty rule; two wins drain
        // 1000 to exactly 0.
        set_bets(&mut server, [20.0, 20.0, 20.0, 20.0]);
        rig_finisher(&mut server, 0);
        let frame = server.tick().unwrap();
        assert_eq!(frame.balance, STARTING_BALANCE - LOWEST_BET_PENALTY);
        assert_eq!(server.phase(), Phase::Running);

        rig_finisher(&mut server, 0);
        let frame = server.tick().unwrap();
        assert_eq!(frame.balance, 0.0);
        assert_eq!(frame.phase, Phase::Ended);
        assert_eq!(server.verdict(), Some(Verdict::GameOver));
        assert_eq!(
            frame.message.as_deref(),
            Some("Game Over! Your maximum balance: 1000")
        );
    }

    #[test]
    fn halting_while_solvent_is_a_win_reporting_the_peak() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        set_bets(&mut server, [10.0, 50.0, 30.0, 80.0]);
        rig_finisher(&mut server, 3);
        server.tick().unwrap();

        let frame = server.stop_session().unwrap();
        assert_eq!(frame.phase, Phase::Ended);
        assert_eq!(server.verdict(), Some(Verdict::YouWon));
        assert_eq!(
            frame.message.as_deref(),
            Some("You won! Your maximum balance: 1080")
        );
    }

    #[test]
    fn peak_is_monotone_within_a_session() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        set_bets(&mut server, [10.0, 50.0, 30.0, 80.0]);

        rig_finisher(&mut server, 3);
        server.tick().unwrap();
        assert_eq!(server.max_balance(), 1080.0);

        rig_finisher(&mut server, 1);
        server.tick().unwrap();
        assert_eq!(server.balance(), 1030.0);
        assert_eq!(server.max_balance(), 1080.0);
    }

    #[test]
    fn simultaneous_finishers_settle_independently_in_index_order() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        set_bets(&mut server, [10.0, 50.0, 30.0, 80.0]);
        let race = server.race.as_mut().unwrap();
        for car in &mut race.cars {
            car.x = 0.0;
            car.speed = if car.index == 2 || car.index == 3 { 501.0 } else { 0.0 };
        }
        // Car 2 forfeits 30, car 3 pays out 80.
        let frame = server.tick().unwrap();
        assert_eq!(frame.balance, STARTING_BALANCE - 30.0 + 80.0);
        assert_eq!(server.max_balance(), 1050.0);
    }

    #[test]
    fn starting_again_is_refused_until_reset() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        set_bets(&mut server, [20.0, 20.0, 20.0, 20.0]);
        rig_finisher(&mut server, 0);
        server.tick().unwrap();
        rig_finisher(&mut server, 0);
        server.tick().unwrap();
        assert_eq!(server.phase(), Phase::Ended);

        assert_eq!(server.start_session(), Err(SessionError::Ended));

        server.reset();
        assert_eq!(server.phase(), Phase::Idle);
        assert!(server.start_session().is_ok());
        assert_eq!(server.balance(), STARTING_BALANCE);
    }

    #[test]
    fn restart_replaces_the_cars_wholesale() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        rig_finisher(&mut server, 2);
        server.tick().unwrap();
        assert_eq!(server.snapshot().cars[2].x, -CAR_WIDTH);

        server.start_session().unwrap();
        for car in &server.snapshot().cars {
            assert_eq!(car.x, 0.0);
        }
    }

    #[test]
    fn bet_edits_clamp_to_the_current_balance_only_at_edit_time() {
        let mut server = server(500.0, 600.0);
        server.start_session().unwrap();
        server.set_bet(1, 1500.0);
        assert_eq!(server.bets()[1], STARTING_BALANCE);

        // Drop the balance below a stored bet; the stale value stays.
        set_bets(&mut server, [900.0, 900.0, 900.0, 900.0]);
        rig_finisher(&mut server, 0);
        server.tick().unwrap();
        assert_eq!(server.balance(), 500.0);
        assert_eq!(server.bets()[1], 900.0);

        // The next edit clamps against the reduced balance.
        server.set_bet(2, 800.0);
        assert_eq!(server.bets()[2], 500.0);
    }

    #[test]
    fn speed_controls_apply_only_at_the_next_start() {
        let mut server = server(1e9, 600.0);
        server.start_session().unwrap();
        let before = server.snapshot().cars[0].speed;
        server.set_speed_control(0, 100.0);
        server.tick().unwrap();
        assert_eq!(server.snapshot().cars[0].speed, before);

        server.start_session().unwrap();
        let after = server.snapshot().cars[0].speed;
        // defaults()[0] draws from [2, 8), so base 100 lands in [102, 108).
        assert!(after >= 102.0 && after < 108.0, "speed {after} ignored the control");
    }

    #[test]
    fn resize_changes_geometry_but_not_the_simulation() {
        let mut server = server(800.0, 600.0);
        server.start_session().unwrap();
        let speeds: Vec<f64> = server.snapshot().cars.iter().map(|c| c.speed).collect();
        let balance = server.balance();

        server.resize(400.0, 400.0);
        let snapshot = server.snapshot();
        assert_eq!(server.balance(), balance);
        for (car, speed) in snapshot.cars.iter().zip(&speeds) {
            assert_eq!(car.speed, *speed);
        }
        // Lanes re-derive from the new height on the next draw.
        assert_eq!(snapshot.cars[1].y, 1.0 * (400.0 / 4.0) + 100.0);
        match &server.current_frame().commands[0] {
            DrawCommand::Clear { width, height } => {
                assert_eq!((*width, *height), (400.0, 400.0));
            }
            other => panic!("expected Clear, got {other:?}"),
        }
    }

    #[test]
    fn current_frame_matches_the_last_tick_output() {
        let mut server = server(1e9, 600.0);
        server.start_session().unwrap();
        let ticked = server.tick().unwrap();
        assert_eq!(server.current_frame(), ticked);
    }

    #[test]
    fn frame_output_round_trips_through_json() {
        let mut server = server(800.0, 600.0);
        let frame = server.start_session().unwrap();
        let json = frame.to_json().unwrap();
        let back: FrameOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }
}
