//! Payout - bet settlement rule and terminal verdicts
//!
//! Settlement is evaluated fresh on every finish event against the
//! live bet values: the car carrying the lowest bet pays a flat
//! penalty when it wins, the car carrying the highest bet pays out its
//! bet, and any other winner forfeits its bet. Ties on lowest/highest
//! go to the first index.

use serde::{Deserialize, Serialize};

/// Flat penalty applied when the car carrying the lowest bet wins.
pub const LOWEST_BET_PENALTY: f64 = 500.0;

/// Index of the minimum bet; the first occurrence wins ties.
pub fn lowest_bet_index(bets: &[f64]) -> usize {
    let mut lowest = 0;
    for (i, &bet) in bets.iter().enumerate().skip(1) {
        if bet < bets[lowest] {
            lowest = i;
        }
    }
    lowest
}

/// Index of the maximum bet; the first occurrence wins ties.
pub fn highest_bet_index(bets: &[f64]) -> usize {
    let mut highest = 0;
    for (i, &bet) in bets.iter().enumerate().skip(1) {
        if bet > bets[highest] {
            highest = i;
        }
    }
    highest
}

/// Balance delta for a finish event.
///
/// The lowest-bet penalty takes precedence over the highest-bet payout
/// when both resolve to the same index, so with four equal bets a win
/// by car 0 is always the penalty case.
pub fn compute_delta(finisher: usize, bets: &[f64]) -> f64 {
    if finisher == lowest_bet_index(bets) {
        -LOWEST_BET_PENALTY
    } else if finisher == highest_bet_index(bets) {
        bets[finisher]
    } else {
        -bets[finisher]
    }
}

/// Terminal classification for an ended session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    GameOver,
    YouWon,
}

impl Verdict {
    /// Classify a halt: a drained balance is a loss, anything else is
    /// a win.
    pub fn for_balance(balance: f64) -> Self {
        if balance <= 0.0 {
            Verdict::GameOver
        } else {
            Verdict::YouWon
        }
    }

    /// End-of-session message shown by the host, reporting the session
    /// peak balance.
    pub fn message(&self, max_balance: f64) -> String {
        match self {
            Verdict::GameOver => format!("Game Over! Your maximum balance: {max_balance}"),
            Verdict::YouWon => format!("You won! Your maximum balance: {max_balance}"),
        }
    }
}
