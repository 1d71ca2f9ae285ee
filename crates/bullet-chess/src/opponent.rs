use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::EnvError;
use crate::rules::RulesEngine;
use crate::types::Move;

/// Policy that plays Black when the agent is not in self-play.
///
/// Both methods draw from the environment's episode RNG, so a seeded reset
/// replays the opponent exactly. `select_move` is called first, then
/// `think_time`.
pub trait OpponentPolicy {
    /// Pick a move for the side to move. `None` only when there is no legal move.
    fn select_move<E: RulesEngine, R: Rng + ?Sized>(&self, board: &E, rng: &mut R) -> Option<Move>;

    /// Seconds to charge the opponent's clock for the move just played.
    fn think_time<R: Rng + ?Sized>(&self, rng: &mut R) -> f64;
}

/// Uniform random legal move, uniform think time in `[min_think, max_think)`.
#[derive(Clone, Debug, PartialEq)]
pub struct RandomOpponent {
    min_think: f64,
    max_think: f64,
}

impl RandomOpponent {
    pub const DEFAULT_MIN_THINK: f64 = 0.1;
    pub const DEFAULT_MAX_THINK: f64 = 0.5;

    pub fn new(min_think: f64, max_think: f64) -> Result<Self, EnvError> {
        let valid = min_think.is_finite()
            && max_think.is_finite()
            && min_think >= 0.0
            && min_think < max_think;
        if !valid {
            return Err(EnvError::InvalidConfig(format!(
                "opponent think range [{min_think}, {max_think}) is empty or invalid"
            )));
        }
        Ok(Self { min_think, max_think })
    }

    pub fn think_range(&self) -> (f64, f64) {
        (self.min_think, self.max_think)
    }
}

impl Default for RandomOpponent {
    fn default() -> Self {
        Self {
            min_think: Self::DEFAULT_MIN_THINK,
            max_think: Self::DEFAULT_MAX_THINK,
        }
    }
}

impl OpponentPolicy for RandomOpponent {
    fn select_move<E: RulesEngine, R: Rng + ?Sized>(&self, board: &E, rng: &mut R) -> Option<Move> {
        board.legal_moves().choose(rng).copied()
    }

    fn think_time<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        rng.gen_range(self.min_think..self.max_think)
    }
}
