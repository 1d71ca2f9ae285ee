//! Flat action space: `index = from * 64 + to`.
//!
//! The raw codec is a pure bijection on (from, to). Promotion is resolved
//! against a board afterwards: a pawn reaching its last rank always becomes a
//! queen, so under-promotions are not reachable from the action space.

use crate::clock::sanitize_elapsed;
use crate::error::EnvError;
use crate::rules::RulesEngine;
use crate::types::{Move, PieceKind, Square};

/// Number of discrete actions (64 × 64).
pub const ACTION_SPACE_SIZE: usize = 64 * 64;

// ---------------------------------------------------------------------------
// Codec
// ---------------------------------------------------------------------------

/// Split an action index in `[0, 4095]` into (from, to).
///
/// Callers guarantee the bound; bits above the 12th are ignored.
#[inline]
pub fn decode(index: u16) -> (Square, Square) {
    let index = index & 0x0FFF;
    (
        Square::wrapping((index / 64) as u8),
        Square::wrapping((index % 64) as u8),
    )
}

#[inline]
pub fn encode(from: Square, to: Square) -> u16 {
    from.index() as u16 * 64 + to.index() as u16
}

/// Action index of a move, ignoring its promotion piece.
#[inline]
pub fn encode_move(mv: &Move) -> u16 {
    encode(mv.from, mv.to)
}

/// Decode an index into a full `Move` against the current board.
///
/// Never fails; the resulting move may still be illegal.
pub fn resolve_move<E: RulesEngine>(index: u16, board: &E) -> Move {
    let (from, to) = decode(index);
    let promotion = match board.piece_at(from) {
        Some((color, PieceKind::Pawn)) if to.rank() == color.promotion_rank() => {
            Some(PieceKind::Queen)
        }
        _ => None,
    };
    Move::new(from, to, promotion)
}

// ---------------------------------------------------------------------------
// Action input forms
// ---------------------------------------------------------------------------

/// What a caller hands to `step`.
///
/// `Move` is a bare index with zero deliberation time; `Timed` carries the
/// elapsed wall-clock seconds measured by a harness.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Action {
    Move(i64),
    Timed(i64, f64),
}

impl Action {
    pub fn index(&self) -> i64 {
        match *self {
            Action::Move(i) | Action::Timed(i, _) => i,
        }
    }

    /// Elapsed seconds, already sanitised (NaN, ±inf and negatives become 0).
    pub fn elapsed(&self) -> f64 {
        match *self {
            Action::Move(_) => 0.0,
            Action::Timed(_, t) => sanitize_elapsed(t),
        }
    }

    /// Same index with a different elapsed time.
    pub fn with_elapsed(&self, elapsed: f64) -> Action {
        Action::Timed(self.index(), elapsed)
    }

    /// Validate the index against the action space.
    pub fn validate(&self) -> Result<(u16, f64), EnvError> {
        let index = self.index();
        if !(0..ACTION_SPACE_SIZE as i64).contains(&index) {
            return Err(EnvError::InvalidAction(index));
        }
        Ok((index as u16, self.elapsed()))
    }
}

impl From<i64> for Action {
    fn from(index: i64) -> Self {
        Action::Move(index)
    }
}

impl From<usize> for Action {
    fn from(index: usize) -> Self {
        Action::Move(i64::try_from(index).unwrap_or(i64::MAX))
    }
}

impl From<u16> for Action {
    fn from(index: u16) -> Self {
        Action::Move(index as i64)
    }
}

impl From<(i64, f64)> for Action {
    fn from((index, elapsed): (i64, f64)) -> Self {
        Action::Timed(index, elapsed)
    }
}

impl From<(usize, f64)> for Action {
    fn from((index, elapsed): (usize, f64)) -> Self {
        Action::Timed(i64::try_from(index).unwrap_or(i64::MAX), elapsed)
    }
}
