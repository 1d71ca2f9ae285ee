use std::fmt;

use crate::types::{CastlingSide, Color, GameResult, Move, PieceKind, Square};

// ---------------------------------------------------------------------------
// RulesError
// ---------------------------------------------------------------------------

/// Error reported by a rules engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// `apply` was handed a move outside the legal-move set.
    IllegalMove(Move),
    /// A position description could not be parsed or is not a legal setup.
    InvalidFen(String),
}

impl fmt::Display for RulesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IllegalMove(mv) => write!(f, "illegal move {mv}"),
            Self::InvalidFen(msg) => write!(f, "invalid FEN: {msg}"),
        }
    }
}

impl std::error::Error for RulesError {}

// ---------------------------------------------------------------------------
// RulesEngine trait
// ---------------------------------------------------------------------------

/// Boundary between the episode state machine and chess logic.
///
/// The environment never looks inside the board: everything it needs goes
/// through these queries, and `apply` is the only way the board changes.
/// Any conformant implementation can be swapped in.
///
/// Implementations must:
/// - report castling in king-destination form (e1g1, not e1h1),
/// - leave the board untouched when `apply` returns an error,
/// - return `Some` from `result` exactly when `is_game_over` is true.
pub trait RulesEngine: Clone {
    /// The standard starting position, White to move.
    fn initial_position() -> Self;

    /// Legal moves for the side to move, in a deterministic order.
    fn legal_moves(&self) -> Vec<Move>;

    fn apply(&mut self, mv: Move) -> Result<(), RulesError>;

    fn is_game_over(&self) -> bool;

    fn result(&self) -> Option<GameResult>;

    fn castling_rights(&self, color: Color, side: CastlingSide) -> bool;

    fn en_passant_target(&self) -> Option<Square>;

    fn piece_at(&self, square: Square) -> Option<(Color, PieceKind)>;

    fn side_to_move(&self) -> Color;

    /// Membership test against the legal-move set.
    fn is_legal(&self, mv: Move) -> bool {
        self.legal_moves().contains(&mv)
    }
}
