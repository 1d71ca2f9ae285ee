use rand::Rng;

use crate::engine::ShakmatyBoard;
use crate::opponent::OpponentPolicy;
use crate::rules::RulesEngine;
use crate::types::{Move, PieceKind, Square};

/// Square from algebraic notation ("e4").
pub fn sq(name: &str) -> Square {
    let bytes = name.as_bytes();
    assert_eq!(bytes.len(), 2, "bad square {name}");
    Square::from_coords(bytes[1] - b'1', bytes[0] - b'a').unwrap()
}

/// Move from UCI notation ("e2e4", "e7e8q").
pub fn mv(uci: &str) -> Move {
    let promotion = match uci.as_bytes().get(4) {
        None => None,
        Some(b'q') => Some(PieceKind::Queen),
        Some(b'r') => Some(PieceKind::Rook),
        Some(b'b') => Some(PieceKind::Bishop),
        Some(b'n') => Some(PieceKind::Knight),
        Some(other) => panic!("bad promotion {}", *other as char),
    };
    Move::new(sq(&uci[0..2]), sq(&uci[2..4]), promotion)
}

/// Action index for a UCI move (promotion ignored).
pub fn idx(uci: &str) -> i64 {
    let m = mv(uci);
    m.from.index() as i64 * 64 + m.to.index() as i64
}

pub fn board(fen: &str) -> ShakmatyBoard {
    ShakmatyBoard::from_fen(fen).unwrap()
}

/// White to move, Ra1-a8 is a back-rank mate.
pub const WHITE_MATES_IN_ONE: &str = "6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1";
pub const WHITE_MATING_MOVE: &str = "a1a8";

/// Black to move, Ra8-a1 is a back-rank mate.
pub const BLACK_MATES_IN_ONE: &str = "r5k1/8/8/8/8/8/5PPP/6K1 b - - 0 1";
pub const BLACK_MATING_MOVE: &str = "a8a1";

/// Deterministic opponent: always the first legal move, fixed think time.
#[derive(Clone, Debug)]
pub struct FirstMoveOpponent {
    pub think: f64,
}

impl OpponentPolicy for FirstMoveOpponent {
    fn select_move<E: RulesEngine, R: Rng + ?Sized>(&self, board: &E, _rng: &mut R) -> Option<Move> {
        board.legal_moves().into_iter().next()
    }

    fn think_time<R: Rng + ?Sized>(&self, _rng: &mut R) -> f64 {
        self.think
    }
}

/// Broken opponent: always answers a1-h8, which is never legal for Black
/// from the positions it is used in.
#[derive(Clone, Debug)]
pub struct IllegalReplyOpponent;

impl OpponentPolicy for IllegalReplyOpponent {
    fn select_move<E: RulesEngine, R: Rng + ?Sized>(&self, _board: &E, _rng: &mut R) -> Option<Move> {
        Some(mv("a1h8"))
    }

    fn think_time<R: Rng + ?Sized>(&self, _rng: &mut R) -> f64 {
        0.1
    }
}
