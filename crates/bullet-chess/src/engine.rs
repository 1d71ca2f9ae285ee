//! `RulesEngine` backed by the `shakmaty` crate.
//!
//! Adds the two automatic draws shakmaty leaves to the caller (seventy-five
//! move rule, fivefold repetition) so that "game over" covers every ending
//! that does not need a claim.

use shakmaty::fen::Fen;
use shakmaty::{
    Bitboard, Board, CastlingMode, CastlingSide as SCastlingSide, Chess, Color as SColor,
    EnPassantMode, Outcome, Position, Role,
};

use crate::rules::{RulesEngine, RulesError};
use crate::types::{CastlingSide, Color, GameResult, Move, PieceKind, Square};

/// Half-moves without capture or pawn move that end the game.
const SEVENTY_FIVE_MOVE_PLIES: u32 = 150;

/// Occurrences of one position that end the game.
const FIVEFOLD: usize = 5;

/// Everything that makes two positions "the same" for repetition purposes.
#[derive(Clone, Debug, PartialEq, Eq)]
struct RepetitionKey {
    board: Board,
    turn: SColor,
    castling: Bitboard,
    ep: Option<shakmaty::Square>,
}

impl RepetitionKey {
    fn of(pos: &Chess) -> Self {
        Self {
            board: pos.board().clone(),
            turn: pos.turn(),
            castling: pos.castles().castling_rights(),
            ep: pos.ep_square(EnPassantMode::Legal),
        }
    }
}

/// Standard chess position plus the history needed for repetition draws.
#[derive(Clone, Debug)]
pub struct ShakmatyBoard {
    pos: Chess,
    history: Vec<RepetitionKey>,
}

impl ShakmatyBoard {
    /// Build a board from a FEN string (standard castling).
    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let parsed: Fen = fen
            .parse()
            .map_err(|e| RulesError::InvalidFen(format!("{fen}: {e}")))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| RulesError::InvalidFen(format!("{fen}: {e}")))?;
        let history = vec![RepetitionKey::of(&pos)];
        Ok(Self { pos, history })
    }

    pub fn position(&self) -> &Chess {
        &self.pos
    }

    fn repetitions(&self) -> usize {
        match self.history.last() {
            Some(current) => self.history.iter().filter(|k| *k == current).count(),
            None => 0,
        }
    }

    fn is_automatic_draw(&self) -> bool {
        self.pos.halfmoves() >= SEVENTY_FIVE_MOVE_PLIES || self.repetitions() >= FIVEFOLD
    }

    /// Legal shakmaty moves paired with their environment form.
    fn legal_pairs(&self) -> impl Iterator<Item = (shakmaty::Move, Move)> {
        self.pos
            .legal_moves()
            .into_iter()
            .filter_map(|m| to_env_move(&m).map(|mv| (m, mv)))
    }
}

impl RulesEngine for ShakmatyBoard {
    fn initial_position() -> Self {
        let pos = Chess::default();
        let history = vec![RepetitionKey::of(&pos)];
        Self { pos, history }
    }

    fn legal_moves(&self) -> Vec<Move> {
        self.legal_pairs().map(|(_, mv)| mv).collect()
    }

    fn apply(&mut self, mv: Move) -> Result<(), RulesError> {
        let (m, _) = self
            .legal_pairs()
            .find(|(_, candidate)| *candidate == mv)
            .ok_or(RulesError::IllegalMove(mv))?;
        self.pos.play_unchecked(&m);
        self.history.push(RepetitionKey::of(&self.pos));
        Ok(())
    }

    fn is_game_over(&self) -> bool {
        self.pos.is_game_over() || self.is_automatic_draw()
    }

    fn result(&self) -> Option<GameResult> {
        match self.pos.outcome() {
            Some(Outcome::Decisive { winner: SColor::White }) => Some(GameResult::WhiteWin),
            Some(Outcome::Decisive { winner: SColor::Black }) => Some(GameResult::BlackWin),
            Some(Outcome::Draw) => Some(GameResult::Draw),
            None if self.is_automatic_draw() => Some(GameResult::Draw),
            None => None,
        }
    }

    fn castling_rights(&self, color: Color, side: CastlingSide) -> bool {
        let side = match side {
            CastlingSide::KingSide => SCastlingSide::KingSide,
            CastlingSide::QueenSide => SCastlingSide::QueenSide,
        };
        self.pos.castles().has(to_shakmaty_color(color), side)
    }

    fn en_passant_target(&self) -> Option<Square> {
        // Always: report the square after every double push, capturable or not.
        self.pos
            .ep_square(EnPassantMode::Always)
            .and_then(from_shakmaty_square)
    }

    fn piece_at(&self, square: Square) -> Option<(Color, PieceKind)> {
        let sq = shakmaty::Square::new(u32::from(square.index()));
        self.pos
            .board()
            .piece_at(sq)
            .map(|p| (from_shakmaty_color(p.color), from_role(p.role)))
    }

    fn side_to_move(&self) -> Color {
        from_shakmaty_color(self.pos.turn())
    }
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

fn from_shakmaty_square(sq: shakmaty::Square) -> Option<Square> {
    Square::new(sq as u8)
}

fn from_shakmaty_color(color: SColor) -> Color {
    match color {
        SColor::White => Color::White,
        SColor::Black => Color::Black,
    }
}

fn to_shakmaty_color(color: Color) -> SColor {
    match color {
        Color::White => SColor::White,
        Color::Black => SColor::Black,
    }
}

fn from_role(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

/// shakmaty encodes castling as king-takes-rook; rewrite it to the king's
/// destination square so it matches the from/to action layout.
fn to_env_move(m: &shakmaty::Move) -> Option<Move> {
    match m {
        shakmaty::Move::Normal { from, to, promotion, .. } => Some(Move::new(
            from_shakmaty_square(*from)?,
            from_shakmaty_square(*to)?,
            promotion.map(from_role),
        )),
        shakmaty::Move::EnPassant { from, to } => Some(Move::new(
            from_shakmaty_square(*from)?,
            from_shakmaty_square(*to)?,
            None,
        )),
        shakmaty::Move::Castle { king, rook } => {
            let king = from_shakmaty_square(*king)?;
            let rook = from_shakmaty_square(*rook)?;
            let file = if rook.file() > king.file() { 6 } else { 2 };
            Some(Move::new(king, Square::from_coords(king.rank(), file)?, None))
        }
        shakmaty::Move::Put { .. } => None,
    }
}
