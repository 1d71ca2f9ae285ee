//! Board + clock → fixed-shape observation.
//!
//! Layout (all `f32`):
//! ```text
//! board [8][8][12]  indexed [rank][file][layer], 1.0 where a piece sits
//!                   layer = color_offset (White 0, Black 6) + kind ordinal
//! state [8]         0 turn (1.0 White to move)
//!                   1-4 castling: White K, White Q, Black K, Black Q
//!                   5 en-passant target exists
//!                   6-7 remaining time / allotment, White then Black, ≥ 0
//! ```

use crate::clock::Clock;
use crate::rules::RulesEngine;
use crate::types::{CastlingSide, Color, PieceKind, Square};

pub const BOARD_SHAPE: [usize; 3] = [8, 8, 12];
pub const BOARD_DIM: usize = 8 * 8 * 12;
pub const STATE_DIM: usize = 8;
/// Flat length: board (C-order) followed by state.
pub const OBS_DIM: usize = BOARD_DIM + STATE_DIM;

pub type BoardTensor = [[[f32; 12]; 8]; 8];

#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    pub board: BoardTensor,
    pub state: [f32; STATE_DIM],
}

impl Observation {
    /// Write board (C-order) then state into `buf[offset..offset + OBS_DIM]`.
    pub fn encode_into(&self, buf: &mut [f32], offset: usize) {
        let out = &mut buf[offset..offset + OBS_DIM];
        let mut i = 0;
        for rank in &self.board {
            for file in rank {
                out[i..i + 12].copy_from_slice(file);
                i += 12;
            }
        }
        out[BOARD_DIM..].copy_from_slice(&self.state);
    }

    pub fn to_flat(&self) -> Vec<f32> {
        let mut buf = vec![0.0; OBS_DIM];
        self.encode_into(&mut buf, 0);
        buf
    }

    /// Board tensor flattened in C-order (rank, file, layer).
    pub fn board_flat(&self) -> Vec<f32> {
        self.board.iter().flatten().flatten().copied().collect()
    }
}

#[inline]
fn layer(color: Color, kind: PieceKind) -> usize {
    let offset = match color {
        Color::White => 0,
        Color::Black => 6,
    };
    offset + kind.ordinal()
}

#[inline]
fn flag(b: bool) -> f32 {
    if b {
        1.0
    } else {
        0.0
    }
}

pub fn encode_board<E: RulesEngine>(board: &E) -> BoardTensor {
    let mut tensor = [[[0.0f32; 12]; 8]; 8];
    for square in Square::all() {
        if let Some((color, kind)) = board.piece_at(square) {
            tensor[square.rank() as usize][square.file() as usize][layer(color, kind)] = 1.0;
        }
    }
    tensor
}

pub fn encode_state<E: RulesEngine>(board: &E, clock: &Clock) -> [f32; STATE_DIM] {
    [
        flag(board.side_to_move() == Color::White),
        flag(board.castling_rights(Color::White, CastlingSide::KingSide)),
        flag(board.castling_rights(Color::White, CastlingSide::QueenSide)),
        flag(board.castling_rights(Color::Black, CastlingSide::KingSide)),
        flag(board.castling_rights(Color::Black, CastlingSide::QueenSide)),
        flag(board.en_passant_target().is_some()),
        clock.normalized(Color::White) as f32,
        clock.normalized(Color::Black) as f32,
    ]
}

pub fn encode<E: RulesEngine>(board: &E, clock: &Clock) -> Observation {
    Observation {
        board: encode_board(board),
        state: encode_state(board, clock),
    }
}

/// Eight text lines, rank 8 first; `.` for empty, upper case White.
pub fn render_ansi<E: RulesEngine>(board: &E) -> String {
    let mut lines = Vec::with_capacity(8);
    for rank in (0..8u8).rev() {
        let row: Vec<String> = (0..8u8)
            .filter_map(|file| Square::from_coords(rank, file))
            .map(|square| match board.piece_at(square) {
                Some((Color::White, kind)) => kind.letter().to_string(),
                Some((Color::Black, kind)) => kind.letter().to_ascii_lowercase().to_string(),
                None => ".".to_string(),
            })
            .collect();
        lines.push(row.join(" "));
    }
    lines.join("\n")
}
