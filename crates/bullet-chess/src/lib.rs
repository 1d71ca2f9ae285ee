pub mod action;
pub mod clock;
pub mod config;
pub mod encoder;
pub mod engine;
pub mod env;
pub mod error;
pub mod opponent;
pub mod rollout;
pub mod rules;
pub mod types;
pub mod wrappers;

#[cfg(feature = "python")]
pub mod bindings;

#[cfg(test)]
pub(crate) mod test_util;

pub use action::{decode, encode, resolve_move, Action, ACTION_SPACE_SIZE};
pub use clock::Clock;
pub use config::{EpisodeConfig, ResetOptions};
pub use encoder::{encode_board, encode_state, render_ansi, Observation, OBS_DIM, STATE_DIM};
pub use engine::ShakmatyBoard;
pub use env::{BulletChessEnv, Environment, EpisodeState, StepInfo, StepOutcome};
pub use error::EnvError;
pub use opponent::{OpponentPolicy, RandomOpponent};
pub use rollout::{play_episode, EpisodeRecord, EpisodeStats};
pub use rules::{RulesEngine, RulesError};
pub use types::{CastlingSide, Color, GameResult, Move, PieceKind, Square};
pub use wrappers::{RealTimeClock, StepLimit};
