use std::collections::BTreeMap;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{debug, trace};

use crate::action::{encode_move, resolve_move, Action};
use crate::clock::Clock;
use crate::config::{EpisodeConfig, ResetOptions};
use crate::encoder::{encode, render_ansi, Observation};
use crate::engine::ShakmatyBoard;
use crate::error::EnvError;
use crate::opponent::{OpponentPolicy, RandomOpponent};
use crate::rules::{RulesEngine, RulesError};
use crate::types::{Color, GameResult};

/// Reward for submitting a move outside the legal set.
pub const ILLEGAL_MOVE_PENALTY: f64 = -10.0;

// ---------------------------------------------------------------------------
// Step results
// ---------------------------------------------------------------------------

/// Why a step ended the way it did. Exactly one diagnostic per outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepInfo {
    Ongoing,
    /// The mover's own clock ran out.
    Timeout,
    /// The simulated opponent's clock ran out after its reply.
    OpponentTimeout,
    IllegalMove,
    GameOver(GameResult),
}

impl StepInfo {
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            StepInfo::Timeout => Some("timeout"),
            StepInfo::OpponentTimeout => Some("opponent_timeout"),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&'static str> {
        match self {
            StepInfo::IllegalMove => Some("illegal_move"),
            _ => None,
        }
    }

    pub fn result(&self) -> Option<GameResult> {
        match self {
            StepInfo::GameOver(result) => Some(*result),
            _ => None,
        }
    }

    /// Short label for logs: the reason, error or result code.
    pub fn label(&self) -> &'static str {
        match self {
            StepInfo::Ongoing => "ongoing",
            StepInfo::GameOver(result) => result.code(),
            _ => self.reason().or(self.error()).unwrap_or("ongoing"),
        }
    }

    /// The gym-style info mapping: at most one of `reason`, `error`, `result`.
    pub fn to_map(&self) -> BTreeMap<&'static str, &'static str> {
        let mut map = BTreeMap::new();
        if let Some(reason) = self.reason() {
            map.insert("reason", reason);
        }
        if let Some(error) = self.error() {
            map.insert("error", error);
        }
        if let Some(result) = self.result() {
            map.insert("result", result.code());
        }
        map
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    pub observation: Observation,
    pub reward: f64,
    pub terminated: bool,
    /// Always false from the state machine itself; see `StepLimit`.
    pub truncated: bool,
    pub info: StepInfo,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EpisodeState {
    InProgress,
    Terminated,
}

// ---------------------------------------------------------------------------
// Environment trait
// ---------------------------------------------------------------------------

/// Gym-style episode interface shared by the state machine and its wrappers.
pub trait Environment {
    fn reset(&mut self, options: ResetOptions) -> Observation;

    fn step(&mut self, action: Action) -> Result<StepOutcome, EnvError>;

    /// Sorted action indices that decode to a legal move.
    fn legal_actions(&self) -> Vec<usize>;

    fn clock(&self) -> &Clock;
}

// ---------------------------------------------------------------------------
// BulletChessEnv
// ---------------------------------------------------------------------------

/// Bullet chess episode state machine.
///
/// The agent plays White against `P` (or both colors in self-play) under a
/// per-side clock charged with caller-measured elapsed time. Board state lives
/// in `E` and only changes through `RulesEngine::apply`.
#[derive(Clone, Debug)]
pub struct BulletChessEnv<E = ShakmatyBoard, P = RandomOpponent> {
    board: E,
    clock: Clock,
    config: EpisodeConfig,
    opponent: P,
    rng: SmallRng,
    state: EpisodeState,
}

impl BulletChessEnv<ShakmatyBoard, RandomOpponent> {
    /// Environment with the shakmaty rules engine and a random opponent.
    pub fn new(config: EpisodeConfig) -> Result<Self, EnvError> {
        Self::with_opponent(config, RandomOpponent::default())
    }
}

impl<E: RulesEngine, P: OpponentPolicy> BulletChessEnv<E, P> {
    /// Build an environment, ready to step from the initial position.
    ///
    /// The RNG is seeded from OS entropy; pass a seed to `reset` for replays.
    pub fn with_opponent(config: EpisodeConfig, opponent: P) -> Result<Self, EnvError> {
        config.validate()?;
        Ok(Self {
            board: E::initial_position(),
            clock: Clock::new(config.initial_allotment),
            config,
            opponent,
            rng: SmallRng::from_entropy(),
            state: EpisodeState::InProgress,
        })
    }

    pub fn reset(&mut self, options: ResetOptions) -> Observation {
        self.reset_with_board(E::initial_position(), options)
    }

    /// Reset onto an arbitrary position instead of the starting one.
    pub fn reset_with_board(&mut self, board: E, options: ResetOptions) -> Observation {
        if let Some(seed) = options.seed {
            self.rng = SmallRng::seed_from_u64(seed);
        }
        if let Some(self_play) = options.self_play {
            self.config.self_play = self_play;
        }
        self.board = board;
        self.clock.reset_to(self.config.initial_allotment);
        self.state = EpisodeState::InProgress;
        self.observation()
    }

    /// Advance one agent move (plus the opponent's reply outside self-play).
    ///
    /// Protocol violations return `Err` without touching any state. Bad games
    /// (illegal move, flag fall) are terminal outcomes, not errors. An
    /// opponent reply the engine rejects is returned as `EnvError::Rules` and
    /// terminates the episode.
    pub fn step(&mut self, action: impl Into<Action>) -> Result<StepOutcome, EnvError> {
        if self.state == EpisodeState::Terminated {
            return Err(EnvError::EpisodeTerminated);
        }
        let (index, elapsed) = action.into().validate()?;

        let mover = self.board.side_to_move();
        self.clock.charge(mover, elapsed);
        if self.clock.is_expired(mover) {
            let reward = match mover {
                Color::White => -1.0,
                Color::Black if self.config.self_play => -1.0,
                Color::Black => 1.0,
            };
            return Ok(self.terminate(reward, StepInfo::Timeout));
        }

        let mv = resolve_move(index, &self.board);
        match self.board.apply(mv) {
            Ok(()) => {}
            Err(RulesError::IllegalMove(_)) => {
                return Ok(self.terminate(ILLEGAL_MOVE_PENALTY, StepInfo::IllegalMove));
            }
            Err(e) => return Err(e.into()),
        }
        if self.board.is_game_over() {
            return Ok(self.resolve_game_over());
        }

        if !self.config.self_play && mover == Color::White {
            let Some(reply) = self.opponent.select_move(&self.board, &mut self.rng) else {
                // Unreachable with a conforming engine: no moves implies game over.
                return Ok(self.resolve_game_over());
            };
            if let Err(e) = self.board.apply(reply) {
                // White's move already stands; the episode cannot continue.
                self.state = EpisodeState::Terminated;
                debug!(reply = %reply, "opponent played an illegal move");
                return Err(e.into());
            }
            let think = self.opponent.think_time(&mut self.rng);
            self.clock.charge(Color::Black, think);
            trace!(reply = %reply, think, black_remaining = self.clock.remaining(Color::Black), "opponent move");

            if self.clock.is_expired(Color::Black) {
                return Ok(self.terminate(1.0, StepInfo::OpponentTimeout));
            }
            if self.board.is_game_over() {
                return Ok(self.resolve_game_over());
            }
        }

        Ok(self.outcome(0.0, false, StepInfo::Ongoing))
    }

    /// White-perspective result, flipped in self-play when Black made the
    /// final move (White is to move again).
    fn resolve_game_over(&mut self) -> StepOutcome {
        let result = self.board.result().unwrap_or(GameResult::Draw);
        let base = result.white_reward();
        let flip = self.config.self_play && self.board.side_to_move() == Color::White;
        let reward = if flip && base != 0.0 { -base } else { base };
        self.terminate(reward, StepInfo::GameOver(result))
    }

    fn terminate(&mut self, reward: f64, info: StepInfo) -> StepOutcome {
        self.state = EpisodeState::Terminated;
        debug!(
            reason = info.label(),
            reward,
            color = ?self.board.side_to_move(),
            white_remaining = self.clock.remaining(Color::White),
            black_remaining = self.clock.remaining(Color::Black),
            "episode terminated"
        );
        self.outcome(reward, true, info)
    }

    fn outcome(&self, reward: f64, terminated: bool, info: StepInfo) -> StepOutcome {
        StepOutcome {
            observation: self.observation(),
            reward,
            terminated,
            truncated: false,
            info,
        }
    }

    pub fn observation(&self) -> Observation {
        encode(&self.board, &self.clock)
    }

    pub fn legal_actions(&self) -> Vec<usize> {
        let mut actions: Vec<usize> = self
            .board
            .legal_moves()
            .iter()
            .map(|mv| encode_move(mv) as usize)
            .collect();
        actions.sort_unstable();
        actions.dedup();
        actions
    }

    pub fn render(&self) -> String {
        render_ansi(&self.board)
    }

    pub fn board(&self) -> &E {
        &self.board
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub fn config(&self) -> &EpisodeConfig {
        &self.config
    }

    pub fn state(&self) -> EpisodeState {
        self.state
    }

    pub fn opponent(&self) -> &P {
        &self.opponent
    }
}

impl<E: RulesEngine, P: OpponentPolicy> Environment for BulletChessEnv<E, P> {
    fn reset(&mut self, options: ResetOptions) -> Observation {
        BulletChessEnv::reset(self, options)
    }

    fn step(&mut self, action: Action) -> Result<StepOutcome, EnvError> {
        BulletChessEnv::step(self, action)
    }

    fn legal_actions(&self) -> Vec<usize> {
        BulletChessEnv::legal_actions(self)
    }

    fn clock(&self) -> &Clock {
        BulletChessEnv::clock(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{
        board, idx, FirstMoveOpponent, IllegalReplyOpponent, BLACK_MATES_IN_ONE, BLACK_MATING_MOVE,
        WHITE_MATES_IN_ONE, WHITE_MATING_MOVE,
    };

    const E2E4: i64 = 796;

    fn env() -> BulletChessEnv {
        let mut env = BulletChessEnv::new(EpisodeConfig::default()).unwrap();
        env.reset(ResetOptions::seeded(0));
        env
    }

    fn self_play_env() -> BulletChessEnv {
        BulletChessEnv::new(EpisodeConfig::default().with_self_play(true)).unwrap()
    }

    #[test]
    fn fresh_env_is_in_progress() {
        let env = BulletChessEnv::new(EpisodeConfig::default()).unwrap();
        assert_eq!(env.state(), EpisodeState::InProgress);
        assert_eq!(env.observation().state, [1.0, 1.0, 1.0, 1.0, 1.0, 0.0, 1.0, 1.0]);
        assert_eq!(env.legal_actions().len(), 20);
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = EpisodeConfig::default().with_initial_allotment(0.0);
        assert!(matches!(BulletChessEnv::new(cfg), Err(EnvError::InvalidConfig(_))));
    }

    #[test]
    fn opening_move_charges_only_black_think_time() {
        let mut env = env();
        let out = env.step(E2E4).unwrap();
        assert_eq!(out.reward, 0.0);
        assert!(!out.terminated);
        assert!(!out.truncated);
        assert_eq!(out.info, StepInfo::Ongoing);
        assert!(out.info.to_map().is_empty());
        assert_eq!(out.observation.state[6], 1.0);
        assert!(out.observation.state[7] < 1.0);
        let black = env.clock().remaining(Color::Black);
        assert!((59.5..=59.9).contains(&black), "black remaining {black}");
        // Black replied: White to move again.
        assert_eq!(out.observation.state[0], 1.0);
        assert_eq!(env.board().side_to_move(), Color::White);
    }

    #[test]
    fn illegal_move_ends_episode_without_touching_board() {
        let mut env = env();
        let before = env.observation();
        let out = env.step(idx("e2e5")).unwrap();
        assert_eq!(out.reward, ILLEGAL_MOVE_PENALTY);
        assert!(out.terminated);
        assert!(!out.truncated);
        assert_eq!(out.info.to_map().get("error"), Some(&"illegal_move"));
        assert_eq!(out.info.to_map().len(), 1);
        assert_eq!(out.observation.board, before.board);
        assert_eq!(env.state(), EpisodeState::Terminated);
    }

    #[test]
    fn moving_opponent_piece_is_illegal() {
        let mut env = env();
        let out = env.step(idx("e7e5")).unwrap();
        assert_eq!(out.info, StepInfo::IllegalMove);
    }

    #[test]
    fn white_timeout_applies_no_move() {
        let mut env = env();
        let before = env.observation();
        let out = env.step((E2E4, 61.0)).unwrap();
        assert_eq!(out.reward, -1.0);
        assert!(out.terminated);
        assert_eq!(out.info.reason(), Some("timeout"));
        assert_eq!(out.observation.board, before.board);
        assert_eq!(out.observation.state[6], 0.0);
        assert_eq!(env.clock().remaining(Color::White), -1.0);
    }

    #[test]
    fn timeout_checked_before_legality() {
        let mut env = env();
        let out = env.step((idx("e2e5"), 60.0)).unwrap();
        assert_eq!(out.info, StepInfo::Timeout);
        assert_eq!(out.reward, -1.0);
    }

    #[test]
    fn opponent_timeout_rewards_white() {
        let cfg = EpisodeConfig::default().with_initial_allotment(0.05);
        let mut env = BulletChessEnv::new(cfg).unwrap();
        env.reset(ResetOptions::seeded(1));
        let out = env.step(E2E4).unwrap();
        assert_eq!(out.reward, 1.0);
        assert!(out.terminated);
        assert_eq!(out.info.to_map().get("reason"), Some(&"opponent_timeout"));
        assert_eq!(out.observation.state[7], 0.0);
        assert_eq!(out.observation.state[6], 1.0);
    }

    #[test]
    fn scripted_opponent_is_pluggable() {
        let mut env: BulletChessEnv<ShakmatyBoard, FirstMoveOpponent> =
            BulletChessEnv::with_opponent(EpisodeConfig::default(), FirstMoveOpponent { think: 2.0 })
                .unwrap();
        env.step(E2E4).unwrap();
        assert_eq!(env.clock().remaining(Color::Black), 58.0);
        assert_eq!(env.board().side_to_move(), Color::White);
    }

    #[test]
    fn illegal_opponent_reply_ends_episode() {
        let mut env: BulletChessEnv<ShakmatyBoard, IllegalReplyOpponent> =
            BulletChessEnv::with_opponent(EpisodeConfig::default(), IllegalReplyOpponent).unwrap();
        let err = env.step(E2E4).unwrap_err();
        assert!(matches!(err, EnvError::Rules(RulesError::IllegalMove(_))));
        assert_eq!(env.state(), EpisodeState::Terminated);

        // The agent must not be handed Black's move.
        assert_eq!(env.step((idx("e7e5"), 1.0)), Err(EnvError::EpisodeTerminated));
        assert_eq!(env.clock().remaining(Color::Black), 60.0);

        env.reset(ResetOptions::default());
        assert_eq!(env.state(), EpisodeState::InProgress);
        assert_eq!(env.board().side_to_move(), Color::White);
    }

    #[test]
    fn labels_cover_every_outcome() {
        assert_eq!(StepInfo::Ongoing.label(), "ongoing");
        assert_eq!(StepInfo::Timeout.label(), "timeout");
        assert_eq!(StepInfo::OpponentTimeout.label(), "opponent_timeout");
        assert_eq!(StepInfo::IllegalMove.label(), "illegal_move");
        assert_eq!(StepInfo::GameOver(GameResult::Draw).label(), "1/2-1/2");
    }

    #[test]
    fn white_mate_without_self_play_skips_opponent() {
        let mut env = env();
        env.reset_with_board(board(WHITE_MATES_IN_ONE), ResetOptions::default());
        let out = env.step(idx(WHITE_MATING_MOVE)).unwrap();
        assert_eq!(out.reward, 1.0);
        assert!(out.terminated);
        assert_eq!(out.info.result(), Some(GameResult::WhiteWin));
        assert_eq!(out.info.to_map().get("result"), Some(&"1-0"));
        // No opponent think time charged.
        assert_eq!(env.clock().remaining(Color::Black), 60.0);
    }

    #[test]
    fn self_play_white_mate_keeps_sign() {
        let mut env = self_play_env();
        env.reset_with_board(board(WHITE_MATES_IN_ONE), ResetOptions::default());
        let out = env.step(idx(WHITE_MATING_MOVE)).unwrap();
        assert_eq!(env.board().side_to_move(), Color::Black);
        assert_eq!(out.info.result(), Some(GameResult::WhiteWin));
        assert_eq!(out.reward, 1.0);
    }

    #[test]
    fn self_play_black_mate_flips_sign() {
        let mut env = self_play_env();
        env.reset_with_board(board(BLACK_MATES_IN_ONE), ResetOptions::default());
        let out = env.step(idx(BLACK_MATING_MOVE)).unwrap();
        assert_eq!(env.board().side_to_move(), Color::White);
        assert_eq!(out.info.result(), Some(GameResult::BlackWin));
        assert_eq!(out.reward, 1.0);
    }

    #[test]
    fn self_play_fools_mate_from_start() {
        let mut env = self_play_env();
        env.reset(ResetOptions::default());
        for m in ["f2f3", "e7e5", "g2g4"] {
            let out = env.step(idx(m)).unwrap();
            assert!(!out.terminated);
            assert_eq!(out.reward, 0.0);
        }
        let out = env.step(idx("d8h4")).unwrap();
        assert!(out.terminated);
        assert_eq!(out.reward, 1.0);
        assert_eq!(out.info.to_map().get("result"), Some(&"0-1"));
    }

    #[test]
    fn self_play_black_timeout_is_negative() {
        let mut env = self_play_env();
        env.step(E2E4).unwrap();
        let out = env.step((idx("e7e5"), 61.0)).unwrap();
        assert_eq!(out.reward, -1.0);
        assert_eq!(out.info, StepInfo::Timeout);
        assert_eq!(out.observation.state[7], 0.0);
        assert_eq!(out.observation.state[6], 1.0);
    }

    #[test]
    fn black_agent_timeout_without_self_play_rewards_white() {
        let mut env = env();
        env.reset_with_board(board(BLACK_MATES_IN_ONE), ResetOptions::default());
        let out = env.step((idx(BLACK_MATING_MOVE), 100.0)).unwrap();
        assert_eq!(out.reward, 1.0);
        assert_eq!(out.info, StepInfo::Timeout);
    }

    #[test]
    fn stalemate_draw_is_zero_in_self_play() {
        // White Qg6 stalemates: Black king h8 with no moves, not in check.
        let mut env = self_play_env();
        env.reset_with_board(board("7k/5Q2/8/6K1/8/8/8/8 w - - 0 1"), ResetOptions::default());
        let out = env.step(idx("g5g6")).unwrap();
        assert_eq!(out.info.result(), Some(GameResult::Draw));
        assert_eq!(out.reward, 0.0);
        assert!(out.reward.is_sign_positive());
    }

    #[test]
    fn step_after_termination_is_an_error() {
        let mut env = env();
        env.step(idx("a1a1")).unwrap();
        assert_eq!(env.step(E2E4), Err(EnvError::EpisodeTerminated));
        env.reset(ResetOptions::default());
        assert!(env.step(E2E4).is_ok());
    }

    #[test]
    fn out_of_domain_index_is_rejected_without_side_effects() {
        let mut env = env();
        for bad in [-1i64, 4096, i64::MAX] {
            assert_eq!(env.step((bad, 30.0)), Err(EnvError::InvalidAction(bad)));
        }
        assert_eq!(env.clock().remaining(Color::White), 60.0);
        assert_eq!(env.state(), EpisodeState::InProgress);
    }

    #[test]
    fn bad_elapsed_charges_nothing() {
        let mut env = self_play_env();
        env.step((E2E4, f64::NAN)).unwrap();
        env.step((idx("e7e5"), -5.0)).unwrap();
        assert_eq!(env.clock().remaining(Color::White), 60.0);
        assert_eq!(env.clock().remaining(Color::Black), 60.0);
    }

    #[test]
    fn seeded_reset_replays_bit_identically() {
        let script: [(i64, f64); 4] = [
            (E2E4, 0.5),
            (idx("d2d4"), 1.25),
            (idx("g1f3"), 0.0),
            (idx("f1c4"), 2.0),
        ];
        let run = || {
            let mut env = BulletChessEnv::new(EpisodeConfig::default()).unwrap();
            let mut trace = vec![(env.reset(ResetOptions::seeded(42)), 0.0, StepInfo::Ongoing)];
            for &action in &script {
                match env.step(action) {
                    Ok(out) => trace.push((out.observation, out.reward, out.info)),
                    Err(e) => {
                        assert_eq!(e, EnvError::EpisodeTerminated);
                        break;
                    }
                }
            }
            (trace, env.clock().clone())
        };
        let (a, clock_a) = run();
        let (b, clock_b) = run();
        assert_eq!(a, b);
        assert_eq!(
            clock_a.remaining(Color::Black).to_bits(),
            clock_b.remaining(Color::Black).to_bits()
        );
    }

    #[test]
    fn reset_without_seed_keeps_stream() {
        let mut a = BulletChessEnv::new(EpisodeConfig::default()).unwrap();
        let mut b = a.clone();
        a.reset(ResetOptions::seeded(9));
        b.reset(ResetOptions::seeded(9));
        a.step(E2E4).unwrap();
        b.step(E2E4).unwrap();
        a.reset(ResetOptions::default());
        b.reset(ResetOptions::default());
        assert_eq!(a.step(E2E4).unwrap(), b.step(E2E4).unwrap());
    }

    #[test]
    fn reset_toggles_self_play_and_restores_clocks() {
        let mut env = env();
        env.step((E2E4, 5.0)).unwrap();
        let obs = env.reset(ResetOptions::default().with_self_play(true));
        assert!(env.config().self_play);
        assert_eq!(&obs.state[6..], &[1.0, 1.0]);
        env.step(E2E4).unwrap();
        // No opponent reply in self-play.
        assert_eq!(env.board().side_to_move(), Color::Black);
        assert_eq!(env.clock().remaining(Color::Black), 60.0);

        env.reset(ResetOptions::default().with_self_play(false));
        assert!(!env.config().self_play);
    }

    #[test]
    fn opponent_reply_always_present_while_game_runs() {
        // Every non-terminal step outside self-play hands the turn back to White.
        let mut env = env();
        for seed in 0..20 {
            env.reset(ResetOptions::seeded(seed));
            loop {
                let actions = env.legal_actions();
                let action = actions[seed as usize % actions.len()];
                let out = env.step(action).unwrap();
                if out.terminated {
                    assert_ne!(out.info, StepInfo::IllegalMove);
                    break;
                }
                assert_eq!(env.board().side_to_move(), Color::White);
            }
        }
    }

    #[test]
    fn legal_actions_fold_promotions() {
        let mut env = self_play_env();
        env.reset_with_board(board("8/4P3/8/8/8/8/k7/4K3 w - - 0 1"), ResetOptions::default());
        let actions = env.legal_actions();
        let e7e8 = idx("e7e8") as usize;
        assert_eq!(actions.iter().filter(|&&a| a == e7e8).count(), 1);
        assert!(actions.windows(2).all(|w| w[0] < w[1]));
        let out = env.step(e7e8).unwrap();
        assert!(!out.terminated);
        assert!(env.render().lines().next().unwrap().contains('Q'));
    }

    #[test]
    fn every_legal_action_steps_cleanly() {
        let base = env();
        for action in base.legal_actions() {
            let mut env = base.clone();
            let out = env.step(action).unwrap();
            assert_ne!(out.info, StepInfo::IllegalMove, "action {action}");
        }
    }
}
