//! Sequential episode driver and aggregate statistics.

use rand::Rng;
use tracing::info;

use crate::action::Action;
use crate::config::ResetOptions;
use crate::encoder::Observation;
use crate::env::{Environment, StepInfo};
use crate::error::EnvError;
use crate::types::{Color, GameResult};

// ---------------------------------------------------------------------------
// Data structures
// ---------------------------------------------------------------------------

/// Summary of one finished (or truncated) episode.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeRecord {
    pub steps: u32,
    pub total_reward: f64,
    pub terminated: bool,
    pub truncated: bool,
    pub final_info: StepInfo,
    pub white_remaining: f64,
    pub black_remaining: f64,
}

/// Aggregate stats over a set of episodes.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeStats {
    pub total_episodes: u32,
    pub total_steps: u64,
    pub total_reward: f64,
    pub white_wins: u32,
    pub black_wins: u32,
    pub draws: u32,
    pub illegal_moves: u32,
    pub timeouts: u32,
    pub opponent_timeouts: u32,
    pub truncations: u32,
    pub min_steps: u32,
    pub max_steps: u32,
}

impl EpisodeStats {
    /// Create empty stats for incremental accumulation.
    pub fn new() -> Self {
        Self {
            total_episodes: 0,
            total_steps: 0,
            total_reward: 0.0,
            white_wins: 0,
            black_wins: 0,
            draws: 0,
            illegal_moves: 0,
            timeouts: 0,
            opponent_timeouts: 0,
            truncations: 0,
            min_steps: u32::MAX,
            max_steps: 0,
        }
    }

    pub fn add_episode(&mut self, episode: &EpisodeRecord) {
        self.total_episodes += 1;
        self.total_steps += episode.steps as u64;
        self.total_reward += episode.total_reward;
        self.min_steps = self.min_steps.min(episode.steps);
        self.max_steps = self.max_steps.max(episode.steps);

        if episode.truncated {
            self.truncations += 1;
        }
        match episode.final_info {
            StepInfo::GameOver(GameResult::WhiteWin) => self.white_wins += 1,
            StepInfo::GameOver(GameResult::BlackWin) => self.black_wins += 1,
            StepInfo::GameOver(GameResult::Draw) => self.draws += 1,
            StepInfo::IllegalMove => self.illegal_moves += 1,
            StepInfo::Timeout => self.timeouts += 1,
            StepInfo::OpponentTimeout => self.opponent_timeouts += 1,
            StepInfo::Ongoing => {}
        }
    }

    pub fn from_episodes(episodes: &[EpisodeRecord]) -> Self {
        let mut stats = Self::new();
        for e in episodes {
            stats.add_episode(e);
        }
        if episodes.is_empty() {
            stats.min_steps = 0;
        }
        stats
    }

    pub fn avg_steps(&self) -> f64 {
        if self.total_episodes > 0 {
            self.total_steps as f64 / self.total_episodes as f64
        } else {
            0.0
        }
    }

    pub fn avg_reward(&self) -> f64 {
        if self.total_episodes > 0 {
            self.total_reward / self.total_episodes as f64
        } else {
            0.0
        }
    }

    pub fn draw_rate(&self) -> f64 {
        self.rate(self.draws)
    }

    pub fn illegal_rate(&self) -> f64 {
        self.rate(self.illegal_moves)
    }

    fn rate(&self, count: u32) -> f64 {
        if self.total_episodes > 0 {
            count as f64 / self.total_episodes as f64
        } else {
            0.0
        }
    }
}

impl Default for EpisodeStats {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Play one episode to completion.
///
/// `agent` sees the latest observation and the legal action indices and
/// returns the action to submit. The episode ends on `terminated` or
/// `truncated`; protocol errors from the environment are returned as-is.
pub fn play_episode<Env, A, R>(
    env: &mut Env,
    options: ResetOptions,
    mut agent: A,
    rng: &mut R,
) -> Result<EpisodeRecord, EnvError>
where
    Env: Environment,
    A: FnMut(&Observation, &[usize], &mut R) -> Action,
    R: Rng,
{
    let mut obs = env.reset(options);
    let mut steps = 0u32;
    let mut total_reward = 0.0;

    loop {
        let legal = env.legal_actions();
        let action = agent(&obs, &legal, rng);
        let outcome = env.step(action)?;
        steps += 1;
        total_reward += outcome.reward;

        if outcome.terminated || outcome.truncated {
            let record = EpisodeRecord {
                steps,
                total_reward,
                terminated: outcome.terminated,
                truncated: outcome.truncated,
                final_info: outcome.info,
                white_remaining: env.clock().remaining(Color::White),
                black_remaining: env.clock().remaining(Color::Black),
            };
            info!(
                steps,
                reward = total_reward,
                info = ?record.final_info,
                "episode finished"
            );
            return Ok(record);
        }
        obs = outcome.observation;
    }
}

/// Agent that picks uniformly among the legal actions.
pub fn random_legal_agent<R: Rng>(_obs: &Observation, legal: &[usize], rng: &mut R) -> Action {
    if legal.is_empty() {
        return Action::Move(0);
    }
    Action::from(legal[rng.gen_range(0..legal.len())])
}
