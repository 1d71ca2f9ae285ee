use crate::clock::DEFAULT_ALLOTMENT_SECS;
use crate::error::EnvError;

/// Episode parameters. Fixed for the duration of an episode; only `reset`
/// may change them.
#[derive(Clone, Debug, PartialEq)]
pub struct EpisodeConfig {
    /// The agent moves for both colors; no opponent is simulated.
    pub self_play: bool,
    /// Seconds on each clock at reset.
    pub initial_allotment: f64,
}

impl Default for EpisodeConfig {
    fn default() -> Self {
        Self {
            self_play: false,
            initial_allotment: DEFAULT_ALLOTMENT_SECS,
        }
    }
}

impl EpisodeConfig {
    pub fn with_self_play(mut self, self_play: bool) -> Self {
        self.self_play = self_play;
        self
    }

    pub fn with_initial_allotment(mut self, secs: f64) -> Self {
        self.initial_allotment = secs;
        self
    }

    pub fn validate(&self) -> Result<(), EnvError> {
        if !self.initial_allotment.is_finite() || self.initial_allotment <= 0.0 {
            return Err(EnvError::InvalidConfig(format!(
                "initial_allotment must be positive and finite, got {}",
                self.initial_allotment
            )));
        }
        Ok(())
    }
}

/// Per-reset overrides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ResetOptions {
    /// Re-seed the episode RNG. `None` keeps the current stream.
    pub seed: Option<u64>,
    /// Switch self-play on or off from this episode on.
    pub self_play: Option<bool>,
}

impl ResetOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            self_play: None,
        }
    }

    pub fn with_self_play(mut self, self_play: bool) -> Self {
        self.self_play = Some(self_play);
        self
    }
}
