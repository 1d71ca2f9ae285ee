//! Harness layers around an [`Environment`].

use std::time::Instant;

use tracing::debug;

use crate::action::Action;
use crate::clock::Clock;
use crate::config::ResetOptions;
use crate::encoder::Observation;
use crate::env::{Environment, StepOutcome};
use crate::error::EnvError;

// ---------------------------------------------------------------------------
// RealTimeClock
// ---------------------------------------------------------------------------

/// Charges the agent for real deliberation time.
///
/// Measures the wall-clock delta between the last observation handed out and
/// the next `step`, and forwards it as the action's elapsed time. Re-arms
/// right after `reset` and `step` return.
#[derive(Debug)]
pub struct RealTimeClock<E> {
    inner: E,
    armed_at: Option<Instant>,
}

impl<E: Environment> RealTimeClock<E> {
    pub fn new(inner: E) -> Self {
        Self {
            inner,
            armed_at: None,
        }
    }

    /// Step as if the action was submitted at `now`.
    pub fn step_at(&mut self, action: Action, now: Instant) -> Result<StepOutcome, EnvError> {
        let armed_at = *self.armed_at.get_or_insert(now);
        let elapsed = now.saturating_duration_since(armed_at).as_secs_f64();
        let result = self.inner.step(action.with_elapsed(elapsed));
        self.armed_at = Some(Instant::now());
        result
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn into_inner(self) -> E {
        self.inner
    }
}

impl<E: Environment> Environment for RealTimeClock<E> {
    fn reset(&mut self, options: ResetOptions) -> Observation {
        let obs = self.inner.reset(options);
        self.armed_at = Some(Instant::now());
        obs
    }

    fn step(&mut self, action: Action) -> Result<StepOutcome, EnvError> {
        self.step_at(action, Instant::now())
    }

    fn legal_actions(&self) -> Vec<usize> {
        self.inner.legal_actions()
    }

    fn clock(&self) -> &Clock {
        self.inner.clock()
    }
}

// ---------------------------------------------------------------------------
// StepLimit
// ---------------------------------------------------------------------------

/// Truncates episodes after a fixed number of steps.
#[derive(Debug)]
pub struct StepLimit<E> {
    inner: E,
    max_steps: u32,
    steps: u32,
}

impl<E: Environment> StepLimit<E> {
    pub const DEFAULT_MAX_STEPS: u32 = 300;

    pub fn new(inner: E, max_steps: u32) -> Self {
        Self {
            inner,
            max_steps,
            steps: 0,
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn inner(&self) -> &E {
        &self.inner
    }

    pub fn inner_mut(&mut self) -> &mut E {
        &mut self.inner
    }
}

impl<E: Environment> Environment for StepLimit<E> {
    fn reset(&mut self, options: ResetOptions) -> Observation {
        self.steps = 0;
        self.inner.reset(options)
    }

    fn step(&mut self, action: Action) -> Result<StepOutcome, EnvError> {
        let mut outcome = self.inner.step(action)?;
        self.steps += 1;
        if self.steps >= self.max_steps && !outcome.terminated {
            debug!(steps = self.steps, "episode truncated");
            outcome.truncated = true;
        }
        Ok(outcome)
    }

    fn legal_actions(&self) -> Vec<usize> {
        self.inner.legal_actions()
    }

    fn clock(&self) -> &Clock {
        self.inner.clock()
    }
}
