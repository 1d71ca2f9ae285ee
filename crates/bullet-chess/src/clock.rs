use crate::types::Color;

/// Bullet 1+0: one minute per side.
pub const DEFAULT_ALLOTMENT_SECS: f64 = 60.0;

/// Clamp a measured duration to something chargeable.
///
/// NaN, infinities and negative values become 0.0. This comes from a
/// measurement boundary, so it is repaired silently rather than rejected.
#[inline]
pub fn sanitize_elapsed(elapsed: f64) -> f64 {
    if elapsed.is_finite() && elapsed > 0.0 {
        elapsed
    } else {
        0.0
    }
}

/// Per-side countdown with a shared initial allotment, no increment.
///
/// Remainders only decrease between resets. They may go negative: the value
/// that triggered a timeout is kept as-is and clamped only for observation.
#[derive(Clone, Debug, PartialEq)]
pub struct Clock {
    white_remaining: f64,
    black_remaining: f64,
    initial_allotment: f64,
}

impl Clock {
    pub fn new(initial_allotment: f64) -> Self {
        Self {
            white_remaining: initial_allotment,
            black_remaining: initial_allotment,
            initial_allotment,
        }
    }

    pub fn reset(&mut self) {
        self.white_remaining = self.initial_allotment;
        self.black_remaining = self.initial_allotment;
    }

    /// Change the allotment and reset both sides to it.
    pub(crate) fn reset_to(&mut self, initial_allotment: f64) {
        self.initial_allotment = initial_allotment;
        self.reset();
    }

    /// Deduct `elapsed_secs` (sanitised) from `color`'s remainder.
    pub fn charge(&mut self, color: Color, elapsed_secs: f64) {
        let elapsed = sanitize_elapsed(elapsed_secs);
        match color {
            Color::White => self.white_remaining -= elapsed,
            Color::Black => self.black_remaining -= elapsed,
        }
    }

    #[inline]
    pub fn is_expired(&self, color: Color) -> bool {
        self.remaining(color) <= 0.0
    }

    #[inline]
    pub fn remaining(&self, color: Color) -> f64 {
        match color {
            Color::White => self.white_remaining,
            Color::Black => self.black_remaining,
        }
    }

    #[inline]
    pub fn initial_allotment(&self) -> f64 {
        self.initial_allotment
    }

    /// Remaining time as a fraction of the allotment, clamped at 0.
    #[inline]
    pub fn normalized(&self, color: Color) -> f64 {
        self.remaining(color).max(0.0) / self.initial_allotment
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new(DEFAULT_ALLOTMENT_SECS)
    }
}
