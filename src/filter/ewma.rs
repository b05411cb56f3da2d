//! Exponentially-weighted moving average.

use super::{CorrectionFilter, Sample};
use crate::protocol::Scheme;

/// EWMA tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EwmaParams {
    /// Weight of the newest sample, in `(0, 1)`.
    pub alpha: f64,
}

impl Default for EwmaParams {
    fn default() -> Self {
        Self { alpha: 0.25 }
    }
}

/// Per-client EWMA state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct EwmaState {
    /// Current smoothed offset, microseconds.
    pub smoothed: f64,
    /// Whether a first sample has been seen.
    pub initialized: bool,
}

impl CorrectionFilter for EwmaState {
    type Params = EwmaParams;

    const SCHEME: Scheme = Scheme::Ewma;

    fn apply(self, params: &EwmaParams, sample: Sample) -> (Self, f64) {
        let x = sample.raw_offset_us;
        let smoothed = if self.initialized {
            params.alpha * x + (1.0 - params.alpha) * self.smoothed
        } else {
            x
        };
        (
            Self {
                smoothed,
                initialized: true,
            },
            smoothed,
        )
    }

    fn is_finite(&self) -> bool {
        self.smoothed.is_finite()
    }
}
