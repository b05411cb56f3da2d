//! One-dimensional Kalman filter over the offset.
//!
//! The offset is modelled as constant between samples, so the predict step
//! only inflates the covariance by the process noise `Q`:
//!
//! ```text
//! predict:  P⁻ = P + Q
//! update:   K  = P⁻ / (P⁻ + R)
//!           x' = x + K·(z - x)
//!           P' = (1 - K)·P⁻
//! ```

use super::{CorrectionFilter, Sample};
use crate::protocol::Scheme;

/// Kalman tuning.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KalmanParams {
    /// Process noise variance `Q` (µs²), added on every predict step.
    pub process_noise: f64,
    /// Measurement noise variance `R` (µs²).
    pub measurement_noise: f64,
    /// Error covariance after the first sample.
    pub initial_covariance: f64,
}

impl Default for KalmanParams {
    fn default() -> Self {
        Self {
            process_noise: 1.0,
            measurement_noise: 25.0,
            initial_covariance: 1.0,
        }
    }
}

/// Per-client Kalman state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct KalmanState {
    /// Current offset estimate, microseconds.
    pub estimate: f64,
    /// Error covariance `P`.
    pub error_covariance: f64,
    /// Whether a first sample has been seen.
    pub initialized: bool,
}

impl KalmanState {
    /// Gain the next update would use, if initialized.
    #[must_use]
    pub fn next_gain(&self, params: &KalmanParams) -> Option<f64> {
        self.initialized.then(|| {
            let predicted = self.error_covariance + params.process_noise;
            predicted / (predicted + params.measurement_noise)
        })
    }
}

impl CorrectionFilter for KalmanState {
    type Params = KalmanParams;

    const SCHEME: Scheme = Scheme::Kalman;

    fn apply(self, params: &KalmanParams, sample: Sample) -> (Self, f64) {
        let z = sample.raw_offset_us;
        if !self.initialized {
            let state = Self {
                estimate: z,
                error_covariance: params.initial_covariance,
                initialized: true,
            };
            return (state, z);
        }

        let predicted = self.error_covariance + params.process_noise;
        let gain = predicted / (predicted + params.measurement_noise);
        let estimate = self.estimate + gain * (z - self.estimate);
        let state = Self {
            estimate,
            error_covariance: (1.0 - gain) * predicted,
            initialized: true,
        };
        (state, estimate)
    }

    fn is_finite(&self) -> bool {
        self.estimate.is_finite() && self.error_covariance.is_finite()
    }
}
