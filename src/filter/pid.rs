//! PID controller treating the raw offset as the error signal.

use super::{CorrectionFilter, Sample};
use crate::protocol::Scheme;

/// PID gains and anti-windup bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PidParams {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
    /// Lower clamp for the integral accumulator (µs·s).
    pub integral_min: f64,
    /// Upper clamp for the integral accumulator (µs·s).
    pub integral_max: f64,
}

impl Default for PidParams {
    fn default() -> Self {
        Self {
            kp: 0.6,
            ki: 0.05,
            kd: 0.001,
            integral_min: -500_000.0,
            integral_max: 500_000.0,
        }
    }
}

/// Per-client PID state.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PidState {
    /// Clamped running integral of the error (µs·s).
    pub integral: f64,
    /// Error from the previous sample, microseconds.
    pub previous_error: f64,
    /// Server receive time of the previous sample; `None` until the first.
    pub previous_timestamp: Option<u64>,
}

impl CorrectionFilter for PidState {
    type Params = PidParams;

    const SCHEME: Scheme = Scheme::Pid;

    fn apply(self, params: &PidParams, sample: Sample) -> (Self, f64) {
        let error = sample.raw_offset_us;
        let now = sample.received_at_us;

        let Some(previous) = self.previous_timestamp else {
            let state = Self {
                integral: 0.0,
                previous_error: error,
                previous_timestamp: Some(now),
            };
            return (state, params.kp * error);
        };

        let dt = elapsed_secs(previous, now);
        let mut integral = self.integral;
        let mut derivative = 0.0;
        // Non-positive dt (duplicate stamp or clock step back) skips the
        // derivative and the integral; a negative dt would unwind the integral.
        if dt > 0.0 {
            integral = (integral + error * dt).clamp(params.integral_min, params.integral_max);
            derivative = (error - self.previous_error) / dt;
        }

        let output = params.kp * error + params.ki * integral + params.kd * derivative;
        let state = Self {
            integral,
            previous_error: error,
            previous_timestamp: Some(now),
        };
        (state, output)
    }

    fn is_finite(&self) -> bool {
        self.integral.is_finite() && self.previous_error.is_finite()
    }
}

#[allow(
    clippy::cast_precision_loss,
    reason = "Inter-probe gaps are far below 2^53 µs"
)]
fn elapsed_secs(previous_us: u64, now_us: u64) -> f64 {
    (i128::from(now_us) - i128::from(previous_us)) as f64 / 1_000_000.0
}
