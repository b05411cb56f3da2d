//! Per-client collection of filter states.

use tracing::warn;

use super::{
    CorrectionFilter, EwmaParams, EwmaState, KalmanParams, KalmanState, PidParams, PidState,
    Sample,
};
use crate::config::ConfigError;
use crate::error::FilterStateCorruption;
use crate::protocol::Scheme;

/// Tuning for every filter, shared by all clients.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterConfig {
    /// EWMA tuning
    pub ewma: EwmaParams,
    /// Kalman tuning
    pub kalman: KalmanParams,
    /// PID tuning
    pub pid: PidParams,
}

impl FilterConfig {
    /// Set the EWMA smoothing factor
    #[must_use]
    pub fn alpha(mut self, alpha: f64) -> Self {
        self.ewma.alpha = alpha;
        self
    }

    /// Set the Kalman process and measurement noise
    #[must_use]
    pub fn kalman_noise(mut self, process: f64, measurement: f64) -> Self {
        self.kalman.process_noise = process;
        self.kalman.measurement_noise = measurement;
        self
    }

    /// Set the PID gains
    #[must_use]
    pub fn pid_gains(mut self, kp: f64, ki: f64, kd: f64) -> Self {
        self.pid.kp = kp;
        self.pid.ki = ki;
        self.pid.kd = kd;
        self
    }

    /// Check every parameter against its allowed range.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidParameter`] naming the first offending
    /// field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let alpha = self.ewma.alpha;
        if !(alpha > 0.0 && alpha < 1.0) {
            return Err(ConfigError::invalid("ewma.alpha", "must be in (0, 1)"));
        }

        let k = &self.kalman;
        if !(k.process_noise.is_finite() && k.process_noise >= 0.0) {
            return Err(ConfigError::invalid(
                "kalman.process_noise",
                "must be finite and >= 0",
            ));
        }
        if !(k.measurement_noise.is_finite() && k.measurement_noise > 0.0) {
            return Err(ConfigError::invalid(
                "kalman.measurement_noise",
                "must be finite and > 0",
            ));
        }
        if !(k.initial_covariance.is_finite() && k.initial_covariance > 0.0) {
            return Err(ConfigError::invalid(
                "kalman.initial_covariance",
                "must be finite and > 0",
            ));
        }

        let p = &self.pid;
        for (name, gain) in [("pid.kp", p.kp), ("pid.ki", p.ki), ("pid.kd", p.kd)] {
            if !gain.is_finite() {
                return Err(ConfigError::invalid(name, "must be finite"));
            }
        }
        if !(p.integral_min.is_finite() && p.integral_max.is_finite())
            || p.integral_min > p.integral_max
        {
            return Err(ConfigError::invalid(
                "pid.integral_min",
                "integral bounds must be finite with min <= max",
            ));
        }
        Ok(())
    }
}

/// Filter states for one client, one slot per stateful scheme.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterBank {
    /// EWMA state
    pub ewma: EwmaState,
    /// Kalman state
    pub kalman: KalmanState,
    /// PID state
    pub pid: PidState,
}

impl FilterBank {
    /// Create a bank with every scheme uninitialized.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `sample` through the filter for `scheme`, updating only that
    /// scheme's state.
    ///
    /// [`Scheme::Raw`] returns the raw offset and touches nothing.
    ///
    /// # Errors
    /// Returns [`FilterStateCorruption`] if the update would leave the state
    /// or its output non-finite. The state is left as it was.
    pub fn apply(
        &mut self,
        scheme: Scheme,
        config: &FilterConfig,
        sample: Sample,
    ) -> Result<f64, FilterStateCorruption> {
        match scheme {
            Scheme::Raw => Ok(sample.raw_offset_us),
            Scheme::Ewma => step(&mut self.ewma, &config.ewma, sample),
            Scheme::Kalman => step(&mut self.kalman, &config.kalman, sample),
            Scheme::Pid => step(&mut self.pid, &config.pid, sample),
        }
    }

    /// Whether `scheme` has seen at least one sample.
    #[must_use]
    pub fn is_initialized(&self, scheme: Scheme) -> bool {
        match scheme {
            Scheme::Raw => true,
            Scheme::Ewma => self.ewma.initialized,
            Scheme::Kalman => self.kalman.initialized,
            Scheme::Pid => self.pid.previous_timestamp.is_some(),
        }
    }

    /// Reset every scheme to uninitialized.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn step<F: CorrectionFilter>(
    state: &mut F,
    params: &F::Params,
    sample: Sample,
) -> Result<f64, FilterStateCorruption> {
    if !state.is_finite() {
        warn!(scheme = %F::SCHEME, "Filter state non-finite before update");
        return Err(FilterStateCorruption { scheme: F::SCHEME });
    }
    let (next, output) = state.apply(params, sample);
    if !next.is_finite() || !output.is_finite() {
        warn!(scheme = %F::SCHEME, output, "Filter update produced non-finite value");
        return Err(FilterStateCorruption { scheme: F::SCHEME });
    }
    *state = next;
    Ok(output)
}
