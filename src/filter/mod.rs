//! Offset computation and per-client correction filters.
//!
//! Every probe yields one raw offset [`Sample`]. Each filter is a pure
//! transition `(state, sample) -> (state', corrected)`; the state itself is
//! owned by a client's [`FilterBank`] and never shared across clients.
//!
//! ## Schemes
//!
//! - **Raw**: identity, no state.
//! - **EWMA**: `s' = α·x + (1-α)·s`.
//! - **Kalman**: scalar predict/update with gain `K = P / (P + R)`.
//! - **PID**: `Kp·e + Ki·∫e dt + Kd·de/dt`, integral clamped.
//!
//! The first sample for any (client, scheme) pair initializes that scheme's
//! state from the sample itself.

pub mod bank;
pub mod ewma;
pub mod kalman;
pub mod offset;
pub mod pid;

#[cfg(test)]
mod tests;

pub use bank::{FilterBank, FilterConfig};
pub use ewma::{EwmaParams, EwmaState};
pub use kalman::{KalmanParams, KalmanState};
pub use offset::{Sample, now_micros, raw_offset, to_wire_micros};
pub use pid::{PidParams, PidState};

use crate::protocol::Scheme;

/// A stateful correction strategy expressed as a pure state transition.
///
/// `Default` is the uninitialized state a client starts with.
pub trait CorrectionFilter: Copy + Default {
    /// Fixed tuning parameters, chosen at configuration time.
    type Params;

    /// Scheme this filter serves.
    const SCHEME: Scheme;

    /// Fold one sample into the state, returning the new state and the
    /// corrected offset in microseconds.
    #[must_use]
    fn apply(self, params: &Self::Params, sample: Sample) -> (Self, f64);

    /// Whether every numeric field is finite.
    fn is_finite(&self) -> bool;
}
