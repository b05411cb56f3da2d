//! Raw offset calculation.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// One raw offset observation, the shared input to every filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// `server_receive - client_send`, microseconds.
    pub raw_offset_us: f64,
    /// Server clock when the probe arrived, microseconds since the Unix epoch.
    pub received_at_us: u64,
}

impl Sample {
    /// Build a sample from the two probe timestamps.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        reason = "Offsets beyond 2^53 µs (~285 years) are not meaningful"
    )]
    pub fn from_timestamps(client_send_time_us: u64, server_receive_time_us: u64) -> Self {
        Self {
            raw_offset_us: raw_offset(client_send_time_us, server_receive_time_us) as f64,
            received_at_us: server_receive_time_us,
        }
    }
}

/// Instantaneous offset between the client's send stamp and the server's
/// receive stamp.
///
/// `server_receive - client_send`: a positive value means the server's
/// clock reads later than the client's stamp (one-way delay included).
/// Saturates at the `i64` bounds.
#[must_use]
pub fn raw_offset(client_send_time_us: u64, server_receive_time_us: u64) -> i64 {
    let diff = i128::from(server_receive_time_us) - i128::from(client_send_time_us);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}

/// Current server time, microseconds since the Unix epoch.
#[must_use]
pub fn now_micros() -> u64 {
    let dur = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO);
    u64::try_from(dur.as_micros()).unwrap_or(u64::MAX)
}

/// Round a filter output to whole microseconds for the wire.
///
/// Saturates at the `i64` bounds; NaN maps to zero.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    reason = "Float to int casts saturate, which is the intended clamping"
)]
pub fn to_wire_micros(value: f64) -> i64 {
    value.round() as i64
}
