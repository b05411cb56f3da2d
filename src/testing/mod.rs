//! Test utilities
//!
//! [`NetworkSimulator`] perturbs a probe stream; [`MockTransport`] lets a
//! server run against in-memory channels.

#[cfg(feature = "tokio-runtime")]
pub mod mock_transport;
pub mod network_sim;

#[cfg(test)]
mod tests;

#[cfg(feature = "tokio-runtime")]
pub use mock_transport::{MockPeer, MockTransport};
pub use network_sim::NetworkSimulator;

use crate::protocol::{ProbePacket, Scheme};

/// `count` probes for `scheme` with sequences from 1, stamped `interval_us`
/// apart starting at `start_us`
#[must_use]
pub fn probe_train(
    scheme: Scheme,
    count: u32,
    start_us: u64,
    interval_us: u64,
) -> Vec<ProbePacket> {
    (1..=count)
        .map(|seq| ProbePacket::new(scheme, seq, start_us + u64::from(seq - 1) * interval_us))
        .collect()
}
