//! Network condition simulation for testing
//!
//! Applies loss, reordering and duplication to a sequence of datagrams.
//! Seeded, so a given seed always produces the same delivery order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Network condition simulator
#[derive(Clone, Debug)]
pub struct NetworkSimulator {
    /// Packet loss probability (0.0 to 1.0)
    pub loss_rate: f64,
    /// Probability a packet swaps places with the one after it
    pub reorder_rate: f64,
    /// Probability a packet is delivered twice
    pub duplicate_rate: f64,
    rng: StdRng,
}

impl NetworkSimulator {
    /// Perfect network (no issues)
    #[must_use]
    pub fn perfect(seed: u64) -> Self {
        Self::new(seed, 0.0, 0.0, 0.0)
    }

    /// Good `WiFi` conditions
    #[must_use]
    pub fn good_wifi(seed: u64) -> Self {
        Self::new(seed, 0.001, 0.001, 0.0005)
    }

    /// Poor `WiFi` conditions
    #[must_use]
    pub fn poor_wifi(seed: u64) -> Self {
        Self::new(seed, 0.05, 0.05, 0.01)
    }

    /// Very poor conditions (stress test)
    #[must_use]
    pub fn stress_test(seed: u64) -> Self {
        Self::new(seed, 0.10, 0.10, 0.05)
    }

    /// Custom conditions; rates are clamped to `[0, 1]`
    #[must_use]
    pub fn new(seed: u64, loss_rate: f64, reorder_rate: f64, duplicate_rate: f64) -> Self {
        Self {
            loss_rate: loss_rate.clamp(0.0, 1.0),
            reorder_rate: reorder_rate.clamp(0.0, 1.0),
            duplicate_rate: duplicate_rate.clamp(0.0, 1.0),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Should this packet be dropped?
    pub fn should_drop(&mut self) -> bool {
        self.loss_rate > 0.0 && self.rng.gen_bool(self.loss_rate)
    }

    /// Should this packet be reordered?
    pub fn should_reorder(&mut self) -> bool {
        self.reorder_rate > 0.0 && self.rng.gen_bool(self.reorder_rate)
    }

    /// Should this packet be duplicated?
    pub fn should_duplicate(&mut self) -> bool {
        self.duplicate_rate > 0.0 && self.rng.gen_bool(self.duplicate_rate)
    }

    /// Deliver `packets` through the simulated network, returning them in
    /// arrival order.
    pub fn transmit<P: Clone>(&mut self, packets: impl IntoIterator<Item = P>) -> Vec<P> {
        let mut delivered = Vec::new();
        for packet in packets {
            if self.should_drop() {
                continue;
            }
            if self.should_duplicate() {
                delivered.push(packet.clone());
            }
            delivered.push(packet);
        }

        let mut i = 0;
        while i + 1 < delivered.len() {
            if self.should_reorder() {
                delivered.swap(i, i + 1);
                i += 2;
            } else {
                i += 1;
            }
        }
        delivered
    }
}
