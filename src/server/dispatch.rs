//! Per-datagram processing
//!
//! `decode → lookup/create client → raw offset → filter → encode → publish`.
//! Malformed datagrams are dropped here and never answered.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace, warn};

use super::registry::{ClientKey, ClientRegistry};
use super::telemetry::{SyncSample, Telemetry};
use crate::filter::{FilterConfig, Sample, raw_offset, to_wire_micros};
use crate::protocol::{CorrectionPacket, ProbePacket};

const PREVIEW_BYTES: usize = 16;

/// Server-wide counters
#[derive(Debug, Default)]
pub struct ServerStats {
    received: AtomicU64,
    responded: AtomicU64,
    malformed: AtomicU64,
    send_failures: AtomicU64,
    corruptions_recovered: AtomicU64,
}

/// Copy of [`ServerStats`] at one instant
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerStatsSnapshot {
    /// Datagrams received
    pub received: u64,
    /// Responses sent
    pub responded: u64,
    /// Datagrams dropped as malformed
    pub malformed: u64,
    /// Responses that failed to send
    pub send_failures: u64,
    /// Filter banks rebuilt after corruption
    pub corruptions_recovered: u64,
}

impl ServerStats {
    /// Read every counter
    #[must_use]
    pub fn snapshot(&self) -> ServerStatsSnapshot {
        ServerStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            responded: self.responded.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
            send_failures: self.send_failures.load(Ordering::Relaxed),
            corruptions_recovered: self.corruptions_recovered.load(Ordering::Relaxed),
        }
    }

    pub(crate) fn record_sent(&self) {
        self.responded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_send_failure(&self) {
        self.send_failures.fetch_add(1, Ordering::Relaxed);
    }
}

/// Turns probes into corrections against a shared client registry
#[derive(Debug)]
pub struct Dispatcher {
    registry: Arc<ClientRegistry>,
    filters: FilterConfig,
    telemetry: Telemetry,
    stats: Arc<ServerStats>,
}

impl Dispatcher {
    /// Create a dispatcher
    #[must_use]
    pub fn new(registry: Arc<ClientRegistry>, filters: FilterConfig, telemetry: Telemetry) -> Self {
        Self {
            registry,
            filters,
            telemetry,
            stats: Arc::new(ServerStats::default()),
        }
    }

    /// Client registry
    #[must_use]
    pub fn registry(&self) -> &Arc<ClientRegistry> {
        &self.registry
    }

    /// Sample bus
    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    /// Counters
    #[must_use]
    pub fn stats(&self) -> &ServerStats {
        &self.stats
    }

    /// Shared handle to the counters, usable after the server is gone
    #[must_use]
    pub fn stats_handle(&self) -> Arc<ServerStats> {
        Arc::clone(&self.stats)
    }

    /// Process one datagram received at `received_at_us`.
    ///
    /// Returns the correction to send back, or `None` if the datagram was
    /// dropped. A dropped datagram leaves the registry untouched.
    pub async fn handle(
        &self,
        datagram: &[u8],
        origin: SocketAddr,
        received_at_us: u64,
    ) -> Option<CorrectionPacket> {
        self.stats.received.fetch_add(1, Ordering::Relaxed);

        let probe = match ProbePacket::decode(datagram) {
            Ok(probe) => probe,
            Err(e) => {
                self.stats.malformed.fetch_add(1, Ordering::Relaxed);
                debug!(
                    %origin,
                    len = datagram.len(),
                    preview = %hex_preview(datagram),
                    "Dropping malformed datagram: {e}"
                );
                return None;
            }
        };

        let key = ClientKey::from(origin);
        let raw = raw_offset(probe.client_send_time_us, received_at_us);
        let sample = Sample::from_timestamps(probe.client_send_time_us, received_at_us);

        let slot = self.registry.get_or_create(key).await;
        let corrected = {
            let mut state = slot.lock().await;
            state.stats.observe(probe.sequence);
            match state.filters.apply(probe.scheme, &self.filters, sample) {
                Ok(value) => value,
                Err(corruption) => {
                    warn!(client = %key, "{corruption}, rebuilding filter state");
                    self.stats
                        .corruptions_recovered
                        .fetch_add(1, Ordering::Relaxed);
                    state.stats.filter_resets += 1;
                    state.filters.reset();
                    // A fresh state always initializes from the sample.
                    state
                        .filters
                        .apply(probe.scheme, &self.filters, sample)
                        .unwrap_or(sample.raw_offset_us)
                }
            }
        };

        let response = if probe.scheme.carries_raw_offset() {
            CorrectionPacket::raw(probe.sequence, raw)
        } else {
            CorrectionPacket::filtered(probe.scheme, probe.sequence, to_wire_micros(corrected))
        };

        trace!(
            client = %key,
            scheme = %probe.scheme,
            sequence = probe.sequence,
            raw_offset_us = raw,
            corrected_us = response.correction_us,
            "Probe handled"
        );

        self.telemetry.record(SyncSample {
            client: key,
            scheme: probe.scheme,
            sequence: probe.sequence,
            raw_offset_us: raw,
            corrected_us: response.correction_us,
            server_time_us: received_at_us,
        });

        Some(response)
    }
}

fn hex_preview(data: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(PREVIEW_BYTES * 2 + 3);
    for byte in data.iter().take(PREVIEW_BYTES) {
        let _ = write!(out, "{byte:02x}");
    }
    if data.len() > PREVIEW_BYTES {
        out.push_str("...");
    }
    out
}
