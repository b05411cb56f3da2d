//! Live sample telemetry
//!
//! Every handled probe is published as a [`SyncSample`] on a bounded
//! broadcast bus. Publishing never blocks: when a subscriber falls more than
//! `capacity` samples behind, it loses the oldest ones and resumes from the
//! oldest sample still buffered.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::Stream;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::registry::ClientKey;
use crate::protocol::Scheme;

/// One handled probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSample {
    /// Client the probe came from
    pub client: ClientKey,
    /// Scheme the client asked for
    pub scheme: Scheme,
    /// Probe sequence
    pub sequence: u32,
    /// Unfiltered offset, microseconds
    pub raw_offset_us: i64,
    /// Offset after the scheme's filter, microseconds
    pub corrected_us: i64,
    /// Server receive time, microseconds since the Unix epoch
    pub server_time_us: u64,
}

/// Handle to the sample bus. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Telemetry {
    tx: broadcast::Sender<SyncSample>,
    dropped: Arc<AtomicU64>,
}

impl Telemetry {
    /// Create a bus buffering up to `capacity` samples per subscriber
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self {
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Publish a sample. Fire and forget.
    pub fn record(&self, sample: SyncSample) {
        // Err only means nobody is subscribed.
        let _ = self.tx.send(sample);
    }

    /// Live stream of samples published from now on.
    ///
    /// Ends only once every [`Telemetry`] handle has been dropped.
    pub fn stream(&self) -> impl Stream<Item = SyncSample> + Send + Unpin + 'static {
        let rx = self.tx.subscribe();
        let dropped = Arc::clone(&self.dropped);
        Box::pin(futures::stream::unfold(
            (rx, dropped),
            |(mut rx, dropped)| async move {
                loop {
                    match rx.recv().await {
                        Ok(sample) => return Some((sample, (rx, dropped))),
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            dropped.fetch_add(skipped, Ordering::Relaxed);
                            warn!(
                                skipped,
                                "Telemetry subscriber lagging, oldest samples dropped"
                            );
                        }
                        Err(broadcast::error::RecvError::Closed) => return None,
                    }
                }
            },
        ))
    }

    /// Samples skipped by lagging subscribers so far
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Number of live subscribers
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Writes every sample to the log on target `timesync::sample`
#[derive(Debug)]
pub struct SampleLogger;

impl SampleLogger {
    /// Subscribe to `telemetry` and log until shutdown.
    ///
    /// The task resolves to the number of samples logged.
    pub fn spawn(telemetry: &Telemetry, mut shutdown: watch::Receiver<bool>) -> JoinHandle<u64> {
        use futures::StreamExt;

        let mut samples = telemetry.stream();
        tokio::spawn(async move {
            let mut logged = 0u64;
            loop {
                tokio::select! {
                    next = samples.next() => {
                        let Some(s) = next else { break };
                        info!(
                            target: "timesync::sample",
                            client = %s.client,
                            scheme = %s.scheme,
                            sequence = s.sequence,
                            raw_offset_us = s.raw_offset_us,
                            corrected_us = s.corrected_us,
                            server_time_us = s.server_time_us,
                        );
                        logged += 1;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }
            logged
        })
    }
}
