//! Client half of the protocol
//!
//! ```rust,no_run
//! use adaptive_timesync::{ProbeClient, Scheme};
//!
//! # async fn example() -> adaptive_timesync::Result<()> {
//! let client = ProbeClient::connect("127.0.0.1:9999".parse().unwrap()).await?;
//! let reply = client.probe(Scheme::Kalman, 1).await?;
//! println!("offset {} µs, rtt {:?}", reply.packet.correction_us, reply.round_trip);
//! # Ok(())
//! # }
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::time::Instant;
use tracing::debug;

use crate::error::{Result, TimesyncError};
use crate::filter::now_micros;
use crate::protocol::{CorrectionPacket, ProbePacket, Scheme};

/// Default time to wait for a correction
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

/// A correction together with how long it took to arrive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Correction {
    /// Decoded response
    pub packet: CorrectionPacket,
    /// Time from send to receive
    pub round_trip: Duration,
}

/// Sends probes to one server and waits for the matching corrections.
///
/// Sequence numbers are chosen by the caller. Responses that do not match
/// the outstanding probe (late replies to earlier probes) are discarded.
#[derive(Debug)]
pub struct ProbeClient {
    socket: UdpSocket,
    server: SocketAddr,
    timeout: Duration,
}

impl ProbeClient {
    /// Bind an ephemeral local port and connect it to `server`
    ///
    /// # Errors
    /// Returns [`TimesyncError::Transport`] if the socket cannot be bound or
    /// connected.
    pub async fn connect(server: SocketAddr) -> Result<Self> {
        let local: SocketAddr = if server.is_ipv4() {
            ([0, 0, 0, 0], 0).into()
        } else {
            (std::net::Ipv6Addr::UNSPECIFIED, 0).into()
        };
        let socket = UdpSocket::bind(local).await?;
        socket.connect(server).await?;
        Ok(Self {
            socket,
            server,
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the response timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server this client talks to
    #[must_use]
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    /// Local address (the server sees this as the client key)
    ///
    /// # Errors
    /// Propagates the socket error.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.socket.local_addr()?)
    }

    /// Probe stamped with the current time
    ///
    /// # Errors
    /// See [`Self::probe_at`].
    pub async fn probe(&self, scheme: Scheme, sequence: u32) -> Result<Correction> {
        self.probe_at(scheme, sequence, now_micros()).await
    }

    /// Probe with an explicit send stamp
    ///
    /// # Errors
    /// Returns [`TimesyncError::Timeout`] if no matching correction arrives
    /// in time, and [`TimesyncError::Transport`] on socket failure.
    pub async fn probe_at(
        &self,
        scheme: Scheme,
        sequence: u32,
        client_send_time_us: u64,
    ) -> Result<Correction> {
        let probe = ProbePacket::new(scheme, sequence, client_send_time_us);
        let started = Instant::now();
        self.socket.send(&probe.encode()).await?;

        let deadline = started + self.timeout;
        let mut buf = [0u8; CorrectionPacket::RAW_SIZE + 1];
        loop {
            let len = tokio::time::timeout_at(deadline, self.socket.recv(&mut buf))
                .await
                .map_err(|_| TimesyncError::Timeout {
                    duration: self.timeout,
                })??;

            match CorrectionPacket::decode(&buf[..len]) {
                Ok(packet) if packet.scheme == scheme && packet.sequence == sequence => {
                    return Ok(Correction {
                        packet,
                        round_trip: started.elapsed(),
                    });
                }
                Ok(packet) => {
                    debug!(
                        scheme = %packet.scheme,
                        sequence = packet.sequence,
                        "Discarding stale correction"
                    );
                }
                Err(e) => debug!("Discarding undecodable response: {e}"),
            }
        }
    }
}
