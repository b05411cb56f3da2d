//! # adaptive-timesync
//!
//! Per-client clock offset measurement and correction over UDP.
//!
//! A client sends a small probe carrying its send time and the correction
//! scheme it wants. The server computes the raw offset against its own
//! receive time, runs it through that client's private filter for the chosen
//! scheme and answers with the corrected offset.
//!
//! ## Schemes
//!
//! - **Raw**: the unfiltered offset (baseline)
//! - **EWMA**: exponentially-weighted moving average
//! - **Kalman**: scalar Kalman filter
//! - **PID**: PID controller with a clamped integral
//!
//! ## Example
//!
//! ```rust,no_run
//! use adaptive_timesync::{ProbeClient, Scheme, ServerConfig, TimesyncServer};
//!
//! # async fn example() -> adaptive_timesync::Result<()> {
//! let server = TimesyncServer::bind(ServerConfig::with_bind_addr("127.0.0.1:9999")?).await?;
//!
//! let client = ProbeClient::connect(server.local_addr()?).await?;
//! let reply = client.probe(Scheme::Ewma, 1).await?;
//! println!("corrected offset: {} µs", reply.packet.correction_us);
//!
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Wire**: [`protocol`] - fixed-size big-endian records
//! - **Math**: [`filter`] - offset calculation and the per-scheme filters
//! - **Service**: [`server`] - registry, dispatcher, workers, telemetry

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// Error types
pub mod error;
/// Configuration
pub mod config;

pub mod filter;
pub mod protocol;

/// Testing utilities
pub mod testing;

#[cfg(feature = "tokio-runtime")]
mod client;
#[cfg(feature = "tokio-runtime")]
pub mod server;

// Re-exports
#[cfg(feature = "tokio-runtime")]
pub use client::{Correction, DEFAULT_TIMEOUT, ProbeClient};
pub use config::{ConfigError, ServerConfig};
pub use error::{FilterStateCorruption, Result, TimesyncError};
pub use filter::{FilterBank, FilterConfig};
pub use protocol::{CorrectionPacket, PacketError, ProbePacket, Scheme};
#[cfg(feature = "tokio-runtime")]
pub use server::{ClientKey, ClientRegistry, Dispatcher, SyncSample, Telemetry, TimesyncServer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude for common imports
///
/// Convenient re-exports
pub mod prelude {
    #[cfg(feature = "tokio-runtime")]
    pub use crate::{ProbeClient, TimesyncServer};
    pub use crate::{
        CorrectionPacket, FilterConfig, ProbePacket, Scheme, ServerConfig, TimesyncError,
    };
}
