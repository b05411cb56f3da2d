//! UDP time-synchronization server
//!
//! [`TimesyncServer`] runs a pool of workers over one [`Transport`]. Each
//! worker receives a datagram, hands it to the shared [`Dispatcher`] and sends
//! back the correction. Client filter state lives in the sharded
//! [`ClientRegistry`]; an independent task sweeps idle clients out of it.

pub mod dispatch;
pub mod registry;
pub mod service;
pub mod telemetry;
pub mod transport;

#[cfg(test)]
mod tests;

pub use dispatch::{Dispatcher, ServerStats, ServerStatsSnapshot};
pub use registry::{ClientKey, ClientRegistry, ClientSlot, ClientSnapshot, ClientState, ClientStats};
pub use service::TimesyncServer;
pub use telemetry::{SampleLogger, SyncSample, Telemetry};
pub use transport::Transport;
