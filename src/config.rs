//! Server configuration

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

pub use crate::filter::{EwmaParams, FilterConfig, KalmanParams, PidParams};

/// Invalid startup configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A numeric parameter is out of range
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter {
        /// Field name
        name: &'static str,
        /// What the allowed range is
        reason: &'static str,
    },

    /// Bind address could not be parsed
    #[error("invalid bind address: {0}")]
    InvalidBindAddress(String),
}

impl ConfigError {
    pub(crate) fn invalid(name: &'static str, reason: &'static str) -> Self {
        Self::InvalidParameter { name, reason }
    }
}

/// Time-synchronization server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// UDP listen address
    pub bind_addr: SocketAddr,

    /// Receive buffer per worker; datagrams longer than this are truncated
    /// and then rejected by the codec
    pub recv_buf_size: usize,

    /// Number of concurrent datagram workers
    pub workers: usize,

    /// Number of client registry shards
    pub registry_shards: usize,

    /// Drop a client's state after this long without a probe
    pub idle_timeout: Duration,

    /// How often the idle sweep runs (default: a quarter of `idle_timeout`)
    pub eviction_interval: Duration,

    /// Samples buffered per telemetry subscriber before the oldest are dropped
    pub telemetry_capacity: usize,

    /// Filter tuning shared by all clients
    pub filters: FilterConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9999)),
            recv_buf_size: 256,
            workers: 4,
            registry_shards: 16,
            idle_timeout: Duration::from_secs(60),
            eviction_interval: Duration::from_secs(15),
            telemetry_capacity: 1024,
            filters: FilterConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create with a bind address given as text
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidBindAddress`] if `addr` is not a socket
    /// address.
    pub fn with_bind_addr(addr: &str) -> Result<Self, ConfigError> {
        let bind_addr = addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddress(addr.to_string()))?;
        Ok(Self {
            bind_addr,
            ..Default::default()
        })
    }

    /// Set bind address
    #[must_use]
    pub fn bind_addr(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set number of workers
    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Set number of registry shards
    #[must_use]
    pub fn registry_shards(mut self, shards: usize) -> Self {
        self.registry_shards = shards;
        self
    }

    /// Set idle timeout; the sweep interval follows at a quarter of it
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self.eviction_interval = (timeout / 4).max(Duration::from_millis(1));
        self
    }

    /// Set idle sweep interval
    #[must_use]
    pub fn eviction_interval(mut self, interval: Duration) -> Self {
        self.eviction_interval = interval;
        self
    }

    /// Set telemetry buffer capacity
    #[must_use]
    pub fn telemetry_capacity(mut self, capacity: usize) -> Self {
        self.telemetry_capacity = capacity;
        self
    }

    /// Set filter tuning
    #[must_use]
    pub fn filters(mut self, filters: FilterConfig) -> Self {
        self.filters = filters;
        self
    }

    /// Check every field against its allowed range.
    ///
    /// # Errors
    /// Returns the first violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.recv_buf_size < crate::protocol::ProbePacket::SIZE {
            return Err(ConfigError::invalid(
                "recv_buf_size",
                "must hold at least one probe",
            ));
        }
        if self.workers == 0 {
            return Err(ConfigError::invalid("workers", "must be at least 1"));
        }
        if self.registry_shards == 0 {
            return Err(ConfigError::invalid("registry_shards", "must be at least 1"));
        }
        if self.idle_timeout.is_zero() {
            return Err(ConfigError::invalid("idle_timeout", "must be non-zero"));
        }
        if self.eviction_interval.is_zero() {
            return Err(ConfigError::invalid("eviction_interval", "must be non-zero"));
        }
        if self.telemetry_capacity == 0 {
            return Err(ConfigError::invalid(
                "telemetry_capacity",
                "must be at least 1",
            ));
        }
        self.filters.validate()
    }
}
