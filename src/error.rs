use std::io;
use thiserror::Error;

use crate::config::ConfigError;
use crate::protocol::{PacketError, Scheme};

/// A filter's internal state stopped being a finite number.
///
/// Unreachable while per-client updates are serialized; if it is ever
/// observed the owning client's filter bank is discarded and rebuilt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("filter state corrupted for scheme {scheme}")]
pub struct FilterStateCorruption {
    /// Scheme whose state was found corrupted
    pub scheme: Scheme,
}

/// Errors that can occur while running the time-synchronization service
#[derive(Debug, Error)]
pub enum TimesyncError {
    /// Invalid startup configuration
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Datagram could not be decoded
    #[error("malformed packet: {0}")]
    Packet(#[from] PacketError),

    /// Socket send or receive failed
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    /// Filter invariant violation
    #[error(transparent)]
    FilterStateCorruption(#[from] FilterStateCorruption),

    /// Response did not arrive in time
    #[error("timed out after {duration:?}")]
    Timeout {
        /// How long we waited
        duration: std::time::Duration,
    },

    /// The service has been shut down
    #[error("service shut down")]
    Shutdown,
}

impl TimesyncError {
    /// Whether this error means the service cannot keep running.
    ///
    /// Only transport errors whose kind indicates a dead socket qualify;
    /// per-datagram failures (malformed input, a refused send to one
    /// client) never do.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(err) => is_fatal_io(err),
            Self::Config(_) | Self::Shutdown => true,
            Self::Packet(_) | Self::FilterStateCorruption(_) | Self::Timeout { .. } => false,
        }
    }
}

/// Classify a socket error from the receive path.
///
/// Only kinds that mean the socket itself is gone are fatal. Anything else
/// (ICMP-induced resets, oversized datagrams, platform codes without a named
/// kind) is scoped to one datagram and the worker keeps receiving.
#[must_use]
pub fn is_fatal_io(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::NotConnected
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::Unsupported
    )
}

/// Result type alias for time-synchronization operations
pub type Result<T> = std::result::Result<T, TimesyncError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TimesyncError::Packet(PacketError::UnknownScheme(0x07));
        assert_eq!(err.to_string(), "malformed packet: unknown scheme id: 0x07");
    }

    #[test]
    fn test_corruption_display() {
        let err: TimesyncError = FilterStateCorruption {
            scheme: Scheme::Kalman,
        }
        .into();
        assert_eq!(err.to_string(), "filter state corrupted for scheme Kalman");
    }

    #[test]
    fn test_error_is_fatal() {
        assert!(!TimesyncError::Packet(PacketError::UnknownScheme(9)).is_fatal());
        assert!(TimesyncError::Shutdown.is_fatal());

        let reset = io::Error::new(io::ErrorKind::ConnectionReset, "icmp");
        assert!(!TimesyncError::Transport(reset).is_fatal());

        let closed = io::Error::new(io::ErrorKind::NotConnected, "closed");
        assert!(TimesyncError::Transport(closed).is_fatal());
    }

    #[test]
    fn test_unlisted_io_kinds_are_transient() {
        for kind in [
            io::ErrorKind::Other,
            io::ErrorKind::InvalidData,
            io::ErrorKind::OutOfMemory,
            io::ErrorKind::ConnectionRefused,
            io::ErrorKind::Interrupted,
        ] {
            assert!(!is_fatal_io(&io::Error::new(kind, "datagram")), "{kind:?}");
        }
        // WSAEMSGSIZE has no named kind
        assert!(!is_fatal_io(&io::Error::from_raw_os_error(10040)));
    }

    #[test]
    fn test_dead_socket_kinds_are_fatal() {
        for kind in [
            io::ErrorKind::NotConnected,
            io::ErrorKind::BrokenPipe,
            io::ErrorKind::ConnectionAborted,
        ] {
            assert!(is_fatal_io(&io::Error::new(kind, "socket")), "{kind:?}");
        }
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::AddrInUse, "in use");
        let err: TimesyncError = io_err.into();

        assert!(matches!(err, TimesyncError::Transport(_)));
    }

    #[test]
    fn test_error_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TimesyncError>();
    }
}
