//! Correction scheme identifiers.

use super::packet::PacketError;

/// Correction algorithm selected by a probe.
///
/// The numeric identifiers are a contract between client and server and
/// travel as the first byte of every request and response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Scheme {
    /// Unfiltered offset, echoed for baseline comparison.
    Raw = 0x00,
    /// Exponentially-weighted moving average.
    Ewma = 0x01,
    /// Scalar Kalman filter.
    Kalman = 0x02,
    /// PID controller.
    Pid = 0x03,
}

impl Scheme {
    /// Every scheme, in identifier order.
    pub const ALL: [Self; 4] = [Self::Raw, Self::Ewma, Self::Kalman, Self::Pid];

    /// Parse a wire identifier.
    ///
    /// # Errors
    /// Returns [`PacketError::UnknownScheme`] for any byte outside the known set.
    pub fn from_id(id: u8) -> Result<Self, PacketError> {
        match id {
            0x00 => Ok(Self::Raw),
            0x01 => Ok(Self::Ewma),
            0x02 => Ok(Self::Kalman),
            0x03 => Ok(Self::Pid),
            other => Err(PacketError::UnknownScheme(other)),
        }
    }

    /// Wire identifier.
    #[must_use]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Whether responses for this scheme carry the raw offset field.
    #[must_use]
    pub fn carries_raw_offset(self) -> bool {
        matches!(self, Self::Raw)
    }
}

impl std::fmt::Display for Scheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "Raw"),
            Self::Ewma => write!(f, "EWMA"),
            Self::Kalman => write!(f, "Kalman"),
            Self::Pid => write!(f, "PID"),
        }
    }
}

impl std::str::FromStr for Scheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(Self::Raw),
            "ewma" => Ok(Self::Ewma),
            "kalman" => Ok(Self::Kalman),
            "pid" => Ok(Self::Pid),
            other => Err(format!(
                "unknown scheme '{other}' (expected raw, ewma, kalman or pid)"
            )),
        }
    }
}
