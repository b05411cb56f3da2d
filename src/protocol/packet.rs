//! Fixed-layout probe and correction records.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::scheme::Scheme;

/// Errors from decoding a datagram.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PacketError {
    /// Datagram length does not match the record size.
    #[error("wrong length: expected {expected} bytes, got {actual}")]
    WrongLength {
        /// Size the record requires.
        expected: usize,
        /// Bytes actually received.
        actual: usize,
    },
    /// Scheme byte outside the known set.
    #[error("unknown scheme id: 0x{0:02X}")]
    UnknownScheme(u8),
}

/// Client → server timing probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbePacket {
    /// Scheme whose correction the client wants back.
    pub scheme: Scheme,
    /// Client-chosen sequence number, echoed in the response.
    pub sequence: u32,
    /// Client clock at send time, microseconds.
    pub client_send_time_us: u64,
}

impl ProbePacket {
    /// Wire size in bytes.
    pub const SIZE: usize = 13;

    /// Create a new probe.
    #[must_use]
    pub fn new(scheme: Scheme, sequence: u32, client_send_time_us: u64) -> Self {
        Self {
            scheme,
            sequence,
            client_send_time_us,
        }
    }

    /// Parse from a datagram.
    ///
    /// # Errors
    /// Returns [`PacketError::WrongLength`] unless `data` is exactly
    /// [`Self::SIZE`] bytes, and [`PacketError::UnknownScheme`] for an
    /// unrecognised scheme byte.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        if data.len() != Self::SIZE {
            return Err(PacketError::WrongLength {
                expected: Self::SIZE,
                actual: data.len(),
            });
        }
        let mut buf = data;
        let scheme = Scheme::from_id(buf.get_u8())?;
        let sequence = buf.get_u32();
        let client_send_time_us = buf.get_u64();
        Ok(Self {
            scheme,
            sequence,
            client_send_time_us,
        })
    }

    /// Encode to bytes.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(Self::SIZE);
        buf.put_u8(self.scheme.id());
        buf.put_u32(self.sequence);
        buf.put_u64(self.client_send_time_us);
        buf.freeze()
    }
}

/// Server → client correction for one probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrectionPacket {
    /// Scheme echoed from the probe.
    pub scheme: Scheme,
    /// Sequence echoed from the probe.
    pub sequence: u32,
    /// Corrected offset produced by the scheme's filter, microseconds.
    pub correction_us: i64,
    /// Unfiltered offset, present only for [`Scheme::Raw`].
    pub raw_offset_us: Option<i64>,
}

impl CorrectionPacket {
    /// Wire size of a filtered-scheme response.
    pub const SIZE: usize = 13;

    /// Wire size of a RAW response (extra raw offset field).
    pub const RAW_SIZE: usize = 21;

    /// Response for the RAW scheme: the correction is the raw offset itself.
    #[must_use]
    pub fn raw(sequence: u32, raw_offset_us: i64) -> Self {
        Self {
            scheme: Scheme::Raw,
            sequence,
            correction_us: raw_offset_us,
            raw_offset_us: Some(raw_offset_us),
        }
    }

    /// Response for a filtered scheme.
    ///
    /// Passing [`Scheme::Raw`] yields the same record as [`Self::raw`].
    #[must_use]
    pub fn filtered(scheme: Scheme, sequence: u32, correction_us: i64) -> Self {
        if scheme.carries_raw_offset() {
            return Self::raw(sequence, correction_us);
        }
        Self {
            scheme,
            sequence,
            correction_us,
            raw_offset_us: None,
        }
    }

    /// Wire size of this record.
    #[must_use]
    pub fn encoded_len(&self) -> usize {
        if self.scheme.carries_raw_offset() {
            Self::RAW_SIZE
        } else {
            Self::SIZE
        }
    }

    /// Encode to bytes. Never fails.
    ///
    /// The raw offset field is written exactly when the scheme is RAW; a
    /// RAW record built without one repeats the correction there.
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u8(self.scheme.id());
        buf.put_u32(self.sequence);
        buf.put_i64(self.correction_us);
        if self.scheme.carries_raw_offset() {
            buf.put_i64(self.raw_offset_us.unwrap_or(self.correction_us));
        }
        buf.freeze()
    }

    /// Parse a response on the client side.
    ///
    /// # Errors
    /// Returns [`PacketError::UnknownScheme`] for an unrecognised scheme
    /// byte and [`PacketError::WrongLength`] when the length does not match
    /// the size implied by the scheme.
    pub fn decode(data: &[u8]) -> Result<Self, PacketError> {
        let Some(&id) = data.first() else {
            return Err(PacketError::WrongLength {
                expected: Self::SIZE,
                actual: 0,
            });
        };
        let scheme = Scheme::from_id(id)?;
        let expected = if scheme.carries_raw_offset() {
            Self::RAW_SIZE
        } else {
            Self::SIZE
        };
        if data.len() != expected {
            return Err(PacketError::WrongLength {
                expected,
                actual: data.len(),
            });
        }

        let mut buf = &data[1..];
        let sequence = buf.get_u32();
        let correction_us = buf.get_i64();
        let raw_offset_us = scheme.carries_raw_offset().then(|| buf.get_i64());
        Ok(Self {
            scheme,
            sequence,
            correction_us,
            raw_offset_us,
        })
    }
}
