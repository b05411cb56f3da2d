//! Wire protocol for offset probes and corrections.
//!
//! Every datagram carries exactly one fixed-size record in network byte
//! order:
//!
//! ```text
//! request   scheme (1) | sequence (4, u32) | client_send_time_us (8, u64)
//! response  scheme (1) | sequence (4, u32) | correction_us (8, i64)
//!           [ | raw_offset_us (8, i64) ]   -- RAW scheme only
//! ```
//!
//! A request whose length differs from [`ProbePacket::SIZE`] or whose
//! scheme byte is outside [`Scheme::ALL`] is rejected with a
//! [`PacketError`].

pub mod packet;
pub mod scheme;

#[cfg(test)]
mod tests;

pub use packet::{CorrectionPacket, PacketError, ProbePacket};
pub use scheme::Scheme;
