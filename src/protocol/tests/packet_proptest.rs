use proptest::prelude::*;

use crate::protocol::{CorrectionPacket, PacketError, ProbePacket, Scheme};

fn any_scheme() -> impl Strategy<Value = Scheme> {
    prop::sample::select(Scheme::ALL.to_vec())
}

proptest! {
    #[test]
    fn test_probe_decode_any_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        // Should not panic, return either Ok or Err
        match ProbePacket::decode(&bytes) {
            Ok(_) => prop_assert_eq!(bytes.len(), ProbePacket::SIZE),
            Err(PacketError::WrongLength { actual, .. }) => prop_assert_eq!(actual, bytes.len()),
            Err(PacketError::UnknownScheme(id)) => prop_assert!(id > 0x03),
        }
    }

    #[test]
    fn test_correction_decode_any_bytes(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
        let _ = CorrectionPacket::decode(&bytes);
    }

    #[test]
    fn test_correction_client_roundtrip(
        scheme in any_scheme(),
        sequence in any::<u32>(),
        correction in any::<i64>(),
    ) {
        let sent = CorrectionPacket::filtered(scheme, sequence, correction);
        let decoded = CorrectionPacket::decode(&sent.encode()).expect("Decode failed");

        prop_assert_eq!(decoded.scheme, scheme);
        prop_assert_eq!(decoded.sequence, sequence);
        prop_assert_eq!(decoded.correction_us, correction);
    }
}
