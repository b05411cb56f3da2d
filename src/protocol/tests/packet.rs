use crate::protocol::{CorrectionPacket, PacketError, ProbePacket, Scheme};

// ===== ProbePacket =====

#[test]
fn test_probe_wire_layout() {
    let probe = ProbePacket::new(Scheme::Ewma, 0x0102_0304, 1_000_000);
    let bytes = probe.encode();

    assert_eq!(bytes.len(), ProbePacket::SIZE);
    assert_eq!(bytes[0], 0x01);
    assert_eq!(&bytes[1..5], &[0x01, 0x02, 0x03, 0x04]);
    assert_eq!(&bytes[5..13], &1_000_000u64.to_be_bytes());
}

#[test]
fn test_probe_decode() {
    let mut data = vec![0x02];
    data.extend_from_slice(&7u32.to_be_bytes());
    data.extend_from_slice(&123_456_789u64.to_be_bytes());

    let probe = ProbePacket::decode(&data).unwrap();
    assert_eq!(probe.scheme, Scheme::Kalman);
    assert_eq!(probe.sequence, 7);
    assert_eq!(probe.client_send_time_us, 123_456_789);
}

#[test]
fn test_probe_decode_too_short() {
    let err = ProbePacket::decode(&[0x01, 0x00, 0x00]).unwrap_err();
    assert_eq!(
        err,
        PacketError::WrongLength {
            expected: 13,
            actual: 3
        }
    );
}

#[test]
fn test_probe_decode_too_long() {
    let mut data = ProbePacket::new(Scheme::Pid, 1, 1).encode().to_vec();
    data.push(0);
    assert!(matches!(
        ProbePacket::decode(&data),
        Err(PacketError::WrongLength { actual: 14, .. })
    ));
}

#[test]
fn test_probe_decode_empty() {
    assert!(matches!(
        ProbePacket::decode(&[]),
        Err(PacketError::WrongLength { actual: 0, .. })
    ));
}

#[test]
fn test_probe_decode_unknown_scheme() {
    let mut data = ProbePacket::new(Scheme::Ewma, 1, 1).encode().to_vec();
    data[0] = 0x09;
    assert_eq!(
        ProbePacket::decode(&data),
        Err(PacketError::UnknownScheme(0x09))
    );
}

// ===== CorrectionPacket =====

#[test]
fn test_filtered_response_layout() {
    let resp = CorrectionPacket::filtered(Scheme::Kalman, 42, -150);
    let bytes = resp.encode();

    assert_eq!(bytes.len(), CorrectionPacket::SIZE);
    assert_eq!(bytes[0], 0x02);
    assert_eq!(&bytes[1..5], &42u32.to_be_bytes());
    assert_eq!(&bytes[5..13], &(-150i64).to_be_bytes());
}

#[test]
fn test_raw_response_layout() {
    let resp = CorrectionPacket::raw(9, 50);
    let bytes = resp.encode();

    assert_eq!(bytes.len(), CorrectionPacket::RAW_SIZE);
    assert_eq!(bytes[0], 0x00);
    assert_eq!(&bytes[5..13], &50i64.to_be_bytes());
    assert_eq!(&bytes[13..21], &50i64.to_be_bytes());
}

#[test]
fn test_filtered_with_raw_scheme_is_raw_record() {
    let resp = CorrectionPacket::filtered(Scheme::Raw, 3, 77);
    assert_eq!(resp, CorrectionPacket::raw(3, 77));
    assert_eq!(resp.encoded_len(), CorrectionPacket::RAW_SIZE);
}

#[test]
fn test_raw_record_without_raw_field_still_encodes() {
    let resp = CorrectionPacket {
        scheme: Scheme::Raw,
        sequence: 1,
        correction_us: -12,
        raw_offset_us: None,
    };
    let decoded = CorrectionPacket::decode(&resp.encode()).unwrap();
    assert_eq!(decoded.raw_offset_us, Some(-12));
}

#[test]
fn test_client_side_decode_recovers_fields() {
    let resp = CorrectionPacket::filtered(Scheme::Pid, u32::MAX, i64::MIN);
    let decoded = CorrectionPacket::decode(&resp.encode()).unwrap();

    assert_eq!(decoded.scheme, Scheme::Pid);
    assert_eq!(decoded.sequence, u32::MAX);
    assert_eq!(decoded.correction_us, i64::MIN);
    assert_eq!(decoded.raw_offset_us, None);
}

#[test]
fn test_response_decode_length_depends_on_scheme() {
    // A 13-byte record claiming RAW is missing its raw offset field.
    let mut data = CorrectionPacket::filtered(Scheme::Ewma, 1, 1).encode().to_vec();
    data[0] = Scheme::Raw.id();
    assert_eq!(
        CorrectionPacket::decode(&data),
        Err(PacketError::WrongLength {
            expected: 21,
            actual: 13
        })
    );
}

#[test]
fn test_response_decode_empty() {
    assert!(CorrectionPacket::decode(&[]).is_err());
}
