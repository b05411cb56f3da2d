use crate::filter::{Sample, now_micros, raw_offset, to_wire_micros};

#[test]
fn test_raw_offset_positive() {
    assert_eq!(raw_offset(1_000_000, 1_000_050), 50);
}

#[test]
fn test_raw_offset_negative() {
    assert_eq!(raw_offset(1_000_050, 1_000_000), -50);
}

#[test]
fn test_raw_offset_saturates() {
    assert_eq!(raw_offset(0, u64::MAX), i64::MAX);
    assert_eq!(raw_offset(u64::MAX, 0), i64::MIN);
}

#[test]
fn test_sample_from_timestamps() {
    let sample = Sample::from_timestamps(1_000_000, 1_000_050);
    assert!((sample.raw_offset_us - 50.0).abs() < f64::EPSILON);
    assert_eq!(sample.received_at_us, 1_000_050);
}

#[test]
fn test_to_wire_micros_rounds() {
    assert_eq!(to_wire_micros(99.5), 100);
    assert_eq!(to_wire_micros(-99.5), -100);
    assert_eq!(to_wire_micros(42.49), 42);
}

#[test]
fn test_to_wire_micros_saturates() {
    assert_eq!(to_wire_micros(1e300), i64::MAX);
    assert_eq!(to_wire_micros(-1e300), i64::MIN);
    assert_eq!(to_wire_micros(f64::NAN), 0);
}

#[test]
fn test_now_micros_advances() {
    let a = now_micros();
    let b = now_micros();
    assert!(a > 1_600_000_000_000_000);
    assert!(b >= a);
}
