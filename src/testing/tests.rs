use super::{NetworkSimulator, probe_train};
use crate::protocol::Scheme;

#[test]
fn test_probe_train_layout() {
    let train = probe_train(Scheme::Kalman, 3, 1_000, 250);
    let stamps: Vec<_> = train.iter().map(|p| (p.sequence, p.client_send_time_us)).collect();

    assert_eq!(stamps, vec![(1, 1_000), (2, 1_250), (3, 1_500)]);
    assert!(train.iter().all(|p| p.scheme == Scheme::Kalman));
}

#[test]
fn test_perfect_network_is_identity() {
    let mut sim = NetworkSimulator::perfect(7);
    let delivered = sim.transmit(1..=100);

    assert_eq!(delivered, (1..=100).collect::<Vec<_>>());
}

#[test]
fn test_same_seed_same_delivery() {
    let a = NetworkSimulator::stress_test(42).transmit(0..500);
    let b = NetworkSimulator::stress_test(42).transmit(0..500);

    assert_eq!(a, b);
}

#[test]
fn test_total_loss_delivers_nothing() {
    let mut sim = NetworkSimulator::new(1, 1.0, 0.0, 0.0);
    assert!(sim.transmit(0..50).is_empty());
}

#[test]
fn test_duplicate_everything() {
    let mut sim = NetworkSimulator::new(1, 0.0, 0.0, 1.0);
    assert_eq!(sim.transmit([1, 2]), vec![1, 1, 2, 2]);
}

#[test]
fn test_reorder_everything_swaps_pairs() {
    let mut sim = NetworkSimulator::new(1, 0.0, 1.0, 0.0);
    assert_eq!(sim.transmit([1, 2, 3, 4, 5]), vec![2, 1, 4, 3, 5]);
}

#[test]
fn test_rates_clamped() {
    let sim = NetworkSimulator::new(0, 3.0, -1.0, 0.5);
    assert!((sim.loss_rate - 1.0).abs() < f64::EPSILON);
    assert!(sim.reorder_rate.abs() < f64::EPSILON);
}

#[test]
fn test_stress_reorders_some_sequences() {
    let mut sim = NetworkSimulator::stress_test(3);
    let delivered = sim.transmit(0u32..1_000);

    assert!(delivered.len() < 1_100);
    assert!(delivered.windows(2).any(|w| w[1] <= w[0]));
}
