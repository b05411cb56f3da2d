use crate::filter::{CorrectionFilter, EwmaParams, EwmaState, Sample};

fn sample(raw: f64, at: u64) -> Sample {
    Sample {
        raw_offset_us: raw,
        received_at_us: at,
    }
}

#[test]
fn test_first_sample_initializes() {
    let params = EwmaParams { alpha: 0.5 };
    let (state, out) = EwmaState::default().apply(&params, sample(50.0, 1));

    assert!(state.initialized);
    assert!((out - 50.0).abs() < f64::EPSILON);
    assert!((state.smoothed - 50.0).abs() < f64::EPSILON);
}

#[test]
fn test_second_sample_smooths() {
    let params = EwmaParams { alpha: 0.5 };
    let (state, _) = EwmaState::default().apply(&params, sample(50.0, 1));
    let (_, out) = state.apply(&params, sample(150.0, 2));

    assert!((out - 100.0).abs() < 1e-9);
}

#[test]
fn test_low_alpha_lags_step() {
    let params = EwmaParams { alpha: 0.1 };
    let (mut state, _) = EwmaState::default().apply(&params, sample(0.0, 0));
    let mut out = 0.0;
    for i in 1..=5 {
        (state, out) = state.apply(&params, sample(1000.0, i));
    }
    // 1000 * (1 - 0.9^5)
    assert!((out - 409.51).abs() < 1e-6);
}

#[test]
fn test_apply_does_not_mutate_input() {
    let params = EwmaParams::default();
    let before = EwmaState::default();
    let _ = before.apply(&params, sample(10.0, 0));
    assert!(!before.initialized);
}
