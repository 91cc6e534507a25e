//! Unit tests for power curve extraction and merging.

use std::collections::BTreeMap;

use powerlab::metrics::analytics::pdc::{
    compute_session_curve, merge_curves, merge_curves_capped, synthesize_curve, CurveFidelity, PowerCurve,
    MAX_CURVE_SECS,
};

/// Deterministic pseudo-random power trace.
fn trace(len: usize, seed: u64) -> Vec<Option<f64>> {
    let mut state = seed;
    (0..len)
        .map(|i| {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            if i % 97 == 13 {
                None
            } else {
                Some(((state >> 33) % 600) as f64)
            }
        })
        .collect()
}

#[test]
fn test_curve_length_and_first_entry() {
    for (len, seed) in [(1, 1), (45, 2), (900, 3), (4000, 4)] {
        let series = trace(len, seed);
        let curve = compute_session_curve(&series).unwrap();

        assert!(curve.len() <= len.min(MAX_CURVE_SECS));
        let max = series.iter().flatten().cloned().fold(f64::MIN, f64::max);
        assert_eq!(curve.power_at(1), Some(max));
    }
}

#[test]
fn test_no_power_yields_no_curve() {
    assert!(compute_session_curve(&[]).is_none());
    assert!(compute_session_curve(&[None; 120]).is_none());
}

#[test]
fn test_missing_samples_count_as_zero() {
    let series = vec![Some(300.0), None, Some(300.0)];
    let curve = compute_session_curve(&series).unwrap();
    assert_eq!(curve.power_at(3), Some(200.0));
    assert_eq!(curve.power_at(2), Some(150.0));
}

#[test]
fn test_merge_commutative_and_associative() {
    let a = compute_session_curve(&trace(300, 11)).unwrap();
    let b = compute_session_curve(&trace(1200, 12)).unwrap();
    let c = compute_session_curve(&trace(60, 13)).unwrap();

    let ab = merge_curves(&[a.clone(), b.clone()]).unwrap();
    let ba = merge_curves(&[b.clone(), a.clone()]).unwrap();
    assert_eq!(ab, ba);

    let ab_c = merge_curves(&[ab, c.clone()]).unwrap();
    let bc = merge_curves(&[b.clone(), c.clone()]).unwrap();
    let a_bc = merge_curves(&[a.clone(), bc]).unwrap();
    assert_eq!(ab_c, a_bc);

    for input in [&a, &b, &c] {
        for d in 1..=input.len() as u32 {
            let merged = ab_c.power_at(d).unwrap();
            assert!(merged >= input.power_at(d).unwrap());
        }
    }
}

#[test]
fn test_merge_pads_shorter_curves() {
    let short = PowerCurve::from_values(vec![Some(500.0), Some(450.0)], CurveFidelity::Measured);
    let long = PowerCurve::from_values(vec![Some(400.0), Some(380.0), Some(360.0)], CurveFidelity::Measured);

    let merged = merge_curves(&[short, long]).unwrap();
    assert_eq!(merged.values(), &[Some(500.0), Some(450.0), Some(360.0)]);
    assert!(merge_curves(&[]).is_none());
}

#[test]
fn test_merge_cap_and_fidelity() {
    let measured = compute_session_curve(&trace(600, 21)).unwrap();
    let mut best = BTreeMap::new();
    best.insert(60, 350.0);
    let synthetic = synthesize_curve(&best, Some(200.0), 1200).unwrap();

    let merged = merge_curves_capped(&[measured, synthetic], 300).unwrap();
    assert_eq!(merged.len(), 300);
    assert!(merged.is_synthetic());
}
