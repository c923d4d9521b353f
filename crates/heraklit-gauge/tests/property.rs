//! Property tests for the gauge engine.
//!
//! Inputs are drawn on integer grids so every expectation is exact in f64;
//! the asserts still allow rounding headroom.

use heraklit_gauge::{Gauge, Momentum, WritePolicy};
use proptest::prelude::*;

const WIDE: f64 = 1e9;

/// A windowed momentum on an integer grid, never degenerate.
fn momentum_strategy() -> impl Strategy<Value = Momentum> {
    (-10i32..=10, 0i32..40, 1i32..40).prop_map(|(velocity, since, duration)| {
        Momentum::new(velocity as f64)
            .since(since as f64)
            .until((since + duration) as f64)
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64, .. ProptestConfig::default()
    })]

    /// Two gauges fed the identical operation sequence answer identically
    /// for every probe instant.
    #[test]
    fn identical_histories_forecast_identically(
        momenta in prop::collection::vec(momentum_strategy(), 0..8),
        spends in prop::collection::vec((1i32..50, -5i32..=5), 0..4),
        probes in prop::collection::vec(0i32..100, 1..16),
    ) {
        let a = Gauge::new(0.0, WIDE, -WIDE, 0.0);
        let b = Gauge::new(0.0, WIDE, -WIDE, 0.0);
        for g in [&a, &b] {
            for &m in &momenta {
                g.add_momentum(m).unwrap();
            }
            let mut at = 0.0;
            for &(step, delta) in &spends {
                at += step as f64;
                g.incr(delta as f64, WritePolicy::Over, at).unwrap();
            }
        }
        for &t in &probes {
            let t = t as f64;
            prop_assert_eq!(a.get(t), b.get(t), "diverged at t={}", t);
            prop_assert_eq!(a.velocity(t), b.velocity(t));
        }
    }

    /// Away from any boundary, the forecast's velocity is exactly the sum
    /// of the momenta whose half-open window contains the instant.
    #[test]
    fn velocity_is_the_sum_of_active_momenta(
        momenta in prop::collection::vec(momentum_strategy(), 0..10),
        probes in prop::collection::vec(0i32..90, 1..16),
    ) {
        let g = Gauge::new(0.0, WIDE, -WIDE, 0.0);
        for &m in &momenta {
            g.add_momentum(m).unwrap();
        }
        for &t in &probes {
            let t = t as f64;
            let expected: f64 = momenta
                .iter()
                .filter(|m| m.active_at(t))
                .map(|m| m.velocity)
                .sum();
            let got = g.velocity(t);
            prop_assert!(
                (got - expected).abs() < 1e-9,
                "velocity law broken at t={}: expected {}, got {}",
                t, expected, got
            );
        }
    }

    /// Clamped writes keep the value inside the limits at every instant,
    /// whatever momenta are in play.
    #[test]
    fn clamped_writes_never_escape_the_range(
        momenta in prop::collection::vec(momentum_strategy(), 0..8),
        writes in prop::collection::vec((1i32..30, -20i32..=20), 1..6),
        probes in prop::collection::vec(0i32..120, 1..16),
    ) {
        let g = Gauge::new(5.0, 10.0, 0.0, 0.0);
        for &m in &momenta {
            g.add_momentum(m).unwrap();
        }
        let mut at = 0.0;
        for &(step, delta) in &writes {
            at += step as f64;
            g.incr(delta as f64, WritePolicy::Clamp, at).unwrap();
            let value = g.get(at);
            prop_assert!(
                (0.0 - 1e-9..=10.0 + 1e-9).contains(&value),
                "write at t={} left the range: {}",
                at, value
            );
        }
        for &t in &probes {
            let value = g.get(t as f64);
            prop_assert!(
                (0.0 - 1e-9..=10.0 + 1e-9).contains(&value),
                "forecast at t={} left the range: {}",
                t, value
            );
        }
    }

    /// Re-running `invalidate` or re-compacting at the same instant changes
    /// nothing observable.
    #[test]
    fn invalidate_and_forget_past_are_idempotent(
        momenta in prop::collection::vec(momentum_strategy(), 0..8),
        cut in 0i32..50,
        probes in prop::collection::vec(0i32..100, 1..12),
    ) {
        let g = Gauge::new(0.0, WIDE, -WIDE, 0.0);
        for &m in &momenta {
            g.add_momentum(m).unwrap();
        }
        g.forget_past(None, cut as f64);
        let baseline: Vec<f64> = probes.iter().map(|&t| g.get(t as f64)).collect();

        g.invalidate();
        g.invalidate();
        let after_invalidate: Vec<f64> = probes.iter().map(|&t| g.get(t as f64)).collect();
        prop_assert_eq!(&baseline, &after_invalidate);

        g.forget_past(None, cut as f64);
        let after_recompact: Vec<f64> = probes.iter().map(|&t| g.get(t as f64)).collect();
        prop_assert_eq!(&baseline, &after_recompact);
    }
}
