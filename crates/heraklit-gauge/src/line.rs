//! **Line** — time-bounded linear functions, the atoms of a forecast.
//!
//! Three shapes cover everything the determination pass needs:
//!
//! - [`Line::Horizon`] — constant value over a window.
//! - [`Line::Ray`]     — known start point plus a velocity, open-ended.
//! - [`Line::Segment`] — value interpolated between two known endpoints.
//!
//! `Parallel` and `OutOfWindow` are control-flow signals for the
//! determination pass ("no crossing here, try the next piece"), never
//! user-visible failures.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Internal intersection failures, always recovered by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LineError {
    #[error("parallel lines never meet")]
    Parallel,
    #[error("outside the line's validity window")]
    OutOfWindow,
}

// ─────────────────────────────────────────────
// Line
// ─────────────────────────────────────────────

/// One linear piece of a forecast or a boundary.
///
/// Every variant stores its validity window `[since, until]` and the value
/// at `since`; the variants differ in how the value evolves afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Line {
    /// Constant `value` over the window.
    Horizon { since: f64, until: f64, value: f64 },
    /// `value` at `since`, then `velocity` units per second, forever.
    Ray {
        since: f64,
        until: f64,
        value: f64,
        velocity: f64,
    },
    /// `value` at `since` interpolated linearly to `end` at `until`.
    /// The window must be finite.
    Segment {
        since: f64,
        until: f64,
        value: f64,
        end: f64,
    },
}

impl Line {
    pub fn horizon(since: f64, until: f64, value: f64) -> Self {
        Line::Horizon { since, until, value }
    }

    pub fn ray(since: f64, until: f64, value: f64, velocity: f64) -> Self {
        Line::Ray {
            since,
            until,
            value,
            velocity,
        }
    }

    pub fn segment(since: f64, until: f64, value: f64, end: f64) -> Self {
        Line::Segment {
            since,
            until,
            value,
            end,
        }
    }

    #[inline]
    pub fn since(&self) -> f64 {
        match *self {
            Line::Horizon { since, .. } | Line::Ray { since, .. } | Line::Segment { since, .. } => {
                since
            }
        }
    }

    #[inline]
    pub fn until(&self) -> f64 {
        match *self {
            Line::Horizon { until, .. } | Line::Ray { until, .. } | Line::Segment { until, .. } => {
                until
            }
        }
    }

    /// Value at the start of the window.
    #[inline]
    pub fn start_value(&self) -> f64 {
        match *self {
            Line::Horizon { value, .. } | Line::Ray { value, .. } | Line::Segment { value, .. } => {
                value
            }
        }
    }

    /// Slope of the piece. Zero for a Horizon.
    #[inline]
    pub fn velocity(&self) -> f64 {
        match *self {
            Line::Horizon { .. } => 0.0,
            Line::Ray { velocity, .. } => velocity,
            Line::Segment {
                since,
                until,
                value,
                end,
            } => (end - value) / (until - since),
        }
    }

    /// Value at `at`, failing when `at` leaves the validity window.
    pub fn get(&self, at: f64) -> Result<f64, LineError> {
        if at < self.since() || at > self.until() {
            return Err(LineError::OutOfWindow);
        }
        Ok(self.extrapolate(at))
    }

    /// Like [`Line::get`] but total: outside the window the value clamps to
    /// endpoint semantics — a Horizon stays constant, a Ray is constant
    /// before `since` and keeps its slope after `until`, a Segment holds
    /// whichever endpoint is nearer.
    pub fn guess(&self, at: f64) -> f64 {
        match *self {
            Line::Horizon { value, .. } => value,
            Line::Ray { since, value, .. } => {
                if at < since {
                    value
                } else {
                    self.extrapolate(at)
                }
            }
            Line::Segment {
                since,
                until,
                value,
                end,
            } => {
                if at < since {
                    value
                } else if at > until {
                    end
                } else {
                    self.extrapolate(at)
                }
            }
        }
    }

    /// Evaluate the piece as an infinite line through its anchor point.
    ///
    /// The zero-velocity branch avoids `0 * inf = NaN` for unbounded
    /// Horizons, whose `since` is `-inf`.
    #[inline]
    pub(crate) fn extrapolate(&self, at: f64) -> f64 {
        let velocity = self.velocity();
        if velocity == 0.0 {
            self.start_value()
        } else {
            self.start_value() + velocity * (at - self.since())
        }
    }

    /// Solve the two pieces' infinite-line equations for a common point.
    ///
    /// Fails with `Parallel` on equal slopes and with `OutOfWindow` when
    /// the solution time leaves the overlap of both validity windows
    /// (endpoints inclusive).
    pub fn intersect(&self, other: &Line) -> Result<(f64, f64), LineError> {
        let va = self.velocity();
        let vb = other.velocity();
        if va == vb {
            return Err(LineError::Parallel);
        }

        // Anchor the solve on a sloped piece: its `since` is finite by
        // construction, while an unbounded Horizon's is -inf.
        let (a, b) = if va != 0.0 { (self, other) } else { (other, self) };
        let anchor = a.since();
        let gap = b.extrapolate(anchor) - a.start_value();
        let time = anchor + gap / (a.velocity() - b.velocity());
        if !time.is_finite() {
            return Err(LineError::OutOfWindow);
        }

        let lo = self.since().max(other.since());
        let hi = self.until().min(other.until());
        if time < lo || time > hi {
            return Err(LineError::OutOfWindow);
        }
        Ok((time, a.extrapolate(time)))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const INF: f64 = f64::INFINITY;

    #[test]
    fn horizon_is_flat_everywhere() {
        let h = Line::horizon(0.0, 10.0, 4.0);
        assert_eq!(h.get(5.0), Ok(4.0));
        assert_eq!(h.get(10.5), Err(LineError::OutOfWindow));
        assert_eq!(h.guess(-100.0), 4.0);
        assert_eq!(h.velocity(), 0.0);
    }

    #[test]
    fn unbounded_horizon_has_no_nan() {
        let h = Line::horizon(-INF, INF, 2.0);
        assert_eq!(h.guess(0.0), 2.0);
        assert_eq!(h.extrapolate(1e18), 2.0);
    }

    #[test]
    fn ray_extends_past_until() {
        let r = Line::ray(0.0, 4.0, 1.0, 2.0);
        assert_eq!(r.get(3.0), Ok(7.0));
        assert!(r.get(5.0).is_err(), "get is windowed");
        assert_eq!(r.guess(5.0), 11.0, "guess keeps the slope after until");
        assert_eq!(r.guess(-1.0), 1.0, "guess is constant before since");
    }

    #[test]
    fn segment_interpolates_and_clamps() {
        let s = Line::segment(2.0, 6.0, 10.0, 2.0);
        assert_eq!(s.velocity(), -2.0);
        assert_eq!(s.get(4.0), Ok(6.0));
        assert_eq!(s.guess(0.0), 10.0, "before the window: start endpoint");
        assert_eq!(s.guess(9.0), 2.0, "after the window: end endpoint");
    }

    #[test]
    fn intersect_basic_crossing() {
        let rising = Line::ray(0.0, 10.0, 0.0, 1.0);
        let ceiling = Line::horizon(-INF, INF, 4.0);
        let (t, v) = rising.intersect(&ceiling).expect("must cross");
        assert_eq!((t, v), (4.0, 4.0));
        // symmetric
        let (t2, v2) = ceiling.intersect(&rising).expect("must cross");
        assert_eq!((t2, v2), (4.0, 4.0));
    }

    #[test]
    fn intersect_parallel() {
        let a = Line::ray(0.0, 10.0, 0.0, 1.0);
        let b = Line::ray(0.0, 10.0, 5.0, 1.0);
        assert_eq!(a.intersect(&b), Err(LineError::Parallel));

        let h1 = Line::horizon(-INF, INF, 1.0);
        let h2 = Line::horizon(-INF, INF, 2.0);
        assert_eq!(h1.intersect(&h2), Err(LineError::Parallel));
    }

    #[test]
    fn intersect_outside_window() {
        // crossing at t=4 but the ray ends at t=3
        let rising = Line::ray(0.0, 3.0, 0.0, 1.0);
        let ceiling = Line::horizon(-INF, INF, 4.0);
        assert_eq!(rising.intersect(&ceiling), Err(LineError::OutOfWindow));

        // crossing before the segment begins
        let seg = Line::segment(5.0, 8.0, 5.0, 8.0);
        assert_eq!(seg.intersect(&ceiling), Err(LineError::OutOfWindow));
    }

    #[test]
    fn intersect_window_endpoints_inclusive() {
        let rising = Line::ray(0.0, 4.0, 0.0, 1.0);
        let ceiling = Line::horizon(-INF, INF, 4.0);
        let (t, _) = rising.intersect(&ceiling).expect("endpoint hit counts");
        assert_eq!(t, 4.0);
    }

    #[test]
    fn intersect_two_sloped_pieces() {
        let up = Line::ray(0.0, 10.0, 0.0, 2.0);
        let down = Line::segment(0.0, 10.0, 12.0, 2.0);
        let (t, v) = up.intersect(&down).expect("must cross");
        assert!((t - 4.0).abs() < 1e-12, "expected t=4, got {t}");
        assert!((v - 8.0).abs() < 1e-12, "expected v=8, got {v}");
    }
}
