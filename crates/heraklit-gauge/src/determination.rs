//! **Determination** — the memoized piecewise-linear forecast of a gauge.
//!
//! A determination is an ordered run of `(time, value)` breakpoints from the
//! gauge's base time onward, plus the velocity that survives past the last
//! breakpoint. Every query (`get`, `velocity`, `goal`, crossing times) is
//! interpolation or extrapolation over that run; nothing is re-simulated per
//! query.
//!
//! The forecast is produced by [`determine`]: a single forward pass over the
//! momentum change events, racing the value's free velocity against the
//! ceiling and floor boundaries. While the value rides a boundary it tracks
//! that boundary's own slope and detaches the instant its free velocity
//! points back inside.

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::boundary::Boundary;
use crate::line::Line;
use crate::momentum::{Momentum, Timeline};

/// Tolerance for missed-crossing detection at boundary piece junctions.
/// Disagreements below this are rounding noise and left alone.
pub(crate) const EPSILON: f64 = 1e-9;

// ─────────────────────────────────────────────
// Determination
// ─────────────────────────────────────────────

/// Cached forecast: breakpoints with strictly increasing times, the
/// trailing velocity, and the instant from which the forecast is known to
/// sit inside its bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Determination {
    points: Vec<(f64, f64)>,
    final_velocity: f64,
    inside_since: Option<f64>,
}

impl Determination {
    pub(crate) fn from_parts(
        points: Vec<(f64, f64)>,
        final_velocity: f64,
        inside_since: Option<f64>,
    ) -> Self {
        debug_assert!(!points.is_empty());
        debug_assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
        Self {
            points,
            final_velocity,
            inside_since,
        }
    }

    /// The recorded breakpoints. Never empty — the base point is always
    /// the first entry.
    pub fn points(&self) -> &[(f64, f64)] {
        &self.points
    }

    /// Slope of the forecast past the last breakpoint.
    pub fn final_velocity(&self) -> f64 {
        self.final_velocity
    }

    /// Earliest time from which the forecast stays inside the bounds that
    /// were current while it was computed. `None` when the run ends outside.
    pub fn inside_since(&self) -> Option<f64> {
        self.inside_since
    }

    /// Predicted value at `at`. Before the first breakpoint the first value
    /// holds (no retroactive simulation); past the last breakpoint the
    /// trailing velocity extrapolates.
    pub fn get(&self, at: f64) -> f64 {
        let (first_time, first_value) = self.points[0];
        if at <= first_time {
            return first_value;
        }
        let idx = self.points.partition_point(|p| p.0 <= at);
        if idx == self.points.len() {
            let (t, v) = self.points[idx - 1];
            if self.final_velocity == 0.0 {
                v
            } else {
                v + self.final_velocity * (at - t)
            }
        } else {
            let (t0, v0) = self.points[idx - 1];
            let (t1, v1) = self.points[idx];
            v0 + (v1 - v0) / (t1 - t0) * (at - t0)
        }
    }

    /// Rate of change at `at`: the slope of the piece covering `at`,
    /// right-continuous at breakpoints. Zero before the base point.
    pub fn velocity(&self, at: f64) -> f64 {
        if at < self.points[0].0 {
            return 0.0;
        }
        let idx = self.points.partition_point(|p| p.0 <= at);
        if idx == self.points.len() {
            self.final_velocity
        } else {
            let (t0, v0) = self.points[idx - 1];
            let (t1, v1) = self.points[idx];
            (v1 - v0) / (t1 - t0)
        }
    }

    /// Value at the last breakpoint — the end state once all momenta have
    /// played out.
    pub fn goal(&self) -> f64 {
        self.points[self.points.len() - 1].1
    }
}

// ─────────────────────────────────────────────
// Crossing times
// ─────────────────────────────────────────────

/// Iterator over every instant the forecast equals a probe value, in
/// chronological order. Pieces parallel to the probe (a flat stretch lying
/// exactly on it) contribute no crossing, mirroring
/// [`Line::intersect`](crate::line::Line::intersect)'s `Parallel` rule.
#[derive(Debug, Clone)]
pub struct Crossings {
    forecast: Rc<Determination>,
    value: f64,
    piece: usize,
    last: Option<f64>,
}

impl Crossings {
    pub(crate) fn new(forecast: Rc<Determination>, value: f64) -> Self {
        Self {
            forecast,
            value,
            piece: 0,
            last: None,
        }
    }
}

impl Iterator for Crossings {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        loop {
            let points = self.forecast.points();
            if self.piece >= points.len() {
                return None;
            }
            let candidate = if self.piece + 1 < points.len() {
                let (t0, v0) = points[self.piece];
                let (t1, v1) = points[self.piece + 1];
                let slope = (v1 - v0) / (t1 - t0);
                if slope == 0.0 {
                    None
                } else {
                    let t = t0 + (self.value - v0) / slope;
                    (t >= t0 && t <= t1).then_some(t)
                }
            } else {
                // trailing ray
                let (t0, v0) = points[self.piece];
                let slope = self.forecast.final_velocity();
                if slope == 0.0 {
                    None
                } else {
                    let t = t0 + (self.value - v0) / slope;
                    (t >= t0).then_some(t)
                }
            };
            self.piece += 1;
            if let Some(t) = candidate {
                // adjacent pieces share endpoints; yield each instant once
                if self.last != Some(t) {
                    self.last = Some(t);
                    return Some(t);
                }
            }
        }
    }
}

// ─────────────────────────────────────────────
// Momentum events
// ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum EventKind {
    Add,
    Remove,
}

/// Merge each momentum's window edges into one chronological stream.
/// Windows already over by `base_time` contribute nothing; windows opened
/// in the past activate exactly at `base_time`.
fn momentum_events(base_time: f64, momenta: &Timeline) -> Vec<(f64, EventKind, Momentum)> {
    let mut events = Vec::with_capacity(momenta.len() * 2);
    for &m in momenta.iter() {
        if m.until <= base_time {
            continue;
        }
        events.push((m.since.max(base_time), EventKind::Add, m));
        events.push((m.until, EventKind::Remove, m));
    }
    events.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
    events
}

// ─────────────────────────────────────────────
// The forward pass
// ─────────────────────────────────────────────

struct Pass {
    bounds: [Boundary; 2],
    active: Vec<Momentum>,
    /// Index into `bounds` while the value rides (or sits beyond) a boundary.
    bound: Option<usize>,
    /// True when the value is exactly on the bound boundary, false when it
    /// sits strictly beyond it (an `Over` write parked out of range).
    overlapped: bool,
    since: f64,
    value: f64,
    points: Vec<(f64, f64)>,
    inside_since: Option<f64>,
}

impl Pass {
    fn free_velocity(&self) -> f64 {
        self.active.iter().map(|m| m.velocity).sum()
    }

    /// Record a breakpoint, folding same-instant refinements into one entry,
    /// and keep the `inside_since` bookkeeping: it marks the first recorded
    /// point inside both bounds and resets on any point outside.
    fn record(&mut self, time: f64, value: f64) {
        match self.points.last_mut() {
            Some(last) if last.0 == time => last.1 = value,
            _ => self.points.push((time, value)),
        }
        let inside =
            !self.bounds[0].excludes(time, value) && !self.bounds[1].excludes(time, value);
        if inside {
            self.inside_since.get_or_insert(time);
        } else {
            self.inside_since = None;
        }
    }

    /// Bind to the first boundary the value currently sits beyond.
    /// Returns true when a new binding was made.
    fn rebind_if_outside(&mut self) -> bool {
        if self.bound.is_some() {
            return false;
        }
        for i in 0..2 {
            if self.bounds[i].excludes(self.since, self.value) {
                self.bound = Some(i);
                self.overlapped = false;
                return true;
            }
        }
        false
    }

    /// Velocity for the next stretch. While bound, the boundary's
    /// aggregator picks between the free-running sum and the boundary's own
    /// slope; the pin releases as soon as the free velocity points strictly
    /// back inside.
    fn effective_velocity(&mut self) -> f64 {
        let free = self.free_velocity();
        match self.bound {
            None => free,
            Some(b) => {
                let slope = self.bounds[b].line().velocity();
                if self.overlapped && self.bounds[b].cmp(free, slope) {
                    self.bound = None;
                    free
                } else {
                    self.bounds[b].best(free, slope)
                }
            }
        }
    }

    /// Simulate from `self.since` up to `until` (the next momentum event,
    /// or `+inf` for the eternal tail), recording every breakpoint strictly
    /// before `until`. Returns the effective velocity of the last stretch.
    fn advance_to(&mut self, until: f64) -> f64 {
        if until <= self.since {
            return self.effective_velocity();
        }
        loop {
            for b in &mut self.bounds {
                b.seek(self.since);
            }
            if self.rebind_if_outside() {
                // the limit jumped past the value; the slope changes here
                let (t, v) = (self.since, self.value);
                self.record(t, v);
            }

            let velocity = self.effective_velocity();
            let stretch = until
                .min(self.bounds[0].line().until())
                .min(self.bounds[1].line().until());
            let ray = Line::ray(self.since, stretch, self.value, velocity);

            // earliest crossing into either boundary wins; a hit at the ray's
            // very start only counts on a fresh outward escape
            let mut hit: Option<(usize, f64, f64)> = None;
            for i in 0..2 {
                if self.bound == Some(i) && self.overlapped {
                    continue;
                }
                if let Ok((t, v)) = ray.intersect(self.bounds[i].line()) {
                    let outward = self.bounds[i].cmp(self.bounds[i].line().velocity(), velocity);
                    let valid = t > self.since
                        || (t == self.since && outward && self.bound.is_none());
                    if valid && hit.map_or(true, |(_, ht, _)| t < ht) {
                        hit = Some((i, t, v));
                    }
                }
            }
            if let Some((i, t, v)) = hit {
                self.record(t, v);
                self.since = t;
                self.value = v;
                self.bound = Some(i);
                self.overlapped = true;
                continue;
            }

            if stretch >= until {
                if until.is_finite() {
                    self.value = ray.extrapolate(until);
                    self.since = until;
                }
                return velocity;
            }

            // a boundary piece expires before the event: cross the junction
            self.value = ray.extrapolate(stretch);
            self.since = stretch;
            for i in 0..2 {
                if self.bounds[i].line().until() <= stretch {
                    if self.bound.is_none() {
                        // missed-crossing robustness: accumulated float error
                        // can hide an intersection; snap to the edge instead
                        // of drifting out of range
                        let edge = self.bounds[i].line().guess(stretch);
                        if self.bounds[i].cmp(edge, self.value)
                            && (self.value - edge).abs() > EPSILON
                        {
                            self.value = edge;
                            self.bound = Some(i);
                            self.overlapped = true;
                        }
                    }
                    self.bounds[i].walk();
                }
            }
            if self.bound.is_some() {
                // tracking a boundary across a junction changes the slope
                let (t, v) = (self.since, self.value);
                self.record(t, v);
            }
        }
    }
}

/// Run the forecasting pass: base point, momentum timeline, and the two
/// boundary cursors produce the full breakpoint run.
pub(crate) fn determine(
    base: (f64, f64),
    momenta: &Timeline,
    ceiling: Boundary,
    floor: Boundary,
) -> Determination {
    let (base_time, base_value) = base;
    let events = momentum_events(base_time, momenta);

    let mut pass = Pass {
        bounds: [ceiling, floor],
        active: Vec::new(),
        bound: None,
        overlapped: false,
        since: base_time,
        value: base_value,
        points: Vec::new(),
        inside_since: None,
    };
    for b in &mut pass.bounds {
        b.seek(base_time);
    }
    pass.rebind_if_outside();
    pass.record(base_time, base_value);

    let mut final_velocity = 0.0;
    for (time, kind, momentum) in events {
        final_velocity = pass.advance_to(time);
        if time.is_finite() {
            let (t, v) = (time, pass.value);
            pass.record(t, v);
            match kind {
                EventKind::Add => pass.active.push(momentum),
                EventKind::Remove => {
                    if let Some(idx) = pass.active.iter().position(|m| *m == momentum) {
                        pass.active.swap_remove(idx);
                    }
                }
            }
        }
    }
    final_velocity = pass.advance_to(f64::INFINITY);

    Determination::from_parts(pass.points, final_velocity, pass.inside_since)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
