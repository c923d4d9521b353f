//! **Gauge** — a bounded, time-varying scalar with a deterministic forecast.
//!
//! A gauge owns a base point (the last exactly-known value), a timeline of
//! momenta, and a ceiling and floor that are either constants or other
//! gauges. Reads are answered from a lazily rebuilt [`Determination`];
//! writes invalidate it and cascade the invalidation through the weak
//! dependent set, so a gauge used as somebody's limit never keeps its
//! dependents alive and never serves them stale forecasts.
//!
//! Everything is single-threaded by contract: handles are `Rc`-backed and
//! cheap to clone, and callers serialize access externally if they must
//! share a link graph across threads.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use tracing::{debug, trace};
use uuid::Uuid;

use crate::boundary::{Boundary, Side};
use crate::determination::{determine, Crossings, Determination};
use crate::error::GaugeError;
use crate::momentum::{Momentum, Timeline};

// ─────────────────────────────────────────────
// Write policy
// ─────────────────────────────────────────────

/// How a write reacts to its limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Refuse with [`GaugeError::OutOfRange`] when the target escapes the
    /// limit in the direction of travel.
    #[default]
    Strict,
    /// Pin the target to the nearest feasible value. Clamping never drags
    /// the value back past where it already was.
    Clamp,
    /// Accept the target unconditionally, even out of range.
    Over,
}

// ─────────────────────────────────────────────
// Limit
// ─────────────────────────────────────────────

/// One side of a gauge's legal range: a constant, or another gauge whose
/// own forecast becomes the boundary.
#[derive(Clone)]
pub enum Limit {
    Fixed(f64),
    Linked(Gauge),
}

impl Limit {
    /// The limit's value at `at`.
    pub fn value_at(&self, at: f64) -> f64 {
        match self {
            Limit::Fixed(value) => *value,
            Limit::Linked(gauge) => gauge.get(at),
        }
    }

    fn boundary(&self, side: Side) -> Boundary {
        match self {
            Limit::Fixed(value) => Boundary::constant(side, *value),
            Limit::Linked(gauge) => Boundary::over_forecast(side, &gauge.determination()),
        }
    }
}

impl From<f64> for Limit {
    fn from(value: f64) -> Self {
        Limit::Fixed(value)
    }
}

impl From<Gauge> for Limit {
    fn from(gauge: Gauge) -> Self {
        Limit::Linked(gauge)
    }
}

impl From<&Gauge> for Limit {
    fn from(gauge: &Gauge) -> Self {
        Limit::Linked(gauge.clone())
    }
}

impl fmt::Debug for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Fixed(value) => write!(f, "Fixed({value})"),
            Limit::Linked(gauge) => write!(f, "Linked({})", gauge.id()),
        }
    }
}

// ─────────────────────────────────────────────
// Gauge
// ─────────────────────────────────────────────

struct Inner {
    id: Uuid,
    base: (f64, f64),
    momenta: Timeline,
    max: Limit,
    min: Limit,
    determination: Option<Rc<Determination>>,
    /// Gauges that use this one as a limit. Weak: a limit must not keep
    /// its dependents alive. Dead entries are pruned lazily.
    linked: Vec<Weak<RefCell<Inner>>>,
}

/// Cheaply cloneable handle to one gauge. Clones share state.
#[derive(Clone)]
pub struct Gauge {
    inner: Rc<RefCell<Inner>>,
}

impl Gauge {
    /// A gauge knowing `value` exactly at `at`, with an empty momentum set
    /// and no cached forecast.
    pub fn new(value: f64, max: impl Into<Limit>, min: impl Into<Limit>, at: f64) -> Gauge {
        let max = max.into();
        let min = min.into();
        let gauge = Gauge {
            inner: Rc::new(RefCell::new(Inner {
                id: Uuid::new_v4(),
                base: (at, value),
                momenta: Timeline::new(),
                max: max.clone(),
                min: min.clone(),
                determination: None,
                linked: Vec::new(),
            })),
        };
        if let Limit::Linked(limit) = &max {
            limit.register_dependent(&gauge);
        }
        if let Limit::Linked(limit) = &min {
            limit.register_dependent(&gauge);
        }
        gauge
    }

    pub fn id(&self) -> Uuid {
        self.inner.borrow().id
    }

    /// The `(time, value)` point the forecast starts from.
    pub fn base(&self) -> (f64, f64) {
        self.inner.borrow().base
    }

    /// Snapshot of the live momentum set, in expiry order.
    pub fn momenta(&self) -> Vec<Momentum> {
        self.inner.borrow().momenta.iter().copied().collect()
    }

    pub fn max_limit(&self) -> Limit {
        self.inner.borrow().max.clone()
    }

    pub fn min_limit(&self) -> Limit {
        self.inner.borrow().min.clone()
    }

    /// Ceiling value at `at`.
    pub fn max_at(&self, at: f64) -> f64 {
        self.max_limit().value_at(at)
    }

    /// Floor value at `at`.
    pub fn min_at(&self, at: f64) -> f64 {
        self.min_limit().value_at(at)
    }

    // ── forecast queries ────────────────────

    /// Predicted value at `at`. Instants before the base time answer with
    /// the base value — the forecast never simulates backwards.
    pub fn get(&self, at: f64) -> f64 {
        self.determination().get(at)
    }

    /// Predicted rate of change at `at`. While the value rides a boundary
    /// this is the boundary's slope, not the free momentum sum.
    pub fn velocity(&self, at: f64) -> f64 {
        self.determination().velocity(at)
    }

    /// The end state of the forecast: the value at its last breakpoint.
    pub fn goal(&self) -> f64 {
        self.determination().goal()
    }

    /// True when the predicted value respects both limits at `at`.
    pub fn in_range(&self, at: f64) -> bool {
        let value = self.get(at);
        self.min_at(at) <= value && value <= self.max_at(at)
    }

    /// Every future instant the forecast equals `value`, chronologically.
    /// Restartable: each call walks its own snapshot of the cached forecast.
    pub fn whenever(&self, value: f64) -> Crossings {
        Crossings::new(self.determination(), value)
    }

    /// The `(after + 1)`-th instant the forecast equals `value`.
    pub fn when(&self, value: f64, after: usize) -> Result<f64, GaugeError> {
        self.whenever(value)
            .nth(after)
            .ok_or(GaugeError::UnreachableGoal {
                value,
                wanted: after + 1,
            })
    }

    // ── momentum bookkeeping ────────────────

    /// Insert a momentum. Fails when the window has no extent
    /// (`since >= until`). Duplicates are legal and sum.
    pub fn add_momentum(&self, momentum: Momentum) -> Result<Momentum, GaugeError> {
        if !momentum.window_valid() {
            return Err(GaugeError::InvalidMomentumWindow {
                since: momentum.since,
                until: momentum.until,
            });
        }
        self.inner.borrow_mut().momenta.insert(momentum);
        debug!(gauge = %self.id(), velocity = momentum.velocity, "momentum added");
        self.invalidate();
        Ok(momentum)
    }

    /// Remove one exact `(velocity, since, until)` match.
    pub fn remove_momentum(&self, momentum: Momentum) -> Result<Momentum, GaugeError> {
        let removed = self.inner.borrow_mut().momenta.remove(&momentum);
        match removed {
            Some(removed) => {
                self.invalidate();
                Ok(removed)
            }
            None => Err(GaugeError::MomentumNotFound {
                velocity: momentum.velocity,
                since: momentum.since,
                until: momentum.until,
            }),
        }
    }

    /// Drop every momentum, pinning `value` (default: the current
    /// prediction) at `at`.
    pub fn clear_momenta(&self, value: Option<f64>, at: f64) {
        let at = at.max(self.base().0);
        let value = value.unwrap_or_else(|| self.get(at));
        {
            let mut inner = self.inner.borrow_mut();
            inner.momenta.clear();
            inner.base = (at, value);
        }
        self.invalidate();
    }

    /// Compact history up to `at`: dependents rebase first (a limit gauge
    /// is never asked about times before its own knowledge horizon), fully
    /// expired momenta are dropped, and the base moves to
    /// `(at, value | get(at))`. The base time never moves backwards; an
    /// `at` in the past is lifted to the current base time.
    pub fn forget_past(&self, value: Option<f64>, at: f64) {
        let at = at.max(self.base().0);
        for dependent in self.live_dependents() {
            if dependent.base().0 < at {
                dependent.forget_past(None, at);
            }
        }
        let value = value.unwrap_or_else(|| self.get(at));
        {
            let mut inner = self.inner.borrow_mut();
            let dropped = inner.momenta.forget_until(at);
            inner.base = (at, value);
            if dropped > 0 {
                trace!(gauge = %inner.id, dropped, "expired momenta compacted");
            }
        }
        self.invalidate();
    }

    // ── limits ──────────────────────────────

    /// Replace the ceiling. With `clamp`, the current value is rewritten to
    /// respect the new limit at `at` and history is compacted there.
    pub fn set_max(&self, limit: impl Into<Limit>, clamp: bool, at: f64) {
        self.set_limit(Side::Ceiling, limit.into(), clamp, at);
    }

    /// Replace the floor. Same contract as [`Gauge::set_max`].
    pub fn set_min(&self, limit: impl Into<Limit>, clamp: bool, at: f64) {
        self.set_limit(Side::Floor, limit.into(), clamp, at);
    }

    fn set_limit(&self, side: Side, limit: Limit, clamp: bool, at: f64) {
        let old = {
            let mut inner = self.inner.borrow_mut();
            let slot = match side {
                Side::Ceiling => &mut inner.max,
                Side::Floor => &mut inner.min,
            };
            std::mem::replace(slot, limit.clone())
        };
        if let Limit::Linked(gauge) = &old {
            gauge.unregister_dependent(self);
        }
        if let Limit::Linked(gauge) = &limit {
            gauge.register_dependent(self);
        }
        self.invalidate();

        if clamp {
            let at = at.max(self.base().0);
            let value = self.get(at);
            let clamped = value.min(self.max_at(at)).max(self.min_at(at));
            self.forget_past(Some(clamped), at);
        }
    }

    // ── writes ──────────────────────────────

    /// Add `delta` to the prediction at `at` and rebase there. Returns the
    /// written value.
    pub fn incr(&self, delta: f64, policy: WritePolicy, at: f64) -> Result<f64, GaugeError> {
        let at = at.max(self.base().0);
        let prev = self.get(at);
        let mut target = prev + delta;
        match policy {
            WritePolicy::Over => {}
            WritePolicy::Strict => {
                if delta > 0.0 {
                    let max = self.max_at(at);
                    if target > max {
                        return Err(GaugeError::OutOfRange {
                            target,
                            min: self.min_at(at),
                            max,
                            at,
                        });
                    }
                } else if delta < 0.0 {
                    let min = self.min_at(at);
                    if target < min {
                        return Err(GaugeError::OutOfRange {
                            target,
                            min,
                            max: self.max_at(at),
                            at,
                        });
                    }
                }
            }
            WritePolicy::Clamp => {
                // pin to the nearest feasible value, but never reverse
                // progress already made
                if delta > 0.0 {
                    target = target.min(self.max_at(at)).max(prev);
                } else if delta < 0.0 {
                    target = target.max(self.min_at(at)).min(prev);
                }
            }
        }
        self.forget_past(Some(target), at);
        Ok(target)
    }

    /// Subtract `delta`; see [`Gauge::incr`].
    pub fn decr(&self, delta: f64, policy: WritePolicy, at: f64) -> Result<f64, GaugeError> {
        self.incr(-delta, policy, at)
    }

    /// Write an absolute value at `at`. Under [`WritePolicy::Clamp`] the
    /// absolute target is clamped into range before the delta is formed.
    pub fn set(&self, value: f64, policy: WritePolicy, at: f64) -> Result<f64, GaugeError> {
        let at = at.max(self.base().0);
        let prev = self.get(at);
        let target = match policy {
            WritePolicy::Clamp => value.min(self.max_at(at)).max(self.min_at(at)),
            _ => value,
        };
        self.incr(target - prev, policy, at)
    }

    // ── cache & link graph ──────────────────

    /// Drop the cached forecast here and on every live dependent. Idempotent;
    /// an already-stale gauge stops the cascade because its dependents were
    /// invalidated along with it.
    pub fn invalidate(&self) {
        let stale = self.inner.borrow_mut().determination.take();
        if stale.is_none() {
            return;
        }
        trace!(gauge = %self.id(), "forecast invalidated");
        for dependent in self.live_dependents() {
            dependent.invalidate();
        }
    }

    /// The cached forecast, rebuilt on demand.
    fn determination(&self) -> Rc<Determination> {
        if let Some(cached) = self.inner.borrow().determination.clone() {
            return cached;
        }
        // snapshot the inputs so no borrow is held while the limits
        // recursively determine themselves
        let (id, base, momenta, max, min) = {
            let inner = self.inner.borrow();
            (
                inner.id,
                inner.base,
                inner.momenta.clone(),
                inner.max.clone(),
                inner.min.clone(),
            )
        };
        let forecast = Rc::new(determine(
            base,
            &momenta,
            max.boundary(Side::Ceiling),
            min.boundary(Side::Floor),
        ));
        debug!(
            gauge = %id,
            breakpoints = forecast.points().len(),
            "forecast rebuilt"
        );
        self.inner.borrow_mut().determination = Some(Rc::clone(&forecast));
        forecast
    }

    fn register_dependent(&self, dependent: &Gauge) {
        self.inner
            .borrow_mut()
            .linked
            .push(Rc::downgrade(&dependent.inner));
    }

    fn unregister_dependent(&self, dependent: &Gauge) {
        self.inner.borrow_mut().linked.retain(|weak| {
            weak.upgrade()
                .is_some_and(|inner| !Rc::ptr_eq(&inner, &dependent.inner))
        });
    }

    /// Upgrade the weak dependent set, pruning entries whose gauge died.
    fn live_dependents(&self) -> Vec<Gauge> {
        let mut alive = Vec::new();
        self.inner.borrow_mut().linked.retain(|weak| match weak.upgrade() {
            Some(inner) => {
                alive.push(Gauge { inner });
                true
            }
            None => false,
        });
        alive
    }

    #[cfg(test)]
    fn dependent_count(&self) -> usize {
        self.inner.borrow().linked.len()
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Gauge")
            .field("id", &inner.id)
            .field("base", &inner.base)
            .field("momenta", &inner.momenta.len())
            .field("max", &inner.max)
            .field("min", &inner.min)
            .finish()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
