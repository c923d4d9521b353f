//! # heraklit-gauge
//!
//! Deterministic linear gauge engine: a bounded scalar that evolves over
//! time under time-windowed constant velocities, clamped between limits
//! that may themselves be other gauges. Panta rhei — but predictably.
//!
//! Core types:
//! - [`Gauge`]         — the public entity: base point, momenta, limits,
//!   cached forecast, weak dependents for invalidation.
//! - [`Momentum`]      — one `(velocity, since, until)` contribution.
//! - [`Determination`] — the memoized piecewise-linear forecast.
//! - [`Line`] / [`Boundary`] — the math the forecast is built from.
//!
//! Every operation takes an explicit `at` instant instead of consulting a
//! clock, which makes whole scenarios reproducible in tests; [`now`] turns
//! wall time into that instant for callers who do want "now".
//!
//! ```
//! use heraklit_gauge::{Gauge, Momentum, WritePolicy};
//!
//! // a resource budget refilling at 1/s, capped at 10
//! let budget = Gauge::new(0.0, 10.0, 0.0, 0.0);
//! budget.add_momentum(Momentum::new(1.0)).unwrap();
//! assert_eq!(budget.get(4.0), 4.0);
//! assert_eq!(budget.get(60.0), 10.0); // pinned at the ceiling
//!
//! // spend 3 at t=4, then keep refilling
//! budget.incr(-3.0, WritePolicy::Strict, 4.0).unwrap();
//! assert_eq!(budget.get(5.0), 2.0);
//! ```
//!
//! The engine is single-threaded and synchronous; see the crate docs of
//! [`gauge`] for the sharing contract.

pub mod boundary;
pub mod determination;
pub mod error;
pub mod gauge;
pub mod line;
pub mod momentum;

pub use boundary::{Boundary, Side};
pub use determination::{Crossings, Determination};
pub use error::GaugeError;
pub use gauge::{Gauge, Limit, WritePolicy};
pub use line::{Line, LineError};
pub use momentum::{Momentum, Timeline};

/// Seconds since the Unix epoch, as the engine's time scale.
pub fn now() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}
