use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GaugeError {
    #[error("out of range: target {target:.6} escapes [{min:.6}, {max:.6}] at t={at}")]
    OutOfRange {
        target: f64,
        min: f64,
        max: f64,
        at: f64,
    },

    #[error("invalid momentum window: since={since} must precede until={until}")]
    InvalidMomentumWindow { since: f64, until: f64 },

    #[error("momentum not found: {velocity:+}/s over [{since}, {until})")]
    MomentumNotFound {
        velocity: f64,
        since: f64,
        until: f64,
    },

    #[error("goal unreachable: {value} is crossed fewer than {wanted} time(s)")]
    UnreachableGoal { value: f64, wanted: usize },
}
