//! **Boundary** — a forward-only cursor over one side of the legal range.
//!
//! A gauge's ceiling and floor are both "a sequence of [`Line`] pieces plus
//! a comparison direction". Carrying the direction on the cursor (`<`/`min`
//! for a ceiling, `>`/`max` for a floor) lets the determination pass treat
//! both sides as the same code path.

use crate::determination::Determination;
use crate::line::Line;

/// Which side of the range this boundary guards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Ceiling,
    Floor,
}

// ─────────────────────────────────────────────
// Boundary
// ─────────────────────────────────────────────

/// Cursor over a chronological line sequence.
///
/// The sequence always covers `(-inf, +inf)`: it begins and ends with a
/// `Horizon`, so `line()` is total and `walk()` saturates on the last piece
/// instead of running out. Access is strictly forward, matching the single
/// forward pass of the determination algorithm.
#[derive(Debug, Clone)]
pub struct Boundary {
    side: Side,
    lines: Vec<Line>,
    index: usize,
}

impl Boundary {
    pub fn new(side: Side, lines: Vec<Line>) -> Self {
        debug_assert!(!lines.is_empty());
        Self {
            side,
            lines,
            index: 0,
        }
    }

    /// Boundary for a constant limit: one unbounded Horizon.
    pub fn constant(side: Side, value: f64) -> Self {
        Self::new(
            side,
            vec![Line::horizon(f64::NEG_INFINITY, f64::INFINITY, value)],
        )
    }

    /// Boundary backed by another gauge's forecast: a Horizon up to the
    /// first breakpoint, one Segment per consecutive breakpoint pair, and a
    /// trailing Horizon holding the last breakpoint's value.
    pub fn over_forecast(side: Side, forecast: &Determination) -> Self {
        let points = forecast.points();
        let (first_time, first_value) = points[0];
        let (last_time, last_value) = points[points.len() - 1];

        let mut lines = Vec::with_capacity(points.len() + 1);
        lines.push(Line::horizon(f64::NEG_INFINITY, first_time, first_value));
        for pair in points.windows(2) {
            let (t0, v0) = pair[0];
            let (t1, v1) = pair[1];
            lines.push(Line::segment(t0, t1, v0, v1));
        }
        lines.push(Line::horizon(last_time, f64::INFINITY, last_value));
        Self::new(side, lines)
    }

    pub fn side(&self) -> Side {
        self.side
    }

    /// The piece under the cursor.
    #[inline]
    pub fn line(&self) -> &Line {
        &self.lines[self.index]
    }

    /// Advance to the next piece; saturates on the trailing Horizon.
    pub fn walk(&mut self) {
        if self.index + 1 < self.lines.len() {
            self.index += 1;
        }
    }

    /// Advance until the current piece's window reaches past `at`.
    pub fn seek(&mut self, at: f64) {
        while self.line().until() <= at && self.index + 1 < self.lines.len() {
            self.index += 1;
        }
    }

    /// "`x` is strictly inside of `y`": `<` for a ceiling, `>` for a floor.
    #[inline]
    pub fn cmp(&self, x: f64, y: f64) -> bool {
        match self.side {
            Side::Ceiling => x < y,
            Side::Floor => x > y,
        }
    }

    /// The more restrictive of two candidates: `min` for a ceiling,
    /// `max` for a floor.
    #[inline]
    pub fn best(&self, x: f64, y: f64) -> f64 {
        match self.side {
            Side::Ceiling => x.min(y),
            Side::Floor => x.max(y),
        }
    }

    /// True when `value` lies strictly beyond this boundary at `at`,
    /// judged against the current piece.
    #[inline]
    pub fn excludes(&self, at: f64, value: f64) -> bool {
        self.cmp(self.line().guess(at), value)
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
