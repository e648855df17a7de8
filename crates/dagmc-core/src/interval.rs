//! Real-valued intervals used as proposal domains and prior supports.

use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};

use crate::errors::{ErrorInfo, McmcError};

/// Shape classification of a [`RealInterval`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalKind {
    /// Contains no points.
    Empty,
    /// Contains exactly one point.
    Degenerate,
    /// Finite lower and upper bounds.
    Bounded,
    /// At least one infinite bound.
    Unbounded,
}

/// An interval `[a, b]`, `(a, b)`, `[a, b)` or `(a, b]` on the extended reals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RealInterval {
    /// Lower bound (may be `-inf`).
    pub lower: f64,
    /// Upper bound (may be `+inf`).
    pub upper: f64,
    /// Whether the lower bound is excluded.
    #[serde(default)]
    pub lower_open: bool,
    /// Whether the upper bound is excluded.
    #[serde(default)]
    pub upper_open: bool,
}

impl RealInterval {
    /// The whole real line `(-inf, inf)`.
    pub fn unbounded() -> Self {
        Self {
            lower: f64::NEG_INFINITY,
            upper: f64::INFINITY,
            lower_open: true,
            upper_open: true,
        }
    }

    /// Closed interval `[lower, upper]`.
    pub fn closed(lower: f64, upper: f64) -> Self {
        Self::new(lower, upper, false, false)
    }

    /// Open interval `(lower, upper)`.
    pub fn open(lower: f64, upper: f64) -> Self {
        Self::new(lower, upper, true, true)
    }

    /// Positive half-line `(0, inf)`.
    pub fn positive() -> Self {
        Self::open(0.0, f64::INFINITY)
    }

    /// Creates an interval with explicit openness flags.
    pub fn new(lower: f64, upper: f64, lower_open: bool, upper_open: bool) -> Self {
        Self {
            lower,
            upper,
            lower_open,
            upper_open,
        }
    }

    /// Classifies the interval.
    pub fn kind(&self) -> IntervalKind {
        if self.lower.is_nan() || self.upper.is_nan() || self.lower > self.upper {
            return IntervalKind::Empty;
        }
        if self.lower == self.upper {
            if self.lower_open || self.upper_open {
                return IntervalKind::Empty;
            }
            return IntervalKind::Degenerate;
        }
        if self.lower.is_infinite() || self.upper.is_infinite() {
            IntervalKind::Unbounded
        } else {
            IntervalKind::Bounded
        }
    }

    /// Whether `x` lies within the interval.
    pub fn contains(&self, x: f64) -> bool {
        if x.is_nan() {
            return false;
        }
        let above = if self.lower_open {
            x > self.lower
        } else {
            x >= self.lower
        };
        let below = if self.upper_open {
            x < self.upper
        } else {
            x <= self.upper
        };
        above && below
    }

    /// Width `upper - lower` (infinite for unbounded intervals).
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Rejects empty and degenerate intervals, which cannot host a proposal.
    pub fn ensure_proper(&self, owner: &str) -> Result<(), McmcError> {
        match self.kind() {
            IntervalKind::Empty | IntervalKind::Degenerate => Err(McmcError::Config(
                ErrorInfo::new("invalid-interval", "interval is empty or degenerate")
                    .with_context("owner", owner)
                    .with_context("interval", self.to_string()),
            )),
            _ => Ok(()),
        }
    }
}

impl Default for RealInterval {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl Display for RealInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            if self.lower_open { '(' } else { '[' },
            self.lower,
            self.upper,
            if self.upper_open { ')' } else { ']' }
        )
    }
}
