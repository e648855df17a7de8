//! Log-scale representation of non-negative probabilities and likelihoods.

use std::cmp::Ordering;
use std::fmt::{self, Display};
use std::ops::{Div, DivAssign, Mul, MulAssign};

use serde::{Deserialize, Serialize};

/// A non-negative real number stored as its natural logarithm.
///
/// Zero is represented by `ln = -inf`. Products of many small likelihoods
/// stay representable, and multiplication becomes addition of logarithms.
/// Serialises as its logarithm; infinite logarithms are written as the
/// strings `"-inf"` and `"inf"` so JSON stays lossless.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(into = "LnRepr", try_from = "LnRepr")]
pub struct LogDouble {
    ln: f64,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum LnRepr {
    Finite(f64),
    Infinite(String),
}

impl From<LogDouble> for LnRepr {
    fn from(value: LogDouble) -> Self {
        if value.ln.is_finite() {
            LnRepr::Finite(value.ln)
        } else if value.ln > 0.0 {
            LnRepr::Infinite("inf".to_string())
        } else {
            LnRepr::Infinite("-inf".to_string())
        }
    }
}

impl TryFrom<LnRepr> for LogDouble {
    type Error = String;

    fn try_from(repr: LnRepr) -> Result<Self, Self::Error> {
        match repr {
            LnRepr::Finite(ln) => Ok(LogDouble::from_ln(ln)),
            LnRepr::Infinite(text) => match text.as_str() {
                "-inf" => Ok(LogDouble::ZERO),
                "inf" => Ok(LogDouble { ln: f64::INFINITY }),
                other => Err(format!("invalid log-scale value {other:?}")),
            },
        }
    }
}

impl LogDouble {
    /// The value zero.
    pub const ZERO: LogDouble = LogDouble {
        ln: f64::NEG_INFINITY,
    };

    /// The value one.
    pub const ONE: LogDouble = LogDouble { ln: 0.0 };

    /// Creates a value from a non-negative linear-scale number.
    ///
    /// Negative inputs and NaN are mapped to zero.
    pub fn new(value: f64) -> Self {
        if value > 0.0 {
            Self { ln: value.ln() }
        } else {
            Self::ZERO
        }
    }

    /// Creates a value directly from its natural logarithm.
    pub fn from_ln(ln: f64) -> Self {
        if ln.is_nan() {
            Self::ZERO
        } else {
            Self { ln }
        }
    }

    /// Returns the natural logarithm of the value.
    pub fn ln(&self) -> f64 {
        self.ln
    }

    /// Returns the value on linear scale (may underflow to zero).
    pub fn value(&self) -> f64 {
        self.ln.exp()
    }

    /// Whether the value is exactly zero.
    pub fn is_zero(&self) -> bool {
        self.ln == f64::NEG_INFINITY
    }

    /// Whether the value is positive and finite.
    pub fn is_positive_finite(&self) -> bool {
        self.ln.is_finite()
    }

    /// Divides by `other`, returning positive infinity when dividing a
    /// non-zero value by zero and zero for `0 / 0`.
    pub fn div_to_new(&self, other: LogDouble) -> LogDouble {
        if self.is_zero() {
            return LogDouble::ZERO;
        }
        if other.is_zero() {
            return LogDouble {
                ln: f64::INFINITY,
            };
        }
        LogDouble {
            ln: self.ln - other.ln,
        }
    }
}

impl Default for LogDouble {
    fn default() -> Self {
        LogDouble::ONE
    }
}

impl Mul for LogDouble {
    type Output = LogDouble;

    fn mul(self, rhs: LogDouble) -> LogDouble {
        if self.is_zero() || rhs.is_zero() {
            return LogDouble::ZERO;
        }
        LogDouble {
            ln: self.ln + rhs.ln,
        }
    }
}

impl MulAssign for LogDouble {
    fn mul_assign(&mut self, rhs: LogDouble) {
        *self = *self * rhs;
    }
}

impl Div for LogDouble {
    type Output = LogDouble;

    fn div(self, rhs: LogDouble) -> LogDouble {
        self.div_to_new(rhs)
    }
}

impl DivAssign for LogDouble {
    fn div_assign(&mut self, rhs: LogDouble) {
        *self = self.div_to_new(rhs);
    }
}

impl PartialOrd for LogDouble {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.ln.partial_cmp(&other.ln)
    }
}

impl std::iter::Product for LogDouble {
    fn product<I: Iterator<Item = LogDouble>>(iter: I) -> Self {
        iter.fold(LogDouble::ONE, |acc, x| acc * x)
    }
}

impl Display for LogDouble {
    /// Formats the natural logarithm, which is what sample files store.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            write!(f, "-inf")
        } else {
            write!(f, "{}", self.ln)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn products_add_logs() {
        let a = LogDouble::new(0.5);
        let b = LogDouble::new(0.25);
        let p = a * b;
        assert!((p.value() - 0.125).abs() < 1e-15);
        let q: LogDouble = [a, b, LogDouble::ONE].into_iter().product();
        assert_eq!(p, q);
    }

    #[test]
    fn zero_absorbs() {
        assert!((LogDouble::ZERO * LogDouble::new(3.0)).is_zero());
        assert!(LogDouble::new(-1.0).is_zero());
        assert!(LogDouble::from_ln(f64::NAN).is_zero());
        assert!((LogDouble::ZERO / LogDouble::ZERO).is_zero());
        assert_eq!((LogDouble::ONE / LogDouble::ZERO).ln(), f64::INFINITY);
    }

    #[test]
    fn ordering_follows_linear_scale() {
        assert!(LogDouble::new(2.0) > LogDouble::new(1.0));
        assert!(LogDouble::ZERO < LogDouble::new(1e-300));
        assert_eq!(LogDouble::ZERO.to_string(), "-inf");
    }

    #[test]
    fn json_keeps_zero() {
        let json = serde_json::to_string(&[LogDouble::ZERO, LogDouble::ONE]).unwrap();
        assert_eq!(json, r#"["-inf",0.0]"#);
        let back: Vec<LogDouble> = serde_json::from_str(&json).unwrap();
        assert!(back[0].is_zero());
        assert_eq!(back[1], LogDouble::ONE);
    }
}
