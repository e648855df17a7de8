use dagmc_core::{ErrorInfo, McmcError};
use serde::{Deserialize, Serialize};

use crate::dependent::InfoProvider;
use crate::iteration::Iteration;

/// Scalar steering a proposer kernel, constant or interpolated over the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum TuningParameter {
    /// Fixed value.
    Constant {
        /// The value.
        value: f64,
    },
    /// Moves from `start` towards `end` as `current / total`.
    Linear {
        /// Value at iteration zero.
        start: f64,
        /// Value approached at the final iteration.
        end: f64,
        /// Value after the latest increment.
        #[serde(skip)]
        current: Option<f64>,
    },
}

impl TuningParameter {
    /// Constant tuning parameter.
    pub fn constant(value: f64) -> Self {
        TuningParameter::Constant { value }
    }

    /// Linearly interpolated tuning parameter.
    pub fn linear(start: f64, end: f64) -> Self {
        TuningParameter::Linear {
            start,
            end,
            current: None,
        }
    }

    /// Current value.
    pub fn value(&self) -> f64 {
        match self {
            TuningParameter::Constant { value } => *value,
            TuningParameter::Linear { start, current, .. } => current.unwrap_or(*start),
        }
    }

    /// Smallest value this parameter can take.
    pub fn min_value(&self) -> f64 {
        match self {
            TuningParameter::Constant { value } => *value,
            TuningParameter::Linear { start, end, .. } => start.min(*end),
        }
    }

    /// Largest value this parameter can take.
    pub fn max_value(&self) -> f64 {
        match self {
            TuningParameter::Constant { value } => *value,
            TuningParameter::Linear { start, end, .. } => start.max(*end),
        }
    }

    /// Updates the value after an iteration increment.
    pub fn advance(&mut self, iteration: &Iteration) {
        if let TuningParameter::Linear {
            start,
            end,
            current,
        } = self
        {
            let fraction = iteration.current() as f64 / iteration.total() as f64;
            *current = Some(*start + (*end - *start) * fraction);
        }
    }

    /// Rejects infinite or NaN endpoints.
    pub fn validate(&self, owner: &str) -> Result<(), McmcError> {
        if self.min_value().is_finite() && self.max_value().is_finite() {
            return Ok(());
        }
        Err(McmcError::Config(
            ErrorInfo::new("tuning-range", "tuning parameter must be finite")
                .with_context("owner", owner),
        ))
    }
}

impl InfoProvider for TuningParameter {
    fn pre_info(&self, prefix: &str) -> String {
        match self {
            TuningParameter::Constant { value } => {
                format!("{prefix}CONSTANT TUNING PARAMETER\n{prefix}Value: {value}\n")
            }
            TuningParameter::Linear { start, end, .. } => format!(
                "{prefix}LINEAR TUNING PARAMETER\n{prefix}Value range: {start} to {end}\n"
            ),
        }
    }
}

/// Relative selection weight of a proposer, constant or interpolated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ProposerWeight {
    /// Fixed weight.
    Constant {
        /// The weight.
        weight: f64,
    },
    /// Moves from `start` to `end`, reaching `end` at the final iteration.
    Linear {
        /// Weight at iteration zero.
        start: f64,
        /// Weight at the final iteration.
        end: f64,
        /// Weight after the latest increment.
        #[serde(skip)]
        current: Option<f64>,
    },
}

impl Default for ProposerWeight {
    fn default() -> Self {
        ProposerWeight::constant(1.0)
    }
}

impl ProposerWeight {
    /// Constant weight.
    pub fn constant(weight: f64) -> Self {
        ProposerWeight::Constant { weight }
    }

    /// Linearly interpolated weight.
    pub fn linear(start: f64, end: f64) -> Self {
        ProposerWeight::Linear {
            start,
            end,
            current: None,
        }
    }

    /// Current weight.
    pub fn weight(&self) -> f64 {
        match self {
            ProposerWeight::Constant { weight } => *weight,
            ProposerWeight::Linear { start, current, .. } => current.unwrap_or(*start),
        }
    }

    /// Smallest weight over the run.
    pub fn min_weight(&self) -> f64 {
        match self {
            ProposerWeight::Constant { weight } => *weight,
            ProposerWeight::Linear { start, end, .. } => start.min(*end),
        }
    }

    /// Largest weight over the run.
    pub fn max_weight(&self) -> f64 {
        match self {
            ProposerWeight::Constant { weight } => *weight,
            ProposerWeight::Linear { start, end, .. } => start.max(*end),
        }
    }

    /// Updates the weight after an iteration increment.
    pub fn advance(&mut self, iteration: &Iteration) {
        if let ProposerWeight::Linear {
            start,
            end,
            current,
        } = self
        {
            let span = iteration.total().saturating_sub(1).max(1) as f64;
            let fraction = iteration.current() as f64 / span;
            *current = Some(*start + (*end - *start) * fraction);
        }
    }

    /// Rejects negative or non-finite weights.
    pub fn validate(&self, owner: &str) -> Result<(), McmcError> {
        let (lo, hi) = (self.min_weight(), self.max_weight());
        if lo >= 0.0 && hi.is_finite() {
            return Ok(());
        }
        Err(McmcError::Config(
            ErrorInfo::new("weight-range", "proposer weights must be finite and non-negative")
                .with_context("owner", owner)
                .with_context("min", lo.to_string())
                .with_context("max", hi.to_string()),
        ))
    }
}
