use dagmc_core::{ErrorInfo, McmcError};
use serde::{Deserialize, Serialize};

use crate::dependent::InfoProvider;

/// Loop counter running from an initial value up to `total - 1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Iteration {
    total: u64,
    current: u64,
    notify: bool,
}

impl Iteration {
    /// Counter starting at zero.
    pub fn new(total: u64) -> Result<Self, McmcError> {
        Self::with_initial(total, 0)
    }

    /// Counter starting at `initial`, which must lie in `[0, total)`.
    pub fn with_initial(total: u64, initial: u64) -> Result<Self, McmcError> {
        if initial >= total {
            return Err(McmcError::Config(
                ErrorInfo::new("iteration-range", "initial iteration out of range")
                    .with_context("total", total.to_string())
                    .with_context("initial", initial.to_string()),
            ));
        }
        Ok(Self {
            total,
            current: initial,
            notify: true,
        })
    }

    /// Total number of iterations, including iteration zero.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Current iteration.
    pub fn current(&self) -> u64 {
        self.current
    }

    /// Advances the counter; returns `false` once the last iteration was reached.
    pub fn increment(&mut self) -> bool {
        if self.current + 1 >= self.total {
            return false;
        }
        self.current += 1;
        true
    }

    /// Whether listeners are told about increments.
    pub fn notifies(&self) -> bool {
        self.notify
    }

    /// Mutes or unmutes listeners, returning the previous setting.
    pub fn set_notify(&mut self, notify: bool) -> bool {
        std::mem::replace(&mut self.notify, notify)
    }
}

impl InfoProvider for Iteration {
    fn pre_info(&self, prefix: &str) -> String {
        format!(
            "{prefix}ITERATION\n{prefix}Number of iterations: {}\n{prefix}Initial iteration: {}\n",
            self.total, self.current
        )
    }

    fn post_info(&self, prefix: &str) -> String {
        format!(
            "{prefix}ITERATION\n{prefix}Final iteration: {}\n",
            self.current
        )
    }
}

/// Decides which iterations are written to the sample output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thinner {
    period: u64,
    burn_in: u64,
}

impl Thinner {
    /// Samples every `period`-th iteration from `burn_in` on.
    pub fn new(period: u64, burn_in: u64) -> Result<Self, McmcError> {
        if period == 0 {
            return Err(McmcError::config("thinning", "thinning period must be positive"));
        }
        Ok(Self { period, burn_in })
    }

    /// Sampling period.
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Iterations skipped before sampling starts.
    pub fn burn_in(&self) -> u64 {
        self.burn_in
    }

    /// Whether the current iteration is a sample point.
    pub fn do_sample(&self, iteration: &Iteration) -> bool {
        let current = iteration.current();
        current >= self.burn_in && current % self.period == 0
    }
}

impl InfoProvider for Thinner {
    fn pre_info(&self, prefix: &str) -> String {
        format!(
            "{prefix}THINNER\n{prefix}Thinning factor: {}\n{prefix}Burn-in: {}\n",
            self.period, self.burn_in
        )
    }
}
