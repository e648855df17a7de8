use std::collections::BTreeMap;
use std::fmt::Write as _;

use dagmc_core::McmcError;
use serde::{Deserialize, Serialize};

use crate::dependent::InfoProvider;
use crate::iteration::Iteration;

/// Accepted and rejected proposal counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptCounts {
    /// Accepted proposals.
    pub accepted: u64,
    /// Rejected proposals.
    pub rejected: u64,
}

impl AcceptCounts {
    /// Total number of proposals.
    pub fn total(&self) -> u64 {
        self.accepted + self.rejected
    }

    /// Fraction accepted, or NaN when nothing was proposed.
    pub fn ratio(&self) -> f64 {
        self.accepted as f64 / self.total() as f64
    }

    fn bump(&mut self, accepted: bool) {
        if accepted {
            self.accepted += 1;
        } else {
            self.rejected += 1;
        }
    }
}

/// Acceptance bookkeeping for one proposer.
///
/// Optionally keeps counts per time window and per free-form category (for
/// instance the number of perturbed sub-parameters). Every recorded outcome
/// lands in exactly one window, so window counts always sum to the totals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProposerStatistics {
    totals: AcceptCounts,
    by_category: BTreeMap<String, AcceptCounts>,
    windows: Vec<AcceptCounts>,
    current_window: usize,
}

impl ProposerStatistics {
    /// Coarse statistics without windows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Statistics with `windows` equally sized time windows.
    pub fn windowed(windows: usize) -> Result<Self, McmcError> {
        if windows == 0 {
            return Err(McmcError::config(
                "statistics-windows",
                "windowed statistics need at least one window",
            ));
        }
        Ok(Self {
            windows: vec![AcceptCounts::default(); windows],
            ..Self::default()
        })
    }

    /// Moves to the window covering the current iteration.
    pub fn iteration_advanced(&mut self, iteration: &Iteration) {
        let count = self.windows.len();
        if count == 0 {
            return;
        }
        let position = iteration.current() as f64 / iteration.total() as f64 * count as f64;
        self.current_window = (position.floor() as usize).min(count - 1);
    }

    /// Records one outcome.
    pub fn record(&mut self, accepted: bool, category: Option<&str>) {
        self.totals.bump(accepted);
        if let Some(window) = self.windows.get_mut(self.current_window) {
            window.bump(accepted);
        }
        if let Some(category) = category {
            self.by_category
                .entry(category.to_string())
                .or_default()
                .bump(accepted);
        }
    }

    /// Overall counts.
    pub fn totals(&self) -> AcceptCounts {
        self.totals
    }

    /// Overall acceptance ratio.
    pub fn acceptance_ratio(&self) -> f64 {
        self.totals.ratio()
    }

    /// Counts per window; empty for coarse statistics.
    pub fn windows(&self) -> &[AcceptCounts] {
        &self.windows
    }

    /// Window outcomes are currently recorded into.
    pub fn current_window(&self) -> usize {
        self.current_window
    }

    /// Counts per category.
    pub fn categories(&self) -> &BTreeMap<String, AcceptCounts> {
        &self.by_category
    }
}

impl InfoProvider for ProposerStatistics {
    fn post_info(&self, prefix: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{prefix}PROPOSER STATISTICS");
        let _ = writeln!(
            out,
            "{prefix}Acceptance ratio: {}/{} = {}",
            self.totals.accepted,
            self.totals.total(),
            self.acceptance_ratio()
        );
        if !self.by_category.is_empty() {
            let _ = writeln!(out, "{prefix}Acceptance ratios per category:");
            for (category, counts) in &self.by_category {
                let _ = writeln!(
                    out,
                    "{prefix}\t{category}: {}/{} = {}",
                    counts.accepted,
                    counts.total(),
                    counts.ratio()
                );
            }
        }
        if !self.windows.is_empty() {
            let _ = writeln!(out, "{prefix}Acceptance ratios per window:");
            for (idx, counts) in self.windows.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "{prefix}\t{}: {}/{} = {}",
                    idx + 1,
                    counts.accepted,
                    counts.total(),
                    counts.ratio()
                );
            }
        }
        out
    }
}
