use std::collections::BTreeSet;

use dagmc_core::{ErrorInfo, McmcError, RngHandle};

use crate::dependent::InfoProvider;
use crate::graph::NodeId;

const DEFAULT_MAX_ATTEMPTS: usize = 100;

/// What a selector needs to know about one proposer.
#[derive(Debug, Clone, Copy)]
pub struct ProposerCandidate<'a> {
    /// Parameters the proposer perturbs.
    pub parameters: &'a [NodeId],
    /// Current selection weight.
    pub weight: f64,
    /// Whether the proposer may be selected.
    pub enabled: bool,
}

/// Picks, each iteration, the proposers to apply.
pub trait ProposerSelector: InfoProvider {
    /// Returns indices into `candidates` whose parameter sets are pairwise
    /// disjoint. The result is never empty.
    fn select(
        &mut self,
        candidates: &[ProposerCandidate<'_>],
        rng: &mut RngHandle,
    ) -> Result<Vec<usize>, McmcError>;
}

/// Checks a selector's answer: non-empty, in range, no repeats, only enabled
/// proposers and pairwise disjoint parameter sets.
pub fn check_selection(
    selected: &[usize],
    candidates: &[ProposerCandidate<'_>],
) -> Result<(), McmcError> {
    let invalid = |reason: &str| {
        McmcError::State(
            ErrorInfo::new("invalid-selection", "selector returned an unusable selection")
                .with_context("reason", reason)
                .with_context("selected", format!("{selected:?}"))
                .with_context("candidates", candidates.len().to_string()),
        )
    };
    if selected.is_empty() {
        return Err(invalid("empty"));
    }
    let mut picked = vec![false; candidates.len()];
    let mut perturbed = BTreeSet::new();
    for &idx in selected {
        let candidate = candidates.get(idx).ok_or_else(|| invalid("out of range"))?;
        if std::mem::replace(&mut picked[idx], true) {
            return Err(invalid("repeated proposer"));
        }
        if !candidate.enabled {
            return Err(invalid("disabled proposer"));
        }
        if !candidate.parameters.iter().all(|p| perturbed.insert(*p)) {
            return Err(invalid("overlapping parameters"));
        }
    }
    Ok(())
}

/// Selector that first draws how many proposers to use, then draws that many
/// proposers proportionally to their weights, skipping disabled ones and ones
/// overlapping an already selected proposer.
///
/// Gives up after a bounded number of draws, returning fewer proposers than
/// requested but always at least one.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiProposerSelector {
    cumulative: Vec<f64>,
    max_attempts: usize,
}

impl Default for MultiProposerSelector {
    fn default() -> Self {
        Self {
            cumulative: vec![1.0],
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl MultiProposerSelector {
    /// Selector applying exactly one proposer per iteration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Selector where `weights[i]` is the relative weight of applying `i + 1`
    /// proposers at once.
    pub fn with_simultaneous_weights(weights: &[f64]) -> Result<Self, McmcError> {
        if weights.is_empty() {
            return Err(McmcError::config(
                "simultaneous-weights",
                "at least one simultaneous-proposer weight is required",
            ));
        }
        let mut cumulative = Vec::with_capacity(weights.len());
        let mut total = 0.0;
        for &w in weights {
            if !(w >= 0.0 && w.is_finite()) {
                return Err(McmcError::Config(
                    ErrorInfo::new("simultaneous-weights", "weights must be finite and non-negative")
                        .with_context("weight", w.to_string()),
                ));
            }
            total += w;
            cumulative.push(total);
        }
        if total <= 0.0 {
            return Err(McmcError::config(
                "simultaneous-weights",
                "simultaneous-proposer weights must not all be zero",
            ));
        }
        for c in &mut cumulative {
            *c /= total;
        }
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
        Ok(Self {
            cumulative,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        })
    }

    /// Sets the number of draws before giving up on reaching the target count.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Result<Self, McmcError> {
        if max_attempts == 0 {
            return Err(McmcError::config(
                "max-attempts",
                "selector attempt ceiling must be positive",
            ));
        }
        self.max_attempts = max_attempts;
        Ok(self)
    }

    /// Normalised cumulative weights over the number of simultaneous proposers.
    pub fn cumulative_weights(&self) -> &[f64] {
        &self.cumulative
    }

    fn target_count(&self, rng: &mut RngHandle) -> usize {
        if self.cumulative.len() == 1 {
            return 1;
        }
        let draw = rng.next_f64();
        let mut count = 1;
        while count < self.cumulative.len() && draw > self.cumulative[count - 1] {
            count += 1;
        }
        count
    }
}

/// Draws an index proportionally to `weights`; `total` must be positive.
fn weighted_pick(weights: impl Iterator<Item = f64>, total: f64, rng: &mut RngHandle) -> usize {
    let draw = rng.next_f64() * total;
    let mut acc = 0.0;
    let mut last_positive = 0;
    for (idx, w) in weights.enumerate() {
        if w <= 0.0 {
            continue;
        }
        acc += w;
        last_positive = idx;
        if draw < acc {
            return idx;
        }
    }
    last_positive
}

impl ProposerSelector for MultiProposerSelector {
    fn select(
        &mut self,
        candidates: &[ProposerCandidate<'_>],
        rng: &mut RngHandle,
    ) -> Result<Vec<usize>, McmcError> {
        if candidates.is_empty() {
            return Err(McmcError::config(
                "no-proposers",
                "cannot select a proposer from an empty list",
            ));
        }
        let usable = |c: &ProposerCandidate<'_>| c.enabled && c.weight > 0.0;
        let usable_total: f64 = candidates.iter().filter(|c| usable(*c)).map(|c| c.weight).sum();
        if usable_total <= 0.0 {
            return Err(McmcError::State(
                ErrorInfo::new("no-enabled-proposer", "every proposer is disabled or has zero weight")
                    .with_context("candidates", candidates.len().to_string()),
            ));
        }
        let total: f64 = candidates.iter().map(|c| c.weight.max(0.0)).sum();

        let target = self.target_count(rng);
        let mut selected: Vec<usize> = Vec::with_capacity(target);
        let mut taken: BTreeSet<NodeId> = BTreeSet::new();
        let mut attempts = 0;
        while attempts < self.max_attempts && selected.len() < target {
            attempts += 1;
            let idx = weighted_pick(candidates.iter().map(|c| c.weight), total, rng);
            let candidate = &candidates[idx];
            if !candidate.enabled
                || selected.contains(&idx)
                || candidate.parameters.iter().any(|p| taken.contains(p))
            {
                continue;
            }
            taken.extend(candidate.parameters.iter().copied());
            selected.push(idx);
        }

        if selected.is_empty() {
            let weights = candidates
                .iter()
                .map(|c| if usable(c) { c.weight } else { 0.0 });
            selected.push(weighted_pick(weights, usable_total, rng));
        }
        Ok(selected)
    }
}

impl InfoProvider for MultiProposerSelector {
    fn pre_info(&self, prefix: &str) -> String {
        format!(
            "{prefix}MULTI-PROPOSER SELECTOR\n{prefix}Cumulative no.-of-proposer weights: {:?}\n{prefix}Max attempts: {}\n",
            self.cumulative, self.max_attempts
        )
    }
}
