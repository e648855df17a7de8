use dagmc_core::{LogDouble, RngHandle};

use crate::dependent::InfoProvider;
use crate::proposal::Proposal;

/// Decides whether a proposed state replaces the current one.
pub trait ProposalAcceptor: InfoProvider {
    /// Returns `true` to accept the proposed state.
    ///
    /// Invalid proposals and a zero proposed likelihood always reject.
    fn accept_proposed_state(
        &mut self,
        proposed: LogDouble,
        current: LogDouble,
        proposals: &[Proposal],
        rng: &mut RngHandle,
    ) -> bool;

    /// Whether the acceptor wants the run to stop.
    fn is_exhausted(&self) -> bool {
        false
    }
}

/// Metropolis-Hastings rule: accept iff
/// `L(x') / L(x) * prod(backward / forward) >= U` with `U ~ Uniform[0, 1)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetropolisHastingsAcceptor;

impl MetropolisHastingsAcceptor {
    /// Creates the acceptor.
    pub fn new() -> Self {
        Self
    }
}

impl ProposalAcceptor for MetropolisHastingsAcceptor {
    fn accept_proposed_state(
        &mut self,
        proposed: LogDouble,
        current: LogDouble,
        proposals: &[Proposal],
        rng: &mut RngHandle,
    ) -> bool {
        if proposed.is_zero() || proposals.iter().any(|p| !p.is_valid()) {
            return false;
        }
        let ratio = proposals
            .iter()
            .fold(proposed.div_to_new(current), |acc, p| acc * p.density_ratio());
        let u = LogDouble::new(rng.next_f64());
        ratio.ln() >= u.ln()
    }
}

impl InfoProvider for MetropolisHastingsAcceptor {
    fn pre_info(&self, prefix: &str) -> String {
        format!("{prefix}METROPOLIS-HASTINGS ACCEPTOR\n")
    }
}

/// Greedy rule: accept iff `ln L(x') - ln L(x) > tolerance`.
///
/// The tolerance is the natural log of a linear precision factor, so a factor
/// such as `1 + 1e-9` is `1e-9` here. The default of zero means strict
/// improvement. With a stale limit the acceptor reports exhaustion once more than that
/// many consecutive iterations failed to improve.
#[derive(Debug, Clone, PartialEq)]
pub struct HillClimbingAcceptor {
    log_tolerance: f64,
    max_stale: Option<u64>,
    stale: u64,
}

impl Default for HillClimbingAcceptor {
    fn default() -> Self {
        Self {
            log_tolerance: 0.0,
            max_stale: None,
            stale: 0,
        }
    }
}

impl HillClimbingAcceptor {
    /// Acceptor without a stale limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the log-scale margin an improvement must exceed.
    pub fn with_log_tolerance(mut self, log_tolerance: f64) -> Self {
        self.log_tolerance = log_tolerance;
        self
    }

    /// Sets the number of tolerated consecutive non-improving iterations.
    pub fn with_max_stale(mut self, max_stale: u64) -> Self {
        self.max_stale = Some(max_stale);
        self
    }

    /// Log-scale improvement margin.
    pub fn log_tolerance(&self) -> f64 {
        self.log_tolerance
    }

    /// Consecutive non-improving iterations so far.
    pub fn stale_iterations(&self) -> u64 {
        self.stale
    }
}

impl ProposalAcceptor for HillClimbingAcceptor {
    fn accept_proposed_state(
        &mut self,
        proposed: LogDouble,
        current: LogDouble,
        proposals: &[Proposal],
        _rng: &mut RngHandle,
    ) -> bool {
        if proposals.iter().any(|p| !p.is_valid()) {
            return false;
        }
        let improved = !proposed.is_zero() && proposed.ln() - current.ln() > self.log_tolerance;
        if improved {
            self.stale = 0;
        } else {
            self.stale += 1;
        }
        improved
    }

    fn is_exhausted(&self) -> bool {
        self.max_stale.is_some_and(|limit| self.stale > limit)
    }
}

impl InfoProvider for HillClimbingAcceptor {
    fn pre_info(&self, prefix: &str) -> String {
        let limit = self
            .max_stale
            .map_or_else(|| "none".to_string(), |n| n.to_string());
        format!(
            "{prefix}HILL-CLIMBING ACCEPTOR\n{prefix}Log tolerance: {}\n{prefix}Max stale iterations: {limit}\n",
            self.log_tolerance
        )
    }

    fn post_info(&self, prefix: &str) -> String {
        format!(
            "{prefix}HILL-CLIMBING ACCEPTOR\n{prefix}Final stale iterations: {}\n",
            self.stale
        )
    }
}
