use std::fmt::Write as _;

use dagmc_core::{ErrorInfo, LogDouble, McmcError, RealInterval, RngHandle};

use crate::dependent::InfoProvider;
use crate::distribution::{standard_normal_quantile, Distribution, NormalDistribution};
use crate::graph::{DependencyGraph, NodeId, ParameterAccess};
use crate::iteration::Iteration;
use crate::parameter::Value;
use crate::proposal::Proposal;
use crate::proposer::Proposer;
use crate::statistics::ProposerStatistics;
use crate::tuning::TuningParameter;

const DEFAULT_MAX_ATTEMPTS: usize = 100;
const ZERO_STDEV: f64 = 1e-10;

/// Truncated-normal proposer for a real scalar or real array parameter.
///
/// For a current value `x` the kernel is `N(x, s^2)` with
/// `s = |x * t1| / z((1 + t2) / 2)`, where `z` is the standard normal quantile.
/// In words, `x` lies within `x ± |x * t1|` with probability `t2`. Draws
/// outside the domain are retried up to a ceiling, after which the proposal is
/// invalid. Densities are renormalised by the kernel mass inside the domain.
#[derive(Debug, Clone)]
pub struct NormalProposer {
    name: String,
    parameters: [NodeId; 1],
    parameter_name: String,
    len: usize,
    interval: RealInterval,
    t1: TuningParameter,
    t2: TuningParameter,
    cumulative_weights: Vec<f64>,
    max_attempts: usize,
    statistics: ProposerStatistics,
    enabled: bool,
}

impl NormalProposer {
    /// Creates a proposer over `parameter` restricted to `interval`.
    pub fn new(
        graph: &DependencyGraph,
        parameter: NodeId,
        interval: RealInterval,
        t1: TuningParameter,
        t2: TuningParameter,
    ) -> Result<Self, McmcError> {
        let state = graph.parameter(parameter)?;
        let name = format!("NormalProposer({})", state.name());
        if !matches!(state.value(), Value::Real(_) | Value::RealArray(_)) {
            return Err(McmcError::Config(
                ErrorInfo::new("not-real", "normal proposer needs a real-valued parameter")
                    .with_context("parameter", state.name())
                    .with_context("kind", state.value().kind_name()),
            ));
        }
        t1.validate(&name)?;
        t2.validate(&name)?;
        if t1.min_value() <= 0.0 {
            return Err(McmcError::Config(
                ErrorInfo::new("tuning-range", "first tuning parameter must lie in (0, inf)")
                    .with_context("owner", name),
            ));
        }
        if t2.min_value() <= 0.0 || t2.max_value() >= 1.0 {
            return Err(McmcError::Config(
                ErrorInfo::new("tuning-range", "second tuning parameter must lie in (0, 1)")
                    .with_context("owner", name),
            ));
        }
        interval.ensure_proper(&name)?;
        Ok(Self {
            name,
            parameters: [parameter],
            parameter_name: state.name().to_string(),
            len: state.len(),
            interval,
            t1,
            t2,
            cumulative_weights: vec![1.0],
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            statistics: ProposerStatistics::new(),
            enabled: true,
        })
    }

    /// Sets the relative weights of perturbing 1, 2, ... sub-parameters at once.
    ///
    /// Weights beyond the number of sub-parameters are ignored.
    pub fn with_sub_parameter_weights(mut self, weights: &[f64]) -> Result<Self, McmcError> {
        let used = weights.len().min(self.len);
        if used == 0 {
            return Err(McmcError::Config(
                ErrorInfo::new("sub-parameter-weights", "at least one weight is required")
                    .with_context("owner", self.name.clone()),
            ));
        }
        let mut cumulative = Vec::with_capacity(used);
        let mut total = 0.0;
        for &w in &weights[..used] {
            if !(w >= 0.0 && w.is_finite()) {
                return Err(McmcError::Config(
                    ErrorInfo::new("sub-parameter-weights", "weights must be finite and non-negative")
                        .with_context("owner", self.name.clone())
                        .with_context("weight", w.to_string()),
                ));
            }
            total += w;
            cumulative.push(total);
        }
        if total <= 0.0 {
            return Err(McmcError::Config(
                ErrorInfo::new("sub-parameter-weights", "weights must not all be zero")
                    .with_context("owner", self.name.clone()),
            ));
        }
        for c in &mut cumulative {
            *c /= total;
        }
        if let Some(last) = cumulative.last_mut() {
            *last = 1.0;
        }
        self.cumulative_weights = cumulative;
        Ok(self)
    }

    /// Sets how many out-of-domain draws are tolerated per sub-parameter.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Result<Self, McmcError> {
        Proposer::set_max_attempts(&mut self, max_attempts)?;
        Ok(self)
    }

    /// Replaces the statistics collector, e.g. with a windowed one.
    pub fn with_statistics(mut self, statistics: ProposerStatistics) -> Self {
        self.statistics = statistics;
        self
    }

    /// Proposal domain.
    pub fn interval(&self) -> RealInterval {
        self.interval
    }

    fn choose_indices(&self, rng: &mut RngHandle) -> Vec<usize> {
        let k = self.len;
        let m = self.cumulative_weights.len();
        if k == 1 {
            return vec![0];
        }
        if m == 1 {
            return vec![rng.next_index(k)];
        }
        if m == k && self.cumulative_weights[m - 2] == 0.0 {
            return (0..k).collect();
        }
        let draw = rng.next_f64();
        let mut count = 1;
        while count < m && draw > self.cumulative_weights[count - 1] {
            count += 1;
        }
        let mut pool: Vec<usize> = (0..k).collect();
        (0..count)
            .map(|_| pool.remove(rng.next_index(pool.len())))
            .collect()
    }

    fn stdev_for(&self, x: f64, scale: f64) -> f64 {
        if x == 0.0 {
            ZERO_STDEV
        } else {
            (x * self.t1.value()).abs() / scale
        }
    }

    fn mass_inside(&self, kernel: &NormalDistribution) -> f64 {
        let mut mass = 1.0;
        if self.interval.lower.is_finite() {
            mass -= kernel.cdf(self.interval.lower);
        }
        if self.interval.upper.is_finite() {
            mass -= 1.0 - kernel.cdf(self.interval.upper);
        }
        mass
    }
}

impl Proposer for NormalProposer {
    fn name(&self) -> &str {
        &self.name
    }

    fn parameters(&self) -> &[NodeId] {
        &self.parameters
    }

    fn sub_parameter_count(&self) -> usize {
        self.len
    }

    fn statistics(&self) -> &ProposerStatistics {
        &self.statistics
    }

    fn tuning_parameters(&self) -> Vec<&TuningParameter> {
        vec![&self.t1, &self.t2]
    }

    fn set_max_attempts(&mut self, max_attempts: usize) -> Result<(), McmcError> {
        if max_attempts == 0 {
            return Err(McmcError::Config(
                ErrorInfo::new("max-attempts", "proposal attempt ceiling must be positive")
                    .with_context("proposer", self.name.clone()),
            ));
        }
        self.max_attempts = max_attempts;
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    fn iteration_advanced(&mut self, iteration: &Iteration) {
        self.t1.advance(iteration);
        self.t2.advance(iteration);
        self.statistics.iteration_advanced(iteration);
    }

    fn propose(
        &mut self,
        access: &mut ParameterAccess<'_>,
        rng: &mut RngHandle,
    ) -> Result<Proposal, McmcError> {
        let parameter = self.parameters[0];
        let indices = self.choose_indices(rng);
        access.cache(parameter, Some(&indices))?;

        let scale = standard_normal_quantile((1.0 + self.t2.value()) / 2.0);
        let mut forward = LogDouble::ONE;
        let mut backward = LogDouble::ONE;
        for &idx in &indices {
            let old = access.real(parameter, idx)?;
            let kernel = NormalDistribution::new(old, self.stdev_for(old, scale))?;
            let drawn = (0..self.max_attempts)
                .map(|_| kernel.sample_value(rng))
                .find(|x| self.interval.contains(*x));
            let Some(new) = drawn else {
                return Ok(Proposal::invalid(self.name.clone(), self.parameters.to_vec()));
            };
            access.set_real(parameter, idx, new)?;
            forward *= LogDouble::new(kernel.pdf(new) / self.mass_inside(&kernel));
            let reverse = NormalDistribution::new(new, self.stdev_for(new, scale))?;
            backward *= LogDouble::new(reverse.pdf(old) / self.mass_inside(&reverse));
        }
        access.set_change_info(parameter, format!("perturbed by {}", self.name))?;

        let proposal = Proposal::new(
            self.name.clone(),
            forward,
            backward,
            self.parameters.to_vec(),
            indices.len(),
        );
        if self.len > 1 {
            Ok(proposal.with_category(format!("{} perturbed sub-parameters", indices.len())))
        } else {
            Ok(proposal)
        }
    }

    fn accepted(&mut self, proposal: &Proposal) {
        self.statistics.record(true, proposal.category());
    }

    fn rejected(&mut self, proposal: &Proposal) {
        self.statistics.record(false, proposal.category());
    }
}

impl InfoProvider for NormalProposer {
    fn pre_info(&self, prefix: &str) -> String {
        let inner = format!("{prefix}\t");
        let mut out = String::new();
        let _ = writeln!(out, "{prefix}NORMAL-DISTRIBUTED PROPOSER");
        let _ = writeln!(out, "{prefix}Perturbed parameter: {}", self.parameter_name);
        let _ = writeln!(out, "{prefix}Is active: {}", self.enabled);
        let _ = writeln!(out, "{prefix}Domain: {}", self.interval);
        let _ = writeln!(
            out,
            "{prefix}Cumulative sub-parameter weights: {:?}",
            self.cumulative_weights
        );
        let _ = writeln!(out, "{prefix}Max attempts: {}", self.max_attempts);
        let _ = write!(out, "{prefix}Tuning parameter 1:\n{}", self.t1.pre_info(&inner));
        let _ = write!(out, "{prefix}Tuning parameter 2:\n{}", self.t2.pre_info(&inner));
        out
    }

    fn post_info(&self, prefix: &str) -> String {
        let inner = format!("{prefix}\t");
        format!(
            "{prefix}NORMAL-DISTRIBUTED PROPOSER\n{prefix}Perturbed parameter: {}\n{prefix}Statistics:\n{}",
            self.parameter_name,
            self.statistics.post_info(&inner)
        )
    }
}
