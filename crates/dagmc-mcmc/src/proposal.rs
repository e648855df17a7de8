use dagmc_core::LogDouble;
use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// Outcome of one [`Proposer::propose`](crate::proposer::Proposer::propose) call.
///
/// A proposal with a zero forward or backward density is invalid and forces
/// the acceptor to reject the whole iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    proposer: String,
    forward: LogDouble,
    backward: LogDouble,
    parameters: Vec<NodeId>,
    sub_parameters: usize,
    category: Option<String>,
}

impl Proposal {
    /// Proposal with densities `Q(x'|x)` and `Q(x|x')`.
    pub fn new(
        proposer: impl Into<String>,
        forward: LogDouble,
        backward: LogDouble,
        parameters: Vec<NodeId>,
        sub_parameters: usize,
    ) -> Self {
        Self {
            proposer: proposer.into(),
            forward,
            backward,
            parameters,
            sub_parameters,
            category: None,
        }
    }

    /// Proposal signalling that no valid state could be drawn.
    pub fn invalid(proposer: impl Into<String>, parameters: Vec<NodeId>) -> Self {
        Self::new(proposer, LogDouble::ONE, LogDouble::ZERO, parameters, 0)
    }

    /// Labels the proposal for per-category statistics.
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Name of the originating proposer.
    pub fn proposer(&self) -> &str {
        &self.proposer
    }

    /// Forward density `Q(x'|x)`.
    pub fn forward_density(&self) -> LogDouble {
        self.forward
    }

    /// Backward density `Q(x|x')`.
    pub fn backward_density(&self) -> LogDouble {
        self.backward
    }

    /// `backward / forward`.
    pub fn density_ratio(&self) -> LogDouble {
        self.backward.div_to_new(self.forward)
    }

    /// Perturbed parameters.
    pub fn parameters(&self) -> &[NodeId] {
        &self.parameters
    }

    /// Number of perturbed sub-parameters.
    pub fn sub_parameters(&self) -> usize {
        self.sub_parameters
    }

    /// Statistics category, if any.
    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// Whether both densities are non-zero.
    pub fn is_valid(&self) -> bool {
        !self.forward.is_zero() && !self.backward.is_zero()
    }
}
