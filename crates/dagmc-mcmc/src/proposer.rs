use dagmc_core::{McmcError, RngHandle};

use crate::dependent::InfoProvider;
use crate::graph::{NodeId, ParameterAccess};
use crate::iteration::Iteration;
use crate::proposal::Proposal;
use crate::statistics::ProposerStatistics;
use crate::tuning::TuningParameter;

/// Perturbs one or more state parameters.
///
/// [`propose`](Self::propose) is the only call allowed to mutate state. It must
/// cache every parameter element before writing it, through the supplied
/// [`ParameterAccess`]. The manager then calls exactly one of
/// [`accepted`](Self::accepted) or [`rejected`](Self::rejected).
pub trait Proposer: InfoProvider {
    /// Name used in logs, reports and statistics.
    fn name(&self) -> &str;

    /// Parameters this proposer may perturb.
    fn parameters(&self) -> &[NodeId];

    /// Total number of sub-parameters across [`parameters`](Self::parameters).
    fn sub_parameter_count(&self) -> usize;

    /// Acceptance statistics.
    fn statistics(&self) -> &ProposerStatistics;

    /// Tuning parameters steering the kernel.
    fn tuning_parameters(&self) -> Vec<&TuningParameter> {
        Vec::new()
    }

    /// Whether the proposer may be selected.
    fn is_enabled(&self) -> bool;

    /// Enables or disables the proposer.
    fn set_enabled(&mut self, enabled: bool);

    /// Sets how many out-of-domain draws are tolerated before a proposal is
    /// returned as invalid. Proposers that never redraw ignore it.
    fn set_max_attempts(&mut self, _max_attempts: usize) -> Result<(), McmcError> {
        Ok(())
    }

    /// Called after every iteration increment while notifications are on.
    fn iteration_advanced(&mut self, _iteration: &Iteration) {}

    /// Caches and perturbs the parameters.
    ///
    /// A proposal that cannot be drawn is returned as
    /// [`Proposal::invalid`], not as an error.
    fn propose(
        &mut self,
        access: &mut ParameterAccess<'_>,
        rng: &mut RngHandle,
    ) -> Result<Proposal, McmcError>;

    /// The last proposal was accepted.
    fn accepted(&mut self, proposal: &Proposal);

    /// The last proposal was rejected.
    fn rejected(&mut self, proposal: &Proposal);
}
