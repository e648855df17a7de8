#![deny(missing_docs)]
#![doc = include_str!("../docs/engine-api.md")]

//! Dependency-graph driven MCMC engine with transactional perturbation cycles.

/// Metropolis-Hastings and hill-climbing acceptance policies.
pub mod acceptor;
/// Change records propagated through the dependency graph.
pub mod change;
/// YAML configuration schema and defaults.
pub mod config;
/// Traits implemented by derived graph nodes and models.
pub mod dependent;
/// Seed resolution helpers.
pub mod determinism;
/// Proposal kernel distributions.
pub mod distribution;
/// Dependency graph store, topological ordering and change propagation.
pub mod graph;
/// Iteration counter and thinning policy.
pub mod iteration;
/// Orchestrating run loop.
pub mod manager;
/// Run manifest serialization helpers.
pub mod manifest;
/// Truncated-normal proposer for real-valued parameters.
pub mod moves_normal;
/// Mutable graph sources and their cache slots.
pub mod parameter;
/// Uniform prior model over real parameters.
pub mod prior;
/// Proposal records.
pub mod proposal;
/// Proposer contract.
pub mod proposer;
/// Delimited sample output.
pub mod sampler;
/// Disjoint proposer selection.
pub mod selector;
/// Acceptance bookkeeping per proposer.
pub mod statistics;
/// Constant and time-varying tuning scalars.
pub mod tuning;

pub use acceptor::{HillClimbingAcceptor, MetropolisHastingsAcceptor, ProposalAcceptor};
pub use change::ChangeInfo;
pub use config::{AcceptorConfig, OutputConfig, RunConfig, SeedPolicy, SelectorConfig};
pub use dagmc_core::{ErrorInfo, IntervalKind, LogDouble, McmcError, RealInterval, RngHandle};
pub use dependent::{
    CacheSlot, FunctionDependent, FunctionModel, InfoProvider, Model, ProperDependent, Sampleable,
};
pub use determinism::resolve_seed;
pub use distribution::{Distribution, NormalDistribution};
pub use graph::{DependencyGraph, GraphBuilder, NodeId, NodeKind, ParameterAccess, ParentView};
pub use iteration::{Iteration, Thinner};
pub use manager::{ManagerState, McmcManager, ProposerReport, RunSummary, SampleField};
pub use manifest::RunManifest;
pub use moves_normal::NormalProposer;
pub use parameter::{Detected, Scalar, StateParameter, Value};
pub use prior::RealParameterUniformPrior;
pub use proposal::Proposal;
pub use proposer::Proposer;
pub use sampler::{SampleWriter, DEFAULT_BUFFER_SIZE};
pub use selector::{check_selection, MultiProposerSelector, ProposerCandidate, ProposerSelector};
pub use statistics::{AcceptCounts, ProposerStatistics};
pub use tuning::{ProposerWeight, TuningParameter};
