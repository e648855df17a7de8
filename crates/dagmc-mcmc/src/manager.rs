use std::fmt::Write as _;
use std::io::Write;
use std::time::{Duration, Instant};

use chrono::Utc;
use dagmc_core::{ErrorInfo, LogDouble, McmcError, RngHandle};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::acceptor::{HillClimbingAcceptor, MetropolisHastingsAcceptor, ProposalAcceptor};
use crate::config::{AcceptorConfig, RunConfig};
use crate::dependent::InfoProvider;
use crate::determinism;
use crate::graph::{DependencyGraph, NodeId, NodeKind};
use crate::iteration::{Iteration, Thinner};
use crate::manifest::RunManifest;
use crate::proposal::Proposal;
use crate::proposer::Proposer;
use crate::sampler::SampleWriter;
use crate::selector::{check_selection, MultiProposerSelector, ProposerCandidate, ProposerSelector};
use crate::statistics::AcceptCounts;
use crate::tuning::ProposerWeight;

/// Lifecycle of a [`McmcManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ManagerState {
    /// Assembled, not yet run.
    Idle,
    /// Writing the header and the initial state.
    Initializing,
    /// Inside the perturbation loop.
    Iterating,
    /// Writing a sample row.
    Sampling,
    /// Finished, either normally or after a fatal error.
    Terminated,
}

/// One column of the sample output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SampleField {
    /// Current iteration number.
    Iteration,
    /// Product of all model likelihoods, as a natural logarithm.
    Likelihood,
    /// Any sampleable graph node.
    Node(NodeId),
}

/// Acceptance figures of one proposer at the end of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProposerReport {
    /// Accepted proposals.
    pub accepted: u64,
    /// Rejected proposals.
    pub rejected: u64,
    /// Fraction accepted; absent when the proposer never ran.
    pub acceptance_ratio: Option<f64>,
    /// Per-window counts, empty unless windowed statistics were enabled.
    pub windows: Vec<AcceptCounts>,
}

/// Outcome of [`McmcManager::run`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Seed the run used.
    pub seed: u64,
    /// Last iteration reached.
    pub iterations: u64,
    /// Sample rows written, the initial state included.
    pub samples_written: u64,
    /// Likelihood of the final state.
    pub final_likelihood: LogDouble,
    /// Highest likelihood seen.
    pub best_likelihood: LogDouble,
    /// Sample row of the best state, in header order.
    pub best_state: Vec<String>,
    /// Sample header.
    pub header: Vec<String>,
    /// Acceptance figures keyed by proposer name, in registration order.
    pub proposers: IndexMap<String, ProposerReport>,
    /// Whether the acceptor asked to stop before the last iteration.
    pub stopped_early: bool,
}

struct ProposerSlot {
    proposer: Box<dyn Proposer>,
    weight: ProposerWeight,
}

/// Drives a chain: selects proposers, propagates their perturbations through
/// the graph, asks the acceptor, then commits or rolls back and samples.
pub struct McmcManager<W: Write> {
    config: RunConfig,
    graph: DependencyGraph,
    sampler: SampleWriter<W>,
    selector: Box<dyn ProposerSelector>,
    acceptor: Box<dyn ProposalAcceptor>,
    proposers: Vec<ProposerSlot>,
    fields: Vec<SampleField>,
    iteration: Iteration,
    thinner: Thinner,
    seed: u64,
    rng: RngHandle,
    likelihood: LogDouble,
    best_likelihood: LogDouble,
    best_state: Vec<String>,
    state: ManagerState,
    wall_time: Option<Duration>,
}

impl<W: Write> McmcManager<W> {
    /// Validates `config` and assembles a manager writing samples to `out`.
    pub fn new(config: RunConfig, graph: DependencyGraph, out: W) -> Result<Self, McmcError> {
        config.validate()?;
        let sampler = SampleWriter::from_config(out, &config.output)?;
        let selector = MultiProposerSelector::with_simultaneous_weights(
            &config.selector.simultaneous_weights,
        )?
        .with_max_attempts(config.selector.max_attempts)?;
        let acceptor: Box<dyn ProposalAcceptor> = match &config.acceptor {
            AcceptorConfig::MetropolisHastings => Box::new(MetropolisHastingsAcceptor::new()),
            AcceptorConfig::HillClimbing {
                log_tolerance,
                max_stale_iterations,
            } => {
                let mut acceptor = HillClimbingAcceptor::new().with_log_tolerance(*log_tolerance);
                if let Some(limit) = max_stale_iterations {
                    acceptor = acceptor.with_max_stale(*limit);
                }
                Box::new(acceptor)
            }
        };
        let iteration = Iteration::new(config.iterations)?;
        let thinner = Thinner::new(config.thinning, config.burn_in)?;
        let seed = determinism::resolve_seed(&config.seed_policy);
        let likelihood = graph.likelihood();
        Ok(Self {
            config,
            graph,
            sampler,
            selector: Box::new(selector),
            acceptor,
            proposers: Vec::new(),
            fields: Vec::new(),
            iteration,
            thinner,
            seed,
            rng: RngHandle::from_seed(seed),
            likelihood,
            best_likelihood: likelihood,
            best_state: Vec::new(),
            state: ManagerState::Idle,
            wall_time: None,
        })
    }

    /// Replaces the configured selector.
    pub fn with_selector(mut self, selector: Box<dyn ProposerSelector>) -> Self {
        self.selector = selector;
        self
    }

    /// Replaces the configured acceptor.
    pub fn with_acceptor(mut self, acceptor: Box<dyn ProposalAcceptor>) -> Self {
        self.acceptor = acceptor;
        self
    }

    /// Registers a proposer. Every parameter it declares must be a graph source.
    ///
    /// The proposer's retry ceiling is set from `proposal_max_attempts`.
    pub fn add_proposer(
        &mut self,
        mut proposer: Box<dyn Proposer>,
        weight: ProposerWeight,
    ) -> Result<(), McmcError> {
        self.ensure_idle()?;
        if proposer.parameters().is_empty() {
            return Err(McmcError::Config(
                ErrorInfo::new("empty-parameter", "proposer declares no parameters")
                    .with_context("proposer", proposer.name()),
            ));
        }
        for &id in proposer.parameters() {
            let kind = self.graph.kind(id)?;
            if kind != NodeKind::Source {
                return Err(McmcError::Graph(
                    ErrorInfo::new("wrong-node-kind", "proposers may only perturb state parameters")
                        .with_context("proposer", proposer.name())
                        .with_context("node", self.graph.name(id)?)
                        .with_context("kind", format!("{kind:?}")),
                ));
            }
        }
        weight.validate(proposer.name())?;
        proposer.set_max_attempts(self.config.proposal_max_attempts)?;
        self.proposers.push(ProposerSlot { proposer, weight });
        Ok(())
    }

    /// Appends a column to the sample output.
    pub fn add_sample_field(&mut self, field: SampleField) -> Result<(), McmcError> {
        self.ensure_idle()?;
        if let SampleField::Node(id) = field {
            self.graph.sampleable(id)?;
        }
        self.fields.push(field);
        Ok(())
    }

    /// Mutes or unmutes iteration notifications, returning the previous setting.
    pub fn set_notify(&mut self, notify: bool) -> bool {
        self.iteration.set_notify(notify)
    }

    /// Lifecycle state.
    pub fn state(&self) -> ManagerState {
        self.state
    }

    /// Seed driving the run.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// The dependency graph.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Registered proposers, in registration order.
    pub fn proposers(&self) -> impl Iterator<Item = &dyn Proposer> {
        self.proposers.iter().map(|slot| slot.proposer.as_ref())
    }

    /// Likelihood of the current state.
    pub fn likelihood(&self) -> LogDouble {
        self.likelihood
    }

    /// Time spent in [`run`](Self::run), once finished.
    pub fn wall_time(&self) -> Option<Duration> {
        self.wall_time
    }

    /// Flushes and returns the sample writer's destination.
    pub fn into_output(self) -> Result<W, McmcError> {
        self.sampler.into_inner()
    }

    /// Runs the chain to completion.
    ///
    /// Any error is fatal: the manager moves to [`ManagerState::Terminated`]
    /// after flushing what was already written.
    pub fn run(&mut self) -> Result<RunSummary, McmcError> {
        self.ensure_idle()?;
        let result = self.run_chain();
        if result.is_err() {
            self.state = ManagerState::Terminated;
            let _ = self.sampler.flush();
        }
        result
    }

    fn ensure_idle(&self) -> Result<(), McmcError> {
        if self.state == ManagerState::Idle {
            Ok(())
        } else {
            Err(McmcError::State(
                ErrorInfo::new("manager-not-idle", "the manager has already run")
                    .with_context("state", format!("{:?}", self.state)),
            ))
        }
    }

    fn run_chain(&mut self) -> Result<RunSummary, McmcError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        self.state = ManagerState::Initializing;
        if self.proposers.is_empty() {
            return Err(McmcError::Config(
                ErrorInfo::new("no-proposers", "at least one proposer is required")
                    .with_hint("register proposers with add_proposer before running"),
            ));
        }
        info!(
            seed = self.seed,
            iterations = self.iteration.total(),
            proposers = self.proposers.len(),
            nodes = self.graph.len(),
            "starting chain"
        );

        let header = self.header()?;
        self.sampler.write_header(&header)?;
        self.likelihood = self.graph.likelihood();
        self.best_likelihood = self.likelihood;
        self.best_state = self.row()?;
        if self.thinner.do_sample(&self.iteration) {
            self.state = ManagerState::Sampling;
            self.sampler.write_sample(&self.best_state)?;
        }

        self.state = ManagerState::Iterating;
        let mut stopped_early = false;
        while self.iteration.increment() {
            if self.iteration.notifies() {
                for slot in &mut self.proposers {
                    slot.weight.advance(&self.iteration);
                    slot.proposer.iteration_advanced(&self.iteration);
                }
            }
            let will_sample = self.thinner.do_sample(&self.iteration);
            self.step(will_sample)?;
            if will_sample {
                self.state = ManagerState::Sampling;
                let row = self.row()?;
                self.sampler.write_sample(&row)?;
                self.state = ManagerState::Iterating;
            }
            if self.acceptor.is_exhausted() {
                info!(iteration = self.iteration.current(), "acceptor exhausted, stopping early");
                stopped_early = true;
                break;
            }
        }

        self.sampler.flush()?;
        let wall_time = clock.elapsed();
        self.wall_time = Some(wall_time);
        self.state = ManagerState::Terminated;
        let summary = self.summary(header, stopped_early);
        info!(
            iterations = summary.iterations,
            samples = summary.samples_written,
            likelihood = %summary.final_likelihood,
            best = %summary.best_likelihood,
            wall_ms = wall_time.as_millis() as u64,
            "chain finished"
        );

        if let Some(path) = &self.config.output.manifest_file {
            let manifest = RunManifest {
                config: self.config.clone(),
                master_seed: self.seed,
                seed_label: self.config.seed_policy.label.clone(),
                started_at: started_at.to_rfc3339(),
                wall_time_ns: u64::try_from(wall_time.as_nanos()).unwrap_or(u64::MAX),
                summary: summary.clone(),
            };
            manifest.write(path)?;
        }
        Ok(summary)
    }

    fn step(&mut self, will_sample: bool) -> Result<(), McmcError> {
        let candidates: Vec<ProposerCandidate<'_>> = self
            .proposers
            .iter()
            .map(|slot| ProposerCandidate {
                parameters: slot.proposer.parameters(),
                weight: slot.weight.weight(),
                enabled: slot.proposer.is_enabled(),
            })
            .collect();
        let selected = self.selector.select(&candidates, &mut self.rng)?;
        check_selection(&selected, &candidates)?;
        drop(candidates);

        let mut proposals: Vec<Proposal> = Vec::with_capacity(selected.len());
        for &idx in &selected {
            let slot = &mut self.proposers[idx];
            let parameters = slot.proposer.parameters().to_vec();
            let mut access = self.graph.parameter_access(&parameters);
            let proposal = slot.proposer.propose(&mut access, &mut self.rng)?;
            proposals.push(proposal);
        }

        let recomputed = self.graph.propagate(will_sample)?;
        let proposed = self.graph.likelihood();
        let accepted =
            self.acceptor
                .accept_proposed_state(proposed, self.likelihood, &proposals, &mut self.rng);
        let names: Vec<&str> = proposals.iter().map(Proposal::proposer).collect();
        debug!(
            iteration = self.iteration.current(),
            proposers = ?names,
            recomputed,
            current = %self.likelihood,
            proposed = %proposed,
            accepted,
            "perturbation resolved"
        );

        if accepted {
            self.graph.commit()?;
            self.likelihood = proposed;
            for (&idx, proposal) in selected.iter().zip(&proposals) {
                self.proposers[idx].proposer.accepted(proposal);
            }
            if self.likelihood > self.best_likelihood {
                self.best_likelihood = self.likelihood;
                self.best_state = self.row()?;
            }
        } else {
            self.graph.rollback()?;
            for (&idx, proposal) in selected.iter().zip(&proposals) {
                self.proposers[idx].proposer.rejected(proposal);
            }
        }
        Ok(())
    }

    fn header(&self) -> Result<Vec<String>, McmcError> {
        self.fields
            .iter()
            .map(|field| match field {
                SampleField::Iteration => Ok("Iteration".to_string()),
                SampleField::Likelihood => Ok("OverallLikelihood".to_string()),
                SampleField::Node(id) => Ok(self.graph.sampleable(*id)?.sample_header()),
            })
            .collect()
    }

    fn row(&self) -> Result<Vec<String>, McmcError> {
        self.fields
            .iter()
            .map(|field| match field {
                SampleField::Iteration => Ok(self.iteration.current().to_string()),
                SampleField::Likelihood => Ok(self.likelihood.to_string()),
                SampleField::Node(id) => Ok(self.graph.sampleable(*id)?.sample_value()),
            })
            .collect()
    }

    fn summary(&self, header: Vec<String>, stopped_early: bool) -> RunSummary {
        let proposers = self
            .proposers
            .iter()
            .map(|slot| {
                let statistics = slot.proposer.statistics();
                let totals = statistics.totals();
                let report = ProposerReport {
                    accepted: totals.accepted,
                    rejected: totals.rejected,
                    acceptance_ratio: (totals.total() > 0).then(|| totals.ratio()),
                    windows: statistics.windows().to_vec(),
                };
                (slot.proposer.name().to_string(), report)
            })
            .collect();
        RunSummary {
            seed: self.seed,
            iterations: self.iteration.current(),
            samples_written: self.sampler.samples_written(),
            final_likelihood: self.likelihood,
            best_likelihood: self.best_likelihood,
            best_state: self.best_state.clone(),
            header,
            proposers,
            stopped_early,
        }
    }
}

impl<W: Write> InfoProvider for McmcManager<W> {
    fn pre_info(&self, prefix: &str) -> String {
        let inner = format!("{prefix}\t");
        let mut out = String::new();
        let _ = writeln!(out, "{prefix}MCMC MANAGER");
        let _ = writeln!(out, "{prefix}Seed: {}", self.seed);
        out.push_str(&self.iteration.pre_info(&inner));
        out.push_str(&self.thinner.pre_info(&inner));
        out.push_str(&self.selector.pre_info(&inner));
        out.push_str(&self.acceptor.pre_info(&inner));
        for slot in &self.proposers {
            out.push_str(&slot.proposer.pre_info(&inner));
        }
        out
    }

    fn post_info(&self, prefix: &str) -> String {
        let inner = format!("{prefix}\t");
        let mut out = String::new();
        let _ = writeln!(out, "{prefix}MCMC MANAGER");
        if let Some(wall_time) = self.wall_time {
            let _ = writeln!(out, "{prefix}Wall time: {:.3} s", wall_time.as_secs_f64());
        }
        let _ = writeln!(out, "{prefix}Final likelihood: {}", self.likelihood);
        let _ = writeln!(out, "{prefix}Best likelihood: {}", self.best_likelihood);
        out.push_str(&self.iteration.post_info(&inner));
        out.push_str(&self.acceptor.post_info(&inner));
        for slot in &self.proposers {
            out.push_str(&slot.proposer.post_info(&inner));
        }
        out
    }
}
