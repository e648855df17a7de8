use dagmc_mcmc::{
    FunctionModel, GraphBuilder, InfoProvider, LogDouble, ManagerState, McmcError, McmcManager,
    MetropolisHastingsAcceptor, NodeId, ParameterAccess, Proposal, ProposalAcceptor, Proposer,
    ProposerStatistics, ProposerWeight, RngHandle, RunConfig, SampleField, Value,
};

/// Moves one real parameter to a fixed target with a symmetric kernel.
struct JumpTo {
    parameters: [NodeId; 1],
    target: f64,
    statistics: ProposerStatistics,
}

impl InfoProvider for JumpTo {}

impl Proposer for JumpTo {
    fn name(&self) -> &str {
        "jump"
    }

    fn parameters(&self) -> &[NodeId] {
        &self.parameters
    }

    fn sub_parameter_count(&self) -> usize {
        1
    }

    fn statistics(&self) -> &ProposerStatistics {
        &self.statistics
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn set_enabled(&mut self, _enabled: bool) {}

    fn propose(
        &mut self,
        access: &mut ParameterAccess<'_>,
        _rng: &mut RngHandle,
    ) -> Result<Proposal, McmcError> {
        let id = self.parameters[0];
        access.cache(id, None)?;
        access.set_real(id, 0, self.target)?;
        Ok(Proposal::new("jump", LogDouble::ONE, LogDouble::ONE, vec![id], 1))
    }

    fn accepted(&mut self, proposal: &Proposal) {
        self.statistics.record(true, proposal.category());
    }

    fn rejected(&mut self, proposal: &Proposal) {
        self.statistics.record(false, proposal.category());
    }
}

fn scenario() -> (dagmc_mcmc::DependencyGraph, NodeId, NodeId) {
    let mut builder = GraphBuilder::new();
    let a = builder.add_parameter("a", Value::Real(2.0)).unwrap();
    let b = builder.add_parameter("b", Value::Real(3.0)).unwrap();
    builder
        .add_model(
            "gap",
            &[a, b],
            FunctionModel::new("gap", move |p| {
                let d = p.real(a, 0)? - p.real(b, 0)?;
                Ok(LogDouble::from_ln(-d * d))
            }),
        )
        .unwrap();
    (builder.build().unwrap(), a, b)
}

#[test]
fn symmetric_move_towards_b_is_always_accepted() {
    let (mut graph, a, _) = scenario();
    assert!((graph.likelihood().ln() + 1.0).abs() < 1e-12);

    let mut proposer = JumpTo {
        parameters: [a],
        target: 2.5,
        statistics: ProposerStatistics::new(),
    };
    let mut rng = RngHandle::from_seed(1);
    let proposal = {
        let allowed = [a];
        let mut access = graph.parameter_access(&allowed);
        proposer.propose(&mut access, &mut rng).unwrap()
    };
    graph.propagate(false).unwrap();
    let proposed = graph.likelihood();
    assert!((proposed.ln() + 0.25).abs() < 1e-12);

    let old = LogDouble::from_ln(-1.0);
    let mut acceptor = MetropolisHastingsAcceptor::new();
    for seed in 0..64 {
        let mut rng = RngHandle::from_seed(seed);
        assert!(acceptor.accept_proposed_state(proposed, old, &[proposal.clone()], &mut rng));
    }

    graph.commit().unwrap();
    assert_eq!(graph.parameter(a).unwrap().real(0).unwrap(), 2.5);
    assert!(!graph.has_pending_changes());
}

#[test]
fn manager_applies_the_scenario() {
    let (graph, a, b) = scenario();
    let mut config = RunConfig::default();
    config.iterations = 2;
    config.seed_policy.master_seed = Some(11);
    let mut manager = McmcManager::new(config, graph, Vec::new()).unwrap();
    manager
        .add_proposer(
            Box::new(JumpTo {
                parameters: [a],
                target: 2.5,
                statistics: ProposerStatistics::new(),
            }),
            ProposerWeight::default(),
        )
        .unwrap();
    for field in [SampleField::Iteration, SampleField::Node(a), SampleField::Node(b)] {
        manager.add_sample_field(field).unwrap();
    }

    let summary = manager.run().unwrap();
    assert_eq!(manager.state(), ManagerState::Terminated);
    assert_eq!(summary.proposers["jump"].accepted, 1);
    assert!((summary.final_likelihood.ln() + 0.25).abs() < 1e-12);
    assert_eq!(summary.best_state, vec!["1", "2.5", "3"]);

    let text = String::from_utf8(manager.into_output().unwrap()).unwrap();
    assert_eq!(text, "Iteration\ta\tb\n0\t2\t3\n1\t2.5\t3\n");
}
