use dagmc_mcmc::distribution::standard_normal_quantile;
use dagmc_mcmc::{
    DependencyGraph, Distribution, FunctionModel, GraphBuilder, LogDouble, McmcManager,
    MetropolisHastingsAcceptor, NodeId, NormalDistribution, NormalProposer, ProposalAcceptor,
    Proposer, ProposerWeight, RealInterval, RealParameterUniformPrior, RngHandle, RunConfig,
    SampleField, TuningParameter, Value,
};

const T1: f64 = 0.5;
const T2: f64 = 0.5;

fn gaussian_density(x: f64, mean: f64, stdev: f64) -> f64 {
    let z = (x - mean) / stdev;
    (-0.5 * z * z).exp() / (stdev * (2.0 * std::f64::consts::PI).sqrt())
}

fn exponential_graph(start: f64) -> (DependencyGraph, NodeId) {
    let mut builder = GraphBuilder::new();
    let x = builder.add_parameter("x", Value::Real(start)).unwrap();
    builder
        .add_model(
            "exponential",
            &[x],
            FunctionModel::new("exponential", move |p| Ok(LogDouble::from_ln(-p.real(x, 0)?))),
        )
        .unwrap();
    builder
        .add_model("support", &[x], RealParameterUniformPrior::new(x, RealInterval::positive()))
        .unwrap();
    (builder.build().unwrap(), x)
}

fn proposer(graph: &DependencyGraph, x: NodeId, interval: RealInterval) -> NormalProposer {
    NormalProposer::new(
        graph,
        x,
        interval,
        TuningParameter::constant(T1),
        TuningParameter::constant(T2),
    )
    .unwrap()
}

#[test]
fn hastings_ratio_matches_hand_computation() {
    let (mut graph, x) = exponential_graph(1.2);
    let mut proposer = proposer(&graph, x, RealInterval::unbounded());
    let mut rng = RngHandle::from_seed(2024);

    let proposal = {
        let allowed = [x];
        let mut access = graph.parameter_access(&allowed);
        proposer.propose(&mut access, &mut rng).unwrap()
    };
    assert!(proposal.is_valid());
    let old = 1.2;
    let new = graph.parameter(x).unwrap().real(0).unwrap();

    let scale = standard_normal_quantile((1.0 + T2) / 2.0);
    let forward = gaussian_density(new, old, old * T1 / scale);
    let backward = gaussian_density(old, new, (new * T1).abs() / scale);
    assert!((proposal.forward_density().value() - forward).abs() < 1e-9 * forward.max(1.0));
    assert!((proposal.backward_density().value() - backward).abs() < 1e-9 * backward.max(1.0));

    graph.propagate(false).unwrap();
    let proposed = graph.likelihood();
    let current = LogDouble::from_ln(-old);
    let expected_ratio = if new > 0.0 {
        (old - new).exp() * backward / forward
    } else {
        0.0
    };

    let mut acceptor = MetropolisHastingsAcceptor::new();
    let mut replay = rng.clone();
    let accepted = acceptor.accept_proposed_state(proposed, current, &[proposal], &mut rng);
    let u = replay.next_f64();
    assert_eq!(accepted, expected_ratio > 0.0 && expected_ratio >= u);
    graph.rollback().unwrap();
    assert_eq!(graph.parameter(x).unwrap().real(0).unwrap(), old);
}

#[test]
fn truncated_kernel_corrects_for_lost_mass() {
    let (mut graph, x) = exponential_graph(0.3);
    let interval = RealInterval::closed(0.0, 1.0);
    let mut proposer = proposer(&graph, x, interval);
    let mut rng = RngHandle::from_seed(5);
    let proposal = {
        let allowed = [x];
        let mut access = graph.parameter_access(&allowed);
        proposer.propose(&mut access, &mut rng).unwrap()
    };
    let new = graph.parameter(x).unwrap().real(0).unwrap();
    assert!(interval.contains(new));

    let scale = standard_normal_quantile((1.0 + T2) / 2.0);
    let mass = |mean: f64, stdev: f64| {
        let kernel = NormalDistribution::new(mean, stdev).unwrap();
        kernel.cdf(1.0) - kernel.cdf(0.0)
    };
    let sd_forward = 0.3 * T1 / scale;
    let sd_backward = new * T1 / scale;
    let forward = gaussian_density(new, 0.3, sd_forward) / mass(0.3, sd_forward);
    let backward = gaussian_density(0.3, new, sd_backward) / mass(new, sd_backward);
    let ratio = proposal.density_ratio().value();
    assert!((ratio - backward / forward).abs() < 1e-8 * (backward / forward).max(1.0));
    graph.rollback().unwrap();
}

#[test]
fn chain_recovers_exponential_mean() {
    let (graph, x) = exponential_graph(1.0);
    let positive = proposer(&graph, x, RealInterval::positive());
    let mut config = RunConfig::default();
    config.iterations = 40_000;
    config.burn_in = 2_000;
    config.seed_policy.master_seed = Some(99);
    let mut manager = McmcManager::new(config, graph, Vec::new()).unwrap();
    manager
        .add_proposer(Box::new(positive), ProposerWeight::default())
        .unwrap();
    manager.add_sample_field(SampleField::Node(x)).unwrap();
    manager.run().unwrap();

    let text = String::from_utf8(manager.into_output().unwrap()).unwrap();
    let draws: Vec<f64> = text.lines().skip(1).map(|l| l.parse().unwrap()).collect();
    assert!(draws.len() > 30_000);
    let mean = draws.iter().sum::<f64>() / draws.len() as f64;
    assert!((mean - 1.0).abs() < 0.15, "mean {mean}");
}
