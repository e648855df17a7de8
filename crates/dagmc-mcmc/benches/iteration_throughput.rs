use criterion::{criterion_group, criterion_main, Criterion};

use dagmc_mcmc::{
    DependencyGraph, FunctionDependent, FunctionModel, GraphBuilder, LogDouble, McmcManager,
    NodeId, NormalProposer, ProposerWeight, RealInterval, RunConfig, SampleField,
    TuningParameter, Value,
};

/// Eight independent parameters, each feeding its own dependent, all joined
/// by a single model. A perturbation touches one branch only.
fn wide_graph() -> (DependencyGraph, Vec<NodeId>) {
    let mut builder = GraphBuilder::new();
    let mut parameters = Vec::new();
    let mut squares = Vec::new();
    for i in 0..8 {
        let p = builder
            .add_parameter(format!("p{i}"), Value::Real(1.0 + i as f64))
            .unwrap();
        let sq = builder
            .add_dependent(
                format!("sq{i}"),
                &[p],
                FunctionDependent::new(format!("sq{i}"), move |v| Ok(v.real(p, 0)?.powi(2))),
            )
            .unwrap();
        parameters.push(p);
        squares.push(sq);
    }
    let inputs = squares.clone();
    builder
        .add_model(
            "joint",
            &squares,
            FunctionModel::new("joint", move |v| {
                let mut ln = 0.0;
                for id in &inputs {
                    ln -= 0.5 * v.real(*id, 0)?;
                }
                Ok(LogDouble::from_ln(ln))
            }),
        )
        .unwrap();
    (builder.build().unwrap(), parameters)
}

fn bench_iterations(c: &mut Criterion) {
    c.bench_function("mcmc_1000_iterations_8_parameters", |b| {
        b.iter(|| {
            let (graph, parameters) = wide_graph();
            let mut config = RunConfig::default();
            config.iterations = 1_000;
            config.thinning = 10;
            config.seed_policy.master_seed = Some(2024);
            let proposers: Vec<NormalProposer> = parameters
                .iter()
                .map(|&p| {
                    NormalProposer::new(
                        &graph,
                        p,
                        RealInterval::unbounded(),
                        TuningParameter::constant(0.5),
                        TuningParameter::constant(0.5),
                    )
                    .unwrap()
                })
                .collect();
            let mut manager = McmcManager::new(config, graph, std::io::sink()).unwrap();
            for proposer in proposers {
                manager
                    .add_proposer(Box::new(proposer), ProposerWeight::default())
                    .unwrap();
            }
            manager.add_sample_field(SampleField::Likelihood).unwrap();
            for &p in &parameters {
                manager.add_sample_field(SampleField::Node(p)).unwrap();
            }
            let summary = manager.run().unwrap();
            assert_eq!(summary.iterations, 999);
        });
    });
}

criterion_group!(benches, bench_iterations);
criterion_main!(benches);
