use std::collections::BTreeSet;

use dagmc_mcmc::{
    FunctionModel, GraphBuilder, InfoProvider, LogDouble, ManagerState, McmcError, McmcManager,
    MultiProposerSelector, NodeId, NormalProposer, ProposerCandidate, ProposerSelector,
    ProposerWeight, RealInterval, RngHandle, RunConfig, TuningParameter, Value,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Entry {
    parameters: Vec<NodeId>,
    weight: f64,
    enabled: bool,
}

fn entries() -> impl Strategy<Value = Vec<Entry>> {
    prop::collection::vec(
        (
            prop::collection::btree_set(0u32..8, 1..4),
            prop_oneof![Just(0.0), 0.1..5.0f64],
            prop::bool::weighted(0.8),
        )
            .prop_map(|(ids, weight, enabled)| Entry {
                parameters: ids.into_iter().map(|i| NodeId::from_index(i as usize)).collect(),
                weight,
                enabled,
            }),
        1..10,
    )
}

fn candidates(entries: &[Entry]) -> Vec<ProposerCandidate<'_>> {
    entries
        .iter()
        .map(|s| ProposerCandidate {
            parameters: &s.parameters,
            weight: s.weight,
            enabled: s.enabled,
        })
        .collect()
}

proptest! {
    #[test]
    fn selections_are_disjoint_enabled_and_non_empty(
        entries in entries(),
        weights in prop::collection::vec(0.0..3.0f64, 1..5),
        seed in any::<u64>(),
    ) {
        prop_assume!(weights.iter().sum::<f64>() > 0.0);
        prop_assume!(entries.iter().any(|s| s.enabled && s.weight > 0.0));

        let mut selector = MultiProposerSelector::with_simultaneous_weights(&weights).unwrap();
        let mut rng = RngHandle::from_seed(seed);
        let candidates = candidates(&entries);
        for _ in 0..20 {
            let selected = selector.select(&candidates, &mut rng).unwrap();
            prop_assert!(!selected.is_empty());
            prop_assert!(selected.len() <= weights.len());

            let mut seen = BTreeSet::new();
            let mut indices = BTreeSet::new();
            for &idx in &selected {
                prop_assert!(indices.insert(idx), "proposer {} selected twice", idx);
                let entry = &entries[idx];
                prop_assert!(entry.enabled);
                prop_assert!(entry.weight > 0.0);
                for p in &entry.parameters {
                    prop_assert!(seen.insert(*p), "parameter {:?} perturbed twice", p);
                }
            }
        }
    }
}

#[test]
fn all_disabled_is_a_state_error() {
    let ids = [NodeId::from_index(0)];
    let candidates = [ProposerCandidate {
        parameters: &ids,
        weight: 1.0,
        enabled: false,
    }];
    let err = MultiProposerSelector::new()
        .select(&candidates, &mut RngHandle::from_seed(3))
        .unwrap_err();
    assert_eq!(err.info().code, "no-enabled-proposer");
}

#[test]
fn overlapping_proposers_never_run_together() {
    let shared = [NodeId::from_index(0), NodeId::from_index(1)];
    let other = [NodeId::from_index(1)];
    let candidates = [
        ProposerCandidate {
            parameters: &shared,
            weight: 1.0,
            enabled: true,
        },
        ProposerCandidate {
            parameters: &other,
            weight: 1.0,
            enabled: true,
        },
    ];
    let mut selector = MultiProposerSelector::with_simultaneous_weights(&[0.0, 1.0]).unwrap();
    let mut rng = RngHandle::from_seed(17);
    for _ in 0..200 {
        assert_eq!(selector.select(&candidates, &mut rng).unwrap().len(), 1);
    }
}

/// Returns the same answer every iteration, whatever the candidates.
struct FixedSelector(Vec<usize>);

impl InfoProvider for FixedSelector {}

impl ProposerSelector for FixedSelector {
    fn select(
        &mut self,
        _candidates: &[ProposerCandidate<'_>],
        _rng: &mut RngHandle,
    ) -> Result<Vec<usize>, McmcError> {
        Ok(self.0.clone())
    }
}

fn manager_with(selected: Vec<usize>, proposers: usize) -> McmcManager<Vec<u8>> {
    let mut builder = GraphBuilder::new();
    let x = builder.add_parameter("x", Value::Real(1.0)).unwrap();
    builder
        .add_model(
            "gauss",
            &[x],
            FunctionModel::new("gauss", move |p| {
                Ok(LogDouble::from_ln(-0.5 * p.real(x, 0)?.powi(2)))
            }),
        )
        .unwrap();
    let graph = builder.build().unwrap();
    let mut config = RunConfig::default();
    config.iterations = 5;
    config.seed_policy.master_seed = Some(9);
    let kernels: Vec<NormalProposer> = (0..proposers)
        .map(|_| {
            NormalProposer::new(
                &graph,
                x,
                RealInterval::unbounded(),
                TuningParameter::constant(0.5),
                TuningParameter::constant(0.5),
            )
            .unwrap()
        })
        .collect();
    let mut manager = McmcManager::new(config, graph, Vec::new())
        .unwrap()
        .with_selector(Box::new(FixedSelector(selected)));
    for kernel in kernels {
        manager
            .add_proposer(Box::new(kernel), ProposerWeight::default())
            .unwrap();
    }
    manager
}

#[test]
fn out_of_range_selection_fails_the_run() {
    let mut manager = manager_with(vec![5], 1);
    let err = manager.run().unwrap_err();
    assert!(matches!(err, McmcError::State(_)));
    assert_eq!(err.info().code, "invalid-selection");
    assert_eq!(err.info().context["reason"], "out of range");
    assert_eq!(manager.state(), ManagerState::Terminated);
}

#[test]
fn empty_repeated_or_overlapping_selections_fail_the_run() {
    for (selected, proposers, reason) in [
        (vec![], 1, "empty"),
        (vec![0, 0], 1, "repeated proposer"),
        (vec![0, 1], 2, "overlapping parameters"),
    ] {
        let mut manager = manager_with(selected, proposers);
        let err = manager.run().unwrap_err();
        assert_eq!(err.info().code, "invalid-selection");
        assert_eq!(err.info().context["reason"], reason);
        assert!(!manager.graph().has_pending_changes());
    }
}

#[test]
fn well_formed_custom_selection_runs() {
    let mut manager = manager_with(vec![1], 2);
    let summary = manager.run().unwrap();
    assert_eq!(summary.iterations, 4);
    let totals: Vec<u64> = manager
        .proposers()
        .map(|p| p.statistics().totals().total())
        .collect();
    assert_eq!(totals, vec![0, 4]);
}
