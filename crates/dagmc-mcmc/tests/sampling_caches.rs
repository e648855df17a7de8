use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use dagmc_mcmc::{
    CacheSlot, ChangeInfo, DependencyGraph, FunctionModel, GraphBuilder, LogDouble, McmcError,
    McmcManager, NodeId, NormalProposer, ParentView, ProperDependent, ProposerWeight,
    RealInterval, RunConfig, SampleField, Sampleable, TuningParameter, Value,
};

/// Doubles its parent. The rendered label is only refreshed, and only
/// snapshotted, on iterations that will be sampled.
struct Doubled {
    parent: NodeId,
    slot: CacheSlot<Value>,
    label: String,
    label_cache: Option<String>,
    renders: Rc<Cell<usize>>,
    updates: Rc<Cell<usize>>,
}

impl Doubled {
    fn new(parent: NodeId, renders: Rc<Cell<usize>>, updates: Rc<Cell<usize>>) -> Self {
        Self {
            parent,
            slot: CacheSlot::new("doubled", Value::Real(0.0)),
            label: String::new(),
            label_cache: None,
            renders,
            updates,
        }
    }

    fn real(&self) -> f64 {
        match self.slot.get() {
            Value::Real(x) => *x,
            _ => f64::NAN,
        }
    }

    fn has_pending_cache(&self) -> bool {
        self.slot.is_cached() || self.label_cache.is_some()
    }
}

impl ProperDependent for Doubled {
    fn initialize(&mut self, parents: &ParentView<'_>) -> Result<(), McmcError> {
        let value = 2.0 * parents.real(self.parent, 0)?;
        self.slot.set(Value::Real(value));
        self.label = value.to_string();
        Ok(())
    }

    fn cache_and_update(
        &mut self,
        parents: &ParentView<'_>,
        will_sample: bool,
    ) -> Result<Option<ChangeInfo>, McmcError> {
        self.updates.set(self.updates.get() + 1);
        self.slot.cache()?;
        let value = 2.0 * parents.real(self.parent, 0)?;
        if will_sample {
            self.label_cache = Some(std::mem::replace(&mut self.label, value.to_string()));
            self.renders.set(self.renders.get() + 1);
        }
        let value = Value::Real(value);
        if value.same_bits(self.slot.get()) {
            return Ok(None);
        }
        self.slot.set(value);
        Ok(Some(ChangeInfo::new(parents.node(), "doubled")))
    }

    fn clear_cache(&mut self, _will_sample: bool) -> Result<(), McmcError> {
        self.label_cache = None;
        self.slot.clear()
    }

    fn restore_cache(&mut self, _will_sample: bool) -> Result<(), McmcError> {
        if let Some(label) = self.label_cache.take() {
            self.label = label;
        }
        self.slot.restore()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn value(&self) -> Option<&Value> {
        Some(self.slot.get())
    }

    fn as_sampleable(&self) -> Option<&dyn Sampleable> {
        Some(self)
    }
}

impl Sampleable for Doubled {
    fn sample_header(&self) -> String {
        "doubled".to_string()
    }

    fn sample_value(&self) -> String {
        self.label.clone()
    }
}

struct Fixture {
    graph: DependencyGraph,
    x: NodeId,
    doubled: NodeId,
    renders: Rc<Cell<usize>>,
    updates: Rc<Cell<usize>>,
}

fn fixture() -> Fixture {
    let renders = Rc::new(Cell::new(0));
    let updates = Rc::new(Cell::new(0));
    let mut builder = GraphBuilder::new();
    let x = builder.add_parameter("x", Value::Real(1.5)).unwrap();
    let doubled = builder
        .add_dependent(
            "doubled",
            &[x],
            Doubled::new(x, Rc::clone(&renders), Rc::clone(&updates)),
        )
        .unwrap();
    builder
        .add_model(
            "gauss",
            &[doubled],
            FunctionModel::new("gauss", move |p| {
                Ok(LogDouble::from_ln(-0.5 * p.real(doubled, 0)?.powi(2)))
            }),
        )
        .unwrap();
    Fixture {
        graph: builder.build().unwrap(),
        x,
        doubled,
        renders,
        updates,
    }
}

fn perturb(graph: &mut DependencyGraph, id: NodeId, value: f64) {
    let allowed = [id];
    let mut access = graph.parameter_access(&allowed);
    access.cache(id, None).unwrap();
    access.set_real(id, 0, value).unwrap();
}

fn assert_settled(f: &Fixture, value: f64, label: &str) {
    let node = f.graph.dependent::<Doubled>(f.doubled).unwrap();
    assert_eq!(node.real().to_bits(), value.to_bits());
    assert_eq!(node.sample_value(), label);
    assert!(!node.has_pending_cache());
    assert!(f.graph.change_info(f.doubled).is_none());
    assert!(f.graph.change_info(f.x).is_none());
    assert!(!f.graph.has_pending_changes());
}

#[test]
fn sampled_rollback_restores_value_and_label() {
    let mut f = fixture();
    perturb(&mut f.graph, f.x, 4.0);
    f.graph.propagate(true).unwrap();
    {
        let node = f.graph.dependent::<Doubled>(f.doubled).unwrap();
        assert_eq!(node.sample_value(), "8");
        assert!(node.has_pending_cache());
    }
    assert!(f.graph.change_info(f.doubled).is_some());
    f.graph.rollback().unwrap();
    assert_settled(&f, 3.0, "3");
    assert_eq!(f.renders.get(), 1);
}

#[test]
fn unsampled_rollback_never_touches_the_label() {
    let mut f = fixture();
    perturb(&mut f.graph, f.x, 4.0);
    f.graph.propagate(false).unwrap();
    assert_eq!(f.graph.dependent::<Doubled>(f.doubled).unwrap().real(), 8.0);
    f.graph.rollback().unwrap();
    assert_settled(&f, 3.0, "3");
    assert_eq!(f.renders.get(), 0);
    assert_eq!(f.updates.get(), 1);
}

#[test]
fn alternating_sampling_leaves_no_stale_label_cache() {
    let mut f = fixture();

    perturb(&mut f.graph, f.x, 2.0);
    f.graph.propagate(true).unwrap();
    f.graph.commit().unwrap();
    assert_settled(&f, 4.0, "4");

    // Unsampled perturbation after a sampled commit: the label must not revert.
    perturb(&mut f.graph, f.x, 10.0);
    f.graph.propagate(false).unwrap();
    f.graph.rollback().unwrap();
    assert_settled(&f, 4.0, "4");

    // Unsampled commit: the label is stale until the next sampled update.
    perturb(&mut f.graph, f.x, 5.0);
    f.graph.propagate(false).unwrap();
    f.graph.commit().unwrap();
    assert_settled(&f, 10.0, "4");

    perturb(&mut f.graph, f.x, -1.0);
    f.graph.propagate(true).unwrap();
    f.graph.rollback().unwrap();
    assert_settled(&f, 10.0, "4");

    perturb(&mut f.graph, f.x, 0.25);
    f.graph.propagate(true).unwrap();
    f.graph.commit().unwrap();
    assert_settled(&f, 0.5, "0.5");
    assert_eq!(f.renders.get(), 3);
    assert_eq!(f.updates.get(), 5);
}

struct RunOutcome {
    rows: Vec<String>,
    renders: usize,
    updates: usize,
}

fn run(thinning: u64) -> RunOutcome {
    let Fixture {
        graph,
        x,
        doubled,
        renders,
        updates,
    } = fixture();
    let mut config = RunConfig::default();
    config.iterations = 200;
    config.thinning = thinning;
    config.seed_policy.master_seed = Some(41);
    let proposer = NormalProposer::new(
        &graph,
        x,
        RealInterval::unbounded(),
        TuningParameter::constant(0.5),
        TuningParameter::constant(0.5),
    )
    .unwrap();
    let mut manager = McmcManager::new(config, graph, Vec::new()).unwrap();
    manager
        .add_proposer(Box::new(proposer), ProposerWeight::default())
        .unwrap();
    manager.add_sample_field(SampleField::Node(x)).unwrap();
    manager.add_sample_field(SampleField::Node(doubled)).unwrap();
    manager.run().unwrap();
    let text = String::from_utf8(manager.into_output().unwrap()).unwrap();
    RunOutcome {
        rows: text.lines().skip(1).map(str::to_string).collect(),
        renders: renders.get(),
        updates: updates.get(),
    }
}

#[test]
fn every_iteration_sampled_renders_every_update() {
    let outcome = run(1);
    assert_eq!(outcome.rows.len(), 200);
    assert!(outcome.updates > 0);
    assert_eq!(outcome.renders, outcome.updates);
    for row in &outcome.rows {
        let (x, doubled) = row.split_once('\t').unwrap();
        let x: f64 = x.parse().unwrap();
        let doubled: f64 = doubled.parse().unwrap();
        assert_eq!(doubled, 2.0 * x, "row {row}");
    }
}

#[test]
fn unsampled_iterations_skip_rendering() {
    let outcome = run(1_000);
    assert_eq!(outcome.rows.len(), 1);
    assert!(outcome.updates > 0);
    assert_eq!(outcome.renders, 0);
}
