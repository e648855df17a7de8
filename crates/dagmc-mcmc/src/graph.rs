use std::any::Any;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

use dagmc_core::{ErrorInfo, LogDouble, McmcError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::change::ChangeInfo;
use crate::dependent::{Model, ProperDependent, Sampleable};
use crate::parameter::{Detected, Scalar, StateParameter, Value};

/// Stable handle to a node of a [`DependencyGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    /// Builds a handle from a raw store index.
    pub fn from_index(idx: usize) -> Self {
        NodeId(idx as u32)
    }

    /// Raw store index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Role of a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// State parameter mutated by proposers.
    Source,
    /// Interior dependent.
    Derived,
    /// Model contributing to the likelihood.
    Sink,
}

pub(crate) enum Node {
    Source(StateParameter),
    Derived(Box<dyn ProperDependent>),
    Sink(Box<dyn Model>),
}

impl Node {
    fn kind(&self) -> NodeKind {
        match self {
            Node::Source(_) => NodeKind::Source,
            Node::Derived(_) => NodeKind::Derived,
            Node::Sink(_) => NodeKind::Sink,
        }
    }

    fn is_source(&self) -> bool {
        matches!(self, Node::Source(_))
    }

    fn initialize(&mut self, view: &ParentView<'_>) -> Result<(), McmcError> {
        match self {
            Node::Source(_) => Ok(()),
            Node::Derived(dep) => dep.initialize(view),
            Node::Sink(model) => model.initialize(view),
        }
    }

    fn cache_and_update(
        &mut self,
        view: &ParentView<'_>,
        will_sample: bool,
    ) -> Result<Option<ChangeInfo>, McmcError> {
        match self {
            Node::Source(_) => Ok(None),
            Node::Derived(dep) => dep.cache_and_update(view, will_sample),
            Node::Sink(model) => model.cache_and_update(view, will_sample),
        }
    }

    fn resolve(&mut self, restore: bool, will_sample: bool) -> Result<(), McmcError> {
        match (self, restore) {
            (Node::Source(parameter), true) => parameter.restore_cache(),
            (Node::Source(parameter), false) => parameter.clear_cache(),
            (Node::Derived(dep), true) => dep.restore_cache(will_sample),
            (Node::Derived(dep), false) => dep.clear_cache(will_sample),
            (Node::Sink(model), true) => model.restore_cache(will_sample),
            (Node::Sink(model), false) => model.clear_cache(will_sample),
        }
    }

    fn as_any(&self) -> Option<&dyn Any> {
        match self {
            Node::Source(_) => None,
            Node::Derived(dep) => Some(dep.as_any()),
            Node::Sink(model) => Some(model.as_any()),
        }
    }

    fn exposed_value(&self) -> Option<&Value> {
        match self {
            Node::Source(parameter) => Some(parameter.value()),
            Node::Derived(dep) => dep.value(),
            Node::Sink(model) => model.value(),
        }
    }

    fn sampleable(&self) -> Option<&dyn Sampleable> {
        match self {
            Node::Source(parameter) => Some(parameter as &dyn Sampleable),
            Node::Derived(dep) => dep.as_sampleable(),
            Node::Sink(model) => model.as_sampleable(),
        }
    }
}

pub(crate) struct NodeEntry {
    name: String,
    node: Node,
    parents: Vec<NodeId>,
    children: Vec<NodeId>,
}

/// Registers nodes before the graph is frozen.
///
/// A node's parents must be registered before the node itself, so the graph is
/// acyclic by construction.
#[derive(Default)]
pub struct GraphBuilder {
    entries: Vec<NodeEntry>,
    names: IndexMap<String, NodeId>,
}

impl GraphBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a state parameter.
    pub fn add_parameter(
        &mut self,
        name: impl Into<String>,
        value: Value,
    ) -> Result<NodeId, McmcError> {
        let name = name.into();
        if value.is_empty() {
            return Err(McmcError::Config(
                ErrorInfo::new("empty-parameter", "array parameters need at least one element")
                    .with_context("node", name),
            ));
        }
        let parameter = StateParameter::new(name.clone(), value);
        self.push(name, Node::Source(parameter), &[])
    }

    /// Registers an interior dependent computed from `parents`.
    pub fn add_dependent<D>(
        &mut self,
        name: impl Into<String>,
        parents: &[NodeId],
        dependent: D,
    ) -> Result<NodeId, McmcError>
    where
        D: ProperDependent,
    {
        self.push(name.into(), Node::Derived(Box::new(dependent)), parents)
    }

    /// Registers a model, a sink whose likelihood feeds acceptance.
    pub fn add_model<M>(
        &mut self,
        name: impl Into<String>,
        parents: &[NodeId],
        model: M,
    ) -> Result<NodeId, McmcError>
    where
        M: Model,
    {
        self.push(name.into(), Node::Sink(Box::new(model)), parents)
    }

    fn push(&mut self, name: String, node: Node, parents: &[NodeId]) -> Result<NodeId, McmcError> {
        if self.names.contains_key(&name) {
            return Err(McmcError::Graph(
                ErrorInfo::new("duplicate-node", "node name already registered")
                    .with_context("node", name),
            ));
        }
        if !matches!(node, Node::Source(_)) && parents.is_empty() {
            return Err(McmcError::Graph(
                ErrorInfo::new("orphan-dependent", "dependents need at least one parent")
                    .with_context("node", name),
            ));
        }
        for (pos, parent) in parents.iter().enumerate() {
            if parent.index() >= self.entries.len() {
                return Err(McmcError::Graph(
                    ErrorInfo::new("unknown-parent", "parent must be registered before its child")
                        .with_context("node", name)
                        .with_context("parent", parent.index().to_string()),
                ));
            }
            if parents[..pos].contains(parent) {
                return Err(McmcError::Graph(
                    ErrorInfo::new("duplicate-parent", "parent listed twice")
                        .with_context("node", name)
                        .with_context("parent", self.entries[parent.index()].name.clone()),
                ));
            }
        }
        let id = NodeId::from_index(self.entries.len());
        for parent in parents {
            self.entries[parent.index()].children.push(id);
        }
        self.names.insert(name.clone(), id);
        self.entries.push(NodeEntry {
            name,
            node,
            parents: parents.to_vec(),
            children: Vec::new(),
        });
        Ok(id)
    }

    /// Freezes the graph: computes the topological order and initialises
    /// every dependent in that order.
    pub fn build(self) -> Result<DependencyGraph, McmcError> {
        let GraphBuilder { mut entries, names } = self;
        let models: Vec<NodeId> = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matches!(entry.node, Node::Sink(_)))
            .map(|(idx, _)| NodeId::from_index(idx))
            .collect();
        if models.is_empty() {
            return Err(McmcError::Graph(ErrorInfo::new(
                "no-models",
                "the graph needs at least one model",
            )));
        }

        let order = topological_order(&entries, &models);
        let mut rank = vec![0usize; entries.len()];
        for (pos, id) in order.iter().enumerate() {
            rank[id.index()] = pos;
        }
        for (idx, entry) in entries.iter().enumerate() {
            for parent in &entry.parents {
                if rank[parent.index()] >= rank[idx] {
                    return Err(McmcError::Graph(
                        ErrorInfo::new("cycle", "dependency graph is not acyclic")
                            .with_context("node", entry.name.clone())
                            .with_context("parent", entries[parent.index()].name.clone()),
                    ));
                }
            }
        }

        let changes = vec![None; entries.len()];
        for id in &order {
            let idx = id.index();
            let (left, right) = entries.split_at_mut(idx);
            let NodeEntry {
                name,
                node,
                parents,
                ..
            } = &mut right[0];
            let view = ParentView {
                entries: left,
                changes: &changes,
                node: *id,
                parents,
            };
            node.initialize(&view).map_err(|err| with_node(err, name))?;
        }

        Ok(DependencyGraph {
            entries,
            names,
            rank,
            order,
            models,
            changes,
            perturbed: Vec::new(),
            touched: Vec::new(),
            will_sample: false,
        })
    }
}

/// Post-order DFS over parent edges from every model; nodes that no model
/// depends on are appended afterwards in registration order.
fn topological_order(entries: &[NodeEntry], models: &[NodeId]) -> Vec<NodeId> {
    let mut visited = vec![false; entries.len()];
    let mut order = Vec::with_capacity(entries.len());
    for model in models {
        if visited[model.index()] {
            continue;
        }
        let mut stack = vec![(*model, 0usize)];
        visited[model.index()] = true;
        while let Some((id, next)) = stack.pop() {
            let parents = &entries[id.index()].parents;
            if let Some(parent) = parents.get(next) {
                stack.push((id, next + 1));
                if !visited[parent.index()] {
                    visited[parent.index()] = true;
                    stack.push((*parent, 0));
                }
            } else {
                order.push(id);
            }
        }
    }
    for (idx, entry) in entries.iter().enumerate() {
        if !visited[idx] {
            warn!(node = %entry.name, "node does not reach any model");
            order.push(NodeId::from_index(idx));
        }
    }
    order
}

fn with_node(err: McmcError, name: &str) -> McmcError {
    let attach = |info: ErrorInfo| {
        if info.context.contains_key("node") {
            info
        } else {
            info.with_context("node", name)
        }
    };
    match err {
        McmcError::Config(info) => McmcError::Config(attach(info)),
        McmcError::Graph(info) => McmcError::Graph(attach(info)),
        McmcError::State(info) => McmcError::State(attach(info)),
        McmcError::Evaluation(info) => McmcError::Evaluation(attach(info)),
        McmcError::Io(info) => McmcError::Io(attach(info)),
        McmcError::Serde(info) => McmcError::Serde(attach(info)),
    }
}

fn not_a_parent(node: &str, parent: NodeId) -> McmcError {
    McmcError::Graph(
        ErrorInfo::new("not-a-parent", "node read a value it does not depend on")
            .with_context("node", node)
            .with_context("parent", parent.index().to_string()),
    )
}

/// Read-only view of a dependent's parents during initialisation and update.
pub struct ParentView<'a> {
    entries: &'a [NodeEntry],
    changes: &'a [Option<ChangeInfo>],
    node: NodeId,
    parents: &'a [NodeId],
}

impl<'a> ParentView<'a> {
    /// Node being updated.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Declared parents, in registration order.
    pub fn parents(&self) -> &[NodeId] {
        self.parents
    }

    fn entry(&self, id: NodeId) -> Result<&'a NodeEntry, McmcError> {
        if !self.parents.contains(&id) {
            return Err(not_a_parent(&self.node.index().to_string(), id));
        }
        self.entries
            .get(id.index())
            .ok_or_else(|| not_a_parent(&self.node.index().to_string(), id))
    }

    /// Name of a parent.
    pub fn name(&self, id: NodeId) -> Result<&'a str, McmcError> {
        Ok(&self.entry(id)?.name)
    }

    /// Change record of a parent, `None` if it did not change this iteration.
    pub fn change_info(&self, id: NodeId) -> Option<&'a ChangeInfo> {
        if !self.parents.contains(&id) {
            return None;
        }
        self.changes.get(id.index()).and_then(Option::as_ref)
    }

    /// Whether any parent carries a change record.
    pub fn any_parent_changed(&self) -> bool {
        self.parents.iter().any(|id| self.change_info(*id).is_some())
    }

    /// Parent state parameter.
    pub fn parameter(&self, id: NodeId) -> Result<&'a StateParameter, McmcError> {
        let entry = self.entry(id)?;
        match &entry.node {
            Node::Source(parameter) => Ok(parameter),
            other => Err(kind_error(&entry.name, NodeKind::Source, other.kind())),
        }
    }

    /// Value of a parent: a state parameter, or a dependent exposing one.
    pub fn value(&self, id: NodeId) -> Result<&'a Value, McmcError> {
        let entry = self.entry(id)?;
        entry.node.exposed_value().ok_or_else(|| {
            McmcError::Graph(
                ErrorInfo::new("no-value", "dependent does not expose a value")
                    .with_context("node", entry.name.clone()),
            )
        })
    }

    /// Real element `idx` of a parent's value.
    pub fn real(&self, id: NodeId, idx: usize) -> Result<f64, McmcError> {
        match self.value(id)?.element(idx) {
            Some(Scalar::Real(x)) => Ok(x),
            _ => Err(McmcError::Evaluation(
                ErrorInfo::new("not-real", "parent element is not a real number")
                    .with_context("node", self.name(id)?.to_string())
                    .with_context("index", idx.to_string()),
            )),
        }
    }

    /// Parent dependent downcast to its concrete type.
    pub fn dependent<T: 'static>(&self, id: NodeId) -> Result<&'a T, McmcError> {
        let entry = self.entry(id)?;
        entry
            .node
            .as_any()
            .and_then(|any| any.downcast_ref::<T>())
            .ok_or_else(|| {
                McmcError::Graph(
                    ErrorInfo::new("type-mismatch", "parent has a different concrete type")
                        .with_context("node", entry.name.clone()),
                )
            })
    }

    /// Likelihood of a parent model.
    pub fn likelihood(&self, id: NodeId) -> Result<LogDouble, McmcError> {
        let entry = self.entry(id)?;
        match &entry.node {
            Node::Sink(model) => Ok(model.likelihood()),
            other => Err(kind_error(&entry.name, NodeKind::Sink, other.kind())),
        }
    }
}

fn kind_error(name: &str, expected: NodeKind, actual: NodeKind) -> McmcError {
    McmcError::Graph(
        ErrorInfo::new("wrong-node-kind", "node has an unexpected kind")
            .with_context("node", name)
            .with_context("expected", format!("{expected:?}"))
            .with_context("actual", format!("{actual:?}")),
    )
}

/// Frozen dependency graph with a fixed topological order.
///
/// Between [`propagate`](Self::propagate) and [`commit`](Self::commit) or
/// [`rollback`](Self::rollback) the graph remembers which nodes hold a pending
/// cache; exactly those are resolved.
pub struct DependencyGraph {
    entries: Vec<NodeEntry>,
    names: IndexMap<String, NodeId>,
    rank: Vec<usize>,
    order: Vec<NodeId>,
    models: Vec<NodeId>,
    changes: Vec<Option<ChangeInfo>>,
    perturbed: Vec<NodeId>,
    touched: Vec<NodeId>,
    will_sample: bool,
}

impl DependencyGraph {
    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the graph has no nodes (never true for a built graph).
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry(&self, id: NodeId) -> Result<&NodeEntry, McmcError> {
        self.entries.get(id.index()).ok_or_else(|| unknown_node(id))
    }

    /// Name of a node.
    pub fn name(&self, id: NodeId) -> Result<&str, McmcError> {
        Ok(&self.entry(id)?.name)
    }

    /// Kind of a node.
    pub fn kind(&self, id: NodeId) -> Result<NodeKind, McmcError> {
        Ok(self.entry(id)?.node.kind())
    }

    /// Looks a node up by name.
    pub fn id_of(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Parents of a node.
    pub fn parents(&self, id: NodeId) -> Result<&[NodeId], McmcError> {
        Ok(&self.entry(id)?.parents)
    }

    /// Children of a node.
    pub fn children(&self, id: NodeId) -> Result<&[NodeId], McmcError> {
        Ok(&self.entry(id)?.children)
    }

    /// Nodes in topological order; parents always precede children.
    pub fn topological_order(&self) -> &[NodeId] {
        &self.order
    }

    /// Position of a node in the topological order.
    pub fn rank(&self, id: NodeId) -> Result<usize, McmcError> {
        self.entry(id)?;
        Ok(self.rank[id.index()])
    }

    /// All models.
    pub fn models(&self) -> &[NodeId] {
        &self.models
    }

    /// State parameter stored at `id`.
    pub fn parameter(&self, id: NodeId) -> Result<&StateParameter, McmcError> {
        let entry = self.entry(id)?;
        match &entry.node {
            Node::Source(parameter) => Ok(parameter),
            other => Err(kind_error(&entry.name, NodeKind::Source, other.kind())),
        }
    }

    /// Dependent or model stored at `id`, downcast to its concrete type.
    pub fn dependent<T: 'static>(&self, id: NodeId) -> Result<&T, McmcError> {
        let entry = self.entry(id)?;
        entry
            .node
            .as_any()
            .and_then(|any| any.downcast_ref::<T>())
            .ok_or_else(|| {
                McmcError::Graph(
                    ErrorInfo::new("type-mismatch", "node has a different concrete type")
                        .with_context("node", entry.name.clone()),
                )
            })
    }

    /// Sample column provider for a node, if it has one.
    pub fn sampleable(&self, id: NodeId) -> Result<&dyn Sampleable, McmcError> {
        let entry = self.entry(id)?;
        entry.node.sampleable().ok_or_else(|| {
            McmcError::Graph(
                ErrorInfo::new("not-sampleable", "node cannot be written to the sample output")
                    .with_context("node", entry.name.clone()),
            )
        })
    }

    /// Change record currently attached to a node.
    pub fn change_info(&self, id: NodeId) -> Option<&ChangeInfo> {
        self.changes.get(id.index()).and_then(Option::as_ref)
    }

    /// Whether any node still holds a pending cache or change record.
    pub fn has_pending_changes(&self) -> bool {
        !self.perturbed.is_empty()
            || !self.touched.is_empty()
            || self.changes.iter().any(Option::is_some)
    }

    /// Product of all model likelihoods.
    pub fn likelihood(&self) -> LogDouble {
        self.models
            .iter()
            .filter_map(|id| match &self.entries[id.index()].node {
                Node::Sink(model) => Some(model.likelihood()),
                _ => None,
            })
            .product()
    }

    /// Mutable access to the state parameters in `allowed`, used by proposers.
    pub fn parameter_access<'a>(&'a mut self, allowed: &'a [NodeId]) -> ParameterAccess<'a> {
        ParameterAccess {
            graph: self,
            allowed,
        }
    }

    /// Propagates source changes through the graph in topological order.
    ///
    /// Returns how many dependents were recomputed. Dependents whose parents
    /// are all unchanged are skipped.
    pub fn propagate(&mut self, will_sample: bool) -> Result<usize, McmcError> {
        self.will_sample = will_sample;
        let mut heap = BinaryHeap::new();
        let mut queued = vec![false; self.entries.len()];

        for pos in 0..self.perturbed.len() {
            let id = self.perturbed[pos];
            let idx = id.index();
            let entry = &self.entries[idx];
            let Node::Source(parameter) = &entry.node else {
                continue;
            };
            let note = self.changes[idx]
                .take()
                .map(|change| change.info().to_string())
                .unwrap_or_else(|| format!("{} perturbed", entry.name));
            self.changes[idx] = match parameter.detect_change() {
                Detected::Unchanged => None,
                Detected::Whole => Some(ChangeInfo::new(id, note)),
                Detected::Elements(indices) => Some(ChangeInfo::with_indices(id, note, indices)),
            };
            if self.changes[idx].is_some() {
                for child in &entry.children {
                    if !queued[child.index()] {
                        queued[child.index()] = true;
                        heap.push(Reverse((self.rank[child.index()], child.index())));
                    }
                }
            }
        }

        let mut recomputed = 0;
        while let Some(Reverse((_, idx))) = heap.pop() {
            let id = NodeId::from_index(idx);
            let (left, right) = self.entries.split_at_mut(idx);
            let NodeEntry {
                name,
                node,
                parents,
                children,
            } = &mut right[0];
            if node.is_source() {
                continue;
            }
            let view = ParentView {
                entries: left,
                changes: &self.changes,
                node: id,
                parents,
            };
            if !view.any_parent_changed() {
                continue;
            }
            self.touched.push(id);
            let change = node
                .cache_and_update(&view, will_sample)
                .map_err(|err| with_node(err, name))?;
            recomputed += 1;
            trace!(node = %name, changed = change.is_some(), "dependent recomputed");
            let Some(change) = change else {
                continue;
            };
            if change.node() != id {
                return Err(McmcError::State(
                    ErrorInfo::new("foreign-change", "dependent reported a change for another node")
                        .with_context("node", name.clone()),
                ));
            }
            self.changes[idx] = Some(change);
            for child in children.iter() {
                if !queued[child.index()] {
                    queued[child.index()] = true;
                    heap.push(Reverse((self.rank[child.index()], child.index())));
                }
            }
        }
        Ok(recomputed)
    }

    /// Accepts the pending perturbation: every cache is discarded.
    pub fn commit(&mut self) -> Result<(), McmcError> {
        self.resolve(false)
    }

    /// Rejects the pending perturbation: every cache is restored.
    pub fn rollback(&mut self) -> Result<(), McmcError> {
        self.resolve(true)
    }

    fn resolve(&mut self, restore: bool) -> Result<(), McmcError> {
        let will_sample = self.will_sample;
        let touched = std::mem::take(&mut self.touched);
        let perturbed = std::mem::take(&mut self.perturbed);
        for change in &mut self.changes {
            *change = None;
        }
        for id in touched.iter().rev().chain(perturbed.iter()) {
            let entry = &mut self.entries[id.index()];
            entry
                .node
                .resolve(restore, will_sample)
                .map_err(|err| with_node(err, &entry.name))?;
        }
        Ok(())
    }
}

fn unknown_node(id: NodeId) -> McmcError {
    McmcError::Graph(
        ErrorInfo::new("unknown-node", "node handle does not belong to this graph")
            .with_context("node", id.index().to_string()),
    )
}

/// Mutable handle through which a proposer perturbs its own parameters.
///
/// Every write needs a prior [`cache`](Self::cache) of the same element, so
/// the graph can always roll back.
pub struct ParameterAccess<'a> {
    graph: &'a mut DependencyGraph,
    allowed: &'a [NodeId],
}

impl<'a> ParameterAccess<'a> {
    fn parameter(&self, id: NodeId) -> Result<&StateParameter, McmcError> {
        self.check(id)?;
        self.graph.parameter(id)
    }

    fn parameter_mut(&mut self, id: NodeId) -> Result<&mut StateParameter, McmcError> {
        self.check(id)?;
        let entry = self
            .graph
            .entries
            .get_mut(id.index())
            .ok_or_else(|| unknown_node(id))?;
        match &mut entry.node {
            Node::Source(parameter) => Ok(parameter),
            other => Err(kind_error(&entry.name, NodeKind::Source, other.kind())),
        }
    }

    fn check(&self, id: NodeId) -> Result<(), McmcError> {
        if self.allowed.contains(&id) {
            Ok(())
        } else {
            Err(McmcError::State(
                ErrorInfo::new("undeclared-parameter", "proposer touched a parameter it does not declare")
                    .with_context("node", id.index().to_string()),
            ))
        }
    }

    /// Parameter name.
    pub fn name(&self, id: NodeId) -> Result<&str, McmcError> {
        Ok(self.parameter(id)?.name())
    }

    /// Number of sub-parameters.
    pub fn len(&self, id: NodeId) -> Result<usize, McmcError> {
        Ok(self.parameter(id)?.len())
    }

    /// Current value.
    pub fn value(&self, id: NodeId) -> Result<&Value, McmcError> {
        Ok(self.parameter(id)?.value())
    }

    /// Real element `idx`.
    pub fn real(&self, id: NodeId, idx: usize) -> Result<f64, McmcError> {
        self.parameter(id)?.real(idx)
    }

    /// Integer element `idx`.
    pub fn int(&self, id: NodeId, idx: usize) -> Result<i64, McmcError> {
        self.parameter(id)?.int(idx)
    }

    /// Boolean element `idx`.
    pub fn boolean(&self, id: NodeId, idx: usize) -> Result<bool, McmcError> {
        self.parameter(id)?.boolean(idx)
    }

    /// Snapshots the parameter (or only `indices` of an array) before mutation.
    pub fn cache(&mut self, id: NodeId, indices: Option<&[usize]>) -> Result<(), McmcError> {
        self.parameter_mut(id)?.cache(indices)?;
        self.graph.perturbed.push(id);
        Ok(())
    }

    /// Writes element `idx`.
    pub fn set(&mut self, id: NodeId, idx: usize, element: Scalar) -> Result<(), McmcError> {
        self.parameter_mut(id)?.set(idx, element)
    }

    /// Writes real element `idx`.
    pub fn set_real(&mut self, id: NodeId, idx: usize, value: f64) -> Result<(), McmcError> {
        self.set(id, idx, Scalar::Real(value))
    }

    /// Attaches a diagnostic description to the pending change of `id`.
    ///
    /// The affected indices are always derived from the cached snapshot.
    pub fn set_change_info(&mut self, id: NodeId, info: impl Into<String>) -> Result<(), McmcError> {
        if !self.parameter(id)?.has_pending_cache() {
            return Err(McmcError::State(
                ErrorInfo::new("uncached-change", "change reported for a parameter that was not cached")
                    .with_context("node", self.name(id)?.to_string()),
            ));
        }
        self.graph.changes[id.index()] = Some(ChangeInfo::new(id, info));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependent::{FunctionDependent, FunctionModel};

    fn chain() -> (DependencyGraph, NodeId, NodeId, NodeId) {
        let mut builder = GraphBuilder::new();
        let x = builder.add_parameter("x", Value::Real(1.0)).unwrap();
        let double = builder
            .add_dependent("double", &[x], FunctionDependent::new("double", move |p| Ok(2.0 * p.real(x, 0)?)))
            .unwrap();
        let model = builder
            .add_model("model", &[double], FunctionModel::new("model", move |p| Ok(LogDouble::new(p.real(double, 0)?))))
            .unwrap();
        (builder.build().unwrap(), x, double, model)
    }

    #[test]
    fn order_places_parents_first() {
        let (graph, x, double, model) = chain();
        assert!(graph.rank(x).unwrap() < graph.rank(double).unwrap());
        assert!(graph.rank(double).unwrap() < graph.rank(model).unwrap());
        assert!((graph.likelihood().value() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut builder = GraphBuilder::new();
        let err = builder
            .add_model("m", &[NodeId::from_index(4)], FunctionModel::new("m", |_| Ok(LogDouble::ONE)))
            .unwrap_err();
        assert_eq!(err.info().code, "unknown-parent");
    }

    #[test]
    fn graph_without_model_is_rejected() {
        let mut builder = GraphBuilder::new();
        builder.add_parameter("x", Value::Int(1)).unwrap();
        assert_eq!(builder.build().err().unwrap().info().code, "no-models");
    }

    #[test]
    fn propagate_then_rollback_restores_everything() {
        let (mut graph, x, double, _) = chain();
        let allowed = [x];
        let mut access = graph.parameter_access(&allowed);
        access.cache(x, None).unwrap();
        access.set_real(x, 0, 3.0).unwrap();
        assert_eq!(graph.propagate(false).unwrap(), 2);
        assert!((graph.likelihood().value() - 6.0).abs() < 1e-12);
        assert!(graph.change_info(double).is_some());
        graph.rollback().unwrap();
        assert!((graph.likelihood().value() - 2.0).abs() < 1e-12);
        assert_eq!(graph.parameter(x).unwrap().value(), &Value::Real(1.0));
        assert!(!graph.has_pending_changes());
    }

    #[test]
    fn access_is_limited_to_declared_parameters() {
        let (mut graph, x, double, _) = chain();
        let allowed = [double];
        let mut access = graph.parameter_access(&allowed);
        assert_eq!(
            access.cache(x, None).unwrap_err().info().code,
            "undeclared-parameter"
        );
    }
}
