use std::any::Any;

use dagmc_core::{ErrorInfo, LogDouble, McmcError};

use crate::change::ChangeInfo;
use crate::graph::ParentView;
use crate::parameter::Value;

/// Anything that contributes a column to the sample output.
pub trait Sampleable {
    /// Column header.
    fn sample_header(&self) -> String;
    /// Column value for the current state.
    fn sample_value(&self) -> String;
}

/// Human-readable reports printed before and after a run.
///
/// Every line of a report starts with `prefix` so nested reports indent.
pub trait InfoProvider {
    /// Report emitted before the first iteration.
    fn pre_info(&self, _prefix: &str) -> String {
        String::new()
    }

    /// Report emitted after the last iteration.
    fn post_info(&self, _prefix: &str) -> String {
        String::new()
    }
}

/// Interior or sink node whose value is derived from its parents.
///
/// The graph drives every implementation through the same cycle: one call to
/// [`cache_and_update`](Self::cache_and_update), then exactly one of
/// [`clear_cache`](Self::clear_cache) or [`restore_cache`](Self::restore_cache).
/// The graph only calls `cache_and_update` when at least one parent carries a
/// [`ChangeInfo`].
pub trait ProperDependent: Any {
    /// Computes the initial value once all parents are initialised.
    fn initialize(&mut self, parents: &ParentView<'_>) -> Result<(), McmcError>;

    /// Snapshots the current value, recomputes from the changed parents and
    /// returns a change record iff the value actually changed.
    fn cache_and_update(
        &mut self,
        parents: &ParentView<'_>,
        will_sample: bool,
    ) -> Result<Option<ChangeInfo>, McmcError>;

    /// Discards the snapshot after acceptance.
    fn clear_cache(&mut self, will_sample: bool) -> Result<(), McmcError>;

    /// Reinstates the snapshot after rejection.
    fn restore_cache(&mut self, will_sample: bool) -> Result<(), McmcError>;

    /// Downcasting hook used by [`ParentView::dependent`].
    fn as_any(&self) -> &dyn Any;

    /// Value exposed to children through [`ParentView::value`], if any.
    fn value(&self) -> Option<&Value> {
        None
    }

    /// Sample column provider, if this node can be written to the output.
    fn as_sampleable(&self) -> Option<&dyn Sampleable> {
        None
    }
}

/// Sink of the dependency graph exposing a likelihood.
pub trait Model: ProperDependent {
    /// Current likelihood; never negative.
    fn likelihood(&self) -> LogDouble;
}

/// Value plus a single pending snapshot, the building block of most dependents.
#[derive(Debug, Clone)]
pub struct CacheSlot<T> {
    owner: String,
    current: T,
    cached: Option<T>,
}

impl<T: Clone> CacheSlot<T> {
    /// Creates a slot for the node called `owner`.
    pub fn new(owner: impl Into<String>, initial: T) -> Self {
        Self {
            owner: owner.into(),
            current: initial,
            cached: None,
        }
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.current
    }

    /// Replaces the current value.
    pub fn set(&mut self, value: T) {
        self.current = value;
    }

    /// Whether a snapshot is pending.
    pub fn is_cached(&self) -> bool {
        self.cached.is_some()
    }

    /// Snapshots the current value.
    pub fn cache(&mut self) -> Result<(), McmcError> {
        if self.cached.is_some() {
            return Err(self.error("cache-pending", "dependent cached twice"));
        }
        self.cached = Some(self.current.clone());
        Ok(())
    }

    /// Drops the snapshot.
    pub fn clear(&mut self) -> Result<(), McmcError> {
        match self.cached.take() {
            Some(_) => Ok(()),
            None => Err(self.error("cache-missing", "no pending cache to clear")),
        }
    }

    /// Restores the snapshot.
    pub fn restore(&mut self) -> Result<(), McmcError> {
        match self.cached.take() {
            Some(old) => {
                self.current = old;
                Ok(())
            }
            None => Err(self.error("cache-missing", "no pending cache to restore")),
        }
    }

    fn error(&self, code: &str, message: &str) -> McmcError {
        McmcError::State(ErrorInfo::new(code, message).with_context("node", self.owner.clone()))
    }
}

type LikelihoodFn = dyn FnMut(&ParentView<'_>) -> Result<LogDouble, McmcError>;
type RealFn = dyn FnMut(&ParentView<'_>) -> Result<f64, McmcError>;

/// Model whose likelihood is a closure over its parents.
pub struct FunctionModel {
    compute: Box<LikelihoodFn>,
    slot: CacheSlot<LogDouble>,
}

impl FunctionModel {
    /// Wraps `compute`, which is called on initialisation and whenever a parent changes.
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: FnMut(&ParentView<'_>) -> Result<LogDouble, McmcError> + 'static,
    {
        Self {
            compute: Box::new(compute),
            slot: CacheSlot::new(name, LogDouble::ZERO),
        }
    }
}

impl ProperDependent for FunctionModel {
    fn initialize(&mut self, parents: &ParentView<'_>) -> Result<(), McmcError> {
        let value = (self.compute)(parents)?;
        self.slot.set(value);
        Ok(())
    }

    fn cache_and_update(
        &mut self,
        parents: &ParentView<'_>,
        _will_sample: bool,
    ) -> Result<Option<ChangeInfo>, McmcError> {
        self.slot.cache()?;
        let old = *self.slot.get();
        let new = (self.compute)(parents)?;
        if new.ln().to_bits() == old.ln().to_bits() {
            return Ok(None);
        }
        self.slot.set(new);
        Ok(Some(ChangeInfo::new(parents.node(), "likelihood recomputed")))
    }

    fn clear_cache(&mut self, _will_sample: bool) -> Result<(), McmcError> {
        self.slot.clear()
    }

    fn restore_cache(&mut self, _will_sample: bool) -> Result<(), McmcError> {
        self.slot.restore()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_sampleable(&self) -> Option<&dyn Sampleable> {
        Some(self)
    }
}

impl Model for FunctionModel {
    fn likelihood(&self) -> LogDouble {
        *self.slot.get()
    }
}

impl Sampleable for FunctionModel {
    fn sample_header(&self) -> String {
        self.slot.owner.clone()
    }

    fn sample_value(&self) -> String {
        self.slot.get().to_string()
    }
}

/// Interior node holding one real number computed from its parents.
pub struct FunctionDependent {
    compute: Box<RealFn>,
    slot: CacheSlot<Value>,
}

impl FunctionDependent {
    /// Wraps `compute`, which is called on initialisation and whenever a parent changes.
    pub fn new<F>(name: impl Into<String>, compute: F) -> Self
    where
        F: FnMut(&ParentView<'_>) -> Result<f64, McmcError> + 'static,
    {
        Self {
            compute: Box::new(compute),
            slot: CacheSlot::new(name, Value::Real(0.0)),
        }
    }
}

impl ProperDependent for FunctionDependent {
    fn initialize(&mut self, parents: &ParentView<'_>) -> Result<(), McmcError> {
        let value = (self.compute)(parents)?;
        self.slot.set(Value::Real(value));
        Ok(())
    }

    fn cache_and_update(
        &mut self,
        parents: &ParentView<'_>,
        _will_sample: bool,
    ) -> Result<Option<ChangeInfo>, McmcError> {
        self.slot.cache()?;
        let new = Value::Real((self.compute)(parents)?);
        if new.same_bits(self.slot.get()) {
            return Ok(None);
        }
        self.slot.set(new);
        Ok(Some(ChangeInfo::new(parents.node(), "value recomputed")))
    }

    fn clear_cache(&mut self, _will_sample: bool) -> Result<(), McmcError> {
        self.slot.clear()
    }

    fn restore_cache(&mut self, _will_sample: bool) -> Result<(), McmcError> {
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

impl Sampleable for FunctionDependent {
    fn sample_header(&self) -> String {
        self.slot.owner.clone()
    }

    fn sample_value(&self) -> String {
        match self.slot.get() {
            Value::Real(x) => x.to_string(),
            other => format!("{other:?}"),
        }
    }
}
