use std::fmt::Write as _;

use dagmc_core::{ErrorInfo, McmcError};
use serde::{Deserialize, Serialize};

use crate::dependent::Sampleable;

/// Value held by a state parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Value {
    /// Single real number.
    Real(f64),
    /// Vector of real numbers.
    RealArray(Vec<f64>),
    /// Single integer.
    Int(i64),
    /// Vector of integers.
    IntArray(Vec<i64>),
    /// Single boolean.
    Bool(bool),
    /// Vector of booleans.
    BoolArray(Vec<bool>),
}

/// One element of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// Real element.
    Real(f64),
    /// Integer element.
    Int(i64),
    /// Boolean element.
    Bool(bool),
}

impl Scalar {
    fn same_bits(&self, other: &Scalar) -> bool {
        match (self, other) {
            (Scalar::Real(a), Scalar::Real(b)) => a.to_bits() == b.to_bits(),
            (Scalar::Int(a), Scalar::Int(b)) => a == b,
            (Scalar::Bool(a), Scalar::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Value {
    /// Number of sub-parameters (1 for scalars).
    pub fn len(&self) -> usize {
        match self {
            Value::Real(_) | Value::Int(_) | Value::Bool(_) => 1,
            Value::RealArray(v) => v.len(),
            Value::IntArray(v) => v.len(),
            Value::BoolArray(v) => v.len(),
        }
    }

    /// Whether the value holds no elements (only possible for arrays).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether the value is an array variant.
    pub fn is_array(&self) -> bool {
        matches!(
            self,
            Value::RealArray(_) | Value::IntArray(_) | Value::BoolArray(_)
        )
    }

    /// Short name of the variant, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Real(_) => "real",
            Value::RealArray(_) => "real-array",
            Value::Int(_) => "int",
            Value::IntArray(_) => "int-array",
            Value::Bool(_) => "bool",
            Value::BoolArray(_) => "bool-array",
        }
    }

    /// Element at `idx`. Scalars only answer index 0.
    pub fn element(&self, idx: usize) -> Option<Scalar> {
        match self {
            Value::Real(x) if idx == 0 => Some(Scalar::Real(*x)),
            Value::Int(x) if idx == 0 => Some(Scalar::Int(*x)),
            Value::Bool(x) if idx == 0 => Some(Scalar::Bool(*x)),
            Value::RealArray(v) => v.get(idx).copied().map(Scalar::Real),
            Value::IntArray(v) => v.get(idx).copied().map(Scalar::Int),
            Value::BoolArray(v) => v.get(idx).copied().map(Scalar::Bool),
            _ => None,
        }
    }

    fn set_element(&mut self, idx: usize, element: Scalar) -> bool {
        match (self, element) {
            (Value::Real(x), Scalar::Real(new)) if idx == 0 => *x = new,
            (Value::Int(x), Scalar::Int(new)) if idx == 0 => *x = new,
            (Value::Bool(x), Scalar::Bool(new)) if idx == 0 => *x = new,
            (Value::RealArray(v), Scalar::Real(new)) if idx < v.len() => v[idx] = new,
            (Value::IntArray(v), Scalar::Int(new)) if idx < v.len() => v[idx] = new,
            (Value::BoolArray(v), Scalar::Bool(new)) if idx < v.len() => v[idx] = new,
            _ => return false,
        }
        true
    }

    /// Bitwise comparison; distinguishes `0.0` from `-0.0` and treats equal NaNs as equal.
    pub fn same_bits(&self, other: &Value) -> bool {
        if std::mem::discriminant(self) != std::mem::discriminant(other) || self.len() != other.len()
        {
            return false;
        }
        (0..self.len()).all(|idx| match (self.element(idx), other.element(idx)) {
            (Some(a), Some(b)) => a.same_bits(&b),
            _ => false,
        })
    }

    fn format_sample(&self) -> String {
        fn join<T: std::fmt::Display>(items: &[T]) -> String {
            let mut out = String::from("[");
            for (idx, item) in items.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{item}");
            }
            out.push(']');
            out
        }
        match self {
            Value::Real(x) => x.to_string(),
            Value::Int(x) => x.to_string(),
            Value::Bool(x) => x.to_string(),
            Value::RealArray(v) => join(v),
            Value::IntArray(v) => join(v),
            Value::BoolArray(v) => join(v),
        }
    }
}

#[derive(Debug, Clone)]
enum Snapshot {
    Whole(Value),
    Elements(Vec<(usize, Scalar)>),
}

/// Outcome of comparing a parameter against its pending snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detected {
    /// Value is bit-identical to the snapshot.
    Unchanged,
    /// A scalar parameter changed.
    Whole,
    /// These array elements changed.
    Elements(Vec<usize>),
}

/// Mutable DAG source holding scalar or array state plus one pending cache slot.
#[derive(Debug, Clone)]
pub struct StateParameter {
    name: String,
    value: Value,
    cache: Option<Snapshot>,
}

impl StateParameter {
    /// Creates a parameter with its initial value.
    pub fn new(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: name.into(),
            value,
            cache: None,
        }
    }

    /// Parameter name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Number of sub-parameters.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    /// Whether the parameter has no sub-parameters.
    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Whether a snapshot is waiting to be cleared or restored.
    pub fn has_pending_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// Snapshots the whole value, or only `indices` of an array value.
    ///
    /// Fails if a snapshot is already pending or an index is out of range.
    pub fn cache(&mut self, indices: Option<&[usize]>) -> Result<(), McmcError> {
        if self.cache.is_some() {
            return Err(self.protocol_error(
                "cache-pending",
                "parameter cached again before its pending cache was resolved",
            ));
        }
        let snapshot = match indices {
            Some(indices) if self.value.is_array() => {
                let mut elements = Vec::with_capacity(indices.len());
                for &idx in indices {
                    let element = self.value.element(idx).ok_or_else(|| self.index_error(idx))?;
                    elements.push((idx, element));
                }
                Snapshot::Elements(elements)
            }
            _ => Snapshot::Whole(self.value.clone()),
        };
        self.cache = Some(snapshot);
        Ok(())
    }

    /// Discards the pending snapshot, keeping the current value.
    pub fn clear_cache(&mut self) -> Result<(), McmcError> {
        self.cache
            .take()
            .map(|_| ())
            .ok_or_else(|| self.protocol_error("cache-missing", "no pending cache to clear"))
    }

    /// Overwrites the current value with the pending snapshot.
    pub fn restore_cache(&mut self) -> Result<(), McmcError> {
        match self.cache.take() {
            Some(Snapshot::Whole(value)) => self.value = value,
            Some(Snapshot::Elements(elements)) => {
                for (idx, element) in elements {
                    self.value.set_element(idx, element);
                }
            }
            None => {
                return Err(self.protocol_error("cache-missing", "no pending cache to restore"))
            }
        }
        Ok(())
    }

    /// Compares the current value with the pending snapshot.
    pub fn detect_change(&self) -> Detected {
        match &self.cache {
            None => Detected::Unchanged,
            Some(Snapshot::Whole(old)) => {
                if !self.value.is_array() {
                    if old.same_bits(&self.value) {
                        Detected::Unchanged
                    } else {
                        Detected::Whole
                    }
                } else {
                    let changed: Vec<usize> = (0..self.value.len())
                        .filter(|&idx| match (old.element(idx), self.value.element(idx)) {
                            (Some(a), Some(b)) => !a.same_bits(&b),
                            _ => true,
                        })
                        .collect();
                    if changed.is_empty() {
                        Detected::Unchanged
                    } else {
                        Detected::Elements(changed)
                    }
                }
            }
            Some(Snapshot::Elements(elements)) => {
                let mut changed: Vec<usize> = elements
                    .iter()
                    .filter(|(idx, old)| match self.value.element(*idx) {
                        Some(current) => !current.same_bits(old),
                        None => true,
                    })
                    .map(|(idx, _)| *idx)
                    .collect();
                changed.sort_unstable();
                changed.dedup();
                if changed.is_empty() {
                    Detected::Unchanged
                } else {
                    Detected::Elements(changed)
                }
            }
        }
    }

    /// Reads element `idx` as a real number.
    pub fn real(&self, idx: usize) -> Result<f64, McmcError> {
        match self.value.element(idx) {
            Some(Scalar::Real(x)) => Ok(x),
            Some(_) => Err(self.kind_error("real")),
            None => Err(self.index_error(idx)),
        }
    }

    /// Reads element `idx` as an integer.
    pub fn int(&self, idx: usize) -> Result<i64, McmcError> {
        match self.value.element(idx) {
            Some(Scalar::Int(x)) => Ok(x),
            Some(_) => Err(self.kind_error("int")),
            None => Err(self.index_error(idx)),
        }
    }

    /// Reads element `idx` as a boolean.
    pub fn boolean(&self, idx: usize) -> Result<bool, McmcError> {
        match self.value.element(idx) {
            Some(Scalar::Bool(x)) => Ok(x),
            Some(_) => Err(self.kind_error("bool")),
            None => Err(self.index_error(idx)),
        }
    }

    /// Writes element `idx`. Requires a pending cache, so every write can be rolled back.
    pub fn set(&mut self, idx: usize, element: Scalar) -> Result<(), McmcError> {
        if self.cache.is_none() {
            return Err(self.protocol_error(
                "uncached-write",
                "parameter written without a pending cache",
            ));
        }
        if let Some(Snapshot::Elements(elements)) = &self.cache {
            if !elements.iter().any(|(cached, _)| *cached == idx) {
                return Err(McmcError::State(
                    ErrorInfo::new("uncached-write", "element written outside the cached indices")
                        .with_context("parameter", self.name.clone())
                        .with_context("index", idx.to_string()),
                ));
            }
        }
        if self.value.element(idx).is_none() {
            return Err(self.index_error(idx));
        }
        let kind = self.value.kind_name();
        if !self.value.set_element(idx, element) {
            return Err(self.kind_error(kind));
        }
        Ok(())
    }

    fn protocol_error(&self, code: &str, message: &str) -> McmcError {
        McmcError::State(ErrorInfo::new(code, message).with_context("parameter", self.name.clone()))
    }

    fn index_error(&self, idx: usize) -> McmcError {
        McmcError::State(
            ErrorInfo::new("index-out-of-range", "sub-parameter index out of range")
                .with_context("parameter", self.name.clone())
                .with_context("index", idx.to_string())
                .with_context("len", self.value.len().to_string()),
        )
    }

    fn kind_error(&self, requested: &str) -> McmcError {
        McmcError::State(
            ErrorInfo::new("kind-mismatch", "element kind does not match parameter kind")
                .with_context("parameter", self.name.clone())
                .with_context("requested", requested)
                .with_context("actual", self.value.kind_name()),
        )
    }
}

impl Sampleable for StateParameter {
    fn sample_header(&self) -> String {
        self.name.clone()
    }

    fn sample_value(&self) -> String {
        self.value.format_sample()
    }
}
