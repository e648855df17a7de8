use std::collections::BTreeSet;

use crate::graph::NodeId;

/// Record stating that a node's value changed during the current perturbation.
///
/// A node only carries a `ChangeInfo` when its value actually differs from the
/// cached snapshot; children use its absence to skip recomputation. Records
/// live until the iteration is accepted or rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeInfo {
    node: NodeId,
    info: String,
    affected: Option<Vec<usize>>,
}

impl ChangeInfo {
    /// Creates a record covering the whole node.
    pub fn new(node: NodeId, info: impl Into<String>) -> Self {
        Self {
            node,
            info: info.into(),
            affected: None,
        }
    }

    /// Creates a record restricted to the given element indices of an array node.
    pub fn with_indices(node: NodeId, info: impl Into<String>, indices: Vec<usize>) -> Self {
        Self {
            node,
            info: info.into(),
            affected: Some(indices),
        }
    }

    /// Node that changed.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Diagnostic description of the change.
    pub fn info(&self) -> &str {
        &self.info
    }

    /// Changed element indices, or `None` when the whole node may have changed.
    pub fn affected_elements(&self) -> Option<&[usize]> {
        self.affected.as_deref()
    }

    /// Returns the sorted union of affected indices over several records.
    ///
    /// Yields `None` as soon as one record covers its whole node.
    pub fn union<'a, I>(infos: I) -> Option<Vec<usize>>
    where
        I: IntoIterator<Item = &'a ChangeInfo>,
    {
        let mut union = BTreeSet::new();
        for info in infos {
            union.extend(info.affected_elements()?.iter().copied());
        }
        Some(union.into_iter().collect())
    }
}
