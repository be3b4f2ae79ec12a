//! Node-type index over a lowered graph.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::graph::{Graph, NodeId};

/// Maps each node type to the ids carrying it, in id order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyntaxIndex {
    by_kind: BTreeMap<String, Vec<NodeId>>,
}

impl SyntaxIndex {
    pub fn build(graph: &Graph) -> Self {
        let mut by_kind: BTreeMap<String, Vec<NodeId>> = BTreeMap::new();
        for (id, node) in graph.nodes() {
            by_kind.entry(node.kind.clone()).or_default().push(id);
        }
        Self { by_kind }
    }

    pub fn nodes_of_kind(&self, kind: &str) -> &[NodeId] {
        self.by_kind.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.by_kind.keys().map(String::as_str)
    }

    pub fn count(&self, kind: &str) -> usize {
        self.nodes_of_kind(kind).len()
    }

    pub fn len(&self) -> usize {
        self.by_kind.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}
