//! The attributed source graph and the stages that build and read it.
//!
//! A [`Graph`] is an arena of [`Node`]s indexed by [`NodeId`], with at most
//! one [`Edge`] per ordered node pair. AST and CFG information share that
//! edge as attributes.

pub mod annotate;
pub mod ast_extractor;
pub mod ast_node;
pub mod cfg_extractor;
pub mod cfg_rules;
pub mod export;
pub mod metadata;
pub mod query;
pub mod scan;
pub mod schema;
pub mod shard;
pub mod syntax;

pub use schema::{CfgKind, Edge, Node, NodeId};

use ahash::AHashMap;

/// Directed graph for one source file.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    edges: AHashMap<(NodeId, NodeId), Edge>,
    // Adjacency kept sorted by id
    successors: Vec<Vec<NodeId>>,
    predecessors: Vec<Vec<NodeId>>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a node; ids are handed out in insertion order.
    pub fn add_node(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.successors.push(Vec::new());
        self.predecessors.push(Vec::new());
        id
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Panics if `id` is not in this graph.
    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index())
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Nodes in id order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (NodeId(i as u32), node))
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    pub fn edge(&self, src: NodeId, dst: NodeId) -> Option<&Edge> {
        self.edges.get(&(src, dst))
    }

    /// All edges sorted by (source, target).
    pub fn edges(&self) -> Vec<(NodeId, NodeId, Edge)> {
        let mut out: Vec<_> = self
            .edges
            .iter()
            .map(|(&(src, dst), edge)| (src, dst, *edge))
            .collect();
        out.sort_by_key(|(src, dst, _)| (*src, *dst));
        out
    }

    pub fn ast_edge_count(&self) -> usize {
        self.edges.values().filter(|edge| edge.is_ast()).count()
    }

    pub fn cfg_edge_count(&self) -> usize {
        self.edges.values().filter(|edge| edge.is_cfg()).count()
    }

    fn link(&mut self, src: NodeId, dst: NodeId) -> &mut Edge {
        let successors = &mut self.successors[src.index()];
        if let Err(pos) = successors.binary_search(&dst) {
            successors.insert(pos, dst);
        }
        let predecessors = &mut self.predecessors[dst.index()];
        if let Err(pos) = predecessors.binary_search(&src) {
            predecessors.insert(pos, src);
        }
        self.edges.entry((src, dst)).or_default()
    }

    fn unlink_if_empty(&mut self, src: NodeId, dst: NodeId) {
        if !self.edges.get(&(src, dst)).is_some_and(Edge::is_empty) {
            return;
        }
        self.edges.remove(&(src, dst));
        if let Ok(pos) = self.successors[src.index()].binary_search(&dst) {
            self.successors[src.index()].remove(pos);
        }
        if let Ok(pos) = self.predecessors[dst.index()].binary_search(&src) {
            self.predecessors[dst.index()].remove(pos);
        }
    }

    /// Mark `child` as the `index`-th AST child of `parent`.
    pub fn add_ast_edge(&mut self, parent: NodeId, child: NodeId, index: u32) {
        if !self.contains(parent) || !self.contains(child) {
            return;
        }
        self.link(parent, child).ast_index = Some(index);
    }

    /// Add a CFG edge unless the pair already carries one.
    ///
    /// Returns whether the edge was added. Self loops are refused.
    pub fn add_cfg_edge(&mut self, src: NodeId, dst: NodeId, kind: CfgKind) -> bool {
        if src == dst || !self.contains(src) || !self.contains(dst) {
            return false;
        }
        if self.edge(src, dst).is_some_and(Edge::is_cfg) {
            return false;
        }
        self.link(src, dst).cfg = Some(kind);
        true
    }

    /// Drop the CFG attribute of a pair, keeping its AST attribute.
    pub fn remove_cfg_edge(&mut self, src: NodeId, dst: NodeId) -> Option<CfgKind> {
        let kind = self.edges.get_mut(&(src, dst))?.cfg.take();
        self.unlink_if_empty(src, dst);
        kind
    }

    pub fn cfg_kind(&self, src: NodeId, dst: NodeId) -> Option<CfgKind> {
        self.edge(src, dst).and_then(|edge| edge.cfg)
    }

    /// Targets of any edge leaving `id`, ascending.
    pub fn successors(&self, id: NodeId) -> &[NodeId] {
        self.successors.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Sources of any edge entering `id`, ascending.
    pub fn predecessors(&self, id: NodeId) -> &[NodeId] {
        self.predecessors.get(id.index()).map(Vec::as_slice).unwrap_or(&[])
    }

    /// AST children ordered by `label_index`.
    pub fn ast_children(&self, id: NodeId) -> Vec<NodeId> {
        let mut children: Vec<(u32, NodeId)> = self
            .successors(id)
            .iter()
            .filter_map(|&child| {
                self.edge(id, child)
                    .and_then(|edge| edge.ast_index)
                    .map(|index| (index, child))
            })
            .collect();
        children.sort_unstable();
        children.into_iter().map(|(_, child)| child).collect()
    }

    /// AST children the grammar names, in order.
    pub fn named_children(&self, id: NodeId) -> Vec<NodeId> {
        self.ast_children(id)
            .into_iter()
            .filter(|&child| self.node(child).named)
            .collect()
    }

    pub fn ast_parent(&self, id: NodeId) -> Option<NodeId> {
        self.predecessors(id)
            .iter()
            .copied()
            .find(|&parent| self.edge(parent, id).is_some_and(Edge::is_ast))
    }

    /// Ancestors from the parent up to the root.
    pub fn ast_ancestors(&self, id: NodeId) -> AstAncestors<'_> {
        AstAncestors {
            graph: self,
            current: self.ast_parent(id),
        }
    }

    /// Outgoing CFG edges of `id`, ascending by target.
    pub fn cfg_successors(&self, id: NodeId) -> Vec<(NodeId, CfgKind)> {
        self.successors(id)
            .iter()
            .filter_map(|&dst| self.cfg_kind(id, dst).map(|kind| (dst, kind)))
            .collect()
    }

    /// Incoming CFG edges of `id`, ascending by source.
    pub fn cfg_predecessors(&self, id: NodeId) -> Vec<(NodeId, CfgKind)> {
        self.predecessors(id)
            .iter()
            .filter_map(|&src| self.cfg_kind(src, id).map(|kind| (src, kind)))
            .collect()
    }

    /// Keep every node, keep only the edge attributes `keep` selects.
    pub(crate) fn filtered_copy(&self, keep: impl Fn(&Edge) -> Edge) -> Graph {
        let mut copy = Graph {
            nodes: self.nodes.clone(),
            edges: AHashMap::new(),
            successors: vec![Vec::new(); self.nodes.len()],
            predecessors: vec![Vec::new(); self.nodes.len()],
        };
        for (src, dst, edge) in self.edges() {
            let kept = keep(&edge);
            if !kept.is_empty() {
                *copy.link(src, dst) = kept;
            }
        }
        copy
    }
}

/// Iterator over a node's AST ancestors.
pub struct AstAncestors<'g> {
    graph: &'g Graph,
    current: Option<NodeId>,
}

impl Iterator for AstAncestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.current?;
        self.current = self.graph.ast_parent(id);
        Some(id)
    }
}
