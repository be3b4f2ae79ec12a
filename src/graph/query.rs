//! Pattern-query primitives over a [`Graph`].
//!
//! Traversals return node ids ordered ascending by id on each level, so
//! results are stable no matter how the graph was built. A depth of
//! [`UNBOUNDED`] follows edges until nothing new is reachable; depth 0
//! returns nothing.

use ahash::AHashSet;
use std::collections::BTreeMap;

use crate::graph::{CfgKind, Edge, Graph, Node, NodeId};

/// Depth meaning "no limit".
pub const UNBOUNDED: usize = usize::MAX;

/// Attribute/value pairs a node must carry, e.g. `[("label_type", "if_statement")]`.
pub type Labels<'a> = [(&'a str, &'a str)];

/// Which edges a traversal follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFilter {
    Any,
    Ast,
    Cfg,
    CfgOf(CfgKind),
}

impl EdgeFilter {
    pub fn accepts(&self, edge: &Edge) -> bool {
        match self {
            EdgeFilter::Any => true,
            EdgeFilter::Ast => edge.is_ast(),
            EdgeFilter::Cfg => edge.is_cfg(),
            EdgeFilter::CfgOf(kind) => edge.cfg == Some(*kind),
        }
    }
}

/// Whether `node` carries every expected attribute value.
pub fn has_labels(node: &Node, expected: &Labels<'_>) -> bool {
    expected
        .iter()
        .all(|(key, value)| node.label(key).is_some_and(|actual| actual == *value))
}

/// Predicate form of [`has_labels`].
pub fn pred_has_labels<'a>(expected: &'a Labels<'a>) -> impl Fn(&Node) -> bool + 'a {
    move |node| has_labels(node, expected)
}

/// Ids among `ids` whose node satisfies `predicate`, in input order.
pub fn filter_nodes<I, P>(graph: &Graph, ids: I, predicate: P) -> Vec<NodeId>
where
    I: IntoIterator<Item = NodeId>,
    P: Fn(&Node) -> bool,
{
    ids.into_iter()
        .filter(|&id| graph.get(id).is_some_and(&predicate))
        .collect()
}

/// Every node carrying the expected labels, in id order.
pub fn matching_nodes(graph: &Graph, expected: &Labels<'_>) -> Vec<NodeId> {
    filter_nodes(graph, graph.node_ids(), pred_has_labels(expected))
}

#[derive(Clone, Copy)]
enum Direction {
    Forward,
    Backward,
}

fn neighbors(graph: &Graph, id: NodeId, filter: EdgeFilter, direction: Direction) -> Vec<NodeId> {
    match direction {
        Direction::Forward => graph
            .successors(id)
            .iter()
            .copied()
            .filter(|&dst| graph.edge(id, dst).is_some_and(|e| filter.accepts(e)))
            .collect(),
        Direction::Backward => graph
            .predecessors(id)
            .iter()
            .copied()
            .filter(|&src| graph.edge(src, id).is_some_and(|e| filter.accepts(e)))
            .collect(),
    }
}

// Direct neighbors first, then each neighbor's expansion in order.
fn walk(graph: &Graph, start: NodeId, depth: usize, filter: EdgeFilter, direction: Direction) -> Vec<NodeId> {
    let mut results = Vec::new();
    if depth == 0 || !graph.contains(start) {
        return results;
    }

    let mut emitted: AHashSet<NodeId> = AHashSet::new();
    let mut expanded: AHashSet<NodeId> = AHashSet::new();
    let mut stack = vec![(start, depth)];

    while let Some((id, remaining)) = stack.pop() {
        if !expanded.insert(id) {
            continue;
        }
        let next = neighbors(graph, id, filter, direction);
        for &n in &next {
            if n != start && emitted.insert(n) {
                results.push(n);
            }
        }
        if remaining > 1 {
            let below = if remaining == UNBOUNDED { UNBOUNDED } else { remaining - 1 };
            for &n in next.iter().rev() {
                stack.push((n, below));
            }
        }
    }
    results
}

/// Nodes reachable from `id` over edges accepted by `filter`.
pub fn adj(graph: &Graph, id: NodeId, depth: usize, filter: EdgeFilter) -> Vec<NodeId> {
    walk(graph, id, depth, filter, Direction::Forward)
}

/// Nodes reaching `id` over edges accepted by `filter`.
pub fn pred(graph: &Graph, id: NodeId, depth: usize, filter: EdgeFilter) -> Vec<NodeId> {
    walk(graph, id, depth, filter, Direction::Backward)
}

pub fn adj_ast(graph: &Graph, id: NodeId, depth: usize) -> Vec<NodeId> {
    adj(graph, id, depth, EdgeFilter::Ast)
}

pub fn adj_cfg(graph: &Graph, id: NodeId, depth: usize) -> Vec<NodeId> {
    adj(graph, id, depth, EdgeFilter::Cfg)
}

pub fn pred_ast(graph: &Graph, id: NodeId, depth: usize) -> Vec<NodeId> {
    pred(graph, id, depth, EdgeFilter::Ast)
}

pub fn pred_cfg(graph: &Graph, id: NodeId, depth: usize) -> Vec<NodeId> {
    pred(graph, id, depth, EdgeFilter::Cfg)
}

/// AST descendants within `depth` carrying the expected labels.
pub fn adj_ast_matching(graph: &Graph, id: NodeId, depth: usize, expected: &Labels<'_>) -> Vec<NodeId> {
    filter_nodes(graph, adj_ast(graph, id, depth), pred_has_labels(expected))
}

/// CFG successors within `depth` carrying the expected labels.
pub fn adj_cfg_matching(graph: &Graph, id: NodeId, depth: usize, expected: &Labels<'_>) -> Vec<NodeId> {
    filter_nodes(graph, adj_cfg(graph, id, depth), pred_has_labels(expected))
}

/// AST descendants of `id` within `depth` whose type is `kind`.
pub fn get_ast_childs(graph: &Graph, id: NodeId, kind: &str, depth: usize) -> Vec<NodeId> {
    adj_ast(graph, id, depth)
        .into_iter()
        .filter(|&child| graph.node(child).kind == kind)
        .collect()
}

/// Result of [`match_ast`]: the first direct child of each requested type,
/// plus every other child in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AstMatch {
    pub matched: BTreeMap<String, Option<NodeId>>,
    pub rest: Vec<NodeId>,
}

impl AstMatch {
    pub fn get(&self, kind: &str) -> Option<NodeId> {
        self.matched.get(kind).copied().flatten()
    }

    /// Whether every requested type matched and nothing else is left.
    pub fn is_exact(&self) -> bool {
        self.rest.is_empty() && self.matched.values().all(Option::is_some)
    }
}

pub fn match_ast(graph: &Graph, id: NodeId, kinds: &[&str]) -> AstMatch {
    let mut result = AstMatch {
        matched: kinds.iter().map(|k| (k.to_string(), None)).collect(),
        rest: Vec::new(),
    };
    for child in adj_ast(graph, id, 1) {
        match result.matched.get_mut(graph.node(child).kind.as_str()) {
            Some(slot) if slot.is_none() => *slot = Some(child),
            _ => result.rest.push(child),
        }
    }
    result
}

/// First direct child of `id` of type `kind`.
pub fn match_ast_d(graph: &Graph, id: NodeId, kind: &str) -> Option<NodeId> {
    match_ast(graph, id, &[kind]).get(kind)
}

/// Result of [`match_ast_group`]: all direct children of each requested type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AstGroupMatch {
    pub groups: BTreeMap<String, Vec<NodeId>>,
    pub rest: Vec<NodeId>,
}

impl AstGroupMatch {
    pub fn get(&self, kind: &str) -> &[NodeId] {
        self.groups.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }
}

pub fn match_ast_group(graph: &Graph, id: NodeId, kinds: &[&str]) -> AstGroupMatch {
    let mut result = AstGroupMatch {
        groups: kinds.iter().map(|k| (k.to_string(), Vec::new())).collect(),
        rest: Vec::new(),
    };
    for child in adj_ast(graph, id, 1) {
        match result.groups.get_mut(graph.node(child).kind.as_str()) {
            Some(group) => group.push(child),
            None => result.rest.push(child),
        }
    }
    result
}

pub fn match_ast_group_d(graph: &Graph, id: NodeId, kind: &str) -> Vec<NodeId> {
    match_ast_group(graph, id, &[kind]).get(kind).to_vec()
}

pub fn is_connected_to_cfg(graph: &Graph, id: NodeId) -> bool {
    !graph.cfg_successors(id).is_empty() || !graph.cfg_predecessors(id).is_empty()
}

/// `id` itself or its nearest AST ancestor touching a CFG edge; `id` when
/// none does.
pub fn lookup_first_cfg_parent(graph: &Graph, id: NodeId) -> NodeId {
    std::iter::once(id)
        .chain(graph.ast_ancestors(id))
        .find(|&candidate| is_connected_to_cfg(graph, candidate))
        .unwrap_or(id)
}

/// All simple paths from `source` to `target` over accepted edges.
///
/// Exponential in the worst case; meant for function-sized CFGs.
pub fn paths(graph: &Graph, source: NodeId, target: NodeId, filter: EdgeFilter) -> Vec<Vec<NodeId>> {
    let mut found = Vec::new();
    if !graph.contains(source) || !graph.contains(target) {
        return found;
    }

    let mut path = vec![source];
    let mut on_path: AHashSet<NodeId> = AHashSet::from_iter([source]);
    let mut frontier = vec![neighbors(graph, source, filter, Direction::Forward).into_iter()];

    while let Some(next) = frontier.last_mut().map(|edges| edges.next()) {
        match next {
            Some(n) if n == target => {
                let mut complete = path.clone();
                complete.push(n);
                found.push(complete);
            }
            Some(n) if !on_path.contains(&n) => {
                path.push(n);
                on_path.insert(n);
                frontier.push(neighbors(graph, n, filter, Direction::Forward).into_iter());
            }
            Some(_) => {}
            None => {
                frontier.pop();
                if let Some(done) = path.pop() {
                    on_path.remove(&done);
                }
            }
        }
    }
    found
}

/// Every CFG path from `id` to a node with no CFG successors.
pub fn branches_cfg(graph: &Graph, id: NodeId) -> Vec<Vec<NodeId>> {
    let mut branches: Vec<Vec<NodeId>> = adj_cfg(graph, id, UNBOUNDED)
        .into_iter()
        .filter(|&reached| graph.cfg_successors(reached).is_empty())
        .flat_map(|leaf| paths(graph, id, leaf, EdgeFilter::Cfg))
        .collect();
    branches.sort();
    branches
}

/// Whether every id in `ids` has one of `kinds` as its type.
pub fn contains_label_type_in(graph: &Graph, ids: &[NodeId], kinds: &[&str]) -> bool {
    ids.iter()
        .all(|&id| kinds.contains(&graph.node(id).kind.as_str()))
}

/// Concatenated `label_text` of `ids`; non-final nodes contribute nothing.
pub fn concatenate_label_text(graph: &Graph, ids: &[NodeId], separator: &str) -> String {
    ids.iter()
        .filter_map(|&id| graph.node(id).text.as_deref())
        .collect::<Vec<_>>()
        .join(separator)
}

/// Source text of the subtree at `id`, rebuilt from its final nodes.
///
/// Whitespace between tokens is not preserved.
pub fn node_text(graph: &Graph, id: NodeId) -> String {
    if let Some(text) = &graph.node(id).text {
        return text.clone();
    }
    let mut leaves: Vec<NodeId> = adj_ast(graph, id, UNBOUNDED)
        .into_iter()
        .filter(|&n| graph.node(n).is_final())
        .collect();
    // Pre-order ids are source order
    leaves.sort_unstable();
    concatenate_label_text(graph, &leaves, "")
}

#[cfg(test)]
mod tests {
    use super::*;

    // 0 -> 1 -> 3
    //   -> 2
    // cfg: 1 -> 2 -> 3 -> 1
    fn sample() -> Graph {
        let mut graph = Graph::new();
        let kinds = ["root", "stmt", "stmt", "identifier"];
        for (i, kind) in kinds.iter().enumerate() {
            graph.add_node(Node::new(*kind, i + 1, 1, true));
        }
        graph.node_mut(NodeId(3)).unwrap().text = Some("x".to_string());
        graph.add_ast_edge(NodeId(0), NodeId(1), 0);
        graph.add_ast_edge(NodeId(0), NodeId(2), 1);
        graph.add_ast_edge(NodeId(1), NodeId(3), 0);
        graph.add_cfg_edge(NodeId(1), NodeId(2), CfgKind::Always);
        graph.add_cfg_edge(NodeId(2), NodeId(3), CfgKind::True);
        graph.add_cfg_edge(NodeId(3), NodeId(1), CfgKind::Always);
        graph
    }

    #[test]
    fn test_adj_ast_depths() {
        let graph = sample();
        assert_eq!(adj_ast(&graph, NodeId(0), 1), vec![NodeId(1), NodeId(2)]);
        assert_eq!(
            adj_ast(&graph, NodeId(0), UNBOUNDED),
            vec![NodeId(1), NodeId(2), NodeId(3)]
        );
        assert!(adj_ast(&graph, NodeId(0), 0).is_empty());
    }

    #[test]
    fn test_adj_cfg_terminates_on_cycles() {
        let graph = sample();
        assert_eq!(
            adj_cfg(&graph, NodeId(1), UNBOUNDED),
            vec![NodeId(2), NodeId(3)]
        );
        assert_eq!(pred_cfg(&graph, NodeId(1), 1), vec![NodeId(3)]);
        assert_eq!(
            adj(&graph, NodeId(2), 1, EdgeFilter::CfgOf(CfgKind::True)),
            vec![NodeId(3)]
        );
    }

    #[test]
    fn test_label_predicates() {
        let graph = sample();
        assert_eq!(
            matching_nodes(&graph, &[("label_type", "stmt")]),
            vec![NodeId(1), NodeId(2)]
        );
        assert_eq!(
            matching_nodes(&graph, &[("label_type", "stmt"), ("label_l", "3")]),
            vec![NodeId(2)]
        );
        assert!(matching_nodes(&graph, &[("label_text", "y")]).is_empty());
    }

    #[test]
    fn test_match_ast_first_then_rest() {
        let graph = sample();
        let m = match_ast(&graph, NodeId(0), &["stmt", "missing"]);
        assert_eq!(m.get("stmt"), Some(NodeId(1)));
        assert_eq!(m.get("missing"), None);
        assert_eq!(m.rest, vec![NodeId(2)]);
        assert!(!m.is_exact());

        let g = match_ast_group(&graph, NodeId(0), &["stmt"]);
        assert_eq!(g.get("stmt"), &[NodeId(1), NodeId(2)]);
        assert!(g.rest.is_empty());
    }

    #[test]
    fn test_lookup_first_cfg_parent() {
        let mut graph = sample();
        let lone = graph.add_node(Node::new("identifier", 9, 9, true));
        graph.add_ast_edge(NodeId(3), lone, 0);
        assert_eq!(lookup_first_cfg_parent(&graph, lone), NodeId(3));
        assert_eq!(lookup_first_cfg_parent(&graph, NodeId(0)), NodeId(0));
    }

    #[test]
    fn test_paths_are_simple() {
        let graph = sample();
        assert_eq!(
            paths(&graph, NodeId(1), NodeId(3), EdgeFilter::Cfg),
            vec![vec![NodeId(1), NodeId(2), NodeId(3)]]
        );
        assert!(paths(&graph, NodeId(0), NodeId(3), EdgeFilter::Cfg).is_empty());
        assert_eq!(
            paths(&graph, NodeId(0), NodeId(3), EdgeFilter::Ast),
            vec![vec![NodeId(0), NodeId(1), NodeId(3)]]
        );
    }

    #[test]
    fn test_node_text_rebuilds_from_leaves() {
        let graph = sample();
        assert_eq!(node_text(&graph, NodeId(0)), "x");
        assert_eq!(concatenate_label_text(&graph, &[NodeId(3), NodeId(3)], "."), "x.x");
        assert!(contains_label_type_in(&graph, &[NodeId(1), NodeId(2)], &["stmt"]));
    }
}
