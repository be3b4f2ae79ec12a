//! JSON export and AST-only / CFG-only subgraph copies.
//!
//! The export shape is `{"nodes": {id: {label: value}}, "edges": {src:
//! {dst: {label: value}}}}` with ids rendered as decimal strings.

use serde_json::{Map, Value};

use crate::graph::{Edge, Graph};

/// Export a graph with every node and edge label.
pub fn to_json(graph: &Graph) -> Value {
    let mut nodes = Map::new();
    for (id, node) in graph.nodes() {
        let labels: Map<String, Value> = node
            .all_labels()
            .into_iter()
            .map(|(key, value)| (key, Value::String(value)))
            .collect();
        nodes.insert(id.to_string(), Value::Object(labels));
    }

    let mut edges = Map::new();
    for (src, dst, edge) in graph.edges() {
        let labels: Map<String, Value> = edge
            .labels()
            .into_iter()
            .map(|(key, value)| (key.to_string(), Value::String(value)))
            .collect();
        let targets = edges
            .entry(src.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(targets) = targets {
            targets.insert(dst.to_string(), Value::Object(labels));
        }
    }

    let mut root = Map::new();
    root.insert("nodes".to_string(), Value::Object(nodes));
    root.insert("edges".to_string(), Value::Object(edges));
    Value::Object(root)
}

/// Serialize the export, pretty-printed unless `minify`.
pub fn to_json_string(graph: &Graph, minify: bool) -> serde_json::Result<String> {
    let value = to_json(graph);
    if minify {
        serde_json::to_string(&value)
    } else {
        serde_json::to_string_pretty(&value)
    }
}

/// Copy with only AST edges. Node ids are unchanged.
pub fn copy_ast(graph: &Graph) -> Graph {
    graph.filtered_copy(|edge| Edge {
        ast_index: edge.ast_index,
        cfg: None,
    })
}

/// Copy with only CFG edges. Node ids are unchanged.
pub fn copy_cfg(graph: &Graph) -> Graph {
    graph.filtered_copy(|edge| Edge {
        ast_index: None,
        cfg: edge.cfg,
    })
}
