//! Annotation stages run on each graph after control-flow synthesis.
//!
//! Danger marking and similar rule-specific labeling is supplied by callers
//! through [`GraphAnnotator`]. The crate ships one annotator of its own,
//! [`FunctionDeclarationLinker`], which links call sites to in-file
//! declarations.

use ahash::AHashMap;

use crate::graph::ast_node::is_identifier_kind;
use crate::graph::cfg_rules::{rules_for, Construct};
use crate::graph::{Graph, NodeId};
use crate::ingest::detect::Language;

/// A stage that adds labels to a finished graph.
///
/// Annotators must not add AST edges or remove nodes.
pub trait GraphAnnotator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    fn annotate(&self, language: Language, graph: &mut Graph);
}

/// Sets `label_function_declaration` on calls whose callee is a plain
/// name declared as a function in the same file.
#[derive(Debug, Default, Clone, Copy)]
pub struct FunctionDeclarationLinker;

impl GraphAnnotator for FunctionDeclarationLinker {
    fn name(&self) -> &str {
        "function_declaration"
    }

    fn annotate(&self, language: Language, graph: &mut Graph) {
        let Some(rules) = rules_for(language) else {
            return;
        };

        let mut declarations: AHashMap<String, NodeId> = AHashMap::new();
        let mut calls: Vec<(NodeId, String)> = Vec::new();
        for (id, node) in graph.nodes() {
            match rules.construct(&node.kind) {
                Some(Construct::Function) => {
                    if let Some(name) = declared_name(graph, id) {
                        declarations.entry(name).or_insert(id);
                    }
                }
                Some(Construct::Call) => {
                    if let Some(name) = callee_name(graph, id) {
                        calls.push((id, name));
                    }
                }
                _ => {}
            }
        }

        for (call, name) in calls {
            if let Some(&declaration) = declarations.get(&name) {
                if let Some(node) = graph.node_mut(call) {
                    node.function_declaration = Some(declaration);
                }
            }
        }
    }
}

fn identifier_text(graph: &Graph, id: NodeId) -> Option<String> {
    let node = graph.node(id);
    if is_identifier_kind(&node.kind) {
        node.text.clone()
    } else {
        None
    }
}

// Kotlin declares names positionally, not through fields.
fn first_simple_identifier(graph: &Graph, id: NodeId) -> Option<String> {
    graph
        .named_children(id)
        .into_iter()
        .find(|&child| graph.node(child).kind == "simple_identifier")
        .and_then(|child| graph.node(child).text.clone())
}

/// Name of a declared function, method or constructor.
pub fn declared_name(graph: &Graph, id: NodeId) -> Option<String> {
    match graph.node(id).field("name") {
        Some(name) => identifier_text(graph, name),
        None => first_simple_identifier(graph, id),
    }
}

/// Name a call resolves through when it has no receiver.
pub fn callee_name(graph: &Graph, id: NodeId) -> Option<String> {
    let node = graph.node(id);
    if node.field("object").is_some() {
        return None;
    }
    if let Some(name) = node.field("name") {
        return identifier_text(graph, name);
    }
    if let Some(function) = node.field("function") {
        return identifier_text(graph, function);
    }
    let first = *graph.named_children(id).first()?;
    let node = graph.node(first);
    if node.kind == "simple_identifier" {
        node.text.clone()
    } else {
        None
    }
}
