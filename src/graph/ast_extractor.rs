//! AST lowering: concrete tree to attributed graph.
//!
//! Nodes get ids in depth-first pre-order starting at the root. Final
//! nodes (leaves and kinds in the language's final set) carry their source
//! text and are not expanded. Named-field labels are recovered per child,
//! first match in child order wins.

use tree_sitter::Node as TsNode;

use crate::error::LowerError;
use crate::graph::{Graph, Node, NodeId};
use crate::ingest::grammar::{grammar, Grammar};
use crate::ingest::ConcreteTree;

/// Kind given to the lone root of an unsupported file.
pub const UNSUPPORTED_ROOT_KIND: &str = "source_file";

/// Lower a concrete tree into a graph holding only AST edges.
pub fn lower(tree: &ConcreteTree) -> Result<Graph, LowerError> {
    let Some(ts_tree) = tree.tree() else {
        let mut graph = Graph::new();
        graph.add_node(Node::new(UNSUPPORTED_ROOT_KIND, 1, 1, true));
        return Ok(graph);
    };

    let grammar = grammar(tree.language())?;
    AstExtractor::new(tree.source(), grammar).extract(ts_tree.root_node())
}

/// Latin-1 decode: every byte maps to exactly one char.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

struct Frame<'t> {
    node: TsNode<'t>,
    parent: Option<NodeId>,
    index: u32,
    field: Option<&'static str>,
}

struct AstExtractor<'a> {
    source: &'a [u8],
    grammar: &'a Grammar,
    graph: Graph,
}

impl<'a> AstExtractor<'a> {
    fn new(source: &'a [u8], grammar: &'a Grammar) -> Self {
        Self {
            source,
            grammar,
            graph: Graph::new(),
        }
    }

    fn extract(mut self, root: TsNode<'_>) -> Result<Graph, LowerError> {
        let mut stack = vec![Frame {
            node: root,
            parent: None,
            index: 0,
            field: None,
        }];
        let mut children = Vec::new();

        while let Some(frame) = stack.pop() {
            let id = self.visit(&frame)?;
            let node = frame.node;

            if node.child_count() == 0 || self.grammar.is_final_kind(node.kind()) {
                continue;
            }

            children.clear();
            let mut cursor = node.walk();
            if cursor.goto_first_child() {
                loop {
                    children.push((cursor.node(), cursor.field_name()));
                    if !cursor.goto_next_sibling() {
                        break;
                    }
                }
            }

            // Reverse push keeps pre-order on pop
            for (index, &(child, field)) in children.iter().enumerate().rev() {
                stack.push(Frame {
                    node: child,
                    parent: Some(id),
                    index: index as u32,
                    field,
                });
            }
        }

        Ok(self.graph)
    }

    fn visit(&mut self, frame: &Frame<'_>) -> Result<NodeId, LowerError> {
        let node = frame.node;
        if self.graph.node_count() >= u32::MAX as usize {
            return Err(LowerError::TooManyNodes(self.graph.node_count()));
        }

        let start = node.start_byte();
        let end = node.end_byte();
        if start > end || end > self.source.len() {
            return Err(LowerError::InvalidRange {
                kind: node.kind().to_string(),
                start,
                end,
                len: self.source.len(),
            });
        }

        let position = node.start_position();
        let mut payload = Node::new(node.kind(), position.row + 1, position.column + 1, node.is_named());
        if node.child_count() == 0 || self.grammar.is_final_kind(node.kind()) {
            payload.text = Some(decode_latin1(&self.source[start..end]));
        }

        let id = self.graph.add_node(payload);
        if let Some(parent) = frame.parent {
            self.graph.add_ast_edge(parent, id, frame.index);
            self.assign_field(parent, id, frame.field);
        }
        Ok(id)
    }

    fn assign_field(&mut self, parent: NodeId, child: NodeId, reported: Option<&'static str>) {
        let child_node = self.graph.node(child);
        let child_kind = child_node.kind.clone();
        let child_named = child_node.named;

        let Some(parent_node) = self.graph.node_mut(parent) else {
            return;
        };

        let field = match reported {
            Some(name) => Some(name.to_string()),
            None if child_named => self
                .grammar
                .fields()
                .field_for(&parent_node.kind, &child_kind, |name| {
                    parent_node.fields.contains_key(name)
                })
                .map(str::to_string),
            None => None,
        };

        if let Some(name) = field {
            parent_node.fields.entry(name).or_insert(child);
        }
    }
}
