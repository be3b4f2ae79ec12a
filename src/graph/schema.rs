//! Node and edge payloads of the attributed source graph.
//!
//! Attribute names mirror the exported label vocabulary (`label_type`,
//! `label_l`, `label_cfg_true`, ...) so rule code and JSON exports agree.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

pub const LABEL_AST: &str = "label_ast";
pub const LABEL_INDEX: &str = "label_index";
pub const LABEL_CFG: &str = "label_cfg";
pub const LABEL_TYPE: &str = "label_type";
pub const LABEL_LINE: &str = "label_l";
pub const LABEL_COLUMN: &str = "label_c";
pub const LABEL_TEXT: &str = "label_text";
pub const LABEL_FIELD_PREFIX: &str = "label_field_";
pub const LABEL_FUNCTION_DECLARATION: &str = "label_function_declaration";

/// Arena handle of a node. The root is always [`NodeId::ROOT`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const ROOT: NodeId = NodeId(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of a control-flow edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CfgKind {
    Always,
    Maybe,
    True,
    False,
    Break,
    Continue,
}

impl CfgKind {
    pub const ALL: [CfgKind; 6] = [
        CfgKind::Always,
        CfgKind::Maybe,
        CfgKind::True,
        CfgKind::False,
        CfgKind::Break,
        CfgKind::Continue,
    ];

    /// Attribute key carried by the edge, e.g. `label_cfg_true`.
    pub fn label(self) -> &'static str {
        match self {
            CfgKind::Always => "label_cfg_always",
            CfgKind::Maybe => "label_cfg_maybe",
            CfgKind::True => "label_cfg_true",
            CfgKind::False => "label_cfg_false",
            CfgKind::Break => "label_cfg_break",
            CfgKind::Continue => "label_cfg_continue",
        }
    }

    /// Attribute value, e.g. `cfg_true`.
    pub fn value(self) -> &'static str {
        match self {
            CfgKind::Always => "cfg_always",
            CfgKind::Maybe => "cfg_maybe",
            CfgKind::True => "cfg_true",
            CfgKind::False => "cfg_false",
            CfgKind::Break => "cfg_break",
            CfgKind::Continue => "cfg_continue",
        }
    }
}

impl fmt::Display for CfgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.value())
    }
}

/// Attributes of one ordered node pair. AST and CFG coexist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    /// Ordinal among the source's AST children
    pub ast_index: Option<u32>,
    pub cfg: Option<CfgKind>,
}

impl Edge {
    pub fn is_ast(&self) -> bool {
        self.ast_index.is_some()
    }

    pub fn is_cfg(&self) -> bool {
        self.cfg.is_some()
    }

    pub fn is_empty(&self) -> bool {
        !self.is_ast() && !self.is_cfg()
    }

    /// Exported attribute map of this edge.
    pub fn labels(&self) -> BTreeMap<&'static str, String> {
        let mut labels = BTreeMap::new();
        if let Some(index) = self.ast_index {
            labels.insert(LABEL_AST, "AST".to_string());
            labels.insert(LABEL_INDEX, index.to_string());
        }
        if let Some(kind) = self.cfg {
            labels.insert(LABEL_CFG, "CFG".to_string());
            labels.insert(kind.label(), kind.value().to_string());
        }
        labels
    }
}

/// One node of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Syntax node kind (`label_type`)
    pub kind: String,
    /// 1-based start line
    pub line: usize,
    /// 1-based start column
    pub column: usize,
    /// Whether the grammar names this node; keywords and punctuation do not
    pub named: bool,
    /// Raw source slice, set on final nodes only
    pub text: Option<String>,
    /// Named-field children (`label_field_<name>`)
    pub fields: BTreeMap<String, NodeId>,
    /// In-file declaration a call resolves to
    pub function_declaration: Option<NodeId>,
    /// Free-form labels set by annotation stages
    pub labels: BTreeMap<String, String>,
}

impl Node {
    pub fn new(kind: impl Into<String>, line: usize, column: usize, named: bool) -> Self {
        Self {
            kind: kind.into(),
            line,
            column,
            named,
            text: None,
            fields: BTreeMap::new(),
            function_declaration: None,
            labels: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<NodeId> {
        self.fields.get(name).copied()
    }

    pub fn is_final(&self) -> bool {
        self.text.is_some()
    }

    /// Look up an attribute by its exported name.
    pub fn label(&self, key: &str) -> Option<Cow<'_, str>> {
        match key {
            LABEL_TYPE => Some(Cow::Borrowed(self.kind.as_str())),
            LABEL_LINE => Some(Cow::Owned(self.line.to_string())),
            LABEL_COLUMN => Some(Cow::Owned(self.column.to_string())),
            LABEL_TEXT => self.text.as_deref().map(Cow::Borrowed),
            LABEL_FUNCTION_DECLARATION => self
                .function_declaration
                .map(|id| Cow::Owned(id.to_string())),
            _ => {
                if let Some(field) = key.strip_prefix(LABEL_FIELD_PREFIX) {
                    return self.field(field).map(|id| Cow::Owned(id.to_string()));
                }
                self.labels.get(key).map(|v| Cow::Borrowed(v.as_str()))
            }
        }
    }

    /// Exported attribute map of this node.
    pub fn all_labels(&self) -> BTreeMap<String, String> {
        let mut out = BTreeMap::new();
        out.insert(LABEL_TYPE.to_string(), self.kind.clone());
        out.insert(LABEL_LINE.to_string(), self.line.to_string());
        out.insert(LABEL_COLUMN.to_string(), self.column.to_string());
        if let Some(text) = &self.text {
            out.insert(LABEL_TEXT.to_string(), text.clone());
        }
        for (name, id) in &self.fields {
            out.insert(format!("{}{}", LABEL_FIELD_PREFIX, name), id.to_string());
        }
        if let Some(decl) = self.function_declaration {
            out.insert(LABEL_FUNCTION_DECLARATION.to_string(), decl.to_string());
        }
        for (key, value) in &self.labels {
            out.entry(key.clone()).or_insert_with(|| value.clone());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_labels() {
        let mut node = Node::new("identifier", 3, 7, true);
        node.text = Some("x".to_string());
        node.fields.insert("name".to_string(), NodeId(4));
        node.labels.insert("label_sink".to_string(), "true".to_string());

        assert_eq!(node.label("label_type").as_deref(), Some("identifier"));
        assert_eq!(node.label("label_l").as_deref(), Some("3"));
        assert_eq!(node.label("label_c").as_deref(), Some("7"));
        assert_eq!(node.label("label_text").as_deref(), Some("x"));
        assert_eq!(node.label("label_field_name").as_deref(), Some("4"));
        assert_eq!(node.label("label_field_body"), None);
        assert_eq!(node.label("label_sink").as_deref(), Some("true"));
        assert_eq!(node.label("label_function_declaration"), None);
    }

    #[test]
    fn test_edge_labels_coexist() {
        let edge = Edge {
            ast_index: Some(2),
            cfg: Some(CfgKind::True),
        };
        let labels = edge.labels();
        assert_eq!(labels["label_ast"], "AST");
        assert_eq!(labels["label_index"], "2");
        assert_eq!(labels["label_cfg"], "CFG");
        assert_eq!(labels["label_cfg_true"], "cfg_true");
        assert_eq!(labels.len(), 4);
    }
}
