//! Per-shard metadata: package or namespace, declared classes and their
//! methods.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::graph::query::node_text;
use crate::graph::{Graph, NodeId};
use crate::ingest::detect::Language;

/// Derived facts about one file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardMetadata {
    /// Java/Kotlin package, Go package, or outermost C# namespace
    pub package: Option<String>,
    /// Qualified class name -> class facts
    pub classes: BTreeMap<String, ClassMetadata>,
}

/// One declared class, interface or object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassMetadata {
    pub node: NodeId,
    /// Qualified method name (`pkg.Class.method`) -> first declaration
    pub methods: BTreeMap<String, NodeId>,
}

impl ShardMetadata {
    pub fn extract(graph: &Graph, language: Language) -> Self {
        let package = package_of(graph, language);
        let classes = if language.has_classes() {
            classes_of(graph, language, package.as_deref())
        } else {
            BTreeMap::new()
        };
        Self { package, classes }
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    /// Class whose qualified name is `name` or ends in `.name`.
    pub fn lookup_class(&self, name: &str) -> Option<&ClassMetadata> {
        self.classes
            .iter()
            .find(|(qualified, _)| ends_with_segment(qualified, name))
            .map(|(_, class)| class)
    }

    /// Method whose qualified name is `name` or ends in `.name`, across
    /// every class of the file.
    pub fn lookup_method(&self, name: &str) -> Option<NodeId> {
        self.classes
            .values()
            .flat_map(|class| class.methods.iter())
            .find(|(qualified, _)| ends_with_segment(qualified, name))
            .map(|(_, &id)| id)
    }
}

fn ends_with_segment(qualified: &str, name: &str) -> bool {
    qualified == name
        || qualified
            .strip_suffix(name)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn is_class_kind(language: Language, kind: &str) -> bool {
    match language {
        Language::Java => matches!(
            kind,
            "class_declaration"
                | "interface_declaration"
                | "enum_declaration"
                | "record_declaration"
                | "annotation_type_declaration"
        ),
        Language::CSharp => matches!(
            kind,
            "class_declaration"
                | "interface_declaration"
                | "struct_declaration"
                | "record_declaration"
                | "enum_declaration"
        ),
        Language::Kotlin => matches!(kind, "class_declaration" | "object_declaration"),
        _ => false,
    }
}

fn is_method_kind(language: Language, kind: &str) -> bool {
    match language {
        Language::Java | Language::CSharp => {
            matches!(kind, "method_declaration" | "constructor_declaration")
        }
        Language::Kotlin => kind == "function_declaration",
        _ => false,
    }
}

fn is_namespace_kind(kind: &str) -> bool {
    matches!(
        kind,
        "namespace_declaration" | "file_scoped_namespace_declaration"
    )
}

fn first_child_of_kind(graph: &Graph, id: NodeId, kinds: &[&str]) -> Option<NodeId> {
    graph
        .named_children(id)
        .into_iter()
        .find(|&child| kinds.contains(&graph.node(child).kind.as_str()))
}

fn package_of(graph: &Graph, language: Language) -> Option<String> {
    let root = NodeId::ROOT;
    if !graph.contains(root) {
        return None;
    }
    match language {
        Language::Java => {
            let decl = first_child_of_kind(graph, root, &["package_declaration"])?;
            let name = first_child_of_kind(graph, decl, &["scoped_identifier", "identifier"])?;
            Some(node_text(graph, name))
        }
        Language::Kotlin => {
            let header = first_child_of_kind(graph, root, &["package_header"])?;
            let name = first_child_of_kind(graph, header, &["identifier"])?;
            Some(node_text(graph, name))
        }
        Language::Go => {
            let clause = first_child_of_kind(graph, root, &["package_clause"])?;
            let name = first_child_of_kind(graph, clause, &["package_identifier"])?;
            Some(node_text(graph, name))
        }
        Language::CSharp => graph
            .nodes()
            .find(|(_, node)| is_namespace_kind(&node.kind))
            .and_then(|(id, _)| namespace_name(graph, id)),
        _ => None,
    }
}

fn namespace_name(graph: &Graph, id: NodeId) -> Option<String> {
    graph.node(id).field("name").map(|name| node_text(graph, name))
}

fn method_name(graph: &Graph, language: Language, id: NodeId) -> Option<String> {
    match language {
        Language::Kotlin => first_child_of_kind(graph, id, &["simple_identifier"])
            .map(|name| node_text(graph, name)),
        _ => graph.node(id).field("name").map(|name| node_text(graph, name)),
    }
}

fn class_name(graph: &Graph, language: Language, id: NodeId) -> Option<String> {
    let node = graph.node(id);
    match language {
        Language::Kotlin => first_child_of_kind(graph, id, &["type_identifier", "simple_identifier"])
            .map(|name| node_text(graph, name)),
        _ => node.field("name").map(|name| node_text(graph, name)),
    }
}

// Name of a C# `namespace X;` declaration, which scopes the rest of the file
fn file_namespace(graph: &Graph) -> Option<String> {
    graph
        .nodes()
        .find(|(_, node)| node.kind == "file_scoped_namespace_declaration")
        .and_then(|(id, _)| namespace_name(graph, id))
}

fn classes_of(
    graph: &Graph,
    language: Language,
    package: Option<&str>,
) -> BTreeMap<String, ClassMetadata> {
    // Block namespaces only cover the classes inside them
    let prefix = match language {
        Language::CSharp => file_namespace(graph),
        _ => package.map(str::to_string),
    };

    let mut qualified: BTreeMap<NodeId, String> = BTreeMap::new();
    let mut classes: BTreeMap<String, ClassMetadata> = BTreeMap::new();
    for (id, node) in graph.nodes() {
        if !is_class_kind(language, &node.kind) {
            continue;
        }
        let Some(name) = class_name(graph, language, id) else {
            continue;
        };

        // Enclosing classes and C# namespaces, outermost first
        let mut scopes: Vec<String> = graph
            .ast_ancestors(id)
            .filter_map(|ancestor| {
                let kind = graph.node(ancestor).kind.as_str();
                if is_class_kind(language, kind) {
                    class_name(graph, language, ancestor)
                } else if language == Language::CSharp && is_namespace_kind(kind) {
                    namespace_name(graph, ancestor)
                } else {
                    None
                }
            })
            .collect();
        scopes.reverse();

        let has_namespace_scope = language == Language::CSharp
            && graph
                .ast_ancestors(id)
                .any(|ancestor| is_namespace_kind(&graph.node(ancestor).kind));
        if !has_namespace_scope {
            if let Some(prefix) = &prefix {
                scopes.insert(0, prefix.clone());
            }
        }

        scopes.push(name);
        let full = scopes.join(".");
        if !classes.contains_key(&full) {
            qualified.insert(id, full.clone());
            classes.insert(
                full,
                ClassMetadata {
                    node: id,
                    methods: BTreeMap::new(),
                },
            );
        }
    }

    for (id, node) in graph.nodes() {
        if !is_method_kind(language, &node.kind) {
            continue;
        }
        let Some(owner) = owning_class(graph, language, id) else {
            continue;
        };
        let (Some(class_path), Some(name)) = (qualified.get(&owner), method_name(graph, language, id))
        else {
            continue;
        };
        if let Some(class) = classes.get_mut(class_path) {
            class
                .methods
                .entry(format!("{}.{}", class_path, name))
                .or_insert(id);
        }
    }
    classes
}

/// Innermost class declaring `method`; local functions have no owner.
fn owning_class(graph: &Graph, language: Language, method: NodeId) -> Option<NodeId> {
    for ancestor in graph.ast_ancestors(method) {
        let kind = graph.node(ancestor).kind.as_str();
        if is_class_kind(language, kind) {
            return Some(ancestor);
        }
        if is_method_kind(language, kind) {
            return None;
        }
    }
    None
}
