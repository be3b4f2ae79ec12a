//! Grammar registry: compiled tree-sitter grammars plus the per-language
//! node-type field tables derived from each grammar's `node-types.json`.
//!
//! The registry is built once per process and read-only afterwards, so it
//! can be shared by every worker thread without locking.

use crate::error::GrammarError;
use crate::graph::ast_node::final_kinds;
use crate::ingest::detect::Language;
use ahash::{AHashMap, AHashSet};
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::BTreeMap;

static REGISTRY: OnceCell<GrammarRegistry> = OnceCell::new();

#[derive(Debug, Deserialize)]
struct NodeTypeEntry {
    #[serde(rename = "type")]
    kind: String,
    named: bool,
    #[serde(default)]
    fields: BTreeMap<String, FieldSpec>,
    #[serde(default)]
    subtypes: Vec<TypeRef>,
}

#[derive(Debug, Deserialize)]
struct FieldSpec {
    #[serde(default)]
    types: Vec<TypeRef>,
}

#[derive(Debug, Deserialize)]
struct TypeRef {
    #[serde(rename = "type")]
    kind: String,
    named: bool,
}

/// One named field of a parent node type and the concrete child types it accepts.
#[derive(Debug, Clone)]
pub struct FieldSlot {
    pub name: String,
    pub child_kinds: AHashSet<String>,
}

/// Parent node type -> declared fields, with supertypes expanded to the
/// concrete node types they stand for.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    by_parent: AHashMap<String, Vec<FieldSlot>>,
}

impl FieldTable {
    /// Build the table from a grammar's `node-types.json` document.
    pub fn from_node_types(json: &str) -> Result<Self, serde_json::Error> {
        let entries: Vec<NodeTypeEntry> = serde_json::from_str(json)?;

        let supertypes: AHashMap<&str, Vec<&TypeRef>> = entries
            .iter()
            .filter(|entry| !entry.subtypes.is_empty())
            .map(|entry| (entry.kind.as_str(), entry.subtypes.iter().collect()))
            .collect();

        let mut by_parent = AHashMap::new();
        for entry in entries.iter().filter(|entry| entry.named && !entry.fields.is_empty()) {
            let slots = entry
                .fields
                .iter()
                .map(|(name, spec)| {
                    let mut child_kinds = AHashSet::new();
                    for type_ref in &spec.types {
                        expand_type(type_ref, &supertypes, &mut child_kinds);
                    }
                    FieldSlot {
                        name: name.clone(),
                        child_kinds,
                    }
                })
                .collect();
            by_parent.insert(entry.kind.clone(), slots);
        }

        Ok(Self { by_parent })
    }

    /// Declared fields of `parent`, in table order.
    pub fn fields_of(&self, parent: &str) -> &[FieldSlot] {
        self.by_parent.get(parent).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether `parent` declares a field called `field`.
    pub fn declares(&self, parent: &str, field: &str) -> bool {
        self.fields_of(parent).iter().any(|slot| slot.name == field)
    }

    /// First field of `parent` accepting `child` that `is_taken` does not reject.
    pub fn field_for<'a>(
        &'a self,
        parent: &str,
        child: &str,
        is_taken: impl Fn(&str) -> bool,
    ) -> Option<&'a str> {
        self.fields_of(parent)
            .iter()
            .find(|slot| slot.child_kinds.contains(child) && !is_taken(&slot.name))
            .map(|slot| slot.name.as_str())
    }

    pub fn parent_count(&self) -> usize {
        self.by_parent.len()
    }
}

fn expand_type(
    type_ref: &TypeRef,
    supertypes: &AHashMap<&str, Vec<&TypeRef>>,
    out: &mut AHashSet<String>,
) {
    let mut stack = vec![type_ref];
    let mut seen: AHashSet<&str> = AHashSet::new();
    while let Some(current) = stack.pop() {
        if !seen.insert(current.kind.as_str()) {
            continue;
        }
        match supertypes.get(current.kind.as_str()) {
            Some(subtypes) if current.named => stack.extend(subtypes.iter().copied()),
            _ => {
                out.insert(current.kind.clone());
            }
        }
    }
}

/// A loaded grammar for one language.
pub struct Grammar {
    language: Language,
    ts_language: tree_sitter::Language,
    fields: FieldTable,
    final_kinds: AHashSet<&'static str>,
}

impl Grammar {
    fn load(language: Language) -> Result<Self, GrammarError> {
        let (ts_language, node_types) = grammar_source(language).ok_or_else(|| GrammarError {
            language,
            reason: "no grammar is bundled for this language".to_string(),
        })?;

        // Rejects grammars built for an incompatible tree-sitter ABI.
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&ts_language)
            .map_err(|e| GrammarError {
                language,
                reason: e.to_string(),
            })?;

        let fields = FieldTable::from_node_types(node_types).map_err(|e| GrammarError {
            language,
            reason: format!("node-types.json: {}", e),
        })?;

        Ok(Self {
            language,
            ts_language,
            fields,
            final_kinds: final_kinds(language).iter().copied().collect(),
        })
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn ts_language(&self) -> &tree_sitter::Language {
        &self.ts_language
    }

    pub fn fields(&self) -> &FieldTable {
        &self.fields
    }

    /// Whether nodes of `kind` are captured as text without descending.
    pub fn is_final_kind(&self, kind: &str) -> bool {
        self.final_kinds.contains(kind)
    }
}

fn grammar_source(language: Language) -> Option<(tree_sitter::Language, &'static str)> {
    let source = match language {
        Language::CSharp => (tree_sitter_c_sharp::language(), tree_sitter_c_sharp::NODE_TYPES),
        Language::Go => (tree_sitter_go::language(), tree_sitter_go::NODE_TYPES),
        Language::Java => (tree_sitter_java::language(), tree_sitter_java::NODE_TYPES),
        Language::JavaScript => (
            tree_sitter_javascript::language(),
            tree_sitter_javascript::NODE_TYPES,
        ),
        Language::Kotlin => (tree_sitter_kotlin::language(), tree_sitter_kotlin::NODE_TYPES),
        Language::Tsx => (
            tree_sitter_typescript::language_tsx(),
            tree_sitter_typescript::TSX_NODE_TYPES,
        ),
        Language::NotSupported => return None,
    };
    Some(source)
}

/// All grammars, keyed by language.
pub struct GrammarRegistry {
    grammars: AHashMap<Language, Grammar>,
}

impl GrammarRegistry {
    fn load() -> Result<Self, GrammarError> {
        let mut grammars = AHashMap::new();
        for language in Language::SUPPORTED {
            grammars.insert(language, Grammar::load(language)?);
        }
        Ok(Self { grammars })
    }

    pub fn get(&self, language: Language) -> Result<&Grammar, GrammarError> {
        self.grammars.get(&language).ok_or_else(|| GrammarError {
            language,
            reason: "language has no grammar".to_string(),
        })
    }
}

/// The process-wide registry, loaded on first use.
pub fn registry() -> Result<&'static GrammarRegistry, GrammarError> {
    REGISTRY.get_or_try_init(GrammarRegistry::load)
}

/// Grammar for one language.
pub fn grammar(language: Language) -> Result<&'static Grammar, GrammarError> {
    registry()?.get(language)
}
