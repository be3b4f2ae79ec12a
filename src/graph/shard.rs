//! Per-file shards and the per-scan shard store.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::GraphError;
use crate::graph::metadata::ShardMetadata;
use crate::graph::syntax::SyntaxIndex;
use crate::graph::Graph;
use crate::ingest::detect::Language;

/// One parsed file. Immutable once built.
#[derive(Debug, Clone)]
pub struct GraphShard {
    path: String,
    language: Language,
    graph: Graph,
    metadata: ShardMetadata,
    syntax: SyntaxIndex,
}

impl GraphShard {
    /// Wrap a finished graph, deriving metadata and the syntax index from it.
    pub fn new(path: impl Into<String>, language: Language, graph: Graph) -> Self {
        let metadata = ShardMetadata::extract(&graph, language);
        let syntax = SyntaxIndex::build(&graph);
        Self {
            path: path.into(),
            language,
            graph,
            metadata,
            syntax,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn metadata(&self) -> &ShardMetadata {
        &self.metadata
    }

    pub fn syntax(&self) -> &SyntaxIndex {
        &self.syntax
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

/// All shards of one scan plus cross-file indices. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct GraphDb {
    shards: Vec<GraphShard>,
    shards_by_path: BTreeMap<String, usize>,
    classes: BTreeMap<Language, BTreeMap<String, String>>,
}

impl GraphDb {
    /// Index shards by path and merge their class declarations.
    ///
    /// Shard order is kept. When two files declare the same qualified
    /// class, the first shard wins.
    pub fn from_shards(shards: Vec<GraphShard>) -> Result<Self, GraphError> {
        let mut shards_by_path = BTreeMap::new();
        let mut classes: BTreeMap<Language, BTreeMap<String, String>> = BTreeMap::new();

        for (index, shard) in shards.iter().enumerate() {
            if shards_by_path.insert(shard.path.clone(), index).is_some() {
                return Err(GraphError::DuplicatePath(shard.path.clone()));
            }
            if !shard.language.has_classes() {
                continue;
            }
            let by_name = classes.entry(shard.language).or_default();
            for name in shard.metadata.class_names() {
                by_name
                    .entry(name.to_string())
                    .or_insert_with(|| shard.path.clone());
            }
        }

        debug!(
            shards = shards.len(),
            class_languages = classes.len(),
            "Built graph database"
        );
        Ok(Self {
            shards,
            shards_by_path,
            classes,
        })
    }

    pub fn shards(&self) -> &[GraphShard] {
        &self.shards
    }

    pub fn shards_by_path(&self) -> &BTreeMap<String, usize> {
        &self.shards_by_path
    }

    pub fn shard(&self, path: &str) -> Option<&GraphShard> {
        self.shards_by_path
            .get(path)
            .and_then(|&index| self.shards.get(index))
    }

    /// Qualified class name -> declaring path, for one language.
    pub fn classes(&self, language: Language) -> Option<&BTreeMap<String, String>> {
        self.classes.get(&language)
    }

    /// Shard that declares `class` in `language`.
    pub fn class_shard(&self, language: Language, class: &str) -> Option<&GraphShard> {
        let path = self.classes.get(&language)?.get(class)?;
        self.shard(path)
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }
}
