//! File-to-shard pipeline and GraphDb assembly.
//!
//! Each file goes read -> parse -> lower -> CFG synthesis -> annotators.
//! A failure drops that file only; grammar failures abort the scan.

use ahash::AHashSet;
use rayon::prelude::*;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::ScanConfig;
use crate::diagnostics::{ScanDiagnostic, ScanReport, SkipReason};
use crate::error::GraphError;
use crate::graph::annotate::{FunctionDeclarationLinker, GraphAnnotator};
use crate::graph::ast_extractor::lower;
use crate::graph::cfg_extractor::synthesize;
use crate::graph::shard::{GraphDb, GraphShard};
use crate::graph::Graph;
use crate::ingest::{decide_language, parse_with, registry, Language};

/// Builds shards with a fixed configuration and annotator chain.
pub struct GraphBuilder {
    config: ScanConfig,
    annotators: Vec<Box<dyn GraphAnnotator>>,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(ScanConfig::default())
    }
}

impl GraphBuilder {
    /// Builder with the in-file function-declaration linker installed.
    pub fn new(config: ScanConfig) -> Self {
        Self {
            config,
            annotators: vec![Box::new(FunctionDeclarationLinker)],
        }
    }

    /// Append an annotator; annotators run in insertion order.
    pub fn with_annotator(mut self, annotator: impl GraphAnnotator + 'static) -> Self {
        self.annotators.push(Box::new(annotator));
        self
    }

    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Turn in-memory content into a finished graph.
    pub fn build_graph(
        &self,
        language: Language,
        path: &str,
        content: &[u8],
    ) -> Result<Graph, GraphError> {
        let tree = parse_with(content, language, &self.config.parse_options())
            .map_err(|err| GraphError::from_parse(path, err))?;
        let mut graph = lower(&tree).map_err(|err| GraphError::from_lower(path, err))?;
        let cfg_edges = synthesize(&mut graph, language);
        for annotator in &self.annotators {
            annotator.annotate(language, &mut graph);
        }
        debug!(
            path,
            language = %language,
            nodes = graph.node_count(),
            cfg_edges,
            "Built graph"
        );
        Ok(graph)
    }

    pub fn build_shard(
        &self,
        language: Language,
        path: &str,
        content: &[u8],
    ) -> Result<GraphShard, GraphError> {
        let graph = self.build_graph(language, path, content)?;
        Ok(GraphShard::new(path, language, graph))
    }

    /// Read and build one file, reporting why it failed.
    pub fn try_parse_one(&self, language: Language, path: &Path) -> Result<GraphShard, GraphError> {
        let path_str = path.display().to_string();
        let content = read_capped(path, self.config.max_file_size)
            .map_err(|err| GraphError::from_io(&path_str, err))?;
        self.build_shard(language, &path_str, &content)
    }

    /// Read and build one file. Failures are logged once and yield `None`.
    pub fn parse_one(&self, language: Language, path: &Path) -> Option<GraphShard> {
        match self.try_parse_one(language, path) {
            Ok(shard) => Some(shard),
            Err(err) => {
                log_skip(&err);
                None
            }
        }
    }

    /// Parse supported files sequentially, yielding shards in input order.
    pub fn parse_many<'a, I, P>(&'a self, paths: I) -> impl Iterator<Item = GraphShard> + 'a
    where
        I: IntoIterator<Item = P> + 'a,
        I::IntoIter: 'a,
        P: AsRef<Path> + 'a,
    {
        paths.into_iter().filter_map(move |path| {
            let path = path.as_ref();
            let language = decide_language(path);
            if !language.is_supported() {
                return None;
            }
            self.parse_one(language, path)
        })
    }

    /// Parse supported files on the rayon pool; output keeps input order.
    pub fn parse_many_parallel<P>(&self, paths: &[P]) -> Vec<GraphShard>
    where
        P: AsRef<Path> + Sync,
    {
        paths
            .par_iter()
            .filter_map(|path| {
                let path = path.as_ref();
                let language = decide_language(path);
                if !language.is_supported() {
                    return None;
                }
                self.parse_one(language, path)
            })
            .collect()
    }

    pub fn get_graph_db<P>(&self, paths: &[P]) -> Result<GraphDb, GraphError>
    where
        P: AsRef<Path> + Sync,
    {
        self.get_graph_db_with_report(paths).map(|(db, _)| db)
    }

    /// Build the GraphDb for `paths` and count what was skipped.
    ///
    /// Duplicate paths are rejected before any file is read. Unsupported
    /// files are counted, never parsed.
    pub fn get_graph_db_with_report<P>(&self, paths: &[P]) -> Result<(GraphDb, ScanReport), GraphError>
    where
        P: AsRef<Path> + Sync,
    {
        registry()?;

        let mut seen = AHashSet::new();
        for path in paths {
            let path = path.as_ref().display().to_string();
            if !seen.insert(path.clone()) {
                return Err(GraphError::DuplicatePath(path));
            }
        }

        let build = |path: &P| -> Outcome {
            let path = path.as_ref();
            let language = decide_language(path);
            if !language.is_supported() {
                return Outcome::Unsupported(path.display().to_string());
            }
            match self.try_parse_one(language, path) {
                Ok(shard) => Outcome::Parsed(shard),
                Err(err) => Outcome::Failed(err),
            }
        };
        let outcomes: Vec<Outcome> = if self.config.parallel {
            paths.par_iter().map(build).collect()
        } else {
            paths.iter().map(build).collect()
        };

        let mut report = ScanReport::default();
        let mut shards = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                Outcome::Parsed(shard) => {
                    report.record_parsed();
                    shards.push(shard);
                }
                Outcome::Unsupported(path) => {
                    report.record_skipped(ScanDiagnostic::new(
                        path,
                        SkipReason::UnsupportedLanguage,
                        "",
                    ));
                }
                Outcome::Failed(GraphError::Grammar(err)) => return Err(GraphError::Grammar(err)),
                Outcome::Failed(err) => {
                    log_skip(&err);
                    report.record_skipped(ScanDiagnostic::new(
                        err.path().unwrap_or_default(),
                        err.skip_reason(),
                        err.to_string(),
                    ));
                }
            }
        }
        report.finish();

        let db = GraphDb::from_shards(shards)?;
        info!("{}", report.summary_line());
        Ok((db, report))
    }
}

enum Outcome {
    Parsed(GraphShard),
    Unsupported(String),
    Failed(GraphError),
}

fn log_skip(err: &GraphError) {
    warn!(
        path = err.path().unwrap_or_default(),
        reason = %err.skip_reason(),
        "Skipping file: {}",
        err
    );
}

/// Read at most `cap` bytes of a file.
fn read_capped(path: &Path, cap: usize) -> std::io::Result<Vec<u8>> {
    let mut content = Vec::new();
    File::open(path)?
        .take(cap as u64)
        .read_to_end(&mut content)?;
    Ok(content)
}

/// [`GraphBuilder::parse_one`] with the default configuration.
pub fn parse_one(language: Language, path: &Path) -> Option<GraphShard> {
    GraphBuilder::default().parse_one(language, path)
}

/// [`GraphBuilder::parse_many`] with the default configuration.
pub fn parse_many<I, P>(paths: I) -> Vec<GraphShard>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    GraphBuilder::default().parse_many(paths).collect()
}

/// [`GraphBuilder::get_graph_db`] with the default configuration.
pub fn get_graph_db<P>(paths: &[P]) -> Result<GraphDb, GraphError>
where
    P: AsRef<Path> + Sync,
{
    GraphBuilder::default().get_graph_db(paths)
}
