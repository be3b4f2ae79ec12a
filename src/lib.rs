//! sast-graph: multi-language source graphs for static analysis
//!
//! Source files in C#, Go, Java, JavaScript, TSX and Kotlin are parsed with
//! tree-sitter and lowered into one attributed [`Graph`] per file. AST edges
//! carry the syntax tree, CFG edges carry intra-procedural control flow, and
//! query helpers in [`graph::query`] let rule code match patterns over both.
//!
//! # Position Conventions
//!
//! - **Line positions** (`label_l`): 1-indexed
//! - **Column positions** (`label_c`): 1-indexed
//! - **Node ids**: assigned in depth-first pre-order, the root is `0`
//!
//! # Pipeline
//!
//! ```text
//! path -> read (capped) -> parse -> lower -> CFG synthesis -> annotators -> GraphShard
//! shards -> GraphDb
//! ```

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod graph;
pub mod ingest;
pub mod logging;
pub mod version;

pub use config::{ConfigError, ScanConfig};
pub use diagnostics::{DiagnosticStage, ScanDiagnostic, ScanReport, SkipReason};
pub use error::{GrammarError, GraphError, LowerError, ParseError};
pub use graph::annotate::{FunctionDeclarationLinker, GraphAnnotator};
pub use graph::ast_extractor::lower;
pub use graph::cfg_extractor::synthesize;
pub use graph::export::{copy_ast, copy_cfg, to_json};
pub use graph::metadata::{ClassMetadata, ShardMetadata};
pub use graph::scan::{get_graph_db, parse_many, parse_one, GraphBuilder};
pub use graph::shard::{GraphDb, GraphShard};
pub use graph::syntax::SyntaxIndex;
pub use graph::{CfgKind, Edge, Graph, Node, NodeId};
pub use ingest::{decide_language, parse, parse_with, warmup, ConcreteTree, Language, ParseOptions};
