//! Error types for the graph pipeline.
//!
//! Errors are split by blast radius:
//! - [`GrammarError`]: fatal, raised while loading grammars at startup
//! - [`ParseError`]: one file could not be turned into a concrete tree
//! - [`LowerError`]: one concrete tree could not be lowered into a graph
//! - [`GraphError`]: scan-level error carrying the offending path
//!
//! Construct-shape mismatches during CFG synthesis are not errors at all:
//! the offending construct is skipped.

use crate::diagnostics::{DiagnosticStage, SkipReason};
use crate::ingest::Language;

/// A grammar could not be loaded or is incompatible with the runtime.
#[derive(Debug, Clone, thiserror::Error)]
#[error("grammar for {language} unavailable: {reason}")]
pub struct GrammarError {
    pub language: Language,
    pub reason: String,
}

/// Failure to produce a concrete syntax tree for one file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParseError {
    /// The tree contains at least one ERROR or MISSING node
    #[error("source contains syntax errors")]
    Syntax,

    /// tree-sitter returned no tree (timeout or cancellation)
    #[error("parser produced no tree (timed out after {timeout_ms:?} ms)")]
    NoTree { timeout_ms: Option<u64> },

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// Failure while lowering a concrete tree into the attributed graph.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LowerError {
    /// Node byte range lies outside the parsed source
    #[error("node `{kind}` spans {start}..{end} but source has {len} bytes")]
    InvalidRange {
        kind: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// Node id counter overflowed the arena handle type
    #[error("graph exceeds {0} nodes")]
    TooManyNodes(usize),

    #[error(transparent)]
    Grammar(#[from] GrammarError),
}

/// Scan-level error: what went wrong for which file.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GraphError {
    #[error(transparent)]
    Grammar(#[from] GrammarError),

    /// The file parses with syntax errors and is not analyzable
    #[error("syntax error while parsing {path}")]
    Parsing { path: String },

    /// Any other failure inside read/parse/lower for one file
    #[error("failed {stage} {path}: {reason}")]
    RuntimeParseFailure {
        path: String,
        stage: DiagnosticStage,
        reason: String,
    },

    /// The same path was given twice to one scan
    #[error("duplicate path in scan input: {0}")]
    DuplicatePath(String),
}

impl GraphError {
    /// Wrap a [`ParseError`] with the path it happened on.
    pub fn from_parse(path: &str, err: ParseError) -> Self {
        match err {
            ParseError::Syntax => GraphError::Parsing {
                path: path.to_string(),
            },
            ParseError::NoTree { .. } => GraphError::RuntimeParseFailure {
                path: path.to_string(),
                stage: DiagnosticStage::Parse,
                reason: err.to_string(),
            },
            ParseError::Grammar(grammar) => GraphError::Grammar(grammar),
        }
    }

    pub fn from_lower(path: &str, err: LowerError) -> Self {
        match err {
            LowerError::Grammar(grammar) => GraphError::Grammar(grammar),
            other => GraphError::RuntimeParseFailure {
                path: path.to_string(),
                stage: DiagnosticStage::Lower,
                reason: other.to_string(),
            },
        }
    }

    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        GraphError::RuntimeParseFailure {
            path: path.to_string(),
            stage: DiagnosticStage::Read,
            reason: err.to_string(),
        }
    }

    /// Path of the file this error belongs to, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            GraphError::Grammar(_) => None,
            GraphError::Parsing { path }
            | GraphError::RuntimeParseFailure { path, .. }
            | GraphError::DuplicatePath(path) => Some(path),
        }
    }

    /// Classification used by the scan report.
    pub fn skip_reason(&self) -> SkipReason {
        match self {
            GraphError::Grammar(_) => SkipReason::GrammarUnavailable,
            GraphError::Parsing { .. } => SkipReason::SyntaxError,
            GraphError::RuntimeParseFailure { stage, .. } => match stage {
                DiagnosticStage::Read => SkipReason::ReadFailed,
                DiagnosticStage::Parse => SkipReason::ParseTimeout,
                DiagnosticStage::Lower => SkipReason::RuntimeFailure,
            },
            GraphError::DuplicatePath(_) => SkipReason::RuntimeFailure,
        }
    }
}
