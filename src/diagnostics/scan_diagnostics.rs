//! Per-file skip reasons and the scan report built from them.
//!
//! Every file handed to a scan ends up either as a shard or as one
//! [`ScanDiagnostic`]. Ordering is deterministic so reports can be diffed
//! between runs.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

/// Reason why a file produced no shard.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Extension maps to no supported grammar
    UnsupportedLanguage,
    /// The file could not be opened or read
    ReadFailed,
    /// The concrete tree contains ERROR or MISSING nodes
    SyntaxError,
    /// The parser gave up (timeout or cancellation)
    ParseTimeout,
    /// Lowering failed on a well-formed tree
    RuntimeFailure,
    /// Grammar could not be loaded for this language
    GrammarUnavailable,
}

impl SkipReason {
    /// Stable sort key for deterministic ordering.
    pub fn sort_key(&self) -> u8 {
        match self {
            SkipReason::GrammarUnavailable => 0,
            SkipReason::ReadFailed => 1,
            SkipReason::SyntaxError => 2,
            SkipReason::ParseTimeout => 3,
            SkipReason::RuntimeFailure => 4,
            SkipReason::UnsupportedLanguage => 5,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SkipReason::UnsupportedLanguage => "language not supported",
            SkipReason::ReadFailed => "unreadable",
            SkipReason::SyntaxError => "syntax error",
            SkipReason::ParseTimeout => "parse timeout",
            SkipReason::RuntimeFailure => "runtime failure",
            SkipReason::GrammarUnavailable => "grammar unavailable",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for SkipReason {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkipReason {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Pipeline stage where a per-file failure happened.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticStage {
    Read,
    Parse,
    Lower,
}

impl DiagnosticStage {
    pub fn sort_key(&self) -> u8 {
        match self {
            DiagnosticStage::Read => 0,
            DiagnosticStage::Parse => 1,
            DiagnosticStage::Lower => 2,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DiagnosticStage::Read => "reading file",
            DiagnosticStage::Parse => "parsing source",
            DiagnosticStage::Lower => "lowering tree",
        }
    }
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl PartialOrd for DiagnosticStage {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DiagnosticStage {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// One skipped file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanDiagnostic {
    pub path: String,
    pub reason: SkipReason,
    pub message: String,
}

impl ScanDiagnostic {
    pub fn new(path: impl Into<String>, reason: SkipReason, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason,
            message: message.into(),
        }
    }

    /// Primary: path. Secondary: reason.
    pub fn sort_key(&self) -> (&str, u8) {
        (&self.path, self.reason.sort_key())
    }

    /// Examples:
    /// - "SKIP src/Main.java: syntax error"
    /// - "SKIP notes.txt: language not supported"
    pub fn format_stderr(&self) -> String {
        if self.message.is_empty() {
            format!("SKIP {}: {}", self.path, self.reason)
        } else {
            format!("SKIP {}: {}: {}", self.path, self.reason, self.message)
        }
    }
}

impl fmt::Display for ScanDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_stderr())
    }
}

impl PartialOrd for ScanDiagnostic {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScanDiagnostic {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

/// Outcome counts for one scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScanReport {
    pub parsed: usize,
    pub skipped: Vec<ScanDiagnostic>,
}

impl ScanReport {
    pub fn record_parsed(&mut self) {
        self.parsed += 1;
    }

    pub fn record_skipped(&mut self, diagnostic: ScanDiagnostic) {
        self.skipped.push(diagnostic);
    }

    pub fn total(&self) -> usize {
        self.parsed + self.skipped.len()
    }

    /// Skip counts grouped by reason, in reason order.
    pub fn counts_by_reason(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts = BTreeMap::new();
        for diag in &self.skipped {
            *counts.entry(diag.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Sort diagnostics into their stable order.
    pub fn finish(&mut self) {
        self.skipped.sort();
    }

    /// "3 files: 2 parsed, 1 skipped (syntax error: 1)"
    pub fn summary_line(&self) -> String {
        let mut line = format!(
            "{} files: {} parsed, {} skipped",
            self.total(),
            self.parsed,
            self.skipped.len()
        );
        let counts = self.counts_by_reason();
        if !counts.is_empty() {
            let parts: Vec<String> = counts
                .iter()
                .map(|(reason, count)| format!("{}: {}", reason, count))
                .collect();
            line.push_str(&format!(" ({})", parts.join(", ")));
        }
        line
    }
}
