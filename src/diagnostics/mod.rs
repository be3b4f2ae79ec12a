//! Structured diagnostics for skipped files.

pub mod scan_diagnostics;

pub use scan_diagnostics::{DiagnosticStage, ScanDiagnostic, ScanReport, SkipReason};
