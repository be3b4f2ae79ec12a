//! Build metadata for the `sast-graph` binary.

/// Full version line: "sast-graph {version} ({commit}) rustc {rustc_version}"
pub fn version() -> String {
    format!(
        "sast-graph {} ({}) rustc {}",
        env!("CARGO_PKG_VERSION"),
        build_commit(),
        rustc_version()
    )
}

/// Commit SHA the binary was built from, or "unknown".
pub fn build_commit() -> &'static str {
    option_env!("SAST_GRAPH_COMMIT_SHA").unwrap_or("unknown")
}

pub fn rustc_version() -> &'static str {
    option_env!("SAST_GRAPH_RUSTC_VERSION").unwrap_or("unknown")
}
