//! Language detection from file extensions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Languages the graph builder knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    CSharp,
    Go,
    Java,
    JavaScript,
    Kotlin,
    Tsx,
    NotSupported,
}

impl Language {
    /// Every language with a grammar, in registry order.
    pub const SUPPORTED: [Language; 6] = [
        Language::CSharp,
        Language::Go,
        Language::Java,
        Language::JavaScript,
        Language::Kotlin,
        Language::Tsx,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::CSharp => "csharp",
            Language::Go => "go",
            Language::Java => "java",
            Language::JavaScript => "javascript",
            Language::Kotlin => "kotlin",
            Language::Tsx => "tsx",
            Language::NotSupported => "not_supported",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, Language::NotSupported)
    }

    /// Languages whose shards contribute to the class-name index.
    pub fn has_classes(&self) -> bool {
        matches!(self, Language::CSharp | Language::Java | Language::Kotlin)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a path to its language by extension. Never fails.
///
/// Extension matching is case-sensitive, as in `.java` vs `.JAVA`.
pub fn decide_language(path: impl AsRef<Path>) -> Language {
    let extension = match path.as_ref().extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext,
        None => return Language::NotSupported,
    };

    match extension {
        "cs" => Language::CSharp,
        "go" => Language::Go,
        "java" => Language::Java,
        "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
        "ts" | "tsx" => Language::Tsx,
        "kt" | "kts" | "ktm" => Language::Kotlin,
        _ => Language::NotSupported,
    }
}
