//! Raw parsing: source bytes to a concrete syntax tree.

pub mod detect;
pub mod grammar;
pub mod pool;

pub use detect::{decide_language, Language};
pub use grammar::{grammar, registry, FieldSlot, FieldTable, Grammar, GrammarRegistry};
pub use pool::{warmup, with_parser};

use crate::error::ParseError;

/// Per-file content cap in bytes; anything past it is ignored.
pub const MAX_FILE_SIZE: usize = 100 * 1024;

/// Knobs for a single parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    pub max_file_size: usize,
    pub timeout_ms: Option<u64>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_file_size: MAX_FILE_SIZE,
            timeout_ms: None,
        }
    }
}

/// A parsed file: the (possibly truncated) source and its tree.
///
/// `tree` is `None` only for [`Language::NotSupported`], whose lowering
/// yields a lone root node.
pub struct ConcreteTree {
    language: Language,
    source: Vec<u8>,
    tree: Option<tree_sitter::Tree>,
}

impl ConcreteTree {
    pub fn language(&self) -> Language {
        self.language
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    pub fn tree(&self) -> Option<&tree_sitter::Tree> {
        self.tree.as_ref()
    }

    pub fn root_kind(&self) -> Option<&'static str> {
        self.tree.as_ref().map(|tree| tree.root_node().kind())
    }
}

impl std::fmt::Debug for ConcreteTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConcreteTree")
            .field("language", &self.language)
            .field("bytes", &self.source.len())
            .field("root", &self.root_kind())
            .finish()
    }
}

/// Parse `content` as `language` with default options.
pub fn parse(content: &[u8], language: Language) -> Result<ConcreteTree, ParseError> {
    parse_with(content, language, &ParseOptions::default())
}

/// Parse `content` as `language`.
///
/// Content beyond `options.max_file_size` is dropped before parsing. A tree
/// with any ERROR or MISSING node is rejected as [`ParseError::Syntax`].
pub fn parse_with(
    content: &[u8],
    language: Language,
    options: &ParseOptions,
) -> Result<ConcreteTree, ParseError> {
    let source = content[..content.len().min(options.max_file_size)].to_vec();

    if !language.is_supported() {
        return Ok(ConcreteTree {
            language,
            source,
            tree: None,
        });
    }

    let micros = options.timeout_ms.map_or(0, |ms| ms.saturating_mul(1000));
    let tree = with_parser(language, |parser| {
        // A timed-out parse is resumed by the next call unless reset
        parser.reset();
        parser.set_timeout_micros(micros);
        let tree = parser.parse(&source, None);
        if tree.is_none() {
            parser.reset();
        }
        tree
    })?;

    let tree = tree.ok_or(ParseError::NoTree {
        timeout_ms: options.timeout_ms,
    })?;
    if tree.root_node().has_error() {
        return Err(ParseError::Syntax);
    }

    Ok(ConcreteTree {
        language,
        source,
        tree: Some(tree),
    })
}
