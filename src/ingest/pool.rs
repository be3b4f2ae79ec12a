//! Thread-local parser pool.
//!
//! Each worker thread lazily creates one `tree_sitter::Parser` per language
//! and reuses it for every file it parses. No locks: the `RefCell` is only
//! ever touched by its own thread.
//!
//! ```rust,no_run
//! use sast_graph::ingest::pool::with_parser;
//! use sast_graph::ingest::Language;
//!
//! let parsed = with_parser(Language::Java, |parser| {
//!     parser.parse(b"class A {}", None).is_some()
//! })?;
//! # Ok::<(), sast_graph::error::GrammarError>(())
//! ```

use crate::error::GrammarError;
use crate::ingest::detect::Language;
use crate::ingest::grammar::{grammar, registry};
use ahash::AHashMap;
use std::cell::RefCell;

thread_local! {
    static PARSERS: RefCell<AHashMap<Language, tree_sitter::Parser>> = RefCell::new(AHashMap::new());
}

/// Run `f` with this thread's parser for `language`.
///
/// The parser keeps whatever timeout the previous caller set; callers that
/// care set their own before parsing.
pub fn with_parser<F, R>(language: Language, f: F) -> Result<R, GrammarError>
where
    F: FnOnce(&mut tree_sitter::Parser) -> R,
{
    PARSERS.with(|cell| {
        let mut parsers = cell.borrow_mut();
        if !parsers.contains_key(&language) {
            let grammar = grammar(language)?;
            let mut parser = tree_sitter::Parser::new();
            parser
                .set_language(grammar.ts_language())
                .map_err(|e| GrammarError {
                    language,
                    reason: e.to_string(),
                })?;
            parsers.insert(language, parser);
        }
        match parsers.get_mut(&language) {
            Some(parser) => Ok(f(parser)),
            None => Err(GrammarError {
                language,
                reason: "parser pool lost its entry".to_string(),
            }),
        }
    })
}

/// Load every grammar and prime this thread's parsers.
///
/// Surfaces a fatal [`GrammarError`] before any file is read. Other threads
/// still initialize their own parsers lazily.
pub fn warmup() -> Result<(), GrammarError> {
    registry()?;

    let samples: [(Language, &[u8]); 6] = [
        (Language::CSharp, b"class A { void M() {} }"),
        (Language::Go, b"package main\nfunc main() {}\n"),
        (Language::Java, b"class A { void m() {} }"),
        (Language::JavaScript, b"function f() {}"),
        (Language::Kotlin, b"fun main() {}\n"),
        (Language::Tsx, b"function f(): void {}"),
    ];

    for (language, source) in samples {
        with_parser(language, |parser| {
            parser.parse(source, None);
        })?;
    }

    Ok(())
}
