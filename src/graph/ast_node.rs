//! Per-language node kind sets used by lowering.
//!
//! Final kinds are captured as a single text node instead of being
//! expanded: literals, qualified names and type references whose inner
//! structure no rule looks at.

use crate::ingest::detect::Language;

const CSHARP_FINAL: &[&str] = &[
    "character_literal",
    "generic_name",
    "predefined_type",
    "qualified_name",
    "raw_string_literal",
    "string_literal",
    "verbatim_string_literal",
];

const GO_FINAL: &[&str] = &[
    "interpreted_string_literal",
    "qualified_type",
    "raw_string_literal",
    "rune_literal",
];

const JAVA_FINAL: &[&str] = &[
    "array_type",
    "boolean_type",
    "character_literal",
    "floating_point_type",
    "generic_type",
    "integral_type",
    "scoped_identifier",
    "scoped_type_identifier",
    "string_literal",
    "type_identifier",
    "void_type",
];

const JAVASCRIPT_FINAL: &[&str] = &["number", "regex", "string", "template_string", "this"];

const KOTLIN_FINAL: &[&str] = &[
    "character_literal",
    "line_string_literal",
    "multi_line_string_literal",
    "string_literal",
    "user_type",
];

const TSX_FINAL: &[&str] = &[
    "nested_type_identifier",
    "number",
    "predefined_type",
    "regex",
    "string",
    "template_string",
    "this",
];

/// Kinds that lowering never expands for `language`.
pub fn final_kinds(language: Language) -> &'static [&'static str] {
    match language {
        Language::CSharp => CSHARP_FINAL,
        Language::Go => GO_FINAL,
        Language::Java => JAVA_FINAL,
        Language::JavaScript => JAVASCRIPT_FINAL,
        Language::Kotlin => KOTLIN_FINAL,
        Language::Tsx => TSX_FINAL,
        Language::NotSupported => &[],
    }
}

/// Comment nodes of every supported grammar.
pub fn is_comment_kind(kind: &str) -> bool {
    matches!(
        kind,
        "comment" | "line_comment" | "block_comment" | "multiline_comment"
    )
}

/// Leaf kinds that carry a plain name.
pub fn is_identifier_kind(kind: &str) -> bool {
    matches!(
        kind,
        "identifier" | "simple_identifier" | "field_identifier" | "property_identifier"
    )
}
