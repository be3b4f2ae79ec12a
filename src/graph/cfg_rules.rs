//! Per-language tables mapping syntax node kinds to control-flow constructs.
//!
//! Each grammar names its statements differently; the synthesizer only
//! ever sees [`Construct`] values. Tables are built once per process.

use ahash::{AHashMap, AHashSet};
use once_cell::sync::Lazy;

use crate::ingest::detect::Language;

/// Control-flow role of a syntax node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    /// Method, function, constructor or lambda with a block body
    Function,
    /// Statement sequence container
    Block,
    If,
    /// Pre-tested loop (for, foreach, while)
    Loop,
    /// Post-tested loop
    DoWhile,
    Switch,
    /// One case/default section of a switch
    CaseGroup,
    Break,
    Continue,
    /// Break or continue decided by the leading keyword token
    Jump,
    /// Explicit fallthrough into the next case
    Fallthrough,
    Try,
    /// Catch or finally clause
    Handler,
    /// Call expression that may sit in a fluent chain
    Call,
    /// Always evaluated when its parent is
    Evaluated,
}

impl Construct {
    pub fn as_str(&self) -> &'static str {
        match self {
            Construct::Function => "function",
            Construct::Block => "block",
            Construct::If => "if",
            Construct::Loop => "loop",
            Construct::DoWhile => "do_while",
            Construct::Switch => "switch",
            Construct::CaseGroup => "case_group",
            Construct::Break => "break",
            Construct::Continue => "continue",
            Construct::Jump => "jump",
            Construct::Fallthrough => "fallthrough",
            Construct::Try => "try",
            Construct::Handler => "handler",
            Construct::Call => "call",
            Construct::Evaluated => "evaluated",
        }
    }

    pub fn is_loop(&self) -> bool {
        matches!(self, Construct::Loop | Construct::DoWhile)
    }

    /// Statements after which control never falls to the next sibling.
    pub fn ends_sequence(&self) -> bool {
        matches!(
            self,
            Construct::Loop | Construct::DoWhile | Construct::Break | Construct::Continue
        )
    }
}

/// Construct table plus the structural hints one grammar needs.
#[derive(Debug)]
pub struct CfgRules {
    constructs: AHashMap<&'static str, Construct>,
    /// Single-child nodes looked through when resolving a branch or body
    wrappers: AHashSet<&'static str>,
    /// Statement lists nested inside a block
    statement_lists: AHashSet<&'static str>,
    /// Label nodes of a case group that are not statements
    case_labels: AHashSet<&'static str>,
    finally_kinds: AHashSet<&'static str>,
    /// Member access nodes between a call and its receiver call
    member_access: AHashSet<&'static str>,
    /// Case groups that never fall through (arrow-style rules)
    sealed_groups: AHashSet<&'static str>,
    /// Label wrappers around a loop or switch (`outer: while ...`)
    labels: AHashSet<&'static str>,
    implicit_fallthrough: bool,
}

impl CfgRules {
    pub fn construct(&self, kind: &str) -> Option<Construct> {
        self.constructs.get(kind).copied()
    }

    pub fn is_wrapper(&self, kind: &str) -> bool {
        self.wrappers.contains(kind)
    }

    pub fn is_statement_list(&self, kind: &str) -> bool {
        self.statement_lists.contains(kind)
    }

    pub fn is_case_label(&self, kind: &str) -> bool {
        self.case_labels.contains(kind)
    }

    pub fn is_finally(&self, kind: &str) -> bool {
        self.finally_kinds.contains(kind)
    }

    pub fn is_member_access(&self, kind: &str) -> bool {
        self.member_access.contains(kind)
    }

    pub fn is_sealed_group(&self, kind: &str) -> bool {
        self.sealed_groups.contains(kind)
    }

    pub fn is_label(&self, kind: &str) -> bool {
        self.labels.contains(kind)
    }

    /// Whether a case falls into the next one unless it breaks.
    pub fn implicit_fallthrough(&self) -> bool {
        self.implicit_fallthrough
    }

    pub fn construct_count(&self) -> usize {
        self.constructs.len()
    }
}

struct RuleSpec {
    constructs: &'static [(&'static str, Construct)],
    wrappers: &'static [&'static str],
    statement_lists: &'static [&'static str],
    case_labels: &'static [&'static str],
    finally_kinds: &'static [&'static str],
    member_access: &'static [&'static str],
    sealed_groups: &'static [&'static str],
    labels: &'static [&'static str],
    implicit_fallthrough: bool,
}

impl RuleSpec {
    fn build(&self) -> CfgRules {
        CfgRules {
            constructs: self.constructs.iter().copied().collect(),
            wrappers: self.wrappers.iter().copied().collect(),
            statement_lists: self.statement_lists.iter().copied().collect(),
            case_labels: self.case_labels.iter().copied().collect(),
            finally_kinds: self.finally_kinds.iter().copied().collect(),
            member_access: self.member_access.iter().copied().collect(),
            sealed_groups: self.sealed_groups.iter().copied().collect(),
            labels: self.labels.iter().copied().collect(),
            implicit_fallthrough: self.implicit_fallthrough,
        }
    }
}

use Construct::*;

const CSHARP: RuleSpec = RuleSpec {
    constructs: &[
        ("method_declaration", Function),
        ("constructor_declaration", Function),
        ("local_function_statement", Function),
        ("accessor_declaration", Function),
        ("lambda_expression", Function),
        ("block", Block),
        ("if_statement", If),
        ("for_statement", Loop),
        ("for_each_statement", Loop),
        ("foreach_statement", Loop),
        ("while_statement", Loop),
        ("do_statement", DoWhile),
        ("switch_statement", Switch),
        ("switch_section", CaseGroup),
        ("break_statement", Break),
        ("continue_statement", Continue),
        ("try_statement", Try),
        ("catch_clause", Handler),
        ("finally_clause", Handler),
        ("invocation_expression", Call),
        ("local_declaration_statement", Evaluated),
        ("variable_declaration", Evaluated),
        ("variable_declarator", Evaluated),
        ("object_creation_expression", Evaluated),
        ("expression_statement", Evaluated),
    ],
    wrappers: &[],
    statement_lists: &[],
    case_labels: &[
        "case_switch_label",
        "case_pattern_switch_label",
        "default_switch_label",
        "switch_label",
        "when_clause",
    ],
    finally_kinds: &["finally_clause"],
    member_access: &["member_access_expression", "conditional_access_expression"],
    sealed_groups: &[],
    labels: &["labeled_statement"],
    implicit_fallthrough: true,
};

const GO: RuleSpec = RuleSpec {
    constructs: &[
        ("function_declaration", Function),
        ("method_declaration", Function),
        ("func_literal", Function),
        ("block", Block),
        ("if_statement", If),
        ("for_statement", Loop),
        ("expression_switch_statement", Switch),
        ("type_switch_statement", Switch),
        ("select_statement", Switch),
        ("expression_case", CaseGroup),
        ("type_case", CaseGroup),
        ("default_case", CaseGroup),
        ("communication_case", CaseGroup),
        ("break_statement", Break),
        ("continue_statement", Continue),
        ("fallthrough_statement", Fallthrough),
        ("call_expression", Call),
        ("var_declaration", Evaluated),
        ("var_spec", Evaluated),
        ("short_var_declaration", Evaluated),
        ("composite_literal", Evaluated),
        ("expression_statement", Evaluated),
    ],
    wrappers: &[],
    statement_lists: &["statement_list"],
    case_labels: &["expression_list"],
    finally_kinds: &[],
    member_access: &["selector_expression"],
    sealed_groups: &[],
    labels: &["labeled_statement"],
    implicit_fallthrough: false,
};

const JAVA: RuleSpec = RuleSpec {
    constructs: &[
        ("method_declaration", Function),
        ("constructor_declaration", Function),
        ("lambda_expression", Function),
        ("static_initializer", Function),
        ("block", Block),
        ("constructor_body", Block),
        ("if_statement", If),
        ("for_statement", Loop),
        ("enhanced_for_statement", Loop),
        ("while_statement", Loop),
        ("do_statement", DoWhile),
        ("switch_expression", Switch),
        ("switch_statement", Switch),
        ("switch_block_statement_group", CaseGroup),
        ("switch_rule", CaseGroup),
        ("break_statement", Break),
        ("continue_statement", Continue),
        ("try_statement", Try),
        ("try_with_resources_statement", Try),
        ("catch_clause", Handler),
        ("finally_clause", Handler),
        ("method_invocation", Call),
        ("local_variable_declaration", Evaluated),
        ("variable_declarator", Evaluated),
        ("object_creation_expression", Evaluated),
        ("expression_statement", Evaluated),
    ],
    wrappers: &[],
    statement_lists: &[],
    case_labels: &["switch_label"],
    finally_kinds: &["finally_clause"],
    member_access: &["field_access"],
    sealed_groups: &["switch_rule"],
    labels: &["labeled_statement"],
    implicit_fallthrough: true,
};

const JAVASCRIPT: RuleSpec = RuleSpec {
    constructs: &[
        ("function_declaration", Function),
        ("function_expression", Function),
        ("function", Function),
        ("generator_function_declaration", Function),
        ("generator_function", Function),
        ("arrow_function", Function),
        ("method_definition", Function),
        ("statement_block", Block),
        ("if_statement", If),
        ("for_statement", Loop),
        ("for_in_statement", Loop),
        ("while_statement", Loop),
        ("do_statement", DoWhile),
        ("switch_statement", Switch),
        ("switch_case", CaseGroup),
        ("switch_default", CaseGroup),
        ("break_statement", Break),
        ("continue_statement", Continue),
        ("try_statement", Try),
        ("catch_clause", Handler),
        ("finally_clause", Handler),
        ("call_expression", Call),
        ("lexical_declaration", Evaluated),
        ("variable_declaration", Evaluated),
        ("variable_declarator", Evaluated),
        ("new_expression", Evaluated),
        ("expression_statement", Evaluated),
    ],
    wrappers: &["else_clause"],
    statement_lists: &[],
    case_labels: &[],
    finally_kinds: &["finally_clause"],
    member_access: &["member_expression"],
    sealed_groups: &[],
    labels: &["labeled_statement"],
    implicit_fallthrough: true,
};

const KOTLIN: RuleSpec = RuleSpec {
    constructs: &[
        ("function_declaration", Function),
        ("anonymous_function", Function),
        ("secondary_constructor", Function),
        ("anonymous_initializer", Function),
        ("block", Block),
        ("function_body", Block),
        ("control_structure_body", Block),
        ("if_expression", If),
        ("for_statement", Loop),
        ("while_statement", Loop),
        ("do_while_statement", DoWhile),
        ("when_expression", Switch),
        ("when_entry", CaseGroup),
        ("jump_expression", Jump),
        ("try_expression", Try),
        ("catch_block", Handler),
        ("finally_block", Handler),
        ("call_expression", Call),
        ("property_declaration", Evaluated),
        ("variable_declaration", Evaluated),
        ("assignment", Evaluated),
    ],
    wrappers: &[],
    statement_lists: &["statements"],
    case_labels: &["when_condition", "when_subject"],
    finally_kinds: &["finally_block"],
    member_access: &["navigation_expression"],
    sealed_groups: &["when_entry"],
    labels: &[],
    implicit_fallthrough: false,
};

// TSX shares the JavaScript statement grammar.
const TSX: RuleSpec = RuleSpec {
    constructs: JAVASCRIPT.constructs,
    wrappers: JAVASCRIPT.wrappers,
    statement_lists: JAVASCRIPT.statement_lists,
    case_labels: JAVASCRIPT.case_labels,
    finally_kinds: JAVASCRIPT.finally_kinds,
    member_access: JAVASCRIPT.member_access,
    sealed_groups: JAVASCRIPT.sealed_groups,
    labels: JAVASCRIPT.labels,
    implicit_fallthrough: JAVASCRIPT.implicit_fallthrough,
};

static RULES: Lazy<AHashMap<Language, CfgRules>> = Lazy::new(|| {
    [
        (Language::CSharp, &CSHARP),
        (Language::Go, &GO),
        (Language::Java, &JAVA),
        (Language::JavaScript, &JAVASCRIPT),
        (Language::Kotlin, &KOTLIN),
        (Language::Tsx, &TSX),
    ]
    .into_iter()
    .map(|(language, spec)| (language, spec.build()))
    .collect()
});

/// Construct table for `language`; `None` for unsupported files.
pub fn rules_for(language: Language) -> Option<&'static CfgRules> {
    RULES.get(&language)
}
