//! Control-flow synthesis integration tests
//!
//! Loop, switch and try shapes across the supported languages.

use sast_graph::graph::query::{adj_cfg, UNBOUNDED};
use sast_graph::{lower, parse, synthesize, CfgKind, Graph, GraphBuilder, Language, NodeId};

fn build(source: &str, language: Language) -> Graph {
    GraphBuilder::default()
        .build_graph(language, "test", source.as_bytes())
        .unwrap()
}

fn find_all(graph: &Graph, kind: &str) -> Vec<NodeId> {
    graph
        .nodes()
        .filter(|(_, n)| n.kind == kind)
        .map(|(id, _)| id)
        .collect()
}

fn find(graph: &Graph, kind: &str) -> NodeId {
    find_all(graph, kind)
        .first()
        .copied()
        .unwrap_or_else(|| panic!("no {} node", kind))
}

/// Node of `kind` whose source text starts with `callee`.
fn statement(graph: &Graph, kind: &str, callee: &str) -> NodeId {
    find_all(graph, kind)
        .into_iter()
        .find(|&id| sast_graph::graph::query::node_text(graph, id).starts_with(callee))
        .unwrap_or_else(|| panic!("no {} starting with {}", kind, callee))
}

#[test]
fn test_synthesis_twice_matches_once() {
    let source = "class A { void m(int v) {
        for (int i = 0; i < v; i++) { if (i > 2) { break; } else { continue; } }
        switch (v) { case 1: a(); case 2: b(); break; default: c(); }
        try { x().y().z(); } catch (Exception e) { h(); } finally { f(); }
    } }";
    let tree = parse(source.as_bytes(), Language::Java).unwrap();
    let mut once = lower(&tree).unwrap();
    let added = synthesize(&mut once, Language::Java);
    assert!(added > 0);

    let mut twice = once.clone();
    assert_eq!(synthesize(&mut twice, Language::Java), 0);
    assert_eq!(once.edges(), twice.edges());
}

#[test]
fn test_while_back_edge() {
    let graph = build(
        "class A { void m() { while (c) { s1(); s2(); } } }",
        Language::Java,
    );
    let header = find(&graph, "while_statement");
    let s1 = statement(&graph, "expression_statement", "s1");
    let s2 = statement(&graph, "expression_statement", "s2");

    assert_eq!(graph.cfg_kind(header, s1), Some(CfgKind::True));
    assert_eq!(graph.cfg_kind(s1, s2), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(s2, header), Some(CfgKind::Always));
}

#[test]
fn test_do_while_polarity_differs_from_while() {
    let do_graph = build(
        "class A { void m() { do { a(); b(); } while (c); d(); } }",
        Language::Java,
    );
    let do_id = find(&do_graph, "do_statement");
    let body = do_graph.node(do_id).field("body").unwrap();
    let last = statement(&do_graph, "expression_statement", "b");
    let exit = statement(&do_graph, "expression_statement", "d");

    assert_eq!(do_graph.cfg_kind(do_id, body), Some(CfgKind::Always));
    assert_eq!(do_graph.cfg_kind(last, do_id), Some(CfgKind::True));
    assert_eq!(do_graph.cfg_kind(last, exit), Some(CfgKind::False));
    assert_eq!(do_graph.cfg_kind(do_id, exit), None);

    let while_graph = build(
        "class A { void m() { while (c) { a(); b(); } d(); } }",
        Language::Java,
    );
    let while_id = find(&while_graph, "while_statement");
    let last = statement(&while_graph, "expression_statement", "b");
    let exit = statement(&while_graph, "expression_statement", "d");

    assert_eq!(while_graph.cfg_kind(last, while_id), Some(CfgKind::Always));
    assert_eq!(while_graph.cfg_kind(while_id, exit), Some(CfgKind::False));
    assert_eq!(while_graph.cfg_kind(last, exit), None);
}

#[test]
fn test_switch_break_cuts_fallthrough() {
    let graph = build(
        "class A { void m(int v) { switch (v) { case 1: x(); break; case 2: y(); } } }",
        Language::Java,
    );
    // Older grammars name the statement form switch_statement
    let switch = find_all(&graph, "switch_expression")
        .into_iter()
        .chain(find_all(&graph, "switch_statement"))
        .next()
        .unwrap();
    let block = find(&graph, "switch_block");
    let groups = find_all(&graph, "switch_block_statement_group");
    assert_eq!(groups.len(), 2);
    let x = statement(&graph, "expression_statement", "x");
    let brk = find(&graph, "break_statement");
    let y = statement(&graph, "expression_statement", "y");

    assert_eq!(graph.cfg_kind(switch, block), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(block, x), Some(CfgKind::True));
    assert_eq!(graph.cfg_kind(x, brk), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(brk, y), None);
    assert_eq!(graph.cfg_kind(x, y), None);
    assert_eq!(graph.cfg_kind(groups[0], groups[1]), Some(CfgKind::Always));

    // Case 2 is still reached through the group chain
    assert_eq!(graph.cfg_kind(block, groups[0]), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(groups[1], y), Some(CfgKind::True));
    let reachable = adj_cfg(&graph, switch, UNBOUNDED);
    assert!(reachable.contains(&groups[0]));
    assert!(reachable.contains(&groups[1]));
    assert!(reachable.contains(&y));
}

#[test]
fn test_every_case_reachable_from_switch() {
    let graph = build(
        "class A { void m(int v) { switch (v) { case 1: x(); break; case 2: return; default: z(); } } }",
        Language::Java,
    );
    let switch = find_all(&graph, "switch_expression")
        .into_iter()
        .chain(find_all(&graph, "switch_statement"))
        .next()
        .unwrap();
    let ret = find(&graph, "return_statement");
    let z = statement(&graph, "expression_statement", "z");

    let reachable = adj_cfg(&graph, switch, UNBOUNDED);
    for group in find_all(&graph, "switch_block_statement_group") {
        assert!(reachable.contains(&group), "group {} unreachable", group);
    }
    assert!(reachable.contains(&ret));
    assert!(reachable.contains(&z));
}

#[test]
fn test_labeled_loop_keeps_exit_and_break_target() {
    let graph = build(
        "class A { void m() { outer: while (c) { if (d) { break; } a(); } done(); } }",
        Language::Java,
    );
    let block = find(&graph, "block");
    let while_id = find(&graph, "while_statement");
    let brk = find(&graph, "break_statement");
    let done = statement(&graph, "expression_statement", "done");
    let label = find(&graph, "labeled_statement");

    assert_eq!(graph.cfg_kind(block, while_id), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(while_id, done), Some(CfgKind::False));
    assert_eq!(graph.cfg_kind(brk, done), Some(CfgKind::Break));
    assert_eq!(graph.cfg_kind(label, done), None);
}

#[test]
fn test_switch_without_break_falls_through() {
    let graph = build(
        "class A { void m(int v) { switch (v) { case 1: x(); case 2: y(); } } }",
        Language::Java,
    );
    let x = statement(&graph, "expression_statement", "x");
    let y = statement(&graph, "expression_statement", "y");
    assert_eq!(graph.cfg_kind(x, y), Some(CfgKind::Always));
}

#[test]
fn test_single_statement_method() {
    let graph = build("class A { void m(){ int x = 1; } }", Language::Java);
    let methods = find_all(&graph, "method_declaration");
    assert_eq!(methods.len(), 1);
    let block = find(&graph, "block");
    let decl = find(&graph, "local_variable_declaration");

    assert_eq!(graph.cfg_kind(methods[0], block), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(block, decl), Some(CfgKind::Always));
}

#[test]
fn test_try_catch_finally_edges() {
    let graph = build(
        "class A { void m() { try { risky(); } catch (IOException e) { handle(); } finally { cleanup(); } } }",
        Language::Java,
    );
    let try_id = find(&graph, "try_statement");
    let body = graph.node(try_id).field("body").unwrap();
    let catch = find(&graph, "catch_clause");
    let finally = find(&graph, "finally_clause");

    assert_eq!(graph.cfg_kind(try_id, body), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(body, catch), Some(CfgKind::Maybe));
    assert_eq!(graph.cfg_kind(catch, finally), Some(CfgKind::Always));
}

#[test]
fn test_javascript_loop_and_if() {
    let graph = build(
        "function f(xs) { for (const x of xs) { if (x) { use(x); } } done(); }",
        Language::JavaScript,
    );
    let for_id = find(&graph, "for_in_statement");
    let if_id = find(&graph, "if_statement");
    let done = statement(&graph, "expression_statement", "done");
    let consequence = graph.node(if_id).field("consequence").unwrap();

    assert_eq!(graph.cfg_kind(for_id, if_id), Some(CfgKind::True));
    assert_eq!(graph.cfg_kind(if_id, for_id), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(for_id, done), Some(CfgKind::False));
    assert_eq!(graph.cfg_kind(if_id, consequence), Some(CfgKind::True));
}

#[test]
fn test_go_explicit_fallthrough() {
    let graph = build(
        "package m\n\nfunc f(v int) {\n\tswitch v {\n\tcase 1:\n\t\ta()\n\t\tfallthrough\n\tcase 2:\n\t\tb()\n\tcase 3:\n\t\tc()\n\t}\n}\n",
        Language::Go,
    );
    let fall = find(&graph, "fallthrough_statement");
    let b = statement(&graph, "expression_statement", "b");
    let c = statement(&graph, "expression_statement", "c");
    let cases = find_all(&graph, "expression_case");
    assert_eq!(cases.len(), 3);

    assert_eq!(graph.cfg_kind(fall, b), Some(CfgKind::Always));
    // Go never falls through implicitly
    assert_eq!(graph.cfg_kind(b, c), None);
    assert_eq!(graph.cfg_kind(cases[1], cases[2]), Some(CfgKind::Always));
}

#[test]
fn test_go_for_loop_back_edge() {
    let graph = build(
        "package m\n\nfunc f(n int) {\n\tfor i := 0; i < n; i++ {\n\t\ta()\n\t}\n\tb()\n}\n",
        Language::Go,
    );
    let for_id = find(&graph, "for_statement");
    let a = statement(&graph, "expression_statement", "a");
    let b = statement(&graph, "expression_statement", "b");

    assert_eq!(graph.cfg_kind(for_id, a), Some(CfgKind::True));
    assert_eq!(graph.cfg_kind(a, for_id), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(for_id, b), Some(CfgKind::False));
}

#[test]
fn test_csharp_method_and_try() {
    let graph = build(
        "class A { void M() { try { Run(); } catch (Exception e) { Log(); } } }",
        Language::CSharp,
    );
    let method = find(&graph, "method_declaration");
    let try_id = find(&graph, "try_statement");
    let catch = find(&graph, "catch_clause");
    let body = graph.node(try_id).field("body").unwrap();

    assert!(graph
        .cfg_successors(method)
        .iter()
        .any(|&(_, kind)| kind == CfgKind::Always));
    assert_eq!(graph.cfg_kind(try_id, body), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(body, catch), Some(CfgKind::Maybe));
}

#[test]
fn test_kotlin_graph_has_cfg_edges() {
    let graph = build(
        "fun f(xs: List<Int>) {\n    for (x in xs) {\n        println(x)\n    }\n}\n",
        Language::Kotlin,
    );
    let for_id = find(&graph, "for_statement");
    assert!(graph
        .cfg_successors(for_id)
        .iter()
        .any(|&(_, kind)| kind == CfgKind::True));
}

#[test]
fn test_call_chain_runs_innermost_first() {
    let graph = build(
        "class A { void m() { builder().name(n).build(); } }",
        Language::Java,
    );
    let calls = find_all(&graph, "method_invocation");
    assert_eq!(calls.len(), 3);
    // Pre-order puts the outermost call first
    let (outer, middle, inner) = (calls[0], calls[1], calls[2]);
    assert_eq!(graph.cfg_kind(inner, middle), Some(CfgKind::Always));
    assert_eq!(graph.cfg_kind(middle, outer), Some(CfgKind::Always));
}
