//! AST lowering integration tests
//!
//! Tree shape, final-node text and the per-file size cap.

use sast_graph::{copy_ast, lower, parse, to_json, Graph, GraphBuilder, Language, NodeId};
use std::collections::BTreeMap;
use tempfile::TempDir;

fn lowered(source: &[u8], language: Language) -> Graph {
    let tree = parse(source, language).unwrap();
    lower(&tree).unwrap()
}

fn assert_tree_shape(graph: &Graph) {
    let mut incoming: BTreeMap<NodeId, usize> = BTreeMap::new();
    for (src, dst, edge) in graph.edges() {
        if edge.is_ast() {
            *incoming.entry(dst).or_default() += 1;
            assert!(src < dst, "AST edge {} -> {} breaks pre-order", src, dst);
        }
    }

    for id in graph.node_ids() {
        let parents = incoming.get(&id).copied().unwrap_or(0);
        if id == NodeId::ROOT {
            assert_eq!(parents, 0, "root has a parent");
        } else {
            assert_eq!(parents, 1, "node {} has {} AST parents", id, parents);
        }

        let mut indices: Vec<u32> = graph
            .successors(id)
            .iter()
            .filter_map(|&child| graph.edge(id, child).and_then(|e| e.ast_index))
            .collect();
        indices.sort_unstable();
        let expected: Vec<u32> = (0..indices.len() as u32).collect();
        assert_eq!(indices, expected, "child indices of {} are not 0..k", id);
    }
}

fn assert_final_nodes_are_leaves(graph: &Graph) {
    for (id, node) in graph.nodes() {
        if node.text.is_some() {
            assert!(
                graph.ast_children(id).is_empty(),
                "final node {} ({}) has AST children",
                id,
                node.kind
            );
        }
    }
}

#[test]
fn test_tree_shape_for_every_language() {
    let samples: &[(&str, Language)] = &[
        ("class A { int f(int x) { return x + 1; } }", Language::Java),
        ("function f(a) { if (a) { return [a, 2]; } }", Language::JavaScript),
        ("const f = (a: number): string => `${a}`;", Language::Tsx),
        ("package m\n\nfunc f(x int) int { return x * 2 }\n", Language::Go),
        ("class A { int F(int x) { return x; } }", Language::CSharp),
        ("fun f(x: Int): Int { return x + 1 }\n", Language::Kotlin),
    ];
    for (source, language) in samples {
        let graph = lowered(source.as_bytes(), *language);
        assert!(graph.node_count() > 1, "{} produced an empty graph", language);
        assert_tree_shape(&graph);
        assert_final_nodes_are_leaves(&graph);
    }
}

#[test]
fn test_java_string_literal_is_final() {
    let graph = lowered(
        br#"class A { String s = "a" + "b"; }"#,
        Language::Java,
    );
    let literals: Vec<_> = graph
        .nodes()
        .filter(|(_, n)| n.kind == "string_literal")
        .map(|(_, n)| n.text.clone())
        .collect();
    assert_eq!(
        literals,
        vec![Some("\"a\"".to_string()), Some("\"b\"".to_string())]
    );
}

#[test]
fn test_invalid_utf8_text_decodes_as_latin1() {
    let graph = lowered(b"let s = \"caf\xe9\";", Language::JavaScript);
    let text = graph
        .nodes()
        .find(|(_, n)| n.kind == "string")
        .and_then(|(_, n)| n.text.clone())
        .unwrap();
    assert_eq!(text, "\"caf\u{e9}\"");
}

#[test]
fn test_named_field_labels_resolve_to_children() {
    let graph = lowered(b"class A { void run() {} }", Language::Java);
    let (method, node) = graph
        .nodes()
        .find(|(_, n)| n.kind == "method_declaration")
        .unwrap();
    let name = node.field("name").unwrap();
    assert_eq!(graph.ast_parent(name), Some(method));
    assert_eq!(graph.node(name).text.as_deref(), Some("run"));
    assert_eq!(
        node.label("label_field_name").as_deref(),
        Some(name.to_string().as_str())
    );
}

#[test]
fn test_content_past_cap_is_ignored() {
    let dir = TempDir::new().unwrap();
    let cap = 100 * 1024;

    let mut prefix = Vec::new();
    while prefix.len() + 11 <= cap {
        prefix.extend_from_slice(b"let a = 1;\n");
    }
    prefix.resize(cap, b' ');

    let mut oversized = prefix.clone();
    oversized.extend_from_slice(b"}}} this would never parse {{{");

    let path = dir.path().join("big.js");
    std::fs::write(&path, &oversized).unwrap();

    let shard = GraphBuilder::default()
        .parse_one(Language::JavaScript, &path)
        .expect("capped content parses");
    let expected = GraphBuilder::default()
        .build_graph(Language::JavaScript, "prefix.js", &prefix)
        .unwrap();
    assert_eq!(to_json(shard.graph()), to_json(&expected));
}

#[test]
fn test_ast_copy_keeps_tree_shape() {
    let graph = GraphBuilder::default()
        .build_graph(
            Language::Java,
            "A.java",
            b"class A { void m() { while (c) { a(); } } }",
        )
        .unwrap();
    let ast = copy_ast(&graph);
    assert_eq!(ast.cfg_edge_count(), 0);
    assert_eq!(ast.ast_edge_count(), graph.ast_edge_count());
    assert_tree_shape(&ast);
}
