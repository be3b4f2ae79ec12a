//! Scan pipeline integration tests
//!
//! Shard order, skip handling and GraphDb assembly using temp directories.

use sast_graph::{
    parse_many, to_json, GraphBuilder, GraphError, Language, ScanConfig, SkipReason,
};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
    path
}

/// Collects the `path` field of every WARN event.
#[derive(Clone, Default)]
struct WarnCapture {
    paths: Arc<Mutex<Vec<String>>>,
}

#[derive(Default)]
struct PathField(Option<String>);

impl Visit for PathField {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "path" {
            self.0 = Some(value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "path" && self.0.is_none() {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for WarnCapture {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == Level::WARN {
            let mut field = PathField::default();
            event.record(&mut field);
            self.paths
                .lock()
                .unwrap()
                .push(field.0.unwrap_or_default());
        }
    }
}

#[test]
fn test_unparseable_file_yields_none_and_one_warning() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "Broken.java", "class A { void m() { if (x) { }");

    let capture = WarnCapture::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let shard = tracing::subscriber::with_default(subscriber, || {
        GraphBuilder::default().parse_one(Language::Java, &path)
    });

    assert!(shard.is_none());
    let warnings = capture.paths.lock().unwrap().clone();
    assert_eq!(warnings, vec![path.display().to_string()]);
}

#[test]
fn test_parse_many_keeps_order_and_filters_unsupported() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(dir.path(), "b.go", "package b\n"),
        write(dir.path(), "notes.txt", "not code"),
        write(dir.path(), "a.js", "let a = 1;"),
        write(dir.path(), "Bad.java", "class {"),
        write(dir.path(), "C.cs", "class C {}"),
    ];

    let shards = parse_many(&paths);
    let names: Vec<String> = shards
        .iter()
        .map(|s| Path::new(s.path()).file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["b.go", "a.js", "C.cs"]);
    assert_eq!(shards[2].language(), Language::CSharp);
}

#[test]
fn test_graph_db_indexes_classes_per_language() {
    let dir = TempDir::new().unwrap();
    let java = write(
        dir.path(),
        "src/Order.java",
        "package shop;\nclass Order { class Line {} }",
    );
    let kotlin = write(dir.path(), "src/Cart.kt", "package shop\n\nclass Cart\n");
    let js = write(dir.path(), "web/app.js", "class Widget {}");

    let (db, report) = GraphBuilder::default()
        .get_graph_db_with_report(&[java.clone(), kotlin.clone(), js.clone()])
        .unwrap();

    assert_eq!(db.len(), 3);
    assert_eq!(report.parsed, 3);
    assert!(report.skipped.is_empty());

    let java_path = java.display().to_string();
    let java_classes = db.classes(Language::Java).unwrap();
    assert_eq!(java_classes.get("shop.Order"), Some(&java_path));
    assert_eq!(java_classes.get("shop.Order.Line"), Some(&java_path));

    let kotlin_classes = db.classes(Language::Kotlin).unwrap();
    assert_eq!(
        kotlin_classes.get("shop.Cart"),
        Some(&kotlin.display().to_string())
    );

    // JavaScript has no class-name index
    assert!(db.classes(Language::JavaScript).is_none());
    assert_eq!(db.shards_by_path()[&js.display().to_string()], 2);
}

#[test]
fn test_duplicate_paths_rejected_before_parsing() {
    let dir = TempDir::new().unwrap();
    let path = write(dir.path(), "a.js", "let a = 1;");

    let err = GraphBuilder::default()
        .get_graph_db(&[path.clone(), path.clone()])
        .unwrap_err();
    assert!(matches!(err, GraphError::DuplicatePath(p) if p == path.display().to_string()));
}

#[test]
fn test_report_counts_skips_by_reason() {
    let dir = TempDir::new().unwrap();
    let paths = vec![
        write(dir.path(), "ok.js", "f();"),
        write(dir.path(), "bad.js", "f(;"),
        write(dir.path(), "readme.md", "# hi"),
        dir.path().join("missing.go"),
    ];

    let (db, report) = GraphBuilder::default()
        .get_graph_db_with_report(&paths)
        .unwrap();

    assert_eq!(db.len(), 1);
    assert_eq!(report.parsed, 1);
    assert_eq!(report.total(), 4);
    let counts = report.counts_by_reason();
    assert_eq!(counts.get(&SkipReason::SyntaxError), Some(&1));
    assert_eq!(counts.get(&SkipReason::UnsupportedLanguage), Some(&1));
    assert_eq!(counts.get(&SkipReason::ReadFailed), Some(&1));
    assert!(report.summary_line().starts_with("4 files: 1 parsed, 3 skipped"));
}

#[test]
fn test_parallel_matches_sequential() {
    let dir = TempDir::new().unwrap();
    let mut paths = Vec::new();
    for i in 0..24 {
        let source = format!(
            "class C{i} {{ int f(int x) {{ if (x > {i}) {{ return x; }} return {i}; }} }}"
        );
        paths.push(write(dir.path(), &format!("C{i}.java"), &source));
    }
    paths.push(write(dir.path(), "Broken.java", "class {"));

    let sequential = GraphBuilder::default();
    let parallel = GraphBuilder::new(ScanConfig {
        parallel: true,
        ..ScanConfig::default()
    });

    let seq_shards: Vec<_> = sequential.parse_many(&paths).collect();
    let par_shards = parallel.parse_many_parallel(&paths);
    assert_eq!(seq_shards.len(), 24);
    assert_eq!(par_shards.len(), 24);
    for (a, b) in seq_shards.iter().zip(&par_shards) {
        assert_eq!(a.path(), b.path());
        assert_eq!(to_json(a.graph()), to_json(b.graph()));
    }

    let seq_db = sequential.get_graph_db(&paths).unwrap();
    let par_db = parallel.get_graph_db(&paths).unwrap();
    let seq_paths: Vec<_> = seq_db.shards().iter().map(|s| s.path()).collect();
    let par_paths: Vec<_> = par_db.shards().iter().map(|s| s.path()).collect();
    assert_eq!(seq_paths, par_paths);
}

#[test]
fn test_configured_size_cap_truncates_reads() {
    let dir = TempDir::new().unwrap();
    // The second statement is cut in half by the cap
    let path = write(dir.path(), "cut.js", "let a = 1;\nlet bb = (2);\n");

    let builder = GraphBuilder::new(ScanConfig {
        max_file_size: 21,
        ..ScanConfig::default()
    });
    assert!(builder.parse_one(Language::JavaScript, &path).is_none());

    let builder = GraphBuilder::new(ScanConfig {
        max_file_size: 11,
        ..ScanConfig::default()
    });
    let shard = builder.parse_one(Language::JavaScript, &path).unwrap();
    assert_eq!(shard.syntax().count("lexical_declaration"), 1);
}

#[test]
fn test_invalid_utf8_file_still_parses() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bytes.js");
    std::fs::write(&path, b"// \xff\xfe\xfd\nlet s = 1;\n").unwrap();

    let shard = GraphBuilder::default()
        .parse_one(Language::JavaScript, &path)
        .unwrap();
    let comment = shard
        .graph()
        .nodes()
        .find(|(_, n)| n.kind == "comment")
        .and_then(|(_, n)| n.text.clone())
        .unwrap();
    assert_eq!(comment, "// \u{ff}\u{fe}\u{fd}");
}

#[test]
fn test_parse_timeout_skips_only_that_file() {
    let dir = TempDir::new().unwrap();
    let mut huge = String::new();
    while huge.len() < 4 * 1024 * 1024 {
        huge.push_str("let a = [1, (2 + 3) * f(x, y), { k: `v${z}` }];\n");
    }
    let big = write(dir.path(), "big.js", &huge);
    let small = write(dir.path(), "small.js", "let a = 1;\n");

    // Sequential, so both files go through the same thread's parser
    let builder = GraphBuilder::new(ScanConfig {
        max_file_size: huge.len(),
        parse_timeout_ms: Some(1),
        parallel: false,
    });
    let (db, report) = builder
        .get_graph_db_with_report(&[big.clone(), small.clone()])
        .unwrap();

    assert_eq!(report.parsed, 1);
    assert_eq!(
        report.counts_by_reason().get(&SkipReason::ParseTimeout),
        Some(&1)
    );
    assert!(db.shard(&big.display().to_string()).is_none());
    let shard = db.shard(&small.display().to_string()).unwrap();
    assert_eq!(shard.syntax().count("lexical_declaration"), 1);
}
