//! sast-graph CLI: build the graph database for a set of source files
//!
//! Usage: sast-graph [options] <PATH>...

use anyhow::{Context, Result};
use sast_graph::{logging, version, GraphBuilder, GraphDb, ScanConfig};
use std::path::PathBuf;
use std::process::ExitCode;

fn print_usage() {
    eprintln!("sast-graph - Multi-language source graph builder");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  sast-graph [options] <PATH>...");
    eprintln!("  sast-graph --help");
    eprintln!();
    eprintln!("Directories are walked recursively; files with unsupported extensions");
    eprintln!("are counted but not parsed.");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --json                Print the JSON export of every shard");
    eprintln!("  --parallel            Parse files on all cores");
    eprintln!("  --config <FILE>       Load scan settings from a JSON file");
    eprintln!("  --max-file-size <N>   Bytes read per file (default: 102400)");
    eprintln!("  --timeout-ms <N>      Per-file parse timeout in milliseconds");
    eprintln!("  -v, --verbose         Debug logging (RUST_LOG overrides)");
    eprintln!("  -V, --version         Print version and exit");
}

struct Args {
    paths: Vec<PathBuf>,
    json: bool,
    verbose: bool,
    config: ScanConfig,
}

fn parse_args() -> Result<Args> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut paths = Vec::new();
    let mut json = false;
    let mut verbose = false;
    let mut parallel = false;
    let mut config_path: Option<PathBuf> = None;
    let mut max_file_size: Option<usize> = None;
    let mut timeout_ms: Option<u64> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                std::process::exit(0);
            }
            "--version" | "-V" => {
                println!("{}", version::version());
                std::process::exit(0);
            }
            "--json" => {
                json = true;
                i += 1;
            }
            "--parallel" => {
                parallel = true;
                i += 1;
            }
            "--verbose" | "-v" => {
                verbose = true;
                i += 1;
            }
            "--config" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--config requires an argument"))?;
                config_path = Some(PathBuf::from(value));
                i += 2;
            }
            "--max-file-size" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--max-file-size requires an argument"))?;
                max_file_size = Some(value.parse().context("--max-file-size must be a number")?);
                i += 2;
            }
            "--timeout-ms" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("--timeout-ms requires an argument"))?;
                timeout_ms = Some(value.parse().context("--timeout-ms must be a number")?);
                i += 2;
            }
            flag if flag.starts_with('-') => {
                return Err(anyhow::anyhow!("Unknown argument: {}", flag));
            }
            path => {
                paths.push(PathBuf::from(path));
                i += 1;
            }
        }
    }

    if paths.is_empty() {
        return Err(anyhow::anyhow!("Missing input path"));
    }

    // Flags override the config file
    let mut config = match config_path {
        Some(path) => ScanConfig::from_path(&path)?,
        None => ScanConfig::default(),
    };
    if parallel {
        config.parallel = true;
    }
    if let Some(size) = max_file_size {
        config.max_file_size = size;
    }
    if timeout_ms.is_some() {
        config.parse_timeout_ms = timeout_ms;
    }

    Ok(Args {
        paths,
        json,
        verbose,
        config,
    })
}

/// Expand directories to their files, sorted for deterministic order.
fn collect_files(inputs: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = walkdir::WalkDir::new(input)
                .follow_links(false)
                .into_iter()
                .filter_map(std::result::Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .map(|entry| entry.into_path())
                .collect();
            found.sort();
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    files
}

fn print_summary(db: &GraphDb) {
    for shard in db.shards() {
        let graph = shard.graph();
        println!(
            "{}\t{}\tnodes={}\tast={}\tcfg={}\tclasses={}",
            shard.path(),
            shard.language(),
            graph.node_count(),
            graph.ast_edge_count(),
            graph.cfg_edge_count(),
            shard.metadata().classes.len()
        );
    }
}

fn print_json(db: &GraphDb) -> Result<()> {
    let mut shards = serde_json::Map::new();
    for shard in db.shards() {
        shards.insert(
            shard.path().to_string(),
            sast_graph::graph::export::to_json(shard.graph()),
        );
    }
    println!("{}", serde_json::to_string_pretty(&shards)?);
    Ok(())
}

fn run(args: Args) -> Result<()> {
    sast_graph::warmup().context("loading grammars")?;

    let files = collect_files(&args.paths);
    let builder = GraphBuilder::new(args.config);
    let (db, report) = builder.get_graph_db_with_report(&files)?;

    for diagnostic in &report.skipped {
        tracing::debug!("{}", diagnostic.format_stderr());
    }

    if args.json {
        print_json(&db)?;
    } else {
        print_summary(&db);
    }
    eprintln!("{}", report.summary_line());
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {}", e);
            eprintln!();
            print_usage();
            return ExitCode::from(1);
        }
    };

    logging::init(args.verbose);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}
