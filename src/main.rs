//! `bdx` CLI: thin `clap`-derived argument parsing over the `bdx-*` crates.
//! Per spec §1 the CLI framing itself (argument parsing, result
//! pretty-printing) is an external collaborator of the core, not part of
//! the specification; this binary is kept correspondingly small.

mod demangle;
mod dot;
mod error;
mod format;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use error::{Error, Result};
use format::OutputFormat;

#[derive(Parser)]
#[command(name = "bdx", version, about = "Index ELF symbols and query them, including relocation reference graphs.")]
struct Cli {
    /// Store directory. Defaults to `$BDX_INDEX_DIR`.
    #[arg(short = 'I', long = "index-dir", global = true, env = "BDX_INDEX_DIR")]
    index_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// (Re)index a build directory or a compilation database into the store.
    Index(IndexArgs),
    /// Run a query against the store and print matching records.
    Search(SearchArgs),
    /// Enumerate relocation-reference paths between two query result sets.
    Graph(GraphArgs),
}

#[derive(Args)]
struct IndexArgs {
    /// Walk this directory for `.o` files.
    #[arg(short = 'd', long = "dir", conflicts_with = "compile_db")]
    dir: Option<PathBuf>,

    /// Read object file paths from this `compile_commands.json`-style file.
    #[arg(short = 'c', long = "compile-db", conflicts_with = "dir")]
    compile_db: Option<PathBuf>,

    /// Repeatable `key=value` indexer option override (see `IndexerOptions`).
    #[arg(short = 'o', long = "opt", value_parser = parse_opt)]
    opt: Vec<(String, String)>,
}

#[derive(Args)]
struct SearchArgs {
    /// Maximum number of records to print.
    #[arg(short = 'n', long = "limit")]
    limit: Option<usize>,

    /// Resolve each match's demangled name via an external demangler.
    #[arg(long = "demangle-names")]
    demangle_names: bool,

    /// `json`, `sexp`, or a printf-style `%field` template.
    #[arg(short = 'f', long = "format", default_value = "json")]
    format: String,

    /// One or more query clauses; multiple clauses are AND-joined.
    #[arg(required = true)]
    query: Vec<String>,
}

#[derive(Args)]
struct GraphArgs {
    /// Maximum number of paths to emit.
    #[arg(short = 'n', long = "limit", default_value_t = 10)]
    limit: usize,

    #[arg(long = "algorithm", value_enum, default_value = "BFS")]
    algorithm: AlgorithmArg,

    /// Cap on path length, in nodes.
    #[arg(long = "max-depth")]
    max_depth: Option<usize>,

    /// Query selecting the path's starting symbols.
    source: String,

    /// Query selecting the path's ending symbols.
    sink: String,
}

#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "UPPER")]
enum AlgorithmArg {
    Bfs,
    Dfs,
    Astar,
}

impl From<AlgorithmArg> for bdx_graph::Algorithm {
    fn from(a: AlgorithmArg) -> Self {
        match a {
            AlgorithmArg::Bfs => bdx_graph::Algorithm::Bfs,
            AlgorithmArg::Dfs => bdx_graph::Algorithm::Dfs,
            AlgorithmArg::Astar => bdx_graph::Algorithm::AStar,
        }
    }
}

fn parse_opt(s: &str) -> anyhow::Result<(String, String)> {
    match s.split_once('=') {
        Some((k, v)) => Ok((k.to_string(), v.to_string())),
        None => Err(anyhow::anyhow!("expected key=value, got '{s}'")),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    if let Err(e) = dispatch(cli) {
        eprintln!("{}", e.render());
        std::process::exit(e.exit_code());
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let index_dir = resolve_index_dir(cli.index_dir)?;
    match cli.command {
        Command::Index(args) => cmd_index(args, index_dir),
        Command::Search(args) => cmd_search(args, index_dir),
        Command::Graph(args) => cmd_graph(args, index_dir),
    }
}

fn resolve_index_dir(given: Option<PathBuf>) -> Result<PathBuf> {
    given.ok_or_else(|| {
        Error::Usage("no store directory: pass -I/--index-dir or set $BDX_INDEX_DIR".to_string())
    })
}

fn cmd_index(args: IndexArgs, index_dir: PathBuf) -> Result<()> {
    let paths = match (&args.dir, &args.compile_db) {
        (Some(dir), None) => bdx_index::discover::scan_directory(dir)?,
        (None, Some(db)) => bdx_index::discover::read_compile_db(db)?,
        (None, None) => {
            return Err(Error::Usage("index requires either -d DIR or -c FILE".to_string()))
        }
        (Some(_), Some(_)) => unreachable!("clap enforces -d/-c are mutually exclusive"),
    };

    let mut opts = bdx_index::IndexerOptions::load_from_env_or_default();
    for (key, value) in &args.opt {
        opts.apply(key, value).map_err(Error::Usage)?;
    }

    let store = bdx_store::Store::open(&index_dir)?;
    let candidates = bdx_index::read_candidates(&paths);
    let work = bdx_index::compute_workset(candidates, store.manifest());

    let cancel = bdx_store::CancelToken::new();
    let ctrlc_cancel = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || ctrlc_cancel.cancel()) {
        tracing::warn!(error = %e, "failed to install Ctrl-C handler, cancellation disabled");
    }

    let report = bdx_index::run(&store, work, &opts, &cancel)?;

    let completed_at = chrono::Utc::now().to_rfc3339();
    println!(
        "indexed {} files, removed {}, unchanged {}, failed {} ({} symbols, {:.2}s) at {completed_at}",
        report.files_indexed,
        report.files_removed,
        report.files_unchanged,
        report.files_failed,
        report.total_symbols,
        report.duration.as_secs_f64(),
    );
    for failure in &report.failures {
        eprintln!("bdx: file error: {}: {}", failure.path, failure.message);
    }
    Ok(())
}

fn cmd_search(args: SearchArgs, index_dir: PathBuf) -> Result<()> {
    let store = bdx_store::Store::open(&index_dir)?;
    let searcher = bdx_search::Searcher::open(&store).map_err(|e| Error::from_search("", e))?;

    let combined = combine_queries(&args.query);
    let limit = args.limit.unwrap_or(usize::MAX);
    let records = searcher.search(&combined, limit).map_err(|e| Error::from_search(&combined, e))?;

    let format = OutputFormat::parse(&args.format);
    let demangler = args.demangle_names.then(demangle::demangler_path);

    for record in &records {
        let demangled = demangler.as_deref().map(|bin| demangle::demangle(bin, &record.name));
        println!("{}", format::render(&format, record, demangled.as_deref()));
    }
    Ok(())
}

fn cmd_graph(args: GraphArgs, index_dir: PathBuf) -> Result<()> {
    let store = bdx_store::Store::open(&index_dir)?;
    let searcher = bdx_search::Searcher::open(&store).map_err(|e| Error::from_search(&args.source, e))?;

    let opts = bdx_graph::GraphOptions {
        algorithm: args.algorithm.into(),
        max_paths: args.limit,
        max_depth: args.max_depth,
    };
    let paths = bdx_graph::find_paths(&searcher, &args.source, &args.sink, &opts)
        .map_err(|e| Error::from_graph(&args.source, &args.sink, e))?;

    print!("{}", dot::render(&paths));
    Ok(())
}

/// Juxtaposition is AND per the query grammar (spec §4.5); multiple
/// positional clauses are joined the same way, each parenthesized so a
/// clause containing its own `OR`/`NOT` doesn't leak into its neighbors.
fn combine_queries(queries: &[String]) -> String {
    queries.iter().map(|q| format!("({q})")).collect::<Vec<_>>().join(" AND ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn combine_queries_parenthesizes_and_ands_each_clause() {
        assert_eq!(combine_queries(&["a".to_string()]), "(a)");
        assert_eq!(combine_queries(&["a".to_string(), "b OR c".to_string()]), "(a) AND (b OR c)");
    }
}
