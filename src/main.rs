use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::builder::{RangedI64ValueParser, TypedValueParser};
use clap::{Parser, Subcommand};
use objgrep::error::ObjgrepError;
use objgrep::host::{load_snapshot, Realm};
use objgrep::output::{
    json_response, match_id, render_value, value_summary, ConsoleSink, ErrorResponse,
    KindResponse, MatchEntry, OutputFormat, PerformanceMetrics, SearchResponse,
};
use objgrep::output_common::{is_json_format, render_json_response};
use objgrep::search::{
    internal_class, ExpansionPolicy, RootOverride, SearchForm, SearchRequest, Searcher,
    TraverseOptions,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable holding the log filter directives.
const LOG_ENV: &str = "OBJGREP_LOG";

/// Search parameters bundled into a single struct.
#[derive(Debug)]
struct SearchParams {
    by_name: Option<String>,
    by_value: Option<String>,
    by_kind: Option<String>,
    strict: bool,
    root: Option<String>,
    max_nodes: Option<usize>,
    time_budget_ms: Option<u64>,
    descend_all: bool,
}

fn ranged_usize(min: i64, max: i64) -> impl TypedValueParser<Value = usize> {
    let inner = RangedI64ValueParser::new().range(min..=max);
    // The range keeps values non-negative
    inner.map(|v: i64| v as usize)
}

#[derive(Parser)]
#[command(
    name = "objgrep",
    version = env!("CARGO_PKG_VERSION"),
    about = "Find properties anywhere in an object graph by key, value or kind"
)]
struct Cli {
    #[arg(long, global = true, default_value_t = OutputFormat::Human)]
    output: OutputFormat,

    /// Object graph snapshot (JSON)
    #[arg(long, global = true)]
    graph: Option<PathBuf>,

    #[arg(long, global = true)]
    show_metrics: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Search the graph. The first non-empty of --by-name, --by-value and
    /// --by-kind is used.
    #[command(after_help = SEARCH_EXAMPLES)]
    Search {
        #[arg(long)]
        by_name: Option<String>,

        #[arg(long)]
        by_value: Option<String>,

        #[arg(long)]
        by_kind: Option<String>,

        /// Exact matching instead of case-insensitive patterns
        #[arg(long)]
        strict: bool,

        /// Dotted path of an alternate root, e.g. window.app.config
        #[arg(long)]
        root: Option<String>,

        #[arg(long, value_parser = ranged_usize(1, i64::MAX))]
        max_nodes: Option<usize>,

        #[arg(long)]
        time_budget_ms: Option<u64>,

        /// Descend into arrays and every other object, not only plain
        /// objects and functions
        #[arg(long)]
        descend_all: bool,
    },

    /// Print the kind label of the value at a dotted path
    Kind { path: String },
}

const SEARCH_EXAMPLES: &str = r#"
EXAMPLES:
  # Keys containing "token", any case
  objgrep --graph page.json search --by-name token

  # Exact key
  objgrep --graph page.json search --by-name token --strict

  # Properties whose value is the number 8080
  objgrep --graph page.json search --by-value 8080

  # Every array below window.app
  objgrep --graph page.json search --by-kind Array --root window.app

  # Bounded search with JSON output
  objgrep --graph page.json --output json search --by-kind '*' --max-nodes 5000
"#;

fn main() {
    init_tracing();

    let cli = Cli::parse();
    if let Err(err) = dispatch(&cli) {
        emit_error(&cli, &err);
        // Rejected requests exit 2, runtime failures 1
        std::process::exit(if err.is_configuration_error() { 2 } else { 1 });
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| "objgrep=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn dispatch(cli: &Cli) -> Result<(), ObjgrepError> {
    match &cli.command {
        None => Err(ObjgrepError::InvalidQuery {
            query: "No subcommand provided. Use --help for usage information.".to_string(),
        }),
        Some(Command::Search {
            by_name,
            by_value,
            by_kind,
            strict,
            root,
            max_nodes,
            time_budget_ms,
            descend_all,
        }) => {
            let params = SearchParams {
                by_name: by_name.clone(),
                by_value: by_value.clone(),
                by_kind: by_kind.clone(),
                strict: *strict,
                root: root.clone(),
                max_nodes: *max_nodes,
                time_budget_ms: *time_budget_ms,
                descend_all: *descend_all,
            };
            run_search(cli, &params)
        }
        Some(Command::Kind { path }) => run_kind(cli, path),
    }
}

fn load_graph(cli: &Cli) -> Result<Realm, ObjgrepError> {
    let path = cli.graph.as_ref().ok_or(ObjgrepError::SnapshotNotFound {
        path: "none (pass --graph <snapshot.json>)".to_string(),
    })?;
    load_snapshot(path)
}

fn resolve_root(realm: &Realm, path: &str) -> Result<RootOverride, ObjgrepError> {
    let object = realm
        .resolve_path(path)?
        .as_object()
        .cloned()
        .ok_or_else(|| ObjgrepError::RootNotFound {
            path: format!("{} (not an object)", path),
        })?;
    Ok(RootOverride {
        object,
        path: Some(path.to_string()),
    })
}

/// Cancellation flag raised by SIGINT or SIGTERM.
fn register_cancel_flag() -> Result<Arc<AtomicBool>, ObjgrepError> {
    let cancel = Arc::new(AtomicBool::new(false));

    #[cfg(unix)]
    {
        use signal_hook::consts::signal;
        use signal_hook::flag;

        flag::register(signal::SIGINT, cancel.clone())?;
        flag::register(signal::SIGTERM, cancel.clone())?;
    }

    Ok(cancel)
}

fn run_search(cli: &Cli, params: &SearchParams) -> Result<(), ObjgrepError> {
    let total_start = Instant::now();

    let load_start = Instant::now();
    let realm = load_graph(cli)?;
    let snapshot_load_ms = load_start.elapsed().as_millis() as u64;

    let form = SearchForm {
        by_name: params.by_name.clone(),
        by_value: params.by_value.clone(),
        by_kind: params.by_kind.clone(),
        strict: params.strict,
    };
    let (kind, query) = form.select().ok_or(ObjgrepError::EmptyQuery)?;
    let query_text = query.describe();

    let options = TraverseOptions {
        max_nodes: params.max_nodes,
        time_budget: params.time_budget_ms.map(Duration::from_millis),
        expansion: if params.descend_all {
            ExpansionPolicy::AllObjects
        } else {
            ExpansionPolicy::PlainAndInvokable
        },
        cancel: Some(register_cancel_flag()?),
    };

    let mut request = SearchRequest::new(kind, query)
        .strict(form.strict)
        .options(options);
    if let Some(path) = &params.root {
        request = request.root(resolve_root(&realm, path)?);
    }

    let searcher = Searcher::for_realm(&realm);

    if !is_json_format(cli.output) {
        let traversal_start = Instant::now();
        searcher.run(&request, &mut ConsoleSink::new())?;
        let traversal_ms = traversal_start.elapsed().as_millis() as u64;

        if cli.show_metrics {
            eprintln!("Performance metrics:");
            eprintln!("  Snapshot load: {}ms", snapshot_load_ms);
            eprintln!("  Traversal: {}ms", traversal_ms);
            eprintln!("  Total: {}ms", total_start.elapsed().as_millis());
        }
        return Ok(());
    }

    let traversal_start = Instant::now();
    let report = searcher.search(&request)?;
    let traversal_ms = traversal_start.elapsed().as_millis() as u64;

    let format_start = Instant::now();
    let classifier = searcher.classifier();
    let results: Vec<MatchEntry> = report
        .matches
        .iter()
        .map(|record| {
            let rendered = render_value(&record.value);
            MatchEntry {
                match_id: match_id(&record.path, &rendered),
                path: record.path.clone(),
                value_type: record.value.type_tag().to_string(),
                kind: classifier.classify(&record.value),
                value: value_summary(&record.value),
                rendered,
            }
        })
        .collect();
    let response = SearchResponse {
        total_count: results.len() as u64,
        results,
        search_kind: kind,
        query: query_text,
        strict: form.strict,
        root: params.root.clone(),
        nodes_visited: report.nodes_visited as u64,
        elapsed_ms: report.elapsed.as_millis() as u64,
        stop_reason: report.stop_reason.map(|reason| reason.describe().to_string()),
    };
    let metrics = cli.show_metrics.then(|| PerformanceMetrics {
        snapshot_load_ms,
        traversal_ms,
        output_formatting_ms: format_start.elapsed().as_millis() as u64,
        total_ms: total_start.elapsed().as_millis() as u64,
    });

    let payload = render_json_response(&response, report.partial, metrics, cli.output)?;
    println!("{}", payload);
    Ok(())
}

fn run_kind(cli: &Cli, path: &str) -> Result<(), ObjgrepError> {
    let realm = load_graph(cli)?;
    let value = realm.resolve_path(path)?;
    let searcher = Searcher::for_realm(&realm);
    let classifier = searcher.classifier();

    let response = KindResponse {
        path: path.to_string(),
        kind: classifier.classify(&value),
        type_tag: value.type_tag().to_string(),
        internal_class: internal_class(&value).map(str::to_string),
        invokable: classifier.is_invokable(&value),
        plain_data_object: classifier.is_plain_data_object(&value),
        rendered: render_value(&value),
    };

    if is_json_format(cli.output) {
        let payload = render_json_response(&response, false, None, cli.output)?;
        println!("{}", payload);
    } else {
        println!("{}: {}", response.path, response.kind);
        println!("{}", response.rendered);
    }
    Ok(())
}

fn emit_error(cli: &Cli, err: &ObjgrepError) {
    match cli.output {
        OutputFormat::Human => {
            eprintln!("ERROR [{}]: {}", err.error_code(), err);
            if let Some(hint) = err.remediation() {
                eprintln!("Hint: {}", hint);
            }
        }
        OutputFormat::Json | OutputFormat::Pretty => {
            let error = ErrorResponse {
                code: err.error_code().to_string(),
                error: err.severity().to_string(),
                message: err.to_string(),
                remediation: err.remediation().map(|s| s.to_string()),
            };
            let response = json_response(error);
            let result = if matches!(cli.output, OutputFormat::Pretty) {
                serde_json::to_string_pretty(&response)
            } else {
                serde_json::to_string(&response)
            };
            match result {
                Ok(payload) => println!("{}", payload),
                Err(ser_err) => eprintln!("ERROR: {}", ser_err),
            }
        }
    }
}
