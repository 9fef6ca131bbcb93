use chrono::Utc;
use clap::ValueEnum;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::time::Instant;

use crate::host::{format_number, Value};
use crate::search::SearchKind;

const SCHEMA_VERSION: &str = "1.0.0";

/// Entries shown when rendering an object's members.
const MAX_RENDERED_ENTRIES: usize = 8;

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    Pretty,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            OutputFormat::Human => "human",
            OutputFormat::Json => "json",
            OutputFormat::Pretty => "pretty",
        };
        write!(f, "{}", value)
    }
}

/// Receiver of the line-oriented search diagnostics: match lines, value
/// dumps, error lines and a start/end timer pair.
pub trait DiagnosticSink {
    fn log(&mut self, line: &str);
    fn dir(&mut self, value: &Value);
    fn error(&mut self, line: &str);
    fn time(&mut self, label: &str);
    fn time_end(&mut self, label: &str);
}

/// Writes diagnostics to stdout and errors to stderr.
#[derive(Default)]
pub struct ConsoleSink {
    timers: HashMap<String, Instant>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for ConsoleSink {
    fn log(&mut self, line: &str) {
        println!("{}", line);
    }

    fn dir(&mut self, value: &Value) {
        println!("{}", render_value(value));
    }

    fn error(&mut self, line: &str) {
        eprintln!("{}", line);
    }

    fn time(&mut self, label: &str) {
        self.timers.insert(label.to_string(), Instant::now());
    }

    fn time_end(&mut self, label: &str) {
        match self.timers.remove(label) {
            Some(started) => {
                let ms = started.elapsed().as_secs_f64() * 1000.0;
                println!("{}: {:.3}ms", label, ms);
            }
            None => tracing::warn!(label, "timer ended without being started"),
        }
    }
}

/// Records diagnostics as `kind: text` lines.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub lines: Vec<String>,
}

impl DiagnosticSink for CollectingSink {
    fn log(&mut self, line: &str) {
        self.lines.push(format!("log: {}", line));
    }

    fn dir(&mut self, value: &Value) {
        self.lines.push(format!("dir: {}", render_value(value)));
    }

    fn error(&mut self, line: &str) {
        self.lines.push(format!("error: {}", line));
    }

    fn time(&mut self, label: &str) {
        self.lines.push(format!("time: {}", label));
    }

    fn time_end(&mut self, label: &str) {
        self.lines.push(format!("timeEnd: {}", label));
    }
}

/// One-line dump of a value: `(type tag) body`.
///
/// Only data slots are read, so rendering never runs a getter.
pub fn render_value(value: &Value) -> String {
    format!("({}) {}", value.type_tag(), render_body(value, true))
}

fn render_body(value: &Value, expand: bool) -> String {
    let obj = match value {
        Value::String(s) => return quote(s),
        Value::Object(obj) => obj,
        other => return other.display_lossy(),
    };
    match obj.class() {
        Some("Function") => value.display_lossy(),
        Some("Array") => {
            let len = obj.array_len();
            if !expand {
                return format!("Array({})", len);
            }
            let mut parts: Vec<String> = obj
                .array_items(MAX_RENDERED_ENTRIES)
                .iter()
                .map(|item| render_body(item, false))
                .collect();
            if len > MAX_RENDERED_ENTRIES {
                parts.push("...".to_string());
            }
            format!("Array({}) [{}]", len, parts.join(", "))
        }
        class => {
            let class = class.unwrap_or("Object");
            if !expand {
                return format!("[object {}]", class);
            }
            let entries: Vec<_> = obj
                .data_entries()
                .into_iter()
                .filter(|(_, _, enumerable)| *enumerable)
                .collect();
            let mut parts: Vec<String> = entries
                .iter()
                .take(MAX_RENDERED_ENTRIES)
                .map(|(key, slot, _)| match slot {
                    Some(member) => format!("{}: {}", key, render_body(member, false)),
                    None => format!("{}: [Getter]", key),
                })
                .collect();
            if entries.len() > MAX_RENDERED_ENTRIES {
                parts.push("...".to_string());
            }
            format!("{} {{{}}}", class, parts.join(", "))
        }
    }
}

fn quote(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s))
}

/// JSON form of a value. Objects are summarized, never walked.
pub fn value_summary(value: &Value) -> serde_json::Value {
    match value {
        Value::Undefined => serde_json::json!({ "undefined": true }),
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Number(n) => serde_json::Number::from_f64(*n)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(format_number(*n))),
        Value::String(s) => serde_json::Value::String(s.to_string()),
        Value::Object(obj) => {
            let mut summary = serde_json::Map::new();
            summary.insert(
                "class".to_string(),
                obj.class()
                    .map(|c| serde_json::Value::String(c.to_string()))
                    .unwrap_or(serde_json::Value::Null),
            );
            summary.insert("callable".to_string(), obj.is_callable().into());
            if let Some(name) = obj.function_name().filter(|_| obj.is_callable()) {
                summary.insert("name".to_string(), name.into());
            }
            if obj.class() == Some("Array") {
                summary.insert("length".to_string(), obj.array_len().into());
            }
            serde_json::Value::Object(summary)
        }
    }
}

#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub schema_version: &'static str,
    pub execution_id: String,
    pub tool: &'static str,
    pub timestamp: String,
    pub partial: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub performance: Option<PerformanceMetrics>,
    pub data: T,
}

/// Phase timings reported with `--show-metrics`.
#[derive(Serialize, Clone, Debug, Default)]
pub struct PerformanceMetrics {
    pub snapshot_load_ms: u64,
    pub traversal_ms: u64,
    pub output_formatting_ms: u64,
    pub total_ms: u64,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
    pub message: String,
    pub remediation: Option<String>,
}

#[derive(Serialize)]
pub struct MatchEntry {
    pub match_id: String,
    pub path: String,
    /// Type tag of the value
    pub value_type: String,
    /// Classifier label of the value
    pub kind: String,
    pub value: serde_json::Value,
    pub rendered: String,
}

#[derive(Serialize)]
pub struct SearchResponse {
    pub results: Vec<MatchEntry>,
    pub search_kind: SearchKind,
    pub query: String,
    pub strict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
    pub total_count: u64,
    pub nodes_visited: u64,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_reason: Option<String>,
}

#[derive(Serialize)]
pub struct KindResponse {
    pub path: String,
    pub kind: String,
    pub type_tag: String,
    pub internal_class: Option<String>,
    pub invokable: bool,
    pub plain_data_object: bool,
    pub rendered: String,
}

pub fn json_response<T>(data: T) -> JsonResponse<T> {
    json_response_with_partial(data, false)
}

pub fn json_response_with_partial<T>(data: T, partial: bool) -> JsonResponse<T> {
    json_response_with_partial_and_performance(data, partial, None)
}

pub fn json_response_with_partial_and_performance<T>(
    data: T,
    partial: bool,
    performance: Option<PerformanceMetrics>,
) -> JsonResponse<T> {
    JsonResponse {
        schema_version: SCHEMA_VERSION,
        execution_id: execution_id(),
        tool: "objgrep",
        timestamp: Utc::now().to_rfc3339(),
        partial,
        performance,
        data,
    }
}

pub fn execution_id() -> String {
    let timestamp = Utc::now().timestamp();
    let pid = std::process::id();
    format!("{:x}-{:x}", timestamp, pid)
}

/// Stable identifier of a match within one graph: path plus rendered value.
pub fn match_id(path: &str, rendered: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(path.as_bytes());
    hasher.update(b":");
    hasher.update(rendered.as_bytes());
    let digest = hasher.finalize();
    hex::encode(&digest[..8])
}
