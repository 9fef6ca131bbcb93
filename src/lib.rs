//! objgrep - search a live object graph by key, value or runtime kind.
//!
//! The engine walks an object graph breadth-first from a root environment
//! object, testing every readable property against a filter and reporting
//! the accessor path of each match.
//!
//! # Features
//!
//! - **By-name search**: exact key match, or a case-insensitive pattern
//! - **By-value search**: strict equality, or a pattern over the stringified value
//! - **By-kind search**: `*`, a kind label such as `Array`, or a constructor
//! - **Custom search**: any caller-supplied predicate
//! - **Hostile graphs**: cycles, throwing getters and hidden keys are tolerated
//! - **Budgets**: optional node, time and cancellation limits
//!
//! # Quick Start
//!
//! ```no_run
//! use objgrep::{load_snapshot, CollectingSink, Searcher};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let realm = load_snapshot(Path::new("graph.json"))?;
//! let searcher = Searcher::for_realm(&realm);
//! let mut sink = CollectingSink::default();
//! let report = searcher.find_all("by-name", "port", false, &mut sink)?;
//! println!("{} matches", report.matches.len());
//! # Ok(())
//! # }
//! ```
//!
//! # Modules
//!
//! - [`error`] - Error types
//! - [`host`] - The inspected object graph and its snapshot loader
//! - [`output`] - Diagnostic sinks, response types and value rendering
//! - [`search`] - Classifier, enumerator, filters, traversal and dispatch

pub mod error;
pub mod host;
pub mod output;
pub mod output_common;
pub mod search;

pub use error::ObjgrepError;

// Re-export the host model for external use
pub use host::{load_snapshot, parse_snapshot, HostError, ObjectRef, Realm, Value};

// Re-export search types for external use
pub use search::{
    Classifier, Filter, FilterRegistry, MatchRecord, QueryArg, SearchKind, SearchRequest,
    Searcher, TraversalReport, TraverseOptions,
};

// Re-export output types for external use
pub use output::{CollectingSink, ConsoleSink, DiagnosticSink, PerformanceMetrics};
