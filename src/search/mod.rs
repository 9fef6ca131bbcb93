//! The search engine.
//!
//! Layers, leaves first:
//!
//! - [`classify`] - kind labels and structural predicates
//! - [`enumerate`] - own-property enumeration that skips unreadable keys
//! - [`filters`] - named predicates and their argument type guards
//! - [`traverse`] - breadth-first walk with per-branch cycle detection
//! - [`dispatch`] - request resolution and the line-oriented entry point
//!
//! # Example
//!
//! ```
//! use objgrep::host::Realm;
//! use objgrep::search::{SearchKind, SearchRequest, Searcher};
//!
//! let realm = Realm::new();
//! let config = realm.object();
//! config.define("port", 8080);
//! realm.global().define("config", &config);
//!
//! let searcher = Searcher::for_realm(&realm);
//! let request = SearchRequest::new(SearchKind::ByName, "port").strict(true);
//! let report = searcher.search(&request).unwrap();
//! assert_eq!(report.matches[0].path, "window.config.port");
//! ```

pub mod classify;
pub mod dispatch;
pub mod enumerate;
pub mod filters;
pub mod node;
pub mod options;
pub mod traverse;

pub use classify::{internal_class, Classifier};
pub use dispatch::{
    build_pattern, resolve_query, ResolvedQuery, SearchKind, Searcher, ANONYMOUS_ROOT_PATH,
    TIMER_LABEL,
};
pub use enumerate::for_own_property;
pub use filters::{
    AcceptedKinds, CustomPredicate, Filter, FilterContext, FilterRegistry, QueryArg,
};
pub use node::{GraphNode, Lineage};
pub use options::{
    value_from_form_text, ExpansionPolicy, RootOverride, SearchForm, SearchRequest, StopReason,
    TraverseOptions,
};
pub use traverse::{traverse, MatchRecord, RootDescriptor, TraversalReport};
