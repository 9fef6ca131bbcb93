//! Query dispatch: from a search request to a resolved filter and traversal.

use std::fmt;
use std::str::FromStr;

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::debug;

use super::classify::Classifier;
use super::filters::{self, Filter, FilterRegistry, QueryArg};
use super::options::{RootOverride, SearchRequest, TraverseOptions};
use super::traverse::{traverse, RootDescriptor, TraversalReport};
use crate::error::ObjgrepError;
use crate::host::{ObjectRef, Realm, Value, GLOBAL_PATH};
use crate::output::DiagnosticSink;
use crate::output_common::{format_partial_footer, format_total_header};

/// Size limit for compiled query patterns.
pub(crate) const MAX_REGEX_SIZE: usize = 10_000;

/// Path label for an override root that is not one of the default roots.
pub const ANONYMOUS_ROOT_PATH: &str = "<object>";

/// Timer label wrapped around each crawl.
pub const TIMER_LABEL: &str = "Completed in";

/// The four search types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SearchKind {
    ByKind,
    ByName,
    ByValue,
    Custom,
}

impl SearchKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchKind::ByKind => "by-kind",
            SearchKind::ByName => "by-name",
            SearchKind::ByValue => "by-value",
            SearchKind::Custom => "custom",
        }
    }

    /// Registry name of the filter this search type uses.
    pub fn filter_name(&self) -> &'static str {
        match self {
            SearchKind::ByKind => filters::KIND,
            SearchKind::ByName => filters::NAME,
            SearchKind::ByValue => filters::VALUE,
            SearchKind::Custom => filters::CUSTOM,
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchKind {
    type Err = ObjgrepError;

    /// Accepts `by-kind`, `byKind`, `by_kind` and `kind` spellings.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "bykind" | "kind" => Ok(SearchKind::ByKind),
            "byname" | "name" => Ok(SearchKind::ByName),
            "byvalue" | "value" => Ok(SearchKind::ByValue),
            "custom" => Ok(SearchKind::Custom),
            _ => Err(ObjgrepError::UnknownSearchKind {
                kind: s.to_string(),
            }),
        }
    }
}

/// Compile a case-insensitive query pattern.
pub fn build_pattern(text: &str) -> Result<Regex, ObjgrepError> {
    RegexBuilder::new(text)
        .case_insensitive(true)
        .size_limit(MAX_REGEX_SIZE)
        .build()
        .map_err(|e| ObjgrepError::RegexRejected {
            reason: format!("Regex too complex or invalid: {}", e),
        })
}

/// A filter ready to run, with the argument it will receive.
#[derive(Debug, Clone)]
pub struct ResolvedQuery {
    pub filter: Filter,
    pub arg: QueryArg,
}

/// Map a search type, query and strictness onto a filter and argument.
///
/// Non-strict by-name queries become patterns. Non-strict by-value text
/// queries become patterns tested against the stringified property value;
/// other primitive by-value queries stay strict. By-kind and custom queries
/// pass through unchanged.
pub fn resolve_query(
    kind: SearchKind,
    query: QueryArg,
    strict: bool,
    registry: &FilterRegistry,
    classifier: &Classifier<'_>,
) -> Result<ResolvedQuery, ObjgrepError> {
    let (filter, arg) = match (kind, query) {
        (SearchKind::ByName, QueryArg::Value(Value::String(text))) if !strict => (
            registry.get(filters::NAME)?.clone(),
            QueryArg::Pattern(build_pattern(&text)?),
        ),
        (SearchKind::ByValue, query) if !strict => match query {
            QueryArg::Value(Value::String(text)) => (
                loose_value_filter(registry),
                QueryArg::Pattern(build_pattern(&text)?),
            ),
            QueryArg::Pattern(re) => (loose_value_filter(registry), QueryArg::Pattern(re)),
            QueryArg::Value(value @ Value::Object(_)) => {
                return Err(ObjgrepError::UnsupportedLooseQuery {
                    kind: classifier.classify(&value),
                });
            }
            other => (registry.get(filters::VALUE)?.clone(), other),
        },
        (kind, query) => (registry.get(kind.filter_name())?.clone(), query),
    };
    debug!(kind = %kind, filter = filter.name(), arg = ?arg, "query resolved");
    Ok(ResolvedQuery { filter, arg })
}

/// A registered loose-value filter wins over the built-in one.
fn loose_value_filter(registry: &FilterRegistry) -> Filter {
    registry
        .get(filters::LOOSE_VALUE)
        .cloned()
        .unwrap_or_else(|_| Filter::by_value_loose())
}

/// Runs searches against one root environment.
pub struct Searcher {
    global: ObjectRef,
    roots: Vec<RootDescriptor>,
    registry: FilterRegistry,
}

impl Searcher {
    /// A searcher with a single default root at `global`, labelled `window`.
    pub fn new(global: ObjectRef) -> Self {
        let roots = vec![RootDescriptor::new(global.clone(), GLOBAL_PATH)];
        Self {
            global,
            roots,
            registry: FilterRegistry::new(),
        }
    }

    pub fn for_realm(realm: &Realm) -> Self {
        Self::new(realm.global().clone())
    }

    /// Replace the default roots. They are crawled last to first.
    pub fn with_roots(mut self, roots: Vec<RootDescriptor>) -> Self {
        self.roots = roots;
        self
    }

    pub fn roots(&self) -> &[RootDescriptor] {
        &self.roots
    }

    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut FilterRegistry {
        &mut self.registry
    }

    pub fn classifier(&self) -> Classifier<'_> {
        Classifier::new(&self.global)
    }

    /// Roots for one call: the override alone, or the defaults.
    pub fn resolve_roots(&self, root: Option<&RootOverride>) -> Vec<RootDescriptor> {
        let Some(root) = root else {
            return self.roots.clone();
        };
        let path = root.path.clone().unwrap_or_else(|| {
            self.roots
                .iter()
                .find(|candidate| candidate.object.ptr_eq(&root.object))
                .map(|candidate| candidate.path.clone())
                .unwrap_or_else(|| ANONYMOUS_ROOT_PATH.to_string())
        });
        vec![RootDescriptor::new(root.object.clone(), path)]
    }

    /// Type-check `arg` against `filter`, then traverse without diagnostics.
    pub fn traverse_with(
        &self,
        filter: &Filter,
        arg: &QueryArg,
        root: Option<&RootOverride>,
        options: &TraverseOptions,
    ) -> Result<TraversalReport, ObjgrepError> {
        let classifier = self.classifier();
        filter.check_argument(arg, &classifier)?;
        let roots = self.resolve_roots(root);
        Ok(traverse(&classifier, filter, arg, &roots, options, |_| {}))
    }

    /// Type-check and traverse, writing each match, the timing pair and the
    /// match count to `sink`.
    pub fn crawl_with(
        &self,
        filter: &Filter,
        arg: &QueryArg,
        root: Option<&RootOverride>,
        options: &TraverseOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<TraversalReport, ObjgrepError> {
        let classifier = self.classifier();
        filter.check_argument(arg, &classifier)?;
        let roots = self.resolve_roots(root);

        sink.time(TIMER_LABEL);
        let report = traverse(&classifier, filter, arg, &roots, options, |record| {
            sink.log(&format!("{} -> ", record.path));
            sink.dir(&record.value);
            sink.log(" ");
        });
        sink.time_end(TIMER_LABEL);
        sink.log(&format_total_header(report.matches.len() as u64));
        if let Some(reason) = report.stop_reason {
            sink.log(&format_partial_footer(reason));
        }
        Ok(report)
    }

    /// [`Searcher::crawl_with`] for a filter looked up by name.
    pub fn crawl(
        &self,
        filter_name: &str,
        arg: &QueryArg,
        root: Option<&RootOverride>,
        options: &TraverseOptions,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<TraversalReport, ObjgrepError> {
        let filter = self.registry.get(filter_name)?;
        self.crawl_with(filter, arg, root, options, sink)
    }

    /// Resolve a request without traversing.
    pub fn resolve(&self, request: &SearchRequest) -> Result<ResolvedQuery, ObjgrepError> {
        resolve_query(
            request.kind,
            request.query.clone(),
            request.strict,
            &self.registry,
            &self.classifier(),
        )
    }

    /// Resolve and traverse a request, returning the report only.
    pub fn search(&self, request: &SearchRequest) -> Result<TraversalReport, ObjgrepError> {
        let resolved = self.resolve(request)?;
        self.traverse_with(
            &resolved.filter,
            &resolved.arg,
            request.root.as_ref(),
            &request.options,
        )
    }

    /// Resolve and crawl a request with diagnostics. Errors are returned, not
    /// written to `sink`.
    pub fn run(
        &self,
        request: &SearchRequest,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<TraversalReport, ObjgrepError> {
        let resolved = self.resolve(request)?;
        self.crawl_with(
            &resolved.filter,
            &resolved.arg,
            request.root.as_ref(),
            &request.options,
            sink,
        )
    }

    /// Entry point for `(search type, query, strict)` calls. A malformed
    /// search type or a rejected query produces one error line on `sink` and
    /// no traversal.
    pub fn find_all(
        &self,
        kind: &str,
        query: impl Into<QueryArg>,
        strict: bool,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<TraversalReport, ObjgrepError> {
        let outcome = kind.parse::<SearchKind>().and_then(|kind| {
            let request = SearchRequest::new(kind, query).strict(strict);
            self.run(&request, sink)
        });
        if let Err(err) = &outcome {
            sink.error(&err.to_string());
        }
        outcome
    }
}
