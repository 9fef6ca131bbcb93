//! Search options and configuration types.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use regex::Regex;

use super::dispatch::SearchKind;
use super::filters::QueryArg;
use crate::host::{ObjectRef, Value};

/// Which property values become new nodes to visit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpansionPolicy {
    /// Plain data objects and functions (default)
    #[default]
    PlainAndInvokable,
    /// Every object, including arrays, dates and host objects
    AllObjects,
}

/// Why a traversal stopped before its queue was empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    NodeBudget,
    TimeBudget,
    Cancelled,
}

impl StopReason {
    pub fn describe(&self) -> &'static str {
        match self {
            StopReason::NodeBudget => "node budget exhausted",
            StopReason::TimeBudget => "time budget exhausted",
            StopReason::Cancelled => "cancelled",
        }
    }
}

/// Limits and policies for one traversal. The default is unbounded.
#[derive(Debug, Clone, Default)]
pub struct TraverseOptions {
    /// Maximum number of nodes whose properties are enumerated
    pub max_nodes: Option<usize>,
    /// Wall-clock budget for the whole call
    pub time_budget: Option<Duration>,
    /// Expansion policy for property values
    pub expansion: ExpansionPolicy,
    /// Polled between nodes; setting it stops the traversal
    pub cancel: Option<Arc<AtomicBool>>,
}

impl TraverseOptions {
    /// Returns the reason to stop before visiting another node, if any.
    pub fn check_budget(&self, nodes_visited: usize, started: Instant) -> Option<StopReason> {
        if self.max_nodes.is_some_and(|max| nodes_visited >= max) {
            return self.check_interrupt(started).or(Some(StopReason::NodeBudget));
        }
        self.check_interrupt(started)
    }

    /// Cancellation and time budget only. Polled between properties of a
    /// single node as well as between nodes.
    pub fn check_interrupt(&self, started: Instant) -> Option<StopReason> {
        if self
            .cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
        {
            return Some(StopReason::Cancelled);
        }
        if self
            .time_budget
            .is_some_and(|budget| started.elapsed() >= budget)
        {
            return Some(StopReason::TimeBudget);
        }
        None
    }
}

/// Replaces the default roots with a single object.
#[derive(Debug, Clone)]
pub struct RootOverride {
    pub object: ObjectRef,
    /// Path label; resolved from the default roots when absent
    pub path: Option<String>,
}

/// A structured search request.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub kind: SearchKind,
    pub query: QueryArg,
    pub strict: bool,
    pub root: Option<RootOverride>,
    pub options: TraverseOptions,
}

impl SearchRequest {
    pub fn new(kind: SearchKind, query: impl Into<QueryArg>) -> Self {
        Self {
            kind,
            query: query.into(),
            strict: false,
            root: None,
            options: TraverseOptions::default(),
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn root(mut self, root: RootOverride) -> Self {
        self.root = Some(root);
        self
    }

    pub fn options(mut self, options: TraverseOptions) -> Self {
        self.options = options;
        self
    }
}

/// Raw request-form fields. At most one query is used per submission.
#[derive(Debug, Clone, Default)]
pub struct SearchForm {
    pub by_name: Option<String>,
    pub by_value: Option<String>,
    pub by_kind: Option<String>,
    pub strict: bool,
}

impl SearchForm {
    /// The first non-empty field, in by-name, by-value, by-kind order.
    pub fn select(&self) -> Option<(SearchKind, QueryArg)> {
        let non_empty = |field: &Option<String>| field.clone().filter(|text| !text.is_empty());
        if let Some(name) = non_empty(&self.by_name) {
            return Some((SearchKind::ByName, QueryArg::Value(Value::from(name))));
        }
        if let Some(text) = non_empty(&self.by_value) {
            return Some((SearchKind::ByValue, QueryArg::Value(value_from_form_text(&text))));
        }
        non_empty(&self.by_kind)
            .map(|kind| (SearchKind::ByKind, QueryArg::Value(Value::from(kind))))
    }
}

/// Interpret by-value text: numeric-looking input is a number, anything else
/// a string.
pub fn value_from_form_text(text: &str) -> Value {
    if looks_numeric(text) {
        if let Ok(n) = text.replace(',', "").parse::<f64>() {
            return Value::Number(n);
        }
    }
    Value::string(text)
}

/// Optional sign or digit, then digits and commas, an optional point and
/// trailing digits.
fn looks_numeric(text: &str) -> bool {
    static NUMERIC: OnceLock<Option<Regex>> = OnceLock::new();
    NUMERIC
        .get_or_init(|| Regex::new(r"^(\d|-)?(\d|,)*\.?\d*$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_text_numbers() {
        assert_eq!(value_from_form_text("0").as_number(), Some(0.0));
        assert_eq!(value_from_form_text("-12.5").as_number(), Some(-12.5));
        assert_eq!(value_from_form_text("1,024").as_number(), Some(1024.0));
        assert_eq!(value_from_form_text("abc").as_str(), Some("abc"));
        assert_eq!(value_from_form_text("1e5").as_str(), Some("1e5"));
        assert_eq!(value_from_form_text("-").as_str(), Some("-"));
    }

    #[test]
    fn test_form_selects_first_non_empty() {
        let form = SearchForm {
            by_name: Some(String::new()),
            by_value: Some("42".to_string()),
            by_kind: Some("Array".to_string()),
            strict: true,
        };
        let (kind, query) = form.select().unwrap();
        assert_eq!(kind, SearchKind::ByValue);
        assert!(matches!(query, QueryArg::Value(Value::Number(n)) if n == 42.0));

        assert!(SearchForm::default().select().is_none());
    }

    #[test]
    fn test_budget_checks() {
        let started = Instant::now();
        let unbounded = TraverseOptions::default();
        assert_eq!(unbounded.check_budget(1_000_000, started), None);

        let bounded = TraverseOptions {
            max_nodes: Some(3),
            ..Default::default()
        };
        assert_eq!(bounded.check_budget(2, started), None);
        assert_eq!(bounded.check_budget(3, started), Some(StopReason::NodeBudget));

        let flag = Arc::new(AtomicBool::new(true));
        let cancelled = TraverseOptions {
            cancel: Some(flag),
            ..Default::default()
        };
        assert_eq!(cancelled.check_budget(0, started), Some(StopReason::Cancelled));

        let timed = TraverseOptions {
            time_budget: Some(Duration::ZERO),
            ..Default::default()
        };
        assert_eq!(timed.check_budget(0, started), Some(StopReason::TimeBudget));
    }
}
