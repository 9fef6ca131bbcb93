//! Breadth-first traversal of the object graph.
//!
//! Each root is walked with its own FIFO queue. A property value is enqueued
//! as a child node unless it already sits on the current node's lineage, so
//! cycles terminate while diamonds are visited once per path.

use std::collections::VecDeque;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::classify::Classifier;
use super::enumerate::for_own_property;
use super::filters::{Filter, FilterContext, QueryArg};
use super::node::GraphNode;
use super::options::{ExpansionPolicy, StopReason, TraverseOptions};
use crate::host::{ObjectRef, Value};

/// A named entry point.
#[derive(Debug, Clone)]
pub struct RootDescriptor {
    pub object: ObjectRef,
    pub path: String,
}

impl RootDescriptor {
    pub fn new(object: ObjectRef, path: impl Into<String>) -> Self {
        Self {
            object,
            path: path.into(),
        }
    }
}

/// One reported hit.
#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub path: String,
    pub value: Value,
}

/// Outcome of one traversal call.
#[derive(Debug, Clone, Default)]
pub struct TraversalReport {
    /// Matches in production order
    pub matches: Vec<MatchRecord>,
    /// True when a budget or cancellation cut the walk short
    pub partial: bool,
    pub stop_reason: Option<StopReason>,
    /// Nodes whose properties were enumerated
    pub nodes_visited: usize,
    pub elapsed: Duration,
}

/// Walk every root and test each readable property with `filter`.
///
/// Roots are processed last to first. `on_match` sees each record as it is
/// produced, before it is stored in the report.
pub fn traverse<F>(
    classifier: &Classifier<'_>,
    filter: &Filter,
    arg: &QueryArg,
    roots: &[RootDescriptor],
    options: &TraverseOptions,
    mut on_match: F,
) -> TraversalReport
where
    F: FnMut(&MatchRecord),
{
    let started = Instant::now();
    let mut report = TraversalReport::default();

    info!(filter = filter.name(), roots = roots.len(), "traversal started");

    'roots: for root in roots.iter().rev() {
        let mut queue = VecDeque::new();
        queue.push_back(GraphNode::root(root.object.clone(), root.path.as_str()));

        while let Some(node) = queue.pop_front() {
            if let Some(reason) = options.check_budget(report.nodes_visited, started) {
                warn!(
                    reason = reason.describe(),
                    nodes_visited = report.nodes_visited,
                    pending = queue.len() + 1,
                    "traversal stopped early"
                );
                report.partial = true;
                report.stop_reason = Some(reason);
                break 'roots;
            }
            report.nodes_visited += 1;

            let ctx = FilterContext {
                node: &node,
                classifier: *classifier,
            };
            let mut interrupted = None;
            for_own_property(classifier, &node.object, |value, key, container| {
                if let Value::Object(child) = value {
                    if should_expand(classifier, value, options.expansion)
                        && !node.lineage.contains(child)
                    {
                        queue.push_back(node.child(child.clone(), key));
                    }
                }

                match filter.test(&ctx, arg, key, container) {
                    Ok(true) => {
                        let record = MatchRecord {
                            path: node.child_path(key),
                            value: value.clone(),
                        };
                        on_match(&record);
                        report.matches.push(record);
                    }
                    Ok(false) => {}
                    Err(err) => {
                        debug!(path = %node.path, key, error = %err, "predicate failed");
                    }
                }

                match options.check_interrupt(started) {
                    Some(reason) => {
                        interrupted = Some(reason);
                        ControlFlow::Break(())
                    }
                    None => ControlFlow::Continue(()),
                }
            });

            if let Some(reason) = interrupted {
                warn!(
                    reason = reason.describe(),
                    path = %node.path,
                    nodes_visited = report.nodes_visited,
                    "traversal interrupted inside a node"
                );
                report.partial = true;
                report.stop_reason = Some(reason);
                break 'roots;
            }
        }
    }

    report.elapsed = started.elapsed();
    info!(
        matches = report.matches.len(),
        nodes_visited = report.nodes_visited,
        elapsed_ms = report.elapsed.as_millis() as u64,
        partial = report.partial,
        "traversal finished"
    );
    report
}

fn should_expand(classifier: &Classifier<'_>, value: &Value, policy: ExpansionPolicy) -> bool {
    match policy {
        ExpansionPolicy::AllObjects => true,
        ExpansionPolicy::PlainAndInvokable => {
            classifier.is_invokable(value) || classifier.is_plain_data_object(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::{HostError, Realm};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn walk(realm: &Realm, root: &ObjectRef, filter: &Filter, arg: QueryArg) -> TraversalReport {
        walk_with(realm, root, filter, arg, &TraverseOptions::default())
    }

    fn walk_with(
        realm: &Realm,
        root: &ObjectRef,
        filter: &Filter,
        arg: QueryArg,
        options: &TraverseOptions,
    ) -> TraversalReport {
        let classifier = Classifier::new(realm.global());
        let roots = [RootDescriptor::new(root.clone(), "")];
        traverse(&classifier, filter, &arg, &roots, options, |_| {})
    }

    fn paths(report: &TraversalReport) -> Vec<&str> {
        report.matches.iter().map(|m| m.path.as_str()).collect()
    }

    #[test]
    fn test_self_reference_terminates() {
        let realm = Realm::new();
        let root = realm.object();
        root.define("me", &root);
        let inner = realm.object();
        inner.define("up", &root);
        root.define("inner", &inner);

        let report = walk(&realm, &root, &Filter::by_kind(), "*".into());
        assert_eq!(paths(&report), vec!["me", "inner", "inner.up"]);
        assert_eq!(report.nodes_visited, 2);
        assert!(!report.partial);
    }

    #[test]
    fn test_diamond_reported_per_path() {
        let realm = Realm::new();
        let shared = realm.object();
        shared.define("needle", 1);
        let root = realm.object();
        root.define("a", &shared);
        root.define("b", &shared);

        let report = walk(&realm, &root, &Filter::by_name(), "needle".into());
        assert_eq!(paths(&report), vec!["a.needle", "b.needle"]);
    }

    #[test]
    fn test_breadth_first_order() {
        let realm = Realm::new();
        let p1 = realm.object();
        p1.define("hit", 1);
        let p2 = realm.object();
        p2.define("hit", 2);
        let root = realm.object();
        root.define("p1", &p1);
        root.define("hit", 0);
        root.define("p2", &p2);

        let report = walk(&realm, &root, &Filter::by_name(), "hit".into());
        assert_eq!(paths(&report), vec!["hit", "p1.hit", "p2.hit"]);
    }

    #[test]
    fn test_throwing_getter_is_isolated() {
        let realm = Realm::new();
        let root = realm.object();
        root.define_getter("poison", true, |_| Err(HostError::new("boom")));
        root.define("fine", 1);

        let report = walk(&realm, &root, &Filter::by_kind(), "*".into());
        assert_eq!(paths(&report), vec!["fine"]);
    }

    #[test]
    fn test_failing_predicate_is_no_match() {
        let realm = Realm::new();
        let root = realm.object();
        root.define("bad", 1);
        root.define("good", 2);
        let arg = QueryArg::predicate(|_, _, key, _| {
            if key == "bad" {
                Err(HostError::new("predicate blew up"))
            } else {
                Ok(true)
            }
        });

        let report = walk(&realm, &root, &Filter::custom(), arg);
        assert_eq!(paths(&report), vec!["good"]);
    }

    #[test]
    fn test_arrays_expanded_only_on_request() {
        let realm = Realm::new();
        let inner = realm.object();
        inner.define("deep", true);
        let list = realm.array(vec![Value::from(&inner)]);
        let root = realm.object();
        root.define("list", &list);

        let default = walk(&realm, &root, &Filter::by_name(), "deep".into());
        assert!(default.matches.is_empty());

        let options = TraverseOptions {
            expansion: ExpansionPolicy::AllObjects,
            ..Default::default()
        };
        let all = walk_with(&realm, &root, &Filter::by_name(), "deep".into(), &options);
        assert_eq!(paths(&all), vec!["list.0.deep"]);
    }

    #[test]
    fn test_node_budget_marks_partial() {
        let realm = Realm::new();
        let root = realm.object();
        let mut current = root.clone();
        for _ in 0..10 {
            let next = realm.object();
            next.define("x", 1);
            current.define("next", &next);
            current = next;
        }

        let options = TraverseOptions {
            max_nodes: Some(3),
            ..Default::default()
        };
        let report = walk_with(&realm, &root, &Filter::by_name(), "x".into(), &options);
        assert!(report.partial);
        assert_eq!(report.stop_reason, Some(StopReason::NodeBudget));
        assert_eq!(report.nodes_visited, 3);
        assert_eq!(paths(&report), vec!["next.x", "next.next.x"]);
    }

    #[test]
    fn test_cancel_flag_stops_before_first_node() {
        let realm = Realm::new();
        let root = realm.object();
        root.define("a", 1);
        let options = TraverseOptions {
            cancel: Some(Arc::new(AtomicBool::new(true))),
            ..Default::default()
        };
        let report = walk_with(&realm, &root, &Filter::by_kind(), "*".into(), &options);
        assert!(report.matches.is_empty());
        assert_eq!(report.stop_reason, Some(StopReason::Cancelled));
    }

    #[test]
    fn test_cancel_inside_wide_node() {
        let realm = Realm::new();
        let flag = Arc::new(AtomicBool::new(false));
        let root = realm.object();
        let raised = flag.clone();
        root.define_getter("trip", true, move |_| {
            raised.store(true, std::sync::atomic::Ordering::Relaxed);
            Ok(Value::from(1))
        });
        for i in 0..100 {
            root.define(format!("k{}", i), i);
        }

        let options = TraverseOptions {
            cancel: Some(flag),
            ..Default::default()
        };
        let report = walk_with(&realm, &root, &Filter::by_kind(), "*".into(), &options);
        assert_eq!(paths(&report), vec!["trip"]);
        assert_eq!(report.nodes_visited, 1);
        assert!(report.partial);
        assert_eq!(report.stop_reason, Some(StopReason::Cancelled));
    }

    #[test]
    fn test_time_budget_interrupts_slow_node() {
        let realm = Realm::new();
        let root = realm.object();
        for i in 0..5 {
            root.define_getter(format!("slow{}", i), true, |_| {
                std::thread::sleep(Duration::from_millis(20));
                Ok(Value::from(1))
            });
        }

        let options = TraverseOptions {
            time_budget: Some(Duration::from_millis(30)),
            ..Default::default()
        };
        let report = walk_with(&realm, &root, &Filter::by_kind(), "*".into(), &options);
        assert_eq!(paths(&report), vec!["slow0"]);
        assert!(report.partial);
        assert_eq!(report.stop_reason, Some(StopReason::TimeBudget));
    }

    #[test]
    fn test_roots_processed_last_first() {
        let realm = Realm::new();
        let first = realm.object();
        first.define("k", 1);
        let second = realm.object();
        second.define("k", 2);
        let classifier = Classifier::new(realm.global());
        let roots = [
            RootDescriptor::new(first, "first"),
            RootDescriptor::new(second, "second"),
        ];
        let mut seen = Vec::new();
        let report = traverse(
            &classifier,
            &Filter::by_name(),
            &"k".into(),
            &roots,
            &TraverseOptions::default(),
            |record| seen.push(record.path.clone()),
        );
        assert_eq!(seen, vec!["second.k", "first.k"]);
        assert_eq!(report.matches.len(), 2);
    }

    #[test]
    fn test_empty_root_yields_nothing() {
        let realm = Realm::new();
        let report = walk(&realm, &realm.dictionary(), &Filter::by_kind(), "*".into());
        assert!(report.matches.is_empty());
        assert_eq!(report.nodes_visited, 1);
    }
}
