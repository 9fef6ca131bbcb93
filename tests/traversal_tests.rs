//! Traversal behavior over hand-built graphs.
//!
//! Each test builds a small realm, hangs a subject object off the global
//! object and searches from an explicit root so results are not polluted by
//! the intrinsics.

use objgrep::host::{HostError, ObjectRef, Realm, Value};
use objgrep::search::{
    ExpansionPolicy, Filter, QueryArg, RootOverride, SearchKind, SearchRequest, Searcher,
    StopReason, TraversalReport, TraverseOptions,
};

fn search_from(realm: &Realm, root: &ObjectRef, request: SearchRequest) -> TraversalReport {
    let searcher = Searcher::for_realm(realm);
    let request = request.root(RootOverride {
        object: root.clone(),
        path: Some("root".to_string()),
    });
    searcher.search(&request).unwrap()
}

fn paths(report: &TraversalReport) -> Vec<String> {
    report.matches.iter().map(|m| m.path.clone()).collect()
}

#[test]
fn test_self_reference_does_not_loop() {
    let realm = Realm::new();
    let root = realm.object();
    root.define("self", &root);
    let child = realm.object();
    child.define("parent", &root);
    child.define("own", &child);
    root.define("child", &child);

    let report = search_from(&realm, &root, SearchRequest::new(SearchKind::ByKind, "*"));

    assert_eq!(
        paths(&report),
        vec!["root.self", "root.child", "root.child.parent", "root.child.own"]
    );
    assert_eq!(report.nodes_visited, 2);
    assert!(!report.partial);
}

#[test]
fn test_diamond_paths_reported_independently() {
    let realm = Realm::new();
    let shared = realm.object();
    shared.define("target", "x");
    let root = realm.object();
    root.define("a", &shared);
    root.define("b", &shared);

    let report = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByName, "target").strict(true),
    );

    assert_eq!(paths(&report), vec!["root.a.target", "root.b.target"]);
    assert!(report.matches[0]
        .value
        .strict_equals(&report.matches[1].value));
}

#[test]
fn test_sibling_cycles_do_not_suppress_each_other() {
    let realm = Realm::new();
    let shared = realm.object();
    shared.define("leaf", 1);
    let left = realm.object();
    left.define("inner", &shared);
    let right = realm.object();
    right.define("inner", &shared);
    let root = realm.object();
    root.define("left", &left);
    root.define("right", &right);

    let report = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByName, "leaf").strict(true),
    );
    assert_eq!(
        paths(&report),
        vec!["root.left.inner.leaf", "root.right.inner.leaf"]
    );
}

#[test]
fn test_breadth_first_order() {
    let realm = Realm::new();
    let p1 = realm.object();
    let g1 = realm.object();
    g1.define("needle", 3);
    p1.define("deep", &g1);
    p1.define("needle", 1);
    let p2 = realm.object();
    p2.define("needle", 2);
    let root = realm.object();
    root.define("p1", &p1);
    root.define("p2", &p2);

    let report = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByName, "needle").strict(true),
    );
    assert_eq!(
        paths(&report),
        vec!["root.p1.needle", "root.p2.needle", "root.p1.deep.needle"]
    );
}

#[test]
fn test_strict_value_distinguishes_number_and_text() {
    let realm = Realm::new();
    let root = realm.object();
    root.define("zero", 0);
    root.define("text", "0");
    root.define("other", 1);

    let report = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByValue, Value::from(0)).strict(true),
    );
    assert_eq!(paths(&report), vec!["root.zero"]);
}

#[test]
fn test_wildcard_matches_every_readable_property() {
    let realm = Realm::new();
    let root = realm.object();
    root.define("n", 1);
    root.define("s", "two");
    root.define("nothing", Value::Null);
    root.define("missing", Value::Undefined);
    root.define_hidden("hidden", true);

    let report = search_from(&realm, &root, SearchRequest::new(SearchKind::ByKind, "*"));
    assert_eq!(
        paths(&report),
        vec![
            "root.n",
            "root.s",
            "root.nothing",
            "root.missing",
            "root.hidden"
        ]
    );
}

#[test]
fn test_throwing_getter_is_skipped() {
    let realm = Realm::new();
    let root = realm.object();
    root.define_getter("poisoned", true, |_| Err(HostError::new("access denied")));
    root.define("healthy", "ok");

    let report = search_from(&realm, &root, SearchRequest::new(SearchKind::ByKind, "*"));
    assert_eq!(paths(&report), vec!["root.healthy"]);
}

#[test]
fn test_getter_sees_receiver() {
    let realm = Realm::new();
    let root = realm.object();
    root.define("base", 20);
    root.define_getter("doubled", true, |this| {
        let base = this.get("base")?.as_number().unwrap_or(0.0);
        Ok(Value::from(base * 2.0))
    });

    let report = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByValue, Value::from(40)).strict(true),
    );
    assert_eq!(paths(&report), vec!["root.doubled"]);
}

#[test]
fn test_by_kind_label_and_constructor() {
    let realm = Realm::new();
    let widget_ctor = realm.constructor("Widget", vec![("draw".to_string(), Value::from(1))]);
    let root = realm.object();
    root.define("list", realm.array(vec![Value::from(1)]));
    root.define("when", realm.object_of_class("Date"));
    root.define("button", realm.instance_of(&widget_ctor));
    root.define("Widget", &widget_ctor);

    let arrays = search_from(&realm, &root, SearchRequest::new(SearchKind::ByKind, "array"));
    assert_eq!(paths(&arrays), vec!["root.list"]);

    let ctors = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByKind, "Constructor"),
    );
    assert_eq!(
        paths(&ctors),
        vec!["root.Widget", "root.Widget.prototype.constructor"]
    );

    let widgets = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByKind, Value::from(&widget_ctor)),
    );
    assert_eq!(paths(&widgets), vec!["root.button"]);
}

#[test]
fn test_functions_are_expanded() {
    let realm = Realm::new();
    let helper = realm.function("helper");
    helper.define("cache", "warm");
    let root = realm.object();
    root.define("helper", &helper);

    let report = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByName, "cache").strict(true),
    );
    assert_eq!(paths(&report), vec!["root.helper.cache"]);
}

#[test]
fn test_descend_all_reaches_array_members() {
    let realm = Realm::new();
    let item = realm.object();
    item.define("id", 7);
    let root = realm.object();
    root.define("items", realm.array(vec![Value::from(&item)]));

    let request = SearchRequest::new(SearchKind::ByName, "id").strict(true);
    let default = search_from(&realm, &root, request.clone());
    assert!(default.matches.is_empty());

    let all = search_from(
        &realm,
        &root,
        request.options(TraverseOptions {
            expansion: ExpansionPolicy::AllObjects,
            ..Default::default()
        }),
    );
    assert_eq!(paths(&all), vec!["root.items.0.id"]);
}

#[test]
fn test_node_budget_returns_partial_results() {
    let realm = Realm::new();
    let root = realm.object();
    let mut current = root.clone();
    for depth in 0..50 {
        let next = realm.object();
        next.define("depth", depth);
        current.define("next", &next);
        current = next;
    }

    let request = SearchRequest::new(SearchKind::ByName, "depth")
        .strict(true)
        .options(TraverseOptions {
            max_nodes: Some(5),
            ..Default::default()
        });
    let report = search_from(&realm, &root, request);

    assert!(report.partial);
    assert_eq!(report.stop_reason, Some(StopReason::NodeBudget));
    assert_eq!(report.nodes_visited, 5);
    assert_eq!(report.matches.len(), 4);
}

#[test]
fn test_wide_and_deep_graph_completes() {
    let realm = Realm::new();
    let root = realm.object();
    let mut current = root.clone();
    for _ in 0..5_000 {
        let next = realm.object();
        next.define("back", &root);
        current.define("down", &next);
        current = next;
    }
    current.define("bottom", true);

    let report = search_from(
        &realm,
        &root,
        SearchRequest::new(SearchKind::ByName, "bottom").strict(true),
    );
    assert_eq!(report.matches.len(), 1);
    assert_eq!(report.nodes_visited, 5_001);
}

#[test]
fn test_custom_filter_from_registry() {
    let realm = Realm::new();
    let root = realm.object();
    root.define("short", "ab");
    root.define("long", "abcdef");

    let mut searcher = Searcher::for_realm(&realm);
    searcher.registry_mut().register(Filter::new(
        "long-text",
        objgrep::search::AcceptedKinds::OneOf(&["number"]),
        |_, arg, key, container| {
            let min = match arg {
                QueryArg::Value(Value::Number(n)) => *n as usize,
                _ => return Ok(false),
            };
            Ok(container
                .get(key)?
                .as_str()
                .is_some_and(|text| text.len() > min))
        },
    ));

    let filter = searcher.registry().get("long-text").unwrap().clone();
    let root_override = RootOverride {
        object: root,
        path: None,
    };
    let report = searcher
        .traverse_with(
            &filter,
            &QueryArg::Value(Value::from(3)),
            Some(&root_override),
            &TraverseOptions::default(),
        )
        .unwrap();
    assert_eq!(paths(&report), vec!["<object>.long"]);
}
