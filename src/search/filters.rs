//! Filter predicates and the registry that names them.
//!
//! A predicate has the shape `(context, query, key, container) -> bool` and
//! reads `container[key]` itself. Predicates may fail; the traversal treats a
//! failure as "no match" for that one property.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use regex::Regex;

use super::classify::Classifier;
use super::node::GraphNode;
use crate::error::ObjgrepError;
use crate::host::{HostError, ObjectRef, Value};

/// Filter names registered by default.
pub const KIND: &str = "kind";
pub const NAME: &str = "name";
pub const VALUE: &str = "value";
pub const CUSTOM: &str = "custom";
/// The stringifying value filter chosen for non-strict text queries.
pub const LOOSE_VALUE: &str = "loose-value";

/// Caller-supplied test, invoked as `predicate(node, value, key, container)`.
pub type CustomPredicate =
    Rc<dyn Fn(&GraphNode, &Value, &str, &ObjectRef) -> Result<bool, HostError>>;

/// Resolved filter predicate.
pub type Predicate =
    Rc<dyn Fn(&FilterContext<'_>, &QueryArg, &str, &ObjectRef) -> Result<bool, HostError>>;

/// The argument forwarded to a filter predicate.
#[derive(Clone)]
pub enum QueryArg {
    Value(Value),
    Pattern(Regex),
    Predicate(CustomPredicate),
}

impl QueryArg {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&GraphNode, &Value, &str, &ObjectRef) -> Result<bool, HostError> + 'static,
    {
        QueryArg::Predicate(Rc::new(f))
    }

    /// Kind label checked against a filter's accepted kinds.
    pub fn kind_label(&self, classifier: &Classifier<'_>) -> String {
        match self {
            QueryArg::Value(value) => classifier.classify(value),
            QueryArg::Pattern(_) => "RegExp".to_string(),
            QueryArg::Predicate(_) => "Function".to_string(),
        }
    }

    /// Text used when reporting the argument back to the user.
    pub fn describe(&self) -> String {
        match self {
            QueryArg::Value(value) => value.display_lossy(),
            QueryArg::Pattern(re) => format!("/{}/i", re.as_str()),
            QueryArg::Predicate(_) => "function".to_string(),
        }
    }
}

impl fmt::Debug for QueryArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryArg::Value(value) => write!(f, "Value({:?})", value),
            QueryArg::Pattern(re) => write!(f, "Pattern({})", re.as_str()),
            QueryArg::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<Value> for QueryArg {
    fn from(value: Value) -> Self {
        QueryArg::Value(value)
    }
}

impl From<&str> for QueryArg {
    fn from(s: &str) -> Self {
        QueryArg::Value(Value::string(s))
    }
}

impl From<Regex> for QueryArg {
    fn from(re: Regex) -> Self {
        QueryArg::Pattern(re)
    }
}

/// What a predicate can see besides its arguments.
pub struct FilterContext<'a> {
    pub node: &'a GraphNode,
    pub classifier: Classifier<'a>,
}

/// Kinds of query argument a filter accepts, compared case-insensitively
/// against [`QueryArg::kind_label`].
#[derive(Debug, Clone, Copy)]
pub enum AcceptedKinds {
    Any,
    OneOf(&'static [&'static str]),
}

impl AcceptedKinds {
    pub fn admits(&self, label: &str) -> bool {
        match self {
            AcceptedKinds::Any => true,
            AcceptedKinds::OneOf(kinds) => kinds.iter().any(|k| k.eq_ignore_ascii_case(label)),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            AcceptedKinds::Any => "value".to_string(),
            AcceptedKinds::OneOf(kinds) => kinds.join(" or "),
        }
    }
}

/// A named predicate plus the type guard applied to its query argument.
#[derive(Clone)]
pub struct Filter {
    name: String,
    accepts: AcceptedKinds,
    predicate: Predicate,
}

impl Filter {
    pub fn new<F>(name: impl Into<String>, accepts: AcceptedKinds, predicate: F) -> Self
    where
        F: Fn(&FilterContext<'_>, &QueryArg, &str, &ObjectRef) -> Result<bool, HostError> + 'static,
    {
        Self {
            name: name.into(),
            accepts,
            predicate: Rc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepts(&self) -> AcceptedKinds {
        self.accepts
    }

    /// Matches by `*`, by constructor (prototype chain), or by kind label or
    /// type tag.
    pub fn by_kind() -> Self {
        Filter::new(
            KIND,
            AcceptedKinds::OneOf(&["function", "constructor", "string"]),
            |ctx, arg, key, container| {
                let value = container.get(key)?;
                match arg {
                    QueryArg::Value(Value::String(kind)) if &**kind == "*" => Ok(true),
                    QueryArg::Value(Value::String(kind)) => Ok(value
                        .type_tag()
                        .eq_ignore_ascii_case(kind)
                        || ctx.classifier.classify(&value).eq_ignore_ascii_case(kind)),
                    QueryArg::Value(Value::Object(ctor)) if ctor.class() == Some("Function") => {
                        ctx.classifier.instance_of(&value, ctor)
                    }
                    _ => Ok(false),
                }
            },
        )
    }

    /// Exact key for a string query, pattern test for a pattern query.
    pub fn by_name() -> Self {
        Filter::new(
            NAME,
            AcceptedKinds::OneOf(&["string", "RegExp"]),
            |_, arg, key, _| match arg {
                QueryArg::Value(Value::String(name)) => Ok(&**name == key),
                QueryArg::Pattern(re) => Ok(re.is_match(key)),
                _ => Ok(false),
            },
        )
    }

    /// Strict equality with the property value.
    pub fn by_value() -> Self {
        Filter::new(VALUE, AcceptedKinds::Any, |_, arg, key, container| match arg {
            QueryArg::Value(expected) => Ok(container.get(key)?.strict_equals(expected)),
            _ => Ok(false),
        })
    }

    /// Pattern test against the stringified property value.
    pub fn by_value_loose() -> Self {
        Filter::new(
            LOOSE_VALUE,
            AcceptedKinds::OneOf(&["RegExp"]),
            |_, arg, key, container| match arg {
                QueryArg::Pattern(re) => {
                    let text = container.get(key)?.to_display_string()?;
                    Ok(re.is_match(&text))
                }
                _ => Ok(false),
            },
        )
    }

    /// Delegates to a caller-supplied predicate.
    pub fn custom() -> Self {
        Filter::new(
            CUSTOM,
            AcceptedKinds::OneOf(&["function"]),
            |ctx, arg, key, container| match arg {
                QueryArg::Predicate(predicate) => {
                    let value = container.get(key)?;
                    predicate(ctx.node, &value, key, container)
                }
                _ => Ok(false),
            },
        )
    }

    /// Reject a query argument this filter does not accept.
    pub fn check_argument(
        &self,
        arg: &QueryArg,
        classifier: &Classifier<'_>,
    ) -> Result<(), ObjgrepError> {
        if self.accepts.admits(&arg.kind_label(classifier)) {
            Ok(())
        } else {
            Err(ObjgrepError::QueryKindMismatch {
                argument: arg.describe(),
                expected: self.accepts.describe(),
            })
        }
    }

    pub fn test(
        &self,
        ctx: &FilterContext<'_>,
        arg: &QueryArg,
        key: &str,
        container: &ObjectRef,
    ) -> Result<bool, HostError> {
        (self.predicate)(ctx, arg, key, container)
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Filter")
            .field("name", &self.name)
            .field("accepts", &self.accepts)
            .finish()
    }
}

/// Filters by name.
#[derive(Clone, Debug)]
pub struct FilterRegistry {
    filters: HashMap<String, Filter>,
}

impl FilterRegistry {
    /// A registry holding the built-in kind, name, value and custom filters.
    pub fn new() -> Self {
        let mut registry = Self {
            filters: HashMap::new(),
        };
        for filter in [
            Filter::by_kind(),
            Filter::by_name(),
            Filter::by_value(),
            Filter::custom(),
        ] {
            registry.register(filter);
        }
        registry
    }

    /// Add or replace a filter; returns the one it replaced.
    pub fn register(&mut self, filter: Filter) -> Option<Filter> {
        self.filters.insert(filter.name.clone(), filter)
    }

    pub fn get(&self, name: &str) -> Result<&Filter, ObjgrepError> {
        self.filters
            .get(name)
            .ok_or_else(|| ObjgrepError::UnknownFilter {
                name: name.to_string(),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.filters.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
