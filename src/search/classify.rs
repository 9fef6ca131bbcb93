//! Runtime kind classification.
//!
//! [`Classifier::classify`] tries an ordered list of rules; each rule either
//! answers or yields to the next. A rule that needs to probe the graph (for
//! example reading a function's `prototype`) yields when the probe fails.

use crate::host::{HostError, ObjectRef, Value, MAX_PROTOTYPE_HOPS};

/// One classification rule.
type Rule = fn(&Classifier<'_>, &Value) -> Option<String>;

const RULES: &[Rule] = &[absent_rule, global_rule, constructor_rule, internal_class_rule];

/// Classifies values relative to a designated root environment object.
#[derive(Clone, Copy)]
pub struct Classifier<'a> {
    global: &'a ObjectRef,
}

impl<'a> Classifier<'a> {
    pub fn new(global: &'a ObjectRef) -> Self {
        Self { global }
    }

    pub fn global(&self) -> &'a ObjectRef {
        self.global
    }

    /// The kind label of a value: `Null`, `Undefined`, `Global`,
    /// `Constructor`, the internal class, or the capitalized type tag.
    pub fn classify(&self, value: &Value) -> String {
        RULES
            .iter()
            .find_map(|rule| rule(self, value))
            .unwrap_or_else(|| capitalize(value.type_tag()))
    }

    /// True when the value's internal class is `Function`.
    pub fn is_invokable(&self, value: &Value) -> bool {
        internal_class(value) == Some("Function")
    }

    /// True for objects of internal class `Object` whose `constructor` can be
    /// read and is invokable. A failing read answers false.
    pub fn is_plain_data_object(&self, value: &Value) -> bool {
        let obj = match value {
            Value::Object(obj) if obj.class() == Some("Object") => obj,
            _ => return false,
        };
        match obj.get("constructor") {
            Ok(ctor) => self.is_invokable(&ctor),
            Err(_) => false,
        }
    }

    pub fn has_own_member_named(&self, value: &Value, name: &str) -> bool {
        value.as_object().is_some_and(|obj| obj.has_own(name))
    }

    /// True when `value[property]` holds a non-primitive: a function, a
    /// non-null object, or a host value of an unusual type. Absent values
    /// and failing reads answer false.
    pub fn looks_like_host_special_collection(&self, value: &Value, property: &str) -> bool {
        let member = match value {
            Value::Object(obj) => match obj.get(property) {
                Ok(member) => member,
                Err(_) => return false,
            },
            // Primitives expose no own members in this model.
            _ => return false,
        };
        match member.type_tag() {
            "boolean" | "number" | "string" | "undefined" => false,
            "object" => !matches!(member, Value::Null),
            _ => true,
        }
    }

    /// True for `arguments`-style objects.
    pub fn is_arguments(&self, value: &Value) -> bool {
        match value {
            Value::Object(obj) => match obj.class() {
                Some(class) => class == "Arguments",
                None => obj.has_own("callee"),
            },
            _ => false,
        }
    }

    /// Prototype-chain membership: is `ctor.prototype` on `value`'s chain.
    pub fn instance_of(&self, value: &Value, ctor: &ObjectRef) -> Result<bool, HostError> {
        let obj = match value {
            Value::Object(obj) => obj,
            _ => return Ok(false),
        };
        let target = match ctor.get("prototype")? {
            Value::Object(target) => target,
            _ => return Err(HostError::new("constructor has no object prototype")),
        };
        let mut current = obj.proto();
        let mut hops = 0;
        while let Some(proto) = current {
            if proto.ptr_eq(&target) {
                return Ok(true);
            }
            hops += 1;
            if hops > MAX_PROTOTYPE_HOPS {
                return Err(HostError::new("prototype chain too deep"));
            }
            current = proto.proto();
        }
        Ok(false)
    }
}

fn absent_rule(_: &Classifier<'_>, value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("Null".to_string()),
        Value::Undefined => Some("Undefined".to_string()),
        _ => None,
    }
}

fn global_rule(classifier: &Classifier<'_>, value: &Value) -> Option<String> {
    match value {
        Value::Object(obj) if obj.ptr_eq(classifier.global) => Some("Global".to_string()),
        _ => None,
    }
}

/// A function counts as a constructor when its prototype has enumerable
/// members or is not a plain `Object`.
fn constructor_rule(classifier: &Classifier<'_>, value: &Value) -> Option<String> {
    if !classifier.is_invokable(value)
        || !classifier.looks_like_host_special_collection(value, "prototype")
    {
        return None;
    }
    let prototype = value.as_object()?.get("prototype").ok()?;
    if internal_class(&prototype) != Some("Object") {
        return Some("Constructor".to_string());
    }
    let keys = prototype.as_object()?.for_in_keys().ok()?;
    if keys.is_empty() {
        None
    } else {
        Some("Constructor".to_string())
    }
}

fn internal_class_rule(_: &Classifier<'_>, value: &Value) -> Option<String> {
    internal_class(value).map(str::to_string)
}

/// The internal class of a value, if the host reveals one.
pub fn internal_class(value: &Value) -> Option<&str> {
    match value {
        Value::Undefined => Some("Undefined"),
        Value::Null => Some("Null"),
        Value::Bool(_) => Some("Boolean"),
        Value::Number(_) => Some("Number"),
        Value::String(_) => Some("String"),
        Value::Object(obj) => obj.class(),
    }
}

fn capitalize(tag: &str) -> String {
    let mut chars = tag.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
