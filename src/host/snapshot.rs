//! JSON snapshots of an object graph.
//!
//! A snapshot is `{ "global": <node>, "objects": { "<id>": <node>, ... } }`.
//! Nodes are JSON scalars, arrays (become `Array` objects) or objects (become
//! plain objects). Object nodes may carry reserved keys:
//!
//! | key | meaning |
//! |---|---|
//! | `$ref` | reference to an entry of `objects` (`"global"` is the root) |
//! | `$undefined` | the `undefined` value |
//! | `$class` | internal class; `null` hides it |
//! | `$callable` | object is a function |
//! | `$name` | function name |
//! | `$proto` | prototype node, or `null` for none |
//! | `$props` | ordered enumerable properties |
//! | `$hidden` | non-enumerable properties |
//! | `$getters` | accessors: `{"throws": msg}` or `{"returns": node}` |
//! | `$keysHidden` | full key enumeration fails |
//!
//! Every other key is an enumerable property. Shared entries under `objects`
//! are created before any is populated, so they may reference each other in
//! cycles.

use std::collections::HashMap;
use std::path::Path;

use serde_json::{Map, Value as Json};

use super::realm::Realm;
use super::value::{HostError, ObjectRef, Value};
use crate::error::ObjgrepError;

const SHELL_KEYS: &[&str] = &["$class", "$callable", "$name"];

/// Load a realm from a snapshot file.
pub fn load_snapshot(path: &Path) -> Result<Realm, ObjgrepError> {
    if !path.is_file() {
        return Err(ObjgrepError::SnapshotNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path)?;
    parse_snapshot(&content)
}

/// Build a realm from snapshot text.
pub fn parse_snapshot(content: &str) -> Result<Realm, ObjgrepError> {
    let doc: Json = serde_json::from_str(content)?;
    let root = doc
        .as_object()
        .ok_or_else(|| snapshot_error("document must be a JSON object"))?;

    let realm = Realm::new();
    {
        let mut loader = Loader {
            realm: &realm,
            shared: HashMap::new(),
        };

        if let Some(objects) = root.get("objects") {
            let objects = objects
                .as_object()
                .ok_or_else(|| snapshot_error("\"objects\" must be a JSON object"))?;
            for (id, node) in objects {
                if id == "global" {
                    return Err(snapshot_error("\"global\" is a reserved object id"));
                }
                let shell = loader.shell(node)?;
                loader.shared.insert(id.clone(), shell);
            }
            for (id, node) in objects {
                let target = loader.resolve(id)?;
                loader.fill(&target, node)?;
            }
        }

        if let Some(node) = root.get("global") {
            if !node.is_object() {
                return Err(snapshot_error("\"global\" must be a JSON object"));
            }
            let global = realm.global().clone();
            loader.fill(&global, node)?;
        }
    }
    Ok(realm)
}

fn snapshot_error(reason: impl Into<String>) -> ObjgrepError {
    ObjgrepError::Snapshot {
        reason: reason.into(),
    }
}

struct Loader<'r> {
    realm: &'r Realm,
    shared: HashMap<String, ObjectRef>,
}

impl Loader<'_> {
    fn resolve(&self, id: &str) -> Result<ObjectRef, ObjgrepError> {
        if id == "global" {
            return Ok(self.realm.global().clone());
        }
        self.shared
            .get(id)
            .cloned()
            .ok_or_else(|| snapshot_error(format!("unknown $ref \"{}\"", id)))
    }

    fn value(&self, node: &Json) -> Result<Value, ObjgrepError> {
        match node {
            Json::Null => Ok(Value::Null),
            Json::Bool(b) => Ok(Value::Bool(*b)),
            Json::Number(n) => n
                .as_f64()
                .map(Value::Number)
                .ok_or_else(|| snapshot_error(format!("number out of range: {}", n))),
            Json::String(s) => Ok(Value::string(s)),
            Json::Array(_) => {
                let obj = self.shell(node)?;
                self.fill(&obj, node)?;
                Ok(Value::Object(obj))
            }
            Json::Object(map) => {
                if let Some(target) = map.get("$ref") {
                    let id = target
                        .as_str()
                        .ok_or_else(|| snapshot_error("$ref must be a string"))?;
                    return Ok(Value::Object(self.resolve(id)?));
                }
                if map.get("$undefined").and_then(Json::as_bool) == Some(true) {
                    return Ok(Value::Undefined);
                }
                let obj = self.shell(node)?;
                self.fill(&obj, node)?;
                Ok(Value::Object(obj))
            }
        }
    }

    /// Create the object for a node without populating its properties.
    fn shell(&self, node: &Json) -> Result<ObjectRef, ObjgrepError> {
        let map = match node {
            Json::Array(_) => {
                let arr = ObjectRef::new(Some("Array"), false);
                arr.set_proto(Some(self.realm.array_prototype().clone()));
                return Ok(arr);
            }
            Json::Object(map) => map,
            _ => return Err(snapshot_error("shared objects must be JSON objects or arrays")),
        };
        if map.contains_key("$ref") || map.contains_key("$undefined") {
            return Err(snapshot_error("shared objects cannot be references"));
        }

        let declared_class = match map.get("$class") {
            None => None,
            Some(Json::Null) => Some(None),
            Some(Json::String(class)) => Some(Some(class.as_str())),
            Some(_) => return Err(snapshot_error("$class must be a string or null")),
        };
        let callable = map
            .get("$callable")
            .and_then(Json::as_bool)
            .unwrap_or(declared_class == Some(Some("Function")));
        let class = match declared_class {
            Some(class) => class,
            None if callable => Some("Function"),
            None => Some("Object"),
        };

        let obj = ObjectRef::new(class, callable);
        if callable {
            obj.set_proto(Some(self.realm.function_prototype().clone()));
            let name = map.get("$name").and_then(Json::as_str).unwrap_or("");
            obj.define_hidden("name", name);
            obj.define_hidden("length", 0);
            let prototype = self.realm.object();
            prototype.define_hidden("constructor", &obj);
            obj.define_hidden("prototype", prototype);
        } else if class == Some("Array") {
            obj.set_proto(Some(self.realm.array_prototype().clone()));
        } else {
            obj.set_proto(Some(self.realm.object_prototype().clone()));
        }
        Ok(obj)
    }

    /// Populate an object created by [`Loader::shell`] (or the global).
    fn fill(&self, obj: &ObjectRef, node: &Json) -> Result<(), ObjgrepError> {
        let map = match node {
            Json::Array(items) => {
                let values = items
                    .iter()
                    .map(|item| self.value(item))
                    .collect::<Result<Vec<_>, _>>()?;
                self.realm.fill_array(obj, values);
                return Ok(());
            }
            Json::Object(map) => map,
            _ => return Err(snapshot_error("expected a JSON object or array")),
        };

        for (key, child) in map {
            match key.as_str() {
                k if SHELL_KEYS.contains(&k) => {}
                "$proto" => match child {
                    Json::Null => obj.set_proto(None),
                    other => match self.value(other)? {
                        Value::Object(proto) => obj.set_proto(Some(proto)),
                        _ => return Err(snapshot_error("$proto must be an object or null")),
                    },
                },
                "$props" => {
                    for (k, v) in as_map(child, "$props")? {
                        obj.define(k.clone(), self.value(v)?);
                    }
                }
                "$hidden" => {
                    for (k, v) in as_map(child, "$hidden")? {
                        obj.define_hidden(k.clone(), self.value(v)?);
                    }
                }
                "$getters" => {
                    for (k, v) in as_map(child, "$getters")? {
                        self.define_getter(obj, k, v)?;
                    }
                }
                "$keysHidden" => obj.set_keys_hidden(child.as_bool().unwrap_or(false)),
                _ => obj.define(key.clone(), self.value(child)?),
            }
        }
        Ok(())
    }

    fn define_getter(&self, obj: &ObjectRef, key: &str, getter: &Json) -> Result<(), ObjgrepError> {
        let getter = as_map(getter, "getter")?;
        let enumerable = getter.get("enumerable").and_then(Json::as_bool).unwrap_or(true);
        if let Some(message) = getter.get("throws") {
            let message = message
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| message.to_string());
            obj.define_getter(key, enumerable, move |_| Err(HostError::new(message.clone())));
            return Ok(());
        }
        if let Some(node) = getter.get("returns") {
            let value = self.value(node)?;
            obj.define_getter(key, enumerable, move |_| Ok(value.clone()));
            return Ok(());
        }
        Err(snapshot_error(format!(
            "getter \"{}\" needs \"throws\" or \"returns\"",
            key
        )))
    }
}

fn as_map<'a>(node: &'a Json, what: &str) -> Result<&'a Map<String, Json>, ObjgrepError> {
    node.as_object()
        .ok_or_else(|| snapshot_error(format!("{} must be a JSON object", what)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_nodes() {
        let realm = parse_snapshot(r#"{"global": {"app": {"count": 2, "tags": ["a", "b"]}}}"#)
            .unwrap();
        let tags = realm.resolve_path("app.tags").unwrap();
        let tags = tags.as_object().unwrap();
        assert_eq!(tags.class(), Some("Array"));
        assert_eq!(tags.get("1").unwrap().as_str(), Some("b"));
        assert_eq!(tags.get("length").unwrap().as_number(), Some(2.0));
    }

    #[test]
    fn test_cycles_through_shared_objects() {
        let realm = parse_snapshot(
            r#"{
                "objects": {"a": {"next": {"$ref": "b"}}, "b": {"back": {"$ref": "a"}}},
                "global": {"start": {"$ref": "a"}}
            }"#,
        )
        .unwrap();
        let start = realm.resolve_path("start").unwrap();
        let again = realm.resolve_path("start.next.back").unwrap();
        assert!(start.strict_equals(&again));
    }

    #[test]
    fn test_global_ref() {
        let realm = parse_snapshot(r#"{"global": {"self": {"$ref": "global"}}}"#).unwrap();
        let found = realm.resolve_path("self").unwrap();
        assert!(found.strict_equals(&Value::Object(realm.global().clone())));
    }

    #[test]
    fn test_tagged_nodes() {
        let realm = parse_snapshot(
            r#"{"global": {
                "Widget": {"$callable": true, "$name": "Widget",
                           "$hidden": {"prototype": {"render": 1}}},
                "secret": {"$hidden": {"token": "abc"}, "$getters": {"boom": {"throws": "denied"}}},
                "missing": {"$undefined": true},
                "host": {"$class": null, "$keysHidden": true, "x": 1}
            }}"#,
        )
        .unwrap();

        let widget = realm.resolve_path("Widget").unwrap();
        let widget = widget.as_object().unwrap();
        assert!(widget.is_callable());
        assert_eq!(widget.function_name().as_deref(), Some("Widget"));

        let secret = realm.resolve_path("secret").unwrap();
        let secret = secret.as_object().unwrap();
        assert!(secret.get("boom").is_err());
        assert_eq!(secret.for_in_keys().unwrap(), vec!["boom"]);

        assert!(matches!(realm.resolve_path("missing").unwrap(), Value::Undefined));

        let host = realm.resolve_path("host").unwrap();
        let host = host.as_object().unwrap();
        assert_eq!(host.class(), None);
        assert!(host.own_keys().is_err());
    }

    #[test]
    fn test_unknown_ref_is_rejected() {
        let err = parse_snapshot(r#"{"global": {"a": {"$ref": "nope"}}}"#).err().unwrap();
        assert_eq!(err.error_code(), "OBJ-E002");
    }

    #[test]
    fn test_scalar_document_is_rejected() {
        assert!(parse_snapshot("42").is_err());
        assert!(parse_snapshot(r#"{"objects": {"x": 1}}"#).is_err());
    }
}
