//! Own-property enumeration that survives hostile objects.
//!
//! Keys come from the full own-key listing when the object allows it,
//! otherwise from its enumerable keys plus, for `arguments`-style objects,
//! numeric indices up to `length`. A key whose read fails is skipped.

use std::collections::HashSet;
use std::ops::ControlFlow;

use tracing::debug;

use super::classify::Classifier;
use crate::host::{ObjectRef, Value};

/// Cap on indices visited for an `arguments`-style object.
const MAX_ARGUMENTS_LENGTH: usize = 65_536;

/// Call `visit(value, key, object)` for every readable own property of
/// `object`. Returning `ControlFlow::Break` from `visit` stops enumeration of
/// this object.
pub fn for_own_property<F>(classifier: &Classifier<'_>, object: &ObjectRef, mut visit: F)
where
    F: FnMut(&Value, &str, &ObjectRef) -> ControlFlow<()>,
{
    let keys = match object.own_keys() {
        Ok(keys) => keys,
        Err(err) => {
            debug!(object = ?object, error = %err, "full key enumeration unavailable");
            Vec::new()
        }
    };

    if !keys.is_empty() {
        for key in &keys {
            let Some(value) = read(object, key) else {
                continue;
            };
            if visit(&value, key, object).is_break() {
                return;
            }
        }
        return;
    }

    let keys = match object.for_in_keys() {
        Ok(keys) => keys,
        Err(err) => {
            debug!(object = ?object, error = %err, "enumerable key listing failed");
            return;
        }
    };

    let mut seen = HashSet::new();
    for key in keys.iter().filter(|key| object.has_own(key)) {
        seen.insert(key.as_str());
        let Some(value) = read(object, key) else {
            continue;
        };
        if visit(&value, key, object).is_break() {
            return;
        }
    }

    if classifier.is_arguments(&Value::Object(object.clone())) {
        let length = match object.get("length") {
            Ok(Value::Number(n)) if n > 0.0 => (n as usize).min(MAX_ARGUMENTS_LENGTH),
            _ => 0,
        };
        for index in 0..length {
            let key = index.to_string();
            if seen.contains(key.as_str()) {
                continue;
            }
            let Some(value) = read(object, &key) else {
                continue;
            };
            if visit(&value, &key, object).is_break() {
                return;
            }
        }
    }
}

fn read(object: &ObjectRef, key: &str) -> Option<Value> {
    match object.get(key) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(key, error = %err, "skipping unreadable property");
            None
        }
    }
}
