//! Values and objects of the inspected graph.
//!
//! Objects are shared, mutable and may form cycles. Identity is pointer
//! identity of the [`ObjectRef`] handle. Property reads go through
//! [`ObjectRef::get`], which walks the prototype chain and may run an
//! accessor; an accessor failure surfaces as a [`HostError`].

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::rc::Rc;

use thiserror::Error;

/// Upper bound on prototype hops during a single lookup.
pub const MAX_PROTOTYPE_HOPS: usize = 1024;

/// Array elements visited while stringifying one value, nested arrays
/// included.
pub const MAX_STRINGIFIED_ITEMS: usize = 65_536;

/// A failure raised by the host graph while reading a property or running a
/// predicate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HostError {
    pub message: String,
}

impl HostError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Accessor body. Receives the object the read was performed on.
pub type Getter = Rc<dyn Fn(&ObjectRef) -> Result<Value, HostError>>;

/// A property slot.
#[derive(Clone)]
pub enum Slot {
    Data { value: Value, enumerable: bool },
    Accessor { getter: Getter, enumerable: bool },
}

impl Slot {
    pub fn enumerable(&self) -> bool {
        match self {
            Slot::Data { enumerable, .. } | Slot::Accessor { enumerable, .. } => *enumerable,
        }
    }
}

/// A value of the inspected graph.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
}

impl Value {
    pub fn string(s: impl AsRef<str>) -> Self {
        Value::String(Rc::from(s.as_ref()))
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The primitive type tag (`typeof`).
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Object(obj) if obj.is_callable() => "function",
            Value::Object(_) => "object",
        }
    }

    /// Strict equality: objects by identity, NaN never equal to itself.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    /// String conversion used for loose value matching.
    ///
    /// Never runs accessors: arrays are joined from their data slots only.
    /// Fails once more than [`MAX_STRINGIFIED_ITEMS`] array elements would
    /// have to be visited.
    pub fn to_display_string(&self) -> Result<String, HostError> {
        let mut stack = Vec::new();
        let mut budget = MAX_STRINGIFIED_ITEMS;
        self.write_display_string(&mut stack, &mut budget)
    }

    fn write_display_string(
        &self,
        stack: &mut Vec<ObjectRef>,
        budget: &mut usize,
    ) -> Result<String, HostError> {
        let text = match self {
            Value::Undefined => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::String(s) => s.to_string(),
            Value::Object(obj) => match obj.class() {
                Some("Array") => {
                    if stack.iter().any(|seen| seen.ptr_eq(obj)) {
                        return Ok(String::new());
                    }
                    let len = obj.array_len();
                    if len > *budget {
                        return Err(HostError::new(format!(
                            "array of length {} is too long to stringify",
                            len
                        )));
                    }
                    *budget -= len;
                    stack.push(obj.clone());
                    let mut parts = Vec::with_capacity(len);
                    for item in obj.array_items(len) {
                        match item {
                            Value::Undefined | Value::Null => parts.push(String::new()),
                            other => match other.write_display_string(stack, budget) {
                                Ok(part) => parts.push(part),
                                Err(err) => {
                                    stack.pop();
                                    return Err(err);
                                }
                            },
                        }
                    }
                    stack.pop();
                    parts.join(",")
                }
                Some("Function") => format!(
                    "function {}() {{ [native code] }}",
                    obj.function_name().unwrap_or_default()
                ),
                Some(class) => format!("[object {}]", class),
                None => "[object Object]".to_string(),
            },
        };
        Ok(text)
    }

    /// Like [`Value::to_display_string`], with a class placeholder for values
    /// too large to stringify.
    pub fn display_lossy(&self) -> String {
        self.to_display_string().unwrap_or_else(|_| match self {
            Value::Object(obj) => format!("[object {}]", obj.class().unwrap_or("Object")),
            _ => String::new(),
        })
    }
}

/// Number formatting that prints integral values without a fraction.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        let label = if n > 0.0 { "Infinity" } else { "-Infinity" };
        label.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e21 {
        format!("{}", n as i128)
    } else {
        format!("{}", n)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{:?}", s),
            Value::Object(obj) => write!(f, "{:?}", obj),
            other => f.write_str(&other.display_lossy()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<ObjectRef> for Value {
    fn from(obj: ObjectRef) -> Self {
        Value::Object(obj)
    }
}

impl From<&ObjectRef> for Value {
    fn from(obj: &ObjectRef) -> Self {
        Value::Object(obj.clone())
    }
}

/// Own properties in definition order, indexed by key.
#[derive(Default)]
struct PropertyTable {
    entries: Vec<(String, Slot)>,
    index: HashMap<String, usize>,
}

impl PropertyTable {
    fn insert(&mut self, key: String, slot: Slot) {
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = slot,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, slot));
            }
        }
    }

    fn get(&self, key: &str) -> Option<&Slot> {
        self.index.get(key).map(|&pos| &self.entries[pos].1)
    }

    fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    fn iter(&self) -> impl Iterator<Item = &(String, Slot)> {
        self.entries.iter()
    }
}

/// Backing storage of an object.
pub struct Object {
    class: Option<String>,
    callable: bool,
    keys_hidden: Cell<bool>,
    proto: RefCell<Option<ObjectRef>>,
    props: RefCell<PropertyTable>,
}

/// Shared handle to an object of the inspected graph.
#[derive(Clone)]
pub struct ObjectRef(Rc<Object>);

impl ObjectRef {
    /// Create an object with the given internal class. `None` models a host
    /// object that does not reveal its class.
    pub fn new(class: Option<&str>, callable: bool) -> Self {
        ObjectRef(Rc::new(Object {
            class: class.map(str::to_string),
            callable,
            keys_hidden: Cell::new(false),
            proto: RefCell::new(None),
            props: RefCell::new(PropertyTable::default()),
        }))
    }

    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable address, for diagnostics only.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn class(&self) -> Option<&str> {
        self.0.class.as_deref()
    }

    pub fn is_callable(&self) -> bool {
        self.0.callable
    }

    pub fn proto(&self) -> Option<ObjectRef> {
        self.0.proto.borrow().clone()
    }

    pub fn set_proto(&self, proto: Option<ObjectRef>) {
        *self.0.proto.borrow_mut() = proto;
    }

    /// Make the full key enumeration fail, as some host objects do.
    pub fn set_keys_hidden(&self, hidden: bool) {
        self.0.keys_hidden.set(hidden);
    }

    /// Define or replace an own property. A replaced key keeps its position.
    pub fn define_slot(&self, key: impl Into<String>, slot: Slot) {
        self.0.props.borrow_mut().insert(key.into(), slot);
    }

    pub fn define(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.define_slot(
            key,
            Slot::Data {
                value: value.into(),
                enumerable: true,
            },
        );
    }

    pub fn define_hidden(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.define_slot(
            key,
            Slot::Data {
                value: value.into(),
                enumerable: false,
            },
        );
    }

    pub fn define_getter<F>(&self, key: impl Into<String>, enumerable: bool, getter: F)
    where
        F: Fn(&ObjectRef) -> Result<Value, HostError> + 'static,
    {
        self.define_slot(
            key,
            Slot::Accessor {
                getter: Rc::new(getter),
                enumerable,
            },
        );
    }

    pub fn has_own(&self, key: &str) -> bool {
        self.0.props.borrow().contains(key)
    }

    pub fn own_slot(&self, key: &str) -> Option<Slot> {
        self.0.props.borrow().get(key).cloned()
    }

    /// All own keys, enumerable or not, in definition order.
    pub fn own_keys(&self) -> Result<Vec<String>, HostError> {
        if self.0.keys_hidden.get() {
            return Err(HostError::new("own key enumeration is not available"));
        }
        Ok(self.0.props.borrow().iter().map(|(k, _)| k.clone()).collect())
    }

    /// Enumerable keys along the prototype chain, own keys first, shadowed
    /// keys reported once.
    pub fn for_in_keys(&self) -> Result<Vec<String>, HostError> {
        let mut keys: Vec<String> = Vec::new();
        let mut shadowed: HashSet<String> = HashSet::new();
        let mut current = Some(self.clone());
        let mut hops = 0;
        while let Some(obj) = current {
            hops += 1;
            if hops > MAX_PROTOTYPE_HOPS {
                return Err(HostError::new("prototype chain too deep"));
            }
            for (key, slot) in obj.0.props.borrow().iter() {
                if !shadowed.insert(key.clone()) {
                    continue;
                }
                if slot.enumerable() {
                    keys.push(key.clone());
                }
            }
            current = obj.proto();
        }
        Ok(keys)
    }

    /// Read a property, following the prototype chain and running accessors
    /// with `self` as receiver. Missing keys read as `Undefined`.
    pub fn get(&self, key: &str) -> Result<Value, HostError> {
        let mut current = Some(self.clone());
        let mut hops = 0;
        while let Some(obj) = current {
            hops += 1;
            if hops > MAX_PROTOTYPE_HOPS {
                return Err(HostError::new("prototype chain too deep"));
            }
            // Clone the slot out so an accessor may touch this object.
            if let Some(slot) = obj.own_slot(key) {
                return match slot {
                    Slot::Data { value, .. } => Ok(value),
                    Slot::Accessor { getter, .. } => getter(self),
                };
            }
            current = obj.proto();
        }
        Ok(Value::Undefined)
    }

    /// Declared `length` of an array-like, from its own data slot. Out of
    /// range lengths saturate.
    pub fn array_len(&self) -> usize {
        match self.own_slot("length") {
            Some(Slot::Data {
                value: Value::Number(n),
                ..
            }) if n >= 0.0 => n as usize,
            _ => 0,
        }
    }

    /// The first `limit` index-ordered data values of an array-like, without
    /// running accessors. Holes read as `Undefined`.
    pub fn array_items(&self, limit: usize) -> Vec<Value> {
        let props = self.0.props.borrow();
        (0..self.array_len().min(limit))
            .map(|i| match props.get(&i.to_string()) {
                Some(Slot::Data { value, .. }) => value.clone(),
                _ => Value::Undefined,
            })
            .collect()
    }

    /// The own data `name` of a function, if it is a string.
    pub fn function_name(&self) -> Option<String> {
        match self.own_slot("name") {
            Some(Slot::Data {
                value: Value::String(s),
                ..
            }) => Some(s.to_string()),
            _ => None,
        }
    }

    /// Own data slots in definition order, skipping accessors' values.
    pub fn data_entries(&self) -> Vec<(String, Option<Value>, bool)> {
        self.0
            .props
            .borrow()
            .iter()
            .map(|(k, slot)| match slot {
                Slot::Data { value, enumerable } => (k.clone(), Some(value.clone()), *enumerable),
                Slot::Accessor { enumerable, .. } => (k.clone(), None, *enumerable),
            })
            .collect()
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} @{:#x}]",
            self.class().unwrap_or("host"),
            self.addr()
        )
    }
}
