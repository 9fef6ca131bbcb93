//! The root environment: a global object plus the intrinsic prototypes and
//! constructors that give values their `constructor` and `instanceof`
//! behavior.

use super::value::{ObjectRef, Value};
use crate::error::ObjgrepError;

/// Path label of the default root.
pub const GLOBAL_PATH: &str = "window";

/// Internal class reported for the global object.
pub const GLOBAL_CLASS: &str = "global";

pub struct Realm {
    global: ObjectRef,
    object_prototype: ObjectRef,
    function_prototype: ObjectRef,
    array_prototype: ObjectRef,
}

impl Realm {
    pub fn new() -> Self {
        let object_prototype = ObjectRef::new(Some("Object"), false);
        let function_prototype = ObjectRef::new(Some("Function"), true);
        function_prototype.set_proto(Some(object_prototype.clone()));
        let array_prototype = ObjectRef::new(Some("Array"), false);
        array_prototype.set_proto(Some(object_prototype.clone()));
        array_prototype.define_hidden("length", 0);

        let global = ObjectRef::new(Some(GLOBAL_CLASS), false);
        global.set_proto(Some(object_prototype.clone()));

        let realm = Realm {
            global,
            object_prototype,
            function_prototype,
            array_prototype,
        };

        for (name, prototype) in [
            ("Object", realm.object_prototype.clone()),
            ("Function", realm.function_prototype.clone()),
            ("Array", realm.array_prototype.clone()),
        ] {
            let ctor = realm.bare_function(name);
            ctor.define_hidden("prototype", &prototype);
            prototype.define_hidden("constructor", &ctor);
            realm.global.define_hidden(name, ctor);
        }
        realm.global.define_hidden(GLOBAL_PATH, &realm.global);
        realm
    }

    /// The root environment object.
    pub fn global(&self) -> &ObjectRef {
        &self.global
    }

    pub fn object_prototype(&self) -> &ObjectRef {
        &self.object_prototype
    }

    pub fn function_prototype(&self) -> &ObjectRef {
        &self.function_prototype
    }

    pub fn array_prototype(&self) -> &ObjectRef {
        &self.array_prototype
    }

    /// A plain data object.
    pub fn object(&self) -> ObjectRef {
        let obj = ObjectRef::new(Some("Object"), false);
        obj.set_proto(Some(self.object_prototype.clone()));
        obj
    }

    /// A plain object with no prototype chain, hence no `constructor`.
    pub fn dictionary(&self) -> ObjectRef {
        ObjectRef::new(Some("Object"), false)
    }

    /// An object of a built-in class such as `Date`, `RegExp` or `Error`.
    pub fn object_of_class(&self, class: &str) -> ObjectRef {
        let obj = ObjectRef::new(Some(class), false);
        obj.set_proto(Some(self.object_prototype.clone()));
        obj
    }

    /// A host object that does not reveal its internal class.
    pub fn host_object(&self) -> ObjectRef {
        let obj = ObjectRef::new(None, false);
        obj.set_proto(Some(self.object_prototype.clone()));
        obj
    }

    pub fn array<I>(&self, items: I) -> ObjectRef
    where
        I: IntoIterator<Item = Value>,
    {
        let arr = ObjectRef::new(Some("Array"), false);
        self.fill_array(&arr, items);
        arr
    }

    /// Populate an `Array`-class object with indices and `length`.
    pub fn fill_array<I>(&self, arr: &ObjectRef, items: I)
    where
        I: IntoIterator<Item = Value>,
    {
        arr.set_proto(Some(self.array_prototype.clone()));
        let mut len = 0;
        for (index, item) in items.into_iter().enumerate() {
            arr.define(index.to_string(), item);
            len = index + 1;
        }
        arr.define_hidden("length", len as f64);
    }

    /// An `arguments`-style object: enumerable indices plus hidden `length`
    /// and `callee`.
    pub fn arguments<I>(&self, callee: &ObjectRef, items: I) -> ObjectRef
    where
        I: IntoIterator<Item = Value>,
    {
        let args = ObjectRef::new(Some("Arguments"), false);
        args.set_proto(Some(self.object_prototype.clone()));
        let mut len = 0;
        for (index, item) in items.into_iter().enumerate() {
            args.define(index.to_string(), item);
            len = index + 1;
        }
        args.define_hidden("length", len as f64);
        args.define_hidden("callee", callee);
        args
    }

    /// An ordinary function. Its `prototype` is an empty plain object, so it
    /// classifies as `Function` rather than `Constructor`.
    pub fn function(&self, name: &str) -> ObjectRef {
        let func = self.bare_function(name);
        let prototype = self.object();
        prototype.define_hidden("constructor", &func);
        func.define_hidden("prototype", prototype);
        func
    }

    /// A constructor whose prototype carries the given enumerable members.
    pub fn constructor<I>(&self, name: &str, members: I) -> ObjectRef
    where
        I: IntoIterator<Item = (String, Value)>,
    {
        let ctor = self.function(name);
        if let Ok(Value::Object(prototype)) = ctor.get("prototype") {
            for (key, value) in members {
                prototype.define(key, value);
            }
        }
        ctor
    }

    /// A plain object whose prototype is `ctor.prototype`.
    pub fn instance_of(&self, ctor: &ObjectRef) -> ObjectRef {
        let obj = ObjectRef::new(Some("Object"), false);
        match ctor.get("prototype") {
            Ok(Value::Object(prototype)) => obj.set_proto(Some(prototype)),
            _ => obj.set_proto(Some(self.object_prototype.clone())),
        }
        obj
    }

    fn bare_function(&self, name: &str) -> ObjectRef {
        let func = ObjectRef::new(Some("Function"), true);
        func.set_proto(Some(self.function_prototype.clone()));
        func.define_hidden("name", name);
        func.define_hidden("length", 0);
        func
    }

    /// Resolve a dotted accessor path against the global object. A leading
    /// `window` segment names the global object itself.
    pub fn resolve_path(&self, path: &str) -> Result<Value, ObjgrepError> {
        let mut current = Value::Object(self.global.clone());
        let mut segments = path.split('.').filter(|s| !s.is_empty()).peekable();
        if segments.peek() == Some(&GLOBAL_PATH) {
            segments.next();
        }
        for segment in segments {
            let obj = current.as_object().ok_or_else(|| ObjgrepError::RootNotFound {
                path: path.to_string(),
            })?;
            current = obj.get(segment).map_err(|e| ObjgrepError::RootNotFound {
                path: format!("{} ({})", path, e),
            })?;
        }
        Ok(current)
    }
}

impl Default for Realm {
    fn default() -> Self {
        Self::new()
    }
}
