//! The inspected object graph.
//!
//! - [`value`] - values, objects, property slots and host failures
//! - [`realm`] - the global object and intrinsics, plus builders
//! - [`snapshot`] - loading a realm from a JSON snapshot

pub mod realm;
pub mod snapshot;
pub mod value;

pub use realm::{Realm, GLOBAL_CLASS, GLOBAL_PATH};
pub use snapshot::{load_snapshot, parse_snapshot};
pub use value::{
    format_number, Getter, HostError, ObjectRef, Slot, Value, MAX_PROTOTYPE_HOPS,
    MAX_STRINGIFIED_ITEMS,
};
