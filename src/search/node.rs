//! Traversal nodes and their ancestor lineage.

use std::rc::Rc;

use crate::host::ObjectRef;

struct Link {
    object: ObjectRef,
    parent: Option<Rc<Link>>,
}

/// The ancestors of a node, from the node itself up to its root.
///
/// Extending a lineage shares the parent chain, so siblings hold
/// independent lineages without copying their common prefix.
#[derive(Clone, Default)]
pub struct Lineage {
    head: Option<Rc<Link>>,
    len: usize,
}

impl Lineage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A new lineage with `object` appended; `self` is unchanged.
    pub fn extend(&self, object: &ObjectRef) -> Lineage {
        Lineage {
            head: Some(Rc::new(Link {
                object: object.clone(),
                parent: self.head.clone(),
            })),
            len: self.len + 1,
        }
    }

    /// Identity membership test.
    pub fn contains(&self, object: &ObjectRef) -> bool {
        self.iter().any(|ancestor| ancestor.ptr_eq(object))
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Ancestors from the newest to the root.
    pub fn iter(&self) -> impl Iterator<Item = &ObjectRef> + '_ {
        let mut current = self.head.as_deref();
        std::iter::from_fn(move || {
            let link = current?;
            current = link.parent.as_deref();
            Some(&link.object)
        })
    }
}

impl Drop for Lineage {
    // Unlink iteratively; a deep chain would otherwise drop recursively.
    fn drop(&mut self) {
        let mut current = self.head.take();
        while let Some(link) = current {
            match Rc::try_unwrap(link) {
                Ok(mut link) => current = link.parent.take(),
                Err(_) => break,
            }
        }
    }
}

/// A node scheduled for property enumeration.
pub struct GraphNode {
    pub object: ObjectRef,
    pub path: String,
    pub lineage: Lineage,
}

impl GraphNode {
    pub fn root(object: ObjectRef, path: impl Into<String>) -> Self {
        let lineage = Lineage::new().extend(&object);
        Self {
            object,
            path: path.into(),
            lineage,
        }
    }

    /// Accessor path of a property of this node.
    pub fn child_path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    pub fn child(&self, object: ObjectRef, key: &str) -> GraphNode {
        let lineage = self.lineage.extend(&object);
        GraphNode {
            object,
            path: self.child_path(key),
            lineage,
        }
    }

    pub fn depth(&self) -> usize {
        self.lineage.len().saturating_sub(1)
    }
}
