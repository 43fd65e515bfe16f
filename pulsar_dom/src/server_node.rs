#![forbid(unsafe_code)]
//! An in-memory node tree for the server and for tests.

use crate::node::{NodeKey, PropValue, ViewNode};
use rustc_hash::FxHashMap;
use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

enum PropSlot {
    Leaf(PropValue),
    Branch(FxHashMap<String, PropSlot>),
}

struct ServerNodeInner {
    key: NodeKey,
    tag: String,
    /// Set on the root produced by [`ServerNode::document`]; connectivity
    /// means reaching such a node by walking parents.
    document: bool,
    parent: RefCell<Weak<ServerNodeInner>>,
    children: RefCell<Vec<ServerNode>>,
    props: RefCell<FxHashMap<String, PropSlot>>,
}

/// A node in a server-side document shim.
///
/// Semantically a tiny subset of a DOM element: a tag, a parent, ordered
/// children and a nested property map addressed by dot paths. This is the
/// backend used when there is no browser: server rendering, and every test
/// in this workspace.
///
/// Cloning is cheap and preserves identity.
#[derive(Clone)]
pub struct ServerNode(Rc<ServerNodeInner>);

impl ServerNode {
    /// Creates a document root. Nodes appended under it (at any depth)
    /// report themselves connected.
    pub fn document() -> Self {
        Self::new("#document", true)
    }

    /// Creates a detached element node.
    pub fn element(tag: &str) -> Self {
        Self::new(tag, false)
    }

    fn new(tag: &str, document: bool) -> Self {
        ServerNode(Rc::new(ServerNodeInner {
            key: NodeKey::next(),
            tag: tag.to_string(),
            document,
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            props: RefCell::new(FxHashMap::default()),
        }))
    }

    /// The node's tag name.
    pub fn tag(&self) -> &str {
        &self.0.tag
    }

    /// Appends `child` as the last child of this node, detaching it from any
    /// previous parent.
    pub fn append_child(&self, child: &ServerNode) {
        if let Some(previous) = child.0.parent.borrow().upgrade() {
            ServerNode(previous).detach(child);
        }
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Removes `child` from this node's children. A no-op when `child` is
    /// not actually a child.
    pub fn remove_child(&self, child: &ServerNode) {
        let is_child = child
            .0
            .parent
            .borrow()
            .upgrade()
            .is_some_and(|parent| Rc::ptr_eq(&parent, &self.0));
        if is_child {
            self.detach(child);
            *child.0.parent.borrow_mut() = Weak::new();
        }
    }

    fn detach(&self, child: &ServerNode) {
        self.0
            .children
            .borrow_mut()
            .retain(|existing| !Rc::ptr_eq(&existing.0, &child.0));
    }

    /// Reads a property by dot path, e.g. `"style.color"`.
    pub fn prop(&self, path: &str) -> Option<PropValue> {
        let segments: Vec<String> =
            path.split('.').map(str::to_string).collect();
        self.get_path(&segments)
    }
}

impl PartialEq for ServerNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ServerNode {}

impl fmt::Debug for ServerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerNode")
            .field("tag", &self.0.tag)
            .field("key", &self.0.key)
            .finish()
    }
}

fn get_in(map: &FxHashMap<String, PropSlot>, path: &[String]) -> Option<PropValue> {
    let (first, rest) = path.split_first()?;
    match map.get(first)? {
        PropSlot::Leaf(value) if rest.is_empty() => Some(value.clone()),
        PropSlot::Branch(inner) if !rest.is_empty() => get_in(inner, rest),
        _ => None,
    }
}

fn set_in(
    map: &mut FxHashMap<String, PropSlot>,
    path: &[String],
    value: PropValue,
) {
    let Some((first, rest)) = path.split_first() else {
        return;
    };
    if rest.is_empty() {
        map.insert(first.clone(), PropSlot::Leaf(value));
        return;
    }
    let slot = map
        .entry(first.clone())
        .or_insert_with(|| PropSlot::Branch(FxHashMap::default()));
    if let PropSlot::Leaf(_) = slot {
        // A leaf in the middle of a longer path gets promoted to an object,
        // the way assigning through it would on a JS target.
        *slot = PropSlot::Branch(FxHashMap::default());
    }
    if let PropSlot::Branch(inner) = slot {
        set_in(inner, rest, value);
    }
}

impl ViewNode for ServerNode {
    fn key(&self) -> NodeKey {
        self.0.key
    }

    fn is_connected(&self) -> bool {
        if self.0.document {
            return true;
        }
        let mut current = self.0.parent.borrow().upgrade();
        while let Some(node) = current {
            if node.document {
                return true;
            }
            let parent = node.parent.borrow().upgrade();
            current = parent;
        }
        false
    }

    fn children(&self) -> Vec<Self> {
        self.0.children.borrow().clone()
    }

    fn get_path(&self, path: &[String]) -> Option<PropValue> {
        get_in(&self.0.props.borrow(), path)
    }

    fn set_path(&self, path: &[String], value: PropValue) {
        set_in(&mut self.0.props.borrow_mut(), path, value);
    }
}
