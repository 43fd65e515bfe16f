#![forbid(unsafe_code)]
//! The rendering-backend abstraction that wires and the registry talk to.

use std::{cell::Cell, fmt};

thread_local! {
    static NEXT_NODE_KEY: Cell<u64> = const { Cell::new(0) };
}

/// An opaque, process-unique identifier for a node.
///
/// The registry keys its per-element disposer sets by `NodeKey` rather than
/// by the node itself, so the bookkeeping never keeps a node alive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub u64);

impl NodeKey {
    /// Allocates a fresh key. Backends call this once per node.
    pub fn next() -> Self {
        NEXT_NODE_KEY.with(|next| {
            let key = next.get() + 1;
            next.set(key);
            NodeKey(key)
        })
    }
}

impl fmt::Display for NodeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A value that can sit in a node property.
///
/// Wires classify their source once and then push `PropValue`s through the
/// property path; backends translate them to whatever their property store
/// needs (JS values in the browser, a plain map on the server).
#[derive(Debug, Clone, PartialEq)]
pub enum PropValue {
    /// The absent value.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer.
    Int(i64),
    /// A float.
    Num(f64),
    /// A string.
    Str(String),
}

impl fmt::Display for PropValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropValue::Null => Ok(()),
            PropValue::Bool(value) => write!(f, "{value}"),
            PropValue::Int(value) => write!(f, "{value}"),
            PropValue::Num(value) => write!(f, "{value}"),
            PropValue::Str(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for PropValue {
    fn from(value: &str) -> Self {
        PropValue::Str(value.to_string())
    }
}

impl From<String> for PropValue {
    fn from(value: String) -> Self {
        PropValue::Str(value)
    }
}

impl From<bool> for PropValue {
    fn from(value: bool) -> Self {
        PropValue::Bool(value)
    }
}

impl From<i32> for PropValue {
    fn from(value: i32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<i64> for PropValue {
    fn from(value: i64) -> Self {
        PropValue::Int(value)
    }
}

impl From<u32> for PropValue {
    fn from(value: u32) -> Self {
        PropValue::Int(value.into())
    }
}

impl From<usize> for PropValue {
    fn from(value: usize) -> Self {
        PropValue::Int(value as i64)
    }
}

impl From<f32> for PropValue {
    fn from(value: f32) -> Self {
        PropValue::Num(value.into())
    }
}

impl From<f64> for PropValue {
    fn from(value: f64) -> Self {
        PropValue::Num(value)
    }
}

/// Abstraction over a rendering backend.
///
/// Pulsar ships two implementations: [`ServerNode`](crate::ServerNode), a
/// plain in-memory tree used on the server and in tests, and (behind the
/// `web` feature) `DomNode`, a wrapper over real DOM nodes. Nodes are
/// cheaply cloneable handles that preserve identity: cloning hands out
/// another reference to the same node.
pub trait ViewNode: Clone + PartialEq + 'static {
    /// The node's unique key. Stable across clones of the same node.
    fn key(&self) -> NodeKey;

    /// Whether the node is attached to its document. Wires consult this to
    /// skip writes into detached subtrees.
    fn is_connected(&self) -> bool;

    /// The node's current children, in document order.
    fn children(&self) -> Vec<Self>;

    /// Reads the property at the given path, where each element of `path` is
    /// one dot-separated segment. Returns `None` when any segment is absent.
    fn get_path(&self, path: &[String]) -> Option<PropValue>;

    /// Writes the property at the given path, creating intermediate objects
    /// as needed.
    fn set_path(&self, path: &[String], value: PropValue);
}
