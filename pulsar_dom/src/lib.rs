//! The binding layer of the Pulsar UI runtime.
//!
//! Where [`pulsar_reactive`] decides *what* must re-run when a value
//! changes, this crate decides *where the result lands*: a [`wire`] drives
//! exactly one property of one node from a reactive source, [`execute`]
//! runs component factories with scoped lifecycle hooks, and the registry
//! guarantees that everything attached to an element is released exactly
//! once when its subtree goes away.
//!
//! The document itself sits behind the [`ViewNode`] seam. [`ServerNode`] is
//! the in-memory backend used on the server and in tests; the `web` cargo
//! feature adds `DomNode`, the same seam over real DOM nodes.
//!
//! ```
//! use pulsar_dom::*;
//! use pulsar_reactive::*;
//!
//! let doc = ServerNode::document();
//! let (count, set_count) = create_signal(0);
//!
//! let counter = execute("counter", None, || {
//!     let el = ServerNode::element("span");
//!     wire(&el, "textContent", WireSource::signal(count));
//!     el
//! });
//! doc.append_child(&counter);
//!
//! set_count.set(5);
//! assert_eq!(counter.prop("textContent"), Some(PropValue::Int(5)));
//!
//! // removing the subtree releases the wire
//! dispose_tree(&counter);
//! set_count.set(9);
//! assert_eq!(counter.prop("textContent"), Some(PropValue::Int(5)));
//! ```

#![warn(missing_docs)]

mod component;
#[cfg(feature = "web")]
mod dom_node;
mod lifecycle;
mod node;
mod registry;
mod server_node;
mod wire;

pub use component::*;
#[cfg(feature = "web")]
pub use dom_node::DomNode;
pub use lifecycle::{on_cleanup, on_mount, on_update};
pub use node::*;
pub use registry::*;
pub use server_node::*;
pub use wire::*;

// The registry facade also fronts the kernel half of the public surface.
pub use pulsar_reactive::{
    current_hid, current_owner, disable_debug, enable_debug, next_hid,
    run_in_scope, set_hid, Owner,
};
