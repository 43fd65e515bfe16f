//! Pulsar is a fine-grained reactive UI runtime: reactive values bind to
//! individual node properties, and a write re-runs exactly the bindings
//! that read it. There is no virtual DOM and no diff.
//!
//! This crate re-exports the two halves of the runtime:
//!
//! - [`pulsar_reactive`]: signals, memos, effects, batching and the frame
//!   scheduler;
//! - [`pulsar_dom`]: wires, component execution, lifecycle hooks and the
//!   registry that ties disposal to the element tree.
//!
//! ```
//! use pulsar::prelude::*;
//!
//! let doc = ServerNode::document();
//! let (count, set_count) = create_signal(0);
//!
//! let el = execute("counter", None, || {
//!     let el = ServerNode::element("span");
//!     wire(&el, "textContent", WireSource::signal(count));
//!     el
//! });
//! doc.append_child(&el);
//!
//! set_count.set(42);
//! assert_eq!(el.prop("textContent"), Some(PropValue::Int(42)));
//! ```

#![warn(missing_docs)]

pub use pulsar_dom::*;
pub use pulsar_reactive::*;

/// One import for the names almost every Pulsar program touches.
pub mod prelude {
    pub use pulsar_dom::{
        dispose_element, dispose_tree, execute, on_cleanup, on_mount,
        on_update, provide_context, use_context, wire, PropValue, ServerNode,
        ViewNode, WireSource,
    };
    pub use pulsar_reactive::{
        batch, create_effect, create_memo, create_rw_signal, create_signal,
        schedule_frame, schedule_frame_keyed, untrack, SignalGet, SignalSet,
        SignalUpdate, SignalWith,
    };
}
