#![forbid(unsafe_code)]
//! Wires: effects whose sole side effect is writing one property of one
//! node.

use crate::{
    node::{PropValue, ViewNode},
    registry::register_disposer,
};
use pulsar_reactive::{create_effect, current_owner, Memo, ReadSignal, SignalGet};
use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

/// A wire whose owner re-runs this many times back-to-back without settling
/// is assumed to be feeding itself and gets cut off with a diagnostic.
const MAX_UNSETTLED_WIRE_RUNS: u32 = 50;

/// An idempotent release function for one reactive binding.
///
/// Calling [`dispose`](Disposer::dispose) more than once is a no-op. Clones
/// share the underlying binding: disposing any clone spends them all.
#[derive(Clone)]
pub struct Disposer {
    inner: Rc<RefCell<Option<Box<dyn FnOnce()>>>>,
}

impl Disposer {
    /// Wraps a release function.
    pub fn new(f: impl FnOnce() + 'static) -> Self {
        Disposer {
            inner: Rc::new(RefCell::new(Some(Box::new(f)))),
        }
    }

    /// A disposer with nothing to release.
    pub fn noop() -> Self {
        Disposer {
            inner: Rc::new(RefCell::new(None)),
        }
    }

    /// Runs the release function if it has not run yet.
    pub fn dispose(&self) {
        let f = self.inner.borrow_mut().take();
        if let Some(f) = f {
            f();
        }
    }

    /// Whether the release function has already run (or never existed).
    pub fn is_spent(&self) -> bool {
        self.inner.borrow().is_none()
    }
}

impl fmt::Debug for Disposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disposer")
            .field("spent", &self.is_spent())
            .finish()
    }
}

/// What drives a wire: classified once at construction, branched on by tag
/// in the hot path.
pub enum WireSource {
    /// A plain value, written once.
    Static(PropValue),
    /// A signal or memo handle, read under tracking.
    Signal(Rc<dyn Fn() -> PropValue>),
    /// An arbitrary getter, read under tracking.
    Getter(Rc<dyn Fn() -> PropValue>),
}

impl WireSource {
    /// A static source: the value is written once and never updated.
    pub fn value(value: impl Into<PropValue>) -> Self {
        WireSource::Static(value.into())
    }

    /// A signal source.
    pub fn signal<T>(signal: ReadSignal<T>) -> Self
    where
        T: Clone + Into<PropValue> + 'static,
    {
        WireSource::Signal(Rc::new(move || signal.get().into()))
    }

    /// A memo source. Reading the memo under tracking subscribes the wire to
    /// the memo's dependencies, so invalidating one re-runs the wire.
    pub fn memo<T>(memo: Memo<T>) -> Self
    where
        T: Clone + Into<PropValue> + 'static,
    {
        WireSource::Signal(Rc::new(move || memo.get().into()))
    }

    /// A getter source: any closure over reactive reads.
    pub fn getter<T: Into<PropValue>>(f: impl Fn() -> T + 'static) -> Self {
        WireSource::Getter(Rc::new(move || f().into()))
    }
}

impl fmt::Debug for WireSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            WireSource::Static(_) => "Static",
            WireSource::Signal(_) => "Signal",
            WireSource::Getter(_) => "Getter",
        };
        f.debug_tuple("WireSource").field(&tag).finish()
    }
}

struct WireState<N: ViewNode> {
    node: N,
    path: Vec<String>,
    label: String,
    first_run: Cell<bool>,
    disposed: Cell<bool>,
}

/// Binds a reactive source to a dot-separated property path on a node.
///
/// Static sources navigate the path once, set the leaf and return a spent
/// [`Disposer`]. Reactive sources install an effect owned by the current
/// tracking owner; its run reads the source and writes the leaf. The first
/// write is unconditional; later runs skip the write when the node is
/// detached or when the leaf already holds the new value, so an unchanged
/// value never touches the node twice.
///
/// The returned disposer is also registered in the node's disposer set, so
/// [`dispose_tree`](crate::dispose_tree) over an ancestor releases the wire.
///
/// ```
/// # use pulsar_dom::*;
/// # use pulsar_reactive::*;
/// let doc = ServerNode::document();
/// let label = ServerNode::element("span");
/// doc.append_child(&label);
///
/// let (count, set_count) = create_signal(0);
/// wire(&label, "textContent", WireSource::signal(count));
///
/// assert_eq!(label.prop("textContent"), Some(PropValue::Int(0)));
/// set_count.set(7);
/// assert_eq!(label.prop("textContent"), Some(PropValue::Int(7)));
/// ```
#[track_caller]
pub fn wire<N: ViewNode>(node: &N, path: &str, source: WireSource) -> Disposer {
    let segments: Vec<String> = path.split('.').map(str::to_string).collect();
    let read = match source {
        WireSource::Static(value) => {
            node.set_path(&segments, value);
            return Disposer::noop();
        }
        WireSource::Signal(read) | WireSource::Getter(read) => read,
    };

    let state = Rc::new(WireState {
        node: node.clone(),
        path: segments,
        label: path.to_string(),
        first_run: Cell::new(true),
        disposed: Cell::new(false),
    });

    let effect = create_effect({
        let state = Rc::clone(&state);
        move || run_wire(&state, &read)
    });

    let disposer = Disposer::new({
        let state = Rc::clone(&state);
        move || {
            state.disposed.set(true);
            effect.dispose();
        }
    });
    register_disposer(node.key(), disposer.clone());
    disposer
}

fn run_wire<N: ViewNode>(
    state: &WireState<N>,
    read: &Rc<dyn Fn() -> PropValue>,
) {
    if state.disposed.get() {
        return;
    }
    if let Some(owner) = current_owner() {
        let run_count = owner.chain_runs();
        if run_count >= MAX_UNSETTLED_WIRE_RUNS {
            tracing::warn!(
                target: "pulsar_dom::wire",
                element = %state.node.key(),
                path = %state.label,
                run_count,
                "wire re-ran without settling; cutting off its update chain"
            );
            return;
        }
    }

    let value = (read)();
    let first_run = state.first_run.replace(false);
    if !first_run {
        // Keep the subscriptions fresh (the read above already did), but do
        // not write into a detached subtree.
        if !state.node.is_connected() {
            return;
        }
        if state
            .node
            .get_path(&state.path)
            .is_some_and(|current| current == value)
        {
            return;
        }
    }
    state.node.set_path(&state.path, value);
}
