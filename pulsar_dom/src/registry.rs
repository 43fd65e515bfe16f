#![forbid(unsafe_code)]
//! The process-wide registry: per-element disposers, component records, the
//! SSR snapshot, and debug views.

use crate::{
    component::ComponentContext,
    lifecycle::LifecycleSlot,
    node::{NodeKey, ViewNode},
    wire::Disposer,
};
use indexmap::IndexMap;
use pulsar_reactive::{KernelStats, SerializationError, SignalSnapshot};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::{
    any::Any,
    cell::RefCell,
    collections::HashMap,
    panic::{catch_unwind, AssertUnwindSafe},
    rc::Rc,
};

#[derive(Default)]
pub(crate) struct Registry {
    /// Per-element disposer sets, keyed by node key so the registry never
    /// keeps an element alive.
    pub disposers: RefCell<FxHashMap<NodeKey, Vec<Disposer>>>,
    /// Per-element update callbacks, same keying.
    pub updates: RefCell<FxHashMap<NodeKey, Vec<Rc<dyn Fn()>>>>,
    /// Every executed component id, in first-execution order.
    pub components: RefCell<IndexMap<String, ComponentRecord>>,
    pub component_stack: RefCell<Vec<ComponentContext>>,
    pub lifecycle_stack: RefCell<Vec<LifecycleSlot>>,
}

pub(crate) struct ComponentRecord {
    pub parent: Option<String>,
    pub node: NodeKey,
}

thread_local! {
    static REGISTRY: Registry = Registry::default();
}

#[inline(always)]
pub(crate) fn with_registry<T>(f: impl FnOnce(&Registry) -> T) -> T {
    REGISTRY.with(f)
}

pub(crate) fn register_disposer(key: NodeKey, disposer: Disposer) {
    with_registry(|registry| {
        registry
            .disposers
            .borrow_mut()
            .entry(key)
            .or_default()
            .push(disposer);
    });
}

pub(crate) fn run_element_updates(key: NodeKey) {
    let updates = with_registry(|registry| {
        registry.updates.borrow().get(&key).cloned()
    });
    if let Some(updates) = updates {
        for f in updates {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f())) {
                tracing::error!(
                    target: "pulsar_dom",
                    element = %key,
                    "update callback panicked: {}",
                    payload_message(&*payload)
                );
            }
        }
    }
}

pub(crate) fn payload_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "opaque panic payload"
    }
}

/// Invokes and clears every disposer attached to the element, and drops its
/// update callbacks. Idempotent: a second call finds nothing to do.
pub fn dispose_element<N: ViewNode>(node: &N) {
    dispose_element_key(node.key());
}

/// [`dispose_element`] addressed by key, for callers that no longer hold the
/// node.
pub fn dispose_element_key(key: NodeKey) {
    let disposers = with_registry(|registry| {
        registry.updates.borrow_mut().remove(&key);
        registry.disposers.borrow_mut().remove(&key)
    });
    if let Some(disposers) = disposers {
        for disposer in disposers {
            disposer.dispose();
        }
    }
}

/// Applies [`dispose_element`] depth-first across `root` and all of its
/// descendants, children before parents. A subtree with no bindings is a
/// no-op.
pub fn dispose_tree<N: ViewNode>(root: &N) {
    for child in root.children() {
        dispose_tree(&child);
    }
    dispose_element(root);
}

/// The serializable state handed from a server render to the client boot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSnapshot {
    /// Serializable signal values, keyed by hid serial.
    pub signals: HashMap<u64, serde_json::Value>,
    /// Every executed component id, in first-execution order.
    pub components: Vec<String>,
    /// The hid counter at dump time.
    pub hid: u64,
}

/// Captures the current reactive state for the SSR handshake.
pub fn dump() -> Result<RuntimeSnapshot, SerializationError> {
    let signals = pulsar_reactive::snapshot_signals()?;
    let components = with_registry(|registry| {
        registry.components.borrow().keys().cloned().collect()
    });
    Ok(RuntimeSnapshot {
        signals,
        components,
        hid: pulsar_reactive::current_hid(),
    })
}

/// Replays a [`RuntimeSnapshot`]: restores the hid counter and re-seeds
/// signal values by serial. No subscriber is notified during the replay;
/// values for signals that do not exist yet seed them at creation.
pub fn boot(snapshot: &RuntimeSnapshot) {
    pulsar_reactive::set_hid(snapshot.hid);
    pulsar_reactive::boot_signals(&snapshot.signals);
}

/// A point-in-time census of the registry and the kernel. Returned by
/// value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegistryStats {
    /// The kernel arenas.
    pub kernel: KernelStats,
    /// Executed component ids currently on record.
    pub components: usize,
    /// Elements with at least one attached disposer.
    pub wired_elements: usize,
}

/// Snapshots the registry and kernel state.
pub fn get_stats() -> RegistryStats {
    with_registry(|registry| RegistryStats {
        kernel: pulsar_reactive::kernel_stats(),
        components: registry.components.borrow().len(),
        wired_elements: registry.disposers.borrow().len(),
    })
}

/// One component in the tree returned by [`get_component_tree`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComponentTreeNode {
    /// The component id passed to [`execute`](crate::execute).
    pub id: String,
    /// Components executed with this id as their parent.
    pub children: Vec<ComponentTreeNode>,
}

/// Snapshots the executed components as a forest, in first-execution order.
pub fn get_component_tree() -> Vec<ComponentTreeNode> {
    let records: Vec<(String, Option<String>)> = with_registry(|registry| {
        registry
            .components
            .borrow()
            .iter()
            .map(|(id, record)| (id.clone(), record.parent.clone()))
            .collect()
    });

    let known: std::collections::HashSet<&str> =
        records.iter().map(|(id, _)| id.as_str()).collect();
    let mut children_of: FxHashMap<String, Vec<String>> = FxHashMap::default();
    let mut roots = Vec::new();
    for (id, parent) in &records {
        match parent {
            Some(parent) if known.contains(parent.as_str()) => children_of
                .entry(parent.clone())
                .or_default()
                .push(id.clone()),
            _ => roots.push(id.clone()),
        }
    }

    fn build(
        id: String,
        children_of: &FxHashMap<String, Vec<String>>,
    ) -> ComponentTreeNode {
        let children = children_of
            .get(&id)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(|child| build(child, children_of))
            .collect();
        ComponentTreeNode { id, children }
    }

    roots
        .into_iter()
        .map(|id| build(id, &children_of))
        .collect()
}

/// Snapshots every live signal; see
/// [`signal_snapshots`](pulsar_reactive::signal_snapshots).
pub fn get_signals() -> Vec<SignalSnapshot> {
    pulsar_reactive::signal_snapshots()
}

/// Clears the registry and resets the kernel runtime: every disposer map,
/// component record, stack, arena and counter goes back to its initial
/// state.
pub fn reset() {
    pulsar_reactive::reset_runtime();
    with_registry(|registry| {
        registry.disposers.take();
        registry.updates.take();
        registry.components.take();
        registry.component_stack.take();
        registry.lifecycle_stack.take();
    });
}
