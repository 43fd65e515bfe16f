#![forbid(unsafe_code)]
use crate::runtime::with_runtime;
use serde::Serialize;

/// Turns on development diagnostics for the current runtime, such as the
/// warning on signal reads outside any tracking scope.
pub fn enable_debug() {
    with_runtime(|runtime| runtime.debug.set(true));
}

/// Turns development diagnostics back off.
pub fn disable_debug() {
    with_runtime(|runtime| runtime.debug.set(false));
}

/// Whether development diagnostics are enabled.
pub fn debug_enabled() -> bool {
    with_runtime(|runtime| runtime.debug.get())
}

/// A point-in-time census of the kernel arenas. Returned by value; mutating
/// it changes nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct KernelStats {
    /// Live signals.
    pub signals: usize,
    /// Live memos.
    pub memos: usize,
    /// Live effect owners, including memo invalidation owners and manual
    /// subscriptions.
    pub owners: usize,
    /// Depth of the currently open batch window, zero outside `batch`.
    pub batch_depth: usize,
    /// Frame callbacks waiting for the next flush.
    pub pending_frames: usize,
}

/// Snapshots the kernel arenas.
pub fn kernel_stats() -> KernelStats {
    with_runtime(|runtime| KernelStats {
        signals: runtime.signals.borrow().len(),
        memos: runtime.memos.borrow().len(),
        owners: runtime.owners.borrow().len(),
        batch_depth: runtime.batch_depth.get(),
        pending_frames: runtime.keyed_frames.borrow().len()
            + runtime.anon_frames.borrow().len(),
    })
}

/// A point-in-time view of one signal, for debug tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalSnapshot {
    /// The signal's hid serial.
    pub id: u64,
    /// The Rust type stored in the signal.
    pub ty: String,
    /// Number of currently subscribed owners.
    pub subscribers: usize,
    /// The current value, when the signal is serializable.
    pub value: Option<serde_json::Value>,
}

/// Snapshots every live signal, in arena order.
pub fn signal_snapshots() -> Vec<SignalSnapshot> {
    let collected: Vec<_> = with_runtime(|runtime| {
        let signals = runtime.signals.borrow();
        signals
            .iter()
            .map(|(_, node)| {
                (
                    node.serial,
                    node.ty,
                    node.subscribers.len(),
                    node.hooks.clone().map(|h| (h, node.value.clone())),
                )
            })
            .collect()
    });
    collected
        .into_iter()
        .map(|(id, ty, subscribers, dump)| SignalSnapshot {
            id,
            ty: ty.to_string(),
            subscribers,
            value: dump.and_then(|(hooks, slot)| (hooks.dump)(&slot).ok()),
        })
        .collect()
}
