#![forbid(unsafe_code)]
use crate::serialization::SerializationError;
use core::hash::BuildHasherDefault;
use indexmap::{IndexMap, IndexSet};
use rustc_hash::{FxHashMap, FxHasher};
use slotmap::SlotMap;
use std::{
    any::Any,
    cell::{Cell, RefCell},
    panic::{catch_unwind, AssertUnwindSafe},
    rc::Rc,
};

pub(crate) type FxIndexSet<T> = IndexSet<T, BuildHasherDefault<FxHasher>>;

pub(crate) type PanicPayload = Box<dyn Any + Send + 'static>;

/// Upper bound on how many times a single owner may re-run back-to-back in
/// response to writes issued from its own run, before the update chain is
/// aborted with a diagnostic.
pub(crate) const MAX_CONSECUTIVE_RUNS: u32 = 100;

slotmap::new_key_type! {
    /// Unique ID assigned to a signal.
    pub(crate) struct SignalId;
    /// Unique ID assigned to a memo.
    pub(crate) struct MemoId;
    /// Unique ID assigned to an effect owner.
    pub(crate) struct OwnerId;
}

/// Hooks registered for signals that participate in the SSR snapshot.
#[derive(Clone)]
pub(crate) struct SerdeHooks {
    pub dump: Rc<
        dyn Fn(
            &Rc<RefCell<dyn Any>>,
        ) -> Result<serde_json::Value, SerializationError>,
    >,
    pub restore: Rc<
        dyn Fn(
            &Rc<RefCell<dyn Any>>,
            &serde_json::Value,
        ) -> Result<(), SerializationError>,
    >,
}

pub(crate) struct SignalNode {
    pub value: Rc<RefCell<dyn Any>>,
    /// Subscribed owners, in insertion order.
    pub subscribers: FxIndexSet<OwnerId>,
    /// `None` means every write notifies.
    pub equals: Option<Rc<dyn Fn(&dyn Any, &dyn Any) -> bool>>,
    /// Creation-ordered serial drawn from the hid counter; stable across
    /// processes as long as the creation order is.
    pub serial: u64,
    pub ty: &'static str,
    pub hooks: Option<SerdeHooks>,
}

pub(crate) struct MemoNode {
    pub value: Option<Rc<dyn Any>>,
    pub dirty: bool,
    pub computing: bool,
    /// Signals touched by the most recent computation.
    pub dependencies: Vec<SignalId>,
    /// The invalidation owner installed by the most recent computation.
    pub owner: Option<OwnerId>,
    pub compute: Rc<dyn Fn() -> Rc<dyn Any>>,
}

/// Lifecycle of an owner: created idle, running while its callback executes,
/// waiting for the next notification in between, disposed terminally.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OwnerState {
    Idle,
    Running,
    Waiting,
    Disposed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum OwnerKind {
    /// Rebuilds its subscriptions from scratch on every run.
    Tracking,
    /// Subscribed by hand (`ReadSignal::subscribe`); runs never retrack.
    Manual,
}

pub(crate) struct OwnerNode {
    pub callback: Rc<dyn Fn()>,
    pub kind: OwnerKind,
    pub state: OwnerState,
    /// Signals this owner is subscribed to.
    pub sources: FxIndexSet<SignalId>,
    /// Owners created while this one was running.
    pub children: Vec<OwnerId>,
    /// Latched when a notification arrives while the owner is running.
    pub rerun_requested: bool,
    /// Consecutive re-runs in the current notification chain.
    pub chain_runs: u32,
}

// The data structure that owns all the signals, memos and effect owners of
// one reactive system, along with the tracking stack, batch window, frame
// queues and the hydration shared context. Single-threaded by construction:
// one runtime lives in each thread's local storage and nothing crosses
// threads.
#[derive(Default)]
pub(crate) struct Runtime {
    pub signals: RefCell<SlotMap<SignalId, SignalNode>>,
    pub memos: RefCell<SlotMap<MemoId, MemoNode>>,
    pub owners: RefCell<SlotMap<OwnerId, OwnerNode>>,
    /// The tracking stack. `None` entries are untracked windows opened by
    /// [`untrack`](crate::untrack).
    pub tracking: RefCell<Vec<Option<OwnerId>>>,
    pub batch_depth: Cell<usize>,
    /// Owners queued while a batch window is open, in first-insertion order.
    pub pending: RefCell<FxIndexSet<OwnerId>>,
    /// Keyed frame callbacks; the value is last-writer-wins.
    pub keyed_frames: RefCell<IndexMap<String, Box<dyn FnOnce()>>>,
    pub anon_frames: RefCell<Vec<Box<dyn FnOnce()>>>,
    pub frame_requested: Cell<bool>,
    /// Monotonic hydration-id counter.
    pub hid: Cell<u64>,
    /// Values delivered by `boot` for signals that do not exist yet.
    pub boot_values: RefCell<FxHashMap<u64, serde_json::Value>>,
    pub debug: Cell<bool>,
}

thread_local! {
    pub(crate) static RUNTIME: Runtime = Runtime::default();
}

#[inline(always)]
pub(crate) fn with_runtime<T>(f: impl FnOnce(&Runtime) -> T) -> T {
    RUNTIME.with(f)
}

impl Runtime {
    pub fn current_owner(&self) -> Option<OwnerId> {
        self.tracking.borrow().last().copied().flatten()
    }

    /// Subscribe `owner` to `signal`, in both directions.
    pub fn link(&self, signal: SignalId, owner: OwnerId) {
        {
            let mut signals = self.signals.borrow_mut();
            match signals.get_mut(signal) {
                Some(node) => {
                    node.subscribers.insert(owner);
                }
                None => return,
            }
        }
        if let Some(o) = self.owners.borrow_mut().get_mut(owner) {
            o.sources.insert(signal);
        }
    }

    /// Called on every signal read. Attributes the read to the innermost
    /// tracking owner, if any.
    pub fn track_read(&self, signal: SignalId) {
        match self.current_owner() {
            Some(owner) => self.link(signal, owner),
            None => {
                if self.debug.get() {
                    crate::debug_warn!(
                        "signal read outside a tracking scope; the read will \
                         not subscribe anything"
                    );
                }
            }
        }
    }

    pub fn create_owner(
        &self,
        kind: OwnerKind,
        parented: bool,
        callback: Rc<dyn Fn()>,
    ) -> OwnerId {
        let parent = if parented { self.current_owner() } else { None };
        let id = self.owners.borrow_mut().insert(OwnerNode {
            callback,
            kind,
            state: OwnerState::Idle,
            sources: FxIndexSet::default(),
            children: Vec::new(),
            rerun_requested: false,
            chain_runs: 0,
        });
        if let Some(parent) = parent {
            if let Some(p) = self.owners.borrow_mut().get_mut(parent) {
                p.children.push(id);
            }
        }
        id
    }

    /// Remove the owner from every signal it is subscribed to and clear its
    /// source set.
    pub fn unlink_sources(&self, owner: OwnerId) {
        let sources = {
            let mut owners = self.owners.borrow_mut();
            match owners.get_mut(owner) {
                Some(o) => std::mem::take(&mut o.sources),
                None => return,
            }
        };
        let mut signals = self.signals.borrow_mut();
        for source in sources {
            if let Some(node) = signals.get_mut(source) {
                node.subscribers.shift_remove(&owner);
            }
        }
    }

    /// Dispose an owner: unsubscribe it everywhere, dispose its children
    /// recursively and remove it from the arena. Idempotent; a disposed owner
    /// is never run again even if a stale subscriber reference fires, because
    /// the arena lookup fails.
    pub fn dispose_owner(&self, owner: OwnerId) {
        let children = {
            let mut owners = self.owners.borrow_mut();
            match owners.get_mut(owner) {
                Some(o) => {
                    o.state = OwnerState::Disposed;
                    std::mem::take(&mut o.children)
                }
                None => return,
            }
        };
        for child in children {
            self.dispose_owner(child);
        }
        self.unlink_sources(owner);
        self.owners.borrow_mut().remove(owner);
    }

    /// Notify every subscriber of `signal`: synchronously outside a batch,
    /// queued into the pending set inside one. The subscriber set is
    /// snapshotted first so user code can freely subscribe and unsubscribe
    /// during the pass.
    pub fn notify(&self, signal: SignalId) {
        let subscribers: Vec<OwnerId> = {
            let signals = self.signals.borrow();
            match signals.get(signal) {
                Some(node) => node.subscribers.iter().copied().collect(),
                None => return,
            }
        };
        if self.batch_depth.get() > 0 {
            let mut pending = self.pending.borrow_mut();
            for owner in subscribers {
                pending.insert(owner);
            }
        } else {
            for owner in subscribers {
                // Reported at the dispatch boundary; the writer is unaffected.
                let _ = self.run_owner(owner);
            }
        }
    }

    /// Run an owner's callback, rebuilding its subscriptions when it is a
    /// tracking owner. Single-entrant: a notification that lands while the
    /// owner is running latches a re-run instead of recursing, and
    /// back-to-back re-runs are clamped at [`MAX_CONSECUTIVE_RUNS`].
    ///
    /// Panics from the callback are caught, reported and returned so the
    /// batch drain can re-raise the first one after completing.
    pub fn run_owner(&self, owner: OwnerId) -> Result<(), PanicPayload> {
        {
            let mut owners = self.owners.borrow_mut();
            let Some(o) = owners.get_mut(owner) else {
                return Ok(());
            };
            match o.state {
                OwnerState::Disposed => return Ok(()),
                OwnerState::Running => {
                    o.rerun_requested = true;
                    return Ok(());
                }
                OwnerState::Idle | OwnerState::Waiting => {
                    o.state = OwnerState::Running;
                    o.chain_runs = 0;
                }
            }
        }

        let mut first_panic: Option<PanicPayload> = None;
        loop {
            let (kind, callback) = {
                let owners = self.owners.borrow();
                let Some(o) = owners.get(owner) else {
                    break;
                };
                (o.kind, Rc::clone(&o.callback))
            };

            if kind == OwnerKind::Tracking {
                // Subscriptions are rebuilt from scratch on every run so that
                // dependencies dropped by this run stop notifying the owner.
                self.unlink_sources(owner);
                let children = {
                    let mut owners = self.owners.borrow_mut();
                    match owners.get_mut(owner) {
                        Some(o) => std::mem::take(&mut o.children),
                        None => break,
                    }
                };
                for child in children {
                    self.dispose_owner(child);
                }
                self.tracking.borrow_mut().push(Some(owner));
            }

            let result = catch_unwind(AssertUnwindSafe(|| callback()));

            if kind == OwnerKind::Tracking {
                self.tracking.borrow_mut().pop();
            }

            if let Err(payload) = result {
                tracing::error!(
                    target: "pulsar_reactive",
                    "reactive callback panicked: {}",
                    payload_message(&*payload)
                );
                if first_panic.is_none() {
                    first_panic = Some(payload);
                }
            }

            let mut owners = self.owners.borrow_mut();
            let Some(o) = owners.get_mut(owner) else {
                break;
            };
            if o.state == OwnerState::Disposed {
                break;
            }
            if o.rerun_requested {
                o.rerun_requested = false;
                o.chain_runs += 1;
                if o.chain_runs >= MAX_CONSECUTIVE_RUNS {
                    o.state = OwnerState::Waiting;
                    drop(owners);
                    tracing::warn!(
                        target: "pulsar_reactive",
                        runs = MAX_CONSECUTIVE_RUNS,
                        "reactive update did not settle; aborting the \
                         notification chain"
                    );
                    break;
                }
                // Loop around and run again; state stays Running.
            } else {
                o.chain_runs = 0;
                o.state = OwnerState::Waiting;
                break;
            }
        }

        match first_panic {
            Some(payload) => Err(payload),
            None => Ok(()),
        }
    }

    /// Drain the pending owners accumulated during a batch window, each
    /// unique owner exactly once, in first-insertion order. Panics do not
    /// stop the drain; the first one is re-raised afterwards.
    pub fn drain_pending(&self) {
        let pending = self.pending.take();
        let mut first_panic: Option<PanicPayload> = None;
        for owner in pending {
            if let Err(payload) = self.run_owner(owner) {
                if first_panic.is_none() {
                    first_panic = Some(payload);
                }
            }
        }
        if let Some(payload) = first_panic {
            std::panic::resume_unwind(payload);
        }
    }

    pub fn invalidate_memo(&self, memo: MemoId) {
        if let Some(m) = self.memos.borrow_mut().get_mut(memo) {
            m.dirty = true;
        }
    }

    /// The memo read contract: return the cached value when clean (mirroring
    /// the memo's dependencies onto the outer reader), otherwise recompute
    /// under a fresh invalidation owner.
    pub fn read_memo(&self, memo: MemoId) -> Option<Rc<dyn Any>> {
        let (dirty, cached, dependencies, owner, computing) = {
            let memos = self.memos.borrow();
            let m = memos.get(memo)?;
            (
                m.dirty,
                m.value.clone(),
                m.dependencies.clone(),
                m.owner,
                m.computing,
            )
        };

        if computing {
            crate::debug_warn!(
                "memo read during its own computation; returning the \
                 previous cached value"
            );
            return cached;
        }

        let outer = self.current_owner();

        if !dirty {
            if let Some(value) = cached {
                // A clean hit still subscribes the outer reader to the memo's
                // dependencies, so mutating one of them re-runs the reader.
                if let Some(outer) = outer {
                    if Some(outer) != owner {
                        for dep in &dependencies {
                            self.link(*dep, outer);
                        }
                    }
                }
                return Some(value);
            }
        }

        // Recompute: retire the previous invalidation owner and install a
        // fresh one whose only job is to flip the dirty flag. The owner is a
        // root on purpose: parenting it to the reader would let a transient
        // reader's re-run sever the memo's invalidation channel.
        if let Some(old) = owner {
            self.dispose_owner(old);
        }
        let invalidate: Rc<dyn Fn()> = Rc::new(move || {
            with_runtime(|runtime| runtime.invalidate_memo(memo));
        });
        let new_owner = self.create_owner(OwnerKind::Tracking, false, invalidate);

        let compute = {
            let mut memos = self.memos.borrow_mut();
            let m = memos.get_mut(memo)?;
            m.owner = Some(new_owner);
            m.computing = true;
            Rc::clone(&m.compute)
        };

        self.tracking.borrow_mut().push(Some(new_owner));
        let result = catch_unwind(AssertUnwindSafe(|| compute()));
        self.tracking.borrow_mut().pop();
        if let Some(m) = self.memos.borrow_mut().get_mut(memo) {
            m.computing = false;
        }
        let value = match result {
            Ok(value) => value,
            Err(payload) => std::panic::resume_unwind(payload),
        };

        let new_deps: Vec<SignalId> = {
            let owners = self.owners.borrow();
            owners
                .get(new_owner)
                .map(|o| o.sources.iter().copied().collect())
                .unwrap_or_default()
        };
        {
            let mut memos = self.memos.borrow_mut();
            if let Some(m) = memos.get_mut(memo) {
                m.dependencies = new_deps.clone();
                m.value = Some(Rc::clone(&value));
                m.dirty = false;
            }
        }
        if let Some(outer) = outer {
            for dep in &new_deps {
                self.link(*dep, outer);
            }
        }
        Some(value)
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

/// Clears every arena, stack, queue and counter of the thread's runtime,
/// returning it to a freshly created state. The debug flag survives.
pub fn reset_runtime() {
    with_runtime(|runtime| {
        runtime.signals.take();
        runtime.memos.take();
        runtime.owners.take();
        runtime.tracking.take();
        runtime.batch_depth.set(0);
        runtime.pending.take();
        runtime.keyed_frames.take();
        runtime.anon_frames.take();
        runtime.frame_requested.set(false);
        runtime.hid.set(0);
        runtime.boot_values.take();
    });
}
