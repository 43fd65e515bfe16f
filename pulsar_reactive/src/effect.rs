#![forbid(unsafe_code)]
use crate::runtime::{with_runtime, OwnerId, OwnerKind};
use std::rc::Rc;

/// Effects run a chunk of code whenever the signals they read change.
///
/// `create_effect` runs the function once immediately, records every signal
/// read during that run, and re-runs the function whenever one of them is
/// written. On every run the dependency set is rebuilt from scratch, so a
/// branch that stops reading a signal also stops reacting to it.
///
/// Effects created inside another effect are owned by it: the parent's next
/// run (or disposal) disposes them first.
///
/// ```
/// # use pulsar_reactive::*;
/// # use std::{cell::Cell, rc::Rc};
/// let (a, set_a) = create_signal(0);
/// let runs = Rc::new(Cell::new(0));
///
/// create_effect({
///     let runs = Rc::clone(&runs);
///     move || {
///         a.track();
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
///
/// set_a.set(1);
/// assert_eq!(runs.get(), 2);
///
/// // equal writes are filtered out
/// set_a.set(1);
/// assert_eq!(runs.get(), 2);
/// ```
#[track_caller]
pub fn create_effect(f: impl Fn() + 'static) -> Effect {
    with_runtime(|runtime| {
        let id = runtime.create_owner(OwnerKind::Tracking, true, Rc::new(f));
        // The eager first run. A panic inside is reported at the dispatch
        // boundary like any other run.
        let _ = runtime.run_owner(id);
        Effect {
            owner: Owner(id),
        }
    })
}

/// An opaque handle to an effect owner on the tracking stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Owner(pub(crate) OwnerId);

impl Owner {
    /// How many times this owner has re-run back-to-back in the current
    /// notification chain. Zero once the owner has settled. Binding layers
    /// use this to attach context to runaway-update diagnostics.
    pub fn chain_runs(&self) -> u32 {
        with_runtime(|runtime| {
            runtime
                .owners
                .borrow()
                .get(self.0)
                .map(|o| o.chain_runs)
                .unwrap_or(0)
        })
    }

    /// Whether the owner is still alive.
    pub fn is_alive(&self) -> bool {
        with_runtime(|runtime| runtime.owners.borrow().contains_key(self.0))
    }
}

/// Disposer handle returned by [`create_effect`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Effect {
    owner: Owner,
}

impl Effect {
    /// The owner backing this effect.
    pub fn owner(&self) -> Owner {
        self.owner
    }

    /// Unsubscribes the effect from every signal it tracks and disposes the
    /// owners it created. Idempotent; after this returns the effect function
    /// will never run again.
    pub fn dispose(self) {
        with_runtime(|runtime| runtime.dispose_owner(self.owner.0));
    }
}

/// The innermost owner on the tracking stack, if a tracking scope is active.
pub fn current_owner() -> Option<Owner> {
    with_runtime(|runtime| runtime.current_owner().map(Owner))
}

/// Runs `f` with `owner` as the current tracking owner, so that every signal
/// read inside subscribes that owner.
pub fn run_in_scope<T>(owner: Owner, f: impl FnOnce() -> T) -> T {
    scoped(Some(owner.0), f)
}

/// Runs `f` in an untracked window: signal reads inside do not subscribe
/// anything.
///
/// ```
/// # use pulsar_reactive::*;
/// # use std::{cell::Cell, rc::Rc};
/// let (a, set_a) = create_signal(0);
/// let runs = Rc::new(Cell::new(0));
///
/// create_effect({
///     let runs = Rc::clone(&runs);
///     move || {
///         let _ = untrack(|| a.get());
///         runs.set(runs.get() + 1);
///     }
/// });
///
/// set_a.set(1);
/// assert_eq!(runs.get(), 1); // the untracked read did not subscribe
/// ```
pub fn untrack<T>(f: impl FnOnce() -> T) -> T {
    scoped(None, f)
}

fn scoped<T>(owner: Option<OwnerId>, f: impl FnOnce() -> T) -> T {
    // Keeps the tracking stack balanced even if `f` unwinds.
    struct StackGuard;

    impl Drop for StackGuard {
        fn drop(&mut self) {
            with_runtime(|runtime| {
                runtime.tracking.borrow_mut().pop();
            });
        }
    }

    with_runtime(|runtime| runtime.tracking.borrow_mut().push(owner));
    let _guard = StackGuard;
    f()
}
