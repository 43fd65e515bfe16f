#![forbid(unsafe_code)]
use crate::runtime::with_runtime;

/// Collapses every signal write issued inside `f` into one notification
/// pass.
///
/// While the batch window is open, writes store their values immediately but
/// queue their subscribers instead of running them. When the outermost batch
/// exits, each unique subscriber runs exactly once, in first-insertion
/// order. Nested batches merge into the outer window.
///
/// A panicking subscriber does not stop the drain; the first panic is
/// re-raised once the remaining subscribers have run.
///
/// ```
/// # use pulsar_reactive::*;
/// # use std::{cell::Cell, rc::Rc};
/// let (count, set_count) = create_signal(0);
/// let runs = Rc::new(Cell::new(0));
///
/// create_effect({
///     let runs = Rc::clone(&runs);
///     move || {
///         count.track();
///         runs.set(runs.get() + 1);
///     }
/// });
/// assert_eq!(runs.get(), 1);
///
/// batch(|| {
///     set_count.set(10);
///     set_count.set(20);
///     set_count.set(30);
/// });
///
/// assert_eq!(runs.get(), 2); // one pass for three writes
/// assert_eq!(count.get(), 30);
/// ```
pub fn batch<T>(f: impl FnOnce() -> T) -> T {
    // Keeps the depth counter balanced if `f` unwinds; the pending set is
    // left queued for the next window in that case.
    struct DepthGuard;

    impl Drop for DepthGuard {
        fn drop(&mut self) {
            with_runtime(|runtime| {
                runtime.batch_depth.set(runtime.batch_depth.get() - 1);
            });
        }
    }

    with_runtime(|runtime| {
        runtime.batch_depth.set(runtime.batch_depth.get() + 1);
    });
    let result = {
        let _guard = DepthGuard;
        f()
    };
    with_runtime(|runtime| {
        if runtime.batch_depth.get() == 0 {
            runtime.drain_pending();
        }
    });
    result
}
