#![forbid(unsafe_code)]
use crate::runtime::{payload_message, with_runtime};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Schedules an anonymous callback for the next frame flush.
///
/// Frame callbacks coalesce high-frequency writes: everything scheduled
/// within one frame window runs in a single pass at the frame boundary.
/// Without an animation-frame primitive the embedding drives the boundary by
/// calling [`flush_frames`]; with the `web` feature on wasm32 the first
/// schedule in a window requests an animation frame that flushes
/// automatically.
pub fn schedule_frame(f: impl FnOnce() + 'static) {
    with_runtime(|runtime| {
        runtime.anon_frames.borrow_mut().push(Box::new(f));
    });
    request_frame_driver();
}

/// Schedules a keyed callback for the next frame flush. At most one callback
/// per key survives a frame window: scheduling again under the same key
/// replaces the previous callback (last writer wins).
///
/// ```
/// # use pulsar_reactive::*;
/// # use std::{cell::Cell, rc::Rc};
/// let hits = Rc::new(Cell::new(0));
/// for _ in 0..3 {
///     let hits = Rc::clone(&hits);
///     schedule_frame_keyed("counter", move || hits.set(hits.get() + 1));
/// }
/// flush_frames();
/// assert_eq!(hits.get(), 1);
/// ```
pub fn schedule_frame_keyed(key: impl Into<String>, f: impl FnOnce() + 'static) {
    with_runtime(|runtime| {
        runtime
            .keyed_frames
            .borrow_mut()
            .insert(key.into(), Box::new(f));
    });
    request_frame_driver();
}

/// Drops the pending callback scheduled under `key`, if any. Returns whether
/// one was pending.
pub fn cancel_frame(key: &str) -> bool {
    with_runtime(|runtime| {
        runtime.keyed_frames.borrow_mut().shift_remove(key).is_some()
    })
}

/// Runs every pending frame callback: keyed callbacks first, in scheduling
/// order, then anonymous ones.
///
/// The queues are snapshotted and cleared before anything runs, so a
/// callback that re-schedules lands in the next frame, never the current
/// one. A panicking callback is reported and does not stop the flush.
pub fn flush_frames() {
    let (keyed, anon) = with_runtime(|runtime| {
        runtime.frame_requested.set(false);
        (
            runtime.keyed_frames.take(),
            runtime.anon_frames.take(),
        )
    });
    for (key, callback) in keyed {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
            tracing::error!(
                target: "pulsar_reactive::frame",
                key = %key,
                "frame callback panicked: {}",
                payload_message(&*payload)
            );
        }
    }
    for callback in anon {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
            tracing::error!(
                target: "pulsar_reactive::frame",
                "frame callback panicked: {}",
                payload_message(&*payload)
            );
        }
    }
}

/// Drops every pending frame callback without running it.
pub fn clear_frames() {
    with_runtime(|runtime| {
        runtime.keyed_frames.take();
        runtime.anon_frames.take();
        runtime.frame_requested.set(false);
    });
}

cfg_if::cfg_if! {
    if #[cfg(all(feature = "web", target_arch = "wasm32"))] {
        fn request_frame_driver() {
            use wasm_bindgen::JsCast;

            let already_requested =
                with_runtime(|runtime| runtime.frame_requested.replace(true));
            if already_requested {
                return;
            }
            let callback =
                wasm_bindgen::closure::Closure::once_into_js(flush_frames);
            if let Some(window) = web_sys::window() {
                let _ = window
                    .request_animation_frame(callback.as_ref().unchecked_ref());
            }
        }
    } else {
        fn request_frame_driver() {}
    }
}
