//! The reactive kernel of the Pulsar UI runtime.
//!
//! ## Fine-grained reactivity
//!
//! Pulsar binds reactive values to individual pieces of the document, with
//! no virtual-DOM diff in between. This crate is the half of that story that
//! knows nothing about documents: mutable cells ("signals") track the
//! computations that read them ("effects"), and a write re-runs exactly
//! those computations.
//!
//! The building blocks:
//!
//! 1. *Signals:* [`create_signal`] returns a ([`ReadSignal`],
//!    [`WriteSignal`]) pair; [`create_rw_signal`] skips the read/write
//!    segregation.
//! 2. *Memos:* [`create_memo`] returns a lazily cached [`Memo`] that
//!    recomputes at most once per invalidation.
//! 3. *Effects:* [`create_effect`] runs immediately, then again whenever a
//!    signal it read is written.
//! 4. *Batches:* [`batch`] collapses many writes into one notification
//!    pass.
//! 5. *Frames:* [`schedule_frame`] / [`schedule_frame_keyed`] coalesce
//!    high-frequency work at the frame boundary.
//!
//! ### Example
//! ```
//! use pulsar_reactive::*;
//!
//! // a signal: returns a (getter, setter) pair
//! let (count, set_count) = create_signal(0);
//!
//! assert_eq!(count.get(), 0);
//! set_count.set(1);
//! assert_eq!(count.get(), 1);
//!
//! // a memo: cached, recomputes only when count changes
//! let double = create_memo(move || count.get() * 2);
//! assert_eq!(double.get(), 2);
//!
//! // this effect re-runs whenever count changes
//! create_effect(move || {
//!     println!("count = {}", count.get());
//! });
//! ```
//!
//! Everything here is single-threaded and synchronous: the runtime lives in
//! thread-local storage, and every entry point returns before control comes
//! back to the caller.

#![warn(missing_docs)]

mod batch;
mod diagnostics;
mod effect;
mod frame;
mod hydration;
mod memo;
mod runtime;
mod serialization;
mod signal;

pub use batch::*;
pub use diagnostics::*;
pub use effect::*;
pub use frame::*;
pub use hydration::*;
pub use memo::*;
pub use runtime::reset_runtime;
pub use serialization::*;
pub use signal::*;

/// Logs a warning in debug builds and compiles to nothing in release.
#[doc(hidden)]
#[macro_export]
macro_rules! debug_warn {
    ($($x:tt)*) => {
        {
            #[cfg(debug_assertions)]
            {
                tracing::warn!($($x)*)
            }
            #[cfg(not(debug_assertions))]
            {
                let _ = format_args!($($x)*);
            }
        }
    };
}
