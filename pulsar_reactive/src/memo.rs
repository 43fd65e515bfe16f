#![forbid(unsafe_code)]
use crate::{
    runtime::{with_runtime, MemoId, MemoNode},
    SignalGet, SignalWith,
};
use std::{any::Any, fmt, marker::PhantomData, rc::Rc};

/// Creates a lazily cached derived value.
///
/// Unlike a derived closure, a memo runs its computation at most once per
/// invalidation no matter how many readers consult it, and it does not run at
/// all until the first read. Reading a memo inside an effect subscribes that
/// effect to the memo's own dependencies, so a write to one of them re-runs
/// the effect, which re-reads the memo, which recomputes.
///
/// ```
/// # use pulsar_reactive::*;
/// # use std::{cell::Cell, rc::Rc};
/// let (n, set_n) = create_signal(2);
/// let calls = Rc::new(Cell::new(0));
///
/// let squared = create_memo({
///     let calls = Rc::clone(&calls);
///     move || {
///         calls.set(calls.get() + 1);
///         n.get() * n.get()
///     }
/// });
///
/// assert_eq!(calls.get(), 0); // lazy: nothing has run yet
/// assert_eq!(squared.get(), 4);
/// assert_eq!(squared.get(), 4);
/// assert_eq!(calls.get(), 1); // cached
///
/// set_n.set(3);
/// assert_eq!(squared.get(), 9);
/// assert_eq!(calls.get(), 2);
/// ```
#[track_caller]
pub fn create_memo<T>(f: impl Fn() -> T + 'static) -> Memo<T>
where
    T: 'static,
{
    with_runtime(|runtime| {
        let compute: Rc<dyn Fn() -> Rc<dyn Any>> =
            Rc::new(move || Rc::new(f()) as Rc<dyn Any>);
        let id = runtime.memos.borrow_mut().insert(MemoNode {
            value: None,
            dirty: true,
            computing: false,
            dependencies: Vec::new(),
            owner: None,
            compute,
        });
        Memo {
            id,
            ty: PhantomData,
        }
    })
}

/// A lazily cached derived value; see [`create_memo`].
pub struct Memo<T>
where
    T: 'static,
{
    pub(crate) id: MemoId,
    pub(crate) ty: PhantomData<T>,
}

impl<T> Clone for Memo<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Memo<T> {}

impl<T> fmt::Debug for Memo<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Memo").field(&self.id).finish()
    }
}

impl<T> PartialEq for Memo<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Memo<T> {}

impl<T: 'static> Memo<T> {
    fn read(&self) -> Option<Rc<dyn Any>> {
        with_runtime(|runtime| runtime.read_memo(self.id))
    }

    /// Clones the cached value without subscribing the running computation.
    /// Recomputes first if the memo is stale.
    #[track_caller]
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        crate::untrack(|| self.get())
    }

    /// Applies `f` to the cached value without subscribing the running
    /// computation. Recomputes first if the memo is stale.
    #[track_caller]
    pub fn with_untracked<O>(&self, f: impl FnOnce(&T) -> O) -> O {
        crate::untrack(|| self.with(f))
    }
}

impl<T: 'static> SignalGet for Memo<T>
where
    T: Clone,
{
    type Value = T;

    fn get(&self) -> T {
        self.try_get()
            .expect("tried to access a memo that has been disposed")
    }

    fn try_get(&self) -> Option<T> {
        let value = self.read()?;
        value.downcast_ref::<T>().cloned()
    }
}

impl<T: 'static> SignalWith for Memo<T> {
    type Value = T;

    fn with<O>(&self, f: impl FnOnce(&T) -> O) -> O {
        self.try_with(f)
            .expect("tried to access a memo that has been disposed")
    }

    fn try_with<O>(&self, f: impl FnOnce(&T) -> O) -> Option<O> {
        let value = self.read()?;
        let value = value.downcast_ref::<T>()?;
        Some(f(value))
    }
}
