#![forbid(unsafe_code)]
use crate::runtime::{
    with_runtime, FxIndexSet, OwnerKind, SerdeHooks, SignalId, SignalNode,
};
use std::{any::Any, cell::RefCell, fmt, marker::PhantomData, rc::Rc};
use thiserror::Error;

/// Creates a signal, the basic reactive primitive.
///
/// A signal is a piece of data that may change over time and notifies the
/// computations that read it when it does. Returns a `(getter, setter)` pair:
/// a [`ReadSignal`] whose reads subscribe the running effect, and a
/// [`WriteSignal`] whose writes notify those subscribers.
///
/// Writes are filtered through `PartialEq`: setting a signal to a value equal
/// to the current one is a no-op. Use [`create_signal_with_options`] for a
/// custom (or no) equality predicate.
///
/// ```
/// # use pulsar_reactive::*;
/// let (count, set_count) = create_signal(0);
///
/// assert_eq!(count.get(), 0);
///
/// set_count.set(1);
/// assert_eq!(count.get(), 1);
///
/// // mutate in place with update()
/// set_count.update(|n| *n += 1);
/// assert_eq!(count.get(), 2);
/// ```
#[track_caller]
pub fn create_signal<T>(value: T) -> (ReadSignal<T>, WriteSignal<T>)
where
    T: PartialEq + 'static,
{
    let equals: Rc<dyn Fn(&dyn Any, &dyn Any) -> bool> =
        Rc::new(|a: &dyn Any, b: &dyn Any| {
            match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        });
    create_signal_node(value, Some(equals), None)
}

/// Works like [`create_signal`], but takes explicit [`SignalOptions`].
///
/// With `equals: None` (the default options) every write notifies, even when
/// the value is unchanged. This is the escape hatch for value types that do
/// not implement `PartialEq`.
#[track_caller]
pub fn create_signal_with_options<T>(
    value: T,
    options: SignalOptions<T>,
) -> (ReadSignal<T>, WriteSignal<T>)
where
    T: 'static,
{
    let equals = options.equals.map(|eq| {
        let erased: Rc<dyn Fn(&dyn Any, &dyn Any) -> bool> =
            Rc::new(move |a: &dyn Any, b: &dyn Any| {
                match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                    (Some(a), Some(b)) => eq(a, b),
                    _ => false,
                }
            });
        erased
    });
    create_signal_node(value, equals, None)
}

/// Works like [`create_signal`], but returns a single read-write handle
/// instead of the getter/setter pair.
///
/// ```
/// # use pulsar_reactive::*;
/// let count = create_rw_signal(0);
/// count.set(3);
/// assert_eq!(count.get(), 3);
/// ```
#[track_caller]
pub fn create_rw_signal<T>(value: T) -> RwSignal<T>
where
    T: PartialEq + 'static,
{
    let (read, _) = create_signal(value);
    RwSignal {
        id: read.id,
        ty: PhantomData,
    }
}

pub(crate) fn create_signal_node<T>(
    value: T,
    equals: Option<Rc<dyn Fn(&dyn Any, &dyn Any) -> bool>>,
    hooks: Option<SerdeHooks>,
) -> (ReadSignal<T>, WriteSignal<T>)
where
    T: 'static,
{
    with_runtime(|runtime| {
        let serial = runtime.hid.get() + 1;
        runtime.hid.set(serial);
        let value: Rc<RefCell<dyn Any>> = Rc::new(RefCell::new(value));
        let seeded = hooks.is_some();
        let id = runtime.signals.borrow_mut().insert(SignalNode {
            value: Rc::clone(&value),
            subscribers: FxIndexSet::default(),
            equals,
            serial,
            ty: std::any::type_name::<T>(),
            hooks,
        });
        if seeded {
            // A boot snapshot may carry a value for this serial; hydrate from
            // it without notifying anyone.
            let pending = runtime.boot_values.borrow_mut().remove(&serial);
            if let Some(json) = pending {
                let restore = runtime
                    .signals
                    .borrow()
                    .get(id)
                    .and_then(|node| node.hooks.clone());
                if let Some(hooks) = restore {
                    if let Err(err) = (hooks.restore)(&value, &json) {
                        crate::debug_warn!(
                            "failed to hydrate signal {serial}: {err}"
                        );
                    }
                }
            }
        }
        (
            ReadSignal {
                id,
                ty: PhantomData,
            },
            WriteSignal {
                id,
                ty: PhantomData,
            },
        )
    })
}

/// Options accepted by [`create_signal_with_options`].
pub struct SignalOptions<T> {
    /// Equality predicate used to filter writes. `None` disables filtering.
    pub equals: Option<Rc<dyn Fn(&T, &T) -> bool>>,
}

impl<T> Default for SignalOptions<T> {
    fn default() -> Self {
        Self { equals: None }
    }
}

impl<T> SignalOptions<T> {
    /// Options with a custom equality predicate.
    pub fn with_equals(f: impl Fn(&T, &T) -> bool + 'static) -> Self {
        Self {
            equals: Some(Rc::new(f)),
        }
    }
}

/// Errors produced when a signal handle outlives its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SignalError {
    /// The signal has been disposed, or the handle belongs to a runtime that
    /// has been reset.
    #[error("tried to access a signal that has been disposed")]
    Disposed,
}

/// The getter half of a signal.
///
/// Reading through this handle inside an effect or memo subscribes that
/// computation to the signal. The handle is `Copy` and can be moved freely
/// into closures.
pub struct ReadSignal<T>
where
    T: 'static,
{
    pub(crate) id: SignalId,
    pub(crate) ty: PhantomData<T>,
}

/// The setter half of a signal.
pub struct WriteSignal<T>
where
    T: 'static,
{
    pub(crate) id: SignalId,
    pub(crate) ty: PhantomData<T>,
}

/// A signal handle that can both read and write, for the cases where the
/// read/write segregation of [`create_signal`] is more ceremony than help.
pub struct RwSignal<T>
where
    T: 'static,
{
    pub(crate) id: SignalId,
    pub(crate) ty: PhantomData<T>,
}

macro_rules! impl_handle_traits {
    ($($ty:ident),*) => {
        $(
            impl<T> Clone for $ty<T> {
                fn clone(&self) -> Self {
                    *self
                }
            }

            impl<T> Copy for $ty<T> {}

            impl<T> fmt::Debug for $ty<T> {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.debug_tuple(stringify!($ty)).field(&self.id).finish()
                }
            }

            impl<T> PartialEq for $ty<T> {
                fn eq(&self, other: &Self) -> bool {
                    self.id == other.id
                }
            }

            impl<T> Eq for $ty<T> {}
        )*
    };
}

impl_handle_traits![ReadSignal, WriteSignal, RwSignal];

/// Clone the current value out of a reactive handle, subscribing the running
/// computation to it.
pub trait SignalGet {
    /// The inner value type.
    type Value;

    /// Clones and returns the current value, subscribing the running effect.
    ///
    /// # Panics
    /// Panics if the underlying signal has been disposed.
    #[track_caller]
    fn get(&self) -> Self::Value;

    /// Like `get`, but returns `None` instead of panicking when the signal is
    /// gone.
    fn try_get(&self) -> Option<Self::Value>;
}

/// Borrow the current value of a reactive handle, subscribing the running
/// computation to it.
pub trait SignalWith {
    /// The inner value type.
    type Value;

    /// Applies `f` to a reference to the current value, subscribing the
    /// running effect.
    ///
    /// # Panics
    /// Panics if the underlying signal has been disposed.
    #[track_caller]
    fn with<O>(&self, f: impl FnOnce(&Self::Value) -> O) -> O;

    /// Like `with`, but returns `None` instead of panicking when the signal
    /// is gone.
    fn try_with<O>(&self, f: impl FnOnce(&Self::Value) -> O) -> Option<O>;
}

/// Replace the value of a signal and notify subscribers.
pub trait SignalSet {
    /// The inner value type.
    type Value;

    /// Sets the value. The write is filtered through the signal's equality
    /// predicate: writing an equal value notifies nobody.
    #[track_caller]
    fn set(&self, new_value: Self::Value);

    /// Like `set`, but hands the value back when the signal is gone.
    fn try_set(&self, new_value: Self::Value) -> Option<Self::Value>;
}

/// Mutate the value of a signal in place and notify subscribers.
///
/// `update` always notifies: an in-place mutation cannot be compared against
/// the previous value without cloning it first.
pub trait SignalUpdate {
    /// The inner value type.
    type Value;

    /// Applies `f` to a mutable reference to the current value, then
    /// notifies subscribers.
    #[track_caller]
    fn update(&self, f: impl FnOnce(&mut Self::Value));

    /// Like `update`, returning whatever the closure returns, or `None` when
    /// the signal is gone (in which case `f` is not called).
    fn try_update<O>(
        &self,
        f: impl FnOnce(&mut Self::Value) -> O,
    ) -> Option<O>;
}

impl<T: 'static> ReadSignal<T> {
    pub(crate) fn try_with_inner<O>(
        &self,
        track: bool,
        f: impl FnOnce(&T) -> O,
    ) -> Result<O, SignalError> {
        with_runtime(|runtime| {
            if track {
                runtime.track_read(self.id);
            }
            let value = runtime
                .signals
                .borrow()
                .get(self.id)
                .map(|node| Rc::clone(&node.value))
                .ok_or(SignalError::Disposed)?;
            let value = value.borrow();
            let value =
                value.downcast_ref::<T>().ok_or(SignalError::Disposed)?;
            Ok(f(value))
        })
    }

    /// Subscribes the running effect to this signal without reading the
    /// value.
    pub fn track(&self) {
        with_runtime(|runtime| runtime.track_read(self.id));
    }

    /// Clones the value without subscribing anything.
    #[track_caller]
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.with_untracked(T::clone)
    }

    /// Like [`ReadSignal::get_untracked`] but returns `None` when the signal
    /// is gone.
    pub fn try_get_untracked(&self) -> Option<T>
    where
        T: Clone,
    {
        self.try_with_inner(false, T::clone).ok()
    }

    /// Applies `f` to the current value without subscribing anything.
    #[track_caller]
    pub fn with_untracked<O>(&self, f: impl FnOnce(&T) -> O) -> O {
        self.try_with_inner(false, f)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    /// Registers a plain callback that runs on every notification of this
    /// signal. This is the low-level subscription primitive; effects and
    /// wires are usually the better tool.
    ///
    /// The callback owner does not track anything and survives until the
    /// returned [`Subscription`] is unsubscribed or the signal is disposed.
    pub fn subscribe(&self, f: impl Fn() + 'static) -> Subscription {
        with_runtime(|runtime| {
            let owner =
                runtime.create_owner(OwnerKind::Manual, false, Rc::new(f));
            runtime.link(self.id, owner);
            Subscription { owner }
        })
    }
}

impl<T: 'static> SignalGet for ReadSignal<T>
where
    T: Clone,
{
    type Value = T;

    fn get(&self) -> T {
        self.with(T::clone)
    }

    fn try_get(&self) -> Option<T> {
        self.try_with(T::clone)
    }
}

impl<T: 'static> SignalWith for ReadSignal<T> {
    type Value = T;

    fn with<O>(&self, f: impl FnOnce(&T) -> O) -> O {
        self.try_with_inner(true, f)
            .unwrap_or_else(|err| panic!("{err}"))
    }

    fn try_with<O>(&self, f: impl FnOnce(&T) -> O) -> Option<O> {
        self.try_with_inner(true, f).ok()
    }
}

impl<T: 'static> WriteSignal<T> {
    /// Sets the value without notifying subscribers.
    pub fn set_untracked(&self, new_value: T) {
        let _ = self.write(new_value, false);
    }

    /// Mutates the value in place without notifying subscribers.
    pub fn update_untracked(&self, f: impl FnOnce(&mut T)) {
        let _ = self.mutate(f, false);
    }

    /// Disposes the signal: the subscriber set is cleared and every handle to
    /// it becomes inert.
    pub fn dispose(self) {
        with_runtime(|runtime| {
            runtime.signals.borrow_mut().remove(self.id);
        });
    }

    fn write(&self, new_value: T, notify: bool) -> Option<T> {
        with_runtime(|runtime| {
            let (value, equals) = {
                let signals = runtime.signals.borrow();
                match signals.get(self.id) {
                    Some(node) => {
                        (Rc::clone(&node.value), node.equals.clone())
                    }
                    None => return Some(new_value),
                }
            };
            if notify {
                if let Some(eq) = &equals {
                    let current = value.borrow();
                    if eq(&*current, &new_value) {
                        return None;
                    }
                }
            }
            {
                let mut current = value.borrow_mut();
                match current.downcast_mut::<T>() {
                    Some(slot) => *slot = new_value,
                    None => return Some(new_value),
                }
            }
            if notify {
                runtime.notify(self.id);
            }
            None
        })
    }

    fn mutate<O>(
        &self,
        f: impl FnOnce(&mut T) -> O,
        notify: bool,
    ) -> Option<O> {
        with_runtime(|runtime| {
            let value = runtime
                .signals
                .borrow()
                .get(self.id)
                .map(|node| Rc::clone(&node.value))?;
            let result = {
                let mut current = value.borrow_mut();
                let slot = current.downcast_mut::<T>()?;
                f(slot)
            };
            if notify {
                runtime.notify(self.id);
            }
            Some(result)
        })
    }
}

impl<T: 'static> SignalSet for WriteSignal<T> {
    type Value = T;

    fn set(&self, new_value: T) {
        let _ = self.write(new_value, true);
    }

    fn try_set(&self, new_value: T) -> Option<T> {
        self.write(new_value, true)
    }
}

impl<T: 'static> SignalUpdate for WriteSignal<T> {
    type Value = T;

    fn update(&self, f: impl FnOnce(&mut T)) {
        let _ = self.mutate(f, true);
    }

    fn try_update<O>(&self, f: impl FnOnce(&mut T) -> O) -> Option<O> {
        self.mutate(f, true)
    }
}

impl<T: 'static> RwSignal<T> {
    /// Returns the getter half of this signal.
    pub fn read_only(&self) -> ReadSignal<T> {
        ReadSignal {
            id: self.id,
            ty: PhantomData,
        }
    }

    /// Returns the setter half of this signal.
    pub fn write_only(&self) -> WriteSignal<T> {
        WriteSignal {
            id: self.id,
            ty: PhantomData,
        }
    }

    /// Splits the handle into a `(getter, setter)` pair.
    pub fn split(&self) -> (ReadSignal<T>, WriteSignal<T>) {
        (self.read_only(), self.write_only())
    }

    /// Subscribes the running effect to this signal without reading.
    pub fn track(&self) {
        self.read_only().track()
    }

    /// Clones the value without subscribing anything.
    #[track_caller]
    pub fn get_untracked(&self) -> T
    where
        T: Clone,
    {
        self.read_only().get_untracked()
    }

    /// Applies `f` to the current value without subscribing anything.
    #[track_caller]
    pub fn with_untracked<O>(&self, f: impl FnOnce(&T) -> O) -> O {
        self.read_only().with_untracked(f)
    }

    /// Sets the value without notifying subscribers.
    pub fn set_untracked(&self, new_value: T) {
        self.write_only().set_untracked(new_value)
    }

    /// See [`ReadSignal::subscribe`].
    pub fn subscribe(&self, f: impl Fn() + 'static) -> Subscription {
        self.read_only().subscribe(f)
    }

    /// Disposes the signal.
    pub fn dispose(self) {
        self.write_only().dispose()
    }
}

impl<T: 'static> SignalGet for RwSignal<T>
where
    T: Clone,
{
    type Value = T;

    fn get(&self) -> T {
        self.read_only().get()
    }

    fn try_get(&self) -> Option<T> {
        self.read_only().try_get()
    }
}

impl<T: 'static> SignalWith for RwSignal<T> {
    type Value = T;

    fn with<O>(&self, f: impl FnOnce(&T) -> O) -> O {
        self.read_only().with(f)
    }

    fn try_with<O>(&self, f: impl FnOnce(&T) -> O) -> Option<O> {
        self.read_only().try_with(f)
    }
}

impl<T: 'static> SignalSet for RwSignal<T> {
    type Value = T;

    fn set(&self, new_value: T) {
        self.write_only().set(new_value)
    }

    fn try_set(&self, new_value: T) -> Option<T> {
        self.write_only().try_set(new_value)
    }
}

impl<T: 'static> SignalUpdate for RwSignal<T> {
    type Value = T;

    fn update(&self, f: impl FnOnce(&mut T)) {
        self.write_only().update(f)
    }

    fn try_update<O>(&self, f: impl FnOnce(&mut T) -> O) -> Option<O> {
        self.write_only().try_update(f)
    }
}

/// Handle returned by [`ReadSignal::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    owner: crate::runtime::OwnerId,
}

impl Subscription {
    /// Removes the callback from the signal's subscriber set. Dropping the
    /// handle without calling this leaves the subscription alive.
    pub fn unsubscribe(self) {
        with_runtime(|runtime| runtime.dispose_owner(self.owner));
    }
}
