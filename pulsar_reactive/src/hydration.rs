#![forbid(unsafe_code)]
use crate::{
    runtime::{with_runtime, SerdeHooks},
    serialization::{Serializable, SerializationError},
    signal::{create_signal_node, ReadSignal, WriteSignal},
};
use rustc_hash::FxHashMap;
use std::{any::Any, cell::RefCell, collections::HashMap, rc::Rc};

/// Returns the next hydration id.
///
/// Hids are monotonically increasing integers handed out in creation order.
/// Because a server render and the client boot that hydrates it create their
/// reactive state in the same order, hids are stable across the two runs and
/// can be used to reconcile server-produced state.
pub fn next_hid() -> u64 {
    with_runtime(|runtime| {
        let next = runtime.hid.get() + 1;
        runtime.hid.set(next);
        next
    })
}

/// The current value of the hid counter, without advancing it.
pub fn current_hid() -> u64 {
    with_runtime(|runtime| runtime.hid.get())
}

/// Overwrites the hid counter. Called while replaying a boot snapshot.
pub fn set_hid(value: u64) {
    with_runtime(|runtime| runtime.hid.set(value));
}

/// Works like [`create_signal`](crate::create_signal), but additionally
/// registers the signal with the SSR snapshot machinery: its value is
/// included in [`snapshot_signals`] and restored by [`boot_signals`].
///
/// If a boot snapshot already delivered a value for this signal's serial,
/// the signal starts from that value instead of `value` (hydration); no
/// subscriber is notified by the seeding.
#[track_caller]
pub fn create_serializable_signal<T>(
    value: T,
) -> (ReadSignal<T>, WriteSignal<T>)
where
    T: Serializable + PartialEq + 'static,
{
    let equals: Rc<dyn Fn(&dyn Any, &dyn Any) -> bool> =
        Rc::new(|a: &dyn Any, b: &dyn Any| {
            match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            }
        });
    let hooks = SerdeHooks {
        dump: Rc::new(|value: &Rc<RefCell<dyn Any>>| {
            let value = value.borrow();
            let value = value
                .downcast_ref::<T>()
                .expect("serializable signal value to downcast");
            let json = value.to_json()?;
            serde_json::from_str::<serde_json::Value>(&json)
                .map_err(|e| SerializationError::Serialize(Rc::new(e)))
        }),
        restore: Rc::new(
            |slot: &Rc<RefCell<dyn Any>>, json: &serde_json::Value| {
                let parsed = T::from_json(&json.to_string())?;
                let mut slot = slot.borrow_mut();
                let slot = slot
                    .downcast_mut::<T>()
                    .expect("serializable signal value to downcast");
                *slot = parsed;
                Ok(())
            },
        ),
    };
    create_signal_node(value, Some(equals), Some(hooks))
}

/// Serializes every serializable signal to a `serial → value` map.
pub fn snapshot_signals(
) -> Result<HashMap<u64, serde_json::Value>, SerializationError> {
    let targets = serializable_signals();
    let mut out = HashMap::with_capacity(targets.len());
    for (serial, hooks, slot) in targets {
        out.insert(serial, (hooks.dump)(&slot)?);
    }
    Ok(out)
}

/// Replays a `serial → value` map produced by [`snapshot_signals`].
///
/// Live serializable signals whose serial appears in the map have their
/// value assigned directly, without notifying any subscriber. Values whose
/// signal does not exist yet are stashed and seed the matching
/// [`create_serializable_signal`] call when it happens.
pub fn boot_signals(values: &HashMap<u64, serde_json::Value>) {
    let mut remaining: FxHashMap<u64, serde_json::Value> =
        values.iter().map(|(k, v)| (*k, v.clone())).collect();
    for (serial, hooks, slot) in serializable_signals() {
        if let Some(json) = remaining.remove(&serial) {
            if let Err(err) = (hooks.restore)(&slot, &json) {
                crate::debug_warn!(
                    "failed to restore signal {serial} from snapshot: {err}"
                );
            }
        }
    }
    with_runtime(|runtime| {
        runtime.boot_values.borrow_mut().extend(remaining);
    });
}

// Collected up front so no arena borrow is held while user serde code runs.
fn serializable_signals() -> Vec<(u64, SerdeHooks, Rc<RefCell<dyn Any>>)> {
    with_runtime(|runtime| {
        let signals = runtime.signals.borrow();
        signals
            .iter()
            .filter_map(|(_, node)| {
                node.hooks
                    .clone()
                    .map(|hooks| (node.serial, hooks, Rc::clone(&node.value)))
            })
            .collect()
    })
}
