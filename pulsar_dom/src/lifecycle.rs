#![forbid(unsafe_code)]
//! Lifecycle hooks, valid inside a factory run by
//! [`execute`](crate::execute).

use crate::registry::with_registry;
use std::rc::Rc;

/// The callbacks collected while one component factory runs.
#[derive(Default)]
pub(crate) struct LifecycleSlot {
    pub mount: Vec<Box<dyn FnOnce()>>,
    pub cleanup: Vec<Box<dyn FnOnce()>>,
    pub update: Vec<Rc<dyn Fn()>>,
}

/// Registers a callback that runs as soon as the current factory returns its
/// element.
///
/// Outside a factory this is a no-op with a development diagnostic.
pub fn on_mount(f: impl FnOnce() + 'static) {
    let registered = with_registry(|registry| {
        let mut stack = registry.lifecycle_stack.borrow_mut();
        match stack.last_mut() {
            Some(slot) => {
                slot.mount.push(Box::new(f));
                true
            }
            None => false,
        }
    });
    if !registered {
        pulsar_reactive::debug_warn!(
            "on_mount called outside a component factory; ignoring"
        );
    }
}

/// Registers a callback that runs when the element returned by the current
/// factory is disposed.
///
/// Outside a factory this is a no-op with a development diagnostic.
pub fn on_cleanup(f: impl FnOnce() + 'static) {
    let registered = with_registry(|registry| {
        let mut stack = registry.lifecycle_stack.borrow_mut();
        match stack.last_mut() {
            Some(slot) => {
                slot.cleanup.push(Box::new(f));
                true
            }
            None => false,
        }
    });
    if !registered {
        pulsar_reactive::debug_warn!(
            "on_cleanup called outside a component factory; ignoring"
        );
    }
}

/// Registers a callback that runs when the same component id is executed
/// again, before the new factory body runs. An element disposed without ever
/// re-executing discards its update callbacks.
///
/// Outside a factory this is a no-op with a development diagnostic.
pub fn on_update(f: impl Fn() + 'static) {
    let registered = with_registry(|registry| {
        let mut stack = registry.lifecycle_stack.borrow_mut();
        match stack.last_mut() {
            Some(slot) => {
                slot.update.push(Rc::new(f));
                true
            }
            None => false,
        }
    });
    if !registered {
        pulsar_reactive::debug_warn!(
            "on_update called outside a component factory; ignoring"
        );
    }
}
