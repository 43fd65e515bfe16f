#![forbid(unsafe_code)]
//! Component execution: running factories with scoped lifecycle
//! registration and context.

use crate::{
    lifecycle::LifecycleSlot,
    node::ViewNode,
    registry::{
        payload_message, run_element_updates, with_registry, ComponentRecord,
    },
    wire::Disposer,
};
use rustc_hash::FxHashMap;
use std::{
    any::{Any, TypeId},
    panic::{catch_unwind, resume_unwind, AssertUnwindSafe},
};

/// One in-flight component factory on the component stack.
pub(crate) struct ComponentContext {
    pub id: String,
    pub parent: Option<String>,
    pub provides: FxHashMap<TypeId, Box<dyn Any>>,
}

/// Runs a component factory under a fresh component context.
///
/// While `factory` runs, [`on_mount`](crate::on_mount) /
/// [`on_cleanup`](crate::on_cleanup) / [`on_update`](crate::on_update)
/// register into this execution, and [`provide_context`] /
/// [`use_context`] resolve against it. When the factory returns its
/// element:
///
/// - mount callbacks run inline, in registration order, each isolated from
///   the others' panics;
/// - cleanup callbacks are attached to the element's disposer set, so
///   [`dispose_element`](crate::dispose_element) (or disposing an ancestor
///   tree) runs them;
/// - update callbacks are stored against the element and run the next time
///   the same `id` is executed.
///
/// A panicking factory propagates to the caller, after the lifecycle slot
/// and the component stack have been popped.
#[track_caller]
pub fn execute<N, F>(id: impl Into<String>, parent: Option<&str>, factory: F) -> N
where
    N: ViewNode,
    F: FnOnce() -> N,
{
    let id = id.into();
    let parent = parent.map(str::to_string);

    // Re-executing a live component id is an update of that component: its
    // previous element's update callbacks run before the new factory body.
    let previous = with_registry(|registry| {
        registry.components.borrow().get(&id).map(|record| record.node)
    });
    if let Some(previous) = previous {
        run_element_updates(previous);
    }

    with_registry(|registry| {
        registry.component_stack.borrow_mut().push(ComponentContext {
            id: id.clone(),
            parent: parent.clone(),
            provides: FxHashMap::default(),
        });
        registry
            .lifecycle_stack
            .borrow_mut()
            .push(LifecycleSlot::default());
    });

    let result = catch_unwind(AssertUnwindSafe(factory));

    // Success or panic: pop the lifecycle slot, then the component stack.
    let slot = with_registry(|registry| {
        let slot = registry.lifecycle_stack.borrow_mut().pop();
        registry.component_stack.borrow_mut().pop();
        slot
    })
    .unwrap_or_default();

    let element = match result {
        Ok(element) => element,
        Err(payload) => resume_unwind(payload),
    };

    for f in slot.mount {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(f)) {
            tracing::error!(
                target: "pulsar_dom",
                component = %id,
                "mount callback panicked: {}",
                payload_message(&*payload)
            );
        }
    }

    let key = element.key();
    with_registry(|registry| {
        if !slot.cleanup.is_empty() {
            let mut disposers = registry.disposers.borrow_mut();
            let entry = disposers.entry(key).or_default();
            for f in slot.cleanup {
                entry.push(Disposer::new(f));
            }
        }
        if !slot.update.is_empty() {
            registry
                .updates
                .borrow_mut()
                .entry(key)
                .or_default()
                .extend(slot.update);
        }
        registry
            .components
            .borrow_mut()
            .insert(id, ComponentRecord { parent, node: key });
    });
    element
}

/// The id of the innermost in-flight component factory, if any.
pub fn current_component_id() -> Option<String> {
    with_registry(|registry| {
        registry
            .component_stack
            .borrow()
            .last()
            .map(|context| context.id.clone())
    })
}

/// Stores a value on the innermost in-flight component context, retrievable
/// by [`use_context`] from this factory and the factories it executes.
///
/// Outside a factory this is a no-op with a development diagnostic.
pub fn provide_context<T>(value: T)
where
    T: Clone + 'static,
{
    let provided = with_registry(|registry| {
        let mut stack = registry.component_stack.borrow_mut();
        match stack.last_mut() {
            Some(context) => {
                context.provides.insert(TypeId::of::<T>(), Box::new(value));
                true
            }
            None => false,
        }
    });
    if !provided {
        pulsar_reactive::debug_warn!(
            "provide_context called outside a component factory; ignoring"
        );
    }
}

/// Looks up a context value by type, innermost factory first.
pub fn use_context<T>() -> Option<T>
where
    T: Clone + 'static,
{
    with_registry(|registry| {
        let stack = registry.component_stack.borrow();
        for context in stack.iter().rev() {
            if let Some(value) = context.provides.get(&TypeId::of::<T>()) {
                if let Some(value) = value.downcast_ref::<T>() {
                    return Some(value.clone());
                }
            }
        }
        None
    })
}
