use pulsar_reactive::{
    create_effect, create_signal, current_owner, run_in_scope, untrack,
    SignalGet, SignalSet, SignalWith,
};
use std::{
    cell::{Cell, RefCell},
    rc::Rc,
};

#[test]
fn effect_runs_eagerly_and_on_change() {
    let (a, set_a) = create_signal(-1);

    // simulate an arbitrary side effect
    let b = Rc::new(RefCell::new(String::new()));

    create_effect({
        let b = Rc::clone(&b);
        move || {
            let formatted = a.with(|a| format!("Value is {a}"));
            *b.borrow_mut() = formatted;
        }
    });

    assert_eq!(b.borrow().as_str(), "Value is -1");

    set_a.set(1);

    assert_eq!(b.borrow().as_str(), "Value is 1");
}

#[test]
fn disposed_effect_never_runs_again() {
    let (a, set_a) = create_signal(0);
    let runs = Rc::new(Cell::new(0));

    let effect = create_effect({
        let runs = Rc::clone(&runs);
        move || {
            a.track();
            runs.set(runs.get() + 1);
        }
    });

    set_a.set(1);
    assert_eq!(runs.get(), 2);

    effect.dispose();
    set_a.set(2);
    set_a.set(3);
    assert_eq!(runs.get(), 2);
}

#[test]
fn dispose_is_idempotent() {
    let (a, set_a) = create_signal(0);
    let runs = Rc::new(Cell::new(0));

    let effect = create_effect({
        let runs = Rc::clone(&runs);
        move || {
            a.track();
            runs.set(runs.get() + 1);
        }
    });

    effect.dispose();
    effect.dispose();
    set_a.set(1);
    assert_eq!(runs.get(), 1);
}

#[test]
fn dropped_dependencies_stop_notifying() {
    let (a, set_a) = create_signal("A");
    let (b, set_b) = create_signal("B");
    let runs = Rc::new(Cell::new(0));

    create_effect({
        let runs = Rc::clone(&runs);
        move || {
            runs.set(runs.get() + 1);
            if a.get() == "A" {
                b.track();
            }
        }
    });
    assert_eq!(runs.get(), 1);

    set_a.set("A"); // filtered by equality
    assert_eq!(runs.get(), 1);

    set_b.set("X");
    assert_eq!(runs.get(), 2);

    set_a.set("Z"); // this run no longer reads b
    assert_eq!(runs.get(), 3);

    set_b.set("Y");
    assert_eq!(runs.get(), 3);
}

#[test]
fn nested_effects_are_disposed_with_their_parent_run() {
    let (outer, set_outer) = create_signal(0);
    let (inner, set_inner) = create_signal(0);
    let inner_runs = Rc::new(Cell::new(0));

    create_effect({
        let inner_runs = Rc::clone(&inner_runs);
        move || {
            outer.track();
            create_effect({
                let inner_runs = Rc::clone(&inner_runs);
                move || {
                    inner.track();
                    inner_runs.set(inner_runs.get() + 1);
                }
            });
        }
    });
    assert_eq!(inner_runs.get(), 1);

    set_inner.set(1);
    assert_eq!(inner_runs.get(), 2);

    // re-running the outer effect disposes the stale inner effect and
    // creates a fresh one
    set_outer.set(1);
    assert_eq!(inner_runs.get(), 3);

    set_inner.set(2);
    assert_eq!(inner_runs.get(), 4);
}

#[test]
fn untrack_mutes_reads() {
    let (a, set_a) = create_signal(-1);
    let seen = Rc::new(Cell::new(0));

    create_effect({
        let seen = Rc::clone(&seen);
        move || {
            seen.set(untrack(|| a.get()));
        }
    });

    set_a.set(1);
    assert_eq!(a.get(), 1);
    assert_eq!(seen.get(), -1);
}

#[test]
fn run_in_scope_attributes_reads_to_the_given_owner() {
    let (a, set_a) = create_signal(0);
    let (gate, set_gate) = create_signal(0);
    let runs = Rc::new(Cell::new(0));
    let captured = Rc::new(Cell::new(None));

    create_effect({
        let runs = Rc::clone(&runs);
        let captured = Rc::clone(&captured);
        move || {
            gate.track();
            runs.set(runs.get() + 1);
            captured.set(current_owner());
        }
    });
    assert_eq!(runs.get(), 1);

    // subscribe the effect's owner to `a` from outside the effect
    let owner = captured.get().expect("effect owner to be captured");
    run_in_scope(owner, || a.track());

    set_a.set(1);
    assert_eq!(runs.get(), 2);
    let _ = set_gate;
}

#[test]
fn self_triggering_effect_is_clamped() {
    let (c, set_c) = create_signal(0);
    let runs = Rc::new(Cell::new(0u32));

    create_effect({
        let runs = Rc::clone(&runs);
        move || {
            runs.set(runs.get() + 1);
            let value = c.get();
            if value < 100_000 {
                set_c.set(value + 1);
            }
        }
    });

    // the chain is aborted at the re-run bound instead of livelocking
    assert_eq!(runs.get(), 100);
    assert_eq!(c.get_untracked(), 100);
}

#[test]
fn panicking_subscriber_does_not_stop_the_pass() {
    let (a, set_a) = create_signal(0);
    let healthy_runs = Rc::new(Cell::new(0));

    create_effect(move || {
        if a.get() > 0 {
            panic!("boom");
        }
    });

    create_effect({
        let healthy_runs = Rc::clone(&healthy_runs);
        move || {
            a.track();
            healthy_runs.set(healthy_runs.get() + 1);
        }
    });
    assert_eq!(healthy_runs.get(), 1);

    // the first subscriber panics; the write itself does not, and the
    // second subscriber still runs
    set_a.set(1);
    assert_eq!(healthy_runs.get(), 2);

    // the panicking effect stays subscribed
    set_a.set(2);
    assert_eq!(healthy_runs.get(), 3);
}
