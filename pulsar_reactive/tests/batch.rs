use pulsar_reactive::{
    batch, create_effect, create_signal, SignalGet, SignalSet,
};
use std::{
    cell::{Cell, RefCell},
    panic::{catch_unwind, AssertUnwindSafe},
    rc::Rc,
};

#[test]
fn writes_in_a_batch_coalesce_into_one_pass() {
    let (count, set_count) = create_signal(0);
    let runs = Rc::new(Cell::new(0));

    create_effect({
        let runs = Rc::clone(&runs);
        move || {
            count.track();
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(runs.get(), 1);

    batch(|| {
        set_count.set(10);
        set_count.set(20);
        set_count.set(30);
    });

    assert_eq!(runs.get(), 2);
    assert_eq!(count.get(), 30);
}

#[test]
fn values_are_visible_inside_the_batch() {
    let (a, set_a) = create_signal(1);

    batch(|| {
        set_a.set(2);
        // the value lands immediately; only the notification waits
        assert_eq!(a.get(), 2);
    });
    assert_eq!(a.get(), 2);
}

#[test]
fn each_unique_subscriber_runs_once() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let both_runs = Rc::new(Cell::new(0));
    let a_runs = Rc::new(Cell::new(0));

    create_effect({
        let both_runs = Rc::clone(&both_runs);
        move || {
            a.track();
            b.track();
            both_runs.set(both_runs.get() + 1);
        }
    });
    create_effect({
        let a_runs = Rc::clone(&a_runs);
        move || {
            a.track();
            a_runs.set(a_runs.get() + 1);
        }
    });

    batch(|| {
        set_a.set(1);
        set_b.set(1);
        set_a.set(2);
    });

    assert_eq!(both_runs.get(), 2);
    assert_eq!(a_runs.get(), 2);
}

#[test]
fn nested_batches_merge_into_the_outer_window() {
    let (a, set_a) = create_signal(0);
    let runs = Rc::new(Cell::new(0));

    create_effect({
        let runs = Rc::clone(&runs);
        move || {
            a.track();
            runs.set(runs.get() + 1);
        }
    });

    batch(|| {
        set_a.set(1);
        batch(|| {
            set_a.set(2);
        });
        // the inner batch exit must not have flushed
        assert_eq!(runs.get(), 1);
        set_a.set(3);
    });

    assert_eq!(runs.get(), 2);
    assert_eq!(a.get(), 3);
}

#[test]
fn batch_returns_the_closure_result() {
    let (a, set_a) = create_signal(1);
    let result = batch(|| {
        set_a.set(5);
        a.get() * 2
    });
    assert_eq!(result, 10);
}

#[test]
fn subscribers_run_in_first_insertion_order() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let order = Rc::new(RefCell::new(Vec::new()));

    create_effect({
        let order = Rc::clone(&order);
        move || {
            a.track();
            order.borrow_mut().push("first");
        }
    });
    create_effect({
        let order = Rc::clone(&order);
        move || {
            b.track();
            order.borrow_mut().push("second");
        }
    });
    order.borrow_mut().clear();

    // writing b first queues its subscriber first
    batch(|| {
        set_b.set(1);
        set_a.set(1);
    });

    assert_eq!(order.borrow().as_slice(), ["second", "first"]);
}

#[test]
fn panicking_subscriber_is_reraised_after_the_drain() {
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

    let result = catch_unwind(AssertUnwindSafe(|| {
        batch(|| set_a.set(1));
    }));

    // the first panic resurfaces from the batch...
    assert!(result.is_err());
    // ...but only after the remaining subscribers ran
    assert_eq!(healthy_runs.get(), 2);
}
