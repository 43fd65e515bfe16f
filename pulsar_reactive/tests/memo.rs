use pulsar_reactive::{
    create_effect, create_memo, create_signal, SignalGet, SignalSet,
    SignalWith,
};
use std::{cell::Cell, rc::Rc};

#[test]
fn memo_is_lazy_and_cached() {
    let calls = Rc::new(Cell::new(0));
    let (n, set_n) = create_signal(5);

    let factorial = create_memo({
        let calls = Rc::clone(&calls);
        move || {
            calls.set(calls.get() + 1);
            let mut result: u64 = 1;
            for i in 2..=n.get() {
                result *= i;
            }
            result
        }
    });

    // lazy: nothing has run yet
    assert_eq!(calls.get(), 0);

    assert_eq!(factorial.get(), 120);
    assert_eq!(factorial.get(), 120);
    assert_eq!(factorial.get(), 120);
    assert_eq!(calls.get(), 1);

    set_n.set(6);
    assert_eq!(factorial.get(), 720);
    assert_eq!(calls.get(), 2);
}

#[test]
fn memo_with_computed_value() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let c = create_memo(move || a.get() + b.get());
    assert_eq!(c.get(), 0);
    set_a.set(5);
    assert_eq!(c.get(), 5);
    set_b.set(1);
    assert_eq!(c.get(), 6);
}

#[test]
fn nested_memos() {
    let (a, set_a) = create_signal(0);
    let (b, set_b) = create_signal(0);
    let c = create_memo(move || a.get() + b.get());
    let d = create_memo(move || c.get() * 2);
    let e = create_memo(move || d.get() + 1);
    assert_eq!(d.get(), 0);
    set_a.set(5);
    assert_eq!(e.get(), 11);
    assert_eq!(d.get(), 10);
    assert_eq!(c.get(), 5);
    set_b.set(1);
    assert_eq!(e.get(), 13);
    assert_eq!(d.get(), 12);
    assert_eq!(c.get(), 6);
}

#[test]
fn effect_tracks_memo() {
    let (a, set_a) = create_signal(-1);
    let b = create_memo(move || a.with(|a| format!("Value is {a}")));

    let seen = Rc::new(Cell::new(String::new()));

    create_effect({
        let seen = Rc::clone(&seen);
        move || {
            seen.set(b.get());
        }
    });

    assert_eq!(b.get().as_str(), "Value is -1");
    assert_eq!(seen.take().as_str(), "Value is -1");

    set_a.set(1);

    assert_eq!(b.get().as_str(), "Value is 1");
    assert_eq!(seen.take().as_str(), "Value is 1");
}

#[test]
fn clean_reads_subscribe_later_readers() {
    let (a, set_a) = create_signal(1);
    let doubled = create_memo(move || a.get() * 2);

    // warm the cache outside any tracking scope
    assert_eq!(doubled.get(), 2);

    let runs = Rc::new(Cell::new(0));
    create_effect({
        let runs = Rc::clone(&runs);
        move || {
            // clean hit: still must subscribe this effect to `a`
            let _ = doubled.get();
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(runs.get(), 1);

    set_a.set(3);
    assert_eq!(runs.get(), 2);
    assert_eq!(doubled.get(), 6);
}

#[test]
fn memo_recomputes_only_on_dependency_change() {
    let calls = Rc::new(Cell::new(0));
    let (a, set_a) = create_signal(0);
    let (unrelated, set_unrelated) = create_signal(0);

    let m = create_memo({
        let calls = Rc::clone(&calls);
        move || {
            calls.set(calls.get() + 1);
            a.get() * 10
        }
    });

    assert_eq!(m.get(), 0);
    assert_eq!(calls.get(), 1);

    set_unrelated.set(7);
    assert_eq!(m.get(), 0);
    assert_eq!(calls.get(), 1);

    set_a.set(2);
    assert_eq!(m.get(), 20);
    assert_eq!(calls.get(), 2);
    let _ = unrelated;
}

#[test]
fn memo_with_untracked_does_not_subscribe() {
    let (a, set_a) = create_signal(1);
    let doubled = create_memo(move || a.get() * 2);
    let runs = Rc::new(Cell::new(0));

    create_effect({
        let runs = Rc::clone(&runs);
        move || {
            let _ = doubled.get_untracked();
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(runs.get(), 1);

    set_a.set(2);
    assert_eq!(runs.get(), 1);
    assert_eq!(doubled.get(), 4);
}
