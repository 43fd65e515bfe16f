use pulsar_reactive::{
    boot_signals, create_effect, create_serializable_signal, current_hid,
    next_hid, set_hid, snapshot_signals, SignalGet, SignalSet,
};
use std::{cell::Cell, rc::Rc};

#[test]
fn hids_are_monotonic() {
    let first = next_hid();
    let second = next_hid();
    assert!(second > first);
    assert_eq!(current_hid(), second);
}

#[test]
fn signals_are_stamped_with_creation_serials() {
    let (_name, _) = create_serializable_signal(String::from("a"));
    let before = current_hid();
    let (_age, _) = create_serializable_signal(30);
    assert_eq!(current_hid(), before + 1);
}

#[test]
fn snapshot_round_trips_without_notifying() {
    let (name, set_name) = create_serializable_signal(String::from("server"));
    let (age, set_age) = create_serializable_signal(30);

    let snapshot = snapshot_signals().expect("snapshot to serialize");

    // diverge from the snapshotted state
    set_name.set(String::from("client"));
    set_age.set(31);

    let runs = Rc::new(Cell::new(0));
    create_effect({
        let runs = Rc::clone(&runs);
        move || {
            name.track();
            age.track();
            runs.set(runs.get() + 1);
        }
    });
    assert_eq!(runs.get(), 1);

    boot_signals(&snapshot);

    // values restored, nobody notified
    assert_eq!(name.get(), "server");
    assert_eq!(age.get(), 30);
    assert_eq!(runs.get(), 1);
}

#[test]
fn boot_values_seed_signals_created_later() {
    // simulate a server run that created one serializable signal
    let (_greeting, set_greeting) =
        create_serializable_signal(String::from("hello"));
    set_greeting.set(String::from("hello from the server"));
    let snapshot = snapshot_signals().expect("snapshot to serialize");

    // tear the signal down and rewind the counter, standing in for a fresh
    // client runtime replaying the snapshot before building anything
    set_greeting.dispose();
    set_hid(0);
    boot_signals(&snapshot);

    let (hydrated, _) = create_serializable_signal(String::from("hello"));
    assert_eq!(hydrated.get(), "hello from the server");
    assert_eq!(current_hid(), 1);
}

#[test]
fn snapshots_only_cover_serializable_signals() {
    let (_plain, _) = pulsar_reactive::create_signal(1);
    let (_tracked, _) = create_serializable_signal(2);

    let snapshot = snapshot_signals().expect("snapshot to serialize");
    assert_eq!(snapshot.len(), 1);
}
