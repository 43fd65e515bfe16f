use pulsar_dom::{
    dispose_tree, wire, NodeKey, PropValue, ServerNode, ViewNode, WireSource,
};
use pulsar_reactive::{
    create_memo, create_signal, SignalGet, SignalSet, SignalUpdate,
};
use std::{cell::Cell, rc::Rc};

/// A test backend that counts property assignments, for observing that
/// unchanged values are not rewritten.
#[derive(Clone)]
struct CountingNode {
    inner: ServerNode,
    sets: Rc<Cell<usize>>,
}

impl CountingNode {
    fn new(tag: &str) -> Self {
        CountingNode {
            inner: ServerNode::element(tag),
            sets: Rc::new(Cell::new(0)),
        }
    }
}

impl PartialEq for CountingNode {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl ViewNode for CountingNode {
    fn key(&self) -> NodeKey {
        self.inner.key()
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn children(&self) -> Vec<Self> {
        Vec::new()
    }

    fn get_path(&self, path: &[String]) -> Option<PropValue> {
        self.inner.get_path(path)
    }

    fn set_path(&self, path: &[String], value: PropValue) {
        self.sets.set(self.sets.get() + 1);
        self.inner.set_path(path, value);
    }
}

#[test]
fn static_sources_write_once() {
    let el = ServerNode::element("div");
    let disposer = wire(&el, "title", WireSource::value("hello"));

    assert_eq!(el.prop("title"), Some(PropValue::Str("hello".into())));
    assert!(disposer.is_spent());
}

#[test]
fn signal_sources_track() {
    let doc = ServerNode::document();
    let el = ServerNode::element("span");
    doc.append_child(&el);

    let (count, set_count) = create_signal(0);
    wire(&el, "textContent", WireSource::signal(count));

    assert_eq!(el.prop("textContent"), Some(PropValue::Int(0)));

    set_count.set(7);
    assert_eq!(el.prop("textContent"), Some(PropValue::Int(7)));

    set_count.update(|n| *n *= 10);
    assert_eq!(el.prop("textContent"), Some(PropValue::Int(70)));
}

#[test]
fn memo_sources_track_their_dependencies() {
    let doc = ServerNode::document();
    let el = ServerNode::element("span");
    doc.append_child(&el);

    let (n, set_n) = create_signal(2);
    let doubled = create_memo(move || n.get() * 2);
    wire(&el, "textContent", WireSource::memo(doubled));

    assert_eq!(el.prop("textContent"), Some(PropValue::Int(4)));

    set_n.set(5);
    assert_eq!(el.prop("textContent"), Some(PropValue::Int(10)));
}

#[test]
fn getter_sources_track() {
    let doc = ServerNode::document();
    let el = ServerNode::element("span");
    doc.append_child(&el);

    let (first, set_first) = create_signal(String::from("Ada"));
    let (last, _) = create_signal(String::from("Lovelace"));
    wire(
        &el,
        "textContent",
        WireSource::getter(move || {
            format!("{} {}", first.get(), last.get())
        }),
    );

    assert_eq!(
        el.prop("textContent"),
        Some(PropValue::Str("Ada Lovelace".into()))
    );

    set_first.set(String::from("Augusta"));
    assert_eq!(
        el.prop("textContent"),
        Some(PropValue::Str("Augusta Lovelace".into()))
    );
}

#[test]
fn dotted_paths_navigate_nested_objects() {
    let doc = ServerNode::document();
    let el = ServerNode::element("div");
    doc.append_child(&el);

    let (color, set_color) = create_signal(String::from("red"));
    wire(&el, "style.color", WireSource::signal(color));
    wire(&el, "style.display", WireSource::value("block"));

    assert_eq!(el.prop("style.color"), Some(PropValue::Str("red".into())));
    assert_eq!(
        el.prop("style.display"),
        Some(PropValue::Str("block".into()))
    );

    set_color.set(String::from("blue"));
    assert_eq!(el.prop("style.color"), Some(PropValue::Str("blue".into())));
}

#[test]
fn unchanged_values_are_not_rewritten() {
    let el = CountingNode::new("span");
    let (a, _set_a) = create_signal(5);
    let (b, set_b) = create_signal(0);

    // reads b for tracking but derives its value from a alone
    wire(
        &el,
        "textContent",
        WireSource::getter(move || {
            b.track();
            a.get_untracked()
        }),
    );
    assert_eq!(el.sets.get(), 1);

    // re-runs produce the same value; the property must not be touched
    set_b.set(1);
    set_b.set(2);
    assert_eq!(el.sets.get(), 1);
}

#[test]
fn the_first_write_is_unconditional() {
    let el = CountingNode::new("span");
    // pre-seed the property with the value the wire will compute
    el.inner
        .set_path(&["textContent".to_string()], PropValue::Int(5));

    let (a, _set_a) = create_signal(5);
    wire(&el, "textContent", WireSource::signal(a));

    assert_eq!(el.sets.get(), 1);
}

#[test]
fn disposal_severs_the_binding() {
    let doc = ServerNode::document();
    let el = ServerNode::element("span");
    doc.append_child(&el);

    let (count, set_count) = create_signal(0);
    wire(&el, "textContent", WireSource::signal(count));
    assert_eq!(el.prop("textContent"), Some(PropValue::Int(0)));

    dispose_tree(&el);

    // must neither assign nor panic
    set_count.set(99);
    assert_eq!(el.prop("textContent"), Some(PropValue::Int(0)));
}

#[test]
fn disposer_handle_is_idempotent() {
    let doc = ServerNode::document();
    let el = ServerNode::element("span");
    doc.append_child(&el);

    let (count, set_count) = create_signal(0);
    let disposer = wire(&el, "textContent", WireSource::signal(count));

    disposer.dispose();
    disposer.dispose();
    assert!(disposer.is_spent());

    set_count.set(1);
    assert_eq!(el.prop("textContent"), Some(PropValue::Int(0)));
}

#[test]
fn detached_nodes_are_not_written() {
    let doc = ServerNode::document();
    let el = ServerNode::element("span");
    doc.append_child(&el);

    let (count, set_count) = create_signal(0);
    wire(&el, "textContent", WireSource::signal(count));

    doc.remove_child(&el);
    set_count.set(5);
    assert_eq!(el.prop("textContent"), Some(PropValue::Int(0)));

    // the subscription survives detachment, so reattaching resumes updates
    doc.append_child(&el);
    set_count.set(6);
    assert_eq!(el.prop("textContent"), Some(PropValue::Int(6)));
}

#[test]
fn a_wire_writing_its_own_dependency_is_clamped() {
    let doc = ServerNode::document();
    let el = ServerNode::element("span");
    doc.append_child(&el);

    let (c, set_c) = create_signal(0);
    wire(
        &el,
        "textContent",
        WireSource::getter(move || {
            let value = c.get();
            if value < 100_000 {
                set_c.set(value + 1);
            }
            value
        }),
    );

    // the chain was cut off at the wire's run bound instead of livelocking
    assert_eq!(c.get_untracked(), 50);
}
