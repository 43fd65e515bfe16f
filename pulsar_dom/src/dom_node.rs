#![forbid(unsafe_code)]
//! The browser backend: real DOM nodes behind the [`ViewNode`] seam.

use crate::node::{NodeKey, PropValue, ViewNode};
use wasm_bindgen::{JsCast, JsValue};

/// The expando field carrying the node key on the JS object. Opaque to
/// everything but this backend.
const KEY_FIELD: &str = "__pulsarNodeKey";

/// A [`ViewNode`] over a real `web_sys::Node`.
///
/// The node key is stamped onto the JS object the first time a `DomNode`
/// wraps it, so re-wrapping the same element yields the same key and the
/// registry's disposer sets line up.
#[derive(Clone)]
pub struct DomNode {
    node: web_sys::Node,
    key: NodeKey,
}

impl DomNode {
    /// Wraps a DOM node, stamping a key onto it if it has none yet.
    pub fn new(node: web_sys::Node) -> Self {
        let existing =
            js_sys::Reflect::get(node.as_ref(), &JsValue::from_str(KEY_FIELD))
                .ok()
                .and_then(|value| value.as_f64());
        let key = match existing {
            Some(value) => NodeKey(value as u64),
            None => {
                let key = NodeKey::next();
                let _ = js_sys::Reflect::set(
                    node.as_ref(),
                    &JsValue::from_str(KEY_FIELD),
                    &JsValue::from_f64(key.0 as f64),
                );
                key
            }
        };
        DomNode { node, key }
    }

    /// The wrapped `web_sys::Node`.
    pub fn raw(&self) -> &web_sys::Node {
        &self.node
    }
}

impl PartialEq for DomNode {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for DomNode {}

impl std::fmt::Debug for DomNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DomNode").field("key", &self.key).finish()
    }
}

fn prop_to_js(value: &PropValue) -> JsValue {
    match value {
        PropValue::Null => JsValue::NULL,
        PropValue::Bool(value) => JsValue::from_bool(*value),
        PropValue::Int(value) => JsValue::from_f64(*value as f64),
        PropValue::Num(value) => JsValue::from_f64(*value),
        PropValue::Str(value) => JsValue::from_str(value),
    }
}

fn js_to_prop(value: JsValue) -> Option<PropValue> {
    if value.is_null() || value.is_undefined() {
        Some(PropValue::Null)
    } else if let Some(value) = value.as_bool() {
        Some(PropValue::Bool(value))
    } else if let Some(value) = value.as_f64() {
        Some(PropValue::Num(value))
    } else {
        value.as_string().map(PropValue::Str)
    }
}

impl ViewNode for DomNode {
    fn key(&self) -> NodeKey {
        self.key
    }

    fn is_connected(&self) -> bool {
        self.node.is_connected()
    }

    fn children(&self) -> Vec<Self> {
        let list = self.node.child_nodes();
        (0..list.length())
            .filter_map(|index| list.item(index))
            .map(DomNode::new)
            .collect()
    }

    fn get_path(&self, path: &[String]) -> Option<PropValue> {
        let mut target: JsValue = self.node.clone().into();
        for segment in path {
            target =
                js_sys::Reflect::get(&target, &JsValue::from_str(segment))
                    .ok()?;
            if target.is_undefined() {
                return None;
            }
        }
        js_to_prop(target)
    }

    fn set_path(&self, path: &[String], value: PropValue) {
        let Some((leaf, parents)) = path.split_last() else {
            return;
        };
        let mut target: JsValue = self.node.clone().into();
        for segment in parents {
            let next =
                js_sys::Reflect::get(&target, &JsValue::from_str(segment))
                    .unwrap_or(JsValue::UNDEFINED);
            target = if next.is_undefined() || next.is_null() {
                let fresh: JsValue = js_sys::Object::new().into();
                let _ = js_sys::Reflect::set(
                    &target,
                    &JsValue::from_str(segment),
                    &fresh,
                );
                fresh
            } else {
                next
            };
        }
        let _ = js_sys::Reflect::set(
            &target,
            &JsValue::from_str(leaf),
            &prop_to_js(&value),
        );
    }
}
