//! Structural merge of frame templates.
//!
//! Objects merge key by key at every depth and arrays merge index by index;
//! wherever both sides hold a value that is not a container of the same kind,
//! the overlay wins. The result is a fresh value that shares nothing with
//! either input.

use serde_json::Value;

#[must_use]
pub fn deep_merge(base: &Value, overlay: &Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            let mut merged = base_map.clone();
            for (key, overlay_value) in overlay_map {
                let value = match base_map.get(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => overlay_value.clone(),
                };
                merged.insert(key.clone(), value);
            }
            Value::Object(merged)
        }
        (Value::Array(base_items), Value::Array(overlay_items)) => {
            let mut merged: Vec<Value> = base_items
                .iter()
                .zip(overlay_items)
                .map(|(base_item, overlay_item)| deep_merge(base_item, overlay_item))
                .collect();
            let shared = merged.len();
            let tail = if overlay_items.len() > shared {
                &overlay_items[shared..]
            } else {
                &base_items[shared..]
            };
            merged.extend(tail.iter().cloned());
            Value::Array(merged)
        }
        (_, overlay) => overlay.clone(),
    }
}
