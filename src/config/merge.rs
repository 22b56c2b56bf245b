//! Deep merge of configuration tiers.
//!
//! Implements field-by-field merging where higher tier values override lower tier values.
//! Arrays are replaced entirely, not concatenated.

use serde_json::Value;

/// Deep merge two JSON values, with `overlay` taking precedence over `base`.
///
/// - Objects are merged recursively: keys in overlay override keys in base
/// - Arrays, strings, numbers, booleans, nulls are replaced entirely
/// - If overlay is null, the base value is preserved (null means "not specified")
///
/// # Example
/// ```
/// use serde_json::json;
/// use taskpoet::config::deep_merge;
///
/// let base = json!({
///     "namespace": "default",
///     "defaults": { "due": "eow" },
///     "plugins": ["example"]
/// });
/// let overlay = json!({
///     "defaults": { "due": "eod" },
///     "plugins": []
/// });
/// let result = deep_merge(base, overlay);
/// assert_eq!(
///     result,
///     json!({ "namespace": "default", "defaults": { "due": "eod" }, "plugins": [] })
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        // Both are objects: merge recursively
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                let merged_value = if let Some(base_value) = base_map.remove(&key) {
                    deep_merge(base_value, overlay_value)
                } else {
                    overlay_value
                };
                base_map.insert(key, merged_value);
            }
            Value::Object(base_map)
        }
        // Overlay is null: preserve base (null means "not specified")
        (base, Value::Null) => base,
        // Any other case: overlay replaces base entirely
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
///
/// Equivalent to folding `deep_merge` over the list.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, deep_merge)
}
