use serde_json::Value;

/// Merges `overrides` onto `defaults`.
///
/// Objects merge key by key; a `null` override keeps the default and any
/// other override value replaces it.
pub fn deep_merge(defaults: Value, overrides: Value) -> Value {
    match (defaults, overrides) {
        (Value::Object(mut defaults), Value::Object(overrides)) => {
            for (key, override_value) in overrides {
                let value = match defaults.remove(&key) {
                    None => override_value,
                    Some(default_value) => deep_merge(default_value, override_value),
                };
                defaults.insert(key, value);
            }
            Value::Object(defaults)
        }
        (defaults, Value::Null) => defaults,
        (_, overrides) => overrides,
    }
}
