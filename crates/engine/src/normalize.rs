use serde_json::Value;

/// Render a JSON scalar the way the report expects: integer-valued numbers
/// without a fractional part, null as empty.
pub fn json_scalar_to_string(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 && f.abs() < 1e15 {
                    return format!("{}", f as i64);
                }
            }
            n.to_string()
        }
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Coerce a value that may be a scalar, a JSON-array-encoded string, or a
/// native JSON array into an ordered sequence of strings.
///
/// Applied identically to recognized and ground-truth values so position `i`
/// on one side lines up with position `i` on the other.
pub fn normalize_json(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(json_scalar_to_string).collect(),
        Value::String(s) => normalize_str(s),
        other => vec![json_scalar_to_string(other)],
    }
}

/// String variant: decodes JSON arrays, wraps anything else non-empty.
pub fn normalize_str(value: &str) -> Vec<String> {
    if value.is_empty() {
        return Vec::new();
    }
    if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(value) {
        return items.iter().map(json_scalar_to_string).collect();
    }
    vec![value.to_string()]
}

/// Encode a sequence back to its JSON-array string form; empty sequences
/// encode to the empty string, matching how blank cells are represented.
pub fn json_array_string(items: &[String]) -> String {
    if items.is_empty() {
        return String::new();
    }
    serde_json::to_string(items).unwrap_or_default()
}
