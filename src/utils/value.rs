use serde_json::Value;

/// Render a JSON error value the way it reads in a toast: strings verbatim,
/// lists of messages comma-joined, everything else as compact JSON.
pub fn value_to_message(value: &Value) -> String {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        Value::Array(items) => items
            .iter()
            .map(value_to_message)
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    };
    strip_control_chars(raw)
}

/// Upper-case the first character, leaving the rest untouched.
pub fn capitalize(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn strip_control_chars(s: String) -> String {
    s.chars().filter(|c| !c.is_control()).collect()
}
