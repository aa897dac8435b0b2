//! Exact structural comparison of assertion values.
//!
//! Equality is `serde_json::Value` equality: element-wise for arrays, key-wise
//! for hashes, exact for primitives. Floats carry no tolerance and integers
//! never equal floats.

use serde_json::Value;

/// Exact structural equality.
pub fn values_equal(actual: &Value, expected: &Value) -> bool {
    actual == expected
}

/// Path-level differences between `actual` and `expected`, for reports.
///
/// Returns an empty list when the values are equal.
pub fn differences(actual: &Value, expected: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect(actual, expected, "", &mut out);
    out
}

fn collect(actual: &Value, expected: &Value, path: &str, out: &mut Vec<String>) {
    if values_equal(actual, expected) {
        return;
    }
    match (actual, expected) {
        (Value::Array(actual_items), Value::Array(expected_items)) => {
            if actual_items.len() != expected_items.len() {
                out.push(format!(
                    "{} -> different number of elements: expected {}, got {}",
                    display_path(path),
                    expected_items.len(),
                    actual_items.len()
                ));
            }
            for (index, (a, e)) in actual_items.iter().zip(expected_items).enumerate() {
                collect(a, e, &format!("{path}[{index}]"), out);
            }
            let common = actual_items.len().min(expected_items.len());
            for (index, extra) in actual_items.iter().enumerate().skip(common) {
                out.push(format!("{path}[{index}] -> extra element: {extra}"));
            }
            for (index, missing) in expected_items.iter().enumerate().skip(common) {
                out.push(format!("{path}[{index}] -> missing element: {missing}"));
            }
        }
        (Value::Object(actual_map), Value::Object(expected_map)) => {
            for (key, e) in expected_map {
                match actual_map.get(key) {
                    Some(a) => collect(a, e, &format!("{path}.{key}"), out),
                    None => out.push(format!("{path}.{key} -> missing key")),
                }
            }
            for (key, a) in actual_map {
                if !expected_map.contains_key(key) {
                    out.push(format!("{path}.{key} -> extra key: {a}"));
                }
            }
        }
        _ => out.push(format!(
            "{} -> expected {expected}, got {actual}",
            display_path(path)
        )),
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "value" } else { path }
}
