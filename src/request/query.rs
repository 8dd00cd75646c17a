//! Form-style flattening of structured params and URL query merging.

use serde_json::{Map, Value};
use url::form_urlencoded;

/// Flatten structured fields into ordered `(key, value)` pairs.
///
/// Nested arrays and objects use bracket keys (`tags[0]`, `filter[status]`),
/// booleans become `1`/`0` and nulls are dropped.
pub fn flatten_fields(fields: &Map<String, Value>) -> Vec<(String, String)> {
    let mut out = Vec::with_capacity(fields.len());
    for (key, value) in fields {
        flatten_value(key.clone(), value, &mut out);
    }
    out
}

fn flatten_value(key: String, value: &Value, out: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Bool(b) => out.push((key, if *b { "1" } else { "0" }.to_string())),
        Value::Number(n) => out.push((key, n.to_string())),
        Value::String(s) => out.push((key, s.clone())),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                flatten_value(format!("{}[{}]", key, i), item, out);
            }
        }
        Value::Object(map) => {
            for (k, item) in map {
                flatten_value(format!("{}[{}]", key, k), item, out);
            }
        }
    }
}

/// Encode structured fields as an `application/x-www-form-urlencoded` query.
pub fn encode_fields(fields: &Map<String, Value>) -> String {
    let mut ser = form_urlencoded::Serializer::new(String::new());
    for (k, v) in flatten_fields(fields) {
        ser.append_pair(&k, &v);
    }
    ser.finish()
}

/// Append an already encoded query to `url`.
///
/// Joins with `&` when the URL already has a query and `?` otherwise. Trailing `&`
/// separators are dropped first and any `#fragment` is kept at the end.
pub fn merge_query(url: &str, query: &str) -> String {
    if query.is_empty() {
        return url.to_string();
    }
    let (base, fragment) = match url.find('#') {
        Some(i) => url.split_at(i),
        None => (url, ""),
    };
    let base = base.trim_end_matches('&');
    let sep = if base.ends_with('?') {
        ""
    } else if base.contains('?') {
        "&"
    } else {
        "?"
    };
    format!("{}{}{}{}", base, sep, query, fragment)
}
