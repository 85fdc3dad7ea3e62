//! Lenient accessors over upstream JSON.
//!
//! Upstream responses spell the same field several ways (`homeTeam`,
//! `home_team`, `teams.home`) and mix numbers with numeric strings. These
//! helpers keep that tolerance in one place.

use serde_json::Value;

/// Returns the payload of a response body: the `data` field when present,
/// otherwise the body itself.
pub fn extract_payload(body: Value) -> Value {
    match body {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// First non-null field among `names`.
pub fn field<'a>(value: &'a Value, names: &[&str]) -> Option<&'a Value> {
    names
        .iter()
        .filter_map(|name| value.get(*name))
        .find(|v| !v.is_null())
}

/// Follows a dotted path such as `state.score.current`.
pub fn path<'a>(value: &'a Value, dotted: &str) -> Option<&'a Value> {
    dotted
        .split('.')
        .try_fold(value, |current, segment| current.get(segment))
        .filter(|v| !v.is_null())
}

/// Integer from a number or a numeric string.
pub fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn as_u32(value: &Value) -> Option<u32> {
    as_i64(value).and_then(|n| u32::try_from(n).ok())
}

/// String from a string or a number; empty strings count as missing.
pub fn as_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub fn i64_field(value: &Value, names: &[&str]) -> Option<i64> {
    names
        .iter()
        .filter_map(|name| value.get(*name))
        .find_map(as_i64)
}

pub fn string_field(value: &Value, names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| value.get(*name))
        .find_map(as_string)
}

/// Name of a nested entity that is either an object with a `name` or a bare string.
pub fn name_of(value: &Value) -> Option<String> {
    match value {
        Value::Object(_) => string_field(value, &["name", "displayName", "fullName"]),
        other => as_string(other),
    }
}

/// Items of an array payload; a single object becomes a one-element list.
pub fn items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(values) => values.iter().collect(),
        Value::Object(_) => vec![value],
        _ => Vec::new(),
    }
}

/// Parses minute strings like `"45"`, `"45+2"` or `"90'"` into (minute, extra).
pub fn parse_minute(value: &Value) -> (Option<u32>, Option<u32>) {
    if let Some(minute) = value.as_u64() {
        return (u32::try_from(minute).ok(), None);
    }
    let Some(text) = value.as_str() else {
        return (None, None);
    };
    let cleaned = text.trim().trim_end_matches('\'');
    let mut parts = cleaned.splitn(2, '+');
    let minute = parts.next().and_then(|m| m.trim().parse().ok());
    let extra = parts.next().and_then(|m| m.trim().parse().ok());
    (minute, extra)
}
