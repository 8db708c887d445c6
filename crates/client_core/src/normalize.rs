//! Shapes the different list envelopes the collection endpoints return into
//! one `{items, totalCount}` pair.
//!
//! Accepted inputs, outermost first:
//!
//! * a bare JSON array,
//! * `{data: [..], total?}`,
//! * `{data: {data: [..], total?}}`,
//! * an already normalized `{items: [..], totalCount}`.
//!
//! Anything else degrades to an empty page instead of an error.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

const SEQUENCE_KEYS: [&str; 2] = ["data", "items"];
const TOTAL_KEYS: [&str; 4] = ["total", "count", "totalCount", "total_count"];
const MAX_UNWRAP_DEPTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedResponse<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

impl<T> NormalizedResponse<T> {
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            total_count: 0,
        }
    }
}

/// Normalizes without decoding the individual items.
pub fn normalize_value(raw: Value) -> NormalizedResponse<Value> {
    let mut current = raw;
    let mut total = None;
    let mut depth = 0;

    let items = loop {
        match current {
            Value::Array(items) => break items,
            Value::Object(mut map) if depth < MAX_UNWRAP_DEPTH => {
                // Inner wrappers sit closer to the items, so their totals win.
                if let Some(found) = explicit_total(&map) {
                    total = Some(found);
                }
                let Some(next) = take_nested(&mut map) else {
                    break Vec::new();
                };
                current = next;
                depth += 1;
            }
            _ => break Vec::new(),
        }
    };

    let total_count = total.unwrap_or(items.len() as u64);
    NormalizedResponse { items, total_count }
}

/// Normalizes and decodes each item as `T`. Items that do not decode are dropped.
pub fn normalize<T: DeserializeOwned>(raw: Value) -> NormalizedResponse<T> {
    let NormalizedResponse { items, total_count } = normalize_value(raw);
    let items = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(decoded) => Some(decoded),
            Err(error) => {
                debug!(%error, "dropping collection item that does not match the record shape");
                None
            }
        })
        .collect();
    NormalizedResponse { items, total_count }
}

fn take_nested(map: &mut Map<String, Value>) -> Option<Value> {
    let key = SEQUENCE_KEYS
        .iter()
        .find(|key| matches!(map.get(**key), Some(Value::Array(_) | Value::Object(_))))?;
    map.remove(*key)
}

fn explicit_total(map: &Map<String, Value>) -> Option<u64> {
    TOTAL_KEYS
        .iter()
        .find_map(|key| map.get(*key).and_then(as_count))
}

fn as_count(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0)
                .map(|f| f as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
#[path = "tests/normalize_tests.rs"]
mod tests;
