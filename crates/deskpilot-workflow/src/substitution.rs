//! `{{key}}` placeholder resolution.
//!
//! Placeholders are replaced in every string nested anywhere inside a params
//! value. A key may be a dotted path (`capture.path`, `results.0`) into
//! objects and arrays. String values are inserted as-is; any other value is
//! inserted as compact JSON. A placeholder whose key does not resolve is left
//! untouched, so resolution is idempotent and can be applied in stages.

use regex::{Captures, Regex};
use serde_json::Value;
use std::sync::LazyLock;

use crate::types::Context;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*([\w\-]+(?:\.[\w\-]+)*)\s*\}\}").unwrap());

/// Return a copy of `value` with placeholders resolved against `context`.
///
/// Object keys are never rewritten; non-string scalars pass through.
pub fn resolve(value: &Value, context: &Context) -> Value {
    match value {
        Value::String(text) => Value::String(substitute(text, context)),
        Value::Array(items) => Value::Array(items.iter().map(|v| resolve(v, context)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), resolve(v, context)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve placeholders in a single string.
pub fn substitute(text: &str, context: &Context) -> String {
    if !text.contains("{{") {
        return text.to_string();
    }
    PLACEHOLDER_RE
        .replace_all(text, |caps: &Captures| match lookup(context, &caps[1]) {
            Some(value) => render(value),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn lookup<'a>(context: &'a Context, key: &str) -> Option<&'a Value> {
    // A literal key containing dots wins over path traversal.
    if let Some(value) = context.get(key) {
        return Some(value);
    }

    let mut segments = key.split('.');
    let mut current = context.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current)
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
