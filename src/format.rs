//! Format-string expansion.
//!
//! Base templates and `format` fields carry `{key}` placeholders expanded
//! against a substitution namespace. `{{` and `}}` escape literal braces.
//! A reference to a key absent from the namespace aborts the build with the
//! format string and the full namespace attached.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::value::{RawRecord, ResolvedRecord, ResolvedValue, KEY_ID};

/// Expand `{key}` placeholders in `format` from `namespace`.
pub fn expand(format: &str, namespace: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(format.len());
    let mut chars = format.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => key.push(c),
                        // Unterminated placeholder.
                        None => return Err(missing(&key, format, namespace)),
                    }
                }
                match namespace.get(&key) {
                    Some(value) => out.push_str(value),
                    None => return Err(missing(&key, format, namespace)),
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    // Stray closing brace.
                    return Err(missing("}", format, namespace));
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

fn missing(key: &str, format: &str, namespace: &BTreeMap<String, String>) -> EngineError {
    EngineError::FormatExpansion {
        key: key.to_string(),
        format: format.to_string(),
        namespace: serde_json::to_string_pretty(namespace)
            .unwrap_or_else(|_| format!("{namespace:?}")),
    }
}

/// Substitution namespace from a record id plus the raw attributes.
///
/// Used by base-template expansion, where only the authored data is in
/// scope. The id is available as `{id}`.
pub fn raw_namespace(record_id: &str, raw: &RawRecord) -> BTreeMap<String, String> {
    let mut namespace: BTreeMap<String, String> = raw
        .iter()
        .map(|(key, value)| (key.clone(), render_json(value)))
        .collect();
    namespace.insert(KEY_ID.to_string(), record_id.to_string());
    namespace
}

/// Substitution namespace from the entire in-progress resolved record.
///
/// Used by `format` field materialization, so a format can reference other
/// already-resolved fields. I18n values substitute their English text.
pub fn resolved_namespace(record: &ResolvedRecord) -> BTreeMap<String, String> {
    record
        .iter()
        .map(|(key, value)| (key.clone(), render_value(value)))
        .collect()
}

fn render_json(value: &JsonValue) -> String {
    match value {
        JsonValue::Null => String::new(),
        JsonValue::String(s) => s.clone(),
        JsonValue::Bool(_) | JsonValue::Number(_) => value.to_string(),
        JsonValue::Array(_) | JsonValue::Object(_) => {
            serde_json::to_string(value).unwrap_or_default()
        }
    }
}

fn render_value(value: &ResolvedValue) -> String {
    match value {
        ResolvedValue::Plain(json) => render_json(json),
        ResolvedValue::I18n(text) => match text.english_text() {
            Some(english) => english.to_string(),
            None => serde_json::to_string(&text.translations).unwrap_or_default(),
        },
    }
}
