//! Whole-record building.
//!
//! Order matters throughout. Mixin fields seed the record so that anything
//! resolved afterwards overrides them. The base template is applied after
//! concrete field resolution so explicit record data always wins over the
//! type-wide defaults, and so a template format string never has to expand
//! for a field a concrete value would have replaced anyway. Format fields
//! run last because they substitute from the rest of the finished record.

use std::collections::BTreeMap;

use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::format;
use crate::handler::TypeHandler;
use crate::resolve::field::{normalize_value, resolve_field, FieldContext};
use crate::schema::TypeSchema;
use crate::value::{
    I18nText, RawRecord, ResolvedRecord, ResolvedValue, KEY_ID, KEY_MIXIN, LANG_ENGLISH,
};

/// Build one resolved record.
#[allow(clippy::too_many_arguments)]
pub fn build_record(
    type_name: &str,
    record_id: &str,
    raw: &RawRecord,
    schema: &TypeSchema,
    base: &RawRecord,
    mixins: &BTreeMap<String, ResolvedRecord>,
    handler: &dyn TypeHandler,
    ctx: &FieldContext<'_>,
) -> Result<ResolvedRecord> {
    let mut record = ResolvedRecord::new();

    // Mixin seed: the record "extends" the already-resolved bundle.
    if let Some(value) = raw.get(KEY_MIXIN).filter(|v| !v.is_null()) {
        let mixin_id = value.as_str().ok_or_else(|| EngineError::SchemaViolation {
            detail: format!("'{KEY_MIXIN}' must hold a string id, got: {value}"),
        })?;
        let mixin = mixins.get(mixin_id).ok_or_else(|| EngineError::KeyMissing {
            key: mixin_id.to_string(),
            context: "mixins".to_string(),
        })?;
        for (key, seeded) in mixin.iter() {
            record.insert(key.clone(), seeded.clone());
        }
    }

    record.insert(KEY_ID, ResolvedValue::string(record_id));

    for field in schema.fields() {
        if let Some(value) = resolve_field(field, raw, ctx)? {
            record.insert(field.normalized_name(), value);
        }
    }

    apply_base_template(type_name, record_id, raw, schema, base, ctx, &mut record)?;
    materialize_formats(schema, &mut record)?;

    handler.customize(&mut record, raw, record_id, ctx.store)?;

    copy_english(schema, &mut record)?;

    Ok(record)
}

/// Fill unset fields from the per-type base template, expanding each value
/// as a format string over the record id and the raw attributes.
fn apply_base_template(
    type_name: &str,
    record_id: &str,
    raw: &RawRecord,
    schema: &TypeSchema,
    base: &RawRecord,
    ctx: &FieldContext<'_>,
    record: &mut ResolvedRecord,
) -> Result<()> {
    if base.is_empty() {
        return Ok(());
    }
    let namespace = format::raw_namespace(record_id, raw);
    for (attr, value) in base {
        let field = schema
            .field_for_key(attr)
            .ok_or_else(|| EngineError::SchemaViolation {
                detail: format!(
                    "base template attribute '{attr}' is not declared for type '{type_name}'"
                ),
            })?;
        if record.contains_key(&field.normalized_name()) {
            continue;
        }
        let JsonValue::String(template) = value else {
            return Err(EngineError::SchemaViolation {
                detail: format!("base template value for '{attr}' must be a format string, got: {value}"),
            });
        };
        let expanded = JsonValue::String(format::expand(template, &namespace)?);
        let normalized = normalize_value(field, attr, &expanded, ctx.phrases)?;
        record.insert(field.normalized_name(), normalized);
    }
    Ok(())
}

/// Expand every `format` field against the in-progress record.
fn materialize_formats(schema: &TypeSchema, record: &mut ResolvedRecord) -> Result<()> {
    for field in schema.fields() {
        if !field.should_format() {
            continue;
        }
        let key = field.normalized_name();
        let Some(current) = record.get(&key).cloned() else {
            continue;
        };
        let namespace = format::resolved_namespace(record);
        let formatted = match current {
            ResolvedValue::Plain(JsonValue::String(template)) => {
                ResolvedValue::string(format::expand(&template, &namespace)?)
            }
            ResolvedValue::I18n(text) => {
                let mut translations = BTreeMap::new();
                for (lang, template) in &text.translations {
                    translations.insert(lang.clone(), format::expand(template, &namespace)?);
                }
                // The formatted text no longer matches the source phrase, so
                // the provenance tag is dropped.
                ResolvedValue::I18n(I18nText {
                    translations,
                    phrase_id: None,
                })
            }
            ResolvedValue::Plain(other) => {
                return Err(EngineError::SchemaViolation {
                    detail: format!(
                        "format field '{}' must hold a string or i18n value, got: {other}",
                        field.name
                    ),
                });
            }
        };
        record.insert(key, formatted);
    }
    Ok(())
}

/// Copy the English translation of every present i18n field into the plain
/// attribute of the same base name, so English-only consumers need no i18n
/// awareness.
fn copy_english(schema: &TypeSchema, record: &mut ResolvedRecord) -> Result<()> {
    for field in schema.fields() {
        if !field.is_i18n() {
            continue;
        }
        let i18n_name = field.i18n_name();
        let Some(value) = record.get(&i18n_name) else {
            continue;
        };
        let text = value.as_i18n().ok_or_else(|| EngineError::SchemaViolation {
            detail: format!("field '{i18n_name}' should hold an i18n value"),
        })?;
        let english = text
            .english_text()
            .ok_or_else(|| EngineError::KeyMissing {
                key: LANG_ENGLISH.to_string(),
                context: format!("translations for field '{i18n_name}'"),
            })?
            .to_string();
        record.insert(field.name.clone(), ResolvedValue::string(english));
    }
    Ok(())
}
