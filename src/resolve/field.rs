//! Per-field value resolution.
//!
//! The effective value of a field on a record is "mine, else my single
//! direct ancestor's": a direct value wins, otherwise the field may inherit
//! the already-resolved value of one referenced record. Inheritance never
//! chains further than that one hop.

use serde_json::Value as JsonValue;

use crate::error::{EngineError, Result};
use crate::resolve::reference::resolve_reference;
use crate::schema::{Field, SchemaRegistry};
use crate::store::{PhraseRegistry, RecordStore};
use crate::value::{I18nText, RawRecord, ResolvedValue, I18N_SUFFIX};

/// Shared lookups every resolution step needs.
pub struct FieldContext<'a> {
    pub schemas: &'a SchemaRegistry,
    pub store: &'a RecordStore,
    pub phrases: &'a PhraseRegistry,
}

/// Compute the effective value of `field` on `record`, or `None` if the
/// field stays unset.
pub fn resolve_field(
    field: &Field,
    record: &RawRecord,
    ctx: &FieldContext<'_>,
) -> Result<Option<ResolvedValue>> {
    let attr_name = direct_attr_name(field, record)?;
    if let Some(value) = record.get(&attr_name).filter(|v| !v.is_null()) {
        return Ok(Some(normalize_value(field, &attr_name, value, ctx.phrases)?));
    }

    let Some(inherit) = field.inherit() else {
        return Ok(None);
    };
    let Some(reference) = resolve_reference(record, &inherit.fk_attr, ctx.store)? else {
        return Ok(None);
    };

    let ref_schema = ctx.schemas.get(&reference.type_name)?;
    let ref_field = ref_schema.get(&inherit.child_attr).ok_or_else(|| {
        EngineError::SchemaViolation {
            detail: format!(
                "inherited field '{}' is not declared for type '{}'",
                inherit.child_attr, reference.type_name
            ),
        }
    })?;

    // Single hop: the referenced record is already resolved, so whatever it
    // inherited itself is baked in. No transitive walk happens here.
    Ok(reference.record.get(&ref_field.normalized_name()).cloned())
}

/// Pick the raw attribute to read a direct value from. For i18n fields the
/// suffixed form wins, and a record carrying both forms is a defect.
fn direct_attr_name(field: &Field, record: &RawRecord) -> Result<String> {
    if !field.is_i18n() {
        return Ok(field.name.clone());
    }
    let i18n_name = field.i18n_name();
    let has_i18n = is_set(record, &i18n_name);
    if has_i18n && is_set(record, &field.name) {
        return Err(EngineError::SchemaViolation {
            detail: format!(
                "both '{}' and '{}' are set; a record may carry only one form",
                field.name, i18n_name
            ),
        });
    }
    Ok(if has_i18n { i18n_name } else { field.name.clone() })
}

fn is_set(record: &RawRecord, attr: &str) -> bool {
    record.get(attr).is_some_and(|v| !v.is_null())
}

/// Normalize a raw value for `field` as read from attribute `attr_name`.
/// Non-i18n fields pass through unchanged.
pub(crate) fn normalize_value(
    field: &Field,
    attr_name: &str,
    value: &JsonValue,
    phrases: &PhraseRegistry,
) -> Result<ResolvedValue> {
    if !field.is_i18n() {
        return Ok(ResolvedValue::Plain(value.clone()));
    }
    Ok(ResolvedValue::I18n(normalize_i18n(attr_name, value, phrases)?))
}

/// Normalize a raw i18n attribute: the suffixed form carries a phrase id to
/// expand from the registry, the plain form carries the bare English text.
pub(crate) fn normalize_i18n(
    attr_name: &str,
    value: &JsonValue,
    phrases: &PhraseRegistry,
) -> Result<I18nText> {
    let JsonValue::String(text) = value else {
        return Err(EngineError::SchemaViolation {
            detail: format!("i18n attribute '{attr_name}' must hold a string, got: {value}"),
        });
    };
    if attr_name.ends_with(I18N_SUFFIX) {
        let translations = phrases.get(text)?.clone();
        Ok(I18nText::from_phrase(text.clone(), translations))
    } else {
        Ok(I18nText::english(text.clone()))
    }
}
