//! Resolved-record validation against the type schema.

use crate::error::{EngineError, RequiredKind, Result};
use crate::schema::TypeSchema;
use crate::value::{ResolvedRecord, I18N_SUFFIX, KEY_ID};

/// Check one resolved record: every key must name a declared field, every
/// required field must be present and non-null, and an i18n field stored
/// under its plain name must be a plain string (the English copy).
pub fn check_record(
    record: &ResolvedRecord,
    record_id: &str,
    type_name: &str,
    schema: &TypeSchema,
) -> Result<()> {
    for (key, value) in record.iter() {
        if key == KEY_ID {
            // Injected by the builder, never schema-declared.
            continue;
        }
        let field = schema
            .field_for_key(key)
            .ok_or_else(|| EngineError::SchemaViolation {
                detail: format!(
                    "field '{key}' is not defined for type '{type_name}':\n{}",
                    record.dump()
                ),
            })?;
        if field.is_i18n() && !key.ends_with(I18N_SUFFIX) && value.as_str().is_none() {
            return Err(EngineError::SchemaViolation {
                detail: format!(
                    "field '{key}' should be a plain string:\n{}",
                    record.dump()
                ),
            });
        }
    }

    for field in schema.fields() {
        if !field.is_required() {
            continue;
        }
        let kind = match record.get(&field.name) {
            None => RequiredKind::Missing,
            Some(value) if value.is_null() => RequiredKind::Null,
            Some(_) => continue,
        };
        return Err(EngineError::MissingRequiredValue {
            field: field.name.clone(),
            kind,
            type_name: type_name.to_string(),
            record_id: record_id.to_string(),
            record: record.dump(),
        });
    }

    Ok(())
}
