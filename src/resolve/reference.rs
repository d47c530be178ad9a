//! Foreign-key reference resolution against the global store.

use crate::error::{EngineError, Result};
use crate::plural;
use crate::store::RecordStore;
use crate::value::{RawRecord, ResolvedRecord};

/// Suffix every foreign-key attribute must carry.
pub const FK_SUFFIX: &str = "_id";

/// A resolved reference: the referenced type plus its record.
#[derive(Debug)]
pub struct Reference<'a> {
    pub type_name: String,
    pub record_id: String,
    pub record: &'a ResolvedRecord,
}

/// Look up the record referenced by `fk_attr` on `record`.
///
/// Returns `None` when the record carries no value for `fk_attr` — the
/// reference is optional at the record level. An attribute name without the
/// `_id` suffix is a schema-authoring defect, and a reference to a
/// collection or id not yet in the store is fatal: the referenced type must
/// already be fully resolved by the type-processing order.
pub fn resolve_reference<'a>(
    record: &RawRecord,
    fk_attr: &str,
    store: &'a RecordStore,
) -> Result<Option<Reference<'a>>> {
    let Some(type_name) = fk_attr.strip_suffix(FK_SUFFIX) else {
        return Err(EngineError::SchemaViolation {
            detail: format!("attribute '{fk_attr}' is not a foreign key (missing '{FK_SUFFIX}' suffix)"),
        });
    };

    let Some(value) = record.get(fk_attr).filter(|v| !v.is_null()) else {
        return Ok(None);
    };
    let record_id = value.as_str().ok_or_else(|| EngineError::SchemaViolation {
        detail: format!("foreign-key attribute '{fk_attr}' must hold a string id, got: {value}"),
    })?;

    let collection = plural::to_plural(type_name);
    let referenced = store
        .record(&collection, record_id)
        .ok_or_else(|| EngineError::UnresolvedReference {
            fk_attr: fk_attr.to_string(),
            collection: collection.clone(),
            record_id: record_id.to_string(),
        })?;

    Ok(Some(Reference {
        type_name: type_name.to_string(),
        record_id: record_id.to_string(),
        record: referenced,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ResolvedValue;
    use serde_json::json;
    use std::collections::BTreeMap;

    fn store_with_body() -> RecordStore {
        let mut record = ResolvedRecord::new();
        record.insert("id", ResolvedValue::string("sf_bos"));
        record.insert("name", ResolvedValue::string("Board of Supervisors"));
        let mut records = BTreeMap::new();
        records.insert("sf_bos".to_string(), record);
        let mut store = RecordStore::new();
        store.insert_collection("bodies", records).unwrap();
        store
    }

    #[test]
    fn test_resolves_referenced_record() {
        let store = store_with_body();
        let mut raw = RawRecord::new();
        raw.insert("body_id".to_string(), json!("sf_bos"));

        let reference = resolve_reference(&raw, "body_id", &store).unwrap().unwrap();
        assert_eq!(reference.type_name, "body");
        assert_eq!(reference.record_id, "sf_bos");
        assert_eq!(
            reference.record.get("name").and_then(ResolvedValue::as_str),
            Some("Board of Supervisors")
        );
    }

    #[test]
    fn test_absent_attribute_is_none() {
        let store = store_with_body();
        let raw = RawRecord::new();
        assert!(resolve_reference(&raw, "body_id", &store).unwrap().is_none());
    }

    #[test]
    fn test_malformed_attribute_name() {
        let store = store_with_body();
        let raw = RawRecord::new();
        let err = resolve_reference(&raw, "body", &store).unwrap_err();
        assert!(matches!(err, EngineError::SchemaViolation { .. }));
    }

    #[test]
    fn test_missing_target_is_fatal() {
        let store = store_with_body();
        let mut raw = RawRecord::new();
        raw.insert("body_id".to_string(), json!("nope"));
        let err = resolve_reference(&raw, "body_id", &store).unwrap_err();
        assert!(matches!(err, EngineError::UnresolvedReference { .. }));

        let mut raw = RawRecord::new();
        raw.insert("category_id".to_string(), json!("anything"));
        let err = resolve_reference(&raw, "category_id", &store).unwrap_err();
        assert!(matches!(err, EngineError::UnresolvedReference { .. }));
    }
}
