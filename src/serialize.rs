//! Interchange-document serialization.

use serde_json::{json, Value as JsonValue};

use crate::error::Result;
use crate::store::{PhraseRegistry, RecordStore};

/// License notice stamped into every emitted document.
pub const DATABASE_LICENSE: &str = "The database consisting of this file is \
made available under the Public Domain Dedication and License v1.0 whose \
full text can be found at: \
http://www.opendatacommons.org/licenses/pddl/1.0/ .";

/// Assemble the full interchange document: every resolved collection, the
/// phrase registry, and the `_meta` block. All maps are BTree-backed, so the
/// output is byte-identical across runs over the same inputs.
pub fn to_interchange(store: &RecordStore, phrases: &PhraseRegistry) -> Result<JsonValue> {
    let mut root = serde_json::Map::new();
    for (collection_key, records) in store.iter() {
        root.insert(collection_key.clone(), serde_json::to_value(records)?);
    }
    root.insert("phrases".to_string(), serde_json::to_value(phrases)?);
    root.insert("_meta".to_string(), json!({ "license": DATABASE_LICENSE }));
    Ok(JsonValue::Object(root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{ResolvedRecord, ResolvedValue};
    use std::collections::BTreeMap;

    #[test]
    fn test_document_shape() {
        let mut record = ResolvedRecord::new();
        record.insert("id", ResolvedValue::string("sf_mayor"));
        record.insert("name", ResolvedValue::string("Mayor"));
        let mut records = BTreeMap::new();
        records.insert("sf_mayor".to_string(), record);
        let mut store = RecordStore::new();
        store.insert_collection("offices", records).unwrap();

        let mut translations = BTreeMap::new();
        translations.insert("en".to_string(), "Mayor".to_string());
        let mut phrases = BTreeMap::new();
        phrases.insert("office_mayor".to_string(), translations);
        let phrases = PhraseRegistry::new(phrases);

        let document = to_interchange(&store, &phrases).unwrap();
        assert_eq!(
            document["offices"]["sf_mayor"]["name"],
            serde_json::json!("Mayor")
        );
        assert_eq!(
            document["phrases"]["office_mayor"]["en"],
            serde_json::json!("Mayor")
        );
        assert_eq!(document["_meta"]["license"], serde_json::json!(DATABASE_LICENSE));
    }

    #[test]
    fn test_document_is_stable() {
        let store = RecordStore::new();
        let phrases = PhraseRegistry::default();
        let first = serde_json::to_string(&to_interchange(&store, &phrases).unwrap()).unwrap();
        let second = serde_json::to_string(&to_interchange(&store, &phrases).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
