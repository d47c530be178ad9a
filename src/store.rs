//! Engine inputs and the global record store.
//!
//! The store is an explicit object passed by reference into every resolution
//! call — never a hidden singleton. It grows append-only, one collection per
//! type, as the graph builder finishes types in order; readers only ever see
//! collections that are already final. The one post-insert mutation is the
//! English-reduction pass, which runs once after the whole graph is built.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::value::{RawRecord, ResolvedRecord};

///
/// RecordStore
///

/// The global store: collection key (plural type name) to resolved records
/// keyed by id.
#[derive(Debug, Default, Serialize)]
#[serde(transparent)]
pub struct RecordStore {
    collections: BTreeMap<String, BTreeMap<String, ResolvedRecord>>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Finalize a collection. A collection is inserted exactly once and
    /// never replaced.
    pub fn insert_collection(
        &mut self,
        plural_name: impl Into<String>,
        records: BTreeMap<String, ResolvedRecord>,
    ) -> Result<()> {
        let plural_name = plural_name.into();
        if self.collections.contains_key(&plural_name) {
            return Err(EngineError::SchemaViolation {
                detail: format!("collection '{plural_name}' already finalized in the record store"),
            });
        }
        self.collections.insert(plural_name, records);
        Ok(())
    }

    pub fn collection(&self, plural_name: &str) -> Option<&BTreeMap<String, ResolvedRecord>> {
        self.collections.get(plural_name)
    }

    pub fn record(&self, plural_name: &str, record_id: &str) -> Option<&ResolvedRecord> {
        self.collections.get(plural_name)?.get(record_id)
    }

    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&String, &BTreeMap<String, ResolvedRecord>)> {
        self.collections.iter()
    }

    /// The English-reduction pass: strip the i18n wrapper from every field
    /// across the whole graph that resolved to English-only content.
    pub fn reduce_english_only(&mut self) {
        for records in self.collections.values_mut() {
            for record in records.values_mut() {
                record.reduce_english_only();
            }
        }
    }
}

///
/// PhraseRegistry
///

/// Phrase registry: text id to translations (language code to text).
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct PhraseRegistry {
    phrases: BTreeMap<String, BTreeMap<String, String>>,
}

impl PhraseRegistry {
    pub fn new(phrases: BTreeMap<String, BTreeMap<String, String>>) -> Self {
        Self { phrases }
    }

    pub fn get(&self, text_id: &str) -> Result<&BTreeMap<String, String>> {
        self.phrases.get(text_id).ok_or_else(|| EngineError::KeyMissing {
            key: text_id.to_string(),
            context: "phrase registry".to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

///
/// Raw input collections
///

/// One raw collection: its records plus the per-type base template from the
/// collection's metadata.
#[derive(Debug, Clone, Default)]
pub struct RawCollection {
    /// Base template applied to every record of the type after concrete
    /// field resolution; values are format strings.
    pub base: RawRecord,

    pub records: BTreeMap<String, RawRecord>,
}

/// Everything the engine consumes, loaded once per run and never mutated.
#[derive(Debug, Clone, Default)]
pub struct RawDataset {
    /// Collection key (plural type name) to raw collection.
    pub collections: BTreeMap<String, RawCollection>,

    /// Reusable attribute bundles, keyed by mixin id.
    pub mixins: BTreeMap<String, RawRecord>,

    pub phrases: PhraseRegistry,
}

impl RawDataset {
    pub fn collection(&self, plural_name: &str) -> Result<&RawCollection> {
        self.collections
            .get(plural_name)
            .ok_or_else(|| EngineError::KeyMissing {
                key: plural_name.to_string(),
                context: "raw record collections".to_string(),
            })
    }
}
