//! Record and value model.
//!
//! Raw records are attribute maps as authored in the configuration files.
//! Resolved records carry typed values: either a plain JSON scalar/list/map
//! passed through from the raw data, or an internationalized text value — a
//! map from language code to translation, optionally tagged with the phrase
//! id it was copied from. `BTreeMap` keeps iteration sorted everywhere;
//! sorted order is a correctness requirement (stable diagnostics, stable
//! serialized output), not a performance choice.

use std::collections::BTreeMap;

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value as JsonValue;

/// Suffix marking the internationalized form of an attribute name.
pub const I18N_SUFFIX: &str = "_i18n";

/// Language code of the reduction language.
pub const LANG_ENGLISH: &str = "en";

/// Key under which the record id is injected on every resolved record.
pub const KEY_ID: &str = "id";

/// Raw attribute naming the mixin a record extends from.
pub const KEY_MIXIN: &str = "mixin_id";

/// A raw record as authored: attribute name to scalar, list, or nested map.
pub type RawRecord = BTreeMap<String, JsonValue>;

pub fn append_i18n_suffix(name: &str) -> String {
    format!("{name}{I18N_SUFFIX}")
}

///
/// I18nText
///

/// An internationalized text value: language code to translation.
///
/// Built either from a bare English string or by copying a phrase registry
/// entry, in which case `phrase_id` records the provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct I18nText {
    pub translations: BTreeMap<String, String>,
    pub phrase_id: Option<String>,
}

impl I18nText {
    /// Wrap a bare English string.
    pub fn english(text: impl Into<String>) -> Self {
        let mut translations = BTreeMap::new();
        translations.insert(LANG_ENGLISH.to_string(), text.into());
        Self {
            translations,
            phrase_id: None,
        }
    }

    /// Copy a phrase registry entry, tagging it with the phrase id.
    pub fn from_phrase(phrase_id: impl Into<String>, translations: BTreeMap<String, String>) -> Self {
        Self {
            translations,
            phrase_id: Some(phrase_id.into()),
        }
    }

    pub fn english_text(&self) -> Option<&str> {
        self.translations.get(LANG_ENGLISH).map(String::as_str)
    }

    /// True when the value carries only the English translation.
    pub fn english_only(&self) -> bool {
        self.translations.len() == 1 && self.translations.contains_key(LANG_ENGLISH)
    }
}

impl Serialize for I18nText {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = self.translations.len() + usize::from(self.phrase_id.is_some());
        let mut map = serializer.serialize_map(Some(len))?;
        if let Some(id) = &self.phrase_id {
            map.serialize_entry("_id", id)?;
        }
        for (lang, text) in &self.translations {
            map.serialize_entry(lang, text)?;
        }
        map.end()
    }
}

///
/// ResolvedValue
///

/// A value on a resolved record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedValue {
    I18n(I18nText),
    Plain(JsonValue),
}

impl ResolvedValue {
    pub fn string(text: impl Into<String>) -> Self {
        ResolvedValue::Plain(JsonValue::String(text.into()))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResolvedValue::Plain(JsonValue::Null))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ResolvedValue::Plain(JsonValue::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn as_i18n(&self) -> Option<&I18nText> {
        match self {
            ResolvedValue::I18n(text) => Some(text),
            _ => None,
        }
    }
}

///
/// ResolvedRecord
///

/// The normalized, schema-validated form of one entity.
///
/// Keys are each field's normalized name, plus the injected `id` and, for
/// i18n fields, the plain English copy under the unsuffixed name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedRecord {
    fields: BTreeMap<String, ResolvedValue>,
}

impl ResolvedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ResolvedValue) {
        self.fields.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedValue> {
        self.fields.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResolvedValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Drop every i18n entry that carries only English content.
    ///
    /// The plain English copy of the field remains; purely-English content
    /// is not double-represented in the output.
    pub fn reduce_english_only(&mut self) {
        self.fields
            .retain(|_, value| !matches!(value, ResolvedValue::I18n(text) if text.english_only()));
    }

    /// Pretty-printed dump for diagnostics.
    pub fn dump(&self) -> String {
        serde_json::to_string_pretty(&self.fields).unwrap_or_else(|_| format!("{:?}", self.fields))
    }
}

/// Pretty-printed dump of a raw record for diagnostics.
pub fn dump_raw(record: &RawRecord) -> String {
    serde_json::to_string_pretty(record).unwrap_or_else(|_| format!("{record:?}"))
}
