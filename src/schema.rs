//! Type schemas: the per-type field constraint tables.
//!
//! A schema declares, for each field of an entity type: whether the field is
//! required, whether its value is internationalizable, whether its value is
//! a format string expanded against the finished record, and an optional
//! single-hop inheritance source.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::{EngineError, Result};
use crate::value::{append_i18n_suffix, I18N_SUFFIX};

///
/// FieldSpec
///

/// Constraints for one field as authored in the schema file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldSpec {
    #[serde(default)]
    pub required: bool,

    #[serde(default)]
    pub i18n_okay: bool,

    #[serde(default)]
    pub format: bool,

    /// Either `"attr"` or `"fk_attr.child_attr"`; see [`InheritSpec`].
    #[serde(default)]
    pub inherit: Option<String>,
}

///
/// Field
///

/// One schema attribute with its constraints.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub spec: FieldSpec,
}

impl Field {
    pub fn is_i18n(&self) -> bool {
        self.spec.i18n_okay
    }

    pub fn is_required(&self) -> bool {
        self.spec.required
    }

    pub fn should_format(&self) -> bool {
        self.spec.format
    }

    /// The i18n-suffixed form of the field name.
    pub fn i18n_name(&self) -> String {
        append_i18n_suffix(&self.name)
    }

    /// The key the resolved value is stored under: the i18n-suffixed name
    /// for i18n fields, the plain name otherwise.
    pub fn normalized_name(&self) -> String {
        if self.is_i18n() {
            self.i18n_name()
        } else {
            self.name.clone()
        }
    }

    pub fn inherit(&self) -> Option<InheritSpec> {
        self.spec
            .inherit
            .as_deref()
            .map(|raw| InheritSpec::parse(raw, &self.name))
    }
}

///
/// InheritSpec
///

/// Parsed single-hop inheritance source.
///
/// `"fk_attr.child_attr"` reads `child_attr` on the record referenced by
/// `fk_attr`; a bare `"attr"` means both names are `attr`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InheritSpec {
    pub fk_attr: String,
    pub child_attr: String,
}

impl InheritSpec {
    pub fn parse(raw: &str, field_name: &str) -> Self {
        match raw.split_once('.') {
            Some((fk_attr, child_attr)) => Self {
                fk_attr: fk_attr.to_string(),
                child_attr: child_attr.to_string(),
            },
            None => Self {
                fk_attr: raw.to_string(),
                child_attr: field_name.to_string(),
            },
        }
    }
}

///
/// TypeSchema
///

/// The ordered set of fields for one entity type, keyed by field name.
#[derive(Debug, Clone)]
pub struct TypeSchema {
    pub name: String,
    fields: BTreeMap<String, Field>,
}

impl TypeSchema {
    pub fn new(name: impl Into<String>, specs: BTreeMap<String, FieldSpec>) -> Self {
        let fields = specs
            .into_iter()
            .map(|(field_name, spec)| {
                (
                    field_name.clone(),
                    Field {
                        name: field_name,
                        spec,
                    },
                )
            })
            .collect();
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Fields in sorted name order.
    pub fn fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.values()
    }

    pub fn get(&self, field_name: &str) -> Option<&Field> {
        self.fields.get(field_name)
    }

    /// Look up the field a record key belongs to, stripping the i18n suffix
    /// if present. `None` means the key is undeclared for this type.
    pub fn field_for_key(&self, key: &str) -> Option<&Field> {
        let base = key.strip_suffix(I18N_SUFFIX).unwrap_or(key);
        self.fields.get(base)
    }
}

///
/// SchemaRegistry
///

/// All type schemas, keyed by singular type name.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    types: BTreeMap<String, TypeSchema>,
}

impl SchemaRegistry {
    pub fn new(types: BTreeMap<String, TypeSchema>) -> Self {
        Self { types }
    }

    /// Build from the deserialized schema file shape:
    /// `type_name -> field_name -> spec`.
    pub fn from_specs(specs: BTreeMap<String, BTreeMap<String, FieldSpec>>) -> Self {
        let types = specs
            .into_iter()
            .map(|(type_name, fields)| (type_name.clone(), TypeSchema::new(type_name, fields)))
            .collect();
        Self { types }
    }

    pub fn get(&self, type_name: &str) -> Result<&TypeSchema> {
        self.types.get(type_name).ok_or_else(|| EngineError::KeyMissing {
            key: type_name.to_string(),
            context: "type schema registry".to_string(),
        })
    }

    pub fn type_names(&self) -> impl Iterator<Item = &String> {
        self.types.keys()
    }
}
