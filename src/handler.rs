//! Per-type customization handlers.
//!
//! Each entity type gets a typed handler resolved at startup from an
//! explicit registry; a declared type with no registered handler is a
//! startup error, never a runtime lookup failure. Most types need no
//! customization beyond schema-driven resolution.

use std::collections::HashMap;
use std::fmt;

use crate::error::{EngineError, Result};
use crate::format;
use crate::resolve::reference::resolve_reference;
use crate::store::RecordStore;
use crate::value::{RawRecord, ResolvedRecord, ResolvedValue};

/// Hook invoked on every record of a type after schema-driven resolution
/// and before validation.
pub trait TypeHandler {
    /// Collection keys (plural) the handler reads from the store, for
    /// type-order validation.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    fn customize(
        &self,
        record: &mut ResolvedRecord,
        raw: &RawRecord,
        record_id: &str,
        store: &RecordStore,
    ) -> Result<()>;
}

/// Handler for types with no custom resolution step.
pub struct NoopHandler;

impl TypeHandler for NoopHandler {
    fn customize(
        &self,
        _record: &mut ResolvedRecord,
        _raw: &RawRecord,
        _record_id: &str,
        _store: &RecordStore,
    ) -> Result<()> {
        Ok(())
    }
}

/// Materializes district display names from the referenced district type's
/// name formats.
pub struct DistrictHandler;

const DISTRICT_NAME_SOURCES: &[(&str, &str)] = &[
    ("name", "district_name_format"),
    ("name_short", "district_name_short_format"),
];

impl TypeHandler for DistrictHandler {
    fn dependencies(&self) -> Vec<String> {
        vec!["district_types".to_string()]
    }

    fn customize(
        &self,
        record: &mut ResolvedRecord,
        raw: &RawRecord,
        record_id: &str,
        store: &RecordStore,
    ) -> Result<()> {
        let reference = resolve_reference(raw, "district_type_id", store)?.ok_or_else(|| {
            EngineError::KeyMissing {
                key: "district_type_id".to_string(),
                context: "district record".to_string(),
            }
        })?;

        let namespace = format::raw_namespace(record_id, raw);
        for (target, source) in DISTRICT_NAME_SOURCES {
            let template = reference
                .record
                .get(source)
                .and_then(ResolvedValue::as_str)
                .ok_or_else(|| EngineError::KeyMissing {
                    key: (*source).to_string(),
                    context: format!("district type '{}'", reference.record_id),
                })?;
            let name = format::expand(template, &namespace)?;
            record.insert(*target, ResolvedValue::string(name));
        }
        Ok(())
    }
}

///
/// HandlerRegistry
///

/// Explicit mapping from singular type name to its handler.
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Box<dyn TypeHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_name: impl Into<String>, handler: Box<dyn TypeHandler>) {
        self.handlers.insert(type_name.into(), handler);
    }

    pub fn get(&self, type_name: &str) -> Option<&dyn TypeHandler> {
        self.handlers.get(type_name).map(Box::as_ref)
    }

    /// The standard table: every default type resolves without
    /// customization except districts.
    pub fn defaults() -> Self {
        let mut registry = Self::new();
        for type_name in [
            "area",
            "body",
            "category",
            "district_type",
            "election_method",
            "language",
            "office",
        ] {
            registry.register(type_name, Box::new(NoopHandler));
        }
        registry.register("district", Box::new(DistrictHandler));
        registry
    }
}

// Handlers are plain trait objects, so show the registered type names.
impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        f.debug_struct("HandlerRegistry").field("types", &types).finish()
    }
}
