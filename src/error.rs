//! Error types for the resolution engine.
//!
//! Every failure here is a build-time defect in the configuration data.
//! There is no recoverable class: errors propagate immediately, enriched at
//! each boundary with the record under construction, and abort the run.

use thiserror::Error;

/// Main error type for the resolution engine.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("schema violation: {detail}")]
    SchemaViolation { detail: String },

    #[error(
        "required field '{field}' {kind} on '{type_name}' record '{record_id}':\n{record}"
    )]
    MissingRequiredValue {
        field: String,
        kind: RequiredKind,
        type_name: String,
        record_id: String,
        record: String,
    },

    #[error("unresolved reference '{fk_attr}': no record '{record_id}' in collection '{collection}'")]
    UnresolvedReference {
        fk_attr: String,
        collection: String,
        record_id: String,
    },

    #[error("format expansion failed: no key '{key}' for format {format:?}, namespace:\n{namespace}")]
    FormatExpansion {
        key: String,
        format: String,
        namespace: String,
    },

    #[error("key missing: '{key}' ({context})")]
    KeyMissing { key: String, context: String },

    #[error("dependency cycle in type order: {chain}")]
    DependencyCycle { chain: String },

    #[error("type '{type_name}' is processed before its dependency '{depends_on}'")]
    TypeOrdering {
        type_name: String,
        depends_on: String,
    },

    #[error("no handler registered for type '{type_name}'")]
    MissingHandler { type_name: String },

    #[error("while building '{type_name}' record '{record_id}':\n{record}\ncaused by: {source}")]
    Record {
        type_name: String,
        record_id: String,
        record: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Wrap an error with the record it occurred on.
    pub fn with_record(self, type_name: &str, record_id: &str, record_dump: String) -> Self {
        EngineError::Record {
            type_name: type_name.to_string(),
            record_id: record_id.to_string(),
            record: record_dump,
            source: Box::new(self),
        }
    }
}

/// Which required-field check failed: the field is absent, or present but null.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredKind {
    Missing,
    Null,
}

impl std::fmt::Display for RequiredKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequiredKind::Missing => write!(f, "is missing"),
            RequiredKind::Null => write!(f, "is null"),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
