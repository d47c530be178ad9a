//! Graph building: drives record resolution over every type, in order.
//!
//! There is no dependency analysis at resolution time; the builder relies on
//! a declared linear order of collection keys in which every type appears
//! after all types it can reference. The declared order is validated at
//! startup against the dependency graph inferred from the schemas' `inherit`
//! foreign keys and from handler-declared dependencies, so a misordering or
//! a genuine cycle surfaces as a named error before any record is built.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info};

use crate::error::{EngineError, Result};
use crate::handler::HandlerRegistry;
use crate::plural;
use crate::resolve::builder::build_record;
use crate::resolve::field::{normalize_i18n, FieldContext};
use crate::resolve::reference::FK_SUFFIX;
use crate::schema::SchemaRegistry;
use crate::store::{PhraseRegistry, RawDataset, RecordStore};
use crate::validate::check_record;
use crate::value::{dump_raw, RawRecord, ResolvedRecord, ResolvedValue, I18N_SUFFIX};

/// The standard type-processing order: independent types first, then the
/// types that reference them.
pub const DEFAULT_TYPE_ORDER: &[&str] = &[
    "areas",
    "district_types",
    "districts",
    "election_methods",
    "languages",
    "categories",
    "bodies",
    "offices",
];

///
/// GraphBuilder
///

#[derive(Debug)]
pub struct GraphBuilder {
    schemas: SchemaRegistry,
    order: Vec<String>,
    handlers: HandlerRegistry,
}

impl GraphBuilder {
    /// Create a builder, validating handler coverage and the declared type
    /// order up front.
    pub fn new(
        schemas: SchemaRegistry,
        order: Vec<String>,
        handlers: HandlerRegistry,
    ) -> Result<Self> {
        let builder = Self {
            schemas,
            order,
            handlers,
        };
        builder.validate_order()?;
        Ok(builder)
    }

    /// The standard configuration: default type order and handler table.
    pub fn with_defaults(schemas: SchemaRegistry) -> Result<Self> {
        Self::new(
            schemas,
            DEFAULT_TYPE_ORDER.iter().map(|s| s.to_string()).collect(),
            HandlerRegistry::defaults(),
        )
    }

    /// Resolve and validate every record of every type, in order, then run
    /// the English-reduction pass over the finished graph.
    pub fn build(&self, dataset: &RawDataset) -> Result<RecordStore> {
        let mixins = resolve_mixins(&dataset.mixins, &dataset.phrases)?;
        debug!("resolved {} mixins", mixins.len());

        let mut store = RecordStore::new();
        for collection_key in &self.order {
            let type_name = plural::to_singular(collection_key);
            info!("resolving type: {type_name} ({collection_key})");

            let schema = self.schemas.get(&type_name)?;
            let handler = self
                .handlers
                .get(&type_name)
                .ok_or_else(|| EngineError::MissingHandler {
                    type_name: type_name.clone(),
                })?;
            let collection = dataset.collection(collection_key)?;

            let ctx = FieldContext {
                schemas: &self.schemas,
                store: &store,
                phrases: &dataset.phrases,
            };
            let mut resolved = BTreeMap::new();
            // Sorted record ids for reproducibility when troubleshooting.
            for (record_id, raw) in &collection.records {
                let record = build_record(
                    &type_name,
                    record_id,
                    raw,
                    schema,
                    &collection.base,
                    &mixins,
                    handler,
                    &ctx,
                )
                .and_then(|record| {
                    check_record(&record, record_id, &type_name, schema)?;
                    Ok(record)
                })
                .map_err(|e| e.with_record(&type_name, record_id, dump_raw(raw)))?;
                resolved.insert(record_id.clone(), record);
            }

            debug!("resolved {} '{}' records", resolved.len(), type_name);
            store.insert_collection(collection_key.clone(), resolved)?;
        }

        store.reduce_english_only();
        Ok(store)
    }

    /// Validate the declared order: every type must have a schema and a
    /// handler, the inferred dependency graph must be acyclic, and every
    /// dependency must be processed before its dependents.
    fn validate_order(&self) -> Result<()> {
        let mut dependencies: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        // Positions are keyed by singular type name, like the dependency
        // map, so a collection key whose singular does not pluralize back
        // to it never breaks a lookup.
        let mut position: BTreeMap<String, usize> = BTreeMap::new();

        for (index, collection_key) in self.order.iter().enumerate() {
            let type_name = plural::to_singular(collection_key);
            let handler = self
                .handlers
                .get(&type_name)
                .ok_or_else(|| EngineError::MissingHandler {
                    type_name: type_name.clone(),
                })?;
            let schema = self.schemas.get(&type_name)?;

            let mut deps = BTreeSet::new();
            for field in schema.fields() {
                if let Some(inherit) = field.inherit() {
                    let referenced = inherit.fk_attr.strip_suffix(FK_SUFFIX).ok_or_else(|| {
                        EngineError::SchemaViolation {
                            detail: format!(
                                "inherit source '{}' on '{}.{}' is not a foreign key",
                                inherit.fk_attr, type_name, field.name
                            ),
                        }
                    })?;
                    deps.insert(referenced.to_string());
                }
            }
            for dep_key in handler.dependencies() {
                deps.insert(plural::to_singular(&dep_key));
            }
            deps.remove(&type_name);
            position.insert(type_name.clone(), index);
            dependencies.insert(type_name, deps);
        }

        check_acyclic(&dependencies)?;

        for (type_name, deps) in &dependencies {
            // Present by construction: position and dependencies share keys.
            let own = position[type_name.as_str()];
            for dep in deps {
                match position.get(dep) {
                    Some(dep_position) if *dep_position < own => {}
                    _ => {
                        return Err(EngineError::TypeOrdering {
                            type_name: type_name.clone(),
                            depends_on: dep.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

/// Depth-first cycle check over the inferred dependency graph.
fn check_acyclic(dependencies: &BTreeMap<String, BTreeSet<String>>) -> Result<()> {
    let mut finished = BTreeSet::new();
    let mut path = Vec::new();
    for type_name in dependencies.keys() {
        visit(type_name, dependencies, &mut finished, &mut path)?;
    }
    Ok(())
}

fn visit(
    type_name: &str,
    dependencies: &BTreeMap<String, BTreeSet<String>>,
    finished: &mut BTreeSet<String>,
    path: &mut Vec<String>,
) -> Result<()> {
    if finished.contains(type_name) {
        return Ok(());
    }
    if path.iter().any(|t| t == type_name) {
        let mut chain: Vec<&str> = path.iter().map(String::as_str).collect();
        chain.push(type_name);
        return Err(EngineError::DependencyCycle {
            chain: chain.join(" -> "),
        });
    }

    path.push(type_name.to_string());
    if let Some(deps) = dependencies.get(type_name) {
        for dep in deps {
            visit(dep, dependencies, finished, path)?;
        }
    }
    path.pop();
    finished.insert(type_name.to_string());

    Ok(())
}

/// Resolve the mixin collection up front.
///
/// Mixins carry no schema of their own: i18n-suffixed attributes go through
/// the usual phrase/English normalization so seeded values are
/// shape-compatible with field-resolved ones, everything else passes through
/// as a plain value.
fn resolve_mixins(
    mixins: &BTreeMap<String, RawRecord>,
    phrases: &PhraseRegistry,
) -> Result<BTreeMap<String, ResolvedRecord>> {
    let mut resolved = BTreeMap::new();
    for (mixin_id, raw) in mixins {
        let mut record = ResolvedRecord::new();
        for (attr, value) in raw {
            if value.is_null() {
                continue;
            }
            let value = if attr.ends_with(I18N_SUFFIX) {
                ResolvedValue::I18n(
                    normalize_i18n(attr, value, phrases)
                        .map_err(|e| e.with_record("mixin", mixin_id, dump_raw(raw)))?,
                )
            } else {
                ResolvedValue::Plain(value.clone())
            };
            record.insert(attr.clone(), value);
        }
        resolved.insert(mixin_id.clone(), record);
    }
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::NoopHandler;
    use crate::schema::FieldSpec;
    use crate::store::RawCollection;
    use serde_json::json;

    fn specs(fields: &[(&str, FieldSpec)]) -> BTreeMap<String, FieldSpec> {
        fields
            .iter()
            .map(|(name, spec)| (name.to_string(), spec.clone()))
            .collect()
    }

    fn registry_for(types: &[(&str, BTreeMap<String, FieldSpec>)]) -> SchemaRegistry {
        SchemaRegistry::from_specs(
            types
                .iter()
                .map(|(name, fields)| (name.to_string(), fields.clone()))
                .collect(),
        )
    }

    fn handlers_for(types: &[&str]) -> HandlerRegistry {
        let mut handlers = HandlerRegistry::new();
        for type_name in types {
            handlers.register(*type_name, Box::new(NoopHandler));
        }
        handlers
    }

    fn inherit(source: &str) -> FieldSpec {
        FieldSpec {
            inherit: Some(source.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_handler_is_a_startup_error() {
        let schemas = registry_for(&[("body", specs(&[]))]);
        let err = GraphBuilder::new(
            schemas,
            vec!["bodies".to_string()],
            HandlerRegistry::new(),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::MissingHandler { .. }));
    }

    #[test]
    fn test_order_violation_is_detected() {
        // Offices inherit from bodies, so bodies must come first.
        let schemas = registry_for(&[
            ("body", specs(&[("name", FieldSpec::default())])),
            ("office", specs(&[("name", inherit("body_id.name"))])),
        ]);
        let err = GraphBuilder::new(
            schemas,
            vec!["offices".to_string(), "bodies".to_string()],
            handlers_for(&["body", "office"]),
        )
        .unwrap_err();
        match err {
            EngineError::TypeOrdering {
                type_name,
                depends_on,
            } => {
                assert_eq!(type_name, "office");
                assert_eq!(depends_on, "body");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_dependency_cycle_is_named() {
        let schemas = registry_for(&[
            ("body", specs(&[("name", inherit("office_id.name"))])),
            ("office", specs(&[("name", inherit("body_id.name"))])),
        ]);
        let err = GraphBuilder::new(
            schemas,
            vec!["bodies".to_string(), "offices".to_string()],
            handlers_for(&["body", "office"]),
        )
        .unwrap_err();
        match err {
            EngineError::DependencyCycle { chain } => {
                assert!(chain.contains("body"));
                assert!(chain.contains("office"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_collection_key_need_not_round_trip_through_pluralizer() {
        // "fish" singularizes to itself but pluralizes to "fishs"; order
        // validation must work off the declared keys, including when a
        // later type depends on such a collection.
        let schemas = registry_for(&[
            ("fish", specs(&[("name", FieldSpec::default())])),
            ("net", specs(&[("name", inherit("fish_id.name"))])),
        ]);
        let builder = GraphBuilder::new(
            schemas,
            vec!["fish".to_string(), "nets".to_string()],
            handlers_for(&["fish", "net"]),
        );
        assert!(builder.is_ok());
    }

    fn small_dataset() -> RawDataset {
        let mut dataset = RawDataset::default();

        let mut bodies = RawCollection::default();
        let mut body = RawRecord::new();
        body.insert("name".to_string(), json!("Board of Supervisors"));
        bodies.records.insert("sf_bos".to_string(), body);
        dataset.collections.insert("bodies".to_string(), bodies);

        let mut offices = RawCollection::default();
        let mut office = RawRecord::new();
        office.insert("body_id".to_string(), json!("sf_bos"));
        offices.records.insert("sf_d5".to_string(), office);
        dataset.collections.insert("offices".to_string(), offices);

        dataset
    }

    fn small_builder() -> GraphBuilder {
        let schemas = registry_for(&[
            ("body", specs(&[("name", FieldSpec::default())])),
            (
                "office",
                specs(&[
                    ("name", inherit("body_id.name")),
                    ("body_id", FieldSpec::default()),
                ]),
            ),
        ]);
        GraphBuilder::new(
            schemas,
            vec!["bodies".to_string(), "offices".to_string()],
            handlers_for(&["body", "office"]),
        )
        .unwrap()
    }

    #[test]
    fn test_later_types_see_earlier_ones() {
        let store = small_builder().build(&small_dataset()).unwrap();
        let office = store.record("offices", "sf_d5").unwrap();
        assert_eq!(
            office.get("name").and_then(ResolvedValue::as_str),
            Some("Board of Supervisors")
        );
    }

    #[test]
    fn test_build_is_deterministic() {
        let builder = small_builder();
        let dataset = small_dataset();
        let first = serde_json::to_string(&builder.build(&dataset).unwrap()).unwrap();
        let second = serde_json::to_string(&builder.build(&dataset).unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_record_errors_carry_context() {
        let schemas = registry_for(&[(
            "body",
            specs(&[(
                "name",
                FieldSpec {
                    required: true,
                    ..Default::default()
                },
            )]),
        )]);
        let builder = GraphBuilder::new(
            schemas,
            vec!["bodies".to_string()],
            handlers_for(&["body"]),
        )
        .unwrap();

        let mut dataset = RawDataset::default();
        let mut bodies = RawCollection::default();
        bodies.records.insert("sf_bos".to_string(), RawRecord::new());
        dataset.collections.insert("bodies".to_string(), bodies);

        let err = builder.build(&dataset).unwrap_err();
        match err {
            EngineError::Record {
                type_name,
                record_id,
                source,
                ..
            } => {
                assert_eq!(type_name, "body");
                assert_eq!(record_id, "sf_bos");
                assert!(matches!(*source, EngineError::MissingRequiredValue { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
