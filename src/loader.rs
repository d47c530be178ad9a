//! Dataset loading.
//!
//! Loads the schema file and the hand-authored object files from a data
//! directory:
//!
//! ```text
//! <data_dir>/fields.yaml        field constraint tables, one per type
//! <data_dir>/objects/*.yaml     one collection per file, keyed by file stem
//! ```
//!
//! The `phrases` and `mixins` stems are reserved: they feed the phrase
//! registry and the mixin table instead of becoming record collections.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::schema::{FieldSpec, SchemaRegistry};
use crate::store::{PhraseRegistry, RawCollection, RawDataset};
use crate::value::RawRecord;

const FIELDS_FILE: &str = "fields.yaml";
const OBJECTS_DIR: &str = "objects";
const PHRASES_STEM: &str = "phrases";
const MIXINS_STEM: &str = "mixins";

/// Root of the schema file
#[derive(Debug, Deserialize)]
struct FieldsFile {
    fields: BTreeMap<String, BTreeMap<String, FieldSpec>>,
}

/// Root of one object file: optional collection metadata plus the records.
#[derive(Debug, Deserialize)]
struct ObjectFile {
    #[serde(rename = "_meta", default)]
    meta: ObjectFileMeta,

    #[serde(flatten)]
    records: BTreeMap<String, RawRecord>,
}

#[derive(Debug, Default, Deserialize)]
struct ObjectFileMeta {
    /// Base template applied to every record in the file.
    #[serde(default)]
    base: RawRecord,
}

/// Loads the schema registry and raw dataset from a data directory.
pub struct DatasetLoader {
    data_dir: PathBuf,
}

impl DatasetLoader {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    /// Load everything the engine consumes.
    pub fn load(&self) -> Result<(SchemaRegistry, RawDataset)> {
        let schemas = self.load_schemas()?;
        let dataset = self.load_objects()?;
        Ok((schemas, dataset))
    }

    fn load_schemas(&self) -> Result<SchemaRegistry> {
        let path = self.data_dir.join(FIELDS_FILE);
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file: FieldsFile = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        info!("Loaded field schemas for {} types", file.fields.len());
        Ok(SchemaRegistry::from_specs(file.fields))
    }

    fn load_objects(&self) -> Result<RawDataset> {
        let objects_dir = self.data_dir.join(OBJECTS_DIR);
        let mut paths: Vec<PathBuf> = std::fs::read_dir(&objects_dir)
            .with_context(|| format!("Failed to read {}", objects_dir.display()))?
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
            .collect();
        paths.sort();

        info!("Found {} object files in {}", paths.len(), objects_dir.display());

        let mut dataset = RawDataset::default();
        for path in paths {
            let stem = path
                .file_stem()
                .and_then(|s| s.to_str())
                .with_context(|| format!("Unreadable file name: {}", path.display()))?
                .to_string();
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;

            match stem.as_str() {
                PHRASES_STEM => {
                    let phrases: BTreeMap<String, BTreeMap<String, String>> =
                        serde_yaml::from_str(&content)
                            .with_context(|| format!("Failed to parse {}", path.display()))?;
                    debug!("Loaded {} phrases", phrases.len());
                    dataset.phrases = PhraseRegistry::new(phrases);
                }
                MIXINS_STEM => {
                    let mixins: BTreeMap<String, RawRecord> = serde_yaml::from_str(&content)
                        .with_context(|| format!("Failed to parse {}", path.display()))?;
                    debug!("Loaded {} mixins", mixins.len());
                    dataset.mixins = mixins;
                }
                _ => {
                    let file: ObjectFile = serde_yaml::from_str(&content)
                        .with_context(|| format!("Failed to parse {}", path.display()))?;
                    if dataset.collections.contains_key(&stem) {
                        bail!("Duplicate object collection '{}'", stem);
                    }
                    debug!("Loaded {} '{}' records", file.records.len(), stem);
                    dataset.collections.insert(
                        stem,
                        RawCollection {
                            base: file.meta.base,
                            records: file.records,
                        },
                    );
                }
            }
        }

        Ok(dataset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write(dir: &Path, rel: &str, content: &str) {
        let path = dir.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[test]
    fn test_load_full_directory() {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            "fields.yaml",
            r#"
fields:
  body:
    name:
      i18n_okay: true
      required: true
    seat_count: {}
"#,
        );
        write(
            dir.path(),
            "objects/bodies.yaml",
            r#"
_meta:
  base:
    name: "{id} board"
sf_bos:
  seat_count: 11
"#,
        );
        write(
            dir.path(),
            "objects/phrases.yaml",
            r#"
office_mayor:
  en: Mayor
  es: Alcalde
"#,
        );
        write(
            dir.path(),
            "objects/mixins.yaml",
            r#"
city_wide:
  area_id: sf
"#,
        );

        let (schemas, dataset) = DatasetLoader::new(dir.path()).load().unwrap();

        let body = schemas.get("body").unwrap();
        assert!(body.get("name").unwrap().is_i18n());
        assert!(!body.get("seat_count").unwrap().is_required());

        let bodies = dataset.collection("bodies").unwrap();
        assert_eq!(bodies.base.get("name"), Some(&json!("{id} board")));
        assert_eq!(
            bodies.records["sf_bos"].get("seat_count"),
            Some(&json!(11))
        );

        assert_eq!(
            dataset.phrases.get("office_mayor").unwrap().get("es"),
            Some(&"Alcalde".to_string())
        );
        assert_eq!(dataset.mixins["city_wide"].get("area_id"), Some(&json!("sf")));
    }

    #[test]
    fn test_missing_fields_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = DatasetLoader::new(dir.path()).load().unwrap_err();
        assert!(err.to_string().contains("fields.yaml"));
    }

    #[test]
    fn test_collection_without_meta() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "fields.yaml", "fields: {}\n");
        write(
            dir.path(),
            "objects/areas.yaml",
            r#"
sf:
  name: San Francisco
"#,
        );

        let (_, dataset) = DatasetLoader::new(dir.path()).load().unwrap();
        let areas = dataset.collection("areas").unwrap();
        assert!(areas.base.is_empty());
        assert_eq!(areas.records["sf"].get("name"), Some(&json!("San Francisco")));
    }
}
