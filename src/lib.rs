//! Object resolution engine for hand-authored election configuration data.
//!
//! Typed records (areas, bodies, offices, districts, ...) are authored as
//! sparse YAML maps and resolved into a complete record graph: values are
//! pulled in from mixins, per-type base templates, single-hop inheritance
//! over foreign keys, and format-string expansion, with translatable text
//! carried as a tagged i18n variant until a final English-reduction pass.
//! The finished graph serializes to a deterministic JSON interchange
//! document.
//!
//! Typical use:
//!
//! ```no_run
//! use electgraph::{DatasetLoader, GraphBuilder};
//!
//! # fn main() -> anyhow::Result<()> {
//! let (schemas, dataset) = DatasetLoader::new("data").load()?;
//! let store = GraphBuilder::with_defaults(schemas)?.build(&dataset)?;
//! let document = electgraph::to_interchange(&store, &dataset.phrases)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod format;
pub mod graph;
pub mod handler;
pub mod loader;
pub mod plural;
pub mod resolve;
pub mod schema;
pub mod serialize;
pub mod store;
pub mod validate;
pub mod value;

pub use error::{EngineError, Result};
pub use graph::{GraphBuilder, DEFAULT_TYPE_ORDER};
pub use handler::{HandlerRegistry, TypeHandler};
pub use loader::DatasetLoader;
pub use schema::{FieldSpec, SchemaRegistry, TypeSchema};
pub use serialize::{to_interchange, DATABASE_LICENSE};
pub use store::{PhraseRegistry, RawCollection, RawDataset, RecordStore};
pub use value::{I18nText, RawRecord, ResolvedRecord, ResolvedValue};
