//! Command-line entry point: resolve a dataset directory and emit the JSON
//! interchange document.
//!
//! Usage: `electgraph <data_dir> [output_file]`. With no output file the
//! document goes to stdout.

use anyhow::{Context, Result};
use tracing::info;

use electgraph::{to_interchange, DatasetLoader, GraphBuilder};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "electgraph=info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let data_dir = args.next().unwrap_or_else(|| "data".to_string());
    let output = args.next();

    let (schemas, dataset) = DatasetLoader::new(&data_dir).load()?;
    let store = GraphBuilder::with_defaults(schemas)?.build(&dataset)?;
    let document = to_interchange(&store, &dataset.phrases)?;

    let text = serde_json::to_string_pretty(&document)?;
    match output {
        Some(path) => {
            std::fs::write(&path, text).with_context(|| format!("Failed to write {path}"))?;
            info!("Wrote {path}");
        }
        None => println!("{text}"),
    }

    Ok(())
}
