/*!
Shelf CLI - Command-line interface for inspecting shelf record stores.

The CLI has no Rust types for the records it looks at, so it works on the raw
JSON documents of a local store.
*/

use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_core::observability::init_observability;
use shelf_core::path::{resolve, validate_identifier, DEFAULT_ROOT};
use shelf_core::{
    create_store_from_config, ensure_epoch, FileVersionSlot, RecordStore, StorageAdapter,
    StoreConfig,
};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};
use tracing::{error, info};

type Store = RecordStore<Box<dyn StorageAdapter>>;

const PREVIEW_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(about = "Inspect and maintain shelf record stores")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Base directory holding the store
    #[arg(short, long, global = true, env = "SHELF_DIR", default_value = "./shelf")]
    dir: PathBuf,

    /// Store root inside the base directory
    #[arg(short, long, global = true, env = "SHELF_ROOT", default_value = DEFAULT_ROOT)]
    root: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the collections stored under the root
    Collections,
    /// List the records of one collection
    List {
        /// Collection tag, e.g. `user`
        collection: String,
    },
    /// Print one record as JSON
    Show {
        collection: String,
        id: String,
    },
    /// Delete one record
    Delete {
        collection: String,
        id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Remove every collection under the root
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Flush the root if its recorded version differs from VERSION
    Epoch {
        version: u32,
    },
}

#[derive(Tabled)]
struct CollectionInfo {
    #[tabled(rename = "Collection")]
    name: String,
    #[tabled(rename = "Records")]
    records: String,
}

#[derive(Tabled)]
struct RecordInfo {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Preview")]
    preview: String,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    init_observability(cli.verbose, cli.json_logs)?;

    let config = StoreConfig::local_with_base(&cli.dir).with_root(cli.root.clone());
    let store = create_store_from_config(config)?;

    match cli.command {
        Commands::Collections => list_collections(&store)?,
        Commands::List { collection } => list_records(&store, &collection)?,
        Commands::Show { collection, id } => show_record(&store, &collection, &id)?,
        Commands::Delete {
            collection,
            id,
            force,
        } => delete_record(&store, &collection, &id, force)?,
        Commands::Clear { force } => clear_store(&store, force)?,
        Commands::Epoch { version } => run_epoch(&store, &cli.dir, version)?,
    }

    Ok(())
}

fn list_collections(store: &Store) -> Result<(), anyhow::Error> {
    info!("Listing collections under '{}'", store.root());

    let names = match store.collections() {
        Ok(names) => names,
        Err(e) if e.is_not_found() => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    if names.is_empty() {
        println!("No collections found under '{}'", store.root());
        return Ok(());
    }

    let rows: Vec<CollectionInfo> = names
        .into_iter()
        .map(|name| {
            let records = match store.get_all_documents(&name) {
                Ok(documents) => documents.len().to_string(),
                Err(e) => {
                    error!("Failed to read collection {}: {}", name, e);
                    "unreadable".to_string()
                }
            };
            CollectionInfo { name, records }
        })
        .collect();

    println!("{}", Table::new(rows));
    Ok(())
}

fn list_records(store: &Store, collection: &str) -> Result<(), anyhow::Error> {
    info!("Listing records of collection: {}", collection);

    validate_identifier(collection)?;
    if !store.storage().exists(&collection_path(store, collection)) {
        println!("No records in collection '{collection}'");
        return Ok(());
    }
    let documents = store.get_all_documents(collection)?;

    let rows: Vec<RecordInfo> = documents
        .into_iter()
        .map(|(id, document)| {
            let compact = document.to_string();
            RecordInfo {
                id,
                size: format_size(compact.len() as u64),
                preview: preview(&compact, PREVIEW_WIDTH),
            }
        })
        .collect();

    println!("{}", Table::new(rows));
    Ok(())
}

fn show_record(store: &Store, collection: &str, id: &str) -> Result<(), anyhow::Error> {
    info!("Showing record {}/{}", collection, id);

    let document = store
        .get_document(collection, id)
        .with_context(|| format!("Failed to load record '{id}' of '{collection}'"))?;
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

fn delete_record(
    store: &Store,
    collection: &str,
    id: &str,
    force: bool,
) -> Result<(), anyhow::Error> {
    if !force && !confirm(&format!("Delete record '{id}' from '{collection}'?"))? {
        println!("Deletion cancelled");
        return Ok(());
    }

    store.delete_document(collection, id)?;
    println!("✓ Record deleted");
    Ok(())
}

fn clear_store(store: &Store, force: bool) -> Result<(), anyhow::Error> {
    if !force && !confirm(&format!("Remove every record under '{}'?", store.root()))? {
        println!("Clear cancelled");
        return Ok(());
    }

    store.clear()?;
    println!("✓ Store '{}' cleared", store.root());
    Ok(())
}

fn run_epoch(store: &Store, dir: &Path, version: u32) -> Result<(), anyhow::Error> {
    let slot = FileVersionSlot::new(version_slot_path(dir, store.root()));
    let previous = slot
        .marker()
        .with_context(|| format!("Failed to read {}", slot.path().display()))?;

    if ensure_epoch(store, &slot, version)? {
        match previous {
            Some(marker) => println!(
                "✓ Flushed '{}': version {} (recorded {}) -> {}",
                store.root(),
                marker.version,
                marker.recorded_at.format("%Y-%m-%d %H:%M:%S"),
                version
            ),
            None => println!(
                "✓ Flushed '{}': no version recorded -> {}",
                store.root(),
                version
            ),
        }
    } else {
        println!("Store '{}' already at version {}", store.root(), version);
    }
    Ok(())
}

fn collection_path(store: &Store, collection: &str) -> String {
    resolve(store.root(), collection, None)
}

/// Marker file next to the root, e.g. `<dir>/.xmari0.version`
fn version_slot_path(dir: &Path, root: &str) -> PathBuf {
    dir.join(format!(".{}.version", root.replace('/', "_")))
}

fn confirm(question: &str) -> Result<bool, anyhow::Error> {
    print!("{question} (y/N): ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_lowercase().starts_with('y'))
}

fn preview(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let cut: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{cut}…")
}

fn format_size(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= 1024.0 && unit_index < UNITS.len() - 1 {
        size /= 1024.0;
        unit_index += 1;
    }

    if unit_index == 0 {
        format!("{} {}", bytes, UNITS[unit_index])
    } else {
        format!("{:.1} {}", size, UNITS[unit_index])
    }
}
