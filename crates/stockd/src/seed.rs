//! Seed mode: administrative item insert.
//!
//! Runs against a stopped replica's store. Existing ids are overwritten.

use std::path::Path;

use anyhow::Context;
use stockgrid_core::Item;
use stockgrid_state::InventoryStore;
use tracing::info;

pub fn run_seed(db_path: &Path, items_path: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(items_path)
        .with_context(|| format!("reading {}", items_path.display()))?;
    let items = parse_items(&raw).with_context(|| format!("parsing {}", items_path.display()))?;

    let store = InventoryStore::open(db_path)?;
    let count = seed_store(&store, &items)?;
    let total = store.list_items()?.len();
    info!(count, total, path = ?db_path, "catalog store seeded");
    Ok(())
}

pub fn parse_items(raw: &str) -> anyhow::Result<Vec<Item>> {
    Ok(serde_json::from_str(raw)?)
}

pub fn seed_store(store: &InventoryStore, items: &[Item]) -> anyhow::Result<usize> {
    for item in items {
        store.insert_item(item)?;
    }
    Ok(items.len())
}
