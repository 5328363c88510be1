//! InventoryStore: the Local Inventory Store owned by one catalog replica.
//!
//! Items are created by administrative inserts and afterwards mutated
//! only through stock writes. Stock writes read, check, and rewrite the
//! row inside one write transaction.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable};
use stockgrid_core::{Item, ItemId};
use tracing::debug;

use crate::error::StateResult;
use crate::kv::{self, map_err};
use crate::tables::ITEMS;

/// Outcome of a stock write against one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockWrite {
    /// The row existed and now holds the new stock.
    Applied { previous: u64 },
    /// A conditional write found a different stored value; nothing written.
    Conflict { current: u64 },
    /// No row with that id.
    NotFound,
}

impl StockWrite {
    /// Rows changed by the write: 1 if applied, 0 otherwise.
    pub fn changed(&self) -> u32 {
        match self {
            Self::Applied { .. } => 1,
            Self::Conflict { .. } | Self::NotFound => 0,
        }
    }
}

/// Thread-safe item store backed by redb.
#[derive(Clone)]
pub struct InventoryStore {
    db: Arc<Database>,
}

impl InventoryStore {
    /// Open (or create) a persistent inventory store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = kv::open(path, &[ITEMS])?;
        debug!(?path, "inventory store opened");
        Ok(Self { db })
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let db = kv::open_in_memory(&[ITEMS])?;
        debug!("in-memory inventory store opened");
        Ok(Self { db })
    }

    /// Insert or replace an item (administrative insert).
    pub fn insert_item(&self, item: &Item) -> StateResult<()> {
        kv::put(&self.db, ITEMS, item.id, item)?;
        debug!(item_id = item.id, stock = item.stock, "item stored");
        Ok(())
    }

    /// Get an item by id.
    pub fn get_item(&self, id: ItemId) -> StateResult<Option<Item>> {
        kv::get(&self.db, ITEMS, id)
    }

    /// All items whose topic matches, ignoring case.
    pub fn search_topic(&self, topic: &str) -> StateResult<Vec<Item>> {
        kv::scan(&self.db, ITEMS, |item: &Item| item.matches_topic(topic))
    }

    /// List every item in id order.
    pub fn list_items(&self) -> StateResult<Vec<Item>> {
        kv::scan(&self.db, ITEMS, |_: &Item| true)
    }

    /// Unconditionally set the stock of an existing item.
    pub fn set_stock(&self, id: ItemId, stock: u64) -> StateResult<StockWrite> {
        self.write_stock(id, stock, None)
    }

    /// Set the stock only if it currently equals `expected`.
    pub fn compare_and_set_stock(
        &self,
        id: ItemId,
        expected: u64,
        stock: u64,
    ) -> StateResult<StockWrite> {
        self.write_stock(id, stock, Some(expected))
    }

    fn write_stock(&self, id: ItemId, stock: u64, expected: Option<u64>) -> StateResult<StockWrite> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let outcome = {
            let mut table = txn.open_table(ITEMS).map_err(map_err!(Table))?;
            let stored: Option<Item> = match table.get(id).map_err(map_err!(Read))? {
                Some(guard) => Some(
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?,
                ),
                None => None,
            };
            match stored {
                None => StockWrite::NotFound,
                Some(item) if expected.is_some_and(|e| e != item.stock) => StockWrite::Conflict {
                    current: item.stock,
                },
                Some(mut item) => {
                    let previous = item.stock;
                    item.stock = stock;
                    let bytes = kv::encode(&item)?;
                    table
                        .insert(id, bytes.as_slice())
                        .map_err(map_err!(Write))?;
                    StockWrite::Applied { previous }
                }
            }
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(item_id = id, stock, ?expected, ?outcome, "stock write");
        Ok(outcome)
    }
}
