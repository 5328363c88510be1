//! Key-value primitives shared by the inventory store and the order ledger.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{StateError, StateResult};

pub(crate) type Table = TableDefinition<'static, u64, &'static [u8]>;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| $crate::error::StateError::$variant(e.to_string())
    };
}
pub(crate) use map_err;

/// Open (or create) a database file and make sure `tables` exist.
pub(crate) fn open(path: &Path, tables: &[Table]) -> StateResult<Arc<Database>> {
    let db = Database::create(path).map_err(map_err!(Open))?;
    ensure_tables(&db, tables)?;
    Ok(Arc::new(db))
}

/// Ephemeral in-memory database (for testing).
pub(crate) fn open_in_memory(tables: &[Table]) -> StateResult<Arc<Database>> {
    let backend = redb::backends::InMemoryBackend::new();
    let db = Database::builder()
        .create_with_backend(backend)
        .map_err(map_err!(Open))?;
    ensure_tables(&db, tables)?;
    Ok(Arc::new(db))
}

fn ensure_tables(db: &Database, tables: &[Table]) -> StateResult<()> {
    let txn = db.begin_write().map_err(map_err!(Transaction))?;
    // Opening a table in a write transaction creates it if absent.
    for table in tables {
        txn.open_table(*table).map_err(map_err!(Table))?;
    }
    txn.commit().map_err(map_err!(Transaction))?;
    Ok(())
}

/// Point lookup.
pub(crate) fn get<T: DeserializeOwned>(
    db: &Database,
    table: Table,
    key: u64,
) -> StateResult<Option<T>> {
    let txn = db.begin_read().map_err(map_err!(Transaction))?;
    let table = txn.open_table(table).map_err(map_err!(Table))?;
    match table.get(key).map_err(map_err!(Read))? {
        Some(guard) => {
            let value = serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Insert or overwrite a single row.
pub(crate) fn put<T: Serialize>(db: &Database, table: Table, key: u64, value: &T) -> StateResult<()> {
    let bytes = serde_json::to_vec(value).map_err(map_err!(Serialize))?;
    let txn = db.begin_write().map_err(map_err!(Transaction))?;
    {
        let mut table = txn.open_table(table).map_err(map_err!(Table))?;
        table
            .insert(key, bytes.as_slice())
            .map_err(map_err!(Write))?;
    }
    txn.commit().map_err(map_err!(Transaction))?;
    Ok(())
}

/// Full-table scan in key order, keeping rows that satisfy `predicate`.
pub(crate) fn scan<T, F>(db: &Database, table: Table, predicate: F) -> StateResult<Vec<T>>
where
    T: DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let txn = db.begin_read().map_err(map_err!(Transaction))?;
    let table = txn.open_table(table).map_err(map_err!(Table))?;
    let mut results = Vec::new();
    for entry in table.iter().map_err(map_err!(Read))? {
        let (_, value) = entry.map_err(map_err!(Read))?;
        let row: T = serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
        if predicate(&row) {
            results.push(row);
        }
    }
    Ok(results)
}

/// Encode a row for a write inside a caller-owned transaction.
pub(crate) fn encode<T: Serialize>(value: &T) -> StateResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| StateError::Serialize(e.to_string()))
}
