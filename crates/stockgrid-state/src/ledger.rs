//! OrderLedger: append-only order records for one order coordinator.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableTable};
use stockgrid_core::{ItemId, OrderNumber, OrderRecord, unix_now};
use tracing::debug;

use crate::error::StateResult;
use crate::kv::{self, map_err};
use crate::tables::ORDERS;

/// Thread-safe order ledger backed by redb.
#[derive(Clone)]
pub struct OrderLedger {
    db: Arc<Database>,
}

impl OrderLedger {
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = kv::open(path, &[ORDERS])?;
        debug!(?path, "order ledger opened");
        Ok(Self { db })
    }

    /// Create an ephemeral in-memory ledger (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let db = kv::open_in_memory(&[ORDERS])?;
        Ok(Self { db })
    }
}

/// Order storage as the purchase protocol sees it.
pub trait OrderLog: Send + Sync {
    /// Append an order for `item_id`, assigning the next order number.
    fn append(&self, item_id: ItemId) -> StateResult<OrderRecord>;

    fn get(&self, order_number: OrderNumber) -> StateResult<Option<OrderRecord>>;
}

impl OrderLog for OrderLedger {
    /// Numbers start at 1 and are allocated inside the write transaction
    /// that stores the record.
    fn append(&self, item_id: ItemId) -> StateResult<OrderRecord> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let record = {
            let mut table = txn.open_table(ORDERS).map_err(map_err!(Table))?;
            let order_number = table
                .last()
                .map_err(map_err!(Read))?
                .map(|(key, _)| key.value() + 1)
                .unwrap_or(1);
            let record = OrderRecord {
                order_number,
                item_id,
                created_at: unix_now(),
            };
            let bytes = kv::encode(&record)?;
            table
                .insert(order_number, bytes.as_slice())
                .map_err(map_err!(Write))?;
            record
        };
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(order_number = record.order_number, item_id, "order recorded");
        Ok(record)
    }

    fn get(&self, order_number: OrderNumber) -> StateResult<Option<OrderRecord>> {
        kv::get(&self.db, ORDERS, order_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_numbers_start_at_one_and_increase() {
        let ledger = OrderLedger::open_in_memory().unwrap();
        let first = ledger.append(2).unwrap();
        let second = ledger.append(2).unwrap();
        let third = ledger.append(5).unwrap();

        assert_eq!(first.order_number, 1);
        assert_eq!(second.order_number, 2);
        assert_eq!(third.order_number, 3);
        assert_eq!(third.item_id, 5);
    }

    #[test]
    fn get_returns_stored_records() {
        let ledger = OrderLedger::open_in_memory().unwrap();
        ledger.append(1).unwrap();
        ledger.append(2).unwrap();

        let second = ledger.get(2).unwrap().unwrap();
        assert_eq!(second.order_number, 2);
        assert_eq!(second.item_id, 2);
        assert!(ledger.get(9).unwrap().is_none());
    }

    #[test]
    fn empty_ledger() {
        let ledger = OrderLedger::open_in_memory().unwrap();
        assert!(ledger.get(1).unwrap().is_none());
    }

    #[test]
    fn numbering_continues_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("orders.redb");

        {
            let ledger = OrderLedger::open(&db_path).unwrap();
            ledger.append(2).unwrap();
            ledger.append(2).unwrap();
        }

        let ledger = OrderLedger::open(&db_path).unwrap();
        assert_eq!(ledger.append(3).unwrap().order_number, 3);
    }
}
