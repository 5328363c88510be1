//! stockgrid-state: durable local state for StockGrid replicas.
//!
//! Backed by [redb](https://docs.rs/redb). A catalog replica owns one
//! [`InventoryStore`]; an order coordinator owns one [`OrderLedger`].
//! Neither is shared across processes.
//!
//! # Architecture
//!
//! Both stores sit on the same three primitives (`get`, `put`, `scan`)
//! over `u64`-keyed tables whose values are JSON-serialized domain types.
//! Stock updates run inside a single redb write transaction, and redb
//! admits one writer at a time, so a compare-and-swap on stock is atomic
//! with respect to every other write on the replica.
//!
//! Handles are `Clone` + `Send` + `Sync` (backed by `Arc<Database>`).

pub mod error;
mod kv;
pub mod ledger;
pub mod store;
pub mod tables;

pub use error::{StateError, StateResult};
pub use ledger::{OrderLedger, OrderLog};
pub use store::{InventoryStore, StockWrite};
