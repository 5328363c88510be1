//! redb table definitions.
//!
//! Keys are numeric ids; values are JSON-serialized `stockgrid_core` types.

use redb::TableDefinition;

/// Catalog items keyed by item id.
pub const ITEMS: TableDefinition<u64, &[u8]> = TableDefinition::new("items");

/// Order records keyed by order number.
pub const ORDERS: TableDefinition<u64, &[u8]> = TableDefinition::new("orders");
