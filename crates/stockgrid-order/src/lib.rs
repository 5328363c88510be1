//! stockgrid-order: turns a purchase request into a stock decrement on
//! every catalog replica plus one order record.
//!
//! Two modes exist. `baseline` reads, decrements and writes with no
//! coordination, so concurrent purchases of the last unit can both
//! succeed. `optimistic` routes the decrement through a conditional
//! write on the gate replica first and retries when it loses.

pub mod coordinator;
pub mod http;

pub use coordinator::OrderCoordinator;
pub use http::build_router;
