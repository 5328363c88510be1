//! stockgrid-core: shared vocabulary for the StockGrid tiers.
//!
//! Every service (catalog replica, front door, order coordinator) speaks
//! the same wire types and the same error taxonomy, and reads its peers
//! from the same [`ReplicaSet`] abstraction.
//!
//! # Modules
//!
//! - **`types`**: items, orders, and the request/response bodies on the wire
//! - **`error`**: [`ServiceError`] and its HTTP status mapping
//! - **`replica_set`**: ordered endpoint lists with atomic round-robin
//! - **`provenance`**: origin vs. replicated write tagging
//! - **`config`**: `stockgrid.toml` node configuration

pub mod config;
pub mod error;
pub mod provenance;
pub mod replica_set;
pub mod types;

pub use config::{NodeConfig, PurchaseMode};
pub use error::{ServiceError, ServiceResult};
pub use provenance::{PROVENANCE_HEADER, WriteOrigin};
pub use replica_set::{Endpoint, ReplicaSet, ReplicaSetError};
pub use types::*;
