//! stockgrid-catalog: the replicated inventory of record.
//!
//! A [`CatalogReplica`] owns one `InventoryStore`. Writes that originate
//! here are propagated to every sibling replica and invalidate the front
//! door's cache entry; writes that arrive from a sibling are applied
//! locally and go no further.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/search/{topic}` | Items whose topic matches, ignoring case |
//! | GET | `/info/{id}` | Single item |
//! | PUT | `/update/{id}` | Set stock (`{"Stock": n}`, optional `ExpectedStock`) |
//! | GET | `/healthz` | Liveness |

pub mod http;
pub mod replica;

pub use http::build_router;
pub use replica::{CatalogReplica, WriteReport};
