//! stockgrid-client: how StockGrid tiers talk to each other.
//!
//! # Components
//!
//! - **`api`**: the [`CatalogApi`], [`FrontendApi`], and [`OrderApi`] seams
//! - **`http`**: [`HttpClient`], a pooled hyper client implementing all three
//! - **`fanout`**: concurrent per-target calls with independent timeouts
//!
//! Services hold these as `Arc<dyn ...>` so tests can swap in in-process
//! fakes without opening sockets.

pub mod api;
pub mod error;
pub mod fanout;
pub mod http;

pub use api::{CatalogApi, FrontendApi, OrderApi};
pub use error::ClientError;
pub use fanout::fan_out;
pub use http::{HttpClient, RawResponse};
