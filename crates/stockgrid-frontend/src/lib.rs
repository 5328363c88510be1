//! stockgrid-frontend: the single public entry point of a StockGrid
//! deployment.
//!
//! The front door load-balances reads across catalog replicas and
//! purchases across order coordinators, and caches `GET /info/{id}`
//! answers until a writer invalidates them.
//!
//! | Route | Behaviour |
//! |---|---|
//! | `GET /search/{topic}` | forwarded, never cached |
//! | `GET /info/{id}` | cache, then catalog on a miss |
//! | `POST /purchase/{id}` | passed through to an order coordinator |
//! | `POST /cache/invalidate/{id}` | idempotent eviction |
//! | `GET /cache/stats` | hit, miss and stale-fill counters |

pub mod cache;
pub mod door;
pub mod http;

pub use cache::{CacheStats, Generation, InMemoryCache, ItemCache};
pub use door::FrontDoor;
pub use http::build_router;
