//! Catalog mode: one replica of the inventory of record.
//!
//! The daemon opens its local store, learns its siblings from the
//! catalog replica list, and serves reads and stock writes.

use std::sync::Arc;

use anyhow::Context;
use stockgrid_catalog::CatalogReplica;
use stockgrid_client::HttpClient;
use stockgrid_core::{Endpoint, NodeConfig};
use stockgrid_state::InventoryStore;
use tracing::info;

use crate::node_args::required;

const DEFAULT_LISTEN: &str = "0.0.0.0:4000";

pub async fn run_catalog(config: NodeConfig) -> anyhow::Result<()> {
    let name = config.name.as_deref().unwrap_or("catalog");
    info!(name, "StockGrid catalog replica starting");

    let db_path = required(config.db_path.as_deref(), "db_path")?;
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let store = InventoryStore::open(db_path)?;
    info!(path = ?db_path, "inventory store opened");

    let replicas = config.catalog_set()?;
    let me = Endpoint::new(required(config.self_url.as_deref(), "self_url")?);
    let frontend = Endpoint::new(required(config.frontend.as_deref(), "frontend")?);

    let client = Arc::new(HttpClient::new(config.fanout_timeout()));
    let replica = CatalogReplica::new(store, &replicas, me, frontend, client.clone(), client)
        .with_fanout_timeout(config.fanout_timeout());

    let router = stockgrid_catalog::build_router(Arc::new(replica));
    let listen = config.listen.as_deref().unwrap_or(DEFAULT_LISTEN);
    crate::serve(name, listen, router).await
}
