//! Front door mode: the public entry point.

use std::sync::Arc;

use stockgrid_client::HttpClient;
use stockgrid_core::NodeConfig;
use stockgrid_frontend::{FrontDoor, InMemoryCache};
use tracing::info;

const DEFAULT_LISTEN: &str = "0.0.0.0:3000";

pub async fn run_frontend(config: NodeConfig) -> anyhow::Result<()> {
    let name = config.name.as_deref().unwrap_or("frontend");
    info!(
        name,
        purchase_timeout = ?config.purchase_timeout(),
        "StockGrid front door starting"
    );

    let catalogs = config.catalog_set()?;
    let orders = config.order_set()?;
    let door = FrontDoor::new(
        catalogs,
        orders,
        Arc::new(InMemoryCache::new()),
        Arc::new(HttpClient::new(config.fanout_timeout())),
        Arc::new(HttpClient::new(config.purchase_timeout())),
    );

    let router = stockgrid_frontend::build_router(Arc::new(door));
    let listen = config.listen.as_deref().unwrap_or(DEFAULT_LISTEN);
    crate::serve(name, listen, router).await
}
