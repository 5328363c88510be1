//! Order mode: an order coordinator.
//!
//! Each coordinator keeps its own ledger, so order numbers are unique per
//! coordinator rather than across the deployment.

use std::sync::Arc;

use anyhow::Context;
use stockgrid_client::HttpClient;
use stockgrid_core::{Endpoint, NodeConfig};
use stockgrid_order::OrderCoordinator;
use stockgrid_state::OrderLedger;
use tracing::info;

use crate::node_args::required;

const DEFAULT_LISTEN: &str = "0.0.0.0:5000";

pub async fn run_order(config: NodeConfig) -> anyhow::Result<()> {
    let name = config.name.as_deref().unwrap_or("order");
    info!(name, mode = ?config.purchase.mode, "StockGrid order coordinator starting");

    let db_path = required(config.db_path.as_deref(), "db_path")?;
    if let Some(dir) = db_path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating {}", dir.display()))?;
    }
    let ledger = OrderLedger::open(db_path)?;
    info!(path = ?db_path, "order ledger opened");

    let catalogs = config.catalog_set()?;
    let frontend = Endpoint::new(required(config.frontend.as_deref(), "frontend")?);
    // Origin writes wait on the replica's own fan-out.
    let timeout = config.replica_write_timeout();
    let client = Arc::new(HttpClient::new(timeout));

    let coordinator =
        OrderCoordinator::new(catalogs, Arc::new(ledger), client.clone(), client, frontend)
            .with_mode(config.purchase.mode, config.purchase.max_attempts)
            .with_timeout(timeout);

    let router = stockgrid_order::build_router(Arc::new(coordinator));
    let listen = config.listen.as_deref().unwrap_or(DEFAULT_LISTEN);
    crate::serve(name, listen, router).await
}
