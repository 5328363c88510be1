//! Command-line and environment overlay on top of `stockgrid.toml`.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use stockgrid_core::config::split_csv;
use stockgrid_core::{NodeConfig, PurchaseMode};

#[derive(Debug, Default, Args)]
pub struct NodeArgs {
    /// Optional TOML config file; flags and env vars win over it.
    #[arg(long, env = "STOCKGRID_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "SERVICE_NAME")]
    pub name: Option<String>,

    /// Socket address to bind.
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen: Option<String>,

    /// redb file (catalog store or order ledger).
    #[arg(long, env = "DB_FILE")]
    pub db_path: Option<PathBuf>,

    /// This instance's URL as listed in its replica set.
    #[arg(long, env = "SELF_URL")]
    pub self_url: Option<String>,

    /// Front door base URL.
    #[arg(long, env = "FRONTEND_URL")]
    pub frontend: Option<String>,

    /// Comma-separated catalog replica URLs.
    #[arg(long, env = "CATALOG_REPLICAS_URLS")]
    pub catalog_replicas: Option<String>,

    /// Comma-separated order coordinator URLs.
    #[arg(long, env = "ORDER_REPLICAS_URLS")]
    pub order_replicas: Option<String>,

    #[arg(long, env = "FANOUT_TIMEOUT_MS")]
    pub fanout_timeout_ms: Option<u64>,

    /// `baseline` or `optimistic`.
    #[arg(long, env = "PURCHASE_MODE")]
    pub purchase_mode: Option<PurchaseMode>,

    #[arg(long, env = "PURCHASE_MAX_ATTEMPTS")]
    pub purchase_max_attempts: Option<u32>,
}

impl NodeArgs {
    /// Load the config file (if any) and apply every flag that was set.
    pub fn resolve(self) -> anyhow::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::from_file(path)
                .with_context(|| format!("reading config {}", path.display()))?,
            None => NodeConfig::default(),
        };

        if self.name.is_some() {
            config.name = self.name;
        }
        if self.listen.is_some() {
            config.listen = self.listen;
        }
        if self.db_path.is_some() {
            config.db_path = self.db_path;
        }
        if self.self_url.is_some() {
            config.self_url = self.self_url;
        }
        if self.frontend.is_some() {
            config.frontend = self.frontend;
        }
        if let Some(csv) = self.catalog_replicas {
            config.catalog_replicas = split_csv(&csv);
        }
        if let Some(csv) = self.order_replicas {
            config.order_replicas = split_csv(&csv);
        }
        if let Some(ms) = self.fanout_timeout_ms {
            config.replication.fanout_timeout_ms = ms;
        }
        if let Some(mode) = self.purchase_mode {
            config.purchase.mode = mode;
        }
        if let Some(attempts) = self.purchase_max_attempts {
            config.purchase.max_attempts = attempts;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Fetch a setting every role of this kind needs.
pub fn required<'a, T: ?Sized>(value: Option<&'a T>, what: &str) -> anyhow::Result<&'a T> {
    value.with_context(|| format!("{what} is not configured"))
}
