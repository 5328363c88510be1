//! stockd: the StockGrid daemon.
//!
//! One binary, one role per process:
//! - `catalog`: a catalog replica owning a local inventory store
//! - `frontend`: the front door with its read cache
//! - `order`: an order coordinator owning a local order ledger
//! - `seed`: load items into a catalog store before first start
//!
//! # Usage
//!
//! ```text
//! stockd catalog --listen 0.0.0.0:4000 --db-path /var/lib/stockgrid/catalog.redb \
//!     --self-url http://catalog1:4000 --frontend http://frontend:3000 \
//!     --catalog-replicas http://catalog1:4000,http://catalog2:4000
//! ```

mod catalog_mode;
mod frontend_mode;
mod node_args;
mod order_mode;
mod seed;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::node_args::NodeArgs;

const DEFAULT_FILTER: &str = "info,stockd=debug,stockgrid=debug";

#[derive(Parser)]
#[command(name = "stockd", about = "StockGrid inventory daemon")]
struct Cli {
    /// Log line format.
    #[arg(long, global = true, value_enum, default_value = "text", env = "LOG_FORMAT")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run a catalog replica.
    Catalog(NodeArgs),
    /// Run the front door.
    Frontend(NodeArgs),
    /// Run an order coordinator.
    Order(NodeArgs),
    /// Insert items from a JSON array into a catalog store.
    Seed {
        /// Catalog store to write.
        #[arg(long, env = "DB_FILE")]
        db_path: PathBuf,

        /// JSON file holding an array of items.
        #[arg(long)]
        items: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format);

    match cli.command {
        Command::Catalog(args) => catalog_mode::run_catalog(args.resolve()?).await,
        Command::Frontend(args) => frontend_mode::run_frontend(args.resolve()?).await,
        Command::Order(args) => order_mode::run_order(args.resolve()?).await,
        Command::Seed { db_path, items } => seed::run_seed(&db_path, &items),
    }
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Bind `listen` and serve `router` until Ctrl-C.
async fn serve(role: &str, listen: &str, router: axum::Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!(role, addr = %listener.local_addr()?, "listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "no Ctrl-C handler; running until killed");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!(role, "stopped");
    Ok(())
}
