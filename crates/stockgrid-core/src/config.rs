//! stockgrid.toml node configuration.
//!
//! Every field is optional in the file; `stockd` overlays command-line
//! flags and environment variables on top before resolving replica sets.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::replica_set::{Endpoint, ReplicaSet, ReplicaSetError};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Human-readable instance name, used in logs.
    pub name: Option<String>,
    /// Socket address to bind, e.g. `0.0.0.0:4000`.
    pub listen: Option<String>,
    /// redb database file.
    pub db_path: Option<PathBuf>,
    /// This instance's own base URL as its peers see it.
    pub self_url: Option<String>,
    /// Front door base URL (invalidation target).
    pub frontend: Option<String>,
    pub catalog_replicas: Vec<String>,
    pub order_replicas: Vec<String>,
    pub replication: ReplicationConfig,
    pub purchase: PurchaseConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ReplicationConfig {
    /// Per-target bound on fan-out and invalidation calls.
    pub fanout_timeout_ms: u64,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            fanout_timeout_ms: 3_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PurchaseConfig {
    pub mode: PurchaseMode,
    /// Attempts before an optimistic purchase gives up with a conflict.
    pub max_attempts: u32,
}

impl Default for PurchaseConfig {
    fn default() -> Self {
        Self {
            mode: PurchaseMode::Baseline,
            max_attempts: 3,
        }
    }
}

/// How the order tier protects the read-decrement-write sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PurchaseMode {
    /// Single attempt, unconditional writes. Concurrent purchases can lose
    /// updates.
    #[default]
    Baseline,
    /// Compare-and-swap against the gate replica, retried on conflict.
    Optimistic,
}

impl FromStr for PurchaseMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "baseline" => Ok(Self::Baseline),
            "optimistic" => Ok(Self::Optimistic),
            other => Err(format!("unknown purchase mode '{other}'")),
        }
    }
}

impl NodeConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: NodeConfig = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject settings that would make every peer call fail.
    pub fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.replication.fanout_timeout_ms > 0,
            "replication.fanout_timeout_ms must be greater than zero"
        );
        Ok(())
    }

    /// Bound on a call whose target answers without calling anyone else:
    /// a replicated catalog write, a read, a cache invalidation.
    pub fn fanout_timeout(&self) -> Duration {
        Duration::from_millis(self.replication.fanout_timeout_ms)
    }

    /// Bound on an origin write to a catalog replica. The replica answers
    /// after its sibling fan-out and its invalidation, which run together
    /// under [`fanout_timeout`](Self::fanout_timeout).
    pub fn replica_write_timeout(&self) -> Duration {
        self.fanout_timeout() * 2
    }

    /// Bound the front door puts on a relayed purchase. Covers the stock
    /// read, every optimistic gate attempt, the remaining replica writes,
    /// the invalidation and the ledger append, each at
    /// [`replica_write_timeout`](Self::replica_write_timeout).
    pub fn purchase_timeout(&self) -> Duration {
        self.replica_write_timeout() * (self.purchase.max_attempts.max(1) + 4)
    }

    pub fn catalog_set(&self) -> Result<ReplicaSet, ReplicaSetError> {
        ReplicaSet::new("catalog", to_endpoints(&self.catalog_replicas))
    }

    pub fn order_set(&self) -> Result<ReplicaSet, ReplicaSetError> {
        ReplicaSet::new("order", to_endpoints(&self.order_replicas))
    }
}

/// Split a comma-separated list the way `CATALOG_REPLICAS_URLS` is written.
pub fn split_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn to_endpoints(raw: &[String]) -> Vec<Endpoint> {
    raw.iter()
        .filter(|s| !s.trim().is_empty())
        .map(|s| Endpoint::new(s))
        .collect()
}
