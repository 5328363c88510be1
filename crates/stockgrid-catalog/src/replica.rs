//! CatalogReplica: local reads and writes plus write propagation.
//!
//! The local write is the commit point. Fan-out to siblings and cache
//! invalidation happen afterwards, side by side on a spawned task, and
//! never undo it. The ack therefore arrives within one fan-out timeout of
//! the local write, however many peers are slow.

use std::sync::Arc;
use std::time::Duration;

use stockgrid_client::{CatalogApi, FrontendApi, fan_out};
use stockgrid_core::{
    Endpoint, Item, ItemId, ReplicaSet, ServiceError, ServiceResult, StockUpdate, TargetOutcome,
    UpdateAck, WriteOrigin, validate_stock,
};
use stockgrid_state::{InventoryStore, StockWrite};
use tracing::{debug, error, info, warn};

const DEFAULT_FANOUT_TIMEOUT: Duration = Duration::from_secs(3);

/// What a stock write did, locally and to its peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteReport {
    pub item_id: ItemId,
    pub new_stock: u64,
    /// Rows changed locally: 0 when the id matched nothing.
    pub changed: u32,
    pub origin: WriteOrigin,
    /// One outcome per sibling. Empty unless this was an origin write that
    /// changed a row.
    pub replicated: Vec<TargetOutcome>,
    pub cache_invalidated: bool,
}

impl WriteReport {
    pub fn into_ack(self) -> UpdateAck {
        UpdateAck {
            item_id: self.item_id,
            new_stock: self.new_stock,
            replicated: self.replicated,
            cache_invalidated: self.cache_invalidated,
        }
    }
}

pub struct CatalogReplica {
    store: InventoryStore,
    siblings: Vec<Endpoint>,
    frontend: Endpoint,
    peers: Arc<dyn CatalogApi>,
    cache: Arc<dyn FrontendApi>,
    fanout_timeout: Duration,
}

impl CatalogReplica {
    /// `me` is this replica's own entry in `replicas`; every other entry is
    /// a fan-out target.
    pub fn new(
        store: InventoryStore,
        replicas: &ReplicaSet,
        me: Endpoint,
        frontend: Endpoint,
        peers: Arc<dyn CatalogApi>,
        cache: Arc<dyn FrontendApi>,
    ) -> Self {
        if !replicas.contains(&me) {
            warn!(%me, "own endpoint not in catalog replica set; every replica is a sibling");
        }
        let siblings = replicas.siblings_of(&me);
        info!(%me, siblings = siblings.len(), %frontend, "catalog replica configured");
        Self {
            store,
            siblings,
            frontend,
            peers,
            cache,
            fanout_timeout: DEFAULT_FANOUT_TIMEOUT,
        }
    }

    pub fn with_fanout_timeout(mut self, timeout: Duration) -> Self {
        self.fanout_timeout = timeout;
        self
    }

    pub fn search_by_topic(&self, topic: &str) -> ServiceResult<Vec<Item>> {
        let items = self.store.search_topic(topic).map_err(|e| {
            error!(topic, error = %e, "topic search failed");
            ServiceError::from(e)
        })?;
        debug!(topic, hits = items.len(), "topic search");
        Ok(items)
    }

    pub fn get_by_id(&self, id: ItemId) -> ServiceResult<Item> {
        self.store
            .get_item(id)
            .map_err(|e| {
                error!(item_id = id, error = %e, "item lookup failed");
                ServiceError::from(e)
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("item {id}")))
    }

    /// Apply a stock write and, for origin writes, propagate it.
    ///
    /// A write that matched no row reports `changed == 0`; it still
    /// requests invalidation when it is an origin write, but never fans out.
    pub async fn set_stock(
        &self,
        id: ItemId,
        update: &StockUpdate,
        origin: WriteOrigin,
    ) -> ServiceResult<WriteReport> {
        let new_stock = validate_stock(update.stock)?;
        let expected = update.expected_stock.map(validate_stock).transpose()?;

        let written = match expected {
            Some(expected) => self.store.compare_and_set_stock(id, expected, new_stock),
            None => self.store.set_stock(id, new_stock),
        }
        .map_err(|e| {
            error!(item_id = id, error = %e, "stock write rejected by store");
            ServiceError::from(e)
        })?;

        if let StockWrite::Conflict { current } = written {
            info!(item_id = id, ?expected, current, "conditional stock write lost");
            return Err(ServiceError::Conflict {
                item_id: id,
                current,
            });
        }

        let changed = written.changed();
        info!(item_id = id, new_stock, %origin, changed, "stock write applied");

        let mut report = WriteReport {
            item_id: id,
            new_stock,
            changed,
            origin,
            replicated: Vec::new(),
            cache_invalidated: false,
        };

        // Replicated writes stop here: no re-fan-out, no invalidation storm.
        if !origin.may_propagate() {
            return Ok(report);
        }

        let forward = StockUpdate::set(new_stock)?;
        let (replicated, cache_invalidated) = self.propagate(id, forward, changed > 0).await;
        report.replicated = replicated;
        report.cache_invalidated = cache_invalidated;
        Ok(report)
    }

    /// Fan the write out to siblings (when `fan_out_write`) while the cache
    /// is invalidated, on a task that outlives the inbound request.
    async fn propagate(
        &self,
        id: ItemId,
        update: StockUpdate,
        fan_out_write: bool,
    ) -> (Vec<TargetOutcome>, bool) {
        let siblings = if fan_out_write {
            self.siblings.clone()
        } else {
            Vec::new()
        };
        let peers = Arc::clone(&self.peers);
        let cache = Arc::clone(&self.cache);
        let frontend = self.frontend.clone();
        let timeout = self.fanout_timeout;

        let task = tokio::spawn(async move {
            let replicate = fan_out(&siblings, timeout, |target| {
                peers.set_stock(target, id, &update, WriteOrigin::Replicated)
            });
            let invalidate = async {
                match tokio::time::timeout(timeout, cache.invalidate(&frontend, id)).await {
                    Ok(Ok(_)) => true,
                    Ok(Err(e)) => {
                        warn!(item_id = id, %frontend, error = %e, "cache invalidation failed");
                        false
                    }
                    Err(_) => {
                        warn!(item_id = id, %frontend, "cache invalidation timed out");
                        false
                    }
                }
            };
            tokio::join!(replicate, invalidate)
        });

        match task.await {
            Ok((replicated, cache_invalidated)) => {
                let failed = replicated.iter().filter(|o| !o.ok).count();
                if failed > 0 {
                    warn!(item_id = id, failed, total = replicated.len(), "partial fan-out");
                }
                (replicated, cache_invalidated)
            }
            Err(e) => {
                error!(item_id = id, error = %e, "propagation task aborted");
                (Vec::new(), false)
            }
        }
    }
}
