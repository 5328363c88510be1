//! FrontDoor: request routing and read-through caching.
//!
//! Each tier gets its own [`ReplicaSet`], so catalog and order traffic
//! rotate independently. Only `info` reads are cached; search results and
//! purchases always travel upstream.

use std::sync::Arc;

use stockgrid_client::{CatalogApi, ClientError, OrderApi, RawResponse};
use stockgrid_core::{Endpoint, InvalidateAck, Item, ItemId, ReplicaSet, ServiceError, ServiceResult};
use tracing::{debug, info, warn};

use crate::cache::ItemCache;

pub struct FrontDoor {
    catalogs: ReplicaSet,
    orders: ReplicaSet,
    cache: Arc<dyn ItemCache>,
    catalog: Arc<dyn CatalogApi>,
    order: Arc<dyn OrderApi>,
}

impl FrontDoor {
    pub fn new(
        catalogs: ReplicaSet,
        orders: ReplicaSet,
        cache: Arc<dyn ItemCache>,
        catalog: Arc<dyn CatalogApi>,
        order: Arc<dyn OrderApi>,
    ) -> Self {
        info!(
            catalogs = catalogs.len(),
            orders = orders.len(),
            "front door configured"
        );
        Self {
            catalogs,
            orders,
            cache,
            catalog,
            order,
        }
    }

    pub fn pick_catalog_target(&self) -> &Endpoint {
        self.catalogs.next()
    }

    pub fn pick_order_target(&self) -> &Endpoint {
        self.orders.next()
    }

    pub fn cache(&self) -> &Arc<dyn ItemCache> {
        &self.cache
    }

    /// Serve from cache, else read one catalog replica and remember the
    /// answer. Not-found answers are never cached, and neither is a read
    /// that an invalidation overtook.
    pub async fn handle_info(&self, id: ItemId) -> ServiceResult<Item> {
        if let Some(item) = self.cache.get(id) {
            debug!(item_id = id, "cache hit");
            return Ok(item);
        }
        let seen = self.cache.generation(id);

        let target = self.pick_catalog_target();
        debug!(item_id = id, %target, "cache miss");
        let item = self.catalog.get_item(target, id).await.map_err(|e| {
            if !e.is_not_found() {
                warn!(item_id = id, %target, error = %e, "catalog lookup failed");
            }
            ServiceError::from(e)
        })?;

        self.cache.put(item.clone(), seen);
        Ok(item)
    }

    /// Forward a topic search. Transport failures surface as a 500 that
    /// names the replica.
    pub async fn handle_search(&self, topic: &str) -> ServiceResult<Vec<Item>> {
        let target = self.pick_catalog_target();
        self.catalog
            .search(target, topic)
            .await
            .map_err(|e| match e {
                e if e.is_transport() => {
                    warn!(topic, %target, error = %e, "catalog search unreachable");
                    ServiceError::Upstream {
                        target: target.to_string(),
                        status: 500,
                        message: e.to_string(),
                    }
                }
                e => ServiceError::from(e),
            })
    }

    /// Relay a purchase to one order coordinator, status and body intact.
    pub async fn handle_purchase(&self, raw_id: &str) -> ServiceResult<RawResponse> {
        let target = self.pick_order_target();
        let resp = self
            .order
            .purchase(target, raw_id)
            .await
            .map_err(|e: ClientError| {
                warn!(id = raw_id, %target, error = %e, "order coordinator unreachable");
                ServiceError::from(e)
            })?;
        info!(id = raw_id, %target, status = %resp.status, "purchase relayed");
        Ok(resp)
    }

    pub fn handle_invalidate(&self, id: ItemId) -> InvalidateAck {
        let evicted = self.cache.invalidate(id);
        debug!(item_id = id, evicted, "cache invalidation");
        InvalidateAck { item_id: id, evicted }
    }
}
