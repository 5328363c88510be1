//! OrderCoordinator: the purchase protocol.
//!
//! A purchase is: validate, read stock from one replica, refuse at zero,
//! write `stock - 1` to every replica, record the order, invalidate the
//! cached item. Replica write failures are reported, not fatal. The order
//! record is the last durable step; if it fails the decrement stands, the
//! cache is still invalidated, and the caller sees a storage error.

use std::sync::Arc;
use std::time::Duration;

use stockgrid_client::{CatalogApi, FrontendApi, fan_out};
use stockgrid_core::{
    Endpoint, ItemId, OrderNumber, OrderRecord, PurchaseMode, PurchaseReceipt, ReplicaSet,
    ServiceError, ServiceResult, StockUpdate, TargetOutcome, WriteOrigin, all_succeeded,
    parse_item_id,
};
use stockgrid_state::OrderLog;
use tracing::{debug, error, info, warn};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);
const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Stock decrement applied to the replicas, before the order is recorded.
struct Decrement {
    new_stock: u64,
    replicas: Vec<TargetOutcome>,
}

pub struct OrderCoordinator {
    catalogs: ReplicaSet,
    ledger: Arc<dyn OrderLog>,
    catalog: Arc<dyn CatalogApi>,
    frontend: Arc<dyn FrontendApi>,
    frontend_endpoint: Endpoint,
    mode: PurchaseMode,
    max_attempts: u32,
    timeout: Duration,
}

impl OrderCoordinator {
    pub fn new(
        catalogs: ReplicaSet,
        ledger: Arc<dyn OrderLog>,
        catalog: Arc<dyn CatalogApi>,
        frontend: Arc<dyn FrontendApi>,
        frontend_endpoint: Endpoint,
    ) -> Self {
        Self {
            catalogs,
            ledger,
            catalog,
            frontend,
            frontend_endpoint,
            mode: PurchaseMode::Baseline,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// `max_attempts` only matters in optimistic mode; zero is treated as one.
    pub fn with_mode(mut self, mode: PurchaseMode, max_attempts: u32) -> Self {
        self.mode = mode;
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn order(&self, order_number: OrderNumber) -> ServiceResult<OrderRecord> {
        self.ledger
            .get(order_number)?
            .ok_or_else(|| ServiceError::NotFound(format!("order {order_number}")))
    }

    pub async fn purchase(&self, raw_id: &str) -> ServiceResult<PurchaseReceipt> {
        let id = parse_item_id(raw_id)?;

        let decrement = match self.mode {
            PurchaseMode::Baseline => self.decrement_everywhere(id).await?,
            PurchaseMode::Optimistic => self.decrement_through_gate(id).await?,
        };

        let recorded = self.ledger.append(id);
        self.invalidate(id).await;
        let record = recorded.map_err(|e| {
            error!(
                item_id = id,
                new_stock = decrement.new_stock,
                error = %e,
                "stock decremented but order not recorded"
            );
            ServiceError::from(e)
        })?;

        let replicas_consistent = all_succeeded(&decrement.replicas);
        if !replicas_consistent {
            warn!(
                item_id = id,
                order_number = record.order_number,
                "purchase completed with divergent replicas"
            );
        }
        info!(
            item_id = id,
            order_number = record.order_number,
            new_stock = decrement.new_stock,
            "purchase completed"
        );
        Ok(PurchaseReceipt {
            order_number: record.order_number,
            item_id: id,
            new_stock: decrement.new_stock,
            replicas_consistent,
            replicas: decrement.replicas,
        })
    }

    /// Read from one replica, then write the decrement to all of them.
    async fn decrement_everywhere(&self, id: ItemId) -> ServiceResult<Decrement> {
        let stock = self.read_stock(id).await?;
        let new_stock = Self::decremented(id, stock)?;
        let replicas = self
            .write_unconditionally(self.catalogs.all(), id, new_stock)
            .await?;
        Ok(Decrement {
            new_stock,
            replicas,
        })
    }

    /// Compare-and-swap on the gate replica, retrying with the stock it
    /// reports, then propagate to the remaining replicas.
    async fn decrement_through_gate(&self, id: ItemId) -> ServiceResult<Decrement> {
        let gate = self.catalogs.primary();
        let mut observed = self.read_stock(id).await?;

        for attempt in 1..=self.max_attempts {
            let new_stock = Self::decremented(id, observed)?;
            let update = StockUpdate::conditional(new_stock, observed)?;
            let call = self.catalog.set_stock(gate, id, &update, WriteOrigin::Origin);

            match tokio::time::timeout(self.timeout, call).await {
                Ok(Ok(_)) => {
                    debug!(item_id = id, %gate, attempt, new_stock, "gate accepted decrement");
                    let others = self.catalogs.siblings_of(gate);
                    let mut replicas = vec![TargetOutcome::success(gate.as_str())];
                    replicas.extend(self.write_unconditionally(&others, id, new_stock).await?);
                    return Ok(Decrement {
                        new_stock,
                        replicas,
                    });
                }
                Ok(Err(e)) => match e.conflict_current() {
                    Some(current) => {
                        info!(item_id = id, attempt, observed, current, "gate reported newer stock");
                        observed = current;
                    }
                    None => return Err(e.into()),
                },
                Err(_) => {
                    return Err(ServiceError::UpstreamUnavailable {
                        target: gate.to_string(),
                        reason: format!("timed out after {:?}", self.timeout),
                    });
                }
            }
        }

        warn!(item_id = id, attempts = self.max_attempts, "giving up on contended item");
        Err(ServiceError::Conflict {
            item_id: id,
            current: observed,
        })
    }

    async fn read_stock(&self, id: ItemId) -> ServiceResult<u64> {
        let reader = self.catalogs.next();
        let item = self.catalog.get_item(reader, id).await.map_err(|e| {
            if !e.is_not_found() {
                warn!(item_id = id, target = %reader, error = %e, "stock read failed");
            }
            ServiceError::from(e)
        })?;
        debug!(item_id = id, target = %reader, stock = item.stock, "stock read");
        Ok(item.stock)
    }

    fn decremented(id: ItemId, stock: u64) -> ServiceResult<u64> {
        match stock.checked_sub(1) {
            Some(next) => Ok(next),
            None => {
                info!(item_id = id, "purchase refused: out of stock");
                Err(ServiceError::OutOfStock(id))
            }
        }
    }

    async fn write_unconditionally(
        &self,
        targets: &[Endpoint],
        id: ItemId,
        new_stock: u64,
    ) -> ServiceResult<Vec<TargetOutcome>> {
        let update = StockUpdate::set(new_stock)?;
        let catalog = &self.catalog;
        Ok(fan_out(targets, self.timeout, |target| {
            catalog.set_stock(target, id, &update, WriteOrigin::Origin)
        })
        .await)
    }

    async fn invalidate(&self, id: ItemId) {
        let target = &self.frontend_endpoint;
        match tokio::time::timeout(self.timeout, self.frontend.invalidate(target, id)).await {
            Ok(Ok(ack)) => debug!(item_id = id, evicted = ack.evicted, "cache invalidated"),
            Ok(Err(e)) => warn!(item_id = id, %target, error = %e, "cache invalidation failed"),
            Err(_) => warn!(item_id = id, %target, "cache invalidation timed out"),
        }
    }
}
