//! Service seams between tiers.

use async_trait::async_trait;
use stockgrid_core::{Endpoint, InvalidateAck, Item, ItemId, StockUpdate, UpdateAck, WriteOrigin};

use crate::error::ClientError;
use crate::http::RawResponse;

/// Operations a catalog replica serves to its peers and to the other tiers.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn search(&self, target: &Endpoint, topic: &str) -> Result<Vec<Item>, ClientError>;

    async fn get_item(&self, target: &Endpoint, id: ItemId) -> Result<Item, ClientError>;

    /// `PUT /update/{id}` tagged with `origin`.
    async fn set_stock(
        &self,
        target: &Endpoint,
        id: ItemId,
        update: &StockUpdate,
        origin: WriteOrigin,
    ) -> Result<UpdateAck, ClientError>;
}

/// The front door's cache-coherence endpoint.
#[async_trait]
pub trait FrontendApi: Send + Sync {
    async fn invalidate(&self, target: &Endpoint, id: ItemId) -> Result<InvalidateAck, ClientError>;
}

/// The order tier as seen by the front door: a transparent pass-through.
#[async_trait]
pub trait OrderApi: Send + Sync {
    /// Forward a purchase. Any HTTP status is a successful exchange.
    async fn purchase(&self, target: &Endpoint, raw_id: &str) -> Result<RawResponse, ClientError>;
}
