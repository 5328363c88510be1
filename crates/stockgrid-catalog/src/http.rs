//! Catalog replica HTTP routes.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::routing::{get, put};
use axum::{Json, Router};
use stockgrid_core::{
    Item, PROVENANCE_HEADER, ServiceError, ServiceResult, StockUpdate, UpdateAck, WriteOrigin,
    parse_item_id,
};
use tracing::{debug, info};

use crate::replica::CatalogReplica;

/// Shared state for catalog handlers.
#[derive(Clone)]
pub struct CatalogState {
    pub replica: Arc<CatalogReplica>,
}

pub fn build_router(replica: Arc<CatalogReplica>) -> Router {
    Router::new()
        .route("/search/{topic}", get(search))
        .route("/info/{id}", get(info))
        .route("/update/{id}", put(update_stock))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(CatalogState { replica })
}

/// GET /search/{topic}
pub async fn search(
    State(state): State<CatalogState>,
    Path(topic): Path<String>,
) -> ServiceResult<Json<Vec<Item>>> {
    let items = state.replica.search_by_topic(&topic)?;
    info!(%topic, hits = items.len(), "search served");
    Ok(Json(items))
}

/// GET /info/{id}
pub async fn info(
    State(state): State<CatalogState>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<Item>> {
    let id = parse_item_id(&raw_id)?;
    let item = state.replica.get_by_id(id)?;
    debug!(item_id = id, stock = item.stock, "info served");
    Ok(Json(item))
}

/// PUT /update/{id}
///
/// The provenance header decides whether the write propagates.
pub async fn update_stock(
    State(state): State<CatalogState>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Result<Json<StockUpdate>, JsonRejection>,
) -> ServiceResult<Json<UpdateAck>> {
    let id = parse_item_id(&raw_id)?;
    let Json(update) = body.map_err(|e| ServiceError::InvalidArgument(e.body_text()))?;
    let origin = WriteOrigin::from_header(headers.get(PROVENANCE_HEADER));

    let report = state.replica.set_stock(id, &update, origin).await?;
    if report.changed == 0 {
        return Err(ServiceError::NotFound(format!("item {id}")));
    }
    Ok(Json(report.into_ack()))
}
