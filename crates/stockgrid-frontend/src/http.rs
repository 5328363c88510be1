//! Front door HTTP routes.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use stockgrid_core::{InvalidateAck, Item, ServiceResult, parse_item_id};

use crate::cache::CacheStats;
use crate::door::FrontDoor;

#[derive(Clone)]
pub struct FrontendState {
    pub door: Arc<FrontDoor>,
}

pub fn build_router(door: Arc<FrontDoor>) -> Router {
    Router::new()
        .route("/search/{topic}", get(search))
        .route("/info/{id}", get(info))
        .route("/purchase/{id}", post(purchase))
        .route("/cache/invalidate/{id}", post(invalidate))
        .route("/cache/stats", get(cache_stats))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(FrontendState { door })
}

async fn search(
    State(state): State<FrontendState>,
    Path(topic): Path<String>,
) -> ServiceResult<Json<Vec<Item>>> {
    Ok(Json(state.door.handle_search(&topic).await?))
}

async fn info(
    State(state): State<FrontendState>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<Item>> {
    let id = parse_item_id(&raw_id)?;
    Ok(Json(state.door.handle_info(id).await?))
}

/// The coordinator's answer is relayed verbatim, including error statuses.
async fn purchase(
    State(state): State<FrontendState>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Response> {
    let upstream = state.door.handle_purchase(&raw_id).await?;
    Ok((
        upstream.status,
        [(header::CONTENT_TYPE, "application/json")],
        Body::from(upstream.body),
    )
        .into_response())
}

async fn invalidate(
    State(state): State<FrontendState>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<InvalidateAck>> {
    let id = parse_item_id(&raw_id)?;
    Ok(Json(state.door.handle_invalidate(id)))
}

async fn cache_stats(State(state): State<FrontendState>) -> Json<CacheStats> {
    Json(state.door.cache().stats())
}
