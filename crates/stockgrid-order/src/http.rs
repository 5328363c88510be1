//! Order coordinator HTTP routes.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use stockgrid_core::{OrderRecord, PurchaseReceipt, ServiceError, ServiceResult, parse_order_number};
use tracing::error;

use crate::coordinator::OrderCoordinator;

#[derive(Clone)]
pub struct OrderState {
    pub coordinator: Arc<OrderCoordinator>,
}

pub fn build_router(coordinator: Arc<OrderCoordinator>) -> Router {
    Router::new()
        .route("/purchase/{id}", post(purchase))
        .route("/orders/{order_number}", get(order))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(OrderState { coordinator })
}

/// POST /purchase/{id}
///
/// Runs on its own task so a disconnecting client cannot cut the
/// sequence short between the decrement and the order record.
async fn purchase(
    State(state): State<OrderState>,
    Path(raw_id): Path<String>,
) -> ServiceResult<Json<PurchaseReceipt>> {
    let coordinator = Arc::clone(&state.coordinator);
    let task = tokio::spawn(async move { coordinator.purchase(&raw_id).await });
    match task.await {
        Ok(receipt) => receipt.map(Json),
        Err(e) => {
            error!(error = %e, "purchase task aborted");
            Err(ServiceError::Storage(format!("purchase aborted: {e}")))
        }
    }
}

/// GET /orders/{order_number}
async fn order(
    State(state): State<OrderState>,
    Path(raw): Path<String>,
) -> ServiceResult<Json<OrderRecord>> {
    let number = parse_order_number(&raw)?;
    Ok(Json(state.coordinator.order(number)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use stockgrid_core::PurchaseMode;
    use tower::ServiceExt;

    use crate::coordinator::tests::{ReplicatedCatalog, coordinator};

    fn router_for(stock: u64) -> Router {
        let catalog = Arc::new(ReplicatedCatalog::seeded(2, stock));
        build_router(Arc::new(coordinator(
            catalog,
            Default::default(),
            PurchaseMode::Baseline,
        )))
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn purchase_returns_receipt_and_order_is_retrievable() {
        let router = router_for(5);

        let resp = router.clone().oneshot(request("POST", "/purchase/2")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let receipt = body_json(resp).await;
        assert_eq!(receipt["order_number"], 1);
        assert_eq!(receipt["item_id"], 2);
        assert_eq!(receipt["new_stock"], 4);
        assert_eq!(receipt["replicas_consistent"], true);

        let resp = router.oneshot(request("GET", "/orders/1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["item_id"], 2);
    }

    #[tokio::test]
    async fn purchase_error_statuses() {
        let router = router_for(0);

        let resp = router.clone().oneshot(request("POST", "/purchase/2")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        assert_eq!(body_json(resp).await["kind"], "out_of_stock");

        let resp = router.clone().oneshot(request("POST", "/purchase/8")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = router.oneshot(request("POST", "/purchase/two")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_or_malformed_order_lookup() {
        let router = router_for(5);

        let resp = router.clone().oneshot(request("GET", "/orders/1")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = router.oneshot(request("GET", "/orders/first")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn healthz() {
        let resp = router_for(1).oneshot(request("GET", "/healthz")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
