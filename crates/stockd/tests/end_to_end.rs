//! Multi-node end-to-end tests.
//!
//! Catalog replicas, one front door, and one order coordinator run
//! in-process on ephemeral ports and talk to each other over real HTTP.
//! Every tier takes its timeouts from the same `NodeConfig` budget the
//! daemon uses.

use std::sync::Arc;

use http::{Method, StatusCode};
use serde_json::Value;
use stockgrid_catalog::CatalogReplica;
use stockgrid_client::{CatalogApi, HttpClient};
use stockgrid_core::{
    Endpoint, Item, NodeConfig, PurchaseMode, ReplicaSet, StockUpdate, WriteOrigin,
};
use stockgrid_frontend::{FrontDoor, InMemoryCache};
use stockgrid_order::OrderCoordinator;
use stockgrid_state::{InventoryStore, OrderLedger};
use tokio::net::TcpListener;

const FANOUT_TIMEOUT_MS: u64 = 2_000;

struct Cluster {
    catalogs: Vec<Endpoint>,
    frontend: Endpoint,
    order: Endpoint,
    client: HttpClient,
    _dir: tempfile::TempDir,
}

fn catalog_items() -> Vec<Item> {
    vec![
        Item {
            id: 1,
            title: "How to get a good grade in 677 in 20 minutes a day".into(),
            cost: 20,
            topic: "Distributed Systems".into(),
            stock: 10,
        },
        Item {
            id: 2,
            title: "RPCs for Noobs".into(),
            cost: 50,
            topic: "Distributed Systems".into(),
            stock: 5,
        },
        Item {
            id: 3,
            title: "Xen and the Art of Surviving Undergraduate School".into(),
            cost: 15,
            topic: "Undergraduate School".into(),
            stock: 1,
        },
    ]
}

async fn bind() -> (TcpListener, Endpoint) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = Endpoint::new(&listener.local_addr().unwrap().to_string());
    (listener, endpoint)
}

fn spawn(listener: TcpListener, router: axum::Router) {
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
}

/// A replica that accepts connections and never answers on them.
async fn spawn_hung_replica() -> Endpoint {
    let (listener, endpoint) = bind().await;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });
    endpoint
}

async fn start_cluster(mode: PurchaseMode) -> Cluster {
    start_cluster_with(mode, 0, FANOUT_TIMEOUT_MS).await
}

/// Two live catalog replicas followed by `hung` unresponsive ones.
async fn start_cluster_with(mode: PurchaseMode, hung: usize, fanout_timeout_ms: u64) -> Cluster {
    let mut config = NodeConfig::default();
    config.replication.fanout_timeout_ms = fanout_timeout_ms;
    config.purchase.mode = mode;
    config.validate().unwrap();

    let dir = tempfile::tempdir().unwrap();
    let (c1, c1_url) = bind().await;
    let (c2, c2_url) = bind().await;
    let (fe, fe_url) = bind().await;
    let (od, od_url) = bind().await;
    let mut catalogs = vec![c1_url, c2_url];
    for _ in 0..hung {
        catalogs.push(spawn_hung_replica().await);
    }

    let peer_client = HttpClient::new(config.fanout_timeout());
    for (i, (listener, me)) in [c1, c2].into_iter().zip(catalogs.clone()).enumerate() {
        let store = InventoryStore::open(&dir.path().join(format!("catalog{i}.redb"))).unwrap();
        for item in catalog_items() {
            store.insert_item(&item).unwrap();
        }
        let set = ReplicaSet::new("catalog", catalogs.clone()).unwrap();
        let replica = CatalogReplica::new(
            store,
            &set,
            me,
            fe_url.clone(),
            Arc::new(peer_client.clone()),
            Arc::new(peer_client.clone()),
        )
        .with_fanout_timeout(config.fanout_timeout());
        spawn(listener, stockgrid_catalog::build_router(Arc::new(replica)));
    }

    let door = FrontDoor::new(
        ReplicaSet::new("catalog", catalogs.clone()).unwrap(),
        ReplicaSet::new("order", vec![od_url.clone()]).unwrap(),
        Arc::new(InMemoryCache::new()),
        Arc::new(peer_client.clone()),
        Arc::new(HttpClient::new(config.purchase_timeout())),
    );
    spawn(fe, stockgrid_frontend::build_router(Arc::new(door)));

    let write_client = HttpClient::new(config.replica_write_timeout());
    let coordinator = OrderCoordinator::new(
        ReplicaSet::new("catalog", catalogs.clone()).unwrap(),
        Arc::new(OrderLedger::open(&dir.path().join("orders.redb")).unwrap()),
        Arc::new(write_client.clone()),
        Arc::new(write_client),
        fe_url.clone(),
    )
    .with_mode(config.purchase.mode, config.purchase.max_attempts)
    .with_timeout(config.replica_write_timeout());
    spawn(od, stockgrid_order::build_router(Arc::new(coordinator)));

    Cluster {
        catalogs,
        frontend: fe_url,
        order: od_url,
        client: HttpClient::new(config.purchase_timeout() * 2),
        _dir: dir,
    }
}

impl Cluster {
    async fn call(&self, method: Method, target: &Endpoint, path: &str) -> (StatusCode, Value) {
        let resp = self
            .client
            .send(method, target, path, &[], None)
            .await
            .unwrap();
        let body = if resp.body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&resp.body).unwrap()
        };
        (resp.status, body)
    }

    async fn front(&self, method: Method, path: &str) -> (StatusCode, Value) {
        self.call(method, &self.frontend, path).await
    }

    async fn stock_on(&self, replica: usize, id: u64) -> u64 {
        self.client
            .get_item(&self.catalogs[replica], id)
            .await
            .unwrap()
            .stock
    }
}

#[tokio::test]
async fn purchase_through_front_door() {
    let cluster = start_cluster(PurchaseMode::Baseline).await;

    let (status, item) = cluster.front(Method::GET, "/info/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(item["stock"], 5);

    let (status, receipt) = cluster.front(Method::POST, "/purchase/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(receipt["order_number"], 1);
    assert_eq!(receipt["item_id"], 2);
    assert_eq!(receipt["new_stock"], 4);
    assert_eq!(receipt["replicas_consistent"], true);

    // The cached copy was invalidated by the purchase.
    let (_, item) = cluster.front(Method::GET, "/info/2").await;
    assert_eq!(item["stock"], 4);

    assert_eq!(cluster.stock_on(0, 2).await, 4);
    assert_eq!(cluster.stock_on(1, 2).await, 4);

    let (status, order) = cluster.call(Method::GET, &cluster.order, "/orders/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["item_id"], 2);
}

#[tokio::test]
async fn search_ignores_topic_case() {
    let cluster = start_cluster(PurchaseMode::Baseline).await;

    let (status, hits) = cluster
        .front(Method::GET, "/search/distributed%20systems")
        .await;
    assert_eq!(status, StatusCode::OK);
    let mut ids: Vec<u64> = hits
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["id"].as_u64().unwrap())
        .collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![1, 2]);

    let (status, hits) = cluster.front(Method::GET, "/search/cooking").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(hits, serde_json::json!([]));
}

#[tokio::test]
async fn origin_update_reaches_sibling_and_cache() {
    let cluster = start_cluster(PurchaseMode::Baseline).await;

    // Warm the cache.
    let (_, item) = cluster.front(Method::GET, "/info/1").await;
    assert_eq!(item["stock"], 10);

    let ack = cluster
        .client
        .set_stock(&cluster.catalogs[0], 1, &StockUpdate::set(7).unwrap(), WriteOrigin::Origin)
        .await
        .unwrap();
    assert_eq!(ack.new_stock, 7);
    assert_eq!(ack.replicated.len(), 1);
    assert!(ack.replicated[0].ok);
    assert!(ack.cache_invalidated);

    assert_eq!(cluster.stock_on(1, 1).await, 7);
    let (_, item) = cluster.front(Method::GET, "/info/1").await;
    assert_eq!(item["stock"], 7);
}

#[tokio::test]
async fn error_statuses_pass_through_the_front_door() {
    let cluster = start_cluster(PurchaseMode::Baseline).await;

    let (status, _) = cluster.front(Method::POST, "/purchase/3").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = cluster.front(Method::POST, "/purchase/3").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["kind"], "out_of_stock");
    assert_eq!(cluster.stock_on(0, 3).await, 0);

    let (status, _) = cluster.front(Method::POST, "/purchase/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = cluster.front(Method::POST, "/purchase/abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = cluster.front(Method::GET, "/info/42").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn optimistic_mode_sells_last_unit_once() {
    let cluster = start_cluster(PurchaseMode::Optimistic).await;

    let (a, b) = tokio::join!(
        cluster.front(Method::POST, "/purchase/3"),
        cluster.front(Method::POST, "/purchase/3"),
    );
    let mut statuses = [a.0, b.0];
    statuses.sort();
    assert_eq!(statuses, [StatusCode::OK, StatusCode::CONFLICT]);
    assert_eq!(cluster.stock_on(0, 3).await, 0);
    assert_eq!(cluster.stock_on(1, 3).await, 0);
}

#[tokio::test]
async fn invalidate_is_idempotent_over_http() {
    let cluster = start_cluster(PurchaseMode::Baseline).await;
    cluster.front(Method::GET, "/info/2").await;

    let (status, ack) = cluster.front(Method::POST, "/cache/invalidate/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["evicted"], true);

    let (status, ack) = cluster.front(Method::POST, "/cache/invalidate/2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ack["evicted"], false);
}

#[tokio::test]
async fn hung_replica_does_not_fail_a_committed_purchase() {
    let cluster = start_cluster_with(PurchaseMode::Baseline, 1, 300).await;

    let (status, receipt) = cluster.front(Method::POST, "/purchase/2").await;
    assert_eq!(status, StatusCode::OK, "{receipt}");
    assert_eq!(receipt["order_number"], 1);
    assert_eq!(receipt["new_stock"], 4);
    assert_eq!(receipt["replicas_consistent"], false);

    let ok: Vec<bool> = receipt["replicas"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["ok"].as_bool().unwrap())
        .collect();
    assert_eq!(ok, [true, true, false], "only the hung replica missed the write");

    assert_eq!(cluster.stock_on(0, 2).await, 4);
    assert_eq!(cluster.stock_on(1, 2).await, 4);
    let (status, order) = cluster.call(Method::GET, &cluster.order, "/orders/1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["item_id"], 2);
}

#[tokio::test]
async fn cache_stats_are_served_by_the_front_door() {
    let cluster = start_cluster(PurchaseMode::Baseline).await;
    cluster.front(Method::GET, "/info/1").await;
    cluster.front(Method::GET, "/info/1").await;

    let (status, stats) = cluster.front(Method::GET, "/cache/stats").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stats["hits"], 1);
    assert_eq!(stats["misses"], 1);
    assert_eq!(stats["entries"], 1);
}
