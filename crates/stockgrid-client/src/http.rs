//! HttpClient: pooled hyper client for calls between tiers.
//!
//! Every request is bounded by the client's timeout. Non-2xx answers come
//! back as `RawResponse` from [`HttpClient::send`]; the typed API methods
//! turn them into [`ClientError::Status`].

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::{Method, Request, StatusCode, header};
use http_body_util::{BodyExt, Full};
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use serde::de::DeserializeOwned;
use stockgrid_core::{
    Endpoint, InvalidateAck, Item, ItemId, PROVENANCE_HEADER, StockUpdate, UpdateAck,
    WriteOrigin,
};
use tracing::debug;

use crate::api::{CatalogApi, FrontendApi, OrderApi};
use crate::error::ClientError;

const USER_AGENT: &str = "stockgrid/0.1";

/// Status and body of a completed HTTP exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

#[derive(Clone)]
pub struct HttpClient {
    inner: Client<HttpConnector, Full<Bytes>>,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(timeout: Duration) -> Self {
        let inner = Client::builder(TokioExecutor::new()).build_http();
        Self { inner, timeout }
    }

    /// Perform one request against `target` + `path`.
    pub async fn send(
        &self,
        method: Method,
        target: &Endpoint,
        path: &str,
        headers: &[(&str, &str)],
        json_body: Option<Vec<u8>>,
    ) -> Result<RawResponse, ClientError> {
        let uri = target.url(path);
        let mut builder = Request::builder()
            .method(method.clone())
            .uri(&uri)
            .header(header::HOST, target.authority())
            .header(header::USER_AGENT, USER_AGENT);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let body = match json_body {
            Some(bytes) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Full::new(Bytes::from(bytes))
            }
            None => Full::new(Bytes::new()),
        };
        let req = builder.body(body).map_err(|e| ClientError::Request {
            target: target.to_string(),
            reason: e.to_string(),
        })?;

        let exchange = async {
            let resp = self
                .inner
                .request(req)
                .await
                .map_err(|e| ClientError::Unreachable {
                    target: target.to_string(),
                    reason: e.to_string(),
                })?;
            let status = resp.status();
            let body = resp
                .into_body()
                .collect()
                .await
                .map_err(|e| ClientError::Unreachable {
                    target: target.to_string(),
                    reason: e.to_string(),
                })?
                .to_bytes();
            Ok(RawResponse { status, body })
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => {
                if let Ok(resp) = &result {
                    debug!(%method, %uri, status = %resp.status, "peer call");
                }
                result
            }
            Err(_) => {
                debug!(%method, %uri, "peer call timed out");
                Err(ClientError::Timeout {
                    target: target.to_string(),
                    after: self.timeout,
                })
            }
        }
    }

    /// Send and require a 2xx JSON response.
    async fn send_json<T: DeserializeOwned>(
        &self,
        method: Method,
        target: &Endpoint,
        path: &str,
        headers: &[(&str, &str)],
        json_body: Option<Vec<u8>>,
    ) -> Result<T, ClientError> {
        let resp = self.send(method, target, path, headers, json_body).await?;
        if !resp.status.is_success() {
            return Err(ClientError::Status {
                target: target.to_string(),
                status: resp.status.as_u16(),
                body: String::from_utf8_lossy(&resp.body).into_owned(),
            });
        }
        serde_json::from_slice(&resp.body).map_err(|e| ClientError::Decode {
            target: target.to_string(),
            reason: e.to_string(),
        })
    }
}

fn segment(raw: &str) -> String {
    urlencoding::encode(raw).into_owned()
}

#[async_trait]
impl CatalogApi for HttpClient {
    async fn search(&self, target: &Endpoint, topic: &str) -> Result<Vec<Item>, ClientError> {
        let path = format!("/search/{}", segment(topic));
        self.send_json(Method::GET, target, &path, &[], None).await
    }

    async fn get_item(&self, target: &Endpoint, id: ItemId) -> Result<Item, ClientError> {
        self.send_json(Method::GET, target, &format!("/info/{id}"), &[], None)
            .await
    }

    async fn set_stock(
        &self,
        target: &Endpoint,
        id: ItemId,
        update: &StockUpdate,
        origin: WriteOrigin,
    ) -> Result<UpdateAck, ClientError> {
        let body = serde_json::to_vec(update).map_err(|e| ClientError::Request {
            target: target.to_string(),
            reason: e.to_string(),
        })?;
        self.send_json(
            Method::PUT,
            target,
            &format!("/update/{id}"),
            &[(PROVENANCE_HEADER, origin.as_str())],
            Some(body),
        )
        .await
    }
}

#[async_trait]
impl FrontendApi for HttpClient {
    async fn invalidate(&self, target: &Endpoint, id: ItemId) -> Result<InvalidateAck, ClientError> {
        self.send_json(
            Method::POST,
            target,
            &format!("/cache/invalidate/{id}"),
            &[],
            None,
        )
        .await
    }
}

#[async_trait]
impl OrderApi for HttpClient {
    async fn purchase(&self, target: &Endpoint, raw_id: &str) -> Result<RawResponse, ClientError> {
        let path = format!("/purchase/{}", segment(raw_id));
        self.send(Method::POST, target, &path, &[], None).await
    }
}
