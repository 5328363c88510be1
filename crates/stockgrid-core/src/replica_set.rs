//! Replica sets: ordered peer lists with round-robin selection.
//!
//! A `ReplicaSet` is read once at startup and never changes. Selection
//! advances a per-set atomic counter, so concurrent requests never observe
//! a torn read-modify-write.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Base URL of a peer service, e.g. `http://catalog1:4000`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    /// Normalize a base URL: trims whitespace and trailing slashes, and
    /// defaults the scheme to `http://`.
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim().trim_end_matches('/');
        if trimmed.contains("://") {
            Self(trimmed.to_string())
        } else {
            Self(format!("http://{trimmed}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Join a path (which must start with `/`) onto the base URL.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.0)
    }

    /// `host:port` portion, used for the `Host` header.
    pub fn authority(&self) -> &str {
        let rest = self.0.split_once("://").map(|(_, r)| r).unwrap_or(&self.0);
        rest.split('/').next().unwrap_or(rest)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReplicaSetError {
    #[error("no {0} replicas configured")]
    Empty(&'static str),
}

/// Ordered, immutable list of endpoints with an atomic round-robin cursor.
#[derive(Debug)]
pub struct ReplicaSet {
    endpoints: Vec<Endpoint>,
    cursor: AtomicUsize,
}

impl ReplicaSet {
    /// Build a replica set. `role` is only used in logs and errors.
    pub fn new(role: &'static str, endpoints: Vec<Endpoint>) -> Result<Self, ReplicaSetError> {
        if endpoints.is_empty() {
            return Err(ReplicaSetError::Empty(role));
        }
        debug!(role, count = endpoints.len(), "replica set configured");
        Ok(Self {
            endpoints,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Parse a comma-separated endpoint list. Blank entries are dropped.
    pub fn from_csv(role: &'static str, csv: &str) -> Result<Self, ReplicaSetError> {
        let endpoints = csv
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(Endpoint::new)
            .collect();
        Self::new(role, endpoints)
    }

    /// Select the next endpoint (round-robin, wraps around).
    pub fn next(&self) -> &Endpoint {
        let idx = self.cursor.fetch_add(1, Ordering::Relaxed) % self.endpoints.len();
        &self.endpoints[idx]
    }

    /// First endpoint in configuration order.
    pub fn primary(&self) -> &Endpoint {
        &self.endpoints[0]
    }

    pub fn all(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Every endpoint except `me`.
    pub fn siblings_of(&self, me: &Endpoint) -> Vec<Endpoint> {
        self.endpoints.iter().filter(|e| *e != me).cloned().collect()
    }

    pub fn contains(&self, endpoint: &Endpoint) -> bool {
        self.endpoints.contains(endpoint)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
