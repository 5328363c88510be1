//! Domain and wire types shared by every StockGrid tier.
//!
//! Items and orders are persisted as JSON by `stockgrid-state` and travel
//! as JSON between services, so the same structs serve both purposes.

use serde::{Deserialize, Serialize};

use crate::error::{ServiceError, ServiceResult};

/// Catalog item identifier.
pub type ItemId = u64;

/// Order number assigned by an order coordinator's local ledger.
pub type OrderNumber = u64;

// ── Item ──────────────────────────────────────────────────────────

/// A catalog item as stored by a replica and served to clients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub cost: i64,
    pub topic: String,
    /// Units on hand. Unsigned, so a replica can never store a negative count.
    pub stock: u64,
}

impl Item {
    /// Case-insensitive topic comparison used by topic search.
    pub fn matches_topic(&self, topic: &str) -> bool {
        self.topic.to_lowercase() == topic.trim().to_lowercase()
    }
}

// ── Order ─────────────────────────────────────────────────────────

/// An append-only purchase record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OrderRecord {
    pub order_number: OrderNumber,
    pub item_id: ItemId,
    /// Unix timestamp (seconds) when the order was recorded.
    pub created_at: u64,
}

// ── Requests ──────────────────────────────────────────────────────

/// Body of `PUT /update/{id}`.
///
/// `ExpectedStock` turns the write into a compare-and-swap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StockUpdate {
    #[serde(rename = "Stock", alias = "stock")]
    pub stock: i64,
    #[serde(
        rename = "ExpectedStock",
        alias = "expected_stock",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_stock: Option<i64>,
}

impl StockUpdate {
    /// Unconditional write of `stock`.
    pub fn set(stock: u64) -> ServiceResult<Self> {
        Ok(Self {
            stock: wire_stock(stock)?,
            expected_stock: None,
        })
    }

    /// Write `stock` only if the replica still holds `expected`.
    pub fn conditional(stock: u64, expected: u64) -> ServiceResult<Self> {
        Ok(Self {
            stock: wire_stock(stock)?,
            expected_stock: Some(wire_stock(expected)?),
        })
    }
}

fn wire_stock(stock: u64) -> ServiceResult<i64> {
    i64::try_from(stock)
        .map_err(|_| ServiceError::InvalidArgument(format!("stock {stock} out of range")))
}

// ── Responses ─────────────────────────────────────────────────────

/// Result of one side-effect call against one peer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetOutcome {
    pub target: String,
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TargetOutcome {
    pub fn success(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ok: true,
            error: None,
        }
    }

    pub fn failure(target: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ok: false,
            error: Some(error.into()),
        }
    }
}

/// True when every outcome succeeded (vacuously true for an empty list).
pub fn all_succeeded(outcomes: &[TargetOutcome]) -> bool {
    outcomes.iter().all(|o| o.ok)
}

/// Response body of a successful `PUT /update/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateAck {
    pub item_id: ItemId,
    pub new_stock: u64,
    /// Per-sibling fan-out outcomes. Empty for replicated writes.
    #[serde(default)]
    pub replicated: Vec<TargetOutcome>,
    #[serde(default)]
    pub cache_invalidated: bool,
}

/// Response body of a successful `POST /purchase/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PurchaseReceipt {
    pub order_number: OrderNumber,
    pub item_id: ItemId,
    pub new_stock: u64,
    /// False when at least one replica write failed.
    pub replicas_consistent: bool,
    #[serde(default)]
    pub replicas: Vec<TargetOutcome>,
}

/// Response body of `POST /cache/invalidate/{id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvalidateAck {
    pub item_id: ItemId,
    /// Whether an entry was actually present.
    pub evicted: bool,
}

// ── Validation ────────────────────────────────────────────────────

/// Parse a path segment as an item id. Only plain decimal digits are accepted.
pub fn parse_item_id(raw: &str) -> ServiceResult<ItemId> {
    let raw = raw.trim();
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ServiceError::InvalidArgument(format!(
            "invalid item id '{raw}'"
        )));
    }
    raw.parse::<ItemId>()
        .map_err(|_| ServiceError::InvalidArgument(format!("item id '{raw}' out of range")))
}

/// Parse a path segment as an order number.
pub fn parse_order_number(raw: &str) -> ServiceResult<OrderNumber> {
    parse_item_id(raw).map_err(|_| {
        ServiceError::InvalidArgument(format!("invalid order number '{}'", raw.trim()))
    })
}

/// Reject negative stock values coming off the wire.
pub fn validate_stock(stock: i64) -> ServiceResult<u64> {
    u64::try_from(stock)
        .map_err(|_| ServiceError::InvalidArgument(format!("stock must be >= 0, got {stock}")))
}

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
