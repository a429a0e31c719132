//! Append-only stock movement entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockhold_core::{CustomerId, OrderId};

/// Kind of stock-affecting event recorded in the movement ledger.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    Reserved,
    Released,
    Sold,
    Adjusted,
    Returned,
}

/// One immutable audit entry recording a stock-affecting event.
///
/// `quantity` is signed relative to the pool the movement affects;
/// `previous_stock`/`new_stock` capture the available pool around the
/// mutation. Movements are the only audit trail: they are appended by record
/// operations and never edited or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub movement_type: MovementType,
    pub quantity: i64,
    pub reason: String,
    pub order_id: Option<OrderId>,
    pub customer_id: Option<CustomerId>,
    pub occurred_at: DateTime<Utc>,
    pub previous_stock: u64,
    pub new_stock: u64,
    pub notes: Option<String>,
}
