//! Stock holds tied to in-flight orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockhold_core::{CustomerId, OrderId};

/// Reservation lifecycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReservationStatus {
    Active,
    Confirmed,
    Expired,
    Cancelled,
}

impl ReservationStatus {
    /// Only active reservations count against `reserved_stock`.
    pub fn is_active(self) -> bool {
        matches!(self, ReservationStatus::Active)
    }
}

/// A time-bounded hold of quantity against a product's stock, tied to one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub quantity: u64,
    pub reserved_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub status: ReservationStatus,
}

impl Reservation {
    /// An active hold whose time-to-live has elapsed.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.status.is_active() && self.expires_at < now
    }
}
