//! Domain error model.

use thiserror::Error;

use crate::id::{OrderId, ProductId};

/// Result type used across the domain layer.
pub type InventoryResult<T> = Result<T, InventoryError>;

/// Domain-level error.
///
/// Keep this focused on deterministic business failures (stock checks,
/// reservation lookups, adjustment validation). Storage and orchestration
/// concerns belong in the engine crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// No inventory record exists for the product (or it is deactivated).
    #[error("product not found: {0}")]
    ProductNotFound(ProductId),

    /// Requested quantity exceeds the available pool at reserve time.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u64, available: u64 },

    /// No active reservation matches the order on this record.
    #[error("no active reservation for order {order_id}")]
    ReservationNotFound { order_id: OrderId },

    /// A stock target or quantity failed validation.
    #[error("invalid adjustment: {0}")]
    InvalidAdjustment(String),

    /// A bulk reserve had at least one failing item; prior holds in the batch
    /// were compensated before this was returned.
    #[error("partial reservation failure: {failed} of {attempted} items failed")]
    PartialReservationFailure { attempted: usize, failed: usize },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl InventoryError {
    pub fn invalid_adjustment(msg: impl Into<String>) -> Self {
        Self::InvalidAdjustment(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Callers performing compensation or expiry treat this kind as benign.
    pub fn is_reservation_not_found(&self) -> bool {
        matches!(self, Self::ReservationNotFound { .. })
    }
}
