//! Per-product stock ledger with embedded reservations and movements.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use stockhold_core::{CustomerId, InventoryError, InventoryResult, OrderId, ProductId, SellerId};

use crate::availability::Availability;
use crate::movement::{Movement, MovementType};
use crate::reservation::{Reservation, ReservationStatus};

/// Outcome of a successful reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveOutcome {
    pub available_stock: u64,
    pub expires_at: DateTime<Utc>,
}

/// Outcome of a successful confirm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmOutcome {
    pub quantity: u64,
    pub reserved_stock: u64,
    pub sold_stock: u64,
    pub available_stock: u64,
}

/// Outcome of a successful release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseOutcome {
    pub quantity: u64,
    pub status: ReservationStatus,
    pub reserved_stock: u64,
    pub available_stock: u64,
}

/// One product's stock ledger.
///
/// Counters and derived flags are mutated exclusively through the operation
/// methods below; every counter mutation recomputes the derived fields and
/// appends exactly one movement. All methods are deterministic: the clock is
/// passed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryRecord {
    product_id: ProductId,
    seller_id: SellerId,
    total_stock: u64,
    reserved_stock: u64,
    sold_stock: u64,
    available_stock: u64,
    low_stock_threshold: u64,
    is_out_of_stock: bool,
    is_low_stock: bool,
    is_active: bool,
    reservations: Vec<Reservation>,
    movements: Vec<Movement>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InventoryRecord {
    /// Create a record seeded from the catalog's current stock.
    ///
    /// Seeding a non-zero quantity appends an initial `in` movement so the
    /// ledger explains every unit the record has ever held.
    pub fn provision(
        product_id: ProductId,
        seller_id: SellerId,
        initial_stock: u64,
        low_stock_threshold: u64,
        now: DateTime<Utc>,
    ) -> Self {
        let mut record = Self {
            product_id,
            seller_id,
            total_stock: 0,
            reserved_stock: 0,
            sold_stock: 0,
            available_stock: 0,
            low_stock_threshold,
            is_out_of_stock: true,
            is_low_stock: false,
            is_active: true,
            reservations: Vec::new(),
            movements: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        if initial_stock > 0 {
            let before = record.available_stock;
            record.total_stock = initial_stock;
            record.recompute(now);
            record.push_movement(
                MovementType::In,
                initial_stock as i64,
                "Initial stock from catalog",
                None,
                None,
                before,
                None,
                now,
            );
        } else {
            record.recompute(now);
        }
        record
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn seller_id(&self) -> SellerId {
        self.seller_id
    }

    pub fn total_stock(&self) -> u64 {
        self.total_stock
    }

    pub fn reserved_stock(&self) -> u64 {
        self.reserved_stock
    }

    pub fn sold_stock(&self) -> u64 {
        self.sold_stock
    }

    pub fn available_stock(&self) -> u64 {
        self.available_stock
    }

    pub fn low_stock_threshold(&self) -> u64 {
        self.low_stock_threshold
    }

    pub fn is_out_of_stock(&self) -> bool {
        self.is_out_of_stock
    }

    pub fn is_low_stock(&self) -> bool {
        self.is_low_stock
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn reservations(&self) -> &[Reservation] {
        &self.reservations
    }

    pub fn movements(&self) -> &[Movement] {
        &self.movements
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Records are never hard-deleted; deactivation makes the product
    /// unreservable while keeping history and in-flight holds intact.
    pub fn set_active(&mut self, active: bool, now: DateTime<Utc>) {
        self.is_active = active;
        self.updated_at = now;
    }

    /// Sum of quantities over active reservations. Must equal `reserved_stock`.
    pub fn active_reserved_total(&self) -> u64 {
        self.reservations
            .iter()
            .filter(|r| r.status.is_active())
            .map(|r| r.quantity)
            .sum()
    }

    /// Orders with an active reservation whose time-to-live has elapsed.
    pub fn expired_orders(&self, now: DateTime<Utc>) -> Vec<OrderId> {
        self.reservations
            .iter()
            .filter(|r| r.is_expired(now))
            .map(|r| r.order_id)
            .collect()
    }

    pub fn has_expired_reservations(&self, now: DateTime<Utc>) -> bool {
        self.reservations.iter().any(|r| r.is_expired(now))
    }

    /// Place a hold of `quantity` units for an order.
    ///
    /// Fails with `InsufficientStock` when the available pool (computed before
    /// the mutation) cannot cover the request. One active hold per order per
    /// record: a retried reserve for the same order is rejected rather than
    /// silently duplicated.
    pub fn reserve(
        &mut self,
        order_id: OrderId,
        customer_id: CustomerId,
        quantity: u64,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> InventoryResult<ReserveOutcome> {
        if !self.is_active {
            return Err(InventoryError::ProductNotFound(self.product_id));
        }
        if quantity == 0 {
            return Err(InventoryError::invalid_adjustment(
                "reserve quantity must be at least 1",
            ));
        }
        if self.find_active(order_id).is_some() {
            return Err(InventoryError::invalid_adjustment(format!(
                "order {order_id} already holds an active reservation"
            )));
        }

        let before = self.available_stock;
        if quantity > before {
            return Err(InventoryError::InsufficientStock {
                requested: quantity,
                available: before,
            });
        }

        let expires_at = now + ttl;
        self.reservations.push(Reservation {
            order_id,
            customer_id,
            quantity,
            reserved_at: now,
            expires_at,
            status: ReservationStatus::Active,
        });
        self.reserved_stock += quantity;
        self.recompute(now);
        self.push_movement(
            MovementType::Reserved,
            -(quantity as i64),
            "Stock reserved",
            Some(order_id),
            Some(customer_id),
            before,
            None,
            now,
        );

        Ok(ReserveOutcome {
            available_stock: self.available_stock,
            expires_at,
        })
    }

    /// Turn an active hold into a sale.
    pub fn confirm(&mut self, order_id: OrderId, now: DateTime<Utc>) -> InventoryResult<ConfirmOutcome> {
        let idx = self
            .find_active(order_id)
            .ok_or(InventoryError::ReservationNotFound { order_id })?;
        let quantity = self.reservations[idx].quantity;
        let customer_id = self.reservations[idx].customer_id;

        let before = self.available_stock;
        self.reservations[idx].status = ReservationStatus::Confirmed;
        self.reserved_stock = self.reserved_stock.saturating_sub(quantity);
        self.sold_stock += quantity;
        self.recompute(now);
        self.push_movement(
            MovementType::Sold,
            -(quantity as i64),
            "Reservation confirmed as sale",
            Some(order_id),
            Some(customer_id),
            before,
            None,
            now,
        );

        Ok(ConfirmOutcome {
            quantity,
            reserved_stock: self.reserved_stock,
            sold_stock: self.sold_stock,
            available_stock: self.available_stock,
        })
    }

    /// Release an active hold, returning its quantity to the available pool.
    ///
    /// The reservation ends as `expired` when the reason indicates expiry,
    /// otherwise `cancelled`. Releasing an order with no active hold fails with
    /// `ReservationNotFound` and never touches the counters, so a second
    /// release cannot double-decrement.
    pub fn release(
        &mut self,
        order_id: OrderId,
        reason: &str,
        now: DateTime<Utc>,
    ) -> InventoryResult<ReleaseOutcome> {
        let idx = self
            .find_active(order_id)
            .ok_or(InventoryError::ReservationNotFound { order_id })?;
        let quantity = self.reservations[idx].quantity;
        let customer_id = self.reservations[idx].customer_id;

        let status = if reason_indicates_expiry(reason) {
            ReservationStatus::Expired
        } else {
            ReservationStatus::Cancelled
        };

        let before = self.available_stock;
        self.reservations[idx].status = status;
        self.reserved_stock = self.reserved_stock.saturating_sub(quantity);
        self.recompute(now);
        self.push_movement(
            MovementType::Released,
            quantity as i64,
            reason,
            Some(order_id),
            Some(customer_id),
            before,
            None,
            now,
        );

        Ok(ReleaseOutcome {
            quantity,
            status,
            reserved_stock: self.reserved_stock,
            available_stock: self.available_stock,
        })
    }

    /// Administrative correction: set the total stock directly.
    pub fn adjust_total(
        &mut self,
        new_total: i64,
        reason: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> InventoryResult<u64> {
        if new_total < 0 {
            return Err(InventoryError::invalid_adjustment(
                "stock target must be non-negative",
            ));
        }
        let new_total = new_total as u64;
        let previous_total = self.total_stock;

        let before = self.available_stock;
        self.total_stock = new_total;
        self.recompute(now);
        self.push_movement(
            MovementType::Adjusted,
            new_total as i64 - previous_total as i64,
            reason,
            None,
            None,
            before,
            notes,
            now,
        );

        Ok(self.available_stock)
    }

    /// Restock: add units to the total pool.
    pub fn add_stock(
        &mut self,
        quantity: i64,
        reason: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> InventoryResult<u64> {
        if quantity <= 0 {
            return Err(InventoryError::invalid_adjustment(
                "added quantity must be positive",
            ));
        }

        let before = self.available_stock;
        self.total_stock += quantity as u64;
        self.recompute(now);
        self.push_movement(
            MovementType::In,
            quantity,
            reason,
            None,
            None,
            before,
            notes,
            now,
        );

        Ok(self.available_stock)
    }

    /// Accept a customer return of previously sold units.
    ///
    /// `total_stock` already counts sold units (confirm leaves it untouched),
    /// so decrementing `sold_stock` alone re-enters the returned quantity into
    /// the sellable pool exactly once.
    pub fn process_return(
        &mut self,
        order_id: OrderId,
        quantity: u64,
        reason: &str,
        now: DateTime<Utc>,
    ) -> InventoryResult<u64> {
        if quantity == 0 {
            return Err(InventoryError::invalid_adjustment(
                "returned quantity must be at least 1",
            ));
        }
        if quantity > self.sold_stock {
            return Err(InventoryError::invalid_adjustment(format!(
                "returned quantity {quantity} exceeds sold stock {}",
                self.sold_stock
            )));
        }

        let before = self.available_stock;
        self.sold_stock -= quantity;
        self.recompute(now);
        self.push_movement(
            MovementType::Returned,
            quantity as i64,
            reason,
            Some(order_id),
            None,
            before,
            None,
            now,
        );

        Ok(self.available_stock)
    }

    fn find_active(&self, order_id: OrderId) -> Option<usize> {
        self.reservations
            .iter()
            .position(|r| r.order_id == order_id && r.status.is_active())
    }

    fn recompute(&mut self, now: DateTime<Utc>) {
        let a = Availability::recompute(
            self.total_stock,
            self.reserved_stock,
            self.sold_stock,
            self.low_stock_threshold,
        );
        self.available_stock = a.available;
        self.is_out_of_stock = a.is_out_of_stock;
        self.is_low_stock = a.is_low_stock;
        self.updated_at = now;
    }

    #[allow(clippy::too_many_arguments)]
    fn push_movement(
        &mut self,
        movement_type: MovementType,
        quantity: i64,
        reason: impl Into<String>,
        order_id: Option<OrderId>,
        customer_id: Option<CustomerId>,
        previous_stock: u64,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) {
        self.movements.push(Movement {
            movement_type,
            quantity,
            reason: reason.into(),
            order_id,
            customer_id,
            occurred_at: now,
            previous_stock,
            new_stock: self.available_stock,
            notes,
        });
    }
}

fn reason_indicates_expiry(reason: &str) -> bool {
    reason.to_ascii_lowercase().contains("expir")
}
