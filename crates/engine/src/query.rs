//! Read-side queries: movement pages, reservation listings, stock summaries.
//!
//! All listings are newest-first and paginated by default.

use serde::{Deserialize, Serialize};

use stockhold_core::{ProductId, SellerId};
use stockhold_inventory::{
    InventoryRecord, Movement, MovementType, Reservation, ReservationStatus,
};

use crate::error::EngineResult;
use crate::manager::InventoryEngine;
use crate::store::RecordStore;

/// Pagination parameters for queries.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of entries to return.
    pub limit: u32,
    /// Offset for pagination (0-based).
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50, // Safe default
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).min(1000), // Cap at 1000 for safety
            offset: offset.unwrap_or(0),
        }
    }

    /// Convert a 1-based page number into an offset.
    pub fn page(page: u32, limit: u32) -> Self {
        let limit = limit.min(1000);
        Self {
            limit,
            offset: page.saturating_sub(1).saturating_mul(limit),
        }
    }
}

/// Filter criteria for movement queries.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MovementFilter {
    /// Filter by movement type (optional).
    pub movement_type: Option<MovementType>,
}

impl MovementFilter {
    pub fn matches(&self, movement: &Movement) -> bool {
        self.movement_type
            .is_none_or(|t| movement.movement_type == t)
    }
}

/// Paginated movement query result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementPage {
    /// Movements matching the filter, newest first.
    pub movements: Vec<Movement>,
    /// Total number of matching movements (across all pages).
    pub total: u64,
    /// Pagination parameters used.
    pub pagination: Pagination,
    /// Whether more movements are available.
    pub has_more: bool,
}

/// Counter/flag snapshot of one record for admin and seller views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub total_stock: u64,
    pub reserved_stock: u64,
    pub sold_stock: u64,
    pub available_stock: u64,
    pub low_stock_threshold: u64,
    pub is_out_of_stock: bool,
    pub is_low_stock: bool,
    pub is_active: bool,
    pub active_reservations: usize,
}

impl StockSummary {
    pub fn from_record(record: &InventoryRecord) -> Self {
        Self {
            product_id: record.product_id(),
            seller_id: record.seller_id(),
            total_stock: record.total_stock(),
            reserved_stock: record.reserved_stock(),
            sold_stock: record.sold_stock(),
            available_stock: record.available_stock(),
            low_stock_threshold: record.low_stock_threshold(),
            is_out_of_stock: record.is_out_of_stock(),
            is_low_stock: record.is_low_stock(),
            is_active: record.is_active(),
            active_reservations: record
                .reservations()
                .iter()
                .filter(|r| r.status.is_active())
                .count(),
        }
    }
}

impl<S: RecordStore> InventoryEngine<S> {
    /// Movement history for one product, newest first, optionally filtered by
    /// type.
    pub fn movements(
        &self,
        product_id: ProductId,
        filter: &MovementFilter,
        pagination: Pagination,
    ) -> EngineResult<MovementPage> {
        let record = self.load(product_id)?;

        let matching: Vec<&Movement> = record
            .movements()
            .iter()
            .rev()
            .filter(|m| filter.matches(m))
            .collect();
        let total = matching.len() as u64;

        let movements: Vec<Movement> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .cloned()
            .collect();
        let has_more = u64::from(pagination.offset) + (movements.len() as u64) < total;

        Ok(MovementPage {
            movements,
            total,
            pagination,
            has_more,
        })
    }

    /// Reservations for one product, newest first, optionally filtered by
    /// status.
    pub fn reservations(
        &self,
        product_id: ProductId,
        status: Option<ReservationStatus>,
    ) -> EngineResult<Vec<Reservation>> {
        let record = self.load(product_id)?;

        Ok(record
            .reservations()
            .iter()
            .rev()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect())
    }

    /// Counter/flag snapshot for one product.
    pub fn stock_summary(&self, product_id: ProductId) -> EngineResult<StockSummary> {
        Ok(StockSummary::from_record(&self.load(product_id)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pagination_is_capped_first_page() {
        let p = Pagination::default();
        assert_eq!(p.limit, 50);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn new_caps_limit() {
        let p = Pagination::new(Some(5000), Some(10));
        assert_eq!(p.limit, 1000);
        assert_eq!(p.offset, 10);
    }

    #[test]
    fn page_converts_to_offset() {
        let p = Pagination::page(3, 20);
        assert_eq!(p.limit, 20);
        assert_eq!(p.offset, 40);

        // Page numbers are 1-based; 0 behaves like the first page.
        assert_eq!(Pagination::page(0, 20).offset, 0);
    }
}
