//! Reconciliation / admin facade: catalog bootstrap, stock sync, and
//! seller-level aggregation.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stockhold_core::SellerId;
use stockhold_inventory::InventoryRecord;

use crate::catalog::Catalog;
use crate::error::{EngineError, EngineResult};
use crate::manager::InventoryEngine;
use crate::query::{Pagination, StockSummary};
use crate::store::RecordStore;

/// Filter criteria for the seller overview listing.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct OverviewFilter {
    pub low_stock_only: bool,
    pub out_of_stock_only: bool,
}

impl OverviewFilter {
    fn matches(&self, record: &InventoryRecord) -> bool {
        if self.low_stock_only && !record.is_low_stock() {
            return false;
        }
        if self.out_of_stock_only && !record.is_out_of_stock() {
            return false;
        }
        true
    }
}

/// Aggregated counts across one seller's records, plus a page of per-product
/// summaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerOverview {
    pub seller_id: SellerId,
    pub total_products: u64,
    pub total_stock: u64,
    pub total_reserved: u64,
    pub total_sold: u64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    /// Page of the seller's products matching the filter, ordered by product id.
    pub products: Vec<StockSummary>,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Seller/ops surface over the engine and the catalog collaborator.
pub struct AdminFacade<S: RecordStore> {
    engine: Arc<InventoryEngine<S>>,
    catalog: Arc<dyn Catalog>,
}

impl<S: RecordStore> AdminFacade<S> {
    pub fn new(engine: Arc<InventoryEngine<S>>, catalog: Arc<dyn Catalog>) -> Self {
        Self { engine, catalog }
    }

    /// Create a seeded record for every active catalog product lacking one.
    /// Returns the number of records created.
    pub fn initialize_all(&self) -> EngineResult<usize> {
        let products = self
            .catalog
            .active_products()
            .map_err(|e| EngineError::Catalog(e.to_string()))?;

        let mut created = 0usize;
        for product in products {
            if self.engine.provision(&product)? {
                created += 1;
            }
        }

        info!(created, "inventory records initialized from catalog");
        Ok(created)
    }

    /// Push the ledger's available stock back to the catalog wherever the
    /// displayed quantity diverges. Returns the number of products updated.
    pub fn sync_with_catalog(&self) -> EngineResult<usize> {
        let mut synced = 0usize;

        for versioned in self.engine.store().scan()? {
            let record = versioned.record;
            let product_id = record.product_id();

            let displayed = match self.catalog.displayed_stock(product_id) {
                Ok(Some(displayed)) => displayed,
                Ok(None) => {
                    debug!(product_id = %product_id, "record has no catalog product, skipping sync");
                    continue;
                }
                Err(e) => {
                    warn!(product_id = %product_id, error = %e, "catalog lookup failed during sync");
                    continue;
                }
            };

            if displayed != record.available_stock() {
                self.catalog
                    .set_displayed_stock(product_id, record.available_stock())
                    .map_err(|e| EngineError::Catalog(e.to_string()))?;
                synced += 1;
                debug!(
                    product_id = %product_id,
                    displayed,
                    available = record.available_stock(),
                    "pushed ledger stock to catalog"
                );
            }
        }

        if synced > 0 {
            info!(synced, "catalog stock synchronized from ledger");
        }
        Ok(synced)
    }

    /// Aggregate counts across the seller's active records.
    ///
    /// Totals always cover every active record of the seller; the filter only
    /// narrows the per-product page.
    pub fn seller_overview(
        &self,
        seller_id: SellerId,
        filter: OverviewFilter,
        pagination: Pagination,
    ) -> EngineResult<SellerOverview> {
        let records: Vec<InventoryRecord> = self
            .engine
            .store()
            .scan()?
            .into_iter()
            .map(|v| v.record)
            .filter(|r| r.seller_id() == seller_id && r.is_active())
            .collect();

        let mut overview = SellerOverview {
            seller_id,
            total_products: 0,
            total_stock: 0,
            total_reserved: 0,
            total_sold: 0,
            low_stock_count: 0,
            out_of_stock_count: 0,
            products: Vec::new(),
            pagination,
            has_more: false,
        };

        for record in &records {
            overview.total_products += 1;
            overview.total_stock += record.total_stock();
            overview.total_reserved += record.reserved_stock();
            overview.total_sold += record.sold_stock();
            if record.is_low_stock() {
                overview.low_stock_count += 1;
            }
            if record.is_out_of_stock() {
                overview.out_of_stock_count += 1;
            }
        }

        let mut listed: Vec<&InventoryRecord> =
            records.iter().filter(|r| filter.matches(r)).collect();
        // Deterministic page order regardless of store iteration order.
        listed.sort_by_key(|r| *r.product_id().as_uuid());

        let matching = listed.len() as u64;
        overview.products = listed
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .map(StockSummary::from_record)
            .collect();
        overview.has_more =
            u64::from(pagination.offset) + (overview.products.len() as u64) < matching;

        Ok(overview)
    }
}
