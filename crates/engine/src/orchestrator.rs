//! Multi-item reservation orchestration.
//!
//! `reserve_many` is a saga in miniature: sequential holds per item, and on
//! the first failure a compensating release for every hold already taken in
//! the batch. There is no cross-record atomicity: a failed batch leaves a
//! brief overcommit window on earlier items until compensation lands, after
//! which the batch is a no-op from the caller's perspective.
//!
//! `confirm_many`/`release_many` are best-effort with no compensation:
//! confirmed sales and explicit releases are final, so partial failures are
//! surfaced for manual reconciliation instead of undone.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use stockhold_core::{CustomerId, InventoryError, OrderId, ProductId};

use crate::error::EngineResult;
use crate::manager::InventoryEngine;
use crate::store::RecordStore;

/// One line item of a multi-product reservation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveItem {
    pub product_id: ProductId,
    pub quantity: u64,
}

/// A hold successfully taken during a bulk reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservedItem {
    pub product_id: ProductId,
    pub quantity: u64,
    pub available_stock: u64,
    pub expires_at: DateTime<Utc>,
}

/// A per-item failure in a bulk operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub product_id: ProductId,
    pub error: String,
}

/// Outcome of `reserve_many`.
///
/// When `success` is false, `successful` lists the holds taken during the
/// attempt; they have already been compensated by the time this is returned,
/// so the batch holds nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkReserveOutcome {
    pub success: bool,
    pub successful: Vec<ReservedItem>,
    pub failed: Vec<FailedItem>,
}

impl BulkReserveOutcome {
    /// Error-shaped view of the outcome for callers that treat a failed batch
    /// as a single rejection.
    pub fn into_result(self) -> Result<Vec<ReservedItem>, InventoryError> {
        if self.success {
            Ok(self.successful)
        } else {
            Err(InventoryError::PartialReservationFailure {
                attempted: self.successful.len() + self.failed.len(),
                failed: self.failed.len(),
            })
        }
    }
}

/// Aggregated per-item results of `confirm_many`/`release_many`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkApplyOutcome {
    pub successful: Vec<ProductId>,
    pub failed: Vec<FailedItem>,
}

impl BulkApplyOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Coordinates multi-item holds for one order.
pub struct BulkOrchestrator<S: RecordStore> {
    engine: Arc<InventoryEngine<S>>,
}

impl<S: RecordStore> BulkOrchestrator<S> {
    pub fn new(engine: Arc<InventoryEngine<S>>) -> Self {
        Self { engine }
    }

    /// Reserve every item for one order, all-or-nothing.
    ///
    /// Items are applied sequentially; the first failure stops the batch and
    /// triggers a compensating release for every hold already taken. The
    /// returned outcome is `success` only when every item reserved cleanly.
    pub fn reserve_many(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        items: &[ReserveItem],
        ttl: Duration,
    ) -> EngineResult<BulkReserveOutcome> {
        if items.is_empty() {
            return Err(
                InventoryError::invalid_adjustment("bulk reserve requires at least one item")
                    .into(),
            );
        }

        let mut successful: Vec<ReservedItem> = Vec::with_capacity(items.len());

        for item in items {
            match self.engine.reserve(
                item.product_id,
                order_id,
                customer_id,
                item.quantity,
                ttl,
            ) {
                Ok(outcome) => successful.push(ReservedItem {
                    product_id: item.product_id,
                    quantity: item.quantity,
                    available_stock: outcome.available_stock,
                    expires_at: outcome.expires_at,
                }),
                Err(err) => {
                    warn!(
                        order_id = %order_id,
                        product_id = %item.product_id,
                        quantity = item.quantity,
                        error = %err,
                        held = successful.len(),
                        "bulk reserve item failed, compensating prior holds"
                    );
                    self.compensate(order_id, &successful);

                    return Ok(BulkReserveOutcome {
                        success: false,
                        successful,
                        failed: vec![FailedItem {
                            product_id: item.product_id,
                            error: err.to_string(),
                        }],
                    });
                }
            }
        }

        info!(
            order_id = %order_id,
            items = successful.len(),
            "bulk reservation completed"
        );
        Ok(BulkReserveOutcome {
            success: true,
            successful,
            failed: Vec::new(),
        })
    }

    /// Confirm the order's holds on the given products, best-effort.
    pub fn confirm_many(&self, order_id: OrderId, items: &[ProductId]) -> BulkApplyOutcome {
        let mut outcome = BulkApplyOutcome {
            successful: Vec::new(),
            failed: Vec::new(),
        };

        for &product_id in items {
            match self.engine.confirm(product_id, order_id) {
                Ok(_) => outcome.successful.push(product_id),
                Err(err) => {
                    warn!(
                        order_id = %order_id,
                        product_id = %product_id,
                        error = %err,
                        "bulk confirm item failed"
                    );
                    outcome.failed.push(FailedItem {
                        product_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        outcome
    }

    /// Release every active hold the order still has, best-effort.
    ///
    /// The order's records are discovered by scanning for active reservations
    /// carrying the order id, so callers do not have to replay the original
    /// item list.
    pub fn release_many(&self, order_id: OrderId, reason: &str) -> EngineResult<BulkApplyOutcome> {
        let mut outcome = BulkApplyOutcome {
            successful: Vec::new(),
            failed: Vec::new(),
        };

        for versioned in self.engine.store().scan()? {
            let record = versioned.record;
            let holds_order = record
                .reservations()
                .iter()
                .any(|r| r.order_id == order_id && r.status.is_active());
            if !holds_order {
                continue;
            }

            let product_id = record.product_id();
            match self.engine.release(product_id, order_id, reason) {
                Ok(_) => outcome.successful.push(product_id),
                Err(err) if err.is_reservation_not_found() => {
                    debug!(
                        order_id = %order_id,
                        product_id = %product_id,
                        "hold already settled by a concurrent caller"
                    );
                }
                Err(err) => {
                    warn!(
                        order_id = %order_id,
                        product_id = %product_id,
                        error = %err,
                        "bulk release item failed"
                    );
                    outcome.failed.push(FailedItem {
                        product_id,
                        error: err.to_string(),
                    });
                }
            }
        }

        Ok(outcome)
    }

    fn compensate(&self, order_id: OrderId, reserved: &[ReservedItem]) {
        for item in reserved {
            match self.engine.release(
                item.product_id,
                order_id,
                "Partial reservation failure - rollback",
            ) {
                Ok(_) => debug!(
                    order_id = %order_id,
                    product_id = %item.product_id,
                    quantity = item.quantity,
                    "compensating release applied"
                ),
                Err(err) if err.is_reservation_not_found() => debug!(
                    order_id = %order_id,
                    product_id = %item.product_id,
                    "hold already released"
                ),
                Err(err) => error!(
                    order_id = %order_id,
                    product_id = %item.product_id,
                    error = %err,
                    "compensating release failed; manual reconciliation required"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogProduct;
    use crate::error::EngineError;
    use crate::store::InMemoryRecordStore;
    use stockhold_core::SellerId;

    fn setup(stocks: &[u64]) -> (Arc<InventoryEngine<InMemoryRecordStore>>, Vec<ProductId>) {
        let engine = Arc::new(InventoryEngine::new(InMemoryRecordStore::new()));
        let mut ids = Vec::new();
        for &stock in stocks {
            let product = CatalogProduct {
                product_id: ProductId::new(),
                seller_id: SellerId::new(),
                stock,
                low_stock_alert: 2,
                is_active: true,
            };
            engine.provision(&product).unwrap();
            ids.push(product.product_id);
        }
        (engine, ids)
    }

    fn ttl() -> Duration {
        Duration::minutes(15)
    }

    #[test]
    fn reserve_many_holds_every_item_on_success() {
        let (engine, ids) = setup(&[10, 20]);
        let orchestrator = BulkOrchestrator::new(engine.clone());

        let outcome = orchestrator
            .reserve_many(
                OrderId::new(),
                CustomerId::new(),
                &[
                    ReserveItem { product_id: ids[0], quantity: 3 },
                    ReserveItem { product_id: ids[1], quantity: 5 },
                ],
                ttl(),
            )
            .unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.successful.len(), 2);
        assert!(outcome.failed.is_empty());
        assert_eq!(engine.load(ids[0]).unwrap().reserved_stock(), 3);
        assert_eq!(engine.load(ids[1]).unwrap().reserved_stock(), 5);
    }

    #[test]
    fn reserve_many_compensates_on_first_failure() {
        let (engine, ids) = setup(&[10, 10]);
        let orchestrator = BulkOrchestrator::new(engine.clone());
        let order = OrderId::new();

        let outcome = orchestrator
            .reserve_many(
                order,
                CustomerId::new(),
                &[
                    ReserveItem { product_id: ids[0], quantity: 5 },
                    ReserveItem { product_id: ids[1], quantity: 1000 },
                ],
                ttl(),
            )
            .unwrap();

        assert!(!outcome.success);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].product_id, ids[1]);

        // Eventual consistency after compensation: the first item's hold is gone.
        let first = engine.load(ids[0]).unwrap();
        assert_eq!(first.reserved_stock(), 0);
        assert_eq!(first.available_stock(), 10);
        let second = engine.load(ids[1]).unwrap();
        assert_eq!(second.reserved_stock(), 0);
    }

    #[test]
    fn failed_batch_converts_to_partial_reservation_failure() {
        let (engine, ids) = setup(&[10]);
        let orchestrator = BulkOrchestrator::new(engine);

        let outcome = orchestrator
            .reserve_many(
                OrderId::new(),
                CustomerId::new(),
                &[ReserveItem { product_id: ids[0], quantity: 1000 }],
                ttl(),
            )
            .unwrap();

        let err = outcome.into_result().unwrap_err();
        assert_eq!(
            err,
            InventoryError::PartialReservationFailure {
                attempted: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn empty_batch_is_rejected() {
        let (engine, _) = setup(&[]);
        let orchestrator = BulkOrchestrator::new(engine);

        let err = orchestrator
            .reserve_many(OrderId::new(), CustomerId::new(), &[], ttl())
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(InventoryError::InvalidAdjustment(_))
        ));
    }

    #[test]
    fn confirm_many_reports_per_item_failures_without_aborting() {
        let (engine, ids) = setup(&[10, 10]);
        let orchestrator = BulkOrchestrator::new(engine.clone());
        let order = OrderId::new();
        engine
            .reserve(ids[0], order, CustomerId::new(), 2, ttl())
            .unwrap();
        // No hold on ids[1] for this order.

        let outcome = orchestrator.confirm_many(order, &ids);

        assert_eq!(outcome.successful, vec![ids[0]]);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].product_id, ids[1]);
        assert!(!outcome.all_succeeded());
        assert_eq!(engine.load(ids[0]).unwrap().sold_stock(), 2);
    }

    #[test]
    fn release_many_discovers_the_orders_holds() {
        let (engine, ids) = setup(&[10, 10, 10]);
        let orchestrator = BulkOrchestrator::new(engine.clone());
        let order = OrderId::new();
        let other_order = OrderId::new();
        engine
            .reserve(ids[0], order, CustomerId::new(), 2, ttl())
            .unwrap();
        engine
            .reserve(ids[1], order, CustomerId::new(), 3, ttl())
            .unwrap();
        engine
            .reserve(ids[2], other_order, CustomerId::new(), 4, ttl())
            .unwrap();

        let outcome = orchestrator
            .release_many(order, "Payment failed")
            .unwrap();

        assert_eq!(outcome.successful.len(), 2);
        assert!(outcome.failed.is_empty());
        assert_eq!(engine.load(ids[0]).unwrap().reserved_stock(), 0);
        assert_eq!(engine.load(ids[1]).unwrap().reserved_stock(), 0);
        // The other order's hold is untouched.
        assert_eq!(engine.load(ids[2]).unwrap().reserved_stock(), 4);
    }

    #[test]
    fn release_many_with_no_holds_is_a_quiet_no_op() {
        let (engine, _) = setup(&[10]);
        let orchestrator = BulkOrchestrator::new(engine);

        let outcome = orchestrator
            .release_many(OrderId::new(), "Order cancelled")
            .unwrap();
        assert!(outcome.successful.is_empty());
        assert!(outcome.failed.is_empty());
    }
}
