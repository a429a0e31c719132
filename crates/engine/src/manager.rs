//! Per-record reservation manager.
//!
//! Every mutating operation loads one record, applies a pure domain
//! transition, and persists it under optimistic versioning, retrying on
//! conflict. The record is the unit of mutual exclusion: concurrent callers
//! targeting the same product serialize through the version check, and
//! callers targeting different products never contend.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{info, warn};

use stockhold_core::{
    CustomerId, ExpectedVersion, InventoryError, InventoryResult, OrderId, ProductId,
};
use stockhold_inventory::{ConfirmOutcome, InventoryRecord, ReleaseOutcome, ReserveOutcome};

use crate::catalog::{Catalog, CatalogProduct};
use crate::error::{EngineError, EngineResult};
use crate::store::{RecordStore, StoreError, VersionedRecord};

/// Retry policy for optimistic-concurrency conflicts.
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum load-mutate-persist attempts per operation.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self { max_attempts: 8 }
    }
}

impl RetryConfig {
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }
}

/// Single-record reservation state machine over a versioned record store.
pub struct InventoryEngine<S: RecordStore> {
    store: S,
    catalog: Option<Arc<dyn Catalog>>,
    retry: RetryConfig,
}

impl<S: RecordStore> InventoryEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            catalog: None,
            retry: RetryConfig::default(),
        }
    }

    /// Attach the catalog used to lazily provision records on first reserve.
    pub fn with_catalog(mut self, catalog: Arc<dyn Catalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Place a hold for an order, creating the record from the catalog if the
    /// product has never been provisioned.
    pub fn reserve(
        &self,
        product_id: ProductId,
        order_id: OrderId,
        customer_id: CustomerId,
        quantity: u64,
        ttl: Duration,
    ) -> EngineResult<ReserveOutcome> {
        self.ensure_record(product_id)?;

        let outcome = self.mutate(product_id, |record| {
            record.reserve(order_id, customer_id, quantity, ttl, Utc::now())
        })?;

        info!(
            product_id = %product_id,
            order_id = %order_id,
            quantity,
            available = outcome.available_stock,
            expires_at = %outcome.expires_at,
            "stock reserved"
        );
        Ok(outcome)
    }

    /// Turn an order's active hold into a sale.
    pub fn confirm(&self, product_id: ProductId, order_id: OrderId) -> EngineResult<ConfirmOutcome> {
        let outcome = self.mutate(product_id, |record| record.confirm(order_id, Utc::now()))?;

        info!(
            product_id = %product_id,
            order_id = %order_id,
            quantity = outcome.quantity,
            sold = outcome.sold_stock,
            "reservation confirmed as sale"
        );
        Ok(outcome)
    }

    /// Release an order's active hold back into the available pool.
    pub fn release(
        &self,
        product_id: ProductId,
        order_id: OrderId,
        reason: &str,
    ) -> EngineResult<ReleaseOutcome> {
        let outcome = self.mutate(product_id, |record| {
            record.release(order_id, reason, Utc::now())
        })?;

        info!(
            product_id = %product_id,
            order_id = %order_id,
            quantity = outcome.quantity,
            status = ?outcome.status,
            reason,
            "reservation released"
        );
        Ok(outcome)
    }

    /// Administrative correction of the total stock. Returns the new
    /// available stock.
    pub fn adjust_stock(
        &self,
        product_id: ProductId,
        new_total: i64,
        reason: &str,
        notes: Option<String>,
    ) -> EngineResult<u64> {
        let available = self.mutate(product_id, |record| {
            record.adjust_total(new_total, reason, notes.clone(), Utc::now())
        })?;

        info!(product_id = %product_id, new_total, available, reason, "stock adjusted");
        Ok(available)
    }

    /// Restock. Returns the new available stock.
    pub fn add_stock(
        &self,
        product_id: ProductId,
        quantity: i64,
        reason: &str,
        notes: Option<String>,
    ) -> EngineResult<u64> {
        let available = self.mutate(product_id, |record| {
            record.add_stock(quantity, reason, notes.clone(), Utc::now())
        })?;

        info!(product_id = %product_id, quantity, available, reason, "stock added");
        Ok(available)
    }

    /// Accept a customer return of sold units. Returns the new available
    /// stock.
    pub fn process_return(
        &self,
        product_id: ProductId,
        order_id: OrderId,
        quantity: u64,
        reason: &str,
    ) -> EngineResult<u64> {
        let available = self.mutate(product_id, |record| {
            record.process_return(order_id, quantity, reason, Utc::now())
        })?;

        info!(product_id = %product_id, order_id = %order_id, quantity, available, "return processed");
        Ok(available)
    }

    /// Stop taking reservations for a product. History and in-flight holds
    /// stay intact; confirm/release keep working.
    pub fn deactivate(&self, product_id: ProductId) -> EngineResult<()> {
        self.mutate(product_id, |record| {
            record.set_active(false, Utc::now());
            Ok(())
        })?;
        info!(product_id = %product_id, "inventory record deactivated");
        Ok(())
    }

    pub fn reactivate(&self, product_id: ProductId) -> EngineResult<()> {
        self.mutate(product_id, |record| {
            record.set_active(true, Utc::now());
            Ok(())
        })?;
        info!(product_id = %product_id, "inventory record reactivated");
        Ok(())
    }

    /// Create a record for a catalog product unless one already exists.
    /// Returns whether a record was created.
    pub fn provision(&self, product: &CatalogProduct) -> EngineResult<bool> {
        if self.store.get(product.product_id)?.is_some() {
            return Ok(false);
        }

        let record = InventoryRecord::provision(
            product.product_id,
            product.seller_id,
            product.stock,
            product.low_stock_alert,
            Utc::now(),
        );

        match self.store.put(record, ExpectedVersion::Exact(0)) {
            Ok(_) => {
                info!(
                    product_id = %product.product_id,
                    seller_id = %product.seller_id,
                    stock = product.stock,
                    "inventory record provisioned from catalog"
                );
                Ok(true)
            }
            // Lost a provisioning race; the winner's record stands.
            Err(StoreError::Conflict(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    pub(crate) fn load(&self, product_id: ProductId) -> EngineResult<InventoryRecord> {
        match self.store.get(product_id)? {
            Some(versioned) => Ok(versioned.record),
            None => Err(InventoryError::ProductNotFound(product_id).into()),
        }
    }

    fn ensure_record(&self, product_id: ProductId) -> EngineResult<()> {
        if self.store.get(product_id)?.is_some() {
            return Ok(());
        }

        let Some(catalog) = &self.catalog else {
            return Err(InventoryError::ProductNotFound(product_id).into());
        };

        let product = catalog
            .product(product_id)
            .map_err(|e| EngineError::Catalog(e.to_string()))?
            .ok_or(InventoryError::ProductNotFound(product_id))?;
        if !product.is_active {
            return Err(InventoryError::ProductNotFound(product_id).into());
        }

        self.provision(&product)?;
        Ok(())
    }

    /// Load-mutate-persist one record with retry-on-conflict.
    ///
    /// Domain rejections abort immediately; only version conflicts retry.
    fn mutate<T>(
        &self,
        product_id: ProductId,
        mut op: impl FnMut(&mut InventoryRecord) -> InventoryResult<T>,
    ) -> EngineResult<T> {
        let mut attempts = 0;
        loop {
            attempts += 1;

            let Some(VersionedRecord {
                version,
                mut record,
            }) = self.store.get(product_id)?
            else {
                return Err(InventoryError::ProductNotFound(product_id).into());
            };

            let outcome = op(&mut record)?;

            match self.store.put(record, ExpectedVersion::Exact(version)) {
                Ok(_) => return Ok(outcome),
                Err(StoreError::Conflict(conflict)) if attempts < self.retry.max_attempts => {
                    warn!(
                        product_id = %product_id,
                        attempts,
                        conflict = %conflict,
                        "record version conflict, retrying"
                    );
                }
                Err(StoreError::Conflict(_)) => {
                    return Err(EngineError::Contention { attempts });
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::InMemoryCatalog;
    use crate::store::InMemoryRecordStore;
    use stockhold_core::SellerId;

    fn provisioned_engine(stock: u64) -> (InventoryEngine<InMemoryRecordStore>, ProductId) {
        let engine = InventoryEngine::new(InMemoryRecordStore::new());
        let product = CatalogProduct {
            product_id: ProductId::new(),
            seller_id: SellerId::new(),
            stock,
            low_stock_alert: 5,
            is_active: true,
        };
        assert!(engine.provision(&product).unwrap());
        (engine, product.product_id)
    }

    #[test]
    fn provision_is_idempotent() {
        let engine = InventoryEngine::new(InMemoryRecordStore::new());
        let product = CatalogProduct {
            product_id: ProductId::new(),
            seller_id: SellerId::new(),
            stock: 10,
            low_stock_alert: 5,
            is_active: true,
        };

        assert!(engine.provision(&product).unwrap());
        assert!(!engine.provision(&product).unwrap());
    }

    #[test]
    fn reserve_persists_the_mutated_record() {
        let (engine, product_id) = provisioned_engine(10);

        let outcome = engine
            .reserve(product_id, OrderId::new(), CustomerId::new(), 3, Duration::minutes(15))
            .unwrap();

        assert_eq!(outcome.available_stock, 7);
        let record = engine.load(product_id).unwrap();
        assert_eq!(record.reserved_stock(), 3);
        assert_eq!(record.available_stock(), 7);
    }

    #[test]
    fn reserve_without_record_or_catalog_is_product_not_found() {
        let engine = InventoryEngine::new(InMemoryRecordStore::new());

        let err = engine
            .reserve(ProductId::new(), OrderId::new(), CustomerId::new(), 1, Duration::minutes(15))
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(InventoryError::ProductNotFound(_))
        ));
    }

    #[test]
    fn reserve_lazily_provisions_from_catalog() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let product = CatalogProduct {
            product_id: ProductId::new(),
            seller_id: SellerId::new(),
            stock: 4,
            low_stock_alert: 2,
            is_active: true,
        };
        catalog.upsert(product);

        let engine = InventoryEngine::new(InMemoryRecordStore::new()).with_catalog(catalog);

        let outcome = engine
            .reserve(product.product_id, OrderId::new(), CustomerId::new(), 1, Duration::minutes(15))
            .unwrap();

        assert_eq!(outcome.available_stock, 3);
        let record = engine.load(product.product_id).unwrap();
        assert_eq!(record.total_stock(), 4);
        assert_eq!(record.seller_id(), product.seller_id);
    }

    #[test]
    fn reserve_for_inactive_catalog_product_fails() {
        let catalog = Arc::new(InMemoryCatalog::new());
        let product = CatalogProduct {
            product_id: ProductId::new(),
            seller_id: SellerId::new(),
            stock: 4,
            low_stock_alert: 2,
            is_active: false,
        };
        catalog.upsert(product);

        let engine = InventoryEngine::new(InMemoryRecordStore::new()).with_catalog(catalog);
        let err = engine
            .reserve(product.product_id, OrderId::new(), CustomerId::new(), 1, Duration::minutes(15))
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(InventoryError::ProductNotFound(_))
        ));
    }

    #[test]
    fn deactivated_record_rejects_new_reservations_but_releases_existing() {
        let (engine, product_id) = provisioned_engine(10);
        let order = OrderId::new();
        engine
            .reserve(product_id, order, CustomerId::new(), 2, Duration::minutes(15))
            .unwrap();

        engine.deactivate(product_id).unwrap();

        let err = engine
            .reserve(product_id, OrderId::new(), CustomerId::new(), 1, Duration::minutes(15))
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Domain(InventoryError::ProductNotFound(_))
        ));

        let outcome = engine.release(product_id, order, "cancelled").unwrap();
        assert_eq!(outcome.reserved_stock, 0);
    }

    /// A store whose writes always conflict, to exhaust the retry budget.
    struct ContentedStore {
        inner: InMemoryRecordStore,
    }

    impl RecordStore for ContentedStore {
        fn get(&self, product_id: ProductId) -> Result<Option<VersionedRecord>, StoreError> {
            self.inner.get(product_id)
        }

        fn put(
            &self,
            record: InventoryRecord,
            expected: ExpectedVersion,
        ) -> Result<u64, StoreError> {
            if self.inner.get(record.product_id())?.is_none() {
                return self.inner.put(record, expected);
            }
            Err(StoreError::Conflict("always behind".to_string()))
        }

        fn scan(&self) -> Result<Vec<VersionedRecord>, StoreError> {
            self.inner.scan()
        }
    }

    #[test]
    fn conflict_exhaustion_surfaces_contention() {
        let engine = InventoryEngine::new(ContentedStore {
            inner: InMemoryRecordStore::new(),
        })
        .with_retry(RetryConfig::default().with_max_attempts(3));

        let product = CatalogProduct {
            product_id: ProductId::new(),
            seller_id: SellerId::new(),
            stock: 10,
            low_stock_alert: 5,
            is_active: true,
        };
        assert!(engine.provision(&product).unwrap());

        let err = engine
            .reserve(product.product_id, OrderId::new(), CustomerId::new(), 1, Duration::minutes(15))
            .unwrap_err();

        assert!(matches!(err, EngineError::Contention { attempts: 3 }));
    }

    #[test]
    fn domain_rejection_does_not_retry_or_persist() {
        let (engine, product_id) = provisioned_engine(2);

        let err = engine
            .reserve(product_id, OrderId::new(), CustomerId::new(), 5, Duration::minutes(15))
            .unwrap_err();

        assert!(matches!(
            err,
            EngineError::Domain(InventoryError::InsufficientStock {
                requested: 5,
                available: 2
            })
        ));
        let record = engine.load(product_id).unwrap();
        assert_eq!(record.reserved_stock(), 0);
        assert_eq!(record.movements().len(), 1); // Only the provisioning seed.
    }
}
