use std::sync::Arc;

use thiserror::Error;

use stockhold_core::{ExpectedVersion, ProductId};
use stockhold_inventory::InventoryRecord;

/// A record together with its storage version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedRecord {
    pub version: u64,
    pub record: InventoryRecord,
}

/// Record store operation error.
///
/// Infrastructure errors only (storage, concurrency). Business failures are
/// `stockhold_core::InventoryError` and never originate here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Keyed, versioned store of inventory records (one per product).
///
/// `put` enforces optimistic concurrency via `ExpectedVersion`: a missing
/// record has version 0 and each successful write bumps the version by one,
/// so `Exact(0)` expresses "create". Writers load, mutate a copy, and put
/// back under the loaded version; per-product serialization falls out of the
/// version check plus retry-on-conflict in the engine.
///
/// Implementations must treat records as opaque values and never rewrite
/// embedded history.
pub trait RecordStore: Send + Sync {
    /// Load one record with its current version.
    fn get(&self, product_id: ProductId) -> Result<Option<VersionedRecord>, StoreError>;

    /// Persist a record under the expected version. Returns the new version.
    fn put(&self, record: InventoryRecord, expected: ExpectedVersion) -> Result<u64, StoreError>;

    /// Snapshot every stored record (admin aggregation and the expiration sweep).
    fn scan(&self) -> Result<Vec<VersionedRecord>, StoreError>;
}

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn get(&self, product_id: ProductId) -> Result<Option<VersionedRecord>, StoreError> {
        (**self).get(product_id)
    }

    fn put(&self, record: InventoryRecord, expected: ExpectedVersion) -> Result<u64, StoreError> {
        (**self).put(record, expected)
    }

    fn scan(&self) -> Result<Vec<VersionedRecord>, StoreError> {
        (**self).scan()
    }
}
