use std::collections::HashMap;
use std::sync::RwLock;

use stockhold_core::{ExpectedVersion, ProductId};
use stockhold_inventory::InventoryRecord;

use super::r#trait::{RecordStore, StoreError, VersionedRecord};

/// In-memory versioned record store.
///
/// Intended for tests/dev and single-node deployments. Not optimized for
/// large catalogs.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: RwLock<HashMap<ProductId, VersionedRecord>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn get(&self, product_id: ProductId) -> Result<Option<VersionedRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        Ok(records.get(&product_id).cloned())
    }

    fn put(&self, record: InventoryRecord, expected: ExpectedVersion) -> Result<u64, StoreError> {
        let product_id = record.product_id();

        let mut records = self
            .records
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        let current = records.get(&product_id).map(|v| v.version).unwrap_or(0);
        if !expected.matches(current) {
            return Err(StoreError::Conflict(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        let version = current + 1;
        records.insert(product_id, VersionedRecord { version, record });
        Ok(version)
    }

    fn scan(&self) -> Result<Vec<VersionedRecord>, StoreError> {
        let records = self
            .records
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))?;

        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stockhold_core::SellerId;

    fn test_record() -> InventoryRecord {
        InventoryRecord::provision(ProductId::new(), SellerId::new(), 10, 5, Utc::now())
    }

    #[test]
    fn put_then_get_round_trips_with_version() {
        let store = InMemoryRecordStore::new();
        let record = test_record();
        let product_id = record.product_id();

        let version = store.put(record.clone(), ExpectedVersion::Exact(0)).unwrap();
        assert_eq!(version, 1);

        let loaded = store.get(product_id).unwrap().unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.record, record);
    }

    #[test]
    fn create_fails_when_record_already_exists() {
        let store = InMemoryRecordStore::new();
        let record = test_record();

        store.put(record.clone(), ExpectedVersion::Exact(0)).unwrap();
        let err = store.put(record, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn stale_version_is_rejected() {
        let store = InMemoryRecordStore::new();
        let record = test_record();

        store.put(record.clone(), ExpectedVersion::Exact(0)).unwrap();
        store.put(record.clone(), ExpectedVersion::Exact(1)).unwrap();

        let err = store.put(record, ExpectedVersion::Exact(1)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn any_version_always_writes() {
        let store = InMemoryRecordStore::new();
        let record = test_record();

        store.put(record.clone(), ExpectedVersion::Any).unwrap();
        let version = store.put(record, ExpectedVersion::Any).unwrap();
        assert_eq!(version, 2);
    }

    #[test]
    fn scan_returns_every_record() {
        let store = InMemoryRecordStore::new();
        store.put(test_record(), ExpectedVersion::Exact(0)).unwrap();
        store.put(test_record(), ExpectedVersion::Exact(0)).unwrap();

        assert_eq!(store.scan().unwrap().len(), 2);
    }

    #[test]
    fn get_missing_record_is_none() {
        let store = InMemoryRecordStore::new();
        assert!(store.get(ProductId::new()).unwrap().is_none());
    }
}
