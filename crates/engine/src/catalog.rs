//! Collaborator contract with the product catalog.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use stockhold_core::{ProductId, SellerId};

/// Snapshot of a catalog product at provisioning time.
///
/// The engine treats these values as read-only seeds: once a record exists,
/// the ledger is authoritative and sync pushes availability back out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogProduct {
    pub product_id: ProductId,
    pub seller_id: SellerId,
    pub stock: u64,
    pub low_stock_alert: u64,
    pub is_active: bool,
}

/// Catalog collaborator error.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
}

/// The product catalog as seen by the engine.
///
/// `displayed_stock` is what the storefront shows for a product;
/// `set_displayed_stock` lets reconciliation push the ledger's availability
/// back as the authoritative sellable quantity.
pub trait Catalog: Send + Sync {
    fn active_products(&self) -> Result<Vec<CatalogProduct>, CatalogError>;

    fn product(&self, product_id: ProductId) -> Result<Option<CatalogProduct>, CatalogError>;

    fn displayed_stock(&self, product_id: ProductId) -> Result<Option<u64>, CatalogError>;

    fn set_displayed_stock(&self, product_id: ProductId, stock: u64) -> Result<(), CatalogError>;
}

/// In-memory catalog for tests and development.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    products: RwLock<HashMap<ProductId, CatalogProduct>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upsert(&self, product: CatalogProduct) {
        if let Ok(mut products) = self.products.write() {
            products.insert(product.product_id, product);
        }
    }
}

impl Catalog for InMemoryCatalog {
    fn active_products(&self) -> Result<Vec<CatalogProduct>, CatalogError> {
        let products = self
            .products
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;

        Ok(products.values().filter(|p| p.is_active).copied().collect())
    }

    fn product(&self, product_id: ProductId) -> Result<Option<CatalogProduct>, CatalogError> {
        let products = self
            .products
            .read()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;

        Ok(products.get(&product_id).copied())
    }

    fn displayed_stock(&self, product_id: ProductId) -> Result<Option<u64>, CatalogError> {
        Ok(self.product(product_id)?.map(|p| p.stock))
    }

    fn set_displayed_stock(&self, product_id: ProductId, stock: u64) -> Result<(), CatalogError> {
        let mut products = self
            .products
            .write()
            .map_err(|_| CatalogError::Unavailable("lock poisoned".to_string()))?;

        if let Some(product) = products.get_mut(&product_id) {
            product.stock = stock;
        }
        Ok(())
    }
}
