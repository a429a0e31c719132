//! Engine-level error model.

use thiserror::Error;

use stockhold_core::InventoryError;

use crate::store::StoreError;

/// Result type used across the engine layer.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by engine operations.
///
/// Domain failures pass through unchanged; storage and orchestration concerns
/// are separate variants so callers can tell business rejections from
/// infrastructure trouble.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Domain(#[from] InventoryError),

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Retries on optimistic-concurrency conflicts were exhausted.
    #[error("gave up after {attempts} version conflicts on the same record")]
    Contention { attempts: u32 },

    /// The catalog collaborator failed or returned nothing usable.
    #[error("catalog error: {0}")]
    Catalog(String),
}

impl EngineError {
    /// Callers performing compensation or expiry treat this kind as benign.
    pub fn is_reservation_not_found(&self) -> bool {
        matches!(self, EngineError::Domain(e) if e.is_reservation_not_found())
    }
}
