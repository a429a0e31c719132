//! Keyed, versioned storage for inventory records.

mod in_memory;
mod r#trait;

pub use in_memory::InMemoryRecordStore;
pub use r#trait::{RecordStore, StoreError, VersionedRecord};
