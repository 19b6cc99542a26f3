//! The remote record store seam.
//!
//! Rows cross this boundary as JSON so the trait stays object-safe; typed
//! decoding happens in the record manager.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::StoreError;
use crate::query::ListQuery;

#[cfg(test)]
mod memory;
mod rest;

#[cfg(test)]
pub(crate) use memory::{MemoryStore, StoreCall, StoreOp};
pub use rest::RestStore;

/// Per-table operations, implicitly scoped by the store's own credentials
/// and the backend's access policy.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(&self, query: &ListQuery) -> Result<Vec<Value>, StoreError>;

    /// Insert one row and return it as stored (with generated columns).
    async fn insert(&self, table: &str, row: Value) -> Result<Value, StoreError>;

    /// Patch the row whose `id` equals `key`. Returns the updated rows.
    async fn update(&self, table: &str, key: Uuid, fields: Value)
    -> Result<Vec<Value>, StoreError>;

    async fn delete(&self, table: &str, key: Uuid) -> Result<(), StoreError>;
}
