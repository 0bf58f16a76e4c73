//! The store interface consumed by the update protocols.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::request::GetItemRequest;
use crate::request::PutItemRequest;
use crate::request::TransactGetRequest;
use crate::request::TransactGetResult;
use crate::request::TransactWriteRequest;
use crate::request::UpdateItemRequest;
use crate::value::Item;

/// Remote document store holding the shared records.
///
/// Implementations must make a single conditional update, and a single
/// transactional write, linearizable against other writers of the same key.
/// That is the only ordering guarantee the protocols rely on.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one item. Returns `Ok(None)` if the item does not exist.
    async fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, StoreError>;

    /// Write a whole item, replacing any existing item with the same key.
    async fn put_item(&self, request: PutItemRequest) -> Result<(), StoreError>;

    /// Apply update actions to an existing item.
    ///
    /// If a condition is supplied and does not hold at commit time, nothing is
    /// applied and [`StoreError::ConditionFailed`] is returned.
    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), StoreError>;

    /// Read one item inside a transaction boundary.
    async fn transact_get(&self, request: TransactGetRequest) -> Result<TransactGetResult, StoreError>;

    /// Apply update actions transactionally.
    ///
    /// Fails with [`StoreError::TransactionConflict`] if the item was modified
    /// after the read that produced the request's stamp.
    async fn transact_write(&self, request: TransactWriteRequest) -> Result<(), StoreError>;
}

// Blanket implementation for Arc<T>
#[async_trait]
impl<T: DocumentStore + ?Sized> DocumentStore for std::sync::Arc<T> {
    async fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, StoreError> {
        (**self).get_item(request).await
    }

    async fn put_item(&self, request: PutItemRequest) -> Result<(), StoreError> {
        (**self).put_item(request).await
    }

    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), StoreError> {
        (**self).update_item(request).await
    }

    async fn transact_get(&self, request: TransactGetRequest) -> Result<TransactGetResult, StoreError> {
        (**self).transact_get(request).await
    }

    async fn transact_write(&self, request: TransactWriteRequest) -> Result<(), StoreError> {
        (**self).transact_write(request).await
    }
}
