//! Fault injection keyed by the worker index a write appends.
//!
//! Writes carry the index they append inside their update actions, so the
//! wrapper can target individual workers without knowing about them:
//!
//! - `fail_indices`: the write fails with [`StoreError::Unavailable`] every time.
//! - `drop_indices`: the write is acknowledged but never reaches the inner store,
//!   the signature of a lost update.
//!
//! Reads always pass through.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use stampede_store::AttributeValue;
use stampede_store::DocumentStore;
use stampede_store::GetItemRequest;
use stampede_store::Item;
use stampede_store::PutItemRequest;
use stampede_store::StoreError;
use stampede_store::TransactGetRequest;
use stampede_store::TransactGetResult;
use stampede_store::TransactWriteRequest;
use stampede_store::UpdateAction;
use stampede_store::UpdateItemRequest;
use tracing::debug;

/// Which worker indices to sabotage.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct FaultPlan {
    /// Writes appending these indices always fail.
    #[serde(default)]
    pub fail_indices: BTreeSet<u32>,
    /// Writes appending these indices are acknowledged and discarded.
    #[serde(default)]
    pub drop_indices: BTreeSet<u32>,
}

impl FaultPlan {
    /// True if the plan injects nothing.
    pub fn is_empty(&self) -> bool {
        self.fail_indices.is_empty() && self.drop_indices.is_empty()
    }
}

enum Verdict {
    Pass,
    Fail,
    Drop,
}

/// Wraps a [`DocumentStore`] and injects faults from a [`FaultPlan`].
///
/// Also counts write calls per appended index, so tests can check that no
/// worker exceeded its attempt budget.
pub struct FaultInjectingStore<S: DocumentStore + ?Sized> {
    inner: Arc<S>,
    plan: FaultPlan,
    write_calls: Mutex<BTreeMap<i64, u32>>,
}

impl<S: DocumentStore + ?Sized> FaultInjectingStore<S> {
    /// Wrap `inner` with the given plan.
    pub fn new(inner: Arc<S>, plan: FaultPlan) -> Self {
        Self {
            inner,
            plan,
            write_calls: Mutex::new(BTreeMap::new()),
        }
    }

    /// The wrapped store.
    pub fn inner(&self) -> &Arc<S> {
        &self.inner
    }

    /// The active plan.
    pub fn plan(&self) -> &FaultPlan {
        &self.plan
    }

    /// Number of write calls observed that append `index`.
    pub fn write_calls(&self, index: u32) -> u32 {
        self.write_calls.lock().get(&i64::from(index)).copied().unwrap_or(0)
    }

    /// Write calls per appended index.
    pub fn write_call_counts(&self) -> BTreeMap<i64, u32> {
        self.write_calls.lock().clone()
    }

    /// Forget all recorded write calls.
    pub fn reset_counts(&self) {
        self.write_calls.lock().clear();
    }

    fn judge(&self, actions: &[UpdateAction]) -> Verdict {
        let Some(index) = appended_index(actions) else {
            return Verdict::Pass;
        };

        {
            let mut calls = self.write_calls.lock();
            let count = calls.entry(index).or_insert(0);
            *count = count.saturating_add(1);
        }

        let Ok(index) = u32::try_from(index) else {
            return Verdict::Pass;
        };
        if self.plan.fail_indices.contains(&index) {
            debug!(index, "injecting write failure");
            Verdict::Fail
        } else if self.plan.drop_indices.contains(&index) {
            debug!(index, "dropping acknowledged write");
            Verdict::Drop
        } else {
            Verdict::Pass
        }
    }
}

/// The index a write appends to the record's collection, if any.
pub fn appended_index(actions: &[UpdateAction]) -> Option<i64> {
    actions.iter().find_map(|action| match action {
        UpdateAction::SetListElement {
            value: AttributeValue::N(n),
            ..
        } => n.parse().ok(),
        UpdateAction::AddToNumberSet { value, .. } => Some(*value),
        _ => None,
    })
}

fn injected_failure(key: &str) -> StoreError {
    StoreError::Unavailable {
        reason: format!("injected fault writing {key}"),
    }
}

#[async_trait]
impl<S: DocumentStore + ?Sized> DocumentStore for FaultInjectingStore<S> {
    async fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, StoreError> {
        self.inner.get_item(request).await
    }

    async fn put_item(&self, request: PutItemRequest) -> Result<(), StoreError> {
        self.inner.put_item(request).await
    }

    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), StoreError> {
        match self.judge(&request.actions) {
            Verdict::Pass => self.inner.update_item(request).await,
            Verdict::Fail => Err(injected_failure(&request.key.to_string())),
            Verdict::Drop => Ok(()),
        }
    }

    async fn transact_get(&self, request: TransactGetRequest) -> Result<TransactGetResult, StoreError> {
        self.inner.transact_get(request).await
    }

    async fn transact_write(&self, request: TransactWriteRequest) -> Result<(), StoreError> {
        match self.judge(&request.actions) {
            Verdict::Pass => self.inner.transact_write(request).await,
            Verdict::Fail => Err(injected_failure(&request.key.to_string())),
            Verdict::Drop => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use stampede_store::RecordKey;

    use super::*;
    use crate::InMemoryDocumentStore;

    const TABLE: &str = "records";

    fn append(index: i64) -> Vec<UpdateAction> {
        vec![UpdateAction::AddToNumberSet {
            attribute: "HandledIndexes".into(),
            value: index,
        }]
    }

    fn update(index: i64) -> UpdateItemRequest {
        UpdateItemRequest {
            table: TABLE.into(),
            key: RecordKey::new("RecordId", "a"),
            actions: append(index),
            condition: None,
        }
    }

    #[test]
    fn test_appended_index_from_list_and_set() {
        let list = vec![UpdateAction::SetListElement {
            attribute: "HandledIndexes".into(),
            position: 3,
            value: AttributeValue::number(11),
        }];
        assert_eq!(appended_index(&list), Some(11));
        assert_eq!(appended_index(&append(4)), Some(4));

        let version_only = vec![UpdateAction::SetNumber {
            attribute: "ItemVersion".into(),
            value: "2".into(),
        }];
        assert_eq!(appended_index(&version_only), None);
    }

    #[test]
    fn test_plan_is_empty() {
        assert!(FaultPlan::default().is_empty());
        let plan = FaultPlan {
            fail_indices: BTreeSet::from([7]),
            ..Default::default()
        };
        assert!(!plan.is_empty());
    }

    #[tokio::test]
    async fn test_fail_index_always_fails() {
        let inner = InMemoryDocumentStore::with_table(TABLE).await;
        let store = FaultInjectingStore::new(inner.clone(), FaultPlan {
            fail_indices: BTreeSet::from([7]),
            ..Default::default()
        });

        for _ in 0..3 {
            let err = store.update_item(update(7)).await.unwrap_err();
            assert!(matches!(err, StoreError::Unavailable { .. }));
        }
        store.update_item(update(8)).await.unwrap();

        assert_eq!(store.write_calls(7), 3);
        assert_eq!(store.write_calls(8), 1);
        assert_eq!(inner.stats().writes_committed, 1);
    }

    #[tokio::test]
    async fn test_drop_index_acknowledges_without_applying() {
        let inner = InMemoryDocumentStore::with_table(TABLE).await;
        let store = FaultInjectingStore::new(inner.clone(), FaultPlan {
            drop_indices: BTreeSet::from([2]),
            ..Default::default()
        });

        store.update_item(update(2)).await.unwrap();
        assert_eq!(inner.stats().writes_committed, 0);
        assert_eq!(inner.item_count(TABLE).await.unwrap(), 0);

        store.reset_counts();
        assert_eq!(store.write_calls(2), 0);
    }
}
