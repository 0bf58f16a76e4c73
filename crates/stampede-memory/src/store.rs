//! Linearizable in-memory document store.
//!
//! All tables live behind one async mutex, so every operation observes and
//! produces a single total order. Each committed write bumps a global revision
//! and stamps the item with it; transactional writes compare that stamp against
//! the one handed out by the transactional read.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;
use stampede_constants::harness::MAX_SIMULATED_LATENCY_MS;
use stampede_constants::record::RECORD_ID_ATTRIBUTE;
use stampede_store::AttributeValue;
use stampede_store::Condition;
use stampede_store::DocumentStore;
use stampede_store::GetItemRequest;
use stampede_store::Item;
use stampede_store::PutItemRequest;
use stampede_store::ReadStamp;
use stampede_store::RecordKey;
use stampede_store::StoreError;
use stampede_store::TransactGetRequest;
use stampede_store::TransactGetResult;
use stampede_store::TransactWriteRequest;
use stampede_store::UpdateAction;
use stampede_store::UpdateItemRequest;
use tokio::sync::Mutex;
use tracing::trace;

/// Simulated network behavior of the in-memory store.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MemoryStoreConfig {
    /// Fixed delay before every call (ms).
    #[serde(default)]
    pub latency_ms: u64,
    /// Additional uniformly random delay in `[0, latency_jitter_ms]` (ms).
    #[serde(default)]
    pub latency_jitter_ms: u64,
}

/// Operation counters, useful for comparing protocol behavior.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: u64,
    pub writes_committed: u64,
    pub condition_failures: u64,
    pub transaction_conflicts: u64,
}

#[derive(Debug, Clone)]
struct StoredItem {
    item: Item,
    revision: u64,
}

struct Table {
    key_attribute: String,
    items: BTreeMap<String, StoredItem>,
}

impl Table {
    fn check_key(&self, key: &RecordKey) -> Result<(), StoreError> {
        if key.attribute != self.key_attribute {
            return Err(StoreError::InvalidRequest {
                reason: format!("key attribute '{}' does not match table key '{}'", key.attribute, self.key_attribute),
            });
        }
        Ok(())
    }
}

#[derive(Default)]
struct State {
    tables: BTreeMap<String, Table>,
    revision: u64,
}

impl State {
    fn table(&self, name: &str) -> Result<&Table, StoreError> {
        self.tables.get(name).ok_or_else(|| StoreError::TableNotFound { table: name.to_string() })
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, StoreError> {
        self.tables.get_mut(name).ok_or_else(|| StoreError::TableNotFound { table: name.to_string() })
    }

    /// Current item for `key`, after checking the key against the table schema.
    fn current(&self, table: &str, key: &RecordKey) -> Result<Option<StoredItem>, StoreError> {
        let table = self.table(table)?;
        table.check_key(key)?;
        Ok(table.items.get(&key.value).cloned())
    }

    fn commit(&mut self, table: &str, key: String, item: Item) -> Result<(), StoreError> {
        let revision = self.next_revision();
        self.table_mut(table)?.items.insert(key, StoredItem { item, revision });
        Ok(())
    }

    fn next_revision(&mut self) -> u64 {
        self.revision = self.revision.saturating_add(1);
        self.revision
    }
}

#[derive(Default)]
struct Counters {
    reads: AtomicU64,
    writes_committed: AtomicU64,
    condition_failures: AtomicU64,
    transaction_conflicts: AtomicU64,
}

/// A linearizable in-memory [`DocumentStore`].
///
/// Tables must be created with [`InMemoryDocumentStore::create_table`] before
/// use; operations on unknown tables fail with [`StoreError::TableNotFound`].
pub struct InMemoryDocumentStore {
    state: Mutex<State>,
    config: MemoryStoreConfig,
    counters: Counters,
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::with_config(MemoryStoreConfig::default())
    }
}

impl InMemoryDocumentStore {
    /// Create an empty store with no simulated latency, wrapped in Arc.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Create an empty store with the given simulated latency.
    pub fn with_config(config: MemoryStoreConfig) -> Self {
        Self {
            state: Mutex::new(State::default()),
            config: MemoryStoreConfig {
                latency_ms: config.latency_ms.min(MAX_SIMULATED_LATENCY_MS),
                latency_jitter_ms: config.latency_jitter_ms.min(MAX_SIMULATED_LATENCY_MS),
            },
            counters: Counters::default(),
        }
    }

    /// Create a store that already holds one empty table keyed by
    /// [`RECORD_ID_ATTRIBUTE`].
    pub async fn with_table(table: &str) -> Arc<Self> {
        let store = Self::new();
        store.create_table(table, RECORD_ID_ATTRIBUTE).await;
        store
    }

    /// Create a table whose items are keyed by the string attribute
    /// `key_attribute`. Returns false if the table already existed.
    pub async fn create_table(&self, name: &str, key_attribute: &str) -> bool {
        let mut state = self.state.lock().await;
        if state.tables.contains_key(name) {
            return false;
        }
        state.tables.insert(name.to_string(), Table {
            key_attribute: key_attribute.to_string(),
            items: BTreeMap::new(),
        });
        true
    }

    /// Whether a table exists.
    pub async fn table_exists(&self, name: &str) -> bool {
        self.state.lock().await.tables.contains_key(name)
    }

    /// Number of items in a table.
    pub async fn item_count(&self, table: &str) -> Result<usize, StoreError> {
        Ok(self.state.lock().await.table(table)?.items.len())
    }

    /// Snapshot of the operation counters.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.counters.reads.load(Ordering::Relaxed),
            writes_committed: self.counters.writes_committed.load(Ordering::Relaxed),
            condition_failures: self.counters.condition_failures.load(Ordering::Relaxed),
            transaction_conflicts: self.counters.transaction_conflicts.load(Ordering::Relaxed),
        }
    }

    async fn simulate_latency(&self) {
        let delay_ms = self.latency_sample_ms();
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
    }

    fn latency_sample_ms(&self) -> u64 {
        let jitter = if self.config.latency_jitter_ms > 0 {
            rand::rng().random_range(0..=self.config.latency_jitter_ms)
        } else {
            0
        };
        self.config.latency_ms.saturating_add(jitter)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, StoreError> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        Ok(state.current(&request.table, &request.key)?.map(|stored| stored.item))
    }

    async fn put_item(&self, request: PutItemRequest) -> Result<(), StoreError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        let key_attribute = state.table(&request.table)?.key_attribute.clone();
        let key = RecordKey::from_item(&key_attribute, &request.item).ok_or_else(|| StoreError::InvalidRequest {
            reason: format!("item has no string key attribute '{}'", key_attribute),
        })?;

        state.commit(&request.table, key.value, request.item)?;
        self.counters.writes_committed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn update_item(&self, request: UpdateItemRequest) -> Result<(), StoreError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        let current = state.current(&request.table, &request.key)?;

        if let Some(condition) = &request.condition
            && !condition_holds(condition, current.as_ref().map(|stored| &stored.item))
        {
            self.counters.condition_failures.fetch_add(1, Ordering::Relaxed);
            trace!(key = %request.key, "condition failed");
            return Err(StoreError::ConditionFailed {
                key: request.key.to_string(),
            });
        }

        let base = current.map(|stored| stored.item).unwrap_or_else(|| request.key.to_item());
        let updated = apply_actions(base, &request.actions)?;
        state.commit(&request.table, request.key.value, updated)?;
        self.counters.writes_committed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn transact_get(&self, request: TransactGetRequest) -> Result<TransactGetResult, StoreError> {
        self.simulate_latency().await;
        let state = self.state.lock().await;
        self.counters.reads.fetch_add(1, Ordering::Relaxed);
        let stored = state.current(&request.table, &request.key)?;
        Ok(TransactGetResult {
            stamp: ReadStamp {
                revision: stored.as_ref().map(|s| s.revision),
            },
            item: stored.map(|s| s.item),
        })
    }

    async fn transact_write(&self, request: TransactWriteRequest) -> Result<(), StoreError> {
        self.simulate_latency().await;
        let mut state = self.state.lock().await;
        let current = state.current(&request.table, &request.key)?;

        let observed = current.as_ref().map(|stored| stored.revision);
        if observed != request.read_stamp.revision {
            self.counters.transaction_conflicts.fetch_add(1, Ordering::Relaxed);
            trace!(key = %request.key, ?observed, expected = ?request.read_stamp.revision, "transaction conflict");
            return Err(StoreError::TransactionConflict {
                key: request.key.to_string(),
                reason: format!(
                    "item revision {:?} does not match read revision {:?}",
                    observed, request.read_stamp.revision
                ),
            });
        }

        let base = current.map(|stored| stored.item).unwrap_or_else(|| request.key.to_item());
        let updated = apply_actions(base, &request.actions)?;
        state.commit(&request.table, request.key.value, updated)?;
        self.counters.writes_committed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

fn condition_holds(condition: &Condition, item: Option<&Item>) -> bool {
    match condition {
        Condition::NumberEquals { attribute, value } => match item.and_then(|i| i.get(attribute)) {
            Some(AttributeValue::N(actual)) => numbers_equal(actual, value),
            _ => false,
        },
    }
}

fn numbers_equal(left: &str, right: &str) -> bool {
    match (left.parse::<i128>(), right.parse::<i128>()) {
        (Ok(l), Ok(r)) => l == r,
        _ => left == right,
    }
}

/// Apply actions to a copy of the item. Either all apply or none do.
fn apply_actions(mut item: Item, actions: &[UpdateAction]) -> Result<Item, StoreError> {
    for action in actions {
        match action {
            UpdateAction::SetNumber { attribute, value } => {
                item.insert(attribute.clone(), AttributeValue::N(value.clone()));
            }
            UpdateAction::SetListElement {
                attribute,
                position,
                value,
            } => match item.get_mut(attribute) {
                Some(AttributeValue::L(list)) => {
                    let position = *position as usize;
                    if position >= list.len() {
                        list.push(value.clone());
                    } else {
                        list[position] = value.clone();
                    }
                }
                Some(other) => {
                    return Err(StoreError::InvalidRequest {
                        reason: format!("attribute '{}' is {}, not a list", attribute, other.kind()),
                    });
                }
                None => {
                    return Err(StoreError::InvalidRequest {
                        reason: format!("document path '{}' does not exist", attribute),
                    });
                }
            },
            UpdateAction::AddToNumberSet { attribute, value } => match item.get_mut(attribute) {
                Some(AttributeValue::Ns(set)) => {
                    set.insert(*value);
                }
                Some(other) => {
                    return Err(StoreError::InvalidRequest {
                        reason: format!("attribute '{}' is {}, not a number set", attribute, other.kind()),
                    });
                }
                None => {
                    item.insert(attribute.clone(), AttributeValue::Ns([*value].into_iter().collect()));
                }
            },
        }
    }
    Ok(item)
}
