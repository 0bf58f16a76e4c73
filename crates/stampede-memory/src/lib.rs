//! In-memory backends for the stampede harness.
//!
//! - [`InMemoryDocumentStore`]: a linearizable document store with conditional
//!   updates and read-set checked transactions. Optional simulated latency
//!   widens the window between a worker's read and its write.
//! - [`FaultInjectingStore`]: wraps any [`DocumentStore`](stampede_store::DocumentStore)
//!   and fails or silently drops writes for chosen worker indices.

mod fault;
mod store;

pub use fault::FaultInjectingStore;
pub use fault::FaultPlan;
pub use fault::appended_index;
pub use store::InMemoryDocumentStore;
pub use store::MemoryStoreConfig;
pub use store::StoreStats;
