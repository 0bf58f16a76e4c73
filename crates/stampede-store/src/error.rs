//! Errors returned by store operations.

use snafu::Snafu;

/// Errors from [`DocumentStore`](crate::DocumentStore) operations.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// A conditional update's condition did not hold at commit time.
    #[snafu(display("conditional check failed for {key}"))]
    ConditionFailed {
        /// Key of the item.
        key: String,
    },

    /// A transaction was aborted because its read set changed.
    #[snafu(display("transaction conflict on {key}: {reason}"))]
    TransactionConflict {
        /// Key of the item.
        key: String,
        /// Why the transaction was cancelled.
        reason: String,
    },

    /// Request rate exceeded what the store will accept.
    #[snafu(display("request throttled: {reason}"))]
    Throttled {
        /// Description from the store.
        reason: String,
    },

    /// Transient failure reaching or inside the store.
    #[snafu(display("store unavailable: {reason}"))]
    Unavailable {
        /// Description of the failure.
        reason: String,
    },

    /// The requested table does not exist.
    #[snafu(display("table '{table}' not found"))]
    TableNotFound {
        /// Table name.
        table: String,
    },

    /// The request is structurally invalid for the target item.
    #[snafu(display("invalid request: {reason}"))]
    InvalidRequest {
        /// What was wrong.
        reason: String,
    },
}

impl StoreError {
    /// True for the expected signals of a lost race with another writer.
    pub fn is_contention(&self) -> bool {
        matches!(self, StoreError::ConditionFailed { .. } | StoreError::TransactionConflict { .. })
    }
}
