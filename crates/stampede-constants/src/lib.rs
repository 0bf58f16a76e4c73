//! Centralized constants for the stampede contention harness.
//!
//! Organized by category so callers can find the bound they need:
//!
//! - [`harness`]: Worker counts, trial bounds, default table name
//! - [`record`]: Attribute names of the shared record's wire form
//! - [`retry`]: Attempt budgets and backoff bounds
//!
//! Every default has a matching hard limit. Configuration is validated
//! against the limits before a trial starts.

mod assertions;
pub mod harness;
pub mod record;
pub mod retry;

/// Prelude module for commonly used constants.
pub mod prelude {
    pub use crate::harness::DEFAULT_TABLE_NAME;
    pub use crate::harness::DEFAULT_WORKER_COUNT;
    pub use crate::harness::MAX_WORKER_COUNT;
    pub use crate::record::HANDLED_INDEXES_ATTRIBUTE;
    pub use crate::record::ITEM_VERSION_ATTRIBUTE;
    pub use crate::record::RECORD_ID_ATTRIBUTE;
    pub use crate::retry::DEFAULT_MAX_ATTEMPTS;
    pub use crate::retry::MAX_ATTEMPTS_LIMIT;
}
