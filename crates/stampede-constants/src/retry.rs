//! Attempt budgets and backoff bounds for update protocols.

/// Default attempt budget per worker.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 50;

/// Upper bound on the attempt budget per worker.
pub const MAX_ATTEMPTS_LIMIT: u32 = 10_000;

/// Default initial backoff when exponential backoff is enabled (ms).
pub const DEFAULT_BACKOFF_INITIAL_MS: u64 = 1;

/// Default backoff ceiling when exponential backoff is enabled (ms).
pub const DEFAULT_BACKOFF_MAX_MS: u64 = 128;

/// Upper bound on any single backoff sleep (ms).
pub const MAX_BACKOFF_MS: u64 = 5_000;
