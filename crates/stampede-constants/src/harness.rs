//! Trial and worker bounds.

/// Default table holding the shared records.
pub const DEFAULT_TABLE_NAME: &str = "SagaData";

/// Default number of concurrent workers per trial.
///
/// Matches the contention level the harness was tuned against: enough
/// writers that most of them lose at least one race.
pub const DEFAULT_WORKER_COUNT: u32 = 50;

/// Upper bound on workers per trial.
///
/// Every worker is a spawned task holding one outstanding store request,
/// so this also bounds in-flight requests.
pub const MAX_WORKER_COUNT: u32 = 10_000;

/// Upper bound on simulated per-call latency for the in-memory store (ms).
pub const MAX_SIMULATED_LATENCY_MS: u64 = 10_000;
