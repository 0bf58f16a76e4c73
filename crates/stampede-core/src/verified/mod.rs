//! Pure functions behind the update protocols and the trial harness.
//!
//! Everything here is deterministic: no I/O, no clocks, no randomness.
//! Randomness (backoff jitter) and time (latencies) are passed in by the
//! async shell in [`crate::protocol`] and [`crate::trial_loop`].
//!
//! # Module Organization
//!
//! - [`record`]: Version increments, list positions
//! - [`retry`]: Attempt state transitions, backoff delays
//! - [`reconcile`]: Comparing the durable record with reported outcomes
//! - [`stats`]: Latency percentiles and attempt totals
//!
//! # Tiger Style
//!
//! - Checked or saturating arithmetic, never a panic
//! - Explicit integer widths (u32 indices, u64 versions and milliseconds)

pub mod reconcile;
pub mod record;
pub mod retry;
pub mod stats;

pub use reconcile::Reconciliation;
pub use reconcile::reconcile;
pub use record::next_list_position;
pub use record::next_version;
pub use retry::AttemptState;
pub use retry::AttemptVerdict;
pub use retry::compute_backoff_ms;
pub use retry::jittered_delay_ms;
pub use retry::next_attempt_state;
pub use stats::percentile_ms;
