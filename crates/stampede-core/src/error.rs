//! Error types for update attempts, workers and trials.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use snafu::Snafu;
use stampede_store::StoreError;

use crate::codec::CodecError;

/// Phase of an attempt in which a store call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptPhase {
    Reading,
    Writing,
}

impl fmt::Display for AttemptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptPhase::Reading => f.write_str("read"),
            AttemptPhase::Writing => f.write_str("write"),
        }
    }
}

/// Why a single update attempt did not commit.
#[derive(Debug, Clone, Snafu)]
#[snafu(visibility(pub))]
pub enum AttemptError {
    /// Another writer got there first.
    #[snafu(display("{phase} lost a race: {source}"))]
    Contention { phase: AttemptPhase, source: StoreError },

    /// Transient store failure.
    #[snafu(display("{phase} failed: {source}"))]
    Store { phase: AttemptPhase, source: StoreError },

    /// The record exists but cannot be decoded.
    #[snafu(display("malformed record '{record_id}': {source}"))]
    MalformedRecord { record_id: String, source: CodecError },

    /// The record does not exist.
    #[snafu(display("record '{record_id}' does not exist"))]
    RecordMissing { record_id: String },

    /// The version counter cannot be incremented.
    #[snafu(display("version counter of record '{record_id}' is exhausted"))]
    VersionOverflow { record_id: String },
}

impl AttemptError {
    /// Classify a store failure raised during `phase`.
    pub fn from_store(phase: AttemptPhase, source: StoreError) -> Self {
        if source.is_contention() {
            AttemptError::Contention { phase, source }
        } else {
            AttemptError::Store { phase, source }
        }
    }

    /// True if another attempt could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AttemptError::Contention { .. } | AttemptError::Store { .. })
    }
}

/// Why a worker gave up.
///
/// The display form is what ends up in a worker's `error_detail`.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum WorkerFailure {
    /// Every attempt in the budget failed.
    #[snafu(display(
        "failed after {attempts} attempt(s) while handling index {index}, last error: {}",
        describe_last(last_error.as_ref())
    ))]
    RetryBudgetExhausted {
        index: u32,
        attempts: u32,
        last_error: Option<AttemptError>,
    },

    /// A non-retryable error stopped the worker.
    #[snafu(display("aborted after {attempts} attempt(s) while handling index {index}: {source}"))]
    Aborted {
        index: u32,
        attempts: u32,
        source: AttemptError,
    },
}

fn describe_last(error: Option<&AttemptError>) -> String {
    match error {
        Some(error) => error.to_string(),
        None => "no attempt was made".to_string(),
    }
}

/// Failures of the trial harness itself, as opposed to worker failures.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum HarnessError {
    /// The fresh record could not be written.
    #[snafu(display("failed to create record '{record_id}': {source}"))]
    CreateRecord { record_id: String, source: StoreError },

    /// The final record could not be read for verification.
    #[snafu(display("failed to read record '{record_id}' for verification: {source}"))]
    ReadRecord { record_id: String, source: StoreError },

    /// The record vanished before verification.
    #[snafu(display("record '{record_id}' disappeared before verification"))]
    RecordVanished { record_id: String },

    /// The final record cannot be decoded.
    #[snafu(display("record '{record_id}' is malformed after the trial: {source}"))]
    CorruptRecord { record_id: String, source: CodecError },

    /// A worker task panicked or was cancelled.
    #[snafu(display("worker task did not complete: {source}"))]
    WorkerPanicked { source: tokio::task::JoinError },

    /// Trial settings are out of bounds.
    #[snafu(display("invalid trial settings: {reason}"))]
    InvalidSettings { reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conflict() -> StoreError {
        StoreError::ConditionFailed { key: "RecordId=a".into() }
    }

    fn throttled() -> StoreError {
        StoreError::Throttled {
            reason: "slow down".into(),
        }
    }

    #[test]
    fn test_from_store_classifies_contention() {
        let err = AttemptError::from_store(AttemptPhase::Writing, conflict());
        assert!(matches!(err, AttemptError::Contention { .. }));
        assert!(err.is_retryable());

        let err = AttemptError::from_store(AttemptPhase::Reading, throttled());
        assert!(matches!(err, AttemptError::Store { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_record_errors_are_fatal() {
        let missing = AttemptError::RecordMissing { record_id: "a".into() };
        assert!(!missing.is_retryable());

        let malformed = AttemptError::MalformedRecord {
            record_id: "a".into(),
            source: CodecError::MissingAttribute {
                name: "HandledIndexes".into(),
            },
        };
        assert!(!malformed.is_retryable());

        let overflow = AttemptError::VersionOverflow { record_id: "a".into() };
        assert!(!overflow.is_retryable());
    }

    #[test]
    fn test_worker_failure_display() {
        let exhausted = WorkerFailure::RetryBudgetExhausted {
            index: 7,
            attempts: 3,
            last_error: Some(AttemptError::from_store(AttemptPhase::Writing, throttled())),
        };
        let text = exhausted.to_string();
        assert!(text.contains("3 attempt(s)"));
        assert!(text.contains("index 7"));
        assert!(text.contains("write failed"));

        let none = WorkerFailure::RetryBudgetExhausted {
            index: 0,
            attempts: 0,
            last_error: None,
        };
        assert!(none.to_string().contains("no attempt was made"));
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(AttemptPhase::Reading.to_string(), "read");
        assert_eq!(AttemptPhase::Writing.to_string(), "write");
    }
}
