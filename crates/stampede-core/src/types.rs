//! Core data types shared by protocols, workers and the trial harness.

use serde::Deserialize;
use serde::Serialize;
use stampede_constants::retry::DEFAULT_BACKOFF_INITIAL_MS;
use stampede_constants::retry::DEFAULT_BACKOFF_MAX_MS;
use stampede_constants::retry::DEFAULT_MAX_ATTEMPTS;
use stampede_constants::retry::MAX_ATTEMPTS_LIMIT;
use stampede_constants::retry::MAX_BACKOFF_MS;
use stampede_store::RecordKey;
use uuid::Uuid;

use crate::codec;

/// The record a trial's workers contend on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialTarget {
    /// Table holding the record.
    pub table: String,
    /// Identifier of the record, unique per trial.
    pub record_id: String,
}

impl TrialTarget {
    /// Target an existing record.
    pub fn new(table: impl Into<String>, record_id: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            record_id: record_id.into(),
        }
    }

    /// Target a fresh record with a random v4 identifier.
    pub fn fresh(table: impl Into<String>) -> Self {
        Self::new(table, Uuid::new_v4().to_string())
    }

    /// Store key of the record.
    pub fn key(&self) -> RecordKey {
        codec::record_key(&self.record_id)
    }
}

/// How one worker's append ended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkerOutcome {
    /// The index this worker tried to append.
    pub index: u32,
    /// True iff the store acknowledged the append.
    pub succeeded: bool,
    /// Attempts made, in `1..=max_attempts` unless the budget was zero.
    pub attempts_used: u32,
    /// Human-readable failure reason; `None` on success.
    pub error_detail: Option<String>,
    /// Wall time from first read to final result.
    pub elapsed_ms: u64,
}

impl WorkerOutcome {
    /// A successful outcome.
    pub fn success(index: u32, attempts_used: u32, elapsed_ms: u64) -> Self {
        Self {
            index,
            succeeded: true,
            attempts_used,
            error_detail: None,
            elapsed_ms,
        }
    }

    /// A failed outcome.
    pub fn failure(index: u32, attempts_used: u32, error_detail: String, elapsed_ms: u64) -> Self {
        Self {
            index,
            succeeded: false,
            attempts_used,
            error_detail: Some(error_detail),
            elapsed_ms,
        }
    }
}

/// Delay between a failed attempt and the next.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Backoff {
    /// Retry immediately.
    #[default]
    None,
    /// Double from `initial_ms` up to `max_ms`, optionally with jitter.
    Exponential {
        #[serde(default = "default_initial_ms")]
        initial_ms: u64,
        #[serde(default = "default_max_ms")]
        max_ms: u64,
        #[serde(default)]
        jitter: bool,
    },
}

fn default_initial_ms() -> u64 {
    DEFAULT_BACKOFF_INITIAL_MS
}

fn default_max_ms() -> u64 {
    DEFAULT_BACKOFF_MAX_MS
}

impl Backoff {
    /// Exponential backoff with the default bounds.
    pub fn exponential(jitter: bool) -> Self {
        Backoff::Exponential {
            initial_ms: DEFAULT_BACKOFF_INITIAL_MS,
            max_ms: DEFAULT_BACKOFF_MAX_MS,
            jitter,
        }
    }

    /// Check the bounds, returning a reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Backoff::None => Ok(()),
            Backoff::Exponential { initial_ms, max_ms, .. } => {
                if initial_ms == 0 {
                    return Err("backoff initial_ms must be positive".to_string());
                }
                if initial_ms > max_ms {
                    return Err(format!("backoff initial_ms ({initial_ms}) exceeds max_ms ({max_ms})"));
                }
                if max_ms > MAX_BACKOFF_MS {
                    return Err(format!("backoff max_ms ({max_ms}) exceeds limit ({MAX_BACKOFF_MS})"));
                }
                Ok(())
            }
        }
    }
}

/// Attempt budget and pacing for one worker.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
    #[serde(default)]
    pub backoff: Backoff,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: Backoff::None,
        }
    }
}

impl RetryPolicy {
    /// A policy of `max_attempts` immediate retries.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            backoff: Backoff::None,
        }
    }

    /// Check the bounds, returning a reason on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.max_attempts > MAX_ATTEMPTS_LIMIT {
            return Err(format!("max_attempts ({}) exceeds limit ({MAX_ATTEMPTS_LIMIT})", self.max_attempts));
        }
        self.backoff.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_targets_are_unique() {
        let a = TrialTarget::fresh("t");
        let b = TrialTarget::fresh("t");
        assert_ne!(a.record_id, b.record_id);
        assert_eq!(a.table, "t");
        assert_eq!(a.key().value, a.record_id);
    }

    #[test]
    fn test_outcome_constructors() {
        let ok = WorkerOutcome::success(3, 2, 10);
        assert!(ok.succeeded);
        assert_eq!(ok.error_detail, None);

        let failed = WorkerOutcome::failure(4, 5, "boom".into(), 12);
        assert!(!failed.succeeded);
        assert_eq!(failed.error_detail.as_deref(), Some("boom"));
    }

    #[test]
    fn test_policy_validation() {
        assert!(RetryPolicy::default().validate().is_ok());
        assert!(RetryPolicy::with_max_attempts(0).validate().is_err());
        assert!(RetryPolicy::with_max_attempts(MAX_ATTEMPTS_LIMIT + 1).validate().is_err());

        let bad_backoff = RetryPolicy {
            max_attempts: 3,
            backoff: Backoff::Exponential {
                initial_ms: 100,
                max_ms: 10,
                jitter: false,
            },
        };
        assert!(bad_backoff.validate().is_err());
        assert!(Backoff::exponential(true).validate().is_ok());
    }

    #[test]
    fn test_backoff_serde_defaults() {
        let parsed: Backoff = serde_json::from_str(r#"{"kind":"exponential"}"#).unwrap();
        assert_eq!(parsed, Backoff::exponential(false));

        let none: Backoff = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert_eq!(none, Backoff::None);
    }
}
