//! Repeated trials until one shows an anomaly, the limit is hit, or the
//! caller cancels.

use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use stampede_constants::harness::DEFAULT_TABLE_NAME;
use stampede_constants::harness::DEFAULT_WORKER_COUNT;
use stampede_constants::harness::MAX_WORKER_COUNT;
use stampede_store::DocumentStore;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use crate::error::HarnessError;
use crate::harness::TrialRun;
use crate::harness::run_trial;
use crate::protocol::ProtocolKind;
use crate::protocol::UpdateProtocol;
use crate::types::RetryPolicy;
use crate::verified;
use crate::verify::VerificationResult;
use crate::verify::verify_run;

/// What every trial in a loop runs with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialSettings {
    /// Table holding the shared records.
    pub table: String,
    /// Workers per trial.
    pub worker_count: u32,
    /// Retry policy of every worker.
    pub policy: RetryPolicy,
    /// Stop after this many clean trials; `None` runs until cancelled.
    pub max_trials: Option<u64>,
}

impl Default for TrialSettings {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE_NAME.to_string(),
            worker_count: DEFAULT_WORKER_COUNT,
            policy: RetryPolicy::default(),
            max_trials: None,
        }
    }
}

impl TrialSettings {
    /// Check the settings against the hard limits.
    pub fn validate(&self) -> Result<(), HarnessError> {
        let invalid = |reason: String| HarnessError::InvalidSettings { reason };
        if self.table.trim().is_empty() {
            return Err(invalid("table name must not be empty".to_string()));
        }
        if self.worker_count == 0 || self.worker_count > MAX_WORKER_COUNT {
            return Err(invalid(format!("worker_count must be in 1..={MAX_WORKER_COUNT}, got {}", self.worker_count)));
        }
        if self.max_trials == Some(0) {
            return Err(invalid("max_trials must be at least 1 when set".to_string()));
        }
        self.policy.validate().map_err(invalid)
    }
}

/// Per-trial statistics, logged and handed to the observer after every trial.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TrialSummary {
    /// 1-based trial number within the loop.
    pub trial: u64,
    pub record_id: String,
    pub protocol: ProtocolKind,
    pub successes: u32,
    pub failures: u32,
    /// Attempts made by all workers together.
    pub total_attempts: u64,
    /// Most attempts any single worker made.
    pub max_attempts_used: u32,
    pub p50_elapsed_ms: u64,
    pub max_elapsed_ms: u64,
    /// Whether the record held every expected index.
    pub consistent: bool,
}

impl TrialSummary {
    /// Summarize trial number `trial`.
    pub fn from_run(trial: u64, run: &TrialRun, verification: &VerificationResult) -> Self {
        let successes = run.outcomes.iter().filter(|outcome| outcome.succeeded).count() as u32;
        let failures = (run.outcomes.len() as u32).saturating_sub(successes);
        let total_attempts = run.outcomes.iter().map(|outcome| u64::from(outcome.attempts_used)).sum();
        let max_attempts_used = run.outcomes.iter().map(|outcome| outcome.attempts_used).max().unwrap_or(0);

        let mut latencies: Vec<u64> = run.outcomes.iter().map(|outcome| outcome.elapsed_ms).collect();
        latencies.sort_unstable();

        Self {
            trial,
            record_id: run.record_id().to_string(),
            protocol: run.protocol,
            successes,
            failures,
            total_attempts,
            max_attempts_used,
            p50_elapsed_ms: verified::percentile_ms(&latencies, 50),
            max_elapsed_ms: latencies.last().copied().unwrap_or(0),
            consistent: verification.consistent,
        }
    }
}

/// The trial that stopped the loop and everything needed to explain it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialDiagnostics {
    pub summary: TrialSummary,
    pub run: TrialRun,
    pub verification: VerificationResult,
}

/// How a trial loop ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrialLoopReport {
    /// A trial's record did not match expectations.
    AnomalyFound(Box<TrialDiagnostics>),
    /// The caller cancelled; `trials` clean trials completed first.
    Cancelled { trials: u64 },
    /// `trials` clean trials ran without an anomaly.
    TrialLimitReached { trials: u64 },
}

impl TrialLoopReport {
    /// Clean trials completed before the loop stopped.
    pub fn clean_trials(&self) -> u64 {
        match self {
            TrialLoopReport::AnomalyFound(diagnostics) => diagnostics.summary.trial.saturating_sub(1),
            TrialLoopReport::Cancelled { trials } | TrialLoopReport::TrialLimitReached { trials } => *trials,
        }
    }
}

/// Runs trials back to back against one store with one protocol.
pub struct TrialLoop {
    store: Arc<dyn DocumentStore>,
    protocol: Arc<dyn UpdateProtocol>,
    settings: TrialSettings,
}

impl TrialLoop {
    /// Create a loop after validating `settings`.
    pub fn new(
        store: Arc<dyn DocumentStore>,
        protocol: Arc<dyn UpdateProtocol>,
        settings: TrialSettings,
    ) -> Result<Self, HarnessError> {
        settings.validate()?;
        Ok(Self {
            store,
            protocol,
            settings,
        })
    }

    pub fn settings(&self) -> &TrialSettings {
        &self.settings
    }

    /// Run until an anomaly, the trial limit, or cancellation.
    pub async fn run(&self, cancel: CancellationToken) -> Result<TrialLoopReport, HarnessError> {
        self.run_with_observer(cancel, |_| {}).await
    }

    /// Like [`TrialLoop::run`], calling `observer` after every trial.
    ///
    /// Cancellation is honored between trials and while a trial is in
    /// flight; an interrupted trial is abandoned and not counted.
    pub async fn run_with_observer<F>(
        &self,
        cancel: CancellationToken,
        mut observer: F,
    ) -> Result<TrialLoopReport, HarnessError>
    where
        F: FnMut(&TrialSummary) + Send,
    {
        let mut trials = 0u64;
        loop {
            if let Some(max_trials) = self.settings.max_trials
                && trials >= max_trials
            {
                info!(trials, "trial limit reached without anomalies");
                return Ok(TrialLoopReport::TrialLimitReached { trials });
            }

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                result = self.run_one() => Some(result?),
            };
            let Some((run, verification)) = outcome else {
                info!(trials, "trial loop cancelled");
                return Ok(TrialLoopReport::Cancelled { trials });
            };

            let trial = trials.saturating_add(1);
            let summary = TrialSummary::from_run(trial, &run, &verification);
            info!(
                trial,
                record_id = %summary.record_id,
                protocol = %summary.protocol,
                successes = summary.successes,
                failures = summary.failures,
                total_attempts = summary.total_attempts,
                max_attempts_used = summary.max_attempts_used,
                p50_elapsed_ms = summary.p50_elapsed_ms,
                max_elapsed_ms = summary.max_elapsed_ms,
                consistent = summary.consistent,
                "trial summary"
            );
            observer(&summary);

            if verification.is_anomalous() {
                error!(
                    trial,
                    record_id = %summary.record_id,
                    missing = ?verification.missing_indices,
                    lost = ?verification.lost_indices,
                    duplicates = ?verification.duplicate_indices,
                    final_version = ?verification.final_version,
                    durable_count = verification.durable_count,
                    "anomaly found"
                );
                return Ok(TrialLoopReport::AnomalyFound(Box::new(TrialDiagnostics {
                    summary,
                    run,
                    verification,
                })));
            }
            trials = trial;
        }
    }

    async fn run_one(&self) -> Result<(TrialRun, VerificationResult), HarnessError> {
        let run = run_trial(
            Arc::clone(&self.store),
            Arc::clone(&self.protocol),
            &self.settings.table,
            self.settings.worker_count,
            &self.settings.policy,
        )
        .await?;
        let verification = verify_run(self.store.as_ref(), &run).await?;
        Ok((run, verification))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkerOutcome;

    fn run_with(outcomes: Vec<WorkerOutcome>) -> TrialRun {
        TrialRun {
            target: crate::types::TrialTarget::new("t", "r"),
            protocol: ProtocolKind::Occ,
            worker_count: outcomes.len() as u32,
            outcomes,
            elapsed_ms: 0,
        }
    }

    #[test]
    fn test_settings_validation() {
        assert!(TrialSettings::default().validate().is_ok());

        let empty_table = TrialSettings {
            table: " ".into(),
            ..Default::default()
        };
        assert!(empty_table.validate().is_err());

        let no_workers = TrialSettings {
            worker_count: 0,
            ..Default::default()
        };
        assert!(no_workers.validate().is_err());

        let zero_trials = TrialSettings {
            max_trials: Some(0),
            ..Default::default()
        };
        assert!(zero_trials.validate().is_err());

        let no_attempts = TrialSettings {
            policy: RetryPolicy::with_max_attempts(0),
            ..Default::default()
        };
        assert!(matches!(no_attempts.validate(), Err(HarnessError::InvalidSettings { .. })));
    }

    #[test]
    fn test_summary_from_run() {
        let run = run_with(vec![
            WorkerOutcome::success(0, 1, 4),
            WorkerOutcome::success(1, 3, 9),
            WorkerOutcome::failure(2, 5, "gave up".into(), 20),
        ]);
        let verification = VerificationResult {
            consistent: false,
            ..Default::default()
        };
        let summary = TrialSummary::from_run(4, &run, &verification);
        assert_eq!(summary.trial, 4);
        assert_eq!(summary.successes, 2);
        assert_eq!(summary.failures, 1);
        assert_eq!(summary.total_attempts, 9);
        assert_eq!(summary.max_attempts_used, 5);
        assert_eq!(summary.p50_elapsed_ms, 9);
        assert_eq!(summary.max_elapsed_ms, 20);
        assert!(!summary.consistent);
    }

    #[test]
    fn test_summary_of_empty_run() {
        let summary = TrialSummary::from_run(1, &run_with(vec![]), &VerificationResult::default());
        assert_eq!(summary.successes, 0);
        assert_eq!(summary.max_attempts_used, 0);
        assert_eq!(summary.p50_elapsed_ms, 0);
    }

    #[test]
    fn test_report_clean_trials() {
        assert_eq!(TrialLoopReport::Cancelled { trials: 3 }.clean_trials(), 3);
        assert_eq!(TrialLoopReport::TrialLimitReached { trials: 10 }.clean_trials(), 10);
    }
}
