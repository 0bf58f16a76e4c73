//! Checking a finished trial's record against what its workers reported.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use stampede_store::DocumentStore;
use stampede_store::GetItemRequest;
use tracing::debug;

use crate::codec;
use crate::codec::RecordLayout;
use crate::error::CorruptRecordSnafu;
use crate::error::HarnessError;
use crate::error::ReadRecordSnafu;
use crate::harness::TrialRun;
use crate::types::TrialTarget;
use crate::types::WorkerOutcome;
use crate::verified;

/// Result of comparing the durable record with the expected index set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VerificationResult {
    /// True iff every index in `0..worker_count` whose worker did not
    /// report failure is stored.
    pub consistent: bool,
    /// Expected indices absent from the record, failed workers excluded.
    pub missing_indices: BTreeSet<u32>,
    /// Indices stored more than once.
    pub duplicate_indices: BTreeSet<u32>,
    /// Stored indices outside `0..worker_count`.
    pub unexpected_indices: BTreeSet<u32>,
    /// Stored indices whose worker reported failure.
    pub phantom_indices: BTreeSet<u32>,
    /// Indices whose worker reported success but which are absent.
    pub lost_indices: BTreeSet<u32>,
    /// Entries in the stored collection, duplicates included.
    pub durable_count: u64,
    /// Workers that reported success.
    pub reported_successes: u32,
    /// Final version counter, versioned layout only.
    pub final_version: Option<u64>,
}

impl VerificationResult {
    /// True if the version counter disagrees with the number of stored entries.
    pub fn version_mismatch(&self) -> bool {
        self.final_version.is_some_and(|version| version != self.durable_count)
    }

    /// True if the trial shows anything other than a complete, clean record.
    pub fn is_anomalous(&self) -> bool {
        !self.consistent
            || !self.duplicate_indices.is_empty()
            || !self.unexpected_indices.is_empty()
            || self.version_mismatch()
    }
}

/// Read the final record of `target` and reconcile it with `outcomes`.
pub async fn verify(
    store: &dyn DocumentStore,
    target: &TrialTarget,
    layout: RecordLayout,
    worker_count: u32,
    outcomes: &[WorkerOutcome],
) -> Result<VerificationResult, HarnessError> {
    let item = store
        .get_item(GetItemRequest::consistent(&target.table, target.key()))
        .await
        .context(ReadRecordSnafu {
            record_id: target.record_id.clone(),
        })?
        .ok_or_else(|| HarnessError::RecordVanished {
            record_id: target.record_id.clone(),
        })?;
    let record = codec::decode(&item, layout).context(CorruptRecordSnafu {
        record_id: target.record_id.clone(),
    })?;

    let reconciliation = verified::reconcile(
        worker_count,
        &record.handled_indices,
        outcomes.iter().map(|outcome| (outcome.index, outcome.succeeded)),
    );
    let result = VerificationResult {
        consistent: reconciliation.is_complete(),
        missing_indices: reconciliation.missing_indices,
        duplicate_indices: reconciliation.duplicate_indices,
        unexpected_indices: reconciliation.unexpected_indices,
        phantom_indices: reconciliation.phantom_indices,
        lost_indices: reconciliation.lost_indices,
        durable_count: reconciliation.durable_count,
        reported_successes: reconciliation.reported_successes,
        final_version: record.version,
    };
    debug!(
        record_id = %target.record_id,
        consistent = result.consistent,
        missing = result.missing_indices.len(),
        durable_count = result.durable_count,
        "trial verified"
    );
    Ok(result)
}

/// [`verify`] a finished [`TrialRun`].
pub async fn verify_run(store: &dyn DocumentStore, run: &TrialRun) -> Result<VerificationResult, HarnessError> {
    verify(store, &run.target, run.layout(), run.worker_count, &run.outcomes).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(worker_count: u32) -> VerificationResult {
        VerificationResult {
            consistent: true,
            durable_count: u64::from(worker_count),
            reported_successes: worker_count,
            final_version: Some(u64::from(worker_count)),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_result_is_not_anomalous() {
        assert!(!clean(50).is_anomalous());
    }

    #[test]
    fn test_inconsistent_is_anomalous() {
        let mut result = clean(50);
        result.consistent = false;
        result.missing_indices.insert(7);
        assert!(result.is_anomalous());
    }

    #[test]
    fn test_version_mismatch_is_anomalous() {
        let mut result = clean(50);
        result.final_version = Some(49);
        assert!(result.version_mismatch());
        assert!(result.is_anomalous());
    }

    #[test]
    fn test_unversioned_has_no_version_mismatch() {
        let mut result = clean(10);
        result.final_version = None;
        assert!(!result.version_mismatch());
    }

    #[test]
    fn test_duplicates_are_anomalous_even_when_complete() {
        let mut result = clean(3);
        result.duplicate_indices.insert(1);
        assert!(result.is_anomalous());
    }
}
