//! Transactional read followed by a transactional write.

use async_trait::async_trait;
use snafu::ResultExt;
use stampede_store::DocumentStore;
use stampede_store::TransactGetRequest;
use stampede_store::TransactWriteRequest;
use tracing::trace;

use super::ProtocolKind;
use super::UpdateProtocol;
use super::run_worker;
use crate::codec;
use crate::codec::RecordLayout;
use crate::error::AttemptError;
use crate::error::AttemptPhase;
use crate::error::MalformedRecordSnafu;
use crate::types::RetryPolicy;
use crate::types::TrialTarget;
use crate::types::WorkerOutcome;

/// Read the record transactionally, then add the index to its number set in
/// a transaction the store aborts if the record changed since the read.
///
/// No version counter is kept; the store's conflict detection is the guard.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionalProtocol;

#[async_trait]
impl UpdateProtocol for TransactionalProtocol {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Transaction
    }

    async fn attempt_update(
        &self,
        store: &dyn DocumentStore,
        target: &TrialTarget,
        index: u32,
    ) -> Result<(), AttemptError> {
        let read = store
            .transact_get(TransactGetRequest {
                table: target.table.clone(),
                key: target.key(),
            })
            .await
            .map_err(|source| AttemptError::from_store(AttemptPhase::Reading, source))?;
        let item = read.item.ok_or_else(|| AttemptError::RecordMissing {
            record_id: target.record_id.clone(),
        })?;

        let record = codec::decode(&item, RecordLayout::Unversioned).context(MalformedRecordSnafu {
            record_id: target.record_id.clone(),
        })?;

        trace!(index, stored = record.handled_indices.len(), revision = ?read.stamp.revision, "writing transactional append");
        store
            .transact_write(TransactWriteRequest {
                table: target.table.clone(),
                key: target.key(),
                actions: codec::unversioned_append(index),
                read_stamp: read.stamp,
            })
            .await
            .map_err(|source| AttemptError::from_store(AttemptPhase::Writing, source))
    }
}

/// Append `index` to the target record with [`TransactionalProtocol`],
/// retrying per `policy`.
pub async fn update_with_transaction(
    store: &dyn DocumentStore,
    target: &TrialTarget,
    index: u32,
    policy: &RetryPolicy,
) -> WorkerOutcome {
    run_worker(&TransactionalProtocol, store, target, index, policy).await
}
