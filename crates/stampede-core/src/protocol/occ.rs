//! Optimistic concurrency: version-guarded conditional update.

use async_trait::async_trait;
use snafu::ResultExt;
use stampede_constants::record::ITEM_VERSION_ATTRIBUTE;
use stampede_store::DocumentStore;
use stampede_store::GetItemRequest;
use stampede_store::UpdateItemRequest;
use tracing::trace;

use super::ProtocolKind;
use super::UpdateProtocol;
use super::run_worker;
use crate::codec;
use crate::codec::CodecError;
use crate::codec::RecordLayout;
use crate::error::AttemptError;
use crate::error::AttemptPhase;
use crate::error::MalformedRecordSnafu;
use crate::types::RetryPolicy;
use crate::types::TrialTarget;
use crate::types::WorkerOutcome;
use crate::verified;

/// Read the record's version, then write the new index and `version + 1`
/// on condition that the version is unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct OccProtocol;

#[async_trait]
impl UpdateProtocol for OccProtocol {
    fn kind(&self) -> ProtocolKind {
        ProtocolKind::Occ
    }

    async fn attempt_update(
        &self,
        store: &dyn DocumentStore,
        target: &TrialTarget,
        index: u32,
    ) -> Result<(), AttemptError> {
        let item = store
            .get_item(GetItemRequest::consistent(&target.table, target.key()))
            .await
            .map_err(|source| AttemptError::from_store(AttemptPhase::Reading, source))?
            .ok_or_else(|| AttemptError::RecordMissing {
                record_id: target.record_id.clone(),
            })?;

        let record = codec::decode(&item, RecordLayout::Versioned).context(MalformedRecordSnafu {
            record_id: target.record_id.clone(),
        })?;
        let Some(current_version) = record.version else {
            return Err(AttemptError::MalformedRecord {
                record_id: target.record_id.clone(),
                source: CodecError::MissingAttribute {
                    name: ITEM_VERSION_ATTRIBUTE.to_string(),
                },
            });
        };
        let next_version = verified::next_version(current_version).ok_or_else(|| AttemptError::VersionOverflow {
            record_id: target.record_id.clone(),
        })?;
        let position = verified::next_list_position(record.handled_indices.len());

        trace!(index, current_version, position, "writing versioned append");
        store
            .update_item(UpdateItemRequest {
                table: target.table.clone(),
                key: target.key(),
                actions: codec::versioned_append(position, index, next_version),
                condition: Some(codec::version_guard(current_version)),
            })
            .await
            .map_err(|source| AttemptError::from_store(AttemptPhase::Writing, source))
    }
}

/// Append `index` to the target record with [`OccProtocol`], retrying per `policy`.
pub async fn update_with_occ(
    store: &dyn DocumentStore,
    target: &TrialTarget,
    index: u32,
    policy: &RetryPolicy,
) -> WorkerOutcome {
    run_worker(&OccProtocol, store, target, index, policy).await
}
