//! One trial: a fresh record and N concurrent workers racing to append.

use std::sync::Arc;
use std::time::Instant;

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;
use stampede_constants::harness::MAX_WORKER_COUNT;
use stampede_store::DocumentStore;
use stampede_store::PutItemRequest;
use tokio::task::JoinSet;
use tracing::debug;
use tracing::info;

use crate::codec;
use crate::codec::RecordLayout;
use crate::error::CreateRecordSnafu;
use crate::error::HarnessError;
use crate::error::WorkerPanickedSnafu;
use crate::protocol::ProtocolKind;
use crate::protocol::UpdateProtocol;
use crate::protocol::run_worker;
use crate::types::RetryPolicy;
use crate::types::TrialTarget;
use crate::types::WorkerOutcome;

/// Everything a finished trial produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRun {
    /// The record the workers contended on.
    pub target: TrialTarget,
    /// Strategy the workers used.
    pub protocol: ProtocolKind,
    /// Number of workers launched.
    pub worker_count: u32,
    /// One outcome per worker, ordered by index.
    pub outcomes: Vec<WorkerOutcome>,
    /// Wall time from record creation to the last worker finishing.
    pub elapsed_ms: u64,
}

impl TrialRun {
    /// Identifier of the trial's record.
    pub fn record_id(&self) -> &str {
        &self.target.record_id
    }

    /// Record layout the trial used.
    pub fn layout(&self) -> RecordLayout {
        self.protocol.layout()
    }
}

/// Write the initial item for `target` in `layout`.
pub async fn create_record(
    store: &dyn DocumentStore,
    target: &TrialTarget,
    layout: RecordLayout,
) -> Result<(), HarnessError> {
    store
        .put_item(PutItemRequest {
            table: target.table.clone(),
            item: codec::encode_initial(&target.record_id, layout),
        })
        .await
        .context(CreateRecordSnafu {
            record_id: target.record_id.clone(),
        })
}

/// Create a fresh record in `table`, then run `worker_count` workers with
/// indices `0..worker_count` concurrently against it.
///
/// Returns once every worker has finished. Worker failures are reported in
/// the outcomes; only record creation or a panicking worker fail the call.
pub async fn run_trial(
    store: Arc<dyn DocumentStore>,
    protocol: Arc<dyn UpdateProtocol>,
    table: &str,
    worker_count: u32,
    policy: &RetryPolicy,
) -> Result<TrialRun, HarnessError> {
    if worker_count > MAX_WORKER_COUNT {
        return Err(HarnessError::InvalidSettings {
            reason: format!("worker_count ({worker_count}) exceeds limit ({MAX_WORKER_COUNT})"),
        });
    }

    let started = Instant::now();
    let target = TrialTarget::fresh(table);
    create_record(store.as_ref(), &target, protocol.layout()).await?;
    debug!(record_id = %target.record_id, worker_count, protocol = %protocol.kind(), "record created, launching workers");

    let mut workers = JoinSet::new();
    for index in 0..worker_count {
        let store = Arc::clone(&store);
        let protocol = Arc::clone(&protocol);
        let target = target.clone();
        let policy = *policy;
        workers.spawn(async move { run_worker(protocol.as_ref(), store.as_ref(), &target, index, &policy).await });
    }

    let mut outcomes = Vec::with_capacity(worker_count as usize);
    while let Some(joined) = workers.join_next().await {
        outcomes.push(joined.context(WorkerPanickedSnafu)?);
    }
    outcomes.sort_by_key(|outcome| outcome.index);

    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let succeeded = outcomes.iter().filter(|outcome| outcome.succeeded).count();
    info!(
        record_id = %target.record_id,
        worker_count,
        succeeded,
        elapsed_ms,
        "trial finished"
    );

    Ok(TrialRun {
        target,
        protocol: protocol.kind(),
        worker_count,
        outcomes,
        elapsed_ms,
    })
}
