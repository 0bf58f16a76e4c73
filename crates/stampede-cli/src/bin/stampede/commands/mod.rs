//! Command implementations.

pub mod compare;
pub mod run;

use std::sync::Arc;

use stampede_constants::record::RECORD_ID_ATTRIBUTE;
use stampede_memory::FaultInjectingStore;
use stampede_memory::InMemoryDocumentStore;
use stampede_store::DocumentStore;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::StressConfig;

/// Build the in-memory backend described by `config`, with its table created
/// and faults applied.
pub async fn build_store(config: &StressConfig) -> Arc<dyn DocumentStore> {
    let memory = Arc::new(InMemoryDocumentStore::with_config(config.memory));
    memory.create_table(&config.table_name, RECORD_ID_ATTRIBUTE).await;

    if config.faults.is_empty() {
        return memory;
    }
    info!(
        fail_indices = ?config.faults.fail_indices,
        drop_indices = ?config.faults.drop_indices,
        "fault injection enabled"
    );
    Arc::new(FaultInjectingStore::new(memory, config.faults.clone()))
}

/// A token cancelled on the first Ctrl-C.
pub fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, abandoning the current trial");
            token.cancel();
        }
    });
    cancel
}
