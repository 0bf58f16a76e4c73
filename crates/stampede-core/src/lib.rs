//! Contention harness for concurrent appends to a single shared record.
//!
//! Many workers each try to append their own index to one record in a
//! [`DocumentStore`](stampede_store::DocumentStore). Every worker retries on
//! contention up to a fixed budget. After a trial the record is read back
//! and compared with what the workers reported, which exposes lost updates,
//! duplicates and version drift.
//!
//! # Layers
//!
//! - [`codec`]: Record wire layout and update actions
//! - [`protocol`]: [`UpdateProtocol`] strategies and the retry driver
//! - [`harness`]: One trial with N concurrent workers
//! - [`verify`]: Reconciling the durable record with worker outcomes
//! - [`trial_loop`]: Repeating trials until an anomaly or cancellation
//! - [`verified`]: Pure decision functions behind all of the above
//!
//! # Example
//!
//! ```ignore
//! use stampede_core::{ProtocolKind, RetryPolicy, run_trial, verify_run};
//!
//! let store: Arc<dyn DocumentStore> = InMemoryDocumentStore::with_table("SagaData").await;
//! let run = run_trial(store.clone(), ProtocolKind::Occ.build(), "SagaData", 50, &RetryPolicy::default()).await?;
//! let result = verify_run(store.as_ref(), &run).await?;
//! assert!(result.consistent);
//! ```

pub mod codec;
pub mod error;
pub mod harness;
pub mod protocol;
pub mod trial_loop;
mod types;
pub mod verified;
pub mod verify;

pub use codec::CodecError;
pub use codec::DecodedRecord;
pub use codec::RecordLayout;
pub use error::AttemptError;
pub use error::AttemptPhase;
pub use error::HarnessError;
pub use error::WorkerFailure;
pub use harness::TrialRun;
pub use harness::create_record;
pub use harness::run_trial;
pub use protocol::OccProtocol;
pub use protocol::ProtocolKind;
pub use protocol::TransactionalProtocol;
pub use protocol::UpdateProtocol;
pub use protocol::run_worker;
pub use protocol::update_with_occ;
pub use protocol::update_with_transaction;
pub use trial_loop::TrialDiagnostics;
pub use trial_loop::TrialLoop;
pub use trial_loop::TrialLoopReport;
pub use trial_loop::TrialSettings;
pub use trial_loop::TrialSummary;
pub use types::Backoff;
pub use types::RetryPolicy;
pub use types::TrialTarget;
pub use types::WorkerOutcome;
pub use verify::VerificationResult;
pub use verify::verify;
pub use verify::verify_run;
