//! Update protocols: how one worker appends its index to the shared record.
//!
//! Two interchangeable strategies implement [`UpdateProtocol`]:
//!
//! - [`OccProtocol`]: read the version, write conditioned on it being unchanged
//! - [`TransactionalProtocol`]: transactional read, then a transactional write
//!   the store rejects if the record changed in between
//!
//! A single call to [`UpdateProtocol::attempt_update`] is one read followed by
//! at most one write. Retrying is the job of [`run_worker`].

mod occ;
mod transaction;
mod worker;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
pub use occ::OccProtocol;
pub use occ::update_with_occ;
use serde::Deserialize;
use serde::Serialize;
use stampede_store::DocumentStore;
pub use transaction::TransactionalProtocol;
pub use transaction::update_with_transaction;
pub use worker::run_worker;

use crate::codec::RecordLayout;
use crate::error::AttemptError;
use crate::types::TrialTarget;

/// One strategy for appending a worker's index to the shared record.
#[async_trait]
pub trait UpdateProtocol: Send + Sync {
    /// Which strategy this is.
    fn kind(&self) -> ProtocolKind;

    /// Record layout the strategy reads and writes.
    fn layout(&self) -> RecordLayout {
        self.kind().layout()
    }

    /// Make exactly one read and at most one write appending `index`.
    async fn attempt_update(
        &self,
        store: &dyn DocumentStore,
        target: &TrialTarget,
        index: u32,
    ) -> Result<(), AttemptError>;
}

/// Selector for the available strategies.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolKind {
    /// Version-guarded conditional update.
    #[default]
    Occ,
    /// Transactional read and write.
    Transaction,
}

impl ProtocolKind {
    /// Both strategies, in comparison order.
    pub const ALL: [ProtocolKind; 2] = [ProtocolKind::Occ, ProtocolKind::Transaction];

    /// Record layout the strategy uses.
    pub fn layout(self) -> RecordLayout {
        match self {
            ProtocolKind::Occ => RecordLayout::Versioned,
            ProtocolKind::Transaction => RecordLayout::Unversioned,
        }
    }

    /// Instantiate the strategy.
    pub fn build(self) -> Arc<dyn UpdateProtocol> {
        match self {
            ProtocolKind::Occ => Arc::new(OccProtocol),
            ProtocolKind::Transaction => Arc::new(TransactionalProtocol),
        }
    }
}

impl fmt::Display for ProtocolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolKind::Occ => f.write_str("occ"),
            ProtocolKind::Transaction => f.write_str("transaction"),
        }
    }
}

impl FromStr for ProtocolKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "occ" | "optimistic" => Ok(ProtocolKind::Occ),
            "transaction" | "transactional" | "tx" => Ok(ProtocolKind::Transaction),
            other => Err(format!("unknown protocol '{other}', expected 'occ' or 'transaction'")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_kind_parse() {
        assert_eq!("occ".parse::<ProtocolKind>().unwrap(), ProtocolKind::Occ);
        assert_eq!("OCC".parse::<ProtocolKind>().unwrap(), ProtocolKind::Occ);
        assert_eq!("transaction".parse::<ProtocolKind>().unwrap(), ProtocolKind::Transaction);
        assert_eq!("tx".parse::<ProtocolKind>().unwrap(), ProtocolKind::Transaction);
        assert!("paxos".parse::<ProtocolKind>().is_err());
    }

    #[test]
    fn test_protocol_kind_display_round_trips() {
        for kind in ProtocolKind::ALL {
            assert_eq!(kind.to_string().parse::<ProtocolKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_built_protocol_reports_kind_and_layout() {
        let occ = ProtocolKind::Occ.build();
        assert_eq!(occ.kind(), ProtocolKind::Occ);
        assert_eq!(occ.layout(), RecordLayout::Versioned);

        let tx = ProtocolKind::Transaction.build();
        assert_eq!(tx.kind(), ProtocolKind::Transaction);
        assert_eq!(tx.layout(), RecordLayout::Unversioned);
    }
}
