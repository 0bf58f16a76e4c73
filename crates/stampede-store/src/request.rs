//! Request and response types for store operations.

use serde::Deserialize;
use serde::Serialize;

use crate::value::AttributeValue;
use crate::value::Item;
use crate::value::RecordKey;

/// Point read of one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GetItemRequest {
    pub table: String,
    pub key: RecordKey,
    /// Request a strongly consistent read.
    pub consistent: bool,
}

impl GetItemRequest {
    /// A strongly consistent read of `key`.
    pub fn consistent(table: impl Into<String>, key: RecordKey) -> Self {
        Self {
            table: table.into(),
            key,
            consistent: true,
        }
    }
}

/// Unconditional write of a whole item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PutItemRequest {
    pub table: String,
    pub item: Item,
}

/// One mutation applied by an update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum UpdateAction {
    /// Set a number attribute.
    SetNumber { attribute: String, value: String },
    /// Set a list element. A position at or past the end appends.
    SetListElement {
        attribute: String,
        position: u32,
        value: AttributeValue,
    },
    /// Add a member to a number set, creating the set if absent.
    AddToNumberSet { attribute: String, value: i64 },
}

impl UpdateAction {
    /// The attribute this action writes.
    pub fn attribute(&self) -> &str {
        match self {
            UpdateAction::SetNumber { attribute, .. }
            | UpdateAction::SetListElement { attribute, .. }
            | UpdateAction::AddToNumberSet { attribute, .. } => attribute,
        }
    }
}

/// Server-side condition evaluated atomically with an update.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum Condition {
    /// The number attribute exists and equals `value`.
    NumberEquals { attribute: String, value: String },
}

/// Update of an existing item, optionally guarded by a condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpdateItemRequest {
    pub table: String,
    pub key: RecordKey,
    pub actions: Vec<UpdateAction>,
    pub condition: Option<Condition>,
}

/// Revision of an item observed inside a transaction.
///
/// `None` revision means the item did not exist when read.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ReadStamp {
    pub revision: Option<u64>,
}

/// Transactional read of one item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactGetRequest {
    pub table: String,
    pub key: RecordKey,
}

/// Result of a transactional read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactGetResult {
    pub item: Option<Item>,
    /// Revision to present back to [`crate::DocumentStore::transact_write`].
    pub stamp: ReadStamp,
}

/// Transactional write of one item.
///
/// The store rejects the write with
/// [`StoreError::TransactionConflict`](crate::StoreError::TransactionConflict)
/// if the item changed since `read_stamp` was taken.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactWriteRequest {
    pub table: String,
    pub key: RecordKey,
    pub actions: Vec<UpdateAction>,
    pub read_stamp: ReadStamp,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_item_consistent() {
        let req = GetItemRequest::consistent("t", RecordKey::new("RecordId", "a"));
        assert!(req.consistent);
        assert_eq!(req.table, "t");
    }

    #[test]
    fn update_action_attribute() {
        let set = UpdateAction::SetNumber {
            attribute: "ItemVersion".into(),
            value: "1".into(),
        };
        let list = UpdateAction::SetListElement {
            attribute: "HandledIndexes".into(),
            position: 0,
            value: AttributeValue::number(3),
        };
        let add = UpdateAction::AddToNumberSet {
            attribute: "HandledIndexes".into(),
            value: 3,
        };
        assert_eq!(set.attribute(), "ItemVersion");
        assert_eq!(list.attribute(), "HandledIndexes");
        assert_eq!(add.attribute(), "HandledIndexes");
    }

    #[test]
    fn read_stamp_default_is_absent() {
        assert_eq!(ReadStamp::default().revision, None);
    }

    #[test]
    fn transact_write_serialization_roundtrip() {
        let req = TransactWriteRequest {
            table: "t".into(),
            key: RecordKey::new("RecordId", "a"),
            actions: vec![UpdateAction::AddToNumberSet {
                attribute: "HandledIndexes".into(),
                value: 9,
            }],
            read_stamp: ReadStamp { revision: Some(4) },
        };
        let json = serde_json::to_string(&req).unwrap();
        let back: TransactWriteRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, back);
    }
}
