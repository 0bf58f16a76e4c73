//! Mapping between the shared record and its wire item.
//!
//! Two layouts exist, one per update protocol:
//!
//! | layout | `ItemVersion` | `HandledIndexes` |
//! |---|---|---|
//! | [`RecordLayout::Versioned`] | number, starts at 0 | list of numbers |
//! | [`RecordLayout::Unversioned`] | absent | number set |
//!
//! Encoding is total. Decoding rejects items whose attributes are absent or
//! have the wrong shape; such a record cannot be repaired by retrying.

use serde::Deserialize;
use serde::Serialize;
use snafu::Snafu;
use stampede_constants::record::HANDLED_INDEXES_ATTRIBUTE;
use stampede_constants::record::ITEM_VERSION_ATTRIBUTE;
use stampede_constants::record::RECORD_ID_ATTRIBUTE;
use stampede_store::AttributeValue;
use stampede_store::Condition;
use stampede_store::Item;
use stampede_store::RecordKey;
use stampede_store::UpdateAction;

/// Wire layout of a shared record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RecordLayout {
    /// Version counter plus a list of indices.
    Versioned,
    /// Number set of indices, no version counter.
    Unversioned,
}

/// A record that failed to decode.
#[derive(Debug, Clone, PartialEq, Eq, Snafu)]
#[snafu(visibility(pub))]
pub enum CodecError {
    /// A required attribute is absent.
    #[snafu(display("missing attribute '{name}'"))]
    MissingAttribute {
        /// Attribute name.
        name: String,
    },

    /// An attribute has the wrong value shape.
    #[snafu(display("attribute '{name}' is {actual}, expected {expected}"))]
    WrongShape {
        /// Attribute name.
        name: String,
        /// Expected shape.
        expected: &'static str,
        /// Shape found.
        actual: &'static str,
    },

    /// A number attribute or member does not fit the expected range.
    #[snafu(display("attribute '{name}' holds invalid number '{value}'"))]
    InvalidNumber {
        /// Attribute name.
        name: String,
        /// The offending value.
        value: String,
    },
}

/// The decoded contents of a shared record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    /// Version counter; `Some` exactly for [`RecordLayout::Versioned`].
    pub version: Option<u64>,
    /// Indices as stored. A list may contain duplicates; callers decide what
    /// that means.
    pub handled_indices: Vec<u32>,
}

/// Key of the record with the given identifier.
pub fn record_key(record_id: &str) -> RecordKey {
    RecordKey::new(RECORD_ID_ATTRIBUTE, record_id)
}

/// The initial item for a new record: version 0 (if versioned) and no indices.
pub fn encode_initial(record_id: &str, layout: RecordLayout) -> Item {
    let mut item = record_key(record_id).to_item();
    match layout {
        RecordLayout::Versioned => {
            item.insert(ITEM_VERSION_ATTRIBUTE.to_string(), AttributeValue::number(0));
            item.insert(HANDLED_INDEXES_ATTRIBUTE.to_string(), AttributeValue::L(Vec::new()));
        }
        RecordLayout::Unversioned => {
            item.insert(HANDLED_INDEXES_ATTRIBUTE.to_string(), AttributeValue::Ns(Default::default()));
        }
    }
    item
}

/// Decode a record item under the given layout.
pub fn decode(item: &Item, layout: RecordLayout) -> Result<DecodedRecord, CodecError> {
    let version = match layout {
        RecordLayout::Versioned => Some(decode_version(item)?),
        RecordLayout::Unversioned => None,
    };
    let handled_indices = decode_indices(item, layout)?;
    Ok(DecodedRecord {
        version,
        handled_indices,
    })
}

fn attribute<'a>(item: &'a Item, name: &str) -> Result<&'a AttributeValue, CodecError> {
    item.get(name).ok_or_else(|| CodecError::MissingAttribute { name: name.to_string() })
}

fn decode_version(item: &Item) -> Result<u64, CodecError> {
    match attribute(item, ITEM_VERSION_ATTRIBUTE)? {
        AttributeValue::N(raw) => raw.parse::<u64>().map_err(|_| CodecError::InvalidNumber {
            name: ITEM_VERSION_ATTRIBUTE.to_string(),
            value: raw.clone(),
        }),
        other => Err(CodecError::WrongShape {
            name: ITEM_VERSION_ATTRIBUTE.to_string(),
            expected: "N",
            actual: other.kind(),
        }),
    }
}

fn decode_indices(item: &Item, layout: RecordLayout) -> Result<Vec<u32>, CodecError> {
    let invalid = |value: String| CodecError::InvalidNumber {
        name: HANDLED_INDEXES_ATTRIBUTE.to_string(),
        value,
    };

    match (layout, attribute(item, HANDLED_INDEXES_ATTRIBUTE)?) {
        (RecordLayout::Versioned, AttributeValue::L(list)) => list
            .iter()
            .map(|element| match element {
                AttributeValue::N(raw) => raw.parse::<u32>().map_err(|_| invalid(raw.clone())),
                other => Err(CodecError::WrongShape {
                    name: HANDLED_INDEXES_ATTRIBUTE.to_string(),
                    expected: "list of N",
                    actual: other.kind(),
                }),
            })
            .collect(),
        (RecordLayout::Unversioned, AttributeValue::Ns(set)) => set
            .iter()
            .map(|member| u32::try_from(*member).map_err(|_| invalid(member.to_string())))
            .collect(),
        (RecordLayout::Versioned, other) => Err(CodecError::WrongShape {
            name: HANDLED_INDEXES_ATTRIBUTE.to_string(),
            expected: "L",
            actual: other.kind(),
        }),
        (RecordLayout::Unversioned, other) => Err(CodecError::WrongShape {
            name: HANDLED_INDEXES_ATTRIBUTE.to_string(),
            expected: "NS",
            actual: other.kind(),
        }),
    }
}

/// Actions that append `index` to a versioned record and bump its version.
///
/// `position` is the list slot to write; any slot at or past the current end
/// appends, so only the set of stored values matters, not their order.
pub fn versioned_append(position: u32, index: u32, next_version: u64) -> Vec<UpdateAction> {
    vec![
        UpdateAction::SetListElement {
            attribute: HANDLED_INDEXES_ATTRIBUTE.to_string(),
            position,
            value: AttributeValue::number(index),
        },
        UpdateAction::SetNumber {
            attribute: ITEM_VERSION_ATTRIBUTE.to_string(),
            value: next_version.to_string(),
        },
    ]
}

/// Actions that add `index` to an unversioned record's number set.
pub fn unversioned_append(index: u32) -> Vec<UpdateAction> {
    vec![UpdateAction::AddToNumberSet {
        attribute: HANDLED_INDEXES_ATTRIBUTE.to_string(),
        value: i64::from(index),
    }]
}

/// Condition that the stored version still equals `current_version`.
pub fn version_guard(current_version: u64) -> Condition {
    Condition::NumberEquals {
        attribute: ITEM_VERSION_ATTRIBUTE.to_string(),
        value: current_version.to_string(),
    }
}
