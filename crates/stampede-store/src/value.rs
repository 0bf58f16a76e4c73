//! Wire values for store items.

use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

/// A single attribute value as carried on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AttributeValue {
    /// String.
    S(String),
    /// Number, encoded as a decimal string.
    N(String),
    /// Ordered list of values.
    L(Vec<AttributeValue>),
    /// Number set. Members are unique by construction.
    Ns(BTreeSet<i64>),
}

impl AttributeValue {
    /// Build a number attribute from any integer.
    pub fn number(value: impl Into<i64>) -> Self {
        AttributeValue::N(value.into().to_string())
    }

    /// Short name of the value's shape, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            AttributeValue::S(_) => "S",
            AttributeValue::N(_) => "N",
            AttributeValue::L(_) => "L",
            AttributeValue::Ns(_) => "NS",
        }
    }
}

/// A store item: attribute name to value.
pub type Item = BTreeMap<String, AttributeValue>;

/// Primary key of an item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordKey {
    /// Name of the key attribute.
    pub attribute: String,
    /// Key value.
    pub value: String,
}

impl RecordKey {
    /// Create a key for the given attribute and value.
    pub fn new(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    /// The key as item attributes, for seeding a new item.
    pub fn to_item(&self) -> Item {
        let mut item = Item::new();
        item.insert(self.attribute.clone(), AttributeValue::S(self.value.clone()));
        item
    }

    /// Extract the key from an item, if the key attribute is a string.
    pub fn from_item(attribute: &str, item: &Item) -> Option<Self> {
        match item.get(attribute) {
            Some(AttributeValue::S(value)) => Some(Self::new(attribute, value.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.attribute, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn number_encodes_decimal_string() {
        assert_eq!(AttributeValue::number(42), AttributeValue::N("42".to_string()));
        assert_eq!(AttributeValue::number(-3), AttributeValue::N("-3".to_string()));
    }

    #[test]
    fn kind_names() {
        assert_eq!(AttributeValue::S("x".into()).kind(), "S");
        assert_eq!(AttributeValue::number(1).kind(), "N");
        assert_eq!(AttributeValue::L(vec![]).kind(), "L");
        assert_eq!(AttributeValue::Ns(BTreeSet::new()).kind(), "NS");
    }

    #[test]
    fn record_key_item_roundtrip() {
        let key = RecordKey::new("RecordId", "abc");
        let item = key.to_item();
        assert_eq!(item.len(), 1);
        assert_eq!(RecordKey::from_item("RecordId", &item), Some(key));
    }

    #[test]
    fn record_key_from_item_rejects_non_string() {
        let mut item = Item::new();
        item.insert("RecordId".to_string(), AttributeValue::number(7));
        assert_eq!(RecordKey::from_item("RecordId", &item), None);
        assert_eq!(RecordKey::from_item("Other", &item), None);
    }

    #[test]
    fn record_key_display() {
        assert_eq!(RecordKey::new("RecordId", "abc").to_string(), "RecordId=abc");
    }

    #[test]
    fn attribute_value_serialization() {
        let value = AttributeValue::L(vec![AttributeValue::number(1), AttributeValue::number(2)]);
        let json = serde_json::to_string(&value).unwrap();
        let back: AttributeValue = serde_json::from_str(&json).unwrap();
        assert_eq!(value, back);
    }
}
