//! Attribute names of the shared record's wire representation.

/// Key attribute holding the record's stable identifier.
pub const RECORD_ID_ATTRIBUTE: &str = "RecordId";

/// Version counter attribute (versioned layout only).
pub const ITEM_VERSION_ATTRIBUTE: &str = "ItemVersion";

/// Collection of indices recorded by workers.
pub const HANDLED_INDEXES_ATTRIBUTE: &str = "HandledIndexes";
