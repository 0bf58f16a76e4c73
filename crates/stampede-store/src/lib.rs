//! Document store facade for the stampede harness.
//!
//! The harness never talks to a concrete database. It consumes the small set of
//! primitives defined here:
//!
//! - strongly consistent point reads ([`DocumentStore::get_item`])
//! - unconditional puts ([`DocumentStore::put_item`])
//! - conditional updates ([`DocumentStore::update_item`])
//! - transactional read/write with read-set conflict detection
//!   ([`DocumentStore::transact_get`], [`DocumentStore::transact_write`])
//!
//! Items are attribute maps in the shape document stores use on the wire:
//! numbers travel as decimal strings, collections are lists or number sets.

mod error;
mod request;
mod traits;
mod value;

pub use error::StoreError;
pub use request::Condition;
pub use request::GetItemRequest;
pub use request::PutItemRequest;
pub use request::ReadStamp;
pub use request::TransactGetRequest;
pub use request::TransactGetResult;
pub use request::TransactWriteRequest;
pub use request::UpdateAction;
pub use request::UpdateItemRequest;
pub use traits::DocumentStore;
pub use value::AttributeValue;
pub use value::Item;
pub use value::RecordKey;
