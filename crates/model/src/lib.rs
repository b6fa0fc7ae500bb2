//! `lexsync-model` — record and store model shared by the reconciliation core.
//!
//! Pure types crate: records, field values, the store boundary, and the
//! per-object-type provider capability traits. No engine logic.

pub mod ops;
pub mod record;
pub mod store;

pub use ops::{diff_properties, CompareOps, GenericOps, PropertyDelta, PropertyDiffs, SyncableOps};
pub use record::{short_guid, FieldValue, Guid, Record};
pub use store::{MemoryStore, RecordStore, StoreError};
