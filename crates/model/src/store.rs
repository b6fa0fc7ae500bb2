use std::collections::BTreeMap;
use std::fmt;

use chrono::Utc;

use crate::record::{Guid, Record};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum StoreError {
    /// Write attempted against a store that reports itself read-only.
    ReadOnly(String),
    /// Create with a GUID the store already holds.
    DuplicateGuid(Guid),
    /// Update of a record the store does not hold.
    MissingRecord(Guid),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadOnly(name) => write!(f, "store '{name}' is not writable"),
            Self::DuplicateGuid(guid) => write!(f, "record {guid} already exists"),
            Self::MissingRecord(guid) => write!(f, "record {guid} does not exist"),
        }
    }
}

impl std::error::Error for StoreError {}

// ---------------------------------------------------------------------------
// Store boundary
// ---------------------------------------------------------------------------

/// The boundary every record repository must satisfy. The source store is
/// only ever read; the target store is the only store ever mutated.
pub trait RecordStore {
    fn name(&self) -> &str;
    fn is_writable(&self) -> bool;
    fn contains(&self, guid: Guid) -> bool;
    fn get(&self, guid: Guid) -> Option<Record>;
    /// Snapshot of every record of one object type.
    fn get_all(&self, object_type: &str) -> Vec<Record>;
    /// Add a brand-new record. Missing timestamps are filled with the
    /// store's own defaults.
    fn create(&mut self, record: Record) -> Result<Guid, StoreError>;
    /// Replace the stored record's properties; returns whether anything
    /// actually changed.
    fn update(&mut self, record: Record) -> Result<bool, StoreError>;
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// In-memory record store: reference semantics for the store boundary and
/// the fixture store used throughout the tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    name: String,
    writable: bool,
    records: BTreeMap<Guid, Record>,
}

impl MemoryStore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            writable: true,
            records: BTreeMap::new(),
        }
    }

    pub fn read_only(name: &str) -> Self {
        Self {
            writable: false,
            ..Self::new(name)
        }
    }

    /// Seed a record directly, bypassing the writability gate. Fixture
    /// setup only.
    pub fn insert(&mut self, record: Record) {
        self.records.insert(record.guid, record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn contains(&self, guid: Guid) -> bool {
        self.records.contains_key(&guid)
    }

    fn get(&self, guid: Guid) -> Option<Record> {
        self.records.get(&guid).cloned()
    }

    fn get_all(&self, object_type: &str) -> Vec<Record> {
        self.records
            .values()
            .filter(|r| r.object_type == object_type)
            .cloned()
            .collect()
    }

    fn create(&mut self, mut record: Record) -> Result<Guid, StoreError> {
        if !self.writable {
            return Err(StoreError::ReadOnly(self.name.clone()));
        }
        if self.records.contains_key(&record.guid) {
            return Err(StoreError::DuplicateGuid(record.guid));
        }
        let now = Utc::now();
        record.date_created.get_or_insert(now);
        record.date_modified.get_or_insert(now);
        let guid = record.guid;
        self.records.insert(guid, record);
        Ok(guid)
    }

    fn update(&mut self, mut record: Record) -> Result<bool, StoreError> {
        if !self.writable {
            return Err(StoreError::ReadOnly(self.name.clone()));
        }
        let Some(existing) = self.records.get(&record.guid) else {
            return Err(StoreError::MissingRecord(record.guid));
        };
        if existing.fields == record.fields && existing.owner == record.owner {
            return Ok(false);
        }
        record.date_created = existing.date_created;
        record.date_modified = Some(Utc::now());
        self.records.insert(record.guid, record);
        Ok(true)
    }
}
