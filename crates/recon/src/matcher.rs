use std::collections::HashMap;
use std::fmt;

use lexsync_model::{FieldValue, Guid, Record};

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Match keys and the precomputed index
// ---------------------------------------------------------------------------

/// Key a strategy extracts from a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchKey {
    Guid(Guid),
    Fields(Vec<String>),
}

type KeyFn = Box<dyn Fn(&Record) -> Option<MatchKey>>;

/// Precomputed lookup over the target population, built once per
/// compare/sync call. Keeps total matching cost at O(S+T).
pub struct MatchIndex {
    by_key: HashMap<MatchKey, usize>,
    key_of: KeyFn,
}

impl MatchIndex {
    /// Position of the matching target record, if any.
    pub fn lookup(&self, source: &Record) -> Option<usize> {
        (self.key_of)(source).and_then(|key| self.by_key.get(&key).copied())
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

// The key-extraction closure is opaque; show only the indexed keys.
impl fmt::Debug for MatchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchIndex")
            .field("by_key", &self.by_key)
            .finish_non_exhaustive()
    }
}

/// Decides whether a source record corresponds to a target record.
pub trait MatchStrategy {
    /// Build the lookup index over the full target population.
    fn build_index(&self, object_type: &str, target: &[Record])
        -> Result<MatchIndex, EngineError>;
}

// ---------------------------------------------------------------------------
// GUID match
// ---------------------------------------------------------------------------

/// Exact-identity match: a source record corresponds to the target record
/// with the same GUID.
#[derive(Debug, Clone, Copy, Default)]
pub struct GuidMatchStrategy;

impl MatchStrategy for GuidMatchStrategy {
    fn build_index(
        &self,
        object_type: &str,
        target: &[Record],
    ) -> Result<MatchIndex, EngineError> {
        let mut by_key = HashMap::with_capacity(target.len());
        for (i, record) in target.iter().enumerate() {
            if by_key.insert(MatchKey::Guid(record.guid), i).is_some() {
                return Err(EngineError::DuplicateTargetGuid {
                    object_type: object_type.to_string(),
                    guid: record.guid,
                });
            }
        }
        Ok(MatchIndex {
            by_key,
            key_of: Box::new(|record| Some(MatchKey::Guid(record.guid))),
        })
    }
}

// ---------------------------------------------------------------------------
// Field-tuple match
// ---------------------------------------------------------------------------

/// Structural match on a tuple of named field values, for stores that do
/// not share GUIDs (independently authored data).
///
/// A target record missing one of the key fields is unindexable and can
/// only surface as deleted; a source record missing one matches nothing.
#[derive(Debug, Clone)]
pub struct FieldMatchStrategy {
    key_fields: Vec<String>,
}

impl FieldMatchStrategy {
    pub fn new<I, S>(key_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key_fields: key_fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    fn key_of(key_fields: &[String], record: &Record) -> Option<MatchKey> {
        let mut parts = Vec::with_capacity(key_fields.len());
        for field in key_fields {
            parts.push(canonical(record.fields.get(field)?));
        }
        Some(MatchKey::Fields(parts))
    }
}

/// Canonical key string, tagged by variant so values of different types
/// never collide.
fn canonical(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => format!("t:{s}"),
        FieldValue::Integer(n) => format!("i:{n}"),
        FieldValue::Boolean(b) => format!("b:{b}"),
        FieldValue::Reference(guid) => format!("r:{guid}"),
        FieldValue::MultiText(map) => {
            let joined: Vec<String> = map.iter().map(|(ws, t)| format!("{ws}={t}")).collect();
            format!("m:{}", joined.join("|"))
        }
    }
}

impl MatchStrategy for FieldMatchStrategy {
    fn build_index(
        &self,
        object_type: &str,
        target: &[Record],
    ) -> Result<MatchIndex, EngineError> {
        let mut by_key = HashMap::with_capacity(target.len());
        for (i, record) in target.iter().enumerate() {
            let Some(key) = Self::key_of(&self.key_fields, record) else {
                continue;
            };
            if by_key.insert(key, i).is_some() {
                let shown = Self::key_of(&self.key_fields, record)
                    .map(|key| match key {
                        MatchKey::Fields(parts) => parts.join(", "),
                        MatchKey::Guid(guid) => guid.to_string(),
                    })
                    .unwrap_or_default();
                return Err(EngineError::AmbiguousMatchKey {
                    object_type: object_type.to_string(),
                    key: shown,
                });
            }
        }
        let key_fields = self.key_fields.clone();
        Ok(MatchIndex {
            by_key,
            key_of: Box::new(move |record| Self::key_of(&key_fields, record)),
        })
    }
}
