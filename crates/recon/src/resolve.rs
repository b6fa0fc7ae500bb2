use lexsync_model::{Record, RecordStore};
use tracing::warn;

use crate::error::EngineError;

/// Which side of a matched-but-differing pair survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Source,
    Target,
}

/// Decides, for a matched-but-differing pair, which version survives.
pub trait ConflictResolver {
    fn resolve(
        &self,
        source: &Record,
        target: &Record,
        source_store: &dyn RecordStore,
        target_store: &dyn RecordStore,
    ) -> Result<Resolution, EngineError>;
}

/// The source version always survives.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceWins;

impl ConflictResolver for SourceWins {
    fn resolve(
        &self,
        _source: &Record,
        _target: &Record,
        _source_store: &dyn RecordStore,
        _target_store: &dyn RecordStore,
    ) -> Result<Resolution, EngineError> {
        Ok(Resolution::Source)
    }
}

/// The target version always survives; no update is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetWins;

impl ConflictResolver for TargetWins {
    fn resolve(
        &self,
        _source: &Record,
        _target: &Record,
        _source_store: &dyn RecordStore,
        _target_store: &dyn RecordStore,
    ) -> Result<Resolution, EngineError> {
        Ok(Resolution::Target)
    }
}

/// The later modification timestamp survives. When either side lacks the
/// timestamp the resolver falls back to the source side and logs it.
#[derive(Debug, Clone, Copy, Default)]
pub struct NewestWins;

impl ConflictResolver for NewestWins {
    fn resolve(
        &self,
        source: &Record,
        target: &Record,
        _source_store: &dyn RecordStore,
        _target_store: &dyn RecordStore,
    ) -> Result<Resolution, EngineError> {
        match (source.date_modified, target.date_modified) {
            (Some(s), Some(t)) if t > s => Ok(Resolution::Target),
            (Some(_), Some(_)) => Ok(Resolution::Source),
            _ => {
                warn!(
                    source = %source.guid,
                    target = %target.guid,
                    "newest_wins: modification timestamp unavailable, falling back to source"
                );
                Ok(Resolution::Source)
            }
        }
    }
}

/// Interactive resolution. There is no interactive mechanism in this
/// mode, so resolving fails explicitly rather than defaulting.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManualResolver;

impl ConflictResolver for ManualResolver {
    fn resolve(
        &self,
        _source: &Record,
        _target: &Record,
        _source_store: &dyn RecordStore,
        _target_store: &dyn RecordStore,
    ) -> Result<Resolution, EngineError> {
        Err(EngineError::ResolverUnsupported {
            name: "manual",
            reason: "interactive resolution is not available in this mode".to_string(),
        })
    }
}

/// Extension point: merge a named subset of fields from each side.
/// Unimplemented; resolving fails explicitly.
#[derive(Debug, Clone)]
pub struct FieldMergeResolver {
    pub source_fields: Vec<String>,
    pub target_fields: Vec<String>,
}

impl FieldMergeResolver {
    pub fn new<I, S>(source_fields: I, target_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            source_fields: source_fields.into_iter().map(Into::into).collect(),
            target_fields: target_fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl ConflictResolver for FieldMergeResolver {
    fn resolve(
        &self,
        _source: &Record,
        _target: &Record,
        _source_store: &dyn RecordStore,
        _target_store: &dyn RecordStore,
    ) -> Result<Resolution, EngineError> {
        Err(EngineError::ResolverUnsupported {
            name: "field_merge",
            reason: "field-level merging is not implemented".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use lexsync_model::MemoryStore;

    fn pair() -> (Record, Record, MemoryStore, MemoryStore) {
        let source = Record::new("lexical_entry").text("form", "perro");
        let target = Record::with_guid(source.guid, "lexical_entry").text("form", "gato");
        (source, target, MemoryStore::new("working"), MemoryStore::new("stable"))
    }

    #[test]
    fn source_wins_always_chooses_source() {
        let (s, t, ss, ts) = pair();
        assert_eq!(SourceWins.resolve(&s, &t, &ss, &ts).unwrap(), Resolution::Source);
    }

    #[test]
    fn target_wins_always_chooses_target() {
        let (s, t, ss, ts) = pair();
        assert_eq!(TargetWins.resolve(&s, &t, &ss, &ts).unwrap(), Resolution::Target);
    }

    #[test]
    fn newest_wins_prefers_later_timestamp() {
        let (s, t, ss, ts) = pair();
        let now = Utc::now();
        let s = s.modified_at(now - Duration::hours(1));
        let t = t.modified_at(now);
        assert_eq!(NewestWins.resolve(&s, &t, &ss, &ts).unwrap(), Resolution::Target);

        let s = s.modified_at(now + Duration::hours(1));
        assert_eq!(NewestWins.resolve(&s, &t, &ss, &ts).unwrap(), Resolution::Source);
    }

    #[test]
    fn newest_wins_falls_back_to_source_without_timestamps() {
        let (s, t, ss, ts) = pair();
        assert_eq!(NewestWins.resolve(&s, &t, &ss, &ts).unwrap(), Resolution::Source);
    }

    #[test]
    fn manual_fails_explicitly() {
        let (s, t, ss, ts) = pair();
        let err = ManualResolver.resolve(&s, &t, &ss, &ts).unwrap_err();
        assert!(matches!(err, EngineError::ResolverUnsupported { name: "manual", .. }));
    }

    #[test]
    fn field_merge_fails_explicitly() {
        let (s, t, ss, ts) = pair();
        let resolver = FieldMergeResolver::new(["form"], ["gloss"]);
        let err = resolver.resolve(&s, &t, &ss, &ts).unwrap_err();
        assert!(matches!(err, EngineError::ResolverUnsupported { name: "field_merge", .. }));
    }
}
