use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use lexsync_model::Record;
use tracing::info;

use crate::diff::{self, FilterFn, ProgressFn};
use crate::engine::{EngineMode, SyncEngine};
use crate::error::EngineError;
use crate::model::{SyncOp, SyncResult};
use crate::validate::validate_before_create;

impl SyncEngine<'_> {
    /// Import source records created/modified after the given cutoffs.
    /// A record missing a timestamp is excluded whenever the matching
    /// cutoff is supplied: absence of evidence is treated as too old.
    #[allow(clippy::too_many_arguments)]
    pub fn import_new_objects(
        &mut self,
        object_type: &str,
        created_after: Option<DateTime<Utc>>,
        modified_after: Option<DateTime<Utc>>,
        validate_references: bool,
        dry_run: bool,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<SyncResult, EngineError> {
        self.import_by_filter(
            object_type,
            &|record: &Record| {
                let created_ok = created_after
                    .map_or(true, |cutoff| record.date_created.is_some_and(|at| at > cutoff));
                let modified_ok = modified_after
                    .map_or(true, |cutoff| record.date_modified.is_some_and(|at| at > cutoff));
                created_ok && modified_ok
            },
            validate_references,
            dry_run,
            progress,
        )
    }

    /// Import the source records an arbitrary predicate selects.
    pub fn import_by_filter(
        &mut self,
        object_type: &str,
        filter: &FilterFn<'_>,
        validate_references: bool,
        dry_run: bool,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<SyncResult, EngineError> {
        if self.mode == EngineMode::ReadOnly && !dry_run {
            return Err(EngineError::ReadOnlyTarget(self.target.name().to_string()));
        }

        let ops = self.providers.get(object_type)?;
        let mut candidates = ops.get_all(self.source);
        candidates.retain(|record| filter(record));
        self.import_candidates(object_type, candidates, validate_references, dry_run, progress)
    }

    fn import_candidates(
        &mut self,
        object_type: &str,
        candidates: Vec<Record>,
        validate_references: bool,
        dry_run: bool,
        mut progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<SyncResult, EngineError> {
        let ops = self.providers.get(object_type)?;
        let mut result = SyncResult::new(object_type, dry_run);

        // Records already present in the target are never overwritten by
        // an import; they are counted and left alone.
        let mut fresh = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if self.target.contains(candidate.guid) {
                result.num_skipped += 1;
            } else {
                fresh.push(candidate);
            }
        }

        diff::report(
            &mut progress,
            &format!(
                "importing {} {object_type} candidate(s) ({} already present)",
                fresh.len(),
                result.num_skipped
            ),
        )?;

        // Validate the whole batch up front so the caller sees every
        // offending record at once, not just the first.
        let mut blocked: BTreeSet<lexsync_model::Guid> = BTreeSet::new();
        if validate_references {
            for candidate in &fresh {
                let findings = validate_before_create(candidate, ops.as_ref(), &*self.target);
                result.record_change(
                    SyncOp::Validate,
                    candidate.guid,
                    format!("validated: {} finding(s)", findings.len()),
                );
                if findings.has_critical() {
                    blocked.insert(candidate.guid);
                }
                result.validation.merge(findings);
            }
            if result.validation.has_critical() && !dry_run {
                return Err(EngineError::Validation(result.validation));
            }
        }

        for candidate in &fresh {
            if blocked.contains(&candidate.guid) {
                result.num_skipped += 1;
                continue;
            }
            if dry_run {
                // Audited as a would-be create, counted as a skip.
                result.record_change(
                    SyncOp::Create,
                    candidate.guid,
                    format!("would import {}", label(ops.as_ref(), candidate)),
                );
                result.num_skipped += 1;
                continue;
            }
            match crate::merge::create_object(&mut *self.target, candidate, ops.as_ref()) {
                Ok(created) => {
                    result.record_change(
                        SyncOp::Create,
                        created.guid,
                        format!("imported {}", label(ops.as_ref(), candidate)),
                    );
                    result.num_created += 1;
                }
                Err(e) => result.record_error(SyncOp::Create, candidate.guid, e.to_string()),
            }
        }

        info!(
            object_type,
            dry_run,
            created = result.num_created,
            skipped = result.num_skipped,
            errors = result.num_errors(),
            "import complete"
        );
        diff::report(
            &mut progress,
            &format!(
                "import complete: {} created, {} skipped, {} error(s)",
                result.num_created,
                result.num_skipped,
                result.num_errors()
            ),
        )?;
        Ok(result)
    }
}

fn label(ops: &dyn lexsync_model::SyncableOps, record: &Record) -> String {
    ops.display_label(record)
        .unwrap_or_else(|| lexsync_model::short_guid(record.guid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lexsync_model::{Guid, MemoryStore, RecordStore};

    fn entry(form: &str) -> Record {
        Record::new("lexical_entry").text("form", form)
    }

    fn engine<'a>(source: &'a MemoryStore, target: &'a mut MemoryStore) -> SyncEngine<'a> {
        let mut engine = SyncEngine::new(source, target);
        engine.register_default_ops("lexical_entry").unwrap();
        engine
    }

    #[test]
    fn imports_only_records_past_the_cutoff() {
        let now = Utc::now();
        let mut source = MemoryStore::new("working");
        source.insert(entry("old").created_at(now - Duration::days(30)));
        let recent = entry("recent").created_at(now - Duration::hours(1));
        let recent_guid = recent.guid;
        source.insert(recent);
        let mut target = MemoryStore::new("stable");

        let mut engine = engine(&source, &mut target);
        let cutoff = now - Duration::days(1);
        let result = engine
            .import_new_objects("lexical_entry", Some(cutoff), None, false, false, None)
            .unwrap();
        assert_eq!(result.num_created, 1);
        drop(engine);
        assert!(target.contains(recent_guid));
        assert_eq!(target.len(), 1);
    }

    #[test]
    fn record_without_timestamp_is_excluded_under_a_cutoff() {
        let mut source = MemoryStore::new("working");
        source.insert(entry("undated"));
        let mut target = MemoryStore::new("stable");

        let mut engine = engine(&source, &mut target);
        let result = engine
            .import_new_objects(
                "lexical_entry",
                Some(Utc::now() - chrono::Duration::days(1)),
                None,
                false,
                false,
                None,
            )
            .unwrap();
        assert_eq!(result.num_created, 0);
    }

    #[test]
    fn existing_target_records_are_never_overwritten() {
        let mut source = MemoryStore::new("working");
        let mut target = MemoryStore::new("stable");
        let shared = entry("perro");
        let guid = shared.guid;
        target.insert(shared);
        // Same GUID, edited in the source.
        source.insert(Record::with_guid(guid, "lexical_entry").text("form", "perra"));

        let mut engine = engine(&source, &mut target);
        let result = engine
            .import_by_filter("lexical_entry", &|_| true, false, false, None)
            .unwrap();
        assert_eq!(result.num_created, 0);
        assert_eq!(result.num_skipped, 1);
        drop(engine);
        assert_eq!(
            target.get(guid).unwrap().fields.get("form").unwrap().summary(),
            "perro"
        );
    }

    #[test]
    fn critical_validation_blocks_the_whole_import() {
        let mut source = MemoryStore::new("working");
        source.insert(entry("clean"));
        source.insert(entry("broken").reference("part_of_speech", Guid::new_v4()));
        let mut target = MemoryStore::new("stable");

        let mut engine = engine(&source, &mut target);
        let err = engine
            .import_by_filter("lexical_entry", &|_| true, true, false, None)
            .unwrap_err();
        let EngineError::Validation(findings) = err else {
            panic!("expected a validation error");
        };
        assert!(findings.has_critical());
        drop(engine);
        // Nothing was created, not even the clean record.
        assert!(target.is_empty());
    }

    #[test]
    fn dry_run_surfaces_findings_without_failing() {
        let mut source = MemoryStore::new("working");
        source.insert(entry("clean"));
        source.insert(entry("broken").reference("part_of_speech", Guid::new_v4()));
        let mut target = MemoryStore::new("stable");

        let mut engine = engine(&source, &mut target);
        let result = engine
            .import_by_filter("lexical_entry", &|_| true, true, true, None)
            .unwrap();
        assert!(result.dry_run);
        assert!(result.validation.has_critical());
        assert_eq!(result.num_created, 0);
        // One blocked by the critical finding, one would-be create.
        assert_eq!(result.num_skipped, 2);
        drop(engine);
        assert!(target.is_empty());
    }

    #[test]
    fn import_against_read_only_target_fails_unless_dry_run() {
        let mut source = MemoryStore::new("working");
        source.insert(entry("perro"));
        let mut target = MemoryStore::read_only("stable");

        let mut engine = engine(&source, &mut target);
        let err = engine
            .import_by_filter("lexical_entry", &|_| true, false, false, None)
            .unwrap_err();
        assert!(matches!(err, EngineError::ReadOnlyTarget(_)));

        let result = engine
            .import_by_filter("lexical_entry", &|_| true, false, true, None)
            .unwrap();
        assert_eq!(result.num_created, 0);
        assert_eq!(result.num_skipped, 1);
    }
}
