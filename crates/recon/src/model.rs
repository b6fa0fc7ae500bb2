use std::fmt;

use chrono::{DateTime, Utc};
use lexsync_model::{Guid, PropertyDiffs};
use serde::Serialize;

// ---------------------------------------------------------------------------
// Change classification
// ---------------------------------------------------------------------------

/// Closed classification of one record across the two stores.
///
/// `Conflict` exists in the type but the baseline classifier never emits
/// it: without common-ancestor tracking every mismatch is `Modified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    New,
    Modified,
    Deleted,
    Conflict,
    Unchanged,
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Modified => write!(f, "modified"),
            Self::Deleted => write!(f, "deleted"),
            Self::Conflict => write!(f, "conflict"),
            Self::Unchanged => write!(f, "unchanged"),
        }
    }
}

/// One classified record. Exactly one Change is produced per distinct
/// source record and per unmatched target record.
#[derive(Debug, Clone, Serialize)]
pub struct Change {
    pub change_type: ChangeType,
    pub source_guid: Option<Guid>,
    pub target_guid: Option<Guid>,
    pub object_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "PropertyDiffs::is_empty")]
    pub details: PropertyDiffs,
}

/// Ordered collection of changes for one object type.
#[derive(Debug, Clone, Serialize)]
pub struct DiffResult {
    pub object_type: String,
    pub changes: Vec<Change>,
}

impl DiffResult {
    pub fn new(object_type: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
            changes: Vec::new(),
        }
    }

    fn count(&self, change_type: ChangeType) -> usize {
        self.changes.iter().filter(|c| c.change_type == change_type).count()
    }

    pub fn num_new(&self) -> usize {
        self.count(ChangeType::New)
    }

    pub fn num_modified(&self) -> usize {
        self.count(ChangeType::Modified)
    }

    pub fn num_deleted(&self) -> usize {
        self.count(ChangeType::Deleted)
    }

    pub fn num_conflicts(&self) -> usize {
        self.count(ChangeType::Conflict)
    }

    pub fn num_unchanged(&self) -> usize {
        self.count(ChangeType::Unchanged)
    }

    /// Everything except unchanged.
    pub fn total(&self) -> usize {
        self.num_new() + self.num_modified() + self.num_deleted() + self.num_conflicts()
    }

    pub fn changes_of(&self, change_type: ChangeType) -> impl Iterator<Item = &Change> {
        self.changes.iter().filter(move |c| c.change_type == change_type)
    }

    pub fn new_changes(&self) -> impl Iterator<Item = &Change> {
        self.changes_of(ChangeType::New)
    }

    pub fn modified_changes(&self) -> impl Iterator<Item = &Change> {
        self.changes_of(ChangeType::Modified)
    }

    pub fn deleted_changes(&self) -> impl Iterator<Item = &Change> {
        self.changes_of(ChangeType::Deleted)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Critical => write!(f, "critical"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationIssue {
    pub severity: Severity,
    pub category: String,
    pub object_type: String,
    pub object_guid: Guid,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Accumulated findings for one or many candidates. Critical issues are
/// the sole gate callers use to decide whether to proceed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    pub fn merge(&mut self, other: ValidationResult) {
        self.issues.extend(other.issues);
    }

    pub fn has_critical(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn num_critical(&self) -> usize {
        self.issues.iter().filter(|i| i.severity == Severity::Critical).count()
    }

    pub fn criticals(&self) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Critical)
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Sync audit log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOp {
    Create,
    Update,
    Delete,
    Validate,
}

impl fmt::Display for SyncOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
            Self::Validate => write!(f, "validate"),
        }
    }
}

/// One applied operation, tagged with the object it touched.
#[derive(Debug, Clone, Serialize)]
pub struct SyncChange {
    pub op: SyncOp,
    pub object_type: String,
    pub guid: Guid,
    pub description: String,
}

/// One per-object failure. Collected, never raised, so one bad record
/// never blocks the rest of a batch. The GUID is retained so a caller can
/// retry exactly the failed subset.
#[derive(Debug, Clone, Serialize)]
pub struct SyncError {
    pub op: SyncOp,
    pub object_type: String,
    pub guid: Guid,
    pub message: String,
}

/// Audit log of one sync()/import run.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub object_type: String,
    pub run_at: DateTime<Utc>,
    pub engine_version: String,
    pub dry_run: bool,
    pub changes: Vec<SyncChange>,
    pub errors: Vec<SyncError>,
    #[serde(skip_serializing_if = "ValidationResult::is_empty")]
    pub validation: ValidationResult,
    pub num_created: usize,
    pub num_updated: usize,
    pub num_deleted: usize,
    pub num_skipped: usize,
}

impl SyncResult {
    pub fn new(object_type: &str, dry_run: bool) -> Self {
        Self {
            object_type: object_type.to_string(),
            run_at: Utc::now(),
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            dry_run,
            changes: Vec::new(),
            errors: Vec::new(),
            validation: ValidationResult::default(),
            num_created: 0,
            num_updated: 0,
            num_deleted: 0,
            num_skipped: 0,
        }
    }

    pub fn num_errors(&self) -> usize {
        self.errors.len()
    }

    pub fn success(&self) -> bool {
        self.errors.is_empty()
    }

    pub(crate) fn record_change(&mut self, op: SyncOp, guid: Guid, description: String) {
        self.changes.push(SyncChange {
            op,
            object_type: self.object_type.clone(),
            guid,
            description,
        });
    }

    pub(crate) fn record_error(&mut self, op: SyncOp, guid: Guid, message: String) {
        self.errors.push(SyncError {
            op,
            object_type: self.object_type.clone(),
            guid,
            message,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(change_type: ChangeType) -> Change {
        Change {
            change_type,
            source_guid: Some(Guid::new_v4()),
            target_guid: None,
            object_type: "lexical_entry".into(),
            description: String::new(),
            details: PropertyDiffs::new(),
        }
    }

    #[test]
    fn diff_counts_partition_changes() {
        let mut diff = DiffResult::new("lexical_entry");
        diff.changes.push(change(ChangeType::New));
        diff.changes.push(change(ChangeType::New));
        diff.changes.push(change(ChangeType::Modified));
        diff.changes.push(change(ChangeType::Deleted));
        diff.changes.push(change(ChangeType::Unchanged));

        assert_eq!(diff.num_new(), 2);
        assert_eq!(diff.num_modified(), 1);
        assert_eq!(diff.num_deleted(), 1);
        assert_eq!(diff.num_conflicts(), 0);
        assert_eq!(diff.num_unchanged(), 1);
        assert_eq!(diff.total(), 4);
        assert_eq!(diff.new_changes().count(), 2);
    }

    #[test]
    fn has_critical_reflects_severity() {
        let mut result = ValidationResult::default();
        result.push(ValidationIssue {
            severity: Severity::Info,
            category: "data_quality".into(),
            object_type: "lexical_entry".into(),
            object_guid: Guid::new_v4(),
            message: "no gloss text".into(),
            details: None,
        });
        assert!(!result.has_critical());

        result.push(ValidationIssue {
            severity: Severity::Critical,
            category: "missing_reference".into(),
            object_type: "lexical_entry".into(),
            object_guid: Guid::new_v4(),
            message: "dangling reference".into(),
            details: None,
        });
        assert!(result.has_critical());
        assert_eq!(result.num_critical(), 1);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn merge_accumulates_issues() {
        let mut a = ValidationResult::default();
        let mut b = ValidationResult::default();
        b.push(ValidationIssue {
            severity: Severity::Warning,
            category: "children_not_copied".into(),
            object_type: "lexical_entry".into(),
            object_guid: Guid::new_v4(),
            message: "2 owned record(s) will not be copied".into(),
            details: None,
        });
        a.merge(b);
        assert_eq!(a.len(), 1);
    }

    #[test]
    fn sync_result_success_tracks_errors() {
        let mut result = SyncResult::new("lexical_entry", false);
        assert!(result.success());
        result.record_error(SyncOp::Create, Guid::new_v4(), "boom".into());
        assert!(!result.success());
        assert_eq!(result.num_errors(), 1);
    }
}
