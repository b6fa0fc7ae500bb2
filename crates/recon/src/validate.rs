use lexsync_model::{FieldValue, Record, RecordStore, SyncableOps};

use crate::model::{Severity, ValidationIssue, ValidationResult};

/// Referential/ownership integrity checks, run once per candidate before
/// any mutation. Every rule is evaluated and all findings accumulate;
/// nothing short-circuits.
pub fn validate_before_create(
    candidate: &Record,
    source_ops: &dyn SyncableOps,
    target_store: &dyn RecordStore,
) -> ValidationResult {
    let mut result = ValidationResult::default();

    // Every reference-typed field must resolve in the target store.
    for (field, value) in source_ops.syncable_properties(candidate) {
        if let FieldValue::Reference(guid) = value {
            if !target_store.contains(guid) {
                result.push(issue(
                    candidate,
                    Severity::Critical,
                    "missing_reference",
                    format!(
                        "field '{field}' references {guid}, which does not exist in '{}'",
                        target_store.name()
                    ),
                    Some(field),
                ));
            }
        }
    }

    // Record kinds that must be owned need their owner present first.
    if let Some(owner) = candidate.owner {
        if !target_store.contains(owner) {
            result.push(issue(
                candidate,
                Severity::Critical,
                "missing_owner",
                format!(
                    "owner {owner} does not exist in '{}'",
                    target_store.name()
                ),
                None,
            ));
        }
    }

    // The create operation never deep-copies owned children.
    for (collection, children) in &candidate.children {
        if !children.is_empty() {
            result.push(issue(
                candidate,
                Severity::Warning,
                "children_not_copied",
                format!(
                    "{} owned record(s) in '{collection}' will not be copied",
                    children.len()
                ),
                Some(collection.clone()),
            ));
        }
    }

    // Data-quality notices: informational only, never blocking.
    if source_ops.display_label(candidate).is_none() {
        result.push(issue(
            candidate,
            Severity::Info,
            "data_quality",
            "no display form or name".to_string(),
            None,
        ));
    }
    for (field, value) in &candidate.fields {
        if value.is_empty_text() {
            result.push(issue(
                candidate,
                Severity::Info,
                "data_quality",
                format!("no text in '{field}'"),
                Some(field.clone()),
            ));
        }
    }

    result
}

fn issue(
    candidate: &Record,
    severity: Severity,
    category: &str,
    message: String,
    details: Option<String>,
) -> ValidationIssue {
    ValidationIssue {
        severity,
        category: category.to_string(),
        object_type: candidate.object_type.clone(),
        object_guid: candidate.guid,
        message,
        details,
    }
}
