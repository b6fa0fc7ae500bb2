use std::collections::BTreeMap;

use lexsync_model::{FieldValue, Record, RecordStore, SyncableOps};

use crate::error::EngineError;

/// Copy the provider's syncable property set, re-resolving every
/// reference-typed value against the target store. A reference that does
/// not resolve is a hard error, never silently dropped.
fn copy_properties(
    source: &Record,
    source_ops: &dyn SyncableOps,
    target_store: &dyn RecordStore,
) -> Result<BTreeMap<String, FieldValue>, EngineError> {
    let properties = source_ops.syncable_properties(source);
    for (field, value) in &properties {
        if let FieldValue::Reference(guid) = value {
            if !target_store.contains(*guid) {
                return Err(EngineError::UnresolvedReference {
                    field: field.clone(),
                    guid: *guid,
                });
            }
        }
    }
    Ok(properties)
}

/// Materialize a source record in the target store under the same GUID.
/// Owned children are never copied, and timestamps are left to the target
/// store's own defaults; the returned record reflects them.
pub(crate) fn create_object(
    target_store: &mut dyn RecordStore,
    source: &Record,
    source_ops: &dyn SyncableOps,
) -> Result<Record, EngineError> {
    let mut record = Record::with_guid(source.guid, &source.object_type);
    record.fields = copy_properties(source, source_ops, target_store)?;

    if let Some(owner) = source.owner {
        if !target_store.contains(owner) {
            return Err(EngineError::UnresolvedReference {
                field: "owner".to_string(),
                guid: owner,
            });
        }
        record.owner = Some(owner);
    }

    let guid = target_store
        .create(record.clone())
        .map_err(|e| EngineError::Store(e.to_string()))?;
    Ok(target_store.get(guid).unwrap_or(record))
}

/// Overwrite the target record's syncable properties with the source's.
/// Returns whether the store reported an actual change.
pub(crate) fn update_object(
    target_store: &mut dyn RecordStore,
    target: &Record,
    source: &Record,
    source_ops: &dyn SyncableOps,
) -> Result<bool, EngineError> {
    let mut updated = target.clone();
    updated.fields = copy_properties(source, source_ops, target_store)?;
    target_store
        .update(updated)
        .map_err(|e| EngineError::Store(e.to_string()))
}
