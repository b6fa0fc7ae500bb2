use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::record::{FieldValue, Record};
use crate::store::RecordStore;

// ---------------------------------------------------------------------------
// Property deltas
// ---------------------------------------------------------------------------

/// Per-property difference between two records. Multi-writing-system text
/// reduces to a count rather than dumping full text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyDelta {
    Scalar { old: String, new: String },
    MultiText { writing_systems_changed: usize },
}

impl fmt::Display for PropertyDelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar { old, new } => write!(f, "'{old}' -> '{new}'"),
            Self::MultiText { writing_systems_changed } => {
                write!(f, "changed in {writing_systems_changed} writing system(s)")
            }
        }
    }
}

/// Property name → delta, for one matched pair.
pub type PropertyDiffs = BTreeMap<String, PropertyDelta>;

// ---------------------------------------------------------------------------
// Provider capabilities
// ---------------------------------------------------------------------------

/// Base per-object-type accessor capability every collaborator must
/// satisfy to be usable by the reconciliation core.
pub trait SyncableOps {
    fn object_type(&self) -> &str;

    /// Full population snapshot from one store.
    fn get_all(&self, store: &dyn RecordStore) -> Vec<Record>;

    /// The property set used for equality comparison and for copying
    /// during create/update.
    fn syncable_properties(&self, record: &Record) -> BTreeMap<String, FieldValue>;

    /// Best human-readable label, if the type exposes one.
    fn display_label(&self, record: &Record) -> Option<String>;

    /// Optional field-level comparison extension. Providers without it
    /// fall back to the display-label comparison in the diff engine.
    fn comparer(&self) -> Option<&dyn CompareOps> {
        None
    }
}

/// Optional extension group: field-level comparison between two records.
pub trait CompareOps {
    /// Returns whether the records differ, and the per-property deltas
    /// (old = record1's value, new = record2's value).
    fn compare_to(
        &self,
        record1: &Record,
        record2: &Record,
        ops1: &dyn SyncableOps,
        ops2: &dyn SyncableOps,
    ) -> (bool, PropertyDiffs);
}

// ---------------------------------------------------------------------------
// Default provider
// ---------------------------------------------------------------------------

/// Default provider for any object type: every field is syncable and
/// comparison is property-wise over the union of property names.
#[derive(Debug, Clone)]
pub struct GenericOps {
    object_type: String,
}

impl GenericOps {
    pub fn new(object_type: &str) -> Self {
        Self {
            object_type: object_type.to_string(),
        }
    }
}

impl SyncableOps for GenericOps {
    fn object_type(&self) -> &str {
        &self.object_type
    }

    fn get_all(&self, store: &dyn RecordStore) -> Vec<Record> {
        store.get_all(&self.object_type)
    }

    fn syncable_properties(&self, record: &Record) -> BTreeMap<String, FieldValue> {
        record.fields.clone()
    }

    fn display_label(&self, record: &Record) -> Option<String> {
        record.display_label()
    }

    fn comparer(&self) -> Option<&dyn CompareOps> {
        Some(self)
    }
}

impl CompareOps for GenericOps {
    fn compare_to(
        &self,
        record1: &Record,
        record2: &Record,
        ops1: &dyn SyncableOps,
        ops2: &dyn SyncableOps,
    ) -> (bool, PropertyDiffs) {
        diff_properties(
            &ops1.syncable_properties(record1),
            &ops2.syncable_properties(record2),
        )
    }
}

/// Property-wise diff over the union of property names.
pub fn diff_properties(
    old: &BTreeMap<String, FieldValue>,
    new: &BTreeMap<String, FieldValue>,
) -> (bool, PropertyDiffs) {
    let mut diffs = PropertyDiffs::new();

    let names: std::collections::BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    for name in names {
        let old_value = old.get(name);
        let new_value = new.get(name);
        if old_value == new_value {
            continue;
        }

        let delta = match (old_value, new_value) {
            // Multi-writing-system text: count changed writing systems.
            (Some(FieldValue::MultiText(a)), Some(FieldValue::MultiText(b))) => {
                multitext_delta(a, b)
            }
            (Some(FieldValue::MultiText(a)), None) => multitext_delta(a, &BTreeMap::new()),
            (None, Some(FieldValue::MultiText(b))) => multitext_delta(&BTreeMap::new(), b),
            (a, b) => PropertyDelta::Scalar {
                old: a.map(FieldValue::summary).unwrap_or_else(|| "<absent>".to_string()),
                new: b.map(FieldValue::summary).unwrap_or_else(|| "<absent>".to_string()),
            },
        };
        diffs.insert(name.clone(), delta);
    }

    (!diffs.is_empty(), diffs)
}

fn multitext_delta(a: &BTreeMap<String, String>, b: &BTreeMap<String, String>) -> PropertyDelta {
    let tags: std::collections::BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    let changed = tags.into_iter().filter(|ws| a.get(*ws) != b.get(*ws)).count();
    PropertyDelta::MultiText {
        writing_systems_changed: changed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn props(pairs: &[(&str, FieldValue)]) -> BTreeMap<String, FieldValue> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn identical_properties_do_not_differ() {
        let a = props(&[("form", FieldValue::Text("perro".into()))]);
        let (differs, diffs) = diff_properties(&a, &a.clone());
        assert!(!differs);
        assert!(diffs.is_empty());
    }

    #[test]
    fn scalar_change_reports_old_and_new() {
        let a = props(&[("form", FieldValue::Text("perro".into()))]);
        let b = props(&[("form", FieldValue::Text("perra".into()))]);
        let (differs, diffs) = diff_properties(&a, &b);
        assert!(differs);
        assert_eq!(
            diffs.get("form"),
            Some(&PropertyDelta::Scalar {
                old: "perro".into(),
                new: "perra".into()
            })
        );
    }

    #[test]
    fn absent_property_reported_as_absent() {
        let a = props(&[]);
        let b = props(&[("gloss", FieldValue::Text("dog".into()))]);
        let (_, diffs) = diff_properties(&a, &b);
        assert_eq!(
            diffs.get("gloss"),
            Some(&PropertyDelta::Scalar {
                old: "<absent>".into(),
                new: "dog".into()
            })
        );
    }

    #[test]
    fn multitext_change_reduced_to_writing_system_count() {
        let a = props(&[(
            "gloss",
            FieldValue::MultiText(
                [("en".to_string(), "dog".to_string()), ("es".to_string(), "perro".to_string())]
                    .into_iter()
                    .collect(),
            ),
        )]);
        let b = props(&[(
            "gloss",
            FieldValue::MultiText(
                [("en".to_string(), "dog".to_string()), ("es".to_string(), "can".to_string())]
                    .into_iter()
                    .collect(),
            ),
        )]);
        let (differs, diffs) = diff_properties(&a, &b);
        assert!(differs);
        assert_eq!(
            diffs.get("gloss"),
            Some(&PropertyDelta::MultiText {
                writing_systems_changed: 1
            })
        );
        assert_eq!(
            diffs.get("gloss").unwrap().to_string(),
            "changed in 1 writing system(s)"
        );
    }

    #[test]
    fn generic_ops_exposes_comparer() {
        let ops = GenericOps::new("lexical_entry");
        assert!(ops.comparer().is_some());

        let a = Record::new("lexical_entry").text("form", "perro");
        let mut b = a.clone();
        b.fields.insert("form".to_string(), FieldValue::Text("gato".to_string()));
        let comparer = ops.comparer().unwrap();
        let (differs, diffs) = comparer.compare_to(&a, &b, &ops, &ops);
        assert!(differs);
        assert_eq!(diffs.len(), 1);
    }

    #[test]
    fn generic_ops_get_all_scopes_to_object_type() {
        let mut store = MemoryStore::new("src");
        store.insert(Record::new("lexical_entry").text("form", "perro"));
        store.insert(Record::new("category").text("name", "Noun"));
        let ops = GenericOps::new("lexical_entry");
        assert_eq!(ops.get_all(&store).len(), 1);
    }
}
