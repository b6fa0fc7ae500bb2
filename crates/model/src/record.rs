use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Globally unique identity of a record, preserved verbatim when a record
/// is copied between stores.
pub type Guid = Uuid;

// ---------------------------------------------------------------------------
// Field values
// ---------------------------------------------------------------------------

/// A syncable property value.
///
/// Excludes owned child collections and store-internal bookkeeping, which
/// are never treated as properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Boolean(bool),
    /// Reference to a record of another type. Must resolve in the target
    /// store before the owning record may be created there.
    Reference(Guid),
    /// Writing-system tag → text.
    MultiText(BTreeMap<String, String>),
}

impl FieldValue {
    /// Short single-line rendering for change details.
    pub fn summary(&self) -> String {
        match self {
            Self::Text(s) => s.clone(),
            Self::Integer(n) => n.to_string(),
            Self::Boolean(b) => b.to_string(),
            Self::Reference(guid) => format!("-> {guid}"),
            Self::MultiText(map) => match map.iter().next() {
                Some((ws, text)) if map.len() == 1 => format!("{text} [{ws}]"),
                Some((ws, text)) => format!("{text} [{ws}, +{} more]", map.len() - 1),
                None => String::new(),
            },
        }
    }

    /// True for a text-bearing value with no text in any writing system.
    pub fn is_empty_text(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::MultiText(map) => map.values().all(|t| t.is_empty()),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// An opaque domain record of a given object type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub guid: Guid,
    pub object_type: String,
    /// Syncable properties by name.
    pub fields: BTreeMap<String, FieldValue>,
    /// Owning record, for kinds that must belong to another record
    /// (e.g. a form belonging to an entry).
    #[serde(default)]
    pub owner: Option<Guid>,
    /// Owned child collections by collection name. Never copied between
    /// stores by the reconciliation core.
    #[serde(default)]
    pub children: BTreeMap<String, Vec<Guid>>,
    #[serde(default)]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub date_modified: Option<DateTime<Utc>>,
}

impl Record {
    pub fn new(object_type: &str) -> Self {
        Self::with_guid(Guid::new_v4(), object_type)
    }

    pub fn with_guid(guid: Guid, object_type: &str) -> Self {
        Self {
            guid,
            object_type: object_type.to_string(),
            fields: BTreeMap::new(),
            owner: None,
            children: BTreeMap::new(),
            date_created: None,
            date_modified: None,
        }
    }

    pub fn field(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn text(self, name: &str, value: &str) -> Self {
        self.field(name, FieldValue::Text(value.to_string()))
    }

    pub fn multi_text<'a, I>(self, name: &str, texts: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let map = texts
            .into_iter()
            .map(|(ws, t)| (ws.to_string(), t.to_string()))
            .collect();
        self.field(name, FieldValue::MultiText(map))
    }

    pub fn reference(self, name: &str, guid: Guid) -> Self {
        self.field(name, FieldValue::Reference(guid))
    }

    pub fn owned_by(mut self, owner: Guid) -> Self {
        self.owner = Some(owner);
        self
    }

    pub fn child(mut self, collection: &str, guid: Guid) -> Self {
        self.children.entry(collection.to_string()).or_default().push(guid);
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.date_created = Some(at);
        self
    }

    pub fn modified_at(mut self, at: DateTime<Utc>) -> Self {
        self.date_modified = Some(at);
        self
    }

    /// Best human-readable label: a "form" field, then a "name" field.
    /// None when the record exposes neither.
    pub fn display_label(&self) -> Option<String> {
        for key in ["form", "name"] {
            let text = match self.fields.get(key) {
                Some(FieldValue::Text(s)) => s.clone(),
                Some(FieldValue::MultiText(map)) => map
                    .values()
                    .find(|t| !t.is_empty())
                    .cloned()
                    .unwrap_or_default(),
                Some(other) => other.summary(),
                None => continue,
            };
            if !text.is_empty() {
                return Some(text);
            }
        }
        None
    }

    /// Reference-typed fields as (field name, referenced GUID).
    pub fn references(&self) -> impl Iterator<Item = (&str, Guid)> {
        self.fields.iter().filter_map(|(name, value)| match value {
            FieldValue::Reference(guid) => Some((name.as_str(), *guid)),
            _ => None,
        })
    }

    pub fn has_children(&self) -> bool {
        self.children.values().any(|c| !c.is_empty())
    }
}

/// First 8 hex digits of a GUID, for labels and log lines.
pub fn short_guid(guid: Guid) -> String {
    let mut s = guid.to_string();
    s.truncate(8);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_label_prefers_form_over_name() {
        let record = Record::new("lexical_entry")
            .text("form", "perro")
            .text("name", "dog entry");
        assert_eq!(record.display_label().as_deref(), Some("perro"));
    }

    #[test]
    fn display_label_falls_back_to_name() {
        let record = Record::new("category").text("name", "Noun");
        assert_eq!(record.display_label().as_deref(), Some("Noun"));
    }

    #[test]
    fn display_label_none_without_form_or_name() {
        let record = Record::new("phoneme").text("symbol", "p");
        assert_eq!(record.display_label(), None);
    }

    #[test]
    fn display_label_uses_first_nonempty_writing_system() {
        let record = Record::new("lexical_entry").multi_text("form", [("en", ""), ("es", "gato")]);
        assert_eq!(record.display_label().as_deref(), Some("gato"));
    }

    #[test]
    fn references_lists_reference_fields_only() {
        let pos = Guid::new_v4();
        let record = Record::new("lexical_entry")
            .text("form", "run")
            .reference("part_of_speech", pos);
        let refs: Vec<_> = record.references().collect();
        assert_eq!(refs, vec![("part_of_speech", pos)]);
    }

    #[test]
    fn multitext_summary_counts_extra_writing_systems() {
        let value = FieldValue::MultiText(
            [("en".to_string(), "dog".to_string()), ("es".to_string(), "perro".to_string())]
                .into_iter()
                .collect(),
        );
        assert_eq!(value.summary(), "dog [en, +1 more]");
    }

    #[test]
    fn empty_multitext_is_empty_text() {
        let value = FieldValue::MultiText(
            [("en".to_string(), String::new())].into_iter().collect(),
        );
        assert!(value.is_empty_text());
        assert!(!FieldValue::Integer(0).is_empty_text());
    }

    #[test]
    fn short_guid_is_eight_chars() {
        assert_eq!(short_guid(Guid::new_v4()).len(), 8);
    }
}
