use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::EngineError;

/// Validated name-keyed registry for strategies, resolvers, and providers.
/// Duplicate registration and unknown lookup both raise; there is no
/// silent default.
pub struct Registry<T: ?Sized> {
    kind: &'static str,
    entries: BTreeMap<String, Arc<T>>,
}

impl<T: ?Sized> Registry<T> {
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: BTreeMap::new(),
        }
    }

    /// Startup registration of a built-in under a distinct literal name.
    pub(crate) fn seed(&mut self, name: &str, entry: Arc<T>) {
        self.entries.insert(name.to_string(), entry);
    }

    pub fn register(&mut self, name: &str, entry: Arc<T>) -> Result<(), EngineError> {
        if self.entries.contains_key(name) {
            return Err(EngineError::DuplicateName {
                kind: self.kind,
                name: name.to_string(),
            });
        }
        self.entries.insert(name.to_string(), entry);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<Arc<T>, EngineError> {
        self.entries.get(name).cloned().ok_or_else(|| EngineError::UnknownName {
            kind: self.kind,
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    #[test]
    fn unknown_lookup_is_a_hard_error() {
        let registry: Registry<str> = Registry::new("match strategy");
        let err = registry.get("nope").unwrap_err();
        assert!(matches!(err, EngineError::UnknownName { kind: "match strategy", .. }));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry: Registry<str> = Registry::new("conflict resolver");
        registry.register("source_wins", Arc::from("a")).unwrap();
        let err = registry.register("source_wins", Arc::from("b")).unwrap_err();
        assert!(matches!(err, EngineError::DuplicateName { .. }));
    }

    #[test]
    fn seeded_entries_are_retrievable() {
        let mut registry: Registry<str> = Registry::new("match strategy");
        registry.seed("guid", Arc::from("g"));
        assert!(registry.contains("guid"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["guid"]);
    }
}
