use serde::Deserialize;

use crate::error::EngineError;

/// Declarative description of a reconciliation run, loaded from TOML.
///
/// ```toml
/// name = "nightly"
/// object_types = ["lexical_entry"]
/// resolver = "newest_wins"
///
/// [strategy]
/// name = "fields"
/// key_fields = ["form"]
///
/// [report]
/// path = "changes.md"
/// verbose = true
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SyncPlan {
    pub name: String,
    pub object_types: Vec<String>,
    #[serde(default)]
    pub strategy: PlanStrategy,
    #[serde(default)]
    pub resolver: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub report: Option<ReportOutput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanStrategy {
    pub name: String,
    #[serde(default)]
    pub key_fields: Option<Vec<String>>,
}

impl Default for PlanStrategy {
    fn default() -> Self {
        Self {
            name: "guid".to_string(),
            key_fields: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReportOutput {
    pub path: String,
    #[serde(default)]
    pub verbose: bool,
}

impl SyncPlan {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))
    }

    /// Shape checks beyond deserialization. Registered-name checks happen
    /// later, at run time, against the engine's registries.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.object_types.is_empty() {
            return Err(EngineError::ConfigValidation(
                "object_types must name at least one object type".to_string(),
            ));
        }

        match (self.strategy.name.as_str(), &self.strategy.key_fields) {
            ("fields", None) => {
                return Err(EngineError::ConfigValidation(
                    "strategy 'fields' requires key_fields".to_string(),
                ));
            }
            ("fields", Some(fields)) if fields.is_empty() => {
                return Err(EngineError::ConfigValidation(
                    "strategy 'fields' requires a non-empty key_fields list".to_string(),
                ));
            }
            (other, Some(_)) if other != "fields" => {
                return Err(EngineError::ConfigValidation(format!(
                    "key_fields is only valid with the 'fields' strategy, not '{other}'"
                )));
            }
            _ => {}
        }

        if let Some(report) = &self.report {
            if self.object_types.len() != 1 {
                return Err(EngineError::ConfigValidation(
                    "a report output requires exactly one object type".to_string(),
                ));
            }
            let known = [".txt", ".md", ".json"];
            if !known.iter().any(|ext| report.path.ends_with(ext)) {
                return Err(EngineError::ConfigValidation(format!(
                    "report path '{}' must end in .txt, .md, or .json",
                    report.path
                )));
            }
        }

        Ok(())
    }
}
