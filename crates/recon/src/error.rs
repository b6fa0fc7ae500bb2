use std::fmt;

use lexsync_model::Guid;

use crate::model::ValidationResult;

#[derive(Debug)]
pub enum EngineError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Plan validation error (empty object type list, bad strategy shape).
    ConfigValidation(String),
    /// Unknown name in a strategy/resolver/provider registry lookup.
    UnknownName { kind: &'static str, name: String },
    /// Duplicate registration in a registry.
    DuplicateName { kind: &'static str, name: String },
    /// sync()/import against a store that is not writable.
    ReadOnlyTarget(String),
    /// Two target records share one GUID — a data-integrity fault.
    DuplicateTargetGuid { object_type: String, guid: Guid },
    /// Two target records share one match-key tuple; the match is
    /// ambiguous and is never resolved to the first hit.
    AmbiguousMatchKey { object_type: String, key: String },
    /// A reference field whose GUID does not resolve in the target store.
    UnresolvedReference { field: String, guid: Guid },
    /// Resolver registered but not usable in this mode (manual, field_merge).
    ResolverUnsupported { name: &'static str, reason: String },
    /// Batched pre-create validation found critical issues; carries every
    /// finding so the caller can inspect all offending records at once.
    Validation(ValidationResult),
    /// Scan aborted from inside the progress callback.
    Aborted(String),
    /// Store-level failure outside the per-record fail-soft path.
    Store(String),
    /// Report export to an unrecognized file extension.
    UnsupportedFormat(String),
    /// IO error (report write, etc.).
    Io(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::UnknownName { kind, name } => write!(f, "unknown {kind}: '{name}'"),
            Self::DuplicateName { kind, name } => {
                write!(f, "{kind} '{name}' is already registered")
            }
            Self::ReadOnlyTarget(name) => {
                write!(f, "target store '{name}' is not writable; sync requires write mode")
            }
            Self::DuplicateTargetGuid { object_type, guid } => {
                write!(f, "target has two {object_type} records with GUID {guid}")
            }
            Self::AmbiguousMatchKey { object_type, key } => {
                write!(f, "ambiguous match: two target {object_type} records share key [{key}]")
            }
            Self::UnresolvedReference { field, guid } => {
                write!(f, "field '{field}' references {guid}, which does not exist in the target")
            }
            Self::ResolverUnsupported { name, reason } => {
                write!(f, "resolver '{name}' is not supported in this mode: {reason}")
            }
            Self::Validation(result) => {
                write!(f, "validation failed with {} critical issue(s)", result.num_critical())
            }
            Self::Aborted(msg) => write!(f, "aborted: {msg}"),
            Self::Store(msg) => write!(f, "store error: {msg}"),
            Self::UnsupportedFormat(ext) => {
                write!(f, "unsupported report extension '{ext}' (expected .txt, .md, or .json)")
            }
            Self::Io(msg) => write!(f, "IO error: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
