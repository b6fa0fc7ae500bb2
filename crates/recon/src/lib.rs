//! `lexsync-recon` — cross-project reconciliation core.
//!
//! Compares a source and a target record store, classifies every record
//! of a selected object type into a change type, and applies or reports
//! the minimal set of changes needed to bring the target up to date.
//! Single-threaded and fully synchronous; blocking occurs only at the
//! store boundary.

pub mod config;
pub mod diff;
pub mod engine;
pub mod error;
pub mod matcher;
pub mod model;
pub mod registry;
pub mod report;
pub mod resolve;
pub mod validate;

mod import;
mod merge;

pub use config::{PlanStrategy, ReportOutput, SyncPlan};
pub use diff::{compare, FilterFn, ProgressFn};
pub use engine::{EngineMode, ResolverChoice, StrategyChoice, SyncEngine};
pub use error::EngineError;
pub use matcher::{FieldMatchStrategy, GuidMatchStrategy, MatchIndex, MatchKey, MatchStrategy};
pub use model::{
    Change, ChangeType, DiffResult, Severity, SyncChange, SyncError, SyncOp, SyncResult,
    ValidationIssue, ValidationResult,
};
pub use report::{export, render, ReportFormat};
pub use resolve::{
    ConflictResolver, FieldMergeResolver, ManualResolver, NewestWins, Resolution, SourceWins,
    TargetWins,
};
pub use validate::validate_before_create;
