use std::sync::Arc;

use lexsync_model::{GenericOps, RecordStore, SyncableOps};
use tracing::info;

use crate::config::SyncPlan;
use crate::diff::{self, FilterFn, ProgressFn};
use crate::error::EngineError;
use crate::matcher::{FieldMatchStrategy, GuidMatchStrategy, MatchStrategy};
use crate::merge;
use crate::model::{ChangeType, DiffResult, SyncOp, SyncResult};
use crate::registry::Registry;
use crate::report;
use crate::resolve::{
    ConflictResolver, ManualResolver, NewestWins, Resolution, SourceWins, TargetWins,
};

// ---------------------------------------------------------------------------
// Modes and name-or-instance selectors
// ---------------------------------------------------------------------------

/// Whether the engine is allowed to mutate the target store. Derived from
/// the target at construction; `ReadOnly` still permits compare and
/// import dry runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    ReadOnly,
    Write,
}

/// A match strategy selected by registered name or supplied ad hoc.
pub enum StrategyChoice<'a> {
    Named(&'a str),
    Instance(&'a dyn MatchStrategy),
}

impl<'a> From<&'a str> for StrategyChoice<'a> {
    fn from(name: &'a str) -> Self {
        Self::Named(name)
    }
}

/// A conflict resolver selected by registered name or supplied ad hoc.
pub enum ResolverChoice<'a> {
    Named(&'a str),
    Instance(&'a dyn ConflictResolver),
}

impl<'a> From<&'a str> for ResolverChoice<'a> {
    fn from(name: &'a str) -> Self {
        Self::Named(name)
    }
}

/// Either a registry entry or a caller-supplied borrow.
enum Resolved<'a, T: ?Sized> {
    Owned(Arc<T>),
    Borrowed(&'a T),
}

impl<T: ?Sized> Resolved<'_, T> {
    fn as_ref(&self) -> &T {
        match self {
            Self::Owned(arc) => arc,
            Self::Borrowed(entry) => entry,
        }
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Orchestrates compare and sync between one source and one target store.
///
/// The source store is only ever read. All writes go through the target
/// store's create/update operations, one record at a time, with
/// per-record failure isolation.
pub struct SyncEngine<'a> {
    pub(crate) source: &'a dyn RecordStore,
    pub(crate) target: &'a mut dyn RecordStore,
    pub(crate) mode: EngineMode,
    strategies: Registry<dyn MatchStrategy>,
    resolvers: Registry<dyn ConflictResolver>,
    pub(crate) providers: Registry<dyn SyncableOps>,
}

impl<'a> SyncEngine<'a> {
    /// Mode is derived from the target store's own writability report.
    pub fn new(source: &'a dyn RecordStore, target: &'a mut dyn RecordStore) -> Self {
        let mode = if target.is_writable() {
            EngineMode::Write
        } else {
            EngineMode::ReadOnly
        };

        let mut strategies: Registry<dyn MatchStrategy> = Registry::new("match strategy");
        strategies.seed("guid", Arc::new(GuidMatchStrategy));

        let mut resolvers: Registry<dyn ConflictResolver> = Registry::new("conflict resolver");
        resolvers.seed("source_wins", Arc::new(SourceWins));
        resolvers.seed("target_wins", Arc::new(TargetWins));
        resolvers.seed("newest_wins", Arc::new(NewestWins));
        resolvers.seed("manual", Arc::new(ManualResolver));

        Self {
            source,
            target,
            mode,
            strategies,
            resolvers,
            providers: Registry::new("ops provider"),
        }
    }

    /// Force a mode; a writable target can still be held read-only.
    pub fn with_mode(mut self, mode: EngineMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> EngineMode {
        self.mode
    }

    pub fn register_strategy(
        &mut self,
        name: &str,
        strategy: Arc<dyn MatchStrategy>,
    ) -> Result<(), EngineError> {
        self.strategies.register(name, strategy)
    }

    pub fn register_resolver(
        &mut self,
        name: &str,
        resolver: Arc<dyn ConflictResolver>,
    ) -> Result<(), EngineError> {
        self.resolvers.register(name, resolver)
    }

    /// Register a provider under its own object type.
    pub fn register_ops(&mut self, ops: Arc<dyn SyncableOps>) -> Result<(), EngineError> {
        let key = ops.object_type().to_string();
        self.providers.register(&key, ops)
    }

    /// Register the field-wise default provider for an object type.
    pub fn register_default_ops(&mut self, object_type: &str) -> Result<(), EngineError> {
        self.providers
            .register(object_type, Arc::new(GenericOps::new(object_type)))
    }

    fn resolve_strategy<'c>(
        &self,
        choice: Option<StrategyChoice<'c>>,
    ) -> Result<Resolved<'c, dyn MatchStrategy + 'c>, EngineError> {
        match choice {
            None => Ok(Resolved::Owned(self.strategies.get("guid")?)),
            Some(StrategyChoice::Named(name)) => Ok(Resolved::Owned(self.strategies.get(name)?)),
            Some(StrategyChoice::Instance(strategy)) => Ok(Resolved::Borrowed(strategy)),
        }
    }

    fn resolve_resolver<'c>(
        &self,
        choice: Option<ResolverChoice<'c>>,
    ) -> Result<Option<Resolved<'c, dyn ConflictResolver + 'c>>, EngineError> {
        match choice {
            None => Ok(None),
            Some(ResolverChoice::Named(name)) => {
                Ok(Some(Resolved::Owned(self.resolvers.get(name)?)))
            }
            Some(ResolverChoice::Instance(resolver)) => Ok(Some(Resolved::Borrowed(resolver))),
        }
    }

    /// Classify every record of one object type. Never mutates either
    /// store, in any mode.
    pub fn compare(
        &self,
        object_type: &str,
        strategy: Option<StrategyChoice<'_>>,
        filter: Option<&FilterFn<'_>>,
        progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<DiffResult, EngineError> {
        let ops = self.providers.get(object_type)?;
        let strategy = self.resolve_strategy(strategy)?;
        diff::compare(
            object_type,
            ops.as_ref(),
            ops.as_ref(),
            self.source,
            &*self.target,
            strategy.as_ref(),
            filter,
            progress,
        )
    }

    /// Compare, then apply: creates for new records, resolver-gated
    /// updates for modified records. Deletions are reported, never
    /// applied. One failing record is logged into the result and the
    /// batch continues.
    pub fn sync(
        &mut self,
        object_type: &str,
        strategy: Option<StrategyChoice<'_>>,
        resolver: Option<ResolverChoice<'_>>,
        filter: Option<&FilterFn<'_>>,
        dry_run: bool,
        mut progress: Option<&mut ProgressFn<'_>>,
    ) -> Result<SyncResult, EngineError> {
        // Unconditional, dry run included; use compare() to preview
        // against a read-only target.
        if self.mode == EngineMode::ReadOnly {
            return Err(EngineError::ReadOnlyTarget(self.target.name().to_string()));
        }

        // Fail fast on bad names before any store access.
        let ops = self.providers.get(object_type)?;
        let strategy = self.resolve_strategy(strategy)?;
        let resolver = self.resolve_resolver(resolver)?;

        let diff = diff::compare(
            object_type,
            ops.as_ref(),
            ops.as_ref(),
            self.source,
            &*self.target,
            strategy.as_ref(),
            filter,
            progress.as_mut().map(|p| &mut **p),
        )?;

        diff::report(
            &mut progress,
            &format!("applying {} change(s) to '{}'", diff.total(), self.target.name()),
        )?;

        let mut result = SyncResult::new(object_type, dry_run);
        for change in &diff.changes {
            match change.change_type {
                ChangeType::New => {
                    let Some(guid) = change.source_guid else { continue };
                    let Some(record) = self.source.get(guid) else {
                        result.record_error(
                            SyncOp::Create,
                            guid,
                            "source record disappeared during sync".to_string(),
                        );
                        continue;
                    };
                    if dry_run {
                        // Would-be writes are audited but counted as skips.
                        result.record_change(SyncOp::Create, guid, change.description.clone());
                        result.num_skipped += 1;
                        continue;
                    }
                    match merge::create_object(&mut *self.target, &record, ops.as_ref()) {
                        Ok(created) => {
                            result.record_change(
                                SyncOp::Create,
                                created.guid,
                                change.description.clone(),
                            );
                            result.num_created += 1;
                        }
                        Err(e) => result.record_error(SyncOp::Create, guid, e.to_string()),
                    }
                }
                ChangeType::Modified => {
                    let (Some(source_guid), Some(target_guid)) =
                        (change.source_guid, change.target_guid)
                    else {
                        continue;
                    };
                    let Some(resolver) = resolver.as_ref() else {
                        result.num_skipped += 1;
                        continue;
                    };
                    let (Some(source_record), Some(target_record)) =
                        (self.source.get(source_guid), self.target.get(target_guid))
                    else {
                        result.record_error(
                            SyncOp::Update,
                            source_guid,
                            "record disappeared during sync".to_string(),
                        );
                        continue;
                    };

                    // A resolver failure is a configuration fault, not a
                    // per-record one; it aborts the batch.
                    let resolution = resolver.as_ref().resolve(
                        &source_record,
                        &target_record,
                        self.source,
                        &*self.target,
                    )?;
                    match resolution {
                        Resolution::Target => result.num_skipped += 1,
                        Resolution::Source => {
                            if dry_run {
                                result.record_change(
                                    SyncOp::Update,
                                    target_guid,
                                    change.description.clone(),
                                );
                                result.num_skipped += 1;
                                continue;
                            }
                            match merge::update_object(
                                &mut *self.target,
                                &target_record,
                                &source_record,
                                ops.as_ref(),
                            ) {
                                Ok(true) => {
                                    result.record_change(
                                        SyncOp::Update,
                                        target_guid,
                                        change.description.clone(),
                                    );
                                    result.num_updated += 1;
                                }
                                Ok(false) => result.num_skipped += 1,
                                Err(e) => {
                                    result.record_error(SyncOp::Update, target_guid, e.to_string())
                                }
                            }
                        }
                    }
                }
                // Deletions are surfaced in the diff but never applied.
                ChangeType::Deleted => result.num_skipped += 1,
                ChangeType::Conflict | ChangeType::Unchanged => {}
            }
        }

        info!(
            object_type,
            dry_run,
            created = result.num_created,
            updated = result.num_updated,
            skipped = result.num_skipped,
            errors = result.num_errors(),
            "sync complete"
        );
        diff::report(
            &mut progress,
            &format!(
                "sync complete: {} created, {} updated, {} skipped, {} error(s)",
                result.num_created,
                result.num_updated,
                result.num_skipped,
                result.num_errors()
            ),
        )?;
        Ok(result)
    }

    /// Run a declarative plan: one sync per object type, with an optional
    /// diff report exported first.
    pub fn run_plan(&mut self, plan: &SyncPlan) -> Result<Vec<SyncResult>, EngineError> {
        plan.validate()?;
        info!(plan = %plan.name, "running sync plan");

        for object_type in &plan.object_types {
            if !self.providers.contains(object_type) {
                self.register_default_ops(object_type)?;
            }
        }

        let ad_hoc = plan
            .strategy
            .key_fields
            .as_ref()
            .map(|fields| FieldMatchStrategy::new(fields.iter().map(String::as_str)));

        let mut results = Vec::with_capacity(plan.object_types.len());
        for object_type in &plan.object_types {
            let strategy = match &ad_hoc {
                Some(strategy) => StrategyChoice::Instance(strategy),
                None => StrategyChoice::Named(&plan.strategy.name),
            };

            if let Some(output) = &plan.report {
                let diff = self.compare(
                    object_type,
                    Some(match &ad_hoc {
                        Some(strategy) => StrategyChoice::Instance(strategy),
                        None => StrategyChoice::Named(&plan.strategy.name),
                    }),
                    None,
                    None,
                )?;
                report::export(&diff, std::path::Path::new(&output.path), output.verbose)?;
            }

            let resolver = plan.resolver.as_deref().map(ResolverChoice::Named);
            results.push(self.sync(
                object_type,
                Some(strategy),
                resolver,
                None,
                plan.dry_run,
                None,
            )?);
        }
        Ok(results)
    }
}
