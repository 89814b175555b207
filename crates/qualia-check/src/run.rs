use std::collections::HashMap;
use std::sync::Arc;

use qualia_core::{CancellationToken, Cancelled, DiagnosticSink};
use qualia_factory::{AnnotatedTypeFactory, CacheStats, CheckerSet, QualifierChecker, RunCache};
use qualia_flow::{refine_all, FlowConfig, RefinementContext};
use qualia_hierarchy::MalformedHierarchy;
use qualia_hir::Program;
use qualia_types::TypeStore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::checker::SubtypeChecker;
use crate::report::DiagnosticReporter;
use crate::violation::Violation;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("checking run was cancelled")]
    Cancelled,
    #[error(transparent)]
    Hierarchy(#[from] MalformedHierarchy),
}

impl From<Cancelled> for RunError {
    fn from(_: Cancelled) -> Self {
        RunError::Cancelled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOptions {
    pub flow: FlowConfig,
    /// Report casts whose operand does not fit the cast type (as warnings).
    pub report_unsafe_casts: bool,
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self {
            flow: FlowConfig::default(),
            report_unsafe_casts: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunStats {
    /// Routines refined and checked.
    pub routines: usize,
    /// Routines whose declared types could not be resolved.
    pub skipped_routines: usize,
    pub block_visits: usize,
    pub cache: CacheStats,
}

#[derive(Debug)]
pub struct CheckOutcome {
    /// In program order: methods by id, each one's override checks first.
    pub violations: Vec<Violation>,
    pub stats: RunStats,
}

/// One checking run over a resolved program.
///
/// Every call to [`CheckRun::run`] uses a fresh cache, so repeated runs over
/// the same inputs produce identical outcomes.
pub struct CheckRun<'a> {
    store: &'a TypeStore,
    program: &'a Program,
    checkers: CheckerSet,
    options: CheckOptions,
    cancel: CancellationToken,
}

impl<'a> CheckRun<'a> {
    pub fn new(store: &'a TypeStore, program: &'a Program, checkers: CheckerSet, options: CheckOptions) -> Self {
        Self {
            store,
            program,
            checkers,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Compose `plugins` and set up a run. Fails before any checking when the
    /// plug-ins' hierarchies clash.
    pub fn with_plugins(
        store: &'a TypeStore,
        program: &'a Program,
        plugins: Vec<Arc<dyn QualifierChecker>>,
        options: CheckOptions,
    ) -> Result<Self, RunError> {
        let checkers = CheckerSet::new(plugins)?;
        Ok(Self::new(store, program, checkers, options))
    }

    #[must_use]
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this run from another thread.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    #[must_use]
    pub fn checkers(&self) -> &CheckerSet {
        &self.checkers
    }

    pub fn run(&self) -> Result<CheckOutcome, RunError> {
        tracing::debug!(
            target: "qualia.check",
            checkers = ?self.checkers,
            methods = self.program.methods().len(),
            "starting checking run"
        );
        let factory = AnnotatedTypeFactory::new(self.store, self.program, &self.checkers);
        let mut cache = RunCache::new();
        let mut stats = RunStats::default();

        let mut routines = Vec::new();
        for (id, decl) in self.program.methods() {
            self.cancel.check()?;
            if decl.body.root().is_none() {
                continue;
            }
            match factory.routine_types(&mut cache, id) {
                Ok(types) => routines.push(types),
                Err(err) => {
                    tracing::debug!(target: "qualia.check", method = ?id, %err, "skipping routine");
                    stats.skipped_routines += 1;
                }
            }
        }

        let ctx = RefinementContext {
            store: self.store,
            program: self.program,
            checkers: &self.checkers,
            cancel: &self.cancel,
        };
        let refinements = refine_all(&ctx, &routines, &self.options.flow)?;
        stats.routines = refinements.len();
        stats.block_visits = refinements.iter().map(|r| r.block_visits).sum();
        let by_method: HashMap<_, _> = refinements.iter().map(|r| (r.method, r)).collect();

        let checker = SubtypeChecker::new(&factory).report_unsafe_casts(self.options.report_unsafe_casts);
        let mut violations = Vec::new();
        for (id, _) in self.program.methods() {
            self.cancel.check()?;
            violations.extend(checker.check_overrides(&mut cache, id));
            if let Some(refinement) = by_method.get(&id) {
                violations.extend(checker.check_routine(&mut cache, refinement));
            }
        }

        stats.cache = cache.stats();
        tracing::debug!(
            target: "qualia.check",
            violations = violations.len(),
            routines = stats.routines,
            cache_hits = stats.cache.hits,
            cache_misses = stats.cache.misses,
            "checking run finished"
        );
        Ok(CheckOutcome { violations, stats })
    }

    /// Render `outcome`'s violations into `sink`.
    pub fn emit(&self, outcome: &CheckOutcome, sink: &mut dyn DiagnosticSink) {
        let mut reporter = DiagnosticReporter::new(self.store, self.checkers.hierarchies());
        reporter.extend(outcome.violations.iter().cloned());
        reporter.emit(sink);
    }
}
