use qualia_core::{Diagnostic, DiagnosticSink};
use qualia_hierarchy::HierarchySet;
use qualia_types::TypeStore;

use crate::violation::Violation;

/// Collects violations in the order they were found and renders them as
/// diagnostics.
#[derive(Debug)]
pub struct DiagnosticReporter<'a> {
    store: &'a TypeStore,
    hierarchies: &'a HierarchySet,
    violations: Vec<Violation>,
}

impl<'a> DiagnosticReporter<'a> {
    #[must_use]
    pub fn new(store: &'a TypeStore, hierarchies: &'a HierarchySet) -> Self {
        Self {
            store,
            hierarchies,
            violations: Vec::new(),
        }
    }

    pub fn report(&mut self, violation: Violation) {
        self.violations.push(violation);
    }

    pub fn extend(&mut self, violations: impl IntoIterator<Item = Violation>) {
        self.violations.extend(violations);
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    #[must_use]
    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }

    /// `<what>: found `<found>`, required `<expected>` (<hierarchy>)`
    #[must_use]
    pub fn to_diagnostic(&self, violation: &Violation) -> Diagnostic {
        let hierarchy = self
            .hierarchies
            .get(violation.hierarchy)
            .map_or("unknown", |h| h.name());
        let message = format!(
            "{}: found `{}`, required `{}` ({})",
            violation.code.describe(),
            violation.found.display(self.store, self.hierarchies),
            violation.expected.display(self.store, self.hierarchies),
            hierarchy,
        );
        Diagnostic {
            severity: violation.code.severity(),
            code: violation.code.code(),
            message,
            span: Some(violation.span),
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.violations
            .iter()
            .map(|v| self.to_diagnostic(v))
            .collect()
    }

    /// Push every collected violation into `sink`, in order.
    pub fn emit(&self, sink: &mut dyn DiagnosticSink) {
        for violation in &self.violations {
            sink.emit(self.to_diagnostic(violation));
        }
    }
}
