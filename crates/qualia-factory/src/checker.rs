use std::fmt;
use std::sync::Arc;

use qualia_hierarchy::{HierarchyId, HierarchySet, MalformedHierarchy, Qualifier, QualifierHierarchy};
use qualia_hir::{Body, ExprId, MethodDecl, MethodId, Program};
use qualia_types::{
    AnnotatedType, ArrayCovariance, DefaultPrecedence, DefaultingRules, LiteralKind, TypeAnnotator,
    TypeStore,
};
use serde::{Deserialize, Serialize};

/// Per-checker policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CheckerOptions {
    pub array_covariance: ArrayCovariance,
    pub default_precedence: DefaultPrecedence,
}

/// A branch condition being evaluated for guard narrowing.
#[derive(Clone, Copy)]
pub struct ConditionContext<'a> {
    pub store: &'a TypeStore,
    pub program: &'a Program,
    pub method: MethodId,
    pub body: &'a Body,
    pub condition: ExprId,
}

impl fmt::Debug for ConditionContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionContext")
            .field("method", &self.method)
            .field("condition", &self.condition)
            .finish()
    }
}

/// Qualifier a branch condition establishes for one tracked expression.
///
/// `target` is a local or field read inside the condition. `None` on a side
/// leaves that edge untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Narrowing {
    pub target: ExprId,
    pub when_true: Option<Qualifier>,
    pub when_false: Option<Qualifier>,
}

impl Narrowing {
    /// The same narrowing with its branches swapped, for `!cond`.
    #[must_use]
    pub fn negate(self) -> Self {
        Self {
            target: self.target,
            when_true: self.when_false,
            when_false: self.when_true,
        }
    }
}

/// A call whose result qualifier a plug-in may compute from its operands.
pub struct CallContext<'a> {
    pub store: &'a TypeStore,
    pub callee: MethodId,
    pub decl: &'a MethodDecl,
    /// Declared (annotated) return type of the callee.
    pub declared: &'a AnnotatedType,
    pub receiver: Option<&'a AnnotatedType>,
    /// Refined argument types at the call.
    pub args: &'a [AnnotatedType],
}

impl fmt::Debug for CallContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("callee", &self.callee)
            .field("name", &self.decl.name)
            .field("args", &self.args.len())
            .finish()
    }
}

/// Transfer-function hooks of the dataflow refinement pass.
pub trait RefinementHooks: Send + Sync {
    fn narrow_condition(&self, ctx: &ConditionContext<'_>) -> Vec<Narrowing> {
        let _ = ctx;
        Vec::new()
    }

    /// Result qualifier of a qualifier-polymorphic call in `hierarchy`.
    fn refine_call_result(
        &self,
        hierarchy: &QualifierHierarchy,
        ctx: &CallContext<'_>,
    ) -> Option<Qualifier> {
        let _ = (hierarchy, ctx);
        None
    }
}

/// A checker plug-in: its hierarchies plus the rules and hooks the engine
/// calls into.
pub trait QualifierChecker: DefaultingRules + RefinementHooks + Send + Sync {
    fn name(&self) -> &str;

    fn hierarchies(&self) -> Vec<Arc<QualifierHierarchy>>;

    fn options(&self) -> CheckerOptions {
        CheckerOptions::default()
    }

    /// Qualifier of a literal, before any defaulting.
    fn literal_qualifier(&self, hierarchy: &QualifierHierarchy, literal: LiteralKind) -> Option<Qualifier> {
        let _ = (hierarchy, literal);
        None
    }
}

struct Registered {
    checker: Arc<dyn QualifierChecker>,
    options: CheckerOptions,
    hierarchies: Vec<HierarchyId>,
}

/// The plug-ins active for one run, composed over disjoint hierarchies.
pub struct CheckerSet {
    checkers: Vec<Registered>,
    hierarchies: HierarchySet,
    annotator: TypeAnnotator,
}

impl CheckerSet {
    /// Compose `checkers` using each plug-in's own options.
    pub fn new(checkers: Vec<Arc<dyn QualifierChecker>>) -> Result<Self, MalformedHierarchy> {
        Self::with_options(checkers.into_iter().map(|c| {
            let options = c.options();
            (c, options)
        }))
    }

    /// Compose `checkers`, overriding their options.
    pub fn with_options(
        checkers: impl IntoIterator<Item = (Arc<dyn QualifierChecker>, CheckerOptions)>,
    ) -> Result<Self, MalformedHierarchy> {
        let mut set = CheckerSet {
            checkers: Vec::new(),
            hierarchies: HierarchySet::default(),
            annotator: TypeAnnotator::new(),
        };
        for (checker, options) in checkers {
            let mut ids = Vec::new();
            for hierarchy in checker.hierarchies() {
                set.hierarchies.insert(hierarchy.clone())?;
                let rules: Arc<dyn DefaultingRules> = checker.clone();
                set.annotator
                    .register(hierarchy.clone(), rules, options.default_precedence);
                ids.push(hierarchy.id());
            }
            tracing::debug!(
                target: "qualia.factory",
                checker = checker.name(),
                hierarchies = ids.len(),
                "registered checker"
            );
            set.checkers.push(Registered {
                checker,
                options,
                hierarchies: ids,
            });
        }
        Ok(set)
    }

    #[must_use]
    pub fn hierarchies(&self) -> &HierarchySet {
        &self.hierarchies
    }

    #[must_use]
    pub fn annotator(&self) -> &TypeAnnotator {
        &self.annotator
    }

    pub fn checkers(&self) -> impl Iterator<Item = &dyn QualifierChecker> + '_ {
        self.checkers.iter().map(|r| r.checker.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.checkers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkers.is_empty()
    }

    fn registered(&self, hierarchy: HierarchyId) -> Option<&Registered> {
        self.checkers
            .iter()
            .find(|r| r.hierarchies.contains(&hierarchy))
    }

    /// The plug-in owning `hierarchy`.
    #[must_use]
    pub fn owner_of(&self, hierarchy: HierarchyId) -> Option<&dyn QualifierChecker> {
        self.registered(hierarchy).map(|r| r.checker.as_ref())
    }

    /// Effective options for `hierarchy`.
    #[must_use]
    pub fn options_for(&self, hierarchy: HierarchyId) -> CheckerOptions {
        self.registered(hierarchy)
            .map(|r| r.options)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn literal_qualifier(&self, hierarchy: &QualifierHierarchy, literal: LiteralKind) -> Option<Qualifier> {
        self.owner_of(hierarchy.id())?
            .literal_qualifier(hierarchy, literal)
            .filter(|q| hierarchy.contains(*q))
    }
}

impl fmt::Debug for CheckerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckerSet")
            .field(
                "checkers",
                &self.checkers.iter().map(|r| r.checker.name()).collect::<Vec<_>>(),
            )
            .field("hierarchies", &self.hierarchies.len())
            .finish()
    }
}
