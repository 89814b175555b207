use std::collections::VecDeque;
use std::fmt;

use qualia_core::{CancellationToken, Cancelled};
use qualia_factory::{CallContext, CheckerSet, ConditionContext, Narrowing, RoutineTypes};
use qualia_hir::{Body, ExprId, ExprKind, MethodDecl, MethodId, Program, StmtId, StmtKind};
use qualia_types::{AnnotatedType, TypeStore};
use rayon::prelude::*;

use crate::cfg::{build_cfg, BasicBlock, BlockId, ControlFlowGraph, Terminator};
use crate::config::FlowConfig;
use crate::store::{FlowStore, FlowValue};

/// Shared, read-only inputs of the refinement pass.
#[derive(Clone, Copy)]
pub struct RefinementContext<'a> {
    pub store: &'a TypeStore,
    pub program: &'a Program,
    pub checkers: &'a CheckerSet,
    pub cancel: &'a CancellationToken,
}

impl fmt::Debug for RefinementContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefinementContext")
            .field("checkers", self.checkers)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Result of refining one routine.
#[derive(Debug)]
pub struct Refinement {
    pub method: MethodId,
    pub cfg: ControlFlowGraph,
    /// Indexed by block.
    pub reachable: Vec<bool>,
    expr_types: Vec<Option<AnnotatedType>>,
    /// Blocks visited before the fixed point (or the cap) was reached.
    pub block_visits: usize,
}

impl Refinement {
    /// Flow-refined type of `expr` at its evaluation point. `None` for
    /// unreachable or unresolved expressions.
    #[must_use]
    pub fn expr_type(&self, expr: ExprId) -> Option<&AnnotatedType> {
        self.expr_types.get(expr.idx())?.as_ref()
    }

    #[must_use]
    pub fn is_reachable(&self, block: BlockId) -> bool {
        self.reachable.get(block.index()).copied().unwrap_or(false)
    }

    /// Reachable blocks in source order.
    pub fn reachable_blocks(&self) -> impl Iterator<Item = (BlockId, &BasicBlock)> + '_ {
        self.cfg
            .blocks
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.reachable[*idx])
            .map(|(idx, bb)| (BlockId(idx), bb))
    }
}

/// Refine every routine, in parallel when `config.parallel` is set. Results
/// keep the order of `routines`.
pub fn refine_all(
    ctx: &RefinementContext<'_>,
    routines: &[RoutineTypes],
    config: &FlowConfig,
) -> Result<Vec<Refinement>, Cancelled> {
    if config.parallel {
        routines
            .par_iter()
            .map(|types| refine(ctx, types, config))
            .collect()
    } else {
        routines
            .iter()
            .map(|types| refine(ctx, types, config))
            .collect()
    }
}

/// Intraprocedural refinement of one routine.
pub fn refine(
    ctx: &RefinementContext<'_>,
    types: &RoutineTypes,
    config: &FlowConfig,
) -> Result<Refinement, Cancelled> {
    ctx.cancel.check()?;
    let method = types.method();
    let empty = Body::default();
    let body = ctx.program.method(method).map_or(&empty, |m| &m.body);
    let cfg = build_cfg(body);
    let reachable = cfg.reachable_blocks();

    let analyzer = Analyzer::new(ctx, types, body, &cfg);
    let (in_states, block_visits) = analyzer.fixpoint(config)?;

    // Reachable blocks the worklist never got to (the visit cap tripped) are
    // evaluated against declared types so their sites are still checked.
    let mut expr_types = vec![None; body.expr_count()];
    let unrefined = FlowStore::new();
    let mut unvisited = 0;
    for (idx, state) in in_states.iter().enumerate() {
        let state = match state {
            Some(state) => state,
            None if reachable[idx] => {
                unvisited += 1;
                &unrefined
            }
            None => continue,
        };
        analyzer.transfer_block(BlockId(idx), state, &mut expr_types);
    }
    tracing::debug!(
        target: "qualia.flow",
        method = ?method,
        blocks = cfg.len(),
        block_visits,
        unvisited,
        "refined routine"
    );

    Ok(Refinement {
        method,
        cfg,
        reachable,
        expr_types,
        block_visits,
    })
}

struct Analyzer<'a> {
    ctx: &'a RefinementContext<'a>,
    types: &'a RoutineTypes,
    body: &'a Body,
    cfg: &'a ControlFlowGraph,
    /// Guard narrowings of each block's `If` terminator.
    narrowings: Vec<Vec<Narrowing>>,
}

impl<'a> Analyzer<'a> {
    fn new(
        ctx: &'a RefinementContext<'a>,
        types: &'a RoutineTypes,
        body: &'a Body,
        cfg: &'a ControlFlowGraph,
    ) -> Self {
        let narrowings = cfg
            .blocks
            .iter()
            .map(|bb| match bb.terminator {
                Terminator::If { condition, .. } => {
                    let condition = ConditionContext {
                        store: ctx.store,
                        program: ctx.program,
                        method: types.method(),
                        body,
                        condition,
                    };
                    ctx.checkers
                        .checkers()
                        .flat_map(|checker| checker.narrow_condition(&condition))
                        .collect()
                }
                _ => Vec::new(),
            })
            .collect();
        Self {
            ctx,
            types,
            body,
            cfg,
            narrowings,
        }
    }

    fn tracked_values(&self) -> usize {
        let fields = self
            .body
            .exprs()
            .filter(|(_, e)| matches!(e.kind, ExprKind::Field { .. }))
            .count();
        self.body.locals().len() + fields
    }

    /// Worklist iteration to a fixed point. Returns the entry store of every
    /// visited block.
    fn fixpoint(&self, config: &FlowConfig) -> Result<(Vec<Option<FlowStore>>, usize), Cancelled> {
        let n_blocks = self.cfg.len();
        let cap = config.visit_cap(
            n_blocks,
            self.tracked_values(),
            self.ctx.checkers.hierarchies().max_height(),
        );

        let mut in_states: Vec<Option<FlowStore>> = vec![None; n_blocks];
        let mut out_states: Vec<Option<FlowStore>> = vec![None; n_blocks];
        let mut queued = vec![false; n_blocks];
        let mut scratch = vec![None; self.body.expr_count()];
        let mut worklist = VecDeque::from([self.cfg.entry]);
        queued[self.cfg.entry.index()] = true;
        let mut visits = 0;

        while let Some(bb) = worklist.pop_front() {
            queued[bb.index()] = false;
            self.ctx.cancel.check()?;
            if visits >= cap {
                tracing::warn!(
                    target: "qualia.flow",
                    method = ?self.types.method(),
                    cap,
                    "refinement did not converge within the visit cap; keeping current approximation"
                );
                break;
            }
            visits += 1;

            let new_in = if bb == self.cfg.entry {
                Some(FlowStore::new())
            } else {
                self.join_predecessors(bb, &out_states)
            };
            let Some(new_in) = new_in else { continue };
            tracing::trace!(target: "qualia.flow", block = bb.index(), values = new_in.len(), "visit block");

            let new_out = self.transfer_block(bb, &new_in, &mut scratch);
            in_states[bb.index()] = Some(new_in);
            if out_states[bb.index()].as_ref() != Some(&new_out) {
                out_states[bb.index()] = Some(new_out);
                for succ in self.cfg.successors(bb) {
                    if !queued[succ.index()] {
                        queued[succ.index()] = true;
                        worklist.push_back(succ);
                    }
                }
            }
        }

        Ok((in_states, visits))
    }

    fn join_predecessors(&self, bb: BlockId, out_states: &[Option<FlowStore>]) -> Option<FlowStore> {
        let set = self.ctx.checkers.hierarchies();
        let mut joined: Option<FlowStore> = None;
        for pred in self.cfg.predecessors(bb) {
            let Some(out) = &out_states[pred.index()] else {
                continue;
            };
            let edge = self.edge_state(*pred, bb, out);
            joined = Some(match joined {
                None => edge,
                Some(acc) => acc.join(&edge, set),
            });
        }
        joined
    }

    /// Apply guard narrowing on the `pred -> succ` edge.
    fn edge_state(&self, pred: BlockId, succ: BlockId, out: &FlowStore) -> FlowStore {
        let mut state = out.clone();
        let Terminator::If {
            then_target,
            else_target,
            ..
        } = self.cfg.block(pred).terminator
        else {
            return state;
        };
        let branch = if succ == then_target {
            true
        } else if succ == else_target {
            false
        } else {
            return state;
        };

        let set = self.ctx.checkers.hierarchies();
        for narrowing in &self.narrowings[pred.index()] {
            let q = if branch {
                narrowing.when_true
            } else {
                narrowing.when_false
            };
            let Some((q, hierarchy)) = q.and_then(|q| {
                set.get(q.hierarchy())
                    .filter(|h| h.contains(q))
                    .map(|h| (q, h))
            }) else {
                continue;
            };
            let Some(value) = self.tracked(narrowing.target) else {
                continue;
            };
            let base = state
                .get(value)
                .cloned()
                .or_else(|| self.declared(value).cloned());
            if let Some(base) = base {
                // A guard only ever narrows what is already known.
                let narrowed = match base.qualifier(hierarchy.id()) {
                    Some(current) => hierarchy.greatest_lower_bound(current, q),
                    None => q,
                };
                state.insert(value, base.with_qualifier(narrowed));
            }
        }
        state
    }

    fn transfer_block(
        &self,
        bb: BlockId,
        in_state: &FlowStore,
        out: &mut [Option<AnnotatedType>],
    ) -> FlowStore {
        let mut state = in_state.clone();
        let block = self.cfg.block(bb);
        for stmt in &block.stmts {
            self.transfer_stmt(*stmt, &mut state, out);
        }
        match block.terminator {
            Terminator::If { condition, .. } => {
                self.eval(condition, &mut state, out);
            }
            Terminator::Return {
                value: Some(value), ..
            } => {
                self.eval(value, &mut state, out);
            }
            Terminator::Throw { exception, .. } => {
                self.eval(exception, &mut state, out);
            }
            Terminator::Return { value: None, .. } | Terminator::Goto { .. } | Terminator::Exit => {}
        }
        state
    }

    fn transfer_stmt(&self, stmt: StmtId, state: &mut FlowStore, out: &mut [Option<AnnotatedType>]) {
        match &self.body.stmt(stmt).kind {
            StmtKind::Let { local, initializer } => {
                let target = FlowValue::Local(*local);
                match initializer {
                    Some(init) => {
                        let value = self.eval(*init, state, out);
                        self.assign(target, value, state);
                    }
                    None => state.remove(target),
                }
            }
            StmtKind::Assign { target, value } => {
                match &self.body.expr(*target).kind {
                    ExprKind::Field {
                        receiver: Some(receiver),
                        ..
                    } => {
                        self.eval(*receiver, state, out);
                    }
                    ExprKind::ArrayAccess { array, index } => {
                        self.eval(*array, state, out);
                        self.eval(*index, state, out);
                    }
                    _ => {}
                }
                let value = self.eval(*value, state, out);
                if let Some(slot) = out.get_mut(target.idx()) {
                    *slot = self.types.expr(*target).cloned();
                }
                match (self.tracked(*target), &self.body.expr(*target).kind) {
                    (Some(tracked), _) => self.assign(tracked, value, state),
                    // A write through another receiver may alias `this`.
                    (None, ExprKind::Field { field, .. }) => state.remove(FlowValue::Field(*field)),
                    (None, _) => {}
                }
            }
            StmtKind::Expr(expr) => {
                self.eval(*expr, state, out);
            }
            StmtKind::Nop
            | StmtKind::If { .. }
            | StmtKind::While { .. }
            | StmtKind::For { .. }
            | StmtKind::Return(_)
            | StmtKind::Throw(_)
            | StmtKind::Block(_)
            | StmtKind::Break
            | StmtKind::Continue => {}
        }
    }

    /// Refine `target` to the assigned value's qualifiers, hierarchy by
    /// hierarchy, where the value is a subtype of the declared qualifier.
    fn assign(&self, target: FlowValue, value: Option<AnnotatedType>, state: &mut FlowStore) {
        let (Some(declared), Some(value)) = (self.declared(target), value) else {
            state.remove(target);
            return;
        };
        let mut qualifiers = declared.qualifiers().clone();
        for hierarchy in self.ctx.checkers.hierarchies().iter() {
            let id = hierarchy.id();
            if let (Some(d), Some(v)) = (declared.qualifier(id), value.qualifier(id)) {
                if hierarchy.is_subtype(v, d) {
                    qualifiers.insert(id, v);
                }
            }
        }
        state.insert(target, declared.with_qualifiers(qualifiers));
    }

    fn declared(&self, value: FlowValue) -> Option<&'a AnnotatedType> {
        match value {
            FlowValue::Local(local) => self.types.local(local),
            FlowValue::Field(field) => self.types.field(field),
        }
    }

    /// The tracked location `expr` reads, if any.
    fn tracked(&self, expr: ExprId) -> Option<FlowValue> {
        match &self.body.get_expr(expr)?.kind {
            ExprKind::Local(local) => Some(FlowValue::Local(*local)),
            ExprKind::Field { receiver, field }
                if receiver.map_or(true, |r| matches!(self.body.expr(r).kind, ExprKind::This)) =>
            {
                Some(FlowValue::Field(*field))
            }
            _ => None,
        }
    }

    fn eval(
        &self,
        expr: ExprId,
        state: &mut FlowStore,
        out: &mut [Option<AnnotatedType>],
    ) -> Option<AnnotatedType> {
        let declared = self.types.expr(expr).cloned();
        let refined = match &self.body.expr(expr).kind {
            ExprKind::Local(_) | ExprKind::Field { receiver: None, .. } => self.read(expr, declared, state),
            ExprKind::Field {
                receiver: Some(receiver),
                ..
            } => {
                self.eval(*receiver, state, out);
                self.read(expr, declared, state)
            }
            ExprKind::Call {
                receiver,
                method,
                args,
            } => {
                let receiver = receiver.and_then(|r| self.eval(r, state, out));
                let args: Vec<_> = args.iter().map(|a| self.eval(*a, state, out)).collect();
                let result = declared.map(|d| self.call_result(*method, d, receiver.as_ref(), &args));
                let pure = self
                    .ctx
                    .program
                    .method(*method)
                    .is_some_and(MethodDecl::is_side_effect_free);
                if !pure {
                    state.clear_fields();
                }
                result
            }
            ExprKind::New { args, .. } => {
                for arg in args {
                    self.eval(*arg, state, out);
                }
                declared
            }
            ExprKind::Cast { ty, expr: operand } => {
                let operand = self.eval(*operand, state, out);
                match (declared, operand) {
                    (Some(cast), Some(operand)) => {
                        let mut qualifiers = cast.qualifiers().clone();
                        for id in self.ctx.checkers.hierarchies().ids() {
                            let written = ty.qualifiers.iter().any(|q| q.hierarchy() == id);
                            if let (false, Some(q)) = (written, operand.qualifier(id)) {
                                qualifiers.insert(id, q);
                            }
                        }
                        Some(cast.with_qualifiers(qualifiers))
                    }
                    (cast, _) => cast,
                }
            }
            ExprKind::ArrayAccess { array, index } => {
                self.eval(*array, state, out);
                self.eval(*index, state, out);
                declared
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                self.eval(*lhs, state, out);
                self.eval(*rhs, state, out);
                declared
            }
            ExprKind::Unary { expr: operand, .. } => {
                self.eval(*operand, state, out);
                declared
            }
            ExprKind::Literal(_) | ExprKind::This | ExprKind::Invalid => declared,
        };
        if let Some(slot) = out.get_mut(expr.idx()) {
            slot.clone_from(&refined);
        }
        refined
    }

    fn read(&self, expr: ExprId, declared: Option<AnnotatedType>, state: &FlowStore) -> Option<AnnotatedType> {
        match self.tracked(expr) {
            Some(value) => state.get(value).cloned().or(declared),
            None => declared,
        }
    }

    fn call_result(
        &self,
        callee: MethodId,
        declared: AnnotatedType,
        receiver: Option<&AnnotatedType>,
        args: &[Option<AnnotatedType>],
    ) -> AnnotatedType {
        let Some(decl) = self.ctx.program.method(callee) else {
            return declared;
        };
        let Some(args) = args.iter().cloned().collect::<Option<Vec<_>>>() else {
            return declared;
        };
        let call = CallContext {
            store: self.ctx.store,
            callee,
            decl,
            declared: &declared,
            receiver,
            args: &args,
        };
        let mut qualifiers = declared.qualifiers().clone();
        for hierarchy in self.ctx.checkers.hierarchies().iter() {
            let Some(checker) = self.ctx.checkers.owner_of(hierarchy.id()) else {
                continue;
            };
            if let Some(q) = checker
                .refine_call_result(hierarchy, &call)
                .filter(|q| hierarchy.contains(*q))
            {
                qualifiers.insert(hierarchy.id(), q);
            }
        }
        declared.with_qualifiers(qualifiers)
    }
}
