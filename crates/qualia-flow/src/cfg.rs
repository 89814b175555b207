use qualia_hir::{Body, ExprId, StmtId, StmtKind};

/// Blocks are numbered in source order: a block's index is lower than that of
/// every block holding code written after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub usize);

impl BlockId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    /// Straight-line statements. Branches and jumps live in `terminator`.
    pub stmts: Vec<StmtId>,
    pub terminator: Terminator,
}

impl BasicBlock {
    pub fn successors(&self) -> impl Iterator<Item = BlockId> {
        self.terminator.successors()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Goto {
        target: BlockId,
        /// The `break`, `continue` or loop header that produced the jump.
        from: Option<StmtId>,
    },
    If {
        condition: ExprId,
        then_target: BlockId,
        else_target: BlockId,
        from: StmtId,
    },
    Return {
        value: Option<ExprId>,
        from: StmtId,
    },
    Throw {
        exception: ExprId,
        from: StmtId,
    },
    Exit,
}

impl Terminator {
    pub fn successors(&self) -> impl Iterator<Item = BlockId> {
        let (first, second) = match *self {
            Terminator::Goto { target, .. } => (Some(target), None),
            Terminator::If {
                then_target,
                else_target,
                ..
            } => (Some(then_target), Some(else_target)),
            Terminator::Return { .. } | Terminator::Throw { .. } | Terminator::Exit => (None, None),
        };
        first.into_iter().chain(second)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlFlowGraph {
    pub entry: BlockId,
    pub blocks: Vec<BasicBlock>,
    preds: Vec<Vec<BlockId>>,
}

impl ControlFlowGraph {
    #[must_use]
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    #[must_use]
    pub fn predecessors(&self, id: BlockId) -> &[BlockId] {
        &self.preds[id.index()]
    }

    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = BlockId> {
        self.blocks[id.index()].successors()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Indexed by block.
    #[must_use]
    pub fn reachable_blocks(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.blocks.len()];
        let mut stack = vec![self.entry];
        while let Some(bb) = stack.pop() {
            if std::mem::replace(&mut reachable[bb.index()], true) {
                continue;
            }
            stack.extend(self.successors(bb));
        }
        reachable
    }

    fn from_blocks(entry: BlockId, blocks: Vec<BasicBlock>) -> Self {
        let mut preds = vec![Vec::new(); blocks.len()];
        for (idx, bb) in blocks.iter().enumerate() {
            for succ in bb.successors() {
                preds[succ.index()].push(BlockId(idx));
            }
        }
        Self { entry, blocks, preds }
    }
}

/// Control-flow graph of a method body. A body without statements yields a
/// single empty entry block.
#[must_use]
pub fn build_cfg(body: &Body) -> ControlFlowGraph {
    let mut lowering = Lowering {
        body,
        blocks: Vec::new(),
        loops: Vec::new(),
    };
    let entry = lowering.open();
    if let Some(root) = body.root() {
        let _ = lowering.stmt(root, entry);
    }
    ControlFlowGraph::from_blocks(entry, lowering.blocks)
}

/// A loop whose exit block does not exist yet.
struct OpenLoop {
    continue_target: BlockId,
    breaks: Vec<(BlockId, StmtId)>,
}

/// Lowers statements into blocks. A block is opened only once everything
/// written before it has been lowered, so block indices follow source order;
/// `break` jumps are patched when their loop closes.
struct Lowering<'a> {
    body: &'a Body,
    blocks: Vec<BasicBlock>,
    loops: Vec<OpenLoop>,
}

impl Lowering<'_> {
    fn open(&mut self) -> BlockId {
        self.blocks.push(BasicBlock {
            stmts: Vec::new(),
            terminator: Terminator::Exit,
        });
        BlockId(self.blocks.len() - 1)
    }

    fn terminate(&mut self, bb: BlockId, terminator: Terminator) {
        self.blocks[bb.index()].terminator = terminator;
    }

    fn jump(&mut self, bb: BlockId, target: BlockId, from: Option<StmtId>) {
        self.terminate(bb, Terminator::Goto { target, from });
    }

    /// Lower `stmt` starting in `current`. Returns the block control falls
    /// out of, or `None` when every path jumps away.
    fn stmt(&mut self, stmt: StmtId, current: BlockId) -> Option<BlockId> {
        match &self.body.stmt(stmt).kind {
            StmtKind::Block(stmts) => self.seq(stmts, current),
            StmtKind::Let { .. } | StmtKind::Assign { .. } | StmtKind::Expr(_) | StmtKind::Nop => {
                self.blocks[current.index()].stmts.push(stmt);
                Some(current)
            }
            StmtKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let then_target = self.open();
                let then_end = self.stmt(*then_branch, then_target);
                let else_target = self.open();
                let else_end = match else_branch {
                    Some(branch) => self.stmt(*branch, else_target),
                    None => Some(else_target),
                };
                self.terminate(
                    current,
                    Terminator::If {
                        condition: *condition,
                        then_target,
                        else_target,
                        from: stmt,
                    },
                );
                if then_end.is_none() && else_end.is_none() {
                    return None;
                }
                let join = self.open();
                for end in [then_end, else_end].into_iter().flatten() {
                    self.jump(end, join, None);
                }
                Some(join)
            }
            StmtKind::While { condition, body } => {
                let header = self.open();
                self.jump(current, header, None);
                let body_entry = self.open();
                self.loop_body(*body, body_entry, header, header);
                Some(self.close_loop(header, Some(*condition), body_entry, stmt))
            }
            StmtKind::For {
                init,
                condition,
                update,
                body,
            } => {
                let current = match init {
                    Some(init) => self.stmt(*init, current)?,
                    None => current,
                };
                let header = self.open();
                self.jump(current, header, None);
                let continue_target = match update {
                    Some(update) => {
                        let update_entry = self.open();
                        if let Some(end) = self.stmt(*update, update_entry) {
                            self.jump(end, header, None);
                        }
                        update_entry
                    }
                    None => header,
                };
                let body_entry = self.open();
                self.loop_body(*body, body_entry, continue_target, continue_target);
                Some(self.close_loop(header, *condition, body_entry, stmt))
            }
            StmtKind::Return(value) => {
                self.terminate(
                    current,
                    Terminator::Return {
                        value: *value,
                        from: stmt,
                    },
                );
                None
            }
            StmtKind::Throw(exception) => {
                self.terminate(
                    current,
                    Terminator::Throw {
                        exception: *exception,
                        from: stmt,
                    },
                );
                None
            }
            StmtKind::Break => {
                match self.loops.last_mut() {
                    Some(open) => open.breaks.push((current, stmt)),
                    // Rejected by the host; the path just ends.
                    None => self.terminate(current, Terminator::Exit),
                }
                None
            }
            StmtKind::Continue => {
                match self.loops.last().map(|open| open.continue_target) {
                    Some(target) => self.jump(current, target, Some(stmt)),
                    None => self.terminate(current, Terminator::Exit),
                }
                None
            }
        }
    }

    /// Statements after a jump still get (unreachable) blocks so that every
    /// statement has a home in the graph.
    fn seq(&mut self, stmts: &[StmtId], current: BlockId) -> Option<BlockId> {
        let mut live = Some(current);
        let mut dead: Option<BlockId> = None;
        for &stmt in stmts {
            match live {
                Some(bb) => live = self.stmt(stmt, bb),
                None => {
                    let bb = match dead {
                        Some(bb) => bb,
                        None => self.open(),
                    };
                    dead = self.stmt(stmt, bb);
                }
            }
        }
        live
    }

    fn loop_body(&mut self, body: StmtId, entry: BlockId, continue_target: BlockId, fallthrough: BlockId) {
        self.loops.push(OpenLoop {
            continue_target,
            breaks: Vec::new(),
        });
        if let Some(end) = self.stmt(body, entry) {
            self.jump(end, fallthrough, None);
        }
    }

    /// Open the loop's exit block, branch the header on `condition` (or
    /// straight into the body for `for (;;)`) and route pending `break`s.
    fn close_loop(
        &mut self,
        header: BlockId,
        condition: Option<ExprId>,
        body_entry: BlockId,
        from: StmtId,
    ) -> BlockId {
        let breaks = self.loops.pop().map(|open| open.breaks).unwrap_or_default();
        let exit = self.open();
        match condition {
            Some(condition) => self.terminate(
                header,
                Terminator::If {
                    condition,
                    then_target: body_entry,
                    else_target: exit,
                    from,
                },
            ),
            None => self.jump(header, body_entry, Some(from)),
        }
        for (bb, stmt) in breaks {
            self.jump(bb, exit, Some(stmt));
        }
        exit
    }
}
