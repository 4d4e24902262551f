//! Blocks, statements, loops and raise handling.
//!
//! ## Loops
//!
//! A reference point is taken where an iteration starts: before the
//! condition of `loop while`, before the body of `loop {} while` and
//! `loop over`. The body is analysed once. Its end and every `next` link
//! back to the reference point; `break` states join after the loop.
//!
//! ## Handle
//!
//! A raise may leave the main block after any of its usages, so handlers
//! continue from the state before the main block together with every usage
//! the main block created. The `always` block runs twice: once after normal
//! completion and once while a raise propagates. The second run is marked
//! as exiting and has no successor.

use pure_core::{InternalError, LiteralValue};

use crate::ast::{Block, Generator, HandleStmt, LoopStmt, Stmt, StmtKind, VariableDef};
use crate::flow::state::{ReferencePoint, UsagesByVariable};
use crate::flow::usage::UsageKind;

use super::{FlowAnalyzer, Jump, LoopFrame, Outcome};

impl FlowAnalyzer<'_, '_> {
    /// Analyse a block. Returns whether it always interrupts.
    pub fn analyse_block(&mut self, block: &Block) -> bool {
        self.analyse_block_value(block).0
    }

    /// Analyse a block used as a value: the outcome of its trailing
    /// expression statement.
    pub(crate) fn analyse_block_value(&mut self, block: &Block) -> (bool, Option<Outcome>) {
        let mut interrupted = false;
        let mut value = None;
        for statement in &block.statements {
            if interrupted {
                if !self.exiting {
                    self.facts.unreachable.push((statement.id, statement.span));
                }
                continue;
            }
            value = None;
            interrupted = match &statement.kind {
                StmtKind::Expr(expr) => {
                    let outcome = self.analyse_expr(expr);
                    let interrupts = outcome.interrupts;
                    value = Some(outcome);
                    interrupts
                }
                _ => self.analyse_statement(statement),
            };
            if interrupted {
                self.record_interrupting(statement.id);
            }
        }
        if interrupted {
            self.record_interrupting(block.id);
        }
        (interrupted, value)
    }

    /// Analyse a statement. Returns whether it always interrupts.
    pub fn analyse_statement(&mut self, statement: &Stmt) -> bool {
        match &statement.kind {
            StmtKind::Expr(expr) => self.analyse_expr(expr).interrupts,
            StmtKind::Variable(def) => {
                self.analyse_variable(statement, def);
                false
            }
            StmtKind::Loop(loop_stmt) => self.analyse_loop(statement, loop_stmt),
            StmtKind::Break => {
                self.jump(Jump::Break);
                true
            }
            StmtKind::Next => {
                self.jump(Jump::Next);
                true
            }
            StmtKind::Return(value) => {
                if let Some(value) = value {
                    self.analyse_expr(value);
                }
                self.jump(Jump::Return);
                true
            }
            StmtKind::Raise(value) => {
                self.analyse_expr(value);
                self.raise(statement);
                true
            }
            StmtKind::Handle(handle) => self.analyse_handle(handle),
        }
    }

    fn analyse_variable(&mut self, statement: &Stmt, def: &VariableDef) {
        let outcome = def.value.as_ref().map(|value| (value, self.analyse_expr(value)));
        let Some(declaration) = self.inputs.declarations.value_of(statement.id) else {
            return;
        };
        let declared = self.model()[declaration].ty.clone();
        let (ty, value) = match &outcome {
            Some((value, _)) if self.inputs.types.conversions.contains_key(&value.id) => (declared, None),
            Some((value, outcome)) if def.ty.is_none() => {
                (self.type_of(value, outcome).or(declared), outcome.value.clone())
            }
            Some((_, outcome)) => (declared, outcome.value.clone()),
            None => (declared, None),
        };
        self.declare(declaration, statement.span, outcome.is_some(), ty, value);
    }

    fn raise(&mut self, statement: &Stmt) {
        if self.handle_depth > 0 {
            self.tracker.clear();
        } else if self.callables == 0 {
            self.fail(InternalError::RaiseOutsideCallable { span: statement.span });
            self.tracker.clear();
        } else {
            self.jump(Jump::Return);
        }
    }

    // ========================================================================
    // Loops
    // ========================================================================

    fn analyse_loop(&mut self, statement: &Stmt, loop_stmt: &LoopStmt) -> bool {
        let outer_next = std::mem::take(&mut self.tracker.next_states);
        let outer_break = std::mem::take(&mut self.tracker.break_states);
        self.loops.push(LoopFrame::default());

        // Values written inside the loop are unknown at its start.
        let model = self.model();
        let types = self.inputs.types;
        for declaration in types.mutations_in(statement.id) {
            if self.tracker.current_state().last_usages(*declaration).is_empty() {
                continue;
            }
            let ty = model[*declaration].ty.clone();
            self.tracker.add(model, UsageKind::HINT, *declaration, statement.span, ty, None);
        }

        let infinite = match &loop_stmt.generator {
            None => {
                let point = self.tracker.create_reference_point();
                self.analyse_iteration(&loop_stmt.body, point);
                self.tracker.clear();
                self.finish_loop(point);
                true
            }
            Some(Generator::While {
                condition,
                post_condition: false,
                until,
            }) => {
                let point = self.tracker.create_reference_point();
                let outcome = self.analyse_expr(condition);
                let (positive, negative) = self.branch_states(&outcome);
                let (entering, leaving) = if *until { (negative, positive) } else { (positive, negative) };
                self.tracker.set_states([&entering]);
                self.analyse_iteration(&loop_stmt.body, point);
                let infinite = outcome.literal_value() == Some(&LiteralValue::Bool(!*until));
                if infinite {
                    self.tracker.clear();
                } else {
                    self.tracker.set_states([&leaving]);
                }
                self.finish_loop(point);
                infinite
            }
            Some(Generator::While {
                condition,
                post_condition: true,
                until,
            }) => {
                let point = self.tracker.create_reference_point();
                self.analyse_block(&loop_stmt.body);
                let next_states = std::mem::take(&mut self.tracker.next_states);
                self.tracker.add_states(&next_states);
                let outcome = self.analyse_expr(condition);
                let (positive, negative) = self.branch_states(&outcome);
                let (repeating, leaving) = if *until { (negative, positive) } else { (positive, negative) };
                self.tracker.set_states([&repeating]);
                self.tracker.link_back(point);
                let infinite = outcome.literal_value() == Some(&LiteralValue::Bool(!*until));
                if infinite {
                    self.tracker.clear();
                } else {
                    self.tracker.set_states([&leaving]);
                }
                self.finish_loop(point);
                infinite
            }
            Some(Generator::Over { collection, binding }) => {
                self.analyse_expr(collection);
                let point = self.tracker.create_reference_point();
                let exhausted = self.tracker.snapshot();
                if let Some(binding) = binding {
                    if let Some(declaration) = self.inputs.declarations.value_of(binding.id) {
                        let ty = model[declaration].ty.clone();
                        self.declare(declaration, binding.span, true, ty, None);
                    }
                }
                self.analyse_iteration(&loop_stmt.body, point);
                self.tracker.add_states([&exhausted]);
                self.finish_loop(point);
                false
            }
        };

        let frame = self.loops.pop().unwrap_or_default();
        self.tracker.next_states = outer_next;
        self.tracker.break_states = outer_break;

        let interrupts = infinite && !frame.has_break;
        if interrupts {
            self.record_interrupting(statement.id);
        }
        interrupts
    }

    /// Analyse the body once and link its end and every `next` back to the
    /// start of the iteration.
    fn analyse_iteration(&mut self, body: &Block, point: ReferencePoint) {
        self.analyse_block(body);
        self.tracker.link_back(point);
        let next_states = std::mem::take(&mut self.tracker.next_states);
        for state in &next_states {
            self.tracker.link(&state.last, point);
        }
    }

    fn finish_loop(&mut self, point: ReferencePoint) {
        let break_states = std::mem::take(&mut self.tracker.break_states);
        self.tracker.add_states(&break_states);
        self.tracker.remove_reference_point(point);
    }

    // ========================================================================
    // Handle
    // ========================================================================

    fn analyse_handle(&mut self, handle: &HandleStmt) -> bool {
        let initial = self.tracker.snapshot();

        // Every usage of the main block may be the last one before a raise.
        self.handle_depth += 1;
        let point = self.tracker.create_reference_point();
        let main_interrupts = self.analyse_block(&handle.main);
        let mut raised = UsagesByVariable::default();
        self.tracker.collect_usages_into(point, &mut raised);
        self.tracker.remove_reference_point(point);
        self.handle_depth -= 1;
        let main_state = self.tracker.snapshot();

        let mut handler_states = Vec::with_capacity(handle.handlers.len());
        let mut handled = UsagesByVariable::default();
        let mut handlers_interrupt = true;
        for handler in &handle.handlers {
            self.tracker.set_states([&initial]);
            self.tracker.add_last_usages(&raised);
            if let Some(binding) = &handler.binding {
                if let Some(declaration) = self.inputs.declarations.value_of(binding.id) {
                    let ty = self.model()[declaration].ty.clone();
                    self.declare(declaration, binding.span, true, ty, None);
                }
            }
            let point = self.tracker.create_reference_point();
            handlers_interrupt &= self.analyse_block(&handler.body);
            self.tracker.collect_usages_into(point, &mut handled);
            self.tracker.remove_reference_point(point);
            handler_states.push(self.tracker.snapshot());
        }

        self.tracker.set_states(std::iter::once(&main_state).chain(&handler_states));
        let mut interrupts = main_interrupts && handlers_interrupt;

        if let Some(always) = &handle.always {
            interrupts |= self.analyse_block(always);
            let completed = self.tracker.snapshot();

            self.tracker.set_states([&initial]);
            self.tracker.add_last_usages(&raised);
            self.tracker.add_last_usages(&handled);
            let point = self.tracker.create_reference_point();
            let exiting = std::mem::replace(&mut self.exiting, true);
            let exiting_loops = std::mem::replace(&mut self.exiting_loops, self.loops.len());
            self.diagnostics.mute();
            self.analyse_block(always);
            self.diagnostics.unmute();
            self.exiting_loops = exiting_loops;
            self.exiting = exiting;
            self.tracker.mark_exiting(point);
            self.tracker.remove_reference_point(point);
            self.tracker.set_states([&completed]);
        }

        interrupts
    }
}
