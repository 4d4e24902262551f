//! Single-pass flow analysis of one callable body.
//!
//! The [`FlowAnalyzer`] walks a body once, in execution order, and feeds a
//! [`VariableTracker`] with the usages every construct produces. Branching
//! constructs fork the tracker state and merge it again where control flow
//! joins; loops link their last usages back to a reference point taken at
//! re-entry.
//!
//! ## Responsibilities
//!
//! - Create read, write, mutation and hint usages for tracked variables
//! - Narrow types and values along the positive and negative branches of
//!   conditions (`and`, `or`, `!`, `==`, `?`, `is`)
//! - Fold literal operands into statically known values
//! - Record interrupting and unreachable statements
//! - Report reads of uninitialized locals and properties, and calls that
//!   rely on properties an initializer has not written yet
//! - Analyse closures with their own tracker and record captured reads in
//!   the enclosing one
//!
//! Submodules:
//! - [`expr`]: expressions and conditions
//! - [`stmt`]: blocks, statements, loops and raise handling

mod expr;
mod stmt;

use pure_core::{DeclId, Diagnostics, InternalError, IssueSink, LiteralValue, NodeId, SemanticError, Span};

use crate::config::AnalysisConfig;
use crate::facts::{DeclarationMap, FlowFacts, TypeFacts};
use crate::model::{DeclarationKind, SemanticModel};
use crate::types::Type;

use super::state::VariableState;
use super::tracker::VariableTracker;
use super::usage::{UsageId, UsageKind, UsageValue};

/// Read-only inputs shared by every analyzer of a run.
#[derive(Clone, Copy)]
pub(crate) struct FlowInputs<'a> {
    pub model: &'a SemanticModel,
    pub declarations: &'a DeclarationMap,
    pub types: &'a TypeFacts,
    pub config: &'a AnalysisConfig,
}

/// What analysing an expression produced.
#[derive(Debug, Clone, Default)]
pub(crate) struct Outcome {
    /// Statically known or opaque value.
    pub value: Option<UsageValue>,
    /// Narrowed type, when it differs from the recorded expression type.
    pub ty: Option<Type>,
    /// State when the expression evaluates to `true`; the current state
    /// when unset.
    pub positive: Option<VariableState>,
    /// State when the expression evaluates to `false`.
    pub negative: Option<VariableState>,
    /// Every branch of an `if` or `switch` interrupts.
    pub interrupts: bool,
}

impl Outcome {
    fn literal(value: LiteralValue) -> Self {
        Self {
            value: Some(UsageValue::Literal(value)),
            ..Self::default()
        }
    }

    fn opaque(node: NodeId) -> Self {
        Self {
            value: Some(UsageValue::Expression(node)),
            ..Self::default()
        }
    }

    pub fn literal_value(&self) -> Option<&LiteralValue> {
        self.value.as_ref().and_then(UsageValue::literal)
    }
}

#[derive(Debug, Default)]
struct LoopFrame {
    has_break: bool,
}

/// Where a jump statement leaves the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Jump {
    Next,
    Break,
    Return,
}

pub(crate) struct FlowAnalyzer<'a, 'f> {
    inputs: FlowInputs<'a>,
    diagnostics: &'f mut Diagnostics,
    facts: &'f mut FlowFacts,
    tracker: VariableTracker,
    /// Declarations read by the closures being analysed, innermost last.
    captures: Vec<Vec<DeclId>>,
    loops: Vec<LoopFrame>,
    /// Enclosing `handle` main blocks.
    handle_depth: usize,
    /// Enclosing callable bodies, closures included.
    callables: usize,
    /// Analysing the copy of an `always` block that runs while a raise
    /// propagates. Nothing but usages is recorded.
    exiting: bool,
    /// Loops entered before the exiting copy started.
    exiting_loops: usize,
    internal: Option<InternalError>,
}

impl<'a, 'f> FlowAnalyzer<'a, 'f> {
    /// Analyzer outside any callable body.
    pub fn new(
        inputs: FlowInputs<'a>,
        tracker: VariableTracker,
        diagnostics: &'f mut Diagnostics,
        facts: &'f mut FlowFacts,
    ) -> Self {
        Self {
            inputs,
            diagnostics,
            facts,
            tracker,
            captures: Vec::new(),
            loops: Vec::new(),
            handle_depth: 0,
            callables: 0,
            exiting: false,
            exiting_loops: 0,
            internal: None,
        }
    }

    /// Analyzer of a callable body: functions, accessors, initializers
    /// and top-level statements.
    pub fn for_callable(
        inputs: FlowInputs<'a>,
        tracker: VariableTracker,
        diagnostics: &'f mut Diagnostics,
        facts: &'f mut FlowFacts,
    ) -> Self {
        Self {
            callables: 1,
            ..Self::new(inputs, tracker, diagnostics, facts)
        }
    }

    pub fn tracker(&mut self) -> &mut VariableTracker {
        &mut self.tracker
    }

    /// Close the tracker. Fails if the body broke an invariant of an
    /// earlier pass.
    pub fn finish(mut self) -> Result<VariableTracker, InternalError> {
        if let Some(error) = self.internal {
            return Err(error);
        }
        self.tracker.calculate_end_state();
        Ok(self.tracker)
    }

    fn model(&self) -> &'a SemanticModel {
        self.inputs.model
    }

    fn report(&mut self, error: SemanticError) {
        tracing::trace!(%error, "flow issue");
        self.diagnostics.add_issue(error);
    }

    fn fail(&mut self, error: InternalError) {
        tracing::warn!(%error, "flow analysis aborted");
        if self.internal.is_none() {
            self.internal = Some(error);
        }
    }

    fn record_value(&mut self, node: NodeId, outcome: &Outcome) {
        if self.exiting {
            return;
        }
        if let Some(value) = outcome.literal_value() {
            self.facts.values.entry(node).or_insert_with(|| value.clone());
        }
    }

    fn record_interrupting(&mut self, node: NodeId) {
        self.facts.interrupting.insert(node);
    }

    /// Positive and negative states of an outcome, defaulting to the
    /// current state.
    fn branch_states(&self, outcome: &Outcome) -> (VariableState, VariableState) {
        let positive = outcome.positive.clone().unwrap_or_else(|| self.tracker.snapshot());
        let negative = outcome.negative.clone().unwrap_or_else(|| self.tracker.snapshot());
        (positive, negative)
    }

    fn jump(&mut self, jump: Jump) {
        // A propagating raise leaves through loops and callables alike.
        let leaves_exiting_copy = jump == Jump::Return || self.loops.len() <= self.exiting_loops;
        if self.exiting && leaves_exiting_copy {
            self.tracker.clear();
            return;
        }
        match jump {
            Jump::Next => self.tracker.register_next(),
            Jump::Break => {
                if let Some(frame) = self.loops.last_mut() {
                    frame.has_break = true;
                }
                self.tracker.register_break();
            }
            Jump::Return => self.tracker.register_return(),
        }
    }

    // ========================================================================
    // Tracked variables
    // ========================================================================

    /// The tracked declaration an expression reads or writes directly: a
    /// name, or a property accessed through `self`.
    fn tracked_target(&self, expr: &crate::ast::Expr) -> Option<DeclId> {
        use crate::ast::ExprKind;
        let declaration = match &expr.kind {
            ExprKind::Variable(_) => self.inputs.types.binding(expr.id)?,
            ExprKind::Member { target, .. } if matches!(target.kind, ExprKind::SelfRef) => {
                self.inputs.types.binding(expr.id)?
            }
            _ => return None,
        };
        self.model()[declaration].is_tracked().then_some(declaration)
    }

    /// Inside a closure, declarations of the enclosing callable are
    /// captured instead of tracked.
    fn capture(&mut self, declaration: DeclId) -> bool {
        if self.tracker.is_tracking(declaration) {
            return false;
        }
        let Some(captured) = self.captures.last_mut() else {
            return false;
        };
        if !captured.contains(&declaration) {
            captured.push(declaration);
        }
        true
    }

    /// Declare a variable at the current position.
    pub fn declare(&mut self, declaration: DeclId, span: Span, initialized: bool, ty: Option<Type>, value: Option<UsageValue>) {
        let model = self.model();
        self.tracker.declare(model, declaration, span, initialized, ty, value);
    }

    /// Write a property from an initializer parameter.
    pub fn initialize(&mut self, declaration: DeclId, span: Span, ty: Option<Type>) {
        self.write(declaration, span, ty, None);
    }

    /// Read a tracked variable, reporting it when it may be uninitialized.
    fn read(&mut self, declaration: DeclId, span: Span) -> Outcome {
        let model = self.model();
        if self.capture(declaration) {
            return Outcome {
                ty: model[declaration].ty.clone(),
                ..Outcome::default()
            };
        }
        let usage = self.tracker.add_current(model, UsageKind::READ, declaration, span);
        self.check_initialized(declaration, usage, span);
        let entry = self.tracker.usage(usage);
        Outcome {
            value: entry.value.clone(),
            ty: entry.ty.clone(),
            ..Outcome::default()
        }
    }

    fn check_initialized(&mut self, declaration: DeclId, usage: UsageId, span: Span) {
        let value = &self.model()[declaration];
        let kind = match value.kind {
            DeclarationKind::LocalVariable => "Local variable",
            DeclarationKind::Property if self.tracker.is_initializer() && !value.is_static && !value.has_value => {
                "Property"
            }
            _ => return,
        };
        if self.tracker.is_previously_initialized(usage) {
            return;
        }
        let error = SemanticError::NotInitialized {
            kind: kind.to_string(),
            name: value.name.clone(),
            span,
        };
        self.report(error);
    }

    /// Write a tracked variable.
    fn write(&mut self, declaration: DeclId, span: Span, ty: Option<Type>, value: Option<UsageValue>) {
        if self.captures.last().is_some() && !self.tracker.is_tracking(declaration) {
            return;
        }
        let model = self.model();
        self.tracker.add(model, UsageKind::WRITE, declaration, span, ty, value);
    }

    /// Narrow a tracked variable without executing anything.
    fn hint(&mut self, declaration: DeclId, span: Span, ty: Option<Type>, value: Option<UsageValue>) {
        if !self.tracker.is_tracking(declaration) {
            return;
        }
        let model = self.model();
        self.tracker.add(model, UsageKind::HINT, declaration, span, ty, value);
    }

    /// Type an expression has at the current position.
    fn type_of(&self, expr: &crate::ast::Expr, outcome: &Outcome) -> Option<Type> {
        if let Some(ty) = &outcome.ty {
            return Some(ty.clone());
        }
        if let Some(value) = outcome.literal_value() {
            if let Some(ty) = self.model().literal_type(value) {
                return Some(ty);
            }
        }
        self.inputs.types.type_of(expr.id).cloned()
    }
}
