//! Expressions and conditions.

use pure_core::{LiteralValue, SemanticError};

use crate::ast::{BinaryOp, Closure, Expr, ExprKind, IfExpr, StepDirection, SwitchExpr, TypeExpr, UnaryOp};
use crate::facts::CallKind;
use crate::flow::fold::{fold_binary, fold_step, fold_unary};
use crate::flow::state::VariableState;
use crate::flow::tracker::VariableTracker;
use crate::flow::usage::{UsageKind, UsageValue};
use crate::types::Type;

use super::{FlowAnalyzer, Outcome};

impl FlowAnalyzer<'_, '_> {
    /// Analyse an expression in evaluation order.
    pub fn analyse_expr(&mut self, expr: &Expr) -> Outcome {
        let outcome = match &expr.kind {
            ExprKind::Literal(value) => Outcome::literal(value.clone()),
            ExprKind::Variable(_) => match self.tracked_target(expr) {
                Some(declaration) => self.read(declaration, expr.span),
                None => Outcome::opaque(expr.id),
            },
            ExprKind::SelfRef | ExprKind::SuperRef => Outcome::opaque(expr.id),
            ExprKind::Member { target, .. } => match self.tracked_target(expr) {
                Some(declaration) => self.read(declaration, expr.span),
                None => {
                    self.analyse_expr(target);
                    Outcome::opaque(expr.id)
                }
            },
            ExprKind::Call { callee, arguments, .. } => self.analyse_call(expr, callee, arguments),
            ExprKind::Binary { op, left, right } => self.analyse_binary(expr, *op, left, right),
            ExprKind::Unary { op, operand } => {
                let operand = self.analyse_expr(operand);
                let value = operand
                    .literal_value()
                    .filter(|_| self.inputs.config.fold_constants)
                    .and_then(|value| fold_unary(*op, value));
                let mut outcome = match value {
                    Some(value) => Outcome::literal(value),
                    None => Outcome::opaque(expr.id),
                };
                if *op == UnaryOp::Not {
                    outcome.positive = operand.negative;
                    outcome.negative = operand.positive;
                }
                outcome
            }
            ExprKind::Assign { op, target, value } => self.analyse_assign(expr, *op, target, value),
            ExprKind::Step { target, direction } => self.analyse_step(expr, target, *direction),
            ExprKind::If(if_expr) => self.analyse_if(expr, if_expr),
            ExprKind::Switch(switch) => self.analyse_switch(expr, switch),
            ExprKind::HasValue(subject) => self.analyse_has_value(expr, subject),
            ExprKind::IsCheck { subject, ty, negated } => self.analyse_is_check(expr, subject, ty, *negated),
            ExprKind::Closure(closure) => {
                self.analyse_closure(expr, closure);
                Outcome::opaque(expr.id)
            }
        };
        self.record_value(expr.id, &outcome);
        outcome
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn fold(&self, op: BinaryOp, left: &Outcome, right: &Outcome) -> Option<LiteralValue> {
        if !self.inputs.config.fold_constants {
            return None;
        }
        fold_binary(op, left.literal_value()?, right.literal_value()?)
    }

    fn analyse_binary(&mut self, expr: &Expr, op: BinaryOp, left: &Expr, right: &Expr) -> Outcome {
        match op {
            BinaryOp::And | BinaryOp::Or => return self.analyse_logical(expr, op == BinaryOp::And, left, right),
            BinaryOp::NullCoalesce => {
                let left_outcome = self.analyse_expr(left);
                let after_left = self.tracker.snapshot();
                let right_outcome = self.analyse_expr(right);
                self.tracker.add_states([&after_left]);
                return match self.fold(op, &left_outcome, &right_outcome) {
                    Some(value) => Outcome::literal(value),
                    None => Outcome::opaque(expr.id),
                };
            }
            _ => {}
        }

        let left_outcome = self.analyse_expr(left);
        let right_outcome = self.analyse_expr(right);
        let mut outcome = match self.fold(op, &left_outcome, &right_outcome) {
            Some(value) => Outcome::literal(value),
            None => Outcome::opaque(expr.id),
        };

        let equality = match op {
            BinaryOp::Equal | BinaryOp::Identical => Some(true),
            BinaryOp::NotEqual | BinaryOp::NotIdentical => Some(false),
            _ => None,
        };
        if let Some(equal) = equality {
            if let Some((positive, negative)) = self.narrow_equality(left, right) {
                let (positive, negative) = if equal { (positive, negative) } else { (negative, positive) };
                self.tracker.set_states([&positive, &negative]);
                outcome.positive = Some(positive);
                outcome.negative = Some(negative);
            }
        }
        outcome
    }

    /// `variable == literal` in either order: the variable holds the literal
    /// where the comparison succeeds. The type narrows to the literal's only
    /// when the current type accepts it.
    fn narrow_equality(&mut self, left: &Expr, right: &Expr) -> Option<(VariableState, VariableState)> {
        let (variable, literal) = match (&left.kind, &right.kind) {
            (_, ExprKind::Literal(value)) => (left, value),
            (ExprKind::Literal(value), _) => (right, value),
            _ => return None,
        };
        let declaration = self.tracked_target(variable)?;
        if !self.tracker.is_tracking(declaration) {
            return None;
        }
        let unequal = self.tracker.snapshot();
        let model = self.model();
        let ty = match (self.tracker.current_type(model, declaration), model.literal_type(literal)) {
            (Some(current), Some(literal_type)) if model.accepts(&current, &literal_type) => Some(literal_type),
            (Some(current), _) => Some(current),
            (None, literal_type) => literal_type,
        };
        self.hint(declaration, variable.span, ty, Some(UsageValue::Literal(literal.clone())));
        let equal = self.tracker.snapshot();
        Some((equal, unequal))
    }

    fn analyse_logical(&mut self, expr: &Expr, is_and: bool, left: &Expr, right: &Expr) -> Outcome {
        let left_outcome = self.analyse_expr(left);
        let (left_positive, left_negative) = self.branch_states(&left_outcome);
        let (continuing, short_circuit) = if is_and {
            (left_positive, left_negative)
        } else {
            (left_negative, left_positive)
        };
        self.tracker.set_states([&continuing]);
        if let Some(declaration) = self.tracked_target(left) {
            let ty = self.model().builtins.bool_type();
            self.hint(declaration, left.span, ty, Some(UsageValue::Literal(LiteralValue::Bool(is_and))));
        }

        let right_outcome = self.analyse_expr(right);
        let (right_positive, right_negative) = self.branch_states(&right_outcome);
        self.tracker.add_states([&short_circuit]);

        let mut joined = short_circuit;
        let (positive, negative) = if is_and {
            joined.merge(&right_negative);
            (right_positive, joined)
        } else {
            joined.merge(&right_positive);
            (joined, right_negative)
        };

        let value = match (left_outcome.literal_value(), is_and) {
            (Some(LiteralValue::Bool(false)), true) => Some(LiteralValue::Bool(false)),
            (Some(LiteralValue::Bool(true)), false) => Some(LiteralValue::Bool(true)),
            _ => self.fold(if is_and { BinaryOp::And } else { BinaryOp::Or }, &left_outcome, &right_outcome),
        };
        let mut outcome = match value {
            Some(value) => Outcome::literal(value),
            None => Outcome::opaque(expr.id),
        };
        outcome.positive = Some(positive);
        outcome.negative = Some(negative);
        outcome
    }

    // ========================================================================
    // Assignments
    // ========================================================================

    fn analyse_assign(&mut self, expr: &Expr, op: Option<BinaryOp>, target: &Expr, value: &Expr) -> Outcome {
        let value_outcome = self.analyse_expr(value);
        let Some(declaration) = self.tracked_target(target) else {
            if let ExprKind::Member { target: receiver, .. } = &target.kind {
                self.analyse_expr(receiver);
            }
            if let Some(declaration) = self.inputs.types.binding(target.id) {
                let property = &self.model()[declaration];
                if property.is_property() && property.is_constant {
                    self.facts.reassignments.push(crate::facts::Reassignment {
                        declaration,
                        span: target.span,
                    });
                }
            }
            return Outcome::opaque(expr.id);
        };

        match op {
            None => {
                let converted = self.inputs.types.conversions.contains_key(&value.id);
                let (ty, stored) = if converted {
                    (self.model()[declaration].ty.clone(), None)
                } else {
                    (self.type_of(value, &value_outcome), value_outcome.value.clone())
                };
                self.write(declaration, target.span, ty, stored);
                value_outcome
            }
            Some(op) => {
                let current = self.tracker.current_value(declaration);
                let folded = match current.as_ref().and_then(UsageValue::literal) {
                    Some(current) if self.inputs.config.fold_constants => {
                        value_outcome.literal_value().and_then(|value| fold_binary(op, current, value))
                    }
                    _ => None,
                };
                self.mutate(declaration, target, folded.clone());
                match folded {
                    Some(value) => Outcome::literal(value),
                    None => Outcome::opaque(expr.id),
                }
            }
        }
    }

    fn analyse_step(&mut self, expr: &Expr, target: &Expr, direction: StepDirection) -> Outcome {
        let Some(declaration) = self.tracked_target(target) else {
            self.analyse_expr(target);
            return Outcome::opaque(expr.id);
        };
        let folded = match self.tracker.current_value(declaration) {
            Some(UsageValue::Literal(current)) if self.inputs.config.fold_constants => fold_step(direction, &current),
            _ => None,
        };
        self.mutate(declaration, target, folded);
        Outcome::opaque(expr.id)
    }

    /// Read and write in place, keeping the variable's current type.
    fn mutate(&mut self, declaration: pure_core::DeclId, target: &Expr, value: Option<LiteralValue>) {
        if self.capture(declaration) {
            return;
        }
        let model = self.model();
        let ty = self.tracker.current_type(model, declaration);
        let kinds = UsageKind::READ | UsageKind::MUTATION;
        let usage = self
            .tracker
            .add(model, kinds, declaration, target.span, ty, value.map(UsageValue::Literal));
        self.check_initialized(declaration, usage, target.span);
    }

    // ========================================================================
    // Branches
    // ========================================================================

    fn analyse_if(&mut self, expr: &Expr, if_expr: &IfExpr) -> Outcome {
        let condition = self.analyse_expr(&if_expr.condition);
        let (positive, negative) = self.branch_states(&condition);

        self.tracker.set_states([&positive]);
        let (positive_interrupts, positive_value) = self.analyse_block_value(&if_expr.positive);
        let (interrupts, negative_value) = match &if_expr.negative {
            None => {
                self.tracker.add_states([&negative]);
                (false, None)
            }
            Some(block) => {
                let after_positive = self.tracker.snapshot();
                self.tracker.set_states([&negative]);
                let (negative_interrupts, value) = self.analyse_block_value(block);
                self.tracker.add_states([&after_positive]);
                (positive_interrupts && negative_interrupts, value)
            }
        };

        let value = match condition.literal_value() {
            Some(LiteralValue::Bool(true)) => positive_value,
            Some(LiteralValue::Bool(false)) => negative_value,
            _ => None,
        };
        let mut outcome = match value.and_then(|value| value.literal_value().cloned()) {
            Some(value) => Outcome::literal(value),
            None => Outcome::opaque(expr.id),
        };
        outcome.interrupts = interrupts;
        if interrupts {
            self.record_interrupting(expr.id);
        }
        outcome
    }

    fn analyse_switch(&mut self, expr: &Expr, switch: &SwitchExpr) -> Outcome {
        self.analyse_expr(&switch.subject);
        let subject = self.tracked_target(&switch.subject);

        let mut case_states = Vec::with_capacity(switch.cases.len());
        let mut interrupts = true;
        for case in &switch.cases {
            let condition = self.analyse_expr(&case.condition);
            let unmatched = self.tracker.snapshot();
            if let Some(declaration) = subject {
                let ty = self.type_of(&case.condition, &condition);
                self.hint(declaration, case.span, ty, condition.value.clone());
            }
            interrupts &= self.analyse_block(&case.body);
            case_states.push(self.tracker.snapshot());
            self.tracker.set_states([&unmatched]);
        }
        match &switch.else_branch {
            Some(else_branch) => interrupts &= self.analyse_block(else_branch),
            None => interrupts = false,
        }
        self.tracker.add_states(&case_states);

        let mut outcome = Outcome::opaque(expr.id);
        outcome.interrupts = interrupts;
        if interrupts {
            self.record_interrupting(expr.id);
        }
        outcome
    }

    /// `subject?`: the subject is non-null where it holds.
    fn analyse_has_value(&mut self, expr: &Expr, subject: &Expr) -> Outcome {
        let subject_outcome = self.analyse_expr(subject);
        let subject_type = self.type_of(subject, &subject_outcome);
        let mut outcome = match &subject_type {
            Some(ty) if ty.is_null() => Outcome::literal(LiteralValue::Bool(false)),
            Some(ty) if !ty.is_optional() && *ty != Type::ANY => Outcome::literal(LiteralValue::Bool(true)),
            _ => Outcome::opaque(expr.id),
        };

        let Some(declaration) = self.tracked_target(subject).filter(|d| self.tracker.is_tracking(*d)) else {
            return outcome;
        };
        let common = self.tracker.snapshot();
        let positive = match &subject_type {
            Some(Type::Optional(base)) => {
                let value = subject_outcome.value.clone().filter(|value| value.literal() != Some(&LiteralValue::Null));
                self.hint(declaration, subject.span, Some((**base).clone()), value);
                let positive = self.tracker.snapshot();
                self.tracker.set_states([&common]);
                positive
            }
            _ => common.clone(),
        };
        self.hint(
            declaration,
            subject.span,
            Some(Type::NULL),
            Some(UsageValue::Literal(LiteralValue::Null)),
        );
        let negative = self.tracker.snapshot();
        self.tracker.set_states([&positive, &negative]);
        outcome.positive = Some(positive);
        outcome.negative = Some(negative);
        outcome
    }

    /// `subject is T`: the subject has type `T` where it holds.
    fn analyse_is_check(&mut self, expr: &Expr, subject: &Expr, ty: &TypeExpr, negated: bool) -> Outcome {
        let subject_outcome = self.analyse_expr(subject);
        let subject_type = self.type_of(subject, &subject_outcome);
        let reference = self.inputs.types.resolved_type(ty.id).cloned();

        let mut outcome = match (&reference, &subject_type) {
            (Some(reference), Some(subject_type)) if self.model().accepts(reference, subject_type) => {
                Outcome::literal(LiteralValue::Bool(!negated))
            }
            _ => Outcome::opaque(expr.id),
        };

        let (Some(declaration), Some(reference)) = (
            self.tracked_target(subject).filter(|d| self.tracker.is_tracking(*d)),
            reference,
        ) else {
            return outcome;
        };
        let common = self.tracker.snapshot();
        self.hint(declaration, subject.span, Some(reference.clone()), subject_outcome.value.clone());
        let matching = self.tracker.snapshot();
        self.tracker.set_states([&common]);
        let other = match &subject_type {
            Some(Type::Optional(base)) if **base == reference => {
                self.hint(
                    declaration,
                    subject.span,
                    Some(Type::NULL),
                    Some(UsageValue::Literal(LiteralValue::Null)),
                );
                let other = self.tracker.snapshot();
                self.tracker.set_states([&common]);
                other
            }
            _ => common,
        };
        let (positive, negative) = if negated { (other, matching) } else { (matching, other) };
        self.tracker.set_states([&positive, &negative]);
        outcome.positive = Some(positive);
        outcome.negative = Some(negative);
        outcome
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn analyse_call(&mut self, expr: &Expr, callee: &Expr, arguments: &[Expr]) -> Outcome {
        match &callee.kind {
            ExprKind::Variable(_) => {
                if let Some(declaration) = self.tracked_target(callee) {
                    self.read(declaration, callee.span);
                }
            }
            ExprKind::Member { target, .. } => {
                if let Some(declaration) = self.tracked_target(callee) {
                    self.read(declaration, callee.span);
                } else if !matches!(target.kind, ExprKind::SelfRef | ExprKind::SuperRef) {
                    self.analyse_expr(target);
                }
            }
            _ => {
                self.analyse_expr(callee);
            }
        }
        for argument in arguments {
            self.analyse_expr(argument);
        }
        self.apply_summary(expr, callee);
        Outcome::opaque(expr.id)
    }

    /// A call on the instance being analysed reads and writes the
    /// properties its target's summary names.
    fn apply_summary(&mut self, expr: &Expr, callee: &Expr) {
        let types = self.inputs.types;
        let Some(resolution) = types.call(expr.id) else {
            return;
        };
        let on_self = match &callee.kind {
            ExprKind::Variable(_) => true,
            ExprKind::Member { target, .. } => matches!(target.kind, ExprKind::SelfRef | ExprKind::SuperRef),
            _ => false,
        };
        let applies = match resolution.kind {
            CallKind::Delegation => true,
            CallKind::Method => on_self,
            _ => false,
        };
        if !applies {
            return;
        }
        let Some(summary) = self.facts.summary(resolution.declared).cloned() else {
            return;
        };

        let model = self.model();
        let mut uninitialized = Vec::new();
        for property in summary.required {
            if self.capture(property) {
                continue;
            }
            let usage = self.tracker.add_current(model, UsageKind::READ, property, expr.span);
            if !self.tracker.is_previously_initialized(usage) {
                uninitialized.push(model[property].name.clone());
            }
        }
        for property in summary.being_initialized {
            self.write(property, expr.span, model[property].ty.clone(), None);
        }

        if self.tracker.is_initializer() && !uninitialized.is_empty() {
            let error = SemanticError::ReliesOnUninitializedProperties {
                callee: model.display_signature(resolution.declared).to_string(),
                properties: uninitialized,
                span: expr.span,
            };
            self.report(error);
        }
    }

    // ========================================================================
    // Closures
    // ========================================================================

    fn analyse_closure(&mut self, expr: &Expr, closure: &Closure) {
        let model = self.model();
        let enclosing = std::mem::replace(&mut self.tracker, VariableTracker::new());
        let loops = std::mem::take(&mut self.loops);
        let handle_depth = std::mem::replace(&mut self.handle_depth, 0);
        self.callables += 1;
        self.captures.push(Vec::new());

        for parameter in &closure.parameters {
            if let Some(declaration) = self.inputs.declarations.value_of(parameter.id) {
                self.declare(declaration, parameter.span, true, model[declaration].ty.clone(), None);
            }
        }
        self.analyse_block(&closure.body);
        self.tracker.calculate_end_state();

        let captured = self.captures.pop().unwrap_or_default();
        self.callables -= 1;
        self.handle_depth = handle_depth;
        self.loops = loops;
        let tracker = std::mem::replace(&mut self.tracker, enclosing);

        for declaration in captured {
            self.read(declaration, expr.span);
        }
        if !self.exiting {
            self.facts.reassignments.extend(tracker.reassignments());
            self.tracker.add_child(format!("closure@{}", expr.span.line), tracker);
        }
    }
}
