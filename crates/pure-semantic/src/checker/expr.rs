//! Expression typing.

use pure_core::{DeclId, SemanticError, Span};

use crate::ast::{BinaryOp, Block, Closure, Expr, ExprKind, OperatorKind, StmtKind, UnaryOp};
use crate::model::DeclarationKind;
use crate::types::{FunctionSignature, FunctionType, Substitution, Type, combine_or_union};

use super::{CallableContext, TypeChecker};

impl TypeChecker<'_> {
    /// Type an expression and everything inside it.
    pub fn check_expr(&mut self, expr: &Expr) -> Option<Type> {
        let ty = match &expr.kind {
            ExprKind::Literal(value) => self.model.literal_type(value),
            ExprKind::Variable(name) => self.check_variable(expr, name),
            ExprKind::SelfRef => self.check_self(expr.span),
            ExprKind::SuperRef => self.super_type(expr.span),
            ExprKind::Member {
                target,
                name,
                optional,
            } => self.check_member(expr, target, name, *optional),
            ExprKind::Call {
                callee,
                type_arguments,
                arguments,
            } => self.check_call(expr, callee, type_arguments, arguments),
            ExprKind::Binary { op, left, right } => self.check_binary(expr, *op, left, right),
            ExprKind::Unary { op, operand } => self.check_unary(expr, *op, operand),
            ExprKind::Assign { op, target, value } => self.check_assign(expr, *op, target, value),
            ExprKind::Step { target, direction } => {
                let operator = match direction {
                    crate::ast::StepDirection::Increment => OperatorKind::Increment,
                    crate::ast::StepDirection::Decrement => OperatorKind::Decrement,
                };
                let ty = self.check_expr(target);
                if let Some(ty) = &ty {
                    self.resolve_operator(expr, ty, operator, &[]);
                }
                self.mark_written(target);
                ty
            }
            ExprKind::If(if_expr) => {
                let condition = self.check_expr(&if_expr.condition);
                self.check_condition(condition.as_ref(), if_expr.condition.id, if_expr.condition.span);
                let positive = self.check_block(&if_expr.positive);
                match &if_expr.negative {
                    Some(negative) => {
                        let negative = self.check_block(negative);
                        self.combine_branches(vec![positive, negative])
                    }
                    None => Some(Type::NOTHING),
                }
            }
            ExprKind::Switch(switch) => {
                let subject = self.check_expr(&switch.subject);
                let mut branches = Vec::with_capacity(switch.cases.len() + 1);
                for case in &switch.cases {
                    let condition = self.check_expr(&case.condition);
                    if let (Some(subject), Some(condition)) = (&subject, &condition) {
                        if !self.model.accepts(subject, condition) {
                            let error = SemanticError::CaseTypeMismatch {
                                case_type: self.model.display(condition).to_string(),
                                subject_type: self.model.display(subject).to_string(),
                                span: case.span,
                            };
                            self.report(error);
                        }
                    }
                    branches.push(self.check_block(&case.body));
                }
                match &switch.else_branch {
                    Some(else_branch) => {
                        branches.push(self.check_block(else_branch));
                        self.combine_branches(branches)
                    }
                    None => Some(Type::NOTHING),
                }
            }
            ExprKind::HasValue(subject) => {
                self.check_expr(subject);
                self.model.builtins.bool_type()
            }
            ExprKind::IsCheck { subject, ty, .. } => {
                self.check_expr(subject);
                self.resolve_type(ty);
                self.model.builtins.bool_type()
            }
            ExprKind::Closure(closure) => self.check_closure(expr, closure),
        };
        self.record(expr.id, ty)
    }

    /// Type of a block used as a value: the type of its trailing expression.
    pub(crate) fn check_block(&mut self, block: &Block) -> Option<Type> {
        let scope = self.declarations.scope_of(block.id).unwrap_or(self.scope());
        self.in_scope(scope, |checker| {
            for statement in &block.statements {
                checker.check_statement(statement);
            }
        });
        match block.statements.last().map(|statement| &statement.kind) {
            Some(StmtKind::Expr(expr)) => self.facts.type_of(expr.id).cloned(),
            _ => None,
        }
    }

    fn combine_branches(&self, branches: Vec<Option<Type>>) -> Option<Type> {
        let branches: Option<Vec<Type>> = branches.into_iter().collect();
        match branches {
            Some(branches) => Some(combine_or_union(self.model, &branches)),
            None => Some(Type::NOTHING),
        }
    }

    // ==========================================================================
    // Names
    // ==========================================================================

    fn check_variable(&mut self, expr: &Expr, name: &str) -> Option<Type> {
        if let Some(declaration) = self.model.scopes.resolve_value(self.scope(), name, Some(expr.span)) {
            self.facts.bindings.insert(expr.id, declaration);
            let substitution = self.implicit_member_substitution(declaration, name);
            return self.member_type(declaration, &substitution);
        }
        if let Some(declaration) = self.model.scopes.resolve_type(self.scope(), name) {
            return Some(Type::Static(declaration));
        }
        self.report(SemanticError::NotFound {
            kind: "value".to_string(),
            name: name.to_string(),
            span: expr.span,
        });
        None
    }

    /// Substitution for a member referenced without receiver inside a type.
    fn implicit_member_substitution(&self, declaration: DeclId, name: &str) -> Substitution {
        let (Some(_), Some(self_type)) = (self.model[declaration].owner, self.self_type()) else {
            return Substitution::default();
        };
        self.model
            .find_member(&self_type, name)
            .map(|(_, substitution)| substitution)
            .unwrap_or_default()
    }

    fn check_self(&mut self, span: Span) -> Option<Type> {
        let ty = self.self_type();
        if ty.is_none() {
            self.report(SemanticError::NotFound {
                kind: "value".to_string(),
                name: "self".to_string(),
                span,
            });
        }
        ty
    }

    /// The first declared super-type of the enclosing type.
    pub(crate) fn super_type(&mut self, span: Span) -> Option<Type> {
        let self_type = self.check_self(span)?;
        let supertype = self.model.supertypes(&self_type).into_iter().next();
        if supertype.is_none() {
            self.report(SemanticError::NotFound {
                kind: "value".to_string(),
                name: "super".to_string(),
                span,
            });
        }
        supertype
    }

    fn check_member(&mut self, expr: &Expr, target: &Expr, name: &str, optional: bool) -> Option<Type> {
        let receiver = self.check_expr(target)?;
        let lookup = match &receiver {
            Type::Static(declaration) => Type::object(*declaration),
            other if optional => other.non_optional().clone(),
            other => other.clone(),
        };
        let Some((declaration, substitution)) = self.model.find_member(&lookup, name) else {
            self.report(SemanticError::NotFound {
                kind: "member".to_string(),
                name: name.to_string(),
                span: expr.span,
            });
            return None;
        };
        self.facts.bindings.insert(expr.id, declaration);
        let ty = self.member_type(declaration, &substitution)?;
        if optional && receiver.is_optional() {
            Some(Type::optional(ty))
        } else {
            Some(ty)
        }
    }

    /// Record a write to the declaration an assignment target refers to.
    pub(crate) fn mark_written(&mut self, target: &Expr) {
        let tracked = match &target.kind {
            ExprKind::Variable(_) => self.facts.binding(target.id),
            ExprKind::Member { target: receiver, .. } if matches!(receiver.kind, ExprKind::SelfRef) => {
                self.facts.binding(target.id)
            }
            _ => None,
        };
        if let Some(declaration) = tracked {
            self.record_mutation(declaration);
        }
    }

    // ==========================================================================
    // Operators
    // ==========================================================================

    fn check_binary(&mut self, expr: &Expr, op: BinaryOp, left: &Expr, right: &Expr) -> Option<Type> {
        let left_type = self.check_expr(left);
        let right_type = self.check_expr(right);
        match op {
            BinaryOp::And | BinaryOp::Or => {
                self.check_condition(left_type.as_ref(), left.id, left.span);
                self.check_condition(right_type.as_ref(), right.id, right.span);
                self.model.builtins.bool_type()
            }
            BinaryOp::Equal | BinaryOp::NotEqual | BinaryOp::Identical | BinaryOp::NotIdentical => {
                self.model.builtins.bool_type()
            }
            BinaryOp::NullCoalesce => match (left_type, right_type) {
                (Some(Type::Literal(crate::types::LiteralType::Null)), right) => right,
                (Some(left), Some(right)) => {
                    let base = left.non_optional().clone();
                    Some(combine_or_union(self.model, &[base, right]))
                }
                _ => None,
            },
            _ => {
                let operator = match op {
                    BinaryOp::Add => OperatorKind::Add,
                    BinaryOp::Subtract => OperatorKind::Subtract,
                    BinaryOp::Multiply => OperatorKind::Multiply,
                    BinaryOp::Divide => OperatorKind::Divide,
                    BinaryOp::Less => OperatorKind::Less,
                    BinaryOp::Greater => OperatorKind::Greater,
                    BinaryOp::LessOrEqual => OperatorKind::LessOrEqual,
                    _ => OperatorKind::GreaterOrEqual,
                };
                let left_type = left_type?;
                self.resolve_operator(expr, &left_type, operator, &[right_type])
            }
        }
    }

    fn check_unary(&mut self, expr: &Expr, op: UnaryOp, operand: &Expr) -> Option<Type> {
        let ty = self.check_expr(operand);
        match op {
            UnaryOp::Not => {
                self.check_condition(ty.as_ref(), operand.id, operand.span);
                self.model.builtins.bool_type()
            }
            UnaryOp::Negate => {
                let ty = ty?;
                self.resolve_operator(expr, &ty, OperatorKind::Negate, &[])
            }
        }
    }

    fn check_assign(&mut self, expr: &Expr, op: Option<BinaryOp>, target: &Expr, value: &Expr) -> Option<Type> {
        let value_type = self.check_expr(value);
        let target_type = self.check_expr(target);
        self.mark_written(target);

        let stored = match op {
            None => value_type,
            Some(op) => {
                let operator = match op {
                    BinaryOp::Add => OperatorKind::Add,
                    BinaryOp::Subtract => OperatorKind::Subtract,
                    BinaryOp::Multiply => OperatorKind::Multiply,
                    _ => OperatorKind::Divide,
                };
                match &target_type {
                    Some(target_type) => self.resolve_operator(expr, target_type, operator, &[value_type]),
                    None => None,
                }
            }
        };

        // A local declared without type and value takes the type of its first assignment.
        if let (None, Some(declaration), Some(stored)) = (&target_type, self.facts.binding(target.id), &stored) {
            if self.model[declaration].ty.is_none() && self.model[declaration].kind == DeclarationKind::LocalVariable {
                self.model[declaration].ty = Some(stored.clone());
                self.facts.expression_types.insert(target.id, stored.clone());
                return Some(stored.clone());
            }
        }

        if let (Some(target_type), Some(stored)) = (&target_type, &stored) {
            self.check_assignable(target_type, stored, value.id, value.span);
        }
        target_type
    }

    // ==========================================================================
    // Closures
    // ==========================================================================

    fn check_closure(&mut self, expr: &Expr, closure: &Closure) -> Option<Type> {
        let scope = self.declarations.scope_of(expr.id).unwrap_or(self.scope());
        let mut parameters = Vec::with_capacity(closure.parameters.len());
        for parameter in &closure.parameters {
            let ty = parameter.ty.as_ref().and_then(|ty| self.resolve_type_in(ty, scope));
            let ty = match (ty, parameter.variadic) {
                (Some(ty), true) => Some(Type::plural(ty)),
                (ty, _) => ty,
            };
            if let Some(declaration) = self.declarations.value_of(parameter.id) {
                self.model[declaration].ty = ty.clone();
            }
            parameters.push(ty);
        }
        let declared_return = match &closure.return_type {
            Some(return_type) => Some(self.resolve_type_in(return_type, scope)?),
            None => None,
        };

        let context = CallableContext {
            owner: self.context().owner,
            return_type: declared_return.clone(),
            is_initializer: false,
            returned: Vec::new(),
        };
        let (_, returned) = self.in_callable(scope, context, |checker| checker.check_block(&closure.body));

        let return_type = declared_return.unwrap_or_else(|| match returned.is_empty() {
            true => Type::NOTHING,
            false => combine_or_union(self.model, &returned),
        });
        let parameters: Vec<Type> = parameters.into_iter().collect::<Option<_>>()?;
        Some(Type::Function(FunctionType {
            signatures: vec![FunctionSignature {
                is_variadic: closure.parameters.last().is_some_and(|p| p.variadic),
                parameters,
                return_type: Box::new(return_type),
            }],
        }))
    }
}
