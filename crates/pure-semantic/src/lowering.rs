//! Lowering of analysed programs for code generation.
//!
//! [`lower_program`] turns the syntax tree and the side tables of an
//! [`AnalysisResult`] into a tree a backend can emit without looking at any
//! analysis bookkeeping:
//!
//! - names are replaced by the declarations they bind to
//! - operators, calls and constructions carry their resolved signature
//! - implicit conversions become explicit [`LoweredExprKind::Convert`] nodes
//! - side-effect free expressions with a static value become constants
//! - unreachable statements are omitted
//!
//! A backend implements [`EmissionBackend`] and is driven by [`emit`].

use pure_core::{DeclId, LiteralValue, NodeId, SignatureId};

use crate::AnalysisResult;
use crate::ast::{
    BinaryOp, Block, ComputedPropertyDef, Expr, ExprKind, Generator, Member, Program, SourceFile, StepDirection,
    Stmt, StmtKind, UnaryOp,
};
use crate::facts::CallKind;
use crate::model::DeclarationKind;
use crate::types::Type;

// ============================================================================
// Lowered tree
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoweredProgram {
    pub property_defaults: Vec<PropertyDefault>,
    pub callables: Vec<LoweredCallable>,
}

impl LoweredProgram {
    pub fn callable(&self, name: &str) -> Option<&LoweredCallable> {
        self.callables.iter().find(|callable| callable.name == name)
    }
}

/// Default value of a property, evaluated when an instance is created.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDefault {
    pub property: DeclId,
    pub value: LoweredExpr,
}

/// A body to emit: a function, accessor, operator, initializer or the
/// top-level statements of a file.
#[derive(Debug, Clone, PartialEq)]
pub struct LoweredCallable {
    /// Rendered signature, or the file name for top-level statements.
    pub name: String,
    pub signature: Option<SignatureId>,
    pub parameters: Vec<LoweredParameter>,
    pub body: Vec<LoweredStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredParameter {
    pub name: String,
    pub ty: Option<Type>,
    /// Local the parameter is bound to.
    pub declaration: Option<DeclId>,
    /// Property an initializer parameter assigns.
    pub property: Option<DeclId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredStmt {
    pub line: u32,
    pub kind: LoweredStmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoweredStmtKind {
    Expr(LoweredExpr),
    Declare {
        variable: Option<DeclId>,
        value: Option<LoweredExpr>,
    },
    Loop {
        generator: Option<LoweredGenerator>,
        body: Vec<LoweredStmt>,
    },
    Break,
    Next,
    Return(Option<LoweredExpr>),
    Raise(LoweredExpr),
    Handle {
        main: Vec<LoweredStmt>,
        handlers: Vec<LoweredHandler>,
        always: Option<Vec<LoweredStmt>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoweredGenerator {
    While {
        condition: LoweredExpr,
        post_condition: bool,
        until: bool,
    },
    Over {
        collection: LoweredExpr,
        binding: Option<DeclId>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredHandler {
    pub ty: Option<Type>,
    pub binding: Option<DeclId>,
    pub body: Vec<LoweredStmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoweredExpr {
    pub ty: Option<Type>,
    pub kind: LoweredExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoweredExprKind {
    Constant(LiteralValue),
    Load(DeclId),
    SelfRef,
    Field {
        target: Box<LoweredExpr>,
        member: DeclId,
        optional: bool,
    },
    /// A call with a resolved target. Operators receive their left operand
    /// as receiver.
    Call {
        signature: SignatureId,
        kind: CallKind,
        receiver: Option<Box<LoweredExpr>>,
        arguments: Vec<LoweredExpr>,
    },
    /// A call of a function value.
    Invoke {
        callee: Box<LoweredExpr>,
        arguments: Vec<LoweredExpr>,
    },
    Convert {
        initializer: SignatureId,
        value: Box<LoweredExpr>,
    },
    /// Logical, equality and null-coalescing operators, and operators that
    /// did not resolve.
    Binary {
        op: BinaryOp,
        left: Box<LoweredExpr>,
        right: Box<LoweredExpr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<LoweredExpr>,
    },
    Store {
        target: Box<LoweredExpr>,
        value: Box<LoweredExpr>,
    },
    If {
        condition: Box<LoweredExpr>,
        positive: Vec<LoweredStmt>,
        negative: Option<Vec<LoweredStmt>>,
    },
    Switch {
        subject: Box<LoweredExpr>,
        cases: Vec<(LoweredExpr, Vec<LoweredStmt>)>,
        else_branch: Option<Vec<LoweredStmt>>,
    },
    HasValue(Box<LoweredExpr>),
    IsCheck {
        subject: Box<LoweredExpr>,
        ty: Option<Type>,
        negated: bool,
    },
    Closure {
        parameters: Vec<Option<DeclId>>,
        body: Vec<LoweredStmt>,
    },
    /// A name or member that did not resolve.
    Unresolved,
}

// ============================================================================
// Backend contract
// ============================================================================

/// Receives a lowered program, one item at a time.
pub trait EmissionBackend {
    type Output;
    type Error;

    fn property_default(&mut self, _default: &PropertyDefault) -> Result<(), Self::Error> {
        Ok(())
    }

    fn callable(&mut self, callable: &LoweredCallable) -> Result<(), Self::Error>;

    fn finish(self) -> Result<Self::Output, Self::Error>;
}

/// Feed a lowered program to a backend: property defaults first, then the
/// callables in analysis order.
pub fn emit<B: EmissionBackend>(program: &LoweredProgram, mut backend: B) -> Result<B::Output, B::Error> {
    for default in &program.property_defaults {
        backend.property_default(default)?;
    }
    for callable in &program.callables {
        backend.callable(callable)?;
    }
    backend.finish()
}

// ============================================================================
// Lowering
// ============================================================================

/// Lower the files of `program`. The prelude is never lowered.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower_program(program: &Program, result: &AnalysisResult) -> LoweredProgram {
    let mut lowerer = Lowerer {
        result,
        output: LoweredProgram::default(),
    };
    for file in &program.files {
        lowerer.lower_file(file);
    }
    tracing::debug!(
        callables = lowerer.output.callables.len(),
        defaults = lowerer.output.property_defaults.len(),
        "program lowered"
    );
    lowerer.output
}

struct Lowerer<'r> {
    result: &'r AnalysisResult,
    output: LoweredProgram,
}

impl Lowerer<'_> {
    fn lower_file(&mut self, file: &SourceFile) {
        for def in &file.types {
            for member in &def.members {
                match member {
                    Member::Property(property) => {
                        let (Some(declaration), Some(value)) =
                            (self.result.declarations.value_of(property.id), &property.value)
                        else {
                            continue;
                        };
                        let value = self.lower_expr(value);
                        self.output.property_defaults.push(PropertyDefault {
                            property: declaration,
                            value,
                        });
                    }
                    Member::Computed(computed) => self.lower_accessors(computed),
                    Member::Function(function) if !function.is_native => {
                        self.lower_callable(function.id, function.body.as_ref());
                    }
                    Member::Initializer(initializer) if !initializer.is_native => {
                        self.lower_callable(initializer.id, initializer.body.as_ref());
                    }
                    Member::Operator(operator) if !operator.is_native => {
                        self.lower_callable(operator.id, operator.body.as_ref());
                    }
                    _ => {}
                }
            }
            if let Some(id) = self.result.declarations.type_of(def.id) {
                if let Some(signature) = self.result.declarations.synthesized.get(&id).copied() {
                    self.push_callable(signature, Vec::new());
                }
            }
        }
        for function in file.functions.iter().filter(|function| !function.is_native) {
            self.lower_callable(function.id, function.body.as_ref());
        }
        let body = self.lower_block(&file.body);
        self.output.callables.push(LoweredCallable {
            name: file.name.clone(),
            signature: None,
            parameters: Vec::new(),
            body,
        });
    }

    fn lower_accessors(&mut self, def: &ComputedPropertyDef) {
        if let Some(getter) = &def.getter {
            if let Some(signature) = self.result.declarations.signature_of(getter.id) {
                let value = self.lower_expr(getter);
                let line = getter.span.line;
                let body = vec![LoweredStmt {
                    line,
                    kind: LoweredStmtKind::Return(Some(value)),
                }];
                self.push_callable(signature, body);
            }
        }
        if let Some(setter) = &def.setter {
            if let Some(signature) = self.result.declarations.signature_of(setter.id) {
                let body = self.lower_block(setter);
                self.push_callable(signature, body);
            }
        }
    }

    fn lower_callable(&mut self, node: NodeId, body: Option<&Block>) {
        let Some(signature) = self.result.declarations.signature_of(node) else {
            return;
        };
        let body = body.map(|body| self.lower_block(body)).unwrap_or_default();
        self.push_callable(signature, body);
    }

    fn push_callable(&mut self, signature: SignatureId, body: Vec<LoweredStmt>) {
        let model = &self.result.model;
        let parameters = model[signature]
            .parameters
            .iter()
            .map(|parameter| LoweredParameter {
                name: parameter.name.clone(),
                ty: parameter.ty.clone(),
                declaration: parameter.declaration,
                property: parameter.property,
            })
            .collect();
        self.output.callables.push(LoweredCallable {
            name: model.display_signature(signature).to_string(),
            signature: Some(signature),
            parameters,
            body,
        });
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn lower_block(&self, block: &Block) -> Vec<LoweredStmt> {
        block
            .statements
            .iter()
            .filter(|statement| !self.result.flow.is_unreachable(statement.id))
            .map(|statement| self.lower_statement(statement))
            .collect()
    }

    fn lower_statement(&self, statement: &Stmt) -> LoweredStmt {
        let kind = match &statement.kind {
            StmtKind::Expr(expr) => LoweredStmtKind::Expr(self.lower_expr(expr)),
            StmtKind::Variable(def) => LoweredStmtKind::Declare {
                variable: self.result.declarations.value_of(statement.id),
                value: def.value.as_ref().map(|value| self.lower_expr(value)),
            },
            StmtKind::Loop(loop_stmt) => {
                let generator = loop_stmt.generator.as_ref().map(|generator| match generator {
                    Generator::While {
                        condition,
                        post_condition,
                        until,
                    } => LoweredGenerator::While {
                        condition: self.lower_expr(condition),
                        post_condition: *post_condition,
                        until: *until,
                    },
                    Generator::Over { collection, binding } => LoweredGenerator::Over {
                        collection: self.lower_expr(collection),
                        binding: binding
                            .as_ref()
                            .and_then(|binding| self.result.declarations.value_of(binding.id)),
                    },
                });
                LoweredStmtKind::Loop {
                    generator,
                    body: self.lower_block(&loop_stmt.body),
                }
            }
            StmtKind::Break => LoweredStmtKind::Break,
            StmtKind::Next => LoweredStmtKind::Next,
            StmtKind::Return(value) => LoweredStmtKind::Return(value.as_ref().map(|value| self.lower_expr(value))),
            StmtKind::Raise(value) => LoweredStmtKind::Raise(self.lower_expr(value)),
            StmtKind::Handle(handle) => LoweredStmtKind::Handle {
                main: self.lower_block(&handle.main),
                handlers: handle
                    .handlers
                    .iter()
                    .map(|handler| LoweredHandler {
                        ty: self.result.types.resolved_type(handler.ty.id).cloned(),
                        binding: handler
                            .binding
                            .as_ref()
                            .and_then(|binding| self.result.declarations.value_of(binding.id)),
                        body: self.lower_block(&handler.body),
                    })
                    .collect(),
                always: handle.always.as_ref().map(|always| self.lower_block(always)),
            },
        };
        LoweredStmt {
            line: statement.span.line,
            kind,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    /// Lower an expression together with the conversion applied to it.
    fn lower_expr(&self, expr: &Expr) -> LoweredExpr {
        let lowered = self.lower_unconverted(expr);
        match self.result.types.conversions.get(&expr.id).and_then(|c| c.initializer()) {
            Some(initializer) => self.convert(initializer, lowered),
            None => lowered,
        }
    }

    fn convert(&self, initializer: SignatureId, value: LoweredExpr) -> LoweredExpr {
        let ty = self.result.model[initializer].owner.map(|owner| self.result.model.instance_type(owner));
        LoweredExpr {
            ty,
            kind: LoweredExprKind::Convert {
                initializer,
                value: Box::new(value),
            },
        }
    }

    fn lower_unconverted(&self, expr: &Expr) -> LoweredExpr {
        if is_pure(expr) {
            if let Some(value) = self.result.flow.value_of(expr.id) {
                return LoweredExpr {
                    ty: self.result.types.type_of(expr.id).cloned(),
                    kind: LoweredExprKind::Constant(value.clone()),
                };
            }
        }
        self.lower_place(expr)
    }

    /// Lower an expression without replacing it by its static value.
    /// Assignment targets are lowered this way.
    fn lower_place(&self, expr: &Expr) -> LoweredExpr {
        let ty = self.result.types.type_of(expr.id).cloned();
        let kind = match &expr.kind {
            ExprKind::Literal(value) => LoweredExprKind::Constant(value.clone()),
            ExprKind::Variable(_) => self.lower_name(expr),
            ExprKind::SelfRef | ExprKind::SuperRef => LoweredExprKind::SelfRef,
            ExprKind::Member { target, optional, .. } => match self.result.types.binding(expr.id) {
                Some(member) => LoweredExprKind::Field {
                    target: Box::new(self.lower_expr(target)),
                    member,
                    optional: *optional,
                },
                None => LoweredExprKind::Unresolved,
            },
            ExprKind::Call { callee, arguments, .. } => self.lower_call(expr, callee, arguments),
            ExprKind::Binary { op, left, right } => self.lower_operator(expr, *op, left, right),
            ExprKind::Unary { op, operand } => {
                let operand = Box::new(self.lower_expr(operand));
                match self.result.types.call(expr.id) {
                    Some(resolution) if *op == UnaryOp::Negate => LoweredExprKind::Call {
                        signature: resolution.signature,
                        kind: resolution.kind,
                        receiver: Some(operand),
                        arguments: Vec::new(),
                    },
                    _ => LoweredExprKind::Unary { op: *op, operand },
                }
            }
            ExprKind::Assign { op, target, value } => {
                let stored = match op {
                    None => self.lower_expr(value),
                    Some(op) => LoweredExpr {
                        ty: ty.clone(),
                        kind: self.lower_operator(expr, *op, target, value),
                    },
                };
                LoweredExprKind::Store {
                    target: Box::new(self.lower_place(target)),
                    value: Box::new(stored),
                }
            }
            ExprKind::Step { target, direction } => {
                let current = self.lower_place(target);
                let stepped = match self.result.types.call(expr.id) {
                    Some(resolution) => LoweredExprKind::Call {
                        signature: resolution.signature,
                        kind: resolution.kind,
                        receiver: Some(Box::new(current.clone())),
                        arguments: Vec::new(),
                    },
                    None => {
                        let op = match direction {
                            StepDirection::Increment => BinaryOp::Add,
                            StepDirection::Decrement => BinaryOp::Subtract,
                        };
                        LoweredExprKind::Binary {
                            op,
                            left: Box::new(current.clone()),
                            right: Box::new(LoweredExpr {
                                ty: ty.clone(),
                                kind: LoweredExprKind::Constant(LiteralValue::Int(1)),
                            }),
                        }
                    }
                };
                LoweredExprKind::Store {
                    target: Box::new(current),
                    value: Box::new(LoweredExpr {
                        ty: ty.clone(),
                        kind: stepped,
                    }),
                }
            }
            ExprKind::If(if_expr) => LoweredExprKind::If {
                condition: Box::new(self.lower_expr(&if_expr.condition)),
                positive: self.lower_block(&if_expr.positive),
                negative: if_expr.negative.as_ref().map(|negative| self.lower_block(negative)),
            },
            ExprKind::Switch(switch) => LoweredExprKind::Switch {
                subject: Box::new(self.lower_expr(&switch.subject)),
                cases: switch
                    .cases
                    .iter()
                    .map(|case| (self.lower_expr(&case.condition), self.lower_block(&case.body)))
                    .collect(),
                else_branch: switch.else_branch.as_ref().map(|branch| self.lower_block(branch)),
            },
            ExprKind::HasValue(subject) => LoweredExprKind::HasValue(Box::new(self.lower_expr(subject))),
            ExprKind::IsCheck { subject, ty, negated } => LoweredExprKind::IsCheck {
                subject: Box::new(self.lower_expr(subject)),
                ty: self.result.types.resolved_type(ty.id).cloned(),
                negated: *negated,
            },
            ExprKind::Closure(closure) => LoweredExprKind::Closure {
                parameters: closure
                    .parameters
                    .iter()
                    .map(|parameter| self.result.declarations.value_of(parameter.id))
                    .collect(),
                body: self.lower_block(&closure.body),
            },
        };
        LoweredExpr { ty, kind }
    }

    /// A bare name: a local, a parameter, or a member of `self`.
    fn lower_name(&self, expr: &Expr) -> LoweredExprKind {
        let Some(declaration) = self.result.types.binding(expr.id) else {
            return LoweredExprKind::Unresolved;
        };
        let value = &self.result.model[declaration];
        let implicit_member = value.owner.is_some()
            && matches!(
                value.kind,
                DeclarationKind::Property | DeclarationKind::ComputedProperty | DeclarationKind::Function
            );
        if implicit_member && !value.is_static {
            return LoweredExprKind::Field {
                target: Box::new(LoweredExpr {
                    ty: None,
                    kind: LoweredExprKind::SelfRef,
                }),
                member: declaration,
                optional: false,
            };
        }
        LoweredExprKind::Load(declaration)
    }

    fn lower_call(&self, expr: &Expr, callee: &Expr, arguments: &[Expr]) -> LoweredExprKind {
        let Some(resolution) = self.result.types.call(expr.id) else {
            return LoweredExprKind::Invoke {
                callee: Box::new(self.lower_expr(callee)),
                arguments: arguments.iter().map(|argument| self.lower_expr(argument)).collect(),
            };
        };
        let receiver = match (&resolution.kind, &callee.kind) {
            (CallKind::Method, ExprKind::Member { target, .. }) => Some(Box::new(self.lower_expr(target))),
            (CallKind::Method, _) | (CallKind::Delegation, _) => Some(Box::new(LoweredExpr {
                ty: None,
                kind: LoweredExprKind::SelfRef,
            })),
            _ => None,
        };
        let arguments = arguments
            .iter()
            .enumerate()
            .map(|(index, argument)| {
                let lowered = self.lower_expr(argument);
                let converted_here = self.result.types.conversions.contains_key(&argument.id);
                match resolution.conversions.get(index).and_then(|c| c.initializer()) {
                    Some(initializer) if !converted_here => self.convert(initializer, lowered),
                    _ => lowered,
                }
            })
            .collect();
        LoweredExprKind::Call {
            signature: resolution.signature,
            kind: resolution.kind,
            receiver,
            arguments,
        }
    }

    /// A binary operator, as a call when it resolved to an operator
    /// signature.
    fn lower_operator(&self, expr: &Expr, op: BinaryOp, left: &Expr, right: &Expr) -> LoweredExprKind {
        let left = Box::new(self.lower_expr(left));
        let right = self.lower_expr(right);
        match self.result.types.call(expr.id) {
            Some(resolution) if resolution.kind == CallKind::Operator => {
                let right = match resolution.conversions.first().and_then(|c| c.initializer()) {
                    Some(initializer) => self.convert(initializer, right),
                    None => right,
                };
                LoweredExprKind::Call {
                    signature: resolution.signature,
                    kind: resolution.kind,
                    receiver: Some(left),
                    arguments: vec![right],
                }
            }
            _ => LoweredExprKind::Binary {
                op,
                left,
                right: Box::new(right),
            },
        }
    }
}

/// Expressions whose evaluation has no effect beyond their value.
fn is_pure(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Literal(_) | ExprKind::Variable(_) | ExprKind::SelfRef => true,
        ExprKind::Binary { left, right, .. } => is_pure(left) && is_pure(right),
        ExprKind::Unary { operand, .. } => is_pure(operand),
        _ => false,
    }
}
