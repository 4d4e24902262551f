//! Programmatic construction of syntax trees.
//!
//! The parser lives outside this crate; callers that construct trees
//! directly (tests, benches, embedders) use [`Builder`]. It hands out node
//! ids and stamps every node with the current line, set through
//! [`Builder::at`]. Methods take `&self` so calls can nest:
//!
//! ```
//! use pure_semantic::ast::Builder;
//!
//! let b = Builder::new();
//! let body = b.block(vec![
//!     b.at(1).var_decl("a", None, Some(b.int(0))),
//!     b.at(2).expr_stmt(b.var("a")),
//! ]);
//! let file = b.file("main", body);
//! assert_eq!(file.body.statements.len(), 2);
//! ```
//!
//! Constructs whose children usually sit on later lines (loops, handle
//! blocks, closures, definitions) take their line explicitly, because their
//! arguments are built before the node itself.

use std::cell::Cell;

use pure_core::{LiteralValue, NodeId, Span};

use super::*;
use crate::types::{UnionKind, Variance};

#[derive(Debug)]
pub struct Builder {
    next_id: Cell<u32>,
    line: Cell<u32>,
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}

impl Builder {
    pub fn new() -> Self {
        Self {
            next_id: Cell::new(0),
            line: Cell::new(1),
        }
    }

    /// Continue numbering after the ids of another builder's trees.
    ///
    /// Trees analysed together must not share node ids.
    pub fn continuing(previous: &Builder) -> Self {
        Self {
            next_id: Cell::new(previous.next_id.get()),
            line: Cell::new(1),
        }
    }

    /// Start numbering at `first`. Used for trees that are merged into
    /// programs built elsewhere, such as the prelude.
    pub fn with_first_id(first: u32) -> Self {
        Self {
            next_id: Cell::new(first),
            line: Cell::new(1),
        }
    }

    /// Set the line stamped on subsequently created nodes.
    pub fn at(&self, line: u32) -> &Self {
        self.line.set(line);
        self
    }

    fn id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        NodeId::new(id)
    }

    fn span(&self) -> Span {
        Span::new(self.line.get(), 1, 1)
    }

    fn span_at(line: u32) -> Span {
        Span::new(line, 1, 1)
    }

    fn expr(&self, kind: ExprKind) -> Expr {
        Expr {
            id: self.id(),
            span: self.span(),
            kind,
        }
    }

    fn expr_spanning(&self, span: Span, kind: ExprKind) -> Expr {
        Expr {
            id: self.id(),
            span,
            kind,
        }
    }

    // ========================================================================
    // Expressions
    // ========================================================================

    pub fn literal(&self, value: LiteralValue) -> Expr {
        self.expr(ExprKind::Literal(value))
    }

    pub fn int(&self, value: i64) -> Expr {
        self.literal(LiteralValue::Int(value))
    }

    pub fn float(&self, value: f64) -> Expr {
        self.literal(LiteralValue::float(value))
    }

    pub fn bool(&self, value: bool) -> Expr {
        self.literal(LiteralValue::Bool(value))
    }

    pub fn string(&self, value: &str) -> Expr {
        self.literal(LiteralValue::String(value.to_string()))
    }

    pub fn null(&self) -> Expr {
        self.literal(LiteralValue::Null)
    }

    pub fn var(&self, name: &str) -> Expr {
        self.expr(ExprKind::Variable(name.to_string()))
    }

    pub fn self_ref(&self) -> Expr {
        self.expr(ExprKind::SelfRef)
    }

    pub fn super_ref(&self) -> Expr {
        self.expr(ExprKind::SuperRef)
    }

    pub fn member(&self, target: Expr, name: &str) -> Expr {
        let span = target.span;
        self.expr_spanning(
            span,
            ExprKind::Member {
                target: Box::new(target),
                name: name.to_string(),
                optional: false,
            },
        )
    }

    pub fn optional_member(&self, target: Expr, name: &str) -> Expr {
        let span = target.span;
        self.expr_spanning(
            span,
            ExprKind::Member {
                target: Box::new(target),
                name: name.to_string(),
                optional: true,
            },
        )
    }

    pub fn call(&self, callee: Expr, arguments: Vec<Expr>) -> Expr {
        self.call_with_types(callee, Vec::new(), arguments)
    }

    pub fn call_with_types(
        &self,
        callee: Expr,
        type_arguments: Vec<TypeExpr>,
        arguments: Vec<Expr>,
    ) -> Expr {
        let span = callee.span;
        self.expr_spanning(
            span,
            ExprKind::Call {
                callee: Box::new(callee),
                type_arguments,
                arguments,
            },
        )
    }

    pub fn binary(&self, op: BinaryOp, left: Expr, right: Expr) -> Expr {
        let span = left.span;
        self.expr_spanning(
            span,
            ExprKind::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            },
        )
    }

    pub fn not(&self, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op: UnaryOp::Not,
            operand: Box::new(operand),
        })
    }

    pub fn negate(&self, operand: Expr) -> Expr {
        self.expr(ExprKind::Unary {
            op: UnaryOp::Negate,
            operand: Box::new(operand),
        })
    }

    pub fn assign(&self, target: Expr, value: Expr) -> Expr {
        let span = target.span;
        self.expr_spanning(
            span,
            ExprKind::Assign {
                op: None,
                target: Box::new(target),
                value: Box::new(value),
            },
        )
    }

    /// `target op= value`
    pub fn compound_assign(&self, op: BinaryOp, target: Expr, value: Expr) -> Expr {
        let span = target.span;
        self.expr_spanning(
            span,
            ExprKind::Assign {
                op: Some(op),
                target: Box::new(target),
                value: Box::new(value),
            },
        )
    }

    pub fn increment(&self, target: Expr) -> Expr {
        let span = target.span;
        self.expr_spanning(
            span,
            ExprKind::Step {
                target: Box::new(target),
                direction: StepDirection::Increment,
            },
        )
    }

    pub fn decrement(&self, target: Expr) -> Expr {
        let span = target.span;
        self.expr_spanning(
            span,
            ExprKind::Step {
                target: Box::new(target),
                direction: StepDirection::Decrement,
            },
        )
    }

    pub fn has_value(&self, subject: Expr) -> Expr {
        let span = subject.span;
        self.expr_spanning(span, ExprKind::HasValue(Box::new(subject)))
    }

    pub fn is_check(&self, subject: Expr, ty: TypeExpr) -> Expr {
        let span = subject.span;
        self.expr_spanning(
            span,
            ExprKind::IsCheck {
                subject: Box::new(subject),
                ty,
                negated: false,
            },
        )
    }

    pub fn is_not_check(&self, subject: Expr, ty: TypeExpr) -> Expr {
        let span = subject.span;
        self.expr_spanning(
            span,
            ExprKind::IsCheck {
                subject: Box::new(subject),
                ty,
                negated: true,
            },
        )
    }

    /// `if` expression positioned at its condition.
    pub fn if_expr(&self, condition: Expr, positive: Block, negative: Option<Block>) -> Expr {
        let span = condition.span;
        self.expr_spanning(
            span,
            ExprKind::If(Box::new(IfExpr {
                condition,
                positive,
                negative,
            })),
        )
    }

    /// `switch` expression positioned at its subject.
    pub fn switch(
        &self,
        subject: Expr,
        cases: Vec<SwitchCase>,
        else_branch: Option<Block>,
    ) -> Expr {
        let span = subject.span;
        self.expr_spanning(
            span,
            ExprKind::Switch(Box::new(SwitchExpr {
                subject,
                cases,
                else_branch,
            })),
        )
    }

    /// Switch case positioned at its condition.
    pub fn case(&self, condition: Expr, body: Block) -> SwitchCase {
        SwitchCase {
            id: self.id(),
            span: condition.span,
            condition,
            body,
        }
    }

    pub fn closure(
        &self,
        line: u32,
        parameters: Vec<ParameterDef>,
        return_type: Option<TypeExpr>,
        body: Block,
    ) -> Expr {
        self.expr_spanning(
            Self::span_at(line),
            ExprKind::Closure(Box::new(Closure {
                parameters,
                return_type,
                body,
            })),
        )
    }

    // ========================================================================
    // Statements
    // ========================================================================

    fn stmt(&self, span: Span, kind: StmtKind) -> Stmt {
        Stmt {
            id: self.id(),
            span,
            kind,
        }
    }

    pub fn block(&self, statements: Vec<Stmt>) -> Block {
        let span = statements.first().map(|s| s.span).unwrap_or_else(|| self.span());
        Block {
            id: self.id(),
            span,
            statements,
        }
    }

    pub fn expr_stmt(&self, expr: Expr) -> Stmt {
        let span = expr.span;
        self.stmt(span, StmtKind::Expr(expr))
    }

    /// `var name: ty = value`
    pub fn var_decl(&self, name: &str, ty: Option<TypeExpr>, value: Option<Expr>) -> Stmt {
        self.variable(name, false, ty, value)
    }

    /// `val name: ty = value`
    pub fn val_decl(&self, name: &str, ty: Option<TypeExpr>, value: Option<Expr>) -> Stmt {
        self.variable(name, true, ty, value)
    }

    fn variable(
        &self,
        name: &str,
        constant: bool,
        ty: Option<TypeExpr>,
        value: Option<Expr>,
    ) -> Stmt {
        let span = ty
            .as_ref()
            .map(|t| t.span)
            .or_else(|| value.as_ref().map(|v| v.span))
            .unwrap_or_else(|| self.span());
        self.stmt(
            span,
            StmtKind::Variable(VariableDef {
                name: name.to_string(),
                constant,
                ty,
                value,
            }),
        )
    }

    pub fn loop_stmt(&self, line: u32, generator: Option<Generator>, body: Block) -> Stmt {
        self.stmt(
            Self::span_at(line),
            StmtKind::Loop(Box::new(LoopStmt { generator, body })),
        )
    }

    /// `loop while condition`
    pub fn while_generator(&self, condition: Expr) -> Generator {
        Generator::While {
            condition,
            post_condition: false,
            until: false,
        }
    }

    /// `loop until condition`
    pub fn until_generator(&self, condition: Expr) -> Generator {
        Generator::While {
            condition,
            post_condition: false,
            until: true,
        }
    }

    /// `loop { } while condition`
    pub fn post_while_generator(&self, condition: Expr) -> Generator {
        Generator::While {
            condition,
            post_condition: true,
            until: false,
        }
    }

    /// `loop { } until condition`
    pub fn post_until_generator(&self, condition: Expr) -> Generator {
        Generator::While {
            condition,
            post_condition: true,
            until: true,
        }
    }

    /// `loop over collection as binding`
    pub fn over_generator(&self, collection: Expr, binding: Option<&str>) -> Generator {
        let span = collection.span;
        let binding = binding.map(|name| Binding {
            id: self.id(),
            span,
            name: name.to_string(),
        });
        Generator::Over {
            collection,
            binding,
        }
    }

    pub fn break_stmt(&self) -> Stmt {
        self.stmt(self.span(), StmtKind::Break)
    }

    pub fn next_stmt(&self) -> Stmt {
        self.stmt(self.span(), StmtKind::Next)
    }

    pub fn return_stmt(&self, value: Option<Expr>) -> Stmt {
        self.stmt(self.span(), StmtKind::Return(value))
    }

    pub fn raise_stmt(&self, value: Expr) -> Stmt {
        self.stmt(self.span(), StmtKind::Raise(value))
    }

    pub fn handle(
        &self,
        line: u32,
        main: Block,
        handlers: Vec<Handler>,
        always: Option<Block>,
    ) -> Stmt {
        self.stmt(
            Self::span_at(line),
            StmtKind::Handle(Box::new(HandleStmt {
                main,
                handlers,
                always,
            })),
        )
    }

    pub fn handler(&self, line: u32, ty: TypeExpr, binding: Option<&str>, body: Block) -> Handler {
        let binding = binding.map(|name| Binding {
            id: self.id(),
            span: Self::span_at(line),
            name: name.to_string(),
        });
        Handler {
            id: self.id(),
            span: Self::span_at(line),
            ty,
            binding,
            body,
        }
    }

    // ========================================================================
    // Types
    // ========================================================================

    fn type_expr(&self, kind: TypeExprKind) -> TypeExpr {
        TypeExpr {
            id: self.id(),
            span: self.span(),
            kind,
        }
    }

    pub fn ty(&self, name: &str) -> TypeExpr {
        self.generic_ty(name, Vec::new())
    }

    /// `<arguments>name`
    pub fn generic_ty(&self, name: &str, arguments: Vec<TypeArgumentExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Named {
            name: name.to_string(),
            arguments,
        })
    }

    pub fn arg(&self, ty: TypeExpr) -> TypeArgumentExpr {
        TypeArgumentExpr {
            variance: Variance::Invariant,
            ty,
        }
    }

    pub fn producing(&self, ty: TypeExpr) -> TypeArgumentExpr {
        TypeArgumentExpr {
            variance: Variance::Producing,
            ty,
        }
    }

    pub fn consuming(&self, ty: TypeExpr) -> TypeArgumentExpr {
        TypeArgumentExpr {
            variance: Variance::Consuming,
            ty,
        }
    }

    pub fn optional(&self, base: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Optional(Box::new(base)))
    }

    pub fn plural(&self, base: TypeExpr) -> TypeExpr {
        self.type_expr(TypeExprKind::Plural(Box::new(base)))
    }

    pub fn or_union(&self, members: Vec<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Union {
            kind: UnionKind::Or,
            members,
        })
    }

    pub fn and_union(&self, members: Vec<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Union {
            kind: UnionKind::And,
            members,
        })
    }

    pub fn function_ty(&self, parameters: Vec<TypeExpr>, return_type: Option<TypeExpr>) -> TypeExpr {
        self.type_expr(TypeExprKind::Function {
            parameters,
            return_type: return_type.map(Box::new),
        })
    }

    pub fn self_ty(&self) -> TypeExpr {
        self.type_expr(TypeExprKind::SelfType)
    }

    // ========================================================================
    // Definitions
    // ========================================================================

    pub fn file(&self, name: &str, body: Block) -> SourceFile {
        SourceFile {
            id: self.id(),
            name: name.to_string(),
            types: Vec::new(),
            functions: Vec::new(),
            body,
        }
    }

    pub fn type_def(&self, line: u32, name: &str, kind: TypeDefKind) -> TypeDef {
        TypeDef {
            id: self.id(),
            span: Self::span_at(line),
            name: name.to_string(),
            kind,
            generics: Vec::new(),
            supertypes: Vec::new(),
            is_abstract: false,
            members: Vec::new(),
        }
    }

    pub fn class(&self, line: u32, name: &str) -> TypeDef {
        self.type_def(line, name, TypeDefKind::Class)
    }

    pub fn object(&self, line: u32, name: &str) -> TypeDef {
        self.type_def(line, name, TypeDefKind::Object)
    }

    pub fn trait_def(&self, line: u32, name: &str) -> TypeDef {
        self.type_def(line, name, TypeDefKind::Trait)
    }

    pub fn generic(&self, line: u32, name: &str, bound: Option<TypeExpr>) -> GenericParameterDef {
        GenericParameterDef {
            id: self.id(),
            span: Self::span_at(line),
            name: name.to_string(),
            bound,
        }
    }

    /// `var name: ty = value` as a type member.
    pub fn property(
        &self,
        line: u32,
        name: &str,
        ty: Option<TypeExpr>,
        value: Option<Expr>,
    ) -> PropertyDef {
        PropertyDef {
            id: self.id(),
            span: Self::span_at(line),
            name: name.to_string(),
            constant: false,
            is_static: false,
            is_abstract: false,
            ty,
            value,
        }
    }

    /// `val name: ty = value` as a type member.
    pub fn constant_property(
        &self,
        line: u32,
        name: &str,
        ty: Option<TypeExpr>,
        value: Option<Expr>,
    ) -> PropertyDef {
        PropertyDef {
            constant: true,
            ..self.property(line, name, ty, value)
        }
    }

    pub fn computed(
        &self,
        line: u32,
        name: &str,
        ty: TypeExpr,
        getter: Option<Expr>,
        setter: Option<Block>,
    ) -> ComputedPropertyDef {
        ComputedPropertyDef {
            id: self.id(),
            span: Self::span_at(line),
            name: name.to_string(),
            ty,
            getter,
            setter,
        }
    }

    pub fn function(&self, line: u32, name: &str) -> FunctionDef {
        FunctionDef {
            id: self.id(),
            span: Self::span_at(line),
            name: name.to_string(),
            generics: Vec::new(),
            parameters: Vec::new(),
            return_type: None,
            where_clauses: Vec::new(),
            is_abstract: false,
            is_overriding: false,
            is_native: false,
            body: None,
        }
    }

    pub fn param(&self, line: u32, name: &str, ty: TypeExpr) -> ParameterDef {
        ParameterDef {
            id: self.id(),
            span: Self::span_at(line),
            name: name.to_string(),
            ty: Some(ty),
            variadic: false,
        }
    }

    /// `...name: ty`
    pub fn variadic_param(&self, line: u32, name: &str, ty: TypeExpr) -> ParameterDef {
        ParameterDef {
            variadic: true,
            ..self.param(line, name, ty)
        }
    }

    /// Initializer parameter that assigns the property of the same name.
    pub fn property_param(&self, line: u32, name: &str) -> ParameterDef {
        ParameterDef {
            id: self.id(),
            span: Self::span_at(line),
            name: name.to_string(),
            ty: None,
            variadic: false,
        }
    }

    pub fn where_clause(&self, line: u32, parameter: &str, constraint: TypeExpr) -> WhereClauseDef {
        WhereClauseDef {
            id: self.id(),
            span: Self::span_at(line),
            parameter: parameter.to_string(),
            constraint,
        }
    }

    pub fn initializer(&self, line: u32) -> InitializerDef {
        InitializerDef {
            id: self.id(),
            span: Self::span_at(line),
            generics: Vec::new(),
            parameters: Vec::new(),
            is_converting: false,
            is_native: false,
            body: None,
        }
    }

    pub fn operator(&self, line: u32, operator: OperatorKind) -> OperatorDef {
        OperatorDef {
            id: self.id(),
            span: Self::span_at(line),
            operator,
            parameters: Vec::new(),
            return_type: None,
            is_native: false,
            body: None,
        }
    }
}

// ============================================================================
// Chained definition setters
// ============================================================================

impl SourceFile {
    pub fn with_type(mut self, def: TypeDef) -> Self {
        self.types.push(def);
        self
    }

    pub fn with_function(mut self, def: FunctionDef) -> Self {
        self.functions.push(def);
        self
    }
}

impl Program {
    pub fn new(files: Vec<SourceFile>) -> Self {
        Self { files }
    }
}

impl TypeDef {
    pub fn with_generic(mut self, generic: GenericParameterDef) -> Self {
        self.generics.push(generic);
        self
    }

    pub fn with_supertype(mut self, supertype: TypeExpr) -> Self {
        self.supertypes.push(supertype);
        self
    }

    pub fn abstract_type(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn with_member(mut self, member: impl Into<Member>) -> Self {
        self.members.push(member.into());
        self
    }
}

impl PropertyDef {
    pub fn static_property(mut self) -> Self {
        self.is_static = true;
        self
    }

    pub fn abstract_property(mut self) -> Self {
        self.is_abstract = true;
        self
    }
}

impl FunctionDef {
    pub fn with_generic(mut self, generic: GenericParameterDef) -> Self {
        self.generics.push(generic);
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDef) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_return(mut self, return_type: TypeExpr) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn with_where(mut self, clause: WhereClauseDef) -> Self {
        self.where_clauses.push(clause);
        self
    }

    pub fn with_body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    pub fn native(mut self) -> Self {
        self.is_native = true;
        self
    }

    pub fn abstract_function(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    pub fn overriding(mut self) -> Self {
        self.is_overriding = true;
        self
    }
}

impl InitializerDef {
    pub fn with_generic(mut self, generic: GenericParameterDef) -> Self {
        self.generics.push(generic);
        self
    }

    pub fn with_parameter(mut self, parameter: ParameterDef) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    pub fn converting(mut self) -> Self {
        self.is_converting = true;
        self
    }

    pub fn native(mut self) -> Self {
        self.is_native = true;
        self
    }
}

impl OperatorDef {
    pub fn with_parameter(mut self, parameter: ParameterDef) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_return(mut self, return_type: TypeExpr) -> Self {
        self.return_type = Some(return_type);
        self
    }

    pub fn with_body(mut self, body: Block) -> Self {
        self.body = Some(body);
        self
    }

    pub fn native(mut self) -> Self {
        self.is_native = true;
        self
    }
}

impl From<PropertyDef> for Member {
    fn from(def: PropertyDef) -> Self {
        Member::Property(def)
    }
}

impl From<ComputedPropertyDef> for Member {
    fn from(def: ComputedPropertyDef) -> Self {
        Member::Computed(def)
    }
}

impl From<FunctionDef> for Member {
    fn from(def: FunctionDef) -> Self {
        Member::Function(def)
    }
}

impl From<InitializerDef> for Member {
    fn from(def: InitializerDef) -> Self {
        Member::Initializer(def)
    }
}

impl From<OperatorDef> for Member {
    fn from(def: OperatorDef) -> Self {
        Member::Operator(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let b = Builder::new();
        let first = b.int(1);
        let second = b.int(2);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn nodes_take_the_current_line() {
        let b = Builder::new();
        let read = b.at(4).var("a");
        assert_eq!(read.span.line, 4);

        let stmt = b.at(7).expr_stmt(b.binary(BinaryOp::Add, b.int(1), b.int(2)));
        assert_eq!(stmt.span.line, 7);
    }

    #[test]
    fn if_expression_is_positioned_at_its_condition() {
        let b = Builder::new();
        let expr = b.at(2).if_expr(
            b.bool(true),
            b.block(vec![b.at(3).expr_stmt(b.var("a"))]),
            Some(b.block(vec![b.at(5).expr_stmt(b.var("a"))])),
        );
        assert_eq!(expr.span.line, 2);
    }

    #[test]
    fn continuing_builder_keeps_ids_distinct() {
        let first = Builder::new();
        let a = first.int(0);
        let second = Builder::continuing(&first);
        let b = second.int(0);
        assert_ne!(a.id, b.id);
    }
}
