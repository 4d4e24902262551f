//! Statement nodes.

use pure_core::{NodeId, Span};

use super::{Expr, TypeExpr};

/// A brace-delimited statement list with its own scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub id: NodeId,
    pub span: Span,
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Span,
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Expr(Expr),
    /// `var` / `val` declaration. The statement node is the declaration.
    Variable(VariableDef),
    Loop(Box<LoopStmt>),
    Break,
    Next,
    Return(Option<Expr>),
    Raise(Expr),
    Handle(Box<HandleStmt>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariableDef {
    pub name: String,
    /// `val` rather than `var`.
    pub constant: bool,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopStmt {
    pub generator: Option<Generator>,
    pub body: Block,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Generator {
    /// `loop while c {}`, `loop until c {}` and their post-condition forms
    /// `loop {} while c` / `loop {} until c`.
    While {
        condition: Expr,
        post_condition: bool,
        until: bool,
    },
    /// `loop over collection as binding {}`
    Over {
        collection: Expr,
        binding: Option<Binding>,
    },
}

/// A name introduced by a generator or handler.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
}

/// `{ main } handle T e { ... } always { ... }`
#[derive(Debug, Clone, PartialEq)]
pub struct HandleStmt {
    pub main: Block,
    pub handlers: Vec<Handler>,
    pub always: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Handler {
    pub id: NodeId,
    pub span: Span,
    pub ty: TypeExpr,
    pub binding: Option<Binding>,
    pub body: Block,
}
