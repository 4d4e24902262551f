//! Expression nodes.

use pure_core::{LiteralValue, NodeId, Span};

use super::{Block, ParameterDef, TypeExpr};

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(LiteralValue),
    /// A bare name: local, parameter, property, function or type.
    Variable(String),
    /// `self`
    SelfRef,
    /// `super`
    SuperRef,
    /// `target.name` or `target?.name`
    Member {
        target: Box<Expr>,
        name: String,
        optional: bool,
    },
    /// `callee(arguments)` with optional explicit type arguments.
    Call {
        callee: Box<Expr>,
        type_arguments: Vec<TypeExpr>,
        arguments: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// `target = value`, or `target op= value` when `op` is set.
    Assign {
        op: Option<BinaryOp>,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    /// `target++` / `target--`
    Step {
        target: Box<Expr>,
        direction: StepDirection,
    },
    If(Box<IfExpr>),
    Switch(Box<SwitchExpr>),
    /// `subject?`
    HasValue(Box<Expr>),
    /// `subject is T` / `subject is! T`
    IsCheck {
        subject: Box<Expr>,
        ty: TypeExpr,
        negated: bool,
    },
    Closure(Box<Closure>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    And,
    Or,
    NullCoalesce,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Less => "<",
            BinaryOp::Greater => ">",
            BinaryOp::LessOrEqual => "<=",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::NullCoalesce => "??",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    /// `!`
    Not,
    /// `-`
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepDirection {
    Increment,
    Decrement,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfExpr {
    pub condition: Expr,
    pub positive: Block,
    pub negative: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchExpr {
    pub subject: Expr,
    pub cases: Vec<SwitchCase>,
    pub else_branch: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    pub id: NodeId,
    pub span: Span,
    pub condition: Expr,
    pub body: Block,
}

/// An anonymous function.
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub parameters: Vec<ParameterDef>,
    pub return_type: Option<TypeExpr>,
    pub body: Block,
}
