//! Type expressions as written in source.

use pure_core::{NodeId, Span};

use crate::types::{UnionKind, Variance};

/// A type annotation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeExprKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// A named type, optionally with type arguments: `<Int>List`.
    ///
    /// The keyword types `Any`, `Never`, `Nothing` and `Null` are spelled
    /// as named types.
    Named {
        name: String,
        arguments: Vec<TypeArgumentExpr>,
    },
    /// `T?`
    Optional(Box<TypeExpr>),
    /// `A | B` or `A & B`
    Union {
        kind: UnionKind,
        members: Vec<TypeExpr>,
    },
    /// `(A, B) => R`
    Function {
        parameters: Vec<TypeExpr>,
        return_type: Option<Box<TypeExpr>>,
    },
    /// `Self`
    SelfType,
    /// `...T`
    Plural(Box<TypeExpr>),
}

/// A type argument with its use-site variance: `<Int producing>`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeArgumentExpr {
    pub variance: Variance,
    pub ty: TypeExpr,
}
