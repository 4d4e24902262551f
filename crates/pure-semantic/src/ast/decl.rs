//! Declarations: files, types and their members.

use pure_core::{NodeId, Span};

use super::{Block, Expr, TypeExpr};

/// All files analysed together.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub files: Vec<SourceFile>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub id: NodeId,
    pub name: String,
    pub types: Vec<TypeDef>,
    pub functions: Vec<FunctionDef>,
    /// Top-level statements.
    pub body: Block,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeDefKind {
    Class,
    Object,
    /// Abstract interface; never instantiated and has no initializers.
    Trait,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TypeDef {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub kind: TypeDefKind,
    pub generics: Vec<GenericParameterDef>,
    pub supertypes: Vec<TypeExpr>,
    pub is_abstract: bool,
    pub members: Vec<Member>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenericParameterDef {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub bound: Option<TypeExpr>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Member {
    Property(PropertyDef),
    Computed(ComputedPropertyDef),
    Function(FunctionDef),
    Initializer(InitializerDef),
    Operator(OperatorDef),
}

impl Member {
    pub fn id(&self) -> NodeId {
        match self {
            Member::Property(def) => def.id,
            Member::Computed(def) => def.id,
            Member::Function(def) => def.id,
            Member::Initializer(def) => def.id,
            Member::Operator(def) => def.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub constant: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    pub ty: Option<TypeExpr>,
    pub value: Option<Expr>,
}

/// `computed name: T gets expr sets { ... }`
///
/// The setter receives the assigned value as `newValue`.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedPropertyDef {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub ty: TypeExpr,
    pub getter: Option<Expr>,
    pub setter: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    pub generics: Vec<GenericParameterDef>,
    pub parameters: Vec<ParameterDef>,
    pub return_type: Option<TypeExpr>,
    pub where_clauses: Vec<WhereClauseDef>,
    pub is_abstract: bool,
    pub is_overriding: bool,
    /// Implemented outside the analysed program.
    pub is_native: bool,
    pub body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDef {
    pub id: NodeId,
    pub span: Span,
    pub name: String,
    /// Initializer parameters without a type name a property to initialize.
    pub ty: Option<TypeExpr>,
    /// Absorbs the remaining arguments; the declared type is the element type.
    pub variadic: bool,
}

/// `where Element is Number`
#[derive(Debug, Clone, PartialEq)]
pub struct WhereClauseDef {
    pub id: NodeId,
    pub span: Span,
    pub parameter: String,
    pub constraint: TypeExpr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InitializerDef {
    pub id: NodeId,
    pub span: Span,
    pub generics: Vec<GenericParameterDef>,
    pub parameters: Vec<ParameterDef>,
    /// Implicitly applied to bridge assignability gaps.
    pub is_converting: bool,
    pub is_native: bool,
    pub body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorDef {
    pub id: NodeId,
    pub span: Span,
    pub operator: OperatorKind,
    pub parameters: Vec<ParameterDef>,
    pub return_type: Option<TypeExpr>,
    pub is_native: bool,
    pub body: Option<Block>,
}

/// Overloadable operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Greater,
    LessOrEqual,
    GreaterOrEqual,
    Negate,
    Increment,
    Decrement,
}

impl OperatorKind {
    pub fn symbol(self) -> &'static str {
        match self {
            OperatorKind::Add => "+",
            OperatorKind::Subtract => "-",
            OperatorKind::Multiply => "*",
            OperatorKind::Divide => "/",
            OperatorKind::Less => "<",
            OperatorKind::Greater => ">",
            OperatorKind::LessOrEqual => "<=",
            OperatorKind::GreaterOrEqual => ">=",
            OperatorKind::Negate => "-",
            OperatorKind::Increment => "++",
            OperatorKind::Decrement => "--",
        }
    }
}
