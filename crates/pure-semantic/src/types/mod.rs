//! The type lattice.
//!
//! [`Type`] is a closed set of variants compared structurally. Whether a
//! value of one type may be used where another is expected is decided only by
//! [`SemanticModel::accepts`](crate::model::SemanticModel::accepts), which
//! needs the model to walk declared super-types.
//!
//! A type that could not be determined is represented by `None` wherever an
//! `Option<Type>` appears. Checks involving an unknown type are skipped so a
//! single resolution failure does not cascade.

mod assignability;
mod combine;
mod display;
mod inference;
mod substitution;

pub use combine::combine_or_union;
pub use display::{SignatureDisplay, TypeDisplay};
pub use inference::{InferenceFailure, TypeInference};
pub use substitution::{Position, Substitution, bind, substitute};

use pure_core::TypeId;

/// The four keyword types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralType {
    /// Top type. Accepts everything.
    Any,
    /// Bottom type. Accepted by everything.
    Never,
    /// Absence of a value; the return type of procedures.
    Nothing,
    /// The type of `null`.
    Null,
}

impl LiteralType {
    pub fn name(self) -> &'static str {
        match self {
            LiteralType::Any => "Any",
            LiteralType::Never => "Never",
            LiteralType::Nothing => "Nothing",
            LiteralType::Null => "Null",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Any" => Some(LiteralType::Any),
            "Never" => Some(LiteralType::Never),
            "Nothing" => Some(LiteralType::Nothing),
            "Null" => Some(LiteralType::Null),
            _ => None,
        }
    }
}

/// Use-site variance of a type argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Variance {
    /// Must match exactly.
    #[default]
    Invariant,
    /// Covariant: the argument may only be read out.
    Producing,
    /// Contravariant: the argument may only be passed in.
    Consuming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnionKind {
    /// Satisfies every member. Used for where-clauses.
    And,
    /// Satisfies at least one member.
    Or,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeArgument {
    pub variance: Variance,
    pub ty: Type,
}

impl TypeArgument {
    pub fn invariant(ty: Type) -> Self {
        Self {
            variance: Variance::Invariant,
            ty,
        }
    }
}

/// An instance of a declared type. Generic parameters are also referenced
/// this way, with no arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectType {
    pub declaration: TypeId,
    pub arguments: Vec<TypeArgument>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnionType {
    pub kind: UnionKind,
    pub members: Vec<Type>,
}

/// One callable shape of a function type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionSignature {
    pub parameters: Vec<Type>,
    /// The last parameter is a plural type absorbing remaining arguments.
    pub is_variadic: bool,
    pub return_type: Box<Type>,
}

/// The type of a function value: one entry per overload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionType {
    pub signatures: Vec<FunctionSignature>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    Literal(LiteralType),
    Object(ObjectType),
    Optional(Box<Type>),
    Union(UnionType),
    Function(FunctionType),
    /// The type of a type name used as a value: `Int` in `Int(5)`.
    Static(TypeId),
    /// `Self` inside the declaration of the given type.
    SelfType(TypeId),
    /// Variadic element list: `...T`.
    Plural(Box<Type>),
}

impl Type {
    pub const ANY: Type = Type::Literal(LiteralType::Any);
    pub const NEVER: Type = Type::Literal(LiteralType::Never);
    pub const NOTHING: Type = Type::Literal(LiteralType::Nothing);
    pub const NULL: Type = Type::Literal(LiteralType::Null);

    /// Non-generic object type.
    pub fn object(declaration: TypeId) -> Type {
        Type::Object(ObjectType {
            declaration,
            arguments: Vec::new(),
        })
    }

    /// Object type with invariant arguments.
    pub fn generic(declaration: TypeId, arguments: Vec<Type>) -> Type {
        Type::Object(ObjectType {
            declaration,
            arguments: arguments.into_iter().map(TypeArgument::invariant).collect(),
        })
    }

    /// `base?`. Optional and null types are not wrapped again.
    pub fn optional(base: Type) -> Type {
        match base {
            Type::Optional(_) | Type::Literal(LiteralType::Null) => base,
            other => Type::Optional(Box::new(other)),
        }
    }

    pub fn plural(base: Type) -> Type {
        Type::Plural(Box::new(base))
    }

    pub fn or(members: Vec<Type>) -> Type {
        Type::Union(UnionType {
            kind: UnionKind::Or,
            members,
        })
    }

    pub fn and(members: Vec<Type>) -> Type {
        Type::Union(UnionType {
            kind: UnionKind::And,
            members,
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Type::Literal(LiteralType::Null))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, Type::Optional(_))
    }

    /// The declaration of an object type.
    pub fn declaration(&self) -> Option<TypeId> {
        match self {
            Type::Object(object) => Some(object.declaration),
            _ => None,
        }
    }

    /// Strip one level of optionality.
    pub fn non_optional(&self) -> &Type {
        match self {
            Type::Optional(base) => base,
            other => other,
        }
    }

    /// Whether the type refers to the given generic parameter anywhere.
    pub fn mentions(&self, parameter: TypeId) -> bool {
        match self {
            Type::Literal(_) => false,
            Type::Object(object) => {
                object.declaration == parameter
                    || object.arguments.iter().any(|a| a.ty.mentions(parameter))
            }
            Type::Optional(base) | Type::Plural(base) => base.mentions(parameter),
            Type::Union(union) => union.members.iter().any(|m| m.mentions(parameter)),
            Type::Function(function) => function.signatures.iter().any(|s| {
                s.parameters.iter().any(|p| p.mentions(parameter)) || s.return_type.mentions(parameter)
            }),
            Type::Static(_) | Type::SelfType(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_does_not_nest() {
        let int = Type::object(TypeId::new(0));
        let optional = Type::optional(int.clone());
        assert_eq!(Type::optional(optional.clone()), optional);
        assert_eq!(Type::optional(Type::NULL), Type::NULL);
        assert_eq!(optional.non_optional(), &int);
    }

    #[test]
    fn mentions_walks_nested_types() {
        let element = TypeId::new(4);
        let list = TypeId::new(5);
        let ty = Type::optional(Type::generic(list, vec![Type::plural(Type::object(element))]));
        assert!(ty.mentions(element));
        assert!(!ty.mentions(TypeId::new(6)));
    }

    #[test]
    fn keyword_names_round_trip() {
        for literal in [LiteralType::Any, LiteralType::Never, LiteralType::Nothing, LiteralType::Null] {
            assert_eq!(LiteralType::from_name(literal.name()), Some(literal));
        }
        assert_eq!(LiteralType::from_name("Int"), None);
    }
}
