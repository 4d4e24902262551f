//! Replacing generic parameters with concrete types.
//!
//! ## Algorithm
//!
//! A [`Substitution`] maps generic parameter declarations to type arguments.
//! Invariant arguments replace the parameter as-is. Arguments carrying a
//! use-site variance are projected depending on where the parameter occurs:
//!
//! | argument            | output position (reads) | input position (writes) |
//! |---------------------|-------------------------|-------------------------|
//! | `X producing`       | `X`                     | `Never`                 |
//! | `X consuming`       | `Any`                   | `X`                     |
//!
//! Function parameter lists flip the position. A parameter appearing directly
//! as an invariant type argument keeps the projection as the argument's
//! variance instead (`<Element>List` becomes `<Int producing>List`).

use pure_core::TypeId;
use rustc_hash::FxHashMap;

use super::{FunctionSignature, FunctionType, ObjectType, Type, TypeArgument, UnionType, Variance};

/// Generic parameter → bound argument.
pub type Substitution = FxHashMap<TypeId, TypeArgument>;

/// Where a type occurs relative to the value flow of a member access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Values flow out: return types and property reads.
    Output,
    /// Values flow in: parameter types.
    Input,
}

impl Position {
    pub fn flipped(self) -> Position {
        match self {
            Position::Output => Position::Input,
            Position::Input => Position::Output,
        }
    }
}

/// Build a substitution binding parameters to arguments positionally.
pub fn bind(parameters: &[TypeId], arguments: &[TypeArgument]) -> Substitution {
    parameters
        .iter()
        .copied()
        .zip(arguments.iter().cloned())
        .collect()
}

/// Apply `substitution` to `ty` at `position`.
pub fn substitute(ty: &Type, substitution: &Substitution, position: Position) -> Type {
    if substitution.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::Object(object) if object.arguments.is_empty() => match substitution.get(&object.declaration) {
            Some(argument) => project(argument, position),
            None => ty.clone(),
        },
        Type::Object(object) => Type::Object(ObjectType {
            declaration: object.declaration,
            arguments: object
                .arguments
                .iter()
                .map(|argument| substitute_argument(argument, substitution, position))
                .collect(),
        }),
        Type::Optional(base) => Type::optional(substitute(base, substitution, position)),
        Type::Plural(base) => Type::plural(substitute(base, substitution, position)),
        Type::Union(union) => Type::Union(UnionType {
            kind: union.kind,
            members: union
                .members
                .iter()
                .map(|member| substitute(member, substitution, position))
                .collect(),
        }),
        Type::Function(function) => Type::Function(FunctionType {
            signatures: function
                .signatures
                .iter()
                .map(|signature| FunctionSignature {
                    parameters: signature
                        .parameters
                        .iter()
                        .map(|parameter| substitute(parameter, substitution, position.flipped()))
                        .collect(),
                    is_variadic: signature.is_variadic,
                    return_type: Box::new(substitute(&signature.return_type, substitution, position)),
                })
                .collect(),
        }),
        Type::Literal(_) | Type::Static(_) | Type::SelfType(_) => ty.clone(),
    }
}

fn project(argument: &TypeArgument, position: Position) -> Type {
    match (argument.variance, position) {
        (Variance::Invariant, _) => argument.ty.clone(),
        (Variance::Producing, Position::Output) => argument.ty.clone(),
        (Variance::Producing, Position::Input) => Type::NEVER,
        (Variance::Consuming, Position::Output) => Type::ANY,
        (Variance::Consuming, Position::Input) => argument.ty.clone(),
    }
}

fn substitute_argument(argument: &TypeArgument, substitution: &Substitution, position: Position) -> TypeArgument {
    if argument.variance == Variance::Invariant {
        if let Type::Object(object) = &argument.ty {
            if object.arguments.is_empty() {
                if let Some(bound) = substitution.get(&object.declaration) {
                    return bound.clone();
                }
            }
        }
    }
    let position = match argument.variance {
        Variance::Consuming => position.flipped(),
        _ => position,
    };
    TypeArgument {
        variance: argument.variance,
        ty: substitute(&argument.ty, substitution, position),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ELEMENT: TypeId = TypeId::new(1);
    const INT: TypeId = TypeId::new(2);
    const LIST: TypeId = TypeId::new(3);

    fn element() -> Type {
        Type::object(ELEMENT)
    }

    fn int() -> Type {
        Type::object(INT)
    }

    fn with_variance(variance: Variance) -> Substitution {
        bind(&[ELEMENT], &[TypeArgument { variance, ty: int() }])
    }

    #[test]
    fn invariant_arguments_replace_parameters() {
        let substitution = with_variance(Variance::Invariant);
        assert_eq!(substitute(&element(), &substitution, Position::Output), int());
        assert_eq!(substitute(&element(), &substitution, Position::Input), int());
    }

    #[test]
    fn producing_arguments_are_only_readable() {
        let substitution = with_variance(Variance::Producing);
        assert_eq!(substitute(&element(), &substitution, Position::Output), int());
        assert_eq!(substitute(&element(), &substitution, Position::Input), Type::NEVER);
    }

    #[test]
    fn consuming_arguments_are_only_writable() {
        let substitution = with_variance(Variance::Consuming);
        assert_eq!(substitute(&element(), &substitution, Position::Output), Type::ANY);
        assert_eq!(substitute(&element(), &substitution, Position::Input), int());
    }

    #[test]
    fn function_parameters_flip_position() {
        let substitution = with_variance(Variance::Producing);
        let callback = Type::Function(FunctionType {
            signatures: vec![FunctionSignature {
                parameters: vec![element()],
                is_variadic: false,
                return_type: Box::new(element()),
            }],
        });
        let Type::Function(result) = substitute(&callback, &substitution, Position::Output) else {
            panic!("Expected function type");
        };
        assert_eq!(result.signatures[0].parameters[0], Type::NEVER);
        assert_eq!(*result.signatures[0].return_type, int());
    }

    #[test]
    fn projected_parameter_keeps_variance_as_argument() {
        let substitution = with_variance(Variance::Producing);
        let list = Type::generic(LIST, vec![element()]);
        let expected = Type::Object(ObjectType {
            declaration: LIST,
            arguments: vec![TypeArgument {
                variance: Variance::Producing,
                ty: int(),
            }],
        });
        assert_eq!(substitute(&list, &substitution, Position::Output), expected);
    }
}
