//! Assignability between types.
//!
//! [`SemanticModel::accepts`] is the single source of truth for whether a
//! value of one type may be used where another is expected. It needs the
//! model to walk declared super-types and generic parameter bounds.

use crate::model::SemanticModel;

use super::{FunctionSignature, LiteralType, ObjectType, Type, TypeArgument, UnionKind, Variance};

impl SemanticModel {
    /// Whether a value of type `source` may be used where `target` is expected.
    pub fn accepts(&self, target: &Type, source: &Type) -> bool {
        if target == source {
            return true;
        }
        match (target, source) {
            (_, Type::Literal(LiteralType::Never)) => true,
            (Type::Literal(LiteralType::Any), _) => true,
            (_, Type::Union(union)) if union.kind == UnionKind::Or => {
                union.members.iter().all(|member| self.accepts(target, member))
            }
            (Type::Optional(_), Type::Literal(LiteralType::Null)) => true,
            (Type::Optional(base), Type::Optional(other)) => self.accepts(base, other),
            (Type::Optional(base), _) => self.accepts(base, source),
            (Type::Union(union), _) => match union.kind {
                UnionKind::And => union.members.iter().all(|member| self.accepts(member, source)),
                UnionKind::Or => union.members.iter().any(|member| self.accepts(member, source)),
            },
            (_, Type::Union(union)) => union.members.iter().any(|member| self.accepts(target, member)),
            (_, Type::Optional(_)) | (_, Type::Literal(_)) => false,
            (_, Type::Object(object)) if self[object.declaration].is_generic_parameter() => self[object.declaration]
                .bound
                .as_ref()
                .is_some_and(|bound| self.accepts(target, bound)),
            (Type::Object(target_object), Type::Object(source_object)) => {
                self.accepts_object(target_object, source_object, source)
            }
            (Type::Object(_), Type::SelfType(declaration)) => {
                self.accepts(target, &self.instance_type(*declaration))
            }
            (Type::SelfType(declaration), Type::Object(object)) => self.inherits_from(object.declaration, *declaration),
            (Type::SelfType(declaration), Type::SelfType(other)) => self.inherits_from(*other, *declaration),
            (Type::Static(declaration), Type::Static(other)) => self.inherits_from(*other, *declaration),
            (Type::Function(target_function), Type::Function(source_function)) => {
                target_function.signatures.iter().all(|expected| {
                    source_function
                        .signatures
                        .iter()
                        .any(|provided| self.accepts_signature(expected, provided))
                })
            }
            (Type::Plural(base), Type::Plural(other)) => self.accepts(base, other),
            _ => false,
        }
    }

    fn accepts_object(&self, target: &ObjectType, source: &ObjectType, source_type: &Type) -> bool {
        if self[target.declaration].is_generic_parameter() {
            return false;
        }
        if target.declaration == source.declaration {
            if target.arguments.is_empty() {
                return true;
            }
            return target.arguments.len() == source.arguments.len()
                && target
                    .arguments
                    .iter()
                    .zip(&source.arguments)
                    .all(|(expected, provided)| self.accepts_argument(expected, provided));
        }
        let target_type = Type::Object(target.clone());
        self.supertypes(source_type)
            .iter()
            .any(|supertype| self.accepts(&target_type, supertype))
    }

    fn accepts_argument(&self, expected: &TypeArgument, provided: &TypeArgument) -> bool {
        match expected.variance {
            Variance::Invariant => expected == provided,
            Variance::Producing => {
                provided.variance != Variance::Consuming && self.accepts(&expected.ty, &provided.ty)
            }
            Variance::Consuming => {
                provided.variance != Variance::Producing && self.accepts(&provided.ty, &expected.ty)
            }
        }
    }

    /// A function of shape `provided` can be called as `expected`:
    /// parameters are contravariant and the return type is covariant.
    fn accepts_signature(&self, expected: &FunctionSignature, provided: &FunctionSignature) -> bool {
        expected.parameters.len() == provided.parameters.len()
            && expected.is_variadic == provided.is_variadic
            && expected
                .parameters
                .iter()
                .zip(&provided.parameters)
                .all(|(expected, provided)| self.accepts(provided, expected))
            && self.accepts(&expected.return_type, &provided.return_type)
    }

    /// Whether two types accept each other.
    pub fn is_equivalent(&self, a: &Type, b: &Type) -> bool {
        self.accepts(a, b) && self.accepts(b, a)
    }
}

#[cfg(test)]
mod tests {
    use pure_core::{Span, TypeId};

    use super::*;
    use crate::model::{TypeDeclaration, TypeKind};
    use crate::types::FunctionType;

    struct Fixture {
        model: SemanticModel,
        animal: TypeId,
        dog: TypeId,
        int: TypeId,
        list: TypeId,
        bounded: TypeId,
    }

    fn fixture() -> Fixture {
        let mut model = SemanticModel::new();
        let animal = model.add_type(TypeDeclaration::new("Animal", TypeKind::Class, Span::default()));
        let dog = model.add_type(TypeDeclaration::new("Dog", TypeKind::Class, Span::default()));
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        let list = model.add_type(TypeDeclaration::new("List", TypeKind::Class, Span::default()));
        let element = model.add_type(TypeDeclaration::new("Element", TypeKind::GenericParameter, Span::default()));
        let bounded = model.add_type(TypeDeclaration::new("T", TypeKind::GenericParameter, Span::default()));
        model[dog].supertypes = vec![Type::object(animal)];
        model[list].generic_parameters = vec![element];
        model[bounded].bound = Some(Type::object(dog));
        Fixture {
            model,
            animal,
            dog,
            int,
            list,
            bounded,
        }
    }

    fn list_of(f: &Fixture, variance: Variance, element: TypeId) -> Type {
        Type::Object(ObjectType {
            declaration: f.list,
            arguments: vec![TypeArgument {
                variance,
                ty: Type::object(element),
            }],
        })
    }

    #[test]
    fn keyword_types_bound_the_lattice() {
        let f = fixture();
        let int = Type::object(f.int);
        assert!(f.model.accepts(&Type::ANY, &int));
        assert!(f.model.accepts(&int, &Type::NEVER));
        assert!(f.model.accepts(&int, &int));
        assert!(!f.model.accepts(&int, &Type::ANY));
        assert!(!f.model.accepts(&int, &Type::NULL));
    }

    #[test]
    fn optionals_accept_base_and_null() {
        let f = fixture();
        let dog = Type::object(f.dog);
        let optional_animal = Type::optional(Type::object(f.animal));
        assert!(f.model.accepts(&optional_animal, &dog));
        assert!(f.model.accepts(&optional_animal, &Type::NULL));
        assert!(f.model.accepts(&optional_animal, &Type::optional(dog.clone())));
        assert!(!f.model.accepts(&dog, &Type::optional(dog.clone())));
    }

    #[test]
    fn subtypes_are_accepted_transitively() {
        let f = fixture();
        assert!(f.model.accepts(&Type::object(f.animal), &Type::object(f.dog)));
        assert!(!f.model.accepts(&Type::object(f.dog), &Type::object(f.animal)));
        assert!(f.model.accepts(&Type::object(f.animal), &Type::object(f.bounded)));
        assert!(f.model.accepts(&Type::SelfType(f.animal), &Type::object(f.dog)));
    }

    #[test]
    fn unions_follow_member_rules() {
        let f = fixture();
        let int = Type::object(f.int);
        let dog = Type::object(f.dog);
        let either = Type::or(vec![int.clone(), dog.clone()]);
        assert!(f.model.accepts(&either, &int));
        assert!(!f.model.accepts(&int, &either));
        assert!(f.model.accepts(&Type::or(vec![int.clone(), Type::object(f.animal)]), &either));

        let both = Type::and(vec![Type::object(f.animal), dog.clone()]);
        assert!(f.model.accepts(&both, &dog));
        assert!(!f.model.accepts(&both, &Type::object(f.animal)));
    }

    #[test]
    fn type_arguments_respect_variance() {
        let f = fixture();
        let animals = list_of(&f, Variance::Invariant, f.animal);
        let dogs = list_of(&f, Variance::Invariant, f.dog);
        assert!(!f.model.accepts(&animals, &dogs));

        let producing_animals = list_of(&f, Variance::Producing, f.animal);
        assert!(f.model.accepts(&producing_animals, &dogs));
        assert!(!f.model.accepts(&list_of(&f, Variance::Producing, f.dog), &animals));

        let consuming_dogs = list_of(&f, Variance::Consuming, f.dog);
        assert!(f.model.accepts(&consuming_dogs, &animals));
        assert!(!f.model.accepts(&list_of(&f, Variance::Consuming, f.animal), &dogs));
    }

    #[test]
    fn static_types_are_not_instances() {
        let f = fixture();
        assert!(f.model.accepts(&Type::Static(f.animal), &Type::Static(f.dog)));
        assert!(!f.model.accepts(&Type::object(f.animal), &Type::Static(f.animal)));
    }

    #[test]
    fn functions_are_contravariant_in_parameters() {
        let f = fixture();
        let takes = |parameter: TypeId, result: TypeId| {
            Type::Function(FunctionType {
                signatures: vec![FunctionSignature {
                    parameters: vec![Type::object(parameter)],
                    is_variadic: false,
                    return_type: Box::new(Type::object(result)),
                }],
            })
        };
        assert!(f.model.accepts(&takes(f.dog, f.animal), &takes(f.animal, f.dog)));
        assert!(!f.model.accepts(&takes(f.animal, f.animal), &takes(f.dog, f.animal)));
        assert!(f.model.accepts(&Type::plural(Type::object(f.animal)), &Type::plural(Type::object(f.dog))));
    }
}
