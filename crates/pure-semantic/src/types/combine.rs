//! Common type of several values.
//!
//! ## Algorithm
//!
//! 1. Flatten or-unions and drop `Never`
//! 2. Lift `Null` and optional members into a single optional wrapper
//! 3. Drop duplicates and members accepted by another member
//! 4. A single remaining member is the result, otherwise an or-union of the
//!    remaining members in first-seen order
//!
//! Every input stays assignable to the result.

use crate::model::SemanticModel;

use super::{LiteralType, Type, UnionKind};

/// Combine branch or argument types into their narrowest common type.
/// An empty input yields `Never`.
pub fn combine_or_union(model: &SemanticModel, types: &[Type]) -> Type {
    let mut is_optional = false;
    let mut members: Vec<Type> = Vec::new();
    let mut pending: Vec<&Type> = types.iter().rev().collect();
    while let Some(ty) = pending.pop() {
        match ty {
            Type::Literal(LiteralType::Never) => {}
            Type::Literal(LiteralType::Null) => is_optional = true,
            Type::Optional(base) => {
                is_optional = true;
                pending.push(base);
            }
            Type::Union(union) if union.kind == UnionKind::Or => {
                pending.extend(union.members.iter().rev());
            }
            other => {
                if !members.contains(other) {
                    members.push(other.clone());
                }
            }
        }
    }

    let mut narrowed: Vec<Type> = Vec::new();
    for (index, member) in members.iter().enumerate() {
        let subsumed = members.iter().enumerate().any(|(other_index, other)| {
            other_index != index
                && model.accepts(other, member)
                && (!model.accepts(member, other) || other_index < index)
        });
        if !subsumed {
            narrowed.push(member.clone());
        }
    }

    let combined = match narrowed.len() {
        0 if is_optional => return Type::NULL,
        0 => return Type::NEVER,
        1 => narrowed.remove(0),
        _ => Type::or(narrowed),
    };
    if is_optional {
        Type::optional(combined)
    } else {
        combined
    }
}

#[cfg(test)]
mod tests {
    use pure_core::Span;

    use super::*;
    use crate::model::{TypeDeclaration, TypeKind};

    fn model() -> (SemanticModel, Type, Type, Type) {
        let mut model = SemanticModel::new();
        let animal = model.add_type(TypeDeclaration::new("Animal", TypeKind::Class, Span::default()));
        let dog = model.add_type(TypeDeclaration::new("Dog", TypeKind::Class, Span::default()));
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        model[dog].supertypes = vec![Type::object(animal)];
        (model, Type::object(animal), Type::object(dog), Type::object(int))
    }

    #[test]
    fn empty_input_is_never() {
        let (model, ..) = model();
        assert_eq!(combine_or_union(&model, &[]), Type::NEVER);
        assert_eq!(combine_or_union(&model, &[Type::NULL]), Type::NULL);
    }

    #[test]
    fn supertype_absorbs_subtypes() {
        let (model, animal, dog, _) = model();
        assert_eq!(combine_or_union(&model, &[dog.clone(), animal.clone(), dog]), animal);
    }

    #[test]
    fn null_lifts_into_optional() {
        let (model, _, dog, int) = model();
        assert_eq!(
            combine_or_union(&model, &[int.clone(), Type::NULL]),
            Type::optional(int.clone())
        );
        assert_eq!(
            combine_or_union(&model, &[Type::optional(dog.clone()), int.clone(), Type::NEVER]),
            Type::optional(Type::or(vec![dog, int]))
        );
    }

    #[test]
    fn unrelated_types_form_flat_union() {
        let (model, animal, dog, int) = model();
        let nested = Type::or(vec![dog.clone(), int.clone()]);
        let combined = combine_or_union(&model, &[nested, animal.clone()]);
        assert_eq!(combined, Type::or(vec![int, animal]));
    }

    #[test]
    fn inputs_stay_assignable_to_result() {
        let (model, animal, dog, int) = model();
        let inputs = [dog, Type::NULL, int, animal];
        let combined = combine_or_union(&model, &inputs);
        for input in &inputs {
            assert!(model.accepts(&combined, input));
        }
        assert!(!matches!(combined, Type::Literal(_)));
    }
}
