//! Specificity ranking for overload resolution.
//!
//! Candidate A *dominates* candidate B when every parameter type B matched an
//! argument against accepts the corresponding parameter type of A, and the
//! two lists are not identical. The maximal candidates are those dominated by
//! no other one. Ties among them are broken by the number of implicit
//! conversions.

use crate::model::SemanticModel;

use super::Applicable;

/// Select the best applicable candidate.
///
/// Returns the index of the unique winner, or the indices of all tied
/// maximal candidates.
pub fn find_best_match(model: &SemanticModel, applicable: &[Applicable]) -> Result<usize, Vec<usize>> {
    if applicable.len() == 1 {
        return Ok(0);
    }

    let maximal: Vec<usize> = (0..applicable.len())
        .filter(|&index| {
            !(0..applicable.len())
                .any(|other| other != index && dominates(model, &applicable[other], &applicable[index]))
        })
        .collect();

    match maximal.as_slice() {
        [single] => return Ok(*single),
        [] => return Err((0..applicable.len()).collect()),
        _ => {}
    }

    break_tie(applicable, &maximal).ok_or(maximal)
}

/// Whether `a` is more specific than `b`.
pub fn dominates(model: &SemanticModel, a: &Applicable, b: &Applicable) -> bool {
    if a.argument_parameters.len() != b.argument_parameters.len() {
        return false;
    }
    let all_accepted = a
        .argument_parameters
        .iter()
        .zip(&b.argument_parameters)
        .all(|(specific, general)| model.accepts(general, specific));
    let identical = a.argument_parameters == b.argument_parameters;
    all_accepted && !identical
}

/// Prefer the candidate needing the fewest implicit conversions.
fn break_tie(applicable: &[Applicable], maximal: &[usize]) -> Option<usize> {
    let fewest = maximal
        .iter()
        .map(|index| applicable[*index].implicit_conversions())
        .min()?;
    let mut with_fewest = maximal
        .iter()
        .filter(|index| applicable[**index].implicit_conversions() == fewest);
    let winner = with_fewest.next()?;
    match with_fewest.next() {
        Some(_) => None,
        None => Some(*winner),
    }
}

#[cfg(test)]
mod tests {
    use pure_core::{SignatureId, Span};

    use super::*;
    use crate::conversion::Conversion;
    use crate::model::{TypeDeclaration, TypeKind};
    use crate::types::{Substitution, Type};

    fn applicable(signature: u32, parameters: Vec<Type>, conversions: Vec<Conversion>) -> Applicable {
        Applicable {
            signature: SignatureId::new(signature),
            substitution: Substitution::default(),
            argument_parameters: parameters,
            conversions,
        }
    }

    fn model() -> (SemanticModel, Type, Type, Type) {
        let mut model = SemanticModel::new();
        let animal = model.add_type(TypeDeclaration::new("Animal", TypeKind::Class, Span::default()));
        let dog = model.add_type(TypeDeclaration::new("Dog", TypeKind::Class, Span::default()));
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        model[dog].supertypes = vec![Type::object(animal)];
        (model, Type::object(animal), Type::object(dog), Type::object(int))
    }

    #[test]
    fn dominance_is_irreflexive_and_asymmetric() {
        let (model, animal, dog, _) = model();
        let general = applicable(0, vec![animal], vec![Conversion::Subsumption]);
        let specific = applicable(1, vec![dog], vec![Conversion::Identity]);

        assert!(!dominates(&model, &general, &general));
        assert!(dominates(&model, &specific, &general));
        assert!(!dominates(&model, &general, &specific));
    }

    #[test]
    fn mixed_specificity_is_ambiguous() {
        let (model, animal, dog, _) = model();
        let first = applicable(0, vec![animal.clone(), dog.clone()], vec![Conversion::Subsumption; 2]);
        let second = applicable(1, vec![dog, animal], vec![Conversion::Subsumption; 2]);

        assert_eq!(find_best_match(&model, &[first, second]), Err(vec![0, 1]));
    }

    #[test]
    fn fewer_conversions_break_ties() {
        let (model, _, _, int) = model();
        let converted = applicable(0, vec![int.clone()], vec![Conversion::Initializer(SignatureId::new(9))]);
        let direct = applicable(1, vec![int], vec![Conversion::Identity]);

        assert_eq!(find_best_match(&model, &[converted, direct]), Ok(1));
    }

    #[test]
    fn result_is_independent_of_candidate_order() {
        let (model, animal, dog, int) = model();
        let candidates = vec![
            applicable(0, vec![animal], vec![Conversion::Subsumption]),
            applicable(1, vec![dog], vec![Conversion::Identity]),
            applicable(2, vec![Type::optional(int)], vec![Conversion::Subsumption]),
        ];
        let chosen = |list: &[Applicable]| {
            let mut signatures: Vec<SignatureId> = match find_best_match(&model, list) {
                Ok(index) => vec![list[index].signature],
                Err(tied) => tied.iter().map(|index| list[*index].signature).collect(),
            };
            signatures.sort();
            signatures
        };
        let reversed: Vec<Applicable> = candidates.iter().rev().cloned().collect();
        assert_eq!(chosen(&candidates), chosen(&reversed));
        assert_eq!(chosen(&candidates), vec![SignatureId::new(1), SignatureId::new(2)]);
    }
}
