//! Overload resolution for function, operator and initializer calls.
//!
//! This module selects the unique best signature for a call site from the
//! candidates visible on the callee.
//!
//! ## Algorithm
//!
//! 1. Filter candidates by arity (a variadic signature absorbs extra arguments)
//! 2. Bind explicit type arguments positionally, infer the remaining generic
//!    parameters from the argument types and check their bounds
//! 3. Check every argument against its substituted parameter type, directly
//!    or through exactly one converting initializer, and check where-clauses
//! 4. Rank the applicable candidates by specificity, then by the number of
//!    implicit conversions
//! 5. Specialize the winner through the model's cache
//!
//! No candidates yield [`SemanticError::NotFound`], no applicable candidate
//! [`SemanticError::SignatureMismatch`], and several maximal candidates
//! [`SemanticError::SignatureResolutionAmbiguity`] naming all of them. A
//! failed specialization is an [`InternalError`].

mod ranking;

pub use ranking::find_best_match;

use pure_core::{InternalError, SemanticError, SignatureId, Span};

use crate::conversion::{Conversion, ConversionCheck};
use crate::model::SemanticModel;
use crate::types::{Position, Substitution, Type, TypeArgument, TypeInference, substitute};

/// A signature visible at the call site, with the substitution of the
/// receiver type it was found on.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub signature: SignatureId,
    pub substitution: Substitution,
}

impl Candidate {
    pub fn new(signature: SignatureId, substitution: Substitution) -> Self {
        Self {
            signature,
            substitution,
        }
    }

    pub fn plain(signature: SignatureId) -> Self {
        Self::new(signature, Substitution::default())
    }
}

impl From<(SignatureId, Substitution)> for Candidate {
    fn from((signature, substitution): (SignatureId, Substitution)) -> Self {
        Self::new(signature, substitution)
    }
}

/// What is being called.
#[derive(Debug, Clone)]
pub struct CallSite<'a> {
    /// Kind of callee for diagnostics: "function", "initializer" or "operator".
    pub kind: &'a str,
    pub name: &'a str,
    pub type_arguments: &'a [Type],
    /// Argument types, `None` where unknown.
    pub arguments: &'a [Option<Type>],
    pub span: Span,
}

/// A candidate that accepts the call's arguments.
#[derive(Debug, Clone)]
pub struct Applicable {
    pub signature: SignatureId,
    pub substitution: Substitution,
    /// Substituted parameter type each argument is matched against.
    pub argument_parameters: Vec<Type>,
    pub conversions: Vec<Conversion>,
}

impl Applicable {
    /// Number of converting initializers applied.
    pub fn implicit_conversions(&self) -> usize {
        self.conversions
            .iter()
            .filter(|c| c.initializer().is_some())
            .count()
    }
}

/// Why a call could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    /// The program is wrong: reported and typing continues.
    #[error(transparent)]
    Semantic(#[from] SemanticError),
    /// An invariant of the model broke: analysis stops.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

/// Result of successful overload resolution.
#[derive(Debug, Clone)]
pub struct OverloadMatch {
    /// The selected signature, specialized when generic.
    pub signature: SignatureId,
    /// The declared signature before specialization.
    pub declared: SignatureId,
    pub conversions: Vec<Conversion>,
    pub return_type: Option<Type>,
}

/// Resolve a call against its visible candidates.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn resolve_overload(
    model: &mut SemanticModel,
    candidates: &[Candidate],
    call: &CallSite<'_>,
) -> Result<OverloadMatch, ResolutionError> {
    if candidates.is_empty() {
        return Err(ResolutionError::Semantic(SemanticError::NotFound {
            kind: call.kind.to_string(),
            name: call.name.to_string(),
            span: call.span,
        }));
    }

    let applicable: Vec<Applicable> = candidates
        .iter()
        .filter_map(|candidate| try_match_candidate(model, candidate, call))
        .collect();
    tracing::trace!(
        name = call.name,
        candidates = candidates.len(),
        applicable = applicable.len(),
        "resolving call"
    );

    if applicable.is_empty() {
        return Err(ResolutionError::Semantic(SemanticError::SignatureMismatch {
            name: call.name.to_string(),
            arguments: model.describe_arguments(call.arguments),
            span: call.span,
        }));
    }

    let winner = match find_best_match(model, &applicable) {
        Ok(index) => &applicable[index],
        Err(tied) => {
            return Err(ResolutionError::Semantic(SemanticError::SignatureResolutionAmbiguity {
                name: call.name.to_string(),
                arguments: model.describe_arguments(call.arguments),
                candidates: tied
                    .iter()
                    .map(|index| model.display_signature(applicable[*index].signature).to_string())
                    .collect(),
                span: call.span,
            }));
        }
    };

    let signature = model.specialize(winner.signature, &winner.substitution)?;
    Ok(OverloadMatch {
        signature,
        declared: winner.signature,
        conversions: winner.conversions.clone(),
        return_type: model[signature].return_type.clone(),
    })
}

/// Match the call's arguments against one candidate.
///
/// Returns `None` when the candidate is inapplicable.
fn try_match_candidate(model: &SemanticModel, candidate: &Candidate, call: &CallSite<'_>) -> Option<Applicable> {
    let signature = &model[candidate.signature];
    let argument_count = call.arguments.len();
    let fixed = signature.fixed_parameter_count();
    if signature.is_variadic {
        if argument_count < fixed {
            return None;
        }
    } else if argument_count != signature.parameters.len() {
        return None;
    }
    if call.type_arguments.len() > signature.generic_parameters.len() {
        return None;
    }

    // Parameter type for each argument, with the receiver's substitution applied.
    let mut declared = Vec::with_capacity(argument_count);
    for index in 0..argument_count {
        let parameter = signature.parameters.get(index.min(signature.parameters.len().saturating_sub(1)))?;
        let ty = substitute(parameter.ty.as_ref()?, &candidate.substitution, Position::Input);
        let ty = match ty {
            Type::Plural(base) if signature.is_variadic && index >= fixed => *base,
            other => other,
        };
        declared.push(ty);
    }

    let explicit = model.bind_arguments_for_signature(candidate.signature, call.type_arguments);
    let mut inference = TypeInference::new(model, &signature.generic_parameters);
    for (parameter, argument) in declared.iter().zip(call.arguments) {
        if let Some(argument) = argument {
            inference.unify(parameter, argument);
        }
    }
    let local = inference.finish(&explicit).ok()?;

    let argument_parameters: Vec<Type> = declared
        .iter()
        .map(|ty| substitute(ty, &local, Position::Input))
        .collect();

    let mut conversions = Vec::with_capacity(argument_count);
    for (parameter, argument) in argument_parameters.iter().zip(call.arguments) {
        let conversion = match argument {
            None => Conversion::Identity,
            Some(argument) => match model.check_conversion(parameter, argument) {
                ConversionCheck::Possible(conversion) => conversion,
                ConversionCheck::Ambiguous(_) | ConversionCheck::Impossible => return None,
            },
        };
        conversions.push(conversion);
    }

    for clause in &signature.where_clauses {
        let (Some(constraint), Some(argument)) = (&clause.constraint, local.get(&clause.parameter)) else {
            continue;
        };
        let constraint = substitute(constraint, &local, Position::Input);
        if !model.accepts(&constraint, &argument.ty) {
            return None;
        }
    }

    let mut substitution = candidate.substitution.clone();
    substitution.extend(local);
    Some(Applicable {
        signature: candidate.signature,
        substitution,
        argument_parameters,
        conversions,
    })
}

impl SemanticModel {
    /// Bind explicit type arguments of a call to a signature's generic
    /// parameters.
    pub fn bind_arguments_for_signature(&self, signature: SignatureId, arguments: &[Type]) -> Substitution {
        self[signature]
            .generic_parameters
            .iter()
            .copied()
            .zip(arguments.iter().cloned().map(TypeArgument::invariant))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use pure_core::{Span, TypeId};

    use super::*;
    use crate::model::{Signature, SignatureKind, SignatureParameter, TypeDeclaration, TypeKind, WhereClause};
    use crate::types::bind;

    struct Fixture {
        model: SemanticModel,
        int: Type,
        float: Type,
        animal: Type,
        dog: Type,
    }

    fn fixture() -> Fixture {
        let mut model = SemanticModel::new();
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        let float = model.add_type(TypeDeclaration::new("Float", TypeKind::Class, Span::default()));
        let animal = model.add_type(TypeDeclaration::new("Animal", TypeKind::Class, Span::default()));
        let dog = model.add_type(TypeDeclaration::new("Dog", TypeKind::Class, Span::default()));
        model[dog].supertypes = vec![Type::object(animal)];
        Fixture {
            model,
            int: Type::object(int),
            float: Type::object(float),
            animal: Type::object(animal),
            dog: Type::object(dog),
        }
    }

    fn function(model: &mut SemanticModel, name: &str, parameters: Vec<Type>) -> SignatureId {
        let mut signature = Signature::new(SignatureKind::Function, name, Span::default());
        signature.parameters = parameters
            .into_iter()
            .enumerate()
            .map(|(index, ty)| SignatureParameter {
                name: format!("p{}", index),
                span: Span::default(),
                ty: Some(ty),
                declaration: None,
                property: None,
            })
            .collect();
        signature.return_type = Some(Type::NOTHING);
        model.add_signature(signature)
    }

    fn generic_parameter(model: &mut SemanticModel, name: &str) -> TypeId {
        model.add_type(TypeDeclaration::new(name, TypeKind::GenericParameter, Span::default()))
    }

    fn call<'a>(arguments: &'a [Option<Type>]) -> CallSite<'a> {
        CallSite {
            kind: "function",
            name: "f",
            type_arguments: &[],
            arguments,
            span: Span::new(1, 1, 1),
        }
    }

    #[test]
    fn no_candidates_is_not_found() {
        let mut f = fixture();
        let result = resolve_overload(&mut f.model, &[], &call(&[]));
        assert!(matches!(result, Err(ResolutionError::Semantic(SemanticError::NotFound { .. }))));
    }

    #[test]
    fn arity_mismatch_is_signature_mismatch() {
        let mut f = fixture();
        let sig = function(&mut f.model, "f", vec![f.int.clone()]);
        let arguments = [Some(f.int.clone()), Some(f.int.clone())];
        match resolve_overload(&mut f.model, &[Candidate::plain(sig)], &call(&arguments)) {
            Err(ResolutionError::Semantic(SemanticError::SignatureMismatch { arguments, .. })) => {
                assert_eq!(arguments, "Int, Int")
            }
            other => panic!("Expected SignatureMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn more_specific_signature_wins() {
        let mut f = fixture();
        let general = function(&mut f.model, "f", vec![f.animal.clone()]);
        let specific = function(&mut f.model, "f", vec![f.dog.clone()]);
        let candidates = [Candidate::plain(general), Candidate::plain(specific)];

        let arguments = [Some(f.dog.clone())];
        let resolved = resolve_overload(&mut f.model, &candidates, &call(&arguments)).unwrap();
        assert_eq!(resolved.signature, specific);

        let arguments = [Some(f.animal.clone())];
        let resolved = resolve_overload(&mut f.model, &candidates, &call(&arguments)).unwrap();
        assert_eq!(resolved.signature, general);
    }

    #[test]
    fn identical_parameters_are_ambiguous() {
        let mut f = fixture();
        let first = function(&mut f.model, "f", vec![f.int.clone()]);
        let second = function(&mut f.model, "f", vec![f.int.clone()]);
        let arguments = [Some(f.int.clone())];
        match resolve_overload(
            &mut f.model,
            &[Candidate::plain(first), Candidate::plain(second)],
            &call(&arguments),
        ) {
            Err(ResolutionError::Semantic(SemanticError::SignatureResolutionAmbiguity { candidates, .. })) => {
                assert_eq!(candidates, vec!["f(Int)".to_string(), "f(Int)".to_string()]);
            }
            other => panic!("Expected SignatureResolutionAmbiguity, got: {:?}", other),
        }
    }

    #[test]
    fn variadic_parameter_absorbs_remaining_arguments() {
        let mut f = fixture();
        let sig = function(&mut f.model, "f", vec![f.int.clone(), Type::plural(f.dog.clone())]);
        f.model[sig].is_variadic = true;
        let candidates = [Candidate::plain(sig)];

        let arguments = [Some(f.int.clone())];
        assert!(resolve_overload(&mut f.model, &candidates, &call(&arguments)).is_ok());
        let arguments = [Some(f.int.clone()), Some(f.dog.clone()), Some(f.dog.clone())];
        assert!(resolve_overload(&mut f.model, &candidates, &call(&arguments)).is_ok());
        let arguments = [Some(f.int.clone()), Some(f.int.clone())];
        assert!(resolve_overload(&mut f.model, &candidates, &call(&arguments)).is_err());
    }

    #[test]
    fn generic_signatures_are_inferred_and_specialized() {
        let mut f = fixture();
        let element = generic_parameter(&mut f.model, "Element");
        let sig = function(&mut f.model, "f", vec![Type::object(element)]);
        f.model[sig].generic_parameters = vec![element];
        f.model[sig].return_type = Some(Type::object(element));

        let arguments = [Some(f.dog.clone())];
        let resolved = resolve_overload(&mut f.model, &[Candidate::plain(sig)], &call(&arguments)).unwrap();
        assert_ne!(resolved.signature, sig);
        assert_eq!(resolved.declared, sig);
        assert_eq!(resolved.return_type, Some(f.dog.clone()));
    }

    #[test]
    fn too_many_type_arguments_are_inapplicable() {
        let mut f = fixture();
        let sig = function(&mut f.model, "f", vec![f.int.clone()]);
        let arguments = [Some(f.int.clone())];
        let type_arguments = [f.int.clone()];
        let site = CallSite {
            type_arguments: &type_arguments,
            ..call(&arguments)
        };
        let result = resolve_overload(&mut f.model, &[Candidate::plain(sig)], &site);
        assert!(matches!(result, Err(ResolutionError::Semantic(SemanticError::SignatureMismatch { .. }))));
    }

    #[test]
    fn where_clauses_restrict_applicability() {
        let mut f = fixture();
        let element = generic_parameter(&mut f.model, "Element");
        let sig = function(&mut f.model, "f", vec![Type::object(element)]);
        f.model[sig].generic_parameters = vec![element];
        f.model[sig].where_clauses.push(WhereClause {
            parameter: element,
            constraint: Some(f.animal.clone()),
            span: Span::default(),
        });
        let candidates = [Candidate::plain(sig)];

        let arguments = [Some(f.dog.clone())];
        assert!(resolve_overload(&mut f.model, &candidates, &call(&arguments)).is_ok());
        let arguments = [Some(f.int.clone())];
        assert!(resolve_overload(&mut f.model, &candidates, &call(&arguments)).is_err());
    }

    #[test]
    fn receiver_substitution_applies_to_parameters() {
        let mut f = fixture();
        let element = generic_parameter(&mut f.model, "Element");
        let sig = function(&mut f.model, "f", vec![Type::object(element)]);
        let substitution = bind(&[element], &[TypeArgument::invariant(f.int.clone())]);
        let candidates = [Candidate::new(sig, substitution)];

        let arguments = [Some(f.int.clone())];
        assert!(resolve_overload(&mut f.model, &candidates, &call(&arguments)).is_ok());
        let arguments = [Some(f.float.clone())];
        assert!(resolve_overload(&mut f.model, &candidates, &call(&arguments)).is_err());
    }

    #[test]
    fn unknown_arguments_do_not_cascade() {
        let mut f = fixture();
        let sig = function(&mut f.model, "f", vec![f.int.clone()]);
        let arguments = [None];
        assert!(resolve_overload(&mut f.model, &[Candidate::plain(sig)], &call(&arguments)).is_ok());
    }
}
