//! Inference of generic parameters from argument types.
//!
//! ## Algorithm
//!
//! Each parameter type is unified with the type of the argument passed for
//! it. Unification walks through optional, plural, object argument and
//! function wrappers in parallel. Whenever the parameter side is a generic
//! parameter being inferred, the argument side is recorded as a candidate.
//! An object argument of a different declaration is matched through its
//! super-types. Finishing combines the candidates of every parameter with
//! [`combine_or_union`] and checks the result against the parameter's bound.

use pure_core::TypeId;
use rustc_hash::FxHashMap;

use crate::model::SemanticModel;

use super::{Position, Substitution, Type, TypeArgument, combine_or_union, substitute};

/// Why a generic parameter could not be bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InferenceFailure {
    /// No argument mentions the parameter.
    #[error("no argument binds generic parameter {0}")]
    Unbound(TypeId),
    /// The inferred type violates the parameter's bound.
    #[error("inferred argument for generic parameter {0} violates its bound")]
    BoundViolation(TypeId),
}

pub struct TypeInference<'a> {
    model: &'a SemanticModel,
    parameters: &'a [TypeId],
    candidates: FxHashMap<TypeId, Vec<Type>>,
}

impl<'a> TypeInference<'a> {
    pub fn new(model: &'a SemanticModel, parameters: &'a [TypeId]) -> Self {
        Self {
            model,
            parameters,
            candidates: FxHashMap::default(),
        }
    }

    /// Record what `argument` tells about the parameters mentioned in `parameter`.
    pub fn unify(&mut self, parameter: &Type, argument: &Type) {
        match (parameter, argument) {
            (Type::Object(object), _) if object.arguments.is_empty() && self.parameters.contains(&object.declaration) => {
                self.candidates
                    .entry(object.declaration)
                    .or_default()
                    .push(argument.clone());
            }
            (Type::Optional(base), Type::Optional(other)) => self.unify(base, other),
            (Type::Optional(_), Type::Literal(_)) => {}
            (Type::Optional(base), _) => self.unify(base, argument),
            (Type::Plural(base), Type::Plural(other)) => self.unify(base, other),
            (Type::Plural(base), _) => self.unify(base, argument),
            (Type::Object(expected), Type::Object(provided)) if expected.declaration == provided.declaration => {
                for (expected, provided) in expected.arguments.iter().zip(&provided.arguments) {
                    self.unify(&expected.ty, &provided.ty);
                }
            }
            (Type::Object(expected), Type::Object(_)) => {
                let matching = self
                    .model
                    .hierarchy(argument)
                    .into_iter()
                    .find(|(declaration, _)| *declaration == expected.declaration);
                if let Some((declaration, substitution)) = matching {
                    let arguments: Vec<TypeArgument> = self.model[declaration]
                        .generic_parameters
                        .iter()
                        .map(|p| {
                            substitution
                                .get(p)
                                .cloned()
                                .unwrap_or_else(|| TypeArgument::invariant(Type::object(*p)))
                        })
                        .collect();
                    for (expected, provided) in expected.arguments.iter().zip(&arguments) {
                        self.unify(&expected.ty, &provided.ty);
                    }
                }
            }
            (Type::Function(expected), Type::Function(provided)) => {
                if let (Some(expected), Some(provided)) = (expected.signatures.first(), provided.signatures.first()) {
                    for (expected, provided) in expected.parameters.iter().zip(&provided.parameters) {
                        self.unify(expected, provided);
                    }
                    self.unify(&expected.return_type, &provided.return_type);
                }
            }
            _ => {}
        }
    }

    /// Bind every parameter that is not already bound in `explicit`.
    pub fn finish(mut self, explicit: &Substitution) -> Result<Substitution, InferenceFailure> {
        let mut substitution = explicit.clone();
        for parameter in self.parameters {
            if substitution.contains_key(parameter) {
                continue;
            }
            let Some(candidates) = self.candidates.remove(parameter) else {
                return Err(InferenceFailure::Unbound(*parameter));
            };
            let inferred = combine_or_union(self.model, &candidates);
            substitution.insert(*parameter, TypeArgument::invariant(inferred));
        }
        for parameter in self.parameters {
            let Some(bound) = &self.model[*parameter].bound else {
                continue;
            };
            let Some(argument) = substitution.get(parameter) else {
                continue;
            };
            let bound = substitute(bound, &substitution, Position::Input);
            if !self.model.accepts(&bound, &argument.ty) {
                return Err(InferenceFailure::BoundViolation(*parameter));
            }
        }
        Ok(substitution)
    }
}
