//! Implicit conversions.
//!
//! A value is passed or assigned as-is when the target type accepts its type.
//! Otherwise the target type's *converting* initializers are consulted: a
//! single-parameter initializer marked `converting` whose parameter accepts
//! the source type bridges the gap. Exactly one candidate is required.
//!
//! ## Conversion Priority
//!
//! 1. Identity (equal types)
//! 2. Subsumption (target accepts source)
//! 3. Converting initializer

use pure_core::SignatureId;

use crate::model::SemanticModel;
use crate::types::{Position, Type, substitute};

/// How an argument reaches its parameter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Conversion {
    /// No conversion needed (exact match).
    Identity,
    /// The value is used as a supertype.
    Subsumption,
    /// A converting initializer of the target type is applied.
    Initializer(SignatureId),
}

impl Conversion {
    pub fn is_exact(self) -> bool {
        self == Conversion::Identity
    }

    /// Initializer to apply, if any.
    pub fn initializer(self) -> Option<SignatureId> {
        match self {
            Conversion::Initializer(signature) => Some(signature),
            _ => None,
        }
    }
}

/// Outcome of checking whether a source type converts to a target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionCheck {
    Possible(Conversion),
    /// Several converting initializers apply.
    Ambiguous(Vec<SignatureId>),
    Impossible,
}

impl SemanticModel {
    /// Converting initializers of `target` whose parameter accepts `source`.
    pub fn conversions_from(&self, source: &Type, target: &Type) -> Vec<SignatureId> {
        let target = target.non_optional();
        if !matches!(target, Type::Object(_)) {
            return Vec::new();
        }
        self.initializers(target)
            .into_iter()
            .filter(|(signature, substitution)| {
                let signature = &self[*signature];
                signature.is_converting
                    && signature.parameters.len() == 1
                    && signature.parameters[0].ty.as_ref().is_some_and(|parameter| {
                        let parameter = substitute(parameter, substitution, Position::Input);
                        self.accepts(&parameter, source)
                    })
            })
            .map(|(signature, _)| signature)
            .collect()
    }

    /// How `source` converts to `target`.
    pub fn check_conversion(&self, target: &Type, source: &Type) -> ConversionCheck {
        if target == source {
            return ConversionCheck::Possible(Conversion::Identity);
        }
        if self.accepts(target, source) {
            return ConversionCheck::Possible(Conversion::Subsumption);
        }
        let mut candidates = self.conversions_from(source, target);
        match candidates.len() {
            0 => ConversionCheck::Impossible,
            1 => ConversionCheck::Possible(Conversion::Initializer(candidates.remove(0))),
            _ => ConversionCheck::Ambiguous(candidates),
        }
    }
}

#[cfg(test)]
mod tests {
    use pure_core::Span;

    use super::*;
    use crate::model::{Signature, SignatureKind, SignatureParameter, TypeDeclaration, TypeKind};

    fn converting(model: &mut SemanticModel, owner: pure_core::TypeId, parameter: Type) -> SignatureId {
        let mut signature = Signature::new(SignatureKind::Initializer, "init", Span::default());
        signature.owner = Some(owner);
        signature.is_converting = true;
        signature.parameters.push(SignatureParameter {
            name: "value".to_string(),
            span: Span::default(),
            ty: Some(parameter),
            declaration: None,
            property: None,
        });
        let id = model.add_signature(signature);
        model[owner].initializers.push(id);
        id
    }

    #[test]
    fn prefers_direct_assignability() {
        let mut model = SemanticModel::new();
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        let int = Type::object(int);
        assert_eq!(
            model.check_conversion(&int, &int),
            ConversionCheck::Possible(Conversion::Identity)
        );
        assert_eq!(
            model.check_conversion(&Type::optional(int.clone()), &int),
            ConversionCheck::Possible(Conversion::Subsumption)
        );
    }

    #[test]
    fn converting_initializer_bridges_gap() {
        let mut model = SemanticModel::new();
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        let float = model.add_type(TypeDeclaration::new("Float", TypeKind::Class, Span::default()));
        let from_int = converting(&mut model, float, Type::object(int));

        assert_eq!(
            model.check_conversion(&Type::object(float), &Type::object(int)),
            ConversionCheck::Possible(Conversion::Initializer(from_int))
        );
        assert_eq!(
            model.check_conversion(&Type::object(int), &Type::object(float)),
            ConversionCheck::Impossible
        );
    }

    #[test]
    fn several_converting_initializers_are_ambiguous() {
        let mut model = SemanticModel::new();
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        let float = model.add_type(TypeDeclaration::new("Float", TypeKind::Class, Span::default()));
        let first = converting(&mut model, float, Type::object(int));
        let second = converting(&mut model, float, Type::optional(Type::object(int)));

        assert_eq!(
            model.check_conversion(&Type::object(float), &Type::object(int)),
            ConversionCheck::Ambiguous(vec![first, second])
        );
    }
}
