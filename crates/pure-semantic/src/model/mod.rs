//! The semantic model: arenas of declarations and signatures, the scope tree
//! and the specialization cache.
//!
//! Everything is addressed by id. [`SemanticModel`] implements [`Index`] for
//! [`TypeId`], [`DeclId`] and [`SignatureId`]; ids are only minted by the
//! model itself, so indexing never sees a foreign id. Passes that receive ids
//! from side tables use the `try_*` accessors, which report a dangling id as
//! an [`InternalError`].
//!
//! ## Member lookup
//!
//! Members of a receiver type are found by walking the type hierarchy depth
//! first in declaration order. Every level carries the substitution of its
//! type arguments, so a member declared on `<Element>List` and reached
//! through `IntList: <Int>List` is returned together with `Element → Int`.

mod declarations;
pub mod prelude;
mod specialization;

pub use declarations::*;
pub use specialization::{CanonicalSubstitution, Specialization, SpecializationCache, canonicalize};

use std::ops::{Index, IndexMut};

use pure_core::{DeclId, InternalError, LiteralValue, SignatureId, TypeId};
use rustc_hash::FxHashSet;

use crate::ast::OperatorKind;
use crate::scope::ScopeTree;
use crate::types::{Position, Substitution, Type, TypeArgument, bind, substitute};

/// Prelude types the analysis refers to directly.
#[derive(Debug, Default, Clone, Copy)]
pub struct Builtins {
    pub int: Option<TypeId>,
    pub float: Option<TypeId>,
    pub bool: Option<TypeId>,
    pub string: Option<TypeId>,
    pub error: Option<TypeId>,
}

impl Builtins {
    pub fn int_type(&self) -> Option<Type> {
        self.int.map(Type::object)
    }

    pub fn float_type(&self) -> Option<Type> {
        self.float.map(Type::object)
    }

    pub fn bool_type(&self) -> Option<Type> {
        self.bool.map(Type::object)
    }

    pub fn string_type(&self) -> Option<Type> {
        self.string.map(Type::object)
    }

    pub fn error_type(&self) -> Option<Type> {
        self.error.map(Type::object)
    }
}

#[derive(Debug, Default)]
pub struct SemanticModel {
    types: Vec<TypeDeclaration>,
    values: Vec<ValueDeclaration>,
    signatures: Vec<Signature>,
    pub scopes: ScopeTree,
    pub builtins: Builtins,
    specializations: SpecializationCache,
}

impl SemanticModel {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Arenas
    // ========================================================================

    pub fn add_type(&mut self, declaration: TypeDeclaration) -> TypeId {
        let id = TypeId::new(self.types.len() as u32);
        self.types.push(declaration);
        id
    }

    pub fn add_value(&mut self, declaration: ValueDeclaration) -> DeclId {
        let id = DeclId::new(self.values.len() as u32);
        self.values.push(declaration);
        id
    }

    pub fn add_signature(&mut self, signature: Signature) -> SignatureId {
        let id = SignatureId::new(self.signatures.len() as u32);
        self.signatures.push(signature);
        id
    }

    pub fn types(&self) -> impl Iterator<Item = (TypeId, &TypeDeclaration)> {
        self.types
            .iter()
            .enumerate()
            .map(|(index, decl)| (TypeId::new(index as u32), decl))
    }

    pub fn values(&self) -> impl Iterator<Item = (DeclId, &ValueDeclaration)> {
        self.values
            .iter()
            .enumerate()
            .map(|(index, decl)| (DeclId::new(index as u32), decl))
    }

    pub fn signatures(&self) -> impl Iterator<Item = (SignatureId, &Signature)> {
        self.signatures
            .iter()
            .enumerate()
            .map(|(index, sig)| (SignatureId::new(index as u32), sig))
    }

    pub fn signature_count(&self) -> usize {
        self.signatures.len()
    }

    pub fn try_type(&self, id: TypeId) -> Result<&TypeDeclaration, InternalError> {
        self.types.get(id.index()).ok_or_else(|| dangling(id))
    }

    pub fn try_value(&self, id: DeclId) -> Result<&ValueDeclaration, InternalError> {
        self.values.get(id.index()).ok_or_else(|| dangling(id))
    }

    pub fn try_signature(&self, id: SignatureId) -> Result<&Signature, InternalError> {
        self.signatures.get(id.index()).ok_or_else(|| dangling(id))
    }

    pub fn type_name(&self, id: TypeId) -> &str {
        &self[id].name
    }

    /// The generic signature a specialization was created from, or the
    /// signature itself.
    pub fn origin(&self, signature: SignatureId) -> SignatureId {
        self[signature].original.unwrap_or(signature)
    }

    // ========================================================================
    // Types
    // ========================================================================

    pub fn literal_type(&self, value: &LiteralValue) -> Option<Type> {
        match value {
            LiteralValue::Bool(_) => self.builtins.bool_type(),
            LiteralValue::Int(_) => self.builtins.int_type(),
            LiteralValue::Float(_) => self.builtins.float_type(),
            LiteralValue::String(_) => self.builtins.string_type(),
            LiteralValue::Null => Some(Type::NULL),
        }
    }

    /// The type of instances of a declaration, with its own generic
    /// parameters as arguments.
    pub fn instance_type(&self, id: TypeId) -> Type {
        let arguments = self[id].generic_parameters.iter().map(|p| Type::object(*p)).collect();
        Type::generic(id, arguments)
    }

    /// Substitution of an object type's arguments for its declaration's
    /// generic parameters.
    pub fn receiver_substitution(&self, receiver: &Type) -> Substitution {
        match receiver {
            Type::Object(object) if !object.arguments.is_empty() => bind(&self[object.declaration].generic_parameters, &object.arguments),
            _ => Substitution::default(),
        }
    }

    /// Declared super-types of `ty` with its type arguments applied.
    pub fn supertypes(&self, ty: &Type) -> Vec<Type> {
        let Some(declaration) = ty.declaration() else {
            return Vec::new();
        };
        let substitution = self.receiver_substitution(ty);
        self[declaration]
            .supertypes
            .iter()
            .map(|supertype| substitute(supertype, &substitution, Position::Output))
            .collect()
    }

    /// Whether `sub` is `sup` or inherits from it.
    pub fn inherits_from(&self, sub: TypeId, sup: TypeId) -> bool {
        let mut visited = FxHashSet::default();
        let mut pending = vec![sub];
        while let Some(current) = pending.pop() {
            if current == sup {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            pending.extend(self[current].supertypes.iter().filter_map(Type::declaration));
        }
        false
    }

    /// Object type through which members of `receiver` are looked up.
    fn member_receiver(&self, receiver: &Type) -> Option<Type> {
        let mut current = receiver.clone();
        // Generic parameters are followed to their bounds.
        for _ in 0..=self.types.len() {
            let next = match &current {
                Type::Object(object) if self[object.declaration].is_generic_parameter() => {
                    self[object.declaration].bound.clone()?
                }
                Type::Object(_) => return Some(current.clone()),
                Type::SelfType(id) | Type::Static(id) => return Some(self.instance_type(*id)),
                _ => return None,
            };
            current = next;
        }
        None
    }

    /// Every type of the hierarchy of `receiver` with its substitution,
    /// depth first in declaration order, each declaration once.
    pub fn hierarchy(&self, receiver: &Type) -> Vec<(TypeId, Substitution)> {
        let mut levels = Vec::new();
        let Some(start) = self.member_receiver(receiver) else {
            return levels;
        };
        let mut visited = FxHashSet::default();
        self.collect_hierarchy(&start, &mut visited, &mut levels);
        levels
    }

    fn collect_hierarchy(&self, ty: &Type, visited: &mut FxHashSet<TypeId>, levels: &mut Vec<(TypeId, Substitution)>) {
        let Some(declaration) = ty.declaration() else {
            return;
        };
        if !visited.insert(declaration) {
            return;
        }
        levels.push((declaration, self.receiver_substitution(ty)));
        for supertype in self.supertypes(ty) {
            self.collect_hierarchy(&supertype, visited, levels);
        }
    }

    // ========================================================================
    // Member lookup
    // ========================================================================

    /// First member named `name` in the hierarchy of `receiver`.
    pub fn find_member(&self, receiver: &Type, name: &str) -> Option<(DeclId, Substitution)> {
        self.hierarchy(receiver).into_iter().find_map(|(declaration, substitution)| {
            let scope = self[declaration].scope?;
            let member = self.scopes.own_value(scope, name)?;
            Some((member, substitution))
        })
    }

    /// All function signatures named `name` visible on `receiver`. Overridden
    /// signatures are suppressed by their overriding counterpart.
    pub fn member_signatures(&self, receiver: &Type, name: &str) -> Vec<(SignatureId, Substitution)> {
        let mut found: Vec<(SignatureId, Substitution)> = Vec::new();
        for (declaration, substitution) in self.hierarchy(receiver) {
            let Some(scope) = self[declaration].scope else {
                continue;
            };
            let Some(member) = self.scopes.own_value(scope, name) else {
                continue;
            };
            for signature in &self[member].signatures {
                self.push_unless_overridden(&mut found, *signature, &substitution);
            }
        }
        found
    }

    pub fn operator_signatures(&self, receiver: &Type, operator: OperatorKind) -> Vec<(SignatureId, Substitution)> {
        let mut found: Vec<(SignatureId, Substitution)> = Vec::new();
        for (declaration, substitution) in self.hierarchy(receiver) {
            let Some(scope) = self[declaration].scope else {
                continue;
            };
            let Some(signatures) = self.scopes.get(scope).and_then(|data| data.operators.get(&operator)) else {
                continue;
            };
            for signature in signatures {
                self.push_unless_overridden(&mut found, *signature, &substitution);
            }
        }
        found
    }

    fn push_unless_overridden(&self, found: &mut Vec<(SignatureId, Substitution)>, signature: SignatureId, substitution: &Substitution) {
        let overridden = found.iter().any(|(existing, _)| self[*existing].overridden == Some(signature));
        if !overridden {
            found.push((signature, substitution.clone()));
        }
    }

    /// Initializers of the type itself. Initializers are not inherited.
    pub fn initializers(&self, ty: &Type) -> Vec<(SignatureId, Substitution)> {
        let Some(receiver) = self.member_receiver(ty) else {
            return Vec::new();
        };
        let Some(declaration) = receiver.declaration() else {
            return Vec::new();
        };
        let substitution = self.receiver_substitution(&receiver);
        self[declaration]
            .initializers
            .iter()
            .map(|signature| (*signature, substitution.clone()))
            .collect()
    }

    // ========================================================================
    // Specialization
    // ========================================================================

    /// The signature with `substitution` applied, created once per distinct
    /// substitution. Fails when the signature arena has no id left.
    pub fn specialize(&mut self, signature: SignatureId, substitution: &Substitution) -> Result<SignatureId, InternalError> {
        let relevant: Substitution = substitution
            .iter()
            .filter(|(parameter, _)| self.signature_mentions(signature, **parameter))
            .map(|(parameter, argument)| (*parameter, argument.clone()))
            .collect();
        if relevant.is_empty() {
            return Ok(signature);
        }
        let reserved = SignatureId::new(next_index("signature", self.signatures.len())?);
        if let Err(existing) = self.specializations.reserve(signature, &relevant, reserved) {
            return Ok(existing.id());
        }
        let generic = self[signature].clone();
        self.signatures.push(generic.clone());

        let mut specialized = generic;
        for parameter in &mut specialized.parameters {
            parameter.ty = parameter
                .ty
                .as_ref()
                .map(|ty| substitute(ty, &relevant, Position::Input));
        }
        specialized.return_type = specialized
            .return_type
            .as_ref()
            .map(|ty| substitute(ty, &relevant, Position::Output));
        for clause in &mut specialized.where_clauses {
            clause.constraint = clause
                .constraint
                .as_ref()
                .map(|ty| substitute(ty, &relevant, Position::Input));
        }
        specialized
            .generic_parameters
            .retain(|parameter| !relevant.contains_key(parameter));
        specialized.original = Some(self.origin(signature));
        self.signatures[reserved.index()] = specialized;
        self.specializations.complete(signature, &relevant);
        tracing::trace!(generic = %signature, specialized = %reserved, "specialized signature");
        Ok(reserved)
    }

    fn signature_mentions(&self, signature: SignatureId, parameter: TypeId) -> bool {
        let sig = &self[signature];
        sig.parameters
            .iter()
            .filter_map(|p| p.ty.as_ref())
            .chain(sig.return_type.as_ref())
            .chain(sig.where_clauses.iter().filter_map(|c| c.constraint.as_ref()))
            .any(|ty| ty.mentions(parameter))
            || sig.where_clauses.iter().any(|c| c.parameter == parameter)
    }

    pub fn specialization_count(&self) -> usize {
        self.specializations.len()
    }

    /// Bind explicit arguments of a type declaration.
    pub fn bind_arguments(&self, declaration: TypeId, arguments: &[TypeArgument]) -> Substitution {
        bind(&self[declaration].generic_parameters, arguments)
    }
}

fn dangling(id: impl std::fmt::Display) -> InternalError {
    InternalError::Other {
        message: format!("dangling arena id {}", id),
    }
}

/// Index the next entry of an arena holding `len` entries gets.
fn next_index(arena: &str, len: usize) -> Result<u32, InternalError> {
    u32::try_from(len).map_err(|_| InternalError::Other {
        message: format!("{} arena exhausted at {} entries", arena, len),
    })
}

impl Index<TypeId> for SemanticModel {
    type Output = TypeDeclaration;

    fn index(&self, id: TypeId) -> &TypeDeclaration {
        &self.types[id.index()]
    }
}

impl IndexMut<TypeId> for SemanticModel {
    fn index_mut(&mut self, id: TypeId) -> &mut TypeDeclaration {
        &mut self.types[id.index()]
    }
}

impl Index<DeclId> for SemanticModel {
    type Output = ValueDeclaration;

    fn index(&self, id: DeclId) -> &ValueDeclaration {
        &self.values[id.index()]
    }
}

impl IndexMut<DeclId> for SemanticModel {
    fn index_mut(&mut self, id: DeclId) -> &mut ValueDeclaration {
        &mut self.values[id.index()]
    }
}

impl Index<SignatureId> for SemanticModel {
    type Output = Signature;

    fn index(&self, id: SignatureId) -> &Signature {
        &self.signatures[id.index()]
    }
}

impl IndexMut<SignatureId> for SemanticModel {
    fn index_mut(&mut self, id: SignatureId) -> &mut Signature {
        &mut self.signatures[id.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeKind;
    use crate::types::Variance;
    use pure_core::Span;

    /// `<Element>List` with `exists(element: Element): Bool` and
    /// `IntList: <Int>List`.
    fn list_model() -> (SemanticModel, TypeId, TypeId, TypeId, SignatureId) {
        let mut model = SemanticModel::new();
        let global = model.scopes.global();
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        let list = model.add_type(TypeDeclaration::new("List", TypeKind::Class, Span::default()));
        let element = model.add_type(TypeDeclaration::new("Element", TypeKind::GenericParameter, Span::default()));
        let int_list = model.add_type(TypeDeclaration::new("IntList", TypeKind::Class, Span::default()));

        let list_scope = model.scopes.new_scope(ScopeKind::Type(list), global);
        let int_list_scope = model.scopes.new_scope(ScopeKind::Type(int_list), global);
        model.scopes.add_inheritance(int_list_scope, list_scope, 0);
        model[list].scope = Some(list_scope);
        model[list].generic_parameters = vec![element];
        model[int_list].scope = Some(int_list_scope);
        model[int_list].supertypes = vec![Type::generic(list, vec![Type::object(int)])];

        let mut exists = Signature::new(SignatureKind::Function, "exists", Span::default());
        exists.owner = Some(list);
        exists.parameters.push(SignatureParameter {
            name: "element".to_string(),
            span: Span::default(),
            ty: Some(Type::object(element)),
            declaration: None,
            property: None,
        });
        exists.return_type = Some(Type::object(int));
        let exists = model.add_signature(exists);
        let mut function = ValueDeclaration::new("exists", DeclarationKind::Function, Span::default());
        function.signatures.push(exists);
        let function = model.add_value(function);
        model.scopes.declare_value(list_scope, "exists", function, None).unwrap();

        (model, int, list, int_list, exists)
    }

    #[test]
    fn members_carry_substitution_of_declaring_type() {
        let (model, int, list, int_list, exists) = list_model();
        let element = model[list].generic_parameters[0];

        let signatures = model.member_signatures(&Type::object(int_list), "exists");
        assert_eq!(signatures.len(), 1);
        let (signature, substitution) = &signatures[0];
        assert_eq!(*signature, exists);
        assert_eq!(substitution.get(&element).map(|a| &a.ty), Some(&Type::object(int)));
    }

    #[test]
    fn specializations_are_cached_per_substitution() {
        let (mut model, int, list, _, exists) = list_model();
        let element = model[list].generic_parameters[0];
        let substitution = bind(&[element], &[TypeArgument::invariant(Type::object(int))]);

        let first = model.specialize(exists, &substitution).unwrap();
        let second = model.specialize(exists, &substitution).unwrap();
        assert_eq!(first, second);
        assert_ne!(first, exists);
        assert_eq!(model[first].parameters[0].ty, Some(Type::object(int)));
        assert_eq!(model.origin(first), exists);
        assert_eq!(model.specialization_count(), 1);
    }

    #[test]
    fn arena_indices_beyond_u32_are_internal_errors() {
        assert_eq!(next_index("signature", 3).unwrap(), 3);
        match next_index("signature", u32::MAX as usize + 1) {
            Err(InternalError::Other { message }) => assert!(message.starts_with("signature arena exhausted")),
            other => panic!("Expected InternalError::Other, got: {:?}", other),
        }
    }

    #[test]
    fn producing_receiver_projects_parameters_to_never() {
        let (mut model, int, list, _, exists) = list_model();
        let element = model[list].generic_parameters[0];
        let substitution = bind(
            &[element],
            &[TypeArgument {
                variance: Variance::Producing,
                ty: Type::object(int),
            }],
        );

        let specialized = model.specialize(exists, &substitution).unwrap();
        assert_eq!(model[specialized].parameters[0].ty, Some(Type::NEVER));
    }

    #[test]
    fn inheritance_is_transitive() {
        let (model, int, list, int_list, _) = list_model();
        assert!(model.inherits_from(int_list, list));
        assert!(!model.inherits_from(list, int_list));
        assert!(!model.inherits_from(int, list));
        assert!(model.try_type(TypeId::new(99)).is_err());
    }
}
