//! Expression and statement typing.
//!
//! The [`TypeChecker`] types callable bodies for the determine-types pass:
//! every expression gets a type, every name a declaration and every call a
//! signature. Results go to [`TypeFacts`]; issues go to the diagnostics sink.
//!
//! Typing is synthesizing: the type of an expression is computed from its
//! parts. Expected types are only used to check assignments, arguments,
//! conditions and returns once the source type is known. An expression whose
//! type cannot be determined has no entry, and checks involving it are
//! skipped.
//!
//! Submodules:
//! - [`type_expr`]: type annotations to [`Type`]s, with argument count and bound checks
//! - [`expr`]: expression typing
//! - [`calls`]: calls, constructions and operator applications
//! - [`stmt`]: statements and blocks

mod calls;
mod expr;
mod stmt;
mod type_expr;

use pure_core::{Diagnostics, InternalError, IssueSink, NodeId, SemanticError, Span, TypeId};

use crate::conversion::{Conversion, ConversionCheck};
use crate::facts::{DeclarationMap, TypeFacts};
use crate::model::SemanticModel;
use crate::scope::ScopeId;
use crate::types::{Position, Substitution, Type, substitute};

/// A type argument whose bound is checked once all declarations are typed.
#[derive(Debug, Clone)]
struct PendingBound {
    argument: Type,
    parameter: TypeId,
    substitution: Substitution,
    span: Span,
}

/// The callable whose body is being typed.
#[derive(Debug, Clone, Default)]
pub(crate) struct CallableContext {
    /// Type `self` refers to.
    pub owner: Option<TypeId>,
    /// Declared return type; `None` when it is inferred from the body.
    pub return_type: Option<Type>,
    pub is_initializer: bool,
    /// Types of returned values, for callables without a declared return type.
    pub returned: Vec<Type>,
}

pub struct TypeChecker<'a> {
    pub(crate) model: &'a mut SemanticModel,
    pub(crate) declarations: &'a DeclarationMap,
    diagnostics: &'a mut Diagnostics,
    pub(crate) facts: TypeFacts,
    scope: ScopeId,
    context: CallableContext,
    /// Enclosing loop statements, innermost last.
    loops: Vec<NodeId>,
    pending_bounds: Vec<PendingBound>,
    /// First broken invariant; typing goes on but the pass fails.
    internal: Option<InternalError>,
}

impl<'a> TypeChecker<'a> {
    pub fn new(model: &'a mut SemanticModel, declarations: &'a DeclarationMap, diagnostics: &'a mut Diagnostics) -> Self {
        let scope = model.scopes.global();
        Self {
            model,
            declarations,
            diagnostics,
            facts: TypeFacts::default(),
            scope,
            context: CallableContext::default(),
            loops: Vec::new(),
            pending_bounds: Vec::new(),
            internal: None,
        }
    }

    /// The collected facts, or the first internal error met while typing.
    pub fn finish(self) -> Result<TypeFacts, InternalError> {
        match self.internal {
            Some(error) => Err(error),
            None => Ok(self.facts),
        }
    }

    pub(crate) fn report(&mut self, error: SemanticError) {
        tracing::trace!(%error, "type issue");
        self.diagnostics.add_issue(error);
    }

    pub(crate) fn fail(&mut self, error: InternalError) {
        tracing::warn!(%error, "typing aborted");
        if self.internal.is_none() {
            self.internal = Some(error);
        }
    }

    pub(crate) fn scope(&self) -> ScopeId {
        self.scope
    }

    /// Run `f` with `scope` as the current scope.
    pub(crate) fn in_scope<T>(&mut self, scope: ScopeId, f: impl FnOnce(&mut Self) -> T) -> T {
        let previous = std::mem::replace(&mut self.scope, scope);
        let result = f(self);
        self.scope = previous;
        result
    }

    /// Run `f` as the body of a callable. Returns the result together with
    /// the types of all returned values.
    pub(crate) fn in_callable<T>(
        &mut self,
        scope: ScopeId,
        context: CallableContext,
        f: impl FnOnce(&mut Self) -> T,
    ) -> (T, Vec<Type>) {
        let previous = std::mem::replace(&mut self.context, context);
        let result = self.in_scope(scope, f);
        let finished = std::mem::replace(&mut self.context, previous);
        (result, finished.returned)
    }

    pub(crate) fn context(&self) -> &CallableContext {
        &self.context
    }

    /// Instance type of the enclosing type declaration.
    pub(crate) fn self_type(&self) -> Option<Type> {
        self.context.owner.map(|owner| self.model.instance_type(owner))
    }

    /// Record the type of an expression and hand it back.
    pub(crate) fn record(&mut self, node: NodeId, ty: Option<Type>) -> Option<Type> {
        if let Some(ty) = &ty {
            self.facts.expression_types.insert(node, ty.clone());
        }
        ty
    }

    /// Check that a value of type `source` may be stored where `target` is
    /// expected, recording any conversion applied to `node`.
    pub(crate) fn check_assignable(&mut self, target: &Type, source: &Type, node: NodeId, span: Span) {
        match self.model.check_conversion(target, source) {
            ConversionCheck::Possible(Conversion::Identity) => {}
            ConversionCheck::Possible(conversion) => {
                self.facts.conversions.insert(node, conversion);
            }
            ConversionCheck::Ambiguous(candidates) => {
                let error = SemanticError::ConversionAmbiguity {
                    source_type: self.model.display(source).to_string(),
                    target_type: self.model.display(target).to_string(),
                    candidates: candidates
                        .iter()
                        .map(|candidate| self.model.display_signature(*candidate).to_string())
                        .collect(),
                    span,
                };
                self.report(error);
            }
            ConversionCheck::Impossible => {
                let error = SemanticError::TypeNotAssignable {
                    source_type: self.model.display(source).to_string(),
                    target_type: self.model.display(target).to_string(),
                    span,
                };
                self.report(error);
            }
        }
    }

    /// Check a condition is a `Bool`.
    pub(crate) fn check_condition(&mut self, ty: Option<&Type>, node: NodeId, span: Span) {
        if let (Some(ty), Some(bool_type)) = (ty, self.model.builtins.bool_type()) {
            self.check_assignable(&bool_type, ty, node, span);
        }
    }

    /// Record a write to a tracked declaration for every enclosing loop.
    pub(crate) fn record_mutation(&mut self, declaration: pure_core::DeclId) {
        if !self.model[declaration].is_tracked() {
            return;
        }
        for loop_node in &self.loops {
            let mutated = self.facts.loop_mutations.entry(*loop_node).or_default();
            if !mutated.contains(&declaration) {
                mutated.push(declaration);
            }
        }
    }

    /// Type of a member declaration read through a receiver substitution.
    pub(crate) fn member_type(&self, declaration: pure_core::DeclId, substitution: &Substitution) -> Option<Type> {
        let value = &self.model[declaration];
        match value.kind {
            crate::model::DeclarationKind::Function => self.function_value_type(declaration, substitution),
            _ => value.ty.as_ref().map(|ty| substitute(ty, substitution, Position::Output)),
        }
    }

    /// Function type of an overload set.
    pub(crate) fn function_value_type(
        &self,
        declaration: pure_core::DeclId,
        substitution: &Substitution,
    ) -> Option<Type> {
        let signatures: Option<Vec<_>> = self.model[declaration]
            .signatures
            .iter()
            .map(|signature| self.model[*signature].function_signature())
            .collect();
        let signatures = signatures?
            .into_iter()
            .map(|mut signature| {
                signature.parameters = signature
                    .parameters
                    .iter()
                    .map(|ty| substitute(ty, substitution, Position::Input))
                    .collect();
                signature.return_type = Box::new(substitute(&signature.return_type, substitution, Position::Output));
                signature
            })
            .collect();
        Some(Type::Function(crate::types::FunctionType { signatures }))
    }

    /// Report type arguments that violate their parameter's bound. Bounds
    /// are only known once every declaration is typed, so checks are queued
    /// until then.
    pub fn flush_bound_checks(&mut self) {
        for pending in std::mem::take(&mut self.pending_bounds) {
            let Some(bound) = self.model[pending.parameter].bound.clone() else {
                continue;
            };
            let bound = substitute(&bound, &pending.substitution, Position::Input);
            if !self.model.accepts(&bound, &pending.argument) {
                let error = SemanticError::TypeParameterNotAssignable {
                    argument: self.model.display(&pending.argument).to_string(),
                    parameter: self.model.type_name(pending.parameter).to_string(),
                    bound: self.model.display(&bound).to_string(),
                    span: pending.span,
                };
                self.report(error);
            }
        }
    }
}
