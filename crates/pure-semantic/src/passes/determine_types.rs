//! Determine-Types Pass (Pass 2) - Resolve declared types and type bodies.
//!
//! This pass gives every declaration its type and every expression of every
//! body its type, binding and resolved call. Declarations are completed
//! before any body is looked at, so bodies may use members declared later
//! in the program.
//!
//! ## Algorithm
//!
//! 1. Resolve super-types and reject inheritance cycles
//! 2. Resolve bounds of generic parameters
//! 3. Resolve property, computed property and signature types; link
//!    initializer property parameters to their properties
//! 4. Type property value expressions, inferring untyped properties
//! 5. Link overriding signatures to the signatures they override
//! 6. Report overloads with identical parameter lists
//! 7. Type getter, setter, function, initializer and operator bodies, then
//!    the top-level statements of every file
//!
//! Type argument bounds are checked after steps 6 and 7, when all bounds
//! are known.

use petgraph::algo::tarjan_scc;
use petgraph::graphmap::DiGraphMap;
use pure_core::{Diagnostics, InternalError, SemanticError, SignatureId, TypeId};
use rustc_hash::FxHashMap;

use crate::ast::{
    ComputedPropertyDef, FunctionDef, GenericParameterDef, InitializerDef, Member, OperatorDef, ParameterDef,
    PropertyDef, SourceFile, TypeDef, WhereClauseDef,
};
use crate::checker::{CallableContext, TypeChecker};
use crate::facts::{DeclarationMap, TypeFacts};
use crate::model::{DeclarationKind, SemanticModel, SignatureKind, WhereClause};
use crate::scope::ScopeId;
use crate::types::{Position, Type, substitute};

/// Output of the determine-types pass.
#[derive(Debug, Default)]
pub struct DetermineTypesOutput {
    pub facts: TypeFacts,
}

/// Pass 2: resolve types of declarations and expressions.
pub struct DetermineTypesPass<'a> {
    checker: TypeChecker<'a>,
    declarations: &'a DeclarationMap,
}

impl<'a> DetermineTypesPass<'a> {
    pub fn new(model: &'a mut SemanticModel, declarations: &'a DeclarationMap, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            checker: TypeChecker::new(model, declarations, diagnostics),
            declarations,
        }
    }

    /// Run the determine-types pass on all files.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, files: &[&SourceFile]) -> Result<DetermineTypesOutput, InternalError> {
        let types: Vec<(TypeId, &TypeDef)> = files
            .iter()
            .flat_map(|file| &file.types)
            .filter_map(|def| Some((self.declarations.type_of(def.id)?, def)))
            .collect();

        self.resolve_supertypes(&types)?;
        self.resolve_bounds(files, &types)?;
        for (id, def) in &types {
            self.resolve_members(*id, def)?;
        }
        for def in files.iter().flat_map(|file| &file.functions) {
            self.resolve_function(def)?;
        }
        for (id, def) in &types {
            self.type_property_values(*id, def)?;
        }
        self.link_overrides();
        self.report_duplicate_overloads();
        self.checker.flush_bound_checks();

        for (id, def) in &types {
            self.type_member_bodies(*id, def)?;
        }
        for def in files.iter().flat_map(|file| &file.functions) {
            self.type_function_body(def, None)?;
        }
        for file in files {
            let scope = self.declarations.require_scope(file.body.id, file.body.span)?;
            self.checker.in_callable(scope, CallableContext::default(), |checker| {
                checker.check_block(&file.body);
            });
        }
        self.checker.flush_bound_checks();

        let facts = self.checker.finish()?;
        tracing::debug!(
            expressions = facts.expression_types.len(),
            calls = facts.calls.len(),
            conversions = facts.conversions.len(),
            "types determined"
        );
        Ok(DetermineTypesOutput { facts })
    }

    fn type_scope(&self, id: TypeId, def: &TypeDef) -> Result<ScopeId, InternalError> {
        self.declarations.require_scope(def.id, def.span).or_else(|error| {
            self.checker.model[id].scope.ok_or(error)
        })
    }

    // ==========================================================================
    // Inheritance
    // ==========================================================================

    fn resolve_supertypes(&mut self, types: &[(TypeId, &TypeDef)]) -> Result<(), InternalError> {
        let mut graph: DiGraphMap<TypeId, ()> = DiGraphMap::new();
        for (id, def) in types {
            let scope = self.type_scope(*id, def)?;
            graph.add_node(*id);
            let mut supertypes = Vec::with_capacity(def.supertypes.len());
            for supertype in &def.supertypes {
                if let Some(ty) = self.checker.resolve_type_in(supertype, scope) {
                    if let Some(declaration) = ty.declaration() {
                        graph.add_edge(*id, declaration, ());
                    }
                    supertypes.push(ty);
                }
            }
            self.checker.model[*id].supertypes = supertypes;
        }

        for component in tarjan_scc(&graph) {
            let circular = component.len() > 1 || component.iter().any(|id| graph.contains_edge(*id, *id));
            if !circular {
                continue;
            }
            for id in component {
                let declaration = &mut self.checker.model[id];
                declaration.has_circular_inheritance = true;
                declaration.supertypes.clear();
                let error = SemanticError::CircularInheritance {
                    name: declaration.name.clone(),
                    span: declaration.span,
                };
                self.checker.report(error);
            }
        }

        for (id, _) in types {
            let Some(scope) = self.checker.model[*id].scope else {
                continue;
            };
            let parents: Vec<ScopeId> = self.checker.model[*id]
                .supertypes
                .iter()
                .filter_map(|supertype| self.checker.model[supertype.declaration()?].scope)
                .collect();
            for (order, parent) in parents.into_iter().enumerate() {
                self.checker.model.scopes.add_inheritance(scope, parent, order);
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Declared types
    // ==========================================================================

    fn resolve_bounds(&mut self, files: &[&SourceFile], types: &[(TypeId, &TypeDef)]) -> Result<(), InternalError> {
        for (id, def) in types {
            let scope = self.type_scope(*id, def)?;
            self.resolve_generics(&def.generics, scope);
            for member in &def.members {
                match member {
                    Member::Function(function) => self.resolve_callable_generics(function.id, function.span, &function.generics)?,
                    Member::Initializer(initializer) => {
                        self.resolve_callable_generics(initializer.id, initializer.span, &initializer.generics)?
                    }
                    _ => {}
                }
            }
        }
        for def in files.iter().flat_map(|file| &file.functions) {
            self.resolve_callable_generics(def.id, def.span, &def.generics)?;
        }
        Ok(())
    }

    fn resolve_callable_generics(
        &mut self,
        node: pure_core::NodeId,
        span: pure_core::Span,
        generics: &[GenericParameterDef],
    ) -> Result<(), InternalError> {
        if generics.is_empty() {
            return Ok(());
        }
        let signature = self.declarations.require_signature(node, span)?;
        let scope = self.callable_scope(signature, span)?;
        self.resolve_generics(generics, scope);
        Ok(())
    }

    fn resolve_generics(&mut self, generics: &[GenericParameterDef], scope: ScopeId) {
        for generic in generics {
            let (Some(id), Some(bound)) = (self.declarations.type_of(generic.id), &generic.bound) else {
                continue;
            };
            let bound = self.checker.resolve_type_in(bound, scope);
            self.checker.model[id].bound = bound;
        }
    }

    fn callable_scope(&self, signature: SignatureId, span: pure_core::Span) -> Result<ScopeId, InternalError> {
        self.checker.model[signature]
            .scope
            .ok_or_else(|| InternalError::MissingNode {
                table: "scope".to_string(),
                node: signature.to_string(),
                span,
            })
    }

    fn resolve_members(&mut self, id: TypeId, def: &TypeDef) -> Result<(), InternalError> {
        let scope = self.type_scope(id, def)?;
        for member in &def.members {
            match member {
                Member::Property(property) => self.resolve_property(property, scope)?,
                Member::Computed(computed) => self.resolve_computed(computed, scope)?,
                Member::Function(function) => self.resolve_function(function)?,
                Member::Initializer(initializer) => self.resolve_initializer(initializer, scope)?,
                Member::Operator(operator) => self.resolve_operator(operator)?,
            }
        }
        Ok(())
    }

    fn resolve_property(&mut self, def: &PropertyDef, scope: ScopeId) -> Result<(), InternalError> {
        let declaration = self.declarations.require_value(def.id, def.span)?;
        if let Some(ty) = &def.ty {
            let ty = self.checker.resolve_type_in(ty, scope);
            self.checker.model[declaration].ty = ty;
        }
        Ok(())
    }

    fn resolve_computed(&mut self, def: &ComputedPropertyDef, scope: ScopeId) -> Result<(), InternalError> {
        let declaration = self.declarations.require_value(def.id, def.span)?;
        let ty = self.checker.resolve_type_in(&def.ty, scope);
        self.checker.model[declaration].ty = ty.clone();

        if let Some(getter) = &def.getter {
            let signature = self.declarations.require_signature(getter.id, getter.span)?;
            self.checker.model[signature].return_type = ty.clone();
        }
        if let Some(setter) = &def.setter {
            let signature = self.declarations.require_signature(setter.id, setter.span)?;
            let model = &mut *self.checker.model;
            model[signature].return_type = Some(Type::NOTHING);
            let parameter = model[signature].parameters.first_mut().map(|parameter| {
                parameter.ty = ty.clone();
                parameter.declaration
            });
            if let Some(Some(value)) = parameter {
                model[value].ty = ty;
            }
        }
        Ok(())
    }

    /// Resolve parameter types of a callable. Variadic parameters are
    /// stored as plurals of their declared element type.
    fn resolve_parameters(&mut self, signature: SignatureId, parameters: &[ParameterDef], scope: ScopeId) {
        for (index, parameter) in parameters.iter().enumerate() {
            let Some(ty) = &parameter.ty else {
                continue;
            };
            let ty = self
                .checker
                .resolve_type_in(ty, scope)
                .map(|ty| if parameter.variadic { Type::plural(ty) } else { ty });
            if let Some(declaration) = self.declarations.value_of(parameter.id) {
                self.checker.model[declaration].ty = ty.clone();
            }
            if let Some(resolved) = self.checker.model[signature].parameters.get_mut(index) {
                resolved.ty = ty;
            }
        }
    }

    fn resolve_function(&mut self, def: &FunctionDef) -> Result<(), InternalError> {
        let signature = self.declarations.require_signature(def.id, def.span)?;
        let scope = self.callable_scope(signature, def.span)?;
        self.resolve_parameters(signature, &def.parameters, scope);
        let return_type = match &def.return_type {
            Some(ty) => self.checker.resolve_type_in(ty, scope),
            None => Some(Type::NOTHING),
        };
        self.checker.model[signature].return_type = return_type;
        let clauses = self.resolve_where_clauses(&def.where_clauses, scope);
        self.checker.model[signature].where_clauses = clauses;
        Ok(())
    }

    fn resolve_where_clauses(&mut self, clauses: &[WhereClauseDef], scope: ScopeId) -> Vec<WhereClause> {
        let mut resolved = Vec::with_capacity(clauses.len());
        for clause in clauses {
            let Some(parameter) = self.checker.model.scopes.resolve_type(scope, &clause.parameter) else {
                self.checker.report(SemanticError::NotFound {
                    kind: "type".to_string(),
                    name: clause.parameter.clone(),
                    span: clause.span,
                });
                continue;
            };
            let constraint = self.checker.resolve_type_in(&clause.constraint, scope);
            resolved.push(WhereClause {
                parameter,
                constraint,
                span: clause.span,
            });
        }
        resolved
    }

    fn resolve_initializer(&mut self, def: &InitializerDef, type_scope: ScopeId) -> Result<(), InternalError> {
        let signature = self.declarations.require_signature(def.id, def.span)?;
        let scope = self.callable_scope(signature, def.span)?;
        self.resolve_parameters(signature, &def.parameters, scope);
        self.checker.model[signature].return_type = Some(Type::NOTHING);

        for (index, parameter) in def.parameters.iter().enumerate() {
            if parameter.ty.is_some() {
                continue;
            }
            let property = self
                .checker
                .model
                .scopes
                .own_value(type_scope, &parameter.name)
                .filter(|property| self.checker.model[*property].kind == DeclarationKind::Property);
            let Some(property) = property else {
                self.checker.report(SemanticError::NotFound {
                    kind: "property".to_string(),
                    name: parameter.name.clone(),
                    span: parameter.span,
                });
                continue;
            };
            let ty = self.checker.model[property].ty.clone();
            if let Some(resolved) = self.checker.model[signature].parameters.get_mut(index) {
                resolved.property = Some(property);
                resolved.ty = ty;
            }
        }
        Ok(())
    }

    fn resolve_operator(&mut self, def: &OperatorDef) -> Result<(), InternalError> {
        let signature = self.declarations.require_signature(def.id, def.span)?;
        let scope = self.callable_scope(signature, def.span)?;
        self.resolve_parameters(signature, &def.parameters, scope);
        let return_type = match &def.return_type {
            Some(ty) => self.checker.resolve_type_in(ty, scope),
            None => Some(Type::NOTHING),
        };
        self.checker.model[signature].return_type = return_type;
        Ok(())
    }

    /// Type property values. A property without a declared type takes the
    /// type of its value, and initializer parameters naming it follow.
    fn type_property_values(&mut self, id: TypeId, def: &TypeDef) -> Result<(), InternalError> {
        let scope = self.type_scope(id, def)?;
        for member in &def.members {
            let Member::Property(property) = member else {
                continue;
            };
            let Some(value) = &property.value else {
                continue;
            };
            let declaration = self.declarations.require_value(property.id, property.span)?;
            let context = CallableContext {
                owner: Some(id),
                ..CallableContext::default()
            };
            let (ty, _) = self.checker.in_callable(scope, context, |checker| checker.check_expr(value));
            let Some(ty) = ty else {
                continue;
            };
            match self.checker.model[declaration].ty.clone() {
                Some(declared) => self.checker.check_assignable(&declared, &ty, value.id, value.span),
                None => self.checker.model[declaration].ty = Some(ty),
            }
        }

        let initializers = self.checker.model[id].initializers.clone();
        for signature in initializers {
            let parameters = self.checker.model[signature].parameters.len();
            for index in 0..parameters {
                let parameter = &self.checker.model[signature].parameters[index];
                let unresolved = if parameter.ty.is_none() { parameter.property } else { None };
                if let Some(property) = unresolved {
                    let ty = self.checker.model[property].ty.clone();
                    self.checker.model[signature].parameters[index].ty = ty;
                }
            }
        }
        Ok(())
    }

    // ==========================================================================
    // Overloads
    // ==========================================================================

    /// Link member functions to the closest super-type function with the
    /// same name and parameter types.
    fn link_overrides(&mut self) {
        let model = &*self.checker.model;
        let mut links = Vec::new();
        for (signature, declared) in model.signatures() {
            let (SignatureKind::Function, Some(owner)) = (declared.kind, declared.owner) else {
                continue;
            };
            if declared.original.is_some() {
                continue;
            }
            let own = declared.parameter_types();
            let found = model
                .hierarchy(&model.instance_type(owner))
                .into_iter()
                .skip(1)
                .find_map(|(level, substitution)| {
                    let scope = model[level].scope?;
                    let function = model.scopes.own_value(scope, &declared.name)?;
                    model[function].signatures.iter().copied().find(|candidate| {
                        let inherited = &model[*candidate];
                        inherited.parameters.len() == own.len()
                            && inherited.parameters.iter().zip(&own).all(|(parameter, own)| {
                                match (&parameter.ty, own) {
                                    (Some(parameter), Some(own)) => model.is_equivalent(
                                        &substitute(parameter, &substitution, Position::Input),
                                        own,
                                    ),
                                    _ => false,
                                }
                            })
                    })
                });
            if let Some(overridden) = found {
                links.push((signature, overridden));
            }
        }
        for (signature, overridden) in links {
            tracing::trace!(%signature, %overridden, "override linked");
            self.checker.model[signature].overridden = Some(overridden);
        }
    }

    /// Report signatures of one overload set with identical parameter types.
    fn report_duplicate_overloads(&mut self) {
        let mut errors = self.duplicate_overloads();
        errors.sort_by(|a, b| a.span().position_cmp(&b.span()));
        for error in errors {
            self.checker.report(error);
        }
    }

    fn duplicate_overloads(&self) -> Vec<SemanticError> {
        let model = &*self.checker.model;
        let mut groups: FxHashMap<(Option<TypeId>, SignatureKind, &str), Vec<SignatureId>> = FxHashMap::default();
        for (id, signature) in model.signatures() {
            if signature.original.is_some() || signature.is_synthesized {
                continue;
            }
            if matches!(signature.kind, SignatureKind::Getter | SignatureKind::Setter) {
                continue;
            }
            groups
                .entry((signature.owner, signature.kind, signature.name.as_str()))
                .or_default()
                .push(id);
        }

        let mut errors = Vec::new();
        for signatures in groups.values() {
            for (index, later) in signatures.iter().enumerate() {
                let duplicate = signatures[..index].iter().find(|earlier| {
                    let (a, b) = (&model[**earlier], &model[*later]);
                    a.parameters.len() == b.parameters.len()
                        && a.parameters.iter().zip(&b.parameters).all(|(a, b)| match (&a.ty, &b.ty) {
                            (Some(a), Some(b)) => model.is_equivalent(a, b),
                            _ => false,
                        })
                });
                if let Some(earlier) = duplicate {
                    let kind = match model[*later].kind {
                        SignatureKind::Initializer => "initializer",
                        SignatureKind::Operator(_) => "operator",
                        _ => "function",
                    };
                    errors.push(SemanticError::Redeclaration {
                        kind: kind.to_string(),
                        name: model[*later].name.clone(),
                        previous: model[*earlier].span,
                        span: model[*later].span,
                    });
                }
            }
        }
        errors
    }

    // ==========================================================================
    // Bodies
    // ==========================================================================

    fn type_member_bodies(&mut self, id: TypeId, def: &TypeDef) -> Result<(), InternalError> {
        for member in &def.members {
            match member {
                Member::Property(_) => {}
                Member::Computed(computed) => self.type_accessors(id, computed)?,
                Member::Function(function) => self.type_function_body(function, Some(id))?,
                Member::Initializer(initializer) => {
                    let Some(body) = &initializer.body else {
                        continue;
                    };
                    let signature = self.declarations.require_signature(initializer.id, initializer.span)?;
                    let scope = self.callable_scope(signature, initializer.span)?;
                    let context = CallableContext {
                        owner: Some(id),
                        return_type: Some(Type::NOTHING),
                        is_initializer: true,
                        returned: Vec::new(),
                    };
                    self.checker.in_callable(scope, context, |checker| checker.check_block(body));
                }
                Member::Operator(operator) => {
                    let Some(body) = &operator.body else {
                        continue;
                    };
                    let signature = self.declarations.require_signature(operator.id, operator.span)?;
                    self.type_body(signature, Some(id), body, operator.span)?;
                }
            }
        }
        Ok(())
    }

    fn type_accessors(&mut self, owner: TypeId, def: &ComputedPropertyDef) -> Result<(), InternalError> {
        if let Some(getter) = &def.getter {
            let signature = self.declarations.require_signature(getter.id, getter.span)?;
            let scope = self.callable_scope(signature, getter.span)?;
            let return_type = self.checker.model[signature].return_type.clone();
            let context = CallableContext {
                owner: Some(owner),
                return_type: return_type.clone(),
                ..CallableContext::default()
            };
            let (ty, _) = self.checker.in_callable(scope, context, |checker| checker.check_expr(getter));
            if let (Some(expected), Some(ty)) = (return_type, ty) {
                self.checker.check_assignable(&expected, &ty, getter.id, getter.span);
            }
        }
        if let Some(setter) = &def.setter {
            let signature = self.declarations.require_signature(setter.id, setter.span)?;
            self.type_body(signature, Some(owner), setter, def.span)?;
        }
        Ok(())
    }

    fn type_function_body(&mut self, def: &FunctionDef, owner: Option<TypeId>) -> Result<(), InternalError> {
        let Some(body) = &def.body else {
            return Ok(());
        };
        let signature = self.declarations.require_signature(def.id, def.span)?;
        self.type_body(signature, owner, body, def.span)
    }

    fn type_body(
        &mut self,
        signature: SignatureId,
        owner: Option<TypeId>,
        body: &crate::ast::Block,
        span: pure_core::Span,
    ) -> Result<(), InternalError> {
        let scope = self.callable_scope(signature, span)?;
        let context = CallableContext {
            owner,
            return_type: self.checker.model[signature].return_type.clone(),
            ..CallableContext::default()
        };
        self.checker.in_callable(scope, context, |checker| checker.check_block(body));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use pure_core::Diagnostics;

    use super::*;
    use crate::ast::{BinaryOp, Builder, Program};
    use crate::facts::CallKind;
    use crate::model::prelude;
    use crate::passes::DeclarePass;

    struct Typed {
        model: SemanticModel,
        declarations: DeclarationMap,
        facts: TypeFacts,
        diagnostics: Diagnostics,
    }

    fn determine(program: &Program) -> Typed {
        let prelude = prelude::file();
        let mut files: Vec<&SourceFile> = vec![&prelude];
        files.extend(&program.files);

        let mut model = SemanticModel::new();
        let mut diagnostics = Diagnostics::new();
        let declarations = DeclarePass::new(&mut model, &mut diagnostics).run(&files).declarations;
        let facts = DetermineTypesPass::new(&mut model, &declarations, &mut diagnostics)
            .run(&files)
            .expect("no internal error")
            .facts;
        Typed {
            model,
            declarations,
            facts,
            diagnostics,
        }
    }

    #[test]
    fn infers_local_types_from_values() {
        let b = Builder::new();
        let declaration = b.var_decl("a", None, Some(b.int(1)));
        let id = declaration.id;
        let program = Program::new(vec![b.file("Main", b.block(vec![declaration]))]);

        let typed = determine(&program);
        assert!(typed.diagnostics.is_empty(), "{}", typed.diagnostics);
        let local = typed.declarations.value_of(id).unwrap();
        assert_eq!(typed.model[local].ty, typed.model.builtins.int_type());
    }

    #[test]
    fn resolves_operators_through_the_prelude() {
        let b = Builder::new();
        let sum = b.binary(BinaryOp::Add, b.int(1), b.int(2));
        let sum_id = sum.id;
        let program = Program::new(vec![b.file("Main", b.block(vec![b.expr_stmt(sum)]))]);

        let typed = determine(&program);
        assert!(typed.diagnostics.is_empty(), "{}", typed.diagnostics);
        assert_eq!(typed.facts.type_of(sum_id).cloned(), typed.model.builtins.int_type());
        assert!(matches!(typed.facts.call(sum_id), Some(resolution) if resolution.kind == CallKind::Operator));
    }

    #[test]
    fn reports_unassignable_declarations() {
        let b = Builder::new();
        let program = Program::new(vec![b.file(
            "Main",
            b.block(vec![b.var_decl("a", Some(b.ty("Int")), Some(b.string("text")))]),
        )]);

        let typed = determine(&program);
        match typed.diagnostics.errors().next() {
            Some(SemanticError::TypeNotAssignable {
                source_type,
                target_type,
                ..
            }) => {
                assert_eq!(source_type, "String");
                assert_eq!(target_type, "Int");
            }
            other => panic!("Expected TypeNotAssignable, got: {:?}", other),
        }
    }

    #[test]
    fn converting_initializers_bridge_assignments() {
        let b = Builder::new();
        let value = b.int(1);
        let value_id = value.id;
        let program = Program::new(vec![b.file(
            "Main",
            b.block(vec![b.var_decl("a", Some(b.ty("Float")), Some(value))]),
        )]);

        let typed = determine(&program);
        assert!(typed.diagnostics.is_empty(), "{}", typed.diagnostics);
        assert!(typed.facts.conversions.get(&value_id).is_some_and(|c| c.initializer().is_some()));
    }

    #[test]
    fn detects_circular_inheritance() {
        let b = Builder::new();
        let program = Program::new(vec![
            b.file("Main", b.block(Vec::new()))
                .with_type(b.class(1, "A").with_supertype(b.ty("B")))
                .with_type(b.class(2, "B").with_supertype(b.ty("A")))
                .with_type(b.class(3, "C").with_supertype(b.ty("A"))),
        ]);

        let typed = determine(&program);
        let circular: Vec<String> = typed
            .diagnostics
            .errors()
            .filter_map(|error| match error {
                SemanticError::CircularInheritance { name, .. } => Some(name.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(circular.len(), 2);
        assert!(circular.contains(&"A".to_string()) && circular.contains(&"B".to_string()));
    }

    #[test]
    fn links_overrides_through_generic_supertypes() {
        let b = Builder::new();
        let base = b
            .class(1, "Box")
            .with_generic(b.generic(1, "Item", None))
            .with_member(b.function(2, "put").with_parameter(b.param(2, "item", b.ty("Item"))).native());
        let derived = b
            .class(4, "IntBox")
            .with_supertype(b.generic_ty("Box", vec![b.arg(b.ty("Int"))]))
            .with_member(
                b.function(5, "put")
                    .with_parameter(b.param(5, "item", b.ty("Int")))
                    .overriding()
                    .native(),
            );
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_type(base).with_type(derived)]);

        let typed = determine(&program);
        assert!(typed.diagnostics.is_empty(), "{}", typed.diagnostics);
        let overriding = typed
            .model
            .signatures()
            .find(|(_, signature)| signature.name == "put" && signature.is_overriding)
            .map(|(_, signature)| signature.overridden);
        assert!(matches!(overriding, Some(Some(_))));
    }

    #[test]
    fn identical_overloads_are_redeclarations() {
        let b = Builder::new();
        let program = Program::new(vec![
            b.file("Main", b.block(Vec::new()))
                .with_function(b.function(1, "f").with_parameter(b.param(1, "a", b.ty("Int"))).native())
                .with_function(b.function(2, "f").with_parameter(b.param(2, "b", b.ty("Int"))).native())
                .with_function(b.function(3, "f").with_parameter(b.param(3, "c", b.ty("String"))).native()),
        ]);

        let typed = determine(&program);
        let redeclared: Vec<_> = typed
            .diagnostics
            .errors()
            .filter(|error| matches!(error, SemanticError::Redeclaration { kind, .. } if kind == "function"))
            .collect();
        assert_eq!(redeclared.len(), 1);
        assert_eq!(redeclared[0].span().line, 2);
    }

    #[test]
    fn property_parameters_take_property_types() {
        let b = Builder::new();
        let point = b
            .class(1, "Point")
            .with_member(b.property(2, "x", Some(b.ty("Int")), None))
            .with_member(b.initializer(3).with_parameter(b.property_param(3, "x")).with_body(b.block(Vec::new())));
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_type(point)]);

        let typed = determine(&program);
        assert!(typed.diagnostics.is_empty(), "{}", typed.diagnostics);
        let initializer = typed
            .model
            .signatures()
            .find(|(_, signature)| signature.is_initializer() && signature.owner.is_some_and(|o| typed.model.type_name(o) == "Point"))
            .map(|(_, signature)| signature.clone())
            .unwrap();
        assert!(initializer.parameters[0].property.is_some());
        assert_eq!(initializer.parameters[0].ty, typed.model.builtins.int_type());
    }

    #[test]
    fn generic_constructions_infer_arguments() {
        let b = Builder::new();
        let holder = b
            .class(1, "Holder")
            .with_generic(b.generic(1, "Item", None))
            .with_member(b.property(2, "item", Some(b.ty("Item")), None))
            .with_member(b.initializer(3).with_parameter(b.property_param(3, "item")).with_body(b.block(Vec::new())));
        let construction = b.call(b.var("Holder"), vec![b.int(4)]);
        let construction_id = construction.id;
        let program = Program::new(vec![
            b.file("Main", b.block(vec![b.expr_stmt(construction)])).with_type(holder),
        ]);

        let typed = determine(&program);
        assert!(typed.diagnostics.is_empty(), "{}", typed.diagnostics);
        let ty = typed.facts.type_of(construction_id).unwrap();
        assert_eq!(typed.model.display(ty).to_string(), "<Int>Holder");
        assert!(matches!(
            typed.facts.call(construction_id),
            Some(resolution) if resolution.kind == CallKind::Construction
        ));
    }

    #[test]
    fn loops_record_mutated_locals() {
        let b = Builder::new();
        let declaration = b.var_decl("a", None, Some(b.int(0)));
        let id = declaration.id;
        let body = b.block(vec![b.expr_stmt(b.increment(b.var("a")))]);
        let loop_stmt = b.loop_stmt(2, Some(b.while_generator(b.bool(true))), body);
        let loop_id = loop_stmt.id;
        let program = Program::new(vec![b.file("Main", b.block(vec![declaration, loop_stmt]))]);

        let typed = determine(&program);
        assert!(typed.diagnostics.is_empty(), "{}", typed.diagnostics);
        let local = typed.declarations.value_of(id).unwrap();
        assert_eq!(typed.facts.mutations_in(loop_id), &[local]);
    }

    #[test]
    fn over_loops_bind_iterator_values() {
        let b = Builder::new();
        let generator = b.over_generator(b.call(b.var("Range"), vec![b.int(0), b.int(3)]), Some("i"));
        let binding_id = match &generator {
            crate::ast::Generator::Over {
                binding: Some(binding), ..
            } => binding.id,
            other => panic!("Expected over generator, got: {:?}", other),
        };
        let loop_stmt = b.loop_stmt(1, Some(generator), b.block(vec![b.expr_stmt(b.var("i"))]));
        let program = Program::new(vec![b.file("Main", b.block(vec![loop_stmt]))]);

        let typed = determine(&program);
        assert!(typed.diagnostics.is_empty(), "{}", typed.diagnostics);
        let binding = typed.declarations.value_of(binding_id).unwrap();
        assert_eq!(typed.model[binding].ty, typed.model.builtins.int_type());
    }
}
