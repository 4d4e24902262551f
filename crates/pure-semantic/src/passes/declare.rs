//! Declare Pass (Pass 1) - Create declarations, signatures and scopes.
//!
//! This pass walks every file and records what is declared where, without
//! resolving any type. Type annotations stay unresolved until
//! determine-types; only names and the scope structure are fixed here.
//!
//! ## Responsibilities
//!
//! - Declare types and their generic parameters in the global scope
//! - Declare properties, computed properties, functions, initializers and
//!   operators in type scopes, and top-level functions in the global scope
//! - Create callable scopes for parameters and block scopes for every block
//! - Declare locals with their position, and loop and handler bindings
//! - Synthesize a default initializer for concrete types that declare none
//! - Record the builtin types the analysis refers to directly
//!
//! ## Scope Layout
//!
//! ```text
//! Global ─┬─ Type ── Callable ── Block ── Block ...
//!         │    └──── Callable (accessor)
//!         ├─ Callable (top-level function) ── Block ...
//!         └─ File (body locals) ── Block ...
//! ```

use pure_core::{Diagnostics, IssueSink, NodeId, SemanticError, Span, TypeId};

use crate::ast::{
    Block, ComputedPropertyDef, Expr, ExprKind, FunctionDef, Generator, GenericParameterDef, InitializerDef, Member,
    OperatorDef, ParameterDef, PropertyDef, SourceFile, Stmt, StmtKind, TypeDef, TypeDefKind,
};
use crate::facts::DeclarationMap;
use crate::model::{
    DeclarationKind, Signature, SignatureKind, SignatureParameter, TypeDeclaration, TypeKind, ValueDeclaration,
    prelude,
};
use crate::model::SemanticModel;
use crate::scope::{ScopeId, ScopeKind};

/// Output of the declare pass.
#[derive(Debug, Default)]
pub struct DeclareOutput {
    pub declarations: DeclarationMap,
}

/// Pass 1: create declarations and scopes.
pub struct DeclarePass<'a> {
    model: &'a mut SemanticModel,
    diagnostics: &'a mut Diagnostics,
    declarations: DeclarationMap,
}

impl<'a> DeclarePass<'a> {
    pub fn new(model: &'a mut SemanticModel, diagnostics: &'a mut Diagnostics) -> Self {
        Self {
            model,
            diagnostics,
            declarations: DeclarationMap::default(),
        }
    }

    /// Run the declare pass on all files.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, files: &[&SourceFile]) -> DeclareOutput {
        let global = self.model.scopes.global();

        // Types first, so members of any file can be declared against them.
        let mut declared = Vec::new();
        for file in files {
            for def in &file.types {
                if let Some(id) = self.declare_type(def, global) {
                    declared.push((id, def));
                }
            }
        }
        self.fill_builtins();

        for file in files {
            for def in &file.functions {
                self.declare_function(def, global, None);
            }
        }
        for (id, def) in &declared {
            self.declare_members(*id, def);
        }
        for (id, _) in &declared {
            self.synthesize_initializer(*id);
        }
        for file in files {
            let scope = self.model.scopes.new_scope(ScopeKind::File, global);
            self.declarations.scopes.insert(file.id, scope);
            self.declarations.scopes.insert(file.body.id, scope);
            self.declare_statements(&file.body.statements, scope);
        }

        tracing::debug!(
            types = self.model.types().count(),
            values = self.model.values().count(),
            signatures = self.model.signature_count(),
            scopes = self.model.scopes.len(),
            "declarations created"
        );

        DeclareOutput {
            declarations: self.declarations,
        }
    }

    fn redeclaration(&mut self, kind: &str, name: &str, previous: Span, span: Span) {
        self.diagnostics.add_issue(SemanticError::Redeclaration {
            kind: kind.to_string(),
            name: name.to_string(),
            previous,
            span,
        });
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    fn declare_type(&mut self, def: &TypeDef, global: ScopeId) -> Option<TypeId> {
        let kind = match def.kind {
            TypeDefKind::Class => TypeKind::Class,
            TypeDefKind::Object => TypeKind::Object,
            TypeDefKind::Trait => TypeKind::Trait,
        };
        let mut declaration = TypeDeclaration::new(def.name.clone(), kind, def.span);
        declaration.node = Some(def.id);
        declaration.is_abstract |= def.is_abstract;
        let id = self.model.add_type(declaration);

        if let Err(previous) = self.model.scopes.declare_type(global, &def.name, id) {
            let previous = self.model[previous].span;
            self.redeclaration("type", &def.name, previous, def.span);
            return None;
        }

        let scope = self.model.scopes.new_scope(ScopeKind::Type(id), global);
        self.model[id].scope = Some(scope);
        self.declarations.types.insert(def.id, id);
        self.declarations.scopes.insert(def.id, scope);

        let generics = self.declare_generics(&def.generics, scope);
        self.model[id].generic_parameters = generics;
        tracing::trace!(name = %def.name, id = %id, "declared type");
        Some(id)
    }

    fn declare_generics(&mut self, generics: &[GenericParameterDef], scope: ScopeId) -> Vec<TypeId> {
        let mut declared = Vec::with_capacity(generics.len());
        for generic in generics {
            let mut declaration = TypeDeclaration::new(generic.name.clone(), TypeKind::GenericParameter, generic.span);
            declaration.node = Some(generic.id);
            let id = self.model.add_type(declaration);
            if let Err(previous) = self.model.scopes.declare_type(scope, &generic.name, id) {
                let previous = self.model[previous].span;
                self.redeclaration("type parameter", &generic.name, previous, generic.span);
                continue;
            }
            self.declarations.types.insert(generic.id, id);
            declared.push(id);
        }
        declared
    }

    fn fill_builtins(&mut self) {
        let global = self.model.scopes.global();
        let scopes = &self.model.scopes;
        self.model.builtins.int = scopes.resolve_type(global, prelude::INT);
        self.model.builtins.float = scopes.resolve_type(global, prelude::FLOAT);
        self.model.builtins.bool = scopes.resolve_type(global, prelude::BOOL);
        self.model.builtins.string = scopes.resolve_type(global, prelude::STRING);
        self.model.builtins.error = scopes.resolve_type(global, prelude::ERROR);
    }

    // ==========================================================================
    // Members
    // ==========================================================================

    fn declare_members(&mut self, owner: TypeId, def: &TypeDef) {
        let Some(scope) = self.model[owner].scope else {
            return;
        };
        for member in &def.members {
            match member {
                Member::Property(property) => self.declare_property(owner, scope, property),
                Member::Computed(computed) => self.declare_computed(owner, scope, computed),
                Member::Function(function) => self.declare_function(function, scope, Some(owner)),
                Member::Initializer(initializer) => self.declare_initializer(owner, scope, initializer),
                Member::Operator(operator) => self.declare_operator(owner, scope, operator),
            }
        }
    }

    fn declare_property(&mut self, owner: TypeId, scope: ScopeId, def: &PropertyDef) {
        let mut declaration = ValueDeclaration::new(def.name.clone(), DeclarationKind::Property, def.span);
        declaration.node = Some(def.id);
        declaration.is_constant = def.constant;
        declaration.is_static = def.is_static;
        declaration.is_abstract = def.is_abstract;
        declaration.has_value = def.value.is_some();
        declaration.owner = Some(owner);
        let id = self.model.add_value(declaration);

        if let Err(previous) = self.model.scopes.declare_value(scope, &def.name, id, None) {
            let previous = self.model[previous].span;
            self.redeclaration("property", &def.name, previous, def.span);
        } else {
            self.model[owner].properties.push(id);
        }
        self.declarations.values.insert(def.id, id);
        if let Some(value) = &def.value {
            self.declare_expr(value, scope);
        }
    }

    fn declare_computed(&mut self, owner: TypeId, scope: ScopeId, def: &ComputedPropertyDef) {
        let mut declaration = ValueDeclaration::new(def.name.clone(), DeclarationKind::ComputedProperty, def.span);
        declaration.node = Some(def.id);
        declaration.owner = Some(owner);
        declaration.is_constant = def.setter.is_none();
        let id = self.model.add_value(declaration);

        if let Err(previous) = self.model.scopes.declare_value(scope, &def.name, id, None) {
            let previous = self.model[previous].span;
            self.redeclaration("computed property", &def.name, previous, def.span);
        }
        self.declarations.values.insert(def.id, id);

        if let Some(getter) = &def.getter {
            let callable = self.model.scopes.new_scope(ScopeKind::Callable, scope);
            let mut signature = Signature::new(SignatureKind::Getter, def.name.clone(), def.span);
            signature.owner = Some(owner);
            signature.node = Some(getter.id);
            signature.scope = Some(callable);
            let signature = self.model.add_signature(signature);
            self.model[id].signatures.push(signature);
            self.declarations.signatures.insert(getter.id, signature);
            self.declare_expr(getter, callable);
        }

        if let Some(setter) = &def.setter {
            let callable = self.model.scopes.new_scope(ScopeKind::Callable, scope);
            let mut value = ValueDeclaration::new("newValue", DeclarationKind::Parameter, def.span);
            value.has_value = true;
            let value = self.model.add_value(value);
            let _ = self.model.scopes.declare_value(callable, "newValue", value, None);

            let mut signature = Signature::new(SignatureKind::Setter, def.name.clone(), def.span);
            signature.owner = Some(owner);
            signature.node = Some(setter.id);
            signature.scope = Some(callable);
            signature.parameters.push(SignatureParameter {
                name: "newValue".to_string(),
                span: def.span,
                ty: None,
                declaration: Some(value),
                property: None,
            });
            let signature = self.model.add_signature(signature);
            self.model[id].signatures.push(signature);
            self.declarations.signatures.insert(setter.id, signature);
            self.declare_block(setter, callable);
        }
    }

    fn declare_function(&mut self, def: &FunctionDef, scope: ScopeId, owner: Option<TypeId>) {
        let callable = self.model.scopes.new_scope(ScopeKind::Callable, scope);
        let mut signature = Signature::new(SignatureKind::Function, def.name.clone(), def.span);
        signature.owner = owner;
        signature.node = Some(def.id);
        signature.scope = Some(callable);
        signature.is_abstract = def.is_abstract;
        signature.is_overriding = def.is_overriding;
        signature.is_native = def.is_native;
        signature.generic_parameters = self.declare_generics(&def.generics, callable);
        signature.parameters = self.declare_parameters(&def.parameters, callable);
        signature.is_variadic = def.parameters.last().is_some_and(|p| p.variadic);
        let signature = self.model.add_signature(signature);
        self.declarations.signatures.insert(def.id, signature);

        // All overloads of a name share one declaration.
        let function = match self.model.scopes.own_value(scope, &def.name) {
            Some(existing) if self.model[existing].kind == DeclarationKind::Function => Some(existing),
            Some(existing) => {
                let previous = self.model[existing].span;
                self.redeclaration("function", &def.name, previous, def.span);
                None
            }
            None => {
                let mut declaration = ValueDeclaration::new(def.name.clone(), DeclarationKind::Function, def.span);
                declaration.owner = owner;
                declaration.is_constant = true;
                let id = self.model.add_value(declaration);
                let _ = self.model.scopes.declare_value(scope, &def.name, id, None);
                Some(id)
            }
        };
        if let Some(function) = function {
            self.model[function].signatures.push(signature);
            self.declarations.values.insert(def.id, function);
        }

        if let Some(body) = &def.body {
            self.declare_block(body, callable);
        }
    }

    fn declare_initializer(&mut self, owner: TypeId, scope: ScopeId, def: &InitializerDef) {
        let callable = self.model.scopes.new_scope(ScopeKind::Callable, scope);
        let mut signature = Signature::new(SignatureKind::Initializer, "init", def.span);
        signature.owner = Some(owner);
        signature.node = Some(def.id);
        signature.scope = Some(callable);
        signature.is_converting = def.is_converting;
        signature.is_native = def.is_native;
        signature.generic_parameters = self.declare_generics(&def.generics, callable);
        signature.parameters = self.declare_parameters(&def.parameters, callable);
        signature.is_variadic = def.parameters.last().is_some_and(|p| p.variadic);
        let signature = self.model.add_signature(signature);
        self.model[owner].initializers.push(signature);
        self.declarations.signatures.insert(def.id, signature);

        if let Some(body) = &def.body {
            self.declare_block(body, callable);
        }
    }

    fn declare_operator(&mut self, owner: TypeId, scope: ScopeId, def: &OperatorDef) {
        let callable = self.model.scopes.new_scope(ScopeKind::Callable, scope);
        let mut signature = Signature::new(SignatureKind::Operator(def.operator), def.operator.symbol(), def.span);
        signature.owner = Some(owner);
        signature.node = Some(def.id);
        signature.scope = Some(callable);
        signature.is_native = def.is_native;
        signature.parameters = self.declare_parameters(&def.parameters, callable);
        let signature = self.model.add_signature(signature);
        self.model.scopes.declare_operator(scope, def.operator, signature);
        self.declarations.signatures.insert(def.id, signature);

        if let Some(body) = &def.body {
            self.declare_block(body, callable);
        }
    }

    /// Declare parameters as locals of a callable scope. Property parameters
    /// get no local; they are linked to their property by determine-types.
    fn declare_parameters(&mut self, parameters: &[ParameterDef], callable: ScopeId) -> Vec<SignatureParameter> {
        let mut declared = Vec::with_capacity(parameters.len());
        for parameter in parameters {
            let declaration = match parameter.ty {
                Some(_) => self.declare_parameter(parameter, callable),
                None => None,
            };
            declared.push(SignatureParameter {
                name: parameter.name.clone(),
                span: parameter.span,
                ty: None,
                declaration,
                property: None,
            });
        }
        declared
    }

    fn declare_parameter(&mut self, parameter: &ParameterDef, callable: ScopeId) -> Option<pure_core::DeclId> {
        let mut declaration = ValueDeclaration::new(parameter.name.clone(), DeclarationKind::Parameter, parameter.span);
        declaration.node = Some(parameter.id);
        declaration.has_value = true;
        let id = self.model.add_value(declaration);
        self.declarations.values.insert(parameter.id, id);
        if let Err(previous) = self.model.scopes.declare_value(callable, &parameter.name, id, None) {
            let previous = self.model[previous].span;
            self.redeclaration("parameter", &parameter.name, previous, parameter.span);
            return None;
        }
        Some(id)
    }

    fn synthesize_initializer(&mut self, owner: TypeId) {
        let declaration = &self.model[owner];
        if !declaration.is_instantiable() || !declaration.initializers.is_empty() {
            return;
        }
        let Some(scope) = declaration.scope else {
            return;
        };
        let span = declaration.span;
        let callable = self.model.scopes.new_scope(ScopeKind::Callable, scope);
        let mut signature = Signature::new(SignatureKind::Initializer, "init", span);
        signature.owner = Some(owner);
        signature.scope = Some(callable);
        signature.is_synthesized = true;
        signature.return_type = Some(crate::types::Type::NOTHING);
        let signature = self.model.add_signature(signature);
        self.model[owner].initializers.push(signature);
        self.declarations.synthesized.insert(owner, signature);
    }

    // ==========================================================================
    // Bodies
    // ==========================================================================

    fn declare_block(&mut self, block: &Block, parent: ScopeId) -> ScopeId {
        let scope = self.model.scopes.new_scope(ScopeKind::Block, parent);
        self.declarations.scopes.insert(block.id, scope);
        self.declare_statements(&block.statements, scope);
        scope
    }

    fn declare_statements(&mut self, statements: &[Stmt], scope: ScopeId) {
        for statement in statements {
            self.declare_statement(statement, scope);
        }
    }

    fn declare_statement(&mut self, statement: &Stmt, scope: ScopeId) {
        match &statement.kind {
            StmtKind::Expr(expr) | StmtKind::Raise(expr) | StmtKind::Return(Some(expr)) => {
                self.declare_expr(expr, scope)
            }
            StmtKind::Variable(def) => {
                if let Some(value) = &def.value {
                    self.declare_expr(value, scope);
                }
                let mut declaration =
                    ValueDeclaration::new(def.name.clone(), DeclarationKind::LocalVariable, statement.span);
                declaration.node = Some(statement.id);
                declaration.is_constant = def.constant;
                declaration.has_value = def.value.is_some();
                let id = self.model.add_value(declaration);
                self.declarations.values.insert(statement.id, id);
                if let Err(previous) = self
                    .model
                    .scopes
                    .declare_value(scope, &def.name, id, Some(statement.span))
                {
                    let previous = self.model[previous].span;
                    self.redeclaration("local variable", &def.name, previous, statement.span);
                }
            }
            StmtKind::Loop(loop_stmt) => {
                let body = self.model.scopes.new_scope(ScopeKind::Block, scope);
                self.declarations.scopes.insert(loop_stmt.body.id, body);
                match &loop_stmt.generator {
                    Some(Generator::While { condition, .. }) => self.declare_expr(condition, scope),
                    Some(Generator::Over { collection, binding }) => {
                        self.declare_expr(collection, scope);
                        if let Some(binding) = binding {
                            self.declare_binding(binding.id, &binding.name, binding.span, body);
                        }
                    }
                    None => {}
                }
                self.declare_statements(&loop_stmt.body.statements, body);
            }
            StmtKind::Handle(handle) => {
                self.declare_block(&handle.main, scope);
                for handler in &handle.handlers {
                    let body = self.model.scopes.new_scope(ScopeKind::Block, scope);
                    self.declarations.scopes.insert(handler.body.id, body);
                    if let Some(binding) = &handler.binding {
                        self.declare_binding(binding.id, &binding.name, binding.span, body);
                    }
                    self.declare_statements(&handler.body.statements, body);
                }
                if let Some(always) = &handle.always {
                    self.declare_block(always, scope);
                }
            }
            StmtKind::Return(None) | StmtKind::Break | StmtKind::Next => {}
        }
    }

    /// A loop or handler binding, visible throughout the body.
    fn declare_binding(&mut self, node: NodeId, name: &str, span: Span, scope: ScopeId) {
        let mut declaration = ValueDeclaration::new(name, DeclarationKind::LocalVariable, span);
        declaration.node = Some(node);
        declaration.has_value = true;
        let id = self.model.add_value(declaration);
        self.declarations.values.insert(node, id);
        let _ = self.model.scopes.declare_value(scope, name, id, None);
    }

    /// Walk an expression for the blocks and closures it contains.
    fn declare_expr(&mut self, expr: &Expr, scope: ScopeId) {
        match &expr.kind {
            ExprKind::Literal(_) | ExprKind::Variable(_) | ExprKind::SelfRef | ExprKind::SuperRef => {}
            ExprKind::Member { target, .. } => self.declare_expr(target, scope),
            ExprKind::Call { callee, arguments, .. } => {
                self.declare_expr(callee, scope);
                for argument in arguments {
                    self.declare_expr(argument, scope);
                }
            }
            ExprKind::Binary { left, right, .. } => {
                self.declare_expr(left, scope);
                self.declare_expr(right, scope);
            }
            ExprKind::Unary { operand, .. } => self.declare_expr(operand, scope),
            ExprKind::Assign { target, value, .. } => {
                self.declare_expr(target, scope);
                self.declare_expr(value, scope);
            }
            ExprKind::Step { target, .. } => self.declare_expr(target, scope),
            ExprKind::If(if_expr) => {
                self.declare_expr(&if_expr.condition, scope);
                self.declare_block(&if_expr.positive, scope);
                if let Some(negative) = &if_expr.negative {
                    self.declare_block(negative, scope);
                }
            }
            ExprKind::Switch(switch) => {
                self.declare_expr(&switch.subject, scope);
                for case in &switch.cases {
                    self.declare_expr(&case.condition, scope);
                    self.declare_block(&case.body, scope);
                }
                if let Some(else_branch) = &switch.else_branch {
                    self.declare_block(else_branch, scope);
                }
            }
            ExprKind::HasValue(subject) => self.declare_expr(subject, scope),
            ExprKind::IsCheck { subject, .. } => self.declare_expr(subject, scope),
            ExprKind::Closure(closure) => {
                let callable = self.model.scopes.new_scope(ScopeKind::Callable, scope);
                self.declarations.scopes.insert(expr.id, callable);
                for parameter in &closure.parameters {
                    self.declare_parameter(parameter, callable);
                }
                self.declare_block(&closure.body, callable);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Builder;

    fn declare(files: &[&SourceFile]) -> (SemanticModel, DeclarationMap, Diagnostics) {
        let mut model = SemanticModel::new();
        let mut diagnostics = Diagnostics::new();
        let output = DeclarePass::new(&mut model, &mut diagnostics).run(files);
        (model, output.declarations, diagnostics)
    }

    #[test]
    fn declares_types_members_and_default_initializer() {
        let b = Builder::new();
        let point = b
            .class(1, "Point")
            .with_member(b.property(2, "x", Some(b.ty("Int")), None))
            .with_member(b.function(3, "length").with_body(b.block(Vec::new())));
        let file = b.file("main", b.block(Vec::new())).with_type(point);

        let (model, declarations, diagnostics) = declare(&[&file]);
        assert!(diagnostics.is_empty());
        let global = model.scopes.global();
        let point = model.scopes.resolve_type(global, "Point").expect("Point declared");
        assert_eq!(model[point].properties.len(), 1);
        assert_eq!(model[point].initializers.len(), 1);
        assert!(model[model[point].initializers[0]].is_synthesized);
        assert_eq!(declarations.synthesized.get(&point), model[point].initializers.first());
        let scope = model[point].scope.expect("type scope");
        assert!(model.scopes.own_value(scope, "length").is_some());
    }

    #[test]
    fn overloads_share_one_declaration() {
        let b = Builder::new();
        let file = b
            .file("main", b.block(Vec::new()))
            .with_function(b.function(1, "exists").with_parameter(b.param(1, "index", b.ty("Int"))))
            .with_function(b.function(2, "exists").with_parameter(b.param(2, "element", b.ty("String"))));

        let (model, _, diagnostics) = declare(&[&file]);
        assert!(diagnostics.is_empty());
        let global = model.scopes.global();
        let exists = model.scopes.own_value(global, "exists").expect("function declared");
        assert_eq!(model[exists].signatures.len(), 2);
    }

    #[test]
    fn duplicate_locals_are_redeclarations() {
        let b = Builder::new();
        let body = b.block(vec![
            b.at(1).var_decl("a", None, Some(b.int(0))),
            b.at(2).var_decl("a", None, Some(b.int(1))),
        ]);
        let file = b.file("main", body);

        let (_, _, diagnostics) = declare(&[&file]);
        let errors: Vec<_> = diagnostics.errors().collect();
        assert_eq!(errors.len(), 1);
        match errors[0] {
            SemanticError::Redeclaration { name, previous, .. } => {
                assert_eq!(name, "a");
                assert_eq!(previous.line, 1);
            }
            other => panic!("Expected Redeclaration, got: {:?}", other),
        }
    }

    #[test]
    fn traits_get_no_default_initializer() {
        let b = Builder::new();
        let file = b.file("main", b.block(Vec::new())).with_type(b.trait_def(1, "Shape"));
        let (model, _, _) = declare(&[&file]);
        let shape = model.scopes.resolve_type(model.scopes.global(), "Shape").expect("Shape declared");
        assert!(model[shape].initializers.is_empty());
    }

    #[test]
    fn prelude_fills_builtins() {
        let prelude = prelude::file();
        let (model, _, diagnostics) = declare(&[&prelude]);
        assert!(diagnostics.is_empty());
        assert!(model.builtins.int.is_some());
        assert!(model.builtins.string.is_some());
        assert!(model.builtins.error.is_some());
    }
}
