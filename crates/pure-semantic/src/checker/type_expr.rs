//! Resolution of type annotations.

use pure_core::SemanticError;

use crate::ast::{TypeExpr, TypeExprKind};
use crate::scope::ScopeId;
use crate::types::{FunctionSignature, FunctionType, LiteralType, ObjectType, Type, TypeArgument, UnionKind, bind};

use super::{PendingBound, TypeChecker};

impl TypeChecker<'_> {
    /// Resolve a type annotation in the current scope.
    pub fn resolve_type(&mut self, expr: &TypeExpr) -> Option<Type> {
        let scope = self.scope();
        self.resolve_type_in(expr, scope)
    }

    /// Resolve a type annotation in `scope`.
    pub fn resolve_type_in(&mut self, expr: &TypeExpr, scope: ScopeId) -> Option<Type> {
        let ty = match &expr.kind {
            TypeExprKind::Named { name, arguments } => {
                if let Some(literal) = LiteralType::from_name(name) {
                    Some(Type::Literal(literal))
                } else {
                    let mut resolved = Vec::with_capacity(arguments.len());
                    for argument in arguments {
                        let ty = self.resolve_type_in(&argument.ty, scope);
                        resolved.push(ty.map(|ty| TypeArgument {
                            variance: argument.variance,
                            ty,
                        }));
                    }
                    self.resolve_named(name, resolved, expr, scope)
                }
            }
            TypeExprKind::Optional(base) => self.resolve_type_in(base, scope).map(Type::optional),
            TypeExprKind::Plural(base) => self.resolve_type_in(base, scope).map(Type::plural),
            TypeExprKind::Union { kind, members } => {
                let members: Option<Vec<Type>> = members
                    .iter()
                    .map(|member| self.resolve_type_in(member, scope))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .collect();
                members.map(|members| match kind {
                    UnionKind::And => Type::and(members),
                    UnionKind::Or => Type::or(members),
                })
            }
            TypeExprKind::Function {
                parameters,
                return_type,
            } => {
                let parameters: Option<Vec<Type>> = parameters
                    .iter()
                    .map(|parameter| self.resolve_type_in(parameter, scope))
                    .collect::<Vec<_>>()
                    .into_iter()
                    .collect();
                let return_type = match return_type {
                    Some(return_type) => self.resolve_type_in(return_type, scope),
                    None => Some(Type::NOTHING),
                };
                match (parameters, return_type) {
                    (Some(parameters), Some(return_type)) => Some(Type::Function(FunctionType {
                        signatures: vec![FunctionSignature {
                            is_variadic: parameters.last().is_some_and(|p| matches!(p, Type::Plural(_))),
                            parameters,
                            return_type: Box::new(return_type),
                        }],
                    })),
                    _ => None,
                }
            }
            TypeExprKind::SelfType => match self.model.scopes.enclosing_type(scope) {
                Some(owner) => Some(Type::SelfType(owner)),
                None => {
                    self.report(SemanticError::NotFound {
                        kind: "type".to_string(),
                        name: "Self".to_string(),
                        span: expr.span,
                    });
                    None
                }
            },
        };
        if let Some(ty) = &ty {
            self.facts.type_exprs.insert(expr.id, ty.clone());
        }
        ty
    }

    fn resolve_named(
        &mut self,
        name: &str,
        arguments: Vec<Option<TypeArgument>>,
        expr: &TypeExpr,
        scope: ScopeId,
    ) -> Option<Type> {
        let Some(declaration) = self.model.scopes.resolve_type(scope, name) else {
            self.report(SemanticError::NotFound {
                kind: "type".to_string(),
                name: name.to_string(),
                span: expr.span,
            });
            return None;
        };

        let expected = self.model[declaration].generic_parameters.len();
        if arguments.is_empty() {
            // A generic type named without arguments refers to itself.
            return Some(self.model.instance_type(declaration));
        }
        if arguments.len() != expected {
            self.report(SemanticError::TypeParameterCountMismatch {
                name: name.to_string(),
                expected,
                found: arguments.len(),
                span: expr.span,
            });
            return None;
        }
        let arguments: Vec<TypeArgument> = arguments.into_iter().collect::<Option<_>>()?;

        let parameters = self.model[declaration].generic_parameters.clone();
        let substitution = bind(&parameters, &arguments);
        for (parameter, argument) in parameters.iter().zip(&arguments) {
            self.pending_bounds.push(PendingBound {
                argument: argument.ty.clone(),
                parameter: *parameter,
                substitution: substitution.clone(),
                span: expr.span,
            });
        }
        Some(Type::Object(ObjectType {
            declaration,
            arguments,
        }))
    }
}

#[cfg(test)]
mod tests {
    use pure_core::Diagnostics;

    use super::*;
    use crate::ast::Builder;
    use crate::facts::DeclarationMap;
    use crate::model::{SemanticModel, TypeDeclaration, TypeKind};

    fn model() -> SemanticModel {
        let mut model = SemanticModel::new();
        let global = model.scopes.global();
        for name in ["Int", "Animal", "Dog"] {
            let id = model.add_type(TypeDeclaration::new(name, TypeKind::Class, Default::default()));
            model.scopes.declare_type(global, name, id).unwrap();
        }
        let list = model.add_type(TypeDeclaration::new("List", TypeKind::Class, Default::default()));
        let element = model.add_type(TypeDeclaration::new("Element", TypeKind::GenericParameter, Default::default()));
        model[list].generic_parameters = vec![element];
        model.scopes.declare_type(global, "List", list).unwrap();
        let animal = model.scopes.resolve_type(global, "Animal").unwrap();
        let dog = model.scopes.resolve_type(global, "Dog").unwrap();
        model[dog].supertypes = vec![Type::object(animal)];
        model[element].bound = Some(Type::object(animal));
        model
    }

    #[test]
    fn resolves_nested_annotations() {
        let mut model = model();
        let declarations = DeclarationMap::default();
        let mut diagnostics = Diagnostics::new();
        let b = Builder::new();
        let annotation = b.optional(b.generic_ty("List", vec![b.producing(b.ty("Dog"))]));

        let mut checker = TypeChecker::new(&mut model, &declarations, &mut diagnostics);
        let ty = checker.resolve_type(&annotation).expect("resolved");
        checker.flush_bound_checks();
        drop(checker);

        assert!(diagnostics.is_empty());
        assert_eq!(model.display(&ty).to_string(), "<Dog producing>List?");
    }

    #[test]
    fn reports_argument_count_mismatch() {
        let mut model = model();
        let declarations = DeclarationMap::default();
        let mut diagnostics = Diagnostics::new();
        let b = Builder::new();
        let annotation = b.generic_ty("List", vec![b.arg(b.ty("Int")), b.arg(b.ty("Int"))]);

        let mut checker = TypeChecker::new(&mut model, &declarations, &mut diagnostics);
        assert!(checker.resolve_type(&annotation).is_none());
        drop(checker);

        match diagnostics.errors().next() {
            Some(SemanticError::TypeParameterCountMismatch { expected, found, .. }) => {
                assert_eq!((*expected, *found), (1, 2));
            }
            other => panic!("Expected TypeParameterCountMismatch, got: {:?}", other),
        }
    }

    #[test]
    fn reports_bound_violations() {
        let mut model = model();
        let declarations = DeclarationMap::default();
        let mut diagnostics = Diagnostics::new();
        let b = Builder::new();
        let annotation = b.generic_ty("List", vec![b.arg(b.ty("Int"))]);

        let mut checker = TypeChecker::new(&mut model, &declarations, &mut diagnostics);
        assert!(checker.resolve_type(&annotation).is_some());
        checker.flush_bound_checks();
        drop(checker);

        assert!(matches!(
            diagnostics.errors().next(),
            Some(SemanticError::TypeParameterNotAssignable { parameter, .. }) if parameter == "Element"
        ));
    }

    #[test]
    fn unknown_names_are_not_found() {
        let mut model = model();
        let declarations = DeclarationMap::default();
        let mut diagnostics = Diagnostics::new();
        let b = Builder::new();

        let mut checker = TypeChecker::new(&mut model, &declarations, &mut diagnostics);
        assert!(checker.resolve_type(&b.ty("Point")).is_none());
        assert_eq!(checker.resolve_type(&b.ty("Any")), Some(Type::ANY));
        drop(checker);

        assert!(matches!(
            diagnostics.errors().next(),
            Some(SemanticError::NotFound { kind, name, .. }) if kind == "type" && name == "Point"
        ));
    }
}
