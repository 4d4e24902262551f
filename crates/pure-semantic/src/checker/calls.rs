//! Calls, constructions and operator applications.
//!
//! ## Callee Forms
//!
//! | callee             | candidates                                    | kind         |
//! |--------------------|-----------------------------------------------|--------------|
//! | `name(...)`        | the overload set `name` resolves to           | Function/Method |
//! | `Type(...)`        | initializers of `Type`                        | Construction |
//! | `init(...)`        | initializers of the enclosing type            | Delegation   |
//! | `super.init(...)`  | initializers of the first super-type          | Delegation   |
//! | `value.name(...)`  | member functions visible on the value's type  | Method       |
//! | any other value    | the signatures of its function type           | (unresolved) |

use pure_core::{SemanticError, SignatureId, TypeId};

use crate::ast::{Expr, ExprKind, OperatorKind, TypeExpr};
use crate::facts::{CallKind, CallResolution};
use crate::model::DeclarationKind;
use crate::overload::{CallSite, Candidate, ResolutionError, resolve_overload};
use crate::types::{Position, Substitution, Type, TypeInference, substitute};

use super::TypeChecker;

/// What a call expression invokes.
enum Callee {
    Signatures {
        candidates: Vec<Candidate>,
        kind: CallKind,
        name: String,
        /// Receiver is optional and the call short-circuits on null.
        optional: bool,
    },
    Construction(TypeId),
    /// A value of function type.
    Value(Type),
    Unknown,
}

impl TypeChecker<'_> {
    pub(crate) fn check_call(
        &mut self,
        expr: &Expr,
        callee: &Expr,
        type_arguments: &[TypeExpr],
        arguments: &[Expr],
    ) -> Option<Type> {
        let callee = self.classify_callee(callee);
        let type_arguments: Vec<Type> = type_arguments
            .iter()
            .filter_map(|argument| self.resolve_type(argument))
            .collect();
        let argument_types: Vec<Option<Type>> = arguments.iter().map(|argument| self.check_expr(argument)).collect();

        match callee {
            Callee::Signatures {
                candidates,
                kind,
                name,
                optional,
            } => {
                let ty = self.resolve_call(expr, &candidates, kind, &name, &type_arguments, &argument_types)?;
                Some(if optional { Type::optional(ty) } else { ty })
            }
            Callee::Construction(declaration) => {
                self.construct(expr, declaration, &type_arguments, &argument_types)
            }
            Callee::Value(ty) => call_function_value(self, &ty, &argument_types),
            Callee::Unknown => None,
        }
    }

    fn classify_callee(&mut self, callee: &Expr) -> Callee {
        match &callee.kind {
            ExprKind::Variable(name) if name == "init" && self.context().is_initializer => {
                let candidates = self.own_initializers();
                Callee::Signatures {
                    candidates,
                    kind: CallKind::Delegation,
                    name: "init".to_string(),
                    optional: false,
                }
            }
            ExprKind::Variable(name) => {
                let scope = self.scope();
                if let Some(declaration) = self.model.scopes.resolve_value(scope, name, Some(callee.span)) {
                    self.facts.bindings.insert(callee.id, declaration);
                    if self.model[declaration].kind == DeclarationKind::Function {
                        let (candidates, kind) = match (self.model[declaration].owner, self.self_type()) {
                            (Some(_), Some(self_type)) => (
                                self.candidates_on(&self_type, name),
                                CallKind::Method,
                            ),
                            _ => (
                                self.model[declaration]
                                    .signatures
                                    .iter()
                                    .copied()
                                    .map(Candidate::plain)
                                    .collect(),
                                CallKind::Function,
                            ),
                        };
                        return Callee::Signatures {
                            candidates,
                            kind,
                            name: name.clone(),
                            optional: false,
                        };
                    }
                    let ty = self.check_expr(callee);
                    return match ty {
                        Some(ty) => Callee::Value(ty),
                        None => Callee::Unknown,
                    };
                }
                if let Some(declaration) = self.model.scopes.resolve_type(scope, name) {
                    self.record(callee.id, Some(Type::Static(declaration)));
                    return Callee::Construction(declaration);
                }
                self.report(SemanticError::NotFound {
                    kind: "function".to_string(),
                    name: name.clone(),
                    span: callee.span,
                });
                Callee::Unknown
            }
            ExprKind::Member { target, name, .. }
                if name == "init" && matches!(target.kind, ExprKind::SuperRef | ExprKind::SelfRef) =>
            {
                let receiver = match target.kind {
                    ExprKind::SuperRef => self.super_type(target.span),
                    _ => self.self_type(),
                };
                if let Some(receiver) = &receiver {
                    self.record(target.id, Some(receiver.clone()));
                }
                let candidates = receiver
                    .map(|receiver| {
                        self.model
                            .initializers(&receiver)
                            .into_iter()
                            .map(Candidate::from)
                            .collect()
                    })
                    .unwrap_or_default();
                Callee::Signatures {
                    candidates,
                    kind: CallKind::Delegation,
                    name: "init".to_string(),
                    optional: false,
                }
            }
            ExprKind::Member {
                target,
                name,
                optional,
            } => {
                let Some(receiver) = self.check_expr(target) else {
                    return Callee::Unknown;
                };
                let lookup = match &receiver {
                    Type::Static(declaration) => Type::object(*declaration),
                    other => other.non_optional().clone(),
                };
                match self.model.find_member(&lookup, name) {
                    Some((declaration, _)) if self.model[declaration].kind == DeclarationKind::Function => {
                        self.facts.bindings.insert(callee.id, declaration);
                        Callee::Signatures {
                            candidates: self.candidates_on(&lookup, name),
                            kind: CallKind::Method,
                            name: name.clone(),
                            optional: *optional && receiver.is_optional(),
                        }
                    }
                    Some((declaration, substitution)) => {
                        self.facts.bindings.insert(callee.id, declaration);
                        match self.member_type(declaration, &substitution) {
                            Some(ty) => Callee::Value(ty),
                            None => Callee::Unknown,
                        }
                    }
                    None => {
                        self.report(SemanticError::NotFound {
                            kind: "function".to_string(),
                            name: name.clone(),
                            span: callee.span,
                        });
                        Callee::Unknown
                    }
                }
            }
            _ => match self.check_expr(callee) {
                Some(Type::Static(declaration)) => Callee::Construction(declaration),
                Some(ty) => Callee::Value(ty),
                None => Callee::Unknown,
            },
        }
    }

    fn candidates_on(&self, receiver: &Type, name: &str) -> Vec<Candidate> {
        self.model
            .member_signatures(receiver, name)
            .into_iter()
            .map(Candidate::from)
            .collect()
    }

    fn own_initializers(&self) -> Vec<Candidate> {
        match self.self_type() {
            Some(self_type) => self
                .model
                .initializers(&self_type)
                .into_iter()
                .map(Candidate::from)
                .collect(),
            None => Vec::new(),
        }
    }

    /// Resolve a call and record the selected signature.
    fn resolve_call(
        &mut self,
        expr: &Expr,
        candidates: &[Candidate],
        kind: CallKind,
        name: &str,
        type_arguments: &[Type],
        arguments: &[Option<Type>],
    ) -> Option<Type> {
        let site = CallSite {
            kind: match kind {
                CallKind::Delegation | CallKind::Construction => "initializer",
                CallKind::Operator => "operator",
                CallKind::Function | CallKind::Method => "function",
            },
            name,
            type_arguments,
            arguments,
            span: expr.span,
        };
        match resolve_overload(self.model, candidates, &site) {
            Ok(matched) => {
                self.facts.calls.insert(
                    expr.id,
                    CallResolution {
                        signature: matched.signature,
                        declared: matched.declared,
                        kind,
                        conversions: matched.conversions,
                    },
                );
                Some(matched.return_type.unwrap_or(Type::NOTHING))
            }
            Err(ResolutionError::Semantic(error)) => {
                self.report(error);
                None
            }
            Err(ResolutionError::Internal(error)) => {
                self.fail(error);
                None
            }
        }
    }

    /// `Type(arguments)`: resolve an initializer and yield an instance.
    fn construct(
        &mut self,
        expr: &Expr,
        declaration: TypeId,
        type_arguments: &[Type],
        arguments: &[Option<Type>],
    ) -> Option<Type> {
        let parameters = self.model[declaration].generic_parameters.clone();
        let name = self.model.type_name(declaration).to_string();

        // Explicit arguments bind the type's own parameters.
        let receiver = if type_arguments.is_empty() {
            None
        } else if type_arguments.len() != parameters.len() {
            self.report(SemanticError::TypeParameterCountMismatch {
                name,
                expected: parameters.len(),
                found: type_arguments.len(),
                span: expr.span,
            });
            return None;
        } else {
            Some(Type::generic(declaration, type_arguments.to_vec()))
        };

        let candidates: Vec<Candidate> = match &receiver {
            Some(receiver) => self
                .model
                .initializers(receiver)
                .into_iter()
                .map(Candidate::from)
                .collect(),
            None => self.model[declaration]
                .initializers
                .clone()
                .into_iter()
                .map(|signature| {
                    let inferred = self.infer_type_arguments(signature, &parameters, arguments);
                    Candidate::new(signature, inferred)
                })
                .collect(),
        };

        let site = CallSite {
            kind: "initializer",
            name: &name,
            type_arguments: &[],
            arguments,
            span: expr.span,
        };
        match resolve_overload(self.model, &candidates, &site) {
            Ok(matched) => {
                let substitution = candidates
                    .iter()
                    .find(|candidate| candidate.signature == matched.declared)
                    .map(|candidate| candidate.substitution.clone())
                    .unwrap_or_default();
                self.facts.calls.insert(
                    expr.id,
                    CallResolution {
                        signature: matched.signature,
                        declared: matched.declared,
                        kind: CallKind::Construction,
                        conversions: matched.conversions,
                    },
                );
                Some(receiver.unwrap_or_else(|| {
                    substitute(&self.model.instance_type(declaration), &substitution, Position::Output)
                }))
            }
            Err(ResolutionError::Semantic(error)) => {
                self.report(error);
                None
            }
            Err(ResolutionError::Internal(error)) => {
                self.fail(error);
                None
            }
        }
    }

    /// Infer a generic type's own parameters from initializer arguments.
    fn infer_type_arguments(
        &self,
        signature: SignatureId,
        parameters: &[TypeId],
        arguments: &[Option<Type>],
    ) -> Substitution {
        if parameters.is_empty() {
            return Substitution::default();
        }
        let mut inference = TypeInference::new(self.model, parameters);
        for (parameter, argument) in self.model[signature].parameters.iter().zip(arguments) {
            if let (Some(parameter), Some(argument)) = (&parameter.ty, argument) {
                inference.unify(parameter, argument);
            }
        }
        inference.finish(&Substitution::default()).unwrap_or_default()
    }

    /// Resolve an overloaded operator on `receiver`.
    pub(crate) fn resolve_operator(
        &mut self,
        expr: &Expr,
        receiver: &Type,
        operator: OperatorKind,
        arguments: &[Option<Type>],
    ) -> Option<Type> {
        let candidates: Vec<Candidate> = self
            .model
            .operator_signatures(receiver, operator)
            .into_iter()
            .map(Candidate::from)
            .collect();
        self.resolve_call(expr, &candidates, CallKind::Operator, operator.symbol(), &[], arguments)
    }
}

/// Call a value of function type: the first signature accepting the
/// arguments determines the result.
fn call_function_value(checker: &mut TypeChecker<'_>, callee: &Type, arguments: &[Option<Type>]) -> Option<Type> {
    let Type::Function(function) = callee else {
        return None;
    };
    function
        .signatures
        .iter()
        .find(|signature| {
            signature.parameters.len() == arguments.len()
                && signature
                    .parameters
                    .iter()
                    .zip(arguments)
                    .all(|(parameter, argument)| match argument {
                        Some(argument) => checker.model.accepts(parameter, argument),
                        None => true,
                    })
        })
        .map(|signature| (*signature.return_type).clone())
}
