//! Rendering types and signatures for diagnostics and reports.
//!
//! - Objects: `Int`, `<Int, String>Map`, `<Int producing>List`
//! - Optionals: `Int?`
//! - Unions: members sorted, `Int | String`, `Comparable & Hashable`
//! - Functions: `(Int) => Bool`, `=>|` for procedures without parameters
//! - Signatures: `List.exists(Int): Bool`, `(Element; Element)` with generics

use std::fmt;

use pure_core::SignatureId;

use crate::model::{SemanticModel, SignatureKind};

use super::{FunctionSignature, LiteralType, Type, TypeArgument, UnionKind, Variance};

/// Display adapter for a [`Type`].
pub struct TypeDisplay<'a> {
    model: &'a SemanticModel,
    ty: &'a Type,
}

impl fmt::Display for TypeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.model;
        match self.ty {
            Type::Literal(literal) => write!(f, "{}", literal.name()),
            Type::Object(object) => {
                if !object.arguments.is_empty() {
                    let arguments: Vec<String> = object
                        .arguments
                        .iter()
                        .map(|argument| render_argument(model, argument))
                        .collect();
                    write!(f, "<{}>", arguments.join(", "))?;
                }
                write!(f, "{}", model.type_name(object.declaration))
            }
            Type::Optional(base) => write!(f, "{}?", model.display(base)),
            Type::Union(union) => {
                let separator = match union.kind {
                    UnionKind::And => " & ",
                    UnionKind::Or => " | ",
                };
                let mut members: Vec<String> = union
                    .members
                    .iter()
                    .map(|member| match member {
                        Type::Union(_) => format!("({})", model.display(member)),
                        _ => model.display(member).to_string(),
                    })
                    .collect();
                members.sort();
                write!(f, "{}", members.join(separator))
            }
            Type::Function(function) => {
                let signatures: Vec<String> = function
                    .signatures
                    .iter()
                    .map(|signature| render_function_signature(model, signature))
                    .collect();
                write!(f, "{}", signatures.join(" & "))
            }
            Type::Static(declaration) => write!(f, "{}", model.type_name(*declaration)),
            Type::SelfType(_) => write!(f, "Self"),
            Type::Plural(base) => write!(f, "...{}", model.display(base)),
        }
    }
}

fn render_argument(model: &SemanticModel, argument: &TypeArgument) -> String {
    match argument.variance {
        Variance::Invariant => model.display(&argument.ty).to_string(),
        Variance::Producing => format!("{} producing", model.display(&argument.ty)),
        Variance::Consuming => format!("{} consuming", model.display(&argument.ty)),
    }
}

fn render_function_signature(model: &SemanticModel, signature: &FunctionSignature) -> String {
    let mut rendered = String::new();
    if !signature.parameters.is_empty() {
        let parameters: Vec<String> = signature
            .parameters
            .iter()
            .map(|parameter| model.display(parameter).to_string())
            .collect();
        rendered.push_str(&format!("({}) ", parameters.join(", ")));
    }
    match *signature.return_type {
        Type::Literal(LiteralType::Nothing) => rendered.push_str("=>|"),
        ref return_type => rendered.push_str(&format!("=> {}", model.display(return_type))),
    }
    rendered
}

/// Display adapter for a signature: `Owner.name(Parameters): Return`.
pub struct SignatureDisplay<'a> {
    model: &'a SemanticModel,
    signature: SignatureId,
}

impl fmt::Display for SignatureDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let model = self.model;
        let signature = &model[self.signature];
        if let Some(owner) = signature.owner {
            write!(f, "{}.", model.type_name(owner))?;
        }
        match signature.kind {
            SignatureKind::Initializer => write!(f, "init")?,
            SignatureKind::Operator(operator) => write!(f, "{}", operator.symbol())?,
            _ => write!(f, "{}", signature.name)?,
        }
        write!(f, "(")?;
        if !signature.generic_parameters.is_empty() {
            let generics: Vec<&str> = signature
                .generic_parameters
                .iter()
                .map(|parameter| model.type_name(*parameter))
                .collect();
            write!(f, "{};", generics.join(", "))?;
            if !signature.parameters.is_empty() {
                write!(f, " ")?;
            }
        }
        let parameters: Vec<String> = signature
            .parameters
            .iter()
            .map(|parameter| match &parameter.ty {
                Some(ty) => model.display(ty).to_string(),
                None => "?".to_string(),
            })
            .collect();
        write!(f, "{})", parameters.join(", "))?;
        match &signature.return_type {
            Some(Type::Literal(LiteralType::Nothing)) | None => Ok(()),
            Some(return_type) => write!(f, ": {}", model.display(return_type)),
        }
    }
}

impl SemanticModel {
    pub fn display<'a>(&'a self, ty: &'a Type) -> TypeDisplay<'a> {
        TypeDisplay { model: self, ty }
    }

    pub fn display_signature(&self, signature: SignatureId) -> SignatureDisplay<'_> {
        SignatureDisplay {
            model: self,
            signature,
        }
    }

    /// Render a type that may be unknown.
    pub fn describe(&self, ty: Option<&Type>) -> String {
        match ty {
            Some(ty) => self.display(ty).to_string(),
            None => "?".to_string(),
        }
    }

    /// Render argument types of a call, `?` for unknown ones.
    pub fn describe_arguments(&self, arguments: &[Option<Type>]) -> String {
        arguments
            .iter()
            .map(|argument| self.describe(argument.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use pure_core::Span;

    use super::*;
    use crate::model::{Signature, SignatureParameter, TypeDeclaration, TypeKind};
    use crate::types::ObjectType;

    fn model() -> (SemanticModel, Type, Type, pure_core::TypeId) {
        let mut model = SemanticModel::new();
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        let string = model.add_type(TypeDeclaration::new("String", TypeKind::Class, Span::default()));
        let list = model.add_type(TypeDeclaration::new("List", TypeKind::Class, Span::default()));
        (model, Type::object(int), Type::object(string), list)
    }

    #[test]
    fn renders_objects_and_wrappers() {
        let (model, int, string, list) = model();
        assert_eq!(model.display(&Type::optional(int.clone())).to_string(), "Int?");
        assert_eq!(model.display(&Type::or(vec![string.clone(), int.clone()])).to_string(), "Int | String");
        let producing = Type::Object(ObjectType {
            declaration: list,
            arguments: vec![TypeArgument {
                variance: Variance::Producing,
                ty: int.clone(),
            }],
        });
        assert_eq!(model.display(&producing).to_string(), "<Int producing>List");
        assert_eq!(model.display(&Type::plural(string)).to_string(), "...String");
    }

    #[test]
    fn renders_function_types() {
        let (model, int, _, _) = model();
        let function = Type::Function(crate::types::FunctionType {
            signatures: vec![
                FunctionSignature {
                    parameters: vec![int.clone()],
                    is_variadic: false,
                    return_type: Box::new(int),
                },
                FunctionSignature {
                    parameters: Vec::new(),
                    is_variadic: false,
                    return_type: Box::new(Type::NOTHING),
                },
            ],
        });
        assert_eq!(model.display(&function).to_string(), "(Int) => Int & =>|");
    }

    #[test]
    fn renders_signatures_with_owner() {
        let (mut model, int, _, list) = model();
        let mut signature = Signature::new(SignatureKind::Function, "exists", Span::default());
        signature.owner = Some(list);
        signature.parameters.push(SignatureParameter {
            name: "index".to_string(),
            span: Span::default(),
            ty: Some(int.clone()),
            declaration: None,
            property: None,
        });
        signature.return_type = Some(int);
        let id = model.add_signature(signature);
        assert_eq!(model.display_signature(id).to_string(), "List.exists(Int): Int");

        let initializer = model.add_signature(Signature::new(SignatureKind::Initializer, "init", Span::default()));
        assert_eq!(model.display_signature(initializer).to_string(), "init()");
    }
}
