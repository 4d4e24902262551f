//! Arena entries of the semantic model.

use pure_core::{DeclId, NodeId, SignatureId, Span, TypeId};

use crate::ast::OperatorKind;
use crate::scope::ScopeId;
use crate::types::{FunctionSignature, Type};

// ============================================================================
// Type declarations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Class,
    Object,
    Trait,
    /// A generic type parameter of a type or signature.
    GenericParameter,
}

#[derive(Debug, Clone)]
pub struct TypeDeclaration {
    pub name: String,
    pub kind: TypeKind,
    pub span: Span,
    pub node: Option<NodeId>,
    /// Member scope. Generic parameters have none.
    pub scope: Option<ScopeId>,
    pub generic_parameters: Vec<TypeId>,
    /// Declared super-types in declaration order, filled by determine-types.
    pub supertypes: Vec<Type>,
    /// Upper bound of a generic parameter.
    pub bound: Option<Type>,
    pub is_abstract: bool,
    pub has_circular_inheritance: bool,
    /// Own properties in declaration order.
    pub properties: Vec<DeclId>,
    pub initializers: Vec<SignatureId>,
}

impl TypeDeclaration {
    pub fn new(name: impl Into<String>, kind: TypeKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
            node: None,
            scope: None,
            generic_parameters: Vec::new(),
            supertypes: Vec::new(),
            bound: None,
            is_abstract: kind == TypeKind::Trait,
            has_circular_inheritance: false,
            properties: Vec::new(),
            initializers: Vec::new(),
        }
    }

    pub fn is_generic_parameter(&self) -> bool {
        self.kind == TypeKind::GenericParameter
    }

    /// Whether instances can be created and initializers are required.
    pub fn is_instantiable(&self) -> bool {
        matches!(self.kind, TypeKind::Class | TypeKind::Object) && !self.is_abstract
    }
}

// ============================================================================
// Value declarations
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclarationKind {
    LocalVariable,
    Parameter,
    Property,
    ComputedProperty,
    /// A named overload set of functions.
    Function,
}

impl DeclarationKind {
    pub fn describe(self) -> &'static str {
        match self {
            DeclarationKind::LocalVariable => "local variable",
            DeclarationKind::Parameter => "parameter",
            DeclarationKind::Property => "property",
            DeclarationKind::ComputedProperty => "computed property",
            DeclarationKind::Function => "function",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValueDeclaration {
    pub name: String,
    pub kind: DeclarationKind,
    pub span: Span,
    pub node: Option<NodeId>,
    /// Declared or inferred type, filled by determine-types.
    pub ty: Option<Type>,
    pub is_constant: bool,
    pub is_static: bool,
    pub is_abstract: bool,
    /// Declared with an initial value expression.
    pub has_value: bool,
    /// Declaring type of members.
    pub owner: Option<TypeId>,
    /// Overloads of a function declaration.
    pub signatures: Vec<SignatureId>,
}

impl ValueDeclaration {
    pub fn new(name: impl Into<String>, kind: DeclarationKind, span: Span) -> Self {
        Self {
            name: name.into(),
            kind,
            span,
            node: None,
            ty: None,
            is_constant: false,
            is_static: false,
            is_abstract: false,
            has_value: false,
            owner: None,
            signatures: Vec::new(),
        }
    }

    /// Variables whose usages are followed by the data-flow tracker.
    pub fn is_tracked(&self) -> bool {
        matches!(
            self.kind,
            DeclarationKind::LocalVariable | DeclarationKind::Parameter | DeclarationKind::Property
        )
    }

    pub fn is_property(&self) -> bool {
        self.kind == DeclarationKind::Property
    }

    /// Properties an initializer has to assign.
    pub fn requires_initialization(&self) -> bool {
        self.is_property() && !self.is_static && !self.is_abstract && !self.has_value
    }
}

// ============================================================================
// Signatures
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    Function,
    Operator(OperatorKind),
    Initializer,
    Getter,
    Setter,
}

#[derive(Debug, Clone)]
pub struct SignatureParameter {
    pub name: String,
    pub span: Span,
    /// For variadic signatures the last parameter's type is plural.
    pub ty: Option<Type>,
    /// Local declaration inside the implementation.
    pub declaration: Option<DeclId>,
    /// Property initialized directly by this initializer parameter.
    pub property: Option<DeclId>,
}

/// `where Parameter is Constraint`
#[derive(Debug, Clone)]
pub struct WhereClause {
    pub parameter: TypeId,
    pub constraint: Option<Type>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct Signature {
    pub kind: SignatureKind,
    pub name: String,
    pub owner: Option<TypeId>,
    pub span: Span,
    /// Implementing syntax node.
    pub node: Option<NodeId>,
    /// Scope holding parameters and generic parameters.
    pub scope: Option<ScopeId>,
    pub generic_parameters: Vec<TypeId>,
    pub parameters: Vec<SignatureParameter>,
    pub is_variadic: bool,
    pub return_type: Option<Type>,
    pub where_clauses: Vec<WhereClause>,
    pub overridden: Option<SignatureId>,
    pub is_overriding: bool,
    pub is_converting: bool,
    pub is_abstract: bool,
    pub is_native: bool,
    /// Default initializer created for types that declare none.
    pub is_synthesized: bool,
    /// The generic signature this one was specialized from.
    pub original: Option<SignatureId>,
}

impl Signature {
    pub fn new(kind: SignatureKind, name: impl Into<String>, span: Span) -> Self {
        Self {
            kind,
            name: name.into(),
            owner: None,
            span,
            node: None,
            scope: None,
            generic_parameters: Vec::new(),
            parameters: Vec::new(),
            is_variadic: false,
            return_type: None,
            where_clauses: Vec::new(),
            overridden: None,
            is_overriding: false,
            is_converting: false,
            is_abstract: false,
            is_native: false,
            is_synthesized: false,
            original: None,
        }
    }

    pub fn is_initializer(&self) -> bool {
        self.kind == SignatureKind::Initializer
    }

    /// Parameter types, `None` where unresolved.
    pub fn parameter_types(&self) -> Vec<Option<Type>> {
        self.parameters.iter().map(|p| p.ty.clone()).collect()
    }

    /// Number of parameters that must be supplied.
    pub fn fixed_parameter_count(&self) -> usize {
        if self.is_variadic {
            self.parameters.len().saturating_sub(1)
        } else {
            self.parameters.len()
        }
    }

    /// The function-type shape of this signature, once all types are known.
    pub fn function_signature(&self) -> Option<FunctionSignature> {
        let parameters = self
            .parameters
            .iter()
            .map(|p| p.ty.clone())
            .collect::<Option<Vec<_>>>()?;
        Some(FunctionSignature {
            parameters,
            is_variadic: self.is_variadic,
            return_type: Box::new(self.return_type.clone().unwrap_or(Type::NOTHING)),
        })
    }
}
