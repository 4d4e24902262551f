//! Error types for semantic analysis.
//!
//! ## Error Hierarchy
//!
//! ```text
//! SemanticError   - recoverable issues found in user code; collected
//! │                 into a diagnostics sink while analysis continues
//! ├── resolution      NotFound, SignatureMismatch, SignatureResolutionAmbiguity
//! ├── typing          TypeNotAssignable, CaseTypeMismatch, ConversionAmbiguity,
//! │                   TypeParameterCountMismatch, TypeParameterNotAssignable
//! ├── initialization  NotInitialized, UninitializedProperties,
//! │                   ReliesOnUninitializedProperties, ConstantReassignment
//! └── structure       UnreachableStatement, Redeclaration, CircularInheritance
//!
//! InternalError   - a broken invariant left behind by an earlier pass;
//!                   halts the pipeline
//! ```

use thiserror::Error;

use crate::Span;

/// How severe a reported issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Severity {
    Warning,
    Error,
}

// ============================================================================
// Semantic Errors
// ============================================================================

/// Recoverable issues found in the analysed program.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SemanticError {
    /// A referenced name could not be resolved.
    #[error("at {span}: {kind} '{name}' hasn't been declared yet")]
    NotFound {
        /// What was looked up ("value", "type", "function", "initializer", "operator").
        kind: String,
        name: String,
        span: Span,
    },

    /// Candidates exist, but none accepts the supplied arguments.
    #[error("at {span}: the provided values don't match any signature of {name}({arguments})")]
    SignatureMismatch {
        name: String,
        /// Rendered argument types.
        arguments: String,
        span: Span,
    },

    /// Several candidates match and none is more specific than the others.
    #[error("at {span}: call to {name}({arguments}) is ambiguous, matching signatures: {}", candidates.join(", "))]
    SignatureResolutionAmbiguity {
        name: String,
        arguments: String,
        /// Rendered signatures of every tied candidate.
        candidates: Vec<String>,
        span: Span,
    },

    /// A value is assigned where its type is not accepted.
    #[error("at {span}: type '{source_type}' is not assignable to type '{target_type}'")]
    TypeNotAssignable {
        source_type: String,
        target_type: String,
        span: Span,
    },

    /// A switch case condition doesn't fit the switch subject.
    #[error("at {span}: case condition of type '{case_type}' doesn't match subject type '{subject_type}'")]
    CaseTypeMismatch {
        case_type: String,
        subject_type: String,
        span: Span,
    },

    /// More than one converting initializer could bridge an assignment.
    #[error("at {span}: conversion from '{source_type}' to '{target_type}' is ambiguous, candidates: {}", candidates.join(", "))]
    ConversionAmbiguity {
        source_type: String,
        target_type: String,
        candidates: Vec<String>,
        span: Span,
    },

    /// Explicit type arguments don't match the declared generic parameters.
    #[error("at {span}: '{name}' expects {expected} type parameter(s), but {found} were provided")]
    TypeParameterCountMismatch {
        name: String,
        expected: usize,
        found: usize,
        span: Span,
    },

    /// A type argument violates its parameter's bound.
    #[error("at {span}: type '{argument}' is not assignable to type parameter '{parameter}' bounded by '{bound}'")]
    TypeParameterNotAssignable {
        argument: String,
        parameter: String,
        bound: String,
        span: Span,
    },

    /// A local variable or property is read before it is initialized.
    #[error("at {span}: {kind} '{name}' hasn't been initialized yet")]
    NotInitialized {
        /// "Local variable" or "Property".
        kind: String,
        name: String,
        span: Span,
    },

    /// An initializer leaves properties uninitialized.
    #[error("at {span}: the following properties of '{type_name}' are not initialized: {}", properties.join(", "))]
    UninitializedProperties {
        type_name: String,
        properties: Vec<String>,
        span: Span,
    },

    /// A call made inside an initializer reads properties that may still be uninitialized.
    #[error("at {span}: '{callee}' relies on the following uninitialized properties: {}", properties.join(", "))]
    ReliesOnUninitializedProperties {
        callee: String,
        properties: Vec<String>,
        span: Span,
    },

    /// A constant is written after it may already hold a value.
    #[error("at {span}: '{name}' cannot be reassigned, because it is constant")]
    ConstantReassignment { name: String, span: Span },

    /// A statement follows a statement that always interrupts execution.
    #[error("at {span}: statement is unreachable")]
    UnreachableStatement { span: Span },

    /// A name or signature is declared twice in the same scope.
    #[error("at {span}: redeclaration of {kind} '{name}', previously declared at {previous}")]
    Redeclaration {
        kind: String,
        name: String,
        previous: Span,
        span: Span,
    },

    /// A type inherits from itself, directly or indirectly.
    #[error("at {span}: type '{name}' inherits from itself")]
    CircularInheritance { name: String, span: Span },
}

impl SemanticError {
    /// Get the span where this error occurred.
    pub fn span(&self) -> Span {
        match self {
            SemanticError::NotFound { span, .. } => *span,
            SemanticError::SignatureMismatch { span, .. } => *span,
            SemanticError::SignatureResolutionAmbiguity { span, .. } => *span,
            SemanticError::TypeNotAssignable { span, .. } => *span,
            SemanticError::CaseTypeMismatch { span, .. } => *span,
            SemanticError::ConversionAmbiguity { span, .. } => *span,
            SemanticError::TypeParameterCountMismatch { span, .. } => *span,
            SemanticError::TypeParameterNotAssignable { span, .. } => *span,
            SemanticError::NotInitialized { span, .. } => *span,
            SemanticError::UninitializedProperties { span, .. } => *span,
            SemanticError::ReliesOnUninitializedProperties { span, .. } => *span,
            SemanticError::ConstantReassignment { span, .. } => *span,
            SemanticError::UnreachableStatement { span } => *span,
            SemanticError::Redeclaration { span, .. } => *span,
            SemanticError::CircularInheritance { span, .. } => *span,
        }
    }

    /// Default severity of this issue.
    pub fn severity(&self) -> Severity {
        match self {
            SemanticError::UnreachableStatement { .. } => Severity::Warning,
            _ => Severity::Error,
        }
    }
}

// ============================================================================
// Internal Errors
// ============================================================================

/// Broken invariants. These indicate a bug in an earlier pass rather than in
/// the analysed program and stop the pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InternalError {
    /// A raise statement was found outside any function, initializer or file body.
    #[error("at {span}: raise statement outside of any callable")]
    RaiseOutsideCallable { span: Span },

    /// A pass reads an artifact that no earlier pass produces.
    #[error("pass '{pass}' requires '{artifact}', which no earlier pass produces")]
    PassContractViolation { pass: String, artifact: String },

    /// A syntax node has no entry in a side table it must be present in.
    #[error("at {span}: missing {table} entry for node {node}")]
    MissingNode {
        table: String,
        node: String,
        span: Span,
    },

    /// Any other broken invariant.
    #[error("internal error: {message}")]
    Other { message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_lead_with_position() {
        let err = SemanticError::NotInitialized {
            kind: "Local variable".to_string(),
            name: "x".to_string(),
            span: Span::new(2, 1, 1),
        };
        assert_eq!(
            err.to_string(),
            "at 2:1: Local variable 'x' hasn't been initialized yet"
        );
        assert_eq!(err.span(), Span::new(2, 1, 1));
    }

    #[test]
    fn ambiguity_lists_every_candidate() {
        let err = SemanticError::SignatureResolutionAmbiguity {
            name: "exists".to_string(),
            arguments: "Int".to_string(),
            candidates: vec!["exists(Int)".to_string(), "exists(Element)".to_string()],
            span: Span::new(5, 3, 6),
        };
        let message = err.to_string();
        assert!(message.contains("exists(Int), exists(Element)"));
    }

    #[test]
    fn unreachable_statements_are_warnings() {
        let warning = SemanticError::UnreachableStatement {
            span: Span::default(),
        };
        let error = SemanticError::ConstantReassignment {
            name: "a".to_string(),
            span: Span::default(),
        };
        assert_eq!(warning.severity(), Severity::Warning);
        assert_eq!(error.severity(), Severity::Error);
    }
}
