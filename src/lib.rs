//! Pure
//!
//! Semantic analysis for the Pure language.
//!
//! This crate re-exports [`pure_core`] and [`pure_semantic`] and adds two
//! entry points:
//!
//! - [`check`]: analyse a program and reject it when it has errors
//! - [`compile`]: check a program, lower it and hand it to a backend
//!
//! ```
//! use pure::ast::{Builder, Program};
//! use pure::AnalysisConfig;
//!
//! let b = Builder::new();
//! let body = b.block(vec![b.val_decl("answer", None, Some(b.int(42)))]);
//! let program = Program::new(vec![b.file("Main", body)]);
//!
//! let result = pure::check(&program, &AnalysisConfig::default()).unwrap();
//! assert!(result.diagnostics.is_empty());
//! ```

mod error;

pub use error::{Error, Result};

pub use pure_core::{
    DeclId, Diagnostic, Diagnostics, InternalError, IssueSink, LiteralValue, NodeId, SemanticError, Severity,
    SignatureId, Span, TypeId,
};
pub use pure_semantic::{
    AnalysisConfig, AnalysisResult, EmissionBackend, LoweredProgram, Pass, Pipeline, SemanticModel, Type, analyse,
    ast, emit, facts, flow, lower_program, lowering, model, passes,
};

use std::fmt::Display;

use crate::ast::Program;

/// Analyse `program` and fail if any error was reported. Warnings are
/// kept in the returned diagnostics.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn check(program: &Program, config: &AnalysisConfig) -> Result<AnalysisResult> {
    let result = analyse(program, config)?;
    let count = result.diagnostics.errors().count();
    if let Some(first) = result.diagnostics.errors().next() {
        tracing::debug!(count, "program rejected");
        return Err(Error::Rejected {
            count,
            first: first.clone(),
        });
    }
    Ok(result)
}

/// Check `program`, lower it and emit it through `backend`.
pub fn compile<B>(program: &Program, config: &AnalysisConfig, backend: B) -> Result<B::Output>
where
    B: EmissionBackend,
    B::Error: Display,
{
    let result = check(program, config)?;
    let lowered = lower_program(program, &result);
    emit(&lowered, backend).map_err(|error| Error::Backend(error.to_string()))
}
