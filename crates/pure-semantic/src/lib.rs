//! Pure Semantic Analysis
//!
//! Name resolution, type checking, overload resolution and data-flow
//! analysis for programs of the Pure language.
//!
//! ## Architecture
//!
//! The input is an immutable syntax tree. Four passes fill side tables keyed
//! by node id:
//!
//! - **Pass 1 (Declare)**: types, members, functions, locals and scopes
//! - **Pass 2 (Determine types)**: declared types, expression types,
//!   bindings and call resolutions
//! - **Pass 3 (Analyse data flow)**: one variable tracker per callable,
//!   static values, reachability and initialization summaries
//! - **Pass 4 (Validate)**: issues derived from the data flow
//!
//! Ordinary semantic errors are collected in [`Diagnostics`] and never stop
//! the analysis. Only an [`InternalError`] does.
//!
//! ## Modules
//!
//! - [`ast`]: syntax tree input and its [`Builder`](ast::Builder)
//! - [`types`]: the type lattice, substitution and inference
//! - [`scope`]: lexical and inherited name lookup
//! - [`model`]: declarations, signatures, the prelude and specialization
//! - [`conversion`]: implicit conversions
//! - [`overload`]: overload resolution
//! - [`facts`]: side tables written by the passes
//! - [`flow`]: variable tracker and flow analyzer
//! - [`passes`]: the four passes and the [`Pipeline`]
//! - [`lowering`]: backend-facing view of an analysed program
//!
//! ```
//! use pure_semantic::ast::{Builder, Program};
//! use pure_semantic::{AnalysisConfig, analyse};
//!
//! let b = Builder::new();
//! let body = b.block(vec![b.var_decl("a", None, Some(b.int(1)))]);
//! let program = Program::new(vec![b.file("Main", body)]);
//!
//! let result = analyse(&program, &AnalysisConfig::default()).unwrap();
//! assert!(!result.diagnostics.has_errors());
//! ```

pub mod ast;
mod checker;
pub mod config;
pub mod conversion;
pub mod facts;
pub mod flow;
pub mod lowering;
pub mod model;
pub mod overload;
pub mod passes;
pub mod scope;
pub mod types;

pub use config::AnalysisConfig;
pub use facts::{CallKind, CallResolution, DeclarationMap, FlowFacts, TrackerKey, TypeFacts};
pub use lowering::{EmissionBackend, LoweredProgram, emit, lower_program};
pub use model::SemanticModel;
pub use passes::{Pass, Pipeline};
pub use types::Type;

pub use pure_core::{Diagnostics, InternalError, SemanticError, Severity, Span};

use pure_core::NodeId;

use crate::ast::Program;

/// Everything an analysis run produced.
#[derive(Debug)]
pub struct AnalysisResult {
    pub model: SemanticModel,
    pub declarations: DeclarationMap,
    pub types: TypeFacts,
    pub flow: FlowFacts,
    pub diagnostics: Diagnostics,
}

impl AnalysisResult {
    /// Final type of an expression.
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.types.type_of(node)
    }

    pub fn call(&self, node: NodeId) -> Option<&CallResolution> {
        self.types.call(node)
    }

    pub fn is_unreachable(&self, node: NodeId) -> bool {
        self.flow.is_unreachable(node)
    }

    pub fn is_interrupting(&self, node: NodeId) -> bool {
        self.flow.is_interrupting(node)
    }
}

/// Analyse `program` with the passes named in `config`.
pub fn analyse(program: &Program, config: &AnalysisConfig) -> Result<AnalysisResult, InternalError> {
    let _span = tracing::debug_span!("analyse", files = program.files.len()).entered();
    Pipeline::new(config.passes.clone()).run(program, config)
}
