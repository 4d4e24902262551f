//! Analysis passes.
//!
//! - [`declare`]: Pass 1 - create declarations, signatures and scopes
//! - [`determine_types`]: Pass 2 - resolve declared types, type expressions and resolve calls
//! - [`data_flow`]: Pass 3 - run one variable tracker per callable
//! - [`validate`]: Pass 4 - report what the flow analysis recorded
//!
//! The [`Pipeline`] runs an ordered list of [`Pass`]es. Each pass states the
//! artifacts it reads and writes in a [`PassContract`]; the order is checked
//! before anything runs.

pub mod data_flow;
pub mod declare;
pub mod determine_types;
pub mod validate;

pub use data_flow::{DataFlowOutput, DataFlowPass};
pub use declare::{DeclareOutput, DeclarePass};
pub use determine_types::{DetermineTypesOutput, DetermineTypesPass};
pub use validate::ValidatePass;

use std::fmt;

use pure_core::{Diagnostics, InternalError};

use crate::ast::{Program, SourceFile};
use crate::config::AnalysisConfig;
use crate::facts::{DeclarationMap, FlowFacts, TypeFacts};
use crate::model::{SemanticModel, prelude};
use crate::AnalysisResult;

/// One step of the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pass {
    Declare,
    DetermineTypes,
    AnalyseDataFlow,
    Validate,
}

impl Pass {
    /// Every pass in dependency order.
    pub const STANDARD: [Pass; 4] = [
        Pass::Declare,
        Pass::DetermineTypes,
        Pass::AnalyseDataFlow,
        Pass::Validate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Pass::Declare => "declare",
            Pass::DetermineTypes => "determine-types",
            Pass::AnalyseDataFlow => "analyse-data-flow",
            Pass::Validate => "validate",
        }
    }

    pub fn contract(self) -> PassContract {
        match self {
            Pass::Declare => PassContract {
                reads: &[],
                writes: &[Artifact::Declarations],
            },
            Pass::DetermineTypes => PassContract {
                reads: &[Artifact::Declarations],
                writes: &[Artifact::Types],
            },
            Pass::AnalyseDataFlow => PassContract {
                reads: &[Artifact::Declarations, Artifact::Types],
                writes: &[Artifact::Flow],
            },
            Pass::Validate => PassContract {
                reads: &[Artifact::Flow],
                writes: &[],
            },
        }
    }
}

impl fmt::Display for Pass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What a pass produces for later passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Declarations, signatures, scopes and their node links.
    Declarations,
    /// Resolved types, bindings and calls.
    Types,
    /// Static values, reachability and initialization results.
    Flow,
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Artifact::Declarations => "declarations",
            Artifact::Types => "types",
            Artifact::Flow => "flow",
        };
        write!(f, "{}", name)
    }
}

/// Artifacts a pass depends on and produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassContract {
    pub reads: &'static [Artifact],
    pub writes: &'static [Artifact],
}

/// An ordered list of passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    passes: Vec<Pass>,
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl Pipeline {
    pub fn new(passes: Vec<Pass>) -> Self {
        Self { passes }
    }

    pub fn standard() -> Self {
        Self::new(Pass::STANDARD.to_vec())
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    /// Check that every pass only reads artifacts an earlier pass writes.
    pub fn verify(&self) -> Result<(), InternalError> {
        let mut available: Vec<Artifact> = Vec::new();
        for pass in &self.passes {
            let contract = pass.contract();
            if let Some(artifact) = contract.reads.iter().find(|a| !available.contains(a)) {
                return Err(InternalError::PassContractViolation {
                    pass: pass.name().to_string(),
                    artifact: artifact.to_string(),
                });
            }
            available.extend(contract.writes.iter().copied());
        }
        Ok(())
    }

    /// Run the passes over `program`, preceded by the prelude when enabled.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(&self, program: &Program, config: &AnalysisConfig) -> Result<AnalysisResult, InternalError> {
        self.verify()?;

        let prelude = config.include_prelude.then(prelude::file);
        let files: Vec<&SourceFile> = prelude.iter().chain(program.files.iter()).collect();

        let mut model = SemanticModel::new();
        let mut diagnostics = Diagnostics::with_warnings_as_errors(config.warnings_as_errors);
        let mut declarations = DeclarationMap::default();
        let mut types = TypeFacts::default();
        let mut flow = FlowFacts::default();

        for pass in &self.passes {
            let span = tracing::debug_span!("pass", name = pass.name());
            let _guard = span.enter();
            let before = diagnostics.len();
            match pass {
                Pass::Declare => {
                    let output = DeclarePass::new(&mut model, &mut diagnostics).run(&files);
                    declarations = output.declarations;
                }
                Pass::DetermineTypes => {
                    let output = DetermineTypesPass::new(&mut model, &declarations, &mut diagnostics).run(&files)?;
                    types = output.facts;
                }
                Pass::AnalyseDataFlow => {
                    let output =
                        DataFlowPass::new(&model, &declarations, &types, config, &mut diagnostics).run(&files)?;
                    flow = output.facts;
                }
                Pass::Validate => {
                    ValidatePass::new(&model, &flow, config, &mut diagnostics).run();
                }
            }
            tracing::debug!(issues = diagnostics.len() - before, "pass finished");
        }

        Ok(AnalysisResult {
            model,
            declarations,
            types,
            flow,
            diagnostics,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_pipeline_satisfies_contracts() {
        assert!(Pipeline::standard().verify().is_ok());
    }

    #[test]
    fn reading_before_writing_is_rejected() {
        let pipeline = Pipeline::new(vec![Pass::Declare, Pass::AnalyseDataFlow]);
        match pipeline.verify() {
            Err(InternalError::PassContractViolation { pass, artifact }) => {
                assert_eq!(pass, "analyse-data-flow");
                assert_eq!(artifact, "types");
            }
            other => panic!("Expected PassContractViolation, got: {:?}", other),
        }
    }

    #[test]
    fn partial_pipelines_are_allowed() {
        let pipeline = Pipeline::new(vec![Pass::Declare, Pass::DetermineTypes]);
        assert!(pipeline.verify().is_ok());
        assert!(Pipeline::new(Vec::new()).verify().is_ok());
    }
}
