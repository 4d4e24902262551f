//! Validate Pass (Pass 4) - Report what the flow analysis recorded.
//!
//! The data-flow pass only records facts; this pass turns them into issues:
//!
//! - constants written after they may already hold a value
//! - initializers that leave properties uninitialized
//! - unreachable statements, when enabled

use pure_core::{Diagnostics, IssueSink, SemanticError};

use crate::config::AnalysisConfig;
use crate::facts::FlowFacts;
use crate::model::SemanticModel;

/// Pass 4: report reassignments, missing initializations and unreachable
/// statements.
pub struct ValidatePass<'a> {
    model: &'a SemanticModel,
    flow: &'a FlowFacts,
    config: &'a AnalysisConfig,
    diagnostics: &'a mut Diagnostics,
}

impl<'a> ValidatePass<'a> {
    pub fn new(
        model: &'a SemanticModel,
        flow: &'a FlowFacts,
        config: &'a AnalysisConfig,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            model,
            flow,
            config,
            diagnostics,
        }
    }

    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(self) {
        let mut reassignments = self.flow.reassignments.clone();
        reassignments.sort_by_key(|reassignment| (reassignment.span, reassignment.declaration));
        reassignments.dedup();
        for reassignment in reassignments {
            self.diagnostics.add_issue(SemanticError::ConstantReassignment {
                name: self.model[reassignment.declaration].name.clone(),
                span: reassignment.span,
            });
        }

        for check in &self.flow.initializer_checks {
            let properties = check
                .missing
                .iter()
                .map(|property| self.model[*property].name.clone())
                .collect();
            self.diagnostics.add_issue(SemanticError::UninitializedProperties {
                type_name: self.model.type_name(check.owner).to_string(),
                properties,
                span: check.span,
            });
        }

        if self.config.report_unreachable {
            for (_, span) in &self.flow.unreachable {
                self.diagnostics.add_issue(SemanticError::UnreachableStatement { span: *span });
            }
        }

        tracing::debug!(issues = self.diagnostics.len(), "validated");
    }
}

#[cfg(test)]
mod tests {
    use pure_core::{DeclId, NodeId, Span, TypeId};

    use super::*;
    use crate::facts::{InitializerCheck, Reassignment};
    use crate::model::{DeclarationKind, TypeDeclaration, TypeKind, ValueDeclaration};

    fn model() -> (SemanticModel, TypeId, DeclId) {
        let mut model = SemanticModel::new();
        let point = model.add_type(TypeDeclaration::new("Point", TypeKind::Class, Span::new(1, 1, 1)));
        let x = model.add_value(ValueDeclaration::new("x", DeclarationKind::Property, Span::new(2, 1, 1)));
        (model, point, x)
    }

    #[test]
    fn reports_each_reassignment_once() {
        let (model, _, x) = model();
        let reassignment = Reassignment {
            declaration: x,
            span: Span::new(5, 1, 1),
        };
        let flow = FlowFacts {
            reassignments: vec![reassignment, reassignment],
            ..FlowFacts::default()
        };
        let mut diagnostics = Diagnostics::new();
        ValidatePass::new(&model, &flow, &AnalysisConfig::default(), &mut diagnostics).run();

        assert_eq!(diagnostics.len(), 1);
        match diagnostics.errors().next() {
            Some(SemanticError::ConstantReassignment { name, span }) => {
                assert_eq!(name, "x");
                assert_eq!(span.line, 5);
            }
            other => panic!("Expected ConstantReassignment, got: {:?}", other),
        }
    }

    #[test]
    fn reports_missing_properties_by_name() {
        let (mut model, point, x) = model();
        let signature = model.add_signature(crate::model::Signature::new(
            crate::model::SignatureKind::Initializer,
            "init",
            Span::new(3, 1, 1),
        ));
        let flow = FlowFacts {
            initializer_checks: vec![InitializerCheck {
                signature,
                owner: point,
                span: Span::new(3, 1, 1),
                missing: vec![x],
            }],
            ..FlowFacts::default()
        };
        let mut diagnostics = Diagnostics::new();
        ValidatePass::new(&model, &flow, &AnalysisConfig::default(), &mut diagnostics).run();

        match diagnostics.errors().next() {
            Some(SemanticError::UninitializedProperties {
                type_name, properties, ..
            }) => {
                assert_eq!(type_name, "Point");
                assert_eq!(properties, &vec!["x".to_string()]);
            }
            other => panic!("Expected UninitializedProperties, got: {:?}", other),
        }
    }

    #[test]
    fn unreachable_warnings_can_be_disabled() {
        let (model, _, _) = model();
        let flow = FlowFacts {
            unreachable: vec![(NodeId::new(1), Span::new(4, 1, 1)), (NodeId::new(2), Span::new(5, 1, 1))],
            ..FlowFacts::default()
        };

        let mut diagnostics = Diagnostics::new();
        ValidatePass::new(&model, &flow, &AnalysisConfig::default(), &mut diagnostics).run();
        assert_eq!(diagnostics.warnings().count(), 2);
        assert!(!diagnostics.has_errors());

        let quiet = AnalysisConfig::new().with_unreachable_warnings(false);
        let mut diagnostics = Diagnostics::new();
        ValidatePass::new(&model, &flow, &quiet, &mut diagnostics).run();
        assert!(diagnostics.is_empty());
    }
}
