//! Analyse-Data-Flow Pass (Pass 3) - Follow variables through every body.
//!
//! Each callable body is analysed by its own [`FlowAnalyzer`] and leaves a
//! [`VariableTracker`] behind. Initializers additionally check that every
//! property without a default is assigned on every path.
//!
//! ## Algorithm
//!
//! 1. Order types so that every type follows its supertypes
//! 2. Per type: property defaults, getters, setters, functions and
//!    operators, then initializers (declared or synthesized)
//! 3. Top-level functions
//! 4. The top-level statements of every file
//!
//! Calls on `self` and initializer delegation apply the initialization
//! summary of their target, so a target has to be analysed before its
//! callers. The order above guarantees this for supertypes and for calls
//! from initializers.

use pure_core::{Diagnostics, InternalError, SignatureId, TypeId};

use crate::ast::{Block, ComputedPropertyDef, Expr, Member, SourceFile, TypeDef};
use crate::config::AnalysisConfig;
use crate::facts::{DeclarationMap, FlowFacts, InitializerCheck, TrackerKey, TypeFacts};
use crate::flow::{FlowAnalyzer, FlowInputs, VariableTracker};
use crate::model::SemanticModel;

/// Output of the analyse-data-flow pass.
#[derive(Debug, Default)]
pub struct DataFlowOutput {
    pub facts: FlowFacts,
}

/// Body of a callable.
#[derive(Clone, Copy)]
enum Body<'b> {
    Block(&'b Block),
    Expr(&'b Expr),
    Empty,
}

/// Pass 3: run one variable tracker per callable.
pub struct DataFlowPass<'a> {
    inputs: FlowInputs<'a>,
    diagnostics: &'a mut Diagnostics,
    facts: FlowFacts,
}

impl<'a> DataFlowPass<'a> {
    pub fn new(
        model: &'a SemanticModel,
        declarations: &'a DeclarationMap,
        types: &'a TypeFacts,
        config: &'a AnalysisConfig,
        diagnostics: &'a mut Diagnostics,
    ) -> Self {
        Self {
            inputs: FlowInputs {
                model,
                declarations,
                types,
                config,
            },
            diagnostics,
            facts: FlowFacts::default(),
        }
    }

    /// Run the analyse-data-flow pass on all files.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self, files: &[&SourceFile]) -> Result<DataFlowOutput, InternalError> {
        let model = self.inputs.model;
        let mut types: Vec<(TypeId, &TypeDef, usize)> = files
            .iter()
            .flat_map(|file| &file.types)
            .filter_map(|def| {
                let id = self.inputs.declarations.type_of(def.id)?;
                let depth = model.hierarchy(&model.instance_type(id)).len();
                Some((id, def, depth))
            })
            .collect();
        types.sort_by_key(|(_, _, depth)| *depth);

        for (id, def, _) in &types {
            self.analyse_type(*id, def)?;
        }
        for def in files.iter().flat_map(|file| &file.functions) {
            if def.is_native {
                continue;
            }
            let Some(body) = &def.body else {
                continue;
            };
            let signature = self.inputs.declarations.require_signature(def.id, def.span)?;
            self.analyse_callable(signature, Body::Block(body))?;
        }
        for file in files {
            self.analyse_file(file)?;
        }

        tracing::debug!(
            trackers = self.facts.trackers.len(),
            unreachable = self.facts.unreachable.len(),
            reassignments = self.facts.reassignments.len(),
            "data flow analysed"
        );
        Ok(DataFlowOutput { facts: self.facts })
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    fn analyse_type(&mut self, id: TypeId, def: &TypeDef) -> Result<(), InternalError> {
        for member in &def.members {
            match member {
                Member::Property(property) => {
                    if let Some(value) = &property.value {
                        self.analyse_default(value)?;
                    }
                }
                Member::Computed(computed) => self.analyse_accessors(computed)?,
                Member::Function(function) => {
                    if function.is_native || function.is_abstract {
                        continue;
                    }
                    let Some(body) = &function.body else {
                        continue;
                    };
                    let signature = self.inputs.declarations.require_signature(function.id, function.span)?;
                    self.analyse_callable(signature, Body::Block(body))?;
                }
                Member::Operator(operator) => {
                    if operator.is_native {
                        continue;
                    }
                    let Some(body) = &operator.body else {
                        continue;
                    };
                    let signature = self.inputs.declarations.require_signature(operator.id, operator.span)?;
                    self.analyse_callable(signature, Body::Block(body))?;
                }
                Member::Initializer(_) => {}
            }
        }

        if self.inputs.model[id].has_circular_inheritance {
            return Ok(());
        }
        for member in &def.members {
            let Member::Initializer(initializer) = member else {
                continue;
            };
            if initializer.is_native {
                continue;
            }
            let signature = self.inputs.declarations.require_signature(initializer.id, initializer.span)?;
            let body = match &initializer.body {
                Some(body) => Body::Block(body),
                None => Body::Empty,
            };
            self.analyse_initializer(id, signature, body)?;
        }
        if let Some(signature) = self.inputs.declarations.synthesized.get(&id).copied() {
            self.analyse_initializer(id, signature, Body::Empty)?;
        }
        Ok(())
    }

    /// Property default values only contribute static values.
    fn analyse_default(&mut self, value: &Expr) -> Result<(), InternalError> {
        let mut analyzer =
            FlowAnalyzer::for_callable(self.inputs, VariableTracker::new(), self.diagnostics, &mut self.facts);
        analyzer.analyse_expr(value);
        analyzer.finish().map(|_| ())
    }

    fn analyse_accessors(&mut self, def: &ComputedPropertyDef) -> Result<(), InternalError> {
        if let Some(getter) = &def.getter {
            let signature = self.inputs.declarations.require_signature(getter.id, getter.span)?;
            self.analyse_callable(signature, Body::Expr(getter))?;
        }
        if let Some(setter) = &def.setter {
            let signature = self.inputs.declarations.require_signature(setter.id, setter.span)?;
            self.analyse_callable(signature, Body::Block(setter))?;
        }
        Ok(())
    }

    // ==========================================================================
    // Callables
    // ==========================================================================

    /// Functions, operators and accessors: parameters are initialized on
    /// entry.
    fn analyse_callable(&mut self, signature: SignatureId, body: Body<'_>) -> Result<(), InternalError> {
        let model = self.inputs.model;
        let mut analyzer =
            FlowAnalyzer::for_callable(self.inputs, VariableTracker::new(), self.diagnostics, &mut self.facts);
        for parameter in &model[signature].parameters {
            if let Some(declaration) = parameter.declaration {
                analyzer.declare(declaration, parameter.span, true, model[declaration].ty.clone(), None);
            }
        }
        analyse_body(&mut analyzer, body);
        let tracker = analyzer.finish()?;
        self.record(signature, tracker);
        Ok(())
    }

    /// Initializers start with every property of the hierarchy declared.
    /// Properties with a default or a static storage are initialized.
    fn analyse_initializer(&mut self, owner: TypeId, signature: SignatureId, body: Body<'_>) -> Result<(), InternalError> {
        let model = self.inputs.model;
        let properties: Vec<_> = model
            .hierarchy(&model.instance_type(owner))
            .into_iter()
            .flat_map(|(ty, _)| model[ty].properties.iter().copied())
            .collect();

        let mut analyzer = FlowAnalyzer::for_callable(
            self.inputs,
            VariableTracker::for_initializer(),
            self.diagnostics,
            &mut self.facts,
        );
        for property in &properties {
            let declaration = &model[*property];
            let initialized = declaration.has_value || declaration.is_static;
            analyzer.declare(*property, declaration.span, initialized, declaration.ty.clone(), None);
        }
        for parameter in &model[signature].parameters {
            if let Some(property) = parameter.property {
                analyzer.initialize(property, parameter.span, parameter.ty.clone());
            } else if let Some(declaration) = parameter.declaration {
                analyzer.declare(declaration, parameter.span, true, model[declaration].ty.clone(), None);
            }
        }
        analyse_body(&mut analyzer, body);
        let tracker = analyzer.finish()?;

        let summary = tracker.summary();
        let missing: Vec<_> = properties
            .iter()
            .copied()
            .filter(|property| model[*property].requires_initialization())
            .filter(|property| !summary.being_initialized.contains(property))
            .collect();
        if !missing.is_empty() {
            self.facts.initializer_checks.push(InitializerCheck {
                signature,
                owner,
                span: model[signature].span,
                missing,
            });
        }
        self.record(signature, tracker);
        Ok(())
    }

    fn analyse_file(&mut self, file: &SourceFile) -> Result<(), InternalError> {
        let mut analyzer = FlowAnalyzer::new(self.inputs, VariableTracker::new(), self.diagnostics, &mut self.facts);
        analyzer.analyse_block(&file.body);
        let tracker = analyzer.finish()?;
        self.facts.reassignments.extend(tracker.reassignments());
        tracing::debug!(callable = %file.name, usages = tracker.usages.len(), "callable analysed");
        self.facts.trackers.insert(TrackerKey::File(file.name.clone()), tracker);
        Ok(())
    }

    fn record(&mut self, signature: SignatureId, tracker: VariableTracker) {
        tracing::debug!(
            callable = %self.inputs.model.display_signature(signature),
            usages = tracker.usages.len(),
            "callable analysed"
        );
        self.facts.reassignments.extend(tracker.reassignments());
        self.facts.summaries.insert(signature, tracker.summary());
        self.facts.trackers.insert(TrackerKey::Callable(signature), tracker);
    }
}

fn analyse_body(analyzer: &mut FlowAnalyzer<'_, '_>, body: Body<'_>) {
    match body {
        Body::Block(block) => {
            analyzer.analyse_block(block);
        }
        Body::Expr(expr) => {
            analyzer.analyse_expr(expr);
        }
        Body::Empty => {}
    }
}

#[cfg(test)]
mod tests {
    use pure_core::{Diagnostics, SemanticError};

    use super::*;
    use crate::ast::{BinaryOp, Builder, Generator, Program};
    use crate::model::prelude;
    use crate::passes::{DeclarePass, DetermineTypesPass};

    struct Analysed {
        model: SemanticModel,
        facts: FlowFacts,
        diagnostics: Diagnostics,
    }

    fn analyse(program: &Program) -> Analysed {
        let prelude = prelude::file();
        let mut files: Vec<&SourceFile> = vec![&prelude];
        files.extend(&program.files);

        let config = AnalysisConfig::default();
        let mut model = SemanticModel::new();
        let mut diagnostics = Diagnostics::new();
        let declarations = DeclarePass::new(&mut model, &mut diagnostics).run(&files).declarations;
        let types = DetermineTypesPass::new(&mut model, &declarations, &mut diagnostics)
            .run(&files)
            .expect("no internal error")
            .facts;
        let facts = DataFlowPass::new(&model, &declarations, &types, &config, &mut diagnostics)
            .run(&files)
            .expect("no internal error")
            .facts;
        Analysed {
            model,
            facts,
            diagnostics,
        }
    }

    fn report(analysed: &Analysed, tracker: &str, variable: &str) -> String {
        let Some(tracker) = analysed.facts.tracker_labelled(&analysed.model, tracker) else {
            panic!("Expected tracker {}, got: {:?}", tracker, analysed.facts.tracker_labels(&analysed.model));
        };
        tracker
            .report_for(&analysed.model, variable)
            .unwrap_or_else(|| panic!("Expected usages of {}", variable))
    }

    #[test]
    fn linear_usages_follow_each_other() {
        let b = Builder::new();
        let body = b.block(vec![
            b.at(1).var_decl("a", None, Some(b.int(0))),
            b.at(2).expr_stmt(b.var("a")),
        ]);
        let program = Program::new(vec![b.file("Main", body)]);

        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(
            report(&analysed, "Main", "a"),
            "start -> 1\n1: declaration & write -> 2 (Int, 0)\n2: read -> end (Int, 0)"
        );
    }

    #[test]
    fn branches_join_after_if() {
        let b = Builder::new();
        let body = b.block(vec![
            b.at(1).var_decl("a", None, Some(b.int(0))),
            b.at(2).expr_stmt(b.if_expr(
                b.var("c"),
                b.block(vec![b.at(3).expr_stmt(b.var("a"))]),
                Some(b.block(vec![b.at(5).expr_stmt(b.assign(b.var("a"), b.int(1)))])),
            )),
            b.at(7).expr_stmt(b.var("a")),
        ]);
        let function = b
            .function(1, "f")
            .with_parameter(b.param(1, "c", b.ty("Bool")))
            .with_body(body);
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_function(function)]);

        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(
            report(&analysed, "f(Bool)", "a"),
            "start -> 1\n\
             1: declaration & write -> 3, 5 (Int, 0)\n\
             3: read -> 7 (Int, 0)\n\
             5: write -> 7 (Int, 1)\n\
             7: read -> end (Int, null)"
        );
    }

    #[test]
    fn loop_bodies_link_back_to_their_start() {
        let b = Builder::new();
        let loop_body = b.block(vec![
            b.at(3).expr_stmt(b.assign(b.var("a"), b.int(1))),
            b.at(4).expr_stmt(b.if_expr(b.var("c"), b.block(vec![b.next_stmt()]), None)),
            b.at(5).expr_stmt(b.if_expr(b.var("d"), b.block(vec![b.break_stmt()]), None)),
            b.at(8).expr_stmt(b.var("a")),
        ]);
        let body = b.block(vec![
            b.at(1).var_decl("a", None, Some(b.int(0))),
            b.loop_stmt(2, None, loop_body),
        ]);
        let function = b
            .function(1, "f")
            .with_parameter(b.param(1, "c", b.ty("Bool")))
            .with_parameter(b.param(1, "d", b.ty("Bool")))
            .with_body(body);
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_function(function)]);

        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(
            report(&analysed, "f(Bool, Bool)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int, 0)\n\
             2: hint -> 3 (Int, null)\n\
             3: write -> 3, 8, end (Int, 1)\n\
             8: read -> 3 (Int, 1)"
        );
    }

    #[test]
    fn always_blocks_run_for_raises_and_completion() {
        let b = Builder::new();
        let main = b.block(vec![
            b.at(3).expr_stmt(b.assign(b.var("a"), b.int(0))),
            b.at(4).expr_stmt(b.var("a")),
        ]);
        let handler_body = b.block(vec![b.at(6).expr_stmt(b.assign(b.var("a"), b.int(1)))]);
        let handler = b.handler(5, b.ty("Error"), None, handler_body);
        let always = b.block(vec![b.at(8).expr_stmt(b.var("a"))]);
        let body = b.block(vec![
            b.at(1).var_decl("a", None, Some(b.int(10))),
            b.handle(2, main, vec![handler], Some(always)),
            b.at(10).expr_stmt(b.assign(b.var("a"), b.int(2))),
        ]);
        let program = Program::new(vec![b.file("Main", body)]);

        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(
            report(&analysed, "Main", "a"),
            "start -> 1\n\
             1: declaration & write -> 3, 6, 8e (Int, 10)\n\
             3: write -> 4, 6, 8e (Int, 0)\n\
             4: read -> 6, 8, 8e (Int, 0)\n\
             6: write -> 8, 8e (Int, 1)\n\
             8: read -> 10 (Int, null)\n\
             8e: read -> continues raise (Int, null)\n\
             10: write -> end (Int, 2)"
        );
    }

    #[test]
    fn raising_on_missing_value_narrows_the_rest() {
        let b = Builder::new();
        let raise = b.block(vec![b.raise_stmt(b.call(b.var("Error"), Vec::new()))]);
        let body = b.block(vec![
            b.at(4).expr_stmt(b.if_expr(b.not(b.has_value(b.var("a"))), raise, None)),
            b.at(6).expr_stmt(b.var("a")),
        ]);
        let function = b
            .function(1, "f")
            .with_parameter(b.param(1, "a", b.optional(b.ty("Int"))))
            .with_body(body);
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_function(function)]);

        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(
            report(&analysed, "f(Int?)", "a"),
            "start -> 1\n\
             1: declaration & write -> 4 (Int?, null)\n\
             4: read -> 4, 4 (Int?, null)\n\
             4: hint -> 6 (Int, null)\n\
             4: hint -> end (Null, null)\n\
             6: read -> end (Int, null)"
        );
    }

    #[test]
    fn reading_before_writing_reports_uninitialized_local() {
        let b = Builder::new();
        let body = b.block(vec![
            b.at(1).var_decl("a", Some(b.ty("Int")), None),
            b.at(2).expr_stmt(b.var("a")),
        ]);
        let program = Program::new(vec![b.file("Main", body)]);

        let analysed = analyse(&program);
        match analysed.diagnostics.errors().next() {
            Some(SemanticError::NotInitialized { kind, name, span }) => {
                assert_eq!(kind, "Local variable");
                assert_eq!(name, "a");
                assert_eq!(span.line, 2);
            }
            other => panic!("Expected NotInitialized, got: {:?}", other),
        }
    }

    #[test]
    fn initializers_record_missing_properties() {
        let b = Builder::new();
        let point = b
            .class(1, "Point")
            .with_member(b.property(2, "x", Some(b.ty("Int")), None))
            .with_member(b.property(3, "y", Some(b.ty("Int")), Some(b.int(0))))
            .with_member(b.initializer(4));
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_type(point)]);

        let analysed = analyse(&program);
        assert_eq!(analysed.facts.initializer_checks.len(), 1);
        let check = &analysed.facts.initializer_checks[0];
        let missing: Vec<&str> = check.missing.iter().map(|p| analysed.model[*p].name.as_str()).collect();
        assert_eq!(missing, vec!["x"]);
        assert_eq!(check.span.line, 4);
    }

    #[test]
    fn property_parameters_initialize_properties() {
        let b = Builder::new();
        let point = b
            .class(1, "Point")
            .with_member(b.property(2, "x", Some(b.ty("Int")), None))
            .with_member(b.initializer(3).with_parameter(b.property_param(3, "x")));
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_type(point)]);

        let analysed = analyse(&program);
        assert!(analysed.facts.initializer_checks.is_empty());
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
    }

    #[test]
    fn synthesized_initializers_are_checked() {
        let b = Builder::new();
        let point = b
            .class(1, "Point")
            .with_member(b.property(2, "x", Some(b.ty("Int")), None));
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_type(point)]);

        let analysed = analyse(&program);
        assert_eq!(analysed.facts.initializer_checks.len(), 1);
        assert_eq!(analysed.facts.initializer_checks[0].span.line, 1);
    }

    #[test]
    fn reading_properties_before_assignment_in_initializer() {
        let b = Builder::new();
        let body = b.block(vec![
            b.at(4).expr_stmt(b.member(b.self_ref(), "x")),
            b.at(5).expr_stmt(b.assign(b.member(b.self_ref(), "x"), b.int(1))),
        ]);
        let point = b
            .class(1, "Point")
            .with_member(b.property(2, "x", Some(b.ty("Int")), None))
            .with_member(b.initializer(3).with_body(body));
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_type(point)]);

        let analysed = analyse(&program);
        assert!(analysed.facts.initializer_checks.is_empty());
        match analysed.diagnostics.errors().next() {
            Some(SemanticError::NotInitialized { kind, name, .. }) => {
                assert_eq!(kind, "Property");
                assert_eq!(name, "x");
            }
            other => panic!("Expected NotInitialized, got: {:?}", other),
        }
    }

    #[test]
    fn statements_after_return_are_unreachable() {
        let b = Builder::new();
        let unreachable = b.at(3).expr_stmt(b.int(1));
        let unreachable_id = unreachable.id;
        let body = b.block(vec![b.at(2).return_stmt(None), unreachable]);
        let function = b.function(1, "f").with_body(body);
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_function(function)]);

        let analysed = analyse(&program);
        assert!(analysed.facts.is_unreachable(unreachable_id));
        assert_eq!(analysed.facts.unreachable.len(), 1);
    }

    #[test]
    fn constants_written_twice_are_reassignments() {
        let b = Builder::new();
        let body = b.block(vec![
            b.at(1).val_decl("a", None, Some(b.int(0))),
            b.at(2).expr_stmt(b.assign(b.var("a"), b.int(1))),
        ]);
        let program = Program::new(vec![b.file("Main", body)]);

        let analysed = analyse(&program);
        assert_eq!(analysed.facts.reassignments.len(), 1);
        assert_eq!(analysed.facts.reassignments[0].span.line, 2);
    }

    /// `f` with the given parameters and body, alone in file `Main`.
    fn function_program(b: &Builder, parameters: Vec<crate::ast::ParameterDef>, body: Block) -> Program {
        let mut function = b.function(1, "f");
        for parameter in parameters {
            function = function.with_parameter(parameter);
        }
        Program::new(vec![b.file("Main", b.block(Vec::new())).with_function(function.with_body(body))])
    }

    // =========================================================================
    // Narrowing
    // =========================================================================

    #[test]
    fn and_narrows_its_left_operand_to_true() {
        let b = Builder::new();
        let body = b.block(vec![b.at(2).expr_stmt(b.binary(BinaryOp::And, b.var("a"), b.var("a")))]);
        let program = function_program(&b, vec![b.param(1, "a", b.ty("Bool"))], body);

        let analysed = analyse(&program);
        assert_eq!(
            report(&analysed, "f(Bool)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Bool, null)\n\
             2: read -> 2, end (Bool, null)\n\
             2: hint -> 2 (Bool, yes)\n\
             2: read -> end (Bool, yes)"
        );
    }

    #[test]
    fn or_narrows_its_left_operand_to_false() {
        let b = Builder::new();
        let body = b.block(vec![b.at(2).expr_stmt(b.binary(BinaryOp::Or, b.var("a"), b.var("a")))]);
        let program = function_program(&b, vec![b.param(1, "a", b.ty("Bool"))], body);

        let analysed = analyse(&program);
        assert_eq!(
            report(&analysed, "f(Bool)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Bool, null)\n\
             2: read -> 2, end (Bool, null)\n\
             2: hint -> 2 (Bool, no)\n\
             2: read -> end (Bool, no)"
        );
    }

    #[test]
    fn not_swaps_the_branches_of_an_equality() {
        let b = Builder::new();
        let condition = b.at(2).not(b.binary(BinaryOp::Equal, b.var("a"), b.int(1)));
        let body = b.block(vec![b.at(2).expr_stmt(b.if_expr(
            condition,
            b.block(vec![b.at(3).expr_stmt(b.var("a"))]),
            Some(b.block(vec![b.at(5).expr_stmt(b.var("a"))])),
        ))]);
        let program = function_program(&b, vec![b.param(1, "a", b.ty("Int"))], body);

        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(
            report(&analysed, "f(Int)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int, null)\n\
             2: read -> 2, 3 (Int, null)\n\
             2: hint -> 5 (Int, 1)\n\
             3: read -> end (Int, null)\n\
             5: read -> end (Int, 1)"
        );
    }

    #[test]
    fn equality_keeps_the_type_when_the_literal_does_not_fit() {
        let b = Builder::new();
        let condition = b.at(2).binary(BinaryOp::Equal, b.var("a"), b.int(1));
        let body = b.block(vec![b.at(2).expr_stmt(b.if_expr(
            condition,
            b.block(vec![b.at(3).expr_stmt(b.var("a"))]),
            Some(b.block(vec![b.at(5).expr_stmt(b.var("a"))])),
        ))]);
        let program = function_program(&b, vec![b.param(1, "a", b.ty("Float"))], body);

        let analysed = analyse(&program);
        assert_eq!(
            report(&analysed, "f(Float)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Float, null)\n\
             2: read -> 2, 5 (Float, null)\n\
             2: hint -> 3 (Float, 1)\n\
             3: read -> end (Float, 1)\n\
             5: read -> end (Float, null)"
        );
    }

    #[test]
    fn equality_narrows_optionals_to_the_literal_type() {
        let b = Builder::new();
        let condition = b.at(2).binary(BinaryOp::Equal, b.var("a"), b.int(1));
        let body = b.block(vec![b.at(2).expr_stmt(b.if_expr(
            condition,
            b.block(vec![b.at(3).expr_stmt(b.var("a"))]),
            None,
        ))]);
        let program = function_program(&b, vec![b.param(1, "a", b.optional(b.ty("Int")))], body);

        let analysed = analyse(&program);
        assert_eq!(
            report(&analysed, "f(Int?)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int?, null)\n\
             2: read -> 2, end (Int?, null)\n\
             2: hint -> 3 (Int, 1)\n\
             3: read -> end (Int, 1)"
        );
    }

    #[test]
    fn is_checks_narrow_the_negative_branch_to_null() {
        let b = Builder::new();
        let condition = b.at(2).is_check(b.var("a"), b.ty("Int"));
        let body = b.block(vec![b.at(2).expr_stmt(b.if_expr(
            condition,
            b.block(vec![b.at(3).expr_stmt(b.var("a"))]),
            Some(b.block(vec![b.at(5).expr_stmt(b.var("a"))])),
        ))]);
        let program = function_program(&b, vec![b.param(1, "a", b.optional(b.ty("Int")))], body);

        let analysed = analyse(&program);
        assert_eq!(
            report(&analysed, "f(Int?)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int?, null)\n\
             2: read -> 2, 2 (Int?, null)\n\
             2: hint -> 3 (Int, null)\n\
             2: hint -> 5 (Null, null)\n\
             3: read -> end (Int, null)\n\
             5: read -> end (Null, null)"
        );
    }

    #[test]
    fn has_value_narrows_the_negative_branch_to_null() {
        let b = Builder::new();
        let condition = b.at(2).has_value(b.var("a"));
        let body = b.block(vec![b.at(2).expr_stmt(b.if_expr(
            condition,
            b.block(vec![b.at(3).expr_stmt(b.var("a"))]),
            Some(b.block(vec![b.at(5).expr_stmt(b.var("a"))])),
        ))]);
        let program = function_program(&b, vec![b.param(1, "a", b.optional(b.ty("Int")))], body);

        let analysed = analyse(&program);
        assert_eq!(
            report(&analysed, "f(Int?)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int?, null)\n\
             2: read -> 2, 2 (Int?, null)\n\
             2: hint -> 3 (Int, null)\n\
             2: hint -> 5 (Null, null)\n\
             3: read -> end (Int, null)\n\
             5: read -> end (Null, null)"
        );
    }

    // =========================================================================
    // Switch
    // =========================================================================

    #[test]
    fn switch_cases_hint_the_subject_with_their_value() {
        let b = Builder::new();
        let subject = b.at(2).var("a");
        let cases = vec![
            b.case(b.at(3).int(1), b.block(vec![b.at(4).expr_stmt(b.var("a"))])),
            b.case(b.at(5).int(2), b.block(vec![b.at(6).expr_stmt(b.var("a"))])),
        ];
        let switch = b.switch(subject, cases, None);
        let body = b.block(vec![b.at(2).expr_stmt(switch)]);
        let program = function_program(&b, vec![b.param(1, "a", b.ty("Int"))], body);

        let analysed = analyse(&program);
        assert_eq!(
            report(&analysed, "f(Int)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int, null)\n\
             2: read -> 3, 5, end (Int, null)\n\
             3: hint -> 4 (Int, 1)\n\
             4: read -> end (Int, 1)\n\
             5: hint -> 6 (Int, 2)\n\
             6: read -> end (Int, 2)"
        );
    }

    #[test]
    fn switch_cases_of_another_type_are_mismatches() {
        let b = Builder::new();
        let subject = b.at(2).var("a");
        let cases = vec![b.case(b.at(3).string("x"), b.block(Vec::new()))];
        let switch = b.switch(subject, cases, None);
        let body = b.block(vec![b.at(2).expr_stmt(switch)]);
        let program = function_program(&b, vec![b.param(1, "a", b.ty("Int"))], body);

        let analysed = analyse(&program);
        let mismatch = analysed
            .diagnostics
            .errors()
            .find(|error| matches!(error, SemanticError::CaseTypeMismatch { .. }));
        match mismatch {
            Some(SemanticError::CaseTypeMismatch {
                case_type,
                subject_type,
                span,
            }) => {
                assert_eq!(case_type, "String");
                assert_eq!(subject_type, "Int");
                assert_eq!(span.line, 3);
            }
            other => panic!("Expected CaseTypeMismatch, got: {:?}", other),
        }
    }

    // =========================================================================
    // Loops
    // =========================================================================

    /// `var a = 0` on line 1, a loop on line 2 incrementing `a` on line 3 and
    /// a read of `a` on line 5, inside `f(c: Bool)`.
    fn counting_loop(b: &Builder, generator: Option<Generator>) -> Program {
        let loop_body = b.block(vec![
            b.at(3).expr_stmt(b.compound_assign(BinaryOp::Add, b.var("a"), b.int(1))),
        ]);
        let body = b.block(vec![
            b.at(1).var_decl("a", None, Some(b.int(0))),
            b.loop_stmt(2, generator, loop_body),
            b.at(5).expr_stmt(b.var("a")),
        ]);
        function_program(b, vec![b.param(1, "c", b.ty("Bool"))], body)
    }

    #[test]
    fn pre_condition_loops_leave_from_the_mutation_hint() {
        let expected = "start -> 1\n\
                        1: declaration & write -> 2 (Int, 0)\n\
                        2: hint -> 3, 5 (Int, null)\n\
                        3: read & mutation -> 3 (Int, null)\n\
                        5: read -> end (Int, null)";

        let b = Builder::new();
        let program = counting_loop(&b, Some(b.at(2).while_generator(b.var("c"))));
        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(report(&analysed, "f(Bool)", "a"), expected);

        let b = Builder::new();
        let program = counting_loop(&b, Some(b.at(2).until_generator(b.var("c"))));
        let analysed = analyse(&program);
        assert_eq!(report(&analysed, "f(Bool)", "a"), expected);
    }

    #[test]
    fn post_condition_loops_leave_after_the_body() {
        let expected = "start -> 1\n\
                        1: declaration & write -> 2 (Int, 0)\n\
                        2: hint -> 3 (Int, null)\n\
                        3: read & mutation -> 3, 5 (Int, null)\n\
                        5: read -> end (Int, null)";

        let b = Builder::new();
        let program = counting_loop(&b, Some(b.at(4).post_while_generator(b.var("c"))));
        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(report(&analysed, "f(Bool)", "a"), expected);

        let b = Builder::new();
        let program = counting_loop(&b, Some(b.at(4).post_until_generator(b.var("c"))));
        let analysed = analyse(&program);
        assert_eq!(report(&analysed, "f(Bool)", "a"), expected);
    }

    #[test]
    fn over_loops_may_leave_before_and_after_the_body() {
        let b = Builder::new();
        let collection = b.at(2).call(b.var("Range"), vec![b.int(0), b.int(3)]);
        let program = counting_loop(&b, Some(b.over_generator(collection, None)));

        let analysed = analyse(&program);
        assert!(analysed.diagnostics.is_empty(), "{}", analysed.diagnostics);
        assert_eq!(
            report(&analysed, "f(Bool)", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int, 0)\n\
             2: hint -> 3, 5 (Int, null)\n\
             3: read & mutation -> 3, 5 (Int, null)\n\
             5: read -> end (Int, null)"
        );
    }

    #[test]
    fn loops_without_break_make_the_rest_unreachable() {
        let b = Builder::new();
        let loop_stmt = b.loop_stmt(
            2,
            None,
            b.block(vec![b.at(3).expr_stmt(b.compound_assign(BinaryOp::Add, b.var("a"), b.int(1)))]),
        );
        let loop_id = loop_stmt.id;
        let after = b.at(5).expr_stmt(b.var("a"));
        let after_id = after.id;
        let body = b.block(vec![b.at(1).var_decl("a", None, Some(b.int(0))), loop_stmt, after]);
        let program = function_program(&b, Vec::new(), body);

        let analysed = analyse(&program);
        assert!(analysed.facts.is_interrupting(loop_id));
        assert!(analysed.facts.is_unreachable(after_id));
        assert_eq!(
            report(&analysed, "f()", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int, 0)\n\
             2: hint -> 3 (Int, null)\n\
             3: read & mutation -> 3 (Int, null)"
        );
    }

    #[test]
    fn loops_with_break_continue_after_the_loop() {
        let b = Builder::new();
        let loop_stmt = b.loop_stmt(
            2,
            None,
            b.block(vec![b.at(3).expr_stmt(b.if_expr(b.var("c"), b.block(vec![b.break_stmt()]), None))]),
        );
        let loop_id = loop_stmt.id;
        let after = b.at(5).expr_stmt(b.var("c"));
        let after_id = after.id;
        let program = function_program(&b, vec![b.param(1, "c", b.ty("Bool"))], b.block(vec![loop_stmt, after]));

        let analysed = analyse(&program);
        assert!(!analysed.facts.is_interrupting(loop_id));
        assert!(!analysed.facts.is_unreachable(after_id));
        assert!(analysed.facts.unreachable.is_empty());
    }

    // =========================================================================
    // Initializers and closures
    // =========================================================================

    #[test]
    fn calling_methods_that_read_unset_properties_is_reported() {
        let b = Builder::new();
        let show = b
            .function(3, "show")
            .with_return(b.ty("Int"))
            .with_body(b.block(vec![b.at(4).return_stmt(Some(b.var("x")))]));
        let init_body = b.block(vec![
            b.at(6).expr_stmt(b.call(b.var("show"), Vec::new())),
            b.at(7).expr_stmt(b.assign(b.member(b.self_ref(), "x"), b.int(1))),
        ]);
        let point = b
            .class(1, "Point")
            .with_member(b.property(2, "x", Some(b.ty("Int")), None))
            .with_member(show)
            .with_member(b.initializer(5).with_body(init_body));
        let program = Program::new(vec![b.file("Main", b.block(Vec::new())).with_type(point)]);

        let analysed = analyse(&program);
        assert!(analysed.facts.initializer_checks.is_empty());
        let relies = analysed
            .diagnostics
            .errors()
            .find(|error| matches!(error, SemanticError::ReliesOnUninitializedProperties { .. }));
        match relies {
            Some(SemanticError::ReliesOnUninitializedProperties { properties, span, .. }) => {
                assert_eq!(properties, &vec!["x".to_string()]);
                assert_eq!(span.line, 6);
            }
            other => panic!("Expected ReliesOnUninitializedProperties, got: {:?}", other),
        }
    }

    #[test]
    fn super_init_delegation_initializes_inherited_properties() {
        let b = Builder::new();
        let base_body = b.block(vec![b.at(4).expr_stmt(b.assign(b.member(b.self_ref(), "x"), b.int(1)))]);
        let base = b
            .class(1, "Base")
            .with_member(b.property(2, "x", Some(b.ty("Int")), None))
            .with_member(b.initializer(3).with_body(base_body));
        let derived_body = b.block(vec![
            b.at(9).expr_stmt(b.call(b.member(b.super_ref(), "init"), Vec::new())),
            b.at(10).expr_stmt(b.assign(b.member(b.self_ref(), "y"), b.int(2))),
        ]);
        let derived = b
            .class(6, "Derived")
            .with_supertype(b.ty("Base"))
            .with_member(b.property(7, "y", Some(b.ty("Int")), None))
            .with_member(b.initializer(8).with_body(derived_body));
        let program = Program::new(vec![
            b.file("Main", b.block(Vec::new())).with_type(base).with_type(derived),
        ]);

        let analysed = analyse(&program);
        assert!(analysed.facts.initializer_checks.is_empty(), "{:?}", analysed.facts.initializer_checks);
        assert!(!analysed.diagnostics.errors().any(|error| matches!(
            error,
            SemanticError::NotInitialized { .. } | SemanticError::ReliesOnUninitializedProperties { .. }
        )));
    }

    #[test]
    fn closures_read_captures_in_the_enclosing_tracker() {
        let b = Builder::new();
        let closure_body = b.block(vec![
            b.at(3).expr_stmt(b.var("a")),
            b.at(4).expr_stmt(b.assign(b.var("a"), b.int(1))),
        ]);
        let closure = b.closure(2, Vec::new(), None, closure_body);
        let body = b.block(vec![
            b.at(1).var_decl("a", None, Some(b.int(0))),
            b.at(2).val_decl("g", None, Some(closure)),
            b.at(6).expr_stmt(b.var("a")),
        ]);
        let program = Program::new(vec![b.file("Main", body)]);

        let analysed = analyse(&program);
        assert_eq!(
            report(&analysed, "Main", "a"),
            "start -> 1\n\
             1: declaration & write -> 2 (Int, 0)\n\
             2: read -> 6 (Int, 0)\n\
             6: read -> end (Int, 0)"
        );
        let tracker = analysed.facts.tracker(&TrackerKey::File("Main".to_string())).unwrap();
        let Some(closure) = tracker.child("closure@2") else {
            panic!("Expected closure tracker, got: {:?}", tracker.children().map(|(label, _)| label).collect::<Vec<_>>());
        };
        assert!(closure.report_for(&analysed.model, "a").is_none());
        assert!(analysed.facts.reassignments.is_empty());
    }

    #[test]
    fn overloads_rendering_alike_keep_their_own_trackers() {
        let b = Builder::new();
        let first = b
            .function(1, "f")
            .with_parameter(b.param(1, "a", b.ty("Int")))
            .with_body(b.block(vec![b.at(2).expr_stmt(b.var("a"))]));
        let second = b
            .function(4, "f")
            .with_parameter(b.param(4, "b", b.ty("Int")))
            .with_body(b.block(vec![b.at(5).expr_stmt(b.var("b"))]));
        let program = Program::new(vec![
            b.file("Main", b.block(Vec::new())).with_function(first).with_function(second),
        ]);

        let analysed = analyse(&program);
        let overloads: Vec<&VariableTracker> = analysed
            .facts
            .trackers
            .iter()
            .filter(|(key, _)| matches!(key, TrackerKey::Callable(_)) && key.label(&analysed.model) == "f(Int)")
            .map(|(_, tracker)| tracker)
            .collect();
        assert_eq!(overloads.len(), 2);
        for variable in ["a", "b"] {
            let reporting = overloads
                .iter()
                .filter(|tracker| tracker.report_for(&analysed.model, variable).is_some())
                .count();
            assert_eq!(reporting, 1, "{}", variable);
        }
    }

    #[test]
    fn folded_values_are_recorded() {
        let b = Builder::new();
        let sum = b.binary(BinaryOp::Add, b.int(2), b.int(3));
        let sum_id = sum.id;
        let program = Program::new(vec![b.file("Main", b.block(vec![b.expr_stmt(sum)]))]);

        let analysed = analyse(&program);
        assert_eq!(analysed.facts.value_of(sum_id), Some(&pure_core::LiteralValue::Int(5)));
    }
}
