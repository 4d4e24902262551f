//! The per-callable variable tracker.
//!
//! ## Responsibilities
//!
//! - Create usages in program order and link them to the current last
//!   usages of their variable
//! - Fork, save and merge [`VariableState`]s for the analyzer's branches
//! - Collect the states left behind by `next`, `break` and `return`
//! - Derive the current type and value of a variable from its last usages
//! - Close the graph with END usages and answer initialization questions
//!
//! The tracker knows nothing about syntax. The analyzer decides which
//! usages a construct creates and which states flow where.

use pure_core::{DeclId, Span};
use rustc_hash::FxHashMap;

use crate::facts::{InitializationSummary, Reassignment};
use crate::model::SemanticModel;
use crate::types::{Type, combine_or_union};

use super::state::{ReferencePoint, UsagesByVariable, VariableState, extend_unique};
use super::usage::{UsageGraph, UsageId, UsageKind, UsageValue, VariableUsage};

/// A variable with at least one usage in this tracker.
#[derive(Debug, Clone)]
pub(crate) struct TrackedVariable {
    pub(crate) declaration: DeclId,
    pub(crate) name: String,
    is_property: bool,
    is_constant: bool,
    /// Usages in creation order, END usages excluded.
    pub(crate) usages: Vec<UsageId>,
}

#[derive(Debug, Clone, Default)]
pub struct VariableTracker {
    is_initializer: bool,
    pub(crate) usages: Vec<VariableUsage>,
    pub(crate) variables: Vec<TrackedVariable>,
    index: FxHashMap<DeclId, usize>,
    ends: Vec<(DeclId, UsageId)>,
    pub(crate) state: VariableState,
    pub(crate) next_states: Vec<VariableState>,
    pub(crate) break_states: Vec<VariableState>,
    return_states: Vec<VariableState>,
    next_point: u32,
    children: Vec<(String, VariableTracker)>,
}

impl VariableTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker of an initializer body.
    pub fn for_initializer() -> Self {
        Self {
            is_initializer: true,
            ..Self::default()
        }
    }

    pub fn is_initializer(&self) -> bool {
        self.is_initializer
    }

    pub fn usage(&self, id: UsageId) -> &VariableUsage {
        &self.usages[id.index()]
    }

    /// Usages of a variable in creation order.
    pub fn usages_of(&self, declaration: DeclId) -> impl Iterator<Item = &VariableUsage> {
        self.index
            .get(&declaration)
            .into_iter()
            .flat_map(move |index| self.variables[*index].usages.iter().map(|usage| self.usage(*usage)))
    }

    /// Whether the variable was declared or used in this tracker.
    pub fn is_tracking(&self, declaration: DeclId) -> bool {
        self.index.contains_key(&declaration)
    }

    pub fn current_state(&self) -> &VariableState {
        &self.state
    }

    // ========================================================================
    // Usage creation
    // ========================================================================

    fn push_usage(&mut self, model: &SemanticModel, usage: VariableUsage) -> UsageId {
        let declaration = usage.declaration;
        let id = UsageId::new(self.usages.len());
        tracing::trace!(usage = %id.index(), kinds = %usage.kinds.describe(), line = usage.span.line, "usage");
        self.usages.push(usage);
        let index = match self.index.get(&declaration) {
            Some(index) => *index,
            None => {
                let value = &model[declaration];
                self.variables.push(TrackedVariable {
                    declaration,
                    name: value.name.clone(),
                    is_property: value.is_property(),
                    is_constant: value.is_constant,
                    usages: Vec::new(),
                });
                self.index.insert(declaration, self.variables.len() - 1);
                self.variables.len() - 1
            }
        };
        self.variables[index].usages.push(id);
        id
    }

    /// Start tracking a variable. Earlier usages of it are forgotten.
    pub fn declare(
        &mut self,
        model: &SemanticModel,
        declaration: DeclId,
        span: Span,
        initialized: bool,
        ty: Option<Type>,
        value: Option<UsageValue>,
    ) -> UsageId {
        let mut kinds = UsageKind::DECLARATION;
        if initialized {
            kinds |= UsageKind::WRITE;
        }
        let usage = self.push_usage(model, VariableUsage::new(kinds, declaration, span, ty, value));
        self.state.advance(declaration, usage);
        usage
    }

    /// Add a usage following the variable's current last usages.
    pub fn add(
        &mut self,
        model: &SemanticModel,
        kinds: UsageKind,
        declaration: DeclId,
        span: Span,
        ty: Option<Type>,
        value: Option<UsageValue>,
    ) -> UsageId {
        let mut usage = VariableUsage::new(kinds, declaration, span, ty, value);
        usage.previous = self.state.last_usages(declaration).to_vec();
        let id = self.push_usage(model, usage);
        for previous in self.state.last_usages(declaration).to_vec() {
            self.usages[previous.index()].next.push(id);
        }
        self.state.advance(declaration, id);
        id
    }

    /// Add a usage keeping the variable's current type and value.
    pub fn add_current(&mut self, model: &SemanticModel, kinds: UsageKind, declaration: DeclId, span: Span) -> UsageId {
        let ty = self.current_type(model, declaration);
        let value = self.current_value(declaration);
        self.add(model, kinds, declaration, span, ty, value)
    }

    /// Common type of the last usages, or the declared type before the
    /// first usage.
    pub fn current_type(&self, model: &SemanticModel, declaration: DeclId) -> Option<Type> {
        let last = self.state.last_usages(declaration);
        if last.is_empty() {
            return model[declaration].ty.clone();
        }
        let mut common: Option<Type> = None;
        for usage in last {
            let ty = self.usage(*usage).ty.as_ref()?;
            common = Some(match common {
                None => ty.clone(),
                Some(common) if model.accepts(&common, ty) => common,
                Some(common) => combine_or_union(model, &[common, ty.clone()]),
            });
        }
        common
    }

    /// The value all last usages agree on.
    pub fn current_value(&self, declaration: DeclId) -> Option<UsageValue> {
        let last = self.state.last_usages(declaration);
        let (first, rest) = last.split_first()?;
        let value = self.usage(*first).value.as_ref()?;
        rest.iter()
            .all(|usage| self.usage(*usage).value.as_ref() == Some(value))
            .then(|| value.clone())
    }

    /// Whether every path to `usage` writes its variable.
    pub fn is_previously_initialized(&self, usage: UsageId) -> bool {
        UsageGraph::new(&self.usages).is_previously_initialized(usage)
    }

    // ========================================================================
    // States
    // ========================================================================

    pub fn snapshot(&self) -> VariableState {
        self.state.clone()
    }

    /// Replace the current state by the union of `states`.
    pub fn set_states<'s>(&mut self, states: impl IntoIterator<Item = &'s VariableState>) {
        self.state.clear_last();
        self.add_states(states);
    }

    /// Union `states` into the current state.
    pub fn add_states<'s>(&mut self, states: impl IntoIterator<Item = &'s VariableState>) {
        for state in states {
            self.state.merge(state);
        }
    }

    pub fn add_last_usages(&mut self, usages: &UsagesByVariable) {
        self.state.merge_last(usages);
    }

    /// Execution does not continue past the current position.
    pub fn clear(&mut self) {
        self.state.clear_last();
    }

    pub fn register_next(&mut self) {
        self.next_states.push(self.state.clone());
        self.state.clear_last();
    }

    pub fn register_break(&mut self) {
        self.break_states.push(self.state.clone());
        self.state.clear_last();
    }

    pub fn register_return(&mut self) {
        self.return_states.push(self.state.clone());
        self.state.clear_last();
    }

    pub fn create_reference_point(&mut self) -> ReferencePoint {
        let point = ReferencePoint::new(self.next_point);
        self.next_point += 1;
        self.state.add_reference_point(point);
        point
    }

    pub fn remove_reference_point(&mut self, point: ReferencePoint) {
        self.state.remove_reference_point(point);
    }

    /// Link the current position back to `point`.
    pub fn link_back(&mut self, point: ReferencePoint) {
        let origin = self.state.last.clone();
        self.link(&origin, point);
    }

    /// Link the last usages of `origin` to the first usages after `point`.
    /// A variable first declared after `point` goes out of scope instead.
    pub fn link(&mut self, origin: &UsagesByVariable, point: ReferencePoint) {
        let Some(first) = self.state.first.get(&point).cloned() else {
            return;
        };
        for (declaration, last) in origin {
            let Some(first) = first.get(declaration) else {
                continue;
            };
            for target in first {
                if self.usage(*target).kinds.contains(UsageKind::DECLARATION) {
                    let end = self.push_end(*declaration);
                    for usage in last {
                        self.usages[usage.index()].next.push(end);
                        self.usages[end.index()].previous.push(*usage);
                    }
                    continue;
                }
                for usage in last.iter().rev() {
                    self.usages[target.index()].previous.insert(0, *usage);
                    self.usages[usage.index()].next.insert(0, *target);
                }
            }
        }
    }

    fn push_end(&mut self, declaration: DeclId) -> UsageId {
        let id = UsageId::new(self.usages.len());
        self.usages
            .push(VariableUsage::new(UsageKind::END, declaration, Span::default(), None, None));
        id
    }

    /// Join returns into the final state and close every variable still
    /// in use with an END usage.
    pub fn calculate_end_state(&mut self) {
        let returns = std::mem::take(&mut self.return_states);
        self.add_states(&returns);
        let mut declarations: Vec<DeclId> = self.state.last.keys().copied().collect();
        declarations.sort();
        for declaration in declarations {
            let last = self.state.last_usages(declaration).to_vec();
            let end = self.push_end(declaration);
            for usage in &last {
                self.usages[usage.index()].next.push(end);
            }
            self.usages[end.index()].previous = last;
            self.ends.push((declaration, end));
        }
    }

    /// Walk every usage reachable from the first usages after `point`.
    fn reachable_from(&self, point: ReferencePoint) -> UsagesByVariable {
        let mut reached = UsagesByVariable::default();
        let Some(first) = self.state.first.get(&point) else {
            return reached;
        };
        let mut declarations: Vec<&DeclId> = first.keys().collect();
        declarations.sort();
        for declaration in declarations {
            let mut visited: Vec<UsageId> = Vec::new();
            let mut pending: Vec<UsageId> = first[declaration].iter().rev().copied().collect();
            while let Some(usage) = pending.pop() {
                if visited.contains(&usage) || self.usage(usage).is_end() {
                    continue;
                }
                visited.push(usage);
                pending.extend(self.usage(usage).next.iter().rev().copied());
            }
            reached.insert(*declaration, visited);
        }
        reached
    }

    /// Add every usage reachable after `point` to `collected`.
    pub fn collect_usages_into(&self, point: ReferencePoint, collected: &mut UsagesByVariable) {
        for (declaration, usages) in self.reachable_from(point) {
            extend_unique(collected.entry(declaration).or_default(), &usages);
        }
    }

    /// Mark every usage reachable after `point` as leaving the callable.
    pub fn mark_exiting(&mut self, point: ReferencePoint) {
        for usages in self.reachable_from(point).into_values() {
            for usage in usages {
                self.usages[usage.index()].will_exit = true;
            }
        }
    }

    // ========================================================================
    // Results
    // ========================================================================

    /// Writes to constants that may already hold a value. Outside
    /// initializers every write to a constant property counts.
    pub fn reassignments(&self) -> Vec<Reassignment> {
        let graph = UsageGraph::new(&self.usages);
        let mut reassignments = Vec::new();
        for variable in self.variables.iter().filter(|variable| variable.is_constant) {
            for usage in &variable.usages {
                let entry = self.usage(*usage);
                if !entry.kinds.contains(UsageKind::WRITE) || entry.will_exit {
                    continue;
                }
                if (variable.is_property && !self.is_initializer) || graph.is_previously_possibly_initialized(*usage) {
                    reassignments.push(Reassignment {
                        declaration: variable.declaration,
                        span: entry.span,
                    });
                }
            }
        }
        reassignments
    }

    /// Properties initialized on every path and properties read before
    /// being written. Only meaningful after [`calculate_end_state`].
    ///
    /// [`calculate_end_state`]: VariableTracker::calculate_end_state
    pub fn summary(&self) -> InitializationSummary {
        let graph = UsageGraph::new(&self.usages);
        let mut summary = InitializationSummary::default();
        for (declaration, end) in &self.ends {
            let is_property = self
                .index
                .get(declaration)
                .is_some_and(|index| self.variables[*index].is_property);
            if is_property && graph.is_previously_initialized(*end) {
                summary.being_initialized.push(*declaration);
            }
        }
        for variable in self.variables.iter().filter(|variable| variable.is_property) {
            if let Some(first) = variable.usages.first() {
                if graph.is_required_to_be_initialized(*first) {
                    summary.required.push(variable.declaration);
                }
            }
        }
        summary
    }

    pub fn add_child(&mut self, label: impl Into<String>, tracker: VariableTracker) {
        self.children.push((label.into(), tracker));
    }

    pub fn child(&self, label: &str) -> Option<&VariableTracker> {
        self.children
            .iter()
            .find(|(child, _)| child == label)
            .map(|(_, tracker)| tracker)
    }

    pub fn children(&self) -> impl Iterator<Item = (&str, &VariableTracker)> {
        self.children.iter().map(|(label, tracker)| (label.as_str(), tracker))
    }
}

#[cfg(test)]
mod tests {
    use pure_core::LiteralValue;

    use super::*;
    use crate::model::{DeclarationKind, TypeDeclaration, TypeKind, ValueDeclaration};

    fn model() -> (SemanticModel, DeclId, Type) {
        let mut model = SemanticModel::new();
        let int = model.add_type(TypeDeclaration::new("Int", TypeKind::Class, Span::default()));
        let mut local = ValueDeclaration::new("a", DeclarationKind::LocalVariable, Span::default());
        local.ty = Some(Type::object(int));
        let local = model.add_value(local);
        (model, local, Type::object(int))
    }

    fn at(line: u32) -> Span {
        Span::new(line, 1, 1)
    }

    fn int(value: i64) -> Option<UsageValue> {
        Some(UsageValue::Literal(LiteralValue::Int(value)))
    }

    #[test]
    fn usages_chain_in_program_order() {
        let (model, a, int_type) = model();
        let mut tracker = VariableTracker::new();
        let declaration = tracker.declare(&model, a, at(1), true, Some(int_type), int(0));
        let read = tracker.add_current(&model, UsageKind::READ, a, at(2));
        assert_eq!(tracker.usage(declaration).next, vec![read]);
        assert_eq!(tracker.usage(read).value, int(0));
        assert!(tracker.is_previously_initialized(read));
    }

    #[test]
    fn branches_merge_values_to_unknown() {
        let (model, a, int_type) = model();
        let mut tracker = VariableTracker::new();
        tracker.declare(&model, a, at(1), true, Some(int_type.clone()), int(0));
        let before = tracker.snapshot();
        tracker.add(&model, UsageKind::WRITE, a, at(2), Some(int_type.clone()), int(1));
        let branch = tracker.snapshot();
        tracker.set_states([&before, &branch]);
        assert_eq!(tracker.current_type(&model, a), Some(int_type));
        assert_eq!(tracker.current_value(a), None);
    }

    #[test]
    fn declarations_after_a_reference_point_end_instead_of_looping() {
        let (model, a, int_type) = model();
        let mut tracker = VariableTracker::new();
        let point = tracker.create_reference_point();
        let declaration = tracker.declare(&model, a, at(2), true, Some(int_type), int(0));
        tracker.link_back(point);
        let next = &tracker.usage(declaration).next;
        assert_eq!(next.len(), 1);
        assert!(tracker.usage(next[0]).is_end());
    }

    #[test]
    fn writes_to_constants_after_initialization_are_reassignments() {
        let (mut model, a, int_type) = model();
        model[a].is_constant = true;
        let mut tracker = VariableTracker::new();
        tracker.declare(&model, a, at(1), true, Some(int_type.clone()), int(0));
        tracker.add(&model, UsageKind::WRITE, a, at(2), Some(int_type), int(1));
        let reassignments = tracker.reassignments();
        assert_eq!(reassignments.len(), 1);
        assert_eq!(reassignments[0].span.line, 2);
    }
}
