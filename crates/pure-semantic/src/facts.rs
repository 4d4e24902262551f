//! Side tables produced by the passes.
//!
//! The syntax tree is immutable. Every pass records what it learned about a
//! node in a table keyed by the node's [`NodeId`]:
//!
//! | table              | written by        | content                                   |
//! |--------------------|-------------------|-------------------------------------------|
//! | [`DeclarationMap`] | declare           | node → type, value, signature and scope   |
//! | [`TypeFacts`]      | determine-types   | expression types, bindings, calls         |
//! | [`FlowFacts`]      | analyse-data-flow | static values, reachability, trackers     |

use pure_core::{DeclId, InternalError, LiteralValue, NodeId, SignatureId, Span, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::conversion::Conversion;
use crate::flow::VariableTracker;
use crate::model::SemanticModel;
use crate::scope::ScopeId;
use crate::types::Type;

// ============================================================================
// Declarations
// ============================================================================

/// Links from syntax nodes to what the declare pass created for them.
#[derive(Debug, Default)]
pub struct DeclarationMap {
    /// Type definitions and generic parameter definitions.
    pub types: FxHashMap<NodeId, TypeId>,
    /// Properties, computed properties, functions, locals, parameters and
    /// bindings.
    pub values: FxHashMap<NodeId, DeclId>,
    /// Functions, initializers, operators and accessors. Getters are keyed by
    /// their expression, setters by their block.
    pub signatures: FxHashMap<NodeId, SignatureId>,
    /// Files, type definitions, closures and blocks.
    pub scopes: FxHashMap<NodeId, ScopeId>,
    /// Default initializers created for types that declare none.
    pub synthesized: FxHashMap<TypeId, SignatureId>,
}

impl DeclarationMap {
    pub fn type_of(&self, node: NodeId) -> Option<TypeId> {
        self.types.get(&node).copied()
    }

    pub fn value_of(&self, node: NodeId) -> Option<DeclId> {
        self.values.get(&node).copied()
    }

    pub fn signature_of(&self, node: NodeId) -> Option<SignatureId> {
        self.signatures.get(&node).copied()
    }

    pub fn scope_of(&self, node: NodeId) -> Option<ScopeId> {
        self.scopes.get(&node).copied()
    }

    /// Scope of a node that must have one.
    pub fn require_scope(&self, node: NodeId, span: Span) -> Result<ScopeId, InternalError> {
        self.scope_of(node).ok_or_else(|| missing("scope", node, span))
    }

    /// Signature of a node that must have one.
    pub fn require_signature(&self, node: NodeId, span: Span) -> Result<SignatureId, InternalError> {
        self.signature_of(node).ok_or_else(|| missing("signature", node, span))
    }

    /// Value declaration of a node that must have one.
    pub fn require_value(&self, node: NodeId, span: Span) -> Result<DeclId, InternalError> {
        self.value_of(node).ok_or_else(|| missing("value declaration", node, span))
    }
}

fn missing(table: &str, node: NodeId, span: Span) -> InternalError {
    InternalError::MissingNode {
        table: table.to_string(),
        node: node.to_string(),
        span,
    }
}

// ============================================================================
// Types
// ============================================================================

/// How a call reaches its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    /// A function declared at file level.
    Function,
    /// A member function, on `self` or on another receiver.
    Method,
    /// `Type(...)`: creates a new instance.
    Construction,
    /// `init(...)`, `self.init(...)` or `super.init(...)` inside an initializer.
    Delegation,
    /// An overloaded operator.
    Operator,
}

/// The signature a call, operator or construction resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallResolution {
    /// Selected signature, specialized when generic.
    pub signature: SignatureId,
    /// The signature as declared.
    pub declared: SignatureId,
    pub kind: CallKind,
    /// Conversion applied to each argument in order.
    pub conversions: Vec<Conversion>,
}

/// Results of the determine-types pass.
#[derive(Debug, Default)]
pub struct TypeFacts {
    /// Type of every expression whose type could be determined.
    pub expression_types: FxHashMap<NodeId, Type>,
    /// Resolved type expressions.
    pub type_exprs: FxHashMap<NodeId, Type>,
    /// Declarations referenced by variable and member expressions.
    pub bindings: FxHashMap<NodeId, DeclId>,
    /// Calls, constructions and operator applications.
    pub calls: FxHashMap<NodeId, CallResolution>,
    /// Implicit conversions applied to assigned, returned or initial values.
    pub conversions: FxHashMap<NodeId, Conversion>,
    /// Tracked declarations written anywhere inside a loop, keyed by the
    /// loop statement, in order of first mutation.
    pub loop_mutations: FxHashMap<NodeId, Vec<DeclId>>,
}

impl TypeFacts {
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.expression_types.get(&node)
    }

    pub fn binding(&self, node: NodeId) -> Option<DeclId> {
        self.bindings.get(&node).copied()
    }

    pub fn call(&self, node: NodeId) -> Option<&CallResolution> {
        self.calls.get(&node)
    }

    pub fn resolved_type(&self, node: NodeId) -> Option<&Type> {
        self.type_exprs.get(&node)
    }

    pub fn mutations_in(&self, loop_node: NodeId) -> &[DeclId] {
        self.loop_mutations.get(&loop_node).map(Vec::as_slice).unwrap_or(&[])
    }
}

// ============================================================================
// Data flow
// ============================================================================

/// Properties an initializer or method initializes and relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitializationSummary {
    /// Properties unconditionally initialized when the callable returns.
    pub being_initialized: Vec<DeclId>,
    /// Properties read before the callable writes them.
    pub required: Vec<DeclId>,
}

/// Properties an initializer leaves uninitialized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitializerCheck {
    pub signature: SignatureId,
    pub owner: TypeId,
    pub span: Span,
    pub missing: Vec<DeclId>,
}

/// A constant written after it may already hold a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reassignment {
    pub declaration: DeclId,
    pub span: Span,
}

/// Body a tracker was recorded for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TrackerKey {
    /// Top-level statements of the named file.
    File(String),
    /// Function, member, accessor or initializer body.
    Callable(SignatureId),
}

impl TrackerKey {
    /// The file name or the rendered signature.
    pub fn label(&self, model: &SemanticModel) -> String {
        match self {
            TrackerKey::File(name) => name.clone(),
            TrackerKey::Callable(signature) => model.display_signature(*signature).to_string(),
        }
    }
}

/// Results of the analyse-data-flow pass.
#[derive(Debug, Default)]
pub struct FlowFacts {
    /// Statically known values of expressions.
    pub values: FxHashMap<NodeId, LiteralValue>,
    /// Statements and blocks that never complete normally.
    pub interrupting: FxHashSet<NodeId>,
    /// Statements that are never executed, in source order.
    pub unreachable: Vec<(NodeId, Span)>,
    /// Trackers of every analysed body. Overloads that render alike keep
    /// separate entries.
    pub trackers: FxHashMap<TrackerKey, VariableTracker>,
    pub summaries: FxHashMap<SignatureId, InitializationSummary>,
    pub initializer_checks: Vec<InitializerCheck>,
    pub reassignments: Vec<Reassignment>,
}

impl FlowFacts {
    pub fn value_of(&self, node: NodeId) -> Option<&LiteralValue> {
        self.values.get(&node)
    }

    pub fn is_interrupting(&self, node: NodeId) -> bool {
        self.interrupting.contains(&node)
    }

    pub fn is_unreachable(&self, node: NodeId) -> bool {
        self.unreachable.iter().any(|(unreachable, _)| *unreachable == node)
    }

    pub fn tracker(&self, key: &TrackerKey) -> Option<&VariableTracker> {
        self.trackers.get(key)
    }

    /// The tracker whose label renders as `label`. Among overloads that render
    /// alike, the one declared first.
    pub fn tracker_labelled(&self, model: &SemanticModel, label: &str) -> Option<&VariableTracker> {
        self.trackers
            .iter()
            .filter(|(key, _)| key.label(model) == label)
            .min_by_key(|(key, _)| *key)
            .map(|(_, tracker)| tracker)
    }

    /// Labels of every tracker, sorted.
    pub fn tracker_labels(&self, model: &SemanticModel) -> Vec<String> {
        let mut labels: Vec<String> = self.trackers.keys().map(|key| key.label(model)).collect();
        labels.sort();
        labels
    }

    pub fn summary(&self, signature: SignatureId) -> Option<&InitializationSummary> {
        self.summaries.get(&signature)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entries_are_internal_errors() {
        let map = DeclarationMap::default();
        let err = map.require_scope(NodeId::new(3), Span::new(2, 1, 1)).unwrap_err();
        assert!(matches!(err, InternalError::MissingNode { ref table, .. } if table == "scope"));
    }

    #[test]
    fn loops_without_mutations_yield_empty_slice() {
        let facts = TypeFacts::default();
        assert!(facts.mutations_in(NodeId::new(0)).is_empty());
    }
}
