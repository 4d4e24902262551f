//! Scope Tree - lexical and inherited name lookup.
//!
//! Uses `petgraph::DiGraph` with:
//! - Nodes: [`ScopeData`] (values, types and operators declared at that level)
//! - Edges: [`ScopeEdge::EnclosedBy`] to the lexically enclosing scope and
//!   [`ScopeEdge::Inherits`] from a type scope to each super-type scope
//!
//! ## Responsibilities
//!
//! - Append-only storage of declarations during the declare pass
//! - Value lookup through enclosing scopes, where type scopes also walk the
//!   scopes of their super-types in declaration order
//! - Position filtering: locals of block and callable scopes are only visible
//!   to references at or after their declaration
//!
//! The first match wins. Choosing among the overloads of a function is left to
//! the resolver.

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use pure_core::{DeclId, SignatureId, Span, TypeId};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::ast::OperatorKind;

/// Identifies a scope in the [`ScopeTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeId(NodeIndex);

impl ScopeId {
    pub fn index(self) -> usize {
        self.0.index()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// Built-in types and everything declared at file level, shared by all files.
    Global,
    File,
    /// Member scope of a type declaration.
    Type(TypeId),
    /// Parameters and generic parameters of a function, initializer, operator,
    /// accessor or closure.
    Callable,
    Block,
}

/// Edge types in the scope graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeEdge {
    /// Child scope is lexically enclosed by the target.
    EnclosedBy,
    /// Type scope inherits members of the target type scope. The number is the
    /// position of the super-type in the declaration.
    Inherits(usize),
}

/// A declared value with the position from which it is visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueEntry {
    pub decl: DeclId,
    /// `None` for declarations visible throughout the scope.
    pub position: Option<Span>,
}

/// Data stored in each scope node.
#[derive(Debug)]
pub struct ScopeData {
    pub kind: ScopeKind,
    pub values: FxHashMap<String, Vec<ValueEntry>>,
    pub types: FxHashMap<String, TypeId>,
    pub operators: FxHashMap<OperatorKind, Vec<SignatureId>>,
}

impl ScopeData {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            values: FxHashMap::default(),
            types: FxHashMap::default(),
            operators: FxHashMap::default(),
        }
    }

    /// Latest declaration of `name` visible at `at`.
    fn value_at(&self, name: &str, at: Option<Span>) -> Option<DeclId> {
        self.values
            .get(name)?
            .iter()
            .rev()
            .find(|entry| match (entry.position, at) {
                (Some(position), Some(at)) => position.starts_at_or_before(at),
                _ => true,
            })
            .map(|entry| entry.decl)
    }
}

/// The scope graph.
#[derive(Debug)]
pub struct ScopeTree {
    graph: DiGraph<ScopeData, ScopeEdge>,
    global: NodeIndex,
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeTree {
    /// Create a tree holding only the global scope.
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let global = graph.add_node(ScopeData::new(ScopeKind::Global));
        Self { graph, global }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(self.global)
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn get(&self, scope: ScopeId) -> Option<&ScopeData> {
        self.graph.node_weight(scope.0)
    }

    pub fn kind(&self, scope: ScopeId) -> Option<ScopeKind> {
        self.get(scope).map(|data| data.kind)
    }

    /// Create a scope enclosed by `parent`.
    pub fn new_scope(&mut self, kind: ScopeKind, parent: ScopeId) -> ScopeId {
        let node = self.graph.add_node(ScopeData::new(kind));
        self.graph.add_edge(node, parent.0, ScopeEdge::EnclosedBy);
        ScopeId(node)
    }

    /// Let a type scope inherit the members of `parent`. `order` is the
    /// position of the super-type in the type's declaration.
    pub fn add_inheritance(&mut self, scope: ScopeId, parent: ScopeId, order: usize) {
        let exists = self
            .graph
            .edges(scope.0)
            .any(|edge| edge.target() == parent.0 && matches!(edge.weight(), ScopeEdge::Inherits(_)));
        if !exists && scope != parent {
            self.graph.add_edge(scope.0, parent.0, ScopeEdge::Inherits(order));
        }
    }

    pub fn enclosing(&self, scope: ScopeId) -> Option<ScopeId> {
        self.graph
            .edges_directed(scope.0, Direction::Outgoing)
            .find(|edge| *edge.weight() == ScopeEdge::EnclosedBy)
            .map(|edge| ScopeId(edge.target()))
    }

    /// Directly inherited scopes in declaration order.
    pub fn inherited(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut inherited: Vec<(usize, ScopeId)> = self
            .graph
            .edges_directed(scope.0, Direction::Outgoing)
            .filter_map(|edge| match edge.weight() {
                ScopeEdge::Inherits(order) => Some((*order, ScopeId(edge.target()))),
                ScopeEdge::EnclosedBy => None,
            })
            .collect();
        inherited.sort_by_key(|(order, _)| *order);
        inherited.into_iter().map(|(_, scope)| scope).collect()
    }

    /// The closest enclosing type declaration, including `scope` itself.
    pub fn enclosing_type(&self, scope: ScopeId) -> Option<TypeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(ScopeKind::Type(ty)) = self.kind(id) {
                return Some(ty);
            }
            current = self.enclosing(id);
        }
        None
    }

    // ========================================================================
    // Declaration
    // ========================================================================

    /// Declare a value. Fails with the previous declaration when the name is
    /// already declared in this scope.
    pub fn declare_value(
        &mut self,
        scope: ScopeId,
        name: &str,
        decl: DeclId,
        position: Option<Span>,
    ) -> Result<(), DeclId> {
        let Some(data) = self.graph.node_weight_mut(scope.0) else {
            return Ok(());
        };
        let entries = data.values.entry(name.to_string()).or_default();
        if let Some(previous) = entries.first() {
            return Err(previous.decl);
        }
        entries.push(ValueEntry { decl, position });
        Ok(())
    }

    /// Declare a type. Fails with the previous declaration when the name is
    /// already declared in this scope.
    pub fn declare_type(&mut self, scope: ScopeId, name: &str, ty: TypeId) -> Result<(), TypeId> {
        let Some(data) = self.graph.node_weight_mut(scope.0) else {
            return Ok(());
        };
        if let Some(previous) = data.types.get(name) {
            return Err(*previous);
        }
        data.types.insert(name.to_string(), ty);
        Ok(())
    }

    pub fn declare_operator(&mut self, scope: ScopeId, operator: OperatorKind, signature: SignatureId) {
        if let Some(data) = self.graph.node_weight_mut(scope.0) {
            data.operators.entry(operator).or_default().push(signature);
        }
    }

    // ========================================================================
    // Resolution
    // ========================================================================

    /// Value declared directly in `scope`, ignoring positions.
    pub fn own_value(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.get(scope)?.value_at(name, None)
    }

    /// Resolve a value name referenced at `at`.
    ///
    /// Search order:
    /// 1. The scope itself (position filtered)
    /// 2. Inherited type scopes in declaration order, recursively
    /// 3. The enclosing scope, repeating from 1
    pub fn resolve_value(&self, scope: ScopeId, name: &str, at: Option<Span>) -> Option<DeclId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(decl) = self.get(id).and_then(|data| data.value_at(name, at)) {
                return Some(decl);
            }
            if let Some(decl) = self.resolve_inherited(id, name) {
                return Some(decl);
            }
            current = self.enclosing(id);
        }
        None
    }

    /// Resolve a member of a type scope: own members, then inherited ones.
    pub fn resolve_member(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.member_scopes_in_order(scope)
            .into_iter()
            .find_map(|id| self.own_value(id, name))
    }

    fn resolve_inherited(&self, scope: ScopeId, name: &str) -> Option<DeclId> {
        self.member_scopes_in_order(scope)
            .into_iter()
            .skip(1)
            .find_map(|id| self.own_value(id, name))
    }

    /// Resolve a type name through enclosing scopes. Inheritance is not
    /// followed: generic parameters of a super-type are not visible in
    /// its subtypes.
    pub fn resolve_type(&self, scope: ScopeId, name: &str) -> Option<TypeId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(ty) = self.get(id).and_then(|data| data.types.get(name)) {
                return Some(*ty);
            }
            current = self.enclosing(id);
        }
        None
    }

    /// Operator signatures declared on a type scope and its super-type scopes.
    pub fn resolve_operators(&self, scope: ScopeId, operator: OperatorKind) -> Vec<SignatureId> {
        self.member_scopes_in_order(scope)
            .into_iter()
            .filter_map(|id| self.get(id)?.operators.get(&operator))
            .flatten()
            .copied()
            .collect()
    }

    /// `scope` followed by every transitively inherited scope, depth first in
    /// declaration order, each listed once.
    pub fn member_scopes_in_order(&self, scope: ScopeId) -> Vec<ScopeId> {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        self.collect_member_scopes(scope, &mut visited, &mut order);
        order
    }

    fn collect_member_scopes(&self, scope: ScopeId, visited: &mut FxHashSet<ScopeId>, order: &mut Vec<ScopeId>) {
        if !visited.insert(scope) {
            return;
        }
        order.push(scope);
        for parent in self.inherited(scope) {
            self.collect_member_scopes(parent, visited, order);
        }
    }
}
