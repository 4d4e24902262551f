//! Variable usages: the nodes of the data-flow graph.
//!
//! Every read, write, narrowing hint and declaration of a tracked variable
//! becomes one [`VariableUsage`]. Usages are linked to the usages that may
//! execute directly before and after them. Predecessors decide whether a
//! variable is initialized at a usage; successors decide whether its value
//! is still needed.

use std::fmt;

use bitflags::bitflags;
use pure_core::{DeclId, LiteralValue, NodeId, Span};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::types::Type;

bitflags! {
    /// What a usage does to its variable.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct UsageKind: u8 {
        const DECLARATION = 1 << 0;
        const READ = 1 << 1;
        const WRITE = 1 << 2;
        /// Reads and writes in place: `a++`, `a += b`.
        const MUTATION = 1 << 3;
        /// Narrows type or value without executing anything.
        const HINT = 1 << 4;
        /// Leaves the callable.
        const END = 1 << 5;
    }
}

impl UsageKind {
    /// Lowercase kind names joined by `&`, e.g. `declaration & write`.
    pub fn describe(self) -> String {
        const NAMES: [(UsageKind, &str); 6] = [
            (UsageKind::DECLARATION, "declaration"),
            (UsageKind::READ, "read"),
            (UsageKind::WRITE, "write"),
            (UsageKind::MUTATION, "mutation"),
            (UsageKind::HINT, "hint"),
            (UsageKind::END, "end"),
        ];
        NAMES
            .iter()
            .filter(|(kind, _)| self.contains(*kind))
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(" & ")
    }
}

/// Index of a usage inside its tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UsageId(u32);

impl UsageId {
    pub(crate) fn new(index: usize) -> Self {
        Self(index as u32)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Value a variable holds after a usage.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum UsageValue {
    Literal(LiteralValue),
    /// The result of evaluating the expression with this id. Two usages
    /// holding the same expression hold the same value.
    Expression(NodeId),
}

impl UsageValue {
    pub fn literal(&self) -> Option<&LiteralValue> {
        match self {
            UsageValue::Literal(value) => Some(value),
            UsageValue::Expression(_) => None,
        }
    }
}

impl fmt::Display for UsageValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UsageValue::Literal(value) => write!(f, "{}", value),
            UsageValue::Expression(_) => write!(f, "Expression"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct VariableUsage {
    pub kinds: UsageKind,
    pub declaration: DeclId,
    pub span: Span,
    /// Type the variable has after this usage.
    pub ty: Option<Type>,
    /// Value the variable holds after this usage, if known.
    pub value: Option<UsageValue>,
    pub previous: Vec<UsageId>,
    pub next: Vec<UsageId>,
    /// Part of an `always` block executed while a raise propagates.
    pub will_exit: bool,
}

impl VariableUsage {
    pub fn new(kinds: UsageKind, declaration: DeclId, span: Span, ty: Option<Type>, value: Option<UsageValue>) -> Self {
        Self {
            kinds,
            declaration,
            span,
            ty,
            value,
            previous: Vec::new(),
            next: Vec::new(),
            will_exit: false,
        }
    }

    pub fn is_end(&self) -> bool {
        self.kinds.contains(UsageKind::END)
    }
}

// ============================================================================
// Initialization queries
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Initialization {
    /// Being computed further up the recursion; cycles resolve to this.
    Pending,
    Initialized,
    Uninitialized,
}

/// Read-only view over a tracker's usages answering initialization
/// questions. Links may still be added after a query, so nothing is cached
/// across queries.
pub(crate) struct UsageGraph<'a> {
    usages: &'a [VariableUsage],
}

impl<'a> UsageGraph<'a> {
    pub(crate) fn new(usages: &'a [VariableUsage]) -> Self {
        Self { usages }
    }

    fn usage(&self, id: UsageId) -> &'a VariableUsage {
        &self.usages[id.index()]
    }

    /// Every path reaching `id` writes the variable.
    pub(crate) fn is_previously_initialized(&self, id: UsageId) -> bool {
        let previous = &self.usage(id).previous;
        let mut memo = FxHashMap::default();
        !previous.is_empty()
            && previous
                .iter()
                .all(|usage| self.initialization(*usage, &mut memo) == Initialization::Initialized)
    }

    fn initialization(&self, id: UsageId, memo: &mut FxHashMap<UsageId, Initialization>) -> Initialization {
        if let Some(state) = memo.get(&id) {
            return *state;
        }
        memo.insert(id, Initialization::Pending);
        let usage = self.usage(id);
        let initialized = usage.kinds.contains(UsageKind::WRITE)
            || (!usage.previous.is_empty()
                && !usage
                    .previous
                    .iter()
                    .any(|previous| self.initialization(*previous, memo) == Initialization::Uninitialized));
        let state = if initialized {
            Initialization::Initialized
        } else {
            Initialization::Uninitialized
        };
        memo.insert(id, state);
        state
    }

    /// Some path reaching `id` writes the variable.
    pub(crate) fn is_previously_possibly_initialized(&self, id: UsageId) -> bool {
        let mut visited = FxHashSet::default();
        let mut pending = self.usage(id).previous.clone();
        while let Some(usage) = pending.pop() {
            if !visited.insert(usage) {
                continue;
            }
            let usage = self.usage(usage);
            if usage.kinds.contains(UsageKind::WRITE) {
                return true;
            }
            pending.extend(usage.previous.iter().copied());
        }
        false
    }

    /// The value at `id` is read before the variable is written again.
    pub(crate) fn is_required_to_be_initialized(&self, id: UsageId) -> bool {
        let mut visited = FxHashSet::default();
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if !visited.insert(current) {
                continue;
            }
            let usage = self.usage(current);
            if usage.kinds.contains(UsageKind::READ) {
                return true;
            }
            if current != id && usage.kinds.contains(UsageKind::WRITE) {
                continue;
            }
            pending.extend(usage.next.iter().copied());
        }
        false
    }
}
