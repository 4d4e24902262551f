//! Snapshots of where each variable was last used.

use pure_core::DeclId;
use rustc_hash::FxHashMap;

use super::usage::UsageId;

/// Marks a position execution may jump back to, such as a loop's
/// re-entry. Usages created after it are recorded as its first usages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ReferencePoint(u32);

impl ReferencePoint {
    pub(crate) fn new(index: u32) -> Self {
        Self(index)
    }
}

/// Usages by variable, in insertion order without duplicates.
pub type UsagesByVariable = FxHashMap<DeclId, Vec<UsageId>>;

/// Per-variable last usages plus the first usages following each active
/// reference point. Forked at every branch and merged at every join.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariableState {
    pub(crate) first: FxHashMap<ReferencePoint, UsagesByVariable>,
    pub(crate) last: UsagesByVariable,
}

impl VariableState {
    pub fn last_usages(&self, declaration: DeclId) -> &[UsageId] {
        self.last.get(&declaration).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn first_usages(&self, point: ReferencePoint) -> Option<&UsagesByVariable> {
        self.first.get(&point)
    }

    pub(crate) fn clear_last(&mut self) {
        self.last.clear();
    }

    pub(crate) fn add_reference_point(&mut self, point: ReferencePoint) {
        self.first.insert(point, UsagesByVariable::default());
    }

    pub(crate) fn remove_reference_point(&mut self, point: ReferencePoint) {
        self.first.remove(&point);
    }

    /// Union another state into this one.
    pub(crate) fn merge(&mut self, other: &VariableState) {
        for (point, usages) in &other.first {
            let target = self.first.entry(*point).or_default();
            for (declaration, usages) in usages {
                extend_unique(target.entry(*declaration).or_default(), usages);
            }
        }
        self.merge_last(&other.last);
    }

    pub(crate) fn merge_last(&mut self, last: &UsagesByVariable) {
        for (declaration, usages) in last {
            extend_unique(self.last.entry(*declaration).or_default(), usages);
        }
    }

    /// Make `usage` the only last usage of `declaration` and record it as
    /// first usage for every reference point that has none yet.
    ///
    /// Only one first usage is kept per reference point. When two branches
    /// after a point each start with a usage and are merged, only the first
    /// branch's usage is linked back to by the loop; the other branch's
    /// first usage gets no back-edge.
    pub(crate) fn advance(&mut self, declaration: DeclId, usage: UsageId) {
        for usages in self.first.values_mut() {
            let first = usages.entry(declaration).or_default();
            if first.is_empty() {
                first.push(usage);
            }
        }
        let last = self.last.entry(declaration).or_default();
        last.clear();
        last.push(usage);
    }
}

pub(crate) fn extend_unique(target: &mut Vec<UsageId>, usages: &[UsageId]) {
    for usage in usages {
        if !target.contains(usage) {
            target.push(*usage);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_unions_without_duplicates() {
        let a = DeclId::new(0);
        let mut left = VariableState::default();
        left.advance(a, UsageId::new(1));
        let mut right = VariableState::default();
        right.advance(a, UsageId::new(2));
        right.merge(&left);
        right.merge(&left);
        assert_eq!(right.last_usages(a), &[UsageId::new(2), UsageId::new(1)]);
    }

    #[test]
    fn only_the_first_usage_after_a_point_is_recorded() {
        let a = DeclId::new(0);
        let point = ReferencePoint::new(0);
        let mut state = VariableState::default();
        state.advance(a, UsageId::new(0));
        state.add_reference_point(point);
        state.advance(a, UsageId::new(1));
        state.advance(a, UsageId::new(2));
        let first = state.first_usages(point).unwrap();
        assert_eq!(first[&a], vec![UsageId::new(1)]);
        assert_eq!(state.last_usages(a), &[UsageId::new(2)]);

        state.remove_reference_point(point);
        assert!(state.first_usages(point).is_none());
    }

    #[test]
    fn second_branch_after_a_point_keeps_the_first_branch_usage() {
        let a = DeclId::new(0);
        let point = ReferencePoint::new(0);
        let mut state = VariableState::default();
        state.add_reference_point(point);
        let fork = state.clone();

        state.advance(a, UsageId::new(1));
        let after_first = state.clone();
        state.clear_last();
        state.merge(&fork);
        state.advance(a, UsageId::new(2));
        state.merge(&after_first);

        assert_eq!(state.first_usages(point).unwrap()[&a], vec![UsageId::new(1)]);
        assert_eq!(state.last_usages(a), &[UsageId::new(2), UsageId::new(1)]);
    }

    /// Every map of a state with its usage lists sorted.
    fn normalized(state: &VariableState) -> (Vec<(ReferencePoint, Vec<(DeclId, Vec<UsageId>)>)>, Vec<(DeclId, Vec<UsageId>)>) {
        let sorted = |usages: &UsagesByVariable| {
            let mut entries: Vec<(DeclId, Vec<UsageId>)> = usages
                .iter()
                .map(|(declaration, usages)| {
                    let mut usages = usages.clone();
                    usages.sort();
                    (*declaration, usages)
                })
                .collect();
            entries.sort();
            entries
        };
        let mut first: Vec<_> = state.first.iter().map(|(point, usages)| (*point, sorted(usages))).collect();
        first.sort();
        (first, sorted(&state.last))
    }

    #[test]
    fn merge_is_commutative_up_to_order() {
        let (a, b) = (DeclId::new(0), DeclId::new(1));
        let point = ReferencePoint::new(0);
        let mut left = VariableState::default();
        left.add_reference_point(point);
        left.advance(a, UsageId::new(1));
        left.advance(b, UsageId::new(3));
        let mut right = VariableState::default();
        right.add_reference_point(point);
        right.advance(a, UsageId::new(2));

        let mut left_right = left.clone();
        left_right.merge(&right);
        let mut right_left = right.clone();
        right_left.merge(&left);

        assert_eq!(normalized(&left_right), normalized(&right_left));
        assert_eq!(left_right.last_usages(a), &[UsageId::new(1), UsageId::new(2)]);
        assert_eq!(right_left.last_usages(a), &[UsageId::new(2), UsageId::new(1)]);
        assert_eq!(right_left.last_usages(b), &[UsageId::new(3)]);
    }
}
