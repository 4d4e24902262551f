//! Generic signature specialization cache.
//!
//! Maps (generic signature, canonical substitution) → specialized signature.
//! An entry is installed as [`Specialization::Pending`] before the
//! specialized signature is computed, so a specialization that needs itself
//! while being built receives the reserved id instead of recursing.

use pure_core::{SignatureId, TypeId};
use rustc_hash::FxHashMap;

use crate::types::{Substitution, TypeArgument};

/// Substitution entries sorted by parameter.
pub type CanonicalSubstitution = Vec<(TypeId, TypeArgument)>;

pub fn canonicalize(substitution: &Substitution) -> CanonicalSubstitution {
    let mut entries: CanonicalSubstitution = substitution
        .iter()
        .map(|(parameter, argument)| (*parameter, argument.clone()))
        .collect();
    entries.sort_by_key(|(parameter, _)| *parameter);
    entries
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Specialization {
    /// Id reserved, signature still being computed.
    Pending(SignatureId),
    Ready(SignatureId),
}

impl Specialization {
    pub fn id(self) -> SignatureId {
        match self {
            Specialization::Pending(id) | Specialization::Ready(id) => id,
        }
    }
}

#[derive(Debug, Default, Clone)]
pub struct SpecializationCache {
    entries: FxHashMap<(SignatureId, CanonicalSubstitution), Specialization>,
}

impl SpecializationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, signature: SignatureId, substitution: &Substitution) -> Option<Specialization> {
        self.entries
            .get(&(signature, canonicalize(substitution)))
            .copied()
    }

    /// Reserve `id` for the specialization. Returns the existing entry
    /// instead when one is already present.
    pub fn reserve(
        &mut self,
        signature: SignatureId,
        substitution: &Substitution,
        id: SignatureId,
    ) -> Result<(), Specialization> {
        let key = (signature, canonicalize(substitution));
        if let Some(existing) = self.entries.get(&key) {
            return Err(*existing);
        }
        self.entries.insert(key, Specialization::Pending(id));
        Ok(())
    }

    pub fn complete(&mut self, signature: SignatureId, substitution: &Substitution) {
        if let Some(entry) = self.entries.get_mut(&(signature, canonicalize(substitution))) {
            *entry = Specialization::Ready(entry.id());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Type, bind};

    fn substitution(ty: u32) -> Substitution {
        bind(
            &[TypeId::new(1), TypeId::new(2)],
            &[
                TypeArgument::invariant(Type::object(TypeId::new(ty))),
                TypeArgument::invariant(Type::NULL),
            ],
        )
    }

    #[test]
    fn reserved_entries_are_pending_until_completed() {
        let mut cache = SpecializationCache::new();
        let generic = SignatureId::new(0);
        cache.reserve(generic, &substitution(7), SignatureId::new(9)).unwrap();

        assert_eq!(
            cache.get(generic, &substitution(7)),
            Some(Specialization::Pending(SignatureId::new(9)))
        );
        cache.complete(generic, &substitution(7));
        assert_eq!(
            cache.get(generic, &substitution(7)),
            Some(Specialization::Ready(SignatureId::new(9)))
        );
    }

    #[test]
    fn second_reservation_returns_existing_entry() {
        let mut cache = SpecializationCache::new();
        let generic = SignatureId::new(0);
        cache.reserve(generic, &substitution(7), SignatureId::new(9)).unwrap();

        let Err(existing) = cache.reserve(generic, &substitution(7), SignatureId::new(10)) else {
            panic!("Expected existing entry");
        };
        assert_eq!(existing.id(), SignatureId::new(9));
        assert!(cache.get(generic, &substitution(8)).is_none());
        assert_eq!(cache.len(), 1);
    }
}
