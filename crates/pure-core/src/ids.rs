//! Stable arena identifiers.
//!
//! Declarations, signatures and type declarations live in arenas owned by the
//! semantic model. Syntax nodes are numbered by the tree builder. All of them
//! are addressed by small copyable ids so side tables and cross references
//! never hold borrows into the arenas.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Create an id with the given arena index.
            #[inline]
            pub const fn new(index: u32) -> Self {
                Self(index)
            }

            /// The arena index.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "_{}"), self.0)
            }
        }

        impl From<u32> for $name {
            fn from(index: u32) -> Self {
                Self::new(index)
            }
        }

        impl From<$name> for u32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(
    /// Identifies a type declaration (class, object, trait or generic parameter).
    TypeId,
    "type"
);

define_id!(
    /// Identifies a value declaration: local, parameter, property, computed
    /// property or a named overload set.
    DeclId,
    "decl"
);

define_id!(
    /// Identifies a function, operator or initializer signature.
    SignatureId,
    "sig"
);

define_id!(
    /// Identifies a syntax tree node.
    NodeId,
    "node"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_round_trip_through_u32() {
        let id = DeclId::from(7);
        assert_eq!(id.index(), 7);
        assert_eq!(u32::from(id), 7);
    }

    #[test]
    fn ids_display_with_prefix() {
        assert_eq!(TypeId::new(3).to_string(), "type_3");
        assert_eq!(SignatureId::new(0).to_string(), "sig_0");
        assert_eq!(NodeId::new(12).to_string(), "node_12");
    }

    #[test]
    fn ids_order_by_index() {
        assert!(NodeId::new(1) < NodeId::new(2));
        assert_ne!(TypeId::new(1), TypeId::new(2));
    }
}
