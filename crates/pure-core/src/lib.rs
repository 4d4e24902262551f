//! Core types shared by the Pure semantic analysis crates.
//!
//! - [`Span`]: source positions
//! - [`TypeId`], [`DeclId`], [`SignatureId`], [`NodeId`]: arena identifiers
//! - [`LiteralValue`]: statically known values
//! - [`SemanticError`], [`InternalError`]: reported issues and broken invariants
//! - [`Diagnostics`], [`IssueSink`]: issue collection

mod diagnostics;
mod error;
mod ids;
mod span;
mod value;

pub use diagnostics::{Diagnostic, Diagnostics, IssueSink};
pub use error::{InternalError, SemanticError, Severity};
pub use ids::{DeclId, NodeId, SignatureId, TypeId};
pub use span::Span;
pub use value::LiteralValue;
