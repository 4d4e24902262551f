//! Syntax tree consumed by the analysis.
//!
//! Every node carries a [`NodeId`](pure_core::NodeId) and a
//! [`Span`](pure_core::Span). The tree is never mutated by analysis; results
//! are recorded in side tables keyed by node id.

mod builder;
mod decl;
mod expr;
mod stmt;
mod types;

pub use builder::Builder;
pub use decl::*;
pub use expr::*;
pub use stmt::*;
pub use types::*;
