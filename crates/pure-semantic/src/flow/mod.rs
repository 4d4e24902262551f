//! Data-flow analysis.
//!
//! Every callable body gets one [`VariableTracker`] that records how its
//! locals, parameters and properties are declared, read, written and
//! narrowed. Usages form a graph: each usage links to the usages that may
//! follow it, loops link back to their start and END usages close the
//! graph where the callable completes.
//!
//! The graph answers the questions later passes ask:
//!
//! - Is a variable initialized on every path to a read?
//! - Which properties does an initializer assign, and which does a method
//!   rely on?
//! - Is a constant written after it may already hold a value?
//! - What type and static value does a variable have at a usage?

mod analyzer;
mod fold;
mod report;
mod state;
mod tracker;
mod usage;

pub(crate) use analyzer::{FlowAnalyzer, FlowInputs};
pub use fold::{fold_binary, fold_step, fold_unary};
pub use state::{ReferencePoint, UsagesByVariable, VariableState};
pub use tracker::VariableTracker;
pub use usage::{UsageId, UsageKind, UsageValue, VariableUsage};
