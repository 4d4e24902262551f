//! Textual rendering of a variable's usage graph.
//!
//! ```text
//! start -> 1
//! 1: declaration & write -> 3, 5 (Int, 0)
//! 3: read -> 7 (Int, 0)
//! 5: write -> 7 (Int, 1)
//! 7: read -> end (Int, null)
//! ```
//!
//! Usages are named by their line, suffixed with `e` when they run while a
//! raise propagates. A usage without successors continues the raise.

use std::fmt::Write;

use crate::model::SemanticModel;

use super::tracker::VariableTracker;
use super::usage::{UsageId, VariableUsage};

impl VariableTracker {
    /// Render the usages of the first tracked variable called `name`.
    pub fn report_for(&self, model: &SemanticModel, name: &str) -> Option<String> {
        let variable = self.variables.iter().find(|variable| variable.name == name)?;
        let first = variable.usages.first()?;
        let mut report = format!("start -> {}", self.usage(*first).span.line);
        for usage in &variable.usages {
            let entry = self.usage(*usage);
            let successors = if entry.next.is_empty() {
                "continues raise".to_string()
            } else {
                entry
                    .next
                    .iter()
                    .map(|next| self.usage_label(*next))
                    .collect::<Vec<_>>()
                    .join(", ")
            };
            let ty = match &entry.ty {
                Some(ty) => model.display(ty).to_string(),
                None => "null".to_string(),
            };
            let value = match &entry.value {
                Some(value) => value.to_string(),
                None => "null".to_string(),
            };
            let _ = write!(
                report,
                "\n{}: {} -> {} ({}, {})",
                self.usage_label(*usage),
                entry.kinds.describe(),
                successors,
                ty,
                value
            );
        }
        Some(report)
    }

    fn usage_label(&self, id: UsageId) -> String {
        label(self.usage(id))
    }
}

fn label(usage: &VariableUsage) -> String {
    if usage.is_end() {
        return "end".to_string();
    }
    if usage.will_exit {
        format!("{}e", usage.span.line)
    } else {
        usage.span.line.to_string()
    }
}
