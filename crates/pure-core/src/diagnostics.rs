//! Collection of issues reported during analysis.
//!
//! Passes report through the [`IssueSink`] trait and never inspect what they
//! reported. [`Diagnostics`] is the collecting implementation used by the
//! pipeline.

use std::fmt;

use crate::{SemanticError, Severity, Span};

/// Receives issues as they are found.
pub trait IssueSink {
    /// Report an issue. Never fails and never aborts the caller.
    fn add_issue(&mut self, issue: SemanticError);
}

/// A reported issue together with its effective severity.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub error: SemanticError,
}

impl Diagnostic {
    #[inline]
    pub fn span(&self) -> Span {
        self.error.span()
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", label, self.error)
    }
}

/// Ordered collection of issues.
///
/// While muted, reported issues are dropped. Muting nests: every
/// [`mute`](Diagnostics::mute) must be paired with an
/// [`unmute`](Diagnostics::unmute).
#[derive(Debug, Default)]
pub struct Diagnostics {
    diagnostics: Vec<Diagnostic>,
    muted: u32,
    warnings_as_errors: bool,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a collection that escalates warnings to errors.
    pub fn with_warnings_as_errors(warnings_as_errors: bool) -> Self {
        Self {
            warnings_as_errors,
            ..Self::default()
        }
    }

    pub fn mute(&mut self) {
        self.muted += 1;
    }

    pub fn unmute(&mut self) {
        self.muted = self.muted.saturating_sub(1);
    }

    pub fn is_muted(&self) -> bool {
        self.muted > 0
    }

    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &SemanticError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| &d.error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &SemanticError> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| &d.error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Append all issues of another collection, keeping their severities.
    pub fn extend(&mut self, other: Diagnostics) {
        self.diagnostics.extend(other.diagnostics);
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.diagnostics
    }
}

impl IssueSink for Diagnostics {
    fn add_issue(&mut self, issue: SemanticError) {
        if self.is_muted() {
            return;
        }
        let severity = match issue.severity() {
            Severity::Warning if self.warnings_as_errors => Severity::Error,
            severity => severity,
        };
        self.diagnostics.push(Diagnostic {
            severity,
            error: issue,
        });
    }
}

impl IssueSink for Vec<SemanticError> {
    fn add_issue(&mut self, issue: SemanticError) {
        self.push(issue);
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for diagnostic in &self.diagnostics {
            writeln!(f, "{}", diagnostic)?;
        }
        Ok(())
    }
}
