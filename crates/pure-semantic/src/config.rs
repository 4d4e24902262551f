//! Analysis configuration.

use crate::passes::Pass;

/// Options controlling an analysis run.
///
/// ```
/// use pure_semantic::{AnalysisConfig, Pass};
///
/// let config = AnalysisConfig::new()
///     .with_unreachable_warnings(false)
///     .with_passes(vec![Pass::Declare, Pass::DetermineTypes]);
/// assert!(!config.report_unreachable);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisConfig {
    /// Report statements following an interrupting statement.
    pub report_unreachable: bool,
    /// Escalate warnings to errors.
    pub warnings_as_errors: bool,
    /// Propagate literal values through operators.
    pub fold_constants: bool,
    /// Analyse the built-in prelude together with the program.
    pub include_prelude: bool,
    /// Passes to run, in order.
    pub passes: Vec<Pass>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            report_unreachable: true,
            warnings_as_errors: false,
            fold_constants: true,
            include_prelude: true,
            passes: Pass::STANDARD.to_vec(),
        }
    }
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_unreachable_warnings(mut self, enabled: bool) -> Self {
        self.report_unreachable = enabled;
        self
    }

    pub fn with_warnings_as_errors(mut self, enabled: bool) -> Self {
        self.warnings_as_errors = enabled;
        self
    }

    pub fn with_constant_folding(mut self, enabled: bool) -> Self {
        self.fold_constants = enabled;
        self
    }

    /// Without the prelude, literals have no type and numeric operators are
    /// not found.
    pub fn with_prelude(mut self, enabled: bool) -> Self {
        self.include_prelude = enabled;
        self
    }

    pub fn with_passes(mut self, passes: Vec<Pass>) -> Self {
        self.passes = passes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_runs_every_pass() {
        let config = AnalysisConfig::default();
        assert_eq!(config.passes, Pass::STANDARD.to_vec());
        assert!(config.report_unreachable);
        assert!(config.fold_constants);
        assert!(!config.warnings_as_errors);
    }

    #[test]
    fn builder_overrides_fields() {
        let config = AnalysisConfig::new()
            .with_warnings_as_errors(true)
            .with_constant_folding(false)
            .with_prelude(false);
        assert!(config.warnings_as_errors);
        assert!(!config.fold_constants);
        assert!(!config.include_prelude);
    }
}
