//! Errors of the facade entry points.

use pure_core::{InternalError, SemanticError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// An earlier pass left a broken invariant behind.
    #[error(transparent)]
    Internal(#[from] InternalError),

    /// The program has semantic errors.
    #[error("analysis found {count} error(s), first: {first}")]
    Rejected { count: usize, first: SemanticError },

    /// The emission backend failed.
    #[error("emission failed: {0}")]
    Backend(String),
}
