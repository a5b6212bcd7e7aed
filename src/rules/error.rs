//! rule construction errors

use thiserror::Error;

/// a rule (or part of one) was assembled from the wrong set of pieces
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("rule requires a host")]
    MissingHost,

    #[error("rule takes exactly one host, got {0}")]
    DuplicateHost(usize),

    #[error("rule requires a condition block")]
    MissingWhen,

    #[error("rule takes exactly one condition block, got {0}")]
    DuplicateWhen(usize),

    #[error("rule takes at most one hold off, got {0}")]
    DuplicateHoldOff(usize),

    #[error("'not' takes exactly one condition, got {0}")]
    NotArity(usize),
}
