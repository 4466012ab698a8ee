//! Error type shared by every fallible manager operation.

use std::fmt::{Display, Formatter};

/// Failure reported by a manager operation.
///
/// The manager also records the last failure, see
/// [`Manager::read_error_code`][crate::manager::Manager::read_error_code].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdError {
    /// Node storage reached the configured memory ceiling.
    OutOfMemory,
    /// The number of live nodes exceeded the configured limit.
    TooManyNodes,
    /// An argument was rejected before any work was done.
    InvalidArgument(String),
    /// The reordering time limit expired.
    Timeout,
    /// A consistency check failed.
    Internal(String),
}

impl Display for DdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DdError::OutOfMemory => write!(f, "out of memory"),
            DdError::TooManyNodes => write!(f, "too many live nodes"),
            DdError::InvalidArgument(msg) => write!(f, "invalid argument: {}", msg),
            DdError::Timeout => write!(f, "time limit expired"),
            DdError::Internal(msg) => write!(f, "internal error: {}", msg),
        }
    }
}

impl std::error::Error for DdError {}

pub type Result<T> = std::result::Result<T, DdError>;

/// Why a recursive step stopped early.
///
/// `Reordered` means dynamic reordering ran while building a node: every
/// intermediate result is stale and the top-level call must start over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Abort {
    Reordered,
    Error(DdError),
}

impl From<DdError> for Abort {
    fn from(e: DdError) -> Self {
        Abort::Error(e)
    }
}

pub(crate) type Step<T> = std::result::Result<T, Abort>;
