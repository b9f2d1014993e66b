use thiserror::Error;

use crate::record::RecordError;

/// Core error type shared across seedsmith crates.
#[derive(Debug, Error)]
pub enum Error {
    /// A record could not be tokenized or had the wrong shape.
    #[error("malformed record: {0}")]
    Record(#[from] RecordError),
    /// Seed sections depend on each other in a loop.
    #[error("dependency cycle between: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// Convenience alias for results returned by seedsmith crates.
pub type Result<T> = std::result::Result<T, Error>;
