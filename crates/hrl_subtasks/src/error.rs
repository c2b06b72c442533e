//! Error types for subtask specification and hierarchy assembly.

use thiserror::Error;

/// A specialized `Result` type for hierarchy construction.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors that can occur while producing subtask specs or assembling a graph.
#[derive(Error, Debug)]
pub enum Error {
    /// The graph or level parameters are malformed or contradictory.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A vector did not have the length a spec expects.
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// What was being checked.
        what: String,
        /// The expected length.
        expected: usize,
        /// The length that was supplied.
        found: usize,
    },

    /// The factorization groups do not partition the goal dimensions.
    #[error("Invalid factorization: {0}")]
    InvalidFactorization(String),

    /// No factory is registered under the given name.
    #[error("Unknown subtask spec factory: {0}")]
    UnknownFactory(String),

    /// The factory cannot build specs for the requested topology.
    #[error("Factory '{factory}' does not support the {topology} topology")]
    UnsupportedTopology {
        /// The factory name.
        factory: String,
        /// The requested topology.
        topology: String,
    },

    /// The observation did not have the shape the spec expects.
    #[error("Observation error: {0}")]
    Observation(String),

    /// An error from the underlying environment.
    #[error(transparent)]
    Env(#[from] hac_envs::Error),

    /// A parameter file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A parameter file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::DimensionMismatch`].
    pub fn dimension(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Error::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::UnsupportedTopology {
            factory: "PlatformsTimeSubtaskSpecFactory".into(),
            topology: "HiTS".into(),
        };
        assert!(err.to_string().contains("HiTS"));
        assert!(err.to_string().contains("PlatformsTime"));
    }

    #[test]
    fn test_env_error_is_transparent() {
        let err: Error = hac_envs::Error::Config("bad bounds".into()).into();
        assert_eq!(err.to_string(), "Configuration error: bad bounds");
    }
}
