//! Error types for the HAC environments.

use thiserror::Error;

/// A specialized `Result` type for environment operations.
pub type Result<T> = std::result::Result<T, Error>;

/// The errors that can occur while configuring, resetting or stepping an environment.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The environment configuration is malformed (inverted bounds, missing goal space, ...).
    #[error("Configuration error: {0}")]
    Config(String),

    /// A vector did not have the length the environment expects.
    #[error("Dimension mismatch for {what}: expected {expected}, found {found}")]
    DimensionMismatch {
        /// What was being checked (e.g. "action", "initial state space").
        what: String,
        /// The expected length.
        expected: usize,
        /// The length that was supplied.
        found: usize,
    },

    /// A rejection-sampling loop gave up before drawing an acceptable sample.
    ///
    /// This signals that the configured ranges cannot (or practically never do)
    /// satisfy the task's placement constraint.
    #[error("Infeasible configuration: no {what} accepted after {attempts} attempts")]
    InfeasibleConfiguration {
        /// The constraint that could not be satisfied.
        what: String,
        /// The number of draws that were rejected.
        attempts: usize,
    },

    /// The task places its initial state relative to the goal, but no goal was given.
    #[error("Task '{0}' requires a goal to reset the simulation")]
    GoalRequired(String),

    /// The requested behavior has no implementation for this task.
    #[error("{operation} is not implemented for task '{task}'")]
    NotImplemented {
        /// The task (model) name.
        task: String,
        /// The operation that was requested.
        operation: String,
    },

    /// No environment is registered under the given id.
    #[error("Unknown environment: {0}")]
    UnknownEnvironment(String),

    /// The stepping oracle rejected an operation.
    #[error("Simulation error: {0}")]
    Simulation(String),
}

impl Error {
    /// Shorthand for a [`Error::DimensionMismatch`].
    pub fn dimension(what: impl Into<String>, expected: usize, found: usize) -> Self {
        Error::DimensionMismatch {
            what: what.into(),
            expected,
            found,
        }
    }
}
