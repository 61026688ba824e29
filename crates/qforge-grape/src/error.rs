//! Error types for the grape crate.

use thiserror::Error;

use crate::config::ConfigError;

/// Errors produced while setting up or running a pulse optimization.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GrapeError {
    /// Operator shapes do not agree.
    #[error("{what} has shape {got:?}, expected {expected:?}")]
    ShapeMismatch {
        /// Which operand is wrong.
        what: String,
        /// Required `(rows, cols)`.
        expected: (usize, usize),
        /// Supplied `(rows, cols)`.
        got: (usize, usize),
    },

    /// A drift or control operator is not Hermitian.
    #[error("{0} is not Hermitian")]
    NotHermitian(String),

    /// The problem definition is inconsistent.
    #[error("Invalid problem: {0}")]
    InvalidProblem(String),

    /// Pulse schedule dimensions disagree with the problem.
    #[error("Schedule is {got_slots}x{got_controls}, problem needs {slots}x{controls}")]
    ScheduleMismatch {
        /// Required time slots.
        slots: usize,
        /// Required control count.
        controls: usize,
        /// Supplied time slots.
        got_slots: usize,
        /// Supplied control count.
        got_controls: usize,
    },

    /// Named target gate is not in the built-in table.
    #[error("Unknown target gate '{0}'")]
    UnknownGate(String),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Hermitian eigendecomposition failed.
    #[error("Eigendecomposition failed: {0}")]
    Eigen(String),

    /// Worker pool could not be created.
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Writing amplitude dumps failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for pulse optimization.
pub type GrapeResult<T> = Result<T, GrapeError>;
