//! Error types for the sim crate.

use thiserror::Error;

/// Errors produced while executing a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SimError {
    /// Initial state length does not match `2^num_qubits`.
    #[error("State has {got} amplitudes but the circuit needs {expected}")]
    DimensionMismatch {
        /// Required amplitude count.
        expected: usize,
        /// Supplied amplitude count.
        got: usize,
    },

    /// Circuit is too wide for a dense state vector.
    #[error("Circuit has {num_qubits} qubits, at most {max} can be simulated")]
    TooManyQubits {
        /// Qubits in the circuit.
        num_qubits: usize,
        /// Largest supported width.
        max: usize,
    },

    /// A gate parameter is still symbolic.
    #[error("Gate '{gate}' has unbound parameter '{expr}'")]
    UnboundParameter {
        /// Gate name.
        gate: String,
        /// The unresolved expression.
        expr: String,
    },

    /// Operation has no unitary matrix (measure, reset, guard).
    #[error("Instruction '{0}' is not unitary")]
    NotUnitary(String),

    /// A qubit operand lies outside the state.
    #[error("Qubit {qubit} out of range for a {num_qubits}-qubit state")]
    QubitOutOfRange {
        /// The offending qubit index.
        qubit: usize,
        /// Width of the state.
        num_qubits: usize,
    },
}

/// Result type for simulation operations.
pub type SimResult<T> = Result<T, SimError>;
