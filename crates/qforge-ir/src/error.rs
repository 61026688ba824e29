//! Error types for the circuit model.

use crate::qubit::{ClbitId, QubitId};
use thiserror::Error;

/// Errors that can occur while building or inspecting a circuit.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IrError {
    /// Qubit index is not below the circuit's qubit count.
    #[error("Qubit {qubit} not found in circuit{}", format_gate_context(.gate_name))]
    QubitNotFound {
        /// The qubit that was not found.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Classical bit index is not below the circuit's clbit count.
    #[error("Classical bit {clbit} not found in circuit{}", format_gate_context(.gate_name))]
    ClbitNotFound {
        /// The classical bit that was not found.
        clbit: ClbitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// Gate requires a different number of qubits.
    #[error("Gate '{gate_name}' requires {expected} qubits, got {got}")]
    QubitCountMismatch {
        /// Name of the gate.
        gate_name: String,
        /// Expected number of qubits.
        expected: u32,
        /// Actual number of qubits provided.
        got: u32,
    },

    /// Measurement operand lists differ in length.
    #[error("Measurement over {qubits} qubits cannot write {clbits} classical bits")]
    MeasureArityMismatch {
        /// Number of measured qubits.
        qubits: usize,
        /// Number of destination bits.
        clbits: usize,
    },

    /// Parameter is unbound.
    #[error("Parameter '{0}' is unbound")]
    UnboundParameter(String),

    /// Duplicate qubit in operation.
    #[error("Duplicate qubit {qubit} in operation{}", format_gate_context(.gate_name))]
    DuplicateQubit {
        /// The duplicate qubit.
        qubit: QubitId,
        /// Optional gate name for context.
        gate_name: Option<String>,
    },

    /// A register with this name already exists.
    #[error("Register '{0}' is already declared")]
    DuplicateRegister(String),

    /// A classical condition names a register the circuit does not have.
    #[error("Classical register '{0}' is not declared")]
    UnknownRegister(String),

    /// A composite gate body is not well formed.
    #[error("Invalid body for composite gate '{name}': {reason}")]
    InvalidComposite {
        /// Name of the composite gate.
        name: String,
        /// What is wrong with the body.
        reason: String,
    },

    /// A controlled gate wraps something other than a single-qubit gate.
    #[error("Controlled gate base '{0}' must act on exactly one qubit")]
    InvalidControlledBase(String),

    /// An explicit unitary has the wrong number of entries.
    #[error("Unitary '{name}' needs {expected} matrix entries, got {got}")]
    MatrixDimension {
        /// Name of the unitary gate.
        name: String,
        /// Expected entry count (4^n).
        expected: usize,
        /// Actual entry count.
        got: usize,
    },
}

/// Helper function to format optional gate context.
#[allow(clippy::ref_option)]
fn format_gate_context(gate_name: &Option<String>) -> String {
    match gate_name {
        Some(name) => format!(" (gate: {name})"),
        None => String::new(),
    }
}

/// Result type for circuit model operations.
pub type IrResult<T> = Result<T, IrError>;
