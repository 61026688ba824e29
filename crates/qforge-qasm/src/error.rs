//! Error types for the QASM parser and exporter.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A 1-based line/column location in QASM source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: usize,
    /// Column number (in characters), starting at 1.
    pub column: usize,
}

impl Position {
    /// Create a position.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Errors that can occur during parsing.
///
/// Every variant carries the source position it was raised at. No variant
/// ever comes with a partial circuit: parsing either yields a complete
/// circuit or one of these.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Malformed token or statement.
    #[error("Syntax error at {at}: {message}")]
    Syntax { at: Position, message: String },

    /// The requested or declared language version is not supported.
    #[error("Unsupported OPENQASM version '{version}' at {at}")]
    UnsupportedVersion { version: String, at: Position },

    /// Gate name has neither a built-in nor a macro definition.
    #[error("Unknown gate '{name}' at {at}")]
    UnknownGate { name: String, at: Position },

    /// A macro refers to itself, directly or through other macros.
    #[error("Recursive definition of '{name}' at {at} (cycle: {})", .cycle.join(" -> "))]
    Recursion {
        name: String,
        cycle: Vec<String>,
        at: Position,
    },

    /// Macro expansion nested deeper than the configured bound.
    #[error("Macro expansion of '{name}' exceeds depth {limit} at {at}")]
    MacroDepthExceeded {
        name: String,
        limit: usize,
        at: Position,
    },

    /// Register was never declared.
    #[error("Undefined register '{name}' at {at}")]
    UndefinedRegister { name: String, at: Position },

    /// Index out of bounds.
    #[error("Index {index} out of bounds for register '{register}' of size {size} at {at}")]
    IndexOutOfBounds {
        register: String,
        index: u64,
        size: u32,
        at: Position,
    },

    /// Wrong number of qubit operands.
    #[error("Gate '{gate}' expects {expected} qubits, got {got} at {at}")]
    WrongQubitCount {
        gate: String,
        expected: usize,
        got: usize,
        at: Position,
    },

    /// Wrong number of parameters.
    #[error("Gate '{gate}' expects {expected} parameters, got {got} at {at}")]
    WrongParameterCount {
        gate: String,
        expected: usize,
        got: usize,
        at: Position,
    },

    /// Name declared twice.
    #[error("Duplicate declaration of '{name}' at {at}")]
    DuplicateDeclaration { name: String, at: Position },

    /// Include file is neither a known header nor supplied by the caller.
    #[error("Cannot resolve include \"{name}\" at {at}")]
    UnknownInclude { name: String, at: Position },

    /// Parameter expression does not evaluate to a finite number.
    #[error("Invalid parameter at {at}: {message}")]
    InvalidParameter { message: String, at: Position },

    /// The circuit model rejected an operation.
    #[error("Circuit error at {at}: {source}")]
    Circuit {
        #[source]
        source: qforge_ir::IrError,
        at: Position,
    },
}

impl ParseError {
    /// Source position the error was raised at.
    pub fn position(&self) -> Position {
        match self {
            ParseError::Syntax { at, .. }
            | ParseError::UnsupportedVersion { at, .. }
            | ParseError::UnknownGate { at, .. }
            | ParseError::Recursion { at, .. }
            | ParseError::MacroDepthExceeded { at, .. }
            | ParseError::UndefinedRegister { at, .. }
            | ParseError::IndexOutOfBounds { at, .. }
            | ParseError::WrongQubitCount { at, .. }
            | ParseError::WrongParameterCount { at, .. }
            | ParseError::DuplicateDeclaration { at, .. }
            | ParseError::UnknownInclude { at, .. }
            | ParseError::InvalidParameter { at, .. }
            | ParseError::Circuit { at, .. } => *at,
        }
    }
}

/// Result type for parsing operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Errors that can occur while exporting a circuit to QASM text.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExportError {
    /// Gate has no QASM 2 representation and cannot be decomposed.
    #[error("Gate '{name}' cannot be exported: {reason}")]
    UnsupportedGate { name: String, reason: String },

    /// A parameter is still symbolic.
    #[error("Gate '{gate}' has an unbound parameter '{expr}'")]
    UnboundParameter { gate: String, expr: String },

    /// A classical guard does not name a register the output declares.
    #[error("Condition on '{register}' cannot be exported: {reason}")]
    UnsupportedCondition { register: String, reason: String },
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
