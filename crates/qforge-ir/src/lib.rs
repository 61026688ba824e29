//! qforge circuit model
//!
//! This crate provides the in-memory gate-sequence model shared by the QASM
//! front end, the exporter and the state-vector executor.
//!
//! # Overview
//!
//! A [`Circuit`] is an ordered list of [`Instruction`]s over a flat index
//! space of qubits and classical bits. Named registers are projected onto
//! that flat space when they are declared; the projection is lossy by design
//! of the model but the register names survive in the [`RegisterLayout`]
//! side-channel returned by [`Circuit::layout`].
//!
//! # Core Components
//!
//! - **Qubits and Classical Bits**: [`QubitId`], [`ClbitId`] index the flat space
//! - **Gates**: a closed [`GateKind`] enumeration: [`StandardGate`] built-ins,
//!   [`CompositeGate`] macros with an expanded body, [`ControlledGate`] and
//!   [`UnitaryGate`]
//! - **Parameters**: [`ParameterExpression`] angles, folded to constants by the parser
//! - **Instructions**: [`Instruction`] combining gates, measurements, resets
//!   and barriers with their operands
//! - **Circuit**: [`Circuit`] builder with append-time validation
//!
//! # Example: Building a Bell State
//!
//! ```rust
//! use qforge_ir::{Circuit, QubitId};
//!
//! let mut circuit = Circuit::with_size("bell_state", 2, 2);
//! circuit.h(QubitId(0)).unwrap();
//! circuit.cx(QubitId(0), QubitId(1)).unwrap();
//! circuit.measure_all().unwrap();
//!
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.depth(), 3);
//! ```
//!
//! # Example: Classically Guarded Gate
//!
//! ```rust
//! use qforge_ir::{Circuit, ClbitId, QubitId, StandardGate};
//!
//! let mut circuit = Circuit::new("guarded");
//! let q = circuit.add_qreg("q", 1).unwrap();
//! let c = circuit.add_creg("c", 1).unwrap();
//! circuit.measure(q[0], c[0]).unwrap();
//! let cond = circuit.condition("c", 1).unwrap();
//! circuit.gate_if(StandardGate::X, [q[0]], cond).unwrap();
//! assert_eq!(circuit.len(), 2);
//! ```

pub mod circuit;
pub mod error;
pub mod gate;
pub mod instruction;
pub mod layout;
pub mod parameter;
pub mod qubit;

pub use circuit::Circuit;
pub use error::{IrError, IrResult};
pub use gate::{
    ClassicalCondition, CompositeGate, ControlledGate, Gate, GateKind, StandardGate, UnitaryGate,
};
pub use instruction::{Instruction, InstructionKind};
pub use layout::{Register, RegisterLayout};
pub use parameter::{MathFn, ParameterExpression};
pub use qubit::{ClbitId, QubitId};
