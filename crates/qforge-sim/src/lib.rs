//! `qforge-sim` — dense state-vector execution of qforge circuits.
//!
//! Runs a [`qforge_ir::Circuit`] gate by gate on a [`Statevector`],
//! evaluating classical guards against the measurement record and choosing
//! measurement outcomes per [`MeasurementMode`].
//!
//! Basis states are little-endian: qubit 0 is the least significant bit of
//! the amplitude index.
//!
//! # Quick start
//!
//! ```rust
//! use qforge_ir::Circuit;
//! use qforge_sim::{Executor, MeasurementMode};
//!
//! let circuit = Circuit::bell().unwrap();
//! let mut executor = Executor::new(MeasurementMode::Sample { seed: Some(42) });
//! let counts = executor.run_shots(&circuit, 100).unwrap();
//! assert_eq!(counts.values().sum::<usize>(), 100);
//! assert!(counts.keys().all(|k| k == "00" || k == "11"));
//! ```

pub mod error;
pub mod executor;
pub mod matrix;
pub mod statevector;
pub mod unitary;

pub use error::{SimError, SimResult};
pub use executor::{Execution, Executor, MeasurementMode};
pub use matrix::{GateMatrix, gate_matrix, standard_matrix};
pub use statevector::{MAX_QUBITS, Statevector};
pub use unitary::{MAX_UNITARY_QUBITS, circuit_unitary, equivalent_up_to_phase};
