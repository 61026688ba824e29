//! Pauli-string operators for drift and control Hamiltonians.
//!
//! A Hamiltonian is a real-weighted sum of Pauli strings,
//!
//!   H = Σ_k  c_k · P_k
//!
//! materialized as a dense matrix over `2^n` little-endian basis states
//! (qubit 0 is the least significant bit), the same convention the
//! state-vector executor uses.
//!
//! # Example
//!
//! ```rust
//! use qforge_grape::hamiltonian::{Hamiltonian, HamiltonianTerm};
//!
//! let drift = Hamiltonian::from_terms(vec![HamiltonianTerm::z(0, 1.0)]);
//! let m = drift.to_matrix(1);
//! assert_eq!(m[[0, 0]].re, 1.0);
//! assert_eq!(m[[1, 1]].re, -1.0);
//! ```

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::linalg::CMatrix;

/// Single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PauliOp {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

/// A tensor product of Pauli operators.
///
/// Stored sorted by qubit with identities dropped; unlisted qubits are I.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<(u32, PauliOp)>", into = "Vec<(u32, PauliOp)>")]
pub struct PauliString {
    ops: Vec<(u32, PauliOp)>,
}

impl PauliString {
    /// Build from `(qubit, op)` pairs.
    pub fn from_ops(ops: impl IntoIterator<Item = (u32, PauliOp)>) -> Self {
        let mut v: Vec<(u32, PauliOp)> = ops
            .into_iter()
            .filter(|(_, op)| *op != PauliOp::I)
            .collect();
        v.sort_by_key(|(q, _)| *q);
        Self { ops: v }
    }

    /// The non-identity `(qubit, op)` pairs.
    pub fn ops(&self) -> &[(u32, PauliOp)] {
        &self.ops
    }

    /// True for the all-identity string.
    pub fn is_identity(&self) -> bool {
        self.ops.is_empty()
    }

    /// Highest qubit referenced.
    pub fn max_qubit(&self) -> Option<u32> {
        self.ops.last().map(|(q, _)| *q)
    }

    /// Image of basis state `|col⟩`: `P|col⟩ = phase · |row⟩`.
    fn apply_to_basis(&self, col: usize) -> (usize, Complex64) {
        let mut row = col;
        let mut phase = Complex64::new(1.0, 0.0);
        for &(q, op) in &self.ops {
            let bit = (col >> q) & 1 == 1;
            match op {
                PauliOp::I => {}
                PauliOp::X => row ^= 1 << q,
                PauliOp::Y => {
                    row ^= 1 << q;
                    // Y|0⟩ = i|1⟩, Y|1⟩ = −i|0⟩
                    phase *= if bit {
                        Complex64::new(0.0, -1.0)
                    } else {
                        Complex64::new(0.0, 1.0)
                    };
                }
                PauliOp::Z => {
                    if bit {
                        phase = -phase;
                    }
                }
            }
        }
        (row, phase)
    }
}

impl From<Vec<(u32, PauliOp)>> for PauliString {
    fn from(ops: Vec<(u32, PauliOp)>) -> Self {
        Self::from_ops(ops)
    }
}

impl From<PauliString> for Vec<(u32, PauliOp)> {
    fn from(p: PauliString) -> Self {
        p.ops
    }
}

/// A single weighted Pauli term.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HamiltonianTerm {
    /// Real coefficient.
    pub coeff: f64,
    /// The Pauli string.
    pub pauli: PauliString,
}

impl HamiltonianTerm {
    /// Create a new term.
    pub fn new(coeff: f64, pauli: PauliString) -> Self {
        Self { coeff, pauli }
    }

    /// Single-qubit X term.
    pub fn x(qubit: u32, coeff: f64) -> Self {
        Self::new(coeff, PauliString::from_ops([(qubit, PauliOp::X)]))
    }

    /// Single-qubit Y term.
    pub fn y(qubit: u32, coeff: f64) -> Self {
        Self::new(coeff, PauliString::from_ops([(qubit, PauliOp::Y)]))
    }

    /// Single-qubit Z term.
    pub fn z(qubit: u32, coeff: f64) -> Self {
        Self::new(coeff, PauliString::from_ops([(qubit, PauliOp::Z)]))
    }

    /// ZZ coupling.
    pub fn zz(q0: u32, q1: u32, coeff: f64) -> Self {
        Self::new(
            coeff,
            PauliString::from_ops([(q0, PauliOp::Z), (q1, PauliOp::Z)]),
        )
    }
}

/// A sum-of-Pauli-strings Hamiltonian.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Hamiltonian {
    terms: Vec<HamiltonianTerm>,
}

impl Hamiltonian {
    /// Create from a list of terms.
    pub fn from_terms(terms: Vec<HamiltonianTerm>) -> Self {
        Self { terms }
    }

    /// All terms.
    pub fn terms(&self) -> &[HamiltonianTerm] {
        &self.terms
    }

    /// Number of terms.
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    /// Minimum register width that holds every term.
    pub fn min_qubits(&self) -> u32 {
        self.terms
            .iter()
            .filter_map(|t| t.pauli.max_qubit())
            .max()
            .map_or(0, |q| q + 1)
    }

    /// Dense `2^n × 2^n` matrix.
    pub fn to_matrix(&self, num_qubits: u32) -> CMatrix {
        let dim = 1usize << num_qubits;
        let mut m = Array2::zeros((dim, dim));
        for term in &self.terms {
            for col in 0..dim {
                let (row, phase) = term.pauli.apply_to_basis(col);
                m[[row, col]] += phase * term.coeff;
            }
        }
        m
    }
}

impl FromIterator<HamiltonianTerm> for Hamiltonian {
    fn from_iter<T: IntoIterator<Item = HamiltonianTerm>>(iter: T) -> Self {
        Self {
            terms: iter.into_iter().collect(),
        }
    }
}
