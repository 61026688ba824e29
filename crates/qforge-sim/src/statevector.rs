//! Dense state-vector representation.
//!
//! Basis indices are little-endian: qubit 0 is the least significant bit.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};
use crate::matrix::GateMatrix;

/// Largest state the executor will allocate.
pub const MAX_QUBITS: usize = 26;

/// A pure state over `num_qubits` qubits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statevector {
    num_qubits: usize,
    amplitudes: Vec<Complex64>,
}

impl Statevector {
    /// The all-zero basis state |0…0⟩.
    pub fn zero(num_qubits: usize) -> SimResult<Self> {
        Self::basis(num_qubits, 0)
    }

    /// Computational basis state `|index⟩`.
    pub fn basis(num_qubits: usize, index: usize) -> SimResult<Self> {
        check_width(num_qubits)?;
        let dim = 1usize << num_qubits;
        if index >= dim {
            return Err(SimError::DimensionMismatch {
                expected: dim,
                got: index + 1,
            });
        }
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); dim];
        amplitudes[index] = Complex64::new(1.0, 0.0);
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// Wrap explicit amplitudes; the length must be `2^num_qubits`.
    ///
    /// Amplitudes are taken as given, without renormalization.
    pub fn from_amplitudes(num_qubits: usize, amplitudes: Vec<Complex64>) -> SimResult<Self> {
        check_width(num_qubits)?;
        let expected = 1usize << num_qubits;
        if amplitudes.len() != expected {
            return Err(SimError::DimensionMismatch {
                expected,
                got: amplitudes.len(),
            });
        }
        Ok(Self {
            num_qubits,
            amplitudes,
        })
    }

    /// Number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// `2^num_qubits`.
    pub fn dimension(&self) -> usize {
        self.amplitudes.len()
    }

    /// Amplitudes in basis order.
    pub fn amplitudes(&self) -> &[Complex64] {
        &self.amplitudes
    }

    /// Consume into the amplitude vector.
    pub fn into_amplitudes(self) -> Vec<Complex64> {
        self.amplitudes
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.amplitudes.iter().map(Complex64::norm_sqr).sum::<f64>().sqrt()
    }

    /// Outcome probabilities `|a_i|²` for every basis state.
    pub fn probabilities(&self) -> Vec<f64> {
        self.amplitudes.iter().map(Complex64::norm_sqr).collect()
    }

    /// Probability that `qubit` reads 1.
    pub fn marginal_probability(&self, qubit: usize) -> f64 {
        let mask = 1usize << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }

    /// Squared norms `(w0, w1)` of the subspaces where `qubit` is 0 and 1.
    ///
    /// Their sum is the squared norm of the whole state, so the pair also
    /// serves unnormalized states.
    pub fn branch_weights(&self, qubit: usize) -> (f64, f64) {
        let mask = 1usize << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .fold((0.0, 0.0), |(w0, w1), (i, a)| {
                if i & mask == 0 {
                    (w0 + a.norm_sqr(), w1)
                } else {
                    (w0, w1 + a.norm_sqr())
                }
            })
    }

    /// Inner product ⟨self|other⟩.
    pub fn inner(&self, other: &Self) -> Complex64 {
        self.amplitudes
            .iter()
            .zip(&other.amplitudes)
            .map(|(a, b)| a.conj() * b)
            .sum()
    }

    /// Apply a `k`-qubit matrix to `qubits` (operand 0 is the matrix's most
    /// significant local bit).
    pub fn apply(&mut self, matrix: &GateMatrix, qubits: &[usize]) -> SimResult<()> {
        for &q in qubits {
            if q >= self.num_qubits {
                return Err(SimError::QubitOutOfRange {
                    qubit: q,
                    num_qubits: self.num_qubits,
                });
            }
        }
        let k = qubits.len();
        debug_assert_eq!(k, matrix.num_qubits());
        let local_dim = 1usize << k;

        // Flat offset contributed by each local basis index.
        let offsets: Vec<usize> = (0..local_dim)
            .map(|l| {
                qubits
                    .iter()
                    .enumerate()
                    .filter(|(j, _)| (l >> (k - 1 - j)) & 1 == 1)
                    .map(|(_, &q)| 1usize << q)
                    .sum()
            })
            .collect();
        let mask: usize = qubits.iter().map(|&q| 1usize << q).sum();

        let mut gathered = vec![Complex64::new(0.0, 0.0); local_dim];
        for base in 0..self.amplitudes.len() {
            if base & mask != 0 {
                continue;
            }
            for (l, off) in offsets.iter().enumerate() {
                gathered[l] = self.amplitudes[base | off];
            }
            for (r, off) in offsets.iter().enumerate() {
                let row = &matrix.as_slice()[r * local_dim..(r + 1) * local_dim];
                self.amplitudes[base | off] =
                    row.iter().zip(&gathered).map(|(m, a)| m * a).sum();
            }
        }
        Ok(())
    }

    /// Project `qubit` onto `outcome` and renormalize.
    ///
    /// `probability` is the squared norm of the `outcome` branch.
    pub(crate) fn collapse(&mut self, qubit: usize, outcome: bool, probability: f64) {
        let mask = 1usize << qubit;
        let scale = if probability > 0.0 {
            1.0 / probability.sqrt()
        } else {
            0.0
        };
        for (i, a) in self.amplitudes.iter_mut().enumerate() {
            if (i & mask != 0) == outcome {
                *a *= scale;
            } else {
                *a = Complex64::new(0.0, 0.0);
            }
        }
    }

    /// Flip `qubit` (Pauli X).
    pub(crate) fn flip(&mut self, qubit: usize) {
        let mask = 1usize << qubit;
        for i in 0..self.amplitudes.len() {
            if i & mask == 0 {
                self.amplitudes.swap(i, i | mask);
            }
        }
    }
}

pub(crate) fn check_width(num_qubits: usize) -> SimResult<()> {
    if num_qubits > MAX_QUBITS {
        return Err(SimError::TooManyQubits {
            num_qubits,
            max: MAX_QUBITS,
        });
    }
    Ok(())
}
