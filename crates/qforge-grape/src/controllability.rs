//! Advisory Lie-algebra controllability check.
//!
//! A closed system is fully controllable when the real Lie algebra generated
//! by `iH_d, iH_1, …, iH_m` contains `su(d)`. We grow the span of nested
//! commutators with Gram–Schmidt on the real-vectorized matrices until it
//! stops growing or reaches dimension `d² − 1`.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::linalg::{CMatrix, commutator, identity, trace};

/// Larger systems are not checked.
pub const MAX_CHECK_DIM: usize = 16;

const RANK_TOL: f64 = 1e-9;

/// Outcome of the check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Controllability {
    /// The generated algebra spans `su(d)`.
    Controllable,
    /// The algebra has dimension `rank < full`.
    Uncontrollable {
        /// Dimension reached.
        rank: usize,
        /// `d² − 1`.
        full: usize,
    },
    /// The system was too large to check.
    Skipped {
        /// Hilbert-space dimension.
        dim: usize,
    },
    /// Disabled in configuration.
    NotChecked,
}

impl Controllability {
    /// False only for a completed check that found missing directions.
    pub fn is_ok(&self) -> bool {
        !matches!(self, Controllability::Uncontrollable { .. })
    }
}

/// Orthonormal basis of real vectors, grown one candidate at a time.
struct Span {
    basis: Vec<Vec<f64>>,
}

impl Span {
    /// Add the component of `m` outside the span. Returns whether it grew.
    fn insert(&mut self, m: &CMatrix) -> bool {
        let mut v: Vec<f64> = m.iter().flat_map(|z| [z.re, z.im]).collect();
        let scale = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if scale < RANK_TOL {
            return false;
        }
        v.iter_mut().for_each(|x| *x /= scale);
        // Two passes keep the basis orthogonal to working precision.
        for _ in 0..2 {
            for b in &self.basis {
                let p: f64 = v.iter().zip(b).map(|(x, y)| x * y).sum();
                v.iter_mut().zip(b).for_each(|(x, y)| *x -= p * y);
            }
        }
        let n = v.iter().map(|x| x * x).sum::<f64>().sqrt();
        if n < RANK_TOL {
            return false;
        }
        v.iter_mut().for_each(|x| *x /= n);
        self.basis.push(v);
        true
    }
}

/// Strip the identity component and multiply by `i`.
fn traceless_generator(h: &CMatrix) -> CMatrix {
    let d = h.nrows();
    let shift = trace(h) / Complex64::new(d as f64, 0.0);
    (h - &(identity(d) * shift)) * Complex64::new(0.0, 1.0)
}

/// Check whether drift plus controls can reach every unitary in `SU(d)`.
pub fn check(drift: &CMatrix, controls: &[CMatrix]) -> Controllability {
    let d = drift.nrows();
    if d > MAX_CHECK_DIM {
        return Controllability::Skipped { dim: d };
    }
    let full = d * d - 1;
    let generators: Vec<CMatrix> = std::iter::once(drift)
        .chain(controls)
        .map(traceless_generator)
        .collect();

    let mut span = Span { basis: Vec::new() };
    let mut elements: Vec<CMatrix> = Vec::new();
    for g in &generators {
        if span.insert(g) {
            elements.push(g.clone());
        }
    }

    // Brackets with the generators alone reach every nested commutator.
    let mut next = 0;
    while next < elements.len() && span.basis.len() < full {
        let current = elements[next].clone();
        for g in &generators {
            let c = commutator(g, &current);
            if span.insert(&c) {
                elements.push(c);
                if span.basis.len() == full {
                    break;
                }
            }
        }
        next += 1;
    }

    let rank = span.basis.len();
    if rank == full {
        Controllability::Controllable
    } else {
        Controllability::Uncontrollable { rank, full }
    }
}
