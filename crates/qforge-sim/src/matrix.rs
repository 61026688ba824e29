//! Gate matrices.
//!
//! Every matrix is row-major over the gate's local basis, with operand 0 as
//! the most significant bit of the local index. Controlled gates list their
//! controls first, so the active block always sits in the bottom-right
//! corner.

use std::f64::consts::FRAC_1_SQRT_2;

use num_complex::Complex64;
use qforge_ir::{ControlledGate, GateKind, ParameterExpression, StandardGate};

use crate::error::{SimError, SimResult};

/// A dense `2^k × 2^k` gate matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct GateMatrix {
    num_qubits: usize,
    data: Vec<Complex64>,
}

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);
const I: Complex64 = Complex64::new(0.0, 1.0);

fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

fn phase(angle: f64) -> Complex64 {
    Complex64::from_polar(1.0, angle)
}

impl GateMatrix {
    /// Wrap a row-major matrix; `data.len()` must be `4^num_qubits`.
    pub fn new(num_qubits: usize, data: Vec<Complex64>) -> Self {
        debug_assert_eq!(data.len(), 1 << (2 * num_qubits));
        Self { num_qubits, data }
    }

    /// `2^k` identity.
    pub fn identity(num_qubits: usize) -> Self {
        let dim = 1 << num_qubits;
        let mut data = vec![ZERO; dim * dim];
        for i in 0..dim {
            data[i * dim + i] = ONE;
        }
        Self { num_qubits, data }
    }

    /// Number of qubits the matrix acts on.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    /// Side length of the matrix.
    pub fn dim(&self) -> usize {
        1 << self.num_qubits
    }

    /// Entry at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> Complex64 {
        self.data[row * self.dim() + col]
    }

    /// Row-major entries.
    pub fn as_slice(&self) -> &[Complex64] {
        &self.data
    }

    /// Prepend `num_controls` control qubits.
    pub fn controlled(&self, num_controls: usize) -> Self {
        let mut out = Self::identity(self.num_qubits + num_controls);
        let dim = out.dim();
        let block = self.dim();
        let offset = dim - block;
        for r in 0..block {
            for col in 0..block {
                out.data[(offset + r) * dim + offset + col] = self.get(r, col);
            }
        }
        out
    }

    fn single(m: [Complex64; 4]) -> Self {
        Self::new(1, m.to_vec())
    }
}

fn angle(gate: &StandardGate, p: &ParameterExpression) -> SimResult<f64> {
    p.as_f64().ok_or_else(|| SimError::UnboundParameter {
        gate: gate.name().to_string(),
        expr: p.to_string(),
    })
}

fn rx(theta: f64) -> GateMatrix {
    let (s, co) = (theta / 2.0).sin_cos();
    GateMatrix::single([c(co, 0.0), c(0.0, -s), c(0.0, -s), c(co, 0.0)])
}

fn ry(theta: f64) -> GateMatrix {
    let (s, co) = (theta / 2.0).sin_cos();
    GateMatrix::single([c(co, 0.0), c(-s, 0.0), c(s, 0.0), c(co, 0.0)])
}

fn rz(theta: f64) -> GateMatrix {
    GateMatrix::single([phase(-theta / 2.0), ZERO, ZERO, phase(theta / 2.0)])
}

fn p(lambda: f64) -> GateMatrix {
    GateMatrix::single([ONE, ZERO, ZERO, phase(lambda)])
}

fn u(theta: f64, phi: f64, lambda: f64) -> GateMatrix {
    let (s, co) = (theta / 2.0).sin_cos();
    GateMatrix::single([
        c(co, 0.0),
        -phase(lambda) * s,
        phase(phi) * s,
        phase(phi + lambda) * co,
    ])
}

/// Matrix of a standard gate.
pub fn standard_matrix(gate: &StandardGate) -> SimResult<GateMatrix> {
    let a = |p: &ParameterExpression| angle(gate, p);
    let h = FRAC_1_SQRT_2;
    let m = match gate {
        StandardGate::I => GateMatrix::identity(1),
        StandardGate::X => GateMatrix::single([ZERO, ONE, ONE, ZERO]),
        StandardGate::Y => GateMatrix::single([ZERO, -I, I, ZERO]),
        StandardGate::Z => GateMatrix::single([ONE, ZERO, ZERO, -ONE]),
        StandardGate::H => GateMatrix::single([c(h, 0.0), c(h, 0.0), c(h, 0.0), c(-h, 0.0)]),
        StandardGate::S => GateMatrix::single([ONE, ZERO, ZERO, I]),
        StandardGate::Sdg => GateMatrix::single([ONE, ZERO, ZERO, -I]),
        StandardGate::T => p(std::f64::consts::FRAC_PI_4),
        StandardGate::Tdg => p(-std::f64::consts::FRAC_PI_4),
        StandardGate::SX => {
            GateMatrix::single([c(0.5, 0.5), c(0.5, -0.5), c(0.5, -0.5), c(0.5, 0.5)])
        }
        StandardGate::SXdg => {
            GateMatrix::single([c(0.5, -0.5), c(0.5, 0.5), c(0.5, 0.5), c(0.5, -0.5)])
        }
        StandardGate::Rx(t) => rx(a(t)?),
        StandardGate::Ry(t) => ry(a(t)?),
        StandardGate::Rz(t) => rz(a(t)?),
        StandardGate::P(l) => p(a(l)?),
        StandardGate::U(t, ph, l) => u(a(t)?, a(ph)?, a(l)?),

        StandardGate::CX => standard_matrix(&StandardGate::X)?.controlled(1),
        StandardGate::CY => standard_matrix(&StandardGate::Y)?.controlled(1),
        StandardGate::CZ => standard_matrix(&StandardGate::Z)?.controlled(1),
        StandardGate::CH => standard_matrix(&StandardGate::H)?.controlled(1),
        StandardGate::CRx(t) => rx(a(t)?).controlled(1),
        StandardGate::CRy(t) => ry(a(t)?).controlled(1),
        StandardGate::CRz(t) => rz(a(t)?).controlled(1),
        StandardGate::CP(l) => p(a(l)?).controlled(1),
        StandardGate::Swap => GateMatrix::new(
            2,
            vec![
                ONE, ZERO, ZERO, ZERO, //
                ZERO, ZERO, ONE, ZERO, //
                ZERO, ONE, ZERO, ZERO, //
                ZERO, ZERO, ZERO, ONE,
            ],
        ),
        StandardGate::ISwap => GateMatrix::new(
            2,
            vec![
                ONE, ZERO, ZERO, ZERO, //
                ZERO, ZERO, I, ZERO, //
                ZERO, I, ZERO, ZERO, //
                ZERO, ZERO, ZERO, ONE,
            ],
        ),
        StandardGate::RXX(t) => {
            let (s, co) = (a(t)? / 2.0).sin_cos();
            let (d, o) = (c(co, 0.0), c(0.0, -s));
            GateMatrix::new(
                2,
                vec![
                    d, ZERO, ZERO, o, //
                    ZERO, d, o, ZERO, //
                    ZERO, o, d, ZERO, //
                    o, ZERO, ZERO, d,
                ],
            )
        }
        StandardGate::RZZ(t) => {
            let t = a(t)?;
            let (even, odd) = (phase(-t / 2.0), phase(t / 2.0));
            let mut m = GateMatrix::identity(2);
            for (i, v) in [even, odd, odd, even].into_iter().enumerate() {
                m.data[i * 4 + i] = v;
            }
            m
        }
        StandardGate::CCX => standard_matrix(&StandardGate::X)?.controlled(2),
        StandardGate::CSwap => standard_matrix(&StandardGate::Swap)?.controlled(1),
    };
    Ok(m)
}

/// Matrix of a gate kind that has one directly.
///
/// Returns `None` for composites, which execute their body instead.
pub fn gate_matrix(kind: &GateKind) -> SimResult<Option<GateMatrix>> {
    Ok(match kind {
        GateKind::Standard(g) => Some(standard_matrix(g)?),
        GateKind::Controlled(ControlledGate { base, num_controls }) => {
            Some(standard_matrix(base)?.controlled(*num_controls as usize))
        }
        GateKind::Unitary(g) => Some(GateMatrix::new(
            g.num_qubits as usize,
            g.matrix().to_vec(),
        )),
        GateKind::Composite(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_unitary(m: &GateMatrix) -> bool {
        let d = m.dim();
        (0..d).all(|i| {
            (0..d).all(|j| {
                let dot: Complex64 = (0..d).map(|k| m.get(k, i).conj() * m.get(k, j)).sum();
                let expected = if i == j { 1.0 } else { 0.0 };
                (dot - Complex64::new(expected, 0.0)).norm() < 1e-12
            })
        })
    }

    #[test]
    fn test_all_standard_gates_unitary() {
        let t = ParameterExpression::constant(0.7);
        for gate in [
            StandardGate::I,
            StandardGate::X,
            StandardGate::Y,
            StandardGate::Z,
            StandardGate::H,
            StandardGate::S,
            StandardGate::Sdg,
            StandardGate::T,
            StandardGate::Tdg,
            StandardGate::SX,
            StandardGate::SXdg,
            StandardGate::Rx(t.clone()),
            StandardGate::Ry(t.clone()),
            StandardGate::Rz(t.clone()),
            StandardGate::P(t.clone()),
            StandardGate::U(t.clone(), t.clone(), t.clone()),
            StandardGate::CX,
            StandardGate::CY,
            StandardGate::CZ,
            StandardGate::CH,
            StandardGate::Swap,
            StandardGate::ISwap,
            StandardGate::CRx(t.clone()),
            StandardGate::CRy(t.clone()),
            StandardGate::CRz(t.clone()),
            StandardGate::CP(t.clone()),
            StandardGate::RXX(t.clone()),
            StandardGate::RZZ(t),
            StandardGate::CCX,
            StandardGate::CSwap,
        ] {
            let m = standard_matrix(&gate).unwrap();
            assert_eq!(m.num_qubits(), gate.num_qubits() as usize, "{}", gate.name());
            assert!(is_unitary(&m), "{} is not unitary", gate.name());
        }
    }

    #[test]
    fn test_sx_squares_to_x() {
        let sx = standard_matrix(&StandardGate::SX).unwrap();
        let x = standard_matrix(&StandardGate::X).unwrap();
        for i in 0..2 {
            for j in 0..2 {
                let v: Complex64 = (0..2).map(|k| sx.get(i, k) * sx.get(k, j)).sum();
                assert!((v - x.get(i, j)).norm() < 1e-12);
            }
        }
    }

    #[test]
    fn test_u_matches_rotations() {
        use std::f64::consts::PI;
        let h = standard_matrix(&StandardGate::H).unwrap();
        let u = u(PI / 2.0, 0.0, PI);
        for i in 0..2 {
            for j in 0..2 {
                assert!((h.get(i, j) - u.get(i, j)).norm() < 1e-12);
            }
        }
    }

    #[test]
    fn test_controlled_block_placement() {
        let cx = standard_matrix(&StandardGate::CX).unwrap();
        assert_eq!(cx.get(0, 0), ONE);
        assert_eq!(cx.get(2, 3), ONE);
        assert_eq!(cx.get(3, 2), ONE);
        assert_eq!(cx.get(2, 2), ZERO);
    }

    #[test]
    fn test_unbound_parameter() {
        let err = standard_matrix(&StandardGate::Rz(ParameterExpression::symbol("t"))).unwrap_err();
        assert!(matches!(err, SimError::UnboundParameter { .. }));
    }
}
