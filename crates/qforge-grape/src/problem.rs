//! The physical model being controlled.

use std::f64::consts::FRAC_1_SQRT_2;

use ndarray::Array2;
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{GrapeError, GrapeResult};
use crate::linalg::{CMatrix, frobenius_sqr, identity, is_hermitian};

const HERMITIAN_TOL: f64 = 1e-10;

/// Slot durations of the piecewise-constant schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeGrid {
    /// `num_slots` equal slots spanning `evo_time`.
    Uniform {
        /// Number of slots.
        num_slots: usize,
        /// Total evolution time.
        evo_time: f64,
    },
    /// Explicit duration per slot.
    Explicit(Vec<f64>),
}

impl TimeGrid {
    /// Equal slots.
    pub fn uniform(num_slots: usize, evo_time: f64) -> Self {
        TimeGrid::Uniform {
            num_slots,
            evo_time,
        }
    }

    /// Number of slots.
    pub fn num_slots(&self) -> usize {
        match self {
            TimeGrid::Uniform { num_slots, .. } => *num_slots,
            TimeGrid::Explicit(d) => d.len(),
        }
    }

    /// Duration of every slot.
    pub fn durations(&self) -> Vec<f64> {
        match self {
            TimeGrid::Uniform {
                num_slots,
                evo_time,
            } => vec![evo_time / *num_slots as f64; *num_slots],
            TimeGrid::Explicit(d) => d.clone(),
        }
    }

    /// Total evolution time.
    pub fn evo_time(&self) -> f64 {
        match self {
            TimeGrid::Uniform { evo_time, .. } => *evo_time,
            TimeGrid::Explicit(d) => d.iter().sum(),
        }
    }

    fn validate(&self) -> GrapeResult<()> {
        if self.num_slots() == 0 {
            return Err(GrapeError::InvalidProblem("time grid has no slots".into()));
        }
        if let Some(bad) = self
            .durations()
            .into_iter()
            .find(|dt| !dt.is_finite() || *dt <= 0.0)
        {
            return Err(GrapeError::InvalidProblem(format!(
                "slot duration {bad} is not positive"
            )));
        }
        Ok(())
    }
}

/// Drift, controls, start and goal of an optimization.
///
/// `initial` and `target` share a shape `d × m`: `m = d` for gate synthesis
/// (usually `initial = I`) and `m = 1` for state transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrapeProblem {
    /// Always-on Hamiltonian `H_d`.
    pub drift: CMatrix,
    /// Control Hamiltonians `H_j`, one per schedule column.
    pub controls: Vec<CMatrix>,
    /// Initial operator or state `X0`.
    pub initial: CMatrix,
    /// Target operator or state `W`.
    pub target: CMatrix,
    /// Slot layout.
    pub grid: TimeGrid,
}

impl GrapeProblem {
    /// Gate synthesis from the identity; validates the result.
    pub fn unitary(
        drift: CMatrix,
        controls: Vec<CMatrix>,
        target: CMatrix,
        grid: TimeGrid,
    ) -> GrapeResult<Self> {
        let initial = identity(drift.nrows());
        let problem = Self {
            drift,
            controls,
            initial,
            target,
            grid,
        };
        problem.validate()?;
        Ok(problem)
    }

    /// State transfer from `initial` to `target` (column vectors).
    pub fn state_transfer(
        drift: CMatrix,
        controls: Vec<CMatrix>,
        initial: Vec<Complex64>,
        target: Vec<Complex64>,
        grid: TimeGrid,
    ) -> GrapeResult<Self> {
        let column = |v: Vec<Complex64>| {
            let n = v.len();
            Array2::from_shape_vec((n, 1), v)
                .map_err(|e| GrapeError::InvalidProblem(e.to_string()))
        };
        let problem = Self {
            drift,
            controls,
            initial: column(initial)?,
            target: column(target)?,
            grid,
        };
        problem.validate()?;
        Ok(problem)
    }

    /// Hilbert-space dimension `d`.
    pub fn dim(&self) -> usize {
        self.drift.nrows()
    }

    /// Number of controls.
    pub fn num_controls(&self) -> usize {
        self.controls.len()
    }

    /// Number of time slots.
    pub fn num_slots(&self) -> usize {
        self.grid.num_slots()
    }

    /// Whether the goal is a full operator rather than a state.
    pub fn is_unitary_target(&self) -> bool {
        self.target.ncols() == self.dim()
    }

    /// Fidelity normalization `‖W‖²·‖X0‖²`.
    pub fn norm(&self) -> f64 {
        frobenius_sqr(&self.target) * frobenius_sqr(&self.initial)
    }

    /// Check shapes, Hermiticity and the time grid.
    pub fn validate(&self) -> GrapeResult<()> {
        let d = self.dim();
        if d == 0 {
            return Err(GrapeError::InvalidProblem("drift is empty".into()));
        }
        let square = (d, d);
        let shape = |m: &CMatrix| (m.nrows(), m.ncols());
        if shape(&self.drift) != square {
            return Err(GrapeError::ShapeMismatch {
                what: "drift".into(),
                expected: square,
                got: shape(&self.drift),
            });
        }
        if !is_hermitian(&self.drift, HERMITIAN_TOL) {
            return Err(GrapeError::NotHermitian("drift".into()));
        }
        if self.controls.is_empty() {
            return Err(GrapeError::InvalidProblem("no control operators".into()));
        }
        for (j, ctrl) in self.controls.iter().enumerate() {
            if shape(ctrl) != square {
                return Err(GrapeError::ShapeMismatch {
                    what: format!("control {j}"),
                    expected: square,
                    got: shape(ctrl),
                });
            }
            if !is_hermitian(ctrl, HERMITIAN_TOL) {
                return Err(GrapeError::NotHermitian(format!("control {j}")));
            }
        }
        if self.initial.nrows() != d {
            return Err(GrapeError::ShapeMismatch {
                what: "initial".into(),
                expected: (d, self.initial.ncols()),
                got: shape(&self.initial),
            });
        }
        if shape(&self.target) != shape(&self.initial) {
            return Err(GrapeError::ShapeMismatch {
                what: "target".into(),
                expected: shape(&self.initial),
                got: shape(&self.target),
            });
        }
        if self.norm() == 0.0 {
            return Err(GrapeError::InvalidProblem("initial or target is zero".into()));
        }
        self.grid.validate()
    }
}

/// Matrix of a named one- or two-qubit gate, for use as a target.
///
/// Little-endian like the executor: two-qubit gates take qubit 0 as the
/// first operand (the control for `cx`).
pub fn named_gate(name: &str) -> GrapeResult<CMatrix> {
    let z = Complex64::new(0.0, 0.0);
    let o = Complex64::new(1.0, 0.0);
    let i = Complex64::new(0.0, 1.0);
    let h = Complex64::new(FRAC_1_SQRT_2, 0.0);
    let from = |n: usize, v: Vec<Complex64>| {
        Array2::from_shape_vec((n, n), v).map_err(|e| GrapeError::InvalidProblem(e.to_string()))
    };
    match name.to_ascii_lowercase().as_str() {
        "id" | "i" => Ok(identity(2)),
        "x" => from(2, vec![z, o, o, z]),
        "y" => from(2, vec![z, -i, i, z]),
        "z" => from(2, vec![o, z, z, -o]),
        "h" => from(2, vec![h, h, h, -h]),
        "s" => from(2, vec![o, z, z, i]),
        "t" => {
            let t = Complex64::from_polar(1.0, std::f64::consts::FRAC_PI_4);
            from(2, vec![o, z, z, t])
        }
        "sx" => {
            let (p, m) = (Complex64::new(0.5, 0.5), Complex64::new(0.5, -0.5));
            from(2, vec![p, m, m, p])
        }
        // Basis |q1 q0⟩: control on bit 0, target on bit 1.
        "cx" | "cnot" => from(
            4,
            vec![
                o, z, z, z, //
                z, z, z, o, //
                z, z, o, z, //
                z, o, z, z,
            ],
        ),
        "cz" => from(
            4,
            vec![
                o, z, z, z, //
                z, o, z, z, //
                z, z, o, z, //
                z, z, z, -o,
            ],
        ),
        "swap" => from(
            4,
            vec![
                o, z, z, z, //
                z, z, o, z, //
                z, o, z, z, //
                z, z, z, o,
            ],
        ),
        "iswap" => from(
            4,
            vec![
                o, z, z, z, //
                z, z, i, z, //
                z, i, z, z, //
                z, z, z, o,
            ],
        ),
        _ => Err(GrapeError::UnknownGate(name.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::{Hamiltonian, HamiltonianTerm};
    use crate::linalg::dagger;

    fn pauli(term: HamiltonianTerm) -> CMatrix {
        Hamiltonian::from_terms(vec![term]).to_matrix(1)
    }

    #[test]
    fn test_named_gates_unitary() {
        for name in ["id", "x", "y", "z", "h", "s", "t", "sx", "cx", "cz", "swap", "iswap"] {
            let g = named_gate(name).unwrap();
            let gg = dagger(&g).dot(&g);
            let eye = identity(g.nrows());
            let err: f64 = (&gg - &eye).iter().map(|v| v.norm()).sum();
            assert!(err < 1e-12, "{name}");
        }
        assert!(matches!(named_gate("frob"), Err(GrapeError::UnknownGate(_))));
    }

    #[test]
    fn test_cx_little_endian() {
        let cx = named_gate("cx").unwrap();
        // |01⟩ (qubit 0 set) → |11⟩
        assert_eq!(cx[[3, 1]].re, 1.0);
    }

    #[test]
    fn test_validation() {
        let z = pauli(HamiltonianTerm::z(0, 1.0));
        let x = pauli(HamiltonianTerm::x(0, 1.0));
        let h = named_gate("h").unwrap();
        let grid = TimeGrid::uniform(10, 10.0);
        let build = |controls: Vec<CMatrix>, target: CMatrix, grid: TimeGrid| {
            GrapeProblem::unitary(z.clone(), controls, target, grid)
        };
        assert!(build(vec![x.clone()], h.clone(), grid.clone()).is_ok());

        let err = build(vec![], h.clone(), grid.clone());
        assert!(matches!(err, Err(GrapeError::InvalidProblem(_))));

        let mut bad = x.clone();
        bad[[0, 1]] = Complex64::new(0.0, 1.0);
        let err = build(vec![bad], h.clone(), grid.clone());
        assert!(matches!(err, Err(GrapeError::NotHermitian(_))));

        let err = build(vec![x.clone()], identity(4), grid);
        assert!(matches!(err, Err(GrapeError::ShapeMismatch { .. })));

        let err = build(vec![x], h, TimeGrid::Explicit(vec![0.1, -0.1]));
        assert!(matches!(err, Err(GrapeError::InvalidProblem(_))));
    }

    #[test]
    fn test_time_grid() {
        let g = TimeGrid::uniform(4, 2.0);
        assert_eq!(g.durations(), vec![0.5; 4]);
        let e = TimeGrid::Explicit(vec![0.1, 0.2, 0.3]);
        assert!((e.evo_time() - 0.6).abs() < 1e-15);
        assert_eq!(e.num_slots(), 3);
    }

    #[test]
    fn test_state_transfer_shape() {
        let z = pauli(HamiltonianTerm::z(0, 1.0));
        let x = pauli(HamiltonianTerm::x(0, 1.0));
        let o = Complex64::new(1.0, 0.0);
        let zero = Complex64::new(0.0, 0.0);
        let grid = TimeGrid::uniform(5, 3.0);
        let p = GrapeProblem::state_transfer(z, vec![x], vec![o, zero], vec![zero, o], grid).unwrap();
        assert!(!p.is_unitary_target());
        assert_eq!(p.norm(), 1.0);
    }
}
