//! Fidelity error and its exact gradient over a whole schedule.
//!
//! With forward states `X_k = U_k X_{k-1}` and backward operators
//! `Λ_k = W† U_{N} ⋯ U_{k+1}`, the overlap is `g = Tr(W† X_N)` and
//!
//!   ∂g/∂u_kj = Tr(Λ_k · ∂U_k/∂u_kj · X_{k-1})
//!
//! The error is `1 − |g|² / (‖W‖²‖X0‖²)`, which ignores global phase.

use num_complex::Complex64;
use rayon::ThreadPool;
use rayon::prelude::*;

use crate::config::{Parallelism, PropagatorMethod};
use crate::error::{GrapeError, GrapeResult};
use crate::linalg::{CMatrix, dagger, trace_of_product};
use crate::problem::GrapeProblem;
use crate::propagator::{SlotPropagator, slot_hamiltonian};
use crate::stats::Stats;

/// The fidelity side of one evaluation, kept so the gradient can reuse it.
#[derive(Debug, Clone)]
pub struct FidelityEval {
    /// Fidelity error in `[0, 1]`, or non-finite for a broken schedule.
    pub fid_err: f64,
    overlap: Complex64,
    slots: Vec<SlotPropagator>,
    /// `X_0 ..= X_N`.
    forward: Vec<CMatrix>,
}

impl FidelityEval {
    /// Final evolved operator or state `X_N`.
    pub fn evolution(&self) -> &CMatrix {
        // `forward` always holds at least X_0.
        &self.forward[self.forward.len() - 1]
    }
}

/// Evaluates fidelity error and gradient for flat amplitude vectors.
///
/// Per-slot work may fan out over a private thread pool. Results come back
/// in slot order and every reduction runs sequentially, so the output does
/// not depend on the thread count.
pub struct Evaluator<'p> {
    problem: &'p GrapeProblem,
    method: PropagatorMethod,
    durations: Vec<f64>,
    norm: f64,
    pool: Option<ThreadPool>,
}

impl<'p> Evaluator<'p> {
    /// Build an evaluator for a validated problem.
    pub fn new(
        problem: &'p GrapeProblem,
        method: PropagatorMethod,
        parallelism: Parallelism,
    ) -> GrapeResult<Self> {
        let pool = match parallelism {
            Parallelism::Sequential => None,
            Parallelism::Threads(n) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .thread_name(|i| format!("qforge-grape-{i}"))
                    .build()
                    .map_err(|e| GrapeError::ThreadPool(e.to_string()))?,
            ),
        };
        Ok(Self {
            problem,
            method,
            durations: problem.grid.durations(),
            norm: problem.norm(),
            pool,
        })
    }

    fn per_slot<T: Send>(&self, n: usize, f: impl Fn(usize) -> T + Sync + Send) -> Vec<T> {
        match &self.pool {
            Some(pool) => pool.install(|| (0..n).into_par_iter().map(&f).collect()),
            None => (0..n).map(f).collect(),
        }
    }

    /// Propagators, forward chain and fidelity error for `amps`
    /// (row-major, slot by slot).
    pub fn fidelity(&self, amps: &[f64], stats: &mut Stats) -> FidelityEval {
        let p = self.problem;
        let nc = p.num_controls();
        let n = self.durations.len();

        let slots = Stats::time(&mut stats.wall_time_propagators, || {
            self.per_slot(n, |k| {
                let h = slot_hamiltonian(&p.drift, &p.controls, &amps[k * nc..(k + 1) * nc]);
                SlotPropagator::new(self.method, &h, self.durations[k])
            })
        });
        stats.num_propagator_computes += n;

        let (forward, overlap) = Stats::time(&mut stats.wall_time_fidelity, || {
            let mut forward = Vec::with_capacity(n + 1);
            forward.push(p.initial.clone());
            for slot in &slots {
                let next = slot.unitary().dot(&forward[forward.len() - 1]);
                forward.push(next);
            }
            let overlap = trace_of_product(&dagger(&p.target), &forward[n]);
            (forward, overlap)
        });
        stats.num_fidelity_computes += 1;

        FidelityEval {
            fid_err: 1.0 - overlap.norm_sqr() / self.norm,
            overlap,
            slots,
            forward,
        }
    }

    /// Gradient of the fidelity error, flat in the same layout as the amplitudes.
    pub fn gradient(&self, eval: &FidelityEval, stats: &mut Stats) -> Vec<f64> {
        let p = self.problem;
        let n = eval.slots.len();
        let scale = -2.0 / self.norm;
        let overlap_conj = eval.overlap.conj();

        let grad = Stats::time(&mut stats.wall_time_gradient, || {
            // backward[k] = W† U_{N-1} ⋯ U_{k+1}, the operator after slot k.
            let mut backward = vec![dagger(&p.target); n];
            for k in (0..n.saturating_sub(1)).rev() {
                backward[k] = backward[k + 1].dot(eval.slots[k + 1].unitary());
            }
            let per_slot = self.per_slot(n, |k| {
                // Tr(Λ dU X) = Tr(dU · X Λ)
                let sandwich = eval.forward[k].dot(&backward[k]);
                p.controls
                    .iter()
                    .map(|ctrl| {
                        let dg = trace_of_product(&eval.slots[k].derivative(ctrl), &sandwich);
                        scale * (overlap_conj * dg).re
                    })
                    .collect::<Vec<_>>()
            });
            per_slot.into_iter().flatten().collect()
        });
        stats.num_gradient_computes += 1;
        grad
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hamiltonian::{Hamiltonian, HamiltonianTerm};
    use crate::problem::{TimeGrid, named_gate};

    fn qubit_problem() -> GrapeProblem {
        let z = Hamiltonian::from_terms(vec![HamiltonianTerm::z(0, 1.0)]).to_matrix(1);
        let x = Hamiltonian::from_terms(vec![HamiltonianTerm::x(0, 1.0)]).to_matrix(1);
        let y = Hamiltonian::from_terms(vec![HamiltonianTerm::y(0, 1.0)]).to_matrix(1);
        GrapeProblem::unitary(z, vec![x, y], named_gate("h").unwrap(), TimeGrid::uniform(6, 3.0))
            .unwrap()
    }

    fn amps() -> Vec<f64> {
        (0..12).map(|i| 0.3 * (i as f64 * 0.7).sin()).collect()
    }

    #[test]
    fn test_error_in_unit_interval() {
        let p = qubit_problem();
        let ev = Evaluator::new(&p, PropagatorMethod::Diagonalization, Parallelism::Sequential)
            .unwrap();
        let mut stats = Stats::default();
        let f = ev.fidelity(&amps(), &mut stats);
        assert!((0.0..=1.0).contains(&f.fid_err));
        assert_eq!(stats.num_propagator_computes, 6);
        assert_eq!(stats.num_fidelity_computes, 1);
    }

    #[test]
    fn test_gradient_matches_finite_difference() {
        let p = qubit_problem();
        for method in [PropagatorMethod::Diagonalization, PropagatorMethod::Frechet] {
            let ev = Evaluator::new(&p, method, Parallelism::Sequential).unwrap();
            let mut stats = Stats::default();
            let x = amps();
            let grad = ev.gradient(&ev.fidelity(&x, &mut stats), &mut stats);
            let eps = 1e-6;
            for i in 0..x.len() {
                let mut up = x.clone();
                let mut down = x.clone();
                up[i] += eps;
                down[i] -= eps;
                let fd = (ev.fidelity(&up, &mut stats).fid_err
                    - ev.fidelity(&down, &mut stats).fid_err)
                    / (2.0 * eps);
                assert!((grad[i] - fd).abs() < 1e-6, "{method:?} component {i}");
            }
        }
    }

    #[test]
    fn test_threads_match_sequential_bitwise() {
        let p = qubit_problem();
        let seq = Evaluator::new(&p, PropagatorMethod::Diagonalization, Parallelism::Sequential)
            .unwrap();
        let par = Evaluator::new(&p, PropagatorMethod::Diagonalization, Parallelism::Threads(3))
            .unwrap();
        let mut stats = Stats::default();
        let a = seq.fidelity(&amps(), &mut stats);
        let b = par.fidelity(&amps(), &mut stats);
        assert_eq!(a.fid_err.to_bits(), b.fid_err.to_bits());
        assert_eq!(seq.gradient(&a, &mut stats), par.gradient(&b, &mut stats));
    }

    #[test]
    fn test_global_phase_ignored() {
        let mut p = qubit_problem();
        let x = amps();
        let ev = Evaluator::new(&p, PropagatorMethod::Diagonalization, Parallelism::Sequential)
            .unwrap();
        let mut stats = Stats::default();
        let base = ev.fidelity(&x, &mut stats).fid_err;
        p.target = p.target.mapv(|v| v * Complex64::from_polar(1.0, 0.9));
        let ev = Evaluator::new(&p, PropagatorMethod::Diagonalization, Parallelism::Sequential)
            .unwrap();
        assert!((ev.fidelity(&x, &mut stats).fid_err - base).abs() < 1e-12);
    }
}
