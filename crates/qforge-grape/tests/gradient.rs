//! Analytic gradients against central finite differences.

use num_complex::Complex64;
use proptest::prelude::*;
use qforge_grape::fidelity::Evaluator;
use qforge_grape::hamiltonian::{Hamiltonian, HamiltonianTerm};
use qforge_grape::{GrapeProblem, Parallelism, PropagatorMethod, Stats, TimeGrid, named_gate};

const EPS: f64 = 1e-6;

fn two_qubit_problem(durations: Vec<f64>, state: bool) -> GrapeProblem {
    let n = 2;
    let op = |t: HamiltonianTerm| Hamiltonian::from_terms(vec![t]).to_matrix(n);
    let drift = Hamiltonian::from_terms(vec![
        HamiltonianTerm::zz(0, 1, 0.8),
        HamiltonianTerm::z(1, -0.4),
    ])
    .to_matrix(n);
    let controls = vec![
        op(HamiltonianTerm::x(0, 1.0)),
        op(HamiltonianTerm::y(1, 1.0)),
    ];
    let grid = TimeGrid::Explicit(durations);
    if state {
        let c = |re: f64, im: f64| Complex64::new(re, im);
        let h = std::f64::consts::FRAC_1_SQRT_2;
        GrapeProblem::state_transfer(
            drift,
            controls,
            vec![c(1.0, 0.0), c(0.0, 0.0), c(0.0, 0.0), c(0.0, 0.0)],
            vec![c(0.0, 0.0), c(h, 0.0), c(0.0, h), c(0.0, 0.0)],
            grid,
        )
        .unwrap()
    } else {
        GrapeProblem::unitary(drift, controls, named_gate("cx").unwrap(), grid).unwrap()
    }
}

fn check_gradient(problem: &GrapeProblem, method: PropagatorMethod, amps: &[f64]) {
    let evaluator = Evaluator::new(problem, method, Parallelism::Sequential).unwrap();
    let mut stats = Stats::default();
    let fid = evaluator.fidelity(amps, &mut stats);
    let grad = evaluator.gradient(&fid, &mut stats);
    assert_eq!(grad.len(), amps.len());
    for i in 0..amps.len() {
        let mut up = amps.to_vec();
        let mut down = amps.to_vec();
        up[i] += EPS;
        down[i] -= EPS;
        let fd = (evaluator.fidelity(&up, &mut stats).fid_err
            - evaluator.fidelity(&down, &mut stats).fid_err)
            / (2.0 * EPS);
        assert!(
            (grad[i] - fd).abs() < 1e-6,
            "{method:?} component {i}: analytic {} vs finite difference {fd}",
            grad[i]
        );
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn prop_gradient_matches_finite_difference(
        durations in prop::collection::vec(0.05f64..0.6, 3..6),
        seed_amps in prop::collection::vec(-2.0f64..2.0, 12),
        state in any::<bool>(),
    ) {
        let slots = durations.len();
        let amps = &seed_amps[..slots * 2];
        let problem = two_qubit_problem(durations, state);
        check_gradient(&problem, PropagatorMethod::Diagonalization, amps);
        check_gradient(&problem, PropagatorMethod::Frechet, amps);
    }
}

#[test]
fn test_gradient_with_degenerate_drift() {
    // Zero amplitudes on a zero drift leave every slot Hamiltonian degenerate.
    let zero = ndarray::Array2::zeros((2, 2));
    let x = Hamiltonian::from_terms(vec![HamiltonianTerm::x(0, 1.0)]).to_matrix(1);
    let problem =
        GrapeProblem::unitary(zero, vec![x], named_gate("x").unwrap(), TimeGrid::uniform(4, 1.0))
            .unwrap();
    check_gradient(&problem, PropagatorMethod::Diagonalization, &[0.0; 4]);
    check_gradient(&problem, PropagatorMethod::Diagonalization, &[0.3, 0.0, -0.2, 0.0]);
}
