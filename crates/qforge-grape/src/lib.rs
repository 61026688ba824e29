//! `qforge-grape` — gradient ascent pulse engineering for closed systems.
//!
//! Finds piecewise-constant control amplitudes `u_kj` so that
//!
//!   X(T) = U_N ⋯ U_1 X0,   U_k = exp(−i (H_d + Σ_j u_kj H_j) Δt_k)
//!
//! reaches a target operator or state up to global phase. Gradients are
//! exact (eigendecomposition with divided differences, or the block-matrix
//! Fréchet derivative) and drive a box-constrained L-BFGS search.
//!
//! # Quick start
//!
//! ```rust
//! use qforge_grape::hamiltonian::{Hamiltonian, HamiltonianTerm};
//! use qforge_grape::{GrapeProblem, OptimizerConfig, TimeGrid, named_gate, optimize};
//!
//! let drift = Hamiltonian::from_terms(vec![HamiltonianTerm::z(0, 1.0)]).to_matrix(1);
//! let control = Hamiltonian::from_terms(vec![HamiltonianTerm::x(0, 1.0)]).to_matrix(1);
//! let problem = GrapeProblem::unitary(
//!     drift,
//!     vec![control],
//!     named_gate("x").unwrap(),
//!     TimeGrid::uniform(8, 4.0),
//! )
//! .unwrap();
//!
//! let config = OptimizerConfig { max_iter: 20, ..Default::default() };
//! let result = optimize(&problem, config).unwrap();
//! assert!(result.fid_err <= 1.0);
//! assert_eq!(result.final_amps.num_slots(), 8);
//! ```

pub mod config;
pub mod controllability;
pub mod error;
pub mod fidelity;
pub mod hamiltonian;
pub mod lbfgsb;
pub mod linalg;
pub mod optimizer;
pub mod problem;
pub mod propagator;
pub mod pulse;
pub mod result;
pub mod stats;

pub use config::{
    ConfigError, OptimizerConfig, Parallelism, ProblemSpec, PropagatorMethod, TargetSpec,
};
pub use controllability::Controllability;
pub use error::{GrapeError, GrapeResult};
pub use optimizer::{GrapeOptimizer, optimize};
pub use problem::{GrapeProblem, TimeGrid, named_gate};
pub use pulse::{Bounds, InitialPulse, PulseSchedule};
pub use result::{OptimResult, OptimState};
pub use stats::Stats;
