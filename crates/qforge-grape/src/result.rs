//! Optimizer state and the record of a finished run.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controllability::Controllability;
use crate::linalg::CMatrix;
use crate::pulse::PulseSchedule;
use crate::stats::Stats;

/// Where the optimizer is in its life cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OptimState {
    /// Built, nothing evaluated yet.
    Initialized,
    /// Taking steps.
    Iterating,
    /// Fidelity error reached the target.
    Converged,
    /// Iteration limit hit.
    MaxIterReached,
    /// Wall-time limit hit.
    MaxWallTimeReached,
    /// Projected gradient vanished or no further decrease was possible.
    LocalMinimum,
    /// Evaluation broke down; the result holds the last valid schedule.
    Failed {
        /// What went wrong.
        cause: String,
    },
}

impl OptimState {
    /// Whether the run has stopped.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, OptimState::Initialized | OptimState::Iterating)
    }

    /// Whether the fidelity target was met.
    pub fn is_converged(&self) -> bool {
        matches!(self, OptimState::Converged)
    }
}

impl fmt::Display for OptimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimState::Initialized => write!(f, "initialized"),
            OptimState::Iterating => write!(f, "iterating"),
            OptimState::Converged => write!(f, "goal achieved"),
            OptimState::MaxIterReached => write!(f, "iteration limit reached"),
            OptimState::MaxWallTimeReached => write!(f, "wall time limit reached"),
            OptimState::LocalMinimum => write!(f, "local minimum (gradient vanished)"),
            OptimState::Failed { cause } => write!(f, "failed: {cause}"),
        }
    }
}

/// Outcome of one optimization run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimResult {
    /// Why the run stopped.
    pub termination: OptimState,
    /// Fidelity error of `final_amps`.
    pub fid_err: f64,
    /// Projected gradient norm at `final_amps`.
    pub grad_norm: f64,
    /// Accepted steps.
    pub num_iter: usize,
    /// Fidelity evaluations.
    pub num_fid_func_calls: usize,
    /// Gradient evaluations.
    pub num_grad_func_calls: usize,
    /// Wall time of this run.
    pub wall_time: Duration,
    /// Evolved operator or state under `final_amps`.
    pub evo_full_final: CMatrix,
    /// Starting schedule.
    pub initial_amps: PulseSchedule,
    /// Best schedule found.
    pub final_amps: PulseSchedule,
    /// Controllability verdict for the problem.
    pub controllability: Controllability,
    /// Accumulated statistics.
    pub stats: Stats,
}

impl OptimResult {
    /// `1 − fid_err`.
    pub fn fidelity(&self) -> f64 {
        1.0 - self.fid_err
    }
}

impl fmt::Display for OptimResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Terminated due to: {}", self.termination)?;
        writeln!(f, "Final fidelity error {:.3e}", self.fid_err)?;
        writeln!(f, "Final gradient norm {:.3e}", self.grad_norm)?;
        writeln!(f, "Iterations {}", self.num_iter)?;
        writeln!(
            f,
            "Function calls: fidelity {}, gradient {}",
            self.num_fid_func_calls, self.num_grad_func_calls
        )?;
        write!(f, "Wall time {:.3}s", self.wall_time.as_secs_f64())
    }
}
