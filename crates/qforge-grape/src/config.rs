//! Optimizer settings and YAML problem files.
//!
//! Settings are resolved in this order (highest first):
//! 1. Environment variables (`QFORGE_` prefix, see [`OptimizerConfig::apply_env`])
//! 2. The problem file's `optimizer` section
//! 3. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use num_complex::Complex64;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{GrapeError, GrapeResult};
use crate::hamiltonian::Hamiltonian;
use crate::problem::{GrapeProblem, TimeGrid, named_gate};
use crate::pulse::{Bounds, InitialPulse};

/// How slot propagators and their derivatives are computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PropagatorMethod {
    /// Eigendecomposition of each slot Hamiltonian with divided differences.
    #[default]
    Diagonalization,
    /// Fréchet derivative from the block-matrix exponential.
    Frechet,
}

/// Where per-slot work runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parallelism {
    /// On the calling thread.
    #[default]
    Sequential,
    /// On a dedicated pool with this many workers.
    Threads(usize),
}

/// Optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerConfig {
    /// Stop once the fidelity error is at or below this.
    #[serde(default = "default_fid_err_targ")]
    pub fid_err_targ: f64,

    /// Stop once the projected gradient norm is at or below this.
    #[serde(default = "default_min_grad")]
    pub min_grad: f64,

    /// Iteration limit.
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Wall-clock limit in seconds.
    #[serde(default = "default_max_wall_time")]
    pub max_wall_time: f64,

    /// Shape of the first iterate.
    #[serde(default)]
    pub init_pulse: InitialPulse,

    /// Amplitude of the initial waveform when the bounds leave it open.
    #[serde(default = "default_pulse_scaling")]
    pub pulse_scaling: f64,

    /// Amplitude box.
    #[serde(default)]
    pub bounds: Bounds,

    /// Directory for `initial_amps.txt` / `final_amps.txt`; no dump when unset.
    #[serde(default)]
    pub dump_dir: Option<PathBuf>,

    /// Propagator gradient method.
    #[serde(default)]
    pub method: PropagatorMethod,

    /// Per-slot fan-out.
    #[serde(default)]
    pub parallelism: Parallelism,

    /// Correction pairs kept by the quasi-Newton driver.
    #[serde(default = "default_lbfgs_memory")]
    pub lbfgs_memory: usize,

    /// Run the Lie-rank controllability check before optimizing.
    #[serde(default = "default_true")]
    pub check_controllability: bool,
}

fn default_fid_err_targ() -> f64 {
    1e-10
}

fn default_min_grad() -> f64 {
    1e-10
}

fn default_max_iter() -> usize {
    200
}

fn default_max_wall_time() -> f64 {
    120.0
}

fn default_pulse_scaling() -> f64 {
    1.0
}

fn default_lbfgs_memory() -> usize {
    10
}

fn default_true() -> bool {
    true
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            fid_err_targ: default_fid_err_targ(),
            min_grad: default_min_grad(),
            max_iter: default_max_iter(),
            max_wall_time: default_max_wall_time(),
            init_pulse: InitialPulse::default(),
            pulse_scaling: default_pulse_scaling(),
            bounds: Bounds::default(),
            dump_dir: None,
            method: PropagatorMethod::default(),
            parallelism: Parallelism::default(),
            lbfgs_memory: default_lbfgs_memory(),
            check_controllability: default_true(),
        }
    }
}

impl OptimizerConfig {
    /// Wall-clock limit as a [`Duration`].
    pub fn wall_time_limit(&self) -> Duration {
        Duration::from_secs_f64(self.max_wall_time)
    }

    /// Override limits from `QFORGE_*` environment variables.
    ///
    /// Values that do not parse are ignored with a warning.
    #[must_use]
    pub fn apply_env(mut self) -> Self {
        fn read<T: std::str::FromStr>(name: &str) -> Option<T> {
            let raw = std::env::var(name).ok()?;
            let parsed = raw.trim().parse().ok();
            if parsed.is_none() {
                warn!(variable = name, value = %raw, "ignoring unparsable environment override");
            }
            parsed
        }

        if let Some(v) = read("QFORGE_MAX_ITER") {
            self.max_iter = v;
        }
        if let Some(v) = read("QFORGE_MAX_WALL_TIME") {
            self.max_wall_time = v;
        }
        if let Some(v) = read("QFORGE_FID_ERR_TARG") {
            self.fid_err_targ = v;
        }
        if let Some(v) = read("QFORGE_MIN_GRAD") {
            self.min_grad = v;
        }
        if let Some(n) = read::<usize>("QFORGE_THREADS") {
            self.parallelism = if n > 1 {
                Parallelism::Threads(n)
            } else {
                Parallelism::Sequential
            };
        }
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));
        if !(self.fid_err_targ.is_finite() && self.fid_err_targ >= 0.0) {
            return invalid(format!("fid_err_targ must be >= 0, got {}", self.fid_err_targ));
        }
        if !(self.min_grad.is_finite() && self.min_grad >= 0.0) {
            return invalid(format!("min_grad must be >= 0, got {}", self.min_grad));
        }
        if self.max_iter == 0 {
            return invalid("max_iter must be greater than 0".into());
        }
        if !(self.max_wall_time.is_finite() && self.max_wall_time > 0.0) {
            return invalid(format!("max_wall_time must be > 0, got {}", self.max_wall_time));
        }
        if !self.pulse_scaling.is_finite() {
            return invalid("pulse_scaling must be finite".into());
        }
        if self.lbfgs_memory == 0 {
            return invalid("lbfgs_memory must be greater than 0".into());
        }
        if self.parallelism == Parallelism::Threads(0) {
            return invalid("thread count must be greater than 0".into());
        }
        self.bounds
            .validate()
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// The file could not be read.
    #[error("IO error: {0}")]
    IoError(String),

    /// The file is not valid YAML for the schema.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A value is out of range.
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Target section of a problem file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetSpec {
    /// A gate from the built-in table (`h`, `x`, `cx`, ...).
    Gate(String),
    /// Explicit operator, rows of `[re, im]` pairs.
    Matrix(Vec<Vec<[f64; 2]>>),
    /// Target state, `[re, im]` pairs.
    State(Vec<[f64; 2]>),
}

/// YAML schema of an optimization problem.
///
/// ```yaml
/// num_qubits: 1
/// drift:
///   - { coeff: 1.0, pauli: [[0, Z]] }
/// controls:
///   - [{ coeff: 1.0, pauli: [[0, X]] }]
/// target: { gate: h }
/// num_tslots: 10
/// evo_time: 10.0
/// optimizer:
///   init_pulse: { type: sine }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblemSpec {
    /// Register width.
    pub num_qubits: u32,
    /// Drift Hamiltonian.
    #[serde(default)]
    pub drift: Hamiltonian,
    /// One Hamiltonian per control.
    pub controls: Vec<Hamiltonian>,
    /// What to reach.
    pub target: TargetSpec,
    /// Start state for state targets; `|0…0⟩` when omitted.
    #[serde(default)]
    pub initial_state: Option<Vec<[f64; 2]>>,
    /// Number of equal slots.
    #[serde(default)]
    pub num_tslots: Option<usize>,
    /// Total evolution time for equal slots.
    #[serde(default)]
    pub evo_time: Option<f64>,
    /// Explicit slot durations, instead of `num_tslots`/`evo_time`.
    #[serde(default)]
    pub slot_durations: Option<Vec<f64>>,
    /// Optimizer settings.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
}

/// Largest register a problem file may describe.
pub const MAX_PROBLEM_QUBITS: u32 = 6;

impl ProblemSpec {
    /// Load and validate a YAML problem file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let spec: ProblemSpec =
            serde_yaml_ng::from_str(text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        spec.validate()?;
        Ok(spec)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::ValidationError(msg));
        if self.num_qubits == 0 || self.num_qubits > MAX_PROBLEM_QUBITS {
            return invalid(format!(
                "num_qubits must be in 1..={MAX_PROBLEM_QUBITS}, got {}",
                self.num_qubits
            ));
        }
        let widest = std::iter::once(&self.drift)
            .chain(&self.controls)
            .map(Hamiltonian::min_qubits)
            .max()
            .unwrap_or(0);
        if widest > self.num_qubits {
            return invalid(format!(
                "Hamiltonian acts on {widest} qubits but num_qubits is {}",
                self.num_qubits
            ));
        }
        if self.controls.is_empty() {
            return invalid("at least one control is required".into());
        }
        match (&self.slot_durations, self.num_tslots, self.evo_time) {
            (Some(_), None, None) | (None, Some(_), Some(_)) => {}
            (Some(_), _, _) => {
                return invalid("slot_durations excludes num_tslots and evo_time".into());
            }
            _ => return invalid("num_tslots and evo_time are both required".into()),
        }
        self.optimizer.validate()
    }

    /// Time grid described by the file.
    pub fn grid(&self) -> TimeGrid {
        match &self.slot_durations {
            Some(d) => TimeGrid::Explicit(d.clone()),
            None => TimeGrid::uniform(
                self.num_tslots.unwrap_or_default(),
                self.evo_time.unwrap_or_default(),
            ),
        }
    }

    /// Materialize the problem.
    pub fn build(&self) -> GrapeResult<GrapeProblem> {
        let n = self.num_qubits;
        let dim = 1usize << n;
        let drift = self.drift.to_matrix(n);
        let controls = self.controls.iter().map(|h| h.to_matrix(n)).collect();
        let to_c = |p: &[f64; 2]| Complex64::new(p[0], p[1]);

        match &self.target {
            TargetSpec::Gate(name) => {
                let target = named_gate(name)?;
                GrapeProblem::unitary(drift, controls, target, self.grid())
            }
            TargetSpec::Matrix(rows) => {
                let flat: Vec<Complex64> = rows.iter().flatten().map(to_c).collect();
                let target = ndarray::Array2::from_shape_vec((rows.len(), dim), flat)
                    .map_err(|e| GrapeError::InvalidProblem(format!("target matrix: {e}")))?;
                GrapeProblem::unitary(drift, controls, target, self.grid())
            }
            TargetSpec::State(amps) => {
                let target = amps.iter().map(to_c).collect();
                let initial = match &self.initial_state {
                    Some(v) => v.iter().map(to_c).collect(),
                    None => {
                        let mut v = vec![Complex64::new(0.0, 0.0); dim];
                        v[0] = Complex64::new(1.0, 0.0);
                        v
                    }
                };
                GrapeProblem::state_transfer(drift, controls, initial, target, self.grid())
            }
        }
    }
}

impl GrapeProblem {
    /// Load a YAML problem file into a validated problem and its settings.
    pub fn from_file<P: AsRef<Path>>(path: P) -> GrapeResult<(GrapeProblem, OptimizerConfig)> {
        let spec = ProblemSpec::from_file(path)?;
        Ok((spec.build()?, spec.optimizer))
    }
}
