//! Slot propagators `U_k = exp(−i H_k Δt_k)` and their amplitude derivatives.

use ndarray::{Array2, s};
use num_complex::Complex64;
use tracing::debug;

use crate::config::PropagatorMethod;
use crate::linalg::{CMatrix, Eigh, dagger, eigh, expm};

/// Below this, `x` in `sin(x)/x` uses its Taylor series.
const SINC_SERIES: f64 = 1e-4;

/// `H_k = H_d + Σ_j u_kj H_j`.
pub fn slot_hamiltonian(drift: &CMatrix, controls: &[CMatrix], amps: &[f64]) -> CMatrix {
    let mut h = drift.clone();
    for (ctrl, &u) in controls.iter().zip(amps) {
        h.scaled_add(Complex64::new(u, 0.0), ctrl);
    }
    h
}

/// What a slot keeps to differentiate its propagator later.
#[derive(Debug, Clone)]
enum Factor {
    /// Eigendecomposition of `H_k`.
    Eigen(Eigh),
    /// `−i Δt H_k`, exponentiated again in block form.
    Generator(CMatrix),
}

/// One time slot's propagator plus the data its derivative needs.
#[derive(Debug, Clone)]
pub struct SlotPropagator {
    unitary: CMatrix,
    factor: Factor,
    dt: f64,
}

impl SlotPropagator {
    /// Propagator of `h` over `dt`.
    ///
    /// A Hamiltonian that cannot be diagonalized yields NaN entries, which
    /// the driver reports as a failed run.
    pub fn new(method: PropagatorMethod, h: &CMatrix, dt: f64) -> Self {
        match method {
            PropagatorMethod::Diagonalization => {
                let eig = eigh(h).unwrap_or_else(|err| {
                    debug!(%err, "slot Hamiltonian has no eigendecomposition");
                    Eigh::undefined(h.nrows())
                });
                let unitary = eig.map(|l| Complex64::from_polar(1.0, -l * dt));
                Self {
                    unitary,
                    factor: Factor::Eigen(eig),
                    dt,
                }
            }
            PropagatorMethod::Frechet => {
                let generator = h * Complex64::new(0.0, -dt);
                Self {
                    unitary: expm(&generator),
                    factor: Factor::Generator(generator),
                    dt,
                }
            }
        }
    }

    /// `U_k`.
    pub fn unitary(&self) -> &CMatrix {
        &self.unitary
    }

    /// `∂U_k/∂u_kj` for the control Hamiltonian `control`.
    pub fn derivative(&self, control: &CMatrix) -> CMatrix {
        match &self.factor {
            Factor::Eigen(eig) => daleckii_krein(eig, control, self.dt),
            Factor::Generator(a) => frechet(a, &(control * Complex64::new(0.0, -self.dt))),
        }
    }
}

/// `V (Φ ∘ V† E V) V†` with `Φ_ab` the divided difference of `λ ↦ e^{−iλΔt}`.
///
/// `Φ_ab = −iΔt · e^{−i(λa+λb)Δt/2} · sinc((λa−λb)Δt/2)`, which reduces to
/// the derivative `−iΔt e^{−iλΔt}` on degenerate pairs without a branch.
fn daleckii_krein(eig: &Eigh, control: &CMatrix, dt: f64) -> CMatrix {
    let v = &eig.vectors;
    let mut m = dagger(v).dot(control).dot(v);
    let minus_i_dt = Complex64::new(0.0, -dt);
    for ((a, b), entry) in m.indexed_iter_mut() {
        let (la, lb) = (eig.values[a], eig.values[b]);
        let mean_phase = Complex64::from_polar(1.0, -0.5 * (la + lb) * dt);
        *entry *= minus_i_dt * mean_phase * sinc(0.5 * (la - lb) * dt);
    }
    v.dot(&m).dot(&dagger(v))
}

fn sinc(x: f64) -> f64 {
    if x.abs() < SINC_SERIES {
        1.0 - x * x / 6.0
    } else {
        x.sin() / x
    }
}

/// Fréchet derivative of `exp` at `a` in direction `e`, read off the
/// top-right block of `exp([[A, E], [0, A]])`.
fn frechet(a: &CMatrix, e: &CMatrix) -> CMatrix {
    let d = a.nrows();
    let mut block = Array2::zeros((2 * d, 2 * d));
    block.slice_mut(s![..d, ..d]).assign(a);
    block.slice_mut(s![..d, d..]).assign(e);
    block.slice_mut(s![d.., d..]).assign(a);
    expm(&block).slice(s![..d, d..]).to_owned()
}
