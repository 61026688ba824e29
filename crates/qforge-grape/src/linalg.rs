//! Dense complex linear algebra for small operators.
//!
//! Operators in optimal control are a few qubits wide, so everything here is
//! written for `d ≤ 64` and favours clarity over blocking.

use faer::{Mat, Side, c64};
use ndarray::{Array2, s};
use num_complex::Complex64;

use crate::error::{GrapeError, GrapeResult};

/// Dense complex matrix.
pub type CMatrix = Array2<Complex64>;

const ZERO: Complex64 = Complex64::new(0.0, 0.0);
const ONE: Complex64 = Complex64::new(1.0, 0.0);

#[inline]
fn c(x: f64) -> Complex64 {
    Complex64::new(x, 0.0)
}

/// `d × d` identity.
pub fn identity(d: usize) -> CMatrix {
    Array2::from_diag_elem(d, ONE)
}

/// Conjugate transpose.
pub fn dagger(a: &CMatrix) -> CMatrix {
    a.t().mapv(|x| x.conj())
}

/// Trace of a square matrix.
pub fn trace(a: &CMatrix) -> Complex64 {
    a.diag().iter().sum()
}

/// `Tr(A·B)` without forming the product.
pub fn trace_of_product(a: &CMatrix, b: &CMatrix) -> Complex64 {
    let mut acc = ZERO;
    for i in 0..a.nrows() {
        for k in 0..a.ncols() {
            acc += a[[i, k]] * b[[k, i]];
        }
    }
    acc
}

/// Squared Frobenius norm.
pub fn frobenius_sqr(a: &CMatrix) -> f64 {
    a.iter().map(Complex64::norm_sqr).sum()
}

/// Whether `a` equals its conjugate transpose within `tol`.
pub fn is_hermitian(a: &CMatrix, tol: f64) -> bool {
    a.is_square()
        && a
            .indexed_iter()
            .all(|((i, j), v)| (v - a[[j, i]].conj()).norm() <= tol)
}

/// `[A, B] = AB − BA`.
pub fn commutator(a: &CMatrix, b: &CMatrix) -> CMatrix {
    a.dot(b) - b.dot(a)
}

// ---------------------------------------------------------------------------
// Hermitian eigendecomposition
// ---------------------------------------------------------------------------

/// Eigendecomposition `H = V · diag(λ) · V†` of a Hermitian matrix.
#[derive(Debug, Clone)]
pub struct Eigh {
    /// Eigenvalues, ascending.
    pub values: Vec<f64>,
    /// Unitary whose columns are the matching eigenvectors.
    pub vectors: CMatrix,
}

impl Eigh {
    /// A decomposition of all-NaN entries, standing in for one that failed.
    pub fn undefined(d: usize) -> Self {
        Self {
            values: vec![f64::NAN; d],
            vectors: Array2::from_elem((d, d), Complex64::new(f64::NAN, f64::NAN)),
        }
    }

    /// Rebuild `V · diag(f(λ)) · V†`.
    pub fn map(&self, f: impl Fn(f64) -> Complex64) -> CMatrix {
        let d = self.values.len();
        let mut scaled = self.vectors.clone();
        for (j, &lambda) in self.values.iter().enumerate() {
            let fj = f(lambda);
            for i in 0..d {
                scaled[[i, j]] *= fj;
            }
        }
        scaled.dot(&dagger(&self.vectors))
    }
}

/// Hermitian eigendecomposition via `faer`.
///
/// The output is sorted by eigenvalue, which makes it a deterministic
/// function of the input. Fails on non-finite entries or when the solver
/// does not converge.
pub fn eigh(h: &CMatrix) -> GrapeResult<Eigh> {
    let d = h.nrows();
    if !h.iter().all(|v| v.re.is_finite() && v.im.is_finite()) {
        return Err(GrapeError::Eigen("matrix has non-finite entries".into()));
    }

    let mat = Mat::<c64>::from_fn(d, d, |i, j| c64::new(h[[i, j]].re, h[[i, j]].im));
    let evd = mat
        .self_adjoint_eigen(Side::Lower)
        .map_err(|e| GrapeError::Eigen(format!("{e:?}")))?;
    let (u, spectrum) = (evd.U(), evd.S().column_vector());

    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&x, &y| spectrum[x].re.total_cmp(&spectrum[y].re));
    let values = order.iter().map(|&k| spectrum[k].re).collect();
    let mut vectors = Array2::zeros((d, d));
    for (dst, &src) in order.iter().enumerate() {
        for i in 0..d {
            let z = u[(i, src)];
            vectors[[i, dst]] = Complex64::new(z.re, z.im);
        }
    }
    Ok(Eigh { values, vectors })
}

// ---------------------------------------------------------------------------
// Matrix exponential
// ---------------------------------------------------------------------------

/// Padé(13,13) coefficients (Higham 2005).
const PADE_COEFFS: [f64; 14] = [
    64_764_752_532_480_000.0,
    32_382_376_266_240_000.0,
    7_771_770_303_897_600.0,
    1_187_353_796_428_800.0,
    129_060_195_264_000.0,
    10_559_470_521_600.0,
    670_442_572_800.0,
    33_522_128_640.0,
    1_323_241_920.0,
    40_840_800.0,
    960_960.0,
    16_380.0,
    182.0,
    1.0,
];

/// Largest 1-norm for which Padé(13) needs no scaling.
const THETA_13: f64 = 5.371_920_351_148_152;

/// `exp(A)` by scaling and squaring with a Padé(13) approximant.
///
/// Non-finite input gives an all-NaN result.
pub fn expm(a: &CMatrix) -> CMatrix {
    let n = a.nrows();
    debug_assert!(a.is_square(), "expm requires a square matrix");
    match n {
        0 => return Array2::zeros((0, 0)),
        1 => return Array2::from_elem((1, 1), a[[0, 0]].exp()),
        _ => {}
    }

    let norm = one_norm(a);
    if !norm.is_finite() {
        return Array2::from_elem((n, n), Complex64::new(f64::NAN, f64::NAN));
    }
    let squarings = if norm > THETA_13 {
        (norm / THETA_13).log2().ceil() as i32
    } else {
        0
    };
    let scaled = a * c(0.5f64.powi(squarings));
    let mut result = pade13(&scaled);
    for _ in 0..squarings {
        result = result.dot(&result);
    }
    result
}

fn pade13(a: &CMatrix) -> CMatrix {
    let b = PADE_COEFFS;
    let eye = identity(a.nrows());
    let a2 = a.dot(a);
    let a4 = a2.dot(&a2);
    let a6 = a2.dot(&a4);

    let w1 = &a6 * c(b[13]) + &a4 * c(b[11]) + &a2 * c(b[9]);
    let w2 = &a6 * c(b[7]) + &a4 * c(b[5]) + &a2 * c(b[3]) + &eye * c(b[1]);
    let u = a.dot(&(a6.dot(&w1) + w2));

    let z1 = &a6 * c(b[12]) + &a4 * c(b[10]) + &a2 * c(b[8]);
    let z2 = &a6 * c(b[6]) + &a4 * c(b[4]) + &a2 * c(b[2]) + &eye * c(b[0]);
    let v = a6.dot(&z1) + z2;

    solve(&v - &u, &v + &u)
}

/// Solve `A·X = B` by Gaussian elimination with partial pivoting.
fn solve(a: CMatrix, b: CMatrix) -> CMatrix {
    let n = a.nrows();
    let m = b.ncols();
    let mut aug = Array2::zeros((n, n + m));
    aug.slice_mut(s![.., ..n]).assign(&a);
    aug.slice_mut(s![.., n..]).assign(&b);

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&x, &y| aug[[x, col]].norm().total_cmp(&aug[[y, col]].norm()))
            .unwrap_or(col);
        if pivot_row != col {
            for j in 0..n + m {
                aug.swap([col, j], [pivot_row, j]);
            }
        }
        let pivot = aug[[col, col]];
        if pivot.norm() == 0.0 {
            continue;
        }
        for row in col + 1..n {
            let factor = aug[[row, col]] / pivot;
            if factor == ZERO {
                continue;
            }
            for j in col..n + m {
                let v = aug[[col, j]];
                aug[[row, j]] -= factor * v;
            }
        }
    }

    let mut x = Array2::zeros((n, m));
    for row in (0..n).rev() {
        let pivot = aug[[row, row]];
        for j in 0..m {
            let mut sum = aug[[row, n + j]];
            for k in row + 1..n {
                sum -= aug[[row, k]] * x[[k, j]];
            }
            x[[row, j]] = sum / pivot;
        }
    }
    x
}

/// Maximum absolute column sum.
fn one_norm(a: &CMatrix) -> f64 {
    a.columns()
        .into_iter()
        .map(|col| col.iter().map(|v| v.norm()).sum::<f64>())
        .fold(0.0, f64::max)
}
