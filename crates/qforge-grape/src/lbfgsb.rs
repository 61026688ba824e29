//! Limited-memory BFGS restricted to a box, with a projected Armijo search.
//!
//! The direction comes from the usual two-loop recursion over the last `m`
//! curvature pairs. Components pinned at an active bound are frozen, and
//! trial points are projected back into the box before evaluation.

use std::collections::VecDeque;

use crate::pulse::Bounds;

/// Sufficient-decrease constant.
const ARMIJO_C1: f64 = 1e-4;
/// Step shrink factor per backtrack.
const BACKTRACK: f64 = 0.5;
/// Backtracks before the line search gives up.
const MAX_BACKTRACKS: usize = 40;
/// Curvature pairs with `s·y` below this are skipped.
const CURVATURE_EPS: f64 = 1e-12;

/// One stored curvature pair.
#[derive(Debug, Clone)]
struct Pair {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean norm.
pub fn norm(v: &[f64]) -> f64 {
    dot(v, v).sqrt()
}

/// Clamp every component into the box.
pub fn project(x: &mut [f64], bounds: &Bounds) {
    for v in x {
        *v = bounds.project(*v);
    }
}

/// Whether each component may move along `−g` without leaving the box.
pub fn free_mask(x: &[f64], grad: &[f64], bounds: &Bounds) -> Vec<bool> {
    let (lo, hi) = (bounds.lower_or_inf(), bounds.upper_or_inf());
    x.iter()
        .zip(grad)
        .map(|(&xi, &gi)| !((xi <= lo && gi > 0.0) || (xi >= hi && gi < 0.0)))
        .collect()
}

/// Gradient with frozen components zeroed.
pub fn projected_gradient(x: &[f64], grad: &[f64], bounds: &Bounds) -> Vec<f64> {
    free_mask(x, grad, bounds)
        .into_iter()
        .zip(grad)
        .map(|(free, &g)| if free { g } else { 0.0 })
        .collect()
}

/// Quasi-Newton memory and direction computation.
#[derive(Debug, Clone)]
pub struct Lbfgsb {
    memory: usize,
    pairs: VecDeque<Pair>,
}

impl Lbfgsb {
    /// Keep at most `memory` pairs (at least one).
    pub fn new(memory: usize) -> Self {
        let memory = memory.max(1);
        Self {
            memory,
            pairs: VecDeque::with_capacity(memory),
        }
    }

    /// Whether any curvature information is stored.
    pub fn has_memory(&self) -> bool {
        !self.pairs.is_empty()
    }

    /// Forget all pairs; the next direction is steepest descent.
    pub fn reset(&mut self) {
        self.pairs.clear();
    }

    /// Record `s = x⁺ − x`, `y = g⁺ − g`. Returns false when the pair lacks
    /// positive curvature and was skipped.
    pub fn push(&mut self, s: Vec<f64>, y: Vec<f64>) -> bool {
        let sy = dot(&s, &y);
        if !sy.is_finite() || sy <= CURVATURE_EPS {
            return false;
        }
        if self.pairs.len() == self.memory {
            self.pairs.pop_front();
        }
        self.pairs.push_back(Pair { s, y, rho: 1.0 / sy });
        true
    }

    /// Search direction restricted to the free components.
    ///
    /// Falls back to the projected steepest descent when the quasi-Newton
    /// direction is not a descent direction, dropping the memory.
    pub fn direction(&mut self, grad: &[f64], free: &[bool]) -> Vec<f64> {
        let mut d = self.two_loop(grad);
        for (di, &f) in d.iter_mut().zip(free) {
            if !f {
                *di = 0.0;
            }
        }
        let slope = dot(grad, &d);
        if (slope >= 0.0 || slope.is_nan()) && self.has_memory() {
            tracing::debug!(slope, "quasi-Newton direction not descending, resetting memory");
            self.reset();
            return self.direction(grad, free);
        }
        d
    }

    fn two_loop(&self, grad: &[f64]) -> Vec<f64> {
        let mut q = grad.to_vec();
        let mut alpha = Vec::with_capacity(self.pairs.len());
        for pair in self.pairs.iter().rev() {
            let a = pair.rho * dot(&pair.s, &q);
            for (qi, yi) in q.iter_mut().zip(&pair.y) {
                *qi -= a * yi;
            }
            alpha.push(a);
        }

        let gamma = self
            .pairs
            .back()
            .map_or(1.0, |p| dot(&p.s, &p.y) / dot(&p.y, &p.y));
        for qi in q.iter_mut() {
            *qi *= gamma;
        }

        for (pair, a) in self.pairs.iter().zip(alpha.into_iter().rev()) {
            let b = pair.rho * dot(&pair.y, &q);
            for (qi, si) in q.iter_mut().zip(&pair.s) {
                *qi += (a - b) * si;
            }
        }

        q.iter_mut().for_each(|v| *v = -*v);
        q
    }
}

/// An accepted line-search step.
#[derive(Debug)]
pub struct Step<T> {
    /// New iterate, inside the box.
    pub x: Vec<f64>,
    /// Objective at `x`.
    pub f: f64,
    /// Whatever the objective returned alongside `f`.
    pub payload: T,
    /// Rejected trials before acceptance.
    pub backtracks: usize,
}

/// Why no step was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFailure {
    /// Not a descent direction at the start.
    NotDescent,
    /// No trial satisfied sufficient decrease.
    NoDecrease,
    /// Every evaluated trial was non-finite.
    NonFinite,
}

/// Projected backtracking from `x` along `d`.
///
/// Accepts the first projected trial `x⁺ = P(x + αd)` with
/// `f(x⁺) ≤ f + c₁ g·(x⁺ − x)`. Non-finite trials count as rejected, and
/// a search in which every trial was non-finite fails with
/// [`SearchFailure::NonFinite`].
pub fn line_search<T>(
    x: &[f64],
    f: f64,
    grad: &[f64],
    d: &[f64],
    initial_step: f64,
    bounds: &Bounds,
    mut objective: impl FnMut(&[f64]) -> (f64, T),
) -> Result<Step<T>, (SearchFailure, usize)> {
    let slope = dot(grad, d);
    if slope >= 0.0 || slope.is_nan() {
        return Err((SearchFailure::NotDescent, 0));
    }
    let mut alpha = initial_step;
    let (mut evaluated, mut finite) = (0usize, 0usize);
    for backtracks in 0..MAX_BACKTRACKS {
        let mut trial: Vec<f64> = x.iter().zip(d).map(|(xi, di)| xi + alpha * di).collect();
        project(&mut trial, bounds);
        let step: Vec<f64> = trial.iter().zip(x).map(|(t, xi)| t - xi).collect();
        let decrease = dot(grad, &step);
        if decrease < 0.0 {
            let (f_new, payload) = objective(&trial);
            evaluated += 1;
            if f_new.is_finite() {
                finite += 1;
            }
            if f_new.is_finite() && f_new <= f + ARMIJO_C1 * decrease {
                return Ok(Step {
                    x: trial,
                    f: f_new,
                    payload,
                    backtracks,
                });
            }
        }
        alpha *= BACKTRACK;
    }
    if evaluated > 0 && finite == 0 {
        return Err((SearchFailure::NonFinite, MAX_BACKTRACKS));
    }
    Err((SearchFailure::NoDecrease, MAX_BACKTRACKS))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Minimize `f(x) = Σ w_i (x_i − c_i)²` with the driver alone.
    fn minimize(bounds: Bounds, c: &[f64]) -> Vec<f64> {
        let w: Vec<f64> = (0..c.len()).map(|i| 1.0 + i as f64).collect();
        let obj = |x: &[f64]| -> (f64, Vec<f64>) {
            let f = x.iter().zip(c).zip(&w).map(|((xi, ci), wi)| wi * (xi - ci).powi(2)).sum();
            let g = x.iter().zip(c).zip(&w).map(|((xi, ci), wi)| 2.0 * wi * (xi - ci)).collect();
            (f, g)
        };
        let mut x = vec![0.0; c.len()];
        let (mut f, mut g) = obj(&x);
        let mut lb = Lbfgsb::new(5);
        for _ in 0..100 {
            if norm(&projected_gradient(&x, &g, &bounds)) < 1e-10 {
                break;
            }
            let d = lb.direction(&g, &free_mask(&x, &g, &bounds));
            let step = line_search(&x, f, &g, &d, 1.0, &bounds, obj).unwrap();
            let s = step.x.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y = step.payload.iter().zip(&g).map(|(a, b)| a - b).collect();
            lb.push(s, y);
            x = step.x;
            f = step.f;
            g = step.payload;
        }
        x
    }

    #[test]
    fn test_unconstrained_quadratic() {
        let x = minimize(Bounds::unbounded(), &[1.0, -2.0, 0.5]);
        for (xi, ci) in x.iter().zip([1.0, -2.0, 0.5]) {
            assert!((xi - ci).abs() < 1e-8);
        }
    }

    #[test]
    fn test_active_bounds() {
        let x = minimize(Bounds::new(-1.0, 1.0), &[3.0, -2.0, 0.25]);
        assert_eq!(x[0], 1.0);
        assert_eq!(x[1], -1.0);
        assert!((x[2] - 0.25).abs() < 1e-8);
    }

    #[test]
    fn test_memory_is_bounded() {
        let mut lb = Lbfgsb::new(2);
        for i in 1..5 {
            assert!(lb.push(vec![i as f64], vec![1.0]));
        }
        assert_eq!(lb.pairs.len(), 2);
        assert!(!lb.push(vec![1.0], vec![-1.0]));
    }

    #[test]
    fn test_not_descent_rejected() {
        let r = line_search(&[0.0], 0.0, &[1.0], &[1.0], 1.0, &Bounds::unbounded(), |_| {
            (0.0, ())
        });
        assert!(matches!(r, Err((SearchFailure::NotDescent, 0))));
    }

    #[test]
    fn test_all_non_finite_trials_reported() {
        let r = line_search(&[0.0], 1.0, &[1.0], &[-1.0], 1.0, &Bounds::unbounded(), |_| {
            (f64::NAN, ())
        });
        assert!(matches!(r, Err((SearchFailure::NonFinite, MAX_BACKTRACKS))));
    }

    #[test]
    fn test_some_finite_trials_mean_no_decrease() {
        // Finite only for tiny steps, and never lower.
        let r = line_search(&[0.0], 1.0, &[1.0], &[-1.0], 1.0, &Bounds::unbounded(), |x| {
            let f = if x[0].abs() < 1e-3 { 2.0 } else { f64::INFINITY };
            (f, ())
        });
        assert!(matches!(r, Err((SearchFailure::NoDecrease, _))));
    }

    #[test]
    fn test_projected_gradient_freezes_pinned() {
        let b = Bounds::new(0.0, 1.0);
        let pg = projected_gradient(&[0.0, 1.0, 0.5, 0.0], &[2.0, -3.0, 4.0, -1.0], &b);
        assert_eq!(pg, vec![0.0, 0.0, 4.0, -1.0]);
    }
}
