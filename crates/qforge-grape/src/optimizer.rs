//! The GRAPE driver: evaluate, step, check limits, repeat.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::OptimizerConfig;
use crate::controllability::{self, Controllability};
use crate::error::{GrapeError, GrapeResult};
use crate::fidelity::Evaluator;
use crate::lbfgsb::{
    Lbfgsb, SearchFailure, free_mask, line_search, norm, project, projected_gradient,
};
use crate::problem::GrapeProblem;
use crate::pulse::PulseSchedule;
use crate::result::{OptimResult, OptimState};
use crate::stats::Stats;

/// Runs GRAPE for one problem under one configuration.
pub struct GrapeOptimizer<'p> {
    problem: &'p GrapeProblem,
    config: OptimizerConfig,
}

impl<'p> GrapeOptimizer<'p> {
    /// Validate both inputs and build the optimizer.
    pub fn new(problem: &'p GrapeProblem, config: OptimizerConfig) -> GrapeResult<Self> {
        problem.validate()?;
        config.validate()?;
        Ok(Self { problem, config })
    }

    /// The configuration in use.
    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// The schedule the configured initial-pulse policy produces.
    pub fn initial_schedule(&self) -> PulseSchedule {
        self.config.init_pulse.generate(
            self.problem.num_slots(),
            self.problem.num_controls(),
            &self.config.bounds,
            self.config.pulse_scaling,
        )
    }

    /// Optimize from the configured initial pulse.
    pub fn run(&self, stats: Stats) -> GrapeResult<OptimResult> {
        self.run_from(self.initial_schedule(), stats)
    }

    /// Optimize from an explicit starting schedule.
    ///
    /// `stats` is extended with this run's timings and counters and returned
    /// inside the result.
    pub fn run_from(&self, initial: PulseSchedule, mut stats: Stats) -> GrapeResult<OptimResult> {
        let start = Instant::now();
        let p = self.problem;
        let cfg = &self.config;
        let (slots, ctrls) = (p.num_slots(), p.num_controls());
        if (initial.num_slots(), initial.num_controls()) != (slots, ctrls) {
            return Err(GrapeError::ScheduleMismatch {
                slots,
                controls: ctrls,
                got_slots: initial.num_slots(),
                got_controls: initial.num_controls(),
            });
        }

        let controllability = if cfg.check_controllability {
            let verdict = controllability::check(&p.drift, &p.controls);
            match verdict {
                Controllability::Uncontrollable { rank, full } => warn!(
                    rank,
                    full, "system is not fully controllable, target may be unreachable"
                ),
                Controllability::Skipped { dim } => {
                    debug!(dim, "controllability check skipped for large system")
                }
                _ => {}
            }
            verdict
        } else {
            Controllability::NotChecked
        };

        let evaluator = Evaluator::new(p, cfg.method, cfg.parallelism)?;
        let bounds = cfg.bounds;

        let mut x = initial.to_flat();
        project(&mut x, &bounds);
        let initial_amps = PulseSchedule::from_flat(slots, ctrls, x.clone())?;
        if let Some(dir) = &cfg.dump_dir {
            std::fs::create_dir_all(dir)?;
            initial_amps.write_tsv(dir.join("initial_amps.txt"))?;
        }

        info!(
            dim = p.dim(),
            slots,
            controls = ctrls,
            method = ?cfg.method,
            init_pulse = cfg.init_pulse.name(),
            "starting GRAPE"
        );

        let mut state = OptimState::Initialized;
        let mut fid = evaluator.fidelity(&x, &mut stats);
        let mut grad = evaluator.gradient(&fid, &mut stats);
        let (mut fid_calls, mut grad_calls) = (1, 1);
        let mut num_iter = 0;
        let mut grad_norm = f64::NAN;
        let mut lbfgs = Lbfgsb::new(cfg.lbfgs_memory);
        debug!(from = %state, fid_err = fid.fid_err, "initial schedule evaluated");
        state = OptimState::Iterating;

        while !state.is_terminal() {
            grad_norm = norm(&projected_gradient(&x, &grad, &bounds));
            let finite = fid.fid_err.is_finite() && grad.iter().all(|g| g.is_finite());
            if let Some(done) =
                self.termination(fid.fid_err, grad_norm, num_iter, start.elapsed(), finite)
            {
                state = done;
                continue;
            }

            let d = lbfgs.direction(&grad, &free_mask(&x, &grad, &bounds));
            let first_step = if lbfgs.has_memory() {
                1.0
            } else {
                (1.0 / norm(&d)).min(1.0)
            };
            let searched = line_search(&x, fid.fid_err, &grad, &d, first_step, &bounds, |trial| {
                fid_calls += 1;
                let eval = evaluator.fidelity(trial, &mut stats);
                (eval.fid_err, eval)
            });

            match searched {
                Ok(step) => {
                    stats.num_backtracks += step.backtracks;
                    let new_grad = evaluator.gradient(&step.payload, &mut stats);
                    grad_calls += 1;
                    if !new_grad.iter().all(|g| g.is_finite()) {
                        let cause = format!("non-finite gradient after iteration {num_iter}");
                        state = OptimState::Failed { cause };
                        continue;
                    }
                    let s = step.x.iter().zip(&x).map(|(a, b)| a - b).collect();
                    let y = new_grad.iter().zip(&grad).map(|(a, b)| a - b).collect();
                    if !lbfgs.push(s, y) {
                        debug!(iter = num_iter, "skipped update without positive curvature");
                    }
                    x = step.x;
                    fid = step.payload;
                    grad = new_grad;
                    num_iter += 1;
                    stats.num_iterations += 1;
                    debug!(
                        iter = num_iter,
                        fid_err = fid.fid_err,
                        backtracks = step.backtracks,
                        "GRAPE step"
                    );
                }
                Err((SearchFailure::NonFinite, backtracks)) => {
                    stats.num_backtracks += backtracks;
                    let cause =
                        format!("every line-search trial was non-finite at iteration {num_iter}");
                    state = OptimState::Failed { cause };
                }
                Err((failure, backtracks)) => {
                    stats.num_backtracks += backtracks;
                    if lbfgs.has_memory() {
                        debug!(?failure, "line search failed, retrying steepest descent");
                        lbfgs.reset();
                        continue;
                    }
                    debug!(?failure, grad_norm, "no decrease along steepest descent");
                    state = OptimState::LocalMinimum;
                }
            }
        }
        let termination = state;

        let final_amps = PulseSchedule::from_flat(slots, ctrls, x)?;
        if let Some(dir) = &cfg.dump_dir {
            final_amps.write_tsv(dir.join("final_amps.txt"))?;
        }

        let wall_time = start.elapsed();
        stats.wall_time_total += wall_time;
        info!(
            termination = %termination,
            fid_err = fid.fid_err,
            grad_norm,
            iterations = num_iter,
            wall_time_s = wall_time.as_secs_f64(),
            "GRAPE finished"
        );

        Ok(OptimResult {
            termination,
            fid_err: fid.fid_err,
            grad_norm,
            num_iter,
            num_fid_func_calls: fid_calls,
            num_grad_func_calls: grad_calls,
            wall_time,
            evo_full_final: fid.evolution().clone(),
            initial_amps,
            final_amps,
            controllability,
            stats,
        })
    }

    /// Limits in priority order; `None` keeps iterating.
    fn termination(
        &self,
        fid_err: f64,
        grad_norm: f64,
        num_iter: usize,
        elapsed: Duration,
        finite: bool,
    ) -> Option<OptimState> {
        let cfg = &self.config;
        if fid_err <= cfg.fid_err_targ {
            Some(OptimState::Converged)
        } else if elapsed >= cfg.wall_time_limit() {
            Some(OptimState::MaxWallTimeReached)
        } else if num_iter >= cfg.max_iter {
            Some(OptimState::MaxIterReached)
        } else if grad_norm <= cfg.min_grad {
            Some(OptimState::LocalMinimum)
        } else if !finite {
            Some(OptimState::Failed {
                cause: format!("non-finite fidelity error or gradient at iteration {num_iter}"),
            })
        } else {
            None
        }
    }
}

/// Optimize with a fresh [`Stats`] accumulator.
pub fn optimize(problem: &GrapeProblem, config: OptimizerConfig) -> GrapeResult<OptimResult> {
    GrapeOptimizer::new(problem, config)?.run(Stats::default())
}
