//! Per-run timing and call counters.

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Accumulated statistics of one optimization.
///
/// Passed into the optimizer and handed back inside the result, so several
/// runs can share one accumulator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    /// Building slot Hamiltonians and propagators.
    pub wall_time_propagators: Duration,
    /// Forward chain and overlap.
    pub wall_time_fidelity: Duration,
    /// Backward chain, derivatives and gradient assembly.
    pub wall_time_gradient: Duration,
    /// Whole run, including setup.
    pub wall_time_total: Duration,
    /// Accepted optimizer steps.
    pub num_iterations: usize,
    /// Fidelity evaluations, trial points included.
    pub num_fidelity_computes: usize,
    /// Gradient evaluations.
    pub num_gradient_computes: usize,
    /// Individual slot propagators built.
    pub num_propagator_computes: usize,
    /// Rejected line-search trial steps.
    pub num_backtracks: usize,
}

impl Stats {
    /// Run `f` and add its wall time to `slot`.
    pub fn time<T>(slot: &mut Duration, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        *slot += start.elapsed();
        out
    }

    /// Time not attributed to any tracked phase.
    pub fn wall_time_overhead(&self) -> Duration {
        self.wall_time_total.saturating_sub(
            self.wall_time_propagators + self.wall_time_fidelity + self.wall_time_gradient,
        )
    }

    fn percent(&self, part: Duration) -> f64 {
        let total = self.wall_time_total.as_secs_f64();
        if total > 0.0 {
            100.0 * part.as_secs_f64() / total
        } else {
            0.0
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "------------------------------------")?;
        writeln!(f, "---- Control optimization stats ----")?;
        writeln!(f, "**** Timings (HH:MM:SS.US) ****")?;
        writeln!(f, "Total wall time elapsed      {}", hms(self.wall_time_total))?;
        let phases = [
            ("Computing propagators", self.wall_time_propagators),
            ("Computing fidelity", self.wall_time_fidelity),
            ("Computing gradient", self.wall_time_gradient),
            ("Optimizer overhead", self.wall_time_overhead()),
        ];
        for (label, d) in phases {
            writeln!(
                f,
                "{label:<28} {} ({:.2}%)",
                hms(d),
                self.percent(d)
            )?;
        }
        writeln!(f, "**** Iterations and function calls ****")?;
        writeln!(f, "Number of iterations         {}", self.num_iterations)?;
        writeln!(f, "Number of fidelity computes  {}", self.num_fidelity_computes)?;
        writeln!(f, "Number of gradient computes  {}", self.num_gradient_computes)?;
        writeln!(f, "Number of propagators built  {}", self.num_propagator_computes)?;
        writeln!(f, "Number of line-search backtracks {}", self.num_backtracks)?;
        if self.num_iterations > 0 {
            let per_iter = self.wall_time_total / self.num_iterations as u32;
            writeln!(f, "Mean wall time per iteration {}", hms(per_iter))?;
        }
        write!(f, "------------------------------------")
    }
}

fn hms(d: Duration) -> String {
    let secs = d.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:06}",
        secs / 3600,
        (secs / 60) % 60,
        secs % 60,
        d.subsec_micros()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hms() {
        assert_eq!(hms(Duration::from_micros(3_723_000_042)), "01:02:03.000042");
    }

    #[test]
    fn test_report_lists_phases() {
        let stats = Stats {
            wall_time_propagators: Duration::from_millis(500),
            wall_time_total: Duration::from_secs(1),
            num_iterations: 4,
            ..Default::default()
        };
        let report = stats.to_string();
        assert!(report.contains("Computing propagators"));
        assert!(report.contains("(50.00%)"));
        assert!(report.contains("Number of iterations         4"));
        assert_eq!(stats.wall_time_overhead(), Duration::from_millis(500));
    }

    #[test]
    fn test_time_accumulates() {
        let mut slot = Duration::ZERO;
        let v = Stats::time(&mut slot, || 7);
        Stats::time(&mut slot, || ());
        assert_eq!(v, 7);
        assert!(slot >= Duration::ZERO);
    }
}
