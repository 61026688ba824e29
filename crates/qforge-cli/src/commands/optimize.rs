//! Optimize command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use qforge_grape::{
    GrapeOptimizer, GrapeProblem, InitialPulse, OptimState, Parallelism, Stats,
};

/// Command-line overrides for one optimization.
#[derive(Debug, Default)]
pub struct Options {
    pub problem: PathBuf,
    pub json: bool,
    pub threads: Option<usize>,
    pub init_pulse: Option<String>,
    pub dump_dir: Option<PathBuf>,
}

/// Execute the optimize command.
pub fn execute(opts: &Options) -> Result<()> {
    let (problem, config) = GrapeProblem::from_file(&opts.problem)
        .with_context(|| format!("Failed to load problem {}", opts.problem.display()))?;

    // Precedence: flags, then environment, then the file.
    let mut config = config.apply_env();
    if let Some(n) = opts.threads {
        config.parallelism = if n > 1 {
            Parallelism::Threads(n)
        } else {
            Parallelism::Sequential
        };
    }
    if let Some(policy) = &opts.init_pulse {
        config.init_pulse = policy.parse::<InitialPulse>()?;
    }
    if let Some(dir) = &opts.dump_dir {
        config.dump_dir = Some(dir.clone());
    }

    if !opts.json {
        println!(
            "{} Optimizing {} (d = {}, {} controls, {} slots, T = {})",
            style("→").cyan().bold(),
            style(opts.problem.display()).green(),
            problem.dim(),
            problem.num_controls(),
            problem.num_slots(),
            problem.grid.evo_time()
        );
    }

    let optimizer = GrapeOptimizer::new(&problem, config)?;

    let spinner = if opts.json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new_spinner()
    };
    spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    spinner.set_message(format!(
        "Running GRAPE from {} pulse...",
        optimizer.config().init_pulse.name()
    ));
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));

    let result = optimizer.run(Stats::default());
    spinner.finish_and_clear();
    let result = result.context("Optimization failed")?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let mark = match result.termination {
        OptimState::Converged => style("✓").green().bold(),
        OptimState::Failed { .. } => style("✗").red().bold(),
        _ => style("!").yellow().bold(),
    };
    println!("\n{mark} {}", style("Optimization finished").bold());
    for line in result.to_string().lines() {
        println!("  {line}");
    }
    if !result.controllability.is_ok() {
        println!(
            "  {} {:?}",
            style("Controllability:").yellow(),
            result.controllability
        );
    }
    if let Some(dir) = &optimizer.config().dump_dir {
        println!("  Amplitudes written to {}", style(dir.display()).cyan());
    }
    println!("\n{}", result.stats);
    Ok(())
}
