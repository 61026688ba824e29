//! Run command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use qforge_qasm::Dialect;
use qforge_sim::{Executor, MeasurementMode};

use super::common::{load_circuit, print_histogram};

/// Execute the run command.
pub fn execute(
    input: &Path,
    dialect: Dialect,
    shots: usize,
    seed: Option<u64>,
    most_likely: bool,
) -> Result<()> {
    let circuit = load_circuit(input, dialect)?;
    let mode = if most_likely {
        MeasurementMode::MostLikely
    } else {
        MeasurementMode::Sample { seed }
    };

    println!(
        "{} Running {} ({} qubits, depth {}, {} shots)",
        style("→").cyan().bold(),
        style(input.display()).green(),
        circuit.num_qubits(),
        circuit.depth(),
        shots
    );

    let mut executor = Executor::new(mode);
    let counts = executor
        .run_shots(&circuit, shots)
        .context("Simulation failed")?;
    print_histogram(&counts);
    Ok(())
}
