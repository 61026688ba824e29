//! Unitary command implementation.

use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use qforge_qasm::Dialect;
use qforge_sim::circuit_unitary;

use super::common::load_circuit;

/// Execute the unitary command.
pub fn execute(input: &Path, dialect: Dialect, precision: usize) -> Result<()> {
    let circuit = load_circuit(input, dialect)?;
    let u = circuit_unitary(&circuit).context("Circuit has no unitary")?;

    println!(
        "{} Unitary of {} ({}×{}, little-endian basis)",
        style("✓").green().bold(),
        style(input.display()).green(),
        u.nrows(),
        u.ncols()
    );
    for row in u.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|z| {
                let sign = if z.im < 0.0 { '-' } else { '+' };
                format!(
                    "{:>w$.p$}{sign}{:.p$}i",
                    z.re,
                    z.im.abs(),
                    w = precision + 3,
                    p = precision
                )
            })
            .collect();
        println!("  [{}]", cells.join("  "));
    }
    Ok(())
}
