//! Export command implementation.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;

use qforge_qasm::Dialect;

use super::common::load_circuit;

/// Execute the export command.
pub fn execute(input: &Path, dialect: Dialect, output: Option<&Path>) -> Result<()> {
    let circuit = load_circuit(input, dialect)?;
    let text = qforge_qasm::export(&circuit).context("Failed to export circuit")?;

    match output {
        Some(path) => {
            fs::write(path, &text)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            eprintln!(
                "{} Wrote {} ({} instructions)",
                style("✓").green().bold(),
                style(path.display()).green(),
                circuit.len()
            );
        }
        None => print!("{text}"),
    }
    Ok(())
}
