//! Parse command implementation.

use std::path::Path;

use anyhow::Result;
use console::style;
use serde::Serialize;

use qforge_ir::{Circuit, Register};
use qforge_qasm::Dialect;

use super::common::load_circuit;

/// Machine-readable circuit summary.
#[derive(Debug, Serialize)]
pub struct Summary {
    pub name: String,
    pub num_qubits: usize,
    pub num_clbits: usize,
    pub num_instructions: usize,
    pub depth: usize,
    pub has_measurements: bool,
    pub qregs: Vec<(String, u32)>,
    pub cregs: Vec<(String, u32)>,
    /// Operation counts sorted by name.
    pub ops: Vec<(String, usize)>,
}

impl Summary {
    pub fn of(circuit: &Circuit) -> Self {
        let mut ops: Vec<_> = circuit.count_ops().into_iter().collect();
        ops.sort();
        Self {
            name: circuit.name().to_string(),
            num_qubits: circuit.num_qubits(),
            num_clbits: circuit.num_clbits(),
            num_instructions: circuit.len(),
            depth: circuit.depth(),
            has_measurements: circuit.has_measurements(),
            qregs: sizes(circuit.layout().qregs()),
            cregs: sizes(circuit.layout().cregs()),
            ops,
        }
    }
}

fn sizes(registers: &[Register]) -> Vec<(String, u32)> {
    registers.iter().map(|r| (r.name.clone(), r.size)).collect()
}

/// Execute the parse command.
pub fn execute(input: &Path, dialect: Dialect, json: bool) -> Result<()> {
    let circuit = load_circuit(input, dialect)?;
    let summary = Summary::of(&circuit);

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!(
        "{} Parsed {} ({} dialect)",
        style("✓").green().bold(),
        style(input.display()).green(),
        dialect
    );
    println!("  Qubits:       {}", summary.num_qubits);
    println!("  Clbits:       {}", summary.num_clbits);
    println!("  Instructions: {}", summary.num_instructions);
    println!("  Depth:        {}", summary.depth);
    for (name, size) in &summary.qregs {
        println!("  qreg {}[{}]", style(name).cyan(), size);
    }
    for (name, size) in &summary.cregs {
        println!("  creg {}[{}]", style(name).cyan(), size);
    }
    if !summary.ops.is_empty() {
        println!("\n  Operations:");
        for (op, count) in &summary.ops {
            println!("    {:<10} {}", op, style(count).yellow());
        }
    }
    Ok(())
}
