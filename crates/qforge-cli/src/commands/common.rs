//! Shared helpers for CLI commands.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use console::style;
use tracing::debug;

use qforge_ir::Circuit;
use qforge_qasm::{Dialect, ParseOptions, QELIB1, parse_with};

/// Load a circuit from an OpenQASM 2.0 file.
///
/// Include files named in the source are read from the source file's
/// directory when they exist there, so local headers work without flags.
pub fn load_circuit(path: &Path, dialect: Dialect) -> Result<Circuit> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let source = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let mut options = ParseOptions::default().with_dialect(dialect);
    let mut pending = include_names(&source);
    while let Some(name) = pending.pop() {
        if options.includes.contains_key(&name) {
            continue;
        }
        let candidate = base.join(&name);
        if !candidate.is_file() {
            // qelib1.inc and missing headers are left to the dialect.
            continue;
        }
        if name == QELIB1 && dialect != Dialect::ExternalOnly {
            continue;
        }
        let body = fs::read_to_string(&candidate)
            .with_context(|| format!("Failed to read include: {}", candidate.display()))?;
        debug!(include = %name, path = %candidate.display(), "loaded include from disk");
        pending.extend(include_names(&body));
        options = options.with_include(name, body);
    }

    parse_with(&source, &options).with_context(|| format!("Failed to parse {}", path.display()))
}

/// File names appearing in `include "...";` statements.
fn include_names(source: &str) -> Vec<String> {
    source
        .split("include")
        .skip(1)
        .filter_map(|rest| {
            let rest = rest.trim_start().strip_prefix('"')?;
            let end = rest.find('"')?;
            Some(rest[..end].to_string())
        })
        .collect()
}

/// Print a shot histogram, most frequent outcome first.
pub fn print_histogram(counts: &BTreeMap<String, usize>) {
    let total: usize = counts.values().sum();
    let mut sorted: Vec<_> = counts.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));

    println!(
        "\n{} Results ({} shots):",
        style("✓").green().bold(),
        total
    );

    for (bitstring, count) in sorted.iter().take(16) {
        let prob = **count as f64 / total.max(1) as f64 * 100.0;
        let bar_len = (prob / 2.0).round() as usize;
        let bar: String = "█".repeat(bar_len);

        println!(
            "  {}: {:>6} ({:>5.2}%) {}",
            style(bitstring).cyan(),
            count,
            prob,
            style(bar).green()
        );
    }

    if sorted.len() > 16 {
        println!("  ... and {} more outcomes", sorted.len() - 16);
    }
}
