//! Version command implementation.

use console::style;

/// Execute the version command.
pub fn execute() {
    let version = env!("CARGO_PKG_VERSION");

    println!(
        "{} {} - circuit description and pulse optimization",
        style("qforge").cyan().bold(),
        style(format!("v{version}")).yellow()
    );
    println!();
    println!("Components:");
    println!("  qforge-ir     Circuit intermediate representation");
    println!("  qforge-qasm   OpenQASM 2.0 parser and exporter");
    println!("  qforge-sim    State-vector execution");
    println!("  qforge-grape  GRAPE pulse optimization");
    println!("  qforge-cli    Command-line interface");
    println!();
    println!(
        "Repository: {}",
        style(env!("CARGO_PKG_REPOSITORY")).underlined()
    );
    println!("License:    {}", style(env!("CARGO_PKG_LICENSE")).dim());
}
