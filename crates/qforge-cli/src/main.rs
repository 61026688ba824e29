//! qforge Command-Line Interface
//!
//! Parse, export and execute OpenQASM 2.0 circuits, and optimize control
//! pulses with GRAPE.
//!
//! ```text
//! qforge parse bell.qasm
//! qforge run teleport.qasm --shots 1000 --seed 7
//! qforge optimize hadamard.yaml --threads 4
//! ```

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use console::style;
use qforge_qasm::Dialect;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{export, optimize, parse, run, unitary, version};

/// qforge - circuit description and pulse optimization toolkit
#[derive(Parser)]
#[command(name = "qforge")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Gate-name resolution rules (qiskit, predefined-only, external-only)
    #[arg(long, default_value = "qiskit", global = true)]
    dialect: Dialect,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a circuit and print a summary
    Parse {
        /// Input file (OpenQASM 2.0)
        input: PathBuf,

        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a circuit and write it back as OpenQASM 2.0
    Export {
        /// Input file (OpenQASM 2.0)
        input: PathBuf,

        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Execute a circuit on the state-vector simulator
    Run {
        /// Input file (OpenQASM 2.0)
        input: PathBuf,

        /// Number of shots
        #[arg(short, long, default_value = "1024")]
        shots: usize,

        /// Seed for measurement sampling
        #[arg(long)]
        seed: Option<u64>,

        /// Always take the more probable measurement outcome
        #[arg(long, conflicts_with = "seed")]
        most_likely: bool,
    },

    /// Print the unitary a measurement-free circuit implements
    Unitary {
        /// Input file (OpenQASM 2.0)
        input: PathBuf,

        /// Decimal places to print
        #[arg(long, default_value = "4")]
        precision: usize,
    },

    /// Optimize control pulses for a YAML problem file
    Optimize {
        /// Problem file (YAML)
        problem: PathBuf,

        /// Print the result as JSON instead of the report
        #[arg(long)]
        json: bool,

        /// Worker threads for per-slot work (overrides the file)
        #[arg(long)]
        threads: Option<usize>,

        /// Initial pulse policy (random[:seed], zero, linear, sine, square, saw, triangle)
        #[arg(long)]
        init_pulse: Option<String>,

        /// Directory for initial/final amplitude dumps
        #[arg(long)]
        dump_dir: Option<PathBuf>,
    },

    /// Show version information
    Version,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over -v.
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let dialect = cli.dialect;
    let result = match cli.command {
        Commands::Parse { input, json } => parse::execute(&input, dialect, json),

        Commands::Export { input, output } => export::execute(&input, dialect, output.as_deref()),

        Commands::Run {
            input,
            shots,
            seed,
            most_likely,
        } => run::execute(&input, dialect, shots, seed, most_likely),

        Commands::Unitary { input, precision } => unitary::execute(&input, dialect, precision),

        Commands::Optimize {
            problem,
            json,
            threads,
            init_pulse,
            dump_dir,
        } => optimize::execute(&optimize::Options {
            problem,
            json,
            threads,
            init_pulse,
            dump_dir,
        }),

        Commands::Version => {
            version::execute();
            Ok(())
        }
    };

    // Handle errors
    if let Err(e) = result {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }

    Ok(())
}
