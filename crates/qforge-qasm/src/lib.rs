//! `OpenQASM` 2.0 parser and exporter for qforge.
//!
//! This crate turns circuit-description text into a [`qforge_ir::Circuit`]
//! and writes circuits back out as text.
//!
//! # Supported Features
//!
//! - `OPENQASM 2.0;` header (required, first statement)
//! - `qreg` / `creg` declarations, flattened in declaration order
//! - Gate macros (`gate name(params) qubits { ... }`), expanded inline
//! - Register broadcasting (`h q;`, `cx a, b;`, `measure q -> c;`)
//! - `measure`, `reset`, `barrier`
//! - Classical guards (`if (c == 1) x q[0];`)
//! - Parameter expressions with `pi`, `+ - * / ^`, and math functions
//! - Includes resolved per [`Dialect`]
//!
//! # Example
//!
//! ```rust
//! use qforge_qasm::{export, parse};
//!
//! let source = r#"
//! OPENQASM 2.0;
//! include "qelib1.inc";
//! qreg q[2];
//! creg c[2];
//! h q[0];
//! cx q[0], q[1];
//! measure q -> c;
//! "#;
//!
//! let circuit = parse(source).unwrap();
//! assert_eq!(circuit.num_qubits(), 2);
//! assert_eq!(circuit.len(), 4);
//!
//! let text = export(&circuit).unwrap();
//! assert!(text.starts_with("OPENQASM 2.0;"));
//! ```
//!
//! # Dialects
//!
//! ```rust
//! use qforge_qasm::{Dialect, ParseOptions, parse_with};
//!
//! let options = ParseOptions::default()
//!     .with_dialect(Dialect::ExternalOnly)
//!     .with_include("basis.inc", "gate x a { U(pi, 0, pi) a; }");
//! let circuit = parse_with(
//!     "OPENQASM 2.0;\ninclude \"basis.inc\";\nqreg q[1];\nx q[0];",
//!     &options,
//! )
//! .unwrap();
//! assert_eq!(circuit.instructions()[0].name(), "u");
//! ```

pub mod ast;
mod dialect;
mod emitter;
pub mod error;
mod lexer;
mod parser;

pub use dialect::{Dialect, ParseOptions, QELIB1, SUPPORTED_VERSIONS};
pub use emitter::export;
pub use error::{ExportError, ExportResult, ParseError, ParseResult, Position};
pub use parser::{MAX_MACRO_DEPTH, parse, parse_program, parse_with};
