//! Parse options, dialects, and the standard gate library.

use std::f64::consts::FRAC_PI_2;
use std::fmt;
use std::str::FromStr;

use qforge_ir::{ParameterExpression, StandardGate};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// Grammar versions this crate can parse.
pub const SUPPORTED_VERSIONS: &[&str] = &["2.0"];

/// The standard library header every QASM 2 toolchain knows.
pub const QELIB1: &str = "qelib1.inc";

/// How gate names and includes are resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Dialect {
    /// Standard library names are always available; `qelib1.inc` maps onto
    /// them, other includes come from [`ParseOptions::includes`].
    #[default]
    Qiskit,
    /// Standard library names are always available; known headers are
    /// accepted and ignored.
    PredefinedOnly,
    /// Only `U` and `CX` are built in; every include body must be supplied
    /// by the caller.
    ExternalOnly,
}

impl Dialect {
    /// Whether the standard library names resolve without any include.
    pub fn has_stdlib(self) -> bool {
        !matches!(self, Dialect::ExternalOnly)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dialect::Qiskit => "qiskit",
            Dialect::PredefinedOnly => "predefined-only",
            Dialect::ExternalOnly => "external-only",
        };
        f.write_str(name)
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "qiskit" => Ok(Dialect::Qiskit),
            "predefined" | "predefined-only" => Ok(Dialect::PredefinedOnly),
            "external" | "external-only" => Ok(Dialect::ExternalOnly),
            other => Err(format!(
                "unknown dialect '{other}' (expected qiskit, predefined-only or external-only)"
            )),
        }
    }
}

/// Options for [`parse_with`](crate::parse_with).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParseOptions {
    /// Name resolution rules.
    pub dialect: Dialect,
    /// Grammar version the source must declare.
    pub version: String,
    /// Include bodies keyed by the name used in `include "...";`.
    pub includes: FxHashMap<String, String>,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Qiskit,
            version: "2.0".into(),
            includes: FxHashMap::default(),
        }
    }
}

impl ParseOptions {
    /// Set the expected grammar version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the dialect.
    #[must_use]
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    /// Supply the body of an include file.
    #[must_use]
    pub fn with_include(mut self, name: impl Into<String>, source: impl Into<String>) -> Self {
        self.includes.insert(name.into(), source.into());
        self
    }
}

/// Shape of a built-in gate: qubit and parameter counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Builtin {
    pub(crate) num_qubits: usize,
    pub(crate) num_params: usize,
}

const fn builtin(num_qubits: usize, num_params: usize) -> Builtin {
    Builtin {
        num_qubits,
        num_params,
    }
}

/// Look up a built-in gate by name under `dialect`.
pub(crate) fn lookup_builtin(name: &str, dialect: Dialect) -> Option<Builtin> {
    match name {
        "U" => return Some(builtin(1, 3)),
        "CX" => return Some(builtin(2, 0)),
        _ => {}
    }
    if !dialect.has_stdlib() {
        return None;
    }
    let shape = match name {
        "id" | "x" | "y" | "z" | "h" | "s" | "sdg" | "t" | "tdg" | "sx" | "sxdg" => builtin(1, 0),
        "rx" | "ry" | "rz" | "p" | "u1" => builtin(1, 1),
        "u2" => builtin(1, 2),
        "u3" | "u" => builtin(1, 3),
        "cx" | "cy" | "cz" | "ch" | "swap" => builtin(2, 0),
        "crx" | "cry" | "crz" | "cp" | "cu1" | "rxx" | "rzz" => builtin(2, 1),
        "ccx" | "cswap" => builtin(3, 0),
        _ => return None,
    };
    Some(shape)
}

/// Build the standard gate for a built-in name from evaluated parameters.
///
/// `params` must already have the length reported by [`lookup_builtin`].
pub(crate) fn standard_gate(name: &str, params: &[f64]) -> Option<StandardGate> {
    let p = |i: usize| params.get(i).copied().map(ParameterExpression::Constant);
    let gate = match name {
        "U" | "u3" | "u" => StandardGate::U(p(0)?, p(1)?, p(2)?),
        "u2" => StandardGate::U(ParameterExpression::Constant(FRAC_PI_2), p(0)?, p(1)?),
        "u1" | "p" => StandardGate::P(p(0)?),
        "CX" | "cx" => StandardGate::CX,
        "id" => StandardGate::I,
        "x" => StandardGate::X,
        "y" => StandardGate::Y,
        "z" => StandardGate::Z,
        "h" => StandardGate::H,
        "s" => StandardGate::S,
        "sdg" => StandardGate::Sdg,
        "t" => StandardGate::T,
        "tdg" => StandardGate::Tdg,
        "sx" => StandardGate::SX,
        "sxdg" => StandardGate::SXdg,
        "rx" => StandardGate::Rx(p(0)?),
        "ry" => StandardGate::Ry(p(0)?),
        "rz" => StandardGate::Rz(p(0)?),
        "cy" => StandardGate::CY,
        "cz" => StandardGate::CZ,
        "ch" => StandardGate::CH,
        "swap" => StandardGate::Swap,
        "crx" => StandardGate::CRx(p(0)?),
        "cry" => StandardGate::CRy(p(0)?),
        "crz" => StandardGate::CRz(p(0)?),
        "cp" | "cu1" => StandardGate::CP(p(0)?),
        "rxx" => StandardGate::RXX(p(0)?),
        "rzz" => StandardGate::RZZ(p(0)?),
        "ccx" => StandardGate::CCX,
        "cswap" => StandardGate::CSwap,
        _ => return None,
    };
    Some(gate)
}

/// Whether `name` is a standard library gate name (independent of dialect).
pub(crate) fn is_stdlib_name(name: &str) -> bool {
    lookup_builtin(name, Dialect::Qiskit).is_some()
}
