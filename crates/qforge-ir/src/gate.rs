//! Quantum gate types.
//!
//! Gate kinds form a closed enumeration: every consumer (executor, exporter)
//! matches on [`GateKind`] exhaustively, so adding a kind is a compile error
//! everywhere it is not yet handled.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::instruction::{Instruction, InstructionKind};
use crate::parameter::ParameterExpression;
use crate::qubit::ClbitId;

/// Standard gates with known semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StandardGate {
    // Single-qubit Pauli gates
    /// Identity gate.
    I,
    /// Pauli-X gate.
    X,
    /// Pauli-Y gate.
    Y,
    /// Pauli-Z gate.
    Z,

    // Single-qubit Clifford gates
    /// Hadamard gate.
    H,
    /// S gate (sqrt(Z)).
    S,
    /// S-dagger gate.
    Sdg,
    /// T gate (fourth root of Z).
    T,
    /// T-dagger gate.
    Tdg,
    /// sqrt(X) gate.
    SX,
    /// sqrt(X)-dagger gate.
    SXdg,

    // Single-qubit rotation gates
    /// Rotation around X axis.
    Rx(ParameterExpression),
    /// Rotation around Y axis.
    Ry(ParameterExpression),
    /// Rotation around Z axis.
    Rz(ParameterExpression),
    /// Phase gate.
    P(ParameterExpression),
    /// Universal single-qubit gate U(θ, φ, λ).
    U(
        ParameterExpression,
        ParameterExpression,
        ParameterExpression,
    ),

    // Two-qubit gates
    /// Controlled-X (CNOT) gate.
    CX,
    /// Controlled-Y gate.
    CY,
    /// Controlled-Z gate.
    CZ,
    /// Controlled-Hadamard gate.
    CH,
    /// SWAP gate.
    Swap,
    /// iSWAP gate.
    ISwap,
    /// Controlled rotation around X.
    CRx(ParameterExpression),
    /// Controlled rotation around Y.
    CRy(ParameterExpression),
    /// Controlled rotation around Z.
    CRz(ParameterExpression),
    /// Controlled phase gate.
    CP(ParameterExpression),
    /// XX rotation gate.
    RXX(ParameterExpression),
    /// ZZ rotation gate.
    RZZ(ParameterExpression),

    // Three-qubit gates
    /// Toffoli gate (CCX).
    CCX,
    /// Fredkin gate (CSWAP).
    CSwap,
}

impl StandardGate {
    /// Get the name of this gate.
    #[inline]
    pub fn name(&self) -> &'static str {
        match self {
            StandardGate::I => "id",
            StandardGate::X => "x",
            StandardGate::Y => "y",
            StandardGate::Z => "z",
            StandardGate::H => "h",
            StandardGate::S => "s",
            StandardGate::Sdg => "sdg",
            StandardGate::T => "t",
            StandardGate::Tdg => "tdg",
            StandardGate::SX => "sx",
            StandardGate::SXdg => "sxdg",
            StandardGate::Rx(_) => "rx",
            StandardGate::Ry(_) => "ry",
            StandardGate::Rz(_) => "rz",
            StandardGate::P(_) => "p",
            StandardGate::U(_, _, _) => "u",
            StandardGate::CX => "cx",
            StandardGate::CY => "cy",
            StandardGate::CZ => "cz",
            StandardGate::CH => "ch",
            StandardGate::Swap => "swap",
            StandardGate::ISwap => "iswap",
            StandardGate::CRx(_) => "crx",
            StandardGate::CRy(_) => "cry",
            StandardGate::CRz(_) => "crz",
            StandardGate::CP(_) => "cp",
            StandardGate::RXX(_) => "rxx",
            StandardGate::RZZ(_) => "rzz",
            StandardGate::CCX => "ccx",
            StandardGate::CSwap => "cswap",
        }
    }

    /// Get the number of qubits this gate operates on.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            StandardGate::I
            | StandardGate::X
            | StandardGate::Y
            | StandardGate::Z
            | StandardGate::H
            | StandardGate::S
            | StandardGate::Sdg
            | StandardGate::T
            | StandardGate::Tdg
            | StandardGate::SX
            | StandardGate::SXdg
            | StandardGate::Rx(_)
            | StandardGate::Ry(_)
            | StandardGate::Rz(_)
            | StandardGate::P(_)
            | StandardGate::U(_, _, _) => 1,

            StandardGate::CX
            | StandardGate::CY
            | StandardGate::CZ
            | StandardGate::CH
            | StandardGate::Swap
            | StandardGate::ISwap
            | StandardGate::CRx(_)
            | StandardGate::CRy(_)
            | StandardGate::CRz(_)
            | StandardGate::CP(_)
            | StandardGate::RXX(_)
            | StandardGate::RZZ(_) => 2,

            StandardGate::CCX | StandardGate::CSwap => 3,
        }
    }

    /// Check if any parameter is still symbolic.
    pub fn is_parameterized(&self) -> bool {
        self.parameters().iter().any(|p| p.is_symbolic())
    }

    /// Get parameters of this gate.
    pub fn parameters(&self) -> Vec<&ParameterExpression> {
        match self {
            StandardGate::Rx(p)
            | StandardGate::Ry(p)
            | StandardGate::Rz(p)
            | StandardGate::P(p)
            | StandardGate::CRx(p)
            | StandardGate::CRy(p)
            | StandardGate::CRz(p)
            | StandardGate::CP(p)
            | StandardGate::RXX(p)
            | StandardGate::RZZ(p) => vec![p],

            StandardGate::U(a, b, c) => vec![a, b, c],

            _ => vec![],
        }
    }

    /// Bind symbols in every parameter, returning a new gate.
    #[must_use]
    pub fn bind(&self, name: &str, value: f64) -> Self {
        let b = |p: &ParameterExpression| p.bind(name, value);
        match self {
            StandardGate::Rx(p) => StandardGate::Rx(b(p)),
            StandardGate::Ry(p) => StandardGate::Ry(b(p)),
            StandardGate::Rz(p) => StandardGate::Rz(b(p)),
            StandardGate::P(p) => StandardGate::P(b(p)),
            StandardGate::U(x, y, z) => StandardGate::U(b(x), b(y), b(z)),
            StandardGate::CRx(p) => StandardGate::CRx(b(p)),
            StandardGate::CRy(p) => StandardGate::CRy(b(p)),
            StandardGate::CRz(p) => StandardGate::CRz(b(p)),
            StandardGate::CP(p) => StandardGate::CP(b(p)),
            StandardGate::RXX(p) => StandardGate::RXX(b(p)),
            StandardGate::RZZ(p) => StandardGate::RZZ(b(p)),
            other => other.clone(),
        }
    }
}

/// A user-defined gate kept as a unit, with its body already expanded
/// into instructions over local qubits `0..num_qubits`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeGate {
    /// The name of the gate.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    /// Parameter values the body was instantiated with.
    pub params: Vec<ParameterExpression>,
    body: Vec<Instruction>,
}

impl CompositeGate {
    /// Create a composite gate from an expanded body.
    ///
    /// The body may only contain unconditioned gates whose operands are local
    /// qubit indices below `num_qubits`.
    pub fn new(
        name: impl Into<String>,
        num_qubits: u32,
        params: Vec<ParameterExpression>,
        body: Vec<Instruction>,
    ) -> IrResult<Self> {
        let name = name.into();
        let invalid = |reason: String| IrError::InvalidComposite {
            name: name.clone(),
            reason,
        };
        for inst in &body {
            let InstructionKind::Gate(gate) = &inst.kind else {
                return Err(invalid("only gate applications are allowed".into()));
            };
            if gate.condition.is_some() {
                return Err(invalid("body gates cannot be conditioned".into()));
            }
            if gate.num_qubits() as usize != inst.qubits.len() {
                return Err(invalid(format!(
                    "'{}' applied to {} qubits",
                    gate.name(),
                    inst.qubits.len()
                )));
            }
            if let Some(q) = inst.qubits.iter().find(|q| q.0 >= num_qubits) {
                return Err(invalid(format!("local qubit {} out of range", q.0)));
            }
        }
        Ok(Self {
            name,
            num_qubits,
            params,
            body,
        })
    }

    /// The expanded body over local qubits.
    pub fn body(&self) -> &[Instruction] {
        &self.body
    }
}

/// A single-qubit base gate with `num_controls` additional control qubits.
///
/// Operands are the controls first, then the target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlledGate {
    /// The gate applied to the target when every control is |1⟩.
    pub base: StandardGate,
    /// Number of control qubits.
    pub num_controls: u32,
}

impl ControlledGate {
    /// Create a controlled gate. The base must be a single-qubit gate.
    pub fn new(base: StandardGate, num_controls: u32) -> IrResult<Self> {
        if base.num_qubits() != 1 {
            return Err(IrError::InvalidControlledBase(base.name().to_string()));
        }
        Ok(Self { base, num_controls })
    }

    /// Name in the `c…c<base>` convention, e.g. `cch` for two controls on H.
    pub fn name(&self) -> String {
        format!("{}{}", "c".repeat(self.num_controls as usize), self.base.name())
    }
}

/// A gate given by an explicit unitary matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitaryGate {
    /// The name of the gate.
    pub name: String,
    /// The number of qubits it operates on.
    pub num_qubits: u32,
    matrix: Vec<Complex64>,
}

impl UnitaryGate {
    /// Create a unitary gate from a row-major `2^n × 2^n` matrix.
    ///
    /// Row and column indices use operand 0 as the most significant bit.
    pub fn new(name: impl Into<String>, num_qubits: u32, matrix: Vec<Complex64>) -> IrResult<Self> {
        let name = name.into();
        let dim = 1usize << num_qubits;
        if matrix.len() != dim * dim {
            return Err(IrError::MatrixDimension {
                name,
                expected: dim * dim,
                got: matrix.len(),
            });
        }
        Ok(Self {
            name,
            num_qubits,
            matrix,
        })
    }

    /// Row-major matrix entries.
    pub fn matrix(&self) -> &[Complex64] {
        &self.matrix
    }
}

/// The kind of a gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GateKind {
    /// A standard gate with known semantics.
    Standard(StandardGate),
    /// A named macro with an expanded body.
    Composite(CompositeGate),
    /// A multi-controlled single-qubit gate.
    Controlled(ControlledGate),
    /// An explicit unitary matrix.
    Unitary(UnitaryGate),
}

impl GateKind {
    /// Get the name of this gate.
    pub fn name(&self) -> String {
        match self {
            GateKind::Standard(g) => g.name().to_string(),
            GateKind::Composite(g) => g.name.clone(),
            GateKind::Controlled(g) => g.name(),
            GateKind::Unitary(g) => g.name.clone(),
        }
    }

    /// Get the number of qubits.
    #[inline]
    pub fn num_qubits(&self) -> u32 {
        match self {
            GateKind::Standard(g) => g.num_qubits(),
            GateKind::Composite(g) => g.num_qubits,
            GateKind::Controlled(g) => g.num_controls + 1,
            GateKind::Unitary(g) => g.num_qubits,
        }
    }
}

/// Classical condition for conditional gates: `if (register == value)`.
///
/// The register's flat bit indices are captured when the condition is built,
/// bit 0 of the register being the least significant bit of `value`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassicalCondition {
    /// The name of the classical register.
    pub register: String,
    /// Flat indices of the register's bits, least significant first.
    pub clbits: Vec<ClbitId>,
    /// The value to compare against.
    pub value: u64,
}

impl ClassicalCondition {
    /// Create a new classical condition.
    pub fn new(register: impl Into<String>, clbits: Vec<ClbitId>, value: u64) -> Self {
        Self {
            register: register.into(),
            clbits,
            value,
        }
    }

    /// Evaluate against the current classical bit values.
    pub fn is_satisfied(&self, bits: &[bool]) -> bool {
        let mut reg = 0u64;
        for (i, c) in self.clbits.iter().enumerate() {
            if bits.get(c.index()).copied().unwrap_or(false) {
                if i >= 64 {
                    return false;
                }
                reg |= 1 << i;
            }
        }
        reg == self.value
    }
}

/// A gate with an optional classical condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    /// The kind of gate.
    pub kind: GateKind,
    /// Optional classical condition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condition: Option<ClassicalCondition>,
}

impl Gate {
    /// Create a new gate from a standard gate.
    pub fn standard(gate: StandardGate) -> Self {
        Self::from_kind(GateKind::Standard(gate))
    }

    /// Wrap any gate kind.
    pub fn from_kind(kind: GateKind) -> Self {
        Self {
            kind,
            condition: None,
        }
    }

    /// Add a classical condition to the gate.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Get the name of this gate.
    pub fn name(&self) -> String {
        self.kind.name()
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> u32 {
        self.kind.num_qubits()
    }
}

impl From<StandardGate> for Gate {
    fn from(gate: StandardGate) -> Self {
        Gate::standard(gate)
    }
}

impl From<CompositeGate> for Gate {
    fn from(gate: CompositeGate) -> Self {
        Gate::from_kind(GateKind::Composite(gate))
    }
}

impl From<ControlledGate> for Gate {
    fn from(gate: ControlledGate) -> Self {
        Gate::from_kind(GateKind::Controlled(gate))
    }
}

impl From<UnitaryGate> for Gate {
    fn from(gate: UnitaryGate) -> Self {
        Gate::from_kind(GateKind::Unitary(gate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubit::QubitId;
    use std::f64::consts::PI;

    #[test]
    fn test_standard_gate_properties() {
        assert_eq!(StandardGate::H.num_qubits(), 1);
        assert_eq!(StandardGate::CX.num_qubits(), 2);
        assert_eq!(StandardGate::CCX.num_qubits(), 3);

        assert!(!StandardGate::H.is_parameterized());
        assert!(!StandardGate::Rx(ParameterExpression::constant(PI)).is_parameterized());
        assert!(StandardGate::Rx(ParameterExpression::symbol("theta")).is_parameterized());
    }

    #[test]
    fn test_bind_gate() {
        let g = StandardGate::U(
            ParameterExpression::symbol("a"),
            0.0.into(),
            ParameterExpression::symbol("a"),
        );
        assert!(!g.bind("a", 1.0).is_parameterized());
    }

    #[test]
    fn test_composite_rejects_out_of_range() {
        let body = vec![Instruction::gate(StandardGate::CX, [QubitId(0), QubitId(2)])];
        let err = CompositeGate::new("bad", 2, vec![], body).unwrap_err();
        assert!(matches!(err, IrError::InvalidComposite { .. }));
    }

    #[test]
    fn test_controlled_naming() {
        let g = ControlledGate::new(StandardGate::Z, 2).unwrap();
        assert_eq!(g.name(), "ccz");
        assert_eq!(GateKind::Controlled(g).num_qubits(), 3);
        assert!(ControlledGate::new(StandardGate::CX, 1).is_err());
    }

    #[test]
    fn test_unitary_dimension_checked() {
        let err = UnitaryGate::new("u", 1, vec![Complex64::new(1.0, 0.0); 3]).unwrap_err();
        assert!(matches!(err, IrError::MatrixDimension { expected: 4, .. }));
    }

    #[test]
    fn test_condition_value() {
        let cond = ClassicalCondition::new("c", vec![ClbitId(1), ClbitId(2)], 2);
        assert!(cond.is_satisfied(&[true, false, true]));
        assert!(!cond.is_satisfied(&[false, true, false]));
    }
}
