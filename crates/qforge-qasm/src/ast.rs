//! Abstract Syntax Tree for `OpenQASM` 2.

use qforge_ir::{MathFn, ParameterExpression};
use serde::{Deserialize, Serialize};

use crate::error::Position;

/// A complete QASM 2 program (or include fragment, which has no header).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Program {
    /// Version text exactly as written in the header, e.g. `"2.0"`.
    pub version: Option<String>,
    /// Statements in source order.
    pub statements: Vec<Statement>,
}

/// A statement and where it starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub kind: StatementKind,
    pub pos: Position,
}

/// A statement in a QASM 2 program.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum StatementKind {
    /// `include "name";`
    Include(String),

    /// `qreg name[size];`
    QReg { name: String, size: u32 },

    /// `creg name[size];`
    CReg { name: String, size: u32 },

    /// `gate name(params) qargs { body }`
    GateDef(GateDef),

    /// Gate application.
    Gate(GateCall),

    /// `measure q -> c;`
    Measure { qubit: Operand, bit: Operand },

    /// `reset q;`
    Reset { qubit: Operand },

    /// `barrier a, b;`
    Barrier { operands: Vec<Operand> },

    /// `if (creg == value) <gate application>`
    If {
        register: String,
        value: u64,
        call: GateCall,
    },
}

/// A gate macro definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateDef {
    pub name: String,
    /// Formal angle parameters.
    pub params: Vec<String>,
    /// Formal qubit arguments.
    pub qubits: Vec<String>,
    /// Body operations over the formals, in order.
    pub body: Vec<BodyOp>,
}

/// One operation inside a gate body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum BodyOp {
    /// Gate application over formal qubits.
    Gate(GateCall),
    /// Barrier over formal qubits.
    Barrier(Vec<Operand>),
}

/// A gate application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateCall {
    /// Gate name (`U` and `CX` for the built-ins).
    pub name: String,
    /// Parameter expressions.
    pub params: Vec<Expression>,
    /// Qubit operands.
    pub args: Vec<Operand>,
    pub pos: Position,
}

/// `name` (whole register or gate formal) or `name[index]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operand {
    pub register: String,
    pub index: Option<u64>,
    pub pos: Position,
}

/// Parameter expression syntax.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expression {
    Real(f64),
    Int(u64),
    Pi,
    /// Reference to a gate's formal parameter.
    Ident(String),
    Neg(Box<Expression>),
    BinOp {
        left: Box<Expression>,
        op: BinOp,
        right: Box<Expression>,
    },
    Call { func: MathFn, arg: Box<Expression> },
}

/// Binary operators in parameter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl Expression {
    /// Convert to the circuit model's expression type.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_parameter(&self) -> ParameterExpression {
        match self {
            Expression::Real(v) => ParameterExpression::Constant(*v),
            Expression::Int(v) => ParameterExpression::Constant(*v as f64),
            Expression::Pi => ParameterExpression::Pi,
            Expression::Ident(name) => ParameterExpression::Symbol(name.clone()),
            Expression::Neg(e) => ParameterExpression::Neg(Box::new(e.to_parameter())),
            Expression::BinOp { left, op, right } => {
                let l = Box::new(left.to_parameter());
                let r = Box::new(right.to_parameter());
                match op {
                    BinOp::Add => ParameterExpression::Add(l, r),
                    BinOp::Sub => ParameterExpression::Sub(l, r),
                    BinOp::Mul => ParameterExpression::Mul(l, r),
                    BinOp::Div => ParameterExpression::Div(l, r),
                    BinOp::Pow => ParameterExpression::Pow(l, r),
                }
            }
            Expression::Call { func, arg } => {
                ParameterExpression::Func(*func, Box::new(arg.to_parameter()))
            }
        }
    }

    /// Names of formal parameters referenced by the expression.
    pub fn identifiers(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_identifiers(&mut out);
        out
    }

    fn collect_identifiers<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::Ident(name) => out.push(name),
            Expression::Neg(e) | Expression::Call { arg: e, .. } => e.collect_identifiers(out),
            Expression::BinOp { left, right, .. } => {
                left.collect_identifiers(out);
                right.collect_identifiers(out);
            }
            Expression::Real(_) | Expression::Int(_) | Expression::Pi => {}
        }
    }
}
