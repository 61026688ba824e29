//! AST-to-Circuit lowering for QASM 2.
//!
//! Registers are projected onto the circuit's flat index space as they are
//! declared, gate macros are recorded and expanded inline at each
//! application site, and classical guards are attached to every gate an
//! application produces.

use std::rc::Rc;

use qforge_ir::{
    Circuit, ClassicalCondition, ClbitId, Gate, Instruction, IrError, QubitId, Register,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use super::parse_fragment;
use crate::ast::{BodyOp, Expression, GateCall, GateDef, Operand, Program, Statement, StatementKind};
use crate::dialect::{Dialect, ParseOptions, QELIB1, lookup_builtin, standard_gate};
use crate::error::{ParseError, ParseResult, Position};

/// Maximum nesting of macro applications during expansion.
pub const MAX_MACRO_DEPTH: usize = 64;

/// Lower an AST Program to a Circuit.
pub(super) fn lower_to_circuit(program: &Program, options: &ParseOptions) -> ParseResult<Circuit> {
    let mut lowerer = Lowerer::new(options);
    lowerer.lower_program(program)?;
    Ok(lowerer.circuit)
}

/// Lowers AST to Circuit.
struct Lowerer<'o> {
    options: &'o ParseOptions,
    circuit: Circuit,
    /// Gate macros by name.
    macros: FxHashMap<String, Rc<GateDef>>,
    /// Includes currently being processed, outermost first.
    include_stack: Vec<String>,
}

/// Resolved qubit operand: one flat qubit, or a whole register.
enum QubitArg {
    Single(QubitId),
    Register(Vec<QubitId>),
}

impl QubitArg {
    fn get(&self, i: usize) -> QubitId {
        match self {
            QubitArg::Single(q) => *q,
            QubitArg::Register(qs) => qs[i],
        }
    }

    fn into_flat(self) -> Vec<QubitId> {
        match self {
            QubitArg::Single(q) => vec![q],
            QubitArg::Register(qs) => qs,
        }
    }
}

/// Resolved classical operand.
enum ClbitArg {
    Single(ClbitId),
    Register(Vec<ClbitId>),
}

fn circuit_error(at: Position) -> impl FnOnce(IrError) -> ParseError {
    move |source| ParseError::Circuit { source, at }
}

impl<'o> Lowerer<'o> {
    fn new(options: &'o ParseOptions) -> Self {
        Self {
            options,
            circuit: Circuit::new("qasm_circuit"),
            macros: FxHashMap::default(),
            include_stack: Vec::new(),
        }
    }

    fn lower_program(&mut self, program: &Program) -> ParseResult<()> {
        for stmt in &program.statements {
            self.lower_statement(stmt)?;
        }
        Ok(())
    }

    fn lower_statement(&mut self, stmt: &Statement) -> ParseResult<()> {
        let at = stmt.pos;
        match &stmt.kind {
            StatementKind::Include(name) => self.lower_include(name, at),

            StatementKind::QReg { name, size } => {
                self.check_fresh_register(name, at)?;
                self.circuit
                    .add_qreg(name.as_str(), *size)
                    .map_err(circuit_error(at))?;
                Ok(())
            }

            StatementKind::CReg { name, size } => {
                self.check_fresh_register(name, at)?;
                self.circuit
                    .add_creg(name.as_str(), *size)
                    .map_err(circuit_error(at))?;
                Ok(())
            }

            StatementKind::GateDef(def) => self.define_macro(def, at),

            StatementKind::Gate(call) => self.lower_gate_call(call, None),

            StatementKind::If {
                register,
                value,
                call,
            } => {
                let condition = self.circuit.condition(register, *value).map_err(|e| match e {
                    IrError::UnknownRegister(name) => ParseError::UndefinedRegister { name, at },
                    source => ParseError::Circuit { source, at },
                })?;
                self.lower_gate_call(call, Some(&condition))
            }

            StatementKind::Measure { qubit, bit } => self.lower_measure(qubit, bit, at),

            StatementKind::Reset { qubit } => {
                for q in self.resolve_qubit_arg(qubit)?.into_flat() {
                    self.circuit.reset(q).map_err(circuit_error(at))?;
                }
                Ok(())
            }

            StatementKind::Barrier { operands } => {
                let mut qubits = Vec::new();
                for op in operands {
                    qubits.extend(self.resolve_qubit_arg(op)?.into_flat());
                }
                self.circuit.barrier(qubits).map_err(circuit_error(at))?;
                Ok(())
            }
        }
    }

    fn check_fresh_register(&self, name: &str, at: Position) -> ParseResult<()> {
        if self.circuit.layout().is_declared(name) {
            return Err(ParseError::DuplicateDeclaration {
                name: name.to_string(),
                at,
            });
        }
        Ok(())
    }

    // =========================================================================
    // Includes
    // =========================================================================

    fn lower_include(&mut self, name: &str, at: Position) -> ParseResult<()> {
        if self.include_stack.iter().any(|n| n == name) {
            let mut cycle = self.include_stack.clone();
            cycle.push(name.to_string());
            return Err(ParseError::Recursion {
                name: name.to_string(),
                cycle,
                at,
            });
        }

        let options = self.options;
        let supplied = options.includes.get(name);
        let source = match options.dialect {
            Dialect::Qiskit if name == QELIB1 => {
                debug!(include = name, "standard library include mapped onto built-ins");
                return Ok(());
            }
            Dialect::PredefinedOnly if name == QELIB1 || supplied.is_some() => {
                debug!(include = name, "include ignored by predefined-only dialect");
                return Ok(());
            }
            Dialect::Qiskit | Dialect::ExternalOnly => supplied,
            Dialect::PredefinedOnly => None,
        };
        let Some(source) = source else {
            return Err(ParseError::UnknownInclude {
                name: name.to_string(),
                at,
            });
        };

        debug!(include = name, bytes = source.len(), "processing include");
        let fragment = parse_fragment(source)?;
        self.include_stack.push(name.to_string());
        let result = self.lower_program(&fragment);
        self.include_stack.pop();
        result
    }

    // =========================================================================
    // Macro definitions
    // =========================================================================

    fn define_macro(&mut self, def: &GateDef, at: Position) -> ParseResult<()> {
        let name = &def.name;
        if lookup_builtin(name, self.options.dialect).is_some() || self.macros.contains_key(name) {
            return Err(ParseError::DuplicateDeclaration {
                name: name.clone(),
                at,
            });
        }

        let mut seen = FxHashSet::default();
        for formal in def.params.iter().chain(&def.qubits) {
            if !seen.insert(formal.as_str()) {
                return Err(ParseError::DuplicateDeclaration {
                    name: formal.clone(),
                    at,
                });
            }
        }

        if let Some(cycle) = self.find_cycle(def) {
            return Err(ParseError::Recursion {
                name: name.clone(),
                cycle,
                at,
            });
        }

        for op in &def.body {
            let operands = match op {
                BodyOp::Gate(call) => {
                    self.check_body_call(def, call)?;
                    &call.args
                }
                BodyOp::Barrier(operands) => operands,
            };
            for operand in operands {
                check_formal_operand(def, operand)?;
            }
        }

        debug!(
            gate = %name,
            params = def.params.len(),
            qubits = def.qubits.len(),
            ops = def.body.len(),
            "defined gate macro"
        );
        self.macros.insert(name.clone(), Rc::new(def.clone()));
        Ok(())
    }

    /// Check a body application against the formals and the callee's arity.
    /// The callee must be a built-in or a macro defined earlier.
    fn check_body_call(&self, def: &GateDef, call: &GateCall) -> ParseResult<()> {
        for ident in call.params.iter().flat_map(Expression::identifiers) {
            if !def.params.iter().any(|p| p == ident) {
                return Err(ParseError::InvalidParameter {
                    message: format!("'{ident}' is not a parameter of gate '{}'", def.name),
                    at: call.pos,
                });
            }
        }
        let Some((num_qubits, num_params)) = self.arity(&call.name) else {
            return Err(ParseError::UnknownGate {
                name: call.name.clone(),
                at: call.pos,
            });
        };
        check_arity(call, num_qubits, num_params)
    }

    /// Walk the macro call graph from `def`'s body; returns the path back to
    /// `def` if one exists.
    fn find_cycle(&self, def: &GateDef) -> Option<Vec<String>> {
        let mut path = vec![def.name.clone()];
        let mut visited = FxHashSet::default();
        if self.reaches(def, &def.name, &mut path, &mut visited) {
            Some(path)
        } else {
            None
        }
    }

    fn reaches(
        &self,
        from: &GateDef,
        target: &str,
        path: &mut Vec<String>,
        visited: &mut FxHashSet<String>,
    ) -> bool {
        for call in from.body.iter().filter_map(|op| match op {
            BodyOp::Gate(call) => Some(call),
            BodyOp::Barrier(_) => None,
        }) {
            if call.name == target {
                path.push(call.name.clone());
                return true;
            }
            if !visited.insert(call.name.clone()) {
                continue;
            }
            if let Some(next) = self.macros.get(&call.name) {
                path.push(call.name.clone());
                if self.reaches(next, target, path, visited) {
                    return true;
                }
                path.pop();
            }
        }
        false
    }

    /// Qubit and parameter counts for a built-in or defined gate.
    fn arity(&self, name: &str) -> Option<(usize, usize)> {
        if let Some(b) = lookup_builtin(name, self.options.dialect) {
            return Some((b.num_qubits, b.num_params));
        }
        self.macros
            .get(name)
            .map(|def| (def.qubits.len(), def.params.len()))
    }

    // =========================================================================
    // Gate applications
    // =========================================================================

    /// Lower a top-level gate application, broadcasting over whole registers.
    fn lower_gate_call(
        &mut self,
        call: &GateCall,
        condition: Option<&ClassicalCondition>,
    ) -> ParseResult<()> {
        let Some((num_qubits, num_params)) = self.arity(&call.name) else {
            return Err(ParseError::UnknownGate {
                name: call.name.clone(),
                at: call.pos,
            });
        };
        check_arity(call, num_qubits, num_params)?;

        let env = FxHashMap::default();
        let params = call
            .params
            .iter()
            .map(|e| evaluate(e, &env, call.pos))
            .collect::<ParseResult<Vec<_>>>()?;

        let args = call
            .args
            .iter()
            .map(|op| self.resolve_qubit_arg(op))
            .collect::<ParseResult<Vec<_>>>()?;

        let mut width = None;
        for arg in &args {
            if let QubitArg::Register(qs) = arg {
                match width {
                    None => width = Some(qs.len()),
                    Some(w) if w != qs.len() => {
                        return Err(ParseError::Syntax {
                            at: call.pos,
                            message: format!(
                                "registers of different sizes ({w} and {}) in application of '{}'",
                                qs.len(),
                                call.name
                            ),
                        });
                    }
                    Some(_) => {}
                }
            }
        }

        let mut stack = Vec::new();
        for i in 0..width.unwrap_or(1) {
            let qubits: Vec<QubitId> = args.iter().map(|a| a.get(i)).collect();
            self.apply_gate(&call.name, &params, &qubits, condition, call.pos, &mut stack)?;
        }
        Ok(())
    }

    /// Apply a gate by name to concrete qubits, expanding macros recursively.
    fn apply_gate(
        &mut self,
        name: &str,
        params: &[f64],
        qubits: &[QubitId],
        condition: Option<&ClassicalCondition>,
        at: Position,
        stack: &mut Vec<String>,
    ) -> ParseResult<()> {
        let mut seen = FxHashSet::default();
        if let Some(&qubit) = qubits.iter().find(|q| !seen.insert(**q)) {
            return Err(ParseError::Circuit {
                source: IrError::DuplicateQubit {
                    qubit,
                    gate_name: Some(name.to_string()),
                },
                at,
            });
        }

        if lookup_builtin(name, self.options.dialect).is_some() {
            let gate = standard_gate(name, params).ok_or_else(|| ParseError::UnknownGate {
                name: name.to_string(),
                at,
            })?;
            let mut gate = Gate::standard(gate);
            if let Some(cond) = condition {
                gate = gate.with_condition(cond.clone());
            }
            self.circuit
                .apply(Instruction::gate(gate, qubits.iter().copied()))
                .map_err(circuit_error(at))?;
            return Ok(());
        }

        let Some(def) = self.macros.get(name).cloned() else {
            return Err(ParseError::UnknownGate {
                name: name.to_string(),
                at,
            });
        };
        if stack.len() >= MAX_MACRO_DEPTH {
            return Err(ParseError::MacroDepthExceeded {
                name: name.to_string(),
                limit: MAX_MACRO_DEPTH,
                at,
            });
        }
        if def.qubits.len() != qubits.len() {
            return Err(ParseError::WrongQubitCount {
                gate: name.to_string(),
                expected: def.qubits.len(),
                got: qubits.len(),
                at,
            });
        }
        if def.params.len() != params.len() {
            return Err(ParseError::WrongParameterCount {
                gate: name.to_string(),
                expected: def.params.len(),
                got: params.len(),
                at,
            });
        }

        let env: FxHashMap<String, f64> = def
            .params
            .iter()
            .cloned()
            .zip(params.iter().copied())
            .collect();
        let formals: FxHashMap<&str, QubitId> = def
            .qubits
            .iter()
            .map(String::as_str)
            .zip(qubits.iter().copied())
            .collect();
        let bind = |op: &Operand| -> ParseResult<QubitId> {
            formals
                .get(op.register.as_str())
                .copied()
                .ok_or_else(|| ParseError::UndefinedRegister {
                    name: op.register.clone(),
                    at: op.pos,
                })
        };

        stack.push(name.to_string());
        for op in &def.body {
            match op {
                BodyOp::Gate(inner) => {
                    let inner_params = inner
                        .params
                        .iter()
                        .map(|e| evaluate(e, &env, inner.pos))
                        .collect::<ParseResult<Vec<_>>>()?;
                    let inner_qubits = inner.args.iter().map(&bind).collect::<ParseResult<Vec<_>>>()?;
                    self.apply_gate(
                        &inner.name,
                        &inner_params,
                        &inner_qubits,
                        condition,
                        inner.pos,
                        stack,
                    )?;
                }
                BodyOp::Barrier(operands) => {
                    let targets = operands.iter().map(&bind).collect::<ParseResult<Vec<_>>>()?;
                    self.circuit
                        .barrier(targets)
                        .map_err(circuit_error(at))?;
                }
            }
        }
        stack.pop();
        Ok(())
    }

    // =========================================================================
    // Measurement
    // =========================================================================

    fn lower_measure(&mut self, qubit: &Operand, bit: &Operand, at: Position) -> ParseResult<()> {
        let qubits = self.resolve_qubit_arg(qubit)?;
        let clbits = self.resolve_clbit_arg(bit)?;
        let pairs: Vec<(QubitId, ClbitId)> = match (qubits, clbits) {
            (QubitArg::Single(q), ClbitArg::Single(c)) => vec![(q, c)],
            (QubitArg::Register(qs), ClbitArg::Register(cs)) => {
                if qs.len() != cs.len() {
                    return Err(ParseError::Syntax {
                        at,
                        message: format!(
                            "cannot measure {} qubits into {} classical bits",
                            qs.len(),
                            cs.len()
                        ),
                    });
                }
                qs.into_iter().zip(cs).collect()
            }
            _ => {
                return Err(ParseError::Syntax {
                    at,
                    message: "measure operands must both be indexed or both be whole registers"
                        .into(),
                });
            }
        };
        for (q, c) in pairs {
            self.circuit.measure(q, c).map_err(circuit_error(at))?;
        }
        Ok(())
    }

    // =========================================================================
    // Operand resolution
    // =========================================================================

    fn resolve_qubit_arg(&self, op: &Operand) -> ParseResult<QubitArg> {
        let reg = self
            .circuit
            .layout()
            .qreg(&op.register)
            .ok_or_else(|| ParseError::UndefinedRegister {
                name: op.register.clone(),
                at: op.pos,
            })?;
        Ok(match op.index {
            Some(index) => QubitArg::Single(QubitId(slot(reg, index, op.pos)?)),
            None => QubitArg::Register(reg.slots().map(QubitId).collect()),
        })
    }

    fn resolve_clbit_arg(&self, op: &Operand) -> ParseResult<ClbitArg> {
        let reg = self
            .circuit
            .layout()
            .creg(&op.register)
            .ok_or_else(|| ParseError::UndefinedRegister {
                name: op.register.clone(),
                at: op.pos,
            })?;
        Ok(match op.index {
            Some(index) => ClbitArg::Single(ClbitId(slot(reg, index, op.pos)?)),
            None => ClbitArg::Register(reg.slots().map(ClbitId).collect()),
        })
    }
}

fn slot(reg: &Register, index: u64, at: Position) -> ParseResult<u32> {
    u32::try_from(index)
        .ok()
        .and_then(|i| reg.slot(i))
        .ok_or_else(|| ParseError::IndexOutOfBounds {
            register: reg.name.clone(),
            index,
            size: reg.size,
            at,
        })
}

fn check_arity(call: &GateCall, num_qubits: usize, num_params: usize) -> ParseResult<()> {
    if call.params.len() != num_params {
        return Err(ParseError::WrongParameterCount {
            gate: call.name.clone(),
            expected: num_params,
            got: call.params.len(),
            at: call.pos,
        });
    }
    if call.args.len() != num_qubits {
        return Err(ParseError::WrongQubitCount {
            gate: call.name.clone(),
            expected: num_qubits,
            got: call.args.len(),
            at: call.pos,
        });
    }
    Ok(())
}

/// Gate bodies address formal qubits by bare name.
fn check_formal_operand(def: &GateDef, op: &Operand) -> ParseResult<()> {
    if op.index.is_some() {
        return Err(ParseError::Syntax {
            at: op.pos,
            message: format!(
                "qubit '{}' in the body of gate '{}' cannot be indexed",
                op.register, def.name
            ),
        });
    }
    if !def.qubits.iter().any(|q| *q == op.register) {
        return Err(ParseError::UndefinedRegister {
            name: op.register.clone(),
            at: op.pos,
        });
    }
    Ok(())
}

/// Fold an expression to a finite number under `env`.
fn evaluate(expr: &Expression, env: &FxHashMap<String, f64>, at: Position) -> ParseResult<f64> {
    let param = expr.to_parameter().bind_all(env);
    if let Some(symbol) = param.symbols().into_iter().next() {
        return Err(ParseError::InvalidParameter {
            message: format!("unknown identifier '{symbol}'"),
            at,
        });
    }
    param.as_f64().ok_or_else(|| ParseError::InvalidParameter {
        message: format!("'{param}' does not evaluate to a finite number"),
        at,
    })
}

#[cfg(test)]
mod tests {
    use qforge_ir::{GateKind, InstructionKind, StandardGate};

    use crate::dialect::{Dialect, ParseOptions};
    use crate::error::{ParseError, Position};
    use crate::parser::{parse, parse_with};

    use super::MAX_MACRO_DEPTH;

    fn gate_names(source: &str) -> Vec<String> {
        parse(source)
            .unwrap()
            .instructions()
            .iter()
            .map(|i| i.name())
            .collect()
    }

    #[test]
    fn test_registers_flatten_in_declaration_order() {
        let circuit = parse("OPENQASM 2.0;\nqreg a[2];\nqreg b[3];\ncreg c[1];\nx b[1];").unwrap();
        assert_eq!(circuit.num_qubits(), 5);
        assert_eq!(circuit.instructions()[0].qubits[0].0, 3);
        assert_eq!(circuit.layout().qreg("b").unwrap().offset, 2);
    }

    #[test]
    fn test_broadcast_over_registers() {
        let circuit = parse("OPENQASM 2.0;\nqreg a[3];\nqreg b[3];\nh a;\ncx a, b;").unwrap();
        assert_eq!(circuit.len(), 6);
        let last = &circuit.instructions()[5];
        assert_eq!(last.qubits[0].0, 2);
        assert_eq!(last.qubits[1].0, 5);
    }

    #[test]
    fn test_broadcast_with_single_control() {
        let circuit = parse("OPENQASM 2.0;\nqreg a[1];\nqreg b[2];\ncx a[0], b;").unwrap();
        assert_eq!(circuit.len(), 2);
        assert!(circuit.instructions().iter().all(|i| i.qubits[0].0 == 0));
    }

    #[test]
    fn test_broadcast_size_mismatch() {
        let err = parse("OPENQASM 2.0;\nqreg a[2];\nqreg b[3];\ncx a, b;").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_u2_and_u1_map_to_builtins() {
        let circuit =
            parse("OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[1];\nu2(0, pi) q[0];\nu1(0.3) q[0];")
                .unwrap();
        let InstructionKind::Gate(g) = &circuit.instructions()[0].kind else {
            panic!("expected gate");
        };
        let GateKind::Standard(StandardGate::U(theta, _, lambda)) = &g.kind else {
            panic!("expected U");
        };
        assert!((theta.as_f64().unwrap() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((lambda.as_f64().unwrap() - std::f64::consts::PI).abs() < 1e-12);
        assert_eq!(circuit.instructions()[1].name(), "p");
    }

    #[test]
    fn test_macro_expands_inline() {
        let names = gate_names(
            "OPENQASM 2.0;\nqreg q[2];\ngate bell a, b { h a; cx a, b; }\nbell q[0], q[1];",
        );
        assert_eq!(names, vec!["h", "cx"]);
    }

    #[test]
    fn test_macro_parameters_bound() {
        let circuit = parse(
            "OPENQASM 2.0;\nqreg q[1];\ngate twice(t) a { rz(2*t) a; }\ntwice(pi/4) q[0];",
        )
        .unwrap();
        let InstructionKind::Gate(g) = &circuit.instructions()[0].kind else {
            panic!("expected gate");
        };
        let GateKind::Standard(StandardGate::Rz(angle)) = &g.kind else {
            panic!("expected rz");
        };
        assert!((angle.as_f64().unwrap() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
    }

    #[test]
    fn test_guard_applies_to_whole_expansion() {
        let circuit = parse(
            "OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\ngate pair a, b { x a; barrier a, b; z b; }\nif(c==2) pair q[0], q[1];\nh q[0];",
        )
        .unwrap();
        let insts = circuit.instructions();
        assert_eq!(insts.len(), 4);
        assert_eq!(insts[0].condition().unwrap().value, 2);
        assert!(insts[1].is_barrier());
        assert!(insts[2].condition().is_some());
        assert!(insts[3].condition().is_none());
    }

    #[test]
    fn test_unknown_gate_position() {
        let err = parse("OPENQASM 2.0;\nqreg q[1];\n  foo q[0];").unwrap_err();
        assert!(matches!(err, ParseError::UnknownGate { ref name, at } if name == "foo" && at == Position::new(3, 3)));
    }

    #[test]
    fn test_index_out_of_bounds() {
        let err = parse("OPENQASM 2.0;\nqreg q[2];\nx q[2];").unwrap_err();
        assert!(matches!(err, ParseError::IndexOutOfBounds { index: 2, size: 2, .. }));
    }

    #[test]
    fn test_undefined_register() {
        let err = parse("OPENQASM 2.0;\nqreg q[2];\nx r[0];").unwrap_err();
        assert!(matches!(err, ParseError::UndefinedRegister { ref name, .. } if name == "r"));
        let err = parse("OPENQASM 2.0;\nqreg q[1];\nif(c==1) x q[0];").unwrap_err();
        assert!(matches!(err, ParseError::UndefinedRegister { ref name, .. } if name == "c"));
    }

    #[test]
    fn test_direct_recursion() {
        let err = parse("OPENQASM 2.0;\ngate loop a { loop a; }").unwrap_err();
        assert!(matches!(err, ParseError::Recursion { ref name, .. } if name == "loop"));
    }

    #[test]
    fn test_direct_recursion_reports_cycle() {
        let err = parse("OPENQASM 2.0;\ngate f a { x a; f a; }").unwrap_err();
        let ParseError::Recursion { cycle, .. } = err else {
            panic!("expected recursion error, got {err:?}");
        };
        assert_eq!(cycle, vec!["f", "f"]);
    }

    #[test]
    fn test_mutual_reference_stops_at_first_forward_call() {
        // `g` is not defined yet when `f` is, so a cycle can never form.
        let err = parse("OPENQASM 2.0;\ngate f a { g a; }\ngate g a { f a; }").unwrap_err();
        assert!(
            matches!(err, ParseError::UnknownGate { ref name, at } if name == "g" && at.line == 2)
        );
    }

    fn macro_chain(levels: usize) -> String {
        let mut source = String::from("OPENQASM 2.0;\nqreg q[1];\ngate g0 a { x a; }\n");
        for i in 1..levels {
            source.push_str(&format!("gate g{i} a {{ g{} a; }}\n", i - 1));
        }
        source.push_str(&format!("g{} q[0];\n", levels - 1));
        source
    }

    #[test]
    fn test_depth_bound() {
        let err = parse(&macro_chain(MAX_MACRO_DEPTH + 2)).unwrap_err();
        assert!(matches!(err, ParseError::MacroDepthExceeded { limit, .. } if limit == MAX_MACRO_DEPTH));
        assert_eq!(parse(&macro_chain(10)).unwrap().len(), 1);
    }

    #[test]
    fn test_redefining_builtin_rejected() {
        let err = parse("OPENQASM 2.0;\ngate h a { U(0,0,0) a; }").unwrap_err();
        assert!(matches!(err, ParseError::DuplicateDeclaration { .. }));
    }

    #[test]
    fn test_arity_errors() {
        let err = parse("OPENQASM 2.0;\nqreg q[2];\ncx q[0];").unwrap_err();
        assert!(matches!(err, ParseError::WrongQubitCount { expected: 2, got: 1, .. }));
        let err = parse("OPENQASM 2.0;\nqreg q[1];\nrz q[0];").unwrap_err();
        assert!(matches!(err, ParseError::WrongParameterCount { expected: 1, got: 0, .. }));
    }

    #[test]
    fn test_measure_forms() {
        let circuit = parse("OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\nmeasure q -> c;").unwrap();
        assert_eq!(circuit.len(), 2);
        let err = parse("OPENQASM 2.0;\nqreg q[2];\ncreg c[2];\nmeasure q -> c[0];").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_duplicate_operand() {
        let err = parse("OPENQASM 2.0;\nqreg q[2];\ncx q[0], q[0];").unwrap_err();
        assert!(matches!(err, ParseError::Circuit { .. }));
    }

    #[test]
    fn test_external_only_dialect() {
        let options = ParseOptions::default().with_dialect(Dialect::ExternalOnly);
        let err = parse_with("OPENQASM 2.0;\nqreg q[1];\nh q[0];", &options).unwrap_err();
        assert!(matches!(err, ParseError::UnknownGate { .. }));

        let err = parse_with("OPENQASM 2.0;\ninclude \"qelib1.inc\";", &options).unwrap_err();
        assert!(matches!(err, ParseError::UnknownInclude { .. }));

        let options = options.with_include("qelib1.inc", "gate h a { U(pi/2, 0, pi) a; }");
        let circuit = parse_with(
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[1];\nh q[0];",
            &options,
        )
        .unwrap();
        assert_eq!(circuit.instructions()[0].name(), "u");
    }

    #[test]
    fn test_predefined_only_dialect() {
        let options = ParseOptions::default().with_dialect(Dialect::PredefinedOnly);
        let circuit = parse_with(
            "OPENQASM 2.0;\ninclude \"qelib1.inc\";\nqreg q[1];\nh q[0];",
            &options,
        )
        .unwrap();
        assert_eq!(circuit.len(), 1);
        let err = parse_with("OPENQASM 2.0;\ninclude \"mine.inc\";", &options).unwrap_err();
        assert!(matches!(err, ParseError::UnknownInclude { .. }));
    }

    #[test]
    fn test_qiskit_custom_include() {
        let options = ParseOptions::default().with_include("bell.inc", "gate bell a, b { h a; cx a, b; }");
        let circuit = parse_with(
            "OPENQASM 2.0;\ninclude \"bell.inc\";\nqreg q[2];\nbell q[0], q[1];",
            &options,
        )
        .unwrap();
        assert_eq!(circuit.len(), 2);
    }

    #[test]
    fn test_include_cycle() {
        let options = ParseOptions::default()
            .with_include("a.inc", "include \"b.inc\";")
            .with_include("b.inc", "include \"a.inc\";");
        let err = parse_with("OPENQASM 2.0;\ninclude \"a.inc\";", &options).unwrap_err();
        assert!(matches!(err, ParseError::Recursion { ref name, .. } if name == "a.inc"));
    }

    #[test]
    fn test_unknown_identifier_in_parameter() {
        let err = parse("OPENQASM 2.0;\nqreg q[1];\nrz(theta) q[0];").unwrap_err();
        assert!(matches!(err, ParseError::InvalidParameter { .. }));
    }

    #[test]
    fn test_indexed_body_operand_rejected() {
        let err = parse("OPENQASM 2.0;\ngate g a { x a[0]; }").unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }
}
