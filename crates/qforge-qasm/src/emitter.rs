//! QASM 2 emitter: converts a Circuit back to `OpenQASM` 2.0 text.

use std::f64::consts::PI;
use std::fmt::Write as _;

use qforge_ir::{
    Circuit, ClassicalCondition, ClbitId, CompositeGate, ControlledGate, Gate, GateKind,
    Instruction, InstructionKind, ParameterExpression, QubitId, StandardGate,
};
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::dialect::{QELIB1, is_stdlib_name};
use crate::error::{ExportError, ExportResult};

/// Decomposition of iSWAP into standard library gates.
const ISWAP_DEF: &str = "a,b { s a; s b; h a; cx a,b; cx b,a; h b; }";

/// Export a circuit to QASM 2.0 text.
///
/// Gates outside the standard library (iSWAP, composites) get a synthesized
/// `gate` definition ahead of their first use. Controlled and explicit
/// unitary gates have no textual form and are rejected.
pub fn export(circuit: &Circuit) -> ExportResult<String> {
    let mut emitter = Qasm2Emitter::new(circuit);
    emitter.emit_circuit()?;
    debug!(
        instructions = circuit.len(),
        definitions = emitter.definitions.len(),
        "exported circuit"
    );
    Ok(emitter.output)
}

/// QASM2 emitter.
struct Qasm2Emitter<'c> {
    circuit: &'c Circuit,
    output: String,
    /// Synthesized definitions by emitted name: formals and body text.
    definitions: FxHashMap<String, String>,
    /// Whether the layout names every qubit / clbit.
    named_qubits: bool,
    named_clbits: bool,
}

impl<'c> Qasm2Emitter<'c> {
    fn new(circuit: &'c Circuit) -> Self {
        let layout = circuit.layout();
        let named_qubits = layout.covers_qubits(circuit.num_qubits() as u32);
        let named_clbits = layout.covers_clbits(circuit.num_clbits() as u32);
        Self {
            circuit,
            output: String::new(),
            definitions: FxHashMap::default(),
            named_qubits,
            named_clbits,
        }
    }

    fn writeln(&mut self, line: &str) {
        self.output.push_str(line);
        self.output.push('\n');
    }

    fn emit_circuit(&mut self) -> ExportResult<()> {
        self.writeln("OPENQASM 2.0;");
        self.writeln(&format!("include \"{QELIB1}\";"));

        let circuit = self.circuit;
        let layout = circuit.layout();
        if self.named_qubits {
            for reg in layout.qregs() {
                self.writeln(&format!("qreg {}[{}];", reg.name, reg.size));
            }
        } else if circuit.num_qubits() > 0 {
            self.writeln(&format!("qreg q[{}];", circuit.num_qubits()));
        }
        if self.named_clbits {
            for reg in layout.cregs() {
                self.writeln(&format!("creg {}[{}];", reg.name, reg.size));
            }
        } else if circuit.num_clbits() > 0 {
            self.writeln(&format!("creg c[{}];", circuit.num_clbits()));
        }

        for instruction in circuit.instructions() {
            self.emit_instruction(instruction)?;
        }
        Ok(())
    }

    fn emit_instruction(&mut self, instruction: &Instruction) -> ExportResult<()> {
        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let call = self.gate_call(gate)?;
                let operands = instruction
                    .qubits
                    .iter()
                    .map(|q| self.qubit(*q))
                    .collect::<Vec<_>>()
                    .join(",");
                let guard = match &gate.condition {
                    Some(c) => self.guard(c)?,
                    None => String::new(),
                };
                self.writeln(&format!("{guard}{call} {operands};"));
            }

            InstructionKind::Measure => {
                for (q, c) in instruction.qubits.iter().zip(&instruction.clbits) {
                    let line = format!("measure {} -> {};", self.qubit(*q), self.clbit(*c));
                    self.writeln(&line);
                }
            }

            InstructionKind::Reset => {
                for q in &instruction.qubits {
                    let line = format!("reset {};", self.qubit(*q));
                    self.writeln(&line);
                }
            }

            InstructionKind::Barrier => {
                if !instruction.qubits.is_empty() {
                    let operands = instruction
                        .qubits
                        .iter()
                        .map(|q| self.qubit(*q))
                        .collect::<Vec<_>>()
                        .join(",");
                    self.writeln(&format!("barrier {operands};"));
                }
            }
        }
        Ok(())
    }

    /// Gate name with its parameter list, defining it first when needed.
    fn gate_call(&mut self, gate: &Gate) -> ExportResult<String> {
        match &gate.kind {
            GateKind::Standard(std) => self.standard_call(std),
            GateKind::Composite(composite) => self.define_composite(composite),
            GateKind::Controlled(controlled) => self.controlled_call(controlled),
            GateKind::Unitary(unitary) => Err(ExportError::UnsupportedGate {
                name: unitary.name.clone(),
                reason: "explicit unitary matrices have no QASM 2 form".into(),
            }),
        }
    }

    fn standard_call(&mut self, gate: &StandardGate) -> ExportResult<String> {
        let name = match gate {
            StandardGate::U(..) => "u3".to_string(),
            StandardGate::ISwap => self.define("iswap", ISWAP_DEF),
            other => other.name().to_string(),
        };
        let params = gate
            .parameters()
            .into_iter()
            .map(|p| emit_param(gate.name(), p))
            .collect::<ExportResult<Vec<_>>>()?;
        if params.is_empty() {
            Ok(name)
        } else {
            Ok(format!("{name}({})", params.join(",")))
        }
    }

    fn controlled_call(&mut self, gate: &ControlledGate) -> ExportResult<String> {
        match (&gate.base, gate.num_controls) {
            (base, 0) => self.standard_call(base),
            (StandardGate::X, 1) => Ok("cx".to_string()),
            _ => Err(ExportError::UnsupportedGate {
                name: gate.name(),
                reason: format!(
                    "{} controls on '{}' cannot be expressed with QASM 2 built-ins",
                    gate.num_controls,
                    gate.base.name()
                ),
            }),
        }
    }

    /// Synthesize a parameterless definition from the expanded body.
    fn define_composite(&mut self, gate: &CompositeGate) -> ExportResult<String> {
        if gate.name == "U" || gate.name == "CX" || is_stdlib_name(&gate.name) {
            return Err(ExportError::UnsupportedGate {
                name: gate.name.clone(),
                reason: "name collides with a standard library gate".into(),
            });
        }

        let formals: Vec<String> = (0..gate.num_qubits).map(|i| format!("q{i}")).collect();
        let mut body = String::new();
        for inst in gate.body() {
            let Some(inner) = inst.as_gate() else {
                continue;
            };
            let call = self.gate_call(inner)?;
            let operands = inst
                .qubits
                .iter()
                .map(|q| formals[q.index()].as_str())
                .collect::<Vec<_>>()
                .join(",");
            let _ = write!(body, " {call} {operands};");
        }
        let signature = format!("{} {{{body} }}", formals.join(","));
        Ok(self.define(&gate.name, &signature))
    }

    /// Emit `gate <name> <signature>` unless an identical definition exists;
    /// a conflicting one under the same name moves this one to `name_N`.
    fn define(&mut self, name: &str, signature: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 0;
        loop {
            match self.definitions.get(&candidate) {
                Some(existing) if existing == signature => return candidate,
                Some(_) => {
                    n += 1;
                    candidate = format!("{name}_{n}");
                }
                None => break,
            }
        }
        self.writeln(&format!("gate {candidate} {signature}"));
        self.definitions
            .insert(candidate.clone(), signature.to_string());
        candidate
    }

    /// `if(reg==value) ` for a condition over exactly one declared register.
    ///
    /// Without named classical registers the output declares a single `c`
    /// spanning every clbit, so only conditions over all clbits survive.
    fn guard(&self, condition: &ClassicalCondition) -> ExportResult<String> {
        let bits = condition.clbits.iter().copied();
        let register = if self.named_clbits {
            match self.circuit.layout().creg(&condition.register) {
                Some(reg) if reg.slots().map(ClbitId).eq(bits) => condition.register.as_str(),
                Some(_) => {
                    return Err(ExportError::UnsupportedCondition {
                        register: condition.register.clone(),
                        reason: "condition bits differ from the register's bits".into(),
                    });
                }
                None => {
                    return Err(ExportError::UnsupportedCondition {
                        register: condition.register.clone(),
                        reason: "register is not declared".into(),
                    });
                }
            }
        } else if bits.eq((0..self.circuit.num_clbits() as u32).map(ClbitId)) {
            "c"
        } else {
            return Err(ExportError::UnsupportedCondition {
                register: condition.register.clone(),
                reason: "classical bits have no register names".into(),
            });
        };
        Ok(format!("if({register}=={}) ", condition.value))
    }

    fn qubit(&self, q: QubitId) -> String {
        match self.circuit.layout().locate_qubit(q) {
            Some((reg, i)) if self.named_qubits => format!("{}[{i}]", reg.name),
            _ => format!("q[{}]", q.0),
        }
    }

    fn clbit(&self, c: ClbitId) -> String {
        match self.circuit.layout().locate_clbit(c) {
            Some((reg, i)) if self.named_clbits => format!("{}[{i}]", reg.name),
            _ => format!("c[{}]", c.0),
        }
    }
}

fn emit_param(gate: &str, param: &ParameterExpression) -> ExportResult<String> {
    if param.is_symbolic() {
        return Err(ExportError::UnboundParameter {
            gate: gate.to_string(),
            expr: param.to_string(),
        });
    }
    let value = param.as_f64().ok_or_else(|| ExportError::UnsupportedGate {
        name: gate.to_string(),
        reason: format!("parameter '{param}' is not a finite number"),
    })?;
    Ok(format_angle(value))
}

/// Format an angle, preferring exact `k*pi/d` forms for small denominators.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub(crate) fn format_angle(value: f64) -> String {
    if value == 0.0 {
        return "0".into();
    }
    for d in [1_i64, 2, 3, 4, 6, 8, 12, 16] {
        let k = (value * d as f64 / PI).round();
        if k == 0.0 || k.abs() > 64.0 {
            continue;
        }
        if (value - k * PI / d as f64).abs() < 1e-12 {
            let k = k as i64;
            let sign = if k < 0 { "-" } else { "" };
            let numerator = match k.abs() {
                1 => "pi".to_string(),
                m => format!("{m}*pi"),
            };
            return if d == 1 {
                format!("{sign}{numerator}")
            } else {
                format!("{sign}{numerator}/{d}")
            };
        }
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use qforge_ir::{Circuit, CompositeGate, ControlledGate, Instruction, QubitId, UnitaryGate};

    use super::*;
    use crate::parse;

    #[test]
    fn test_guarded_circuit_round_trips() {
        let source = "OPENQASM 2.0;\nqreg q[2];\ncreg a[1];\ncreg b[1];\nmeasure q[0] -> b[0];\nif(b==1) x q[1];";
        let circuit = parse(source).unwrap();
        let text = export(&circuit).unwrap();
        assert!(text.contains("if(b==1) x q[1];"), "{text}");
        let again = parse(&text).unwrap();
        assert_eq!(again.len(), circuit.len());
    }

    #[test]
    fn test_condition_without_register_names_rejected() {
        let source = "OPENQASM 2.0;\nqreg q[2];\ncreg a[1];\ncreg b[1];\nmeasure q[0] -> b[0];\nif(b==1) x q[1];";
        let mut value = serde_json::to_value(parse(source).unwrap()).unwrap();
        // Drop `a` from the layout: clbit 0 is left without a register name.
        value["layout"]["cregs"].as_array_mut().unwrap().remove(0);
        let circuit: Circuit = serde_json::from_value(value).unwrap();
        let err = export(&circuit).unwrap_err();
        assert!(
            matches!(err, ExportError::UnsupportedCondition { ref register, .. } if register == "b")
        );
    }

    #[test]
    fn test_condition_on_partial_register_rejected() {
        let mut circuit = Circuit::with_size("c", 1, 2);
        let cond = ClassicalCondition::new("c", vec![ClbitId(1)], 1);
        circuit.gate_if(StandardGate::X, [QubitId(0)], cond).unwrap();
        assert!(matches!(
            export(&circuit),
            Err(ExportError::UnsupportedCondition { .. })
        ));
    }

    #[test]
    fn test_header_and_registers() {
        let circuit = parse("OPENQASM 2.0;\nqreg a[1];\nqreg b[2];\ncreg m[2];\ncx a[0], b[1];\nmeasure b -> m;").unwrap();
        let text = export(&circuit).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "OPENQASM 2.0;");
        assert_eq!(lines[1], "include \"qelib1.inc\";");
        assert_eq!(&lines[2..5], ["qreg a[1];", "qreg b[2];", "creg m[2];"]);
        assert!(text.contains("cx a[0],b[1];"));
        assert!(text.contains("measure b[1] -> m[1];"));
    }

    #[test]
    fn test_u_exports_as_u3() {
        let mut circuit = Circuit::with_size("u", 1, 0);
        circuit.u(PI / 2.0, 0.0, PI, QubitId(0)).unwrap();
        let text = export(&circuit).unwrap();
        assert!(text.contains("u3(pi/2,0,pi) q[0];"));
    }

    #[test]
    fn test_iswap_defined_once_before_use() {
        let mut circuit = Circuit::with_size("iswap", 2, 0);
        circuit.iswap(QubitId(0), QubitId(1)).unwrap();
        circuit.iswap(QubitId(1), QubitId(0)).unwrap();
        let text = export(&circuit).unwrap();
        assert_eq!(text.matches("gate iswap").count(), 1);
        let def = text.find("gate iswap").unwrap();
        let first_use = text.find("iswap q[0],q[1];").unwrap();
        assert!(def < first_use);
        assert_eq!(parse(&text).unwrap().len(), 12);
    }

    #[test]
    fn test_composites_deduplicated_by_name() {
        let body = vec![
            Instruction::single_qubit_gate(StandardGate::H, QubitId(0)),
            Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1)),
        ];
        let bell = CompositeGate::new("bell", 2, vec![], body).unwrap();
        let other = CompositeGate::new(
            "bell",
            2,
            vec![],
            vec![Instruction::two_qubit_gate(StandardGate::CZ, QubitId(0), QubitId(1))],
        )
        .unwrap();

        let mut circuit = Circuit::with_size("c", 2, 0);
        circuit.gate(bell.clone(), [QubitId(0), QubitId(1)]).unwrap();
        circuit.gate(bell, [QubitId(1), QubitId(0)]).unwrap();
        circuit.gate(other, [QubitId(0), QubitId(1)]).unwrap();
        let text = export(&circuit).unwrap();

        assert!(text.contains("gate bell q0,q1 { h q0; cx q0,q1; }"));
        assert!(text.contains("gate bell_1 q0,q1 { cz q0,q1; }"));
        assert!(text.contains("bell_1 q[0],q[1];"));
        assert_eq!(text.matches("gate bell ").count(), 1);
    }

    #[test]
    fn test_composite_shadowing_stdlib_rejected() {
        let gate = CompositeGate::new(
            "h",
            1,
            vec![],
            vec![Instruction::single_qubit_gate(StandardGate::X, QubitId(0))],
        )
        .unwrap();
        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit.gate(gate, [QubitId(0)]).unwrap();
        assert!(matches!(
            export(&circuit),
            Err(ExportError::UnsupportedGate { .. })
        ));
    }

    #[test]
    fn test_controlled_and_unitary_rejected() {
        let mut circuit = Circuit::with_size("c", 3, 0);
        let ccz = ControlledGate::new(StandardGate::Z, 2).unwrap();
        circuit.gate(ccz, [QubitId(0), QubitId(1), QubitId(2)]).unwrap();
        let err = export(&circuit).unwrap_err();
        assert!(matches!(err, ExportError::UnsupportedGate { ref name, .. } if name == "ccz"));

        let mut circuit = Circuit::with_size("c", 1, 0);
        let one = num_complex::Complex64::new(1.0, 0.0);
        let zero = num_complex::Complex64::new(0.0, 0.0);
        let u = UnitaryGate::new("mat", 1, vec![one, zero, zero, one]).unwrap();
        circuit.gate(u, [QubitId(0)]).unwrap();
        assert!(matches!(
            export(&circuit),
            Err(ExportError::UnsupportedGate { .. })
        ));
    }

    #[test]
    fn test_single_control_x_is_cx() {
        let mut circuit = Circuit::with_size("c", 2, 0);
        let cnot = ControlledGate::new(StandardGate::X, 1).unwrap();
        circuit.gate(cnot, [QubitId(0), QubitId(1)]).unwrap();
        assert!(export(&circuit).unwrap().contains("cx q[0],q[1];"));
    }

    #[test]
    fn test_unbound_parameter() {
        let mut circuit = Circuit::with_size("c", 1, 0);
        circuit
            .rz(ParameterExpression::symbol("theta"), QubitId(0))
            .unwrap();
        assert!(matches!(
            export(&circuit),
            Err(ExportError::UnboundParameter { ref expr, .. }) if expr == "theta"
        ));
    }

    #[test]
    fn test_condition_exported() {
        let source = "OPENQASM 2.0;\nqreg q[1];\ncreg c[2];\nmeasure q[0] -> c[1];\nif(c==2) x q[0];\n";
        let text = export(&parse(source).unwrap()).unwrap();
        assert!(text.contains("if(c==2) x q[0];"));
    }

    #[test]
    fn test_format_angle() {
        assert_eq!(format_angle(PI), "pi");
        assert_eq!(format_angle(-PI / 2.0), "-pi/2");
        assert_eq!(format_angle(3.0 * PI / 4.0), "3*pi/4");
        assert_eq!(format_angle(2.0 * PI), "2*pi");
        assert_eq!(format_angle(0.0), "0");
        assert_eq!(format_angle(0.3), "0.3");
        assert_eq!(format_angle(1.0).parse::<f64>().unwrap(), 1.0);
    }
}
