//! End-to-end tests for parsing and exporting QASM 2 programs.

use proptest::prelude::*;
use qforge_ir::{Circuit, GateKind, InstructionKind, QubitId, StandardGate};
use qforge_qasm::{Dialect, ParseError, ParseOptions, Position, export, parse, parse_with};

// ---------------------------------------------------------------------------
// Whole programs
// ---------------------------------------------------------------------------

const TELEPORT: &str = r#"
OPENQASM 2.0;
include "qelib1.inc";
qreg q[3];
creg m0[1];
creg m1[1];
u3(0.3, 0.2, 0.1) q[0];
h q[1];
cx q[1], q[2];
barrier q;
cx q[0], q[1];
h q[0];
measure q[0] -> m0[0];
measure q[1] -> m1[0];
if(m1==1) x q[2];
if(m0==1) z q[2];
"#;

#[test]
fn test_teleport_program_structure() {
    let circuit = parse(TELEPORT).unwrap();
    assert_eq!(circuit.num_qubits(), 3);
    assert_eq!(circuit.num_clbits(), 2);
    assert_eq!(circuit.len(), 10);

    let guarded: Vec<_> = circuit
        .instructions()
        .iter()
        .filter_map(|i| i.condition())
        .map(|c| c.register.as_str())
        .collect();
    assert_eq!(guarded, vec!["m1", "m0"]);

    let counts = circuit.count_ops();
    assert_eq!(counts["measure"], 2);
    assert_eq!(counts["barrier"], 1);
}

#[test]
fn test_comments_and_whitespace() {
    let source = "// header comment\nOPENQASM 2.0;\n/* block\n comment */ qreg q[1];\n\n  x q[0]; // trailing\n";
    assert_eq!(parse(source).unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Macros
// ---------------------------------------------------------------------------

#[test]
fn test_macro_matches_manual_inlining() {
    let with_macro = parse(
        r#"
OPENQASM 2.0;
include "qelib1.inc";
gate entangle(theta) a, b { h a; cx a, b; rz(theta/2) b; }
gate twice(theta) a, b { entangle(theta) a, b; entangle(-theta) b, a; }
qreg q[2];
twice(pi/3) q[0], q[1];
"#,
    )
    .unwrap();

    let inline = parse(
        r#"
OPENQASM 2.0;
include "qelib1.inc";
qreg q[2];
h q[0];
cx q[0], q[1];
rz(pi/6) q[1];
h q[1];
cx q[1], q[0];
rz(-pi/6) q[0];
"#,
    )
    .unwrap();

    assert_eq!(with_macro.len(), inline.len());
    for (a, b) in with_macro.instructions().iter().zip(inline.instructions()) {
        assert_eq!(a.qubits, b.qubits);
        assert_eq!(a.name(), b.name());
        let (Some(ga), Some(gb)) = (a.as_gate(), b.as_gate()) else {
            panic!("expected gates");
        };
        if let (GateKind::Standard(sa), GateKind::Standard(sb)) = (&ga.kind, &gb.kind) {
            for (pa, pb) in sa.parameters().iter().zip(sb.parameters()) {
                assert!((pa.as_f64().unwrap() - pb.as_f64().unwrap()).abs() < 1e-12);
            }
        }
    }
}

#[test]
fn test_macro_used_before_definition_is_unknown() {
    let err = parse("OPENQASM 2.0;\nqreg q[1];\nlater q[0];\ngate later a { x a; }").unwrap_err();
    assert!(matches!(err, ParseError::UnknownGate { ref name, .. } if name == "later"));
}

#[test]
fn test_macro_body_unknown_gate_reported_at_definition() {
    let err = parse("OPENQASM 2.0;\nqreg q[1];\ngate g a { nope a; }\ng q[0];").unwrap_err();
    assert!(
        matches!(err, ParseError::UnknownGate { ref name, at } if name == "nope" && at.line == 3)
    );
    // Never applied: still rejected.
    let err = parse("OPENQASM 2.0;\nqreg q[1];\ngate foo a { bar a; }\n").unwrap_err();
    assert!(matches!(err, ParseError::UnknownGate { ref name, .. } if name == "bar"));
}

#[test]
fn test_macro_body_forward_reference_rejected() {
    let source = "OPENQASM 2.0;\nqreg q[1];\ngate foo a { bar a; }\ngate bar a { x a; }\nfoo q[0];";
    let err = parse(source).unwrap_err();
    assert!(
        matches!(err, ParseError::UnknownGate { ref name, at } if name == "bar" && at.line == 3)
    );
    // Defined in order, the same pair expands to one gate.
    let ordered = "OPENQASM 2.0;\nqreg q[1];\ngate bar a { x a; }\ngate foo a { bar a; }\nfoo q[0];";
    assert_eq!(parse(ordered).unwrap().len(), 1);
}

// ---------------------------------------------------------------------------
// Errors carry positions and never a partial circuit
// ---------------------------------------------------------------------------

#[test]
fn test_error_kinds() {
    let cases: &[(&str, fn(&ParseError) -> bool)] = &[
        ("OPENQASM 2.0;\nqreg q[1];\nfrob q[0];", |e| {
            matches!(e, ParseError::UnknownGate { .. })
        }),
        ("OPENQASM 2.0;\nqreg q[1];\nx q[5];", |e| {
            matches!(e, ParseError::IndexOutOfBounds { .. })
        }),
        ("OPENQASM 2.x;\nqreg q[1];", |e| {
            matches!(e, ParseError::Syntax { .. } | ParseError::UnsupportedVersion { .. })
        }),
        ("OPENQASM 3.0;\nqreg q[1];", |e| {
            matches!(e, ParseError::UnsupportedVersion { .. })
        }),
        ("qreg q[1];", |e| matches!(e, ParseError::Syntax { .. })),
        ("OPENQASM 2.0;\nqreg q[1];\nqreg q[2];", |e| {
            matches!(e, ParseError::DuplicateDeclaration { .. })
        }),
        ("OPENQASM 2.0;\ninclude \"missing.inc\";", |e| {
            matches!(e, ParseError::UnknownInclude { .. })
        }),
    ];
    for (source, check) in cases {
        let err = parse(source).unwrap_err();
        assert!(check(&err), "unexpected error for {source:?}: {err}");
        assert!(err.position().line >= 1);
    }
}

#[test]
fn test_error_position_is_one_based() {
    let err = parse("OPENQASM 2.0;\nqreg q[2];\ncx q[0], q[7];").unwrap_err();
    assert_eq!(err.position(), Position::new(3, 10));
}

#[test]
fn test_parse_with_dialects() {
    let source = "OPENQASM 2.0;\nqreg q[1];\nh q[0];";
    assert!(parse_with(source, &ParseOptions::default().with_dialect(Dialect::Qiskit)).is_ok());
    assert!(
        parse_with(source, &ParseOptions::default().with_dialect(Dialect::PredefinedOnly)).is_ok()
    );
    assert!(matches!(
        parse_with(source, &ParseOptions::default().with_dialect(Dialect::ExternalOnly)),
        Err(ParseError::UnknownGate { .. })
    ));
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[test]
fn test_export_preserves_registers_and_guards() {
    let circuit = parse(TELEPORT).unwrap();
    let text = export(&circuit).unwrap();
    assert!(text.contains("creg m0[1];"));
    assert!(text.contains("creg m1[1];"));
    assert!(text.contains("if(m1==1) x q[2];"));
    assert!(text.contains("barrier q[0],q[1],q[2];"));

    let reparsed = parse(&text).unwrap();
    assert_eq!(reparsed.instructions(), circuit.instructions());
}

#[test]
fn test_export_programmatic_circuit_without_layout_names() {
    let mut circuit = Circuit::with_size("prog", 2, 2);
    circuit.h(QubitId(0)).unwrap();
    circuit.cx(QubitId(0), QubitId(1)).unwrap();
    circuit.measure_all().unwrap();
    let text = export(&circuit).unwrap();
    assert!(text.contains("qreg q[2];"));
    assert!(text.contains("creg c[2];"));
    assert_eq!(parse(&text).unwrap().len(), circuit.len());
}

fn standard_gate() -> impl Strategy<Value = (StandardGate, usize)> {
    let angle = -6.3f64..6.3;
    prop_oneof![
        Just((StandardGate::H, 1)),
        Just((StandardGate::X, 1)),
        Just((StandardGate::Sdg, 1)),
        Just((StandardGate::SX, 1)),
        Just((StandardGate::CX, 2)),
        Just((StandardGate::CZ, 2)),
        Just((StandardGate::Swap, 2)),
        Just((StandardGate::CCX, 3)),
        angle.clone().prop_map(|a| (StandardGate::Rz(a.into()), 1)),
        angle.clone().prop_map(|a| (StandardGate::CP(a.into()), 2)),
        (angle.clone(), angle.clone(), angle)
            .prop_map(|(a, b, c)| (StandardGate::U(a.into(), b.into(), c.into()), 1)),
    ]
}

fn random_circuit() -> impl Strategy<Value = Circuit> {
    prop::collection::vec(
        (standard_gate(), Just(vec![0u32, 1, 2, 3]).prop_shuffle()),
        0..24,
    )
    .prop_map(|ops| {
        let mut circuit = Circuit::with_size("random", 4, 0);
        for ((gate, arity), order) in ops {
            let qubits: Vec<QubitId> = order[..arity].iter().copied().map(QubitId).collect();
            circuit.gate(gate, qubits).unwrap();
        }
        circuit
    })
}

proptest! {
    #[test]
    fn prop_export_then_parse_preserves_gates(circuit in random_circuit()) {
        let text = export(&circuit).unwrap();
        let reparsed = parse(&text).unwrap();
        prop_assert_eq!(reparsed.len(), circuit.len());
        for (a, b) in circuit.instructions().iter().zip(reparsed.instructions()) {
            prop_assert_eq!(&a.qubits, &b.qubits);
            let (InstructionKind::Gate(ga), InstructionKind::Gate(gb)) = (&a.kind, &b.kind) else {
                panic!("expected gates");
            };
            let (GateKind::Standard(sa), GateKind::Standard(sb)) = (&ga.kind, &gb.kind) else {
                panic!("expected standard gates");
            };
            prop_assert_eq!(sa.name(), sb.name());
            for (pa, pb) in sa.parameters().iter().zip(sb.parameters()) {
                prop_assert!((pa.as_f64().unwrap() - pb.as_f64().unwrap()).abs() < 1e-9);
            }
        }
    }
}
