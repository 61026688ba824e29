//! Circuit execution with measurement and classical guards.

use std::collections::BTreeMap;

use qforge_ir::{Circuit, Gate, GateKind, Instruction, InstructionKind, RegisterLayout};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{SimError, SimResult};
use crate::matrix::gate_matrix;
use crate::statevector::{Statevector, check_width};

/// How measurement outcomes are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementMode {
    /// Draw outcomes at random: from a seeded `StdRng` when `seed` is set,
    /// from OS entropy otherwise.
    Sample { seed: Option<u64> },
    /// Always take the more probable branch; ties resolve to 0.
    MostLikely,
}

impl Default for MeasurementMode {
    fn default() -> Self {
        MeasurementMode::Sample { seed: None }
    }
}

/// Final state and classical bits of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// State after the last instruction.
    pub state: Statevector,
    /// Classical bits by flat index.
    pub clbits: Vec<bool>,
}

impl Execution {
    /// Classical bits as a string, highest index first.
    pub fn bitstring(&self) -> String {
        self.clbits
            .iter()
            .rev()
            .map(|&b| if b { '1' } else { '0' })
            .collect()
    }

    /// Integer value of a named classical register (bit 0 least significant).
    pub fn register_value(&self, layout: &RegisterLayout, name: &str) -> Option<u64> {
        let reg = layout.creg(name)?;
        Some(
            reg.slots()
                .enumerate()
                .filter(|&(_, slot)| self.clbits.get(slot as usize).copied().unwrap_or(false))
                .map(|(i, _)| 1u64 << i)
                .sum(),
        )
    }
}

/// Executes circuits on a dense state vector.
///
/// The executor owns its random source, so two executors built with the
/// same seed produce the same outcomes for the same sequence of runs.
#[derive(Debug)]
pub struct Executor {
    mode: MeasurementMode,
    rng: Option<StdRng>,
}

impl Executor {
    /// Create an executor.
    pub fn new(mode: MeasurementMode) -> Self {
        let rng = match mode {
            MeasurementMode::Sample { seed: Some(seed) } => Some(StdRng::seed_from_u64(seed)),
            MeasurementMode::Sample { seed: None } => Some(StdRng::from_entropy()),
            MeasurementMode::MostLikely => None,
        };
        Self { mode, rng }
    }

    /// Executor with a fixed sampling seed.
    pub fn seeded(seed: u64) -> Self {
        Self::new(MeasurementMode::Sample { seed: Some(seed) })
    }

    /// The measurement mode.
    pub fn mode(&self) -> MeasurementMode {
        self.mode
    }

    /// Run `circuit` from `initial`.
    ///
    /// Fails with [`SimError::TooManyQubits`] when the circuit is wider than
    /// [`MAX_QUBITS`](crate::statevector::MAX_QUBITS), and with [`SimError::DimensionMismatch`] when
    /// `initial` does not have `2^num_qubits` amplitudes.
    pub fn run(&mut self, circuit: &Circuit, initial: Statevector) -> SimResult<Execution> {
        check_width(circuit.num_qubits())?;
        let expected = 1usize << circuit.num_qubits();
        if initial.dimension() != expected {
            return Err(SimError::DimensionMismatch {
                expected,
                got: initial.dimension(),
            });
        }
        debug!(
            qubits = circuit.num_qubits(),
            instructions = circuit.len(),
            mode = ?self.mode,
            "executing circuit"
        );

        let mut run = Execution {
            state: initial,
            clbits: vec![false; circuit.num_clbits()],
        };
        for inst in circuit.instructions() {
            self.step(&mut run, inst)?;
        }
        Ok(run)
    }

    /// Run `circuit` from |0…0⟩.
    pub fn run_from_zero(&mut self, circuit: &Circuit) -> SimResult<Execution> {
        let initial = Statevector::zero(circuit.num_qubits())?;
        self.run(circuit, initial)
    }

    /// Run `circuit` `shots` times from |0…0⟩ and count classical outcomes,
    /// keyed by [`Execution::bitstring`].
    pub fn run_shots(&mut self, circuit: &Circuit, shots: usize) -> SimResult<BTreeMap<String, usize>> {
        let mut counts = BTreeMap::new();
        for _ in 0..shots {
            let run = self.run_from_zero(circuit)?;
            *counts.entry(run.bitstring()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    fn step(&mut self, run: &mut Execution, inst: &Instruction) -> SimResult<()> {
        match &inst.kind {
            InstructionKind::Gate(gate) => {
                if let Some(cond) = &gate.condition {
                    if !cond.is_satisfied(&run.clbits) {
                        trace!(gate = %gate.name(), register = %cond.register, "guard not satisfied");
                        return Ok(());
                    }
                }
                apply_gate(&mut run.state, gate, inst)
            }
            InstructionKind::Measure => {
                for (q, c) in inst.qubits.iter().zip(&inst.clbits) {
                    let outcome = self.measure(&mut run.state, q.index());
                    run.clbits[c.index()] = outcome;
                }
                Ok(())
            }
            InstructionKind::Reset => {
                for q in &inst.qubits {
                    if self.measure(&mut run.state, q.index()) {
                        run.state.flip(q.index());
                    }
                }
                Ok(())
            }
            InstructionKind::Barrier => Ok(()),
        }
    }

    /// Measure one qubit, collapsing the state; returns the outcome.
    ///
    /// Branch probabilities are the squared norms of the two subspaces,
    /// relative to their sum.
    fn measure(&mut self, state: &mut Statevector, qubit: usize) -> bool {
        let (w0, w1) = state.branch_weights(qubit);
        let total = w0 + w1;
        let outcome = match (&mut self.rng, self.mode) {
            (Some(rng), MeasurementMode::Sample { .. }) => {
                total > 0.0 && rng.r#gen::<f64>() * total < w1
            }
            _ => w1 > w0,
        };
        let weight = if outcome { w1 } else { w0 };
        trace!(qubit, outcome, probability = weight / total, "measured");
        state.collapse(qubit, outcome, weight);
        outcome
    }
}

/// Apply an unconditioned view of `gate` to `inst.qubits`.
pub(crate) fn apply_gate(state: &mut Statevector, gate: &Gate, inst: &Instruction) -> SimResult<()> {
    let qubits: Vec<usize> = inst.qubits.iter().map(|q| q.index()).collect();
    apply_kind(state, &gate.kind, &qubits)
}

fn apply_kind(state: &mut Statevector, kind: &GateKind, qubits: &[usize]) -> SimResult<()> {
    if let Some(matrix) = gate_matrix(kind)? {
        return state.apply(&matrix, qubits);
    }
    let GateKind::Composite(composite) = kind else {
        return Ok(());
    };
    for inner in composite.body() {
        let Some(g) = inner.as_gate() else {
            continue;
        };
        let mapped: Vec<usize> = inner.qubits.iter().map(|q| qubits[q.index()]).collect();
        apply_kind(state, &g.kind, &mapped)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use qforge_ir::{ClbitId, CompositeGate, QubitId, StandardGate};

    #[test]
    fn test_bell_most_likely() {
        let circuit = Circuit::bell().unwrap();
        let run = Executor::new(MeasurementMode::MostLikely)
            .run_from_zero(&circuit)
            .unwrap();
        // Tie between 00 and 11 resolves to 0 on the first qubit.
        assert_eq!(run.clbits, vec![false, false]);
        assert!((run.state.probabilities()[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_seeded_runs_repeat() {
        let circuit = Circuit::bell().unwrap();
        let a = Executor::seeded(7).run_shots(&circuit, 200).unwrap();
        let b = Executor::seeded(7).run_shots(&circuit, 200).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.keys().cloned().collect::<Vec<_>>(), vec!["00", "11"]);
        assert_eq!(a.values().sum::<usize>(), 200);
    }

    #[test]
    fn test_dimension_mismatch() {
        let circuit = Circuit::with_size("c", 2, 0);
        let err = Executor::seeded(0)
            .run(&circuit, Statevector::zero(3).unwrap())
            .unwrap_err();
        assert!(matches!(err, SimError::DimensionMismatch { expected: 4, got: 8 }));
    }

    #[test]
    fn test_wide_circuit_rejected_before_allocation() {
        let circuit = Circuit::with_size("wide", 64, 0);
        let err = Executor::seeded(0)
            .run(&circuit, Statevector::zero(1).unwrap())
            .unwrap_err();
        assert!(matches!(err, SimError::TooManyQubits { num_qubits: 64, .. }));
        assert!(matches!(
            Executor::seeded(0).run_from_zero(&circuit),
            Err(SimError::TooManyQubits { .. })
        ));
    }

    #[test]
    fn test_measurement_uses_subspace_weights() {
        // Unnormalized |ψ⟩ = 0.6|1⟩: outcome 0 has no support.
        let mut circuit = Circuit::with_size("m", 1, 1);
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        let initial = Statevector::from_amplitudes(
            1,
            vec![num_complex::Complex64::new(0.0, 0.0), num_complex::Complex64::new(0.6, 0.0)],
        )
        .unwrap();
        for mode in [MeasurementMode::MostLikely, MeasurementMode::Sample { seed: Some(3) }] {
            let run = Executor::new(mode).run(&circuit, initial.clone()).unwrap();
            assert_eq!(run.clbits, vec![true], "{mode:?}");
            assert!((run.state.norm() - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_guard_reads_register_value() {
        let mut circuit = Circuit::new("guard");
        let q = circuit.add_qreg("q", 2).unwrap();
        circuit.add_creg("c", 2).unwrap();
        circuit.x(q[0]).unwrap();
        circuit.measure(q[0], ClbitId(1)).unwrap();
        // c == 2 because bit 1 is set.
        let cond = circuit.condition("c", 2).unwrap();
        circuit.gate_if(StandardGate::X, [q[1]], cond).unwrap();
        let cond = circuit.condition("c", 1).unwrap();
        circuit.gate_if(StandardGate::X, [q[0]], cond).unwrap();

        let run = Executor::new(MeasurementMode::MostLikely)
            .run_from_zero(&circuit)
            .unwrap();
        assert!((run.state.probabilities()[0b11] - 1.0).abs() < 1e-12);
        assert_eq!(run.register_value(circuit.layout(), "c"), Some(2));
        assert_eq!(run.bitstring(), "10");
    }

    #[test]
    fn test_reset_returns_to_zero() {
        let mut circuit = Circuit::with_size("reset", 1, 0);
        circuit.h(QubitId(0)).unwrap();
        circuit.reset(QubitId(0)).unwrap();
        for seed in 0..8 {
            let run = Executor::seeded(seed).run_from_zero(&circuit).unwrap();
            assert!((run.state.probabilities()[0] - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_composite_executes_body() {
        let body = vec![
            Instruction::single_qubit_gate(StandardGate::X, QubitId(0)),
            Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1)),
        ];
        let gate = CompositeGate::new("xx", 2, vec![], body).unwrap();
        let mut circuit = Circuit::with_size("c", 3, 0);
        circuit.gate(gate, [QubitId(2), QubitId(0)]).unwrap();
        let run = Executor::new(MeasurementMode::MostLikely)
            .run_from_zero(&circuit)
            .unwrap();
        assert!((run.state.probabilities()[0b101] - 1.0).abs() < 1e-12);
    }
}
