//! Circuit instructions combining gates with operands.

use serde::{Deserialize, Serialize};

use crate::gate::{ClassicalCondition, Gate, StandardGate};
use crate::qubit::{ClbitId, QubitId};

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(Gate),
    /// Projective measurement of each qubit into the paired classical bit.
    Measure,
    /// Reset qubit to |0⟩.
    Reset,
    /// Barrier (synchronization point).
    Barrier,
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
    /// Classical bits this instruction operates on (for measure).
    pub clbits: Vec<ClbitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: impl Into<Gate>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate.into()),
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: StandardGate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a measurement instruction.
    pub fn measure(qubit: QubitId, clbit: ClbitId) -> Self {
        Self {
            kind: InstructionKind::Measure,
            qubits: vec![qubit],
            clbits: vec![clbit],
        }
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
            clbits: vec![],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
            clbits: vec![],
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a measurement.
    pub fn is_measure(&self) -> bool {
        matches!(self.kind, InstructionKind::Measure)
    }

    /// Check if this is a reset.
    pub fn is_reset(&self) -> bool {
        matches!(self.kind, InstructionKind::Reset)
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, InstructionKind::Barrier)
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// The classical guard of a gate instruction, if any.
    pub fn condition(&self) -> Option<&ClassicalCondition> {
        self.as_gate().and_then(|g| g.condition.as_ref())
    }

    /// Get the name of this instruction.
    pub fn name(&self) -> String {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Measure => "measure".into(),
            InstructionKind::Reset => "reset".into(),
            InstructionKind::Barrier => "barrier".into(),
        }
    }

    /// Attach a classical guard. No-op for non-gate instructions.
    #[must_use]
    pub fn with_condition(mut self, condition: ClassicalCondition) -> Self {
        if let InstructionKind::Gate(g) = &mut self.kind {
            g.condition = Some(condition);
        }
        self
    }

    /// Renumber qubit operands through `map` (local index → flat qubit).
    ///
    /// Returns `None` if an operand has no entry in `map`.
    pub fn remap_qubits(&self, map: &[QubitId]) -> Option<Self> {
        let qubits = self
            .qubits
            .iter()
            .map(|q| map.get(q.index()).copied())
            .collect::<Option<Vec<_>>>()?;
        Some(Self {
            kind: self.kind.clone(),
            qubits,
            clbits: self.clbits.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_instruction() {
        let inst = Instruction::single_qubit_gate(StandardGate::H, QubitId(0));
        assert!(inst.is_gate());
        assert_eq!(inst.name(), "h");
        assert_eq!(inst.qubits, vec![QubitId(0)]);
    }

    #[test]
    fn test_measure_instruction() {
        let inst = Instruction::measure(QubitId(0), ClbitId(0));
        assert!(inst.is_measure());
        assert_eq!(inst.name(), "measure");
        assert_eq!(inst.clbits, vec![ClbitId(0)]);
    }

    #[test]
    fn test_condition_only_on_gates() {
        let cond = ClassicalCondition::new("c", vec![ClbitId(0)], 1);
        let gated = Instruction::single_qubit_gate(StandardGate::X, QubitId(0))
            .with_condition(cond.clone());
        assert_eq!(gated.condition(), Some(&cond));

        let reset = Instruction::reset(QubitId(0)).with_condition(cond);
        assert!(reset.condition().is_none());
    }

    #[test]
    fn test_remap() {
        let inst = Instruction::two_qubit_gate(StandardGate::CX, QubitId(0), QubitId(1));
        let mapped = inst.remap_qubits(&[QubitId(4), QubitId(2)]).unwrap();
        assert_eq!(mapped.qubits, vec![QubitId(4), QubitId(2)]);
        assert!(inst.remap_qubits(&[QubitId(4)]).is_none());
    }
}
