//! High-level circuit builder API.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{ClassicalCondition, Gate, StandardGate};
use crate::instruction::{Instruction, InstructionKind};
use crate::layout::RegisterLayout;
use crate::parameter::ParameterExpression;
use crate::qubit::{ClbitId, QubitId};

/// A quantum circuit: an ordered instruction list over flat qubit and
/// classical bit indices.
///
/// Every instruction is validated when it is appended, so a circuit never
/// holds an operand outside its declared qubit/clbit counts. Execution and
/// export only borrow the circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Circuit {
    /// Name of the circuit.
    name: String,
    num_qubits: u32,
    num_clbits: u32,
    /// Register names projected onto the flat index space.
    layout: RegisterLayout,
    instructions: Vec<Instruction>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            num_qubits: 0,
            num_clbits: 0,
            layout: RegisterLayout::new(),
            instructions: vec![],
        }
    }

    /// Create a circuit with a `q` register of `num_qubits` and a `c`
    /// register of `num_clbits` (each omitted when the size is zero).
    pub fn with_size(name: impl Into<String>, num_qubits: u32, num_clbits: u32) -> Self {
        let mut circuit = Self::new(name);
        if num_qubits > 0 {
            circuit
                .layout
                .push_qreg("q".into(), circuit.num_qubits, num_qubits);
            circuit.num_qubits = num_qubits;
        }
        if num_clbits > 0 {
            circuit
                .layout
                .push_creg("c".into(), circuit.num_clbits, num_clbits);
            circuit.num_clbits = num_clbits;
        }
        circuit
    }

    /// Add a quantum register, returning the flat ids of its qubits.
    pub fn add_qreg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<QubitId>> {
        let name = name.into();
        if self.layout.is_declared(&name) {
            return Err(IrError::DuplicateRegister(name));
        }
        let offset = self.num_qubits;
        self.layout.push_qreg(name, offset, size);
        self.num_qubits += size;
        Ok((offset..offset + size).map(QubitId).collect())
    }

    /// Add a classical register, returning the flat ids of its bits.
    pub fn add_creg(&mut self, name: impl Into<String>, size: u32) -> IrResult<Vec<ClbitId>> {
        let name = name.into();
        if self.layout.is_declared(&name) {
            return Err(IrError::DuplicateRegister(name));
        }
        let offset = self.num_clbits;
        self.layout.push_creg(name, offset, size);
        self.num_clbits += size;
        Ok((offset..offset + size).map(ClbitId).collect())
    }

    /// Build an `if (register == value)` guard from a declared classical register.
    pub fn condition(&self, register: &str, value: u64) -> IrResult<ClassicalCondition> {
        let reg = self
            .layout
            .creg(register)
            .ok_or_else(|| IrError::UnknownRegister(register.to_string()))?;
        Ok(ClassicalCondition::new(
            register,
            reg.slots().map(ClbitId).collect(),
            value,
        ))
    }

    /// Validate and append an instruction.
    pub fn apply(&mut self, instruction: Instruction) -> IrResult<&mut Self> {
        self.validate(&instruction)?;
        self.instructions.push(instruction);
        Ok(self)
    }

    fn validate(&self, instruction: &Instruction) -> IrResult<()> {
        let gate_name = instruction.as_gate().map(Gate::name);

        match &instruction.kind {
            InstructionKind::Gate(gate) => {
                let expected = gate.num_qubits();
                let got = instruction.qubits.len() as u32;
                if expected != got {
                    return Err(IrError::QubitCountMismatch {
                        gate_name: gate.name(),
                        expected,
                        got,
                    });
                }
                if let Some(cond) = &gate.condition {
                    let declared = self
                        .layout
                        .creg(&cond.register)
                        .ok_or_else(|| IrError::UnknownRegister(cond.register.clone()))?;
                    for &clbit in &cond.clbits {
                        if !declared.contains(clbit.0) {
                            return Err(IrError::ClbitNotFound {
                                clbit,
                                gate_name: gate_name.clone(),
                            });
                        }
                    }
                }
            }
            InstructionKind::Measure => {
                if instruction.qubits.len() != instruction.clbits.len() {
                    return Err(IrError::MeasureArityMismatch {
                        qubits: instruction.qubits.len(),
                        clbits: instruction.clbits.len(),
                    });
                }
            }
            InstructionKind::Reset | InstructionKind::Barrier => {}
        }

        for &qubit in &instruction.qubits {
            if qubit.0 >= self.num_qubits {
                return Err(IrError::QubitNotFound {
                    qubit,
                    gate_name: gate_name.clone(),
                });
            }
        }
        for &clbit in &instruction.clbits {
            if clbit.0 >= self.num_clbits {
                return Err(IrError::ClbitNotFound {
                    clbit,
                    gate_name: gate_name.clone(),
                });
            }
        }

        // Barriers may list a qubit twice after register broadcasting.
        if !instruction.is_barrier() {
            let mut seen = FxHashSet::default();
            for &qubit in &instruction.qubits {
                if !seen.insert(qubit) {
                    return Err(IrError::DuplicateQubit {
                        qubit,
                        gate_name: gate_name.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    // =========================================================================
    // Single-qubit gates
    // =========================================================================

    /// Apply Hadamard gate.
    pub fn h(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::H, qubit))
    }

    /// Apply Pauli-X gate.
    pub fn x(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::X, qubit))
    }

    /// Apply Pauli-Y gate.
    pub fn y(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Y, qubit))
    }

    /// Apply Pauli-Z gate.
    pub fn z(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Z, qubit))
    }

    /// Apply S gate.
    pub fn s(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::S, qubit))
    }

    /// Apply S-dagger gate.
    pub fn sdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Sdg, qubit))
    }

    /// Apply T gate.
    pub fn t(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::T, qubit))
    }

    /// Apply T-dagger gate.
    pub fn tdg(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::Tdg, qubit))
    }

    /// Apply sqrt(X) gate.
    pub fn sx(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(StandardGate::SX, qubit))
    }

    /// Apply Rx rotation gate.
    pub fn rx(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::Rx(theta.into()),
            qubit,
        ))
    }

    /// Apply Ry rotation gate.
    pub fn ry(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::Ry(theta.into()),
            qubit,
        ))
    }

    /// Apply Rz rotation gate.
    pub fn rz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::Rz(theta.into()),
            qubit,
        ))
    }

    /// Apply phase gate.
    pub fn p(
        &mut self,
        theta: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::P(theta.into()),
            qubit,
        ))
    }

    /// Apply universal U gate.
    pub fn u(
        &mut self,
        theta: impl Into<ParameterExpression>,
        phi: impl Into<ParameterExpression>,
        lambda: impl Into<ParameterExpression>,
        qubit: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::single_qubit_gate(
            StandardGate::U(theta.into(), phi.into(), lambda.into()),
            qubit,
        ))
    }

    // =========================================================================
    // Two-qubit gates
    // =========================================================================

    /// Apply CNOT (CX) gate.
    pub fn cx(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(
            StandardGate::CX,
            control,
            target,
        ))
    }

    /// Apply CY gate.
    pub fn cy(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(
            StandardGate::CY,
            control,
            target,
        ))
    }

    /// Apply CZ gate.
    pub fn cz(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(
            StandardGate::CZ,
            control,
            target,
        ))
    }

    /// Apply controlled-Hadamard gate.
    pub fn ch(&mut self, control: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(
            StandardGate::CH,
            control,
            target,
        ))
    }

    /// Apply SWAP gate.
    pub fn swap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::Swap, q1, q2))
    }

    /// Apply iSWAP gate.
    pub fn iswap(&mut self, q1: QubitId, q2: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(StandardGate::ISwap, q1, q2))
    }

    /// Apply controlled-Rz gate.
    pub fn crz(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(
            StandardGate::CRz(theta.into()),
            control,
            target,
        ))
    }

    /// Apply controlled-phase gate.
    pub fn cp(
        &mut self,
        theta: impl Into<ParameterExpression>,
        control: QubitId,
        target: QubitId,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::two_qubit_gate(
            StandardGate::CP(theta.into()),
            control,
            target,
        ))
    }

    // =========================================================================
    // Three-qubit gates
    // =========================================================================

    /// Apply Toffoli (CCX) gate.
    pub fn ccx(&mut self, c1: QubitId, c2: QubitId, target: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::gate(StandardGate::CCX, [c1, c2, target]))
    }

    /// Apply Fredkin (CSWAP) gate.
    pub fn cswap(&mut self, control: QubitId, t1: QubitId, t2: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::gate(StandardGate::CSwap, [control, t1, t2]))
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    /// Apply any gate.
    pub fn gate(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = QubitId>,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::gate(gate, qubits))
    }

    /// Apply a gate guarded by a classical condition.
    pub fn gate_if(
        &mut self,
        gate: impl Into<Gate>,
        qubits: impl IntoIterator<Item = QubitId>,
        condition: ClassicalCondition,
    ) -> IrResult<&mut Self> {
        self.apply(Instruction::gate(gate.into().with_condition(condition), qubits))
    }

    /// Measure a qubit to a classical bit.
    pub fn measure(&mut self, qubit: QubitId, clbit: ClbitId) -> IrResult<&mut Self> {
        self.apply(Instruction::measure(qubit, clbit))
    }

    /// Measure qubit `i` into classical bit `i` for every qubit.
    ///
    /// Adds a `meas` register when the circuit has fewer classical bits than qubits.
    pub fn measure_all(&mut self) -> IrResult<&mut Self> {
        if self.num_clbits < self.num_qubits {
            let missing = self.num_qubits - self.num_clbits;
            let mut name = String::from("meas");
            while self.layout.is_declared(&name) {
                name.push('_');
            }
            self.add_creg(name, missing)?;
        }
        for i in 0..self.num_qubits {
            self.measure(QubitId(i), ClbitId(i))?;
        }
        Ok(self)
    }

    /// Reset a qubit to |0⟩.
    pub fn reset(&mut self, qubit: QubitId) -> IrResult<&mut Self> {
        self.apply(Instruction::reset(qubit))
    }

    /// Apply a barrier to specified qubits.
    pub fn barrier(&mut self, qubits: impl IntoIterator<Item = QubitId>) -> IrResult<&mut Self> {
        self.apply(Instruction::barrier(qubits))
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Get the circuit name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the number of qubits.
    pub fn num_qubits(&self) -> usize {
        self.num_qubits as usize
    }

    /// Get the number of classical bits.
    pub fn num_clbits(&self) -> usize {
        self.num_clbits as usize
    }

    /// The register side-channel.
    pub fn layout(&self) -> &RegisterLayout {
        &self.layout
    }

    /// Instructions in program order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether the circuit has no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Whether any instruction measures.
    pub fn has_measurements(&self) -> bool {
        self.instructions.iter().any(Instruction::is_measure)
    }

    /// Whether the circuit is a pure unitary: no measurement, reset or
    /// classical guard.
    pub fn is_unitary(&self) -> bool {
        self.instructions
            .iter()
            .all(|i| !i.is_measure() && !i.is_reset() && i.condition().is_none())
    }

    /// Count instructions by name.
    pub fn count_ops(&self) -> FxHashMap<String, usize> {
        let mut counts = FxHashMap::default();
        for inst in &self.instructions {
            *counts.entry(inst.name()).or_insert(0) += 1;
        }
        counts
    }

    /// Get the circuit depth.
    ///
    /// Each wire (qubit or classical bit, including the bits read by a guard)
    /// tracks the layer of its last operation; an instruction lands one layer
    /// above the deepest wire it touches. Barriers align wires without adding
    /// a layer.
    pub fn depth(&self) -> usize {
        let mut qlevel = vec![0usize; self.num_qubits()];
        let mut clevel = vec![0usize; self.num_clbits()];
        let mut depth = 0;

        for inst in &self.instructions {
            let cond_bits = inst.condition().map(|c| c.clbits.as_slice()).unwrap_or(&[]);
            let clbits = inst.clbits.iter().chain(cond_bits);

            let front = inst
                .qubits
                .iter()
                .map(|q| qlevel[q.index()])
                .chain(clbits.clone().map(|c| clevel[c.index()]))
                .max()
                .unwrap_or(0);
            let layer = if inst.is_barrier() { front } else { front + 1 };

            for q in &inst.qubits {
                qlevel[q.index()] = layer;
            }
            for c in clbits {
                clevel[c.index()] = layer;
            }
            depth = depth.max(layer);
        }
        depth
    }

    // =========================================================================
    // Pre-built circuits
    // =========================================================================

    /// Create a Bell state circuit.
    pub fn bell() -> IrResult<Self> {
        let mut circuit = Self::with_size("bell", 2, 2);
        let q0 = QubitId(0);
        let q1 = QubitId(1);

        circuit
            .h(q0)?
            .cx(q0, q1)?
            .measure(q0, ClbitId(0))?
            .measure(q1, ClbitId(1))?;

        Ok(circuit)
    }

    /// Create a GHZ state circuit.
    pub fn ghz(n: u32) -> IrResult<Self> {
        if n == 0 {
            return Ok(Self::new("ghz_0"));
        }

        let mut circuit = Self::with_size("ghz", n, n);
        circuit.h(QubitId(0))?;
        for i in 0..n - 1 {
            circuit.cx(QubitId(i), QubitId(i + 1))?;
        }
        for i in 0..n {
            circuit.measure(QubitId(i), ClbitId(i))?;
        }

        Ok(circuit)
    }

    /// Create a QFT circuit (without measurements).
    pub fn qft(n: u32) -> IrResult<Self> {
        use std::f64::consts::PI;

        if n == 0 {
            return Ok(Self::new("qft_0"));
        }

        let mut circuit = Self::with_size("qft", n, 0);

        for i in 0..n {
            circuit.h(QubitId(i))?;
            for j in (i + 1)..n {
                let angle = PI / f64::from(1u32 << (j - i));
                circuit.cp(angle, QubitId(j), QubitId(i))?;
            }
        }

        // Bit reversal
        for i in 0..n / 2 {
            circuit.swap(QubitId(i), QubitId(n - 1 - i))?;
        }

        Ok(circuit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_new_circuit() {
        let circuit = Circuit::new("test");
        assert_eq!(circuit.name(), "test");
        assert_eq!(circuit.num_qubits(), 0);
        assert_eq!(circuit.num_clbits(), 0);
        assert!(circuit.is_empty());
    }

    #[test]
    fn test_circuit_with_size() {
        let circuit = Circuit::with_size("test", 3, 2);
        assert_eq!(circuit.num_qubits(), 3);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.layout().qreg("q").unwrap().size, 3);
    }

    #[test]
    fn test_add_registers_flatten() {
        let mut circuit = Circuit::new("test");
        let a = circuit.add_qreg("a", 2).unwrap();
        let b = circuit.add_qreg("b", 3).unwrap();
        assert_eq!(a, vec![QubitId(0), QubitId(1)]);
        assert_eq!(b[0], QubitId(2));
        assert_eq!(circuit.num_qubits(), 5);
        assert!(matches!(
            circuit.add_creg("a", 1),
            Err(IrError::DuplicateRegister(_))
        ));
    }

    #[test]
    fn test_out_of_range_rejected() {
        let mut circuit = Circuit::with_size("test", 2, 1);
        assert!(matches!(
            circuit.h(QubitId(2)),
            Err(IrError::QubitNotFound { .. })
        ));
        assert!(matches!(
            circuit.measure(QubitId(0), ClbitId(1)),
            Err(IrError::ClbitNotFound { .. })
        ));
        assert!(matches!(
            circuit.cx(QubitId(1), QubitId(1)),
            Err(IrError::DuplicateQubit { .. })
        ));
        assert!(circuit.is_empty());
    }

    #[test]
    fn test_condition_requires_register() {
        let circuit = Circuit::with_size("test", 1, 1);
        assert!(matches!(
            circuit.condition("nope", 1),
            Err(IrError::UnknownRegister(_))
        ));
        let cond = circuit.condition("c", 1).unwrap();
        assert_eq!(cond.clbits, vec![ClbitId(0)]);
    }

    #[test]
    fn test_bell_state() {
        let circuit = Circuit::bell().unwrap();
        assert_eq!(circuit.num_qubits(), 2);
        assert_eq!(circuit.num_clbits(), 2);
        assert_eq!(circuit.depth(), 3); // H, CX, parallel measures
        assert!(circuit.has_measurements());
        assert!(!circuit.is_unitary());
    }

    #[test]
    fn test_guard_extends_depth_through_clbits() {
        let mut circuit = Circuit::with_size("test", 2, 1);
        circuit.measure(QubitId(0), ClbitId(0)).unwrap();
        let cond = circuit.condition("c", 1).unwrap();
        circuit
            .gate_if(StandardGate::X, [QubitId(1)], cond)
            .unwrap();
        assert_eq!(circuit.depth(), 2);
    }

    #[test]
    fn test_measure_all_adds_register() {
        let mut circuit = Circuit::with_size("test", 3, 0);
        circuit.measure_all().unwrap();
        assert_eq!(circuit.num_clbits(), 3);
        assert!(circuit.layout().creg("meas").is_some());
    }

    #[test]
    fn test_qft_unitary() {
        let circuit = Circuit::qft(3).unwrap();
        assert!(circuit.is_unitary());
        assert_eq!(circuit.count_ops()["cp"], 3);
        assert_eq!(circuit.count_ops()["swap"], 1);
    }

    #[test]
    fn test_fluent_api() {
        let mut circuit = Circuit::with_size("test", 2, 2);
        circuit
            .h(QubitId(0))
            .unwrap()
            .rx(PI / 2.0, QubitId(1))
            .unwrap()
            .cx(QubitId(0), QubitId(1))
            .unwrap()
            .measure(QubitId(0), ClbitId(0))
            .unwrap();

        assert_eq!(circuit.depth(), 3);
        assert_eq!(circuit.len(), 4);
    }
}
