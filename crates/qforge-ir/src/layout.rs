//! Register side-channel.
//!
//! Declaring a register projects its slots onto the next free run of the
//! circuit's flat index space. Downstream stages only see flat indices; the
//! [`RegisterLayout`] keeps the name/offset/size of every register so a caller
//! (the exporter, classical conditions, diagnostics) can map back.

use serde::{Deserialize, Serialize};

use crate::qubit::{ClbitId, QubitId};

/// A named, contiguous run of slots in the flat index space.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Register {
    /// Register name as declared.
    pub name: String,
    /// Flat index of slot 0.
    pub offset: u32,
    /// Number of slots.
    pub size: u32,
}

impl Register {
    /// Flat index of slot `i`, if `i` is inside the register.
    pub fn slot(&self, i: u32) -> Option<u32> {
        (i < self.size).then(|| self.offset + i)
    }

    /// Whether the flat index falls inside this register.
    pub fn contains(&self, flat: u32) -> bool {
        flat >= self.offset && flat < self.offset + self.size
    }

    /// All flat indices of this register, slot 0 first.
    pub fn slots(&self) -> impl Iterator<Item = u32> + '_ {
        self.offset..self.offset + self.size
    }
}

/// Name to index-range mapping for quantum and classical registers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterLayout {
    qregs: Vec<Register>,
    cregs: Vec<Register>,
}

impl RegisterLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_qreg(&mut self, name: String, offset: u32, size: u32) {
        self.qregs.push(Register { name, offset, size });
    }

    pub(crate) fn push_creg(&mut self, name: String, offset: u32, size: u32) {
        self.cregs.push(Register { name, offset, size });
    }

    /// Quantum registers in declaration order.
    pub fn qregs(&self) -> &[Register] {
        &self.qregs
    }

    /// Classical registers in declaration order.
    pub fn cregs(&self) -> &[Register] {
        &self.cregs
    }

    /// Look up a quantum register by name.
    pub fn qreg(&self, name: &str) -> Option<&Register> {
        self.qregs.iter().find(|r| r.name == name)
    }

    /// Look up a classical register by name.
    pub fn creg(&self, name: &str) -> Option<&Register> {
        self.cregs.iter().find(|r| r.name == name)
    }

    /// Whether any register (quantum or classical) uses this name.
    pub fn is_declared(&self, name: &str) -> bool {
        self.qreg(name).is_some() || self.creg(name).is_some()
    }

    /// Map a flat qubit back to `(register, slot)`.
    pub fn locate_qubit(&self, qubit: QubitId) -> Option<(&Register, u32)> {
        self.qregs
            .iter()
            .find(|r| r.contains(qubit.0))
            .map(|r| (r, qubit.0 - r.offset))
    }

    /// Map a flat classical bit back to `(register, slot)`.
    pub fn locate_clbit(&self, clbit: ClbitId) -> Option<(&Register, u32)> {
        self.cregs
            .iter()
            .find(|r| r.contains(clbit.0))
            .map(|r| (r, clbit.0 - r.offset))
    }

    /// Whether every flat qubit below `num_qubits` belongs to some register.
    pub fn covers_qubits(&self, num_qubits: u32) -> bool {
        (0..num_qubits).all(|q| self.locate_qubit(QubitId(q)).is_some())
    }

    /// Whether every flat classical bit below `num_clbits` belongs to some register.
    pub fn covers_clbits(&self, num_clbits: u32) -> bool {
        (0..num_clbits).all(|c| self.locate_clbit(ClbitId(c)).is_some())
    }
}
