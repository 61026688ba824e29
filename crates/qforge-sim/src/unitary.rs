//! Whole-circuit unitaries.

use ndarray::Array2;
use num_complex::Complex64;
use qforge_ir::{Circuit, InstructionKind};
use tracing::debug;

use crate::error::{SimError, SimResult};
use crate::executor::apply_gate;
use crate::statevector::Statevector;

/// Widest circuit whose dense unitary is built.
pub const MAX_UNITARY_QUBITS: usize = 13;

/// Unitary matrix of a measurement-free, guard-free circuit.
///
/// Column `j` is the image of basis state `|j⟩`, little-endian. Circuits
/// wider than [`MAX_UNITARY_QUBITS`] fail with [`SimError::TooManyQubits`].
pub fn circuit_unitary(circuit: &Circuit) -> SimResult<Array2<Complex64>> {
    if let Some(inst) = circuit
        .instructions()
        .iter()
        .find(|i| i.is_measure() || i.is_reset() || i.condition().is_some())
    {
        return Err(SimError::NotUnitary(inst.name()));
    }

    let n = circuit.num_qubits();
    if n > MAX_UNITARY_QUBITS {
        return Err(SimError::TooManyQubits {
            num_qubits: n,
            max: MAX_UNITARY_QUBITS,
        });
    }
    let dim = 1usize << n;
    debug!(qubits = n, "building circuit unitary");
    let mut unitary = Array2::zeros((dim, dim));
    for col in 0..dim {
        let mut state = Statevector::basis(n, col)?;
        for inst in circuit.instructions() {
            if let InstructionKind::Gate(gate) = &inst.kind {
                apply_gate(&mut state, gate, inst)?;
            }
        }
        for (row, amp) in state.amplitudes().iter().enumerate() {
            unitary[[row, col]] = *amp;
        }
    }
    Ok(unitary)
}

/// Whether `a` and `b` agree up to a global phase, entrywise within `tol`.
pub fn equivalent_up_to_phase(a: &Array2<Complex64>, b: &Array2<Complex64>, tol: f64) -> bool {
    if a.shape() != b.shape() {
        return false;
    }
    // Phase taken from the largest entry of `a`.
    let Some((idx, pivot)) = a
        .indexed_iter()
        .max_by(|x, y| x.1.norm_sqr().total_cmp(&y.1.norm_sqr()))
    else {
        return true;
    };
    if pivot.norm() < tol {
        return b.iter().all(|v| v.norm() < tol);
    }
    let other = b[idx];
    if other.norm() < tol {
        return false;
    }
    let phase = (other / pivot) / (other / pivot).norm();
    a.iter().zip(b).all(|(x, y)| (x * phase - y).norm() < tol)
}

#[cfg(test)]
mod tests {
    use super::*;
    use qforge_ir::QubitId;

    #[test]
    fn test_wide_circuit_has_no_unitary() {
        let circuit = Circuit::with_size("wide", 64, 0);
        assert!(matches!(
            circuit_unitary(&circuit),
            Err(SimError::TooManyQubits { num_qubits: 64, max: MAX_UNITARY_QUBITS })
        ));
    }

    #[test]
    fn test_cx_unitary_little_endian() {
        let mut circuit = Circuit::with_size("cx", 2, 0);
        circuit.cx(QubitId(0), QubitId(1)).unwrap();
        let u = circuit_unitary(&circuit).unwrap();
        // |01⟩ (qubit 0 set) maps to |11⟩.
        assert!((u[[0b11, 0b01]].re - 1.0).abs() < 1e-12);
        assert!((u[[0b10, 0b10]].re - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_measurement_is_not_unitary() {
        let circuit = Circuit::bell().unwrap();
        assert!(matches!(
            circuit_unitary(&circuit),
            Err(SimError::NotUnitary(ref name)) if name == "measure"
        ));
    }

    #[test]
    fn test_global_phase_equivalence() {
        let mut a = Circuit::with_size("z", 1, 0);
        a.z(QubitId(0)).unwrap();
        let mut b = Circuit::with_size("rz", 1, 0);
        b.rz(std::f64::consts::PI, QubitId(0)).unwrap();
        let (ua, ub) = (circuit_unitary(&a).unwrap(), circuit_unitary(&b).unwrap());
        assert!(equivalent_up_to_phase(&ua, &ub, 1e-10));

        let mut c = Circuit::with_size("x", 1, 0);
        c.x(QubitId(0)).unwrap();
        assert!(!equivalent_up_to_phase(&ua, &circuit_unitary(&c).unwrap(), 1e-10));
    }
}
