use std::sync::Arc;

use anyhow::Result;
use plonky2::field::types::Field;
use plonky2::plonk::config::{GenericConfig, PoseidonGoldilocksConfig};

use crate::circuit::{
    AddQuad, AddTriple, CircuitConstructor, LookupTable, MulTriple, StandardCircuitConstructor,
    UltraCircuitConstructor,
};
use crate::srs::{MemReferenceStringFactory, ReferenceStringConfig, ReferenceStringFactory};

pub(crate) const D: usize = 2;
pub(crate) type C = PoseidonGoldilocksConfig;
pub(crate) type F = <C as GenericConfig<D>>::F;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().format_timestamp(None).try_init();
}

pub(crate) fn crs_factory(max_degree_bits: usize) -> Arc<dyn ReferenceStringFactory<F>> {
    Arc::new(MemReferenceStringFactory::new(ReferenceStringConfig {
        max_degree_bits,
        rate_bits: 1,
        cap_height: 2,
    }))
}

/// One public input `x = 3` and three gates: `x * y = xy`, `xy + x = sum` and a boolean check.
pub(crate) fn standard_circuit() -> StandardCircuitConstructor<F> {
    let mut circuit = StandardCircuitConstructor::new();
    let x = circuit.add_public_variable(F::from_canonical_u64(3));
    let y = circuit.add_variable(F::from_canonical_u64(4));
    let xy = circuit.add_variable(F::from_canonical_u64(12));
    let sum = circuit.add_variable(F::from_canonical_u64(15));
    let one = circuit.add_variable(F::ONE);

    circuit.create_mul_gate(&MulTriple {
        a: x,
        b: y,
        c: xy,
        mul_scaling: F::ONE,
        c_scaling: F::NEG_ONE,
        const_scaling: F::ZERO,
    });
    circuit.create_add_gate(&AddTriple {
        a: xy,
        b: x,
        c: sum,
        a_scaling: F::ONE,
        b_scaling: F::ONE,
        c_scaling: F::NEG_ONE,
        const_scaling: F::ZERO,
    });
    circuit.create_bool_gate(one);
    circuit
}

/// A circuit using a 16-row XOR table, a range constraint and a recursive proof, not yet
/// finalized.
pub(crate) fn ultra_circuit() -> Result<UltraCircuitConstructor<F>> {
    let mut circuit = UltraCircuitConstructor::new();
    let x = circuit.add_public_variable(F::from_canonical_u64(3));

    let xor = circuit.add_lookup_table(LookupTable::xor("XOR_2", 2));
    // Row 4 * a + b holds (a, b, a ^ b).
    let [a, b, c] = circuit.create_lookup_gate(xor, 14)?;
    let [d, _, e] = circuit.create_lookup_gate(xor, 13)?;
    circuit.assert_equal(x, a);
    circuit.assert_equal(x, d);

    let total_value = circuit.variable(b) + circuit.variable(c) + circuit.variable(e);
    let total = circuit.add_variable(total_value);
    circuit.create_big_add_gate(&AddQuad {
        a: b,
        b: c,
        c: e,
        d: total,
        a_scaling: F::ONE,
        b_scaling: F::ONE,
        c_scaling: F::ONE,
        d_scaling: F::NEG_ONE,
        const_scaling: F::ZERO,
    });
    circuit.create_new_range_constraint(total, 7);

    circuit.add_recursive_proof(&[b, c])?;
    Ok(circuit)
}
