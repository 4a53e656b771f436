use std::sync::Arc;

use anyhow::{anyhow, Result};
use plonky2::field::extension::Extendable;
use plonky2::field::polynomial::PolynomialValues;
use plonky2::hash::hash_types::RichField;
use plonky2::plonk::config::GenericConfig;

use super::ComposerHelper;
use crate::circuit::{CircuitConstructor, UltraCircuitConstructor};
use crate::flavor::{Flavor, UltraFlavor};
use crate::prover::Prover;

impl<F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
    ComposerHelper<UltraFlavor, F, C, D>
{
    /// Rows left free between the lookup tables and the end of the trace.
    pub fn s_randomness(&self) -> usize {
        self.flavor.s_randomness
    }

    /// Add the deferred gates of `circuit`. Does nothing for a finalized circuit.
    pub fn finalize_circuit(&self, circuit: &mut UltraCircuitConstructor<F>) {
        circuit.finalize_circuit();
    }

    /// Add the wire polynomials `w_l`, `w_r`, `w_o`, `w_4` and the sorted lists of the lookup
    /// argument to the proving key, finalizing the circuit and computing the key first if needed.
    pub fn compute_witness(&mut self, circuit: &mut UltraCircuitConstructor<F>) -> Result<()> {
        if self.computed_witness {
            return Ok(());
        }
        self.finalize_circuit(circuit);
        let minimum_circuit_size = self.flavor.minimum_circuit_size(circuit);
        self.compute_witness_base(circuit, minimum_circuit_size)
    }

    pub fn create_prover(
        &mut self,
        circuit: &mut UltraCircuitConstructor<F>,
    ) -> Result<Prover<UltraFlavor, F, C, D>> {
        self.finalize_circuit(circuit);
        let minimum_circuit_size = self.flavor.minimum_circuit_size(circuit);
        self.create_prover_base(circuit, minimum_circuit_size)
    }

    /// Store a lookup table column in the proving key under `"{tag}_lagrange"`. A cached
    /// verification key lacks a commitment to the column and is dropped.
    pub fn add_table_column_selector_poly_to_proving_key(
        &mut self,
        polynomial: PolynomialValues<F>,
        tag: &str,
    ) -> Result<()> {
        let proving_key = self
            .proving_key
            .as_mut()
            .ok_or_else(|| anyhow!("No proving key to add table column `{}` to", tag))?;
        Arc::make_mut(proving_key).put_table_column(polynomial, tag)?;
        self.verification_key = None;
        Ok(())
    }
}
