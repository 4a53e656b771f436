use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{ensure, Result};
use plonky2::field::extension::Extendable;
use plonky2::field::polynomial::PolynomialValues;
use plonky2::hash::hash_types::RichField;
use plonky2::plonk::config::GenericConfig;
use serde::{Deserialize, Serialize};

use crate::flavor::Flavor;
use crate::pcs::{Commitment, CommitmentKey, PcsVerificationKey};
use crate::polynomial_store::PolynomialStore;

/// Everything a prover needs: the precomputed polynomials and, once computed, the witness
/// polynomials, all held in one store.
#[derive(Clone, Debug)]
pub struct ProvingKey<
    Fl: Flavor<F>,
    F: RichField + Extendable<D>,
    C: GenericConfig<D, F = F>,
    const D: usize,
> {
    /// Number of rows of the trace, a power of two.
    pub circuit_size: usize,
    pub log_circuit_size: usize,
    pub num_public_inputs: usize,
    pub polynomial_store: PolynomialStore<F>,
    pub commitment_key: Arc<CommitmentKey<F, C, D>>,
    pub metadata: Fl::Metadata,
}

impl<Fl: Flavor<F>, F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
    ProvingKey<Fl, F, C, D>
{
    /// Store a lookup table column under `"{tag}_lagrange"`.
    pub fn put_table_column(&mut self, polynomial: PolynomialValues<F>, tag: &str) -> Result<()> {
        ensure!(
            polynomial.len() == self.circuit_size,
            "Table column `{}` has {} values but the circuit size is {}",
            tag,
            polynomial.len(),
            self.circuit_size
        );
        self.polynomial_store
            .put(format!("{tag}_lagrange"), polynomial);
        Ok(())
    }
}

/// Commitments to the precomputed polynomials of a proving key.
///
/// Commitments are keyed by polynomial name in a sorted map, so iteration and serialization
/// order never depend on how the key was built.
#[derive(Debug, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct VerificationKey<
    Fl: Flavor<F>,
    F: RichField + Extendable<D>,
    C: GenericConfig<D, F = F>,
    const D: usize,
> {
    pub circuit_size: usize,
    pub log_circuit_size: usize,
    pub num_public_inputs: usize,
    pub commitments: BTreeMap<String, Commitment<F, C, D>>,
    pub pcs_verification_key: Arc<PcsVerificationKey>,
    pub metadata: Fl::Metadata,
}

impl<Fl: Flavor<F>, F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
    VerificationKey<Fl, F, C, D>
{
    pub fn commitment(&self, name: &str) -> Option<&Commitment<F, C, D>> {
        self.commitments.get(name)
    }
}
