use std::sync::Arc;

use anyhow::{ensure, Result};
use plonky2::field::extension::Extendable;
use plonky2::hash::hash_types::RichField;
use plonky2::plonk::config::GenericConfig;
use plonky2_maybe_rayon::*;

use crate::flavor::Flavor;
use crate::keys::ProvingKey;
use crate::pcs::{Commitment, CommitmentKey};

/// A prover bound to a complete proving key.
#[derive(Debug)]
pub struct Prover<Fl: Flavor<F>, F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
{
    proving_key: Arc<ProvingKey<Fl, F, C, D>>,
    commitment_key: Arc<CommitmentKey<F, C, D>>,
}

impl<Fl: Flavor<F>, F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
    Prover<Fl, F, C, D>
{
    /// Fails unless the key holds every precomputed and witness polynomial of the flavor.
    pub fn new(
        proving_key: Arc<ProvingKey<Fl, F, C, D>>,
        commitment_key: Arc<CommitmentKey<F, C, D>>,
    ) -> Result<Self> {
        let store = &proving_key.polynomial_store;
        for name in Fl::precomputed_polynomial_names()
            .into_iter()
            .chain(Fl::witness_polynomial_names())
        {
            ensure!(
                store.contains(&name),
                "Proving key is missing polynomial `{}`",
                name
            );
        }
        ensure!(
            commitment_key.max_size() >= proving_key.circuit_size,
            "Commitment key supports {} points but the circuit size is {}",
            commitment_key.max_size(),
            proving_key.circuit_size
        );
        Ok(Self {
            proving_key,
            commitment_key,
        })
    }

    pub fn proving_key(&self) -> &Arc<ProvingKey<Fl, F, C, D>> {
        &self.proving_key
    }

    pub fn commitment_key(&self) -> &Arc<CommitmentKey<F, C, D>> {
        &self.commitment_key
    }

    /// Commit to the witness polynomials, in the order of
    /// [`Flavor::witness_polynomial_names`].
    pub fn commit_to_wires(&self) -> Result<Vec<(String, Commitment<F, C, D>)>> {
        let store = &self.proving_key.polynomial_store;
        Fl::witness_polynomial_names()
            .into_par_iter()
            .map(|name| -> Result<_> {
                let commitment = self.commitment_key.commit(store.get(&name)?)?;
                Ok((name, commitment))
            })
            .collect()
    }
}
