//! Commitment key and verifier material for the Merkle-cap polynomial commitment.

use std::marker::PhantomData;
use std::sync::Arc;

use anyhow::{ensure, Result};
use plonky2::field::extension::Extendable;
use plonky2::field::polynomial::PolynomialValues;
use plonky2::fri::oracle::PolynomialBatch;
use plonky2::hash::hash_types::RichField;
use plonky2::hash::merkle_tree::MerkleCap;
use plonky2::plonk::config::GenericConfig;
use plonky2::util::timing::TimingTree;
use plonky2_util::log2_strict;
use serde::{Deserialize, Serialize};

use crate::srs::{ProverReferenceString, VerifierReferenceString};

/// A commitment to a single polynomial: the cap of the Merkle tree over its low-degree extension.
pub type Commitment<F, C, const D: usize> = MerkleCap<F, <C as GenericConfig<D>>::Hasher>;

/// Commits polynomials using a prover reference string.
///
/// Commitments are pure functions of the polynomial and the key, so a key can be shared freely
/// and used from several threads at once.
#[derive(Debug)]
pub struct CommitmentKey<F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
{
    srs: Arc<ProverReferenceString<F>>,
    _phantom: PhantomData<C>,
}

impl<F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
    CommitmentKey<F, C, D>
{
    pub fn new(srs: Arc<ProverReferenceString<F>>) -> Self {
        Self {
            srs,
            _phantom: PhantomData,
        }
    }

    /// The largest polynomial, in number of points, this key can commit to.
    pub fn max_size(&self) -> usize {
        self.srs.size
    }

    pub fn reference_string(&self) -> &Arc<ProverReferenceString<F>> {
        &self.srs
    }

    /// Commit to a polynomial given by its values over a power-of-two subgroup.
    pub fn commit(&self, polynomial: &PolynomialValues<F>) -> Result<Commitment<F, C, D>> {
        let size = polynomial.len();
        ensure!(
            size.is_power_of_two(),
            "Cannot commit to a polynomial with {} values; size must be a power of two",
            size
        );
        ensure!(
            size <= self.srs.size,
            "Polynomial with {} values exceeds the commitment key size {}",
            size,
            self.srs.size
        );
        let lde_bits = log2_strict(size) + self.srs.rate_bits;
        ensure!(
            self.srs.cap_height <= lde_bits,
            "Cap height {} is larger than the extension domain height {}",
            self.srs.cap_height,
            lde_bits
        );

        // The precomputed roots only cover the full-size extension domain.
        let fft_root_table = (size == self.srs.size).then_some(&self.srs.fft_root_table);
        let batch = PolynomialBatch::<F, C, D>::from_values(
            vec![polynomial.clone()],
            self.srs.rate_bits,
            false,
            self.srs.cap_height,
            &mut TimingTree::default(),
            fft_root_table,
        );
        Ok(batch.merkle_tree.cap)
    }
}

/// Verifier material needed to check openings of commitments made with a [`CommitmentKey`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PcsVerificationKey {
    pub max_degree_bits: usize,
    pub rate_bits: usize,
    pub cap_height: usize,
}

impl From<&VerifierReferenceString> for PcsVerificationKey {
    fn from(crs: &VerifierReferenceString) -> Self {
        Self {
            max_degree_bits: crs.max_degree_bits,
            rate_bits: crs.rate_bits,
            cap_height: crs.cap_height,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use plonky2::field::types::{Field, Sample};
    use plonky2::plonk::config::PoseidonGoldilocksConfig;

    use super::*;

    const D: usize = 2;
    type C = PoseidonGoldilocksConfig;
    type F = <C as GenericConfig<D>>::F;

    fn commitment_key(size: usize) -> CommitmentKey<F, C, D> {
        CommitmentKey::new(Arc::new(ProverReferenceString::new(size, 2, 2)))
    }

    #[test]
    fn test_commit_is_deterministic() -> Result<()> {
        let key = commitment_key(16);
        let poly = PolynomialValues::new(F::rand_vec(16));

        let first = key.commit(&poly)?;
        let second = key.commit(&poly)?;
        assert_eq!(first, second);
        assert_eq!(first.0.len(), 1 << 2);
        Ok(())
    }

    #[test]
    fn test_commit_distinguishes_polynomials() -> Result<()> {
        let key = commitment_key(16);
        let a = PolynomialValues::new(F::rand_vec(16));
        let mut b = a.clone();
        b.values[3] += F::ONE;

        assert_ne!(key.commit(&a)?, key.commit(&b)?);
        Ok(())
    }

    #[test]
    fn test_commit_smaller_polynomial() -> Result<()> {
        let key = commitment_key(16);
        let poly = PolynomialValues::new(F::rand_vec(8));
        key.commit(&poly)?;
        Ok(())
    }

    #[test]
    fn test_commit_rejects_oversized_polynomial() {
        let key = commitment_key(8);
        let poly = PolynomialValues::new(F::rand_vec(16));
        assert!(key.commit(&poly).is_err());
    }

    #[test]
    fn test_commit_rejects_non_power_of_two() {
        let key = commitment_key(16);
        let poly = PolynomialValues::new(F::rand_vec(12));
        assert!(key.commit(&poly).is_err());
    }
}
