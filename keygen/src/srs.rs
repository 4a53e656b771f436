//! Reference strings backing polynomial commitments.
//!
//! The composer never loads reference strings itself: it is handed a [`ReferenceStringFactory`]
//! and asks it for prover material sized for the circuit, and for the verifier material used to
//! check openings.

use std::sync::Arc;

use anyhow::{ensure, Result};
use log::debug;
use plonky2_field::fft::{fft_root_table, FftRootTable};
use plonky2_field::types::Field;
use plonky2_util::log2_strict;
use serde::{Deserialize, Serialize};

/// Parameters of an in-memory reference string.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReferenceStringConfig {
    /// Log2 of the largest circuit size the reference string supports.
    pub max_degree_bits: usize,
    /// Log2 of the blowup factor of the low-degree extension committed to.
    pub rate_bits: usize,
    /// Height of the Merkle caps produced by commitments.
    pub cap_height: usize,
}

impl Default for ReferenceStringConfig {
    fn default() -> Self {
        Self {
            max_degree_bits: 20,
            rate_bits: 3,
            cap_height: 4,
        }
    }
}

/// Prover-side reference string for circuits of a fixed size: the root table of the
/// low-degree-extension domain.
#[derive(Debug)]
pub struct ProverReferenceString<F: Field> {
    /// Number of points (circuit size) this reference string serves.
    pub size: usize,
    pub rate_bits: usize,
    pub cap_height: usize,
    pub fft_root_table: FftRootTable<F>,
}

impl<F: Field> ProverReferenceString<F> {
    pub fn new(size: usize, rate_bits: usize, cap_height: usize) -> Self {
        Self {
            size,
            rate_bits,
            cap_height,
            fft_root_table: fft_root_table(size << rate_bits),
        }
    }

    pub fn lde_size(&self) -> usize {
        self.size << self.rate_bits
    }
}

/// Verifier-side reference string.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct VerifierReferenceString {
    pub max_degree_bits: usize,
    pub rate_bits: usize,
    pub cap_height: usize,
}

/// Source of prover and verifier reference strings.
///
/// Factories are long-lived and shared between composers; both methods take `&self`.
pub trait ReferenceStringFactory<F: Field>: Send + Sync {
    /// Prover material for committing to polynomials with `size` points. Fails if the reference
    /// string is too small.
    fn prover_crs(&self, size: usize) -> Result<Arc<ProverReferenceString<F>>>;

    fn verifier_crs(&self) -> Result<Arc<VerifierReferenceString>>;
}

/// A reference string factory configured explicitly by the caller, holding everything in memory.
#[derive(Clone, Debug, Default)]
pub struct MemReferenceStringFactory {
    config: ReferenceStringConfig,
}

impl MemReferenceStringFactory {
    pub fn new(config: ReferenceStringConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ReferenceStringConfig {
        &self.config
    }

    pub fn max_size(&self) -> usize {
        1 << self.config.max_degree_bits
    }
}

impl<F: Field> ReferenceStringFactory<F> for MemReferenceStringFactory {
    fn prover_crs(&self, size: usize) -> Result<Arc<ProverReferenceString<F>>> {
        ensure!(
            size.is_power_of_two(),
            "Reference strings are only available for power-of-two sizes, got {}",
            size
        );
        ensure!(
            size <= self.max_size(),
            "Insufficient reference string: {} points requested but only {} are available",
            size,
            self.max_size()
        );
        let lde_bits = log2_strict(size) + self.config.rate_bits;
        ensure!(
            lde_bits <= F::TWO_ADICITY,
            "Extension domain of 2^{} points exceeds the field's two-adicity {}",
            lde_bits,
            F::TWO_ADICITY
        );

        debug!(
            "Preparing prover reference string for {} points ({} after extension)",
            size,
            size << self.config.rate_bits
        );
        Ok(Arc::new(ProverReferenceString::new(
            size,
            self.config.rate_bits,
            self.config.cap_height,
        )))
    }

    fn verifier_crs(&self) -> Result<Arc<VerifierReferenceString>> {
        Ok(Arc::new(VerifierReferenceString {
            max_degree_bits: self.config.max_degree_bits,
            rate_bits: self.config.rate_bits,
            cap_height: self.config.cap_height,
        }))
    }
}
