use std::sync::Arc;

use anyhow::{anyhow, Result};
use plonky2::field::extension::Extendable;
use plonky2::hash::hash_types::RichField;
use plonky2::plonk::config::GenericConfig;

use crate::flavor::Flavor;
use crate::keys::VerificationKey;
use crate::pcs::{Commitment, PcsVerificationKey};

/// A verifier bound to a verification key.
#[derive(Debug)]
pub struct Verifier<
    Fl: Flavor<F>,
    F: RichField + Extendable<D>,
    C: GenericConfig<D, F = F>,
    const D: usize,
> {
    verification_key: Arc<VerificationKey<Fl, F, C, D>>,
    pcs_verification_key: Arc<PcsVerificationKey>,
}

impl<Fl: Flavor<F>, F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
    Verifier<Fl, F, C, D>
{
    pub fn new(
        verification_key: Arc<VerificationKey<Fl, F, C, D>>,
        pcs_verification_key: Arc<PcsVerificationKey>,
    ) -> Self {
        Self {
            verification_key,
            pcs_verification_key,
        }
    }

    pub fn verification_key(&self) -> &Arc<VerificationKey<Fl, F, C, D>> {
        &self.verification_key
    }

    pub fn pcs_verification_key(&self) -> &Arc<PcsVerificationKey> {
        &self.pcs_verification_key
    }

    pub fn commitment(&self, name: &str) -> Result<&Commitment<F, C, D>> {
        self.verification_key
            .commitment(name)
            .ok_or_else(|| anyhow!("Verification key has no commitment to `{}`", name))
    }
}
