//! Turning circuits into proving and verification keys.
//!
//! A [`ComposerHelper`] walks a circuit through key synthesis: proving key (precomputed
//! polynomials), witness polynomials, verification key (commitments to the precomputed
//! polynomials), and finally the prover and verifier bound to those keys. The flavor decides
//! which polynomials exist and how the trace is sized; the steps themselves are shared.

mod standard;
mod ultra;

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{anyhow, ensure, Context, Result};
use itertools::Itertools;
use log::{debug, info, Level};
use plonky2::field::extension::Extendable;
use plonky2::field::polynomial::PolynomialValues;
use plonky2::hash::hash_types::RichField;
use plonky2::plonk::config::GenericConfig;
use plonky2::timed;
use plonky2::util::timing::TimingTree;
use plonky2_maybe_rayon::*;
use plonky2_util::log2_strict;

use crate::circuit::CircuitConstructor;
use crate::flavor::{Flavor, StandardFlavor, UltraFlavor};
use crate::keys::{ProvingKey, VerificationKey};
use crate::pcs::{Commitment, CommitmentKey, PcsVerificationKey};
use crate::permutation::{id_polys, CopyCycles};
use crate::polynomial_store::PolynomialStore;
use crate::prover::Prover;
use crate::srs::ReferenceStringFactory;
use crate::verifier::Verifier;

pub type StandardComposerHelper<F, C, const D: usize> = ComposerHelper<StandardFlavor, F, C, D>;
pub type UltraComposerHelper<F, C, const D: usize> = ComposerHelper<UltraFlavor, F, C, D>;

/// Builds and caches the keys of one circuit.
///
/// Keys are shared by `Arc` once built and never change after that: adding the witness to a
/// proving key somebody else holds gives the helper its own copy first.
pub struct ComposerHelper<
    Fl: Flavor<F>,
    F: RichField + Extendable<D>,
    C: GenericConfig<D, F = F>,
    const D: usize,
> {
    flavor: Fl,
    crs_factory: Option<Arc<dyn ReferenceStringFactory<F>>>,
    proving_key: Option<Arc<ProvingKey<Fl, F, C, D>>>,
    verification_key: Option<Arc<VerificationKey<Fl, F, C, D>>>,
    computed_witness: bool,
    zero_knowledge: bool,
}

impl<Fl: Flavor<F>, F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
    ComposerHelper<Fl, F, C, D>
{
    pub fn new(crs_factory: Arc<dyn ReferenceStringFactory<F>>) -> Self {
        Self::with_flavor(Fl::default(), crs_factory)
    }

    pub fn with_flavor(flavor: Fl, crs_factory: Arc<dyn ReferenceStringFactory<F>>) -> Self {
        Self {
            flavor,
            crs_factory: Some(crs_factory),
            proving_key: None,
            verification_key: None,
            computed_witness: false,
            zero_knowledge: false,
        }
    }

    /// A helper around existing keys. It has no reference string factory, so it cannot compute
    /// new keys.
    pub fn from_keys(
        proving_key: Arc<ProvingKey<Fl, F, C, D>>,
        verification_key: Arc<VerificationKey<Fl, F, C, D>>,
    ) -> Self {
        let computed_witness = Fl::witness_polynomial_names()
            .iter()
            .all(|name| proving_key.polynomial_store.contains(name));
        Self {
            flavor: Fl::default(),
            crs_factory: None,
            proving_key: Some(proving_key),
            verification_key: Some(verification_key),
            computed_witness,
            zero_knowledge: false,
        }
    }

    /// Fill the randomized rows of the witness with random values.
    pub fn zero_knowledge(mut self, zero_knowledge: bool) -> Self {
        self.zero_knowledge = zero_knowledge;
        self
    }

    pub fn flavor(&self) -> &Fl {
        &self.flavor
    }

    pub fn proving_key(&self) -> Option<&Arc<ProvingKey<Fl, F, C, D>>> {
        self.proving_key.as_ref()
    }

    pub fn verification_key(&self) -> Option<&Arc<VerificationKey<Fl, F, C, D>>> {
        self.verification_key.as_ref()
    }

    pub fn computed_witness(&self) -> bool {
        self.computed_witness
    }

    /// Build a proving key holding the selector, permutation and Lagrange polynomials of
    /// `circuit`, over a trace of
    /// `max(num_gates + num_randomized_gates, minimum_circuit_size)` rows rounded up to a power
    /// of two.
    pub fn compute_proving_key_base(
        &self,
        circuit: &Fl::Circuit,
        minimum_circuit_size: usize,
        num_randomized_gates: usize,
    ) -> Result<ProvingKey<Fl, F, C, D>> {
        ensure!(
            circuit.is_finalized(),
            "The {} circuit must be finalized before computing its keys",
            Fl::NAME
        );
        let crs_factory = self
            .crs_factory
            .as_ref()
            .ok_or_else(|| anyhow!("No reference string factory to compute keys with"))?;

        let mut timing = TimingTree::new("compute proving key", Level::Debug);
        let num_public_inputs = circuit.public_inputs().len();
        let num_gates = self.flavor.num_gates(circuit);
        let circuit_size =
            circuit_subgroup_size(num_gates + num_randomized_gates, minimum_circuit_size);
        info!(
            "Computing {} proving key: {} rows used, {} randomized, circuit size {}",
            Fl::NAME,
            num_gates,
            num_randomized_gates,
            circuit_size
        );

        let crs = crs_factory
            .prover_crs(circuit_size)
            .with_context(|| format!("Preparing a {} key of size {}", Fl::NAME, circuit_size))?;
        let commitment_key = Arc::new(CommitmentKey::new(crs));

        let mut polynomial_store = PolynomialStore::new();
        let selectors = timed!(
            timing,
            "construct selector polynomials",
            construct_selector_polynomials(circuit, circuit_size)
        );
        for (name, selector) in <Fl::Circuit as CircuitConstructor<F>>::SELECTOR_NAMES
            .iter()
            .zip(selectors)
        {
            polynomial_store.put(*name, selector);
        }

        let (sigmas, ids) = timed!(timing, "compute permutation polynomials", {
            let copy_cycles = CopyCycles::new(circuit);
            (
                copy_cycles.sigma_polys(Fl::NUM_WIRES, circuit_size),
                id_polys(Fl::NUM_WIRES, circuit_size),
            )
        });
        for (i, (sigma, id)) in sigmas.into_iter().zip(ids).enumerate() {
            polynomial_store.put(format!("sigma_{}", i + 1), sigma);
            polynomial_store.put(format!("id_{}", i + 1), id);
        }

        let (lagrange_first, lagrange_last) = lagrange_polynomials(circuit_size);
        polynomial_store.put("lagrange_first", lagrange_first);
        polynomial_store.put("lagrange_last", lagrange_last);

        timing.print();
        Ok(ProvingKey {
            circuit_size,
            log_circuit_size: log2_strict(circuit_size),
            num_public_inputs,
            polynomial_store,
            commitment_key,
            metadata: self.flavor.metadata(circuit),
        })
    }

    /// Compute the proving key of `circuit` with the flavor's sizing and keep it. A key computed
    /// earlier is replaced; holders of the old key keep it unchanged. The witness and the
    /// verification key have to be computed again afterwards.
    pub fn compute_proving_key(
        &mut self,
        circuit: &Fl::Circuit,
    ) -> Result<Arc<ProvingKey<Fl, F, C, D>>> {
        let mut proving_key = self.compute_proving_key_base(
            circuit,
            self.flavor.minimum_circuit_size(circuit),
            self.flavor.num_randomized_gates(),
        )?;
        for (tag, column) in self
            .flavor
            .table_columns(circuit, proving_key.circuit_size)?
        {
            proving_key.put_table_column(column, &tag)?;
        }

        if self.proving_key.is_some() {
            debug!("Replacing the previously computed {} proving key", Fl::NAME);
        }
        let proving_key = Arc::new(proving_key);
        self.proving_key = Some(proving_key.clone());
        self.verification_key = None;
        self.computed_witness = false;
        Ok(proving_key)
    }

    /// Add the witness polynomials of `circuit` to the proving key, computing the key first if
    /// needed. Does nothing once the witness has been computed.
    pub fn compute_witness_base(
        &mut self,
        circuit: &Fl::Circuit,
        minimum_circuit_size: usize,
    ) -> Result<()> {
        if self.computed_witness {
            debug!("{} witness already computed, skipping", Fl::NAME);
            return Ok(());
        }
        if self.proving_key.is_none() {
            self.compute_proving_key(circuit)?;
        }

        let num_randomized_gates = self.flavor.num_randomized_gates();
        let required_size = circuit_subgroup_size(
            self.flavor.num_gates(circuit) + num_randomized_gates,
            minimum_circuit_size,
        );
        let proving_key = self
            .proving_key
            .as_mut()
            .ok_or_else(|| anyhow!("No proving key to add the witness to"))?;
        let circuit_size = proving_key.circuit_size;
        ensure!(
            required_size <= circuit_size,
            "The witness needs a circuit of size {} but the proving key has size {}",
            required_size,
            circuit_size
        );

        let mut timing = TimingTree::new("compute witness", Level::Debug);
        let wires = timed!(
            timing,
            "construct wire polynomials",
            construct_wire_polynomials(
                circuit,
                circuit_size,
                num_randomized_gates,
                self.zero_knowledge
            )
        );
        let extra_witness = timed!(
            timing,
            "construct extra witness polynomials",
            self.flavor.extra_witness(circuit, circuit_size)?
        );

        if Arc::strong_count(proving_key) > 1 {
            debug!("{} proving key is shared, copying it to add the witness", Fl::NAME);
        }
        let proving_key = Arc::make_mut(proving_key);
        for (name, wire) in Fl::WIRE_NAMES.iter().zip(wires) {
            proving_key.polynomial_store.put(*name, wire);
        }
        for (name, polynomial) in extra_witness {
            proving_key.polynomial_store.put(name, polynomial);
        }
        timing.print();

        self.computed_witness = true;
        Ok(())
    }

    /// Commit to every precomputed polynomial of the proving key, computing the key first if
    /// needed. The verification key is computed once and then returned as is.
    pub fn compute_verification_key(
        &mut self,
        circuit: &Fl::Circuit,
    ) -> Result<Arc<VerificationKey<Fl, F, C, D>>> {
        if let Some(verification_key) = &self.verification_key {
            return Ok(verification_key.clone());
        }
        if self.proving_key.is_none() {
            self.compute_proving_key(circuit)?;
        }
        let proving_key = self
            .proving_key
            .clone()
            .ok_or_else(|| anyhow!("No proving key to compute the verification key from"))?;
        let crs_factory = self
            .crs_factory
            .as_ref()
            .ok_or_else(|| anyhow!("No reference string factory to compute keys with"))?;
        let pcs_verification_key = Arc::new(PcsVerificationKey::from(
            crs_factory.verifier_crs()?.as_ref(),
        ));

        let mut timing = TimingTree::new("compute verification key", Level::Debug);
        let names = proving_key
            .polynomial_store
            .names_sorted()
            .into_iter()
            .filter(|name| !Fl::is_witness_polynomial(name))
            .collect_vec();
        let commitments = timed!(
            timing,
            "commit to precomputed polynomials",
            commit_all(&proving_key, names)?
        );
        timing.print();

        let verification_key = Arc::new(VerificationKey {
            circuit_size: proving_key.circuit_size,
            log_circuit_size: proving_key.log_circuit_size,
            num_public_inputs: proving_key.num_public_inputs,
            commitments,
            pcs_verification_key,
            metadata: proving_key.metadata.clone(),
        });
        self.verification_key = Some(verification_key.clone());
        Ok(verification_key)
    }

    pub fn create_verifier(&mut self, circuit: &Fl::Circuit) -> Result<Verifier<Fl, F, C, D>> {
        let verification_key = self.compute_verification_key(circuit)?;
        let pcs_verification_key = verification_key.pcs_verification_key.clone();
        Ok(Verifier::new(verification_key, pcs_verification_key))
    }

    /// Compute whatever is still missing of the proving key and witness and bind a prover to
    /// the key.
    pub fn create_prover_base(
        &mut self,
        circuit: &Fl::Circuit,
        minimum_circuit_size: usize,
    ) -> Result<Prover<Fl, F, C, D>> {
        if self.proving_key.is_none() {
            self.compute_proving_key(circuit)?;
        }
        self.compute_witness_base(circuit, minimum_circuit_size)?;

        let proving_key = self
            .proving_key
            .clone()
            .ok_or_else(|| anyhow!("No proving key to create a prover from"))?;
        let commitment_key = proving_key.commitment_key.clone();
        Prover::new(proving_key, commitment_key)
    }
}

/// The trace size for `num_gates` rows: the next power of two, and at least
/// `minimum_circuit_size`.
pub fn circuit_subgroup_size(num_gates: usize, minimum_circuit_size: usize) -> usize {
    num_gates.max(minimum_circuit_size).next_power_of_two()
}

fn commit_all<Fl, F, C, const D: usize>(
    proving_key: &ProvingKey<Fl, F, C, D>,
    names: Vec<String>,
) -> Result<BTreeMap<String, Commitment<F, C, D>>>
where
    Fl: Flavor<F>,
    F: RichField + Extendable<D>,
    C: GenericConfig<D, F = F>,
{
    names
        .into_par_iter()
        .map(|name| -> Result<_> {
            let polynomial = proving_key.polynomial_store.get(&name)?;
            let commitment = proving_key
                .commitment_key
                .commit(polynomial)
                .with_context(|| format!("Committing to `{name}`"))?;
            Ok((name, commitment))
        })
        .collect()
}

/// Selector values on every trace row. Public input rows have all selectors off.
pub(crate) fn construct_selector_polynomials<F: RichField, Circuit: CircuitConstructor<F>>(
    circuit: &Circuit,
    circuit_size: usize,
) -> Vec<PolynomialValues<F>> {
    let offset = circuit.public_inputs().len();
    circuit
        .selectors()
        .iter()
        .map(|selector| {
            let mut values = vec![F::ZERO; circuit_size];
            values[offset..offset + selector.len()].copy_from_slice(selector);
            PolynomialValues::new(values)
        })
        .collect()
}

/// Wire values on every trace row: public inputs on the first two wires of the leading rows, then
/// the gates, then zero padding. With `zero_knowledge`, the last `num_randomized_gates` rows are
/// random.
pub(crate) fn construct_wire_polynomials<F: RichField, Circuit: CircuitConstructor<F>>(
    circuit: &Circuit,
    circuit_size: usize,
    num_randomized_gates: usize,
    zero_knowledge: bool,
) -> Vec<PolynomialValues<F>> {
    let public_inputs = circuit.public_inputs();
    let offset = public_inputs.len();
    circuit
        .wires()
        .iter()
        .enumerate()
        .map(|(column, wire)| {
            let mut values = vec![F::ZERO; circuit_size];
            if column < 2 {
                for (row, &variable) in public_inputs.iter().enumerate() {
                    values[row] = circuit.variable(variable);
                }
            }
            for (gate, &variable) in wire.iter().enumerate() {
                values[offset + gate] = circuit.variable(variable);
            }
            if zero_knowledge {
                for value in &mut values[circuit_size - num_randomized_gates..] {
                    *value = F::rand();
                }
            }
            PolynomialValues::new(values)
        })
        .collect()
}

/// `lagrange_first` is one on the first row only, `lagrange_last` on the last row only.
pub(crate) fn lagrange_polynomials<F: RichField>(
    circuit_size: usize,
) -> (PolynomialValues<F>, PolynomialValues<F>) {
    let mut first = vec![F::ZERO; circuit_size];
    let mut last = vec![F::ZERO; circuit_size];
    first[0] = F::ONE;
    last[circuit_size - 1] = F::ONE;
    (PolynomialValues::new(first), PolynomialValues::new(last))
}
