use anyhow::Result;
use plonky2::field::extension::Extendable;
use plonky2::hash::hash_types::RichField;
use plonky2::plonk::config::GenericConfig;

use super::ComposerHelper;
use crate::circuit::StandardCircuitConstructor;
use crate::flavor::StandardFlavor;
use crate::prover::Prover;

impl<F: RichField + Extendable<D>, C: GenericConfig<D, F = F>, const D: usize>
    ComposerHelper<StandardFlavor, F, C, D>
{
    /// Add the wire polynomials `w_l`, `w_r` and `w_o` to the proving key. The key is computed
    /// first if needed, and has to be at least `minimum_circuit_size` large.
    pub fn compute_witness(
        &mut self,
        circuit: &StandardCircuitConstructor<F>,
        minimum_circuit_size: usize,
    ) -> Result<()> {
        self.compute_witness_base(circuit, minimum_circuit_size)
    }

    pub fn create_prover(
        &mut self,
        circuit: &StandardCircuitConstructor<F>,
    ) -> Result<Prover<StandardFlavor, F, C, D>> {
        self.create_prover_base(circuit, 0)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use plonky2::field::types::Field;

    use crate::composer::StandardComposerHelper;
    use crate::flavor::{Flavor, StandardFlavor};
    use crate::test_utils::{crs_factory, init_logger, standard_circuit, C, D, F};

    type Helper = StandardComposerHelper<F, C, D>;

    fn precomputed_names() -> Vec<String> {
        <StandardFlavor as Flavor<F>>::precomputed_polynomial_names()
    }

    fn witness_names() -> Vec<String> {
        <StandardFlavor as Flavor<F>>::witness_polynomial_names()
    }

    #[test]
    fn test_proving_key_for_three_gates() -> Result<()> {
        init_logger();
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(10));
        let proving_key = helper.compute_proving_key(&circuit)?;

        // One public input row and three gates, plus two reserved rows.
        assert_eq!(proving_key.circuit_size, 8);
        assert_eq!(proving_key.log_circuit_size, 3);
        assert_eq!(proving_key.num_public_inputs, 1);
        assert_eq!(proving_key.commitment_key.max_size(), 8);

        let store = &proving_key.polynomial_store;
        assert_eq!(store.len(), precomputed_names().len());
        for name in precomputed_names() {
            assert_eq!(store.get(&name)?.len(), 8);
        }
        for name in witness_names() {
            assert!(!store.contains(&name));
        }
        assert!(!helper.computed_witness());
        Ok(())
    }

    #[test]
    fn test_minimum_circuit_size() -> Result<()> {
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(10));

        let proving_key = helper.compute_proving_key_base(&circuit, 64, 2)?;
        assert_eq!(proving_key.circuit_size, 64);
        assert_eq!(proving_key.polynomial_store.get("q_m")?.len(), 64);

        // The stored key has size 8, too small for a witness of size 64.
        helper.compute_proving_key(&circuit)?;
        assert!(helper.compute_witness(&circuit, 64).is_err());
        assert!(!helper.computed_witness());
        helper.compute_witness(&circuit, 8)?;
        assert!(helper.computed_witness());
        Ok(())
    }

    #[test]
    fn test_witness_polynomials() -> Result<()> {
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(10));
        helper.compute_witness(&circuit, 0)?;

        let proving_key = helper.proving_key().expect("computed with the witness");
        let w_l = &proving_key.polynomial_store.get("w_l")?.values;
        let w_r = &proving_key.polynomial_store.get("w_r")?.values;
        let w_o = &proving_key.polynomial_store.get("w_o")?.values;
        let [three, four, twelve, fifteen] = [3, 4, 12, 15].map(F::from_canonical_u64);
        assert_eq!(&w_l[..4], &[three, three, twelve, F::ONE]);
        assert_eq!(&w_r[..4], &[three, four, three, F::ONE]);
        assert_eq!(&w_o[..4], &[F::ZERO, twelve, fifteen, F::ZERO]);
        assert!(w_l[4..].iter().all(|value| value.is_zero()));
        Ok(())
    }

    #[test]
    fn test_witness_is_computed_once() -> Result<()> {
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(10)).zero_knowledge(true);
        helper.compute_witness(&circuit, 0)?;
        let first = helper
            .proving_key()
            .expect("computed with the witness")
            .polynomial_store
            .clone();

        // Random rows would differ if the witness were built again.
        helper.compute_witness(&circuit, 0)?;
        let second = &helper
            .proving_key()
            .expect("computed with the witness")
            .polynomial_store;
        assert_eq!(&first, second);
        Ok(())
    }

    #[test]
    fn test_zero_knowledge_masks_reserved_rows() -> Result<()> {
        let circuit = standard_circuit();
        let mut plain = Helper::new(crs_factory(10));
        let mut masked = Helper::new(crs_factory(10)).zero_knowledge(true);
        plain.compute_witness(&circuit, 0)?;
        masked.compute_witness(&circuit, 0)?;

        let plain_key = plain.proving_key().expect("computed with the witness");
        let masked_key = masked.proving_key().expect("computed with the witness");
        for name in witness_names() {
            let plain_values = &plain_key.polynomial_store.get(&name)?.values;
            let masked_values = &masked_key.polynomial_store.get(&name)?.values;
            assert_eq!(plain_values[..6], masked_values[..6]);
            assert_ne!(plain_values[6..], masked_values[6..]);
        }
        // Only the witness is masked.
        for name in precomputed_names() {
            assert_eq!(
                plain_key.polynomial_store.get(&name)?,
                masked_key.polynomial_store.get(&name)?
            );
        }
        Ok(())
    }

    #[test]
    fn test_verification_key_commits_precomputed_polynomials() -> Result<()> {
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(10));
        helper.compute_witness(&circuit, 0)?;
        let verification_key = helper.compute_verification_key(&circuit)?;
        let proving_key = helper.proving_key().expect("computed with the witness");

        assert_eq!(verification_key.circuit_size, 8);
        assert_eq!(verification_key.num_public_inputs, 1);
        assert_eq!(verification_key.commitments.len(), precomputed_names().len());
        for name in precomputed_names() {
            let expected = proving_key
                .commitment_key
                .commit(proving_key.polynomial_store.get(&name)?)?;
            assert_eq!(verification_key.commitment(&name), Some(&expected));
        }
        for name in witness_names() {
            assert!(verification_key.commitment(&name).is_none());
        }

        // Cached from now on.
        let again = helper.compute_verification_key(&circuit)?;
        assert!(Arc::ptr_eq(&verification_key, &again));
        Ok(())
    }

    #[test]
    fn test_verification_key_serialization_is_deterministic() -> Result<()> {
        let circuit = standard_circuit();
        let mut first = Helper::new(crs_factory(10));
        let mut second = Helper::new(crs_factory(10));
        // Build the second key along a different path.
        second.compute_witness(&circuit, 0)?;

        let first_json = serde_json::to_string(&*first.compute_verification_key(&circuit)?)?;
        let second_json = serde_json::to_string(&*second.compute_verification_key(&circuit)?)?;
        assert_eq!(first_json, second_json);
        let q_c = first_json.find("\"q_c\"").expect("commitment to q_c");
        let q_m = first_json.find("\"q_m\"").expect("commitment to q_m");
        assert!(q_c < q_m);
        Ok(())
    }

    #[test]
    fn test_recomputing_proving_key_detaches_old_key() -> Result<()> {
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(10));
        let old_key = helper.compute_proving_key(&circuit)?;
        helper.compute_witness(&circuit, 0)?;
        assert!(helper.computed_witness());

        let new_key = helper.compute_proving_key(&circuit)?;
        assert!(!Arc::ptr_eq(&old_key, &new_key));
        assert!(!helper.computed_witness());
        // The old key is untouched by the witness, which went into the helper's own copy.
        assert!(!old_key.polynomial_store.contains("w_l"));
        assert_eq!(
            old_key.polynomial_store.get("sigma_1")?,
            new_key.polynomial_store.get("sigma_1")?
        );
        Ok(())
    }

    #[test]
    fn test_from_keys() -> Result<()> {
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(10));
        let verification_key = helper.compute_verification_key(&circuit)?;
        let proving_key = helper
            .proving_key()
            .expect("computed with the verification key")
            .clone();

        let mut restored = Helper::from_keys(proving_key, verification_key.clone());
        assert!(!restored.computed_witness());
        assert!(Arc::ptr_eq(
            &restored.compute_verification_key(&circuit)?,
            &verification_key
        ));
        // No reference string factory to build new keys with.
        assert!(restored.compute_proving_key(&circuit).is_err());

        // The witness only needs the existing proving key.
        restored.compute_witness(&circuit, 0)?;
        let restored = Helper::from_keys(
            restored.proving_key().expect("kept from the keys").clone(),
            verification_key,
        );
        assert!(restored.computed_witness());
        Ok(())
    }

    #[test]
    fn test_insufficient_reference_string() {
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(2));
        assert!(helper.compute_proving_key(&circuit).is_err());
        assert!(helper.proving_key().is_none());
        assert!(helper.compute_verification_key(&circuit).is_err());
    }

    #[test]
    fn test_create_prover_and_verifier() -> Result<()> {
        let circuit = standard_circuit();
        let mut helper = Helper::new(crs_factory(10));
        let prover = helper.create_prover(&circuit)?;
        let verifier = helper.create_verifier(&circuit)?;

        assert!(helper.computed_witness());
        assert!(Arc::ptr_eq(
            prover.proving_key(),
            helper.proving_key().expect("computed for the prover")
        ));
        let wire_commitments = prover.commit_to_wires()?;
        assert_eq!(
            wire_commitments
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>(),
            vec!["w_l", "w_r", "w_o"]
        );

        assert!(verifier.commitment("sigma_2").is_ok());
        assert!(verifier.commitment("w_l").is_err());
        assert_eq!(
            verifier.pcs_verification_key(),
            &verifier.verification_key().pcs_verification_key
        );
        Ok(())
    }
}
