//! The per-flavor parameters of key synthesis: which circuit a flavor consumes, which polynomials
//! it produces, how much of the trace it reserves for randomness and what metadata it carries.

use std::fmt::Debug;

use anyhow::{ensure, Result};
use plonky2::hash::hash_types::RichField;
use plonky2_field::polynomial::PolynomialValues;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert;

use crate::circuit::{CircuitConstructor, StandardCircuitConstructor, UltraCircuitConstructor};

/// Number of roots of unity excluded from the vanishing polynomial, one of which is the last row
/// of the trace. The rows below it are free for randomness.
pub const NUM_ROOTS_CUT_FROM_VANISHING_POLYNOMIAL: usize = 4;
const_assert!(NUM_ROOTS_CUT_FROM_VANISHING_POLYNOMIAL >= 1);

pub trait Flavor<F: RichField>: Clone + Debug + Default + Send + Sync + 'static {
    const NAME: &'static str;
    const NUM_WIRES: usize = <Self::Circuit as CircuitConstructor<F>>::NUM_WIRES;
    /// Rows at the end of the trace kept free of gates.
    const NUM_RESERVED_GATES: usize;
    const WIRE_NAMES: &'static [&'static str];
    /// Witness polynomials other than the wires.
    const EXTRA_WITNESS_NAMES: &'static [&'static str] = &[];
    /// Tags of the table columns added to the proving key, stored as `"{tag}_lagrange"`.
    const TABLE_COLUMN_TAGS: &'static [&'static str] = &[];

    type Circuit: CircuitConstructor<F> + Debug;
    type Metadata: Clone
        + Debug
        + Default
        + Eq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;

    fn num_randomized_gates(&self) -> usize {
        Self::NUM_RESERVED_GATES
    }

    /// Trace rows the circuit needs, not counting randomized rows.
    fn num_gates(&self, circuit: &Self::Circuit) -> usize {
        circuit.total_num_gates()
    }

    fn minimum_circuit_size(&self, _circuit: &Self::Circuit) -> usize {
        0
    }

    fn metadata(&self, circuit: &Self::Circuit) -> Self::Metadata;

    /// The table columns of the circuit over a trace of `circuit_size` rows, paired with their
    /// tags.
    fn table_columns(
        &self,
        _circuit: &Self::Circuit,
        _circuit_size: usize,
    ) -> Result<Vec<(String, PolynomialValues<F>)>> {
        Ok(Vec::new())
    }

    /// The witness polynomials named by [`Flavor::EXTRA_WITNESS_NAMES`].
    fn extra_witness(
        &self,
        _circuit: &Self::Circuit,
        _circuit_size: usize,
    ) -> Result<Vec<(String, PolynomialValues<F>)>> {
        Ok(Vec::new())
    }

    fn witness_polynomial_names() -> Vec<String> {
        Self::WIRE_NAMES
            .iter()
            .chain(Self::EXTRA_WITNESS_NAMES)
            .map(|name| name.to_string())
            .collect()
    }

    fn is_witness_polynomial(name: &str) -> bool {
        Self::WIRE_NAMES.contains(&name) || Self::EXTRA_WITNESS_NAMES.contains(&name)
    }

    /// Everything the proving key holds before the witness is added.
    fn precomputed_polynomial_names() -> Vec<String> {
        let selectors = <Self::Circuit as CircuitConstructor<F>>::SELECTOR_NAMES
            .iter()
            .map(|name| name.to_string());
        let sigmas = (1..=Self::NUM_WIRES).map(|i| format!("sigma_{i}"));
        let ids = (1..=Self::NUM_WIRES).map(|i| format!("id_{i}"));
        let lagranges = ["lagrange_first", "lagrange_last"]
            .into_iter()
            .map(String::from);
        let tables = Self::TABLE_COLUMN_TAGS
            .iter()
            .map(|tag| format!("{tag}_lagrange"));
        selectors
            .chain(sigmas)
            .chain(ids)
            .chain(lagranges)
            .chain(tables)
            .collect()
    }
}

/// Width-3 arithmetic gates with a permutation argument.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct StandardFlavor;

impl<F: RichField> Flavor<F> for StandardFlavor {
    const NAME: &'static str = "standard";
    const NUM_RESERVED_GATES: usize = 2;
    const WIRE_NAMES: &'static [&'static str] = &["w_l", "w_r", "w_o"];

    type Circuit = StandardCircuitConstructor<F>;
    type Metadata = ();

    fn metadata(&self, _circuit: &Self::Circuit) -> Self::Metadata {}
}

/// Recursion data an Ultra circuit hands to its keys. Carried as is, never validated.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct RecursionMetadata {
    pub contains_recursive_proof: bool,
    pub recursive_proof_public_input_indices: Vec<u32>,
}

/// Width-4 gates with lookup tables and recursive proof metadata.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct UltraFlavor {
    /// Rows left free between the tables and the end of the trace.
    pub s_randomness: usize,
}

impl Default for UltraFlavor {
    fn default() -> Self {
        Self {
            s_randomness: NUM_ROOTS_CUT_FROM_VANISHING_POLYNOMIAL - 1,
        }
    }
}

impl UltraFlavor {
    /// First row of a block of `len` rows ending just below the randomness rows.
    fn block_offset(&self, circuit_size: usize, len: usize, what: &str) -> Result<usize> {
        let required = len + self.s_randomness + 1;
        ensure!(
            required <= circuit_size,
            "{} {} rows do not fit in a circuit of size {}",
            len,
            what,
            circuit_size
        );
        Ok(circuit_size - required)
    }
}

impl<F: RichField> Flavor<F> for UltraFlavor {
    const NAME: &'static str = "ultra";
    const NUM_RESERVED_GATES: usize = 4;
    const WIRE_NAMES: &'static [&'static str] = &["w_l", "w_r", "w_o", "w_4"];
    const EXTRA_WITNESS_NAMES: &'static [&'static str] =
        &["sorted_1", "sorted_2", "sorted_3", "sorted_4"];
    const TABLE_COLUMN_TAGS: &'static [&'static str] = &[
        "table_value_1",
        "table_value_2",
        "table_value_3",
        "table_value_4",
    ];

    type Circuit = UltraCircuitConstructor<F>;
    type Metadata = RecursionMetadata;

    fn num_randomized_gates(&self) -> usize {
        <Self as Flavor<F>>::NUM_RESERVED_GATES.max(self.s_randomness + 1)
    }

    /// Tables occupy their own rows, so they count towards the trace size.
    fn num_gates(&self, circuit: &Self::Circuit) -> usize {
        circuit.total_num_gates() + circuit.lookup_tables_size()
    }

    fn minimum_circuit_size(&self, circuit: &Self::Circuit) -> usize {
        circuit.lookup_tables_size() + circuit.num_lookups() + self.s_randomness + 1
    }

    fn metadata(&self, circuit: &Self::Circuit) -> Self::Metadata {
        RecursionMetadata {
            contains_recursive_proof: circuit.contains_recursive_proof(),
            recursive_proof_public_input_indices: circuit
                .recursive_proof_public_input_indices()
                .to_vec(),
        }
    }

    fn table_columns(
        &self,
        circuit: &Self::Circuit,
        circuit_size: usize,
    ) -> Result<Vec<(String, PolynomialValues<F>)>> {
        let offset = self.block_offset(circuit_size, circuit.lookup_tables_size(), "table")?;

        let mut columns = vec![vec![F::ZERO; circuit_size]; 4];
        let mut row = offset;
        for table in circuit.lookup_tables() {
            let table_index = F::from_canonical_usize(table.table_index);
            for i in 0..table.len() {
                columns[0][row] = table.column_1[i];
                columns[1][row] = table.column_2[i];
                columns[2][row] = table.column_3[i];
                columns[3][row] = table_index;
                row += 1;
            }
        }

        Ok(<Self as Flavor<F>>::TABLE_COLUMN_TAGS
            .iter()
            .zip(columns)
            .map(|(tag, values)| (tag.to_string(), PolynomialValues::new(values)))
            .collect())
    }

    /// The sorted lists of the lookup argument: each table row repeated once for the table itself
    /// and once per lookup gate reading it, in table order.
    fn extra_witness(
        &self,
        circuit: &Self::Circuit,
        circuit_size: usize,
    ) -> Result<Vec<(String, PolynomialValues<F>)>> {
        let sorted_len = circuit.lookup_tables_size() + circuit.num_lookups();
        let offset = self.block_offset(circuit_size, sorted_len, "sorted list")?;

        let mut columns = vec![vec![F::ZERO; circuit_size]; 4];
        let mut row = offset;
        for table in circuit.lookup_tables() {
            let mut multiplicities = vec![1usize; table.len()];
            for &read in table.lookup_reads() {
                multiplicities[read] += 1;
            }
            let table_index = F::from_canonical_usize(table.table_index);
            for (i, &multiplicity) in multiplicities.iter().enumerate() {
                for _ in 0..multiplicity {
                    columns[0][row] = table.column_1[i];
                    columns[1][row] = table.column_2[i];
                    columns[2][row] = table.column_3[i];
                    columns[3][row] = table_index;
                    row += 1;
                }
            }
        }

        Ok(<Self as Flavor<F>>::EXTRA_WITNESS_NAMES
            .iter()
            .zip(columns)
            .map(|(name, values)| (name.to_string(), PolynomialValues::new(values)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use plonky2_field::goldilocks_field::GoldilocksField;
    use plonky2_field::types::Field;

    use super::*;
    use crate::circuit::LookupTable;

    type F = GoldilocksField;

    #[test]
    fn test_polynomial_names() {
        let standard = <StandardFlavor as Flavor<F>>::precomputed_polynomial_names();
        assert_eq!(standard.len(), 5 + 3 + 3 + 2);
        assert!(standard.contains(&"sigma_3".to_string()));
        assert!(!standard.contains(&"sigma_4".to_string()));

        let ultra = <UltraFlavor as Flavor<F>>::precomputed_polynomial_names();
        assert_eq!(ultra.len(), 11 + 4 + 4 + 2 + 4);
        assert!(ultra.contains(&"table_value_4_lagrange".to_string()));

        assert!(<UltraFlavor as Flavor<F>>::is_witness_polynomial("sorted_2"));
        assert!(!<StandardFlavor as Flavor<F>>::is_witness_polynomial("sorted_2"));
        for name in ultra {
            assert!(!<UltraFlavor as Flavor<F>>::is_witness_polynomial(&name));
        }
    }

    #[test]
    fn test_randomized_gates() {
        assert_eq!(Flavor::<F>::num_randomized_gates(&StandardFlavor), 2);
        assert_eq!(Flavor::<F>::num_randomized_gates(&UltraFlavor::default()), 4);
        let flavor = UltraFlavor { s_randomness: 6 };
        assert_eq!(Flavor::<F>::num_randomized_gates(&flavor), 7);
    }

    #[test]
    fn test_table_and_sorted_placement() -> Result<()> {
        let mut circuit = UltraCircuitConstructor::<F>::new();
        let table = circuit.add_lookup_table(LookupTable::range("RANGE_2", 2));
        circuit.create_lookup_gate(table, 1)?;
        circuit.create_lookup_gate(table, 1)?;
        let flavor = UltraFlavor::default();
        let n = 16;

        let columns = flavor.table_columns(&circuit, n)?;
        assert_eq!(columns.len(), 4);
        assert_eq!(columns[0].0, "table_value_1");
        // Four table rows end at n - s_randomness - 1 = 12.
        let first = &columns[0].1.values;
        assert_eq!(&first[8..12], &[0, 1, 2, 3].map(F::from_canonical_u64));
        assert_eq!(first[12], F::ZERO);
        assert_eq!(columns[3].1.values[8], F::ONE);
        assert_eq!(columns[3].1.values[7], F::ZERO);

        let sorted = flavor.extra_witness(&circuit, n)?;
        assert_eq!(sorted[0].0, "sorted_1");
        assert_eq!(
            &sorted[0].1.values[6..12],
            &[0, 1, 1, 1, 2, 3].map(F::from_canonical_u64)
        );

        assert!(flavor.table_columns(&circuit, 4).is_err());
        Ok(())
    }
}
