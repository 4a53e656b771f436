use std::collections::BTreeMap;

use anyhow::{anyhow, ensure, Result};
use hashbrown::HashMap;
use log::debug;
use plonky2_field::types::{Field, PrimeField64};
use static_assertions::const_assert_eq;

use super::{
    AddQuad, AddTriple, CircuitConstructor, LookupTable, MulTriple, PolyTriple, VariableForest,
};

const NUM_WIRES: usize = 4;
const NUM_SELECTORS: usize = 11;
const SELECTOR_NAMES: &[&str] = &[
    "q_m",
    "q_c",
    "q_l",
    "q_r",
    "q_o",
    "q_4",
    "q_arith",
    "q_sort",
    "q_elliptic",
    "q_aux",
    "q_lookup",
];
const_assert_eq!(SELECTOR_NAMES.len(), NUM_SELECTORS);

/// The largest difference allowed between neighbouring entries of a sorted range list.
pub const DEFAULT_PLOOKUP_RANGE_STEP_SIZE: u64 = 3;

#[derive(Copy, Clone, Debug)]
struct UltraSelectors<F: Field> {
    q_m: F,
    q_c: F,
    q_l: F,
    q_r: F,
    q_o: F,
    q_4: F,
    q_arith: F,
    q_sort: F,
    q_elliptic: F,
    q_aux: F,
    q_lookup: F,
}

impl<F: Field> UltraSelectors<F> {
    fn zero() -> Self {
        Self {
            q_m: F::ZERO,
            q_c: F::ZERO,
            q_l: F::ZERO,
            q_r: F::ZERO,
            q_o: F::ZERO,
            q_4: F::ZERO,
            q_arith: F::ZERO,
            q_sort: F::ZERO,
            q_elliptic: F::ZERO,
            q_aux: F::ZERO,
            q_lookup: F::ZERO,
        }
    }

    fn arithmetic() -> Self {
        Self {
            q_arith: F::ONE,
            ..Self::zero()
        }
    }

    fn to_array(self) -> [F; NUM_SELECTORS] {
        [
            self.q_m,
            self.q_c,
            self.q_l,
            self.q_r,
            self.q_o,
            self.q_4,
            self.q_arith,
            self.q_sort,
            self.q_elliptic,
            self.q_aux,
            self.q_lookup,
        ]
    }
}

/// A width-4 circuit with lookup tables, deferred range constraints and recursive proof
/// metadata.
///
/// Range constraints are only turned into gates by [`CircuitConstructor::finalize_circuit`], which
/// must run before any key is computed from the circuit.
#[derive(Clone, Debug)]
pub struct UltraCircuitConstructor<F: PrimeField64> {
    variables: Vec<F>,
    forest: VariableForest,
    public_inputs: Vec<u32>,
    wires: Vec<Vec<u32>>,
    selectors: Vec<Vec<F>>,
    zero_idx: u32,
    constant_variable_indices: HashMap<F, u32>,
    lookup_tables: Vec<LookupTable<F>>,
    /// Variables to range constrain, keyed by the target range.
    range_lists: BTreeMap<u64, Vec<u32>>,
    contains_recursive_proof: bool,
    recursive_proof_public_input_indices: Vec<u32>,
    circuit_finalized: bool,
}

impl<F: PrimeField64> Default for UltraCircuitConstructor<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: PrimeField64> UltraCircuitConstructor<F> {
    pub fn new() -> Self {
        let mut circuit = Self {
            variables: Vec::new(),
            forest: VariableForest::default(),
            public_inputs: Vec::new(),
            wires: vec![Vec::new(); NUM_WIRES],
            selectors: vec![Vec::new(); NUM_SELECTORS],
            zero_idx: 0,
            constant_variable_indices: HashMap::new(),
            lookup_tables: Vec::new(),
            range_lists: BTreeMap::new(),
            contains_recursive_proof: false,
            recursive_proof_public_input_indices: Vec::new(),
            circuit_finalized: false,
        };
        circuit.zero_idx = circuit.add_variable(F::ZERO);
        circuit
    }

    pub fn zero_idx(&self) -> u32 {
        self.zero_idx
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn add_variable(&mut self, value: F) -> u32 {
        self.variables.push(value);
        self.forest.add()
    }

    pub fn add_public_variable(&mut self, value: F) -> u32 {
        let index = self.add_variable(value);
        self.public_inputs.push(index);
        index
    }

    pub fn set_public_input(&mut self, index: u32) {
        self.public_inputs.push(index);
    }

    pub fn assert_equal(&mut self, a: u32, b: u32) {
        debug_assert_eq!(
            self.variable(a),
            self.variable(b),
            "assert_equal on variables with different values"
        );
        self.forest.merge(a, b);
    }

    /// A variable fixed to `value` by a gate. Repeated calls with the same value share the
    /// variable.
    pub fn put_constant_variable(&mut self, value: F) -> u32 {
        if let Some(&index) = self.constant_variable_indices.get(&value) {
            return index;
        }
        let index = self.add_variable(value);
        self.fix_witness(index, value);
        self.constant_variable_indices.insert(value, index);
        index
    }

    pub fn fix_witness(&mut self, variable: u32, value: F) {
        let zero = self.zero_idx;
        self.push_gate(
            [variable, zero, zero, zero],
            UltraSelectors {
                q_l: F::ONE,
                q_c: -value,
                ..UltraSelectors::arithmetic()
            },
        );
    }

    pub fn create_add_gate(&mut self, gate: &AddTriple<F>) {
        self.create_big_add_gate(&AddQuad {
            a: gate.a,
            b: gate.b,
            c: gate.c,
            d: self.zero_idx,
            a_scaling: gate.a_scaling,
            b_scaling: gate.b_scaling,
            c_scaling: gate.c_scaling,
            d_scaling: F::ZERO,
            const_scaling: gate.const_scaling,
        });
    }

    pub fn create_big_add_gate(&mut self, gate: &AddQuad<F>) {
        self.push_gate(
            [gate.a, gate.b, gate.c, gate.d],
            UltraSelectors {
                q_l: gate.a_scaling,
                q_r: gate.b_scaling,
                q_o: gate.c_scaling,
                q_4: gate.d_scaling,
                q_c: gate.const_scaling,
                ..UltraSelectors::arithmetic()
            },
        );
    }

    pub fn create_mul_gate(&mut self, gate: &MulTriple<F>) {
        let zero = self.zero_idx;
        self.push_gate(
            [gate.a, gate.b, gate.c, zero],
            UltraSelectors {
                q_m: gate.mul_scaling,
                q_o: gate.c_scaling,
                q_c: gate.const_scaling,
                ..UltraSelectors::arithmetic()
            },
        );
    }

    pub fn create_bool_gate(&mut self, variable: u32) {
        let zero = self.zero_idx;
        self.push_gate(
            [variable, variable, zero, zero],
            UltraSelectors {
                q_m: F::ONE,
                q_l: F::NEG_ONE,
                ..UltraSelectors::arithmetic()
            },
        );
    }

    pub fn create_poly_gate(&mut self, gate: &PolyTriple<F>) {
        let zero = self.zero_idx;
        self.push_gate(
            [gate.a, gate.b, gate.c, zero],
            UltraSelectors {
                q_m: gate.q_m,
                q_l: gate.q_l,
                q_r: gate.q_r,
                q_o: gate.q_o,
                q_c: gate.q_c,
                ..UltraSelectors::arithmetic()
            },
        );
    }

    /// Register a lookup table, returning the handle used by lookup gates.
    pub fn add_lookup_table(&mut self, mut table: LookupTable<F>) -> usize {
        let handle = self.lookup_tables.len();
        // Index 0 is left for rows outside every table.
        table.table_index = handle + 1;
        self.lookup_tables.push(table);
        handle
    }

    pub fn lookup_tables(&self) -> &[LookupTable<F>] {
        &self.lookup_tables
    }

    /// Total number of rows across all lookup tables.
    pub fn lookup_tables_size(&self) -> usize {
        self.lookup_tables.iter().map(LookupTable::len).sum()
    }

    pub fn num_lookups(&self) -> usize {
        self.lookup_tables.iter().map(LookupTable::num_lookups).sum()
    }

    /// Add a gate reading row `row` of table `table`, returning the variables holding the row.
    pub fn create_lookup_gate(&mut self, table: usize, row: usize) -> Result<[u32; 3]> {
        let lookup_table = self
            .lookup_tables
            .get(table)
            .ok_or_else(|| anyhow!("No lookup table with handle {}", table))?;
        let entry = lookup_table.entry(row).ok_or_else(|| {
            anyhow!(
                "Row {} is out of range for lookup table `{}` with {} rows",
                row,
                lookup_table.id,
                lookup_table.len()
            )
        })?;
        let table_index = F::from_canonical_usize(lookup_table.table_index);

        let variables = entry.map(|value| self.add_variable(value));
        self.lookup_tables[table].record_read(row);
        let zero = self.zero_idx;
        self.push_gate(
            [variables[0], variables[1], variables[2], zero],
            UltraSelectors {
                q_o: table_index,
                q_lookup: F::ONE,
                ..UltraSelectors::zero()
            },
        );
        Ok(variables)
    }

    /// Add a gate reading the row of table `table` whose first column equals `key`.
    pub fn read_from_table(&mut self, table: usize, key: F) -> Result<[u32; 3]> {
        let row = self
            .lookup_tables
            .get(table)
            .and_then(|lookup_table| lookup_table.find_row(key))
            .ok_or_else(|| anyhow!("Key {} not found in lookup table {}", key, table))?;
        self.create_lookup_gate(table, row)
    }

    /// Constrain `variable` to lie in `[0, target_range]`. The sort gates enforcing this are added
    /// when the circuit is finalized, so a finalized circuit has to be finalized again.
    pub fn create_new_range_constraint(&mut self, variable: u32, target_range: u64) {
        if self.circuit_finalized {
            debug!("Range constraint added to a finalized ultra circuit, finalize it again");
            self.circuit_finalized = false;
        }
        let variable = self.real_variable_index(variable);
        let list = self.range_lists.entry(target_range).or_default();
        if !list.contains(&variable) {
            list.push(variable);
        }
    }

    /// Mark the given variables as the public outputs of a verified inner proof. They are
    /// appended to the public inputs and their public input positions recorded.
    pub fn add_recursive_proof(&mut self, proof_output_witness_indices: &[u32]) -> Result<()> {
        ensure!(
            !self.contains_recursive_proof,
            "Added a recursive proof when one already exists"
        );
        self.contains_recursive_proof = true;
        for &index in proof_output_witness_indices {
            self.set_public_input(index);
            self.recursive_proof_public_input_indices
                .push((self.public_inputs.len() - 1) as u32);
        }
        Ok(())
    }

    pub fn contains_recursive_proof(&self) -> bool {
        self.contains_recursive_proof
    }

    pub fn recursive_proof_public_input_indices(&self) -> &[u32] {
        &self.recursive_proof_public_input_indices
    }

    /// Turn one range list into sort gates. The list is merged with the step values
    /// `0, STEP, 2 * STEP, ..., target_range`, sorted, and laid out four per row so that
    /// neighbouring values never differ by more than the step size.
    fn process_range_list(&mut self, target_range: u64, variables: Vec<u32>) {
        let mut entries = variables
            .into_iter()
            .map(|index| (self.variable(index).to_canonical_u64(), index))
            .collect::<Vec<_>>();

        let mut step = 0;
        while step < target_range {
            let constant = self.put_constant_variable(F::from_canonical_u64(step));
            entries.push((step, constant));
            step += DEFAULT_PLOOKUP_RANGE_STEP_SIZE;
        }
        let top = self.put_constant_variable(F::from_canonical_u64(target_range));
        entries.push((target_range, top));
        entries.sort_by_key(|&(value, _)| value);

        let zero = self.put_constant_variable(F::ZERO);
        let padding = (NUM_WIRES - entries.len() % NUM_WIRES) % NUM_WIRES;
        let sorted = std::iter::repeat(zero)
            .take(padding)
            .chain(entries.into_iter().map(|(_, index)| index))
            .collect::<Vec<_>>();

        for row in sorted.chunks(NUM_WIRES) {
            self.push_gate(
                [row[0], row[1], row[2], row[3]],
                UltraSelectors {
                    q_sort: F::ONE,
                    ..UltraSelectors::zero()
                },
            );
        }
        // The last sort gate compares its fourth wire against the first wire of the next row.
        let last = sorted[sorted.len() - 1];
        self.push_gate([last, zero, zero, zero], UltraSelectors::zero());
    }

    fn push_gate(&mut self, wires: [u32; NUM_WIRES], selectors: UltraSelectors<F>) {
        for (column, variable) in self.wires.iter_mut().zip(wires) {
            column.push(variable);
        }
        for (column, value) in self.selectors.iter_mut().zip(selectors.to_array()) {
            column.push(value);
        }
    }
}

impl<F: PrimeField64> CircuitConstructor<F> for UltraCircuitConstructor<F> {
    const NUM_WIRES: usize = NUM_WIRES;
    const SELECTOR_NAMES: &'static [&'static str] = SELECTOR_NAMES;

    fn num_gates(&self) -> usize {
        self.wires[0].len()
    }

    fn public_inputs(&self) -> &[u32] {
        &self.public_inputs
    }

    fn wires(&self) -> &[Vec<u32>] {
        &self.wires
    }

    fn selectors(&self) -> &[Vec<F>] {
        &self.selectors
    }

    fn variable(&self, index: u32) -> F {
        self.variables[self.forest.root(index) as usize]
    }

    fn real_variable_index(&self, index: u32) -> u32 {
        self.forest.root(index)
    }

    fn finalize_circuit(&mut self) {
        if self.circuit_finalized {
            return;
        }
        let range_lists = std::mem::take(&mut self.range_lists);
        for (target_range, variables) in range_lists {
            self.process_range_list(target_range, variables);
        }
        self.forest.compress_paths();
        self.circuit_finalized = true;
        debug!(
            "Finalized ultra circuit: {} gates, {} lookups into {} tables",
            self.num_gates(),
            self.num_lookups(),
            self.lookup_tables.len()
        );
    }

    fn is_finalized(&self) -> bool {
        self.circuit_finalized
    }
}
