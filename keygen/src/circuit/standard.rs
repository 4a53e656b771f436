use plonky2_field::types::Field;

use super::{AddTriple, CircuitConstructor, MulTriple, PolyTriple, VariableForest};

const NUM_WIRES: usize = 3;
const SELECTOR_NAMES: &[&str] = &["q_m", "q_l", "q_r", "q_o", "q_c"];

/// A circuit made of width-3 arithmetic gates
/// `q_m * w_l * w_r + q_l * w_l + q_r * w_r + q_o * w_o + q_c = 0`.
#[derive(Clone, Debug)]
pub struct StandardCircuitConstructor<F: Field> {
    variables: Vec<F>,
    forest: VariableForest,
    public_inputs: Vec<u32>,
    wires: Vec<Vec<u32>>,
    selectors: Vec<Vec<F>>,
    zero_idx: u32,
}

impl<F: Field> Default for StandardCircuitConstructor<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: Field> StandardCircuitConstructor<F> {
    pub fn new() -> Self {
        let mut circuit = Self {
            variables: Vec::new(),
            forest: VariableForest::default(),
            public_inputs: Vec::new(),
            wires: vec![Vec::new(); NUM_WIRES],
            selectors: vec![Vec::new(); SELECTOR_NAMES.len()],
            zero_idx: 0,
        };
        circuit.zero_idx = circuit.add_variable(F::ZERO);
        circuit
    }

    /// A variable holding zero, used to fill unused wires.
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

    /// Expose an existing variable as a public input.
    pub fn set_public_input(&mut self, index: u32) {
        self.public_inputs.push(index);
    }

    /// Constrain two variables to be equal. They end up in the same copy cycle.
    pub fn assert_equal(&mut self, a: u32, b: u32) {
        debug_assert_eq!(
            self.variable(a),
            self.variable(b),
            "assert_equal on variables with different values"
        );
        self.forest.merge(a, b);
    }

    pub fn create_add_gate(&mut self, gate: &AddTriple<F>) {
        self.push_gate(
            [gate.a, gate.b, gate.c],
            [
                F::ZERO,
                gate.a_scaling,
                gate.b_scaling,
                gate.c_scaling,
                gate.const_scaling,
            ],
        );
    }

    pub fn create_mul_gate(&mut self, gate: &MulTriple<F>) {
        self.push_gate(
            [gate.a, gate.b, gate.c],
            [
                gate.mul_scaling,
                F::ZERO,
                F::ZERO,
                gate.c_scaling,
                gate.const_scaling,
            ],
        );
    }

    /// Constrain `variable` to be 0 or 1, via `x * x - x = 0`.
    pub fn create_bool_gate(&mut self, variable: u32) {
        self.push_gate(
            [variable, variable, self.zero_idx],
            [F::ONE, F::ZERO, F::ZERO, F::NEG_ONE, F::ZERO],
        );
    }

    pub fn create_poly_gate(&mut self, gate: &PolyTriple<F>) {
        self.push_gate(
            [gate.a, gate.b, gate.c],
            [gate.q_m, gate.q_l, gate.q_r, gate.q_o, gate.q_c],
        );
    }

    /// Constrain `variable` to equal the constant `value`.
    pub fn fix_witness(&mut self, variable: u32, value: F) {
        self.push_gate(
            [variable, self.zero_idx, self.zero_idx],
            [F::ZERO, F::ONE, F::ZERO, F::ZERO, -value],
        );
    }

    fn push_gate(&mut self, wires: [u32; NUM_WIRES], selectors: [F; 5]) {
        for (column, variable) in self.wires.iter_mut().zip(wires) {
            column.push(variable);
        }
        for (column, value) in self.selectors.iter_mut().zip(selectors) {
            column.push(value);
        }
    }
}

impl<F: Field> CircuitConstructor<F> for StandardCircuitConstructor<F> {
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

    /// Standard circuits have no deferred gates; finalizing only flattens the variable forest.
    fn finalize_circuit(&mut self) {
        self.forest.compress_paths();
    }

    fn is_finalized(&self) -> bool {
        true
    }
}
