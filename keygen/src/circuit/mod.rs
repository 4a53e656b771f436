//! Circuit constructors: the gate lists, wire assignments and selector values that keys are
//! synthesized from.

mod standard;
mod table;
mod ultra;

use plonky2_field::types::Field;
pub use standard::StandardCircuitConstructor;
pub use table::LookupTable;
pub use ultra::{UltraCircuitConstructor, DEFAULT_PLOOKUP_RANGE_STEP_SIZE};

/// A finalized arithmetic circuit, as consumed by the composer.
///
/// The execution trace places one row per public input first, followed by one row per gate. On
/// a public input row the first two wires carry the public input.
pub trait CircuitConstructor<F: Field> {
    const NUM_WIRES: usize;
    /// Names of the selectors returned by [`CircuitConstructor::selectors`], in the same order.
    const SELECTOR_NAMES: &'static [&'static str];

    /// The number of gates, not counting public input rows.
    fn num_gates(&self) -> usize;

    /// Variable indices of the public inputs.
    fn public_inputs(&self) -> &[u32];

    /// `wires()[column][gate]` is the variable placed on `column` of `gate`.
    fn wires(&self) -> &[Vec<u32>];

    /// `selectors()[i][gate]` is the value of selector `SELECTOR_NAMES[i]` on `gate`.
    fn selectors(&self) -> &[Vec<F>];

    /// The value assigned to a variable.
    fn variable(&self, index: u32) -> F;

    /// The representative of the equivalence class `index` was merged into by copy constraints.
    fn real_variable_index(&self, index: u32) -> u32;

    /// Add any gates whose construction was deferred until the circuit is complete.
    fn finalize_circuit(&mut self);

    fn is_finalized(&self) -> bool;

    /// Trace rows used by public inputs and gates together.
    fn total_num_gates(&self) -> usize {
        self.public_inputs().len() + self.num_gates()
    }
}

/// `a_scaling * a + b_scaling * b + c_scaling * c + const_scaling = 0`
#[derive(Copy, Clone, Debug)]
pub struct AddTriple<F: Field> {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub a_scaling: F,
    pub b_scaling: F,
    pub c_scaling: F,
    pub const_scaling: F,
}

/// `a_scaling * a + b_scaling * b + c_scaling * c + d_scaling * d + const_scaling = 0`
#[derive(Copy, Clone, Debug)]
pub struct AddQuad<F: Field> {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub d: u32,
    pub a_scaling: F,
    pub b_scaling: F,
    pub c_scaling: F,
    pub d_scaling: F,
    pub const_scaling: F,
}

/// `mul_scaling * a * b + c_scaling * c + const_scaling = 0`
#[derive(Copy, Clone, Debug)]
pub struct MulTriple<F: Field> {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub mul_scaling: F,
    pub c_scaling: F,
    pub const_scaling: F,
}

/// `q_m * a * b + q_l * a + q_r * b + q_o * c + q_c = 0`
#[derive(Copy, Clone, Debug)]
pub struct PolyTriple<F: Field> {
    pub a: u32,
    pub b: u32,
    pub c: u32,
    pub q_m: F,
    pub q_l: F,
    pub q_r: F,
    pub q_o: F,
    pub q_c: F,
}

/// Disjoint set forest over variable indices, following
/// https://en.wikipedia.org/wiki/Disjoint-set_data_structure.
///
/// Sets are merged by size, so the path from any node to its representative stays logarithmic
/// even before [`VariableForest::compress_paths`] runs.
#[derive(Clone, Debug, Default)]
pub(crate) struct VariableForest {
    /// Parent pointers, stored as variable indices.
    parents: Vec<u32>,
    /// Set sizes, only meaningful for representatives.
    sizes: Vec<u32>,
}

impl VariableForest {
    /// Add a new partition with a single member, returning its index.
    pub(crate) fn add(&mut self) -> u32 {
        let index = self.parents.len() as u32;
        self.parents.push(index);
        self.sizes.push(1);
        index
    }

    /// The representative of the set containing `index`, without touching the forest.
    pub(crate) fn root(&self, mut index: u32) -> u32 {
        while self.parents[index as usize] != index {
            index = self.parents[index as usize];
        }
        index
    }

    /// Find the representative of the set containing `index`, pointing every node on the way
    /// directly at it.
    pub(crate) fn find(&mut self, mut index: u32) -> u32 {
        // Iterative, since chains can be long.
        let representative = self.root(index);
        while self.parents[index as usize] != index {
            let parent = self.parents[index as usize];
            self.parents[index as usize] = representative;
            index = parent;
        }
        representative
    }

    /// Merge the sets containing `x` and `y`. The representative of the larger set survives,
    /// that of `x` on a tie.
    pub(crate) fn merge(&mut self, x: u32, y: u32) {
        let mut x_root = self.find(x);
        let mut y_root = self.find(y);
        if x_root == y_root {
            return;
        }
        if self.sizes[x_root as usize] < self.sizes[y_root as usize] {
            std::mem::swap(&mut x_root, &mut y_root);
        }
        self.parents[y_root as usize] = x_root;
        self.sizes[x_root as usize] += self.sizes[y_root as usize];
    }

    /// Point every node directly at its representative.
    pub(crate) fn compress_paths(&mut self) {
        for i in 0..self.parents.len() {
            self.find(i as u32);
        }
    }
}
