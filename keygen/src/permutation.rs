//! Copy constraints as permutation polynomials.

use hashbrown::HashMap;
use plonky2_field::polynomial::PolynomialValues;
use plonky2_field::types::Field;
use plonky2_maybe_rayon::*;

use crate::circuit::CircuitConstructor;

/// A cell of the execution trace.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub(crate) struct WirePosition {
    pub(crate) column: usize,
    pub(crate) row: usize,
}

/// The trace cells holding each variable, grouped by the representative the variable was merged
/// into. Every group is one cycle of the copy permutation.
#[derive(Clone, Debug)]
pub(crate) struct CopyCycles {
    cycles: Vec<Vec<WirePosition>>,
    num_public_inputs: usize,
}

impl CopyCycles {
    /// Collect the cycles of a circuit whose trace starts with its public input rows.
    pub(crate) fn new<F: Field, Circuit: CircuitConstructor<F>>(circuit: &Circuit) -> Self {
        let mut cycle_of_variable = HashMap::<u32, usize>::new();
        let mut cycles = Vec::<Vec<WirePosition>>::new();
        let mut add = |variable: u32, position: WirePosition| {
            let real_index = circuit.real_variable_index(variable);
            let cycle = *cycle_of_variable.entry(real_index).or_insert_with(|| {
                cycles.push(Vec::new());
                cycles.len() - 1
            });
            cycles[cycle].push(position);
        };

        let public_inputs = circuit.public_inputs();
        for (row, &variable) in public_inputs.iter().enumerate() {
            add(variable, WirePosition { column: 0, row });
            add(variable, WirePosition { column: 1, row });
        }

        let offset = public_inputs.len();
        for (column, wire) in circuit.wires().iter().enumerate() {
            for (gate, &variable) in wire.iter().enumerate() {
                add(
                    variable,
                    WirePosition {
                        column,
                        row: offset + gate,
                    },
                );
            }
        }

        Self {
            cycles,
            num_public_inputs: public_inputs.len(),
        }
    }

    /// `sigma[column][row]` encodes the next cell in the cycle of `(column, row)` as
    /// `column * n + row`. Cells outside every cycle map to themselves. The first column of a
    /// public input row holds `-(row + 1)` instead, which ties the row to the public input in
    /// the permutation argument.
    pub(crate) fn sigma_polys<F: Field>(
        &self,
        num_wires: usize,
        degree: usize,
    ) -> Vec<PolynomialValues<F>> {
        let sigma = self.sigma_map(num_wires, degree);

        let mut polys = sigma
            .chunks(degree)
            .map(|chunk| {
                let values = chunk
                    .par_iter()
                    .map(|&x| F::from_canonical_usize(x))
                    .collect::<Vec<_>>();
                PolynomialValues::new(values)
            })
            .collect::<Vec<_>>();

        for row in 0..self.num_public_inputs {
            polys[0].values[row] = -F::from_canonical_usize(row + 1);
        }
        polys
    }

    fn sigma_map(&self, num_wires: usize, degree: usize) -> Vec<usize> {
        let mut sigma = (0..num_wires * degree).collect::<Vec<_>>();
        for cycle in &self.cycles {
            for i in 0..cycle.len() {
                let current = cycle[i];
                let next = cycle[(i + 1) % cycle.len()];
                sigma[current.column * degree + current.row] = next.column * degree + next.row;
            }
        }
        sigma
    }
}

/// `id[column][row] = column * n + row`.
pub(crate) fn id_polys<F: Field>(num_wires: usize, degree: usize) -> Vec<PolynomialValues<F>> {
    (0..num_wires)
        .map(|column| {
            let values = (0..degree)
                .into_par_iter()
                .map(|row| F::from_canonical_usize(column * degree + row))
                .collect::<Vec<_>>();
            PolynomialValues::new(values)
        })
        .collect()
}
