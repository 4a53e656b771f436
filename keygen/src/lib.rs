#![allow(clippy::too_many_arguments)]
#![allow(clippy::needless_range_loop)]

pub use plonky2_field as field;

pub mod circuit;
pub mod composer;
pub mod flavor;
pub mod keys;
pub mod pcs;
mod permutation;
pub mod polynomial_store;
pub mod prover;
pub mod srs;
pub mod verifier;

#[cfg(test)]
mod test_utils;
